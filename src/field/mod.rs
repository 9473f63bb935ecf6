//! Field arithmetic: the base field `Fp` (§4.A) and its quadratic extension
//! `Fp2` (§4.B).

pub(crate) mod fp;
pub(crate) mod fp2;

pub use fp::Fp;
pub use fp2::Fp2;
