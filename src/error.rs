//! The library's exhaustive error type (§7).
//!
//! The math layer itself never fails: every in-domain field/curve/scalar
//! operation produces a defined output unconditionally (`sqrt`/`invert`
//! failure is carried as a [`subtle::Choice`], not an error). Errors exist
//! only at the entry points listed in §6, where a caller-supplied scalar,
//! point, or version tag is rejected before any math runs.

/// The four exhaustive failure kinds from §7.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `init` was called with a protocol/version tag the library doesn't
    /// implement.
    #[error("version mismatch")]
    VersionMismatch,
    /// A scalar was zero or `>= q`.
    #[error("invalid scalar")]
    InvalidScalar,
    /// A deserialized `(x, y)` pair does not satisfy the curve equation.
    #[error("invalid point")]
    InvalidPoint,
    /// An Elligator decode mapped its input to the identity or to an
    /// off-curve value.
    #[error("ambiguous elligator input")]
    AmbiguousElligatorInput,
}

/// `Result` alias used throughout the public API.
pub type Result<T> = core::result::Result<T, Error>;
