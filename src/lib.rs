#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo.svg"
)]
#![allow(non_snake_case)]
#![forbid(unsafe_code)]
#![warn(
    clippy::unwrap_used,
    clippy::mod_module_files,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused,
    unused_attributes,
    unused_imports,
    unused_mut,
    unused_must_use
)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

// Internal macros. Must come first!
#[macro_use]
pub(crate) mod macros;

pub use rand_core;
pub use subtle;

pub mod curve;
#[cfg(feature = "elligator")]
pub mod elligator;
pub mod error;
pub mod field;
pub mod scalar;

pub use curve::{AffinePoint, ProjectivePoint};
pub use error::{Error, Result};
pub use field::{Fp, Fp2};
pub use scalar::Scalar;

/// The protocol/version tag this build of the library implements (§6).
pub const VERSION: u32 = 1;

/// Checks the caller's expected protocol version. The only external
/// interface here that can fail for a reason unrelated to a specific
/// scalar or point.
pub fn init(expected_version: u32) -> Result<()> {
    if expected_version != VERSION {
        return Err(Error::VersionMismatch);
    }
    Ok(())
}

/// `R = -P`.
pub fn neg(p: &AffinePoint) -> AffinePoint {
    p.expand().neg().affine()
}

/// Vartime curve-membership check on public input (§4.H). Callers
/// deserializing a point from an untrusted source must call this (or
/// [`AffinePoint::valid_vartime`] directly) before passing it to any of the
/// `mul*`/`simul*` routines.
pub fn valid(p: &AffinePoint) -> bool {
    p.valid_vartime()
}

/// `R = k*G` (`mul4 = false`) or `R = 4*k*G` (`mul4 = true`) (§4.G.1). The
/// default for signature generation is `mul4 = true`; ECDH callers that
/// apply their own cofactor clearing pass `mul4 = false`.
pub fn mul_gen(k: &Scalar, mul4: bool) -> Result<AffinePoint> {
    if scalar::invalid_key(k) {
        return Err(Error::InvalidScalar);
    }
    Ok(curve::scalar_mul::mul_gen(k, mul4))
}

/// `R = k*4*P` for a variable base point (§4.G.2).
pub fn mul(k: &Scalar, p: &AffinePoint) -> Result<AffinePoint> {
    if scalar::invalid_key(k) {
        return Err(Error::InvalidScalar);
    }
    Ok(curve::scalar_mul::mul(k, p))
}

/// `R = a*4*P + b*4*Q` (§4.G.3).
pub fn simul(a: &Scalar, p: &AffinePoint, b: &Scalar, q: &AffinePoint) -> Result<AffinePoint> {
    if scalar::invalid_key(a) || scalar::invalid_key(b) {
        return Err(Error::InvalidScalar);
    }
    Ok(curve::scalar_mul::simul(a, p, b, q))
}

/// `R = a*4*G + b*4*Q` (§4.G.4).
pub fn simul_gen(a: &Scalar, b: &Scalar, q: &AffinePoint) -> Result<AffinePoint> {
    if scalar::invalid_key(a) || scalar::invalid_key(b) {
        return Err(Error::InvalidScalar);
    }
    Ok(curve::scalar_mul::simul_gen(a, b, q))
}

/// `r = (x*y + z) mod q`, `z` optional (§4.E/§6).
pub fn mul_mod_q(x: &Scalar, y: &Scalar, z: Option<&Scalar>) -> Scalar {
    x.mul_mod_q(y, z)
}

/// `r = (x + y) mod q` (§4.E/§6).
pub fn add_mod_q(x: &Scalar, y: &Scalar) -> Scalar {
    x.add_mod_q(y)
}

/// `r = x mod q` for a 64-byte (512-bit) little-endian input (§6).
pub fn mod_q(x: &[u8; 64]) -> Scalar {
    let mut limbs = [0u64; 8];
    for i in 0..8 {
        limbs[i] = u64::from_le_bytes(x[i * 8..i * 8 + 8].try_into().unwrap());
    }
    Scalar::mod_q_wide(&limbs)
}

/// In-place masking of a raw 256-bit buffer into a usable secret scalar
/// (§4.H). Never fails.
pub fn secret_gen(raw: [u8; 32]) -> Scalar {
    scalar::secret_gen(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_rejects_wrong_version() {
        assert_eq!(init(VERSION), Ok(()));
        assert_eq!(init(VERSION + 1), Err(Error::VersionMismatch));
    }

    #[test]
    fn neg_then_mul_gen_matches_negated_point() {
        let k = scalar::secret_gen([0x09u8; 32]);
        let p = mul_gen(&k, false).unwrap();
        let np = neg(&p);
        assert_eq!(np, neg(&p));
        assert_ne!(np, p);
    }

    #[test]
    fn mul_rejects_invalid_scalar() {
        let p = curve::table::EC_G;
        assert_eq!(mul(&Scalar::ZERO, &p), Err(Error::InvalidScalar));
        assert_eq!(mul(&Scalar::Q, &p), Err(Error::InvalidScalar));
    }

    #[test]
    fn ecdh_round_trip() {
        let s = scalar::secret_gen([0x21u8; 32]);
        let t = scalar::secret_gen([0x43u8; 32]);
        let p = mul_gen(&s, false).unwrap();
        let q = mul_gen(&t, false).unwrap();
        let st = mul(&s, &q).unwrap();
        let ts = mul(&t, &p).unwrap();
        assert_eq!(st, ts);
    }

    #[test]
    fn eddsa_style_verification() {
        let a = scalar::secret_gen([0x55u8; 32]);
        let r = scalar::secret_gen([0x77u8; 32]);
        let big_r = mul_gen(&r, true).unwrap();
        let t = scalar::secret_gen([0x99u8; 32]).mod_q();
        let s = mul_mod_q(&a, &t, Some(&r));
        let big_a = mul_gen(&a, false).unwrap();
        let neg_a = neg(&big_a);
        let check = simul_gen(&s, &t, &neg_a).unwrap();
        assert_eq!(check, big_r);
    }

    #[test]
    fn point_bytes_hex_round_trip() {
        let k = scalar::secret_gen([0x66u8; 32]);
        let p = mul_gen(&k, false).unwrap();
        let bytes = p.to_bytes();

        let encoded = hex::encode(bytes);
        let decoded = hex::decode(&encoded).unwrap();
        assert_eq!(decoded, bytes.to_vec());

        let reparsed: [u8; 64] = decoded.try_into().unwrap();
        assert_eq!(AffinePoint::from_bytes(&reparsed).unwrap(), p);
    }
}
