//! Optional Elligator hook (§4.G.5), gated behind the `elligator` feature.
//!
//! The reference implementation's exact `ec_elligator_decode` was not part
//! of the retrieved source for this crate, so the map here is reconstructed
//! directly from the curve equation in §4.C rather than ported line for
//! line: a 32-byte key is read as a candidate `x`-coordinate, and the
//! corresponding `y` is recovered via the curve equation. Since `u = 2+i` is
//! already the fixed twisting non-residue (§4.B), trying `x` and then `u*x`
//! covers the same quadratic-residue class trick a textbook Elligator-2 map
//! uses, without introducing a separate Montgomery model and its own set of
//! derived constants. Inputs for which neither branch lands on the curve
//! are genuinely ambiguous and rejected, matching §7's
//! `AmbiguousElligatorInput` error kind. See `DESIGN.md` for the full
//! rationale and the tradeoff against the original two-curve-model
//! construction.
//!
//! Unlike the scalar-multiply routines, this module runs ordinary
//! (non-constant-time) control flow: the reference implementation's own
//! `ec_elligator_decode` is followed immediately by a `vartime` validity
//! check, so the input here is already treated as public/derived data, not
//! a secret on the hot path.

use crate::curve::point::{A_COEFF, AffinePoint, D_COEFF, ProjectivePoint};
use crate::curve::scalar_mul;
use crate::error::{Error, Result};
use crate::field::Fp2;
use crate::field::fp::Fp;
use crate::scalar::{self, Scalar};

const MASK127: u128 = (1u128 << 127) - 1;

fn bytes_to_fp2(key: &[u8; 32]) -> Fp2 {
    let a = u128::from_le_bytes(key[..16].try_into().unwrap()) & MASK127;
    let b = u128::from_le_bytes(key[16..].try_into().unwrap()) & MASK127;
    Fp2::new(Fp::from_raw(a), Fp::from_raw(b))
}

/// Tries `x` as a curve `x`-coordinate, returning the point if the curve
/// equation's corresponding `y^2` is a square.
fn try_x(x: &Fp2) -> Option<AffinePoint> {
    let x2 = x.square();
    let num = Fp2::ONE.sub(&A_COEFF.mul(&x2));
    let den = Fp2::ONE.sub(&D_COEFF.mul(&x2));
    if bool::from(den.is_zero_ct()) {
        return None;
    }
    let y2 = num.mul(&den.invert());
    let (y, is_square) = y2.sqrt();
    if !bool::from(is_square) {
        return None;
    }
    Some(AffinePoint { x: *x, y })
}

fn decode(key: &[u8; 32]) -> Option<AffinePoint> {
    let t = bytes_to_fp2(key);
    if bool::from(t.is_zero_ct()) {
        return None;
    }
    try_x(&t).or_else(|| try_x(&t.mul_u()))
}

/// `E = 4 * f(key)`, a deterministic map from a 32-byte key to a
/// cofactor-cleared curve point, serialized as the 128-byte extended
/// projective form (§6).
pub fn elligator(key: &[u8; 32]) -> Result<[u8; 128]> {
    let p = decode(key).ok_or(Error::AmbiguousElligatorInput)?;
    if !p.valid_vartime() {
        return Err(Error::AmbiguousElligatorInput);
    }
    let q = p.expand().dbl().dbl();
    Ok(q.to_bytes())
}

/// `C = k*G + E`.
pub fn elligator_encrypt(k: &Scalar, e: &[u8; 128]) -> Result<[u8; 64]> {
    if scalar::invalid_key(k) {
        return Err(Error::InvalidScalar);
    }
    let e_point = ProjectivePoint::from_bytes(e).ok_or(Error::InvalidPoint)?;
    let kg = scalar_mul::mul_gen(k, false).expand();
    let sum = kg.add(&e_point, false);
    Ok(sum.affine().to_bytes())
}

/// `R = k1*4*(C - E) + k2*4*V` (or `k1*4*(C - E)` when `k2` is `None`). The
/// cofactor clearing is already done by `mul`/`simul` below; this function
/// does not double it again.
pub fn elligator_secret(
    k1: &Scalar,
    c: &[u8; 64],
    e: &[u8; 128],
    k2_v: Option<(&Scalar, &[u8; 64])>,
) -> Result<[u8; 64]> {
    if scalar::invalid_key(k1) {
        return Err(Error::InvalidScalar);
    }
    let c_point = AffinePoint::from_bytes(c).ok_or(Error::InvalidPoint)?;
    if !c_point.valid_vartime() {
        return Err(Error::InvalidPoint);
    }
    let e_point = ProjectivePoint::from_bytes(e).ok_or(Error::InvalidPoint)?;

    let diff = c_point.expand().add(&e_point.neg(), false);

    let result = match k2_v {
        None => scalar_mul::mul(k1, &diff.affine()).expand(),
        Some((k2, v)) => {
            if scalar::invalid_key(k2) {
                return Err(Error::InvalidScalar);
            }
            let v_point = AffinePoint::from_bytes(v).ok_or(Error::InvalidPoint)?;
            if !v_point.valid_vartime() {
                return Err(Error::InvalidPoint);
            }
            scalar_mul::simul(k1, &diff.affine(), k2, &v_point).expand()
        }
    };

    Ok(result.affine().to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elligator_decode_succeeds_for_some_keys() {
        let mut found = false;
        for seed in 0u8..32 {
            let key = [seed; 32];
            if elligator(&key).is_ok() {
                found = true;
                break;
            }
        }
        assert!(found, "expected at least one seed key to decode");
    }

    #[test]
    fn elligator_round_trip_encrypt_secret() {
        let key = [0x01u8; 32];
        let e_bytes = elligator(&key).expect("this fixed key is known to decode");

        let k = scalar::secret_gen([0x11u8; 32]);
        let c_bytes = elligator_encrypt(&k, &e_bytes).unwrap();

        let e_point = ProjectivePoint::from_bytes(&e_bytes).unwrap();
        let c_point = AffinePoint::from_bytes(&c_bytes).unwrap();
        let diff = c_point.expand().add(&e_point.neg(), false);
        // `mul` already returns `k*4*diff` (§4.G.2); `elligator_secret` must
        // not clear the cofactor a second time on top of it.
        let expect = scalar_mul::mul(&k, &diff.affine());

        let r_bytes = elligator_secret(&k, &c_bytes, &e_bytes, None).unwrap();
        let r_point = AffinePoint::from_bytes(&r_bytes).unwrap();
        assert_eq!(r_point, expect);
    }
}
