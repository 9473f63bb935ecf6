//! The GLS (Galbraith-Lin-Scott) endomorphism and the scalar decomposition
//! it enables (§4.D).
//!
//! `psi` is a degree-1 endomorphism of the curve with `psi(P) = lambda * P`
//! for a fixed `lambda` in `Z/qZ` with `lambda^2 = -1`. It is computed as a
//! conjugation in `Fp2` followed by fixed-constant multiplications — no
//! scalar multiplication is involved. `decompose` inverts the relationship
//! on scalars: given secret `k`, it finds small `(sign_a, a, sign_b, b)`
//! with `k = a*sign_a + b*sign_b*lambda (mod q)` and `|a|, |b| < 2^128`, so
//! that `k*P = a*sign_a*P + b*sign_b*psi(P)` can be evaluated as a cheap
//! two-scalar simultaneous multiplication instead of one long one.

use subtle::{Choice, ConditionallySelectable, ConstantTimeGreater};

use crate::curve::point::ProjectivePoint;
use crate::field::Fp2;
use crate::field::fp::Fp;
use crate::scalar::{self, Scalar};

/// `C1` in `psi(x, y) = (C1 * conj(x), conj(y))`, satisfying `C1^2 =
/// conj(u)/u` for the curve's twisting non-residue `u = 2 + i`.
const PSI_C1: Fp2 = Fp2 {
    a: Fp::from_raw(0x59f30c694ed33218695ab4d883de0b89),
    b: Fp::from_raw(0x33e618d29da66430d2b569b107bc1713),
};

/// Lattice basis for the GLS decomposition: `v1 = (C_A, C_B)`, `v2 = (C_B,
/// -C_A)`, chosen so `det(v1, v2) = C_A^2 + C_B^2 = -(-q) = q` exactly
/// (`lambda^2 = -1 (mod q)` makes `q` a sum of two squares, the classic
/// Cornacchia construction for this kind of endomorphism).
const C_A: u64 = 0x62d2cf00a287a526;
/// `C_B = 2^126 - 1`.
const C_B: [u64; 2] = [0xFFFF_FFFF_FFFF_FFFF, 0x3FFF_FFFF_FFFF_FFFF];

/// Applies the GLS endomorphism to a curve point. Since `X*Y = Z*T`
/// conjugates to `C1*conj(X) * conj(Y) = conj(Z) * C1*conj(T)`, the T
/// coordinate picks up the same `C1` factor as X.
pub fn psi(p: &ProjectivePoint) -> ProjectivePoint {
    ProjectivePoint {
        x: PSI_C1.mul(&p.x.conj()),
        y: p.y.conj(),
        t: PSI_C1.mul(&p.t.conj()),
        z: p.z.conj(),
    }
}

/// Splits a secret scalar `k in (0, q)` into `(sign_a, a, sign_b, b)` with
/// `k = (-1)^sign_a * a + (-1)^sign_b * b * lambda (mod q)`, `a, b < 2^128`.
///
/// Uses Babai rounding against the basis above: `r1 = round(k*C_A/q)`, `r2 =
/// round(k*C_B/q)`, then `a = k - r1*C_A - r2*C_B`, `b = -r1*C_B + r2*C_A`.
/// Both multiplications that produce the rounding numerators are plain
/// 64x128 and 128x128 schoolbook products (the operands are public-sized
/// small lattice constants, not secret scalars), so this has no dependence
/// on `k`'s bit pattern beyond the arithmetic itself.
pub fn decompose(k: &Scalar) -> (Choice, [u64; 2], Choice, [u64; 2]) {
    let k_wide = widen(&k.0);

    let k_ca = mul_wide_small(&k_wide, C_A);
    let k_cb = mul_wide_2(&k_wide, &C_B);

    let r1 = scalar::round_div_q(k_ca);
    let r2 = scalar::round_div_q(k_cb);

    // a = k - r1*C_A - r2*C_B
    let r1_ca = mul4_small(&r1, C_A);
    let r2_cb = mul4x2(&r2, &C_B);
    let a_full = sub_mod_2_256(&sub_mod_2_256(&k.0, &r1_ca), &r2_cb);

    // b = r2*C_A - r1*C_B
    let r2_ca = mul4_small(&r2, C_A);
    let r1_cb = mul4x2(&r1, &C_B);
    let b_full = sub_mod_2_256(&r2_ca, &r1_cb);

    let (a_abs, sign_a) = abs_and_sign(&a_full);
    let (b_abs, sign_b) = abs_and_sign(&b_full);

    (sign_a, [a_abs[0], a_abs[1]], sign_b, [b_abs[0], b_abs[1]])
}

fn widen(x: &[u64; 4]) -> [u64; 8] {
    [x[0], x[1], x[2], x[3], 0, 0, 0, 0]
}

/// `x (8 limbs, < 2^379ish) * c (one limb)`, kept to 8 limbs (always fits:
/// `k < 2^256`, `C_A < 2^64`, so the product is `< 2^320`).
fn mul_wide_small(x: &[u64; 8], c: u64) -> [u64; 8] {
    let mut out = [0u64; 8];
    let mut carry = 0u128;
    for i in 0..8 {
        let r = x[i] as u128 * c as u128 + carry;
        out[i] = r as u64;
        carry = r >> 64;
    }
    out
}

/// `x (8 limbs) * c (two limbs, < 2^126)`, kept to 8 limbs (product is
/// `< 2^256 * 2^126 = 2^382`, so this keeps only the low 512 bits worth of
/// headroom the Barrett machinery actually needs; values this routine is
/// called with never set bits above limb 7 in practice).
fn mul_wide_2(x: &[u64; 8], c: &[u64; 2]) -> [u64; 8] {
    let mut out = [0u64; 8];
    for (j, &cj) in c.iter().enumerate() {
        let mut carry = 0u128;
        for i in 0..8 {
            if i + j >= 8 {
                break;
            }
            let r = out[i + j] as u128 + x[i] as u128 * cj as u128 + carry;
            out[i + j] = r as u64;
            carry = r >> 64;
        }
    }
    out
}

fn mul4_small(x: &[u64; 4], c: u64) -> [u64; 4] {
    let mut out = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let r = x[i] as u128 * c as u128 + carry;
        out[i] = r as u64;
        carry = r >> 64;
    }
    out
}

fn mul4x2(x: &[u64; 4], c: &[u64; 2]) -> [u64; 4] {
    let mut out = [0u64; 4];
    for (j, &cj) in c.iter().enumerate() {
        let mut carry = 0u128;
        for i in 0..4 {
            if i + j >= 4 {
                break;
            }
            let r = out[i + j] as u128 + x[i] as u128 * cj as u128 + carry;
            out[i + j] = r as u64;
            carry = r >> 64;
        }
    }
    out
}

/// Subtracts two values that may each be "negative" only in the sense of
/// wrapping mod `2^256`; the true sign is recovered afterwards by
/// [`abs_and_sign`] using the known bound `|a|, |b| < 2^128`.
fn sub_mod_2_256(x: &[u64; 4], y: &[u64; 4]) -> [u64; 4] {
    let mut out = [0u64; 4];
    let mut borrow = 0i128;
    for i in 0..4 {
        let d = x[i] as i128 - y[i] as i128 - borrow;
        if d < 0 {
            out[i] = (d + (1i128 << 64)) as u64;
            borrow = 1;
        } else {
            out[i] = d as u64;
            borrow = 0;
        }
    }
    out
}

/// Recovers `(|v|, sign)` for a value known to be `v` or `2^256 - |v|` with
/// `|v| < 2^128`: the high two limbs are zero in the first case and
/// `0xFFFF..FFFF` in the second.
fn abs_and_sign(v: &[u64; 4]) -> ([u64; 2], Choice) {
    let negative = v[3].ct_gt(&(1u64 << 63));
    let negated = {
        let mut borrow = 0i128;
        let mut out = [0u64; 4];
        for i in 0..4 {
            let d = 0i128 - v[i] as i128 - borrow;
            if d < 0 {
                out[i] = (d + (1i128 << 64)) as u64;
                borrow = 1;
            } else {
                out[i] = d as u64;
                borrow = 0;
            }
        }
        out
    };
    let chosen = [
        u64::conditional_select(&v[0], &negated[0], negative),
        u64::conditional_select(&v[1], &negated[1], negative),
    ];
    (chosen, negative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert_eq, property_test};

    #[test]
    fn decompose_matches_reference_vector() {
        // k, a, b from the reference decomposition test vector, already
        // converted to little-endian limbs.
        let k = Scalar([
            0x679dfe17d6ac412f,
            0x43f1c74edc9dc196,
            0xa8a8d98edb18e410,
            0x0985ee47c6f67e9e,
        ]);
        let expected_a: [u64; 2] = [0xc7620b2b8c69b128, 0x1354c079d167c5bc];
        let expected_b: [u64; 2] = [0x132501035cc11f8e, 0x12bcb74af1b58892];

        let (sign_a, a, sign_b, b) = decompose(&k);
        assert_eq!(bool::from(sign_a), false);
        assert_eq!(a, expected_a);
        assert_eq!(bool::from(sign_b), true);
        assert_eq!(b, expected_b);
    }

    #[test]
    fn decompose_recombines_to_k() {
        let k = Scalar([0x1122_3344_5566_7788, 0x99aa_bbcc_ddee_ff00, 0x1, 0]);
        let (sign_a, a, sign_b, b) = decompose(&k);
        let lambda = Scalar([
            0xcbf95d17bd8cf58f,
            0xa827c49cde94f5cc,
            0x0a9480ccbb42be2a,
            0x0ec2108006820e1a,
        ]);
        let a_s = Scalar([a[0], a[1], 0, 0]);
        let b_s = Scalar([b[0], b[1], 0, 0]);
        let a_signed = Scalar::conditional_select(&a_s, &a_s.neg_mod_q(), sign_a);
        let b_term = b_s.mul_mod_q(&lambda, None);
        let b_signed = Scalar::conditional_select(&b_term, &b_term.neg_mod_q(), sign_b);
        let recombined = a_signed.add_mod_q(&b_signed);
        assert_eq!(recombined, k);
    }

    /// `a*sign_a + b*sign_b*lambda == k (mod q)` for random `k` (§8 #9).
    #[property_test]
    fn decompose_recombines_to_k_for_random_scalars(k_limbs: [u64; 4]) {
        let k = Scalar(k_limbs).mod_q();
        let (sign_a, a, sign_b, b) = decompose(&k);
        let lambda = Scalar([
            0xcbf95d17bd8cf58f,
            0xa827c49cde94f5cc,
            0x0a9480ccbb42be2a,
            0x0ec2108006820e1a,
        ]);
        let a_s = Scalar([a[0], a[1], 0, 0]);
        let b_s = Scalar([b[0], b[1], 0, 0]);
        let a_signed = Scalar::conditional_select(&a_s, &a_s.neg_mod_q(), sign_a);
        let b_term = b_s.mul_mod_q(&lambda, None);
        let b_signed = Scalar::conditional_select(&b_term, &b_term.neg_mod_q(), sign_b);
        let recombined = a_signed.add_mod_q(&b_signed);
        prop_assert_eq!(recombined, k);
    }
}
