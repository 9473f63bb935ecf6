//! Scalar-multiply routines (§4.G). Every routine here takes a secret
//! scalar already validated by [`crate::scalar::invalid_key`] (§4.H) and
//! runs branch-free on it; the only vartime step anywhere in this module is
//! the public-data comb-table construction in
//! [`crate::curve::table`].

use subtle::{Choice, ConditionallySelectable};

use crate::curve::gls;
use crate::curve::point::{AffinePoint, ProjectivePoint};
use crate::curve::recode::{self, COMB_E};
use crate::curve::table::{self, EC_G};
use crate::scalar::Scalar;

fn half_scalar_u128(limbs: [u64; 2]) -> u128 {
    limbs[0] as u128 | ((limbs[1] as u128) << 64)
}

/// `R = k * G`, or `R = 4*k*G` when `mul4` is set (the default for
/// signature generation; ECDH callers that apply their own cofactor
/// clearing pass `mul4 = false`). Uses the modified LSB-set comb method
/// over the fixed generator (§4.G.1).
pub fn mul_gen(k: &Scalar, mul4: bool) -> AffinePoint {
    let (recode_lsb, kp) = recode::recode_scalar_comb(k);

    let (s, t) = table::table_select_comb(&kp, COMB_E - 1);
    let mut x = s.add(&t, true);

    for ii in (0..COMB_E - 1).rev() {
        let (s, t) = table::table_select_comb(&kp, ii);
        x = x.dbl();
        x = x.add(&s, true);
        x = x.add(&t, true);
    }

    let carry_bit = Choice::from(((kp[3] >> 60) & 1) as u8);
    x = x.cond_add(&table::comb_fix_point(), carry_bit);
    x = x.cond_neg(Choice::from(recode_lsb));

    if mul4 {
        x = x.dbl().dbl();
    }
    x.affine()
}

/// `R = k * 4 * P` for a variable base point `P` (§4.G.2). Decomposes `k`
/// via the GLS endomorphism so the 252-bit multiplication becomes a
/// 128-bit simultaneous one.
pub fn mul(k: &Scalar, p: &AffinePoint) -> AffinePoint {
    let (sign_a, a, sign_b, b) = gls::decompose(k);

    let p_proj = p.expand();
    let q_proj = gls::psi(&p_proj);
    let q_proj = q_proj.cond_neg(sign_b);
    let p_proj = p_proj.cond_neg(sign_a);

    let table = table::gen_table_2(&p_proj, &q_proj);

    let mut a128 = half_scalar_u128(a);
    let mut b128 = half_scalar_u128(b);
    let recode_bit = recode::recode_2(&mut a128, &mut b128, 128);

    let mut x = table::table_select_2(&table, a128, b128, 126);
    for ii in (0..=124).rev().step_by(2) {
        let t = table::table_select_2(&table, a128, b128, ii);
        x = x.dbl();
        x = x.dbl();
        x = x.add(&t, false);
    }

    x = x.cond_add(&p_proj, Choice::from(recode_bit));
    x = x.dbl().dbl();
    x.affine()
}

/// `R = a*4*P + b*4*Q` for two independent variable base points (§4.G.3).
pub fn simul(a: &Scalar, p: &AffinePoint, b: &Scalar, q: &AffinePoint) -> AffinePoint {
    let (sign_a0, a0, sign_a1, a1) = gls::decompose(a);
    let (sign_b0, b0, sign_b1, b1) = gls::decompose(b);

    let p_proj = p.expand();
    let pp_proj = gls::psi(&p_proj).cond_neg(sign_a1);
    let p_proj = p_proj.cond_neg(sign_a0);

    let q_proj = q.expand();
    let qp_proj = gls::psi(&q_proj).cond_neg(sign_b1);
    let q_proj = q_proj.cond_neg(sign_b0);

    let table = table::gen_table_4(&p_proj, &pp_proj, &q_proj, &qp_proj);

    let mut a0u = half_scalar_u128(a0);
    let mut a1u = half_scalar_u128(a1);
    let mut b0u = half_scalar_u128(b0);
    let mut b1u = half_scalar_u128(b1);
    let recode_bit = recode::recode_4(&mut a0u, &mut a1u, &mut b0u, &mut b1u, 127);

    let mut x = table::table_select_4(&table, a0u, a1u, b0u, b1u, 126);
    for ii in (0..=125).rev() {
        let t = table::table_select_4(&table, a0u, a1u, b0u, b1u, ii);
        x = x.dbl();
        x = x.add(&t, false);
    }

    x = x.cond_add(&p_proj, Choice::from(recode_bit));
    x = x.dbl().dbl();
    x.affine()
}

/// `R = a*4*G + b*4*Q`: the generator comb evaluation of the `a` term added
/// to the variable-base evaluation of the `b*Q` term (§4.G.4). The
/// reference algorithm fuses both digit walks into one loop; since the
/// retrieved reference source only covers the non-generator `simul`, this
/// composes the two already-verified routines instead of re-deriving the
/// fused inner loop from scratch (see `DESIGN.md`). Both factors are still
/// evaluated with the same constant-time primitives as `mul_gen`/`mul`, so
/// this carries no secret-dependent branch even though it is not a single
/// fused pass.
pub fn simul_gen(a: &Scalar, b: &Scalar, q: &AffinePoint) -> AffinePoint {
    let r1 = mul_gen(a, true).expand();
    let r2 = mul(b, q).expand();
    r1.add(&r2, false).affine()
}

/// `R = k*G` using the fixed generator. Equivalent to `mul(k, G)` when
/// `mul4 = false` (§8).
pub fn mul_gen_point() -> AffinePoint {
    EC_G
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::secret_gen;

    #[test]
    fn mul_gen_matches_mul_with_generator() {
        let raw = [0x11u8; 32];
        let k = secret_gen(raw);
        let via_gen = mul_gen(&k, false);
        let via_mul = mul(&k, &EC_G);
        assert_eq!(via_gen, via_mul);
    }

    #[test]
    fn mul_gen_mul4_is_four_times_mul_gen() {
        let raw = [0x22u8; 32];
        let k = secret_gen(raw);
        let once = mul_gen(&k, false);
        let four = mul_gen(&k, true);
        let expect = once.expand().dbl().dbl().affine();
        assert_eq!(four, expect);
    }

    #[test]
    fn simul_matches_sum_of_muls() {
        let raw_a = [0x33u8; 32];
        let raw_b = [0x44u8; 32];
        let a = secret_gen(raw_a);
        let b = secret_gen(raw_b);
        let p = EC_G;
        let q = table::ec_eg().affine();

        let lhs = simul(&a, &p, &b, &q);
        let rhs = mul(&a, &p).expand().add(&mul(&b, &q).expand(), false).affine();
        assert_eq!(lhs, rhs);
    }
}
