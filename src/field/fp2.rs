//! Arithmetic in the quadratic extension `Fp2 = Fp[i] / (i^2 + 1)`.
//!
//! Elements are pairs `(a, b)` representing `a + b*i`. `u = 2 + i` is the
//! fixed non-square used both to build the curve coefficients (§4.C) and as
//! the companion of the GLS endomorphism (§4.D).

use core::ops::{Add, Mul, Neg, Sub};

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use super::fp::Fp;

/// An element of `Fp2`, `a + b*i`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Fp2 {
    pub a: Fp,
    pub b: Fp,
}

impl Fp2 {
    /// The additive identity.
    pub const ZERO: Fp2 = Fp2 {
        a: Fp::ZERO,
        b: Fp::ZERO,
    };
    /// The multiplicative identity.
    pub const ONE: Fp2 = Fp2 {
        a: Fp::ONE,
        b: Fp::ZERO,
    };
    /// The non-residue `u = 2 + i` used to twist the curve coefficients.
    pub const U: Fp2 = Fp2 {
        a: Fp::from_u64(2),
        b: Fp::ONE,
    };

    /// Builds `a + b*i` from two field elements.
    #[inline]
    pub const fn new(a: Fp, b: Fp) -> Fp2 {
        Fp2 { a, b }
    }

    #[inline]
    pub fn add(&self, rhs: &Fp2) -> Fp2 {
        Fp2::new(self.a.add(&rhs.a), self.b.add(&rhs.b))
    }

    #[inline]
    pub fn sub(&self, rhs: &Fp2) -> Fp2 {
        Fp2::new(self.a.sub(&rhs.a), self.b.sub(&rhs.b))
    }

    #[inline]
    pub fn neg(&self) -> Fp2 {
        Fp2::new(self.a.neg(), self.b.neg())
    }

    #[inline]
    pub fn double(&self) -> Fp2 {
        Fp2::new(self.a.double(), self.b.double())
    }

    /// `(a+bi)(c+di) = (ac-bd) + (ad+bc)i`, computed with three `Fp` muls
    /// via the Karatsuba identity `ad+bc = (a+b)(c+d) - ac - bd`.
    pub fn mul(&self, rhs: &Fp2) -> Fp2 {
        let ac = self.a.mul(&rhs.a);
        let bd = self.b.mul(&rhs.b);
        let t = (self.a.add(&self.b)).mul(&rhs.a.add(&rhs.b));
        Fp2::new(ac.sub(&bd), t.sub(&ac).sub(&bd))
    }

    /// `(a+bi)^2 = (a^2 - b^2) + 2ab*i`, two `Fp` muls.
    pub fn square(&self) -> Fp2 {
        let a2 = self.a.add(&self.a);
        Fp2::new(
            self.a.add(&self.b).mul(&self.a.sub(&self.b)),
            a2.mul(&self.b),
        )
    }

    /// Multiplies by the fixed non-residue `u = 2 + i`:
    /// `(a+bi)(2+i) = (2a-b) + (a+2b)i`.
    pub fn mul_u(&self) -> Fp2 {
        Fp2::new(
            self.a.double().sub(&self.b),
            self.a.add(&self.b.double()),
        )
    }

    /// Complex conjugate, `(a, -b)`. Equals the `p`-power Frobenius on
    /// `Fp2` since `p ≡ 3 (mod 4)`.
    #[inline]
    pub fn conj(&self) -> Fp2 {
        Fp2::new(self.a, self.b.neg())
    }

    /// Multiplies by a small public `u32` constant, componentwise.
    pub fn mul_small_k(&self, k: u32) -> Fp2 {
        Fp2::new(self.a.mul_small_k(k), self.b.mul_small_k(k))
    }

    /// `(a+bi)^-1 = (a-bi) / (a^2+b^2)`: one `Fp` inversion, three muls.
    pub fn invert(&self) -> Fp2 {
        let norm = self.a.square().add(&self.b.square());
        let norm_inv = norm.invert();
        Fp2::new(self.a.mul(&norm_inv), self.b.neg().mul(&norm_inv))
    }

    /// Square root in `Fp2`, via the standard two-step method: find
    /// `r = sqrt(a^2+b^2)` in `Fp` (requires the norm to be a QR), then
    /// `x = sqrt((a+r)/2)` and `y = b / (2x)`. Returns a validity [`Choice`]
    /// without branching on it, so callers on secret data must still use
    /// the mask rather than an early return.
    pub fn sqrt(&self) -> (Fp2, Choice) {
        let norm = self.a.square().add(&self.b.square());
        let (r, r_is_sq) = norm.sqrt();
        let r = r.complete_reduce();

        let two_inv = Fp::from_u64(2).invert();
        let x2_plus = self.a.add(&r).mul(&two_inv);
        let x2_minus = self.a.sub(&r).mul(&two_inv);

        let (x_plus, plus_is_sq) = x2_plus.sqrt();
        let (x_minus, _minus_is_sq) = x2_minus.sqrt();

        let use_plus = plus_is_sq;
        let x = Fp::conditional_select(&x_minus, &x_plus, use_plus);

        let x_is_zero = x.complete_reduce().ct_eq(&Fp::ZERO);
        let x_inv = Fp::conditional_select(&x, &Fp::ONE, x_is_zero).invert();
        let two_x_inv = x_inv.mul(&Fp::from_u64(2).invert());
        let y = self.b.mul(&two_x_inv);

        let candidate = Fp2::new(x, y);
        let matches = candidate.square().equal_ct(self);
        (candidate, r_is_sq & matches)
    }

    /// Componentwise constant-time equality (after complete reduction).
    #[inline]
    pub fn equal_ct(&self, rhs: &Fp2) -> Choice {
        self.a.equal_ct(&rhs.a) & self.b.equal_ct(&rhs.b)
    }

    /// Constant-time zero check.
    #[inline]
    pub fn is_zero_ct(&self) -> Choice {
        self.equal_ct(&Fp2::ZERO)
    }

    /// Vartime range check: both components canonical and `< p`.
    #[inline]
    pub fn in_field_vartime(&self) -> bool {
        self.a.in_field_vartime() && self.b.in_field_vartime()
    }

    /// Applies an all-ones/all-zeros mask: selects `rhs` in place of `self`
    /// when `mask` is all-ones.
    #[inline]
    pub fn set_mask(&self, rhs: &Fp2, mask: Choice) -> Fp2 {
        Fp2::conditional_select(self, rhs, mask)
    }

    /// XORs `rhs` into `self` when `mask` is all-ones (used to accumulate
    /// masked table entries without a branch).
    #[inline]
    pub fn xor_mask(&self, rhs: &Fp2, mask: Choice) -> Fp2 {
        self.add(&Fp2::conditional_select(&Fp2::ZERO, rhs, mask))
    }

    /// Conditionally negates `self` when `mask` is all-ones.
    #[inline]
    pub fn neg_mask(&self, mask: Choice) -> Fp2 {
        Fp2::conditional_select(self, &self.neg(), mask)
    }

    /// Serializes as 32 little-endian bytes (`a` then `b`, 16 bytes each).
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.a.to_bytes());
        out[16..].copy_from_slice(&self.b.to_bytes());
        out
    }

    /// Deserializes 32 little-endian bytes, rejecting non-canonical
    /// components.
    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Fp2> {
        let mut a_bytes = [0u8; 16];
        let mut b_bytes = [0u8; 16];
        a_bytes.copy_from_slice(&bytes[..16]);
        b_bytes.copy_from_slice(&bytes[16..]);
        let a = Fp::from_bytes(&a_bytes)?;
        let b = Fp::from_bytes(&b_bytes)?;
        Some(Fp2::new(a, b))
    }
}

impl ConstantTimeEq for Fp2 {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.equal_ct(other)
    }
}

impl ConditionallySelectable for Fp2 {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Fp2::new(
            Fp::conditional_select(&a.a, &b.a, choice),
            Fp::conditional_select(&a.b, &b.b, choice),
        )
    }
}

impl PartialEq for Fp2 {
    fn eq(&self, other: &Fp2) -> bool {
        self.equal_ct(other).into()
    }
}
impl Eq for Fp2 {}

impl<'b> Add<&'b Fp2> for &Fp2 {
    type Output = Fp2;
    fn add(self, rhs: &'b Fp2) -> Fp2 {
        Fp2::add(self, rhs)
    }
}
define_add_variants!(LHS = Fp2, RHS = Fp2, Output = Fp2);
define_add_assign_variants!(LHS = Fp2, RHS = Fp2);

impl<'b> Sub<&'b Fp2> for &Fp2 {
    type Output = Fp2;
    fn sub(self, rhs: &'b Fp2) -> Fp2 {
        Fp2::sub(self, rhs)
    }
}
define_sub_variants!(LHS = Fp2, RHS = Fp2, Output = Fp2);
define_sub_assign_variants!(LHS = Fp2, RHS = Fp2);

impl<'b> Mul<&'b Fp2> for &Fp2 {
    type Output = Fp2;
    fn mul(self, rhs: &'b Fp2) -> Fp2 {
        Fp2::mul(self, rhs)
    }
}
define_mul_variants!(LHS = Fp2, RHS = Fp2, Output = Fp2);
define_mul_assign_variants!(LHS = Fp2, RHS = Fp2);

impl Neg for Fp2 {
    type Output = Fp2;
    fn neg(self) -> Fp2 {
        Fp2::neg(&self)
    }
}
impl Neg for &Fp2 {
    type Output = Fp2;
    fn neg(self) -> Fp2 {
        Fp2::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_u_matches_definition() {
        let x = Fp2::new(Fp::from_u64(7), Fp::from_u64(11));
        let direct = x.mul(&Fp2::U);
        let viaformula = x.mul_u();
        assert_eq!(direct, viaformula);
    }

    #[test]
    fn invert_roundtrip() {
        let x = Fp2::new(Fp::from_u64(3), Fp::from_u64(5));
        let inv = x.invert();
        assert_eq!(x.mul(&inv), Fp2::ONE);
    }

    #[test]
    fn conj_is_involution() {
        let x = Fp2::new(Fp::from_u64(123), Fp::from_u64(456));
        assert_eq!(x.conj().conj(), x);
    }

    #[test]
    fn sqrt_of_square() {
        let x = Fp2::new(Fp::from_u64(9), Fp::from_u64(4));
        let sq = x.square();
        let (r, is_sq) = sq.sqrt();
        assert_eq!(is_sq.unwrap_u8(), 1);
        assert_eq!(r.square(), sq);
    }

    #[test]
    fn bytes_roundtrip() {
        let x = Fp2::new(Fp::from_u64(0xAAAA), Fp::from_u64(0xBBBB));
        let bytes = x.to_bytes();
        let back = Fp2::from_bytes(&bytes).unwrap();
        assert_eq!(x, back);
    }
}
