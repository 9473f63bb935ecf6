//! Arithmetic in the 127-bit prime field `Fp = Z / (2^127 - 1)`.
//!
//! Elements are native `u128` values. Most routines keep results in the
//! "incomplete reduction" (IR) range `[0, 2p)` rather than `[0, p)`; a
//! dedicated [`Fp::complete_reduce`] is used before serialization or
//! comparison. This mirrors the header comment in the original C reference:
//! every routine here is branchless, tolerates aliased in/out arguments, and
//! assumes its inputs already have a clear high bit.

use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

/// `p = 2^127 - 1`.
pub const MODULUS: u128 = (1u128 << 127) - 1;

/// An element of `Fp`, stored as an unsigned 128-bit integer in `[0, 2p)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Fp(pub(crate) u128);

impl Fp {
    /// The additive identity.
    pub const ZERO: Fp = Fp(0);
    /// The multiplicative identity.
    pub const ONE: Fp = Fp(1);

    /// Builds an `Fp` from a raw limb already known to be `< 2p`.
    #[inline]
    pub const fn from_raw(x: u128) -> Fp {
        Fp(x)
    }

    /// Builds an `Fp` from a small constant.
    #[inline]
    pub const fn from_u64(x: u64) -> Fp {
        Fp(x as u128)
    }

    /// `a + b`, folding the one-bit overflow of the 127-bit addition back in.
    ///
    /// Result is `< 2p`.
    #[inline]
    pub fn add(&self, rhs: &Fp) -> Fp {
        let r = self.0 + rhs.0;
        Fp((r & MODULUS) + (r >> 127))
    }

    /// `a - b`, computed as `a - b + 2p` followed by one fold.
    #[inline]
    pub fn sub(&self, rhs: &Fp) -> Fp {
        // self.0, rhs.0 < 2p, so self.0 + 2p - rhs.0 never underflows and is < 4p.
        let r = self.0 + 2 * MODULUS - rhs.0;
        Fp((r & MODULUS) + (r >> 127))
    }

    /// Additive inverse, `p - a` folded into IR range.
    #[inline]
    pub fn neg(&self) -> Fp {
        Fp::ZERO.sub(self)
    }

    /// `2a`.
    #[inline]
    pub fn double(&self) -> Fp {
        self.add(self)
    }

    /// `a / 2`, exploiting that `p` is odd: if `a` is odd, add `p` first to
    /// clear the low bit without changing the residue.
    #[inline]
    pub fn div2(&self) -> Fp {
        let odd_mask = (self.0 & 1).wrapping_neg();
        let adjusted = self.0 + (odd_mask & MODULUS);
        Fp(adjusted >> 1)
    }

    /// Multiply by a small public `u32` constant (no reduction of the
    /// constant is required since products stay within 159 bits).
    #[inline]
    pub fn mul_small_k(&self, k: u32) -> Fp {
        let hi_lo = widening_mul(self.0, k as u128);
        reduce254(hi_lo.0, hi_lo.1)
    }

    /// `a + k` for a small public constant `k`.
    #[inline]
    pub fn add_small(&self, k: u64) -> Fp {
        self.add(&Fp::from_u64(k))
    }

    /// `a * b`: schoolbook 128x128 -> 256-bit multiply, then fold the
    /// 254-bit product modulo `2^127 - 1` by adding the high half back into
    /// the low half (since `2^127 = 1` in this field).
    #[inline]
    pub fn mul(&self, rhs: &Fp) -> Fp {
        let (lo, hi) = widening_mul(self.0, rhs.0);
        reduce254(lo, hi)
    }

    /// `a^2`.
    #[inline]
    pub fn square(&self) -> Fp {
        self.mul(self)
    }

    /// `a^(p-2)`, the Fermat inverse via fixed square-and-multiply. The
    /// exponent `p - 2` is public, so branching on its bits is safe; the
    /// secret is only ever the multiplicand `a`.
    pub fn invert(&self) -> Fp {
        let exp = MODULUS - 1; // p - 2
        let mut result = Fp::ONE;
        let mut base = *self;
        let mut e = exp;
        while e != 0 {
            if e & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.square();
            e >>= 1;
        }
        result
    }

    /// Legendre symbol `chi(x) = x^((p-1)/2)`, returning `+1`, `0`, or the
    /// field representation of `-1` (i.e. `p - 1` after complete reduction).
    pub fn chi(&self) -> Fp {
        let exp = (MODULUS - 1) / 2;
        let mut result = Fp::ONE;
        let mut base = *self;
        let mut e = exp;
        while e != 0 {
            if e & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.square();
            e >>= 1;
        }
        result.complete_reduce()
    }

    /// `sqrt(x)` for `p ≡ 3 (mod 4)`: candidate root is `x^((p+1)/4)`.
    ///
    /// Returns the candidate root together with a [`Choice`] indicating
    /// whether it actually squares back to `x` (i.e. `x` was a QR).
    pub fn sqrt(&self) -> (Fp, Choice) {
        let exp = (MODULUS + 1) / 4;
        let mut result = Fp::ONE;
        let mut base = *self;
        let mut e = exp;
        while e != 0 {
            if e & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.square();
            e >>= 1;
        }
        let check = result.square().ct_eq(&self.complete_reduce());
        (result, check)
    }

    /// Forces the value into canonical `[0, p)` range.
    #[inline]
    pub fn complete_reduce(&self) -> Fp {
        let reduced = self.0 & MODULUS;
        let carry = self.0 >> 127;
        let mut r = reduced + carry;
        // r can equal p exactly when self.0 == 2p - 1 + carry edge cases;
        // fold once more without branching.
        let ge_p = Choice::from((r >= MODULUS) as u8);
        let sub = u128::conditional_select(&0, &MODULUS, ge_p);
        r -= sub;
        Fp(r)
    }

    /// Constant-time equality that first forces both sides to canonical
    /// form, so the `p ≡ 0` ambiguity of the IR representation never leaks.
    #[inline]
    pub fn equal_ct(&self, rhs: &Fp) -> Choice {
        self.complete_reduce().0.ct_eq(&rhs.complete_reduce().0)
    }

    /// Vartime range check, `x < p`. Only ever used on public data.
    #[inline]
    pub fn in_field_vartime(&self) -> bool {
        self.0 < MODULUS
    }

    /// Vartime check for oddness of the canonical representative.
    #[inline]
    pub fn is_odd_vartime(&self) -> bool {
        self.complete_reduce().0 & 1 == 1
    }

    /// Serializes the canonical representative as 16 little-endian bytes.
    /// The top bit is always zero since `p < 2^127`.
    pub fn to_bytes(&self) -> [u8; 16] {
        self.complete_reduce().0.to_le_bytes()
    }

    /// Deserializes 16 little-endian bytes. Returns `None` if the value is
    /// not a canonical representative (top bit set, or `>= p`).
    pub fn from_bytes(bytes: &[u8; 16]) -> Option<Fp> {
        let x = u128::from_le_bytes(*bytes);
        if x >> 127 != 0 || x >= MODULUS {
            return None;
        }
        Some(Fp(x))
    }
}

impl ConstantTimeEq for Fp {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.equal_ct(other)
    }
}

impl ConditionallySelectable for Fp {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Fp(u128::conditional_select(&a.0, &b.0, choice))
    }
}

impl PartialEq for Fp {
    fn eq(&self, other: &Fp) -> bool {
        self.equal_ct(other).into()
    }
}
impl Eq for Fp {}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes().iter().rev() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl<'b> Add<&'b Fp> for &Fp {
    type Output = Fp;
    fn add(self, rhs: &'b Fp) -> Fp {
        Fp::add(self, rhs)
    }
}
define_add_variants!(LHS = Fp, RHS = Fp, Output = Fp);
define_add_assign_variants!(LHS = Fp, RHS = Fp);

impl<'b> Sub<&'b Fp> for &Fp {
    type Output = Fp;
    fn sub(self, rhs: &'b Fp) -> Fp {
        Fp::sub(self, rhs)
    }
}
define_sub_variants!(LHS = Fp, RHS = Fp, Output = Fp);
define_sub_assign_variants!(LHS = Fp, RHS = Fp);

impl<'b> Mul<&'b Fp> for &Fp {
    type Output = Fp;
    fn mul(self, rhs: &'b Fp) -> Fp {
        Fp::mul(self, rhs)
    }
}
define_mul_variants!(LHS = Fp, RHS = Fp, Output = Fp);
define_mul_assign_variants!(LHS = Fp, RHS = Fp);

impl Neg for Fp {
    type Output = Fp;
    fn neg(self) -> Fp {
        Fp::neg(&self)
    }
}
impl Neg for &Fp {
    type Output = Fp;
    fn neg(self) -> Fp {
        Fp::neg(self)
    }
}

/// 128x128 -> 256-bit widening multiply, returned as (low128, high128).
#[inline]
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    let mid = (lo_lo >> 64) + (lo_hi & 0xFFFF_FFFF_FFFF_FFFF) + (hi_lo & 0xFFFF_FFFF_FFFF_FFFF);
    let lo = (lo_lo & 0xFFFF_FFFF_FFFF_FFFF) | (mid << 64);
    let hi = hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (mid >> 64);
    (lo, hi)
}

/// Reduces a 254-bit-or-smaller product `lo + hi*2^128` modulo `2^127 - 1`,
/// using the identity `2^127 ≡ 1`. Input product must be `< 2^254`-ish (the
/// product of two values `< 2p`), so `hi < 2^126`; the fold below brings the
/// result into `[0, 2p)`.
#[inline]
fn reduce254(lo: u128, hi: u128) -> Fp {
    // product = lo + hi * 2^128 = lo + (hi * 2) * 2^127 ≡ lo + 2*hi (mod p)
    let r = (lo & MODULUS) + (lo >> 127) + 2 * hi;
    Fp((r & MODULUS) + (r >> 127))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, prop_assert_eq, prop_assume, property_test};

    /// Reduces an arbitrary `u128` into a valid canonical field element.
    fn elem(raw: u128) -> Fp {
        Fp(raw).complete_reduce()
    }

    #[test]
    fn add_sub_roundtrip() {
        let a = Fp::from_u64(12345);
        let b = Fp::from_u64(67890);
        let c = a.add(&b).sub(&b);
        assert_eq!(c.complete_reduce().0, a.complete_reduce().0);
    }

    #[test]
    fn neg_is_additive_inverse() {
        let a = Fp::from_u64(0xDEAD_BEEF);
        let z = a.add(&a.neg()).complete_reduce();
        assert_eq!(z.0, 0);
    }

    #[test]
    fn mul_identity() {
        let a = Fp::from_u64(424242);
        assert_eq!(a.mul(&Fp::ONE).complete_reduce().0, a.complete_reduce().0);
    }

    #[test]
    fn invert_roundtrip() {
        let a = Fp::from_u64(7);
        let inv = a.invert();
        let prod = a.mul(&inv).complete_reduce();
        assert_eq!(prod.0, 1);
    }

    #[test]
    fn sqrt_of_square() {
        let a = Fp::from_u64(999_983);
        let sq = a.square();
        let (r, is_sq) = sq.sqrt();
        assert_eq!(is_sq.unwrap_u8(), 1);
        let back = r.square().complete_reduce();
        assert_eq!(back.0, sq.complete_reduce().0);
    }

    #[test]
    fn complete_reduce_bounds() {
        let near_p = Fp(MODULUS - 1);
        assert!(near_p.complete_reduce().in_field_vartime());
        let exactly_p = Fp(MODULUS);
        assert_eq!(exactly_p.complete_reduce().0, 0);
    }

    #[test]
    fn bytes_roundtrip() {
        let a = Fp::from_u64(0x1122_3344_5566_7788);
        let bytes = a.to_bytes();
        let back = Fp::from_bytes(&bytes).unwrap();
        assert_eq!(a, back);
    }

    /// `a + (-a) == 0` for arbitrary field elements (§8 #1).
    #[property_test]
    fn add_neg_is_zero(raw: u128) {
        let a = elem(raw);
        prop_assert_eq!(a.add(&a.neg()).complete_reduce().0, 0);
    }

    /// `a * a^-1 == 1` for arbitrary nonzero field elements (§8 #2).
    #[property_test]
    fn mul_invert_is_one(raw: u128) {
        let a = elem(raw);
        prop_assume!(!bool::from(a.equal_ct(&Fp::ZERO)));
        let prod = a.mul(&a.invert()).complete_reduce();
        prop_assert_eq!(prod.0, 1);
    }

    /// `sqrt(a^2)^2 == a^2` for arbitrary field elements (§8 #3).
    #[property_test]
    fn sqrt_of_square_holds(raw: u128) {
        let a = elem(raw);
        let sq = a.square();
        let (r, is_sq) = sq.sqrt();
        prop_assert!(bool::from(is_sq));
        prop_assert_eq!(r.square().complete_reduce().0, sq.complete_reduce().0);
    }

    /// `chi(a^2)` is never `-1`: squares are always quadratic residues (§8 #4).
    #[property_test]
    fn chi_of_square_is_not_nonresidue(raw: u128) {
        let a = elem(raw);
        let chi = a.square().chi();
        prop_assert!(chi.0 != MODULUS - 1);
    }
}
