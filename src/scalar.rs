//! Scalar field arithmetic modulo the prime group order `q` (§4.E).
//!
//! Scalars are 256-bit little-endian integers held as four `u64` limbs.
//! `q = 2^252 + 0x0A6261414C0DC87D3CE9B68E3B09E01A5`, a 252-bit prime whose
//! top four bits are always zero. Multiply-accumulate and reduction use a
//! Barrett-style unsigned division against a precomputed 384-bit reciprocal,
//! so no division instruction (and no secret-dependent branch) is ever
//! needed on the hot path.

use rand_core::{CryptoRng, RngCore};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};

/// The prime group order `q`, least-significant limb first.
pub const Q: [u64; 4] = [
    0xCE9B68E3B09E01A5,
    0xA6261414C0DC87D3,
    0xFFFFFFFFFFFFFFFF,
    0x0FFFFFFFFFFFFFFF,
];

/// Barrett reciprocal `m' = floor(2^(N+l)/q) - 2^N + 1` for `N = 508`,
/// `l = 252`, least-significant limb first.
const M1: [u64; 6] = [
    0xB91DD2622FBD3D66,
    0x6D91A79575334CAC,
    0xE95EB7B0E1A98856,
    0xF893F8B602171C88,
    0x3164971C4F61FE5C,
    0x59D9EBEB3F23782C,
];

/// A scalar in `[0, 2^256)` represented as four 64-bit limbs, little-endian.
///
/// This type does not by itself guarantee canonicity mod `q`; callers that
/// need a validated secret scalar should run [`mask_scalar`] or check
/// [`invalid_key`] first, per §4.H.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, zeroize::Zeroize)]
pub struct Scalar(pub [u64; 4]);

impl Scalar {
    /// The zero scalar.
    pub const ZERO: Scalar = Scalar([0, 0, 0, 0]);
    /// The multiplicative identity.
    pub const ONE: Scalar = Scalar([1, 0, 0, 0]);
    /// The group order, as a `Scalar`.
    pub const Q: Scalar = Scalar(Q);

    /// Little-endian byte deserialization.
    pub fn from_bytes(bytes: &[u8; 32]) -> Scalar {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            limbs[i] = u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
        }
        Scalar(limbs)
    }

    /// Little-endian byte serialization.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..4 {
            out[i * 8..i * 8 + 8].copy_from_slice(&self.0[i].to_le_bytes());
        }
        out
    }

    /// Constant-time `self < q`.
    pub fn less_q(&self) -> Choice {
        ct_lt4(&self.0, &Q)
    }

    /// Constant-time `self == 0`.
    pub fn is_zero(&self) -> Choice {
        self.0[0].ct_eq(&0) & self.0[1].ct_eq(&0) & self.0[2].ct_eq(&0) & self.0[3].ct_eq(&0)
    }

    /// Clears the top 5 bits of limb 3, forcing the value below `2^251 < q`.
    /// Used to turn a random 256-bit buffer into a candidate secret scalar;
    /// never fails, since `q`'s top four bits are already zero.
    pub fn mask_scalar(mut self) -> Scalar {
        self.0[3] &= 0x07FF_FFFF_FFFF_FFFF;
        self
    }

    /// `(q - self) mod q`, branch-free.
    pub fn neg_mod_q(&self) -> Scalar {
        let (diff, _borrow) = ct_sub4(&Q, &self.0);
        Scalar(diff)
    }

    /// `(self + rhs) mod q`.
    pub fn add_mod_q(&self, rhs: &Scalar) -> Scalar {
        let (sum, carry) = add4_with_carry(&self.0, &rhs.0);
        let mut wide = [0u64; 8];
        wide[..4].copy_from_slice(&sum);
        wide[4] = carry;
        let (_q, rem) = barrett_divmod(wide);
        Scalar(rem)
    }

    /// `(self * rhs + z) mod q`, `z` optional. `self`, `rhs` may be full
    /// 256-bit values on input; the contract (§4.E) is `0 < self, 0 < rhs <
    /// q, z < q`.
    pub fn mul_mod_q(&self, rhs: &Scalar, z: Option<&Scalar>) -> Scalar {
        let mut p = mul4x4(&self.0, &rhs.0);
        if let Some(z) = z {
            let (sum, carry) = add4_with_carry(&p[..4].try_into().unwrap(), &z.0);
            p[..4].copy_from_slice(&sum);
            let mut k = 4;
            let mut c = carry;
            while c != 0 && k < 8 {
                let (s, nc) = adc(p[k], c, 0);
                p[k] = s;
                c = nc;
                k += 1;
            }
        }
        let (_q, rem) = barrett_divmod(p);
        Scalar(rem)
    }

    /// `self mod q` for a scalar that may occupy the full 256 bits (used
    /// directly by [`mod_q`] on a 512-bit buffer via [`Scalar::mod_q_wide`]).
    pub fn mod_q(&self) -> Scalar {
        let mut wide = [0u64; 8];
        wide[..4].copy_from_slice(&self.0);
        let (_q, rem) = barrett_divmod(wide);
        Scalar(rem)
    }

    /// `x mod q` for a full 512-bit little-endian input (eight limbs).
    pub fn mod_q_wide(x: &[u64; 8]) -> Scalar {
        let (_q, rem) = barrett_divmod(*x);
        Scalar(rem)
    }

    /// Draws a fresh secret scalar from `rng` and masks it (§4.H). Never
    /// fails: masking alone is enough to land in `(0, q)` with overwhelming
    /// probability for any sound RNG.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Scalar {
        let mut raw = [0u8; 32];
        rng.fill_bytes(&mut raw);
        secret_gen(raw)
    }
}

impl ConstantTimeEq for Scalar {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[0].ct_eq(&other.0[0])
            & self.0[1].ct_eq(&other.0[1])
            & self.0[2].ct_eq(&other.0[2])
            & self.0[3].ct_eq(&other.0[3])
    }
}

impl ConditionallySelectable for Scalar {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut out = [0u64; 4];
        for i in 0..4 {
            out[i] = u64::conditional_select(&a.0[i], &b.0[i], choice);
        }
        Scalar(out)
    }
}

/// `true` iff `k == 0` or `k >= q`. Allowed to run in variable time: per
/// §4.H this check only ever leaks "the caller handed us a bad scalar".
pub fn invalid_key(k: &Scalar) -> bool {
    bool::from(k.is_zero()) || !bool::from(k.less_q())
}

/// Masks a raw 256-bit buffer into a scalar usable as a secret key. Never
/// fails.
pub fn secret_gen(raw: [u8; 32]) -> Scalar {
    Scalar::from_bytes(&raw).mask_scalar()
}

// ---------------------------------------------------------------------
// Wide-integer helpers. All are constant-time except where noted, and all
// operate on fixed-size arrays (no heap allocation).
// ---------------------------------------------------------------------

#[inline(always)]
fn mac(acc: u64, a: u64, b: u64, carry: u64) -> (u64, u64) {
    let r = acc as u128 + (a as u128) * (b as u128) + carry as u128;
    (r as u64, (r >> 64) as u64)
}

#[inline(always)]
fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let r = a as u128 + b as u128 + carry as u128;
    (r as u64, (r >> 64) as u64)
}

#[inline(always)]
fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let r = (a as u128).wrapping_sub(b as u128).wrapping_sub(borrow as u128);
    (r as u64, (r >> 127) as u64 & 1)
}

/// Schoolbook multiply of two 4-limb numbers into an 8-limb product.
fn mul4x4(x: &[u64; 4], y: &[u64; 4]) -> [u64; 8] {
    let mut p = [0u64; 8];
    for i in 0..4 {
        let mut carry = 0u64;
        for j in 0..4 {
            let (lo, c) = mac(p[i + j], x[i], y[j], carry);
            p[i + j] = lo;
            carry = c;
        }
        let mut k = i + 4;
        let mut c = carry;
        while c != 0 {
            let (lo, nc) = adc(p[k], c, 0);
            p[k] = lo;
            c = nc;
            k += 1;
        }
    }
    p
}

/// Schoolbook multiply of a 6-limb number by an 8-limb number into a
/// 14-limb product. Used only for the Barrett reciprocal multiply.
fn mul6x8(x: &[u64; 6], y: &[u64; 8]) -> [u64; 14] {
    let mut p = [0u64; 14];
    for i in 0..6 {
        let mut carry = 0u64;
        for j in 0..8 {
            let (lo, c) = mac(p[i + j], x[i], y[j], carry);
            p[i + j] = lo;
            carry = c;
        }
        let mut k = i + 8;
        let mut c = carry;
        while c != 0 {
            let (lo, nc) = adc(p[k], c, 0);
            p[k] = lo;
            c = nc;
            k += 1;
        }
    }
    p
}

/// `x * EC_Q`, keeping only the low 4 limbs (`mod 2^256`).
fn mul4x4_low(x: &[u64; 4], y: &[u64; 4]) -> [u64; 4] {
    let full = mul4x4(x, y);
    full[..4].try_into().unwrap()
}

fn add4_with_carry(x: &[u64; 4], y: &[u64; 4]) -> ([u64; 4], u64) {
    let mut out = [0u64; 4];
    let mut carry = 0u64;
    for i in 0..4 {
        let (s, c) = adc(x[i], y[i], carry);
        out[i] = s;
        carry = c;
    }
    (out, carry)
}

fn ct_sub4(x: &[u64; 4], y: &[u64; 4]) -> ([u64; 4], Choice) {
    let mut out = [0u64; 4];
    let mut borrow = 0u64;
    for i in 0..4 {
        let (d, b) = sbb(x[i], y[i], borrow);
        out[i] = d;
        borrow = b;
    }
    (out, Choice::from(borrow as u8))
}

/// Constant-time `x < y` for 4-limb arrays.
fn ct_lt4(x: &[u64; 4], y: &[u64; 4]) -> Choice {
    let (_diff, borrow) = ct_sub4(x, y);
    borrow
}

/// Constant-time `x >= y` for 4-limb arrays.
fn ct_ge4(x: &[u64; 4], y: &[u64; 4]) -> Choice {
    !ct_lt4(x, y)
}

/// Barrett-style unsigned division of an 8-limb (512-bit) dividend `p` by
/// the group order `q`, following the "unsigned division" construction
/// ported from the reference implementation's `mul_mod_q`/`mod_q`:
///
/// ```text
/// t    = floor(m' * p / 2^N)        N = 508
/// s    = t + floor((p - t) / 2)
/// quot = s >> (l - 1)               l = 252
/// rem  = p - quot * q
/// ```
///
/// Returns `(quotient_low_4_limbs, remainder)`. The quotient is exact for
/// any `p < q * 2^256` (in particular for products of two 256-bit scalars,
/// optionally plus a 256-bit addend, and for the GLS decomposition's
/// rounded-division step), so no further correction subtraction is needed.
pub(crate) fn barrett_divmod(p: [u64; 8]) -> ([u64; 4], [u64; 4]) {
    let n: [u64; 4] = p[..4].try_into().unwrap();

    // t <- (M1 * p) >> 508 = (M1 * p) >> (7*64 + 60)
    let full = mul6x8(&M1, &p);
    let mut t = [0u64; 7];
    t.copy_from_slice(&full[7..14]);
    // t >>= 60, folding in bits from the next limb up.
    let mut shifted = [0u64; 7];
    for i in 0..6 {
        shifted[i] = (t[i] >> 60) | (t[i + 1] << 4);
    }
    shifted[6] = t[6] >> 60;
    t = shifted;

    // p -= t  (p has 8 limbs, t has 7; t[k] for k>=7 is implicitly 0)
    let mut diff = [0u64; 8];
    let mut borrow = 0u64;
    for i in 0..8 {
        let ti = if i < 7 { t[i] } else { 0 };
        let (d, b) = sbb(p[i], ti, borrow);
        diff[i] = d;
        borrow = b;
    }
    let mut p = diff;

    // p >>= 1
    let mut shifted8 = [0u64; 8];
    for i in 0..7 {
        shifted8[i] = (p[i] >> 1) | (p[i + 1] << 63);
    }
    shifted8[7] = p[7] >> 1;
    p = shifted8;

    // p = (p + t) >> 251 = (p + t) >> (3*64 + 59), keep low 4 limbs of the
    // shifted quotient.
    let mut sum = [0u64; 8];
    let mut carry = 0u64;
    for i in 0..8 {
        let ti = if i < 7 { t[i] } else { 0 };
        let (s, c) = adc(p[i], ti, carry);
        sum[i] = s;
        carry = c;
    }
    let mut quot_wide = [0u64; 5];
    for i in 0..4 {
        quot_wide[i] = (sum[i + 3] >> 59) | (sum.get(i + 4).copied().unwrap_or(0) << 5);
    }
    let quot: [u64; 4] = quot_wide[..4].try_into().unwrap();

    // r = n - quot * q  (mod 2^256)
    let prod = mul4x4_low(&quot, &Q);
    let (rem, _borrow) = ct_sub4(&n, &prod);

    (quot, rem)
}

/// Rounded division used by the GLS decomposition (§4.D): computes
/// `round(num / q)` for a numerator that may be wider than 256 bits but
/// narrower than the Barrett bound, by reusing [`barrett_divmod`]'s exact
/// floor quotient and deciding the round-up via a constant-time compare of
/// `2 * remainder` against `q`.
pub(crate) fn round_div_q(num: [u64; 8]) -> [u64; 4] {
    let (quot, rem) = barrett_divmod(num);
    let (double_rem, carry_out) = add4_with_carry(&rem, &rem);
    // 2*rem >= q  <=>  either the doubling overflowed 256 bits, or the
    // (non-overflowing) double_rem is >= q.
    let overflowed = Choice::from(carry_out as u8);
    let ge = overflowed | ct_ge4(&double_rem, &Q);
    let quot_plus_one = add4_with_carry(&quot, &Scalar::ONE.0).0;
    let mut out = [0u64; 4];
    for i in 0..4 {
        out[i] = u64::conditional_select(&quot[i], &quot_plus_one[i], ge);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use proptest::{prop_assert, prop_assert_eq, property_test};

    fn sc(hex_le_words: [u64; 4]) -> Scalar {
        Scalar(hex_le_words)
    }

    #[test]
    fn mod_q_all_ones_512() {
        let x = [u64::MAX; 8];
        let r = Scalar::mod_q_wide(&x);
        let expected = Scalar([
            0x72A7E6A3F7A11C27,
            0xA52B0BE10884939E,
            0x95EB7B0E1A988566,
            0x093F8B602171C88E,
        ]);
        assert_eq!(r, expected);
    }

    #[test]
    fn mod_q_all_ones_512_matches_byte_vector() {
        // Same input/output as `mod_q_all_ones_512`, checked as the raw
        // little-endian byte vector (§8, end-to-end scenario 1).
        let x = [u64::MAX; 8];
        let r = Scalar::mod_q_wide(&x);
        let expected: [u8; 32] =
            hex!("271CA1F7A3E6A7729E938408E10B2BA56685981A0E7BEB958EC87121608B3F09");
        assert_eq!(r.to_bytes(), expected);
    }

    #[property_test]
    fn add_mod_q_is_commutative(x_limbs: [u64; 4], y_limbs: [u64; 4]) {
        let x = Scalar(x_limbs).mod_q();
        let y = Scalar(y_limbs).mod_q();
        prop_assert_eq!(x.add_mod_q(&y), y.add_mod_q(&x));
    }

    #[property_test]
    fn mul_mod_q_distributes_over_add(a_limbs: [u64; 4], b_limbs: [u64; 4], c_limbs: [u64; 4]) {
        let a = Scalar(a_limbs).mod_q();
        let b = Scalar(b_limbs).mod_q();
        let c = Scalar(c_limbs).mod_q();
        let lhs = a.mul_mod_q(&b.add_mod_q(&c), None);
        let rhs = a.mul_mod_q(&b, None).add_mod_q(&a.mul_mod_q(&c, None));
        prop_assert_eq!(lhs, rhs);
    }

    #[property_test]
    fn mod_q_result_is_less_than_q(limbs: [u64; 8]) {
        let r = Scalar::mod_q_wide(&limbs);
        prop_assert!(bool::from(r.less_q()));
    }

    #[property_test]
    fn secret_gen_is_always_a_valid_key(raw: [u8; 32]) {
        let k = secret_gen(raw);
        prop_assert!(!invalid_key(&k));
    }

    #[test]
    fn add_mod_q_all_ones() {
        let x = sc([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);
        let r = x.add_mod_q(&x);
        let expected = Scalar([0x2C92E389EC3FCB5E, 0x3B3D7D67E46F0586, 0x0B, 0]);
        assert_eq!(r, expected);
    }

    #[test]
    fn mul_mod_q_vector() {
        let x = sc([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);
        let qm1 = {
            let (d, _b) = ct_sub4(&Q, &Scalar::ONE.0);
            Scalar(d)
        };
        let r = x.mul_mod_q(&qm1, Some(&qm1));
        let expected = Scalar([
            0xB851F71EBA7E1BF5,
            0x08875560CEA50510,
            0xFFFFFFFFFFFFFFFA,
            0x0FFFFFFFFFFFFFFF,
        ]);
        assert_eq!(r, expected);
    }

    #[test]
    fn mask_scalar_clears_top_bits() {
        let raw = [0xFFu8; 32];
        let k = secret_gen(raw);
        assert_eq!(k.0[3] >> 59, 0);
        assert!(bool::from(k.less_q()));
    }

    #[test]
    fn invalid_key_rejects_zero_and_q() {
        assert!(invalid_key(&Scalar::ZERO));
        assert!(invalid_key(&Scalar::Q));
        assert!(!invalid_key(&Scalar::ONE));
    }

    #[test]
    #[cfg(feature = "std")]
    fn secret_gen_draws_a_valid_key_from_the_system_rng() {
        use getrandom::{SysRng, rand_core::TryRngCore};

        for _ in 0..8 {
            let mut raw = [0u8; 32];
            SysRng.try_fill_bytes(&mut raw).unwrap();
            let k = secret_gen(raw);
            assert!(!invalid_key(&k));
        }
    }
}
