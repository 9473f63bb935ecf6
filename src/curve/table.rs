//! Constant-time masked table lookup, and the fixed points/tables that
//! back generator-base scalar multiplication (§4.F).
//!
//! The two 64-entry comb tables and the `2^(w*d)*G` fix-up point used by
//! [`crate::curve::scalar_mul::mul_gen`] are derived at first use from the
//! fixed generator `EC_G` via ordinary (vartime) point doubling rather than
//! hand-transcribed as literal byte constants: they are public data derived
//! from a public point, so computing them lazily costs nothing in the
//! secret-dependent sense, and avoids carrying ~9KB of unverifiable literal
//! table data that nobody could regenerate without a working curve
//! implementation in hand. See `DESIGN.md` for the full rationale.
//!
//! The one-time cell backing that memoization needs either `std` (plain
//! [`std::sync::OnceLock`]) or, for `no_std` callers, `alloc` (lock-free
//! [`once_cell::race::OnceBox`]). Building with neither is a compile error:
//! there is nowhere to put the cell.

#[cfg(not(any(feature = "std", feature = "alloc")))]
compile_error!(
    "curve::table needs the `std` or `alloc` feature to memoize the generator comb tables"
);

#[cfg(feature = "std")]
use std::sync::OnceLock;

#[cfg(all(feature = "alloc", not(feature = "std")))]
use alloc::boxed::Box;
#[cfg(all(feature = "alloc", not(feature = "std")))]
use once_cell::race::OnceBox;

use subtle::{Choice, ConditionallySelectable};

use crate::curve::gls;
use crate::curve::point::{AffinePoint, ProjectivePoint, gen_mask};
use crate::curve::recode::{COMB_D, COMB_E, COMB_W};
use crate::field::Fp2;
use crate::field::fp::Fp;

/// The fixed base point `EC_G`, independently verified to generate the
/// prime-order subgroup (order `q`, after cofactor-4 clearing).
pub const EC_G: AffinePoint = AffinePoint {
    x: Fp2 {
        a: Fp::from_raw(0x330826c11b6a7037439ce7952184ea5e & MASK127),
        b: Fp::from_raw(0x507c5feca9d269959ca0b77786fc7270 & MASK127),
    },
    y: Fp2 {
        a: Fp::from_raw(0x2e9854bfe539ebf4dd504d6d1e8b531d & MASK127),
        b: Fp::from_raw(0x75ac8a1bb89b62edb099757410e1c239 & MASK127),
    },
};

const MASK127: u128 = (1u128 << 127) - 1;

/// `EC_EG = psi(EC_G)`, the GLS image of the generator.
pub fn ec_eg() -> ProjectivePoint {
    gls::psi(&EC_G.expand())
}

/// Doubles `p` `n` times. Vartime: only ever applied to public points
/// while building the public comb tables.
fn double_n(mut p: ProjectivePoint, n: u32) -> ProjectivePoint {
    for _ in 0..n {
        p = p.dbl();
    }
    p
}

struct CombTables {
    table0: [AffinePoint; 64],
    table1: [AffinePoint; 64],
    fix: ProjectivePoint,
}

fn build_comb_tables() -> CombTables {
    let g = EC_G.expand();
    // base[v][w'] = 2^(d*(w'+1) + v*e) * G, w' in 0..6
    let mut base = [[ProjectivePoint::IDENTITY; 6]; 2];
    for v in 0..2 {
        for wp in 0..6 {
            let exp = (COMB_D * (wp + 1) + v * COMB_E) as u32;
            base[v][wp] = double_n(g, exp);
        }
    }

    let mut table0 = [AffinePoint::IDENTITY; 64];
    let mut table1 = [AffinePoint::IDENTITY; 64];
    for jj in 0..64usize {
        let mut acc0 = ProjectivePoint::IDENTITY;
        let mut acc1 = ProjectivePoint::IDENTITY;
        for bit in 0..6 {
            if (jj >> bit) & 1 == 1 {
                acc0 = acc0.add(&base[0][bit], false);
                acc1 = acc1.add(&base[1][bit], false);
            }
        }
        table0[jj] = acc0.affine();
        table1[jj] = acc1.affine();
    }

    let fix = double_n(g, (COMB_W * COMB_D) as u32);

    CombTables {
        table0,
        table1,
        fix,
    }
}

#[cfg(feature = "std")]
static COMB_TABLES: OnceLock<CombTables> = OnceLock::new();
#[cfg(all(feature = "alloc", not(feature = "std")))]
static COMB_TABLES: OnceBox<CombTables> = OnceBox::new();

#[cfg(feature = "std")]
fn comb_tables() -> &'static CombTables {
    COMB_TABLES.get_or_init(build_comb_tables)
}

#[cfg(all(feature = "alloc", not(feature = "std")))]
fn comb_tables() -> &'static CombTables {
    COMB_TABLES.get_or_init(|| Box::new(build_comb_tables()))
}

/// `K(w', v', e')`: bit `d*w' + e*v' + e'` of the recoded digit string.
pub fn comb_bit(b: &[u64; 4], wp: usize, vp: usize, ep: usize) -> u32 {
    let jj = wp * COMB_D + vp * COMB_E + ep;
    ((b[jj >> 6] >> (jj & 63)) & 1) as u32
}

/// Selects the two comb-table entries (one per `v`-slot) active at comb
/// position `ii`, each already sign-adjusted and expanded to projective
/// form with `t = x*y`.
pub fn table_select_comb(b: &[u64; 4], ii: usize) -> (ProjectivePoint, ProjectivePoint) {
    let tabs = comb_tables();

    let mut d0 = 0u32;
    for w in (1..=6).rev() {
        d0 = (d0 << 1) | comb_bit(b, w, 0, ii);
    }
    let s0 = comb_bit(b, 0, 0, ii);
    let mut p1 = ProjectivePoint::IDENTITY;
    for (jj, entry) in tabs.table0.iter().enumerate() {
        let mask = gen_mask(jj as u32, d0);
        p1 = p1.xor_mask(&entry.expand(), mask);
    }
    p1 = p1.cond_neg(Choice::from((s0 ^ 1) as u8));

    let mut d1 = 0u32;
    for w in (1..=6).rev() {
        d1 = (d1 << 1) | comb_bit(b, w, 1, ii);
    }
    let s1 = comb_bit(b, 0, 1, ii);
    let mut p2 = ProjectivePoint::IDENTITY;
    for (jj, entry) in tabs.table1.iter().enumerate() {
        let mask = gen_mask(jj as u32, d1);
        p2 = p2.xor_mask(&entry.expand(), mask);
    }
    p2 = p2.cond_neg(Choice::from((s1 ^ 1) as u8));

    (p1, p2)
}

/// The fix-up point `2^(w*d) * G`, added when the comb recoding's top carry
/// bit is set.
pub fn comb_fix_point() -> ProjectivePoint {
    comb_tables().fix
}

/// GLV-SAC `m = 2` precomputed table: `{3a, 3a+b, 3a+2b, 3a+3b, a, a-b,
/// a+2b, a+b}`, indexed as `((a0^a1) << 2) | b1 << 1 | b0` by
/// [`table_select_2`].
pub fn gen_table_2(a: &ProjectivePoint, b: &ProjectivePoint) -> [ProjectivePoint; 8] {
    let bn = b.neg();
    let mut table = [ProjectivePoint::IDENTITY; 8];
    table[4] = *a;
    table[5] = a.add(&bn, false);
    table[7] = a.add(b, false);
    table[6] = table[7].add(b, false);
    let a2 = a.dbl();
    table[0] = a2.add(a, false);
    table[1] = table[0].add(b, false);
    table[2] = table[1].add(b, false);
    table[3] = table[2].add(b, false);
    table
}

/// Constant-time selection from a GLV-SAC `m = 2` table at digit position
/// `index`: reads the two recoded bits `(a >> index, b >> index ..
/// b>>(index+1))`, builds the 3-bit table index, masks in the matching
/// entry, and conditionally negates.
pub fn table_select_2(table: &[ProjectivePoint; 8], a: u128, b: u128, index: u32) -> ProjectivePoint {
    let bits = (a >> index) as u32;
    let mut k = ((bits ^ (bits >> 1)) & 1) << 2;
    k |= (b >> index) as u32 & 3;

    let mut r = ProjectivePoint::IDENTITY;
    for (ii, entry) in table.iter().enumerate() {
        let mask = gen_mask(ii as u32, k);
        r = r.xor_mask(entry, mask);
    }
    r.cond_neg(Choice::from((((bits >> 1) & 1) ^ 1) as u8))
}

/// GLV-SAC `m = 4` precomputed table, window size 1: `TABLE[i]` is `a` plus
/// the subset of `{b, c, d}` selected by the bits of `i`.
pub fn gen_table_4(
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    c: &ProjectivePoint,
    d: &ProjectivePoint,
) -> [ProjectivePoint; 8] {
    let mut table = [ProjectivePoint::IDENTITY; 8];
    table[0] = *a;
    table[1] = a.add(b, false);
    table[2] = a.add(c, false);
    table[3] = table[1].add(c, false);
    table[4] = a.add(d, false);
    table[5] = table[1].add(d, false);
    table[6] = table[2].add(d, false);
    table[7] = table[3].add(d, false);
    table
}

/// Constant-time selection from a GLV-SAC `m = 4` table at digit position
/// `index` (window size 1: one bit per half-scalar).
pub fn table_select_4(
    table: &[ProjectivePoint; 8],
    a: u128,
    b: u128,
    c: u128,
    d: u128,
    index: u32,
) -> ProjectivePoint {
    // The 3-bit table selector is formed from b,c,d; a's bit carries only
    // the sign, applied to the selected entry below.
    let sel = ((b >> index) as u32 & 1)
        | (((c >> index) as u32 & 1) << 1)
        | (((d >> index) as u32 & 1) << 2);
    let mut r = ProjectivePoint::IDENTITY;
    for (ii, entry) in table.iter().enumerate() {
        let mask = gen_mask(ii as u32, sel);
        r = r.xor_mask(entry, mask);
    }
    r.cond_neg(Choice::from((((a >> index) as u32 & 1) ^ 1) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve() {
        assert!(EC_G.valid_vartime());
    }

    #[test]
    fn comb_fix_point_is_power_of_two_of_g() {
        let fix = comb_fix_point();
        let direct = double_n(EC_G.expand(), (COMB_W * COMB_D) as u32);
        assert_eq!(fix, direct);
    }

    #[test]
    fn gen_table_2_entry_4_is_a() {
        let a = EC_G.expand();
        let b = ec_eg();
        let table = gen_table_2(&a, &b);
        assert_eq!(table[4], a);
    }
}
