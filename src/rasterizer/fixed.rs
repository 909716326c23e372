//! Q16.16 fixed-point arithmetic
//!
//! The target CPUs have no FPU, so every stage of the pipeline runs on this
//! type. Overflow policy: add, sub, neg and the narrowing of 64-bit
//! intermediates all wrap (two's complement). Nothing here panics.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// Signed Q16.16 scalar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fix16(i32);

impl Fix16 {
    pub const ZERO: Fix16 = Fix16(0);
    pub const ONE: Fix16 = Fix16(0x0001_0000);
    pub const HALF: Fix16 = Fix16(0x0000_8000);
    pub const TWO: Fix16 = Fix16(0x0002_0000);
    pub const MAX: Fix16 = Fix16(i32::MAX);
    pub const MIN: Fix16 = Fix16(i32::MIN);

    pub const FRAC_BITS: u32 = 16;
    const FRAC_MASK: i32 = 0xFFFF;

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Self(n << 16)
    }

    /// Host-side conversion (asset tools, config, tests). Never used per pixel.
    pub fn from_f32(v: f32) -> Self {
        Self((v * 65536.0).round() as i32)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 65536.0
    }

    /// Floor to integer
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> 16
    }

    #[inline]
    pub const fn floor(self) -> Self {
        Self(self.0 & !Self::FRAC_MASK)
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Halve without rounding (arithmetic shift)
    #[inline]
    pub const fn half(self) -> Self {
        Self(self.0 >> 1)
    }

    /// Rounded multiply through a 64-bit intermediate
    #[inline]
    pub const fn mul(self, rhs: Fix16) -> Fix16 {
        let product = self.0 as i64 * rhs.0 as i64;
        Fix16(((product + 0x8000) >> 16) as i32)
    }

    /// Rounded divide. Division by zero yields zero instead of trapping.
    #[inline]
    pub const fn div(self, rhs: Fix16) -> Fix16 {
        if rhs.0 == 0 {
            return Fix16::ZERO;
        }
        let mut num = (self.0 as i64) << 16;
        let mut den = rhs.0 as i64;
        if den < 0 {
            num = -num;
            den = -den;
        }
        Fix16((2 * num + den).div_euclid(2 * den) as i32)
    }

    /// Exact reciprocal, `1 / self`
    #[inline]
    pub const fn recip(self) -> Fix16 {
        Fix16::ONE.div(self)
    }

    /// Square root. Non-positive inputs return zero.
    ///
    /// The integer square root of the operand scaled by 2^8 gives an estimate
    /// good to about 4 bits; one fixed-point Newton step tightens it.
    pub fn sqrt(self) -> Fix16 {
        if self.0 <= 0 {
            return Fix16::ZERO;
        }
        let estimate = Fix16((isqrt((self.0 as u64) << 8) << 4) as i32);
        if estimate.0 <= 0 {
            return Fix16::ZERO;
        }
        Fix16((estimate + self.div(estimate)).0 >> 1)
    }

    /// Sine of an angle in turns (1.0 = full revolution)
    #[inline]
    pub fn sin(self) -> Fix16 {
        Fix16((SIN_LUT[self.turn_index()] as i32) << 2)
    }

    /// Cosine of an angle in turns
    #[inline]
    pub fn cos(self) -> Fix16 {
        Fix16((SIN_LUT[(self.turn_index() + 64) & 0xFF] as i32) << 2)
    }

    #[inline]
    fn turn_index(self) -> usize {
        ((self.0 >> 8) & 0xFF) as usize
    }

    /// Approximate reciprocal from the lookup table.
    ///
    /// Relative error stays under 1% for operands in [1.0, 512.0]. Operands
    /// below [`RECIP_EXACT_BELOW`] or above [`RECIP_LUT_MAX`] take the exact
    /// division path. Zero yields zero.
    pub fn recip_fast(self) -> Fix16 {
        let raw = self.0;
        if raw == 0 {
            return Fix16::ZERO;
        }
        if raw < 0 {
            if raw == i32::MIN {
                return self.recip();
            }
            return -Fix16(-raw).recip_fast();
        }
        if raw < RECIP_EXACT_BELOW.0 || raw > RECIP_LUT_MAX.0 {
            return self.recip();
        }

        // Scale by a power of two into [256, 512] where linear
        // interpolation between neighbouring entries is accurate.
        let int_part = (raw >> 16) as u32;
        let shift = int_part.leading_zeros().saturating_sub(23);
        let scaled = (raw as u32) << shift;
        let index = (scaled >> 16) as usize - RECIP_LUT_BASE;
        let frac = (scaled & 0xFFFF) as u64;

        let r = if index + 1 >= RECIP_LUT.len() {
            RECIP_LUT[RECIP_LUT.len() - 1]
        } else {
            let a = RECIP_LUT[index];
            let b = RECIP_LUT[index + 1];
            a - (((a - b) as u64 * frac) >> 16) as u32
        };

        // r is 1/scaled in Q.39; undo the scaling and narrow to Q16.16
        let out_shift = 23 - shift;
        Fix16(((r as u64 + (1u64 << (out_shift - 1))) >> out_shift) as i32)
    }
}

/// Operands below this take exact division in [`Fix16::recip_fast`]. Tunable:
/// the table has too little resolution under 1.0.
pub const RECIP_EXACT_BELOW: Fix16 = Fix16::ONE;

/// Upper end of the reciprocal table's domain
pub const RECIP_LUT_MAX: Fix16 = Fix16::from_int(512);

const RECIP_LUT_BASE: usize = 256;
const RECIP_LUT_LEN: usize = 257;

/// `1 / i` in Q.39 for i in [256, 512]
static RECIP_LUT: [u32; RECIP_LUT_LEN] = build_recip_lut();

const fn build_recip_lut() -> [u32; RECIP_LUT_LEN] {
    let mut table = [0u32; RECIP_LUT_LEN];
    let mut k = 0;
    while k < RECIP_LUT_LEN {
        let i = (RECIP_LUT_BASE + k) as u64;
        table[k] = (((1u64 << 39) + i / 2) / i) as u32;
        k += 1;
    }
    table
}

/// Integer Newton square root
fn isqrt(n: u64) -> u64 {
    let mut x = n;
    let mut y = (x + 1) >> 1;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// One turn of sine in Q2.14, 256 steps
static SIN_LUT: [i16; 256] = [
    0, 402, 804, 1205, 1606, 2006, 2404, 2801, 3196, 3590, 3981, 4370, 4756, 5139, 5520, 5897,
    6270, 6639, 7005, 7366, 7723, 8076, 8423, 8765, 9102, 9434, 9760, 10080, 10394, 10702, 11003, 11297,
    11585, 11866, 12140, 12406, 12665, 12916, 13160, 13395, 13623, 13842, 14053, 14256, 14449, 14635, 14811, 14978,
    15137, 15286, 15426, 15557, 15679, 15791, 15893, 15986, 16069, 16143, 16207, 16261, 16305, 16340, 16364, 16379,
    16384, 16379, 16364, 16340, 16305, 16261, 16207, 16143, 16069, 15986, 15893, 15791, 15679, 15557, 15426, 15286,
    15137, 14978, 14811, 14635, 14449, 14256, 14053, 13842, 13623, 13395, 13160, 12916, 12665, 12406, 12140, 11866,
    11585, 11297, 11003, 10702, 10394, 10080, 9760, 9434, 9102, 8765, 8423, 8076, 7723, 7366, 7005, 6639,
    6270, 5897, 5520, 5139, 4756, 4370, 3981, 3590, 3196, 2801, 2404, 2006, 1606, 1205, 804, 402,
    0, -402, -804, -1205, -1606, -2006, -2404, -2801, -3196, -3590, -3981, -4370, -4756, -5139, -5520, -5897,
    -6270, -6639, -7005, -7366, -7723, -8076, -8423, -8765, -9102, -9434, -9760, -10080, -10394, -10702, -11003, -11297,
    -11585, -11866, -12140, -12406, -12665, -12916, -13160, -13395, -13623, -13842, -14053, -14256, -14449, -14635, -14811, -14978,
    -15137, -15286, -15426, -15557, -15679, -15791, -15893, -15986, -16069, -16143, -16207, -16261, -16305, -16340, -16364, -16379,
    -16384, -16379, -16364, -16340, -16305, -16261, -16207, -16143, -16069, -15986, -15893, -15791, -15679, -15557, -15426, -15286,
    -15137, -14978, -14811, -14635, -14449, -14256, -14053, -13842, -13623, -13395, -13160, -12916, -12665, -12406, -12140, -11866,
    -11585, -11297, -11003, -10702, -10394, -10080, -9760, -9434, -9102, -8765, -8423, -8076, -7723, -7366, -7005, -6639,
    -6270, -5897, -5520, -5139, -4756, -4370, -3981, -3590, -3196, -2801, -2404, -2006, -1606, -1205, -804, -402,
];

impl Add for Fix16 {
    type Output = Fix16;
    #[inline]
    fn add(self, rhs: Fix16) -> Fix16 {
        Fix16(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fix16 {
    #[inline]
    fn add_assign(&mut self, rhs: Fix16) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Fix16 {
    type Output = Fix16;
    #[inline]
    fn sub(self, rhs: Fix16) -> Fix16 {
        Fix16(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fix16 {
    #[inline]
    fn sub_assign(&mut self, rhs: Fix16) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for Fix16 {
    type Output = Fix16;
    #[inline]
    fn neg(self) -> Fix16 {
        Fix16(self.0.wrapping_neg())
    }
}

impl Mul for Fix16 {
    type Output = Fix16;
    #[inline]
    fn mul(self, rhs: Fix16) -> Fix16 {
        Fix16::mul(self, rhs)
    }
}

impl MulAssign for Fix16 {
    #[inline]
    fn mul_assign(&mut self, rhs: Fix16) {
        *self = Fix16::mul(*self, rhs);
    }
}

impl Div for Fix16 {
    type Output = Fix16;
    #[inline]
    fn div(self, rhs: Fix16) -> Fix16 {
        Fix16::div(self, rhs)
    }
}

impl fmt::Display for Fix16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f32())
    }
}

/// Wrap an angle in turns into [-0.5, 0.5]
pub fn normalize_angle(a: Fix16) -> Fix16 {
    let mut a = Fix16::from_raw(a.raw() & 0xFFFF);
    if a > Fix16::HALF {
        a -= Fix16::ONE;
    }
    a
}

/// Hermite ease, `r² (3 − 2r)`
pub fn smoothstep(ratio: Fix16) -> Fix16 {
    let r2 = ratio * ratio;
    r2 * (Fix16::from_int(3) - Fix16::TWO * ratio)
}
