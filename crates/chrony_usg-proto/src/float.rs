// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

use crate::protocol::ConstPackedSizeBytes;

/// Width of the signed exponent field.
pub const FLOAT_EXP_BITS: u32 = 7;

/// Width of the signed coefficient field.
pub const FLOAT_COEF_BITS: u32 = 32 - FLOAT_EXP_BITS;

/// Multiplier applied by [`ChronyFloat::to_fixed`].
pub const SCALE_FACTOR: f64 = 1_000_000_000.0;

const FLOAT_EXP_MIN: i32 = -(1 << (FLOAT_EXP_BITS - 1));
const FLOAT_EXP_MAX: i32 = -FLOAT_EXP_MIN - 1;
const FLOAT_COEF_MIN: i32 = -(1 << (FLOAT_COEF_BITS - 1));
const FLOAT_COEF_MAX: i32 = -FLOAT_COEF_MIN - 1;

/// chronyd's 32-bit floating-point wire format.
///
/// A 7-bit signed exponent followed by a 25-bit signed coefficient with no
/// hidden bit. The encoded value is `coef * 2^(exp - 25)`.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Exponent  |                   Coefficient                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ChronyFloat(pub i32);

impl ChronyFloat {
    /// Decode to an `f64`.
    ///
    /// Both sub-fields are recovered with modular arithmetic on the raw bits,
    /// so the result is exact for every bit pattern.
    pub fn to_f64(self) -> f64 {
        let x = self.0 as u32;

        let mut exp = (x >> FLOAT_COEF_BITS) as i32;
        if exp >= 1 << (FLOAT_EXP_BITS - 1) {
            exp -= 1 << FLOAT_EXP_BITS;
        }
        exp -= FLOAT_COEF_BITS as i32;

        let mut coef = (x % (1 << FLOAT_COEF_BITS)) as i32;
        if coef >= 1 << (FLOAT_COEF_BITS - 1) {
            coef -= 1 << FLOAT_COEF_BITS;
        }

        coef as f64 * pow2(exp)
    }

    /// The decoded value multiplied by 10^9 and truncated toward zero.
    ///
    /// Out-of-range values saturate at the `i64` bounds.
    pub fn to_fixed(self) -> i64 {
        (self.to_f64() * SCALE_FACTOR) as i64
    }

    /// Encode an `f64` the way chronyd does.
    ///
    /// Magnitudes below `1e-100` (and NaN) encode as zero; magnitudes above
    /// `1e100` saturate. Values below the smallest normal exponent are
    /// denormalized.
    pub fn from_f64(value: f64) -> ChronyFloat {
        let neg = value < 0.0;
        let x = if neg { -value } else { value };
        let coef_max = (FLOAT_COEF_MAX + neg as i32) as i64;

        let (exp, coef) = if x.is_nan() || x < 1.0e-100 {
            (0, 0)
        } else if x > 1.0e100 {
            (FLOAT_EXP_MAX, coef_max)
        } else {
            let mut exp = log2_plus_one_trunc(x);
            let mut coef = (x * pow2(FLOAT_COEF_BITS as i32 - exp) + 0.5) as i64;

            // Rounding may push the coefficient up to two bits too wide.
            while coef > coef_max {
                coef >>= 1;
                exp += 1;
            }

            if exp > FLOAT_EXP_MAX {
                (FLOAT_EXP_MAX, coef_max)
            } else if exp < FLOAT_EXP_MIN {
                if exp + FLOAT_COEF_BITS as i32 >= FLOAT_EXP_MIN {
                    (FLOAT_EXP_MIN, coef >> (FLOAT_EXP_MIN - exp))
                } else {
                    (0, 0)
                }
            } else {
                (exp, coef)
            }
        };

        let mut coef = coef as u32;
        if neg {
            coef = (coef.wrapping_neg() << FLOAT_EXP_BITS) >> FLOAT_EXP_BITS;
        }

        ChronyFloat((((exp as u32) << FLOAT_COEF_BITS) | coef) as i32)
    }
}

impl ConstPackedSizeBytes for ChronyFloat {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl From<ChronyFloat> for f64 {
    fn from(f: ChronyFloat) -> f64 {
        f.to_f64()
    }
}

impl From<f64> for ChronyFloat {
    fn from(value: f64) -> ChronyFloat {
        ChronyFloat::from_f64(value)
    }
}

impl fmt::Display for ChronyFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

// Exact 2^exp for exponents inside the normal f64 range.
fn pow2(exp: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exp));
    f64::from_bits(((exp + 1023) as u64) << 52)
}

// chronyd computes `(int)(log(x) / log(2) + 1)`, truncating toward zero.
// Derived here from the IEEE exponent so it needs no libm. `x` must be a
// positive normal number.
fn log2_plus_one_trunc(x: f64) -> i32 {
    let bits = x.to_bits();
    let floor_log2 = ((bits >> 52) & 0x7ff) as i32 - 1023;
    let power_of_two = bits & ((1u64 << 52) - 1) == 0;
    if floor_log2 + 1 >= 0 || power_of_two {
        floor_log2 + 1
    } else {
        floor_log2 + 2
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn raw(exp: i32, coef: i32) -> ChronyFloat {
        let exp = (exp as u32) & ((1 << FLOAT_EXP_BITS) - 1);
        let coef = (coef as u32) & ((1 << FLOAT_COEF_BITS) - 1);
        ChronyFloat(((exp << FLOAT_COEF_BITS) | coef) as i32)
    }

    #[test]
    fn test_zero_coefficient_decodes_to_zero() {
        assert_eq!(ChronyFloat(0).to_f64(), 0.0);
        assert_eq!(raw(17, 0).to_f64(), 0.0);
        assert_eq!(raw(-40, 0).to_f64(), 0.0);
    }

    #[test]
    fn test_decode_two_to_minus_twenty() {
        // exp - 25 = -20
        let f = raw(5, 1);
        assert_eq!(f.0, (5 << 25) | 1);
        assert_eq!(f.to_f64(), 9.5367431640625e-7);
    }

    #[test]
    fn test_decode_negative_exponent() {
        // Exponent field 0x7f is -1.
        let f = ChronyFloat((0x7f << 25) | 1);
        assert_eq!(f.to_f64(), 2f64.powi(-26));
    }

    #[test]
    fn test_decode_negative_coefficient() {
        assert_eq!(raw(25, -3).to_f64(), -3.0);
        assert_eq!(raw(1, -(1 << 24)).to_f64(), -1.0);
    }

    #[test]
    fn test_decode_extremes() {
        assert_eq!(raw(FLOAT_EXP_MAX, FLOAT_COEF_MAX).to_f64(), 16_777_215.0 * 2f64.powi(38));
        assert_eq!(raw(FLOAT_EXP_MIN, 1).to_f64(), 2f64.powi(-89));
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(raw(25, 3).to_fixed(), 3_000_000_000);
        assert_eq!(raw(5, 1).to_fixed(), 953);
        assert_eq!(raw(25, -2).to_fixed(), -2_000_000_000);
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(ChronyFloat::from_f64(0.0), ChronyFloat(0));
        assert_eq!(ChronyFloat::from_f64(1.0), raw(2, 1 << 23));
        assert_eq!(ChronyFloat::from_f64(-1.0), ChronyFloat(0x0300_0000));
        assert_eq!(ChronyFloat::from_f64(1e-200), ChronyFloat(0));
    }

    #[test]
    fn test_encode_saturates() {
        assert_eq!(
            ChronyFloat::from_f64(1e200),
            raw(FLOAT_EXP_MAX, FLOAT_COEF_MAX)
        );
        assert_eq!(ChronyFloat::from_f64(f64::NAN), ChronyFloat(0));
    }

    #[test]
    fn test_encode_decode_close() {
        for &v in &[
            0.3,
            -0.3,
            1.5e-6,
            -2.25e-4,
            12.125,
            -387.4,
            0.000_123_456,
            64.0,
        ] {
            let decoded = ChronyFloat::from_f64(v).to_f64();
            let tolerance = v.abs() * 2f64.powi(-23);
            assert!(
                (decoded - v).abs() <= tolerance,
                "{v} decoded as {decoded}"
            );
        }
    }

    #[test]
    fn test_log2_plus_one_trunc() {
        assert_eq!(log2_plus_one_trunc(3.0), 2);
        assert_eq!(log2_plus_one_trunc(0.5), 0);
        assert_eq!(log2_plus_one_trunc(0.3), 0);
        assert_eq!(log2_plus_one_trunc(0.25), -1);
        assert_eq!(log2_plus_one_trunc(0.1), -2);
    }
}
