// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-point helpers
//!
//! Pure functions shared by register decoding, triangle setup and the pixel
//! pipeline.
//!
//! # Reciprocal and log2
//!
//! The perspective divide and the mip-level selection both need `1/w` and
//! `log2(1/w)`. They are produced together by [`fast_reciplog`] from a
//! 513-entry table with linear interpolation between neighbours:
//!
//! ```text
//!   input  : 16.32 fixed point
//!   output : reciprocal with 15 fractional bits, log2 in 8.8
//! ```

use std::sync::OnceLock;

const RECIPLOG_LOOKUP_BITS: u32 = 9;
const RECIPLOG_INPUT_PREC: i32 = 32;
const RECIPLOG_LOOKUP_PREC: i32 = 22;
const RECIP_OUTPUT_PREC: i32 = 15;
const LOG_OUTPUT_PREC: i32 = 8;

/// Interleaved `[recip, log]` pairs for mantissas 1.0 ..= 2.0
fn reciplog_table() -> &'static [u32] {
    static TABLE: OnceLock<Vec<u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries = 1usize << RECIPLOG_LOOKUP_BITS;
        let mut table = Vec::with_capacity((entries + 1) * 2);
        for i in 0..=entries {
            let n = (entries + i) as f64;
            let recip = (entries as f64) * f64::from(1u32 << RECIPLOG_LOOKUP_PREC) / n;
            let log = (n / entries as f64).log2() * f64::from(1u32 << RECIPLOG_LOOKUP_PREC);
            table.push(recip as u32);
            table.push(log as u32);
        }
        table
    })
}

/// Compute the reciprocal and log2 of a 16.32 fixed-point value
///
/// # Returns
///
/// `(recip, log2)` where `recip` carries the input sign and `log2` is the
/// 8.8 fixed-point log of the reciprocal. A zero input saturates the
/// reciprocal and reports a log of 1000.0.
///
/// # Example
///
/// ```
/// use sstrx::core::voodoo::math::fast_reciplog;
///
/// // 1.0 in 16.32 -> reciprocal 1.0 with 15 fractional bits, log 0
/// let (recip, log) = fast_reciplog(1 << 32);
/// assert_eq!(recip, 1 << 15);
/// assert_eq!(log, 0);
/// ```
pub fn fast_reciplog(value: i64) -> (i64, i32) {
    let neg = value < 0;
    let value = value.unsigned_abs();
    let mut exponent: i32 = 0;

    let mut temp = if value & 0xffff_0000_0000 != 0 {
        exponent -= 16;
        (value >> 16) as u32
    } else {
        value as u32
    };

    if temp == 0 {
        let recip = if neg { 0x8000_0000 } else { 0x7fff_ffff };
        return (recip, 1000 << LOG_OUTPUT_PREC);
    }

    let lz = temp.leading_zeros();
    temp <<= lz;
    exponent += lz as i32;

    let table = reciplog_table();
    let index = ((temp >> (31 - RECIPLOG_LOOKUP_BITS - 1)) & ((2 << RECIPLOG_LOOKUP_BITS) - 2)) as usize;
    let interp = (temp >> (31 - RECIPLOG_LOOKUP_BITS - 8)) & 0xff;

    let rlog = (table[index + 1] * (0x100 - interp) + table[index + 3] * interp) >> 8;
    let mut recip =
        (u64::from(table[index]) * u64::from(0x100 - interp) + u64::from(table[index + 2]) * u64::from(interp)) >> 8;

    let round = 1u32 << (RECIPLOG_LOOKUP_PREC - LOG_OUTPUT_PREC - 1);
    let rlog = (rlog + round) >> (RECIPLOG_LOOKUP_PREC - LOG_OUTPUT_PREC);

    let log = ((exponent - (31 - RECIPLOG_INPUT_PREC)) << LOG_OUTPUT_PREC) - rlog as i32;

    exponent += (RECIP_OUTPUT_PREC - RECIPLOG_LOOKUP_PREC) - (31 - RECIPLOG_INPUT_PREC);
    if exponent < 0 {
        recip >>= -exponent;
    } else {
        recip <<= exponent;
    }

    let recip = recip as i64;
    (if neg { -recip } else { recip }, log)
}

/// Convert an IEEE-754 single (raw bits) to a signed fixed-point `i32`
///
/// `fixed_bits` is the number of fractional bits of the result. Values
/// beyond the `i32` range saturate; tiny values flush to zero.
///
/// # Example
///
/// ```
/// use sstrx::core::voodoo::math::float_to_int32;
///
/// // 12.4 screen coordinate
/// assert_eq!(float_to_int32(10.5f32.to_bits(), 4), 168);
/// assert_eq!(float_to_int32((-2.0f32).to_bits(), 4), -32);
/// ```
pub fn float_to_int32(data: u32, fixed_bits: i32) -> i32 {
    const MAX_SHIFT: i32 = 31;
    let exponent = (((data >> 23) & 0xff) as i32 - 127 - 23 + fixed_bits).clamp(-MAX_SHIFT, MAX_SHIFT);
    let mantissa = ((data & 0x7f_ffff) | 0x80_0000) as i32;

    let result = if exponent < 0 {
        if exponent > -MAX_SHIFT {
            mantissa >> -exponent
        } else {
            0
        }
    } else {
        clamp_to_i32(i64::from(mantissa) << exponent)
    };

    if data & 0x8000_0000 != 0 {
        result.wrapping_neg()
    } else {
        result
    }
}

/// Convert an IEEE-754 single (raw bits) to a signed fixed-point `i64`
///
/// Used for the 16.32 W and S/T registers.
pub fn float_to_int64(data: u32, fixed_bits: i32) -> i64 {
    let exponent = ((data >> 23) & 0xff) as i32 - 127 - 23 + fixed_bits;
    let mantissa = i64::from((data & 0x7f_ffff) | 0x80_0000);

    let result = if exponent < 0 {
        if exponent > -64 {
            mantissa >> -exponent
        } else {
            0
        }
    } else if exponent < 64 {
        let wide = i128::from(mantissa) << exponent;
        wide.min(i128::from(i64::MAX)) as i64
    } else {
        i64::MAX
    };

    if data & 0x8000_0000 != 0 {
        result.wrapping_neg()
    } else {
        result
    }
}

#[inline(always)]
fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Round a vertex coordinate to the nearest scanline (0.5 rounds down)
#[inline]
pub fn round_coordinate(value: f32) -> i32 {
    let result = value as i32;
    if value - result as f32 > 0.5 {
        result + 1
    } else {
        result
    }
}

/// Bilinear blend of four ARGB texels
///
/// `c00`/`c01` are the upper pair (`s`, `s + 1`), `c10`/`c11` the lower pair.
/// `u` and `v` are the 8-bit sub-texel fractions in S and T. All four
/// channels are blended with the same arithmetic, so a zero fraction in
/// both axes returns `c00` unchanged.
///
/// # Example
///
/// ```
/// use sstrx::core::voodoo::math::rgba_bilinear_filter;
///
/// let c = rgba_bilinear_filter(0xff00_0000, 0xff00_00ff, 0, 0, 128, 0);
/// assert_eq!(c, 0xff00_007f);
/// ```
#[inline]
pub fn rgba_bilinear_filter(c00: u32, c01: u32, c10: u32, c11: u32, u: u8, v: u8) -> u32 {
    let u = u32::from(u);
    let v = u32::from(v);
    let mut result = 0u32;
    for shift in [0u32, 8, 16, 24] {
        let ch = |c: u32| (c >> shift) & 0xff;
        let top = ch(c00) * (256 - u) + ch(c01) * u;
        let bottom = ch(c10) * (256 - u) + ch(c11) * u;
        let value = ((top >> 1) * (256 - v) + (bottom >> 1) * v) >> 15;
        result |= value.min(0xff) << shift;
    }
    result
}

/// Clamp a value to an unsigned 8-bit channel
#[inline(always)]
pub fn clamp_u8(value: i32) -> i32 {
    value.clamp(0, 0xff)
}

/// Clamp a value to an unsigned 16-bit range
#[inline(always)]
pub fn clamp_u16(value: i32) -> i32 {
    value.clamp(0, 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reciplog_powers_of_two() {
        // 2.0 -> 0.5, log2(1/2) = -1.0
        let (recip, log) = fast_reciplog(2 << 32);
        assert_eq!(recip, 1 << 14);
        assert_eq!(log, -256);

        // 0.5 -> 2.0, log = +1.0
        let (recip, log) = fast_reciplog(1 << 31);
        assert_eq!(recip, 1 << 16);
        assert_eq!(log, 256);
    }

    #[test]
    fn test_reciplog_sign_and_zero() {
        let (recip, _) = fast_reciplog(-(4 << 32));
        assert_eq!(recip, -(1 << 13));

        assert_eq!(fast_reciplog(0), (0x7fff_ffff, 1000 << 8));
    }

    #[test]
    fn test_reciplog_close_to_divide() {
        for value in [3i64 << 32, 5 << 30, 0x1234_5678, 7 << 28] {
            let (recip, _) = fast_reciplog(value);
            let exact = (1i128 << 47) / i128::from(value);
            let error = (i128::from(recip) - exact).abs();
            assert!(error * 1000 <= exact, "value {value:#x}: {recip} vs {exact}");
        }
    }

    #[test]
    fn test_float_to_int32_saturates() {
        assert_eq!(float_to_int32(1.0e20f32.to_bits(), 12), i32::MAX);
        assert_eq!(float_to_int32((-1.0e20f32).to_bits(), 12), -i32::MAX);
        assert_eq!(float_to_int32(1.0e-20f32.to_bits(), 12), 0);
        assert_eq!(float_to_int32(255.0f32.to_bits(), 12), 255 << 12);
    }

    #[test]
    fn test_float_to_int64() {
        assert_eq!(float_to_int64(1.0f32.to_bits(), 32), 1 << 32);
        assert_eq!(float_to_int64((-0.5f32).to_bits(), 32), -(1 << 31));
        assert_eq!(float_to_int64(1.0e30f32.to_bits(), 32), i64::MAX);
    }

    #[test]
    fn test_round_coordinate() {
        assert_eq!(round_coordinate(10.5), 10);
        assert_eq!(round_coordinate(10.51), 11);
        assert_eq!(round_coordinate(10.25), 10);
    }

    #[test]
    fn test_bilinear_exact_texel() {
        let c = rgba_bilinear_filter(0x80ff_4020, 0, 0, 0, 0, 0);
        assert_eq!(c, 0x80ff_4020);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let c = rgba_bilinear_filter(0, 0xffff_ffff, 0, 0xffff_ffff, 128, 128);
        assert_eq!(c, 0x7f7f_7f7f);
    }
}
