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

//! Ordered dithering
//!
//! 8-bit channels are reduced to RGB565 through a 4x4 or 2x2 ordered-dither
//! matrix. The reduction is table driven: for every matrix row there is a
//! 2048-entry slice indexed by `color << 3 | (x & 3) << 1 | is_green`.
//!
//! # LUT Layout
//!
//! ```text
//! bit  12..11   10..3    2..1   0
//!      y & 3    color    x & 3  green
//! ```

use super::modes::FbzMode;
use std::sync::OnceLock;

/// 4x4 ordered-dither matrix (row-major)
pub const DITHER_MATRIX_4X4: [u8; 16] = [0, 8, 2, 10, 12, 4, 14, 6, 3, 11, 1, 9, 15, 7, 13, 5];

/// 2x2 ordered-dither matrix, replicated to 4x4
pub const DITHER_MATRIX_2X2: [u8; 16] = [2, 10, 2, 10, 14, 6, 14, 6, 2, 10, 2, 10, 14, 6, 14, 6];

const LUT_SIZE: usize = 4 * 256 * 4 * 2;

#[inline(always)]
fn dither_rb(color: u32, amount: u32) -> u8 {
    (((color << 1) - (color >> 4) + (color >> 7) + amount) >> 4) as u8
}

#[inline(always)]
fn dither_g(color: u32, amount: u32) -> u8 {
    (((color << 2) - (color >> 4) + (color >> 6) + amount) >> 4) as u8
}

fn generate_lut(matrix: &[u8; 16]) -> Vec<u8> {
    (0..LUT_SIZE)
        .map(|i| {
            let x = (i >> 1) & 3;
            let color = ((i >> 3) & 0xff) as u32;
            let y = (i >> 11) & 3;
            let amount = u32::from(matrix[y * 4 + x]);
            if i & 1 == 0 {
                dither_rb(color, amount)
            } else {
                dither_g(color, amount)
            }
        })
        .collect()
}

fn dither4_lut() -> &'static [u8] {
    static LUT: OnceLock<Vec<u8>> = OnceLock::new();
    LUT.get_or_init(|| generate_lut(&DITHER_MATRIX_4X4))
}

fn dither2_lut() -> &'static [u8] {
    static LUT: OnceLock<Vec<u8>> = OnceLock::new();
    LUT.get_or_init(|| generate_lut(&DITHER_MATRIX_2X2))
}

/// Dither state for one scanline
///
/// Built once per row from `fbzMode` and the (unflipped) Y coordinate.
#[derive(Clone, Copy)]
pub struct Dither {
    enabled: bool,
    matrix4: &'static [u8],
    matrix: &'static [u8],
    lookup: &'static [u8],
}

impl Dither {
    /// Select the dither rows for scanline `y`
    pub fn new(mode: FbzMode, y: i32) -> Self {
        let row = (y & 3) as usize;
        let matrix4 = &DITHER_MATRIX_4X4[row * 4..row * 4 + 4];
        let (matrix, lookup) = if mode.dither_type() == 0 {
            (matrix4, &dither4_lut()[row << 11..(row + 1) << 11])
        } else {
            (
                &DITHER_MATRIX_2X2[row * 4..row * 4 + 4],
                &dither2_lut()[row << 11..(row + 1) << 11],
            )
        };
        Self {
            enabled: mode.enable_dithering(),
            matrix4,
            matrix,
            lookup,
        }
    }

    /// Whether dithering is enabled for this row
    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 4x4 matrix entry for column `x` (0 when dithering is off)
    ///
    /// Feeds fog and LOD dithering.
    #[inline(always)]
    pub fn amount4(&self, x: i32) -> i32 {
        if self.enabled {
            i32::from(self.matrix4[(x & 3) as usize])
        } else {
            0
        }
    }

    /// Entry of the selected matrix for column `x` (0 when dithering is off)
    #[inline(always)]
    pub fn amount(&self, x: i32) -> i32 {
        if self.enabled {
            i32::from(self.matrix[(x & 3) as usize])
        } else {
            0
        }
    }

    /// Reduce 8-bit channels to a packed RGB565 pixel
    #[inline(always)]
    pub fn pack(&self, x: i32, r: i32, g: i32, b: i32) -> u16 {
        let (r, g, b) = if self.enabled {
            let base = ((x & 3) << 1) as usize;
            (
                i32::from(self.lookup[base + ((r as usize) << 3)]),
                i32::from(self.lookup[base + ((g as usize) << 3) + 1]),
                i32::from(self.lookup[base + ((b as usize) << 3)]),
            )
        } else {
            (r >> 3, g >> 2, b >> 3)
        };
        ((r << 11) | (g << 5) | b) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DITHER_ON: u32 = 1 << 8;
    const DITHER_2X2: u32 = 1 << 11;

    #[test]
    fn test_disabled_truncates() {
        let d = Dither::new(FbzMode(0), 0);
        assert_eq!(d.pack(0, 255, 0, 0), 0xf800);
        assert_eq!(d.pack(3, 0x0f, 0x0f, 0x0f), 0x0861);
        assert_eq!(d.amount4(1), 0);
    }

    #[test]
    fn test_full_scale_survives_every_phase() {
        for mode in [DITHER_ON, DITHER_ON | DITHER_2X2] {
            for y in 0..4 {
                let d = Dither::new(FbzMode(mode), y);
                for x in 0..4 {
                    assert_eq!(d.pack(x, 255, 255, 255), 0xffff);
                    assert_eq!(d.pack(x, 0, 0, 0), 0x0000);
                }
            }
        }
    }

    #[test]
    fn test_matrix_rows() {
        let d = Dither::new(FbzMode(DITHER_ON), 1);
        assert_eq!(d.amount4(0), 12);
        assert_eq!(d.amount(3), 6);

        let d = Dither::new(FbzMode(DITHER_ON | DITHER_2X2), 2);
        assert_eq!(d.amount(1), 10);
        assert_eq!(d.amount4(1), 11);
    }

    #[test]
    fn test_lut_matches_formula() {
        let lut = dither4_lut();
        assert_eq!(lut.len(), LUT_SIZE);
        // color 0x80, x = 2, y = 3, red/blue
        let index = (3 << 11) | (0x80 << 3) | (2 << 1);
        assert_eq!(lut[index], dither_rb(0x80, 13));
        assert_eq!(lut[index | 1], dither_g(0x80, 13));
    }
}
