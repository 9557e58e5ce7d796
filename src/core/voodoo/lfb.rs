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

//! Linear frame buffer access
//!
//! The LFB window maps the color and aux buffers as a 1024-wide pixel
//! array. Writes are decoded according to `lfbMode`:
//!
//! | Format | Layout                    | Pixels per word |
//! |--------|---------------------------|-----------------|
//! | 0      | RGB 5-6-5                 | 2               |
//! | 1      | RGB x-5-5-5               | 2               |
//! | 2      | ARGB 1-5-5-5              | 2               |
//! | 4      | RGB x-8-8-8               | 1               |
//! | 5      | ARGB 8-8-8-8              | 1               |
//! | 12-14  | depth + formats 0-2       | 1               |
//! | 15     | depth                     | 2               |
//!
//! The RGBA lane setting moves alpha to the low end (lanes 2 and 3) and
//! swaps red with blue (lanes 1 and 3). Other formats are reserved and
//! the write is dropped.
//!
//! Decoded pixels either go straight to memory or, with the pixel pipeline
//! enabled in `lfbMode`, through the same pipeline triangles use.

use super::color::{
    extract_1555, extract_555x, extract_5551, extract_565, extract_8888, extract_888x, extract_x555, extract_x888,
    Argb,
};
use super::dither::Dither;
use super::modes::{FbzMode, LfbMask, LfbMode};
use super::pipeline::{Iterators, PixelSource, Row};
use super::rasterizer::screen_y;
use super::registers::{CLIP_LEFT_RIGHT, CLIP_LOW_Y_HIGH_Y, FBZ_MODE, LFB_MODE, STIPPLE, ZA_COLOR};
use super::stats::Stats;
use super::Voodoo;

/// Pixels decoded from one LFB write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfbPixels {
    /// Colors of pixel 0 and pixel 1; alpha defaults to `zaColor[31:24]`
    pub color: [Argb; 2],
    /// Depth of pixel 0 and pixel 1; defaults to `zaColor[15:0]`
    pub depth: [u16; 2],
    /// What each pixel carries (low nibble pixel 0, high nibble pixel 1)
    pub mask: LfbMask,
    /// The word holds two 16-bit pixels, so the word offset counts pixel pairs
    pub pixel_pair: bool,
}

/// Channels most significant first, plus alpha if the format has one
fn extract(format: u32, alpha_last: bool, value: u32) -> Option<((u8, u8, u8), Option<u8>)> {
    Some(match (format, alpha_last) {
        (0 | 12, _) => (extract_565(value), None),
        (1 | 13, false) => (extract_x555(value), None),
        (1 | 13, true) => (extract_555x(value), None),
        (2 | 14, false) => {
            let (a, hi, mid, lo) = extract_1555(value);
            ((hi, mid, lo), Some(a))
        }
        (2 | 14, true) => {
            let (hi, mid, lo, a) = extract_5551(value);
            ((hi, mid, lo), Some(a))
        }
        (4, false) => (extract_x888(value), None),
        (4, true) => (extract_888x(value), None),
        (5, false) => {
            let (a, hi, mid, lo) = extract_8888(value);
            ((hi, mid, lo), Some(a))
        }
        (5, true) => {
            let (hi, mid, lo, a) = extract_8888(value);
            ((hi, mid, lo), Some(a))
        }
        _ => return None,
    })
}

/// Decode one LFB write word
///
/// `data` must already be byte-swizzled and word-swapped as `lfbMode`
/// requests. Returns `None` for reserved formats.
///
/// # Example
///
/// ```
/// use sstrx::core::voodoo::decode_lfb_write;
/// use sstrx::core::voodoo::modes::{LfbMask, LfbMode};
///
/// // format 0 (RGB 5-6-5): two pure red pixels
/// let pixels = decode_lfb_write(LfbMode(0), 0xf800_f800, 0).unwrap();
/// assert!(pixels.pixel_pair);
/// assert_eq!(pixels.mask, LfbMask::RGB | LfbMask::RGB_HI);
/// assert_eq!(pixels.color[1].r(), 0xff);
/// ```
pub fn decode_lfb_write(mode: LfbMode, data: u32, za_color: u32) -> Option<LfbPixels> {
    let format = mode.write_format();
    let lanes = mode.rgba_lanes();
    let swap_rb = lanes & 1 != 0;
    let alpha_last = lanes >= 2;

    let default_alpha = (za_color >> 24) as u8;
    let default_depth = za_color as u16;

    let color = |value: u32| -> Option<Argb> {
        let ((hi, mid, lo), alpha) = extract(format, alpha_last, value)?;
        let (r, g, b) = if swap_rb { (lo, mid, hi) } else { (hi, mid, lo) };
        Some(Argb::new(alpha.unwrap_or(default_alpha), r, g, b))
    };
    let blank = Argb::new(default_alpha, 0, 0, 0);

    let pixels = match format {
        0..=2 => {
            let mut mask = LfbMask::RGB | LfbMask::RGB_HI;
            if format == 2 {
                mask |= LfbMask::ALPHA | LfbMask::ALPHA_HI;
            }
            LfbPixels {
                color: [color(data)?, color(data >> 16)?],
                depth: [default_depth; 2],
                mask,
                pixel_pair: true,
            }
        }
        4 | 5 => LfbPixels {
            color: [color(data)?, blank],
            depth: [default_depth; 2],
            mask: if format == 5 {
                LfbMask::RGB | LfbMask::ALPHA
            } else {
                LfbMask::RGB
            },
            pixel_pair: false,
        },
        12..=14 => LfbPixels {
            color: [color(data)?, blank],
            depth: [(data >> 16) as u16, default_depth],
            mask: if format == 14 {
                LfbMask::RGB | LfbMask::ALPHA | LfbMask::DEPTH_MSW
            } else {
                LfbMask::RGB | LfbMask::DEPTH_MSW
            },
            pixel_pair: false,
        },
        15 => LfbPixels {
            color: [blank; 2],
            depth: [data as u16, (data >> 16) as u16],
            mask: LfbMask::DEPTH | LfbMask::DEPTH_HI,
            pixel_pair: true,
        },
        _ => return None,
    };

    Some(pixels)
}

impl Voodoo {
    /// LFB write
    ///
    /// # Arguments
    ///
    /// * `offset` - Word offset within the window (LFB region bits included)
    /// * `data` - Value written
    /// * `mem_mask` - Byte lanes present; a missing 16-bit half drops the
    ///   pixel it would carry
    pub(crate) fn lfb_write(&mut self, offset: u32, data: u32, mem_mask: u32) {
        let mode = LfbMode(self.regs.u(LFB_MODE));

        let (mut data, mut mem_mask) = (data, mem_mask);
        if mode.byte_swizzle_writes() {
            data = data.swap_bytes();
            mem_mask = mem_mask.swap_bytes();
        }
        if mode.word_swap_writes() {
            data = data.rotate_left(16);
            mem_mask = mem_mask.rotate_left(16);
        }

        let Some(pixels) = decode_lfb_write(mode, data, self.regs.u(ZA_COLOR)) else {
            log::debug!("LFB write with reserved format {} dropped", mode.write_format());
            return;
        };

        let offset = if pixels.pixel_pair { offset << 1 } else { offset };
        let x = (offset & 0x3ff) as i32;
        let y = ((offset >> 10) & 0x3ff) as i32;

        let mut mask = pixels.mask.bits();
        if mem_mask & 0xffff == 0 {
            mask &= !(0x0f - LfbMask::DEPTH_MSW.bits());
        }
        if mem_mask >> 16 == 0 {
            mask &= !(0xf0 + LfbMask::DEPTH_MSW.bits());
        }

        let Some(dest) = self.fbi.select_buffer(mode.write_buffer_select()) else {
            log::debug!("LFB write to reserved buffer {} dropped", mode.write_buffer_select());
            return;
        };

        log::trace!(
            "LFB write format={} ({}, {}) = {:#010x} & {:#010x}",
            mode.write_format(),
            x,
            y,
            data,
            mem_mask
        );

        if mode.enable_pixel_pipeline() {
            self.lfb_write_pipelined(&pixels, mask, dest, x, y);
        } else {
            self.lfb_write_raw(&pixels, mask, dest, x, y);
        }
    }

    /// Store decoded pixels directly, honoring only dithering and the
    /// alpha-planes selection
    fn lfb_write_raw(&mut self, pixels: &LfbPixels, mut mask: u32, dest: u32, mut x: i32, y: i32) {
        let lfb = LfbMode(self.regs.u(LFB_MODE));
        let fbz = FbzMode(self.regs.u(FBZ_MODE));
        let ram = &self.fbi.ram;

        let size = ram.mask() + 1;
        let destmax = (size - dest) / 2;
        let aux = self.fbi.auxoffs.map(|aux| (aux, (size - aux) / 2));

        let scry = screen_y(lfb.y_origin(), self.fbi.yorigin, y);
        let mut bufoffs = (scry as u32).wrapping_mul(self.fbi.rowpixels).wrapping_add(x as u32);
        let dither = Dither::new(fbz, y);
        let alpha_planes = fbz.enable_alpha_planes();

        let mut written = 0;
        for pix in 0..2 {
            if mask == 0 {
                break;
            }

            let present = LfbMask::from_bits_truncate(mask & 0x0f);
            if !present.is_empty() {
                let color = pixels.color[pix];
                if present.contains(LfbMask::RGB) && bufoffs < destmax {
                    ram.set_pixel(dest, bufoffs, dither.pack(x, color.r(), color.g(), color.b()));
                }

                if let Some((aux, _)) = aux.filter(|&(_, auxmax)| bufoffs < auxmax) {
                    if present.contains(LfbMask::ALPHA) && alpha_planes {
                        ram.set_pixel(aux, bufoffs, color.a() as u16);
                    }
                    if present.intersects(LfbMask::DEPTH | LfbMask::DEPTH_MSW) && !alpha_planes {
                        ram.set_pixel(aux, bufoffs, pixels.depth[pix]);
                    }
                }

                written += 1;
            }

            bufoffs = bufoffs.wrapping_add(1);
            x += 1;
            mask >>= 4;
        }

        self.fbi.lfb_stats.pixels_out += written;
    }

    /// Run decoded pixels through the pixel pipeline
    ///
    /// The written depth doubles as both the Z and W iterator, and the
    /// stipple register advances as it would for a triangle.
    fn lfb_write_pipelined(&mut self, pixels: &LfbPixels, mut mask: u32, dest: u32, mut x: i32, y: i32) {
        let state = self.render_state(dest, Vec::new());
        let fbz = state.fbz_mode;

        let scry = screen_y(fbz.y_origin(), state.yorigin, y);
        let row_offset = (scry as u32).wrapping_mul(state.rowpixels).wrapping_mul(2);
        let row = Row {
            y,
            dither: Dither::new(fbz, y),
            dest: dest.wrapping_add(row_offset),
            depth: state.aux.map(|aux| aux.wrapping_add(row_offset)),
        };

        let clip_x = self.regs.u(CLIP_LEFT_RIGHT);
        let clip_y = self.regs.u(CLIP_LOW_Y_HIGH_Y);
        let clipped = |x: i32| {
            fbz.enable_clipping()
                && (x < ((clip_x >> 16) & 0x3ff) as i32
                    || x >= (clip_x & 0x3ff) as i32
                    || scry < ((clip_y >> 16) & 0x3ff) as i32
                    || scry >= (clip_y & 0x3ff) as i32)
        };

        let mut stipple = self.regs.u(STIPPLE);
        let mut stats = Stats::default();

        for pix in 0..2 {
            if mask == 0 {
                break;
            }

            if mask & 0x0f != 0 {
                let depth = i32::from(pixels.depth[pix]);
                let it = Iterators {
                    z: depth << 12,
                    w: i64::from(depth) << 14,
                    ..Iterators::default()
                };

                if clipped(x) {
                    stats.pixels_in += 1;
                } else {
                    state.shade_pixel(&row, &mut stats, &mut stipple, x, &it, PixelSource::Direct(pixels.color[pix]));
                }
            }

            x += 1;
            mask >>= 4;
        }

        self.regs.set(STIPPLE, stipple);
        self.fbi.lfb_stats += stats;
    }

    /// LFB read of two adjacent 16-bit pixels
    ///
    /// Reads outside the selected buffer, or from a missing aux buffer,
    /// return all ones.
    pub(crate) fn lfb_read(&mut self, offset: u32) -> u32 {
        let mode = LfbMode(self.regs.u(LFB_MODE));
        let x = (offset << 1) & 0x3fe;
        let y = ((offset >> 9) & 0x3ff) as i32;

        let select = mode.read_buffer_select();
        let buffer = match select {
            0 | 1 => self.fbi.select_buffer(select),
            2 => self.fbi.aux_buffer(),
            _ => None,
        };
        let Some(base) = buffer else {
            return 0xffff_ffff;
        };

        let ram = &self.fbi.ram;
        let bufmax = (ram.mask() + 1 - base) / 2;
        let scry = screen_y(mode.y_origin(), self.fbi.yorigin, y) as u32;
        let bufoffs = scry.wrapping_mul(self.fbi.rowpixels).wrapping_add(x);
        if bufoffs >= bufmax {
            return 0xffff_ffff;
        }

        let mut data = u32::from(ram.pixel(base, bufoffs)) | (u32::from(ram.pixel(base, bufoffs + 1)) << 16);
        if mode.word_swap_reads() {
            data = data.rotate_left(16);
        }
        if mode.byte_swizzle_reads() {
            data = data.swap_bytes();
        }
        data
    }
}
