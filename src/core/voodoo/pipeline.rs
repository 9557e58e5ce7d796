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

//! Per-pixel pipeline
//!
//! Every rasterized pixel (and every pipelined LFB write) runs through the
//! same ordered chain of stages:
//!
//! ```text
//!  stipple ─► depth value ─► depth test ─► texture (TMU1, TMU0)
//!                                               │
//!   ┌───────────────────────────────────────────┘
//!   ▼
//!  chroma key ─► alpha mask ─► alpha test ─► color combine
//!                                               │
//!   ┌───────────────────────────────────────────┘
//!   ▼
//!  fog ─► alpha blend ─► dither ─► color / aux write
//! ```
//!
//! A failing test ends the pixel early: the matching statistic is bumped
//! and neither buffer is touched. Stages are written as functions returning
//! `Option<()>` so the driver can chain them with `?`.
//!
//! All inputs live in a [`RenderState`] captured once per command. The
//! state is immutable and `Send + Sync`, so raster workers share it
//! through an `Arc` while the emulation thread keeps mutating the live
//! registers.

use super::color::Argb;
use super::dither::Dither;
use super::fbi::Gradients;
use super::math::{clamp_u16, clamp_u8};
use super::modes::{AlphaMode, ChromaRange, FbzColorPath, FbzMode, FogMode};
use super::stats::Stats;
use super::tmu::TmuState;
use crate::core::memory::VideoMemory;

/// Immutable snapshot of everything the pixel pipeline reads
#[derive(Clone)]
pub struct RenderState {
    pub color_path: FbzColorPath,
    pub fbz_mode: FbzMode,
    pub alpha_mode: AlphaMode,
    pub fog_mode: FogMode,
    pub za_color: u32,
    pub color0: Argb,
    pub color1: Argb,
    pub fog_color: Argb,
    pub chroma_key: u32,
    pub chroma_range: ChromaRange,
    pub stipple: u32,
    pub clip_left_right: u32,
    pub clip_low_y_high_y: u32,
    pub fogblend: [u8; 64],
    pub fogdelta: [u8; 64],
    pub fogdelta_mask: u8,
    pub yorigin: i32,
    pub rowpixels: u32,
    /// Frame buffer memory
    pub ram: VideoMemory,
    /// Byte offset of the buffer being drawn
    pub drawbuf: u32,
    /// Byte offset of the aux buffer, if the layout has one
    pub aux: Option<u32>,
    /// Active texture units, TMU0 first
    pub tmus: Vec<TmuState>,
    /// Replace TMU0 output with `tmu_config` (`trexInit1` bit 18)
    pub send_config: bool,
    pub tmu_config: u32,
    /// FBI iterators of the current triangle
    pub grad: Gradients,
    /// Vertex A in 12.4, origin of the iterators
    pub ax: i16,
    pub ay: i16,
}

/// Per-TMU texture coordinates of one pixel (16.32)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TexCoord {
    pub s: i64,
    pub t: i64,
    pub w: i64,
}

/// Iterated values of one pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Iterators {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
    pub z: i32,
    pub w: i64,
    pub tex: [TexCoord; 2],
}

/// Color input of a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSource {
    /// Triangle pixel: color comes from the iterators and texture units
    Iterated,
    /// Pipelined LFB write: color comes straight from the written data
    Direct(Argb),
}

/// Buffer rows and dither phase of the scanline being shaded
#[derive(Clone, Copy)]
pub struct Row {
    /// Unflipped Y (selects the dither and stipple rows)
    pub y: i32,
    pub dither: Dither,
    /// Byte offset of the first pixel of the destination row
    pub dest: u32,
    /// Byte offset of the first pixel of the aux row
    pub depth: Option<u32>,
}

#[inline(always)]
fn reject(counter: &mut i32) -> Option<()> {
    *counter += 1;
    None
}

#[inline(always)]
fn pass(ok: bool) -> Option<()> {
    ok.then_some(())
}

/// Iterated color clamped (or wrapped) to 8-bit channels
#[inline]
pub fn clamped_argb(it: &Iterators, cp: FbzColorPath) -> Argb {
    let channel = |iter: i32| -> i32 {
        let v = iter >> 12;
        if cp.rgbzw_clamp() {
            clamp_u8(v)
        } else {
            match v & 0xfff {
                0xfff => 0,
                0x100 => 0xff,
                v => v & 0xff,
            }
        }
    };
    Argb::from_i32(channel(it.a), channel(it.r), channel(it.g), channel(it.b))
}

/// Iterated Z reduced to 16 bits
#[inline]
pub fn clamped_z(iterz: i32, cp: FbzColorPath) -> i32 {
    let v = iterz >> 12;
    if cp.rgbzw_clamp() {
        clamp_u16(v)
    } else {
        match v & 0xfffff {
            0xfffff => 0,
            0x10000 => 0xffff,
            v => v & 0xffff,
        }
    }
}

/// Integer part of iterated W reduced to 8 bits
#[inline]
pub fn clamped_w(iterw: i64, cp: FbzColorPath) -> i32 {
    let v = i32::from((iterw >> 32) as i16);
    if cp.rgbzw_clamp() {
        clamp_u8(v)
    } else {
        match v & 0xffff {
            0xffff => 0,
            0x100 => 0xff,
            v => v & 0xff,
        }
    }
}

/// 4.12 pseudo-float of a 16.16 or 0.32 magnitude
///
/// Values with no bits in the upper half saturate to 0xffff; otherwise
/// the exponent is the leading-zero count and the mantissa the
/// complemented bits below the leading one.
#[inline]
fn pseudo_float(temp: u32) -> i32 {
    if temp & 0xffff_0000 == 0 {
        return 0xffff;
    }
    let exp = temp.leading_zeros() as i32;
    let shift = (19 - exp).max(0);
    let value = (exp << 12) | ((!temp >> shift) & 0xfff) as i32;
    if value < 0xffff {
        value + 1
    } else {
        value
    }
}

/// Floating-point W used for depth buffering and table fog
#[inline]
pub fn w_float(iterw: i64) -> i32 {
    if iterw & 0xffff_0000_0000 != 0 {
        0
    } else {
        pseudo_float(iterw as u32)
    }
}

impl RenderState {
    /// Stipple test; the rotate mode advances `stipple` for every pixel
    /// that reaches it
    #[inline]
    fn stipple_test(&self, stipple: &mut u32, x: i32, y: i32) -> Option<()> {
        if !self.fbz_mode.enable_stipple() {
            return Some(());
        }

        if !self.fbz_mode.stipple_pattern() {
            *stipple = stipple.rotate_left(1);
            pass(*stipple & 0x8000_0000 != 0)
        } else {
            let index = ((y & 3) << 3) | (!x & 7);
            pass((*stipple >> index) & 1 != 0)
        }
    }

    /// Depth value written to the aux buffer (Z, W or floating Z), biased
    #[inline]
    pub fn depth_value(&self, iterz: i32, wfloat: i32) -> i32 {
        let mode = self.fbz_mode;
        let mut depthval = if !mode.wbuffer_select() {
            clamped_z(iterz, self.color_path)
        } else if !mode.depth_float_select() {
            wfloat
        } else if iterz as u32 & 0xf000_0000 != 0 {
            0
        } else {
            pseudo_float((iterz as u32) << 4)
        };

        if mode.enable_depth_bias() {
            depthval = clamp_u16(depthval + i32::from(self.za_color as i16));
        }
        depthval
    }

    #[inline]
    fn depth_test(&self, stats: &mut Stats, row: &Row, x: i32, depthval: i32) -> Option<()> {
        let mode = self.fbz_mode;
        if !mode.enable_depthbuf() {
            return Some(());
        }

        let source = if mode.depth_source_compare() {
            i32::from(self.za_color as u16)
        } else {
            depthval
        };

        let function = mode.depth_function();
        let passed = match (function, row.depth) {
            (0, _) => false,
            (7, _) | (_, None) => true,
            (_, Some(depth)) => {
                let stored = i32::from(self.ram.pixel(depth, x as u32));
                match function {
                    1 => source < stored,
                    2 => source == stored,
                    3 => source <= stored,
                    4 => source > stored,
                    5 => source != stored,
                    _ => source >= stored,
                }
            }
        };

        if passed {
            Some(())
        } else {
            reject(&mut stats.zfunc_fail)
        }
    }

    /// Chroma key on the selected "other" color
    #[inline]
    fn chroma_key(&self, stats: &mut Stats, color: Argb) -> Option<()> {
        if !self.fbz_mode.enable_chromakey() {
            return Some(());
        }

        let range = self.chroma_range;
        let key = Argb(self.chroma_key);
        let failed = if !range.enable() {
            (color.0 ^ key.0) & 0x00ff_ffff == 0
        } else {
            let high = Argb(range.0);
            let inside = |value: i32, low: i32, high: i32| u32::from(value >= low && value <= high);

            let mut results = inside(color.b(), key.b(), high.b()) ^ u32::from(range.blue_exclusive());
            results <<= 1;
            results |= inside(color.g(), key.g(), high.g());
            results ^= u32::from(range.green_exclusive());
            results <<= 1;
            results |= inside(color.r(), key.r(), high.r());
            results ^= u32::from(range.red_exclusive());

            if range.union_mode() {
                results != 0
            } else {
                results == 7
            }
        };

        if failed {
            reject(&mut stats.chroma_fail)
        } else {
            Some(())
        }
    }

    #[inline]
    fn alpha_mask(&self, stats: &mut Stats, alpha: i32) -> Option<()> {
        if self.fbz_mode.enable_alpha_mask() && alpha & 1 == 0 {
            return reject(&mut stats.afunc_fail);
        }
        Some(())
    }

    #[inline]
    fn alpha_test(&self, stats: &mut Stats, alpha: i32) -> Option<()> {
        let mode = self.alpha_mode;
        if !mode.alpha_test() {
            return Some(());
        }

        let reference = mode.alpha_ref() as i32;
        let passed = match mode.alpha_function() {
            0 => false,
            1 => alpha < reference,
            2 => alpha == reference,
            3 => alpha <= reference,
            4 => alpha > reference,
            5 => alpha != reference,
            6 => alpha >= reference,
            _ => true,
        };

        if passed {
            Some(())
        } else {
            reject(&mut stats.afunc_fail)
        }
    }

    /// Run the texture units (TMU1 feeding TMU0) for one pixel
    fn texture_result(&self, row: &Row, x: i32, it: &Iterators) -> Argb {
        let mut texel = Argb(0);

        if let Some(tmu1) = self.tmus.get(1).filter(|t| t.enabled()) {
            texel = texture_combine(tmu1, row, x, &it.tex[1], texel);
        }

        if let Some(tmu0) = self.tmus.first().filter(|t| t.enabled()) {
            texel = if self.send_config {
                Argb(self.tmu_config)
            } else {
                texture_combine(tmu0, row, x, &it.tex[0], texel)
            };
        }

        texel
    }

    /// Color combine unit for triangle pixels
    ///
    /// # Returns
    ///
    /// The combined color and the iterated color that table-free fog
    /// modes read alpha from. `None` if the chroma key or an alpha test
    /// rejects the pixel.
    fn combine_iterated(&self, stats: &mut Stats, row: &Row, x: i32, it: &Iterators) -> Option<(Argb, Argb)> {
        let cp = self.color_path;
        let texel = self.texture_result(row, x, it);
        let iterargb = clamped_argb(it, cp);

        let c_other = match cp.cc_rgb_select() {
            0 => iterargb,
            1 => texel,
            2 => self.color1,
            _ => Argb(0),
        };
        self.chroma_key(stats, c_other)?;

        let a_other = match cp.cc_a_select() {
            0 => iterargb.a(),
            1 => texel.a(),
            2 => self.color1.a(),
            _ => 0,
        };
        self.alpha_mask(stats, a_other)?;
        self.alpha_test(stats, a_other)?;

        let use_color0 = if cp.cc_local_select_override() {
            texel.a() & 0x80 != 0
        } else {
            cp.cc_local_select()
        };
        let c_local = if use_color0 { self.color0 } else { iterargb };

        let a_local = match cp.cca_local_select() {
            0 => iterargb.a(),
            1 => self.color0.a(),
            2 => clamped_z(it.z, cp) & 0xff,
            _ => clamped_w(it.w, cp) & 0xff,
        };

        let rgb_blend = match cp.cc_mselect() {
            1 => [c_local.r(), c_local.g(), c_local.b()],
            2 => [a_other; 3],
            3 => [a_local; 3],
            4 => [texel.a(); 3],
            5 => [texel.r(), texel.g(), texel.b()],
            _ => [0; 3],
        };
        let a_blend = match cp.cca_mselect() {
            1 | 3 => a_local,
            2 => a_other,
            4 => texel.a(),
            _ => 0,
        };

        let color = combine(
            CombineInputs {
                other: [c_other.r(), c_other.g(), c_other.b()],
                other_alpha: a_other,
                local: [c_local.r(), c_local.g(), c_local.b()],
                local_alpha: a_local,
                rgb_blend,
                a_blend,
            },
            cp,
        );
        Some((color, iterargb))
    }

    /// Color combine unit for pipelined LFB writes
    ///
    /// The written color stands in for both the iterated color and the
    /// "other" color; texture-derived blend factors are zero.
    fn combine_direct(&self, stats: &mut Stats, it: &Iterators, source: Argb) -> Option<(Argb, Argb)> {
        let cp = self.color_path;

        self.chroma_key(stats, source)?;
        self.alpha_mask(stats, source.a())?;
        self.alpha_test(stats, source.a())?;

        let c_local = if !cp.cc_local_select_override() && cp.cc_local_select() {
            self.color0
        } else {
            source
        };
        let a_local = match cp.cca_local_select() {
            0 => source.a(),
            1 => self.color0.a(),
            2 => clamped_z(it.z, cp) & 0xff,
            _ => clamped_w(it.w, cp) & 0xff,
        };

        let rgb_blend = match cp.cc_mselect() {
            1 => [c_local.r(), c_local.g(), c_local.b()],
            3 => [a_local; 3],
            _ => [0; 3],
        };
        let a_blend = match cp.cca_mselect() {
            1 | 3 => a_local,
            _ => 0,
        };

        let color = combine(
            CombineInputs {
                other: [source.r(), source.g(), source.b()],
                other_alpha: source.a(),
                local: [c_local.r(), c_local.g(), c_local.b()],
                local_alpha: a_local,
                rgb_blend,
                a_blend,
            },
            cp,
        );
        Some((color, Argb(self.za_color)))
    }

    /// Fog unit
    fn apply_fog(&self, row: &Row, x: i32, rgb: [i32; 3], it: &Iterators, wfloat: i32, iter_alpha: i32) -> [i32; 3] {
        let mode = self.fog_mode;
        if !mode.enable_fog() {
            return rgb;
        }

        let fog = [self.fog_color.r(), self.fog_color.g(), self.fog_color.b()];
        let mut f = if mode.fog_constant() {
            fog
        } else {
            let mut f = if mode.fog_add() { [0; 3] } else { fog };
            if !mode.fog_mult() {
                for (f, c) in f.iter_mut().zip(rgb) {
                    *f -= c;
                }
            }

            let blend = match mode.fog_zalpha() {
                0 => {
                    let index = (wfloat >> 10) as usize & 0x3f;
                    let delta = i32::from(self.fogdelta[index]);
                    let mut deltaval = (delta & i32::from(self.fogdelta_mask)) * ((wfloat >> 2) & 0xff);
                    if mode.fog_zones() && delta & 2 != 0 {
                        deltaval = -deltaval;
                    }
                    deltaval >>= 6;
                    if mode.fog_dither() {
                        deltaval += row.dither.amount4(x);
                    }
                    deltaval >>= 4;
                    i32::from(self.fogblend[index]) + deltaval
                }
                1 => iter_alpha,
                2 => clamped_z(it.z, self.color_path) >> 8,
                _ => clamped_w(it.w, self.color_path),
            } + 1;

            for f in f.iter_mut() {
                *f = (*f * blend) >> 8;
            }
            f
        };

        if !mode.fog_mult() {
            for (f, c) in f.iter_mut().zip(rgb) {
                *f += c;
            }
        }
        f.map(clamp_u8)
    }

    /// Alpha blending against the destination pixel
    fn alpha_blend(&self, row: &Row, x: i32, rgb: [i32; 3], a: i32, prefog: [i32; 3]) -> ([i32; 3], i32) {
        let mode = self.alpha_mode;
        if !mode.alpha_blend() {
            return (rgb, a);
        }

        let dpix = i32::from(self.ram.pixel(row.dest, x as u32));
        let mut dst = [(dpix >> 8) & 0xf8, (dpix >> 3) & 0xfc, (dpix << 3) & 0xf8];
        let da = match row.depth {
            Some(depth) if self.fbz_mode.enable_alpha_planes() => i32::from(self.ram.pixel(depth, x as u32)),
            _ => 0xff,
        };

        if self.fbz_mode.alpha_dither_subtract() && row.dither.enabled() {
            let dith = row.dither.amount(x);
            dst[0] = ((dst[0] << 1) + 15 - dith) >> 1;
            dst[1] = ((dst[1] << 2) + 15 - dith) >> 2;
            dst[2] = ((dst[2] << 1) + 15 - dith) >> 1;
        }

        let sa = a;
        let mut out = [0; 3];
        for i in 0..3 {
            let s = rgb[i];
            let d = dst[i];

            let src = match mode.src_rgb_blend() {
                1 => (s * (sa + 1)) >> 8,
                2 => (s * (d + 1)) >> 8,
                3 => (s * (da + 1)) >> 8,
                4 => s,
                5 => (s * (0x100 - sa)) >> 8,
                6 => (s * (0x100 - d)) >> 8,
                7 => (s * (0x100 - da)) >> 8,
                15 => (s * (sa.min(0x100 - da) + 1)) >> 8,
                _ => 0,
            };
            let dest = match mode.dst_rgb_blend() {
                1 => (d * (sa + 1)) >> 8,
                2 => (d * (s + 1)) >> 8,
                3 => (d * (da + 1)) >> 8,
                4 => d,
                5 => (d * (0x100 - sa)) >> 8,
                6 => (d * (0x100 - s)) >> 8,
                7 => (d * (0x100 - da)) >> 8,
                15 => (d * (prefog[i] + 1)) >> 8,
                _ => 0,
            };
            out[i] = clamp_u8(src + dest);
        }

        let mut alpha = if mode.src_alpha_blend() == 4 { sa } else { 0 };
        if mode.dst_alpha_blend() == 4 {
            alpha += da;
        }

        (out, clamp_u8(alpha))
    }

    /// Run one pixel through the whole pipeline
    ///
    /// Counts the pixel in `pixels_in`, and in `pixels_out` if it survives
    /// every test (whether or not a buffer mask allows the write).
    ///
    /// # Arguments
    ///
    /// * `row` - Destination rows and dither phase
    /// * `stats` - Statistics block of the calling worker
    /// * `stipple` - Running stipple pattern
    /// * `x` - Pixel column
    /// * `it` - Iterated values at this pixel
    /// * `source` - Where the pixel color comes from
    pub fn shade_pixel(
        &self,
        row: &Row,
        stats: &mut Stats,
        stipple: &mut u32,
        x: i32,
        it: &Iterators,
        source: PixelSource,
    ) {
        stats.pixels_in += 1;
        if self.shade(row, stats, stipple, x, it, source).is_some() {
            stats.pixels_out += 1;
        }
    }

    fn shade(
        &self,
        row: &Row,
        stats: &mut Stats,
        stipple: &mut u32,
        x: i32,
        it: &Iterators,
        source: PixelSource,
    ) -> Option<()> {
        self.stipple_test(stipple, x, row.y)?;

        let wfloat = w_float(it.w);
        let depthval = self.depth_value(it.z, wfloat);
        self.depth_test(stats, row, x, depthval)?;

        let (color, iterargb) = match source {
            PixelSource::Iterated => self.combine_iterated(stats, row, x, it)?,
            PixelSource::Direct(color) => self.combine_direct(stats, it, color)?,
        };

        let prefog = [color.r(), color.g(), color.b()];
        let rgb = self.apply_fog(row, x, prefog, it, wfloat, iterargb.a());
        let (rgb, a) = self.alpha_blend(row, x, rgb, color.a(), prefog);

        let mode = self.fbz_mode;
        if mode.rgb_buffer_mask() {
            let pixel = row.dither.pack(x, rgb[0], rgb[1], rgb[2]);
            self.ram.set_pixel(row.dest, x as u32, pixel);
        }
        if let Some(depth) = row.depth {
            if mode.aux_buffer_mask() {
                let value = if mode.enable_alpha_planes() { a } else { depthval };
                self.ram.set_pixel(depth, x as u32, value as u16);
            }
        }

        Some(())
    }
}

/// Operands of a combine unit (texture or color)
struct CombineInputs {
    other: [i32; 3],
    other_alpha: i32,
    local: [i32; 3],
    local_alpha: i32,
    rgb_blend: [i32; 3],
    a_blend: i32,
}

/// Combine-unit control bits shared by `fbzColorPath` and `textureMode`
trait CombineControl: Copy {
    fn zero_other(self) -> bool;
    fn sub_clocal(self) -> bool;
    fn reverse_blend(self) -> bool;
    fn add_aclocal(self) -> u32;
    fn invert(self) -> bool;
    fn a_zero_other(self) -> bool;
    fn a_sub_clocal(self) -> bool;
    fn a_reverse_blend(self) -> bool;
    fn a_add(self) -> bool;
    fn a_invert(self) -> bool;
}

impl CombineControl for FbzColorPath {
    fn zero_other(self) -> bool {
        self.cc_zero_other()
    }
    fn sub_clocal(self) -> bool {
        self.cc_sub_clocal()
    }
    fn reverse_blend(self) -> bool {
        self.cc_reverse_blend()
    }
    fn add_aclocal(self) -> u32 {
        self.cc_add_aclocal()
    }
    fn invert(self) -> bool {
        self.cc_invert_output()
    }
    fn a_zero_other(self) -> bool {
        self.cca_zero_other()
    }
    fn a_sub_clocal(self) -> bool {
        self.cca_sub_clocal()
    }
    fn a_reverse_blend(self) -> bool {
        self.cca_reverse_blend()
    }
    fn a_add(self) -> bool {
        self.cca_add_aclocal() != 0
    }
    fn a_invert(self) -> bool {
        self.cca_invert_output()
    }
}

impl CombineControl for super::modes::TextureMode {
    fn zero_other(self) -> bool {
        self.tc_zero_other()
    }
    fn sub_clocal(self) -> bool {
        self.tc_sub_clocal()
    }
    fn reverse_blend(self) -> bool {
        self.tc_reverse_blend()
    }
    fn add_aclocal(self) -> u32 {
        self.tc_add_aclocal()
    }
    fn invert(self) -> bool {
        self.tc_invert_output()
    }
    fn a_zero_other(self) -> bool {
        self.tca_zero_other()
    }
    fn a_sub_clocal(self) -> bool {
        self.tca_sub_clocal()
    }
    fn a_reverse_blend(self) -> bool {
        self.tca_reverse_blend()
    }
    fn a_add(self) -> bool {
        self.tca_add_aclocal() != 0
    }
    fn a_invert(self) -> bool {
        self.tca_invert_output()
    }
}

/// `(zero|other - local?) * (blend + 1) / 256 + (local|alocal)?`, clamped
/// and optionally inverted
fn combine(inputs: CombineInputs, ctl: impl CombineControl) -> Argb {
    let mut rgb = if ctl.zero_other() { [0; 3] } else { inputs.other };
    let mut a = if ctl.a_zero_other() { 0 } else { inputs.other_alpha };

    if ctl.sub_clocal() {
        for (c, l) in rgb.iter_mut().zip(inputs.local) {
            *c -= l;
        }
    }
    if ctl.a_sub_clocal() {
        a -= inputs.local_alpha;
    }

    let mut blend = inputs.rgb_blend;
    let mut a_blend = inputs.a_blend;
    if !ctl.reverse_blend() {
        for b in blend.iter_mut() {
            *b ^= 0xff;
        }
    }
    if !ctl.a_reverse_blend() {
        a_blend ^= 0xff;
    }

    for (c, b) in rgb.iter_mut().zip(blend) {
        *c = (*c * (b + 1)) >> 8;
    }
    a = (a * (a_blend + 1)) >> 8;

    match ctl.add_aclocal() {
        1 => {
            for (c, l) in rgb.iter_mut().zip(inputs.local) {
                *c += l;
            }
        }
        2 => {
            for c in rgb.iter_mut() {
                *c += inputs.local_alpha;
            }
        }
        _ => {}
    }
    if ctl.a_add() {
        a += inputs.local_alpha;
    }

    let mut result = Argb::from_i32(clamp_u8(a), clamp_u8(rgb[0]), clamp_u8(rgb[1]), clamp_u8(rgb[2]));
    if ctl.invert() {
        result.0 ^= 0x00ff_ffff;
    }
    if ctl.a_invert() {
        result.0 ^= 0xff00_0000;
    }
    result
}

/// Texture combine unit of one TMU
///
/// `c_other` is the output of the upstream unit (zero for the first).
fn texture_combine(tmu: &TmuState, row: &Row, x: i32, coord: &TexCoord, c_other: Argb) -> Argb {
    let (c_local, lod) = tmu.fetch(x, &row.dither, coord.s, coord.t, coord.w);

    let detail = if tmu.detailbias <= lod {
        0
    } else {
        (((tmu.detailbias - lod) << tmu.detailscale) >> 8).min(tmu.detailmax)
    };

    let mode = tmu.mode;
    let rgb_blend = match mode.tc_mselect() {
        1 => [c_local.r(), c_local.g(), c_local.b()],
        2 => [c_other.a(); 3],
        3 => [c_local.a(); 3],
        4 => [detail; 3],
        5 => [lod & 0xff; 3],
        _ => [0; 3],
    };
    let a_blend = match mode.tca_mselect() {
        1 | 3 => c_local.a(),
        2 => c_other.a(),
        4 => detail,
        5 => lod & 0xff,
        _ => 0,
    };

    combine(
        CombineInputs {
            other: [c_other.r(), c_other.g(), c_other.b()],
            other_alpha: c_other.a(),
            local: [c_local.r(), c_local.g(), c_local.b()],
            local_alpha: c_local.a(),
            rgb_blend,
            a_blend,
        },
        mode,
    )
}
