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

//! Texture mapping unit (TMU)
//!
//! Each TMU owns a private block of texture memory and the derived state
//! needed to fetch texels from it:
//!
//! - A 9-entry table of mip-level base offsets, recomputed lazily from
//!   `texBaseAddr`, `tLOD` and `textureMode` whenever one of them is written
//! - Two NCC (YIQ) tables, each expanded to a 256-entry lookup on demand
//! - An 8-bit palette (and on Voodoo 2, a palette with alpha)
//!
//! # Texel Formats
//!
//! | Format | Bits | Decode            |
//! |--------|------|-------------------|
//! | 0      | 8    | RGB 3-3-2         |
//! | 1      | 8    | NCC (YIQ)         |
//! | 2      | 8    | alpha             |
//! | 3      | 8    | intensity         |
//! | 4      | 8    | alpha/intensity 4-4 |
//! | 5      | 8    | palette           |
//! | 6      | 8    | palette + alpha (Voodoo 2) |
//! | 8      | 16   | alpha 8 + RGB 3-3-2 |
//! | 9      | 16   | alpha 8 + NCC     |
//! | 10     | 16   | RGB 5-6-5         |
//! | 11     | 16   | ARGB 1-5-5-5      |
//! | 12     | 16   | ARGB 4-4-4-4      |
//! | 13     | 16   | alpha 8 + intensity 8 |
//! | 14     | 16   | alpha 8 + palette |
//!
//! The 16-bit formats 8, 9, 13 and 14 decode the low byte through the
//! matching 8-bit table and take alpha from the high byte.

use super::color::{extract_1555, extract_332, extract_4444, extract_565, Argb};
use super::dither::Dither;
use super::math::{clamp_u8, fast_reciplog, rgba_bilinear_filter};
use super::modes::{TexDetail, TexLod, TextureMode};
use super::registers::{RegisterFile, TEXTURE_MODE, TEX_BASE_ADDR, T_DETAIL, T_LOD};
use crate::core::error::Result;
use crate::core::memory::VideoMemory;
use std::sync::{Arc, OnceLock};

const TEXADDR_MASK: u32 = 0x0f_ffff;
const TEXADDR_SHIFT: u32 = 3;

#[inline(always)]
fn make_argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    ((a & 0xff) << 24) | ((r & 0xff) << 16) | ((g & 0xff) << 8) | (b & 0xff)
}

/// Fixed decode tables shared by every TMU
struct StaticTables {
    rgb332: Vec<u32>,
    alpha8: Vec<u32>,
    int8: Vec<u32>,
    ai44: Vec<u32>,
    rgb565: Vec<u32>,
    argb1555: Vec<u32>,
    argb4444: Vec<u32>,
}

fn static_tables() -> &'static StaticTables {
    static TABLES: OnceLock<StaticTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let byte = |f: fn(u32) -> u32| (0..256u32).map(f).collect::<Vec<_>>();
        let word = |f: fn(u32) -> u32| (0..65536u32).map(f).collect::<Vec<_>>();

        StaticTables {
            rgb332: byte(|v| {
                let (r, g, b) = extract_332(v);
                make_argb(0xff, r.into(), g.into(), b.into())
            }),
            alpha8: byte(|v| make_argb(v, v, v, v)),
            int8: byte(|v| make_argb(0xff, v, v, v)),
            ai44: byte(|v| {
                let a = (v & 0xf0) | ((v >> 4) & 0x0f);
                let i = ((v << 4) & 0xf0) | (v & 0x0f);
                make_argb(a, i, i, i)
            }),
            rgb565: word(|v| {
                let (r, g, b) = extract_565(v);
                make_argb(0xff, r.into(), g.into(), b.into())
            }),
            argb1555: word(|v| {
                let (a, r, g, b) = extract_1555(v);
                make_argb(a.into(), r.into(), g.into(), b.into())
            }),
            argb4444: word(|v| {
                let (a, r, g, b) = extract_4444(v);
                make_argb(a.into(), r.into(), g.into(), b.into())
            }),
        }
    })
}

/// Texel decode table selected by the texture format
#[derive(Clone)]
pub enum TexelTable {
    /// One of the fixed decode tables (256 or 65536 entries)
    Static(&'static [u32]),
    /// NCC expansion or palette owned by the TMU
    Shared(Arc<[u32; 256]>),
    /// Reserved format; every texel decodes to zero
    Missing,
}

impl TexelTable {
    #[inline(always)]
    pub fn get(&self, index: u32) -> u32 {
        match self {
            TexelTable::Static(table) => table[index as usize & (table.len() - 1)],
            TexelTable::Shared(table) => table[(index & 0xff) as usize],
            TexelTable::Missing => 0,
        }
    }
}

/// One NCC (YIQ) decompression table
///
/// Twelve registers feed it: four packed Y (intensity) words followed by
/// four I and four Q vectors of signed 9-bit RGB offsets.
#[derive(Debug, Clone)]
pub struct NccTable {
    regs: [u32; 12],
    y: [i32; 16],
    ir: [i32; 4],
    ig: [i32; 4],
    ib: [i32; 4],
    qr: [i32; 4],
    qg: [i32; 4],
    qb: [i32; 4],
    texel: Arc<[u32; 256]>,
    dirty: bool,
}

impl NccTable {
    fn new() -> Self {
        Self {
            regs: [0; 12],
            y: [0; 16],
            ir: [0; 4],
            ig: [0; 4],
            ib: [0; 4],
            qr: [0; 4],
            qg: [0; 4],
            qb: [0; 4],
            texel: Arc::new([0; 256]),
            dirty: true,
        }
    }

    /// Store one table register
    ///
    /// Rewriting the current value does not dirty the table.
    pub fn write(&mut self, index: usize, data: u32) {
        if index >= self.regs.len() || self.regs[index] == data {
            return;
        }
        self.regs[index] = data;

        let signed9 = |shift: u32| ((data << shift) as i32) >> 23;
        match index {
            0..=3 => {
                for (i, y) in self.y[index * 4..index * 4 + 4].iter_mut().enumerate() {
                    *y = ((data >> (i * 8)) & 0xff) as i32;
                }
            }
            4..=7 => {
                let i = index & 3;
                self.ir[i] = signed9(5);
                self.ig[i] = signed9(14);
                self.ib[i] = signed9(23);
            }
            _ => {
                let i = index & 3;
                self.qr[i] = signed9(5);
                self.qg[i] = signed9(14);
                self.qb[i] = signed9(23);
            }
        }

        self.dirty = true;
    }

    /// Rebuild the 256-entry expansion if any register changed
    pub fn update(&mut self) {
        if !self.dirty {
            return;
        }

        let texel = Arc::make_mut(&mut self.texel);
        for (i, entry) in texel.iter_mut().enumerate() {
            let vi = (i >> 2) & 0x03;
            let vq = i & 0x03;
            let y = self.y[(i >> 4) & 0x0f];

            let r = clamp_u8(y + self.ir[vi] + self.qr[vq]);
            let g = clamp_u8(y + self.ig[vi] + self.qg[vq]);
            let b = clamp_u8(y + self.ib[vi] + self.qb[vq]);
            *entry = make_argb(0xff, r as u32, g as u32, b as u32);
        }

        self.dirty = false;
    }

    /// Whether the expansion is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw register value
    pub fn reg(&self, index: usize) -> u32 {
        self.regs[index % self.regs.len()]
    }
}

/// Starting values and gradients of the per-TMU iterators
///
/// S and T are 14.18 values widened to 16.32; W is 16.32.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TexGradients {
    pub starts: i64,
    pub startt: i64,
    pub startw: i64,
    pub dsdx: i64,
    pub dtdx: i64,
    pub dwdx: i64,
    pub dsdy: i64,
    pub dtdy: i64,
    pub dwdy: i64,
}

/// Mip-level layout derived from the mode registers
#[derive(Debug, Clone, Copy, Default)]
struct TextureParams {
    lodmin: i32,
    lodmax: i32,
    lodbias: i32,
    lodmask: u32,
    lodoffset: [u32; 9],
    wmask: u32,
    hmask: u32,
    detailmax: i32,
    detailbias: i32,
    detailscale: u32,
}

/// A texture mapping unit
pub struct Tmu {
    pub(crate) ram: VideoMemory,
    bank: usize,
    regdirty: bool,
    pub(crate) grad: TexGradients,
    params: TextureParams,
    ncc: [NccTable; 2],
    palette: Arc<[u32; 256]>,
    palettea: Option<Arc<[u32; 256]>>,
    bilinear_mask: i32,
    warned_multibase: bool,
}

impl Tmu {
    /// Create a TMU with `size` bytes of texture memory
    ///
    /// # Arguments
    ///
    /// * `size` - Texture memory size in bytes (power of two)
    /// * `bank` - Register bank of this unit (`TMU0_BANK` or `TMU1_BANK`)
    /// * `is_v2` - Voodoo 2 unit (full bilinear precision, palette with alpha)
    ///
    /// # Errors
    ///
    /// Fails if the texture memory cannot be allocated.
    pub fn new(size: usize, bank: usize, is_v2: bool) -> Result<Self> {
        Ok(Self {
            ram: VideoMemory::new(size)?,
            bank,
            regdirty: true,
            grad: TexGradients::default(),
            params: TextureParams::default(),
            ncc: [NccTable::new(), NccTable::new()],
            palette: Arc::new([0; 256]),
            palettea: is_v2.then(|| Arc::new([0; 256])),
            bilinear_mask: if is_v2 { 0xff } else { 0xf0 },
            warned_multibase: false,
        })
    }

    /// Texture memory of this unit
    pub fn memory(&self) -> &VideoMemory {
        &self.ram
    }

    /// Flag the mip-level layout for recomputation
    pub fn mark_dirty(&mut self) {
        self.regdirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.regdirty
    }

    /// NCC table `which` (0 or 1)
    pub fn ncc(&self, which: usize) -> &NccTable {
        &self.ncc[which & 1]
    }

    /// Palette entry `index`
    pub fn palette_entry(&self, index: usize) -> u32 {
        self.palette[index & 0xff]
    }

    /// Write register `index` of NCC table `which`
    ///
    /// On table 0, I/Q writes with bit 31 set load the palette instead of
    /// the table.
    pub fn write_ncc(&mut self, which: usize, index: usize, data: u32) {
        if which == 0 && index >= 4 && data & 0x8000_0000 != 0 {
            let entry = (((data >> 23) & 0xfe) | (index as u32 & 1)) as usize;
            Arc::make_mut(&mut self.palette)[entry] = 0xff00_0000 | data;

            if let Some(palettea) = self.palettea.as_mut() {
                let a = ((data >> 16) & 0xfc) | ((data >> 22) & 0x03);
                let r = ((data >> 10) & 0xfc) | ((data >> 16) & 0x03);
                let g = ((data >> 4) & 0xfc) | ((data >> 10) & 0x03);
                let b = ((data << 2) & 0xfc) | ((data >> 4) & 0x03);
                Arc::make_mut(palettea)[entry] = make_argb(a, r, g, b);
            }
            return;
        }

        self.ncc[which & 1].write(index, data);
    }

    /// Rebuild the mip-level layout from the mode registers
    pub fn recompute(&mut self, regs: &RegisterFile) {
        let tlod = TexLod(regs.bank(self.bank, T_LOD));
        let mode = TextureMode(regs.bank(self.bank, TEXTURE_MODE));
        let detail = TexDetail(regs.bank(self.bank, T_DETAIL));
        let mask = self.ram.mask();
        let p = &mut self.params;

        p.lodmin = (tlod.lod_min() << 6) as i32;
        p.lodmax = (tlod.lod_max() << 6) as i32;
        p.lodbias = i32::from(((tlod.lod_bias() << 2) as u8) as i8) << 4;

        p.lodmask = 0x1ff;
        if tlod.lod_tsplit() {
            p.lodmask = if tlod.lod_odd() { 0x0aa } else { 0x155 };
        }

        p.wmask = 0xff;
        p.hmask = 0xff;
        if tlod.lod_s_is_wider() {
            p.hmask >>= tlod.lod_aspect();
        } else {
            p.wmask >>= tlod.lod_aspect();
        }

        if tlod.multi_base_addr() && !self.warned_multibase {
            log::warn!("TMU bank {:#x}: multi-base texture addressing is not supported", self.bank);
            self.warned_multibase = true;
        }

        let bppscale = mode.format() >> 3;
        let mut base = (regs.bank(self.bank, TEX_BASE_ADDR) & TEXADDR_MASK) << TEXADDR_SHIFT;
        p.lodoffset[0] = base & mask;

        for lod in 1..=8usize {
            let prev = lod - 1;
            if p.lodmask & (1 << prev) != 0 {
                let mut size = ((p.wmask >> prev) + 1) * ((p.hmask >> prev) + 1);
                if lod >= 4 {
                    size = size.max(4);
                }
                base = base.wrapping_add(size << bppscale);
            }
            p.lodoffset[lod] = base & mask;
        }

        p.detailmax = detail.detail_max() as i32;
        p.detailbias = i32::from(((detail.detail_bias() << 2) as u8) as i8) << 6;
        p.detailscale = detail.detail_scale();

        if detail.separate_rgba_filter() {
            log::warn!("TMU bank {:#x}: separate RGBA filtering is not supported", self.bank);
        }

        self.regdirty = false;
    }

    fn texel_table(&self, mode: TextureMode) -> TexelTable {
        let tables = static_tables();
        let ncc = &self.ncc[mode.ncc_table_select() as usize];
        match mode.format() {
            0 | 8 => TexelTable::Static(&tables.rgb332),
            1 | 9 => TexelTable::Shared(Arc::clone(&ncc.texel)),
            2 => TexelTable::Static(&tables.alpha8),
            3 | 13 => TexelTable::Static(&tables.int8),
            4 => TexelTable::Static(&tables.ai44),
            5 | 14 => TexelTable::Shared(Arc::clone(&self.palette)),
            6 => match &self.palettea {
                Some(palettea) => TexelTable::Shared(Arc::clone(palettea)),
                None => TexelTable::Missing,
            },
            10 => TexelTable::Static(&tables.rgb565),
            11 => TexelTable::Static(&tables.argb1555),
            12 => TexelTable::Static(&tables.argb4444),
            _ => TexelTable::Missing,
        }
    }

    /// Bring the unit up to date for a triangle and snapshot it
    ///
    /// Recomputes the layout if dirty, refreshes the selected NCC table,
    /// derives the base LOD from the S/T gradients and returns the immutable
    /// state the raster workers sample from.
    ///
    /// # Arguments
    ///
    /// * `regs` - Register file
    /// * `bilinear` - Allow bilinear filtering (clears the filter bits when false)
    pub fn prepare(&mut self, regs: &RegisterFile, bilinear: bool) -> TmuState {
        if self.regdirty {
            self.recompute(regs);
        }

        let mut mode = TextureMode(regs.bank(self.bank, TEXTURE_MODE));
        if mode.format() & 7 == 1 {
            self.ncc[mode.ncc_table_select() as usize].update();
        }

        let g = &self.grad;
        let texdx = (g.dsdx >> 14).wrapping_mul(g.dsdx >> 14).wrapping_add((g.dtdx >> 14).wrapping_mul(g.dtdx >> 14));
        let texdy = (g.dsdy >> 14).wrapping_mul(g.dsdy >> 14).wrapping_add((g.dtdy >> 14).wrapping_mul(g.dtdy >> 14));
        let (_, lodbase) = fast_reciplog(texdx.max(texdy) >> 16);
        let lodbase = (-lodbase + (12 << 8)) / 2;

        let lookup = self.texel_table(mode);
        if !bilinear {
            mode = TextureMode(mode.0 & !6);
        }

        let p = &self.params;
        TmuState {
            ram: self.ram.clone(),
            mode,
            grad: self.grad,
            lodmin: p.lodmin,
            lodmax: p.lodmax,
            lodbias: p.lodbias,
            lodmask: p.lodmask,
            lodoffset: p.lodoffset,
            lodbase,
            wmask: p.wmask as i32,
            hmask: p.hmask as i32,
            detailmax: p.detailmax,
            detailbias: p.detailbias,
            detailscale: p.detailscale,
            bilinear_mask: self.bilinear_mask,
            lookup,
        }
    }

    /// Texture memory write path
    ///
    /// `offset` is the word offset within the texture window:
    ///
    /// ```text
    /// bits 19-20  TMU select (handled by the caller)
    /// bits 15-18  LOD
    /// bits  7-14  T
    /// bits  0-6   S (scaled by texel size)
    /// ```
    ///
    /// 8-bit formats store four texels, 16-bit formats two. `seq_8_downld`
    /// comes from TMU0's `textureMode` regardless of the target unit.
    pub fn texture_write(&mut self, regs: &RegisterFile, offset: u32, data: u32, seq_8_downld: bool) {
        let tlod = TexLod(regs.bank(self.bank, T_LOD));
        if tlod.tdirect_write() {
            log::warn!("TMU bank {:#x}: direct texture writes are not supported", self.bank);
            return;
        }

        if self.regdirty {
            self.recompute(regs);
        }

        let mut data = data;
        if tlod.tdata_swizzle() {
            data = data.swap_bytes();
        }
        if tlod.tdata_swap() {
            data = data.rotate_left(16);
        }

        let lod = ((offset >> 15) & 0x0f) as usize;
        if lod > 8 {
            return;
        }
        let tt = (offset >> 7) & 0xff;
        let row = (self.params.wmask >> lod) + 1;
        let format = TextureMode(regs.bank(self.bank, TEXTURE_MODE)).format();

        if format < 8 {
            let ts = if seq_8_downld {
                (offset << 2) & 0xfc
            } else {
                (offset << 1) & 0xfc
            };
            let addr = self.params.lodoffset[lod].wrapping_add(tt * row + ts);
            for (i, byte) in data.to_le_bytes().into_iter().enumerate() {
                self.ram.write8(addr.wrapping_add(i as u32), byte);
            }
            log::trace!("texture 8-bit write: lod={lod} s={ts} t={tt} data={data:#010x}");
        } else {
            let ts = (offset << 1) & 0xfe;
            let addr = self.params.lodoffset[lod].wrapping_add(2 * (tt * row + ts));
            self.ram.write16(addr, data as u16);
            self.ram.write16(addr.wrapping_add(2), (data >> 16) as u16);
            log::trace!("texture 16-bit write: lod={lod} s={ts} t={tt} data={data:#010x}");
        }
    }

    /// Base offset of mip level `lod` (after the last recompute)
    pub fn lod_offset(&self, lod: usize) -> u32 {
        self.params.lodoffset[lod.min(8)]
    }
}

impl std::fmt::Debug for Tmu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tmu")
            .field("bank", &self.bank)
            .field("ram", &self.ram)
            .field("regdirty", &self.regdirty)
            .finish_non_exhaustive()
    }
}

/// Immutable per-triangle view of a TMU used by the raster workers
#[derive(Clone)]
pub struct TmuState {
    pub ram: VideoMemory,
    pub mode: TextureMode,
    pub grad: TexGradients,
    pub lodmin: i32,
    pub lodmax: i32,
    pub lodbias: i32,
    pub lodmask: u32,
    pub lodoffset: [u32; 9],
    pub lodbase: i32,
    pub wmask: i32,
    pub hmask: i32,
    pub detailmax: i32,
    pub detailbias: i32,
    pub detailscale: u32,
    pub bilinear_mask: i32,
    pub lookup: TexelTable,
}

impl TmuState {
    /// A LOD minimum of 8 or more switches the unit off
    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.lodmin < (8 << 8)
    }

    #[inline(always)]
    fn texel(&self, texbase: u32, index: i32) -> u32 {
        let format = self.mode.format();
        if format < 8 {
            let raw = self.ram.read8(texbase.wrapping_add(index as u32));
            self.lookup.get(u32::from(raw))
        } else {
            let raw = u32::from(self.ram.read16(texbase.wrapping_add((index as u32).wrapping_mul(2))));
            if (10..=12).contains(&format) {
                self.lookup.get(raw)
            } else {
                (self.lookup.get(raw & 0xff) & 0x00ff_ffff) | ((raw & 0xff00) << 16)
            }
        }
    }

    /// Fetch the filtered texel for one pixel
    ///
    /// # Returns
    ///
    /// `(texel, lod)` where `lod` is the clamped 8.8 level of detail used
    /// by the detail and LOD-fraction blend factors.
    pub fn fetch(&self, x: i32, dither: &Dither, iters: i64, itert: i64, iterw: i64) -> (Argb, i32) {
        let mode = self.mode;

        let (mut s, mut t, mut lod) = if mode.enable_perspective() {
            let (oow, log) = fast_reciplog(iterw);
            (
                (oow.wrapping_mul(iters) >> 29) as i32,
                (oow.wrapping_mul(itert) >> 29) as i32,
                log + self.lodbase,
            )
        } else {
            ((iters >> 14) as i32, (itert >> 14) as i32, self.lodbase)
        };

        if mode.clamp_neg_w() && iterw < 0 {
            s = 0;
            t = 0;
        }

        lod += self.lodbias;
        if mode.enable_lod_dither() {
            lod += dither.amount4(x) << 4;
        }
        if lod < self.lodmin {
            lod = self.lodmin;
        }
        if lod > self.lodmax {
            lod = self.lodmax;
        }

        let mut ilod = (lod >> 8).max(0) as u32;
        if (self.lodmask >> ilod) & 1 == 0 {
            ilod += 1;
        }
        let ilod = ilod.min(8);

        let texbase = self.lodoffset[ilod as usize];
        let smax = self.wmask >> ilod;
        let tmax = self.hmask >> ilod;

        let point_sampled = if lod == self.lodmin {
            !mode.magnification_filter()
        } else {
            !mode.minification_filter()
        };

        let texel = if point_sampled {
            s >>= ilod + 18;
            t >>= ilod + 18;
            if mode.clamp_s() {
                s = s.clamp(0, smax);
            }
            if mode.clamp_t() {
                t = t.clamp(0, tmax);
            }
            s &= smax;
            t &= tmax;
            t = t.wrapping_mul(smax + 1);

            self.texel(texbase, t.wrapping_add(s))
        } else {
            s = (s >> (ilod + 10)) - 0x80;
            t = (t >> (ilod + 10)) - 0x80;

            let sfrac = (s & self.bilinear_mask) as u8;
            let tfrac = (t & self.bilinear_mask) as u8;

            s >>= 8;
            t >>= 8;
            let mut s1 = s + 1;
            let mut t1 = t + 1;

            if mode.clamp_s() {
                s = s.clamp(0, smax);
                s1 = s1.clamp(0, smax);
            }
            if mode.clamp_t() {
                t = t.clamp(0, tmax);
                t1 = t1.clamp(0, tmax);
            }
            s &= smax;
            s1 &= smax;
            t = (t & tmax).wrapping_mul(smax + 1);
            t1 = (t1 & tmax).wrapping_mul(smax + 1);

            let c00 = self.texel(texbase, t.wrapping_add(s));
            let c01 = self.texel(texbase, t.wrapping_add(s1));
            let c10 = self.texel(texbase, t1.wrapping_add(s));
            let c11 = self.texel(texbase, t1.wrapping_add(s1));
            rgba_bilinear_filter(c00, c01, c10, c11, sfrac, tfrac)
        };

        (Argb(texel), lod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::voodoo::registers::TMU0_BANK;

    fn regs_with(bank: usize, values: &[(usize, u32)]) -> RegisterFile {
        let mut regs = RegisterFile::new();
        for &(reg, value) in values {
            regs.set(bank + reg, value);
        }
        regs
    }

    #[test]
    fn test_static_tables() {
        let t = static_tables();
        assert_eq!(t.rgb565[0xffff], 0xffff_ffff);
        assert_eq!(t.argb1555[0x8000], 0xff00_0000);
        assert_eq!(t.alpha8[0x40], 0x4040_4040);
        assert_eq!(t.int8[0x40], 0xff40_4040);
        assert_eq!(t.ai44[0xf1], 0xff11_1111);
    }

    #[test]
    fn test_lod_offsets_full_chain() {
        let mut tmu = Tmu::new(0x20_0000, TMU0_BANK, false).unwrap();
        // 16-bit texture at base 0x100 (byte address 0x800)
        let regs = regs_with(TMU0_BANK, &[(TEXTURE_MODE, 10 << 8), (TEX_BASE_ADDR, 0x100)]);
        tmu.recompute(&regs);

        assert_eq!(tmu.lod_offset(0), 0x800);
        assert_eq!(tmu.lod_offset(1), 0x800 + 256 * 256 * 2);
        assert_eq!(tmu.lod_offset(2), 0x800 + (256 * 256 + 128 * 128) * 2);
        assert!(!tmu.is_dirty());
    }

    #[test]
    fn test_lod_tsplit_skips_levels() {
        let mut tmu = Tmu::new(0x20_0000, TMU0_BANK, false).unwrap();
        // even levels only
        let regs = regs_with(TMU0_BANK, &[(T_LOD, 1 << 19)]);
        tmu.recompute(&regs);

        assert_eq!(tmu.lod_offset(1), 256 * 256);
        assert_eq!(tmu.lod_offset(2), 256 * 256);
        assert_eq!(tmu.lod_offset(3), 256 * 256 + 64 * 64);
    }

    #[test]
    fn test_ncc_expansion() {
        let mut ncc = NccTable::new();
        ncc.write(0, 0x4030_2010);
        // I0 = (+1, -1, 0) in signed 9-bit fields
        ncc.write(4, (1 << 18) | (0x1ff << 9));
        assert!(ncc.is_dirty());
        ncc.update();
        assert!(!ncc.is_dirty());

        // Y index 0, I index 0, Q index 0
        assert_eq!(ncc.texel[0], make_argb(0xff, 0x11, 0x0f, 0x10));
        // Y index 2 -> 0x30, I index 1 (all zero)
        assert_eq!(ncc.texel[0x24], make_argb(0xff, 0x30, 0x30, 0x30));

        // Rewriting the same value keeps the table clean
        ncc.write(0, 0x4030_2010);
        assert!(!ncc.is_dirty());
    }

    #[test]
    fn test_palette_write_through_ncc0() {
        let mut tmu = Tmu::new(0x1000, TMU0_BANK, true).unwrap();
        tmu.write_ncc(0, 0, 0x4030_2010);
        tmu.ncc[0].update();
        assert_eq!(tmu.ncc(0).texel[0], 0xff10_1010);

        // entry ((0x83 << 1) & 0xfe) | (5 & 1) = 7
        tmu.write_ncc(0, 5, 0x8312_3456);
        assert_eq!(tmu.palette_entry(7), 0xff12_3456);
        assert_eq!(tmu.palettea.as_ref().unwrap()[7], 0x108e_4559);

        // the table itself is untouched
        assert_eq!(tmu.ncc(0).reg(5), 0);
        assert!(!tmu.ncc(0).is_dirty());
        assert_eq!(tmu.ncc(0).texel[0], 0xff10_1010);

        // Table 1 has no palette: the write lands in the table registers
        tmu.write_ncc(1, 5, 0x8000_0001);
        assert_eq!(tmu.ncc(1).reg(5), 0x8000_0001);
    }

    #[test]
    fn test_texture_write_16bit() {
        let mut tmu = Tmu::new(0x10000, TMU0_BANK, false).unwrap();
        let regs = regs_with(TMU0_BANK, &[(TEXTURE_MODE, 10 << 8)]);

        // lod 0, t = 1, s = 2
        let offset = (1 << 7) | 1;
        tmu.texture_write(&regs, offset, 0xbbbb_aaaa, false);

        let addr = 2 * (256 + 2);
        assert_eq!(tmu.ram.read16(addr), 0xaaaa);
        assert_eq!(tmu.ram.read16(addr + 2), 0xbbbb);
    }

    #[test]
    fn test_texture_write_8bit_seq_download() {
        let mut tmu = Tmu::new(0x10000, TMU0_BANK, false).unwrap();
        let regs = regs_with(TMU0_BANK, &[(TEXTURE_MODE, 0)]);

        tmu.texture_write(&regs, 1, 0x4433_2211, true);
        assert_eq!(tmu.ram.read8(4), 0x11);
        assert_eq!(tmu.ram.read8(7), 0x44);

        tmu.texture_write(&regs, 1, 0x8877_6655, false);
        assert_eq!(tmu.ram.read8(2), 0x55);
    }

    #[test]
    fn test_texture_write_swizzle() {
        let mut tmu = Tmu::new(0x10000, TMU0_BANK, false).unwrap();
        let regs = regs_with(TMU0_BANK, &[(TEXTURE_MODE, 10 << 8), (T_LOD, 1 << 25)]);
        tmu.texture_write(&regs, 0, 0x1122_3344, false);
        assert_eq!(tmu.ram.read16(0), 0x2211);
        assert_eq!(tmu.ram.read16(2), 0x4433);
    }

    #[test]
    fn test_point_sample_fetch() {
        let mut tmu = Tmu::new(0x20_0000, TMU0_BANK, false).unwrap();
        let regs = regs_with(TMU0_BANK, &[(TEXTURE_MODE, 10 << 8)]);
        tmu.ram.write16(2 * (3 * 256 + 5), 0xf800);

        let state = tmu.prepare(&regs, true);
        let dither = Dither::new(Default::default(), 0);
        // S = 5.5, T = 3.5 in 14.18 widened by 14 bits
        let s = (5i64 << 32) | (1 << 31);
        let t = (3i64 << 32) | (1 << 31);
        let (texel, lod) = state.fetch(0, &dither, s, t, 0);
        assert_eq!(texel.0, 0xffff_0000);
        assert_eq!(lod, 0);
    }
}
