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

//! Frame buffer interface (FBI)
//!
//! The FBI owns the frame buffer memory and everything that describes how
//! it is carved up:
//!
//! ```text
//! offset 0                 pages*0x1000        2*pages*0x1000     3*pages*0x1000
//! ┌───────────────────────┬───────────────────┬──────────────────┬──────────────┐
//! │ color buffer 0        │ color buffer 1    │ aux or color 2   │ aux (cfg 2)  │
//! └───────────────────────┴───────────────────┴──────────────────┴──────────────┘
//! ```
//!
//! Each buffer is a plane of RGB565 (or 16-bit depth/alpha) pixels with a
//! row stride of `tile_width * x_tiles` pixels. The layout is recomputed
//! whenever one of the `fbiInit` registers or `videoDimensions` changes.
//!
//! The FBI also holds the iterated-parameter start values and gradients
//! of the current triangle, the strip setup vertices, the fog tables and
//! the external DAC.

use super::modes::{FbiInit0, FbiInit1, FbiInit2, FbiInit4, FbiInit5, FbiInit6};
use super::registers::{
    RegisterFile, FBI_INIT0, FBI_INIT1, FBI_INIT2, FBI_INIT4, FBI_INIT5, FBI_INIT6,
};
use super::stats::Stats;
use crate::core::error::Result;
use crate::core::memory::VideoMemory;

/// Size of one video memory page in bytes
const PAGE_SIZE: u32 = 0x1000;

/// Largest memory FIFO, in 32-bit entries
const MAX_FIFO_ENTRIES: u32 = 65536 * 2;

/// Starting values and gradients of the FBI iterators
///
/// Colors are 12.12, Z is 20.12 and W is 16.32.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gradients {
    pub startr: i32,
    pub startg: i32,
    pub startb: i32,
    pub starta: i32,
    pub startz: i32,
    pub startw: i64,
    pub drdx: i32,
    pub dgdx: i32,
    pub dbdx: i32,
    pub dadx: i32,
    pub dzdx: i32,
    pub dwdx: i64,
    pub drdy: i32,
    pub dgdy: i32,
    pub dbdy: i32,
    pub dady: i32,
    pub dzdy: i32,
    pub dwdy: i64,
}

/// Triangle vertex in 12.4 screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
}

/// One vertex accumulated through the strip setup registers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetupVertex {
    pub x: f32,
    pub y: f32,
    pub a: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub z: f32,
    pub wb: f32,
    pub w0: f32,
    pub s0: f32,
    pub t0: f32,
    pub w1: f32,
    pub s1: f32,
    pub t1: f32,
}

/// Frame buffer interface state
pub struct Fbi {
    pub(crate) ram: VideoMemory,
    /// Byte offsets of the color buffers (`None` when absent)
    pub(crate) rgboffs: [Option<u32>; 3],
    /// Byte offset of the aux (depth/alpha) buffer
    pub(crate) auxoffs: Option<u32>,
    pub(crate) frontbuf: usize,
    pub(crate) backbuf: usize,
    /// Y origin subtract value from `fbiInit3`
    pub(crate) yorigin: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rowpixels: u32,
    pub(crate) tile_width: u32,
    pub(crate) x_tiles: u32,
    /// Suppress the next buffer rotation (Voodoo 2 `swapbufferCMD` bit 9)
    pub(crate) dont_swap: bool,

    pub(crate) va: Vertex,
    pub(crate) vb: Vertex,
    pub(crate) vc: Vertex,
    pub(crate) grad: Gradients,

    /// Statistics from pipelined LFB writes
    pub(crate) lfb_stats: Stats,

    pub(crate) sverts: u32,
    pub(crate) svert: [SetupVertex; 3],

    /// Memory FIFO size in 32-bit entries (0 when disabled)
    pub(crate) fifo_size: u32,

    pub(crate) fogblend: [u8; 64],
    pub(crate) fogdelta: [u8; 64],
    pub(crate) fogdelta_mask: u8,
}

impl Fbi {
    /// Create the FBI with `size` bytes of frame buffer memory
    ///
    /// # Errors
    ///
    /// Fails if the memory cannot be allocated.
    pub fn new(size: usize, is_v2: bool) -> Result<Self> {
        let ram = VideoMemory::new(size)?;
        Ok(Self {
            ram,
            rgboffs: [Some(0); 3],
            auxoffs: None,
            frontbuf: 0,
            backbuf: 1,
            yorigin: 0,
            width: 640,
            height: 480,
            rowpixels: 640,
            tile_width: 0,
            x_tiles: 0,
            dont_swap: false,
            va: Vertex::default(),
            vb: Vertex::default(),
            vc: Vertex::default(),
            grad: Gradients::default(),
            lfb_stats: Stats::default(),
            sverts: 0,
            svert: [SetupVertex::default(); 3],
            fifo_size: 0,
            fogblend: [0; 64],
            fogdelta: [0; 64],
            fogdelta_mask: if is_v2 { 0xfc } else { 0xff },
        })
    }

    /// Frame buffer memory
    pub fn memory(&self) -> &VideoMemory {
        &self.ram
    }

    /// Byte offset of color buffer `index` (0 = front, 1 = back, 2 = third)
    pub fn color_buffer(&self, index: usize) -> Option<u32> {
        self.rgboffs.get(index).copied().flatten()
    }

    /// Byte offset of the aux buffer
    pub fn aux_buffer(&self) -> Option<u32> {
        self.auxoffs
    }

    /// Byte offset of the buffer selected by a 2-bit draw/write select field
    ///
    /// 0 selects the front buffer and 1 the back buffer; other values have
    /// no target.
    pub fn select_buffer(&self, select: u32) -> Option<u32> {
        match select {
            0 => self.color_buffer(self.frontbuf),
            1 => self.color_buffer(self.backbuf),
            _ => None,
        }
    }

    /// Recompute the video memory layout from the init registers
    ///
    /// # Algorithm
    ///
    /// 1. Buffer size in 4KB pages comes from `fbiInit2`
    /// 2. Memory configuration (triple buffering, aux buffer) from `fbiInit2`,
    ///    or from `fbiInit5` on Voodoo 2 when the `fbiInit2` bit is clear
    /// 3. Row stride = tile width * X tile count (`fbiInit1`, plus `fbiInit6`
    ///    on Voodoo 2)
    /// 4. Buffer offsets are clamped to memory; the memory FIFO is sized from
    ///    `fbiInit4`
    pub fn recompute_layout(&mut self, regs: &RegisterFile, is_v2: bool) {
        let init0 = FbiInit0(regs.u(FBI_INIT0));
        let init1 = FbiInit1(regs.u(FBI_INIT1));
        let init2 = FbiInit2(regs.u(FBI_INIT2));
        let init4 = FbiInit4(regs.u(FBI_INIT4));

        let buffer_pages = init2.video_buffer_offset();
        let fifo_start_page = init4.memory_fifo_start_row();
        let mut fifo_last_page = init4.memory_fifo_stop_row();

        let mut memory_config = u32::from(init2.enable_triple_buf());
        if is_v2 && memory_config == 0 {
            memory_config = FbiInit5(regs.u(FBI_INIT5)).buffer_allocation();
        }

        self.tile_width = if is_v2 { 32 } else { 64 };

        self.x_tiles = init1.x_video_tiles();
        if is_v2 {
            self.x_tiles = (self.x_tiles << 1)
                | (u32::from(init1.x_video_tiles_bit5()) << 5)
                | u32::from(FbiInit6(regs.u(FBI_INIT6)).x_video_tiles_bit0());
        }
        self.rowpixels = self.tile_width * self.x_tiles;

        let page_bytes = buffer_pages * PAGE_SIZE;
        self.rgboffs[0] = Some(0);
        self.rgboffs[1] = Some(page_bytes);

        match memory_config {
            1 => {
                self.rgboffs[2] = Some(2 * page_bytes);
                self.auxoffs = None;
            }
            2 => {
                self.rgboffs[2] = Some(2 * page_bytes);
                self.auxoffs = Some(3 * page_bytes);
            }
            config => {
                if config == 3 {
                    log::warn!("Unexpected memory configuration 3, using two color buffers and one aux buffer");
                }
                self.rgboffs[2] = None;
                self.auxoffs = Some(2 * page_bytes);
            }
        }

        let mask = self.ram.mask();
        for offset in self.rgboffs.iter_mut().flatten() {
            *offset = (*offset).min(mask);
        }
        if let Some(offset) = self.auxoffs.as_mut() {
            *offset = (*offset).min(mask);
        }

        fifo_last_page = fifo_last_page.min(mask / PAGE_SIZE);
        self.fifo_size = if fifo_start_page <= fifo_last_page && init0.enable_memory_fifo() {
            ((fifo_last_page + 1 - fifo_start_page) * PAGE_SIZE / 4).min(MAX_FIFO_ENTRIES)
        } else {
            0
        };

        if self.rgboffs[2].is_none() {
            if self.frontbuf == 2 {
                self.frontbuf = 0;
            }
            if self.backbuf == 2 {
                self.backbuf = 0;
            }
        }

        log::debug!(
            "Video memory: pages={:#x} config={} rowpixels={} aux={:?} fifo={}",
            buffer_pages,
            memory_config,
            self.rowpixels,
            self.auxoffs,
            self.fifo_size
        );
    }

    /// Rotate the front and back buffers
    ///
    /// Two buffers alternate; with a third buffer the front index advances
    /// modulo 3 and the back buffer follows it. On Voodoo 2 a pending
    /// "don't swap" request suppresses the rotation.
    pub fn swap(&mut self, is_v2: bool) {
        if is_v2 && self.dont_swap {
            return;
        }

        if self.rgboffs[2].is_none() {
            self.frontbuf = 1 - self.frontbuf.min(1);
            self.backbuf = 1 - self.frontbuf;
        } else {
            self.frontbuf = (self.frontbuf + 1) % 3;
            self.backbuf = (self.frontbuf + 1) % 3;
        }
    }

    /// Expand one `fogTable` register into two delta/blend pairs
    pub fn fog_table_write(&mut self, index: usize, data: u32) {
        let base = 2 * (index & 0x1f);
        self.fogdelta[base] = data as u8;
        self.fogblend[base] = (data >> 8) as u8;
        self.fogdelta[base + 1] = (data >> 16) as u8;
        self.fogblend[base + 1] = (data >> 24) as u8;
    }

    /// Forget any partially accumulated strip
    pub fn reset_setup(&mut self) {
        self.sverts = 0;
    }

    /// Free entries reported in `status` bits 12-27
    ///
    /// Commands complete synchronously, so the memory FIFO is always empty.
    /// Without one the field reads all ones.
    pub fn memory_fifo_free(&self) -> u32 {
        if self.fifo_size == 0 {
            0xffff
        } else {
            ((self.fifo_size - 1) / 2).min(0xffff)
        }
    }
}

impl std::fmt::Debug for Fbi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fbi")
            .field("ram", &self.ram)
            .field("rgboffs", &self.rgboffs)
            .field("auxoffs", &self.auxoffs)
            .field("frontbuf", &self.frontbuf)
            .field("backbuf", &self.backbuf)
            .field("rowpixels", &self.rowpixels)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// External video DAC
///
/// Eight byte registers written through `dacData`. A read request latches
/// its result, which the host picks up through `fbiInit2` while the PCI
/// `initEnable` register remaps it.
#[derive(Debug, Clone, Default)]
pub struct Dac {
    reg: [u8; 8],
    read_result: u8,
}

impl Dac {
    pub fn write(&mut self, regnum: usize, data: u8) {
        self.reg[regnum & 7] = data;
    }

    /// Latch the value of register `regnum`
    ///
    /// Register 5 answers the PLL identification sequence selected through
    /// register 7 so that driver probing succeeds.
    pub fn read(&mut self, regnum: usize) {
        let regnum = regnum & 7;
        self.read_result = if regnum == 5 {
            match self.reg[7] {
                0x01 => 0x55,
                0x07 => 0x71,
                0x0b => 0x79,
                _ => 0xff,
            }
        } else {
            self.reg[regnum]
        };
    }

    /// Result of the last read request
    pub fn read_result(&self) -> u8 {
        self.read_result
    }
}
