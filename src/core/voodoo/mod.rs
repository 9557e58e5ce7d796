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

//! 3dfx Voodoo Graphics (SST-1) and Voodoo 2 accelerator
//!
//! The card is made of one frame buffer interface (FBI) and one or two
//! texture mapping units (TMUs), each with its own memory. The host talks to
//! it through a 16MB memory window and a PCI configuration space.
//!
//! # Memory Window
//!
//! ```text
//! 0x000000-0x3FFFFF   registers (bits 8-11 of the word offset select chips)
//! 0x400000-0x7FFFFF   linear frame buffer
//! 0x800000-0xFFFFFF   texture memory (bits 19-20 of the word offset select the TMU)
//! ```
//!
//! # Execution Model
//!
//! Every write is processed synchronously. Triangles are split into work
//! units and rasterized by a persistent worker pool; the call that issued
//! the triangle returns only after all units are done, so the frame buffer
//! is consistent whenever the host regains control.
//!
//! # Layout
//!
//! - `dispatch`: register reads and writes, command execution
//! - `setup`: triangle command and Voodoo 2 strip setup
//! - `lfb`: linear frame buffer reads and writes
//! - `display`: vertical refresh and beam position
//!
//! # References
//!
//! - 3dfx SST-1 Graphics Engine for 3D Game Acceleration, revision 1.61
//! - 3dfx Voodoo2 Graphics Engine for 3D Game Acceleration, revision 1.16

use std::time::Instant;

use crate::core::error::{EmulatorError, Result};
use crate::core::memory::{IODevice, MemoryRegion};

// Module declarations
pub mod color;
pub mod config;
mod dispatch;
pub mod dither;
mod display;
pub mod fbi;
mod lfb;
pub mod math;
pub mod modes;
pub mod pci;
pub mod pipeline;
pub mod rasterizer;
pub mod registers;
mod setup;
pub mod stats;
pub mod tmu;
pub mod worker;
#[cfg(test)]
mod tests;

// Public re-exports
pub use config::{ThreadSetting, VoodooConfig, VoodooModel};
pub use display::{FrameSink, FRAME_PERIOD_MS};
pub use lfb::{decode_lfb_write, LfbPixels};
pub use stats::Stats;

use color::Argb;
use fbi::{Dac, Fbi};
use modes::{AlphaMode, ChromaRange, FbzColorPath, FbzMode, FogMode};
use pci::{PciConfig, PciEvent};
use pipeline::RenderState;
use registers::*;
use tmu::{Tmu, TmuState};
use worker::WorkerPool;

/// Size of the memory window in bytes
pub const WINDOW_SIZE: u32 = 0x0100_0000;

/// Emulated Voodoo board
///
/// # Examples
///
/// ```
/// use sstrx::core::voodoo::{Voodoo, VoodooConfig, VoodooModel};
///
/// let config = VoodooConfig::with_model(VoodooModel::Voodoo2);
/// let mut voodoo = Voodoo::new(config).unwrap();
/// assert_eq!(voodoo.model(), VoodooModel::Voodoo2);
///
/// // nopCMD
/// voodoo.write(0x0000_0120, 0x1, 0xffff_ffff);
/// ```
pub struct Voodoo {
    model: VoodooModel,
    config: VoodooConfig,

    /// Raw register banks (FBI, TMU0, TMU1)
    regs: RegisterFile,

    /// Access policy table of the model
    access: &'static [u8; 0x100],

    fbi: Fbi,
    tmus: Vec<Tmu>,
    dac: Dac,
    pci: PciConfig,

    /// Present chips: bit 0 FBI, bit 1 TMU0, bit 2 TMU1
    chipmask: u8,

    /// Alternate register layout (`fbiInit3` bit 0)
    alt_regmap: bool,

    /// Replace TMU0 output with `tmu_config` (`trexInit1` bit 18)
    send_config: bool,
    tmu_config: u32,

    /// Video output enabled (`fbiInit0` bit 0)
    output_on: bool,

    /// Triangle and fast fill statistics not yet folded into the registers
    pending: Stats,

    pool: WorkerPool,

    frame_start: Instant,
}

impl Voodoo {
    /// Create a board in its power-on state
    ///
    /// # Arguments
    ///
    /// * `config` - Model, raster thread count and filtering options
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the frame buffer or texture memory cannot be
    /// allocated and `WorkerSpawn` if a raster thread cannot be started.
    pub fn new(config: VoodooConfig) -> Result<Self> {
        let model = config.resolved_model();
        let is_v2 = model.is_voodoo2();

        let fbi = Fbi::new(model.fb_memory(), is_v2)?;

        let mut tmus = vec![Tmu::new(model.tmu_memory(), TMU0_BANK, is_v2)?];
        let mut chipmask = 0x03;
        let mut tmu_config = 0x11;
        if is_v2 {
            tmu_config |= 0x800;
        }
        if model.has_second_tmu() {
            tmus.push(Tmu::new(model.tmu_memory(), TMU1_BANK, is_v2)?);
            chipmask |= 0x04;
            tmu_config |= 0xc0;
        }

        let pool = WorkerPool::new(config.worker_threads())?;

        let mut voodoo = Self {
            model,
            config,
            regs: RegisterFile::new(),
            access: if is_v2 { &VOODOO2_ACCESS } else { &VOODOO1_ACCESS },
            fbi,
            tmus,
            dac: Dac::default(),
            pci: PciConfig::new(is_v2),
            chipmask,
            alt_regmap: false,
            send_config: false,
            tmu_config,
            output_on: false,
            pending: Stats::default(),
            pool,
            frame_start: Instant::now(),
        };

        voodoo.regs.set(FBI_INIT0, (1 << 4) | (0x10 << 6));
        voodoo.regs.set(FBI_INIT1, (1 << 1) | (1 << 8) | (1 << 12) | (2 << 20));
        voodoo.regs.set(FBI_INIT2, (1 << 6) | (0x100 << 23));
        voodoo.regs.set(FBI_INIT3, (2 << 13) | (0xf << 17));
        voodoo.regs.set(FBI_INIT4, 1);

        voodoo.reset();
        voodoo.fbi.recompute_layout(&voodoo.regs, is_v2);

        log::info!(
            "{} initialized: {}KB frame buffer, {} TMU(s), {} raster worker(s)",
            model,
            model.fb_memory() / 1024,
            voodoo.tmus.len(),
            voodoo.pool.threads()
        );

        Ok(voodoo)
    }

    /// Soft reset: clear the statistics and triangle counters and drop any
    /// partially built strip
    pub fn reset(&mut self) {
        self.reset_counters();
        self.fbi.reset_setup();
        self.regs.set(FBI_TRIANGLES_OUT, 0);
    }

    pub fn model(&self) -> VoodooModel {
        self.model
    }

    pub fn config(&self) -> &VoodooConfig {
        &self.config
    }

    fn is_v2(&self) -> bool {
        self.model.is_voodoo2()
    }

    /// Write to the memory window
    ///
    /// # Arguments
    ///
    /// * `address` - Byte address within the 16MB window
    /// * `data` - 32-bit value
    /// * `mem_mask` - Byte lanes being written; only the LFB path looks at
    ///   which 16-bit halves are present
    pub fn write(&mut self, address: u32, data: u32, mem_mask: u32) {
        let offset = MemoryRegion::word_offset(address);
        match MemoryRegion::identify(offset) {
            MemoryRegion::Register => self.register_write(offset, data),
            MemoryRegion::LinearFrameBuffer => self.lfb_write(offset, data, mem_mask),
            MemoryRegion::Texture => self.texture_write(offset, data),
        }
    }

    /// Read from the memory window
    ///
    /// Texture memory is write-only and reads back as all ones.
    pub fn read(&mut self, address: u32) -> u32 {
        let offset = MemoryRegion::word_offset(address);
        match MemoryRegion::identify(offset) {
            MemoryRegion::Register => self.register_read(offset),
            MemoryRegion::LinearFrameBuffer => self.lfb_read(offset),
            MemoryRegion::Texture => 0xffff_ffff,
        }
    }

    /// Read one byte of PCI configuration space
    pub fn pci_read(&mut self, reg: u8) -> u8 {
        self.pci.read(reg)
    }

    /// Write one byte of PCI configuration space
    pub fn pci_write(&mut self, reg: u8, value: u8) {
        match self.pci.write(reg, value) {
            Some(PciEvent::InitEnable(enable)) => {
                log::debug!(
                    "initEnable = {:#x} (hw init {}, dac remap {})",
                    enable.0,
                    enable.enable_hw_init(),
                    enable.remap_init_to_dac()
                );
            }
            Some(PciEvent::Clock(on)) => {
                log::debug!("Video clock {}", if on { "enabled" } else { "disabled" });
            }
            None => {}
        }
    }

    /// Physical base of the memory window
    pub fn window_base(&self) -> u32 {
        self.pci.window_base()
    }

    /// Write a texture memory word
    ///
    /// Writes to an absent TMU are dropped.
    pub(crate) fn texture_write(&mut self, offset: u32, data: u32) {
        let tmu = ((offset >> 19) & 3) as usize;
        if self.chipmask & (2 << tmu) == 0 {
            log::trace!("Texture write to absent TMU{} dropped", tmu);
            return;
        }

        let seq_8_downld = modes::TextureMode(self.regs.bank(TMU0_BANK, TEXTURE_MODE)).seq_8_downld();
        if let Some(unit) = self.tmus.get_mut(tmu) {
            unit.texture_write(&self.regs, offset, data, seq_8_downld);
        }
    }

    /// Snapshot the registers the pixel pipeline reads
    ///
    /// # Arguments
    ///
    /// * `drawbuf` - Byte offset of the destination color buffer
    /// * `tmus` - Prepared texture units, TMU0 first
    pub(crate) fn render_state(&self, drawbuf: u32, tmus: Vec<TmuState>) -> RenderState {
        let r = &self.regs;
        RenderState {
            color_path: FbzColorPath(r.u(FBZ_COLOR_PATH)),
            fbz_mode: FbzMode(r.u(FBZ_MODE)),
            alpha_mode: AlphaMode(r.u(ALPHA_MODE)),
            fog_mode: FogMode(r.u(FOG_MODE)),
            za_color: r.u(ZA_COLOR),
            color0: Argb(r.u(COLOR0)),
            color1: Argb(r.u(COLOR1)),
            fog_color: Argb(r.u(FOG_COLOR)),
            chroma_key: r.u(CHROMA_KEY),
            chroma_range: ChromaRange(r.u(CHROMA_RANGE)),
            stipple: r.u(STIPPLE),
            clip_left_right: r.u(CLIP_LEFT_RIGHT),
            clip_low_y_high_y: r.u(CLIP_LOW_Y_HIGH_Y),
            fogblend: self.fbi.fogblend,
            fogdelta: self.fbi.fogdelta,
            fogdelta_mask: self.fbi.fogdelta_mask,
            yorigin: self.fbi.yorigin,
            rowpixels: self.fbi.rowpixels,
            ram: self.fbi.ram.clone(),
            drawbuf,
            aux: self.fbi.auxoffs,
            tmus,
            send_config: self.send_config,
            tmu_config: self.tmu_config,
            grad: self.fbi.grad,
            ax: self.fbi.va.x,
            ay: self.fbi.va.y,
        }
    }

    /// Fold pending statistics into the statistic registers
    ///
    /// With `accumulate` false the pending counts are discarded.
    pub(crate) fn update_statistics(&mut self, accumulate: bool) {
        if accumulate {
            let mut total = self.pending;
            total += self.fbi.lfb_stats;
            for (reg, count) in [
                (FBI_PIXELS_IN, total.pixels_in),
                (FBI_CHROMA_FAIL, total.chroma_fail),
                (FBI_ZFUNC_FAIL, total.zfunc_fail),
                (FBI_AFUNC_FAIL, total.afunc_fail),
                (FBI_PIXELS_OUT, total.pixels_out),
            ] {
                let value = self.regs.u(reg).wrapping_add(count as u32);
                self.regs.set(reg, value);
            }
        }

        self.pending = Stats::default();
        self.fbi.lfb_stats = Stats::default();
    }

    /// Zero the five statistic registers and anything pending
    pub(crate) fn reset_counters(&mut self) {
        self.update_statistics(false);
        for reg in [FBI_PIXELS_IN, FBI_CHROMA_FAIL, FBI_ZFUNC_FAIL, FBI_AFUNC_FAIL, FBI_PIXELS_OUT] {
            self.regs.set(reg, 0);
        }
    }

    /// Current statistic counters (24-bit, as the registers report them)
    pub fn stats(&mut self) -> Stats {
        self.update_statistics(true);
        let counter = |reg| (self.regs.u(reg) & 0x00ff_ffff) as i32;
        Stats {
            pixels_in: counter(FBI_PIXELS_IN),
            pixels_out: counter(FBI_PIXELS_OUT),
            chroma_fail: counter(FBI_CHROMA_FAIL),
            zfunc_fail: counter(FBI_ZFUNC_FAIL),
            afunc_fail: counter(FBI_AFUNC_FAIL),
        }
    }

    /// Index of the color buffer being displayed
    pub fn front_buffer(&self) -> usize {
        self.fbi.frontbuf
    }

    /// Index of the color buffer being drawn by default
    pub fn back_buffer(&self) -> usize {
        self.fbi.backbuf
    }

    /// Pixels per frame buffer row
    pub fn row_pixels(&self) -> u32 {
        self.fbi.rowpixels
    }

    /// Visible resolution programmed through the video timing registers
    pub fn dimensions(&self) -> (u32, u32) {
        (self.fbi.width, self.fbi.height)
    }

    /// Whether video output is enabled
    pub fn output_enabled(&self) -> bool {
        self.output_on
    }

    /// Triangles rasterized since the last reset (24-bit)
    pub fn triangles_out(&self) -> u32 {
        self.regs.u(FBI_TRIANGLES_OUT) & 0x00ff_ffff
    }

    /// Frame buffer memory shared with the raster workers
    pub fn frame_buffer(&self) -> &crate::core::memory::VideoMemory {
        self.fbi.memory()
    }

    /// Raw 16-bit pixel of color buffer `buffer` (0-2) in buffer coordinates
    ///
    /// Returns `None` if the buffer does not exist in the current layout.
    pub fn pixel(&self, buffer: usize, x: u32, y: u32) -> Option<u16> {
        let base = self.fbi.color_buffer(buffer)?;
        Some(self.fbi.ram.pixel(base, y.wrapping_mul(self.fbi.rowpixels).wrapping_add(x)))
    }

    /// Raw 16-bit aux (depth or alpha) value in buffer coordinates
    pub fn aux_pixel(&self, x: u32, y: u32) -> Option<u16> {
        let base = self.fbi.aux_buffer()?;
        Some(self.fbi.ram.pixel(base, y.wrapping_mul(self.fbi.rowpixels).wrapping_add(x)))
    }
}

impl std::fmt::Debug for Voodoo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voodoo")
            .field("model", &self.model)
            .field("chipmask", &self.chipmask)
            .field("fbi", &self.fbi)
            .field("tmus", &self.tmus)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl IODevice for Voodoo {
    fn address_range(&self) -> (u32, u32) {
        let base = self.pci.window_base();
        (base, base.wrapping_add(WINDOW_SIZE - 1))
    }

    fn read_register(&mut self, offset: u32) -> Result<u32> {
        if offset >= WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: self.pci.window_base().wrapping_add(offset),
            });
        }
        Ok(self.read(offset))
    }

    fn write_register(&mut self, offset: u32, value: u32) -> Result<()> {
        if offset >= WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: self.pci.window_base().wrapping_add(offset),
            });
        }
        self.write(offset, value, 0xffff_ffff);
        Ok(())
    }

    /// 16-bit writes only touch the addressed half
    ///
    /// The LFB decodes the two halves separately, so the narrow write is
    /// forwarded with a lane mask instead of being merged.
    fn write_register16(&mut self, offset: u32, value: u16) -> Result<()> {
        if offset >= WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: self.pci.window_base().wrapping_add(offset),
            });
        }
        let shift = (offset & 2) * 8;
        self.write(offset & !3, u32::from(value) << shift, 0xffff << shift);
        Ok(())
    }

    /// Byte reads are not decoded and float high
    fn read_register8(&mut self, offset: u32) -> Result<u8> {
        if offset >= WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: self.pci.window_base().wrapping_add(offset),
            });
        }
        Ok(0xff)
    }

    /// Byte writes are not decoded anywhere in the window and are dropped
    fn write_register8(&mut self, offset: u32, value: u8) -> Result<()> {
        if offset >= WINDOW_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: self.pci.window_base().wrapping_add(offset),
            });
        }
        log::trace!("Byte write {:#04x} at {:#08x} dropped", value, offset);
        Ok(())
    }

    fn name(&self) -> &str {
        "Voodoo"
    }
}
