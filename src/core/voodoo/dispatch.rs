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

//! Register reads, register writes and command execution
//!
//! Triangle parameters (vertices, start values and gradients) are converted
//! to their internal fixed-point form on write and never stored in the
//! register file. Everything else is stored into the banks of the selected
//! chips, with a handful of registers triggering side effects.

use super::color::Argb;
use super::math::{float_to_int32, float_to_int64};
use super::modes::{FbiInit0, FbiInit3};
use super::registers::*;
use super::tmu::TexGradients;
use super::Voodoo;

/// Register offset between a fixed-point parameter and its float variant
const FLOAT_PARAM_OFFSET: usize = F_VERTEX_AX - VERTEX_AX;

/// Sign-extend a 24-bit (12.12) color value
#[inline(always)]
fn sign_extend_24(value: i32) -> i32 {
    (value << 8) >> 8
}

fn tex_param(grad: &mut TexGradients, param: usize) -> Option<&mut i64> {
    Some(match param {
        START_S => &mut grad.starts,
        D_S_DX => &mut grad.dsdx,
        D_S_DY => &mut grad.dsdy,
        START_T => &mut grad.startt,
        D_T_DX => &mut grad.dtdx,
        D_T_DY => &mut grad.dtdy,
        START_W => &mut grad.startw,
        D_W_DX => &mut grad.dwdx,
        D_W_DY => &mut grad.dwdy,
        _ => return None,
    })
}

impl Voodoo {
    /// Register-space write
    ///
    /// # Arguments
    ///
    /// * `offset` - Word offset within the register space (chip bits included)
    /// * `data` - Value written
    pub(crate) fn register_write(&mut self, offset: u32, data: u32) {
        let RegisterAddress { regnum, chips } = RegisterAddress::decode(offset, self.chipmask, self.alt_regmap);

        if !access(self.access, regnum).contains(RegAccess::WRITE) {
            log::warn!("Write to non-writable register {:#05x} = {:#010x} dropped", regnum, data);
            return;
        }

        let fbi = chips & 1 != 0;

        match regnum {
            VERTEX_AX..=D_W_DY => self.parameter_write(chips, regnum, data, false),
            F_VERTEX_AX..=F_D_W_DY => self.parameter_write(chips, regnum - FLOAT_PARAM_OFFSET, data, true),

            S_ARGB => {
                if fbi {
                    let color = Argb(data);
                    self.regs.set_f(S_ALPHA, color.a() as f32);
                    self.regs.set_f(S_RED, color.r() as f32);
                    self.regs.set_f(S_GREEN, color.g() as f32);
                    self.regs.set_f(S_BLUE, color.b() as f32);
                }
            }

            FBZ_COLOR_PATH | FBZ_MODE | FOG_MODE => {
                if fbi {
                    let data = match (self.is_v2(), regnum) {
                        (true, _) => data,
                        (false, FBZ_COLOR_PATH) => data & 0x0fff_ffff,
                        (false, FBZ_MODE) => data & 0x001f_ffff,
                        (false, _) => data & 0x0000_003f,
                    };
                    self.regs.set(regnum, data);
                }
            }

            TRIANGLE_CMD | F_TRIANGLE_CMD => self.triangle(),
            S_BEGIN_TRI_CMD => self.begin_triangle(),
            S_DRAW_TRI_CMD => self.draw_triangle(),

            NOP_CMD => {
                if data & 1 != 0 {
                    self.reset_counters();
                }
                if data & 2 != 0 {
                    self.regs.set(FBI_TRIANGLES_OUT, 0);
                }
            }

            FASTFILL_CMD => self.fastfill(),

            SWAPBUFFER_CMD => {
                self.fbi.dont_swap = data & 0x200 != 0;
                self.swap_buffers();
            }

            CLUT_DATA => log::trace!("clutData write {:#010x} ignored", data),

            DAC_DATA => {
                if fbi {
                    let regnum = ((data >> 8) & 7) as usize;
                    if data & 0x800 == 0 {
                        self.dac.write(regnum, data as u8);
                    } else {
                        self.dac.read(regnum);
                    }
                }
            }

            H_SYNC | V_SYNC | BACK_PORCH | VIDEO_DIMENSIONS => {
                if fbi {
                    self.video_timing_write(regnum, data);
                }
            }

            FBI_INIT0 => {
                if fbi && self.hw_init_enabled() {
                    let init = FbiInit0(data);
                    self.output_on = init.vga_passthru();
                    self.regs.set(FBI_INIT0, data);
                    if init.graphics_reset() {
                        self.reset();
                    }
                    self.fbi.recompute_layout(&self.regs, self.is_v2());
                }
            }

            FBI_INIT5 | FBI_INIT6 if !self.is_v2() => {
                log::trace!("fbiInit{} write ignored on {}", if regnum == FBI_INIT5 { 5 } else { 6 }, self.model);
            }

            FBI_INIT1 | FBI_INIT2 | FBI_INIT4 | FBI_INIT5 | FBI_INIT6 => {
                if fbi && self.hw_init_enabled() {
                    self.regs.set(regnum, data);
                    self.fbi.recompute_layout(&self.regs, self.is_v2());
                }
            }

            FBI_INIT3 => {
                if fbi && self.hw_init_enabled() {
                    let init = FbiInit3(data);
                    self.regs.set(FBI_INIT3, data);
                    self.alt_regmap = init.tri_register_remap();
                    self.fbi.yorigin = init.yorigin_subtract() as i32;
                    self.fbi.recompute_layout(&self.regs, self.is_v2());
                }
            }

            _ if (NCC_TABLE..NCC_TABLE + 2 * NCC_TABLE_SIZE).contains(&regnum) => {
                let index = regnum - NCC_TABLE;
                let (which, index) = (index / NCC_TABLE_SIZE, index % NCC_TABLE_SIZE);
                for (unit, tmu) in self.tmus.iter_mut().enumerate() {
                    if chips & (2 << unit) != 0 {
                        tmu.write_ncc(which, index, data);
                    }
                }
            }

            _ if (FOG_TABLE..FOG_TABLE + FOG_TABLE_SIZE).contains(&regnum) => {
                if fbi {
                    self.fbi.fog_table_write(regnum - FOG_TABLE, data);
                }
            }

            TEXTURE_MODE | T_LOD | T_DETAIL | TEX_BASE_ADDR | TEX_BASE_ADDR_1 | TEX_BASE_ADDR_2
            | TEX_BASE_ADDR_3_8 => {
                for (unit, tmu) in self.tmus.iter_mut().enumerate() {
                    if chips & (2 << unit) != 0 {
                        self.regs.set(0x100 * (unit + 1) + regnum, data);
                        tmu.mark_dirty();
                    }
                }
            }

            TREX_INIT1 => {
                self.send_config = data & (1 << 18) != 0;
                self.regs.broadcast(chips, regnum, data);
            }

            CLIP_LEFT_RIGHT | CLIP_LOW_Y_HIGH_Y => {
                if fbi {
                    self.regs.set(regnum, data);
                }
            }

            _ => self.regs.broadcast(chips, regnum, data),
        }
    }

    fn hw_init_enabled(&self) -> bool {
        let enabled = self.pci.init_enable().enable_hw_init();
        if !enabled {
            log::debug!("Init register write while initEnable is clear, dropped");
        }
        enabled
    }

    /// Store one triangle parameter in its internal fixed-point form
    ///
    /// Vertices become 12.4, colors 12.12, Z 20.12, S/T and W 16.32.
    fn parameter_write(&mut self, chips: u8, param: usize, data: u32, float: bool) {
        let fbi = chips & 1 != 0;

        match param {
            VERTEX_AX..=VERTEX_CY => {
                if !fbi {
                    return;
                }
                let value = if float { float_to_int32(data, 4) as u32 } else { data };
                let value = (value & 0xffff) as i16;
                match param {
                    VERTEX_AX => self.fbi.va.x = value,
                    VERTEX_AY => self.fbi.va.y = value,
                    VERTEX_BX => self.fbi.vb.x = value,
                    VERTEX_BY => self.fbi.vb.y = value,
                    VERTEX_CX => self.fbi.vc.x = value,
                    _ => self.fbi.vc.y = value,
                }
            }

            START_R | START_G | START_B | START_A | D_R_DX | D_G_DX | D_B_DX | D_A_DX | D_R_DY
            | D_G_DY | D_B_DY | D_A_DY => {
                if !fbi {
                    return;
                }
                let value = if float { float_to_int32(data, 12) } else { data as i32 };
                let value = sign_extend_24(value);
                let g = &mut self.fbi.grad;
                match param {
                    START_R => g.startr = value,
                    START_G => g.startg = value,
                    START_B => g.startb = value,
                    START_A => g.starta = value,
                    D_R_DX => g.drdx = value,
                    D_G_DX => g.dgdx = value,
                    D_B_DX => g.dbdx = value,
                    D_A_DX => g.dadx = value,
                    D_R_DY => g.drdy = value,
                    D_G_DY => g.dgdy = value,
                    D_B_DY => g.dbdy = value,
                    _ => g.dady = value,
                }
            }

            START_Z | D_Z_DX | D_Z_DY => {
                if !fbi {
                    return;
                }
                let value = if float { float_to_int32(data, 12) } else { data as i32 };
                let g = &mut self.fbi.grad;
                match param {
                    START_Z => g.startz = value,
                    D_Z_DX => g.dzdx = value,
                    _ => g.dzdy = value,
                }
            }

            START_S | START_T | D_S_DX | D_T_DX | D_S_DY | D_T_DY => {
                let value = if float {
                    float_to_int64(data, 32)
                } else {
                    i64::from(data as i32) << 14
                };
                self.tmu_parameter_write(chips, param, value);
            }

            START_W | D_W_DX | D_W_DY => {
                let value = if float {
                    float_to_int64(data, 32)
                } else {
                    i64::from(data as i32) << 2
                };
                if fbi {
                    let g = &mut self.fbi.grad;
                    match param {
                        START_W => g.startw = value,
                        D_W_DX => g.dwdx = value,
                        _ => g.dwdy = value,
                    }
                }
                self.tmu_parameter_write(chips, param, value);
            }

            _ => log::trace!("Unused parameter register {:#04x}", param),
        }
    }

    fn tmu_parameter_write(&mut self, chips: u8, param: usize, value: i64) {
        for (unit, tmu) in self.tmus.iter_mut().enumerate() {
            if chips & (2 << unit) != 0 {
                if let Some(slot) = tex_param(&mut tmu.grad, param) {
                    *slot = value;
                }
            }
        }
    }

    /// Video timing registers; the visible size follows `videoDimensions`
    /// once all three timing registers are programmed
    fn video_timing_write(&mut self, regnum: usize, data: u32) {
        self.regs.set(regnum, data);

        let (hsync, vsync, dims) = (self.regs.u(H_SYNC), self.regs.u(V_SYNC), self.regs.u(VIDEO_DIMENSIONS));
        if hsync != 0 && vsync != 0 && dims != 0 {
            let width = ((dims & 0x3ff) + 1) & !1;
            let height = (((dims >> 16) & 0x3ff) + 1) & !1;
            if (width, height) != (self.fbi.width, self.fbi.height) {
                log::info!("Video mode {}x{}", width, height);
            }
            self.fbi.width = width;
            self.fbi.height = height;
        }

        if regnum == VIDEO_DIMENSIONS {
            self.fbi.recompute_layout(&self.regs, self.is_v2());
        }
    }

    /// Register-space read
    ///
    /// Write-only registers read as all ones.
    pub(crate) fn register_read(&mut self, offset: u32) -> u32 {
        let regnum = (offset & 0xff) as usize;

        if !access(self.access, regnum).contains(RegAccess::READ) {
            log::debug!("Read of non-readable register {:#05x}", regnum);
            return 0xffff_ffff;
        }

        match regnum {
            STATUS => self.status(),

            HV_RETRACE if self.is_v2() => {
                let (vpos, hpos) = self.beam_position(std::time::Instant::now());
                let v = (vpos * f64::from(0x1fff)) as u32 & 0x1fff;
                let h = (hpos * f64::from(0x7ff)) as u32 & 0x7ff;
                v | (h << 16)
            }

            FBI_INIT2 if self.pci.init_enable().remap_init_to_dac() => u32::from(self.dac.read_result()),

            FBI_PIXELS_IN | FBI_CHROMA_FAIL | FBI_ZFUNC_FAIL | FBI_AFUNC_FAIL | FBI_PIXELS_OUT => {
                self.update_statistics(true);
                self.regs.u(regnum) & 0x00ff_ffff
            }

            FBI_TRIANGLES_OUT => self.regs.u(regnum) & 0x00ff_ffff,

            _ => self.regs.u(regnum),
        }
    }

    /// `status` register
    ///
    /// ```text
    /// bits  0-5   PCI FIFO free space (always 0x3f)
    /// bit   6     vertical retrace active
    /// bits  7-9   FBI / TREX / SST busy (never: commands complete synchronously)
    /// bits 10-11  displayed buffer
    /// bits 12-27  memory FIFO free space (all of it, 0xffff without a FIFO)
    /// ```
    fn status(&self) -> u32 {
        let retrace = u32::from(self.retrace_active(std::time::Instant::now()));
        let fifo_free = self.fbi.memory_fifo_free();
        0x3f | (retrace << 6) | ((self.fbi.frontbuf as u32 & 3) << 10) | (fifo_free << 12)
    }

    /// Rotate the color buffers and record the swap
    pub fn swap_buffers(&mut self) {
        let history = self.regs.u(FBI_SWAP_HISTORY) << 4;
        self.regs.set(FBI_SWAP_HISTORY, history);
        self.fbi.swap(self.is_v2());
        log::trace!("Buffer swap: front={} back={}", self.fbi.frontbuf, self.fbi.backbuf);
    }

    /// `fastfillCMD`: fill the clip rectangle of the draw buffer
    pub(crate) fn fastfill(&mut self) {
        let mode = super::modes::FbzMode(self.regs.u(FBZ_MODE));
        let target = self.fbi.select_buffer(mode.draw_buffer());
        if target.is_none() {
            log::debug!("Fast fill with reserved draw buffer {}", mode.draw_buffer());
        }

        let state = self.render_state(target.unwrap_or(0), Vec::new());
        self.pending += super::rasterizer::fastfill(&state, target);
    }
}
