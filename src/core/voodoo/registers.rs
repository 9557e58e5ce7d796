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

//! Register numbers, access policies and the raw register file
//!
//! Register space is addressed in 32-bit words. The low 8 bits of the word
//! offset select one of 256 registers; bits 8-11 select the target chips.
//!
//! ## Register Map (register numbers)
//!
//! ```text
//! 0x00-0x1F   triangle parameters, fixed point
//! 0x20        triangleCMD
//! 0x22-0x3F   triangle parameters, IEEE float
//! 0x40-0x57   mode, clip, command, color and statistics registers
//! 0x58-0x77   fog table
//! 0x80-0x8C   init, video timing and DAC (FBI only)
//! 0x90-0x97   Voodoo 2 init, retrace and history
//! 0x98-0xA9   strip setup (Voodoo 2)
//! 0xC0-0xE0   texture unit registers and NCC tables
//! ```
//!
//! ## Register Banks
//!
//! The register file holds four 256-entry banks: bank 0 belongs to the frame
//! buffer interface, banks 1 and 2 to the texture units. A broadcast write
//! lands in every selected bank.
//!
//! ## References
//!
//! - 3dfx SST-1 Graphics Engine for 3D Game Acceleration, chapter 5

use bitflags::bitflags;

// 0x000
pub const STATUS: usize = 0x000 / 4;
pub const INTR_CTRL: usize = 0x004 / 4;
pub const VERTEX_AX: usize = 0x008 / 4;
pub const VERTEX_AY: usize = 0x00c / 4;
pub const VERTEX_BX: usize = 0x010 / 4;
pub const VERTEX_BY: usize = 0x014 / 4;
pub const VERTEX_CX: usize = 0x018 / 4;
pub const VERTEX_CY: usize = 0x01c / 4;
pub const START_R: usize = 0x020 / 4;
pub const START_G: usize = 0x024 / 4;
pub const START_B: usize = 0x028 / 4;
pub const START_Z: usize = 0x02c / 4;
pub const START_A: usize = 0x030 / 4;
pub const START_S: usize = 0x034 / 4;
pub const START_T: usize = 0x038 / 4;
pub const START_W: usize = 0x03c / 4;

// 0x040
pub const D_R_DX: usize = 0x040 / 4;
pub const D_G_DX: usize = 0x044 / 4;
pub const D_B_DX: usize = 0x048 / 4;
pub const D_Z_DX: usize = 0x04c / 4;
pub const D_A_DX: usize = 0x050 / 4;
pub const D_S_DX: usize = 0x054 / 4;
pub const D_T_DX: usize = 0x058 / 4;
pub const D_W_DX: usize = 0x05c / 4;
pub const D_R_DY: usize = 0x060 / 4;
pub const D_G_DY: usize = 0x064 / 4;
pub const D_B_DY: usize = 0x068 / 4;
pub const D_Z_DY: usize = 0x06c / 4;
pub const D_A_DY: usize = 0x070 / 4;
pub const D_S_DY: usize = 0x074 / 4;
pub const D_T_DY: usize = 0x078 / 4;
pub const D_W_DY: usize = 0x07c / 4;

// 0x080
pub const TRIANGLE_CMD: usize = 0x080 / 4;
pub const F_VERTEX_AX: usize = 0x088 / 4;
pub const F_VERTEX_AY: usize = 0x08c / 4;
pub const F_VERTEX_BX: usize = 0x090 / 4;
pub const F_VERTEX_BY: usize = 0x094 / 4;
pub const F_VERTEX_CX: usize = 0x098 / 4;
pub const F_VERTEX_CY: usize = 0x09c / 4;
pub const F_START_R: usize = 0x0a0 / 4;
pub const F_START_G: usize = 0x0a4 / 4;
pub const F_START_B: usize = 0x0a8 / 4;
pub const F_START_Z: usize = 0x0ac / 4;
pub const F_START_A: usize = 0x0b0 / 4;
pub const F_START_S: usize = 0x0b4 / 4;
pub const F_START_T: usize = 0x0b8 / 4;
pub const F_START_W: usize = 0x0bc / 4;

// 0x0c0
pub const F_D_R_DX: usize = 0x0c0 / 4;
pub const F_D_G_DX: usize = 0x0c4 / 4;
pub const F_D_B_DX: usize = 0x0c8 / 4;
pub const F_D_Z_DX: usize = 0x0cc / 4;
pub const F_D_A_DX: usize = 0x0d0 / 4;
pub const F_D_S_DX: usize = 0x0d4 / 4;
pub const F_D_T_DX: usize = 0x0d8 / 4;
pub const F_D_W_DX: usize = 0x0dc / 4;
pub const F_D_R_DY: usize = 0x0e0 / 4;
pub const F_D_G_DY: usize = 0x0e4 / 4;
pub const F_D_B_DY: usize = 0x0e8 / 4;
pub const F_D_Z_DY: usize = 0x0ec / 4;
pub const F_D_A_DY: usize = 0x0f0 / 4;
pub const F_D_S_DY: usize = 0x0f4 / 4;
pub const F_D_T_DY: usize = 0x0f8 / 4;
pub const F_D_W_DY: usize = 0x0fc / 4;

// 0x100
pub const F_TRIANGLE_CMD: usize = 0x100 / 4;
pub const FBZ_COLOR_PATH: usize = 0x104 / 4;
pub const FOG_MODE: usize = 0x108 / 4;
pub const ALPHA_MODE: usize = 0x10c / 4;
pub const FBZ_MODE: usize = 0x110 / 4;
pub const LFB_MODE: usize = 0x114 / 4;
pub const CLIP_LEFT_RIGHT: usize = 0x118 / 4;
pub const CLIP_LOW_Y_HIGH_Y: usize = 0x11c / 4;
pub const NOP_CMD: usize = 0x120 / 4;
pub const FASTFILL_CMD: usize = 0x124 / 4;
pub const SWAPBUFFER_CMD: usize = 0x128 / 4;
pub const FOG_COLOR: usize = 0x12c / 4;
pub const ZA_COLOR: usize = 0x130 / 4;
pub const CHROMA_KEY: usize = 0x134 / 4;
pub const CHROMA_RANGE: usize = 0x138 / 4;
pub const USER_INTR_CMD: usize = 0x13c / 4;

// 0x140
pub const STIPPLE: usize = 0x140 / 4;
pub const COLOR0: usize = 0x144 / 4;
pub const COLOR1: usize = 0x148 / 4;
pub const FBI_PIXELS_IN: usize = 0x14c / 4;
pub const FBI_CHROMA_FAIL: usize = 0x150 / 4;
pub const FBI_ZFUNC_FAIL: usize = 0x154 / 4;
pub const FBI_AFUNC_FAIL: usize = 0x158 / 4;
pub const FBI_PIXELS_OUT: usize = 0x15c / 4;
pub const FOG_TABLE: usize = 0x160 / 4;

// 0x1e0 (Voodoo 2 command FIFO, stored but not interpreted)
pub const CMD_FIFO_BASE_ADDR: usize = 0x1e0 / 4;
pub const CMD_FIFO_HOLES: usize = 0x1f8 / 4;

// 0x200
pub const FBI_INIT4: usize = 0x200 / 4;
pub const V_RETRACE: usize = 0x204 / 4;
pub const BACK_PORCH: usize = 0x208 / 4;
pub const VIDEO_DIMENSIONS: usize = 0x20c / 4;
pub const FBI_INIT0: usize = 0x210 / 4;
pub const FBI_INIT1: usize = 0x214 / 4;
pub const FBI_INIT2: usize = 0x218 / 4;
pub const FBI_INIT3: usize = 0x21c / 4;
pub const H_SYNC: usize = 0x220 / 4;
pub const V_SYNC: usize = 0x224 / 4;
pub const CLUT_DATA: usize = 0x228 / 4;
pub const DAC_DATA: usize = 0x22c / 4;
pub const MAX_RGB_DELTA: usize = 0x230 / 4;

// 0x240
pub const HV_RETRACE: usize = 0x240 / 4;
pub const FBI_INIT5: usize = 0x244 / 4;
pub const FBI_INIT6: usize = 0x248 / 4;
pub const FBI_INIT7: usize = 0x24c / 4;
pub const FBI_SWAP_HISTORY: usize = 0x258 / 4;
pub const FBI_TRIANGLES_OUT: usize = 0x25c / 4;
pub const S_SETUP_MODE: usize = 0x260 / 4;
pub const S_VX: usize = 0x264 / 4;
pub const S_VY: usize = 0x268 / 4;
pub const S_ARGB: usize = 0x26c / 4;
pub const S_RED: usize = 0x270 / 4;
pub const S_GREEN: usize = 0x274 / 4;
pub const S_BLUE: usize = 0x278 / 4;
pub const S_ALPHA: usize = 0x27c / 4;

// 0x280
pub const S_VZ: usize = 0x280 / 4;
pub const S_WB: usize = 0x284 / 4;
pub const S_WTMU0: usize = 0x288 / 4;
pub const S_S_W0: usize = 0x28c / 4;
pub const S_T_W0: usize = 0x290 / 4;
pub const S_WTMU1: usize = 0x294 / 4;
pub const S_S_WTMU1: usize = 0x298 / 4;
pub const S_T_WTMU1: usize = 0x29c / 4;
pub const S_DRAW_TRI_CMD: usize = 0x2a0 / 4;
pub const S_BEGIN_TRI_CMD: usize = 0x2a4 / 4;

// 0x300
pub const TEXTURE_MODE: usize = 0x300 / 4;
pub const T_LOD: usize = 0x304 / 4;
pub const T_DETAIL: usize = 0x308 / 4;
pub const TEX_BASE_ADDR: usize = 0x30c / 4;
pub const TEX_BASE_ADDR_1: usize = 0x310 / 4;
pub const TEX_BASE_ADDR_2: usize = 0x314 / 4;
pub const TEX_BASE_ADDR_3_8: usize = 0x318 / 4;
pub const TREX_INIT0: usize = 0x31c / 4;
pub const TREX_INIT1: usize = 0x320 / 4;
pub const NCC_TABLE: usize = 0x324 / 4;

/// Number of fog table registers (two delta/blend pairs each)
pub const FOG_TABLE_SIZE: usize = 32;

/// Registers per NCC table
pub const NCC_TABLE_SIZE: usize = 12;

/// Register number offset of a chip's bank in the register file
pub const FBI_BANK: usize = 0x000;
pub const TMU0_BANK: usize = 0x100;
pub const TMU1_BANK: usize = 0x200;

bitflags! {
    /// Access policy of one register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegAccess: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const PIPELINED = 0x04;
        const FIFO = 0x08;
        const WRITETHRU = 0x10;
    }
}

const R: u8 = RegAccess::READ.bits();
const W: u8 = RegAccess::WRITE.bits();
const RW: u8 = R | W;
const RP: u8 = R | RegAccess::PIPELINED.bits();
const WF: u8 = W | RegAccess::FIFO.bits();
const RWF: u8 = RW | RegAccess::FIFO.bits();
const WPF: u8 = WF | RegAccess::PIPELINED.bits();
const RWPF: u8 = RWF | RegAccess::PIPELINED.bits();
const WT: u8 = W | RegAccess::WRITETHRU.bits();
const RWT: u8 = RW | RegAccess::WRITETHRU.bits();
const RWPT: u8 = RW | RegAccess::PIPELINED.bits() | RegAccess::WRITETHRU.bits();

/// Voodoo Graphics access table, indexed by register number
#[rustfmt::skip]
pub static VOODOO1_ACCESS: [u8; 0x100] = [
    // 0x000
    RP,   0,    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x040
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x080
    WPF,  0,    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x0c0
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x100
    WPF,  RWPF, RWPF, RWPF, RWF,  RWF,  RWF,  RWF,
    WF,   WF,   WF,   WF,   WF,   WF,   0,    0,
    // 0x140
    RWF,  RWF,  RWF,  R,    R,    R,    R,    R,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x180
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x1c0
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x200
    RW,   R,    RW,   RW,   RW,   RW,   RW,   RW,
    W,    W,    W,    W,    W,    0,    0,    0,
    // 0x240
    0,    0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x280
    0,    0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x2c0
    0,    0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x300
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x340
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x380
    WF,   0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x3c0
    0,    0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
];

/// Voodoo 2 access table, indexed by register number
#[rustfmt::skip]
pub static VOODOO2_ACCESS: [u8; 0x100] = [
    // 0x000
    RP,   RWPT, WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x040
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x080
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x0c0
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x100
    WPF,  RWPF, RWPF, RWPF, RWF,  RWF,  RWF,  RWF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x140
    RWF,  RWF,  RWF,  R,    R,    R,    R,    R,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x180
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x1c0
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    RWT,  RWT,  RWT,  RWT,  RWT,  RWT,  RWT,  RW,
    // 0x200
    RWT,  R,    RWT,  RWT,  RWT,  RWT,  RWT,  RWT,
    WT,   WT,   WF,   WT,   WT,   WT,   WT,   WT,
    // 0x240
    R,    RWT,  RWT,  RWT,  0,    0,    R,    R,
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    // 0x280
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,
    WPF,  WPF,  0,    0,    0,    0,    0,    0,
    // 0x2c0
    RWPF, RWPF, RWPF, RWPF, RWPF, RWPF, RWPF, RWPF,
    RWPF, RWPF, RWPF, RWPF, RWPF, RWPF, RWPF, WPF,
    // 0x300
    WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WPF,  WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x340
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    WF,   WF,   WF,   WF,   WF,   WF,   WF,   WF,
    // 0x380
    WF,   0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
    // 0x3c0
    0,    0,    0,    0,    0,    0,    0,    0,
    0,    0,    0,    0,    0,    0,    0,    0,
];

/// Register numbers of the first 64 word offsets when `fbiInit3` enables
/// the alternate triangle layout
///
/// The alternate layout interleaves each start value with its X and Y
/// gradients so that one parameter can be streamed with consecutive writes.
#[rustfmt::skip]
pub static ALIAS_MAP: [u8; 0x40] = [
    STATUS as u8,    INTR_CTRL as u8, VERTEX_AX as u8, VERTEX_AY as u8,
    VERTEX_BX as u8, VERTEX_BY as u8, VERTEX_CX as u8, VERTEX_CY as u8,
    START_R as u8,   D_R_DX as u8,    D_R_DY as u8,    START_G as u8,
    D_G_DX as u8,    D_G_DY as u8,    START_B as u8,   D_B_DX as u8,
    D_B_DY as u8,    START_Z as u8,   D_Z_DX as u8,    D_Z_DY as u8,
    START_A as u8,   D_A_DX as u8,    D_A_DY as u8,    START_S as u8,
    D_S_DX as u8,    D_S_DY as u8,    START_T as u8,   D_T_DX as u8,
    D_T_DY as u8,    START_W as u8,   D_W_DX as u8,    D_W_DY as u8,

    TRIANGLE_CMD as u8, 0x084 / 4,       F_VERTEX_AX as u8, F_VERTEX_AY as u8,
    F_VERTEX_BX as u8,  F_VERTEX_BY as u8, F_VERTEX_CX as u8, F_VERTEX_CY as u8,
    F_START_R as u8,    F_D_R_DX as u8,  F_D_R_DY as u8,   F_START_G as u8,
    F_D_G_DX as u8,     F_D_G_DY as u8,  F_START_B as u8,  F_D_B_DX as u8,
    F_D_B_DY as u8,     F_START_Z as u8, F_D_Z_DX as u8,   F_D_Z_DY as u8,
    F_START_A as u8,    F_D_A_DX as u8,  F_D_A_DY as u8,   F_START_S as u8,
    F_D_S_DX as u8,     F_D_S_DY as u8,  F_START_T as u8,  F_D_T_DX as u8,
    F_D_T_DY as u8,     F_START_W as u8, F_D_W_DX as u8,   F_D_W_DY as u8,
];

/// Decoded register-space word offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterAddress {
    /// Register number (after aliasing)
    pub regnum: usize,
    /// Chip-select bits, already restricted to the present chips
    pub chips: u8,
}

impl RegisterAddress {
    /// Decode a register-space word offset
    ///
    /// A chip field of zero broadcasts to every chip. The alternate layout
    /// only applies to offsets with bit 19 set and bits 6-7 clear.
    ///
    /// # Example
    ///
    /// ```
    /// use sstrx::core::voodoo::registers::{RegisterAddress, FBZ_MODE};
    ///
    /// let addr = RegisterAddress::decode(0x100 | FBZ_MODE as u32, 0x7, false);
    /// assert_eq!(addr.regnum, FBZ_MODE);
    /// assert_eq!(addr.chips, 0x1);
    /// ```
    pub fn decode(offset: u32, chipmask: u8, alt_regmap: bool) -> Self {
        let mut chips = ((offset >> 8) & 0xf) as u8;
        if chips == 0 {
            chips = 0xf;
        }
        chips &= chipmask;

        let aliased = alt_regmap && (offset & 0x800c0) == 0x80000;
        let regnum = if aliased {
            usize::from(ALIAS_MAP[(offset & 0x3f) as usize])
        } else {
            (offset & 0xff) as usize
        };

        Self { regnum, chips }
    }
}

/// Raw register storage
///
/// Every slot keeps the last 32 bits written to it, whatever their
/// interpretation. Accessors reinterpret at the point of use.
#[derive(Clone)]
pub struct RegisterFile {
    raw: Box<[u32; 0x400]>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            raw: Box::new([0; 0x400]),
        }
    }

    /// Raw bits of a frame buffer interface register
    #[inline(always)]
    pub fn u(&self, regnum: usize) -> u32 {
        self.raw[regnum & 0x3ff]
    }

    #[inline(always)]
    pub fn i(&self, regnum: usize) -> i32 {
        self.u(regnum) as i32
    }

    #[inline(always)]
    pub fn f(&self, regnum: usize) -> f32 {
        f32::from_bits(self.u(regnum))
    }

    #[inline(always)]
    pub fn set(&mut self, regnum: usize, value: u32) {
        self.raw[regnum & 0x3ff] = value;
    }

    #[inline(always)]
    pub fn set_f(&mut self, regnum: usize, value: f32) {
        self.set(regnum, value.to_bits());
    }

    /// Register in a given chip bank (`FBI_BANK`, `TMU0_BANK`, `TMU1_BANK`)
    #[inline(always)]
    pub fn bank(&self, bank: usize, regnum: usize) -> u32 {
        self.u(bank + regnum)
    }

    /// Store `value` into every bank selected by `chips`
    pub fn broadcast(&mut self, chips: u8, regnum: usize, value: u32) {
        for chip in 0..4 {
            if chips & (1 << chip) != 0 {
                self.set(0x100 * chip + regnum, value);
            }
        }
    }

    /// Wrapping increment
    #[inline]
    pub fn increment(&mut self, regnum: usize) {
        let value = self.u(regnum).wrapping_add(1);
        self.set(regnum, value);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterFile")
            .field("status", &self.u(STATUS))
            .field("fbzMode", &self.u(FBZ_MODE))
            .field("fbzColorPath", &self.u(FBZ_COLOR_PATH))
            .finish_non_exhaustive()
    }
}

/// Access flags of `regnum` in `table`
#[inline]
pub fn access(table: &[u8; 0x100], regnum: usize) -> RegAccess {
    RegAccess::from_bits_truncate(table[regnum & 0xff])
}
