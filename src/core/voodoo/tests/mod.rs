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

//! Unit tests for the Voodoo device
//!
//! Every test drives the board through its memory window and PCI space the
//! way a host would. The helpers below bring a board up to a usable
//! 640x480 double-buffered layout.

use super::*;

mod display;
mod lfb;
mod properties;
mod setup;

/// `fbzMode` bit 9: write the color buffer
pub(super) const RGB_WRITE: u32 = 1 << 9;
/// `fbzMode` bit 10: write the aux buffer
pub(super) const AUX_WRITE: u32 = 1 << 10;
/// `fbzMode` draw buffer field set to the back buffer
pub(super) const DRAW_BACK: u32 = 1 << 14;

/// LFB window base (byte address)
pub(super) const LFB_BASE: u32 = 0x0040_0000;
/// Texture window base (byte address)
pub(super) const TEXTURE_BASE: u32 = 0x0080_0000;

/// Byte address of a register, broadcast to every chip
pub(super) fn reg_addr(regnum: usize) -> u32 {
    (regnum as u32) << 2
}

/// Byte address of a register for the chips in `chips` (bit 0 FBI, 1 TMU0, 2 TMU1)
pub(super) fn chip_addr(chips: u32, regnum: usize) -> u32 {
    ((chips << 8) | regnum as u32) << 2
}

pub(super) fn write_reg(voodoo: &mut Voodoo, regnum: usize, data: u32) {
    voodoo.write(reg_addr(regnum), data, 0xffff_ffff);
}

pub(super) fn write_float(voodoo: &mut Voodoo, regnum: usize, value: f32) {
    write_reg(voodoo, regnum, value.to_bits());
}

pub(super) fn read_reg(voodoo: &mut Voodoo, regnum: usize) -> u32 {
    voodoo.read(reg_addr(regnum))
}

/// Board rasterizing on the calling thread only
pub(super) fn new_device(model: VoodooModel) -> Voodoo {
    device_with_threads(model, 1)
}

/// Board with `threads` raster threads in total, caller included
pub(super) fn device_with_threads(model: VoodooModel, threads: i64) -> Voodoo {
    let config = VoodooConfig {
        threads: ThreadSetting::Count(threads),
        ..VoodooConfig::with_model(model)
    };
    let mut voodoo = Voodoo::new(config).unwrap();
    configure(&mut voodoo);
    voodoo
}

/// 640x480, two color buffers of 0xa0 pages and an aux buffer
pub(super) fn configure(voodoo: &mut Voodoo) {
    voodoo.pci_write(0x40, 0x01);
    write_reg(voodoo, FBI_INIT1, 10 << 4);
    write_reg(voodoo, FBI_INIT2, 0xa0 << 11);
    write_reg(voodoo, H_SYNC, (0x5f << 16) | 0x28);
    write_reg(voodoo, V_SYNC, (0x1f << 16) | 0x02);
    write_reg(voodoo, VIDEO_DIMENSIONS, (479 << 16) | 639);
}

/// Flat-shaded triangle through the fixed-point parameter registers
///
/// Vertices are whole pixel coordinates.
pub(super) fn flat_triangle(voodoo: &mut Voodoo, vertices: [(i32, i32); 3], (r, g, b): (u8, u8, u8)) {
    for (i, (x, y)) in vertices.into_iter().enumerate() {
        write_reg(voodoo, VERTEX_AX + 2 * i, (x * 16) as u32);
        write_reg(voodoo, VERTEX_AY + 2 * i, (y * 16) as u32);
    }
    write_reg(voodoo, START_R, u32::from(r) << 12);
    write_reg(voodoo, START_G, u32::from(g) << 12);
    write_reg(voodoo, START_B, u32::from(b) << 12);
    write_reg(voodoo, START_A, 0xff << 12);
    for gradient in [D_R_DX, D_G_DX, D_B_DX, D_A_DX, D_R_DY, D_G_DY, D_B_DY, D_A_DY] {
        write_reg(voodoo, gradient, 0);
    }
    write_reg(voodoo, TRIANGLE_CMD, 0);
}

/// Triangle covering exactly pixel (10, 10)
pub(super) const SINGLE_PIXEL: [(i32, i32); 3] = [(10, 10), (12, 10), (10, 12)];

/// Every pixel of the back buffer inside a `width` x `height` box
pub(super) fn back_pixels(voodoo: &Voodoo, width: u32, height: u32) -> Vec<u16> {
    let back = voodoo.back_buffer();
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| voodoo.pixel(back, x, y).unwrap())
        .collect()
}
