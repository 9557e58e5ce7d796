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

//! Unit tests for linear frame buffer access

use super::*;
use crate::core::voodoo::modes::{LfbMask, LfbMode};

/// `lfbMode` write buffer select set to the back buffer
const WRITE_BACK: u32 = 1 << 4;
/// `lfbMode` read buffer select set to the back buffer
const READ_BACK: u32 = 1 << 6;
const READ_AUX: u32 = 2 << 6;
const PIXEL_PIPELINE: u32 = 1 << 8;

/// Byte address of a 16-bit pixel pair starting at even `x`
fn pair_addr(x: u32, y: u32) -> u32 {
    LFB_BASE + ((y << 10) + x) * 2
}

/// Byte address of a single 32-bit pixel
fn pixel_addr(x: u32, y: u32) -> u32 {
    LFB_BASE + ((y << 10) + x) * 4
}

#[test]
fn test_raw_565_pair_write() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK);

    voodoo.write(pair_addr(4, 2), 0x07e0_f800, 0xffff_ffff);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 4, 2), Some(0xf800));
    assert_eq!(voodoo.pixel(back, 5, 2), Some(0x07e0));
    assert_eq!(voodoo.pixel(voodoo.front_buffer(), 4, 2), Some(0));
    assert_eq!(voodoo.stats().pixels_out, 2);
}

#[test]
fn test_half_word_write_touches_one_pixel() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK);

    voodoo.write(pair_addr(8, 0), 0xffff_ffff, 0xffff_0000);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 8, 0), Some(0));
    assert_eq!(voodoo.pixel(back, 9, 0), Some(0xffff));
}

#[test]
fn test_io_device_narrow_write() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK);

    // second pixel of the pair only
    voodoo.write_register16(pair_addr(8, 1) + 2, 0x001f).unwrap();

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 8, 1), Some(0));
    assert_eq!(voodoo.pixel(back, 9, 1), Some(0x001f));
}

#[test]
fn test_argb8888_single_pixel() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 5);

    voodoo.write(pixel_addr(3, 7), 0x80ff_0000, 0xffff_ffff);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 3, 7), Some(0xf800));
    assert_eq!(voodoo.pixel(back, 4, 7), Some(0));
}

#[test]
fn test_rgba_lanes_swap_red_and_blue() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    // RGB x-8-8-8 with lane order 1 (BGR)
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 4 | (1 << 9));

    voodoo.write(pixel_addr(0, 0), 0x00ff_0000, 0xffff_ffff);
    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 0, 0), Some(0x001f));
}

#[test]
fn test_word_swapped_write() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | (1 << 11));

    voodoo.write(pair_addr(0, 0), 0x07e0_f800, 0xffff_ffff);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 0, 0), Some(0x07e0));
    assert_eq!(voodoo.pixel(back, 1, 0), Some(0xf800));
}

#[test]
fn test_lfb_y_origin_flips_rows() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBI_INIT3, 479 << 22);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | (1 << 13));

    voodoo.write(pair_addr(0, 0), 0xffff_ffff, 0xffff_ffff);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 0, 479), Some(0xffff));
    assert_eq!(voodoo.pixel(back, 0, 0), Some(0));
}

#[test]
fn test_depth_pair_write() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 15);

    voodoo.write(pair_addr(2, 3), 0x2222_1111, 0xffff_ffff);

    assert_eq!(voodoo.aux_pixel(2, 3), Some(0x1111));
    assert_eq!(voodoo.aux_pixel(3, 3), Some(0x2222));
    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 2, 3), Some(0));
}

#[test]
fn test_alpha_planes_take_written_alpha() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBZ_MODE, 1 << 18);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 5);

    voodoo.write(pixel_addr(1, 1), 0x7f00_00ff, 0xffff_ffff);

    assert_eq!(voodoo.aux_pixel(1, 1), Some(0x7f));
    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 1, 1), Some(0x001f));
}

#[test]
fn test_reserved_format_is_dropped() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 3);

    voodoo.write(pair_addr(0, 0), 0xffff_ffff, 0xffff_ffff);
    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 0, 0), Some(0));
    assert_eq!(voodoo.stats().pixels_out, 0);
}

#[test]
fn test_pipelined_write_with_depth_test() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    // seed depth through the raw path
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 15);
    voodoo.write(pair_addr(6, 6), 0xffff_ffff, 0xffff_ffff);

    // depth "less", color and aux writes, depth + RGB565 through the pipeline
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | AUX_WRITE | DRAW_BACK | (1 << 4) | (1 << 5));
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | PIXEL_PIPELINE | 12);

    voodoo.write(pixel_addr(6, 6), 0x1000_f800, 0xffff_ffff);
    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 6, 6), Some(0xf800));
    assert_eq!(voodoo.aux_pixel(6, 6), Some(0x1000));

    voodoo.write(pixel_addr(6, 6), 0x2000_07e0, 0xffff_ffff);
    assert_eq!(voodoo.pixel(back, 6, 6), Some(0xf800));
    assert_eq!(voodoo.aux_pixel(6, 6), Some(0x1000));

    let stats = voodoo.stats();
    assert_eq!(stats.zfunc_fail, 1);
    assert_eq!(stats.pixels_in, 2);
}

#[test]
fn test_pipelined_write_is_clipped() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK | 1);
    write_reg(&mut voodoo, CLIP_LEFT_RIGHT, 1);
    write_reg(&mut voodoo, CLIP_LOW_Y_HIGH_Y, 1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | PIXEL_PIPELINE);

    voodoo.write(pair_addr(0, 0), 0xffff_ffff, 0xffff_ffff);

    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 0, 0), Some(0xffff));
    assert_eq!(voodoo.pixel(back, 1, 0), Some(0));

    let stats = voodoo.stats();
    assert_eq!(stats.pixels_in, 2);
    assert_eq!(stats.pixels_out, 1);
}

#[test]
fn test_read_back_pair() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | READ_BACK);
    voodoo.write(pair_addr(10, 20), 0x1234_5678, 0xffff_ffff);

    assert_eq!(voodoo.read(pair_addr(10, 20)), 0x1234_5678);

    write_reg(&mut voodoo, LFB_MODE, READ_BACK | (1 << 15));
    assert_eq!(voodoo.read(pair_addr(10, 20)), 0x5678_1234);

    write_reg(&mut voodoo, LFB_MODE, READ_BACK | (1 << 16));
    assert_eq!(voodoo.read(pair_addr(10, 20)), 0x7856_3412);
}

#[test]
fn test_read_aux_and_out_of_range() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, LFB_MODE, WRITE_BACK | 15);
    voodoo.write(pair_addr(0, 1), 0xbeef_cafe, 0xffff_ffff);

    write_reg(&mut voodoo, LFB_MODE, READ_AUX);
    assert_eq!(voodoo.read(pair_addr(0, 1)), 0xbeef_cafe);

    // reserved read buffer
    write_reg(&mut voodoo, LFB_MODE, 3 << 6);
    assert_eq!(voodoo.read(pair_addr(0, 1)), 0xffff_ffff);

    // past the end of memory
    write_reg(&mut voodoo, LFB_MODE, READ_AUX);
    assert_eq!(voodoo.read(pair_addr(0, 1023)), 0xffff_ffff);
}

#[test]
fn test_decode_depth_and_color() {
    let pixels = decode_lfb_write(LfbMode(12), 0xabcd_001f, 0x8000_1234).unwrap();
    assert!(!pixels.pixel_pair);
    assert_eq!(pixels.depth, [0xabcd, 0x1234]);
    assert_eq!(pixels.color[0].b(), 0xff);
    assert_eq!(pixels.color[0].a(), 0x80);
    assert!(pixels.mask.contains(LfbMask::DEPTH_MSW));
}

#[test]
fn test_decode_alpha_last_lanes() {
    // ARGB 1-5-5-5 in lane order 2: R-G-B-A
    let pixels = decode_lfb_write(LfbMode(2 | (2 << 9)), 0x0000_f801, 0).unwrap();
    assert_eq!(pixels.color[0].r(), 0xff);
    assert_eq!(pixels.color[0].a(), 0xff);
    assert_eq!(pixels.color[1].a(), 0);
}

#[test]
fn test_decode_reserved_formats() {
    for format in [3, 6, 7, 8, 9, 10, 11] {
        assert!(decode_lfb_write(LfbMode(format), 0, 0).is_none(), "format {format}");
    }
}
