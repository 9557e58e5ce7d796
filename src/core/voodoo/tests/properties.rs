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

//! Property tests for the rendering pipeline

use super::*;
use crate::core::voodoo::dither::{Dither, DITHER_MATRIX_2X2, DITHER_MATRIX_4X4};
use crate::core::voodoo::color::Argb;
use crate::core::voodoo::modes::{FbzMode, LfbMask, LfbMode};
use proptest::prelude::*;

const DITHER: u32 = 1 << 8;
const CANVAS: u32 = 64;

/// Gouraud-shaded triangle with per-pixel red and green ramps
fn shaded_triangle(voodoo: &mut Voodoo, vertices: [(i32, i32); 3], drdx: i32, dgdy: i32) {
    for (i, (x, y)) in vertices.into_iter().enumerate() {
        write_reg(voodoo, VERTEX_AX + 2 * i, (x * 16) as u32);
        write_reg(voodoo, VERTEX_AY + 2 * i, (y * 16) as u32);
    }
    write_reg(voodoo, START_R, 0x40 << 12);
    write_reg(voodoo, START_G, 0x80 << 12);
    write_reg(voodoo, START_B, 0xc0 << 12);
    write_reg(voodoo, START_A, 0xff << 12);
    write_reg(voodoo, D_R_DX, drdx as u32);
    write_reg(voodoo, D_G_DY, dgdy as u32);
    write_reg(voodoo, TRIANGLE_CMD, 0);
}

fn render(threads: i64, vertices: [(i32, i32); 3], drdx: i32, dgdy: i32) -> (Vec<u16>, Stats) {
    let mut voodoo = device_with_threads(VoodooModel::Voodoo1, threads);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK | DITHER);
    shaded_triangle(&mut voodoo, vertices, drdx, dgdy);
    let stats = voodoo.stats();
    (back_pixels(&voodoo, CANVAS, CANVAS), stats)
}

fn vertex() -> impl Strategy<Value = (i32, i32)> {
    (0..CANVAS as i32, 0..CANVAS as i32)
}

/// Test-side RGB565 encoder
fn encode_565(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r >> 3) << 11) | (u32::from(g >> 2) << 5) | u32::from(b >> 3)
}

/// Channel widths of an LFB color format: (red/blue, green, alpha)
fn lfb_channel_bits(format: u32) -> (u32, u32, u32) {
    match format {
        0 | 12 => (5, 6, 0),
        1 | 13 => (5, 5, 0),
        2 | 14 => (5, 5, 1),
        4 => (8, 8, 0),
        5 => (8, 8, 8),
        _ => unreachable!("format {} carries no color", format),
    }
}

/// Widen the top `bits` of `c` back to 8 bits by bit replication
fn replicate(c: u8, bits: u32) -> u8 {
    match bits {
        1 => if c & 0x80 != 0 { 0xff } else { 0 },
        8 => c,
        _ => {
            let q = u32::from(c) >> (8 - bits);
            ((q << (8 - bits)) | (q >> (2 * bits - 8))) as u8
        }
    }
}

/// Nearest color the format stores exactly; alpha-less formats take the default
fn representable(format: u32, (a, r, g, b): (u8, u8, u8, u8), default_alpha: u8) -> Argb {
    let (rb, gb, ab) = lfb_channel_bits(format);
    let a = if ab == 0 { default_alpha } else { replicate(a, ab) };
    Argb::new(a, replicate(r, rb), replicate(g, gb), replicate(b, rb))
}

/// Test-side LFB encoder for one pixel in the given lane order
fn encode_lfb(format: u32, lanes: u32, color: Argb) -> u32 {
    let (a, r, g, b) = (color.a() as u32, color.r() as u32, color.g() as u32, color.b() as u32);
    let (hi, lo) = if lanes & 1 != 0 { (b, r) } else { (r, b) };
    let alpha_last = lanes >= 2;
    let x555 = ((hi >> 3) << 10) | ((g >> 3) << 5) | (lo >> 3);
    let s555x = ((hi >> 3) << 11) | ((g >> 3) << 6) | ((lo >> 3) << 1);
    match (format, alpha_last) {
        (0 | 12, _) => ((hi >> 3) << 11) | ((g >> 2) << 5) | (lo >> 3),
        (1 | 13, false) => x555,
        (1 | 13, true) => s555x,
        (2 | 14, false) => ((a >> 7) << 15) | x555,
        (2 | 14, true) => s555x | (a >> 7),
        (4, false) => (hi << 16) | (g << 8) | lo,
        (4, true) => (hi << 24) | (g << 16) | (lo << 8),
        (5, false) => (a << 24) | (hi << 16) | (g << 8) | lo,
        (5, true) => (hi << 24) | (g << 16) | (lo << 8) | a,
        _ => unreachable!("format {} carries no color", format),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_partitioning_does_not_change_output(
        a in vertex(),
        b in vertex(),
        c in vertex(),
        drdx in -0x2000i32..0x2000,
        dgdy in -0x2000i32..0x2000,
    ) {
        let inline = render(1, [a, b, c], drdx, dgdy);
        let threaded = render(4, [a, b, c], drdx, dgdy);
        prop_assert_eq!(&inline.0, &threaded.0);
        prop_assert_eq!(inline.1, threaded.1);
    }

    #[test]
    fn prop_depth_never_writes_nothing(a in vertex(), b in vertex(), c in vertex()) {
        let mut voodoo = new_device(VoodooModel::Voodoo1);
        // depth buffering on, compare function "never"
        write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | AUX_WRITE | DRAW_BACK | (1 << 4));
        flat_triangle(&mut voodoo, [a, b, c], (255, 255, 255));

        prop_assert!(back_pixels(&voodoo, CANVAS, CANVAS).iter().all(|&p| p == 0));
        let stats = voodoo.stats();
        prop_assert_eq!(stats.pixels_out, 0);
        prop_assert_eq!(stats.zfunc_fail, stats.pixels_in);
    }

    #[test]
    fn prop_raw_565_lfb_write_is_lossless(
        x in (0u32..CANVAS / 2).prop_map(|x| x * 2),
        y in 0u32..CANVAS,
        lo in any::<(u8, u8, u8)>(),
        hi in any::<(u8, u8, u8)>(),
    ) {
        let mut voodoo = new_device(VoodooModel::Voodoo1);
        write_reg(&mut voodoo, LFB_MODE, 1 << 4);

        let lo = encode_565(lo.0, lo.1, lo.2);
        let hi = encode_565(hi.0, hi.1, hi.2);
        voodoo.write(LFB_BASE + ((y << 10) + x) * 2, (hi << 16) | lo, 0xffff_ffff);

        let back = voodoo.back_buffer();
        prop_assert_eq!(voodoo.pixel(back, x, y), Some(lo as u16));
        prop_assert_eq!(voodoo.pixel(back, x + 1, y), Some(hi as u16));
    }

    #[test]
    fn prop_lfb_color_formats_round_trip(
        format in prop::sample::select(vec![0u32, 1, 2, 4, 5, 12, 13, 14]),
        lanes in 0u32..4,
        first in any::<(u8, u8, u8, u8)>(),
        second in any::<(u8, u8, u8, u8)>(),
        depth in any::<u16>(),
        za_color in any::<u32>(),
    ) {
        let default_alpha = (za_color >> 24) as u8;
        let first = representable(format, first, default_alpha);
        let second = representable(format, second, default_alpha);

        let data = match format {
            0..=2 => (encode_lfb(format, lanes, second) << 16) | encode_lfb(format, lanes, first),
            12..=14 => (u32::from(depth) << 16) | encode_lfb(format, lanes, first),
            _ => encode_lfb(format, lanes, first),
        };
        let pixels = decode_lfb_write(LfbMode(format | (lanes << 9)), data, za_color).unwrap();

        prop_assert_eq!(pixels.color[0], first);
        prop_assert_eq!(pixels.pixel_pair, format <= 2);
        prop_assert!(pixels.mask.contains(LfbMask::RGB));
        match format {
            0..=2 => {
                prop_assert_eq!(pixels.color[1], second);
                prop_assert_eq!(pixels.depth, [za_color as u16; 2]);
            }
            12..=14 => {
                prop_assert_eq!(pixels.depth[0], depth);
                prop_assert!(pixels.mask.contains(LfbMask::DEPTH_MSW));
            }
            _ => prop_assert_eq!(pixels.depth[0], za_color as u16),
        }
        prop_assert_eq!(
            pixels.mask.contains(LfbMask::ALPHA),
            matches!(format, 2 | 5 | 14)
        );
    }

    #[test]
    fn prop_lfb_depth_pair_round_trip(lo in any::<u16>(), hi in any::<u16>(), za_color in any::<u32>()) {
        let pixels = decode_lfb_write(LfbMode(15), (u32::from(hi) << 16) | u32::from(lo), za_color).unwrap();
        prop_assert_eq!(pixels.depth, [lo, hi]);
        prop_assert_eq!(pixels.mask, LfbMask::DEPTH | LfbMask::DEPTH_HI);
        prop_assert!(pixels.pixel_pair);
    }

    #[test]
    fn prop_dither_matches_matrix_formula(
        x in 0i32..4,
        y in 0i32..4,
        two_by_two in any::<bool>(),
        (r, g, b) in any::<(u8, u8, u8)>(),
    ) {
        let (mode, matrix) = if two_by_two {
            (FbzMode(DITHER | (1 << 11)), &DITHER_MATRIX_2X2)
        } else {
            (FbzMode(DITHER), &DITHER_MATRIX_4X4)
        };
        let amount = u32::from(matrix[(y * 4 + x) as usize]);
        let reduce = |c: u8, green: bool| {
            let c = u32::from(c);
            let scaled = if green {
                (c << 2) - (c >> 4) + (c >> 6)
            } else {
                (c << 1) - (c >> 4) + (c >> 7)
            };
            ((scaled + amount) >> 4) as u16
        };
        let expected = (reduce(r, false) << 11) | (reduce(g, true) << 5) | reduce(b, false);

        let pixel = Dither::new(mode, y).pack(x, i32::from(r), i32::from(g), i32::from(b));
        prop_assert_eq!(pixel, expected);
        // the phase repeats every four pixels in both directions
        prop_assert_eq!(Dither::new(mode, y + 4).pack(x + 8, i32::from(r), i32::from(g), i32::from(b)), pixel);
    }

    #[test]
    fn prop_dither_stays_within_one_step(
        x in 0i32..4,
        y in 0i32..4,
        two_by_two in any::<bool>(),
        (r, g, b) in any::<(u8, u8, u8)>(),
    ) {
        let mode = FbzMode(DITHER | if two_by_two { 1 << 11 } else { 0 });
        let dithered = Dither::new(mode, y).pack(x, i32::from(r), i32::from(g), i32::from(b));

        let channels = |p: u16| (i32::from(p >> 11), i32::from((p >> 5) & 0x3f), i32::from(p & 0x1f));
        let (dr, dg, db) = channels(dithered);
        let (tr, tg, tb) = channels(Dither::new(FbzMode(0), y).pack(x, i32::from(r), i32::from(g), i32::from(b)));
        prop_assert!((dr - tr).abs() <= 1);
        prop_assert!((dg - tg).abs() <= 1);
        prop_assert!((db - tb).abs() <= 1);
    }
}
