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

//! Unit tests for Voodoo 2 strip setup

use super::*;

fn vertex(voodoo: &mut Voodoo, x: f32, y: f32) {
    write_float(voodoo, S_VX, x);
    write_float(voodoo, S_VY, y);
}

fn setup_device() -> Voodoo {
    let mut voodoo = new_device(VoodooModel::Voodoo2);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK);
    // RGB planes only
    write_reg(&mut voodoo, S_SETUP_MODE, 0x01);
    write_reg(&mut voodoo, S_ARGB, 0xff00_ff00);
    voodoo
}

#[test]
fn test_strip_draws_on_third_vertex() {
    let mut voodoo = setup_device();

    vertex(&mut voodoo, 10.0, 10.0);
    write_reg(&mut voodoo, S_BEGIN_TRI_CMD, 0);
    vertex(&mut voodoo, 12.0, 10.0);
    write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);
    assert_eq!(voodoo.triangles_out(), 0);

    vertex(&mut voodoo, 10.0, 12.0);
    write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);
    assert_eq!(voodoo.triangles_out(), 1);

    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 10, 10), Some(0x07e0));
    assert_eq!(voodoo.fbi.grad.startg, 0xff << 12);
    assert_eq!(voodoo.fbi.grad.dgdx, 0);
}

#[test]
fn test_s_argb_unpacks_channels() {
    let mut voodoo = new_device(VoodooModel::Voodoo2);
    write_reg(&mut voodoo, S_ARGB, 0x8040_2010);
    assert_eq!(voodoo.regs.f(S_ALPHA), 128.0);
    assert_eq!(voodoo.regs.f(S_RED), 64.0);
    assert_eq!(voodoo.regs.f(S_GREEN), 32.0);
    assert_eq!(voodoo.regs.f(S_BLUE), 16.0);
}

#[test]
fn test_strip_continues_with_each_vertex() {
    let mut voodoo = setup_device();

    vertex(&mut voodoo, 0.0, 0.0);
    write_reg(&mut voodoo, S_BEGIN_TRI_CMD, 0);
    for (x, y) in [(8.0, 0.0), (0.0, 8.0), (8.0, 8.0), (0.0, 16.0)] {
        vertex(&mut voodoo, x, y);
        write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);
    }
    assert_eq!(voodoo.triangles_out(), 3);

    // the last triangle (0,8) (8,8) (0,16) covers the start of row 10
    let back = voodoo.back_buffer();
    assert_eq!(voodoo.pixel(back, 1, 10), Some(0x07e0));
}

#[test]
fn test_fan_keeps_first_vertex() {
    let mut voodoo = setup_device();
    write_reg(&mut voodoo, S_SETUP_MODE, 0x1_0001);

    vertex(&mut voodoo, 20.0, 20.0);
    write_reg(&mut voodoo, S_BEGIN_TRI_CMD, 0);
    for (x, y) in [(30.0, 20.0), (30.0, 30.0), (20.0, 30.0)] {
        vertex(&mut voodoo, x, y);
        write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);
    }
    assert_eq!(voodoo.triangles_out(), 2);
    assert_eq!(voodoo.fbi.va.x, 20 * 16);
    assert_eq!(voodoo.fbi.va.y, 20 * 16);
}

#[test]
fn test_culling_rejects_one_winding() {
    let mut voodoo = setup_device();
    // culling enabled, positive sign culled, no ping-pong
    write_reg(&mut voodoo, S_SETUP_MODE, 0x01 | 0x2_0000 | 0x8_0000);

    let draw = |voodoo: &mut Voodoo, vertices: [(f32, f32); 3]| {
        vertex(voodoo, vertices[0].0, vertices[0].1);
        write_reg(voodoo, S_BEGIN_TRI_CMD, 0);
        for &(x, y) in &vertices[1..] {
            vertex(voodoo, x, y);
            write_reg(voodoo, S_DRAW_TRI_CMD, 0);
        }
    };

    draw(&mut voodoo, [(10.0, 10.0), (12.0, 10.0), (10.0, 12.0)]);
    let first = voodoo.triangles_out();
    draw(&mut voodoo, [(10.0, 10.0), (10.0, 12.0), (12.0, 10.0)]);
    let second = voodoo.triangles_out() - first;

    // exactly one of the two windings is drawn
    assert_eq!(first + second, 1);
}

#[test]
fn test_long_strip_alternates_winding() {
    let mut voodoo = setup_device();
    // culling enabled with ping-pong winding
    write_reg(&mut voodoo, S_SETUP_MODE, 0x01 | 0x2_0000);

    let strip = |voodoo: &mut Voodoo, left: f32, right: f32| {
        vertex(voodoo, left, 0.0);
        write_reg(voodoo, S_BEGIN_TRI_CMD, 0);
        for i in 1..40 {
            let x = if i % 2 == 0 { left } else { right };
            vertex(voodoo, x, (i / 2 * 8) as f32);
            write_reg(voodoo, S_DRAW_TRI_CMD, 0);
            assert!(voodoo.fbi.sverts <= 4);
        }
    };

    strip(&mut voodoo, 0.0, 8.0);
    let first = voodoo.triangles_out();
    strip(&mut voodoo, 8.0, 0.0);
    let second = voodoo.triangles_out() - first;

    // every triangle of one strip faces the same way
    assert!(first == 0 || first == 38);
    assert_eq!(first + second, 38);
}

#[test]
fn test_reset_drops_partial_strip() {
    let mut voodoo = setup_device();

    vertex(&mut voodoo, 10.0, 10.0);
    write_reg(&mut voodoo, S_BEGIN_TRI_CMD, 0);
    vertex(&mut voodoo, 12.0, 10.0);
    write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);

    voodoo.reset();
    vertex(&mut voodoo, 10.0, 12.0);
    write_reg(&mut voodoo, S_DRAW_TRI_CMD, 0);
    assert_eq!(voodoo.triangles_out(), 0);
    assert_eq!(voodoo.pixel(voodoo.back_buffer(), 10, 10), Some(0));
}

#[test]
fn test_setup_registers_are_voodoo2_only() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK);
    write_reg(&mut voodoo, S_SETUP_MODE, 0x01);
    write_float(&mut voodoo, S_VX, 10.0);
    write_reg(&mut voodoo, S_BEGIN_TRI_CMD, 0);
    assert_eq!(voodoo.fbi.sverts, 0);
}

#[test]
fn test_subpixel_adjust_moves_start_to_pixel_center() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK);
    write_reg(&mut voodoo, FBZ_COLOR_PATH, 1 << 26);

    // vertex A at the pixel corner, red ramps by 16 per pixel in X
    for (reg, value) in [
        (VERTEX_AX, 10 * 16),
        (VERTEX_AY, 10 * 16),
        (VERTEX_BX, 12 * 16),
        (VERTEX_BY, 10 * 16),
        (VERTEX_CX, 10 * 16),
        (VERTEX_CY, 12 * 16),
    ] {
        write_reg(&mut voodoo, reg, value);
    }
    write_reg(&mut voodoo, START_R, 0);
    write_reg(&mut voodoo, D_R_DX, 16 << 12);
    write_reg(&mut voodoo, TRIANGLE_CMD, 0);

    // half a pixel in X: 8 << 12
    assert_eq!(voodoo.fbi.grad.startr, 8 << 12);
}
