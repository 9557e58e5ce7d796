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

//! Scanline rasterizer
//!
//! Triangles are walked top to bottom one scanline at a time. For each row
//! the left and right edges are evaluated at the pixel center and rounded
//! with [`round_coordinate`]; the resulting span is shaded left to right.
//!
//! # Work Partitioning
//!
//! The pixels of a triangle are numbered in walk order (row by row, left to
//! right). A triangle is split into `units` contiguous index ranges:
//!
//! ```text
//!   unit k covers pixels [total * k / units, total * (k + 1) / units)
//! ```
//!
//! Every unit re-walks the edges from the top and only shades the pixels in
//! its range, so the union over all units is exactly the single-threaded
//! pixel set, and no two units ever touch the same pixel.

use super::dither::Dither;
use super::math::round_coordinate;
use super::pipeline::{Iterators, PixelSource, RenderState, Row, TexCoord};
use super::stats::Stats;

/// Triangles with at most this many pixels are not worth waking the workers
pub const INLINE_PIXEL_LIMIT: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
}

/// A triangle prepared for scanline walking
///
/// Vertices are sorted by Y. `top` and `bottom` are the first scanline and
/// one past the last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edges {
    v1: Point,
    v2: Point,
    v3: Point,
    top: i32,
    bottom: i32,
    dxdy_v1v2: f32,
    dxdy_v1v3: f32,
    dxdy_v2v3: f32,
}

/// Horizontal run of pixels on one scanline, `stopx` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub startx: i32,
    pub stopx: i32,
}

fn slope(a: Point, b: Point) -> f32 {
    if a.y == b.y {
        0.0
    } else {
        (b.x - a.x) / (b.y - a.y)
    }
}

impl Edges {
    /// Build the edge walker for three 12.4 fixed-point vertices
    ///
    /// Returns `None` if the triangle covers no scanline.
    pub fn new(a: (i16, i16), b: (i16, i16), c: (i16, i16)) -> Option<Self> {
        let point = |(x, y): (i16, i16)| Point {
            x: f32::from(x) * (1.0 / 16.0),
            y: f32::from(y) * (1.0 / 16.0),
        };
        let (mut v1, mut v2, mut v3) = (point(a), point(b), point(c));

        if v2.y < v1.y {
            std::mem::swap(&mut v1, &mut v2);
        }
        if v3.y < v2.y {
            std::mem::swap(&mut v2, &mut v3);
            if v2.y < v1.y {
                std::mem::swap(&mut v1, &mut v2);
            }
        }

        let top = round_coordinate(v1.y);
        let bottom = round_coordinate(v3.y);
        if bottom <= top {
            return None;
        }

        Some(Self {
            v1,
            v2,
            v3,
            top,
            bottom,
            dxdy_v1v2: slope(v1, v2),
            dxdy_v1v3: slope(v1, v3),
            dxdy_v2v3: slope(v2, v3),
        })
    }

    /// First scanline and one past the last
    pub fn rows(&self) -> std::ops::Range<i32> {
        self.top..self.bottom
    }

    /// Unordered edge extent of scanline `y`
    fn raw_span(&self, y: i32) -> (i32, i32) {
        let fully = y as f32 + 0.5;
        let startx = self.v1.x + (fully - self.v1.y) * self.dxdy_v1v3;
        let stopx = if fully < self.v2.y {
            self.v1.x + (fully - self.v1.y) * self.dxdy_v1v2
        } else {
            self.v2.x + (fully - self.v2.y) * self.dxdy_v2v3
        };
        (round_coordinate(startx), round_coordinate(stopx))
    }

    /// Span of scanline `y`, or `None` if the row is empty
    pub fn span(&self, y: i32) -> Option<Span> {
        let (startx, stopx) = self.raw_span(y);
        match startx.cmp(&stopx) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(Span { startx, stopx }),
            std::cmp::Ordering::Greater => Some(Span {
                startx: stopx,
                stopx: startx,
            }),
        }
    }

    /// Number of pixels the walk visits
    pub fn total_pixels(&self) -> i32 {
        self.rows()
            .map(|y| {
                let (startx, stopx) = self.raw_span(y);
                (stopx - startx).abs()
            })
            .fold(0i32, i32::wrapping_add)
    }

    /// Spans of the pixels with walk index in `[from, to)`
    pub fn spans_in_range(&self, from: i64, to: i64) -> impl Iterator<Item = (i32, Span)> + '_ {
        let mut sumpix = 0i64;
        self.rows()
            .map_while(move |y| {
                let lastsum = sumpix;
                if lastsum >= to {
                    return None;
                }
                let span = self.span(y);
                if let Some(span) = span {
                    sumpix += i64::from(span.stopx - span.startx);
                }
                Some((y, span, lastsum, sumpix))
            })
            .filter_map(move |(y, span, lastsum, sumpix)| {
                let mut span = span?;
                if sumpix <= from {
                    return None;
                }
                if lastsum < from {
                    span.startx += (from - lastsum) as i32;
                }
                if sumpix > to {
                    span.stopx -= (sumpix - to) as i32;
                }
                Some((y, span))
            })
    }
}

/// Pixel index range of work unit `unit` out of `units`
pub fn unit_range(total: i32, unit: usize, units: usize) -> (i64, i64) {
    let units = units.max(1) as i64;
    let total = i64::from(total);
    (total * unit as i64 / units, total * (unit as i64 + 1) / units)
}

/// Rasterize the part of a triangle assigned to one work unit
pub fn rasterize_unit(state: &RenderState, edges: &Edges, total: i32, unit: usize, units: usize) -> Stats {
    let (from, to) = unit_range(total, unit, units);
    let mut stats = Stats::default();
    for (y, span) in edges.spans_in_range(from, to) {
        scanline(state, y, span, &mut stats);
    }
    stats
}

/// Flip `y` when the Y origin is at the bottom of the screen
#[inline]
pub fn screen_y(flip: bool, yorigin: i32, y: i32) -> i32 {
    if flip {
        (yorigin - y) & 0x3ff
    } else {
        y
    }
}

/// Shade one span of a triangle
pub fn scanline(state: &RenderState, y: i32, span: Span, stats: &mut Stats) {
    let mode = state.fbz_mode;
    let scry = screen_y(mode.y_origin(), state.yorigin, y);
    let Span { mut startx, mut stopx } = span;

    if mode.enable_clipping() {
        let clip_y = state.clip_low_y_high_y;
        if scry < ((clip_y >> 16) & 0x3ff) as i32 || scry >= (clip_y & 0x3ff) as i32 {
            stats.pixels_in += stopx - startx;
            return;
        }

        let left = ((state.clip_left_right >> 16) & 0x3ff) as i32;
        if startx < left {
            stats.pixels_in += left - startx;
            startx = left;
        }
        let right = (state.clip_left_right & 0x3ff) as i32;
        if stopx >= right {
            stats.pixels_in += stopx - right;
            stopx = right - 1;
        }
    }

    let row_offset = (scry as u32).wrapping_mul(state.rowpixels).wrapping_mul(2);
    let row = Row {
        y,
        dither: Dither::new(mode, y),
        dest: state.drawbuf.wrapping_add(row_offset),
        depth: state.aux.map(|aux| aux.wrapping_add(row_offset)),
    };

    let g = &state.grad;
    let dx = startx - (i32::from(state.ax) >> 4);
    let dy = y - (i32::from(state.ay) >> 4);
    let start32 = |start: i32, ddy: i32, ddx: i32| {
        start.wrapping_add(dy.wrapping_mul(ddy)).wrapping_add(dx.wrapping_mul(ddx))
    };
    let start64 = |start: i64, ddy: i64, ddx: i64| {
        start
            .wrapping_add(i64::from(dy).wrapping_mul(ddy))
            .wrapping_add(i64::from(dx).wrapping_mul(ddx))
    };

    let mut it = Iterators {
        r: start32(g.startr, g.drdy, g.drdx),
        g: start32(g.startg, g.dgdy, g.dgdx),
        b: start32(g.startb, g.dbdy, g.dbdx),
        a: start32(g.starta, g.dady, g.dadx),
        z: start32(g.startz, g.dzdy, g.dzdx),
        w: start64(g.startw, g.dwdy, g.dwdx),
        tex: [TexCoord::default(); 2],
    };
    for (coord, tmu) in it.tex.iter_mut().zip(&state.tmus) {
        let t = &tmu.grad;
        *coord = TexCoord {
            s: start64(t.starts, t.dsdy, t.dsdx),
            t: start64(t.startt, t.dtdy, t.dtdx),
            w: start64(t.startw, t.dwdy, t.dwdx),
        };
    }

    let mut stipple = state.stipple;
    for x in startx..stopx {
        state.shade_pixel(&row, stats, &mut stipple, x, &it, PixelSource::Iterated);

        it.r = it.r.wrapping_add(g.drdx);
        it.g = it.g.wrapping_add(g.dgdx);
        it.b = it.b.wrapping_add(g.dbdx);
        it.a = it.a.wrapping_add(g.dadx);
        it.z = it.z.wrapping_add(g.dzdx);
        it.w = it.w.wrapping_add(g.dwdx);
        for (coord, tmu) in it.tex.iter_mut().zip(&state.tmus) {
            coord.s = coord.s.wrapping_add(tmu.grad.dsdx);
            coord.t = coord.t.wrapping_add(tmu.grad.dtdx);
            coord.w = coord.w.wrapping_add(tmu.grad.dwdx);
        }
    }
}

/// Fast fill of the clip rectangle
///
/// Color rows get the dithered `color1` pattern, aux rows the low half of
/// `zaColor`. Neither goes through the pixel pipeline.
///
/// # Arguments
///
/// * `state` - Captured render state (clip, modes, buffers)
/// * `color_target` - Byte offset of the color buffer, `None` if the draw
///   buffer selection is reserved
pub fn fastfill(state: &RenderState, color_target: Option<u32>) -> Stats {
    let mut stats = Stats::default();
    let mode = state.fbz_mode;
    if !mode.rgb_buffer_mask() && !mode.aux_buffer_mask() {
        return stats;
    }

    let clip_x = state.clip_left_right;
    let clip_y = state.clip_low_y_high_y;
    let (mut startx, mut stopx) = (((clip_x >> 16) & 0x3ff) as i32, (clip_x & 0x3ff) as i32);
    let (top, bottom) = (((clip_y >> 16) & 0x3ff) as i32, (clip_y & 0x3ff) as i32);
    if startx > stopx {
        std::mem::swap(&mut startx, &mut stopx);
    }

    let color = state.color1;
    let mut pattern = [[0u16; 4]; 4];
    for (y, row) in pattern.iter_mut().enumerate() {
        let dither = Dither::new(mode, y as i32);
        for (x, pixel) in row.iter_mut().enumerate() {
            *pixel = dither.pack(x as i32, color.r(), color.g(), color.b());
        }
    }

    let depth = state.za_color as u16;
    let mask = state.ram.mask();

    for y in top..bottom {
        let scry = screen_y(mode.y_origin(), state.yorigin, y);
        let row_pixels = (scry as u32).wrapping_mul(state.rowpixels);

        if mode.rgb_buffer_mask() {
            if let Some(target) = color_target {
                let base = target.wrapping_add(row_pixels.wrapping_mul(2));
                let pattern = &pattern[(y & 3) as usize];
                for x in startx..stopx {
                    state.ram.set_pixel(base, x as u32, pattern[(x & 3) as usize]);
                }
                stats.pixels_out += stopx - startx;
            }
        }

        if let Some(aux) = state.aux.filter(|_| mode.aux_buffer_mask()) {
            let mut row_stop = stopx;
            let end = i64::from(aux) + 2 * (i64::from(row_pixels) + i64::from(stopx));
            if end >= i64::from(mask) {
                row_stop = ((i64::from(mask) - i64::from(aux)) / 2 - i64::from(row_pixels)) as i32;
                if row_stop < 0 || row_stop < startx {
                    continue;
                }
            }

            let base = aux.wrapping_add(row_pixels.wrapping_mul(2));
            for x in startx..row_stop {
                state.ram.set_pixel(base, x as u32, depth);
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::VideoMemory;
    use crate::core::voodoo::color::Argb;
    use crate::core::voodoo::fbi::Gradients;
    use crate::core::voodoo::modes::{AlphaMode, ChromaRange, FbzColorPath, FbzMode, FogMode};

    fn fixed(x: i32, y: i32) -> (i16, i16) {
        ((x * 16) as i16, (y * 16) as i16)
    }

    fn state(fbz_mode: u32) -> RenderState {
        RenderState {
            color_path: FbzColorPath(0),
            fbz_mode: FbzMode(fbz_mode),
            alpha_mode: AlphaMode(0),
            fog_mode: FogMode(0),
            za_color: 0x1234,
            color0: Argb(0),
            color1: Argb(0x0000_ff00),
            fog_color: Argb(0),
            chroma_key: 0,
            chroma_range: ChromaRange(0),
            stipple: 0,
            clip_left_right: 0,
            clip_low_y_high_y: 0,
            fogblend: [0; 64],
            fogdelta: [0; 64],
            fogdelta_mask: 0xff,
            yorigin: 0,
            rowpixels: 64,
            ram: VideoMemory::new(0x10000).unwrap(),
            drawbuf: 0,
            aux: Some(0x8000),
            tmus: Vec::new(),
            send_config: false,
            tmu_config: 0,
            grad: Gradients::default(),
            ax: 0,
            ay: 0,
        }
    }

    #[test]
    fn test_edges_reject_flat_triangle() {
        assert!(Edges::new(fixed(0, 5), fixed(10, 5), fixed(4, 5)).is_none());
    }

    #[test]
    fn test_edges_sorted_by_y() {
        let e = Edges::new(fixed(0, 10), fixed(0, 0), fixed(10, 10)).unwrap();
        assert_eq!(e.rows(), 0..10);
    }

    #[test]
    fn test_right_triangle_pixel_count() {
        // (0,0) (8,0) (0,8): row y covers [0, 8 - y - 0.5) rounded
        let e = Edges::new(fixed(0, 0), fixed(8, 0), fixed(0, 8)).unwrap();
        let total: i32 = e.rows().filter_map(|y| e.span(y)).map(|s| s.stopx - s.startx).sum();
        assert_eq!(total, e.total_pixels());
        assert!(total > 0);
    }

    #[test]
    fn test_unit_ranges_cover_every_pixel_once() {
        let e = Edges::new(fixed(3, 1), fixed(40, 7), fixed(11, 33)).unwrap();
        let total = e.total_pixels();
        let units = 16;

        let mut seen = std::collections::HashSet::new();
        let mut count = 0;
        for unit in 0..units {
            let (from, to) = unit_range(total, unit, units);
            for (y, span) in e.spans_in_range(from, to) {
                for x in span.startx..span.stopx {
                    assert!(seen.insert((x, y)), "pixel ({x}, {y}) shaded twice");
                    count += 1;
                }
            }
        }
        assert_eq!(count, total);
    }

    #[test]
    fn test_scanline_clipping_counts_pixels_in() {
        let mut s = state((1 << 9) | 1);
        s.clip_left_right = (2 << 16) | 6;
        s.clip_low_y_high_y = 4;
        let mut stats = Stats::default();

        scanline(&s, 0, Span { startx: 0, stopx: 10 }, &mut stats);
        // clipped: 0..2 and 6..10 on the left/right, shaded: 2..5
        assert_eq!(stats.pixels_in, 2 + 4 + 3);
        assert_eq!(stats.pixels_out, 3);

        let mut stats = Stats::default();
        scanline(&s, 5, Span { startx: 0, stopx: 10 }, &mut stats);
        assert_eq!(stats.pixels_in, 10);
        assert_eq!(stats.pixels_out, 0);
    }

    #[test]
    fn test_fastfill_clip_rectangle() {
        // rgb write only, no dithering
        let s = state(1 << 9);
        let mut s = s;
        s.clip_left_right = 4;
        s.clip_low_y_high_y = 4;

        let stats = fastfill(&s, Some(0));
        assert_eq!(stats.pixels_out, 16);

        for y in 0..8u32 {
            for x in 0..8u32 {
                let expected = if x < 4 && y < 4 { 0x07e0 } else { 0 };
                assert_eq!(s.ram.pixel(y * 64 * 2, x), expected, "pixel ({x}, {y})");
            }
        }
        assert_eq!(s.ram.pixel(0x8000, 0), 0);
    }

    #[test]
    fn test_fastfill_aux_uses_za_color() {
        let mut s = state(1 << 10);
        s.clip_left_right = 2;
        s.clip_low_y_high_y = 1;

        fastfill(&s, Some(0));
        assert_eq!(s.ram.pixel(0x8000, 0), 0x1234);
        assert_eq!(s.ram.pixel(0x8000, 1), 0x1234);
        assert_eq!(s.ram.pixel(0x8000, 2), 0);
        assert_eq!(s.ram.pixel(0, 0), 0);
    }

    #[test]
    fn test_screen_y_flip() {
        assert_eq!(screen_y(false, 479, 10), 10);
        assert_eq!(screen_y(true, 479, 10), 469);
        assert_eq!(screen_y(true, 0, 1), 0x3ff);
    }
}
