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

//! Triangle command and strip setup
//!
//! `triangleCMD` rasterizes the triangle described by the vertex and
//! gradient registers. On Voodoo 2 the host may instead feed plain vertices
//! through the `s*` registers; the setup unit keeps the last three and
//! derives the start values and gradients itself.
//!
//! # Strip Setup Mode (`sSetupMode`)
//!
//! ```text
//! bit  0   RGB          bit  4   W of TMU0      bit 16  fan (keep vertex 0)
//! bit  1   alpha        bit  5   S/T of TMU0    bit 17  culling enable
//! bit  2   Z            bit  6   W of TMU1      bit 18  culling sign
//! bit  3   W of FBI     bit  7   S/T of TMU1    bit 19  disable ping-pong
//! ```

use super::fbi::SetupVertex;
use super::modes::{FbiInit3, FbzColorPath, FbzMode};
use super::rasterizer::{rasterize_unit, Edges, INLINE_PIXEL_LIMIT};
use super::registers::*;
use super::tmu::{TexGradients, TmuState};
use super::Voodoo;

/// One interpolated quantity of a setup triangle
///
/// `dx`/`dy` are the plane gradients still to be scaled by the inverse of
/// the doubled triangle area.
struct Plane {
    start: f32,
    dx: f32,
    dy: f32,
}

impl Plane {
    /// 12.12 start value and gradients
    fn fixed12(&self, divisor: f32) -> (i32, i32, i32) {
        let tdiv = divisor * 4096.0;
        ((self.start * 4096.0) as i32, (self.dx * tdiv) as i32, (self.dy * tdiv) as i32)
    }

    /// 16.32 start value and gradients
    fn fixed32(&self, divisor: f32) -> (i64, i64, i64) {
        let scale = 65536.0 * 65536.0;
        let tdiv = divisor * scale;
        ((self.start * scale) as i64, (self.dx * tdiv) as i64, (self.dy * tdiv) as i64)
    }
}

fn set_tex_w(grad: &mut TexGradients, (start, dx, dy): (i64, i64, i64)) {
    grad.startw = start;
    grad.dwdx = dx;
    grad.dwdy = dy;
}

fn set_tex_st(grad: &mut TexGradients, s: (i64, i64, i64), t: (i64, i64, i64)) {
    (grad.starts, grad.dsdx, grad.dsdy) = s;
    (grad.startt, grad.dtdx, grad.dtdy) = t;
}

impl Voodoo {
    /// Number of texture units taking part in the current triangle
    fn active_tmus(&self) -> usize {
        let disabled = FbiInit3(self.regs.u(FBI_INIT3)).disable_tmus();
        if disabled || !FbzColorPath(self.regs.u(FBZ_COLOR_PATH)).texture_enable() {
            0
        } else if self.chipmask & 0x04 != 0 {
            2
        } else {
            1
        }
    }

    /// `triangleCMD`: rasterize the triangle in the parameter registers
    ///
    /// # Algorithm
    ///
    /// 1. Optionally move the start values to the pixel center of vertex A
    /// 2. Resolve the edges and the draw buffer; degenerate triangles and
    ///    reserved draw buffers produce nothing
    /// 3. Snapshot the render state and the active texture units
    /// 4. Rasterize inline for small triangles, on the worker pool otherwise
    /// 5. Queue the statistics and count the triangle
    pub(crate) fn triangle(&mut self) {
        let texcount = self.active_tmus();

        if FbzColorPath(self.regs.u(FBZ_COLOR_PATH)).subpixel_adjust() {
            self.subpixel_adjust(texcount);
        }

        let (va, vb, vc) = (self.fbi.va, self.fbi.vb, self.fbi.vc);
        let Some(edges) = Edges::new((va.x, va.y), (vb.x, vb.y), (vc.x, vc.y)) else {
            log::trace!("Degenerate triangle skipped");
            return;
        };

        let select = FbzMode(self.regs.u(FBZ_MODE)).draw_buffer();
        let Some(drawbuf) = self.fbi.select_buffer(select) else {
            log::debug!("Triangle with reserved draw buffer {} skipped", select);
            return;
        };

        let bilinear = self.config.bilinear;
        let regs = &self.regs;
        let tmus: Vec<TmuState> = self
            .tmus
            .iter_mut()
            .take(texcount)
            .map(|tmu| tmu.prepare(regs, bilinear))
            .collect();

        let state = self.render_state(drawbuf, tmus);
        let total = edges.total_pixels();

        let stats = if self.pool.threads() == 0 || total <= INLINE_PIXEL_LIMIT {
            rasterize_unit(&state, &edges, total, 0, 1)
        } else {
            let units = self.pool.units();
            self.pool
                .run(std::sync::Arc::new(move |unit| rasterize_unit(&state, &edges, total, unit, units)))
        };

        self.pending += stats;
        self.regs.increment(FBI_TRIANGLES_OUT);
    }

    /// Move the iterator start values from vertex A to its pixel center
    ///
    /// The adjustment is applied to the live parameters, so issuing the
    /// same triangle twice adjusts twice.
    fn subpixel_adjust(&mut self, texcount: usize) {
        let dx = 8 - (i32::from(self.fbi.va.x) & 15);
        let dy = 8 - (i32::from(self.fbi.va.y) & 15);
        let adjust32 = |ddy: i32, ddx: i32| dy.wrapping_mul(ddy).wrapping_add(dx.wrapping_mul(ddx)) >> 4;
        let adjust64 = |ddy: i64, ddx: i64| {
            i64::from(dy)
                .wrapping_mul(ddy)
                .wrapping_add(i64::from(dx).wrapping_mul(ddx))
                >> 4
        };

        let g = &mut self.fbi.grad;
        g.startr = g.startr.wrapping_add(adjust32(g.drdy, g.drdx));
        g.startg = g.startg.wrapping_add(adjust32(g.dgdy, g.dgdx));
        g.startb = g.startb.wrapping_add(adjust32(g.dbdy, g.dbdx));
        g.starta = g.starta.wrapping_add(adjust32(g.dady, g.dadx));
        g.startw = g.startw.wrapping_add(adjust64(g.dwdy, g.dwdx));
        g.startz = g
            .startz
            .wrapping_add(((i64::from(dy) * i64::from(g.dzdy)) >> 4) as i32)
            .wrapping_add(((i64::from(dx) * i64::from(g.dzdx)) >> 4) as i32);

        for tmu in self.tmus.iter_mut().take(texcount) {
            let t = &mut tmu.grad;
            t.startw = t.startw.wrapping_add(adjust64(t.dwdy, t.dwdx));
            t.starts = t.starts.wrapping_add(adjust64(t.dsdy, t.dsdx));
            t.startt = t.startt.wrapping_add(adjust64(t.dtdy, t.dtdx));
        }
    }

    /// Vertex currently held in the strip setup registers
    fn setup_vertex(&self) -> SetupVertex {
        let r = &self.regs;
        SetupVertex {
            x: r.f(S_VX),
            y: r.f(S_VY),
            a: r.f(S_ALPHA),
            r: r.f(S_RED),
            g: r.f(S_GREEN),
            b: r.f(S_BLUE),
            z: r.f(S_VZ),
            wb: r.f(S_WB),
            w0: r.f(S_WTMU0),
            s0: r.f(S_S_W0),
            t0: r.f(S_T_W0),
            w1: r.f(S_WTMU1),
            s1: r.f(S_S_WTMU1),
            t1: r.f(S_T_WTMU1),
        }
    }

    /// `sBeginTriCMD`: start a new strip or fan from the current vertex
    pub(crate) fn begin_triangle(&mut self) {
        let vertex = self.setup_vertex();
        self.fbi.svert = [vertex; 3];
        self.fbi.sverts = 1;
    }

    /// `sDrawTriCMD`: push the current vertex and draw once three are held
    ///
    /// Strips drop the oldest vertex; fans (`sSetupMode` bit 16) keep
    /// vertex 0.
    pub(crate) fn draw_triangle(&mut self) {
        let fan = self.regs.u(S_SETUP_MODE) & 0x1_0000 != 0;
        if !fan {
            self.fbi.svert[0] = self.fbi.svert[1];
        }
        self.fbi.svert[1] = self.fbi.svert[2];
        self.fbi.svert[2] = self.setup_vertex();

        // only the parity past the third vertex matters, keep the count small
        self.fbi.sverts += 1;
        if self.fbi.sverts > 4 {
            self.fbi.sverts -= 2;
        }
        if self.fbi.sverts >= 3 {
            self.setup_and_draw();
        }
    }

    /// Derive start values and gradients from the three held vertices
    fn setup_and_draw(&mut self) {
        let [v0, v1, v2] = self.fbi.svert;
        let mode = self.regs.u(S_SETUP_MODE);

        for (vertex, setup) in [&mut self.fbi.va, &mut self.fbi.vb, &mut self.fbi.vc]
            .into_iter()
            .zip([v0, v1, v2])
        {
            vertex.x = (setup.x * 16.0) as i16;
            vertex.y = (setup.y * 16.0) as i16;
        }

        let divisor = 1.0 / ((v0.x - v1.x) * (v0.y - v2.y) - (v0.x - v2.x) * (v0.y - v1.y));

        if mode & 0x2_0000 != 0 {
            let mut culling_sign = mode & 0x4_0000 != 0;
            if mode & 0x9_0000 == 0 {
                // strips alternate winding unless ping-pong is disabled
                culling_sign ^= (self.fbi.sverts - 3) & 1 != 0;
            }
            if (divisor < 0.0) == culling_sign {
                log::trace!("Setup triangle culled");
                return;
            }
        }

        let dx1 = v0.y - v2.y;
        let dx2 = v0.y - v1.y;
        let dy1 = v0.x - v1.x;
        let dy2 = v0.x - v2.x;
        let plane = |q: fn(&SetupVertex) -> f32| Plane {
            start: q(&v0),
            dx: (q(&v0) - q(&v1)) * dx1 - (q(&v0) - q(&v2)) * dx2,
            dy: (q(&v0) - q(&v2)) * dy1 - (q(&v0) - q(&v1)) * dy2,
        };

        let g = &mut self.fbi.grad;
        if mode & 0x01 != 0 {
            (g.startr, g.drdx, g.drdy) = plane(|v| v.r).fixed12(divisor);
            (g.startg, g.dgdx, g.dgdy) = plane(|v| v.g).fixed12(divisor);
            (g.startb, g.dbdx, g.dbdy) = plane(|v| v.b).fixed12(divisor);
        }
        if mode & 0x02 != 0 {
            (g.starta, g.dadx, g.dady) = plane(|v| v.a).fixed12(divisor);
        }
        if mode & 0x04 != 0 {
            (g.startz, g.dzdx, g.dzdy) = plane(|v| v.z).fixed12(divisor);
        }
        if mode & 0x08 != 0 {
            let w = plane(|v| v.wb).fixed32(divisor);
            (g.startw, g.dwdx, g.dwdy) = w;
            for tmu in &mut self.tmus {
                set_tex_w(&mut tmu.grad, w);
            }
        }
        if mode & 0x10 != 0 {
            let w = plane(|v| v.w0).fixed32(divisor);
            for tmu in &mut self.tmus {
                set_tex_w(&mut tmu.grad, w);
            }
        }
        if mode & 0x20 != 0 {
            let s = plane(|v| v.s0).fixed32(divisor);
            let t = plane(|v| v.t0).fixed32(divisor);
            for tmu in &mut self.tmus {
                set_tex_st(&mut tmu.grad, s, t);
            }
        }
        if let Some(tmu1) = self.tmus.get_mut(1) {
            if mode & 0x40 != 0 {
                set_tex_w(&mut tmu1.grad, plane(|v| v.w1).fixed32(divisor));
            }
            if mode & 0x80 != 0 {
                let s = plane(|v| v.s1).fixed32(divisor);
                let t = plane(|v| v.t1).fixed32(divisor);
                set_tex_st(&mut tmu1.grad, s, t);
            }
        }

        self.triangle();
    }
}
