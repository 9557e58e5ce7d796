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

//! Display refresh and beam position
//!
//! The host drives the refresh: once per frame it calls
//! [`Voodoo::vertical_timer`], which restarts the frame clock and hands the
//! front buffer to a [`FrameSink`] row by row. Retrace and beam position
//! are derived from the time elapsed since that call against a fixed 60Hz
//! frame period.

use std::time::Instant;

use super::Voodoo;

/// Length of one frame in milliseconds
pub const FRAME_PERIOD_MS: f64 = 1000.0 / 60.0;

/// Period of the horizontal beam position, in frame periods
const HORIZONTAL_PERIOD_FRAMES: f64 = 100.0;

/// Fraction of a period after which the beam is in retrace
const RETRACE_THRESHOLD: f64 = 0.95;

/// Receiver of presented frames
///
/// Pixels are the raw RGB565 words of the front buffer.
pub trait FrameSink {
    /// Start a frame of `width` x `height` pixels
    ///
    /// Returning `false` skips the frame; no rows are delivered and
    /// [`end_frame`](FrameSink::end_frame) is not called.
    fn begin_frame(&mut self, width: u32, height: u32) -> bool;

    /// Deliver the next row, top first
    fn draw_row(&mut self, row: &[u16]);

    /// Finish the frame started by the last successful `begin_frame`
    fn end_frame(&mut self);
}

impl Voodoo {
    /// Start of the current frame
    pub fn frame_start(&self) -> Instant {
        self.frame_start
    }

    /// Vertical refresh: restart the frame clock and present the front buffer
    ///
    /// The visible size comes from the video timing registers; nothing is
    /// presented while it is still zero.
    pub fn vertical_timer(&mut self, sink: &mut dyn FrameSink) {
        self.frame_start = Instant::now();

        let (width, height) = (self.fbi.width, self.fbi.height);
        if width == 0 || height == 0 {
            return;
        }
        let Some(base) = self.fbi.color_buffer(self.fbi.frontbuf) else {
            return;
        };
        if !sink.begin_frame(width, height) {
            log::trace!("Frame skipped by sink");
            return;
        }

        let ram = &self.fbi.ram;
        let stride = self.fbi.rowpixels;
        let mut row = vec![0u16; width as usize];
        for y in 0..height {
            let start = y.wrapping_mul(stride);
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = ram.pixel(base, start.wrapping_add(x as u32));
            }
            sink.draw_row(&row);
        }

        sink.end_frame();
    }

    /// Position within a period of `period_ms`
    ///
    /// With the video clock running and output enabled the value keeps
    /// growing past 1 until the next vertical timer; with output only it
    /// wraps every period; otherwise it stays at 0.
    fn period_position(&self, now: Instant, period_ms: f64) -> f64 {
        if period_ms <= 0.0 || !self.output_on {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.frame_start).as_secs_f64() * 1000.0;
        let position = elapsed / period_ms;
        if self.pci.clock_enabled() {
            position
        } else {
            position.fract()
        }
    }

    /// Whether the beam is in vertical retrace at `now`
    pub fn retrace_active(&self, now: Instant) -> bool {
        self.period_position(now, FRAME_PERIOD_MS) > RETRACE_THRESHOLD
    }

    /// Vertical and horizontal beam position at `now`, as period fractions
    pub fn beam_position(&self, now: Instant) -> (f64, f64) {
        (
            self.period_position(now, FRAME_PERIOD_MS),
            self.period_position(now, FRAME_PERIOD_MS * HORIZONTAL_PERIOD_FRAMES),
        )
    }
}
