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

//! Unit tests for display refresh and beam position

use std::time::Duration;

use super::*;

#[derive(Default)]
struct RecordingSink {
    accept: bool,
    size: Option<(u32, u32)>,
    rows: Vec<Vec<u16>>,
    frames: usize,
}

impl FrameSink for RecordingSink {
    fn begin_frame(&mut self, width: u32, height: u32) -> bool {
        self.size = Some((width, height));
        self.rows.clear();
        self.accept
    }

    fn draw_row(&mut self, row: &[u16]) {
        self.rows.push(row.to_vec());
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

fn after(voodoo: &Voodoo, millis: f64) -> std::time::Instant {
    voodoo.frame_start() + Duration::from_secs_f64(millis / 1000.0)
}

#[test]
fn test_vertical_timer_presents_front_buffer() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    // one red pixel in the front buffer at (3, 2)
    write_reg(&mut voodoo, LFB_MODE, 4);
    voodoo.write(LFB_BASE + ((2 << 10) + 3) * 4, 0x00ff_0000, 0xffff_ffff);

    let mut sink = RecordingSink {
        accept: true,
        ..Default::default()
    };
    voodoo.vertical_timer(&mut sink);

    assert_eq!(sink.size, Some((640, 480)));
    assert_eq!(sink.frames, 1);
    assert_eq!(sink.rows.len(), 480);
    assert!(sink.rows.iter().all(|row| row.len() == 640));
    assert_eq!(sink.rows[2][3], 0xf800);
    assert_eq!(sink.rows[2][4], 0);
}

#[test]
fn test_vertical_timer_follows_swap() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBZ_MODE, RGB_WRITE | DRAW_BACK);
    flat_triangle(&mut voodoo, SINGLE_PIXEL, (255, 255, 255));

    let mut sink = RecordingSink {
        accept: true,
        ..Default::default()
    };
    voodoo.vertical_timer(&mut sink);
    assert_eq!(sink.rows[10][10], 0);

    write_reg(&mut voodoo, SWAPBUFFER_CMD, 0);
    voodoo.vertical_timer(&mut sink);
    assert_eq!(sink.rows[10][10], 0xffff);
    assert_eq!(sink.frames, 2);
}

#[test]
fn test_sink_may_skip_frame() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    let mut sink = RecordingSink::default();
    voodoo.vertical_timer(&mut sink);

    assert_eq!(sink.size, Some((640, 480)));
    assert!(sink.rows.is_empty());
    assert_eq!(sink.frames, 0);
}

#[test]
fn test_vertical_timer_restarts_frame_clock() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    let before = voodoo.frame_start();
    std::thread::sleep(Duration::from_millis(2));

    let mut sink = RecordingSink::default();
    voodoo.vertical_timer(&mut sink);
    assert!(voodoo.frame_start() > before);
}

#[test]
fn test_no_retrace_while_output_disabled() {
    let voodoo = new_device(VoodooModel::Voodoo1);
    assert!(!voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 0.99)));
    assert_eq!(voodoo.beam_position(after(&voodoo, 5.0)), (0.0, 0.0));
}

#[test]
fn test_retrace_near_end_of_frame() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBI_INIT0, 1);

    assert!(!voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 0.5)));
    assert!(voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 0.99)));
    // without the video clock the position wraps every frame
    assert!(!voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 1.2)));

    voodoo.pci_write(0xc0, 0);
    assert!(voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 1.2)));

    voodoo.pci_write(0xe0, 0);
    assert!(!voodoo.retrace_active(after(&voodoo, FRAME_PERIOD_MS * 1.2)));
}

#[test]
fn test_beam_position_fractions() {
    let mut voodoo = new_device(VoodooModel::Voodoo1);
    write_reg(&mut voodoo, FBI_INIT0, 1);

    let (v, h) = voodoo.beam_position(after(&voodoo, FRAME_PERIOD_MS * 0.5));
    assert!((v - 0.5).abs() < 1e-3, "v = {v}");
    assert!((h - 0.005).abs() < 1e-4, "h = {h}");
}

#[test]
fn test_hv_retrace_register() {
    let mut voodoo = new_device(VoodooModel::Voodoo2);
    assert_eq!(read_reg(&mut voodoo, HV_RETRACE), 0);

    let mut voodoo = new_device(VoodooModel::Voodoo1);
    assert_eq!(read_reg(&mut voodoo, HV_RETRACE), 0xffff_ffff);
}
