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

//! Pixel pipeline statistics
//!
//! Every raster unit and the LFB path count into a private [`Stats`] block.
//! The blocks are folded into the visible statistic registers only when one
//! of them is read, so a reader never observes a half-updated counter.

use std::ops::AddAssign;

/// Per-stage pixel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Pixels that entered the pipeline (including clipped pixels)
    pub pixels_in: i32,
    /// Pixels written to the frame buffer
    pub pixels_out: i32,
    /// Pixels rejected by the chroma key
    pub chroma_fail: i32,
    /// Pixels rejected by the depth test
    pub zfunc_fail: i32,
    /// Pixels rejected by the alpha mask or alpha test
    pub afunc_fail: i32,
}

impl Stats {
    /// Check whether any counter is non-zero
    pub fn is_empty(&self) -> bool {
        *self == Stats::default()
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Stats) {
        self.pixels_in = self.pixels_in.wrapping_add(other.pixels_in);
        self.pixels_out = self.pixels_out.wrapping_add(other.pixels_out);
        self.chroma_fail = self.chroma_fail.wrapping_add(other.chroma_fail);
        self.zfunc_fail = self.zfunc_fail.wrapping_add(other.zfunc_fail);
        self.afunc_fail = self.afunc_fail.wrapping_add(other.afunc_fail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut total = Stats::default();
        assert!(total.is_empty());

        total += Stats {
            pixels_in: 10,
            pixels_out: 7,
            zfunc_fail: 3,
            ..Default::default()
        };
        total += Stats {
            pixels_in: 1,
            chroma_fail: 1,
            ..Default::default()
        };

        assert_eq!(total.pixels_in, 11);
        assert_eq!(total.pixels_out, 7);
        assert_eq!(total.chroma_fail, 1);
        assert_eq!(total.zfunc_fail, 3);
        assert_eq!(total.afunc_fail, 0);
        assert!(!total.is_empty());
    }
}
