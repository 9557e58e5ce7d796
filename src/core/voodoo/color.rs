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

//! Color words and packed pixel formats
//!
//! Colors travel through the pipeline as 32-bit ARGB words:
//!
//! ```text
//! 31      24 23      16 15       8 7        0
//! ┌─────────┬──────────┬──────────┬─────────┐
//! │  alpha  │   red    │  green   │  blue   │
//! └─────────┴──────────┴──────────┴─────────┘
//! ```
//!
//! The `extract_*` functions expand packed texel and LFB formats to 8-bit
//! channels by replicating the high bits into the low bits. Channels are
//! returned in the order they appear in the packed word, most significant
//! first; the caller decides which channel is red and which is blue.

/// A 32-bit ARGB color word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Argb(pub u32);

impl Argb {
    /// Build a color from 8-bit channels
    #[inline(always)]
    pub fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Argb((u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Build a color from channels already clamped to 0..=255
    #[inline(always)]
    pub fn from_i32(a: i32, r: i32, g: i32, b: i32) -> Self {
        Argb((((a as u32) & 0xff) << 24) | (((r as u32) & 0xff) << 16) | (((g as u32) & 0xff) << 8) | ((b as u32) & 0xff))
    }

    #[inline(always)]
    pub fn a(self) -> i32 {
        (self.0 >> 24) as i32
    }

    #[inline(always)]
    pub fn r(self) -> i32 {
        ((self.0 >> 16) & 0xff) as i32
    }

    #[inline(always)]
    pub fn g(self) -> i32 {
        ((self.0 >> 8) & 0xff) as i32
    }

    #[inline(always)]
    pub fn b(self) -> i32 {
        (self.0 & 0xff) as i32
    }

    /// Color without its alpha channel
    #[inline(always)]
    pub fn rgb(self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

/// 5-6-5 to 8-8-8
#[inline(always)]
pub fn extract_565(v: u32) -> (u8, u8, u8) {
    (
        (((v >> 8) & 0xf8) | ((v >> 13) & 0x07)) as u8,
        (((v >> 3) & 0xfc) | ((v >> 9) & 0x03)) as u8,
        (((v << 3) & 0xf8) | ((v >> 2) & 0x07)) as u8,
    )
}

/// x-5-5-5 to 8-8-8
#[inline(always)]
pub fn extract_x555(v: u32) -> (u8, u8, u8) {
    (
        (((v >> 7) & 0xf8) | ((v >> 12) & 0x07)) as u8,
        (((v >> 2) & 0xf8) | ((v >> 7) & 0x07)) as u8,
        (((v << 3) & 0xf8) | ((v >> 2) & 0x07)) as u8,
    )
}

/// 5-5-5-x to 8-8-8
#[inline(always)]
pub fn extract_555x(v: u32) -> (u8, u8, u8) {
    (
        (((v >> 8) & 0xf8) | ((v >> 13) & 0x07)) as u8,
        (((v >> 3) & 0xf8) | ((v >> 8) & 0x07)) as u8,
        (((v << 2) & 0xf8) | ((v >> 3) & 0x07)) as u8,
    )
}

/// 1-5-5-5 to 8-8-8-8 (alpha first)
#[inline(always)]
pub fn extract_1555(v: u32) -> (u8, u8, u8, u8) {
    let a = (((v as u16 as i16) >> 15) & 0xff) as u8;
    let (b, c, d) = extract_x555(v);
    (a, b, c, d)
}

/// 5-5-5-1 to 8-8-8-8 (alpha last)
#[inline(always)]
pub fn extract_5551(v: u32) -> (u8, u8, u8, u8) {
    let (a, b, c) = extract_555x(v);
    (a, b, c, if v & 1 != 0 { 0xff } else { 0x00 })
}

/// x-8-8-8 to 8-8-8
#[inline(always)]
pub fn extract_x888(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// 8-8-8-x to 8-8-8
#[inline(always)]
pub fn extract_888x(v: u32) -> (u8, u8, u8) {
    ((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8)
}

/// 8-8-8-8 split into bytes
#[inline(always)]
pub fn extract_8888(v: u32) -> (u8, u8, u8, u8) {
    ((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// 4-4-4-4 to 8-8-8-8
#[inline(always)]
pub fn extract_4444(v: u32) -> (u8, u8, u8, u8) {
    (
        (((v >> 8) & 0xf0) | ((v >> 12) & 0x0f)) as u8,
        (((v >> 4) & 0xf0) | ((v >> 8) & 0x0f)) as u8,
        ((v & 0xf0) | ((v >> 4) & 0x0f)) as u8,
        (((v << 4) & 0xf0) | (v & 0x0f)) as u8,
    )
}

/// 3-3-2 to 8-8-8
///
/// The blue expansion reproduces the hardware table, which ORs bits 0-1
/// into both the top and the bottom of the byte.
#[inline(always)]
pub fn extract_332(v: u32) -> (u8, u8, u8) {
    (
        ((v & 0xe0) | ((v >> 3) & 0x1c) | ((v >> 6) & 0x03)) as u8,
        (((v << 3) & 0xe0) | (v & 0x1c) | ((v >> 3) & 0x03)) as u8,
        (((v << 6) & 0xc0) | ((v << 4) & 0x30) | ((v << 2) & 0xc0) | (v & 0x03)) as u8,
    )
}
