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

//! Device window region identification
//!
//! The accelerator decodes a 16MB window. Bits 22-23 of the word offset select
//! the target of an access:
//!
//! | Window offset        | Region              |
//! |----------------------|---------------------|
//! | 0x000000-0x3FFFFF    | Registers           |
//! | 0x400000-0x7FFFFF    | Linear frame buffer |
//! | 0x800000-0xFFFFFF    | Texture memory      |

/// Region of the device window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Register space (including chip-select and alias bits)
    Register,
    /// Linear frame buffer
    LinearFrameBuffer,
    /// Texture memory (write-only)
    Texture,
}

impl MemoryRegion {
    /// Identify the region of a word offset (`(address >> 2) & 0x3fffff`)
    ///
    /// # Example
    ///
    /// ```
    /// use sstrx::core::memory::MemoryRegion;
    ///
    /// assert_eq!(MemoryRegion::identify(0x000049), MemoryRegion::Register);
    /// assert_eq!(MemoryRegion::identify(0x100000), MemoryRegion::LinearFrameBuffer);
    /// assert_eq!(MemoryRegion::identify(0x200000), MemoryRegion::Texture);
    /// ```
    pub fn identify(offset: u32) -> Self {
        if offset & 0x30_0000 == 0 {
            MemoryRegion::Register
        } else if offset & 0x20_0000 == 0 {
            MemoryRegion::LinearFrameBuffer
        } else {
            MemoryRegion::Texture
        }
    }

    /// Word offset of a byte address within the window
    #[inline(always)]
    pub fn word_offset(address: u32) -> u32 {
        (address >> 2) & 0x3f_ffff
    }
}
