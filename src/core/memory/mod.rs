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

//! Video memory blocks
//!
//! The frame buffer interface and every texture unit own one block of video
//! memory. Blocks are allocated once, never resized, and every access wraps
//! around the block size the way the hardware address decoder does.
//!
//! # Sharing Model
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  emulation thread    │      │  raster workers (N)  │
//! │  register writes,    │      │  disjoint pixel      │
//! │  LFB / texture pokes │      │  ranges per triangle │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │  clone (Arc)                │  clone (Arc)
//!            ▼                             ▼
//!      ┌──────────────────────────────────────────┐
//!      │  VideoMemory: [AtomicU16], byte mask     │
//!      └──────────────────────────────────────────┘
//! ```
//!
//! Cells are 16-bit atomics accessed with relaxed ordering. Raster workers
//! only ever touch disjoint pixels of a triangle, and the dispatcher joins
//! them before the emulation thread continues, so no stronger ordering is
//! required.
//!
//! # Example
//!
//! ```
//! use sstrx::core::memory::VideoMemory;
//!
//! let mem = VideoMemory::new(0x1000)?;
//! mem.write16(0x10, 0xf800);
//! assert_eq!(mem.read16(0x10), 0xf800);
//!
//! // Accesses wrap at the block size
//! assert_eq!(mem.read16(0x1010), 0xf800);
//! # Ok::<(), sstrx::core::error::EmulatorError>(())
//! ```

use crate::core::error::{EmulatorError, Result};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

// Sub-modules
mod io_device;
mod region;

// Re-export public types
pub use io_device::IODevice;
pub use region::MemoryRegion;

/// A shared, power-of-two sized block of emulated video memory
///
/// Addresses are byte addresses. Every accessor masks the address with
/// `size - 1`, so out-of-range accesses wrap instead of faulting.
/// Cloning a `VideoMemory` produces another handle to the same storage.
#[derive(Clone)]
pub struct VideoMemory {
    cells: Arc<[AtomicU16]>,
    mask: u32,
}

impl VideoMemory {
    /// Allocate a zero-filled block of `size` bytes
    ///
    /// # Arguments
    ///
    /// * `size` - Block size in bytes, a power of two of at least 2
    ///
    /// # Errors
    ///
    /// - `InvalidMemorySize` if `size` is not a power of two
    /// - `OutOfMemory` if the host allocation fails
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() || size > (1usize << 31) {
            return Err(EmulatorError::InvalidMemorySize { size });
        }

        let count = size / 2;
        let mut cells: Vec<AtomicU16> = Vec::new();
        cells
            .try_reserve_exact(count)
            .map_err(|_| EmulatorError::OutOfMemory { requested: size })?;
        cells.resize_with(count, || AtomicU16::new(0));

        Ok(Self {
            cells: Arc::from(cells),
            mask: (size - 1) as u32,
        })
    }

    /// Size of the block in bytes
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.cells.len() * 2
    }

    /// Byte address mask (`size - 1`)
    #[inline(always)]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    #[inline(always)]
    fn cell(&self, addr: u32) -> &AtomicU16 {
        &self.cells[((addr & self.mask) >> 1) as usize]
    }

    /// Read a byte
    #[inline(always)]
    pub fn read8(&self, addr: u32) -> u8 {
        let cell = self.cell(addr).load(Ordering::Relaxed);
        (cell >> ((addr & 1) * 8)) as u8
    }

    /// Write a byte
    ///
    /// Byte writes come only from the emulation thread (texture uploads),
    /// so the read-modify-write of the containing cell does not race.
    #[inline(always)]
    pub fn write8(&self, addr: u32, value: u8) {
        let cell = self.cell(addr);
        let shift = (addr & 1) * 8;
        let old = cell.load(Ordering::Relaxed);
        let new = (old & !(0xff << shift)) | ((value as u16) << shift);
        cell.store(new, Ordering::Relaxed);
    }

    /// Read a little-endian 16-bit value (the low address bit is ignored)
    #[inline(always)]
    pub fn read16(&self, addr: u32) -> u16 {
        self.cell(addr).load(Ordering::Relaxed)
    }

    /// Write a little-endian 16-bit value (the low address bit is ignored)
    #[inline(always)]
    pub fn write16(&self, addr: u32, value: u16) {
        self.cell(addr).store(value, Ordering::Relaxed);
    }

    /// Read a 16-bit pixel from a buffer starting at byte offset `base`
    #[inline(always)]
    pub fn pixel(&self, base: u32, index: u32) -> u16 {
        self.read16(base.wrapping_add(index.wrapping_mul(2)))
    }

    /// Write a 16-bit pixel into a buffer starting at byte offset `base`
    #[inline(always)]
    pub fn set_pixel(&self, base: u32, index: u32, value: u16) {
        self.write16(base.wrapping_add(index.wrapping_mul(2)), value);
    }

    /// Check whether two handles refer to the same storage
    pub fn same_block(&self, other: &VideoMemory) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells)
    }
}

impl std::fmt::Debug for VideoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoMemory")
            .field("size", &self.size())
            .finish()
    }
}
