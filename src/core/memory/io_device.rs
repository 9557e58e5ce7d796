// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Memory-Mapped Device Trait
//!
//! The accelerator is reached through a single memory-mapped window that a
//! host bus relocates with PCI BAR0. This module defines the trait-based
//! abstraction the host uses to route accesses into that window without
//! knowing the device type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Host Bus                       │
//! ├─────────────────────────────────────────────┤
//! │  Devices: Vec<Box<dyn IODevice>>            │
//! │                                             │
//! │  read(addr) {                               │
//! │    for device in devices {                  │
//! │      if device.contains(addr) {             │
//! │        return device.read_register(offset)  │
//! │      }                                      │
//! │    }                                        │
//! │  }                                          │
//! └─────────────────────────────────────────────┘
//!           ▲
//!           │
//!    ┌──────┴──────┐
//!    │   Voodoo    │
//!    │ (IODevice)  │
//!    └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sstrx::core::memory::IODevice;
//! use sstrx::core::error::Result;
//!
//! struct Scratch {
//!     base_addr: u32,
//!     registers: [u32; 4],
//! }
//!
//! impl IODevice for Scratch {
//!     fn address_range(&self) -> (u32, u32) {
//!         (self.base_addr, self.base_addr + 0x0F)
//!     }
//!
//!     fn read_register(&mut self, offset: u32) -> Result<u32> {
//!         let index = (offset / 4) as usize;
//!         Ok(self.registers.get(index).copied().unwrap_or(0))
//!     }
//!
//!     fn write_register(&mut self, offset: u32, value: u32) -> Result<()> {
//!         let index = (offset / 4) as usize;
//!         if index < self.registers.len() {
//!             self.registers[index] = value;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::core::error::Result;

/// Trait for memory-mapped devices
///
/// Each device declares the address range it decodes and implements 32-bit
/// reads and writes relative to its base. Narrow accesses default to a
/// read-modify-write of the containing word; devices whose hardware supports
/// byte lanes natively (the accelerator's LFB does) override them.
///
/// Reads take `&mut self`: reading some device registers has side effects,
/// such as folding pending statistics into the visible counters.
pub trait IODevice {
    /// Get the address range this device responds to
    ///
    /// # Returns
    ///
    /// `(start, end)` - Start and end physical addresses (inclusive)
    fn address_range(&self) -> (u32, u32);

    /// Check if this device contains the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - Physical address to check
    fn contains(&self, addr: u32) -> bool {
        let (start, end) = self.address_range();
        addr >= start && addr <= end
    }

    /// Read a 32-bit value at `offset` from the device base
    ///
    /// # Errors
    ///
    /// Returns an error if the offset lies outside the device window
    fn read_register(&mut self, offset: u32) -> Result<u32>;

    /// Write a 32-bit value at `offset` from the device base
    ///
    /// # Errors
    ///
    /// Returns an error if the offset lies outside the device window
    fn write_register(&mut self, offset: u32, value: u32) -> Result<()>;

    /// Read a 16-bit value
    ///
    /// Default implementation reads the 32-bit word and extracts the half.
    fn read_register16(&mut self, offset: u32) -> Result<u16> {
        let value = self.read_register(offset & !0x03)?;
        let shift = (offset & 0x02) * 8;
        Ok(((value >> shift) & 0xFFFF) as u16)
    }

    /// Write a 16-bit value
    ///
    /// Default implementation performs read-modify-write on the aligned word.
    fn write_register16(&mut self, offset: u32, value: u16) -> Result<()> {
        let aligned = offset & !0x03;
        let shift = (offset & 0x02) * 8;
        let mask = !(0xFFFFu32 << shift);
        let current = self.read_register(aligned)?;
        let new_value = (current & mask) | ((value as u32) << shift);
        self.write_register(aligned, new_value)
    }

    /// Read an 8-bit value
    fn read_register8(&mut self, offset: u32) -> Result<u8> {
        let value = self.read_register(offset & !0x03)?;
        let shift = (offset & 0x03) * 8;
        Ok(((value >> shift) & 0xFF) as u8)
    }

    /// Write an 8-bit value
    ///
    /// Default implementation performs read-modify-write on the aligned word.
    fn write_register8(&mut self, offset: u32, value: u8) -> Result<()> {
        let aligned = offset & !0x03;
        let shift = (offset & 0x03) * 8;
        let mask = !(0xFFu32 << shift);
        let current = self.read_register(aligned)?;
        let new_value = (current & mask) | ((value as u32) << shift);
        self.write_register(aligned, new_value)
    }

    /// Device name for logging
    fn name(&self) -> &str {
        "Unknown Device"
    }
}
