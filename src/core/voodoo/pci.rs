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

//! PCI configuration space
//!
//! The card answers as vendor 0x121a (3dfx). Besides the standard header it
//! implements three device-specific registers:
//!
//! | Offset | Name         | Effect                                      |
//! |--------|--------------|---------------------------------------------|
//! | 0x40   | initEnable   | bit 0: init register writes, bit 2: DAC remap |
//! | 0xc0   | clock enable | any write starts the video clock            |
//! | 0xe0   | clock disable| any write stops the video clock             |
//!
//! The Voodoo 2 additionally exposes a free-running oscillator counter at
//! 0x54-0x57.

use super::modes::InitEnable;

/// 3dfx Interactive
pub const VENDOR_ID: u16 = 0x121a;

/// Default physical base of the 16MB memory window
pub const DEFAULT_WINDOW_BASE: u32 = 0xd000_0000;

/// Device side effect of a configuration write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciEvent {
    /// `initEnable` changed
    InitEnable(InitEnable),
    /// Video clock switched on or off
    Clock(bool),
}

/// Configuration space of the card
#[derive(Debug, Clone)]
pub struct PciConfig {
    regs: [u8; 256],
    is_v2: bool,
    oscillator_ctr: u16,
    pci_ctr: u16,
    window_base: u32,
    init_enable: InitEnable,
    clock_enabled: bool,
}

impl PciConfig {
    pub fn new(is_v2: bool) -> Self {
        let mut regs = [0u8; 256];

        regs[0x00..0x02].copy_from_slice(&VENDOR_ID.to_le_bytes());
        let device: u16 = if is_v2 { 2 } else { 1 };
        regs[0x02..0x04].copy_from_slice(&device.to_le_bytes());

        regs[0x04] = 0x02; // memory space enabled
        regs[0x06] = 0x80; // fast back-to-back
        regs[0x08] = 0x02; // revision
        regs[0x0b] = 0x04; // multimedia device
        regs[0x3c] = 0xff; // no irq

        // BAR0: prefetchable memory, anywhere in 32-bit space
        regs[0x10..0x14].copy_from_slice(&(DEFAULT_WINDOW_BASE | 0x08).to_le_bytes());

        if is_v2 {
            regs[0x41] = 0x40; // revision 4
            regs[0x42] = 0x01;
        }

        Self {
            regs,
            is_v2,
            oscillator_ctr: 0,
            pci_ctr: 0,
            window_base: DEFAULT_WINDOW_BASE,
            init_enable: InitEnable(0),
            clock_enabled: false,
        }
    }

    /// Current `initEnable` value
    pub fn init_enable(&self) -> InitEnable {
        self.init_enable
    }

    /// Whether the video clock is running
    pub fn clock_enabled(&self) -> bool {
        self.clock_enabled
    }

    /// Physical base of the memory window (BAR0)
    pub fn window_base(&self) -> u32 {
        self.window_base
    }

    fn oscillator(&self) -> u32 {
        u32::from(self.oscillator_ctr) | ((u32::from(self.pci_ctr) << 16) & 0x0fff_0000)
    }

    /// Read one configuration byte
    pub fn read(&mut self, reg: u8) -> u8 {
        match reg {
            0x4c..=0x4f => {
                log::debug!("PCI status read at {:#04x}", reg);
                self.regs[usize::from(reg)]
            }
            0x54..=0x57 if self.is_v2 => {
                if reg == 0x54 {
                    self.oscillator_ctr = self.oscillator_ctr.wrapping_add(1);
                    self.pci_ctr = self.pci_ctr.wrapping_sub(1);
                }
                let shift = u32::from(reg - 0x54) * 8;
                let value = (self.oscillator() >> shift) as u8;
                if reg == 0x57 {
                    value & 0x0f
                } else {
                    value
                }
            }
            _ => self.regs[usize::from(reg)],
        }
    }

    /// Write one configuration byte
    ///
    /// Header identification, the upper base address registers and the
    /// expansion ROM are read-only. The size bits of BAR0 are fixed so the
    /// window always decodes 16MB.
    pub fn write(&mut self, reg: u8, value: u8) -> Option<PciEvent> {
        let index = usize::from(reg);
        match reg {
            0x00..=0x03 | 0x06..=0x0b | 0x0e | 0x14..=0x27 | 0x30..=0x33 | 0x41..=0x43 => {
                log::trace!("PCI write to read-only register {:#04x} dropped", reg);
                None
            }
            0x10 => {
                self.regs[index] &= 0x0f;
                None
            }
            0x11 | 0x12 => {
                self.regs[index] = 0;
                None
            }
            0x13 => {
                self.window_base = (u32::from(value) << 24) & 0xffff_0000;
                self.regs[index] = value;
                log::debug!("Memory window moved to {:#010x}", self.window_base);
                None
            }
            0x40 => {
                self.init_enable = InitEnable(u32::from(value & 7));
                self.regs[index] = value;
                Some(PciEvent::InitEnable(self.init_enable))
            }
            0xc0 => {
                self.clock_enabled = true;
                Some(PciEvent::Clock(true))
            }
            0xe0 => {
                self.clock_enabled = false;
                Some(PciEvent::Clock(false))
            }
            _ => {
                self.regs[index] = value;
                None
            }
        }
    }
}
