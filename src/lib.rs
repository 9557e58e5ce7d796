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

//! sstrx: a 3dfx Voodoo Graphics accelerator emulator core
//!
//! This crate emulates the SST-1 (Voodoo Graphics) and Voodoo 2 3D accelerators
//! at the register level. A host emulator maps the device's 16MB window into its
//! address space and forwards every access to [`core::Voodoo::write`] and
//! [`core::Voodoo::read`]; the device turns those accesses into triangles, fills
//! and direct pixel writes in its emulated video memory.
//!
//! # Architecture
//!
//! - [`core::voodoo`]: register file, triangle setup, scanline rasterizer,
//!   texture units and the raster worker pool
//! - [`core::memory`]: shared video memory blocks and the [`core::memory::IODevice`] trait
//! - [`core::error`]: error handling
//!
//! # Example
//!
//! ```no_run
//! use sstrx::core::{Voodoo, VoodooConfig};
//!
//! let mut voodoo = Voodoo::new(VoodooConfig::default())?;
//!
//! // Enable writes to the init registers, then issue a fast fill
//! voodoo.pci_write(0x40, 0x1);
//! voodoo.write(0x0000_0124, 0, 0xffff_ffff);
//! # Ok::<(), sstrx::core::error::EmulatorError>(())
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, EmulatorError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
