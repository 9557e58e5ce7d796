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

//! Error types for the emulator core
//!
//! Almost nothing inside the device can fail: invalid register writes are
//! logged and dropped, and pixel pipeline failures only bump statistics.
//! The variants here cover the remaining cases:
//!
//! - Construction-time failures (memory allocation, worker threads)
//! - Configuration loading and saving
//! - Out-of-window accesses through the [`IODevice`](crate::core::memory::IODevice) trait

use thiserror::Error;

/// Errors produced by the emulator core
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Video memory could not be allocated
    #[error("failed to allocate {requested} bytes of video memory")]
    OutOfMemory {
        /// Requested size in bytes
        requested: usize,
    },

    /// A memory size that is not a non-zero power of two
    #[error("invalid memory size {size:#x}: must be a non-zero power of two")]
    InvalidMemorySize {
        /// Requested size in bytes
        size: usize,
    },

    /// Access outside the device window
    #[error("invalid memory access at {address:#010x}")]
    InvalidMemoryAccess {
        /// Faulting address
        address: u32,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Worker thread could not be spawned
    #[error("failed to spawn raster worker: {0}")]
    WorkerSpawn(String),

    /// I/O error while reading or writing a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Malformed register trace
    #[error("failed to parse trace: {0}")]
    Trace(#[from] serde_json::Error),
}

/// Result type used throughout the emulator core
pub type Result<T> = std::result::Result<T, EmulatorError>;
