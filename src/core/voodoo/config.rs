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

//! Device configuration
//!
//! Stored as TOML:
//!
//! ```toml
//! model = "voodoo1-dtmu"   # voodoo1 | voodoo1-dtmu | voodoo2
//! threads = "auto"         # or a number of raster threads, caller included
//! bilinear = true
//! ```
//!
//! Older files may carry `memsize = "4"` or `memsize = "12"` instead of
//! `model`; the alias is honored when `model` is absent.

use crate::core::error::{EmulatorError, Result};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MIN_THREADS: i64 = 1;
const MAX_AUTO_THREADS: usize = 16;
const MAX_THREADS: i64 = 128;

/// Emulated board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoodooModel {
    /// Voodoo Graphics, 2MB frame buffer and one 2MB TMU
    #[default]
    #[serde(rename = "voodoo1")]
    Voodoo1,
    /// Voodoo Graphics with two TMUs, 4MB each
    #[serde(rename = "voodoo1-dtmu")]
    Voodoo1Dtmu,
    /// Voodoo 2, 4MB frame buffer and two 4MB TMUs
    #[serde(rename = "voodoo2")]
    Voodoo2,
}

impl VoodooModel {
    /// Map the legacy `memsize` setting to a model
    pub fn from_memsize(memsize: &str) -> Option<Self> {
        match memsize.trim() {
            "4" => Some(VoodooModel::Voodoo1),
            "12" => Some(VoodooModel::Voodoo1Dtmu),
            _ => None,
        }
    }

    /// Frame buffer memory in bytes
    pub fn fb_memory(self) -> usize {
        match self {
            VoodooModel::Voodoo1 => 2 << 20,
            VoodooModel::Voodoo1Dtmu | VoodooModel::Voodoo2 => 4 << 20,
        }
    }

    /// Memory of each texture unit in bytes
    pub fn tmu_memory(self) -> usize {
        self.fb_memory()
    }

    pub fn has_second_tmu(self) -> bool {
        !matches!(self, VoodooModel::Voodoo1)
    }

    pub fn is_voodoo2(self) -> bool {
        matches!(self, VoodooModel::Voodoo2)
    }
}

impl FromStr for VoodooModel {
    type Err = EmulatorError;

    /// Parse the names used in configuration files
    fn from_str(name: &str) -> Result<Self> {
        match name.trim() {
            "voodoo1" => Ok(VoodooModel::Voodoo1),
            "voodoo1-dtmu" => Ok(VoodooModel::Voodoo1Dtmu),
            "voodoo2" => Ok(VoodooModel::Voodoo2),
            other => Err(EmulatorError::InvalidConfig(format!("unknown model '{}'", other))),
        }
    }
}

impl std::fmt::Display for VoodooModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VoodooModel::Voodoo1 => "Voodoo Graphics",
            VoodooModel::Voodoo1Dtmu => "Voodoo Graphics (dual TMU)",
            VoodooModel::Voodoo2 => "Voodoo 2",
        };
        f.write_str(name)
    }
}

/// Raster thread count: `"auto"` or an explicit number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadSetting {
    Count(i64),
    Named(String),
}

impl Default for ThreadSetting {
    fn default() -> Self {
        ThreadSetting::Named("auto".to_string())
    }
}

impl ThreadSetting {
    /// Total raster threads, calling thread included
    ///
    /// Numbers are clamped to 1..=128. `"auto"` uses the host CPU count
    /// clamped to 1..=16; any other string falls back to auto.
    pub fn total_threads(&self) -> usize {
        let named = match self {
            ThreadSetting::Count(count) => {
                let valid = (*count).clamp(MIN_THREADS, MAX_THREADS);
                if valid != *count {
                    log::warn!("threads = {} is out of range, using {}", count, valid);
                }
                return valid as usize;
            }
            ThreadSetting::Named(name) => name.trim(),
        };

        if let Ok(count) = named.parse::<i64>() {
            return ThreadSetting::Count(count).total_threads();
        }
        if !named.eq_ignore_ascii_case("auto") {
            log::warn!("Invalid threads setting '{}', using 'auto'", named);
        }

        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, MAX_AUTO_THREADS)
    }
}

/// Device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoodooConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<VoodooModel>,

    /// Legacy model alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memsize: Option<String>,

    pub threads: ThreadSetting,

    /// Allow bilinear texture filtering
    pub bilinear: bool,
}

impl Default for VoodooConfig {
    fn default() -> Self {
        Self {
            model: None,
            memsize: None,
            threads: ThreadSetting::default(),
            bilinear: true,
        }
    }
}

impl VoodooConfig {
    /// Configuration for a given model with default settings
    pub fn with_model(model: VoodooModel) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    /// Effective model after applying the `memsize` alias
    pub fn resolved_model(&self) -> VoodooModel {
        if let Some(model) = self.model {
            return model;
        }
        match self.memsize.as_deref() {
            Some(memsize) => VoodooModel::from_memsize(memsize).unwrap_or_else(|| {
                log::warn!("Invalid memsize '{}', using {}", memsize, VoodooModel::default());
                VoodooModel::default()
            }),
            None => VoodooModel::default(),
        }
    }

    /// Worker threads to spawn (the caller is the remaining raster thread)
    pub fn worker_threads(&self) -> usize {
        self.threads.total_threads() - 1
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read or `ConfigParse` if it is not
    /// valid TOML for this structure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigSerialize` or `Io` on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
