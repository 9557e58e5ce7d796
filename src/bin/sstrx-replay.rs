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

//! Register trace replay
//!
//! Feeds a JSON trace of bus accesses to an emulated board and reports the
//! pipeline statistics. Optionally writes the last presented frame as a PPM.
//!
//! ```json
//! [
//!   { "op": "pci_write", "reg": 64, "value": 1 },
//!   { "op": "write", "address": 292, "data": 0 },
//!   { "op": "read", "address": 0 },
//!   { "op": "vsync" }
//! ]
//! ```

use clap::Parser;
use serde::Deserialize;
use sstrx::core::voodoo::color::extract_565;
use sstrx::core::voodoo::FrameSink;
use sstrx::core::{Voodoo, VoodooConfig, VoodooModel};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sstrx-replay", version, about = "Replay a Voodoo register trace")]
struct Args {
    /// JSON trace file
    trace: PathBuf,

    /// TOML device configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Board to emulate: voodoo1, voodoo1-dtmu or voodoo2 (overrides the config)
    #[arg(long)]
    model: Option<VoodooModel>,

    /// Write the last presented frame to this PPM file
    #[arg(long)]
    ppm: Option<PathBuf>,

    /// Log every read result
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

/// One bus access
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum TraceOp {
    Write {
        address: u32,
        data: u32,
        #[serde(default = "full_mask")]
        mask: u32,
    },
    Read {
        address: u32,
    },
    PciWrite {
        reg: u8,
        value: u8,
    },
    Vsync,
}

fn full_mask() -> u32 {
    0xffff_ffff
}

fn load_trace(path: &Path) -> sstrx::Result<Vec<TraceOp>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Keeps the most recent frame as RGB565
#[derive(Default)]
struct FrameCapture {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
    frames: u32,
}

impl FrameSink for FrameCapture {
    fn begin_frame(&mut self, width: u32, height: u32) -> bool {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        true
    }

    fn draw_row(&mut self, row: &[u16]) {
        self.pixels.extend_from_slice(row);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

impl FrameCapture {
    fn write_ppm(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        for &pixel in &self.pixels {
            let (r, g, b) = extract_565(u32::from(pixel));
            out.write_all(&[r, g, b])?;
        }
        out.flush()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let mut config = match &args.config {
        Some(path) => VoodooConfig::load(path)?,
        None => VoodooConfig::default(),
    };
    if let Some(model) = args.model {
        config.model = Some(model);
    }
    log::info!("Emulating {}", config.resolved_model());

    let trace = load_trace(&args.trace)?;
    log::info!("Replaying {} operations from {}", trace.len(), args.trace.display());

    let mut voodoo = Voodoo::new(config)?;
    let mut capture = FrameCapture::default();

    for op in trace {
        match op {
            TraceOp::Write { address, data, mask } => voodoo.write(address, data, mask),
            TraceOp::Read { address } => {
                let value = voodoo.read(address);
                log::debug!("read {:#010x} -> {:#010x}", address, value);
            }
            TraceOp::PciWrite { reg, value } => voodoo.pci_write(reg, value),
            TraceOp::Vsync => voodoo.vertical_timer(&mut capture),
        }
    }

    let stats = voodoo.stats();
    println!("triangles:   {}", voodoo.triangles_out());
    println!("pixels in:   {}", stats.pixels_in);
    println!("pixels out:  {}", stats.pixels_out);
    println!("chroma fail: {}", stats.chroma_fail);
    println!("zfunc fail:  {}", stats.zfunc_fail);
    println!("afunc fail:  {}", stats.afunc_fail);
    println!("frames:      {}", capture.frames);

    if let Some(path) = &args.ppm {
        // present whatever is in the front buffer now
        voodoo.vertical_timer(&mut capture);
        if capture.pixels.is_empty() {
            log::warn!("No frame to write; video dimensions are not set");
        } else {
            capture.write_ppm(path)?;
            log::info!("Wrote {}x{} frame to {}", capture.width, capture.height, path.display());
        }
    }

    Ok(())
}
