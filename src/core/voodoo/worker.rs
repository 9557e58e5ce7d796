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

//! Raster worker pool
//!
//! A fixed set of long-lived threads that split one triangle between them.
//! Work is cut into `units` slices (four per participating thread); each
//! thread, including the caller, repeatedly claims the next free slice until
//! none are left.
//!
//! ```text
//!  caller                      workers (parked on `begin`)
//!  ──────                      ───────────────────────────
//!  publish job, next = 0  ──►  wake
//!  claim slice               claim slice
//!  ...                         ...
//!  wait on `done`        ◄──   last slice finished: notify
//!  take summed stats
//! ```
//!
//! Exactly one job is in flight at a time and [`WorkerPool::run`] returns
//! only after every slice has completed, so the caller may mutate device
//! state again as soon as it returns.

use super::stats::Stats;
use crate::core::error::{EmulatorError, Result};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Slices per participating thread
const UNITS_PER_THREAD: usize = 4;

/// Work executed for one slice index in `0..units`
pub type Job = Arc<dyn Fn(usize) -> Stats + Send + Sync>;

struct PoolState {
    job: Option<Job>,
    next: usize,
    completed: usize,
    stats: Stats,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    begin: Condvar,
    done: Condvar,
    units: usize,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the next unfinished slice of the current job
    fn claim(state: &mut PoolState, units: usize) -> Option<(Job, usize)> {
        let job = state.job.as_ref()?;
        if state.next >= units {
            return None;
        }
        let unit = state.next;
        state.next += 1;
        Some((Arc::clone(job), unit))
    }

    fn finish(&self, stats: Stats) {
        let mut state = self.lock();
        state.stats += stats;
        state.completed += 1;
        if state.completed >= self.units {
            self.done.notify_all();
        }
    }
}

/// Persistent raster threads plus the calling thread
pub struct WorkerPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `threads` worker threads
    ///
    /// With zero threads every job runs inline on the caller.
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if the OS refuses to create a thread. Threads
    /// already started are shut down before returning.
    pub fn new(threads: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                job: None,
                next: 0,
                completed: 0,
                stats: Stats::default(),
                shutdown: false,
            }),
            begin: Condvar::new(),
            done: Condvar::new(),
            units: (threads + 1) * UNITS_PER_THREAD,
        });

        let mut pool = Self {
            shared,
            threads: Vec::with_capacity(threads),
        };

        for index in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = std::thread::Builder::new()
                .name(format!("sstrx-raster-{index}"))
                .spawn(move || worker_loop(&shared))
                .map_err(|e| EmulatorError::WorkerSpawn(e.to_string()))?;
            pool.threads.push(handle);
        }

        log::debug!(
            "Raster pool started: {} worker thread(s), {} work units",
            threads,
            pool.shared.units
        );
        Ok(pool)
    }

    /// Number of slices a job is split into
    pub fn units(&self) -> usize {
        self.shared.units
    }

    /// Number of worker threads (not counting the caller)
    pub fn threads(&self) -> usize {
        self.threads.len()
    }

    /// Run `job` over every slice and return the summed statistics
    ///
    /// Blocks until all slices are done.
    pub fn run(&self, job: Job) -> Stats {
        let units = self.shared.units;

        if self.threads.is_empty() {
            return (0..units).fold(Stats::default(), |mut total, unit| {
                total += job(unit);
                total
            });
        }

        {
            let mut state = self.shared.lock();
            state.job = Some(job);
            state.next = 0;
            state.completed = 0;
            state.stats = Stats::default();
        }
        self.shared.begin.notify_all();

        // The caller works too
        loop {
            let claimed = Shared::claim(&mut self.shared.lock(), units);
            let Some((job, unit)) = claimed else {
                break;
            };
            let stats = job(unit);
            self.shared.finish(stats);
        }

        let mut state = self.shared.lock();
        while state.completed < units {
            state = self.shared.done.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        state.job = None;
        std::mem::take(&mut state.stats)
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let (job, unit) = {
            let mut state = shared.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(claimed) = Shared::claim(&mut state, shared.units) {
                    break claimed;
                }
                state = shared.begin.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        };

        let stats = job(unit);
        shared.finish(stats);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.begin.notify_all();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("Raster worker panicked during shutdown");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads.len())
            .field("units", &self.shared.units)
            .finish()
    }
}
