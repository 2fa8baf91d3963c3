// Copyright 2025 eraflo
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

//! The incremental build loop.
//!
//! Each cycle walks the project root, diffs it against the manifest,
//! recompiles what changed, evicts what vanished, then waits out the rest of
//! the cycle budget unless asked to stop.

use crate::manifest::MANIFEST_FILE;
use crate::{BuildContext, DispatchOutcome, Dispatcher, ForgeConfig, ForgeError, Manifest};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// What one scan cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Files found on disk.
    pub scanned: usize,
    /// Files seen for the first time.
    pub added: usize,
    /// Changed files that compiled.
    pub compiled: usize,
    /// Changed files whose compile failed.
    pub failed: usize,
    /// Changed files with no compiler.
    pub ignored: usize,
    /// Tracked files that disappeared.
    pub removed: usize,
}

impl CycleReport {
    /// Whether the cycle found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.added == 0
            && self.compiled == 0
            && self.failed == 0
            && self.ignored == 0
            && self.removed == 0
    }
}

/// Owns the build context, the manifest and the dispatcher of one project.
#[derive(Debug)]
pub struct Orchestrator {
    ctx: BuildContext,
    manifest: Manifest,
    dispatcher: Dispatcher,
    interval: Duration,
    cycles: u64,
}

impl Orchestrator {
    /// Opens `root` with the configuration found in its `Assets.toml`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ForgeError> {
        let root = root.into();
        let config = ForgeConfig::load(&root)?;
        Self::with_config(root, config)
    }

    /// Opens `root` with an explicit configuration.
    pub fn with_config(root: impl Into<PathBuf>, config: ForgeConfig) -> Result<Self, ForgeError> {
        let interval = config.pipeline.scan_interval();
        let ctx = BuildContext::open(root, config)?;
        let manifest = Manifest::load(ctx.root(), ctx.output_dir().join(MANIFEST_FILE));
        let dispatcher = Dispatcher::new(&ctx);
        Ok(Self {
            ctx,
            manifest,
            dispatcher,
            interval,
            cycles: 0,
        })
    }

    /// The stores and configuration.
    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// The timestamp manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Completed scan cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The minimum time between the starts of two cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one scan cycle.
    ///
    /// Compile failures are logged and counted; only a manifest write
    /// failure is returned as an error.
    pub fn scan_once(&mut self) -> Result<CycleReport, ForgeError> {
        let mut report = CycleReport::default();
        let files = scan_sources(self.ctx.root(), &self.ctx.output_dir());
        let mut unseen: HashSet<String> = self.manifest.paths().map(str::to_string).collect();

        for path in files {
            report.scanned += 1;
            if !self.manifest.has_file(&path) {
                self.manifest.add_file(&path)?;
                report.added += 1;
            }
            unseen.remove(&path);

            if !self.manifest.has_file_changed(&path) {
                continue;
            }
            match self.dispatcher.on_changed(&mut self.ctx, &path) {
                DispatchOutcome::Compiled { .. } => report.compiled += 1,
                DispatchOutcome::Failed { .. } => report.failed += 1,
                DispatchOutcome::Ignored => report.ignored += 1,
            }
            // Recorded even on failure: the file is retried once it changes again.
            self.manifest.update_timestamp(&path)?;
        }

        let mut vanished: Vec<String> = unseen.into_iter().collect();
        vanished.sort();
        for path in vanished {
            self.manifest.remove_file(&path)?;
            self.dispatcher.on_removed(&mut self.ctx, &path);
            report.removed += 1;
        }

        self.cycles += 1;
        if !report.is_idle() {
            log::info!(
                "Cycle {}: {} file(s), {} new, {} compiled, {} failed, {} ignored, {} removed",
                self.cycles,
                report.scanned,
                report.added,
                report.compiled,
                report.failed,
                report.ignored,
                report.removed
            );
        }
        Ok(report)
    }

    /// Scans repeatedly, at most once per interval, until `shutdown`
    /// receives a message or all its senders are dropped.
    ///
    /// Returns the number of cycles run.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> Result<u64, ForgeError> {
        log::info!(
            "Watching '{}' every {:?}",
            self.ctx.root().display(),
            self.interval
        );
        let first = self.cycles;
        loop {
            let started = Instant::now();
            self.scan_once()?;

            let remaining = self.interval.saturating_sub(started.elapsed());
            match shutdown.recv_timeout(remaining) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("Shutting down after {} cycle(s)", self.cycles - first);
        Ok(self.cycles - first)
    }
}

/// Lists the source files under `root` as sorted forward-slash relative
/// paths.
///
/// Hidden entries, extensionless files and `output_dir` are skipped.
pub fn scan_sources(root: &Path, output_dir: &Path) -> Vec<String> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || (!is_hidden(entry) && entry.path() != output_dir)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.path().extension().is_none() {
            continue;
        }
        match relative_path(root, entry.path()) {
            Some(path) => files.push(path),
            None => log::warn!("Skipping non UTF-8 path '{}'", entry.path().display()),
        }
    }
    files.sort();
    files
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
