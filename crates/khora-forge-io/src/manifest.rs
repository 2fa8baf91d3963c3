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

//! The timestamp manifest: which source files exist and when they were last
//! seen modified.
//!
//! Stored as text, one `<nanoseconds> <relative path>` record per line. Every
//! mutation rewrites the whole file through a sibling temporary file, so a
//! reader never observes a partial manifest.

use crate::ManifestError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Name of the manifest file inside the output directory.
pub const MANIFEST_FILE: &str = "timestamps";

/// One tracked source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileRecord {
    /// Forward-slash path relative to the project root.
    pub path: String,
    /// Last seen modification time, nanoseconds since the Unix epoch.
    /// Zero until the first timestamp update.
    pub last_modified: u64,
}

/// The ordered set of tracked source files of one project root.
#[derive(Debug)]
pub struct Manifest {
    root: PathBuf,
    file: PathBuf,
    records: Vec<SourceFileRecord>,
    index: HashMap<String, usize>,
    writes: u64,
}

impl Manifest {
    /// Creates an empty manifest for `root`, persisted at `file`.
    pub fn new(root: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file: file.into(),
            records: Vec::new(),
            index: HashMap::new(),
            writes: 0,
        }
    }

    /// Loads the manifest at `file`.
    ///
    /// A missing or unreadable file is logged and yields an empty manifest;
    /// the next scan then treats every file as new.
    pub fn load(root: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        let mut manifest = Self::new(root, file);
        match std::fs::read_to_string(&manifest.file) {
            Ok(text) => {
                for record in parse(&text) {
                    manifest.insert(record);
                }
                log::info!(
                    "Loaded {} manifest record(s) from '{}'",
                    manifest.records.len(),
                    manifest.file.display()
                );
            }
            Err(e) => log::error!(
                "Could not read manifest '{}': {}. Starting empty.",
                manifest.file.display(),
                e
            ),
        }
        manifest
    }

    /// Rewrites the whole file.
    pub fn save(&mut self) -> Result<(), ManifestError> {
        let mut text = String::new();
        for record in &self.records {
            text.push_str(&format!("{} {}\n", record.last_modified, record.path));
        }
        write_atomic(&self.file, text.as_bytes()).map_err(|source| ManifestError::Io {
            path: self.file.clone(),
            source,
        })?;
        self.writes += 1;
        Ok(())
    }

    /// Whether `path` is tracked.
    pub fn has_file(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Starts tracking `path` with a zero timestamp and persists.
    /// Does nothing if it is already tracked.
    pub fn add_file(&mut self, path: &str) -> Result<(), ManifestError> {
        if self.has_file(path) {
            return Ok(());
        }
        self.insert(SourceFileRecord {
            path: path.to_string(),
            last_modified: 0,
        });
        self.save()
    }

    /// Stops tracking `path` and persists. Returns whether it was tracked.
    pub fn remove_file(&mut self, path: &str) -> Result<bool, ManifestError> {
        let Some(position) = self.index.remove(path) else {
            return Ok(false);
        };
        self.records.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.save()?;
        Ok(true)
    }

    /// Whether the file's modification time differs from the recorded one.
    ///
    /// Untracked paths and files whose time cannot be read count as changed.
    pub fn has_file_changed(&self, path: &str) -> bool {
        match (self.timestamp(path), modified_nanos(&self.root.join(path))) {
            (Some(stored), Some(live)) => stored != live,
            _ => true,
        }
    }

    /// Records the file's current modification time, persisting only if it
    /// differs. Returns whether anything was written.
    pub fn update_timestamp(&mut self, path: &str) -> Result<bool, ManifestError> {
        let Some(&position) = self.index.get(path) else {
            return Ok(false);
        };
        let Some(live) = modified_nanos(&self.root.join(path)) else {
            return Ok(false);
        };
        let record = &mut self.records[position];
        if record.last_modified == live {
            return Ok(false);
        }
        record.last_modified = live;
        self.save()?;
        Ok(true)
    }

    /// The recorded timestamp of `path`.
    pub fn timestamp(&self, path: &str) -> Option<u64> {
        self.index.get(path).map(|&i| self.records[i].last_modified)
    }

    /// Every record, in insertion order.
    pub fn records(&self) -> &[SourceFileRecord] {
        &self.records
    }

    /// Tracked paths, in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.path.as_str())
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many times the file has been rewritten by this instance.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// The manifest file location.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn insert(&mut self, record: SourceFileRecord) {
        match self.index.get(&record.path) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.path.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

/// Parses manifest text. Lines are split on the first space; malformed lines
/// are logged and skipped.
pub fn parse(text: &str) -> Vec<SourceFileRecord> {
    let mut records = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let parsed = line
            .split_once(' ')
            .filter(|(_, path)| !path.is_empty())
            .and_then(|(stamp, path)| Some((stamp.parse::<u64>().ok()?, path)));
        match parsed {
            Some((last_modified, path)) => records.push(SourceFileRecord {
                path: path.to_string(),
                last_modified,
            }),
            None => log::warn!("Skipping malformed manifest line {}: '{}'", number + 1, line),
        }
    }
    records
}

/// Modification time of `path` in nanoseconds since the Unix epoch.
pub fn modified_nanos(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since_epoch.as_nanos()).ok()
}

/// Writes `bytes` to a sibling temporary file, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
