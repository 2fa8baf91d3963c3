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

use khora_forge_core::asset::{AssetMetadata, CompiledAsset};
use std::path::{Path, PathBuf};

use super::CompileError;

/// A source file inside a project, addressed by its forward-slash relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    root: PathBuf,
    relative: String,
}

impl SourceFile {
    /// Creates a handle for `relative` (forward slashes) under `root`.
    pub fn new(root: impl AsRef<Path>, relative: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            relative: relative.into(),
        }
    }

    /// The project-relative path, which is also the asset name.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// The project root the path is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file's location on disk.
    pub fn absolute(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    /// The file name without directories or its last extension.
    pub fn stem(&self) -> &str {
        let name = self.relative.rsplit('/').next().unwrap_or(&self.relative);
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// The relative directory containing the file, empty at the root.
    pub fn relative_dir(&self) -> &str {
        self.relative.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Joins a path relative to this file's directory into a project-relative path.
    pub fn sibling(&self, name: &str) -> String {
        match self.relative_dir() {
            "" => name.to_string(),
            dir => format!("{dir}/{name}"),
        }
    }

    /// Reads the whole file.
    pub fn read(&self) -> Result<Vec<u8>, CompileError> {
        let path = self.absolute();
        std::fs::read(&path).map_err(|source| CompileError::Io { path, source })
    }
}

/// A lane that compiles one kind of source asset.
///
/// This represents the "Data Plane" of the forge: the potentially
/// CPU-intensive work of decoding a source file and re-encoding it into an
/// engine-ready payload. A lane is pure with respect to the stores; the only
/// side effects allowed are files it explicitly documents (mesh texture
/// export).
pub trait AssetCompilerLane: Send + Sync {
    /// The metadata type of the records this lane produces.
    type Metadata: AssetMetadata;

    /// A short name used in logs.
    fn strategy_name(&self) -> &'static str;

    /// Compiles one source file into one or more records.
    ///
    /// Every record returned shares `source.relative()` as its source path.
    /// On error no record is produced.
    fn compile(
        &self,
        source: &SourceFile,
    ) -> Result<Vec<CompiledAsset<Self::Metadata>>, CompileError>;
}
