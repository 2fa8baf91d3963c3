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

//! The explicit state shared by the dispatcher and the build loop.

use crate::{AssetStore, ForgeConfig, ForgeError, StoreError};
use khora_forge_core::asset::{
    AssetKind, AssetMetadata, MeshMetadata, ShaderMetadata, TextureMetadata, WaveMetadata,
};
use std::path::{Path, PathBuf};

/// One asset store per kind, plus the configuration and project root they
/// belong to.
///
/// Several contexts can coexist in one process (one per project root).
#[derive(Debug)]
pub struct BuildContext {
    /// The loaded configuration.
    pub config: ForgeConfig,
    root: PathBuf,
    /// Compiled textures.
    pub textures: AssetStore<TextureMetadata>,
    /// Compiled meshes.
    pub meshes: AssetStore<MeshMetadata>,
    /// Compiled shader permutations.
    pub shaders: AssetStore<ShaderMetadata>,
    /// Validated audio clips.
    pub waves: AssetStore<WaveMetadata>,
}

impl BuildContext {
    /// Opens the stores of `root` under the configured output directory.
    ///
    /// Fails if the root is not a directory or if any existing store blob is
    /// unreadable.
    pub fn open(root: impl Into<PathBuf>, config: ForgeConfig) -> Result<Self, ForgeError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ForgeError::InvalidRoot { path: root });
        }
        config.pipeline.validate()?;
        let output_dir = root.join(&config.pipeline.output_dir);
        Ok(Self {
            textures: open_store(&output_dir)?,
            meshes: open_store(&output_dir)?,
            shaders: open_store(&output_dir)?,
            waves: open_store(&output_dir)?,
            config,
            root,
        })
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory receiving the manifest and store blobs.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.pipeline.output_dir)
    }

    /// Number of records in the store of `kind`.
    pub fn count(&self, kind: AssetKind) -> usize {
        match kind {
            AssetKind::Texture => self.textures.len(),
            AssetKind::Mesh => self.meshes.len(),
            AssetKind::Shader => self.shaders.len(),
            AssetKind::Wave => self.waves.len(),
        }
    }

    /// `(hash, name, payload size)` of every record of `kind`, sorted by name.
    pub fn listing(&self, kind: AssetKind) -> Vec<(String, String, usize)> {
        fn rows<M: AssetMetadata>(store: &AssetStore<M>) -> Vec<(String, String, usize)> {
            store
                .sorted()
                .into_iter()
                .map(|a| (a.hash.to_string(), a.name.clone(), a.payload.len()))
                .collect()
        }
        match kind {
            AssetKind::Texture => rows(&self.textures),
            AssetKind::Mesh => rows(&self.meshes),
            AssetKind::Shader => rows(&self.shaders),
            AssetKind::Wave => rows(&self.waves),
        }
    }
}

fn open_store<M: AssetMetadata>(output_dir: &Path) -> Result<AssetStore<M>, StoreError> {
    AssetStore::open(AssetStore::<M>::blob_path(output_dir))
}
