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

//! Routing of changed and removed source files to their compiler lane and
//! store.

use crate::{AssetStore, BuildContext};
use khora_forge_core::asset::{AssetKind, AssetMetadata};
use khora_forge_lanes::asset_lane::{
    audio::WaveCompilerLane, mesh::MeshCompilerLane, shader::ShaderCompilerLane,
    texture::TextureCompilerLane, AssetCompilerLane, SourceFile,
};
use std::time::Instant;

/// Lowercase file extension → asset kind.
pub const EXTENSION_TABLE: &[(&str, AssetKind)] = &[
    ("png", AssetKind::Texture),
    ("jpg", AssetKind::Texture),
    ("jpeg", AssetKind::Texture),
    ("hdr", AssetKind::Texture),
    ("wav", AssetKind::Wave),
    ("ogg", AssetKind::Wave),
    ("flac", AssetKind::Wave),
    ("mp3", AssetKind::Wave),
    ("glb", AssetKind::Mesh),
    ("gltf", AssetKind::Mesh),
    ("fx", AssetKind::Shader),
];

/// Looks up the kind of an extension, case-insensitively.
pub fn kind_for_extension(extension: &str) -> Option<AssetKind> {
    let extension = extension.to_ascii_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, kind)| *kind)
}

/// Looks up the kind of a relative path from its last extension.
pub fn kind_for_path(path: &str) -> Option<AssetKind> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, extension) = name.rsplit_once('.')?;
    kind_for_extension(extension)
}

/// What happened to a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The file compiled and its records replaced the previous ones.
    Compiled {
        /// The store that received the records.
        kind: AssetKind,
        /// Number of records produced.
        assets: usize,
    },
    /// The compile failed; the store was left untouched.
    Failed {
        /// The kind the file was routed to.
        kind: AssetKind,
    },
    /// The extension is not handled by any lane.
    Ignored,
}

/// Owns one lane per kind and routes files to them.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    textures: TextureCompilerLane,
    meshes: MeshCompilerLane,
    shaders: ShaderCompilerLane,
    waves: WaveCompilerLane,
}

impl Dispatcher {
    /// Creates the lanes from the context's configuration.
    pub fn new(ctx: &BuildContext) -> Self {
        Self {
            textures: TextureCompilerLane::new(ctx.config.texture.clone()),
            meshes: MeshCompilerLane::new(),
            shaders: ShaderCompilerLane::new(),
            waves: WaveCompilerLane::new(),
        }
    }

    /// Recompiles `path` and, on success, replaces its records and saves
    /// the store.
    pub fn on_changed(&self, ctx: &mut BuildContext, path: &str) -> DispatchOutcome {
        let Some(kind) = kind_for_path(path) else {
            log::warn!("No compiler for '{}', tracking only", path);
            return DispatchOutcome::Ignored;
        };
        let source = SourceFile::new(ctx.root(), path);
        match kind {
            AssetKind::Texture => rebuild(&self.textures, &mut ctx.textures, &source),
            AssetKind::Mesh => rebuild(&self.meshes, &mut ctx.meshes, &source),
            AssetKind::Shader => rebuild(&self.shaders, &mut ctx.shaders, &source),
            AssetKind::Wave => rebuild(&self.waves, &mut ctx.waves, &source),
        }
    }

    /// Evicts every record produced from `path` and saves the store.
    /// Returns the number of records removed.
    pub fn on_removed(&self, ctx: &mut BuildContext, path: &str) -> usize {
        match kind_for_path(path) {
            Some(AssetKind::Texture) => evict(&mut ctx.textures, path),
            Some(AssetKind::Mesh) => evict(&mut ctx.meshes, path),
            Some(AssetKind::Shader) => evict(&mut ctx.shaders, path),
            Some(AssetKind::Wave) => evict(&mut ctx.waves, path),
            None => 0,
        }
    }
}

fn rebuild<L: AssetCompilerLane>(
    lane: &L,
    store: &mut AssetStore<L::Metadata>,
    source: &SourceFile,
) -> DispatchOutcome {
    let kind = L::Metadata::KIND;
    log::debug!("[{}] compiling '{}'", lane.strategy_name(), source.relative());
    let started = Instant::now();

    let assets = match lane.compile(source) {
        Ok(assets) => assets,
        Err(e) => {
            log::error!("Failed to compile '{}': {}", source.relative(), e);
            return DispatchOutcome::Failed { kind };
        }
    };

    let count = assets.len();
    store.replace_source(source.relative(), assets);
    log::info!(
        "Compiled '{}' into {} {} asset(s) in {:.1?}",
        source.relative(),
        count,
        kind,
        started.elapsed()
    );
    if let Err(e) = store.save() {
        log::error!("{}", e);
    }
    DispatchOutcome::Compiled {
        kind,
        assets: count,
    }
}

fn evict<M: AssetMetadata>(store: &mut AssetStore<M>, path: &str) -> usize {
    let removed = store.remove_source(path);
    if removed.is_empty() {
        return 0;
    }
    log::info!("Evicted {} {} asset(s) of '{}'", removed.len(), M::KIND, path);
    if let Err(e) = store.save() {
        log::error!("{}", e);
    }
    removed.len()
}
