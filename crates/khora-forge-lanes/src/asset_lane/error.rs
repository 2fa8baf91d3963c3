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

//! Defines the error returned by every compiler lane.

use std::path::PathBuf;
use thiserror::Error;

use super::audio::WaveError;
use super::mesh::MeshError;
use super::shader::ShaderError;
use super::texture::TextureError;

/// Why a source file could not be compiled.
///
/// A compile error is fatal to that file only; the caller logs it and moves on.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source (or a file it references) could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Texture decoding, mip generation or compression failed.
    #[error("texture: {0}")]
    Texture(#[from] TextureError),
    /// The glTF scene could not be flattened.
    #[error("mesh: {0}")]
    Mesh(#[from] MeshError),
    /// A shader stage failed to compile.
    #[error("shader: {0}")]
    Shader(#[from] ShaderError),
    /// The audio file could not be validated.
    #[error("wave: {0}")]
    Wave(#[from] WaveError),
}
