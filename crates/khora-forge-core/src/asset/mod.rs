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

//! Provides the shared vocabulary of the asset forge.
//!
//! Compilers produce [`CompiledAsset`] records keyed by an [`AssetHash`], the
//! stores persist them grouped by [`AssetKind`], and the engine reads the
//! per-kind metadata back to interpret the payload bytes. Nothing in here
//! knows how a source file is turned into a record.

mod hash;
mod kind;
mod mesh;
mod record;
mod shader;
mod texture;
mod wave;

pub use hash::*;
pub use kind::*;
pub use mesh::*;
pub use record::*;
pub use shader::*;
pub use texture::*;
pub use wave::*;
