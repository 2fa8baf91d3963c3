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

//! The record every compiler produces and every store persists.

use super::{AssetHash, AssetKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

/// Kind-specific data attached to a compiled asset.
///
/// Implementors describe how to interpret the record's payload bytes. The
/// associated [`AssetKind`] ties a metadata type to exactly one store.
pub trait AssetMetadata:
    Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The kind of asset this metadata describes.
    const KIND: AssetKind;
}

/// An engine-ready asset produced from one source file.
///
/// The `payload` is opaque to the stores; its layout is described by
/// `metadata`. A single source file may produce several records (one per
/// shader permutation), all sharing the same `source_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledAsset<M> {
    /// The stable key of this asset, `AssetHash::of(&name)`.
    pub hash: AssetHash,
    /// The human-readable lookup name.
    pub name: String,
    /// The forward-slash relative path of the source file.
    pub source_path: String,
    /// The compiled bytes.
    pub payload: Vec<u8>,
    /// Kind-specific description of `payload`.
    pub metadata: M,
}

impl<M: AssetMetadata> CompiledAsset<M> {
    /// Creates a record named after its source path.
    pub fn new(source_path: impl Into<String>, payload: Vec<u8>, metadata: M) -> Self {
        let source_path = source_path.into();
        Self::named(source_path.clone(), source_path, payload, metadata)
    }

    /// Creates a record with a name distinct from its source path.
    pub fn named(
        name: impl Into<String>,
        source_path: impl Into<String>,
        payload: Vec<u8>,
        metadata: M,
    ) -> Self {
        let name = name.into();
        Self {
            hash: AssetHash::of(&name),
            name,
            source_path: source_path.into(),
            payload,
            metadata,
        }
    }

    /// The kind of this record.
    pub fn kind(&self) -> AssetKind {
        M::KIND
    }
}
