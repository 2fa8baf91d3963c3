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

//! A generic, hash-indexed store of compiled assets, persisted as one blob.

use crate::manifest::write_atomic;
use crate::StoreError;
use khora_forge_core::asset::{AssetHash, AssetMetadata, CompiledAsset};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Magic bytes opening every store blob.
pub const STORE_MAGIC: [u8; 4] = *b"KFAS";
/// Current blob format version.
pub const STORE_VERSION: u16 = 1;
const HEADER_LEN: usize = 8;

/// The compiled assets of one kind `M`.
///
/// This structure maps an [`AssetHash`] to its record, and keeps a name
/// index so assets can be looked up by their human-readable name. Records
/// are grouped by source path for eviction: removing a source removes every
/// record it produced.
#[derive(Debug)]
pub struct AssetStore<M: AssetMetadata> {
    path: PathBuf,
    assets: HashMap<AssetHash, CompiledAsset<M>>,
    names: HashMap<String, AssetHash>,
}

impl<M: AssetMetadata> AssetStore<M> {
    /// Creates an empty store persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            assets: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// The blob file name of this kind inside `output_dir`.
    pub fn blob_path(output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.assets", M::KIND.name()))
    }

    /// Opens the store blob at `path`.
    ///
    /// A missing blob gives an empty store. A blob that exists but does not
    /// decode is an error: silently dropping it would lose every compiled
    /// asset of the kind.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        let bytes = match std::fs::read(&store.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(source) => {
                return Err(StoreError::Io {
                    path: store.path,
                    source,
                })
            }
        };
        for asset in store.decode(&bytes)? {
            store.add(asset);
        }
        log::info!(
            "Loaded {} {} asset(s) from '{}'",
            store.len(),
            M::KIND,
            store.path.display()
        );
        Ok(store)
    }

    /// Inserts a record, replacing any record with the same hash.
    pub fn add(&mut self, asset: CompiledAsset<M>) -> Option<CompiledAsset<M>> {
        let previous = self.remove(asset.hash);
        self.names.insert(asset.name.clone(), asset.hash);
        self.assets.insert(asset.hash, asset);
        previous
    }

    /// Removes the record with `hash`.
    pub fn remove(&mut self, hash: AssetHash) -> Option<CompiledAsset<M>> {
        let asset = self.assets.remove(&hash)?;
        if self.names.get(&asset.name) == Some(&hash) {
            self.names.remove(&asset.name);
        }
        Some(asset)
    }

    /// Removes every record produced from `source_path`.
    pub fn remove_source(&mut self, source_path: &str) -> Vec<CompiledAsset<M>> {
        let hashes: Vec<AssetHash> = self
            .assets
            .values()
            .filter(|a| a.source_path == source_path)
            .map(|a| a.hash)
            .collect();
        hashes.into_iter().filter_map(|h| self.remove(h)).collect()
    }

    /// Replaces every record of `source_path` by `assets`.
    pub fn replace_source(&mut self, source_path: &str, assets: Vec<CompiledAsset<M>>) {
        self.remove_source(source_path);
        for asset in assets {
            self.add(asset);
        }
    }

    /// Gets a record by hash.
    pub fn get(&self, hash: AssetHash) -> Option<&CompiledAsset<M>> {
        self.assets.get(&hash)
    }

    /// Gets a record by name.
    pub fn get_by_name(&self, name: &str) -> Option<&CompiledAsset<M>> {
        self.names.get(name).and_then(|h| self.assets.get(h))
    }

    /// Whether a record with `hash` exists.
    pub fn contains(&self, hash: AssetHash) -> bool {
        self.assets.contains_key(&hash)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Records sorted by name.
    pub fn sorted(&self) -> Vec<&CompiledAsset<M>> {
        let mut assets: Vec<_> = self.assets.values().collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        assets
    }

    /// The blob location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every record to the blob.
    pub fn save(&self) -> Result<(), StoreError> {
        let bytes = self.encode()?;
        write_atomic(&self.path, &bytes).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let records = self.sorted();
        let body = bincode::serde::encode_to_vec(&records, bincode::config::standard())
            .map_err(|e| StoreError::Encode {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&STORE_MAGIC);
        bytes.extend_from_slice(&STORE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&M::KIND.tag().to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<CompiledAsset<M>>, StoreError> {
        let corrupt = |reason: &str| StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        };
        if bytes.len() < HEADER_LEN {
            return Err(corrupt("truncated header"));
        }
        if bytes[..4] != STORE_MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: version,
            });
        }
        let tag = u16::from_le_bytes([bytes[6], bytes[7]]);
        if tag != M::KIND.tag() {
            return Err(StoreError::KindMismatch {
                path: self.path.clone(),
                expected: M::KIND,
                found: tag,
            });
        }

        let (records, read): (Vec<CompiledAsset<M>>, usize) =
            bincode::serde::decode_from_slice(&bytes[HEADER_LEN..], bincode::config::standard())
                .map_err(|e| corrupt(&e.to_string()))?;
        if HEADER_LEN + read != bytes.len() {
            return Err(corrupt("trailing bytes"));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khora_forge_core::asset::{ShaderMetadata, WaveMetadata};

    fn clip(path: &str, duration: f64) -> CompiledAsset<WaveMetadata> {
        CompiledAsset::new(
            path,
            vec![1, 2, 3],
            WaveMetadata {
                duration,
                sample_rate: 44100,
                channels: 1,
                frames: (duration * 44100.0) as u64,
            },
        )
    }

    fn permutation(path: &str, name: &str) -> CompiledAsset<ShaderMetadata> {
        CompiledAsset::named(
            format!("{path}|{name}"),
            path,
            Vec::new(),
            ShaderMetadata {
                permutation: name.to_string(),
                bytecode: Vec::new(),
                resources: Vec::new(),
            },
        )
    }

    #[test]
    fn add_get_remove() {
        let mut store = AssetStore::new("unused");
        assert!(store.add(clip("a.wav", 1.0)).is_none());
        let replaced = store.add(clip("a.wav", 2.0)).unwrap();
        assert_eq!(replaced.metadata.duration, 1.0);
        assert_eq!(store.len(), 1);

        let hash = AssetHash::of("a.wav");
        assert_eq!(store.get(hash).unwrap().metadata.duration, 2.0);
        assert_eq!(store.get_by_name("a.wav").unwrap().hash, hash);
        assert!(store.remove(hash).is_some());
        assert!(store.get_by_name("a.wav").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn removing_a_source_drops_all_its_permutations() {
        let mut store = AssetStore::new("unused");
        store.add(permutation("lit.fx", "DEFAULT"));
        store.add(permutation("lit.fx", "SKINNED"));
        store.add(permutation("sky.fx", "DEFAULT"));

        assert_eq!(store.remove_source("lit.fx").len(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get_by_name("sky.fx|DEFAULT").is_some());
    }

    #[test]
    fn save_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = AssetStore::<WaveMetadata>::blob_path(dir.path());
        assert!(path.ends_with("wave.assets"));

        let mut store = AssetStore::new(&path);
        store.add(clip("a.wav", 0.5));
        store.add(clip("b/c.wav", 0.25));
        store.save().unwrap();

        let reopened = AssetStore::<WaveMetadata>::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get_by_name("b/c.wav"), store.get_by_name("b/c.wav"));
    }

    #[test]
    fn missing_blob_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::<WaveMetadata>::open(dir.path().join("wave.assets")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_blobs_are_typed_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.assets");

        std::fs::write(&path, b"nope").unwrap();
        assert!(matches!(
            AssetStore::<WaveMetadata>::open(&path),
            Err(StoreError::Corrupt { .. })
        ));

        let mut header = STORE_MAGIC.to_vec();
        header.extend_from_slice(&STORE_VERSION.to_le_bytes());
        header.extend_from_slice(&1u16.to_le_bytes());
        std::fs::write(&path, &header).unwrap();
        assert!(matches!(
            AssetStore::<WaveMetadata>::open(&path),
            Err(StoreError::KindMismatch { found: 1, .. })
        ));

        let mut garbage = STORE_MAGIC.to_vec();
        garbage.extend_from_slice(&STORE_VERSION.to_le_bytes());
        garbage.extend_from_slice(&4u16.to_le_bytes());
        garbage.extend_from_slice(&[0xff; 16]);
        std::fs::write(&path, &garbage).unwrap();
        assert!(matches!(
            AssetStore::<WaveMetadata>::open(&path),
            Err(StoreError::Corrupt { .. })
        ));

        let mut future = STORE_MAGIC.to_vec();
        future.extend_from_slice(&99u16.to_le_bytes());
        future.extend_from_slice(&4u16.to_le_bytes());
        std::fs::write(&path, &future).unwrap();
        assert!(matches!(
            AssetStore::<WaveMetadata>::open(&path),
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
