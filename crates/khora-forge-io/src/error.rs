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

use khora_forge_core::asset::AssetKind;
use std::path::PathBuf;
use thiserror::Error;

/// An error that can occur while persisting the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be written.
    #[error("failed to write manifest '{}': {source}", path.display())]
    Io {
        /// The manifest file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// An error that can occur while loading or saving an asset store blob.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The blob could not be read or written.
    #[error("I/O error on store '{}': {source}", path.display())]
    Io {
        /// The blob file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The blob exists but does not decode.
    #[error("store '{}' is corrupt: {reason}", path.display())]
    Corrupt {
        /// The blob file.
        path: PathBuf,
        /// What failed to decode.
        reason: String,
    },
    /// The blob was written by an incompatible forge.
    #[error("store '{}' has unsupported format version {found}", path.display())]
    UnsupportedVersion {
        /// The blob file.
        path: PathBuf,
        /// The version found in the header.
        found: u16,
    },
    /// The blob holds another kind of asset.
    #[error("store '{}' holds kind tag {found}, expected {expected}", path.display())]
    KindMismatch {
        /// The blob file.
        path: PathBuf,
        /// The kind this store was opened for.
        expected: AssetKind,
        /// The kind tag found in the header.
        found: u16,
    },
    /// The records could not be encoded.
    #[error("failed to encode store '{}': {reason}", path.display())]
    Encode {
        /// The blob file.
        path: PathBuf,
        /// The encoder's message.
        reason: String,
    },
}

/// An error that can occur while loading `Assets.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        /// The config file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for the config schema.
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// `scan_interval_ms` is zero, which would scan in a busy loop.
    #[error("scan_interval_ms must be at least 1")]
    ZeroScanInterval,
}

/// Errors that stop the build loop.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`ManifestError`].
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// See [`StoreError`].
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The project root is missing or not a directory.
    #[error("project root '{}' is not a directory", path.display())]
    InvalidRoot {
        /// The path given.
        path: PathBuf,
    },
}
