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

//! Stable 64-bit identity of a compiled asset.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// The separator placed between a source path and a shader permutation name.
pub const PERMUTATION_SEPARATOR: char = '|';

/// A stable identifier for a compiled asset.
///
/// The hash is derived from the asset's *name* (its forward-slash relative
/// source path, or `path|PERMUTATION` for shaders), never from the file's
/// content. Recompiling a modified file therefore keeps its identity, which is
/// what lets the engine hold on to a hash across rebuilds. Detecting that the
/// content changed is the manifest's job, not the hash's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetHash(u64);

impl AssetHash {
    /// Computes the hash of an asset name with XXH3.
    pub fn of(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()))
    }

    /// Computes the hash of one permutation of a source file.
    pub fn of_permutation(source_path: &str, permutation: &str) -> Self {
        Self::of(&permutation_name(source_path, permutation))
    }

    /// Wraps a raw hash value, e.g. one read back from a consumer's reference.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Builds the name under which a permutation of `source_path` is stored.
pub fn permutation_name(source_path: &str, permutation: &str) -> String {
    format!("{source_path}{PERMUTATION_SEPARATOR}{permutation}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_a_pure_function_of_the_name() {
        assert_eq!(AssetHash::of("textures/a.png"), AssetHash::of("textures/a.png"));
        assert_ne!(AssetHash::of("textures/a.png"), AssetHash::of("textures/b.png"));
    }

    #[test]
    fn permutation_hash_matches_joined_name() {
        assert_eq!(
            AssetHash::of_permutation("shaders/lit.fx", "SKINNED"),
            AssetHash::of("shaders/lit.fx|SKINNED")
        );
    }

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(AssetHash::from_raw(0xab).to_string(), "00000000000000ab");
    }
}
