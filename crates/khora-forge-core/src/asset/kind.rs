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

//! The closed set of asset kinds the forge knows how to compile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tag identifying which compiler and which store an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Block-compressed images with their mip chain.
    Texture,
    /// Flattened glTF scenes.
    Mesh,
    /// Multi-permutation, multi-target shader programs.
    Shader,
    /// Validated audio clips.
    Wave,
}

impl AssetKind {
    /// Every kind, in store order.
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Texture,
        AssetKind::Mesh,
        AssetKind::Shader,
        AssetKind::Wave,
    ];

    /// The lowercase name used in file names and on the command line.
    pub const fn name(&self) -> &'static str {
        match self {
            AssetKind::Texture => "texture",
            AssetKind::Mesh => "mesh",
            AssetKind::Shader => "shader",
            AssetKind::Wave => "wave",
        }
    }

    /// The numeric tag written into store blobs.
    pub const fn tag(&self) -> u16 {
        match self {
            AssetKind::Texture => 1,
            AssetKind::Mesh => 2,
            AssetKind::Shader => 3,
            AssetKind::Wave => 4,
        }
    }

    /// Resolves a numeric tag read from a store blob.
    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Parses a kind from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_names_round_trip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(AssetKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AssetKind::from_tag(0), None);
        assert_eq!(AssetKind::from_name("font"), None);
    }
}
