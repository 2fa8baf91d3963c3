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

//! First walk of the scene graph: which accessors and textures are used.

use super::MeshError;
use khora_forge_core::asset::Semantic;
use std::collections::{BTreeMap, BTreeSet};

/// Nodes nested deeper than this are rejected instead of overflowing the stack.
pub const MAX_NODE_DEPTH: usize = 256;

/// The material texture a primitive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSlot {
    /// Base color.
    Albedo,
    /// Tangent-space normals.
    Normal,
    /// Metallic / roughness.
    MetallicRoughness,
    /// Emission.
    Emissive,
}

/// Union of every accessor and texture referenced by any primitive reachable
/// from a scene, partitioned by semantic and by texture slot.
///
/// Sets are ordered so that stream layout is deterministic for a given file.
#[derive(Debug, Default)]
pub struct SceneUsage {
    accessors: [BTreeSet<usize>; 8],
    textures: BTreeMap<TextureSlot, BTreeSet<usize>>,
}

impl SceneUsage {
    /// Walks every scene of the document once.
    pub fn collect(document: &gltf::Document) -> Result<Self, MeshError> {
        let mut usage = Self::default();
        for scene in document.scenes() {
            for node in scene.nodes() {
                usage.visit(&node, 0)?;
            }
        }
        Ok(usage)
    }

    /// Accessor indices used for `semantic`.
    pub fn accessors(&self, semantic: Semantic) -> &BTreeSet<usize> {
        &self.accessors[semantic.slot()]
    }

    /// Texture indices sampled through `slot`.
    pub fn textures(&self, slot: TextureSlot) -> impl Iterator<Item = usize> + '_ {
        self.textures.get(&slot).into_iter().flatten().copied()
    }

    /// Every texture index used by any slot.
    pub fn all_textures(&self) -> BTreeSet<usize> {
        self.textures.values().flatten().copied().collect()
    }

    fn visit(&mut self, node: &gltf::Node<'_>, depth: usize) -> Result<(), MeshError> {
        if depth >= MAX_NODE_DEPTH {
            return Err(MeshError::HierarchyTooDeep { node: node.index() });
        }

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                for (semantic, accessor) in primitive_accessors(&primitive) {
                    if let Some(index) = accessor {
                        self.accessors[semantic.slot()].insert(index);
                    }
                }
                for (slot, texture) in material_textures(&primitive.material()) {
                    if let Some(index) = texture {
                        self.textures.entry(slot).or_default().insert(index);
                    }
                }
            }
        }

        for child in node.children() {
            self.visit(&child, depth + 1)?;
        }
        Ok(())
    }
}

/// The accessor used by a primitive for each semantic; `None` when absent.
pub fn primitive_accessors(primitive: &gltf::Primitive<'_>) -> [(Semantic, Option<usize>); 8] {
    let attribute = |semantic: gltf::Semantic| primitive.get(&semantic).map(|a| a.index());
    [
        (Semantic::Position, attribute(gltf::Semantic::Positions)),
        (Semantic::Normal, attribute(gltf::Semantic::Normals)),
        (Semantic::Tangent, attribute(gltf::Semantic::Tangents)),
        (Semantic::Color, attribute(gltf::Semantic::Colors(0))),
        (Semantic::TexCoord, attribute(gltf::Semantic::TexCoords(0))),
        (Semantic::Joints, attribute(gltf::Semantic::Joints(0))),
        (Semantic::Weights, attribute(gltf::Semantic::Weights(0))),
        (Semantic::Index, primitive.indices().map(|a| a.index())),
    ]
}

/// The texture index bound to each slot of a material; `None` when absent.
pub fn material_textures(material: &gltf::Material<'_>) -> [(TextureSlot, Option<usize>); 4] {
    let pbr = material.pbr_metallic_roughness();
    [
        (
            TextureSlot::Albedo,
            pbr.base_color_texture().map(|info| info.texture().index()),
        ),
        (
            TextureSlot::Normal,
            material.normal_texture().map(|info| info.texture().index()),
        ),
        (
            TextureSlot::MetallicRoughness,
            pbr.metallic_roughness_texture().map(|info| info.texture().index()),
        ),
        (
            TextureSlot::Emissive,
            material.emissive_texture().map(|info| info.texture().index()),
        ),
    ]
}
