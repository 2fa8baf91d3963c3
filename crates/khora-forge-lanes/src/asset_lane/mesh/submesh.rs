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

//! Second walk of the scene graph: the flattened sub-mesh tree.

use super::{material_textures, primitive_accessors, MeshError, StreamSet, TextureSlot, MAX_NODE_DEPTH};
use khora_forge_core::asset::{
    Aabb, MaterialTextures, PrimitiveTopology, SegmentRefs, SubMesh, SubMeshKind,
};
use khora_forge_core::math::Transform;
use std::collections::HashMap;

/// Builds the sub-mesh list of every scene in the document.
///
/// Each node produces a [`SubMeshKind::Node`] entry followed by one
/// [`SubMeshKind::Primitive`] entry per primitive of its mesh, then its
/// children. Parents therefore always precede their children.
pub fn build_submeshes(
    document: &gltf::Document,
    streams: &StreamSet,
    texture_paths: &HashMap<usize, String>,
) -> Result<Vec<SubMesh>, MeshError> {
    let mut builder = SubMeshBuilder {
        streams,
        texture_paths,
        out: Vec::new(),
    };
    for scene in document.scenes() {
        for node in scene.nodes() {
            builder.visit(&node, None, 0)?;
        }
    }
    Ok(builder.out)
}

struct SubMeshBuilder<'a> {
    streams: &'a StreamSet,
    texture_paths: &'a HashMap<usize, String>,
    out: Vec<SubMesh>,
}

impl SubMeshBuilder<'_> {
    fn visit(
        &mut self,
        node: &gltf::Node<'_>,
        parent: Option<u32>,
        depth: usize,
    ) -> Result<(), MeshError> {
        if depth >= MAX_NODE_DEPTH {
            return Err(MeshError::HierarchyTooDeep { node: node.index() });
        }

        let index = self.out.len() as u32;
        self.out.push(SubMesh {
            name: node.name().map(str::to_string),
            kind: SubMeshKind::Node,
            parent,
            transform: node_transform(node.transform()),
            segments: SegmentRefs::default(),
            material: MaterialTextures::default(),
            bounds: None,
            topology: PrimitiveTopology::default(),
        });

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                let entry = self.primitive(&mesh, &primitive, index)?;
                self.out.push(entry);
            }
        }

        for child in node.children() {
            self.visit(&child, Some(index), depth + 1)?;
        }
        Ok(())
    }

    fn primitive(
        &self,
        mesh: &gltf::Mesh<'_>,
        primitive: &gltf::Primitive<'_>,
        parent: u32,
    ) -> Result<SubMesh, MeshError> {
        let location = (mesh.index(), primitive.index());
        let positions = primitive
            .get(&gltf::Semantic::Positions)
            .ok_or(MeshError::MissingPositions {
                mesh: location.0,
                primitive: location.1,
            })?;
        if primitive.indices().is_none() {
            return Err(MeshError::MissingIndices {
                mesh: location.0,
                primitive: location.1,
            });
        }
        let bounds = accessor_bounds(&positions).ok_or(MeshError::MissingBounds {
            mesh: location.0,
            primitive: location.1,
        })?;

        let mut segments = SegmentRefs::default();
        for (semantic, accessor) in primitive_accessors(primitive) {
            segments.set(
                semantic,
                accessor.and_then(|a| self.streams.segment_of(semantic, a)),
            );
        }

        let mut material = MaterialTextures::default();
        for (slot, texture) in material_textures(&primitive.material()) {
            let path = texture.and_then(|t| self.texture_paths.get(&t).cloned());
            match slot {
                TextureSlot::Albedo => material.albedo = path,
                TextureSlot::Normal => material.normal = path,
                TextureSlot::MetallicRoughness => material.metallic_roughness = path,
                TextureSlot::Emissive => material.emissive = path,
            }
        }

        Ok(SubMesh {
            name: mesh.name().map(str::to_string),
            kind: SubMeshKind::Primitive,
            parent: Some(parent),
            transform: Transform::IDENTITY,
            segments,
            material,
            bounds: Some(bounds),
            topology: map_primitive_type(primitive.mode()),
        })
    }
}

fn node_transform(transform: gltf::scene::Transform) -> Transform {
    match transform {
        gltf::scene::Transform::Matrix { matrix } => Transform::from_matrix(&matrix),
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Transform {
            translation,
            rotation,
            scale,
        },
    }
}

/// Reads the declared min/max of a position accessor.
fn accessor_bounds(accessor: &gltf::Accessor<'_>) -> Option<Aabb> {
    let min = vec3(&accessor.min()?)?;
    let max = vec3(&accessor.max()?)?;
    Some(Aabb { min, max })
}

fn vec3(value: &gltf::json::Value) -> Option<[f32; 3]> {
    let array = value.as_array()?;
    if array.len() < 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (dst, src) in out.iter_mut().zip(array) {
        *dst = src.as_f64()? as f32;
    }
    Some(out)
}

fn map_primitive_type(mode: gltf::mesh::Mode) -> PrimitiveTopology {
    match mode {
        gltf::mesh::Mode::Triangles => PrimitiveTopology::TriangleList,
        gltf::mesh::Mode::TriangleStrip => PrimitiveTopology::TriangleStrip,
        gltf::mesh::Mode::Lines => PrimitiveTopology::LineList,
        gltf::mesh::Mode::LineStrip => PrimitiveTopology::LineStrip,
        gltf::mesh::Mode::Points => PrimitiveTopology::PointList,
        _ => PrimitiveTopology::TriangleList,
    }
}
