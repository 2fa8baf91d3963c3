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

//! Layout of a compiled mesh: de-duplicated attribute streams plus a flat
//! sub-mesh tree that points into them.

use super::{AssetKind, AssetMetadata};
use crate::math::Transform;
use serde::{Deserialize, Serialize};

/// A vertex attribute (or the index list) of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semantic {
    /// `POSITION`, three `f32`.
    Position,
    /// `NORMAL`, three `f32`.
    Normal,
    /// `TANGENT`, four `f32`.
    Tangent,
    /// `COLOR_0`.
    Color,
    /// `TEXCOORD_0`.
    TexCoord,
    /// `JOINTS_0`.
    Joints,
    /// `WEIGHTS_0`.
    Weights,
    /// The index list, always widened to `u32`.
    Index,
}

impl Semantic {
    /// Every semantic, in stream order.
    pub const ALL: [Semantic; 8] = [
        Semantic::Position,
        Semantic::Normal,
        Semantic::Tangent,
        Semantic::Color,
        Semantic::TexCoord,
        Semantic::Joints,
        Semantic::Weights,
        Semantic::Index,
    ];

    /// Position of this semantic in [`Semantic::ALL`].
    pub const fn slot(&self) -> usize {
        *self as usize
    }
}

/// The scalar type of one component of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// 32-bit float.
    F32,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub const fn size(&self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

/// How the elements of a segment are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFormat {
    /// Scalar type of each component.
    pub component: ComponentType,
    /// Components per element (1 to 16).
    pub components: u8,
    /// Whether integer components map to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
}

/// A contiguous run of elements inside one attribute stream.
///
/// Offsets are in bytes from the start of the stream; `stride` is the size of
/// one tightly packed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Byte offset from the start of the stream.
    pub offset: usize,
    /// Number of elements.
    pub count: usize,
    /// Size of one element in bytes.
    pub stride: usize,
    /// Encoding of each element.
    pub format: ElementFormat,
}

impl Segment {
    /// Total byte length of the segment.
    pub const fn byte_len(&self) -> usize {
        self.count * self.stride
    }
}

/// The concatenated data of one semantic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeStream {
    /// Which attribute the stream holds.
    pub semantic: Semantic,
    /// Byte offset of the stream inside the mesh payload.
    pub payload_offset: usize,
    /// Segments, one per distinct source accessor.
    pub segments: Vec<Segment>,
}

impl AttributeStream {
    /// Total byte length of the stream.
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(Segment::byte_len).sum()
    }
}

/// The segment each semantic of a primitive uses, `None` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentRefs([Option<u32>; 8]);

impl SegmentRefs {
    /// Returns the segment index used for `semantic`.
    pub fn get(&self, semantic: Semantic) -> Option<u32> {
        self.0[semantic.slot()]
    }

    /// Records the segment index used for `semantic`.
    pub fn set(&mut self, semantic: Semantic, segment: Option<u32>) {
        self.0[semantic.slot()] = segment;
    }
}

/// Texture references of a primitive's material, as project-relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialTextures {
    /// Base color texture.
    pub albedo: Option<String>,
    /// Tangent-space normal map.
    pub normal: Option<String>,
    /// Packed metallic (B) / roughness (G) texture.
    pub metallic_roughness: Option<String>,
    /// Emissive texture.
    pub emissive: Option<String>,
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

/// Primitive assembly mode of a drawable sub-mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    /// Isolated points.
    PointList,
    /// Isolated line segments.
    LineList,
    /// Connected line strip.
    LineStrip,
    /// Isolated triangles.
    #[default]
    TriangleList,
    /// Connected triangle strip.
    TriangleStrip,
}

/// Whether a sub-mesh is a scene node or something that can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubMeshKind {
    /// A node of the scene graph; carries the transform hierarchy.
    Node,
    /// A drawable primitive of its parent node's mesh.
    Primitive,
}

/// One entry of the flattened scene tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    /// Node or mesh name from the source, if any.
    pub name: Option<String>,
    /// Node or primitive.
    pub kind: SubMeshKind,
    /// Index of the parent entry, `None` for scene roots.
    pub parent: Option<u32>,
    /// Local transform. Primitives carry the identity.
    pub transform: Transform,
    /// Segments per semantic; all `None` for nodes.
    pub segments: SegmentRefs,
    /// Material textures; empty for nodes.
    pub material: MaterialTextures,
    /// Bounds of a primitive's positions, `None` for nodes.
    pub bounds: Option<Aabb>,
    /// Assembly mode; meaningful for primitives only.
    pub topology: PrimitiveTopology,
}

/// Metadata of a compiled mesh. The payload is the concatenation of the
/// streams, each starting at its `payload_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshMetadata {
    /// One stream per semantic present in the scene.
    pub streams: Vec<AttributeStream>,
    /// The flattened tree, parents always before their children.
    pub submeshes: Vec<SubMesh>,
}

impl MeshMetadata {
    /// Returns the stream holding `semantic`, if the scene uses it.
    pub fn stream(&self, semantic: Semantic) -> Option<&AttributeStream> {
        self.streams.iter().find(|s| s.semantic == semantic)
    }
}

impl AssetMetadata for MeshMetadata {
    const KIND: AssetKind = AssetKind::Mesh;
}
