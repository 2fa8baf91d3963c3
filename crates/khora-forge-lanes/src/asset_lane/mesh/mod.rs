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

//! glTF / GLB scenes flattened into de-duplicated attribute streams and a
//! sub-mesh tree.
//!
//! Compilation runs two walks over the scene graph. The first collects every
//! accessor and texture reachable from a scene; the accessors are then copied
//! once each into one stream per semantic. The second walk emits the node and
//! primitive entries that point into those streams by segment index.
//!
//! Embedded material textures are written next to the scene as
//! `__<stem>_<texture>__.png` so that the texture lane picks them up on the
//! next scan.

mod gather;
mod images;
mod resource_resolver;
mod streams;
mod submesh;

pub use gather::*;
pub use images::*;
pub use resource_resolver::*;
pub use streams::*;
pub use submesh::*;

use super::{AssetCompilerLane, CompileError, SourceFile};
use khora_forge_core::asset::{CompiledAsset, ComponentType, MeshMetadata};
use thiserror::Error;

/// Errors raised while flattening a scene.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The file is not valid glTF / GLB.
    #[error("invalid glTF: {0}")]
    Parse(#[from] gltf::Error),
    /// A buffer refers to the GLB binary chunk but the file has none.
    #[error("buffer references the GLB binary chunk but none is present")]
    MissingBlob,
    /// A `data:` URI that is not base64 encoded.
    #[error("unsupported data URI '{0}...'")]
    UnsupportedDataUri(String),
    /// A `data:` URI with a broken base64 payload.
    #[error("malformed base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
    /// An external buffer could not be read.
    #[error("failed to read resource '{uri}': {source}")]
    Resource {
        /// The URI as written in the scene.
        uri: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document has no scene or no node.
    #[error("the file contains no scene")]
    EmptyScene,
    /// The node hierarchy exceeds [`MAX_NODE_DEPTH`].
    #[error("node {node} is nested deeper than {MAX_NODE_DEPTH} levels")]
    HierarchyTooDeep {
        /// The node at which the limit was hit.
        node: usize,
    },
    /// A primitive without a `POSITION` attribute.
    #[error("mesh {mesh} primitive {primitive} has no positions")]
    MissingPositions {
        /// Mesh index.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },
    /// The position accessor of a primitive declares no usable min/max.
    #[error("mesh {mesh} primitive {primitive} has no position bounds")]
    MissingBounds {
        /// Mesh index.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },
    /// A primitive without an index accessor.
    #[error("mesh {mesh} primitive {primitive} is not indexed")]
    MissingIndices {
        /// Mesh index.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },
    /// Sparse accessors are not supported.
    #[error("accessor {accessor} is sparse or has no buffer view")]
    SparseAccessor {
        /// Accessor index.
        accessor: usize,
    },
    /// An accessor reads past the end of its buffer.
    #[error("accessor {accessor} is out of bounds")]
    AccessorOutOfBounds {
        /// Accessor index.
        accessor: usize,
    },
    /// An index accessor with a non-integer or signed component type.
    #[error("index accessor {accessor} has component type {found:?}")]
    IndexType {
        /// Accessor index.
        accessor: usize,
        /// The offending component type.
        found: ComponentType,
    },
    /// An embedded texture could not be exported.
    #[error("failed to export texture '{name}': {reason}")]
    Export {
        /// The file being written, or the directory being cleared.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Compiles `.gltf` and `.glb` scenes into a single mesh record.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshCompilerLane;

impl MeshCompilerLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl AssetCompilerLane for MeshCompilerLane {
    type Metadata = MeshMetadata;

    fn strategy_name(&self) -> &'static str {
        "GltfCompiler"
    }

    fn compile(
        &self,
        source: &SourceFile,
    ) -> Result<Vec<CompiledAsset<MeshMetadata>>, CompileError> {
        let bytes = source.read()?;
        let gltf = gltf::Gltf::from_slice(&bytes).map_err(MeshError::from)?;

        let resolver = FileSystemResolver::new(source.root().join(source.relative_dir()));
        let buffers = load_buffers(&gltf, &resolver)?;

        let document = &gltf.document;
        if document.scenes().len() == 0 || document.nodes().len() == 0 {
            return Err(MeshError::EmptyScene.into());
        }

        let usage = SceneUsage::collect(document)?;
        let streams = build_streams(document, &buffers, &usage)?;

        let used_textures = usage.all_textures();
        let paths = texture_paths(document, source, &used_textures);
        let submeshes = build_submeshes(document, &streams, &paths)?;

        let exported = export_embedded(document, &buffers, source, &used_textures)?;
        for path in &exported {
            log::info!("Exported embedded texture '{}'", path);
        }

        log::debug!(
            "'{}': {} stream(s), {} sub-mesh(es), {} payload bytes",
            source.relative(),
            streams.streams.len(),
            submeshes.len(),
            streams.payload.len()
        );

        let metadata = MeshMetadata {
            streams: streams.streams,
            submeshes,
        };
        Ok(vec![CompiledAsset::new(
            source.relative(),
            streams.payload,
            metadata,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use khora_forge_core::asset::{AssetHash, Semantic, SubMeshKind};

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// One triangle under a child node, with an embedded albedo texture and an
    /// external normal map.
    fn triangle_gltf(with_indices: bool) -> String {
        let mut buffer = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                buffer.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            buffer.extend_from_slice(&i.to_le_bytes());
        }
        let indices = if with_indices { r#","indices":1"# } else { "" };
        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [
    {{"name": "root", "children": [1], "translation": [1.0, 2.0, 3.0]}},
    {{"name": "child", "mesh": 0}}
  ],
  "meshes": [{{"name": "tri", "primitives": [{{"attributes": {{"POSITION": 0}}{indices}, "material": 0}}]}}],
  "materials": [{{
    "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}},
    "normalTexture": {{"index": 1}}
  }}],
  "textures": [{{"source": 0}}, {{"source": 1}}],
  "images": [
    {{"uri": "data:image/png;base64,{png}"}},
    {{"uri": "normal.png"}}
  ],
  "buffers": [{{"byteLength": {len}, "uri": "data:application/octet-stream;base64,{data}"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#,
            png = encode(&tiny_png()),
            len = buffer.len(),
            data = encode(&buffer),
        )
    }

    #[test]
    fn triangle_scene_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/tri.gltf"), triangle_gltf(true)).unwrap();
        std::fs::write(dir.path().join("models/__tri_7__.png"), b"stale").unwrap();

        let source = SourceFile::new(dir.path(), "models/tri.gltf");
        let assets = MeshCompilerLane::new().compile(&source).unwrap();
        assert_eq!(assets.len(), 1);
        let asset = &assets[0];
        assert_eq!(asset.hash, AssetHash::of("models/tri.gltf"));

        let meta = &asset.metadata;
        let positions = meta.stream(Semantic::Position).unwrap();
        assert_eq!(positions.segments.len(), 1);
        assert_eq!(positions.segments[0].count, 3);
        let indices = meta.stream(Semantic::Index).unwrap();
        assert_eq!(indices.segments[0].stride, 4);
        assert!(meta.stream(Semantic::Normal).is_none());
        assert_eq!(asset.payload.len(), 36 + 12);

        let kinds: Vec<_> = meta.submeshes.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, [SubMeshKind::Node, SubMeshKind::Node, SubMeshKind::Primitive]);
        assert_eq!(meta.submeshes[0].transform.translation, [1.0, 2.0, 3.0]);
        assert_eq!(meta.submeshes[1].parent, Some(0));

        let primitive = &meta.submeshes[2];
        assert_eq!(primitive.parent, Some(1));
        assert_eq!(primitive.segments.get(Semantic::Position), Some(0));
        assert_eq!(primitive.segments.get(Semantic::Index), Some(0));
        assert_eq!(primitive.segments.get(Semantic::Normal), None);
        let bounds = primitive.bounds.unwrap();
        assert_eq!(bounds.max, [1.0, 1.0, 0.0]);
        assert_eq!(primitive.material.albedo.as_deref(), Some("models/__tri_0__.png"));
        assert_eq!(primitive.material.normal.as_deref(), Some("models/normal.png"));

        assert!(dir.path().join("models/__tri_0__.png").exists());
        assert!(!dir.path().join("models/__tri_7__.png").exists());
        assert!(!dir.path().join("models/__tri_1__.png").exists());
    }

    #[test]
    fn scenes_sharing_a_prefix_keep_their_own_exports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("robot.gltf"), triangle_gltf(true)).unwrap();
        std::fs::write(dir.path().join("robot.lod1.gltf"), triangle_gltf(true)).unwrap();
        let lane = MeshCompilerLane::new();
        let base = SourceFile::new(dir.path(), "robot.gltf");
        let lod = SourceFile::new(dir.path(), "robot.lod1.gltf");

        let lod_asset = lane.compile(&lod).unwrap().remove(0);
        assert_eq!(
            lod_asset.metadata.submeshes[2].material.albedo.as_deref(),
            Some("__robot.lod1_0__.png")
        );
        lane.compile(&base).unwrap();
        lane.compile(&base).unwrap();

        assert!(dir.path().join("__robot_0__.png").exists());
        assert!(dir.path().join("__robot.lod1_0__.png").exists());
    }

    #[test]
    fn unindexed_primitive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri.gltf"), triangle_gltf(false)).unwrap();
        let err = MeshCompilerLane::new()
            .compile(&SourceFile::new(dir.path(), "tri.gltf"))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Mesh(MeshError::MissingIndices { mesh: 0, primitive: 0 })
        ));
        assert!(!dir.path().join("__tri_0__.png").exists());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.glb"), b"not a scene").unwrap();
        let err = MeshCompilerLane::new()
            .compile(&SourceFile::new(dir.path(), "bad.glb"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Mesh(MeshError::Parse(_))));
    }
}
