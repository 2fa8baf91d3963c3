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

//! Extraction of accessor data into one de-duplicated stream per semantic.

use super::{MeshError, SceneUsage};
use khora_forge_core::asset::{AttributeStream, ComponentType, ElementFormat, Segment, Semantic};
use std::collections::HashMap;

/// Segments and streams start on this byte boundary.
pub const STREAM_ALIGNMENT: usize = 4;

/// Tightly packed elements read from one accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorData {
    /// Element bytes, `count * format size` long.
    pub bytes: Vec<u8>,
    /// Number of elements.
    pub count: usize,
    /// Element encoding.
    pub format: ElementFormat,
}

impl AccessorData {
    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.format.component.size() * self.format.components as usize
    }
}

/// The flattened payload of a scene and the accessor → segment remapping.
#[derive(Debug, Default)]
pub struct StreamSet {
    /// Stream descriptors in [`Semantic::ALL`] order.
    pub streams: Vec<AttributeStream>,
    /// All stream bytes, each stream at its `payload_offset`.
    pub payload: Vec<u8>,
    remap: [HashMap<usize, u32>; 8],
}

impl StreamSet {
    /// The segment index that holds `accessor` inside the `semantic` stream.
    pub fn segment_of(&self, semantic: Semantic, accessor: usize) -> Option<u32> {
        self.remap[semantic.slot()].get(&accessor).copied()
    }

    /// Appends one segment to the stream of `semantic`, opening the stream if
    /// it is the first segment of that semantic.
    pub fn push(&mut self, semantic: Semantic, accessor: usize, data: AccessorData) {
        pad_to(&mut self.payload, STREAM_ALIGNMENT);

        let stream_index = match self.streams.last() {
            Some(last) if last.semantic == semantic => self.streams.len() - 1,
            _ => {
                self.streams.push(AttributeStream {
                    semantic,
                    payload_offset: self.payload.len(),
                    segments: Vec::new(),
                });
                self.streams.len() - 1
            }
        };
        let stream = &mut self.streams[stream_index];

        let segment = Segment {
            offset: self.payload.len() - stream.payload_offset,
            count: data.count,
            stride: data.element_size(),
            format: data.format,
        };
        self.remap[semantic.slot()].insert(accessor, stream.segments.len() as u32);
        stream.segments.push(segment);
        self.payload.extend_from_slice(&data.bytes);
    }
}

fn pad_to(bytes: &mut Vec<u8>, alignment: usize) {
    let rem = bytes.len() % alignment;
    if rem != 0 {
        bytes.resize(bytes.len() + alignment - rem, 0);
    }
}

/// Extracts every accessor named in `usage` into its semantic's stream.
///
/// Each accessor is copied once no matter how many primitives reference it.
/// Index accessors are widened to `u32`.
pub fn build_streams(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    usage: &SceneUsage,
) -> Result<StreamSet, MeshError> {
    let accessors: Vec<gltf::Accessor<'_>> = document.accessors().collect();
    let mut set = StreamSet::default();

    for semantic in Semantic::ALL {
        for &index in usage.accessors(semantic) {
            let accessor = accessors
                .get(index)
                .ok_or(MeshError::AccessorOutOfBounds { accessor: index })?;
            let mut data = read_accessor(accessor, buffers)?;
            if semantic == Semantic::Index {
                data = widen_indices(&data, index)?;
            }
            set.push(semantic, index, data);
        }
    }
    Ok(set)
}

/// Reads an accessor's elements into a tightly packed buffer.
pub fn read_accessor(
    accessor: &gltf::Accessor<'_>,
    buffers: &[Vec<u8>],
) -> Result<AccessorData, MeshError> {
    let index = accessor.index();
    if accessor.sparse().is_some() {
        return Err(MeshError::SparseAccessor { accessor: index });
    }
    let view = accessor
        .view()
        .ok_or(MeshError::SparseAccessor { accessor: index })?;
    let buffer = buffers
        .get(view.buffer().index())
        .ok_or(MeshError::AccessorOutOfBounds { accessor: index })?;

    let format = ElementFormat {
        component: component_type(accessor.data_type()),
        components: accessor.dimensions().multiplicity() as u8,
        normalized: accessor.normalized(),
    };
    let element_size = format.component.size() * format.components as usize;
    let stride = view.stride().unwrap_or(element_size);

    let view_end = view.offset() + view.length();
    let window = buffer
        .get(..view_end)
        .ok_or(MeshError::AccessorOutOfBounds { accessor: index })?;
    let bytes = gather_elements(
        window,
        view.offset() + accessor.offset(),
        accessor.count(),
        element_size,
        stride,
    )
    .ok_or(MeshError::AccessorOutOfBounds { accessor: index })?;

    Ok(AccessorData {
        bytes,
        count: accessor.count(),
        format,
    })
}

/// Copies `count` elements of `element_size` bytes, `stride` apart, starting
/// at `start`. Returns `None` if any element falls outside `source`.
pub fn gather_elements(
    source: &[u8],
    start: usize,
    count: usize,
    element_size: usize,
    stride: usize,
) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(count * element_size);
    for i in 0..count {
        let at = start.checked_add(i.checked_mul(stride)?)?;
        out.extend_from_slice(source.get(at..at.checked_add(element_size)?)?);
    }
    Some(out)
}

/// Widens 8- or 16-bit indices to little-endian `u32`.
pub fn widen_indices(data: &AccessorData, accessor: usize) -> Result<AccessorData, MeshError> {
    let bytes: Vec<u8> = match data.format.component {
        ComponentType::U32 => data.bytes.clone(),
        ComponentType::U16 => data
            .bytes
            .chunks_exact(2)
            .flat_map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])).to_le_bytes())
            .collect(),
        ComponentType::U8 => data
            .bytes
            .iter()
            .flat_map(|&b| u32::from(b).to_le_bytes())
            .collect(),
        other => return Err(MeshError::IndexType { accessor, found: other }),
    };

    Ok(AccessorData {
        bytes,
        count: data.count,
        format: ElementFormat {
            component: ComponentType::U32,
            components: 1,
            normalized: false,
        },
    })
}

fn component_type(data_type: gltf::accessor::DataType) -> ComponentType {
    use gltf::accessor::DataType;
    match data_type {
        DataType::I8 => ComponentType::I8,
        DataType::U8 => ComponentType::U8,
        DataType::I16 => ComponentType::I16,
        DataType::U16 => ComponentType::U16,
        DataType::U32 => ComponentType::U32,
        DataType::F32 => ComponentType::F32,
    }
}
