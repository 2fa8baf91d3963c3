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

//! Defines the abstraction for resolving external resources referenced by a glTF scene.

use super::MeshError;
use base64::Engine;
use std::path::{Path, PathBuf};

/// A trait for resolving external buffers referenced by a URI within a scene file.
pub trait GltfResourceResolver: Send + Sync {
    /// Resolves an external buffer URI to its binary data.
    fn resolve_buffer(&self, uri: &str) -> Result<Vec<u8>, MeshError>;
}

/// A default implementation of `GltfResourceResolver` that resolves resources
/// from the local filesystem relative to a given base path.
pub struct FileSystemResolver {
    base_path: PathBuf,
}

impl FileSystemResolver {
    /// Creates a new `FileSystemResolver` with a specified base path.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }
}

impl GltfResourceResolver for FileSystemResolver {
    fn resolve_buffer(&self, uri: &str) -> Result<Vec<u8>, MeshError> {
        let path = self.base_path.join(uri);
        std::fs::read(&path).map_err(|source| MeshError::Resource {
            uri: uri.to_string(),
            source,
        })
    }
}

/// Loads the bytes of every buffer of the document, in buffer index order.
pub fn load_buffers(
    gltf: &gltf::Gltf,
    resolver: &dyn GltfResourceResolver,
) -> Result<Vec<Vec<u8>>, MeshError> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => return Err(MeshError::MissingBlob),
            },
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    buffer_data.push(decode_data_uri(uri)?);
                } else {
                    buffer_data.push(resolver.resolve_buffer(uri)?);
                }
            }
        }
    }
    Ok(buffer_data)
}

/// Decodes a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, MeshError> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, data)| data)
        .ok_or_else(|| MeshError::UnsupportedDataUri(truncate(uri)))?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn truncate(uri: &str) -> String {
    uri.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uris_of_any_mime_type_decode() {
        let bytes = decode_data_uri("data:application/octet-stream;base64,AQID").unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        let bytes = decode_data_uri("data:image/png;base64,AQID").unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn non_base64_data_uri_is_rejected() {
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(MeshError::UnsupportedDataUri(_))
        ));
    }
}
