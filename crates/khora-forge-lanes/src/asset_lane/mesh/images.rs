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

//! Material textures: where they live and exporting the embedded ones.

use super::{decode_data_uri, MeshError};
use crate::asset_lane::SourceFile;
use image::ImageFormat;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// The deterministic file name of an exported embedded texture.
pub fn generated_texture_name(scene_stem: &str, texture: usize) -> String {
    format!("__{scene_stem}_{texture}__.png")
}

/// Whether `file_name` was produced by [`generated_texture_name`] for `scene_stem`.
pub fn is_generated_texture_name(file_name: &str, scene_stem: &str) -> bool {
    file_name
        .strip_prefix(&format!("__{scene_stem}_"))
        .and_then(|rest| rest.strip_suffix("__.png"))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Where the image of a texture comes from.
enum ImageOrigin<'a> {
    /// A file next to the scene, by relative URI.
    File(&'a str),
    /// Bytes inside the scene: a buffer view or a `data:` URI.
    Embedded,
}

fn image_origin<'a>(texture: &gltf::Texture<'a>) -> ImageOrigin<'a> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => ImageOrigin::File(uri),
        _ => ImageOrigin::Embedded,
    }
}

/// Maps every used texture index to the project-relative path of its image.
///
/// External images keep their URI (resolved against the scene's directory);
/// embedded ones get their generated export name.
pub fn texture_paths(
    document: &gltf::Document,
    source: &SourceFile,
    used: &BTreeSet<usize>,
) -> HashMap<usize, String> {
    document
        .textures()
        .filter(|texture| used.contains(&texture.index()))
        .map(|texture| {
            let path = match image_origin(&texture) {
                ImageOrigin::File(uri) => source.sibling(uri),
                ImageOrigin::Embedded => {
                    source.sibling(&generated_texture_name(source.stem(), texture.index()))
                }
            };
            (texture.index(), path)
        })
        .collect()
}

/// Deletes every previously exported texture of the scene in `dir`.
///
/// Returns how many files were removed.
pub fn clear_generated(dir: &Path, scene_stem: &str) -> Result<usize, MeshError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(MeshError::Export {
                name: dir.display().to_string(),
                reason: source.to_string(),
            })
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_generated_texture_name(name, scene_stem) {
            std::fs::remove_file(entry.path()).map_err(|e| MeshError::Export {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Writes every used embedded texture next to the scene as a PNG.
///
/// Stale exports of the same scene are deleted first. Returns the
/// project-relative paths written.
pub fn export_embedded(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    source: &SourceFile,
    used: &BTreeSet<usize>,
) -> Result<Vec<String>, MeshError> {
    let scene_dir = source.root().join(source.relative_dir());
    let removed = clear_generated(&scene_dir, source.stem())?;
    if removed > 0 {
        log::debug!("Removed {} stale texture export(s) of '{}'", removed, source.relative());
    }

    let mut written = Vec::new();
    for texture in document.textures().filter(|t| used.contains(&t.index())) {
        if let ImageOrigin::File(_) = image_origin(&texture) {
            continue;
        }

        let name = generated_texture_name(source.stem(), texture.index());
        let bytes = embedded_image_bytes(&texture.source(), buffers)?;
        let image = image::load_from_memory(&bytes).map_err(|e| MeshError::Export {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        image
            .save_with_format(scene_dir.join(&name), ImageFormat::Png)
            .map_err(|e| MeshError::Export {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        written.push(source.sibling(&name));
    }
    Ok(written)
}

fn embedded_image_bytes(image: &gltf::Image<'_>, buffers: &[Vec<u8>]) -> Result<Vec<u8>, MeshError> {
    match image.source() {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index());
            buffer
                .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
                .map(<[u8]>::to_vec)
                .ok_or(MeshError::Export {
                    name: format!("image {}", image.index()),
                    reason: "buffer view out of range".to_string(),
                })
        }
        gltf::image::Source::Uri { uri, .. } => decode_data_uri(uri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_recognised_per_scene() {
        let name = generated_texture_name("robot", 3);
        assert_eq!(name, "__robot_3__.png");
        assert!(is_generated_texture_name(&name, "robot"));
        assert!(!is_generated_texture_name(&name, "rob"));
        assert!(!is_generated_texture_name("__robot_arm_3__.png", "robot"));
        assert!(!is_generated_texture_name("robot.png", "robot"));
    }

    #[test]
    fn clearing_only_touches_the_scene_exports() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["__robot_0__.png", "__robot_12__.png", "__robot_arm_0__.png", "albedo.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(clear_generated(dir.path(), "robot").unwrap(), 2);
        assert!(dir.path().join("__robot_arm_0__.png").exists());
        assert!(dir.path().join("albedo.png").exists());
        assert!(!dir.path().join("__robot_12__.png").exists());
    }
}
