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

use anyhow::Result;
use khora_forge_core::asset::{AssetHash, AssetKind, TextureFlags};
use khora_forge_io::{ForgeConfig, ForgeError, Orchestrator, StoreError, MANIFEST_FILE};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

const SHADER: &str = "[A|B]
@group(0) @binding(0) var<storage, read_write> data: array<u32, 16>;

@compute @workgroup_size(16)
fn main(@builtin(local_invocation_index) i: u32) {
    data[i] = u32(TYPE);
}
";

fn fast_config() -> ForgeConfig {
    let mut config = ForgeConfig::default();
    config.pipeline.scan_interval_ms = 100;
    config
}

fn write_png(path: &Path, pixel: [u8; 4]) {
    image::RgbaImage::from_pixel(1, 1, image::Rgba(pixel))
        .save(path)
        .unwrap();
}

fn write_silence(path: &Path, millis: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..44100 * millis / 1000 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Pushes the file's modification time forward so the change is visible
/// regardless of the filesystem's timestamp granularity.
fn touch_later(path: &Path) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();
}

/// A binary glTF holding one indexed triangle whose albedo texture is a PNG
/// stored in the BIN chunk.
fn triangle_glb() -> Vec<u8> {
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        2,
        2,
        image::Rgba([0, 255, 0, 255]),
    ))
    .write_to(&mut png, image::ImageFormat::Png)
    .unwrap();
    let png = png.into_inner();

    let mut bin = Vec::new();
    for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in v {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2, 0] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    let image_offset = bin.len();
    bin.extend_from_slice(&png);
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let mut json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"name": "body", "mesh": 0}}],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
  "materials": [{{"pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}}}}],
  "textures": [{{"source": 0}}],
  "images": [{{"bufferView": 2, "mimeType": "image/png"}}],
  "buffers": [{{"byteLength": {bin_len}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}},
    {{"buffer": 0, "byteOffset": {image_offset}, "byteLength": {png_len}}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#,
        bin_len = bin.len(),
        png_len = png.len(),
    )
    .into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

fn generated_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
        .filter(|name| name.starts_with("__"))
        .collect();
    names.sort();
    names
}

#[test]
fn mesh_exports_become_textures_and_are_regenerated() -> Result<()> {
    let dir = tempdir()?;
    let scene = dir.path().join("scene.glb");
    std::fs::write(&scene, triangle_glb())?;

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    let report = forge.scan_once()?;
    assert_eq!(report.compiled, 1);
    assert_eq!(generated_files(dir.path()), ["__scene_0__.png"]);
    let mesh = forge.context().meshes.get(AssetHash::of("scene.glb")).unwrap();
    let albedo = mesh
        .metadata
        .submeshes
        .iter()
        .find_map(|s| s.material.albedo.clone());
    assert_eq!(albedo.as_deref(), Some("__scene_0__.png"));
    assert!(forge.context().textures.is_empty());

    // The export is an ordinary source on the next cycle.
    let report = forge.scan_once()?;
    assert_eq!(report.compiled, 1);
    assert!(forge.manifest().has_file("__scene_0__.png"));
    assert!(forge
        .context()
        .textures
        .get(AssetHash::of("__scene_0__.png"))
        .is_some());

    // A recompile clears every export of the scene before writing the live ones.
    write_png(&dir.path().join("__scene_5__.png"), [1, 2, 3, 255]);
    touch_later(&scene);
    forge.scan_once()?;
    assert_eq!(generated_files(dir.path()), ["__scene_0__.png"]);

    let report = forge.scan_once()?;
    assert_eq!(report.removed, 1);
    assert!(!forge.manifest().has_file("__scene_5__.png"));
    assert!(forge.context().textures.get_by_name("__scene_5__.png").is_none());
    assert!(forge.context().textures.get_by_name("__scene_0__.png").is_some());
    assert_eq!(forge.context().meshes.len(), 1);
    Ok(())
}

#[test]
fn texture_and_clip_then_texture_deleted() -> Result<()> {
    let dir = tempdir()?;
    write_png(&dir.path().join("tex.png"), [10, 20, 30, 255]);
    write_silence(&dir.path().join("clip.wav"), 100);

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    let report = forge.scan_once()?;
    assert_eq!(report.compiled, 2);
    assert_eq!(forge.manifest().len(), 2);

    let ctx = forge.context();
    assert_eq!(ctx.textures.len(), 1);
    let texture = ctx.textures.get(AssetHash::of("tex.png")).unwrap();
    assert!(!texture.metadata.flags.contains(TextureFlags::HAS_ALPHA));
    let clip = ctx.waves.get_by_name("clip.wav").unwrap().clone();
    assert!((clip.metadata.duration - 0.1).abs() < 1e-6);

    std::fs::remove_file(dir.path().join("tex.png"))?;
    let report = forge.scan_once()?;
    assert_eq!(report.removed, 1);
    assert_eq!(forge.manifest().len(), 1);
    assert!(forge.context().textures.is_empty());
    assert_eq!(forge.context().waves.get_by_name("clip.wav"), Some(&clip));

    // The stores on disk agree with memory.
    let reopened = Orchestrator::with_config(dir.path(), fast_config())?;
    assert_eq!(reopened.context().count(AssetKind::Texture), 0);
    assert_eq!(reopened.context().count(AssetKind::Wave), 1);
    assert_eq!(reopened.manifest().len(), 1);
    Ok(())
}

#[test]
fn second_scan_without_changes_does_nothing() -> Result<()> {
    let dir = tempdir()?;
    write_png(&dir.path().join("tex.png"), [0, 0, 0, 255]);
    write_silence(&dir.path().join("clip.wav"), 10);

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    forge.scan_once()?;
    let writes = forge.manifest().write_count();

    let report = forge.scan_once()?;
    assert!(report.is_idle());
    assert_eq!(report.scanned, 2);
    assert_eq!(forge.manifest().write_count(), writes);

    // A fresh process sees the persisted timestamps and stays idle too.
    let mut restarted = Orchestrator::with_config(dir.path(), fast_config())?;
    assert!(restarted.scan_once()?.is_idle());
    Ok(())
}

#[test]
fn new_texture_gets_a_path_keyed_entry() -> Result<()> {
    let dir = tempdir()?;
    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    assert!(forge.scan_once()?.is_idle());

    std::fs::create_dir(dir.path().join("ui"))?;
    write_png(&dir.path().join("ui/icon.png"), [255, 255, 255, 255]);
    let report = forge.scan_once()?;
    assert_eq!((report.added, report.compiled), (1, 1));

    assert_eq!(forge.manifest().paths().collect::<Vec<_>>(), ["ui/icon.png"]);
    let ctx = forge.context();
    assert_eq!(ctx.textures.len(), 1);
    assert!(ctx.textures.contains(AssetHash::of("ui/icon.png")));
    assert!(ctx.output_dir().join(MANIFEST_FILE).exists());
    assert!(ctx.output_dir().join("texture.assets").exists());
    Ok(())
}

#[test]
fn changed_content_keeps_the_hash() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tex.png");
    write_png(&path, [0, 0, 0, 255]);

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    forge.scan_once()?;
    let before = forge.context().textures.get_by_name("tex.png").unwrap().clone();

    write_png(&path, [255, 0, 0, 128]);
    touch_later(&path);
    assert_eq!(forge.scan_once()?.compiled, 1);

    let after = forge.context().textures.get_by_name("tex.png").unwrap();
    assert_eq!(after.hash, before.hash);
    assert_ne!(after.payload, before.payload);
    assert!(after.metadata.flags.contains(TextureFlags::HAS_ALPHA));
    Ok(())
}

#[test]
fn shader_permutations_fan_out_and_leave_together() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("fill.fx"), SHADER)?;

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    forge.scan_once()?;
    let shaders = &forge.context().shaders;
    assert_eq!(shaders.len(), 3);
    for name in ["fill.fx|DEFAULT", "fill.fx|A", "fill.fx|B"] {
        assert!(shaders.contains(AssetHash::of(name)), "missing {name}");
    }

    std::fs::remove_file(dir.path().join("fill.fx"))?;
    forge.scan_once()?;
    assert!(forge.context().shaders.is_empty());
    assert!(forge.manifest().is_empty());
    Ok(())
}

#[test]
fn failed_recompile_keeps_the_previous_entry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tex.png");
    write_png(&path, [1, 2, 3, 255]);

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    forge.scan_once()?;
    let good = forge.context().textures.get_by_name("tex.png").unwrap().clone();

    std::fs::write(&path, b"definitely not a png")?;
    touch_later(&path);
    let report = forge.scan_once()?;
    assert_eq!((report.compiled, report.failed), (0, 1));
    assert_eq!(forge.context().textures.get_by_name("tex.png"), Some(&good));

    // The failure is not retried until the file changes again.
    assert!(forge.scan_once()?.is_idle());
    Ok(())
}

#[test]
fn unknown_extensions_are_tracked_but_not_compiled() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("notes.txt"), "todo")?;

    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    let report = forge.scan_once()?;
    assert_eq!((report.added, report.ignored), (1, 1));
    assert!(forge.manifest().has_file("notes.txt"));
    assert!(forge.scan_once()?.is_idle());
    Ok(())
}

#[test]
fn loop_runs_at_most_once_per_interval() -> Result<()> {
    let dir = tempdir()?;
    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    let (tx, rx) = crossbeam_channel::bounded(1);

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(500));
        tx.send(()).unwrap();
    });
    let cycles = forge.run(&rx)?;
    stopper.join().unwrap();

    assert!((1..=6).contains(&cycles), "ran {cycles} cycles in 500ms");
    Ok(())
}

#[test]
fn dropped_sender_stops_the_loop() -> Result<()> {
    let dir = tempdir()?;
    let mut forge = Orchestrator::with_config(dir.path(), fast_config())?;
    let (tx, rx) = crossbeam_channel::bounded::<()>(1);
    drop(tx);
    assert_eq!(forge.run(&rx)?, 1);
    Ok(())
}

#[test]
fn corrupt_store_refuses_to_start() -> Result<()> {
    let dir = tempdir()?;
    std::fs::create_dir(dir.path().join("generated"))?;
    std::fs::write(dir.path().join("generated/mesh.assets"), b"KFA")?;

    let err = Orchestrator::with_config(dir.path(), fast_config()).unwrap_err();
    assert!(matches!(err, ForgeError::Store(StoreError::Corrupt { .. })));
    Ok(())
}

#[test]
fn missing_root_is_rejected() {
    let err = Orchestrator::with_config("/definitely/not/here", fast_config()).unwrap_err();
    assert!(matches!(err, ForgeError::InvalidRoot { .. }));
}

#[test]
fn zero_interval_is_rejected_before_scanning() {
    let dir = tempdir().unwrap();
    let mut config = fast_config();
    config.pipeline.scan_interval_ms = 0;
    let err = Orchestrator::with_config(dir.path(), config).unwrap_err();
    assert!(matches!(
        err,
        ForgeError::Config(khora_forge_io::ConfigError::ZeroScanInterval)
    ));
}
