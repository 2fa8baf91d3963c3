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

//! Multi-permutation, multi-target shader compilation.
//!
//! A `.fx` source is WGSL behind a preprocessor layer. Each permutation is
//! preprocessed, parsed and validated on its own; every WGSL stage present
//! is then written as SPIR-V and as MSL, and the bound resources are
//! reflected from the validated module.

mod permutation;
mod preprocess;
mod reflect;
mod targets;

pub use permutation::*;
pub use preprocess::*;
pub use reflect::*;
pub use targets::*;

use super::{AssetCompilerLane, CompileError, SourceFile};
use khora_forge_core::asset::{
    permutation_name, CompiledAsset, ShaderMetadata, ShaderStage, ShaderTarget, StageBytecode,
};
use thiserror::Error;

/// Errors raised while compiling a shader. Any of them fails the whole file.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The source is not UTF-8.
    #[error("source is not valid UTF-8")]
    Encoding,
    /// The first line looks like a permutation header but is malformed.
    #[error("bad permutation header: {0}")]
    Header(String),
    /// A preprocessor directive failed.
    #[error("permutation {permutation}: {source}")]
    Preprocess {
        /// The permutation being compiled.
        permutation: String,
        /// The directive error.
        #[source]
        source: PreprocessError,
    },
    /// The preprocessed text is not valid WGSL.
    #[error("permutation {permutation}: parse error\n{message}")]
    Parse {
        /// The permutation being compiled.
        permutation: String,
        /// Rendered diagnostic.
        message: String,
    },
    /// The module failed validation.
    #[error("permutation {permutation}: validation error: {message}")]
    Validation {
        /// The permutation being compiled.
        permutation: String,
        /// Rendered diagnostic.
        message: String,
    },
    /// More than one entry point for the same stage.
    #[error("permutation {permutation}: more than one {stage:?} entry point")]
    DuplicateEntryPoint {
        /// The permutation being compiled.
        permutation: String,
        /// The ambiguous stage.
        stage: ShaderStage,
    },
    /// A back end rejected a stage.
    #[error("permutation {permutation}: {stage:?} -> {target:?}: {message}")]
    Backend {
        /// The permutation being compiled.
        permutation: String,
        /// The stage being written.
        stage: ShaderStage,
        /// The target being written.
        target: ShaderTarget,
        /// Back-end error message.
        message: String,
    },
}

/// Compiles `.fx` sources into one record per permutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaderCompilerLane;

impl ShaderCompilerLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }

    /// Compiles one permutation into its payload and metadata.
    pub fn compile_permutation(
        &self,
        source: &PermutedSource<'_>,
        permutation: &str,
    ) -> Result<(Vec<u8>, ShaderMetadata), ShaderError> {
        let text = source.synthesize(permutation);
        let expanded = Preprocessor::new()
            .run(&text)
            .map_err(|source| ShaderError::Preprocess {
                permutation: permutation.to_string(),
                source,
            })?;

        let module = naga::front::wgsl::parse_str(&expanded).map_err(|e| ShaderError::Parse {
            permutation: permutation.to_string(),
            message: e.emit_to_string(&expanded),
        })?;
        let info = validate(&module).map_err(|message| ShaderError::Validation {
            permutation: permutation.to_string(),
            message,
        })?;

        let mut payload = Vec::new();
        let mut bytecode = Vec::new();
        for stage in ShaderStage::ALL {
            let Some(entry_point) = find_entry_point(&module, stage, permutation)? else {
                log::trace!("{}: no {:?} stage", permutation, stage);
                continue;
            };
            for target in ShaderTarget::ALL {
                let output = write_target(&module, &info, entry_point, target).map_err(|message| {
                    ShaderError::Backend {
                        permutation: permutation.to_string(),
                        stage,
                        target,
                        message,
                    }
                })?;
                // SPIR-V consumers read words; keep every blob 4-byte aligned.
                while payload.len() % 4 != 0 {
                    payload.push(0);
                }
                bytecode.push(StageBytecode {
                    stage,
                    target,
                    entry_point: output.entry_point,
                    offset: payload.len(),
                    length: output.bytes.len(),
                });
                payload.extend_from_slice(&output.bytes);
            }
        }

        if bytecode.is_empty() {
            log::warn!("Permutation {} has no entry point", permutation);
        }

        let metadata = ShaderMetadata {
            permutation: permutation.to_string(),
            bytecode,
            resources: reflect(&module, &info),
        };
        Ok((payload, metadata))
    }
}

impl AssetCompilerLane for ShaderCompilerLane {
    type Metadata = ShaderMetadata;

    fn strategy_name(&self) -> &'static str {
        "WgslCompiler"
    }

    fn compile(
        &self,
        source: &SourceFile,
    ) -> Result<Vec<CompiledAsset<ShaderMetadata>>, CompileError> {
        let bytes = source.read()?;
        let text = std::str::from_utf8(&bytes).map_err(|_| ShaderError::Encoding)?;
        let permuted = PermutedSource::parse(text).map_err(ShaderError::Header)?;

        let mut assets = Vec::with_capacity(permuted.permutations.len());
        for permutation in &permuted.permutations {
            let (payload, metadata) = self.compile_permutation(&permuted, permutation)?;
            assets.push(CompiledAsset::named(
                permutation_name(source.relative(), permutation),
                source.relative(),
                payload,
                metadata,
            ));
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khora_forge_core::asset::{AssetHash, ResourceKind, ShaderStageFlags};

    const LIT: &str = r#"[SKINNED|INSTANCED]
struct Globals {
    view_proj: mat4x4<f32>,
    tint: vec4<f32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var albedo: texture_2d<f32>;
@group(1) @binding(1) var albedo_sampler: sampler;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
#if TYPE == SKINNED
    let scale = 2.0;
#else
    let scale = 1.0;
#endif
    return globals.view_proj * vec4<f32>(position * scale, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(albedo, albedo_sampler, vec2<f32>(0.5, 0.5)) * globals.tint;
}
"#;

    const COMPUTE: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<u32, 64>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x % 64u] = id.x;
}
"#;

    fn compile(name: &str, text: &str) -> Result<Vec<CompiledAsset<ShaderMetadata>>, CompileError> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), text).unwrap();
        ShaderCompilerLane::new().compile(&SourceFile::new(dir.path(), name))
    }

    #[test]
    fn header_fans_out_to_one_record_per_permutation() {
        let assets = compile("lit.fx", LIT).unwrap();
        let hashes: Vec<_> = assets.iter().map(|a| a.hash).collect();
        assert_eq!(
            hashes,
            [
                AssetHash::of("lit.fx|DEFAULT"),
                AssetHash::of("lit.fx|SKINNED"),
                AssetHash::of("lit.fx|INSTANCED"),
            ]
        );
        assert!(assets.iter().all(|a| a.source_path == "lit.fx"));
        assert_eq!(assets[1].metadata.permutation, "SKINNED");
    }

    #[test]
    fn present_stages_compile_to_both_targets() {
        let assets = compile("lit.fx", LIT).unwrap();
        let meta = &assets[0].metadata;
        let expected = ShaderStageFlags::from_stage(ShaderStage::Vertex)
            | ShaderStageFlags::from_stage(ShaderStage::Pixel);
        assert_eq!(meta.stages(), expected);
        assert_eq!(meta.bytecode.len(), 4);

        let spirv = meta.bytecode(ShaderStage::Vertex, ShaderTarget::SpirV).unwrap();
        assert_eq!(spirv.entry_point, "vs_main");
        assert_eq!(spirv.offset % 4, 0);
        let words = &assets[0].payload[spirv.offset..spirv.offset + spirv.length];
        assert_eq!(&words[..4], &0x0723_0203u32.to_le_bytes());

        let msl = meta.bytecode(ShaderStage::Pixel, ShaderTarget::Msl).unwrap();
        let text = std::str::from_utf8(&assets[0].payload[msl.offset..msl.offset + msl.length]).unwrap();
        assert!(text.contains(&msl.entry_point));
        assert!(meta.bytecode(ShaderStage::Geometry, ShaderTarget::SpirV).is_none());
    }

    #[test]
    fn resources_are_reflected_with_their_stages() {
        let assets = compile("lit.fx", LIT).unwrap();
        let resources = &assets[0].metadata.resources;
        assert_eq!(resources.len(), 3);

        let globals = &resources[0];
        assert_eq!((globals.group, globals.binding), (0, 0));
        assert!(globals.stages.contains(ShaderStage::Vertex));
        assert!(globals.stages.contains(ShaderStage::Pixel));
        match &globals.kind {
            ResourceKind::ConstantBuffer { size, members } => {
                assert_eq!(*size, 80);
                assert_eq!(members.len(), 2);
                assert_eq!((members[0].name.as_str(), members[0].offset, members[0].size), ("view_proj", 0, 64));
                assert_eq!((members[1].name.as_str(), members[1].offset, members[1].size), ("tint", 64, 16));
            }
            other => panic!("expected a constant buffer, got {other:?}"),
        }

        assert_eq!(resources[1].kind, ResourceKind::Texture);
        assert_eq!(resources[1].stages, ShaderStageFlags::from_stage(ShaderStage::Pixel));
        assert_eq!(resources[2].kind, ResourceKind::Sampler);
    }

    #[test]
    fn compute_only_shader_skips_graphics_stages() {
        let assets = compile("sum.fx", COMPUTE).unwrap();
        assert_eq!(assets.len(), 1);
        let meta = &assets[0].metadata;
        assert_eq!(meta.stages(), ShaderStageFlags::from_stage(ShaderStage::Compute));
        assert!(meta.bytecode(ShaderStage::Vertex, ShaderTarget::SpirV).is_none());
        assert!(matches!(
            meta.resources[0].kind,
            ResourceKind::StorageBuffer { writable: true, .. }
        ));
    }

    #[test]
    fn duplicate_stage_entry_points_fail_the_file() {
        let src = "@vertex fn a() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }\n\
                   @vertex fn b() -> @builtin(position) vec4<f32> { return vec4<f32>(1.0); }\n";
        let err = compile("dup.fx", src).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Shader(ShaderError::DuplicateEntryPoint { stage: ShaderStage::Vertex, .. })
        ));
    }

    #[test]
    fn syntax_error_in_one_permutation_fails_the_file() {
        let src = "[BROKEN]\n#if TYPE == BROKEN\nthis is not wgsl\n#endif\n@compute @workgroup_size(1) fn main() {}\n";
        let err = compile("broken.fx", src).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Shader(ShaderError::Parse { ref permutation, .. }) if permutation == "BROKEN"
        ));
    }
}
