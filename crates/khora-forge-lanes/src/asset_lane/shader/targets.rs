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

//! Stage lookup and the SPIR-V / MSL back ends.

use super::ShaderError;
use khora_forge_core::asset::{ShaderStage, ShaderTarget};
use naga::back::{msl, spv};
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// The WGSL stage a forge stage compiles from, if WGSL has one.
pub fn naga_stage(stage: ShaderStage) -> Option<naga::ShaderStage> {
    match stage {
        ShaderStage::Vertex => Some(naga::ShaderStage::Vertex),
        ShaderStage::Pixel => Some(naga::ShaderStage::Fragment),
        ShaderStage::Compute => Some(naga::ShaderStage::Compute),
        ShaderStage::Geometry | ShaderStage::Hull | ShaderStage::Domain => None,
    }
}

/// The forge stage of a naga entry point.
#[allow(unreachable_patterns)]
pub fn forge_stage(stage: naga::ShaderStage) -> Option<ShaderStage> {
    match stage {
        naga::ShaderStage::Vertex => Some(ShaderStage::Vertex),
        naga::ShaderStage::Fragment => Some(ShaderStage::Pixel),
        naga::ShaderStage::Compute => Some(ShaderStage::Compute),
        _ => None,
    }
}

/// Validates a module with every capability enabled.
pub fn validate(module: &naga::Module) -> Result<naga::valid::ModuleInfo, String> {
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(module)
        .map_err(|e| e.into_inner().to_string())
}

/// Finds the single entry point of `stage`.
///
/// `Ok(None)` means the stage is absent and should be skipped.
pub fn find_entry_point(
    module: &naga::Module,
    stage: ShaderStage,
    permutation: &str,
) -> Result<Option<usize>, ShaderError> {
    let Some(naga_stage) = naga_stage(stage) else {
        return Ok(None);
    };
    let mut found = module
        .entry_points
        .iter()
        .enumerate()
        .filter(|(_, ep)| ep.stage == naga_stage)
        .map(|(index, _)| index);
    let first = found.next();
    if found.next().is_some() {
        return Err(ShaderError::DuplicateEntryPoint {
            permutation: permutation.to_string(),
            stage,
        });
    }
    Ok(first)
}

/// Compiled bytes of one entry point for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// Entry point name inside the bytes.
    pub entry_point: String,
    /// SPIR-V words (little endian) or MSL text.
    pub bytes: Vec<u8>,
}

/// Writes one entry point of a validated module for `target`.
pub fn write_target(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    entry_point: usize,
    target: ShaderTarget,
) -> Result<StageOutput, String> {
    let ep = module
        .entry_points
        .get(entry_point)
        .ok_or_else(|| format!("no entry point {entry_point}"))?;
    match target {
        ShaderTarget::SpirV => {
            let pipeline = spv::PipelineOptions {
                shader_stage: ep.stage,
                entry_point: ep.name.clone(),
            };
            let words = spv::write_vec(module, info, &spv::Options::default(), Some(&pipeline))
                .map_err(|e| e.to_string())?;
            Ok(StageOutput {
                entry_point: ep.name.clone(),
                bytes: bytemuck::cast_slice(&words).to_vec(),
            })
        }
        ShaderTarget::Msl => {
            // MSL writes every entry point of a module; keep only this one.
            let mut single = module.clone();
            single
                .entry_points
                .retain(|other| other.stage == ep.stage && other.name == ep.name);
            let single_info = validate(&single)?;
            let options = msl::Options {
                lang_version: (2, 0),
                ..Default::default()
            };
            let (text, translation) = msl::write_string(
                &single,
                &single_info,
                &options,
                &msl::PipelineOptions::default(),
            )
            .map_err(|e| e.to_string())?;
            let entry_point = match translation.entry_point_names.into_iter().next() {
                Some(Ok(name)) => name,
                Some(Err(e)) => return Err(e.to_string()),
                None => return Err(format!("no MSL entry point for '{}'", ep.name)),
            };
            Ok(StageOutput {
                entry_point,
                bytes: text.into_bytes(),
            })
        }
    }
}
