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

//! Compiled shader programs: per-stage, per-target bytecode and the resources
//! the stages bind.

use super::{AssetKind, AssetMetadata};
use serde::{Deserialize, Serialize};

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Pixel (fragment) stage.
    Pixel,
    /// Geometry stage.
    Geometry,
    /// Compute stage.
    Compute,
    /// Hull (tessellation control) stage.
    Hull,
    /// Domain (tessellation evaluation) stage.
    Domain,
}

impl ShaderStage {
    /// Every stage, in compilation order.
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::Pixel,
        ShaderStage::Geometry,
        ShaderStage::Compute,
        ShaderStage::Hull,
        ShaderStage::Domain,
    ];
}

/// A bytecode representation a stage is compiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderTarget {
    /// SPIR-V words, the portable intermediate representation.
    SpirV,
    /// Metal Shading Language source, the native backend format.
    Msl,
}

impl ShaderTarget {
    /// Every target, in compilation order.
    pub const ALL: [ShaderTarget; 2] = [ShaderTarget::SpirV, ShaderTarget::Msl];
}

/// Set of stages that use a resource, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShaderStageFlags {
    bits: u32,
}

impl ShaderStageFlags {
    /// No shader stages.
    pub const NONE: Self = Self { bits: 0 };

    /// Creates flags from a single shader stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        Self {
            bits: 1 << stage as u32,
        }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain a specific stage.
    pub const fn contains(&self, stage: ShaderStage) -> bool {
        let stage_bits = Self::from_stage(stage).bits;
        (self.bits & stage_bits) == stage_bits
    }

    /// Checks if these flags are empty (no stages).
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for ShaderStageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ShaderStageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Where one stage's bytecode for one target lives in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBytecode {
    /// The stage.
    pub stage: ShaderStage,
    /// The bytecode representation.
    pub target: ShaderTarget,
    /// Entry point name inside the bytecode.
    pub entry_point: String,
    /// Byte offset in the payload.
    pub offset: usize,
    /// Byte length in the payload.
    pub length: usize,
}

/// One member of a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantBufferMember {
    /// Member name.
    pub name: String,
    /// Size in bytes.
    pub size: u32,
    /// Offset from the start of the buffer in bytes.
    pub offset: u32,
}

/// What kind of resource a binding is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A uniform (constant) buffer and its layout.
    ConstantBuffer {
        /// Total size in bytes.
        size: u32,
        /// Members in declaration order.
        members: Vec<ConstantBufferMember>,
    },
    /// A storage buffer.
    StorageBuffer {
        /// Size in bytes of the fixed part.
        size: u32,
        /// Whether shaders may write to it.
        writable: bool,
    },
    /// A sampled or storage texture.
    Texture,
    /// A sampler.
    Sampler,
}

/// A resource bound by at least one stage of a permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderResource {
    /// Variable name in the source.
    pub name: String,
    /// Bind group / descriptor set.
    pub group: u32,
    /// Binding slot inside the group.
    pub binding: u32,
    /// Resource type and layout.
    pub kind: ResourceKind,
    /// Stages that reference it.
    pub stages: ShaderStageFlags,
}

/// Metadata of one compiled shader permutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderMetadata {
    /// Name of the permutation, `DEFAULT` for the implicit one.
    pub permutation: String,
    /// Every compiled (stage, target) pair.
    pub bytecode: Vec<StageBytecode>,
    /// Reflected resources, ordered by group then binding.
    pub resources: Vec<ShaderResource>,
}

impl ShaderMetadata {
    /// Returns where the bytecode of `stage` for `target` lives, if compiled.
    pub fn bytecode(&self, stage: ShaderStage, target: ShaderTarget) -> Option<&StageBytecode> {
        self.bytecode
            .iter()
            .find(|b| b.stage == stage && b.target == target)
    }

    /// The stages present in this permutation.
    pub fn stages(&self) -> ShaderStageFlags {
        self.bytecode
            .iter()
            .fold(ShaderStageFlags::NONE, |acc, b| acc | ShaderStageFlags::from_stage(b.stage))
    }
}

impl AssetMetadata for ShaderMetadata {
    const KIND: AssetKind = AssetKind::Shader;
}
