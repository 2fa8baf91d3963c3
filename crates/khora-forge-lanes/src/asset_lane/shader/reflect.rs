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

//! Resource reflection over a validated module.

use super::forge_stage;
use khora_forge_core::asset::{
    ConstantBufferMember, ResourceKind, ShaderResource, ShaderStageFlags,
};
use naga::{AddressSpace, StorageAccess, TypeInner};

/// Lists every bound global that at least one entry point uses.
///
/// Resources are ordered by group then binding.
pub fn reflect(module: &naga::Module, info: &naga::valid::ModuleInfo) -> Vec<ShaderResource> {
    let ctx = module.to_ctx();
    let mut resources = Vec::new();

    for (handle, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };

        let mut stages = ShaderStageFlags::NONE;
        for (index, entry_point) in module.entry_points.iter().enumerate() {
            let Some(stage) = forge_stage(entry_point.stage) else {
                continue;
            };
            if !info.get_entry_point(index)[handle].is_empty() {
                stages |= ShaderStageFlags::from_stage(stage);
            }
        }
        if stages.is_empty() {
            continue;
        }

        let Some(kind) = resource_kind(module, var, &ctx) else {
            log::debug!(
                "Skipping binding {}:{} of unsupported type",
                binding.group,
                binding.binding
            );
            continue;
        };

        resources.push(ShaderResource {
            name: var.name.clone().unwrap_or_default(),
            group: binding.group,
            binding: binding.binding,
            kind,
            stages,
        });
    }

    resources.sort_by_key(|r| (r.group, r.binding));
    resources
}

fn resource_kind(
    module: &naga::Module,
    var: &naga::GlobalVariable,
    ctx: &naga::proc::GlobalCtx<'_>,
) -> Option<ResourceKind> {
    let inner = &module.types[var.ty].inner;
    match var.space {
        AddressSpace::Uniform => {
            let members = match inner {
                TypeInner::Struct { members, .. } => members
                    .iter()
                    .map(|m| ConstantBufferMember {
                        name: m.name.clone().unwrap_or_default(),
                        size: module.types[m.ty].inner.size(*ctx),
                        offset: m.offset,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Some(ResourceKind::ConstantBuffer {
                size: inner.size(*ctx),
                members,
            })
        }
        AddressSpace::Storage { access } => Some(ResourceKind::StorageBuffer {
            size: inner.size(*ctx),
            writable: access.contains(StorageAccess::STORE),
        }),
        AddressSpace::Handle => {
            let base = match inner {
                TypeInner::BindingArray { base, .. } => &module.types[*base].inner,
                other => other,
            };
            match base {
                TypeInner::Image { .. } => Some(ResourceKind::Texture),
                TypeInner::Sampler { .. } => Some(ResourceKind::Sampler),
                _ => None,
            }
        }
        _ => None,
    }
}
