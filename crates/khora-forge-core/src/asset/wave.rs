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

//! Defines the metadata of a compiled audio clip.

use super::{AssetKind, AssetMetadata};
use serde::{Deserialize, Serialize};

/// Metadata of a validated audio clip.
///
/// The payload is the source file's encoded bytes, untouched; playback
/// decodes them at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveMetadata {
    /// Duration in seconds.
    pub duration: f64,
    /// Samples per second.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Number of sample frames.
    pub frames: u64,
}

impl AssetMetadata for WaveMetadata {
    const KIND: AssetKind = AssetKind::Wave;
}
