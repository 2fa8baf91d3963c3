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

//! Mip chain generation.

use image::{imageops::FilterType, RgbaImage};

/// Number of levels in a full chain for an image of the given size.
pub fn mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Builds a full mip chain, largest level first, down to 1x1.
///
/// Each level halves the previous one (rounding down, never below 1) with a
/// triangle filter.
pub fn generate_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_count(base.width(), base.height()) as usize;
    let mut chain = Vec::with_capacity(count);
    chain.push(base);

    while chain.len() < count {
        let prev = &chain[chain.len() - 1];
        let width = (prev.width() / 2).max(1);
        let height = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, width, height, FilterType::Triangle);
        chain.push(next);
    }
    chain
}
