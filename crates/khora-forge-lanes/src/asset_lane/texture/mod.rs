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

//! Texture compilation: decode, generate mips, block-compress, package.

mod compress;
mod mips;

pub use compress::*;
pub use mips::*;

use super::{AssetCompilerLane, CompileError, SourceFile};
use image::DynamicImage;
use khora_forge_core::asset::{
    CompiledAsset, MipLevel, TextureContainer, TextureFlags, TextureFormat, TextureMetadata,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while compiling a texture.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The image could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    /// The image has a zero dimension.
    #[error("image has an empty dimension ({width}x{height})")]
    Empty {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },
    /// The configured format cannot hold this kind of image.
    #[error("format {format:?} cannot encode {} images", if *hdr { "HDR" } else { "LDR" })]
    FormatMismatch {
        /// The configured format.
        format: TextureFormat,
        /// Whether the source was HDR.
        hdr: bool,
    },
    /// A level's byte length does not match its dimensions.
    #[error("level of {width}x{height} has {actual} bytes, expected {expected}")]
    LevelSize {
        /// Level width.
        width: u32,
        /// Level height.
        height: u32,
        /// Bytes expected for the input layout.
        expected: usize,
        /// Bytes provided.
        actual: usize,
    },
}

/// How textures are compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Generate a full mip chain for LDR images.
    pub generate_mips: bool,
    /// Block-compress the levels; otherwise they are stored uncompressed.
    pub compress: bool,
    /// Compressed format for LDR images.
    pub target_format: TextureFormat,
    /// Compressed format for HDR images.
    pub hdr_format: TextureFormat,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            generate_mips: true,
            compress: true,
            target_format: TextureFormat::Bc7RgbaUnorm,
            hdr_format: TextureFormat::Bc6hRgbUfloat,
        }
    }
}

/// A lane dedicated to compiling image files into block-compressed textures.
#[derive(Debug, Clone, Default)]
pub struct TextureCompilerLane {
    settings: TextureSettings,
}

impl TextureCompilerLane {
    /// Creates a lane with the given settings.
    pub fn new(settings: TextureSettings) -> Self {
        Self { settings }
    }

    /// The settings this lane compiles with.
    pub fn settings(&self) -> &TextureSettings {
        &self.settings
    }

    fn ldr_format(&self) -> Result<TextureFormat, TextureError> {
        if !self.settings.compress {
            return Ok(TextureFormat::Rgba8Unorm);
        }
        let format = self.settings.target_format;
        if format.is_hdr() {
            return Err(TextureError::FormatMismatch { format, hdr: false });
        }
        Ok(format)
    }

    fn hdr_format(&self) -> Result<TextureFormat, TextureError> {
        if !self.settings.compress {
            return Ok(TextureFormat::Rgba16Float);
        }
        let format = self.settings.hdr_format;
        if !format.is_hdr() {
            return Err(TextureError::FormatMismatch { format, hdr: true });
        }
        Ok(format)
    }

    fn compile_ldr(&self, image: &DynamicImage) -> Result<(Vec<MipLevel>, TextureFormat, TextureFlags), TextureError> {
        let format = self.ldr_format()?;
        let base = image.to_rgba8();

        let mut flags = TextureFlags::NONE;
        if has_alpha_rgba8(base.as_raw()) {
            flags |= TextureFlags::HAS_ALPHA;
        }

        let chain = if self.settings.generate_mips {
            flags |= TextureFlags::MIPMAPPED;
            generate_mip_chain(base)
        } else {
            vec![base]
        };

        let levels = chain
            .iter()
            .map(|level| {
                let (width, height) = level.dimensions();
                Ok(MipLevel {
                    width,
                    height,
                    data: encode_rgba8(format, width, height, level.as_raw())?,
                })
            })
            .collect::<Result<Vec<_>, TextureError>>()?;

        Ok((levels, format, flags))
    }

    fn compile_hdr(&self, image: &DynamicImage) -> Result<(Vec<MipLevel>, TextureFormat, TextureFlags), TextureError> {
        let format = self.hdr_format()?;
        let base = image.to_rgba32f();
        let (width, height) = base.dimensions();

        let mut flags = TextureFlags::HDR;
        if base.pixels().any(|p| p.0[3] < 1.0) {
            flags |= TextureFlags::HAS_ALPHA;
        }

        let data = encode_rgba32f(format, width, height, base.as_raw())?;
        Ok((vec![MipLevel { width, height, data }], format, flags))
    }
}

impl AssetCompilerLane for TextureCompilerLane {
    type Metadata = TextureMetadata;

    fn strategy_name(&self) -> &'static str {
        "TextureCompiler"
    }

    fn compile(
        &self,
        source: &SourceFile,
    ) -> Result<Vec<CompiledAsset<TextureMetadata>>, CompileError> {
        let bytes = source.read()?;
        let image = image::load_from_memory(&bytes).map_err(TextureError::from)?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height }.into());
        }

        let (levels, format, mut flags) = if is_hdr_image(&image) {
            self.compile_hdr(&image)?
        } else {
            self.compile_ldr(&image)?
        };
        if format.is_compressed() {
            flags |= TextureFlags::COMPRESSED;
        }

        let payload = TextureContainer::encode(format, flags, width, height, &levels);
        let metadata = TextureMetadata {
            width,
            height,
            mip_count: levels.len() as u32,
            format,
            flags,
        };

        Ok(vec![CompiledAsset::new(source.relative(), payload, metadata)])
    }
}

fn is_hdr_image(image: &DynamicImage) -> bool {
    matches!(image, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_))
}

/// Whether any pixel of a tightly packed RGBA8 buffer is not fully opaque.
pub fn has_alpha_rgba8(pixels: &[u8]) -> bool {
    pixels.chunks_exact(4).any(|p| p[3] != u8::MAX)
}
