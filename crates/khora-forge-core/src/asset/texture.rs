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

//! Compiled texture formats, flags and the payload container layout.

use super::{AssetKind, AssetMetadata};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// The pixel encoding of a compiled texture's mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// Uncompressed 8-bit RGBA.
    #[serde(rename = "rgba8")]
    Rgba8Unorm,
    /// Uncompressed half-float RGBA.
    #[serde(rename = "rgba16f")]
    Rgba16Float,
    /// BC1, 4 bits per pixel, 1-bit alpha.
    #[serde(rename = "bc1")]
    Bc1RgbaUnorm,
    /// BC3, 8 bits per pixel, interpolated alpha.
    #[serde(rename = "bc3")]
    Bc3RgbaUnorm,
    /// BC7, 8 bits per pixel, high quality RGBA.
    #[serde(rename = "bc7")]
    Bc7RgbaUnorm,
    /// BC6H, 8 bits per pixel, unsigned half-float RGB.
    #[serde(rename = "bc6h")]
    Bc6hRgbUfloat,
}

impl TextureFormat {
    /// Whether the format stores 4x4 compressed blocks.
    pub const fn is_compressed(&self) -> bool {
        !matches!(self, TextureFormat::Rgba8Unorm | TextureFormat::Rgba16Float)
    }

    /// Whether the format carries high dynamic range data.
    pub const fn is_hdr(&self) -> bool {
        matches!(self, TextureFormat::Rgba16Float | TextureFormat::Bc6hRgbUfloat)
    }

    /// Bytes per 4x4 block for compressed formats, bytes per pixel otherwise.
    pub const fn unit_size(&self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Bc1RgbaUnorm => 8,
            TextureFormat::Bc3RgbaUnorm | TextureFormat::Bc7RgbaUnorm => 16,
            TextureFormat::Bc6hRgbUfloat => 16,
        }
    }

    /// The number of bytes one mip level of the given size occupies.
    pub fn level_size(&self, width: u32, height: u32) -> usize {
        if self.is_compressed() {
            let blocks_x = width.div_ceil(4) as usize;
            let blocks_y = height.div_ceil(4) as usize;
            blocks_x * blocks_y * self.unit_size()
        } else {
            width as usize * height as usize * self.unit_size()
        }
    }

    /// The numeric tag written into the container header.
    pub const fn tag(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 1,
            TextureFormat::Rgba16Float => 2,
            TextureFormat::Bc1RgbaUnorm => 10,
            TextureFormat::Bc3RgbaUnorm => 11,
            TextureFormat::Bc7RgbaUnorm => 12,
            TextureFormat::Bc6hRgbUfloat => 13,
        }
    }

    /// Resolves a container header tag.
    pub fn from_tag(tag: u32) -> Option<Self> {
        [
            TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba16Float,
            TextureFormat::Bc1RgbaUnorm,
            TextureFormat::Bc3RgbaUnorm,
            TextureFormat::Bc7RgbaUnorm,
            TextureFormat::Bc6hRgbUfloat,
        ]
        .into_iter()
        .find(|format| format.tag() == tag)
    }
}

/// Properties of a compiled texture, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureFlags {
    bits: u32,
}

impl TextureFlags {
    /// No flags.
    pub const NONE: Self = Self { bits: 0 };
    /// At least one source pixel is not fully opaque.
    pub const HAS_ALPHA: Self = Self { bits: 1 << 0 };
    /// The source was a high dynamic range image.
    pub const HDR: Self = Self { bits: 1 << 1 };
    /// The payload holds a full mip chain.
    pub const MIPMAPPED: Self = Self { bits: 1 << 2 };
    /// The payload is block compressed.
    pub const COMPRESSED: Self = Self { bits: 1 << 3 };

    /// Creates a set of flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
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

    /// Checks whether every flag of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for TextureFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for TextureFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Metadata of a compiled texture. The payload is a [`TextureContainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMetadata {
    /// Width of the top mip level in pixels.
    pub width: u32,
    /// Height of the top mip level in pixels.
    pub height: u32,
    /// Number of mip levels in the payload.
    pub mip_count: u32,
    /// Encoding of every mip level.
    pub format: TextureFormat,
    /// Alpha, HDR and compression properties.
    pub flags: TextureFlags,
}

impl AssetMetadata for TextureMetadata {
    const KIND: AssetKind = AssetKind::Texture;
}

const CONTAINER_MAGIC: u32 = u32::from_le_bytes(*b"KTEX");
const CONTAINER_VERSION: u32 = 1;

/// Fixed-size header at the start of a texture payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct TextureHeader {
    /// Always `KTEX`.
    pub magic: u32,
    /// Container layout version.
    pub version: u32,
    /// [`TextureFormat::tag`].
    pub format: u32,
    /// Width of the top level.
    pub width: u32,
    /// Height of the top level.
    pub height: u32,
    /// Number of entries in the mip table.
    pub mip_count: u32,
    /// [`TextureFlags::bits`].
    pub flags: u32,
    /// Keeps the header a multiple of eight bytes.
    pub reserved: u32,
}

/// One row of the mip table following the header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MipEntry {
    /// Byte offset of the level from the start of the payload.
    pub offset: u64,
    /// Byte length of the level.
    pub length: u64,
    /// Width of the level in pixels.
    pub width: u32,
    /// Height of the level in pixels.
    pub height: u32,
}

/// One encoded mip level handed to [`TextureContainer::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    /// Width of the level in pixels.
    pub width: u32,
    /// Height of the level in pixels.
    pub height: u32,
    /// The encoded level.
    pub data: Vec<u8>,
}

/// Reasons a texture payload cannot be read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The payload is shorter than its header or mip table claims.
    Truncated,
    /// The magic number does not match.
    BadMagic,
    /// The container was written by an unknown layout version.
    UnsupportedVersion(u32),
    /// The format tag is unknown.
    UnknownFormat(u32),
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerError::Truncated => write!(f, "texture container is truncated"),
            ContainerError::BadMagic => write!(f, "not a texture container"),
            ContainerError::UnsupportedVersion(v) => {
                write!(f, "unsupported texture container version {v}")
            }
            ContainerError::UnknownFormat(tag) => write!(f, "unknown texture format tag {tag}"),
        }
    }
}

impl std::error::Error for ContainerError {}

/// A parsed view over a texture payload.
#[derive(Debug, Clone)]
pub struct TextureContainer<'a> {
    /// The decoded header.
    pub header: TextureHeader,
    /// The decoded format.
    pub format: TextureFormat,
    /// The decoded flags.
    pub flags: TextureFlags,
    /// The mip table.
    pub mips: Vec<MipEntry>,
    bytes: &'a [u8],
}

impl<'a> TextureContainer<'a> {
    /// Packs encoded mip levels into a payload: header, mip table, level data.
    pub fn encode(
        format: TextureFormat,
        flags: TextureFlags,
        width: u32,
        height: u32,
        levels: &[MipLevel],
    ) -> Vec<u8> {
        let header = TextureHeader {
            magic: CONTAINER_MAGIC,
            version: CONTAINER_VERSION,
            format: format.tag(),
            width,
            height,
            mip_count: levels.len() as u32,
            flags: flags.bits(),
            reserved: 0,
        };

        let table_start = std::mem::size_of::<TextureHeader>();
        let data_start = table_start + levels.len() * std::mem::size_of::<MipEntry>();
        let mut offset = data_start as u64;
        let table: Vec<MipEntry> = levels
            .iter()
            .map(|level| {
                let entry = MipEntry {
                    offset,
                    length: level.data.len() as u64,
                    width: level.width,
                    height: level.height,
                };
                offset += entry.length;
                entry
            })
            .collect();

        let mut out = Vec::with_capacity(offset as usize);
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(bytemuck::cast_slice(&table));
        for level in levels {
            out.extend_from_slice(&level.data);
        }
        out
    }

    /// Parses a payload produced by [`TextureContainer::encode`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContainerError> {
        let header_size = std::mem::size_of::<TextureHeader>();
        let header_bytes = bytes.get(..header_size).ok_or(ContainerError::Truncated)?;
        let header: TextureHeader = bytemuck::pod_read_unaligned(header_bytes);
        if header.magic != CONTAINER_MAGIC {
            return Err(ContainerError::BadMagic);
        }
        if header.version != CONTAINER_VERSION {
            return Err(ContainerError::UnsupportedVersion(header.version));
        }
        let format =
            TextureFormat::from_tag(header.format).ok_or(ContainerError::UnknownFormat(header.format))?;

        let entry_size = std::mem::size_of::<MipEntry>();
        let mut mips = Vec::with_capacity(header.mip_count as usize);
        for i in 0..header.mip_count as usize {
            let start = header_size + i * entry_size;
            let entry_bytes = bytes
                .get(start..start + entry_size)
                .ok_or(ContainerError::Truncated)?;
            let entry: MipEntry = bytemuck::pod_read_unaligned(entry_bytes);
            let end = entry.offset.checked_add(entry.length).ok_or(ContainerError::Truncated)?;
            if end > bytes.len() as u64 {
                return Err(ContainerError::Truncated);
            }
            mips.push(entry);
        }

        Ok(Self {
            header,
            format,
            flags: TextureFlags::from_bits(header.flags),
            mips,
            bytes,
        })
    }

    /// Returns the encoded bytes of one mip level.
    pub fn level(&self, index: usize) -> Option<&'a [u8]> {
        let entry = self.mips.get(index)?;
        self.bytes
            .get(entry.offset as usize..(entry.offset + entry.length) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_level_sizes_round_up_to_blocks() {
        assert_eq!(TextureFormat::Bc7RgbaUnorm.level_size(1, 1), 16);
        assert_eq!(TextureFormat::Bc1RgbaUnorm.level_size(5, 4), 16);
        assert_eq!(TextureFormat::Rgba8Unorm.level_size(3, 2), 24);
    }

    #[test]
    fn flags_combine() {
        let flags = TextureFlags::MIPMAPPED | TextureFlags::COMPRESSED;
        assert!(flags.contains(TextureFlags::MIPMAPPED));
        assert!(!flags.contains(TextureFlags::HAS_ALPHA));
        assert!(TextureFlags::NONE.is_empty());
    }

    #[test]
    fn container_exposes_levels_in_order() {
        let levels = vec![
            MipLevel { width: 2, height: 2, data: vec![1; 16] },
            MipLevel { width: 1, height: 1, data: vec![2; 4] },
        ];
        let payload = TextureContainer::encode(
            TextureFormat::Rgba8Unorm,
            TextureFlags::MIPMAPPED,
            2,
            2,
            &levels,
        );
        let container = TextureContainer::parse(&payload).unwrap();
        assert_eq!(container.format, TextureFormat::Rgba8Unorm);
        assert_eq!(container.mips.len(), 2);
        assert_eq!(container.level(0).unwrap(), &[1; 16][..]);
        assert_eq!(container.level(1).unwrap(), &[2; 4][..]);
        assert_eq!(container.mips[1].width, 1);
    }

    #[test]
    fn truncated_container_is_rejected() {
        let payload = TextureContainer::encode(
            TextureFormat::Rgba8Unorm,
            TextureFlags::NONE,
            1,
            1,
            &[MipLevel { width: 1, height: 1, data: vec![0; 4] }],
        );
        let cut = &payload[..payload.len() - 1];
        assert_eq!(TextureContainer::parse(cut).unwrap_err(), ContainerError::Truncated);
        assert_eq!(TextureContainer::parse(&[0; 8]).unwrap_err(), ContainerError::Truncated);
    }
}
