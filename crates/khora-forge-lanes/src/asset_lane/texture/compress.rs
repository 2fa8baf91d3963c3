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

//! Block compression of individual mip levels.
//!
//! BC encoders work on whole 4x4 blocks, so levels whose size is not a
//! multiple of four are padded by repeating their last row and column before
//! encoding. The padding texels are never sampled by the runtime.

use super::TextureError;
use half::f16;
use intel_tex_2::RgbaSurface;
use khora_forge_core::asset::TextureFormat;

/// Encodes one tightly packed RGBA8 level into `format`.
pub fn encode_rgba8(
    format: TextureFormat,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<Vec<u8>, TextureError> {
    check_len(width, height, 4, pixels.len())?;

    match format {
        TextureFormat::Rgba8Unorm => Ok(pixels.to_vec()),
        TextureFormat::Bc1RgbaUnorm | TextureFormat::Bc3RgbaUnorm | TextureFormat::Bc7RgbaUnorm => {
            let (padded, pw, ph) = pad_to_blocks(pixels, width, height, 4);
            let surface = RgbaSurface {
                data: &padded,
                width: pw,
                height: ph,
                stride: pw * 4,
            };
            let mut blocks = vec![0u8; format.level_size(width, height)];
            match format {
                TextureFormat::Bc1RgbaUnorm => {
                    intel_tex_2::bc1::compress_blocks_into(&surface, &mut blocks)
                }
                TextureFormat::Bc3RgbaUnorm => {
                    intel_tex_2::bc3::compress_blocks_into(&surface, &mut blocks)
                }
                _ => intel_tex_2::bc7::compress_blocks_into(
                    &intel_tex_2::bc7::alpha_basic_settings(),
                    &surface,
                    &mut blocks,
                ),
            }
            Ok(blocks)
        }
        TextureFormat::Rgba16Float | TextureFormat::Bc6hRgbUfloat => {
            Err(TextureError::FormatMismatch { format, hdr: false })
        }
    }
}

/// Encodes one tightly packed RGBA `f32` level into `format`.
pub fn encode_rgba32f(
    format: TextureFormat,
    width: u32,
    height: u32,
    pixels: &[f32],
) -> Result<Vec<u8>, TextureError> {
    check_len(width, height, 4, pixels.len())?;

    let halves: Vec<f16> = pixels.iter().map(|&v| f16::from_f32(v)).collect();
    let bytes: &[u8] = bytemuck::cast_slice(&halves);

    match format {
        TextureFormat::Rgba16Float => Ok(bytes.to_vec()),
        TextureFormat::Bc6hRgbUfloat => {
            let (padded, pw, ph) = pad_to_blocks(bytes, width, height, 8);
            let surface = RgbaSurface {
                data: &padded,
                width: pw,
                height: ph,
                stride: pw * 8,
            };
            let mut blocks = vec![0u8; format.level_size(width, height)];
            intel_tex_2::bc6h::compress_blocks_into(
                &intel_tex_2::bc6h::basic_settings(),
                &surface,
                &mut blocks,
            );
            Ok(blocks)
        }
        _ => Err(TextureError::FormatMismatch { format, hdr: true }),
    }
}

fn check_len(width: u32, height: u32, per_pixel: usize, actual: usize) -> Result<(), TextureError> {
    let expected = width as usize * height as usize * per_pixel;
    if actual != expected {
        return Err(TextureError::LevelSize {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Pads a level to a multiple of 4 in both dimensions by edge replication.
///
/// Returns the padded bytes and the padded dimensions.
fn pad_to_blocks(bytes: &[u8], width: u32, height: u32, texel_size: usize) -> (Vec<u8>, u32, u32) {
    let pw = width.div_ceil(4) * 4;
    let ph = height.div_ceil(4) * 4;
    if pw == width && ph == height {
        return (bytes.to_vec(), pw, ph);
    }

    let src_row = width as usize * texel_size;
    let dst_row = pw as usize * texel_size;
    let mut out = vec![0u8; dst_row * ph as usize];
    for y in 0..ph as usize {
        let sy = y.min(height as usize - 1);
        let src = &bytes[sy * src_row..(sy + 1) * src_row];
        let dst = &mut out[y * dst_row..(y + 1) * dst_row];
        dst[..src_row].copy_from_slice(src);
        let last = &src[src_row - texel_size..];
        for x in width as usize..pw as usize {
            dst[x * texel_size..(x + 1) * texel_size].copy_from_slice(last);
        }
    }
    (out, pw, ph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_replicates_edges() {
        let pixels = [1, 1, 1, 1, 2, 2, 2, 2];
        let (padded, pw, ph) = pad_to_blocks(&pixels, 2, 1, 4);
        assert_eq!((pw, ph), (4, 4));
        assert_eq!(padded.len(), 64);
        assert_eq!(&padded[..16], &[1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2]);
        assert_eq!(&padded[48..64], &padded[..16]);
    }

    #[test]
    fn block_formats_emit_one_block_per_four_by_four() {
        let pixels = vec![255u8; 6 * 5 * 4];
        for format in [
            TextureFormat::Bc1RgbaUnorm,
            TextureFormat::Bc3RgbaUnorm,
            TextureFormat::Bc7RgbaUnorm,
        ] {
            let out = encode_rgba8(format, 6, 5, &pixels).unwrap();
            assert_eq!(out.len(), 4 * format.unit_size());
        }
    }

    #[test]
    fn half_float_levels_are_eight_bytes_per_texel() {
        let pixels = vec![1.0f32; 3 * 3 * 4];
        let raw = encode_rgba32f(TextureFormat::Rgba16Float, 3, 3, &pixels).unwrap();
        assert_eq!(raw.len(), 72);
        let bc6 = encode_rgba32f(TextureFormat::Bc6hRgbUfloat, 3, 3, &pixels).unwrap();
        assert_eq!(bc6.len(), 16);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = encode_rgba8(TextureFormat::Rgba8Unorm, 2, 2, &[0; 8]).unwrap_err();
        assert!(matches!(err, TextureError::LevelSize { expected: 16, actual: 8, .. }));
    }
}
