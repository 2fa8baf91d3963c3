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

//! Validation of compressed containers (Ogg, FLAC, MP3...) with `symphonia`.

use super::{AudioInfo, WaveError};
use std::io::Cursor;
use symphonia::core::{
    codecs::DecoderOptions, errors::Error as SymphoniaError, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

/// Decodes every packet of the default track and reports its layout.
///
/// `extension` is only a probing hint.
pub fn probe_container(bytes: &[u8], extension: Option<&str>) -> Result<AudioInfo, WaveError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(map_symphonia)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .default_track()
        .ok_or_else(|| WaveError::BadParameter("no default audio track".into()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(map_symphonia)?;

    let mut frames = 0u64;
    let mut sample_rate = params.sample_rate;
    let mut channels = params.channels.map(|c| c.count() as u16);
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            // End of stream.
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(map_symphonia(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);
                frames += decoded.frames() as u64;
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                log::warn!("Skipping undecodable packet: {}", reason);
            }
            Err(e) => return Err(map_symphonia(e)),
        }
    }

    match (sample_rate, channels) {
        (Some(sample_rate), Some(channels)) if sample_rate > 0 && channels > 0 => Ok(AudioInfo {
            sample_rate,
            channels,
            frames,
        }),
        _ => Err(WaveError::BadParameter(
            "unknown sample rate or channel layout".into(),
        )),
    }
}

fn map_symphonia(error: SymphoniaError) -> WaveError {
    match error {
        SymphoniaError::IoError(e) => WaveError::from_io(e),
        SymphoniaError::Unsupported(what) => WaveError::UnsupportedCodec(what.to_string()),
        SymphoniaError::LimitError(what) => WaveError::OutOfMemory(what.to_string()),
        other => WaveError::BadParameter(other.to_string()),
    }
}
