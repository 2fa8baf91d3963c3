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

//! Audio clips: a validating pass-through.
//!
//! The clip is decoded once to prove it plays and to measure it; the stored
//! payload is the original encoded file.

mod container;
mod wav;

pub use container::*;
pub use wav::*;

use super::{AssetCompilerLane, CompileError, SourceFile};
use khora_forge_core::asset::{CompiledAsset, WaveMetadata};
use thiserror::Error;

/// Why an audio file was rejected.
#[derive(Debug, Error)]
pub enum WaveError {
    /// The file is malformed or declares an impossible layout.
    #[error("bad parameter: {0}")]
    BadParameter(String),
    /// The file disappeared before it could be read.
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// The container or codec is not supported.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    /// Decoding exceeded a memory limit.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl WaveError {
    /// Classifies an I/O error into one of the named reasons.
    pub fn from_io(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(error.to_string()),
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory(error.to_string()),
            _ => Self::BadParameter(error.to_string()),
        }
    }
}

/// Layout of a decoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample frames in the clip.
    pub frames: u64,
}

impl AudioInfo {
    /// Length of the clip in seconds.
    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Validates `.wav` (via `hound`) and `.ogg`/`.flac`/`.mp3` (via `symphonia`).
#[derive(Debug, Default, Clone, Copy)]
pub struct WaveCompilerLane;

impl WaveCompilerLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }

    /// Decodes `bytes`, choosing the decoder from the file extension.
    pub fn probe(&self, bytes: &[u8], extension: &str) -> Result<AudioInfo, WaveError> {
        if extension.eq_ignore_ascii_case("wav") {
            probe_wav(bytes)
        } else {
            probe_container(bytes, Some(extension))
        }
    }
}

impl AssetCompilerLane for WaveCompilerLane {
    type Metadata = WaveMetadata;

    fn strategy_name(&self) -> &'static str {
        "WaveValidator"
    }

    fn compile(
        &self,
        source: &SourceFile,
    ) -> Result<Vec<CompiledAsset<WaveMetadata>>, CompileError> {
        let bytes = std::fs::read(source.absolute()).map_err(WaveError::from_io)?;
        let extension = source
            .relative()
            .rsplit_once('.')
            .map_or("", |(_, ext)| ext);
        let info = self.probe(&bytes, extension)?;

        let metadata = WaveMetadata {
            duration: info.duration(),
            sample_rate: info.sample_rate,
            channels: info.channels,
            frames: info.frames,
        };
        Ok(vec![CompiledAsset::new(source.relative(), bytes, metadata)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_silence(path: &std::path::Path, millis: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..44100 * millis / 1000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn silence_keeps_its_bytes_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        write_silence(&dir.path().join("clip.wav"), 100);

        let assets = WaveCompilerLane::new()
            .compile(&SourceFile::new(dir.path(), "clip.wav"))
            .unwrap();
        assert_eq!(assets.len(), 1);
        let clip = &assets[0];
        assert_relative_eq!(clip.metadata.duration, 0.1, epsilon = 1e-6);
        assert_eq!(clip.metadata.frames, 4410);
        assert_eq!(clip.payload, std::fs::read(dir.path().join("clip.wav")).unwrap());
    }

    #[test]
    fn missing_file_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let err = WaveCompilerLane::new()
            .compile(&SourceFile::new(dir.path(), "gone.ogg"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Wave(WaveError::FileNotFound(_))));
    }

    #[test]
    fn io_errors_are_classified() {
        use std::io::{Error, ErrorKind};
        assert!(matches!(
            WaveError::from_io(Error::from(ErrorKind::OutOfMemory)),
            WaveError::OutOfMemory(_)
        ));
        assert!(matches!(
            WaveError::from_io(Error::from(ErrorKind::UnexpectedEof)),
            WaveError::BadParameter(_)
        ));
    }
}
