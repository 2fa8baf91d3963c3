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

//! Validation of `.wav` files with `hound`.

use super::{AudioInfo, WaveError};
use std::io::Cursor;

/// Decodes every sample of a WAV file and reports its layout.
pub fn probe_wav(bytes: &[u8]) -> Result<AudioInfo, WaveError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(map_hound)?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(WaveError::BadParameter(format!(
            "{} channel(s) at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => count_samples(reader.samples::<f32>())?,
        hound::SampleFormat::Int => count_samples(reader.samples::<i32>())?,
    };
    if samples % spec.channels as u64 != 0 {
        return Err(WaveError::BadParameter(format!(
            "{} samples do not fill {} channel(s)",
            samples, spec.channels
        )));
    }

    Ok(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: samples / spec.channels as u64,
    })
}

fn count_samples<S>(samples: impl Iterator<Item = hound::Result<S>>) -> Result<u64, WaveError> {
    let mut count = 0;
    for sample in samples {
        sample.map_err(map_hound)?;
        count += 1;
    }
    Ok(count)
}

fn map_hound(error: hound::Error) -> WaveError {
    match error {
        hound::Error::IoError(e) => WaveError::from_io(e),
        hound::Error::Unsupported => WaveError::UnsupportedCodec("unsupported WAV encoding".into()),
        hound::Error::InvalidSampleFormat => {
            WaveError::UnsupportedCodec("invalid WAV sample format".into())
        }
        other => WaveError::BadParameter(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 16-bit mono 44.1 kHz, four samples.
    const FOUR_SAMPLES: &[u8] = &[
        82, 73, 70, 70, 52, 0, 0, 0, 87, 65, 86, 69, 102, 109, 116, 32, 16, 0, 0, 0, 1, 0, 1, 0,
        68, 172, 0, 0, 136, 88, 1, 0, 2, 0, 16, 0, 100, 97, 116, 97, 8, 0, 0, 0, 0, 12, 204, 251,
        51, 13, 205, 243,
    ];

    #[test]
    fn wav_layout_is_reported() {
        let info = probe_wav(FOUR_SAMPLES).unwrap();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 1);
        assert_eq!(info.frames, 4);
    }

    #[test]
    fn garbage_is_a_bad_parameter() {
        assert!(matches!(
            probe_wav(&[0, 1, 2, 3, 4]),
            Err(WaveError::BadParameter(_))
        ));
    }

    #[test]
    fn truncated_data_chunk_is_rejected() {
        let truncated = &FOUR_SAMPLES[..FOUR_SAMPLES.len() - 3];
        assert!(probe_wav(truncated).is_err());
    }
}
