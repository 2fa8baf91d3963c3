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

//! `Assets.toml`: the optional per-project configuration file.

use crate::ConfigError;
use khora_forge_lanes::asset_lane::texture::TextureSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up at the project root.
pub const CONFIG_FILE: &str = "Assets.toml";

/// Settings of the scan loop itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Directory, relative to the project root, receiving the manifest and
    /// the store blobs. It is never scanned.
    pub output_dir: PathBuf,
    /// Minimum time between the starts of two scan cycles.
    pub scan_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            scan_interval_ms: 1000,
        }
    }
}

impl PipelineSettings {
    /// The cycle budget as a [`Duration`].
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Rejects settings the build loop cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::ZeroScanInterval);
        }
        Ok(())
    }
}

/// Represents the structure of the `Assets.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// `[texture]`
    pub texture: TextureSettings,
    /// `[pipeline]`
    pub pipeline: PipelineSettings,
}

impl ForgeConfig {
    /// Loads `Assets.toml` from the project root.
    /// If the file does not exist, it returns the default configuration.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            log::info!("No '{}' found. Using default configuration.", path.display());
            return Ok(Self::default());
        }
        Self::load_file(&path)
    }

    /// Loads a configuration from an explicit file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.pipeline.validate()?;
        log::info!("Loaded configuration from '{}'.", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khora_forge_core::asset::TextureFormat;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ForgeConfig::load(dir.path()).unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert_eq!(config.pipeline.output_dir, PathBuf::from("generated"));
        assert_eq!(config.pipeline.scan_interval(), Duration::from_secs(1));
        assert_eq!(config.texture.target_format, TextureFormat::Bc7RgbaUnorm);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[texture]\ntarget_format = \"bc1\"\ngenerate_mips = false\n\n[pipeline]\nscan_interval_ms = 250\n",
        )
        .unwrap();
        let config = ForgeConfig::load(dir.path()).unwrap();
        assert_eq!(config.texture.target_format, TextureFormat::Bc1RgbaUnorm);
        assert!(!config.texture.generate_mips);
        assert!(config.texture.compress);
        assert_eq!(config.pipeline.scan_interval_ms, 250);
        assert_eq!(config.pipeline.output_dir, PathBuf::from("generated"));
    }

    #[test]
    fn zero_scan_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[pipeline]\nscan_interval_ms = 0\n").unwrap();
        assert!(matches!(
            ForgeConfig::load(dir.path()),
            Err(ConfigError::ZeroScanInterval)
        ));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[texture]\ntarget_format = \"dxt9\"\n").unwrap();
        assert!(matches!(
            ForgeConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
