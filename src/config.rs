use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    composite::Overflow,
    error::{ConfigError, Result},
    matte::MatteConfig,
    video::ffmpeg::encoder_for_tag,
};

/// Main configuration for greenkey
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mask extraction settings
    pub matte: MatteConfig,

    /// Frame loop settings
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// The first-release behaviour: unrefined mask over a static background
    pub fn legacy() -> Self {
        Self {
            matte: MatteConfig::unrefined(),
            pipeline: PipelineConfig {
                background_mode: BackgroundMode::Static,
                ..PipelineConfig::default()
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.matte.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// Where background frames come from during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    /// Decode the first background frame once and reuse it for every frame
    Static,
    /// Advance the background with the foreground, restarting it when it ends
    #[default]
    Looping,
}

/// Frame loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub background_mode: BackgroundMode,

    /// Overflow behaviour of the additive composite
    pub overflow: Overflow,

    /// Treat a foreground without frames as an empty but successful run
    pub allow_empty_input: bool,

    /// Frames between progress events (0 disables per-frame events)
    pub progress_interval: usize,

    /// Codec tag of the output stream
    pub codec_tag: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            background_mode: BackgroundMode::Looping,
            overflow: Overflow::Wrapping,
            allow_empty_input: false,
            progress_interval: 30,
            codec_tag: "mp4v".to_string(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if encoder_for_tag(&self.codec_tag).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.codec_tag".to_string(),
                value: self.codec_tag.clone()
            }.into());
        }

        Ok(())
    }
}
