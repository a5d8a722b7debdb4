use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    error::{ConfigError, Result},
    transport::{default_shm_path, DEFAULT_SLOT_COUNT, DEFAULT_SLOT_SIZE},
    video::{
        encoder::{self, DEFAULT_QUALITY, DEFAULT_QUALITY_LADDER},
        Frame,
    },
};

/// Main configuration for glitchframe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Effect pipeline settings
    pub pipeline: PipelineConfig,

    /// Adaptive frame encoder settings
    pub encoder: EncoderConfig,

    /// Shared-memory preview transport settings
    pub ring_buffer: RingBufferConfig,

    /// Background export settings
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
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

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.encoder.validate()?;
        self.ring_buffer.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> crate::error::GlitchError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn valid_quality(quality: u8) -> bool {
    (1..=100).contains(&quality)
}

/// Effect pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Effects taking longer than this (milliseconds) are logged as slow
    pub slow_effect_warn_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slow_effect_warn_ms: 100,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.slow_effect_warn_ms == 0 {
            return Err(invalid("pipeline.slow_effect_warn_ms", self.slow_effect_warn_ms));
        }
        Ok(())
    }
}

/// Frame encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// JPEG qualities tried from highest to lowest
    pub quality_ladder: Vec<u8>,

    /// Byte budget for one encoded frame
    pub max_frame_bytes: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality_ladder: DEFAULT_QUALITY_LADDER.to_vec(),
            // one default ring slot minus its length prefix
            max_frame_bytes: DEFAULT_SLOT_SIZE as usize - 4,
        }
    }
}

impl EncoderConfig {
    /// Encode `frame` within `max_frame_bytes`, walking down `quality_ladder`.
    ///
    /// Returns the JPEG bytes and the quality that produced them.
    pub fn encode(&self, frame: &Frame) -> Result<(Vec<u8>, u8)> {
        encoder::encode_fit(frame, self.max_frame_bytes, &self.quality_ladder)
    }

    fn validate(&self) -> Result<()> {
        if self.quality_ladder.is_empty() {
            return Err(invalid("encoder.quality_ladder", "[]"));
        }

        if let Some(bad) = self.quality_ladder.iter().find(|q| !valid_quality(**q)) {
            return Err(invalid("encoder.quality_ladder", bad));
        }

        if self.max_frame_bytes == 0 {
            return Err(invalid("encoder.max_frame_bytes", self.max_frame_bytes));
        }

        Ok(())
    }
}

/// Shared-memory ring buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingBufferConfig {
    /// Backing file; see [`RingBufferConfig::resolve_path`] when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Number of frame slots
    pub slot_count: u32,

    /// Bytes per slot, including the 4-byte length prefix
    pub slot_size: u32,

    /// Fixed JPEG quality for preview frames
    pub quality: u8,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            path: None,
            slot_count: DEFAULT_SLOT_COUNT,
            slot_size: DEFAULT_SLOT_SIZE,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl RingBufferConfig {
    /// Configured path, else `$GLITCHFRAME_SHM_PATH`, else `$HOME/.cache/glitchframe/frames`
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_shm_path)
    }

    fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(invalid("ring_buffer.slot_count", self.slot_count));
        }

        if self.slot_size <= 4 {
            return Err(invalid("ring_buffer.slot_size", self.slot_size));
        }

        if !valid_quality(self.quality) {
            return Err(invalid("ring_buffer.quality", self.quality));
        }

        Ok(())
    }
}

/// Background export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// ffmpeg video codec for exported files
    pub codec: String,

    /// Frame rate used when the input does not report one
    pub fallback_fps: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            fallback_fps: 30.0,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(invalid("export.codec", "\"\""));
        }

        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(invalid("export.fallback_fps", self.fallback_fps));
        }

        Ok(())
    }
}
