use thiserror::Error;

/// Main error type for the glitchframe library
#[derive(Error, Debug)]
pub enum GlitchError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Ring buffer error: {0}")]
    RingBuffer(#[from] RingBufferError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Chain-level policy errors, raised before or at effect lookup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Chain depth {depth} exceeds maximum {max}")]
    ChainTooDeep { depth: usize, max: usize },

    #[error("Unknown effect: {id}")]
    UnknownEffect { id: String },
}

/// Errors raised by (or about) a single effect invocation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("Invalid parameter for {effect}: {name} - {reason}")]
    InvalidParameter {
        effect: String,
        name: String,
        reason: String,
    },

    #[error("Effect {effect} returned a {actual:?} frame, expected {expected:?}")]
    OutputShape {
        effect: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Mask for {effect} is {actual:?}, frame is {expected:?}")]
    MaskShape {
        effect: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Effect application failed: {effect} - {reason}")]
    Failed { effect: String, reason: String },
}

/// Compositor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Layer {index} is {actual:?}, canvas is {expected:?}")]
    LayerSize {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Unknown blend mode: {name}")]
    UnknownBlendMode { name: String },
}

/// Frame encoder errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Invalid encoder quality: {quality} (expected 1-100)")]
    InvalidQuality { quality: u8 },

    #[error("Quality ladder is empty")]
    EmptyLadder,

    #[error("Frame does not fit in {max_bytes} bytes: smallest attempt was {smallest} bytes at quality {quality}")]
    Overflow {
        smallest: usize,
        quality: u8,
        max_bytes: usize,
    },

    #[error("Codec failure: {reason}")]
    Codec { reason: String },
}

/// Shared-memory ring buffer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingBufferError {
    #[error("Invalid ring buffer geometry: {details}")]
    InvalidGeometry { details: String },

    #[error("Encoded frame ({size} bytes) exceeds slot size ({slot_size})")]
    FrameTooLarge { size: usize, slot_size: u32 },

    #[error("Ring buffer is corrupt: {details}")]
    Corrupt { details: String },
}

/// Export job errors surfaced synchronously to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Export already in progress")]
    Conflict,
}

/// Video reader/writer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoError {
    #[error("Failed to open video: {path}")]
    OpenFailed { path: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame {index} out of range (video has {total} frames)")]
    FrameOutOfRange { index: u64, total: u64 },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using GlitchError
pub type Result<T> = std::result::Result<T, GlitchError>;

impl GlitchError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Category name of this error, free of paths and messages.
    ///
    /// This is the only text an export job exposes when it fails.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Pipeline(_) => "PipelineError",
            Self::Effect(_) => "EffectError",
            Self::Composition(_) => "CompositionError",
            Self::Encode(_) => "EncodeError",
            Self::RingBuffer(_) => "RingBufferError",
            Self::Export(_) => "ExportError",
            Self::Video(_) => "VideoError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Generic(_) => "GenericError",
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO errors might be temporary
            Self::Io(_) => true,
            // Caller can shorten the chain, widen the budget, or wait for the running export
            Self::Pipeline(PipelineError::ChainTooDeep { .. }) => true,
            Self::Encode(EncodeError::Overflow { .. }) => true,
            Self::Export(ExportError::Conflict) => true,
            Self::Video(VideoError::OpenFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Pipeline(PipelineError::ChainTooDeep { depth, max }) => {
                format!("The effect chain has {} effects; remove some to stay within {}.", depth, max)
            }
            Self::Pipeline(PipelineError::UnknownEffect { id }) => {
                format!("Effect '{}' is not available. Run `glitchframe effects` to list effects.", id)
            }
            Self::Encode(EncodeError::Overflow { max_bytes, .. }) => {
                format!("The frame cannot be compressed below {} bytes; lower the resolution or raise the budget.", max_bytes)
            }
            Self::Export(ExportError::Conflict) => {
                "An export is already running. Cancel it or wait for it to finish.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_hides_message() {
        let err: GlitchError = VideoError::DecodingFailed {
            reason: "/home/alice/secret/clip.mp4: broken".to_string(),
        }
        .into();

        assert_eq!(err.category(), "VideoError");
        assert!(!err.category().contains("alice"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(GlitchError::from(ExportError::Conflict).is_recoverable());
        assert!(GlitchError::from(PipelineError::ChainTooDeep { depth: 11, max: 10 }).is_recoverable());
        assert!(!GlitchError::from(PipelineError::UnknownEffect { id: "fx.nope".into() }).is_recoverable());
    }
}
