use thiserror::Error;

/// Main error type for the greenkey library
#[derive(Error, Debug)]
pub enum KeyerError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load video file: {path}")]
    LoadFailed { path: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Background video is empty: {path}")]
    EmptyBackground { path: String },

    #[error("Input video contains no frames: {path}")]
    EmptyInput { path: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using KeyerError
pub type Result<T> = std::result::Result<T, KeyerError>;

impl KeyerError {
    /// True for the one condition that makes a background source unusable
    pub fn is_empty_background(&self) -> bool {
        matches!(self, Self::Video(VideoError::EmptyBackground { .. }))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::LoadFailed { path }) => {
                format!("Could not open video '{}'. Check that the file exists and that ffmpeg can decode it.", path)
            }
            Self::Video(VideoError::EmptyBackground { path }) => {
                format!("Background video '{}' has no decodable frames.", path)
            }
            Self::Video(VideoError::EmptyInput { path }) => {
                format!("Input video '{}' has no decodable frames. Pass --allow-empty-input to write an empty output instead.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
