//! Error types for tabmdp

use thiserror::Error;

/// Main error type for tabmdp
#[derive(Error, Debug)]
pub enum MdpError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MdpError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True for defects in the caller's data rather than in the environment
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Result type alias for tabmdp operations
pub type Result<T> = std::result::Result<T, MdpError>;
