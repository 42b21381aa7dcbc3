//! Error types for SetuBridge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SetuBridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rendering failed (grid validation, raster encoding, conversion)
    #[error("Render error: {0}")]
    Render(#[from] chitra_map::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but a value is out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Incoming message payload did not match the expected shape
    #[error("Decode error on {topic}: {reason}")]
    Decode {
        /// Topic the payload arrived on
        topic: String,
        /// What was wrong with it
        reason: String,
    },

    /// Outgoing message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Decode error for a topic.
    pub fn decode(topic: &str, reason: impl std::fmt::Display) -> Self {
        Error::Decode {
            topic: topic.to_string(),
            reason: reason.to_string(),
        }
    }
}
