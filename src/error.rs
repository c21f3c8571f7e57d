use thiserror::Error;

/// Feature generator error types
#[derive(Error, Debug)]
pub enum FeatureGeneratorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to decode message on {channel}: {reason}")]
    Decode { channel: String, reason: String },

    #[error("Record error: {0}")]
    Record(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Failed to persist shard {shard_index}: {reason}")]
    Persist { shard_index: u64, reason: String },
}

impl FeatureGeneratorError {
    /// Decode errors are recoverable: the message is dropped and the run goes on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FeatureGeneratorError::Decode { .. })
    }
}

impl From<serde_json::Error> for FeatureGeneratorError {
    fn from(e: serde_json::Error) -> Self {
        FeatureGeneratorError::Serialize(e.to_string())
    }
}

/// Result type for feature generation
pub type Result<T> = std::result::Result<T, FeatureGeneratorError>;
