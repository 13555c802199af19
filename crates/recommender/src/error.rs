//! Error types for the recommendation engine
//!
//! Only startup concerns (loading snapshots, reading configuration) produce
//! errors. Request paths degrade to empty or partial lists instead.

/// Error types for engine construction and data loading
#[derive(Debug, thiserror::Error)]
pub enum RecommenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl RecommenderError {
    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for RecommenderError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
            key: None,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RecommenderError>;
