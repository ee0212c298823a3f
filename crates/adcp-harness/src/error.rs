//! Harness error taxonomy.
//!
//! Agent-side problems are never errors: they are recorded as failed steps.
//! These variants cover configuration and report I/O only.

/// Errors produced by the harness outside of scenario execution.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn invalid_option(name: &str, reason: impl Into<String>) -> Self {
        HarnessError::InvalidOption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
