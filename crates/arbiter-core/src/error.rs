use thiserror::Error;

/// Unified error type for the entire Arbiter workspace.
#[derive(Error, Debug)]
pub enum ArbiterError {
    // ── Engine errors ──────────────────────────────────────────
    #[error("arbiter engine not initialized")]
    NotInitialized,

    #[error("operator '{operator}' is not authorized to {action}")]
    Unauthorized { operator: String, action: String },

    // ── Policy errors ──────────────────────────────────────────
    #[error("policy validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Store errors ───────────────────────────────────────────
    #[error("store error: {0}")]
    Store(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ArbiterError {
    /// Shorthand for a policy validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArbiterError>;
