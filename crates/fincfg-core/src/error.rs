//! Error types for fincfg-core
//!
//! These are run-level errors. Per-entity problems never surface here; they
//! become a failed [`crate::Outcome`] and the run carries on.

use std::path::PathBuf;

/// Result type for fincfg-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole reconciliation or drift run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration is present but unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A kind was requested that the kind table does not know
    #[error("Unknown entity kind: {kind}")]
    UnknownKind { kind: String },

    // Transparent wrappers for underlying crate errors
    /// Corpus loading error from fincfg-docs
    #[error(transparent)]
    Docs(#[from] fincfg_docs::Error),

    /// Fatal transport error (authentication or client configuration)
    #[error(transparent)]
    Transport(#[from] fincfg_transport::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
