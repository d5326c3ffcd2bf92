//! Error types for fincfg-alert

/// Result type for alert delivery
pub type Result<T> = std::result::Result<T, AlertError>;

/// Failure to build or deliver one alert
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The sink's configuration cannot produce a message
    #[error("Invalid {sink} configuration: {message}")]
    Config { sink: &'static str, message: String },

    #[error("Webhook delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl AlertError {
    pub fn config(sink: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            sink,
            message: message.into(),
        }
    }
}
