//! Error types for fincfg-transport

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned from a single remote call
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The request never produced a response
    #[error("Network error on {method} {url}: {message}")]
    Network {
        method: String,
        url: String,
        message: String,
    },

    /// Non-retryable, non-2xx response
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Retryable failure that persisted through every attempt
    #[error("{method} {url} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
        last: String,
    },

    /// 2xx response whose body is not valid JSON
    #[error("Invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },

    /// Credentials were rejected or no token could be acquired
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The client itself is misconfigured
    #[error("Invalid transport configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Auth errors are fatal to the whole run
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth() {
        assert!(Error::auth("bad secret").is_auth());
        assert!(!Error::config("no url").is_auth());
    }

    #[test]
    fn test_status_display() {
        let err = Error::Status {
            method: "GET".into(),
            url: "https://core/api/v1/offices".into(),
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.to_string(),
            "GET https://core/api/v1/offices returned 404: not found"
        );
    }
}
