//! Error types for fincfg-docs

use std::path::PathBuf;

/// Result type for fincfg-docs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort corpus loading as a whole.
///
/// Problems with a single document are not errors at this level; they are
/// collected as [`crate::InvalidDocument`] entries on the corpus.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declared directory does not exist or is not a directory
    #[error("Declared directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// A directory could not be listed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
