//! Error types for PDF generation.
//!
//! Parsing and layout never fail; only writing the finished PDF, or loading a
//! config file on request, can produce an error.

use std::path::PathBuf;

/// Result type alias for mdpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while writing a PDF or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The destination file could not be created
    #[error("cannot create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination file could not be written or flushed
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to a caller-supplied stream failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid TOML for the expected schema
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn create_error_names_path_and_cause() {
        let err = Error::Create {
            path: PathBuf::from("/tmp/out.pdf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.pdf"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn stream_error_keeps_cause() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
