//! Error types for the sync run and the directory client.

use crate::models::RangeError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a [`DirectoryClient`](crate::directory::DirectoryClient).
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A segment with this name already exists.
    #[error("network segment '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("network segment '{name}' not found")]
    NotFound { name: String },

    /// More than one remote segment carries the same name.
    #[error("{count} network segments are named '{name}'")]
    Ambiguous { name: String, count: usize },

    /// The service answered with an unexpected status.
    #[error("directory rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("could not decode response: {message}")]
    Decode { message: String },

    #[error("invalid range: {0}")]
    Range(#[from] RangeError),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else if e.is_connect() {
            "connection failed".to_string()
        } else {
            e.to_string()
        };
        DirectoryError::Transport {
            message,
            source: Some(Box::new(e)),
        }
    }
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad columns, missing credentials and similar. Raised before any remote call.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("cannot read input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("network segment '{name}' has an invalid range: {source}")]
    InvalidRange {
        name: String,
        #[source]
        source: RangeError,
    },

    #[error("{operation} of network segment '{name}' failed: {source}")]
    Directory {
        operation: &'static str,
        name: String,
        #[source]
        source: DirectoryError,
    },
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn directory(operation: &'static str, name: &str, source: DirectoryError) -> Self {
        match source {
            DirectoryError::Range(source) => SyncError::InvalidRange {
                name: name.to_string(),
                source,
            },
            source => SyncError::Directory {
                operation,
                name: name.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_message_names_record() {
        let err = SyncError::directory(
            "update",
            "Office",
            DirectoryError::Rejected {
                status: 500,
                message: "boom".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "update of network segment 'Office' failed: directory rejected request (500): boom"
        );
    }

    #[test]
    fn test_range_error_becomes_invalid_range() {
        let err = SyncError::directory(
            "create",
            "Lab",
            DirectoryError::Range(RangeError::InvalidAddress("x".to_string())),
        );
        assert!(matches!(err, SyncError::InvalidRange { ref name, .. } if name == "Lab"));
    }
}
