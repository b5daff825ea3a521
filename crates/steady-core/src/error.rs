//! Error types shared by every crate that talks to the cluster API.

use thiserror::Error;

/// Result type alias for cluster API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by a [`ClusterApi`](crate::ClusterApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned a malformed response: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            operation,
            message: message.into(),
        }
    }

    pub fn malformed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            operation,
            message: message.into(),
        }
    }
}

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
