// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The value has the wrong runtime type.
    Type,
    /// The value has the right type but is not acceptable.
    Value,
}

/// A rejected parameter. The message is shown to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Value(String),
}

impl ValidationError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        ValidationError::Type(msg.into())
    }

    pub fn value_error(msg: impl Into<String>) -> Self {
        ValidationError::Value(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::Type(_) => ErrorKind::Type,
            ValidationError::Value(_) => ErrorKind::Value,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationError::Type(msg) | ValidationError::Value(msg) => msg,
        }
    }
}

/// A validation failure tagged with the declared instance it came from.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("server: {0}")]
    Server(#[source] ValidationError),

    #[error("remote-control: {0}")]
    Remote(#[source] ValidationError),

    #[error("zone {domain}: {source}")]
    Zone {
        domain: String,
        #[source]
        source: ValidationError,
    },
}

impl BuildError {
    /// The underlying validation failure.
    pub fn validation(&self) -> &ValidationError {
        match self {
            BuildError::Server(err) | BuildError::Remote(err) => err,
            BuildError::Zone { source, .. } => source,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file source '{0}' (expected a local path or file:// URL)")]
    UnsupportedSource(String),

    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl DeployError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }
}
