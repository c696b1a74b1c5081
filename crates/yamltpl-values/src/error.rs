//! Error types for the values crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or addressing a [`Values`](crate::Values) store.
#[derive(Debug, Error)]
pub enum ValuesError {
    /// A path segment is missing or does not name a mapping.
    #[error("no table named {key:?}")]
    NoTable { key: String },

    /// The final path segment is missing or names a mapping instead of a leaf.
    #[error("no value for key {key:?}")]
    NoValue { key: String },

    /// `path_value` was called with an empty path.
    #[error("YAML path cannot be empty")]
    EmptyPath,

    /// A values document decoded to something other than a mapping.
    #[error("values document must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// The document is not valid YAML, or the store could not be encoded.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A values file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ValuesError {
    pub(crate) fn no_table(key: impl Into<String>) -> Self {
        Self::NoTable { key: key.into() }
    }

    pub(crate) fn no_value(key: impl Into<String>) -> Self {
        Self::NoValue { key: key.into() }
    }
}

/// Result type for values operations.
pub type Result<T> = std::result::Result<T, ValuesError>;
