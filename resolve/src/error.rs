//! Error type for merge operations.
//!
//! Every variant names the file it concerns. Reference and type errors
//! carry the pointer or location inside that file through their source.

use std::path::PathBuf;

use openapi_merge_core::{ConflictError, ReferenceError, TypeError};
use thiserror::Error;

/// Errors that abort a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Malformed YAML.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A file could not be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A reference that cannot be followed.
    #[error("{}: {source}", .file.display())]
    Reference {
        file: PathBuf,
        source: ReferenceError,
    },

    /// A value with the wrong shape.
    #[error("{}: {source}", .file.display())]
    Type { file: PathBuf, source: TypeError },

    /// Two files define the same component differently under the `error` policy.
    #[error("{}: {source}", .file.display())]
    Conflict {
        file: PathBuf,
        source: ConflictError,
    },

    /// Invalid merge configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MergeError {
    pub(crate) fn reference(file: impl Into<PathBuf>, source: ReferenceError) -> Self {
        MergeError::Reference {
            file: file.into(),
            source,
        }
    }

    pub(crate) fn type_error(file: impl Into<PathBuf>, source: TypeError) -> Self {
        MergeError::Type {
            file: file.into(),
            source,
        }
    }

    /// The file the error concerns, if any.
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            MergeError::Parse { path, .. } | MergeError::Io { path, .. } => Some(path),
            MergeError::Reference { file, .. }
            | MergeError::Type { file, .. }
            | MergeError::Conflict { file, .. } => Some(file),
            MergeError::Config(_) => None,
        }
    }
}

/// Convenience alias for results with [`MergeError`].
pub type Result<T> = std::result::Result<T, MergeError>;
