//! Error types for the model-metadata library.
//!
//! One crate-level enum covers the whole public surface; the parameter
//! module keeps its own finer-grained error and is wrapped here together
//! with the name of the offending parameter.

use std::path::PathBuf;
use thiserror::Error;

use crate::param::ParameterError;

/// Main error type for the model-metadata library.
#[derive(Debug, Error)]
pub enum MetadataError {
    // Resolution errors
    #[error("{model}: metadata not found")]
    NotFound { model: String },

    #[error("{entry_point}: invalid entry point ({reason})")]
    BadEntryPoint { entry_point: String, reason: String },

    #[error("{entry_point}: no component registered under entry point")]
    UnknownComponent { entry_point: String },

    // Dotted-query errors
    #[error("{name}: missing section")]
    MissingSection { name: String },

    #[error("{name}: missing value")]
    MissingValue { name: String },

    // Validation errors
    #[error("{name}: unable to load parameter ({source})")]
    BadParameter {
        name: String,
        #[source]
        source: ParameterError,
    },

    #[error("{field}: {message}")]
    InvalidInfo { field: String, message: String },

    #[error("unknown parameters ({}); valid parameters: {}", .keys.join(", "), .valid.join(", "))]
    UnknownKeys {
        /// Offending override keys, sorted.
        keys: Vec<String>,
        /// The declared parameter names, sorted.
        valid: Vec<String>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{}: file exists", .0.display())]
    FileExists(PathBuf),

    // Serialization errors
    #[error("YAML error at {path:?}: {source}")]
    Yaml {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: {message}", .path.display())]
    BadDocument { path: PathBuf, message: String },
}

impl MetadataError {
    pub(crate) fn io(message: impl Into<String>, path: &std::path::Path, source: std::io::Error) -> Self {
        MetadataError::Io {
            message: message.into(),
            path: Some(path.to_path_buf()),
            source: Some(source),
        }
    }
}

/// Result type alias using [`MetadataError`].
pub type Result<T> = std::result::Result<T, MetadataError>;
