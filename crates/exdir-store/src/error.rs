use std::path::PathBuf;

use exdir_types::ErrorKind;
use thiserror::Error;

/// Errors from the on-disk layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A name was rejected by the active naming rule.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A name differs from an existing entry only by case.
    #[error("name {name:?} collides with existing entry {existing:?}")]
    NameConflict { name: String, existing: String },

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    /// No enclosing directory is a valid exdir file.
    #[error("not inside an exdir file: {}", .0.display())]
    NotAnObjectStore(PathBuf),

    /// A record exists but does not have the expected structure.
    #[error("invalid record {}: {reason}", path.display())]
    InvalidRecord { path: PathBuf, reason: String },

    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::NameConflict { .. } => ErrorKind::NameConflict,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotAnObjectStore(_) => ErrorKind::NotAnObjectStore,
            Self::InvalidRecord { .. } | Self::Yaml { .. } => ErrorKind::InvalidFormat,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_record(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
