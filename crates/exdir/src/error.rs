use std::path::PathBuf;

use exdir_array::ArrayError;
use exdir_plugin::PluginError;
use exdir_store::StoreError;
use exdir_types::{DType, ErrorKind, TypeError};
use thiserror::Error;

/// Errors from the object hierarchy.
///
/// Lower layers keep their own error types; they are wrapped here
/// unchanged, and [`ExdirError::kind`] sees through the wrapping.
#[derive(Debug, Error)]
pub enum ExdirError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Array(#[from] ArrayError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The directory exists but is not an exdir file.
    #[error("not an exdir file: {}", .0.display())]
    NotAnObjectStore(PathBuf),

    /// The object at a name is of a different kind than requested.
    #[error("{name} is a {actual}, not a {expected}")]
    TypeKindConflict {
        name: String,
        expected: &'static str,
        actual: String,
    },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("dtype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch { expected: DType, actual: DType },

    #[error("unit mismatch: dataset has {}, value has {actual:?}", expected.as_deref().unwrap_or("no unit"))]
    UnitMismatch {
        expected: Option<String>,
        actual: String,
    },

    #[error("a dataset needs either data or a shape")]
    MissingShapeOrData,

    #[error("file is opened read-only")]
    ReadOnlyViolation,

    #[error("file is closed")]
    Closed,

    /// First-axis iteration over a zero-dimensional dataset.
    #[error("{0} is zero-dimensional and has no length")]
    NotIterable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExdirError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Array(e) => e.kind(),
            Self::Plugin(e) => e.kind(),
            Self::Type(e) => e.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotAnObjectStore(_) => ErrorKind::NotAnObjectStore,
            Self::TypeKindConflict { .. } => ErrorKind::TypeKindConflict,
            Self::ShapeMismatch { .. } | Self::MissingShapeOrData => ErrorKind::ShapeMismatch,
            Self::DtypeMismatch { .. } => ErrorKind::DtypeMismatch,
            Self::UnitMismatch { .. } => ErrorKind::UnitMismatch,
            Self::ReadOnlyViolation => ErrorKind::ReadOnlyViolation,
            Self::Closed => ErrorKind::Closed,
            Self::NotIterable(_) => ErrorKind::NotIterable,
            Self::Config(_) => ErrorKind::InvalidFormat,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Result alias for hierarchy operations.
pub type Result<T> = std::result::Result<T, ExdirError>;
