use exdir_types::{DType, ErrorKind, TypeError};
use thiserror::Error;

/// Errors from array storage.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The file is not a well-formed `.npy` file.
    #[error("invalid npy file: {0}")]
    InvalidFormat(String),

    /// A well-formed `.npy` file this crate cannot map.
    #[error("unsupported npy file: {0}")]
    UnsupportedFormat(String),

    #[error("dtype mismatch: array is {actual}, requested {expected}")]
    DtypeMismatch { expected: DType, actual: DType },

    #[error("cannot broadcast shape {actual:?} to {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("index {index} is out of bounds for axis {axis} with length {len}")]
    IndexOutOfBounds { axis: usize, index: isize, len: usize },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A write was attempted through a read-only mapping.
    #[error("array is mapped read-only")]
    ReadOnly,

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArrayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) | Self::UnsupportedFormat(_) => ErrorKind::InvalidFormat,
            Self::DtypeMismatch { .. } => ErrorKind::DtypeMismatch,
            Self::ShapeMismatch { .. } | Self::InvalidSelection(_) => ErrorKind::ShapeMismatch,
            Self::IndexOutOfBounds { .. } => ErrorKind::NotFound,
            Self::ReadOnly => ErrorKind::ReadOnlyViolation,
            Self::Type(e) => e.kind(),
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<ndarray::ShapeError> for ArrayError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::InvalidFormat(e.to_string())
    }
}

/// Result alias for array storage operations.
pub type ArrayResult<T> = Result<T, ArrayError>;
