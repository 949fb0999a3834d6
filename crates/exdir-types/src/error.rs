use thiserror::Error;

use crate::dtype::DType;

/// The error taxonomy shared across the workspace.
///
/// Each crate keeps its own error enum; `kind()` on any of them maps the
/// variant onto one of these so callers can branch without knowing which
/// layer raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    NameConflict,
    AlreadyExists,
    NotFound,
    NotAnObjectStore,
    TypeKindConflict,
    ShapeMismatch,
    DtypeMismatch,
    UnitMismatch,
    ReadOnlyViolation,
    Closed,
    CircularDependency,
    MissingRequiredPlugin,
    NotIterable,
    InvalidFormat,
    Plugin,
    Io,
}

/// Errors produced by value conversions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("cannot safely cast {from} to {to}")]
    UnsafeCast { from: DType, to: DType },

    #[error("dtype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch { expected: DType, actual: DType },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("unknown dtype: {0}")]
    UnknownDtype(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsafeCast { .. } | Self::DtypeMismatch { .. } | Self::UnknownDtype(_) => {
                ErrorKind::DtypeMismatch
            }
            Self::ShapeMismatch { .. } | Self::InvalidShape(_) => ErrorKind::ShapeMismatch,
        }
    }
}

impl From<ndarray::ShapeError> for TypeError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::InvalidShape(e.to_string())
    }
}

/// Result alias for value conversions.
pub type TypeResult<T> = Result<T, TypeError>;
