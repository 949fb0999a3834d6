//! Foundation value types for exdir.
//!
//! This crate provides the value model shared by every other exdir crate:
//! the numeric element types a dataset can hold, a dynamically-typed
//! N-dimensional array, the attribute value union written to the YAML
//! records, and physical quantities.
//!
//! # Key Types
//!
//! - [`DType`] — Element type of an array, with NumPy-compatible descriptors
//! - [`Element`] — Trait implemented by the Rust primitive behind each [`DType`]
//! - [`Scalar`] — A single numeric value independent of its storage width
//! - [`ArrayValue`] — An owned N-dimensional array of any supported [`DType`]
//! - [`AttrValue`] — Tagged union of everything an attribute record can hold
//! - [`Quantity`] — Magnitude plus unit, optionally with uncertainty
//! - [`DatasetValue`] — What a dataset read returns: a plain array or a quantity
//! - [`ErrorKind`] — Flat error taxonomy every crate's error maps onto

pub mod array;
pub mod attr;
pub mod dtype;
pub mod error;

pub use array::ArrayValue;
pub use attr::{AttrMap, AttrValue, DatasetValue, Quantity};
pub use dtype::{DType, Element, Scalar};
pub use error::{ErrorKind, TypeError, TypeResult};

/// Re-exported so downstream crates name the same `ndarray` version.
pub use ndarray;
