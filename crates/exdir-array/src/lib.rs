//! Array storage for exdir datasets.
//!
//! Each dataset keeps its elements in a single `.npy` file. This crate
//! reads and writes that format ([`npy`]), maps it into memory with typed
//! `ndarray` views ([`MappedArray`]), and resolves Python-style index
//! selections against it ([`Selection`]).

pub mod error;
pub mod mapped;
pub mod npy;
pub mod selection;

pub use error::{ArrayError, ArrayResult};
pub use mapped::{AccessMode, MappedArray};
pub use npy::{read_array, write_array, NpyHeader};
pub use selection::{AxisSelection, Selection};
