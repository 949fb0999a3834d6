//! Hierarchical data stored as plain directories.
//!
//! An exdir file is a directory tree. Groups are directories, datasets are
//! directories holding one `.npy` array, and every object keeps its
//! attributes in a small YAML record beside its own `exdir.yaml`. Anything
//! that reads YAML and NumPy arrays can read the data without this crate.
//!
//! # Key Types
//!
//! - [`File`] — An open root directory; dereferences to its root [`Group`]
//! - [`Group`] — Creates, looks up, lists, and removes children
//! - [`Dataset`] — A memory-mapped array with optional unit and uncertainty
//! - [`Attributes`] — Dictionary view over an object's attribute or meta record
//! - [`Plugin`] — Transforms datasets and attributes on their way to and from disk
//!
//! ```no_run
//! use exdir::{File, OpenMode, Quantity, Selection};
//!
//! let file = File::open("experiment", OpenMode::Append)?;
//! let trial = file.require_group("trial_01")?;
//! trial.attrs().set("temperature", Quantity::scalar(36.6, "degC"))?;
//!
//! let mut voltage = trial.create_dataset("voltage", vec![0.0f64; 1000])?;
//! voltage.set(&Selection::range(0, 3), vec![1.0f64, 2.0, 3.0])?;
//! file.close()?;
//! # Ok::<(), exdir::ExdirError>(())
//! ```

pub mod attributes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod file;
pub mod group;
pub mod link;
pub mod node;
pub mod object;
pub mod raw;

pub use attributes::Attributes;
pub use config::{FileConfig, FileOptions, OpenMode};
pub use dataset::{Dataset, DatasetInit, Rows, UNCERTAINTY_KEY, UNIT_KEY};
pub use error::{ExdirError, Result};
pub use file::File;
pub use group::Group;
pub use link::MAX_LINK_HOPS;
pub use node::{EntryKind, Node};
pub use object::Object;
pub use raw::Raw;

pub use exdir_array::{AxisSelection, Selection};
pub use exdir_plugin::{
    AttributeStage, AttributeWrite, Capability, DatasetStage, DatasetWrite, Direction,
    ObjectStage, Plugin, PluginError, PluginResult, ReadContext,
};
pub use exdir_store::{Link, NamingRule, ObjectKind};
pub use exdir_types::{
    ndarray, ArrayValue, AttrMap, AttrValue, DType, DatasetValue, Element, ErrorKind, Quantity,
    Scalar,
};
