//! Plugin pipeline for exdir.
//!
//! Plugins are plain values handed to a file when it is opened; there is
//! no global registry. Each [`Plugin`] carries optional stages for
//! datasets, attribute records, and object creation, plus ordering
//! constraints against other plugins by name. A [`Pipeline`] resolves
//! those constraints once per capability and direction and then runs the
//! stages in that order.
//!
//! # Key Types
//!
//! - [`Plugin`] — Named stage bundle with `*_before`/`*_after` constraints
//! - [`DatasetStage`], [`AttributeStage`], [`ObjectStage`] — Stage traits
//! - [`Pipeline`] — Resolved orders plus the functions that apply them
//! - [`PluginError`] — Ordering, requirement, and stage failures

pub mod error;
pub mod order;
pub mod pipeline;
pub mod plugin;
pub mod stage;

pub use error::{PluginError, PluginResult};
pub use order::resolve_order;
pub use pipeline::{merge_into, Pipeline, PLUGINS_KEY};
pub use plugin::{Capability, Constraints, Direction, Plugin};
pub use stage::{AttributeStage, AttributeWrite, DatasetStage, DatasetWrite, ObjectStage, ReadContext};
