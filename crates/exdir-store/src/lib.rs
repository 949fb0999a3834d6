//! On-disk layer for exdir.
//!
//! Everything here works on plain paths: it knows how an object directory
//! is laid out, how names are validated, and how the YAML records are
//! encoded, but nothing about open files or handles.

pub mod codec;
pub mod directory;
pub mod error;
pub mod layout;
pub mod link;
pub mod naming;
pub mod record;

pub use directory::{
    classify, create_link_directory, create_object_directory, find_root,
    is_raw_directory, is_valid_object_directory, read_link, read_object_kind, Entry,
};
pub use error::{StoreError, StoreResult};
pub use layout::ObjectKind;
pub use link::Link;
pub use naming::NamingRule;
pub use record::RecordFile;
