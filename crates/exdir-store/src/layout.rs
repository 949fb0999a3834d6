//! File names and object kinds that make up the on-disk format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Metadata record present in every object directory.
pub const META_FILENAME: &str = "exdir.yaml";
/// User attribute record, created on first write.
pub const ATTRIBUTES_FILENAME: &str = "attributes.yaml";
/// Array payload of a dataset.
pub const DATA_FILENAME: &str = "data.npy";
/// Conventional name for an uninterpreted directory.
pub const RAW_FOLDER_NAME: &str = "__raw__";
/// Extension appended to file roots.
pub const FILE_EXTENSION: &str = "exdir";
/// Version number written into every meta record.
pub const FORMAT_VERSION: u32 = 1;

/// Top-level key of the meta record.
pub const META_KEY: &str = "exdir";
/// Key holding link data in a link's meta record.
pub const LINK_KEY: &str = "link";
/// Key under which plugins record their markers.
pub const PLUGINS_KEY: &str = "plugins";

/// Names no object may take.
pub const RESERVED_NAMES: [&str; 3] = [META_FILENAME, ATTRIBUTES_FILENAME, RAW_FOLDER_NAME];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The `type` field of a meta record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Group,
    Dataset,
    Link,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Group => "group",
            Self::Dataset => "dataset",
            Self::Link => "link",
        }
    }

    /// Kinds that make a directory a valid object on their own.
    pub fn is_object(self) -> bool {
        !matches!(self, Self::Link)
    }

    /// Kinds that can hold children.
    pub fn is_container(self) -> bool {
        matches!(self, Self::File | Self::Group)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "group" => Ok(Self::Group),
            "dataset" => Ok(Self::Dataset),
            "link" => Ok(Self::Link),
            other => Err(format!("unknown object type: {other}")),
        }
    }
}
