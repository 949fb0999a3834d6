use std::fmt;

use exdir_store::{Entry, ObjectKind};

use crate::dataset::Dataset;
use crate::error::{ExdirError, Result};
use crate::group::Group;
use crate::raw::Raw;

/// What a name inside a group refers to, before any link is followed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A group or a nested file directory.
    Group,
    Dataset,
    Link,
    Raw,
    Missing,
    /// A plain file, such as a record or an array file.
    Other,
}

impl From<Entry> for EntryKind {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Object(ObjectKind::File | ObjectKind::Group) => Self::Group,
            Entry::Object(ObjectKind::Dataset) => Self::Dataset,
            Entry::Object(ObjectKind::Link) => Self::Link,
            Entry::Raw => Self::Raw,
            Entry::Missing => Self::Missing,
            Entry::NotADirectory => Self::Other,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Group => "group",
            Self::Dataset => "dataset",
            Self::Link => "link",
            Self::Raw => "raw directory",
            Self::Missing => "missing entry",
            Self::Other => "plain file",
        })
    }
}

/// An object found by a lookup, links already resolved.
#[derive(Debug, PartialEq)]
pub enum Node {
    Group(Group),
    Dataset(Dataset),
    Raw(Raw),
}

impl Node {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Group(_) => EntryKind::Group,
            Self::Dataset(_) => EntryKind::Dataset,
            Self::Raw(_) => EntryKind::Raw,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Group(g) => g.name(),
            Self::Dataset(d) => d.name(),
            Self::Raw(r) => r.name(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn is_dataset(&self) -> bool {
        matches!(self, Self::Dataset(_))
    }

    pub fn into_group(self) -> Result<Group> {
        match self {
            Self::Group(g) => Ok(g),
            other => Err(other.conflict("group")),
        }
    }

    pub fn into_dataset(self) -> Result<Dataset> {
        match self {
            Self::Dataset(d) => Ok(d),
            other => Err(other.conflict("dataset")),
        }
    }

    pub fn into_raw(self) -> Result<Raw> {
        match self {
            Self::Raw(r) => Ok(r),
            other => Err(other.conflict("raw directory")),
        }
    }

    pub(crate) fn conflict(&self, expected: &'static str) -> ExdirError {
        ExdirError::TypeKindConflict {
            name: self.name(),
            expected,
            actual: self.kind().to_string(),
        }
    }
}
