//! Object directories: creation, classification, and root discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::layout::{self, ObjectKind};
use crate::link::Link;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "type")]
    kind: ObjectKind,
    version: u32,
}

/// The parts of `exdir.yaml` this layer understands. Other keys are
/// ignored on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct MetaRecord {
    exdir: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<Link>,
}

/// What a path holds, resolved once per lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    Missing,
    Object(ObjectKind),
    Raw,
    NotADirectory,
}

impl Entry {
    /// A file, group or dataset directory.
    pub fn is_object(self) -> bool {
        matches!(self, Self::Object(kind) if kind.is_object())
    }

    pub fn is_link(self) -> bool {
        matches!(self, Self::Object(ObjectKind::Link))
    }
}

/// Create `path` and its meta record for an object of `kind`.
///
/// The directory is left in place if writing the record fails.
pub fn create_object_directory(path: &Path, kind: ObjectKind) -> StoreResult<()> {
    write_new(path, kind, None)
}

/// Create a link directory at `path`.
pub fn create_link_directory(path: &Path, link: &Link) -> StoreResult<()> {
    write_new(path, ObjectKind::Link, Some(link.clone()))
}

fn write_new(path: &Path, kind: ObjectKind, link: Option<Link>) -> StoreResult<()> {
    if path.symlink_metadata().is_ok() {
        return Err(StoreError::AlreadyExists(path.to_path_buf()));
    }
    std::fs::create_dir(path)?;
    let record = MetaRecord {
        exdir: Header {
            kind,
            version: layout::FORMAT_VERSION,
        },
        link,
    };
    let meta_path = path.join(layout::META_FILENAME);
    let text = serde_yaml::to_string(&record).map_err(|source| StoreError::Yaml {
        path: meta_path.clone(),
        source,
    })?;
    std::fs::write(&meta_path, text)?;
    debug!(path = %path.display(), %kind, "created object directory");
    Ok(())
}

fn read_meta(path: &Path) -> Option<MetaRecord> {
    let text = std::fs::read_to_string(path.join(layout::META_FILENAME)).ok()?;
    serde_yaml::from_str(&text).ok()
}

/// The kind recorded in `path/exdir.yaml`, if it parses.
pub fn read_object_kind(path: &Path) -> Option<ObjectKind> {
    read_meta(path).map(|m| m.exdir.kind)
}

/// The link stored at `path`, if `path` is a link directory.
pub fn read_link(path: &Path) -> StoreResult<Option<Link>> {
    let Some(record) = read_meta(path) else {
        return Ok(None);
    };
    match (record.exdir.kind, record.link) {
        (ObjectKind::Link, Some(link)) => Ok(Some(link)),
        (ObjectKind::Link, None) => Err(StoreError::invalid_record(
            &path.join(layout::META_FILENAME),
            "link record without a link section",
        )),
        _ => Ok(None),
    }
}

/// A directory whose record names a file, group or dataset.
pub fn is_valid_object_directory(path: &Path) -> bool {
    read_object_kind(path).is_some_and(ObjectKind::is_object)
}

/// A directory with no parseable meta record.
pub fn is_raw_directory(path: &Path) -> bool {
    path.is_dir() && read_object_kind(path).is_none()
}

pub fn classify(path: &Path) -> Entry {
    match path.metadata() {
        Err(_) => Entry::Missing,
        Ok(m) if !m.is_dir() => Entry::NotADirectory,
        Ok(_) => match read_object_kind(path) {
            Some(kind) => Entry::Object(kind),
            None => Entry::Raw,
        },
    }
}

/// Find the enclosing file directory of `path`.
///
/// Returns the root and the path of `path` relative to it.
pub fn find_root(path: &Path) -> StoreResult<(PathBuf, PathBuf)> {
    let absolute = std::path::absolute(path)?;
    for candidate in absolute.ancestors() {
        if read_object_kind(candidate) == Some(ObjectKind::File) {
            let relative = absolute
                .strip_prefix(candidate)
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Ok((candidate.to_path_buf(), relative));
        }
    }
    Err(StoreError::NotFound(format!(
        "no exdir file encloses {}",
        absolute.display()
    )))
}
