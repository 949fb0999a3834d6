use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exdir_plugin::{merge_into, Capability};
use exdir_store::layout::{ATTRIBUTES_FILENAME, META_FILENAME};
use exdir_store::{self as store, Entry, ObjectKind, RecordFile};
use exdir_types::AttrMap;
use tracing::debug;

use crate::attributes::{Attributes, RecordKind};
use crate::error::{ExdirError, Result};
use crate::file::FileCore;
use crate::group::Group;
use crate::node::EntryKind;
use crate::raw::Raw;

/// What every handle has in common: a place in a file.
///
/// Two handles are equal when they point at the same path in the same file
/// directory, however they were obtained.
#[derive(Clone)]
pub struct Object {
    core: Arc<FileCore>,
    relative: PathBuf,
}

impl Object {
    pub(crate) fn root(core: Arc<FileCore>) -> Self {
        Self {
            core,
            relative: PathBuf::new(),
        }
    }

    pub(crate) fn core(&self) -> &Arc<FileCore> {
        &self.core
    }

    pub(crate) fn child(&self, name: &str) -> Self {
        Self {
            core: Arc::clone(&self.core),
            relative: self.relative.join(name),
        }
    }

    pub(crate) fn at(&self, relative: PathBuf) -> Self {
        Self {
            core: Arc::clone(&self.core),
            relative,
        }
    }

    /// Absolute name inside the file: `/` for the root, `/a/b` below it.
    pub fn name(&self) -> String {
        name_of(&self.relative)
    }

    /// Path from the file root; empty for the root itself.
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    pub fn directory(&self) -> PathBuf {
        self.core.root().join(&self.relative)
    }

    /// Directory of the file this object belongs to.
    pub fn file_root(&self) -> &Path {
        self.core.root()
    }

    /// The containing group. `None` for the root.
    pub fn parent(&self) -> Option<Group> {
        let parent = self.relative.parent()?;
        Some(Group::from_object(self.at(parent.to_path_buf())))
    }

    /// Kind recorded on disk, if the directory still holds an object.
    pub fn kind(&self) -> Option<ObjectKind> {
        store::read_object_kind(&self.directory())
    }

    /// User attributes (`attributes.yaml`).
    pub fn attrs(&self) -> Attributes {
        Attributes::new(self.clone(), RecordKind::Attributes)
    }

    /// Bookkeeping record (`exdir.yaml`).
    pub fn meta(&self) -> Attributes {
        Attributes::new(self.clone(), RecordKind::Meta)
    }

    pub(crate) fn record(&self, kind: RecordKind) -> RecordFile {
        let filename = match kind {
            RecordKind::Attributes => ATTRIBUTES_FILENAME,
            RecordKind::Meta => META_FILENAME,
        };
        RecordFile::new(self.directory().join(filename))
    }

    pub(crate) fn merge_meta(&self, extra: AttrMap) -> Result<()> {
        Self::merge_meta_at(&self.directory(), extra)
    }

    pub(crate) fn merge_meta_at(directory: &Path, extra: AttrMap) -> Result<()> {
        if extra.is_empty() {
            return Ok(());
        }
        RecordFile::new(directory.join(META_FILENAME)).modify(|meta| {
            merge_into(meta, extra);
            Ok(())
        })?;
        Ok(())
    }

    // ---- raw directories ----

    /// Create an uninterpreted directory inside this object.
    pub fn create_raw(&self, name: &str) -> Result<Raw> {
        self.core.ensure_writable()?;
        let directory = self.directory();
        self.core.naming_rule().validate(&directory, name)?;

        let raw = self.child(name);
        let path = raw.directory();
        std::fs::create_dir(&path)?;
        // Raw directories have no record to merge hook output into.
        self.core
            .pipeline()
            .create_object(Capability::Raw, &raw.name(), &path)?;
        debug!(name = %raw.name(), "created raw directory");
        Ok(Raw::new(raw))
    }

    /// Return the raw directory `name`, creating it if needed.
    pub fn require_raw(&self, name: &str) -> Result<Raw> {
        self.core.ensure_open()?;
        let raw = self.child(name);
        match store::classify(&raw.directory()) {
            Entry::Raw => Ok(Raw::new(raw)),
            Entry::Missing => self.create_raw(name),
            other => Err(ExdirError::TypeKindConflict {
                name: raw.name(),
                expected: "raw directory",
                actual: EntryKind::from(other).to_string(),
            }),
        }
    }
}

pub(crate) fn name_of(relative: &Path) -> String {
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    format!("/{}", parts.join("/"))
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.core.root() == other.core.root() && self.relative == other.relative
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("root", &self.core.root())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{File, OpenMode};
    use exdir_types::ErrorKind;

    #[test]
    fn names_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::open(dir.path().join("names"), OpenMode::Append).unwrap();
        let b = file.create_group("a").unwrap().create_group("b").unwrap();

        assert_eq!(file.name(), "/");
        assert!(file.parent().is_none());
        assert_eq!(b.name(), "/a/b");
        assert_eq!(b.relative_path(), Path::new("a/b"));
        assert_eq!(b.directory(), file.file_root().join("a").join("b"));
        assert_eq!(b.parent().unwrap().name(), "/a");
        assert_eq!(b.kind(), Some(ObjectKind::Group));
    }

    #[test]
    fn raw_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::open(dir.path().join("raw"), OpenMode::Append).unwrap();
        let group = file.create_group("recording").unwrap();

        let raw = group.create_raw("acquisition").unwrap();
        std::fs::write(raw.directory().join("trace.bin"), b"\x00\x01").unwrap();
        assert_eq!(group.require_raw("acquisition").unwrap(), raw);
        assert_eq!(group.raw_names().unwrap(), ["acquisition"]);
        assert!(group.keys().unwrap().is_empty());

        let err = group.create_raw("acquisition").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        group.create_group("child").unwrap();
        let err = group.require_raw("child").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeKindConflict);
    }
}
