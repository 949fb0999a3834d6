use std::ops::Deref;
use std::path::Path;

use exdir_plugin::{Capability, DatasetWrite};
use exdir_store::layout::META_FILENAME;
use exdir_store::{self as store, Entry, Link, ObjectKind};
use exdir_types::{DatasetValue, ErrorKind};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::dataset::{Dataset, DatasetInit};
use crate::error::{ExdirError, Result};
use crate::link;
use crate::node::{EntryKind, Node};
use crate::object::{name_of, Object};
use crate::raw::Raw;

/// A container of named objects.
///
/// Names passed to lookups may be nested (`a/b/c`) or absolute (`/a/b`,
/// from the file root). Creating through a nested name needs every parent
/// group to exist already.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    object: Object,
}

impl Deref for Group {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.object
    }
}

impl Group {
    pub(crate) fn from_object(object: Object) -> Self {
        Self { object }
    }

    fn root_group(&self) -> Group {
        Group::from_object(self.object.at(Default::default()))
    }

    /// The group that holds the last segment of `path`, and that segment.
    fn split_parent(&self, path: &str) -> Result<(Group, String)> {
        let trimmed = path.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some(("", leaf)) => Ok((self.root_group(), leaf.to_string())),
            Some((parent, leaf)) => Ok((self.get(parent)?.into_group()?, leaf.to_string())),
            None => Ok((self.clone(), trimmed.to_string())),
        }
    }

    /// Validate `name` and create a child directory of `kind`.
    fn new_child(&self, name: &str, kind: ObjectKind) -> Result<Object> {
        self.core().naming_rule().validate(&self.directory(), name)?;
        let child = self.object.child(name);
        store::create_object_directory(&child.directory(), kind)?;
        Ok(child)
    }

    // ---- lookup ----

    /// Look up `path`, following links.
    pub fn get(&self, path: &str) -> Result<Node> {
        self.resolve(path, 0)
    }

    pub(crate) fn resolve(&self, path: &str, hops: usize) -> Result<Node> {
        self.core().ensure_open()?;
        let (mut current, rest) = match path.strip_prefix('/') {
            Some(rest) => (self.root_group(), rest),
            None => (self.clone(), path),
        };
        let segments: Vec<&str> = rest
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(Node::Group(current));
        };

        for segment in parents {
            current = current.step(segment, path, hops)?.into_group().map_err(|_| {
                ExdirError::not_found(format!("{path}: {segment} is not a group"))
            })?;
        }
        current.step(last, path, hops)
    }

    /// Resolve one name segment below this group.
    fn step(&self, segment: &str, path: &str, hops: usize) -> Result<Node> {
        if segment == ".." {
            return self
                .parent()
                .map(Node::Group)
                .ok_or_else(|| ExdirError::not_found(format!("{path}: no parent above the root")));
        }
        let child = self.object.child(segment);
        match store::classify(&child.directory()) {
            Entry::Object(ObjectKind::File | ObjectKind::Group) => {
                Ok(Node::Group(Group::from_object(child)))
            }
            Entry::Object(ObjectKind::Dataset) => Ok(Node::Dataset(Dataset::open(child))),
            Entry::Object(ObjectKind::Link) => {
                let target = store::read_link(&child.directory())?
                    .ok_or_else(|| ExdirError::not_found(path.to_string()))?;
                link::follow(self, &target, hops + 1)
            }
            Entry::Raw => Ok(Node::Raw(Raw::new(child))),
            Entry::Missing | Entry::NotADirectory => Err(ExdirError::not_found(format!(
                "{path} (no {segment} in {})",
                self.name()
            ))),
        }
    }

    pub fn group(&self, path: &str) -> Result<Group> {
        self.get(path)?.into_group()
    }

    pub fn dataset(&self, path: &str) -> Result<Dataset> {
        self.get(path)?.into_dataset()
    }

    /// What `path` names, without following a final link.
    pub fn entry_kind(&self, path: &str) -> Result<EntryKind> {
        let (parent, leaf) = match self.split_parent(path) {
            Ok(found) => found,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::TypeKindConflict) => {
                return Ok(EntryKind::Missing)
            }
            Err(e) => return Err(e),
        };
        if leaf.is_empty() || leaf == "." || leaf == ".." {
            return Ok(EntryKind::Missing);
        }
        Ok(store::classify(&parent.directory().join(leaf)).into())
    }

    /// True for objects and links, dangling or not.
    pub fn contains(&self, path: &str) -> Result<bool> {
        Ok(matches!(
            self.entry_kind(path)?,
            EntryKind::Group | EntryKind::Dataset | EntryKind::Link
        ))
    }

    // ---- listing ----

    fn list(&self, keep: impl Fn(Entry) -> bool) -> Result<Vec<String>> {
        self.core().ensure_open()?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.directory())? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(group = %self.name(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            let kind = store::classify(&path);
            if kind == Entry::Raw && path.join(META_FILENAME).exists() {
                warn!(path = %path.display(), "unreadable object record, treating as raw");
            }
            if !keep(kind) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!(?name, "skipping entry with a non UTF-8 name"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Names of child objects, sorted. Links and raw directories are not
    /// included.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.list(Entry::is_object)
    }

    pub fn values(&self) -> Result<Vec<Node>> {
        self.keys()?.iter().map(|name| self.get(name)).collect()
    }

    pub fn items(&self) -> Result<Vec<(String, Node)>> {
        self.keys()?
            .into_iter()
            .map(|name| {
                let node = self.get(&name)?;
                Ok((name, node))
            })
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.keys()?.is_empty())
    }

    /// Links stored directly in this group, unresolved.
    pub fn links(&self) -> Result<Vec<(String, Link)>> {
        let mut links = Vec::new();
        for name in self.list(Entry::is_link)? {
            if let Some(link) = store::read_link(&self.directory().join(&name))? {
                links.push((name, link));
            }
        }
        Ok(links)
    }

    pub fn raw_names(&self) -> Result<Vec<String>> {
        self.list(|entry| entry == Entry::Raw)
    }

    /// Names of every object below this group, depth first in name order.
    /// Raw directories and links are skipped along with everything in them.
    pub fn descendants(&self) -> Result<Vec<String>> {
        self.core().ensure_open()?;
        let root = self.file_root().to_path_buf();
        let walker = WalkDir::new(self.directory())
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.file_type().is_dir() && store::is_valid_object_directory(entry.path())
            });

        let mut names = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(group = %self.name(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let relative = entry.path().strip_prefix(&root).unwrap_or(Path::new(""));
            names.push(name_of(relative));
        }
        Ok(names)
    }

    // ---- creation ----

    pub fn create_group(&self, path: &str) -> Result<Group> {
        self.core().ensure_writable()?;
        let (parent, name) = self.split_parent(path)?;
        let child = parent.new_child(&name, ObjectKind::Group)?;
        let meta = self
            .core()
            .pipeline()
            .create_object(Capability::Group, &child.name(), &child.directory())?;
        child.merge_meta(meta)?;
        debug!(name = %child.name(), "created group");
        Ok(Group::from_object(child))
    }

    /// The group at `path`, created if nothing is there yet.
    pub fn require_group(&self, path: &str) -> Result<Group> {
        match self.get(path) {
            Ok(Node::Group(group)) => Ok(group),
            Ok(other) => Err(other.conflict("group")),
            Err(e) if e.kind() == ErrorKind::NotFound => self.create_group(path),
            Err(e) => Err(e),
        }
    }

    /// Create a dataset from data or from a shape.
    ///
    /// ```no_run
    /// use exdir::{DatasetInit, File, OpenMode};
    ///
    /// let file = File::open("recording", OpenMode::Append)?;
    /// let spikes = file.create_dataset("spikes", vec![0.12f64, 0.57, 1.31])?;
    /// let lfp = file.create_dataset("lfp", DatasetInit::shape([32, 30000]))?;
    /// # Ok::<(), exdir::ExdirError>(())
    /// ```
    pub fn create_dataset(&self, path: &str, init: impl Into<DatasetInit>) -> Result<Dataset> {
        self.core().ensure_writable()?;
        let (value, from_data) = init.into().into_value()?;
        let (parent, name) = self.split_parent(path)?;
        let write = if from_data {
            self.core().pipeline().write_dataset(value)?
        } else {
            DatasetWrite::new(value)
        };
        let child = parent.new_child(&name, ObjectKind::Dataset)?;
        Dataset::create(child, write)
    }

    /// The dataset at `path`, created from `init` if nothing is there yet.
    ///
    /// An existing dataset must have the requested shape. Its dtype must
    /// equal the requested one when `exact` is set, and otherwise accept
    /// it without loss.
    pub fn require_dataset(
        &self,
        path: &str,
        init: impl Into<DatasetInit>,
        exact: bool,
    ) -> Result<Dataset> {
        let init = init.into();
        let dataset = match self.get(path) {
            Ok(Node::Dataset(dataset)) => dataset,
            Ok(other) => return Err(other.conflict("dataset")),
            Err(e) if e.kind() == ErrorKind::NotFound => return self.create_dataset(path, init),
            Err(e) => return Err(e),
        };

        if let Some(shape) = init.requested_shape() {
            let existing = dataset.shape()?;
            if shape != existing.as_slice() {
                return Err(ExdirError::ShapeMismatch {
                    expected: existing,
                    actual: shape.to_vec(),
                });
            }
        }
        if let Some(dtype) = init.requested_dtype() {
            let existing = dataset.dtype()?;
            let compatible = if exact {
                dtype == existing
            } else {
                dtype.can_cast_safe(existing)
            };
            if !compatible {
                return Err(ExdirError::DtypeMismatch {
                    expected: existing,
                    actual: dtype,
                });
            }
        }
        Ok(dataset)
    }

    /// Write `value` to the dataset at `path`, creating it if needed.
    pub fn set(&self, path: &str, value: impl Into<DatasetValue>) -> Result<Dataset> {
        let value = value.into();
        match self.get(path) {
            Ok(Node::Dataset(mut dataset)) => {
                dataset.set_data(value)?;
                Ok(dataset)
            }
            Ok(other) => Err(other.conflict("dataset")),
            Err(e) if e.kind() == ErrorKind::NotFound => self.create_dataset(path, value),
            Err(e) => Err(e),
        }
    }

    /// Store a link at `path`. The target is not checked.
    pub fn set_link(&self, path: &str, link: Link) -> Result<()> {
        self.core().ensure_writable()?;
        let (parent, name) = self.split_parent(path)?;
        self.core().naming_rule().validate(&parent.directory(), &name)?;
        store::create_link_directory(&parent.directory().join(&name), &link)?;
        debug!(name = %name_of(&parent.relative_path().join(&name)), %link, "created link");
        Ok(())
    }

    /// The link stored at `path`, if that entry is a link.
    pub fn link(&self, path: &str) -> Result<Option<Link>> {
        self.core().ensure_open()?;
        let (parent, name) = self.split_parent(path)?;
        if name.is_empty() {
            return Ok(None);
        }
        Ok(store::read_link(&parent.directory().join(name))?)
    }

    /// Delete the object, link or raw directory at `path` with everything
    /// below it.
    pub fn remove(&self, path: &str) -> Result<()> {
        self.core().ensure_writable()?;
        let (parent, name) = self.split_parent(path)?;
        if name.is_empty() || name == "." || name == ".." {
            return Err(ExdirError::not_found(path.to_string()));
        }
        let target = parent.directory().join(&name);
        match store::classify(&target) {
            Entry::Object(_) | Entry::Raw => {
                std::fs::remove_dir_all(&target)?;
                debug!(path = %target.display(), "removed");
                Ok(())
            }
            Entry::Missing | Entry::NotADirectory => Err(ExdirError::not_found(path.to_string())),
        }
    }
}
