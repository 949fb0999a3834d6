//! YAML record files and path-scoped access into them.
//!
//! Records are small, so every change is a read-modify-write of the
//! whole file.

use std::path::{Path, PathBuf};

use exdir_types::{AttrMap, AttrValue};

use crate::codec;
use crate::error::{StoreError, StoreResult};

/// One YAML record on disk (`attributes.yaml` or `exdir.yaml`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the record. A missing file reads as an empty mapping.
    pub fn load(&self) -> StoreResult<AttrMap> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AttrMap::new()),
            Err(e) => return Err(e.into()),
        };
        let value: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|source| StoreError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        codec::map_from_yaml(&value).map_err(|reason| StoreError::invalid_record(&self.path, reason))
    }

    /// Replace the record with `map`.
    pub fn store(&self, map: &AttrMap) -> StoreResult<()> {
        let text = serde_yaml::to_string(&codec::map_to_yaml(map)).map_err(|source| {
            StoreError::Yaml {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    /// Load, apply `f`, and store the result if `f` succeeds.
    pub fn modify<T>(&self, f: impl FnOnce(&mut AttrMap) -> StoreResult<T>) -> StoreResult<T> {
        let mut map = self.load()?;
        let out = f(&mut map)?;
        self.store(&map)?;
        Ok(out)
    }
}

/// The mapping at `scope` inside `map`, if every step is a mapping.
pub fn lookup<'a>(map: &'a AttrMap, scope: &[String]) -> Option<&'a AttrMap> {
    scope
        .iter()
        .try_fold(map, |current, key| current.get(key)?.as_map())
}

/// Mutable mapping at `scope`. Fails `NotFound` when a step is missing or
/// is not a mapping.
pub fn lookup_mut<'a>(map: &'a mut AttrMap, scope: &[String]) -> StoreResult<&'a mut AttrMap> {
    let mut current = map;
    for (depth, key) in scope.iter().enumerate() {
        current = current
            .get_mut(key)
            .and_then(AttrValue::as_map_mut)
            .ok_or_else(|| StoreError::NotFound(scope[..=depth].join("/")))?;
    }
    Ok(current)
}

/// Value at a nested key path.
pub fn get_path<'a>(map: &'a AttrMap, path: &[String]) -> Option<&'a AttrValue> {
    let (last, parents) = path.split_last()?;
    lookup(map, parents)?.get(last)
}
