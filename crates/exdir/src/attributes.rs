//! Dictionary-like views over an object's records.
//!
//! An [`Attributes`] value holds no data. Every call reads the record from
//! disk, and every change rewrites the whole record, so two views of the
//! same object always agree. [`Attributes::scope`] narrows a view to a
//! nested mapping without touching the disk.
//!
//! The attributes record goes through the attribute stages of the file's
//! plugin pipeline in both directions. The meta record never does.

use exdir_plugin::merge_into;
use exdir_store::record;
use exdir_types::{AttrMap, AttrValue};

use crate::error::Result;
use crate::object::Object;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Attributes,
    Meta,
}

/// A path-scoped view of `attributes.yaml` or `exdir.yaml`.
///
/// ```no_run
/// use exdir::{File, OpenMode, Quantity};
///
/// let file = File::open("session", OpenMode::Append)?;
/// let attrs = file.attrs();
/// attrs.set("rate", Quantity::scalar(30000.0, "Hz"))?;
/// attrs.set("electrode", exdir::AttrMap::new())?;
/// attrs.scope("electrode").set("material", "tungsten")?;
/// assert_eq!(attrs.get_path(&["electrode", "material"])?.unwrap().as_str(), Some("tungsten"));
/// # Ok::<(), exdir::ExdirError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Attributes {
    object: Object,
    kind: RecordKind,
    scope: Vec<String>,
}

impl Attributes {
    pub(crate) fn new(object: Object, kind: RecordKind) -> Self {
        Self {
            object,
            kind,
            scope: Vec::new(),
        }
    }

    /// A view of the mapping stored under `key`.
    pub fn scope(&self, key: impl Into<String>) -> Self {
        let mut scoped = self.clone();
        scoped.scope.push(key.into());
        scoped
    }

    /// Keys leading from the record root to this view.
    pub fn path(&self) -> &[String] {
        &self.scope
    }

    pub fn is_meta(&self) -> bool {
        self.kind == RecordKind::Meta
    }

    // ---- reading ----

    /// The whole record, after the attribute read stages.
    ///
    /// Required-plugin markers are checked even with no plugins enabled.
    fn load(&self) -> Result<AttrMap> {
        let core = self.object.core();
        core.ensure_open()?;
        let map = self.object.record(self.kind).load()?;
        if self.kind == RecordKind::Meta {
            return Ok(map);
        }
        let meta = self.object.record(RecordKind::Meta).load()?;
        Ok(core.pipeline().read_attributes(map, &meta)?)
    }

    /// The mapping this view covers. A scope that does not exist (yet)
    /// reads as empty.
    pub fn to_map(&self) -> Result<AttrMap> {
        let map = self.load()?;
        Ok(record::lookup(&map, &self.scope).cloned().unwrap_or_default())
    }

    pub fn get(&self, key: &str) -> Result<Option<AttrValue>> {
        Ok(self.to_map()?.remove(key))
    }

    /// Value at a nested key path below this view.
    pub fn get_path(&self, path: &[&str]) -> Result<Option<AttrValue>> {
        let map = self.to_map()?;
        let path: Vec<String> = path.iter().map(|k| k.to_string()).collect();
        Ok(record::get_path(&map, &path).cloned())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.to_map()?.contains_key(key))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.to_map()?.into_keys().collect())
    }

    pub fn values(&self) -> Result<Vec<AttrValue>> {
        Ok(self.to_map()?.into_values().collect())
    }

    pub fn items(&self) -> Result<Vec<(String, AttrValue)>> {
        Ok(self.to_map()?.into_iter().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.to_map()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.to_map()?.is_empty())
    }

    // ---- writing ----

    pub fn set(&self, key: impl Into<String>, value: impl Into<AttrValue>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|map| {
            map.insert(key, value);
            Ok(())
        })
    }

    /// Remove `key`, returning its stored value.
    pub fn remove(&self, key: &str) -> Result<Option<AttrValue>> {
        self.modify(|map| Ok(map.remove(key)))
    }

    /// Set every pair in one record write.
    pub fn update<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        self.modify(|map| {
            map.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
            Ok(())
        })
    }

    /// Read-modify-write of the record, with `f` applied to this view's
    /// mapping. Fails `NotFound` if the scope does not exist.
    pub(crate) fn modify<T>(&self, f: impl FnOnce(&mut AttrMap) -> Result<T>) -> Result<T> {
        let core = self.object.core();
        core.ensure_writable()?;
        let file = self.object.record(self.kind);
        // Stages see the decoded record so a rewrite never encodes twice.
        let mut map = self.load()?;
        let out = f(record::lookup_mut(&mut map, &self.scope)?)?;

        match self.kind {
            RecordKind::Meta => file.store(&map)?,
            RecordKind::Attributes => {
                let written = core.pipeline().write_attributes(map)?;
                file.store(&written.attrs)?;
                if !written.meta.is_empty() {
                    self.object.record(RecordKind::Meta).modify(|meta| {
                        merge_into(meta, written.meta);
                        Ok(())
                    })?;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::{File, OpenMode};
    use exdir_types::{ArrayValue, AttrMap, AttrValue, ErrorKind, Quantity};

    fn file(dir: &tempfile::TempDir) -> File {
        File::open(dir.path().join("attrs"), OpenMode::Append).unwrap()
    }

    #[test]
    fn missing_record_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let attrs = file.attrs();
        assert!(attrs.is_empty().unwrap());
        assert_eq!(attrs.get("anything").unwrap(), None);
        assert!(!file.directory().join("attributes.yaml").exists());
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let attrs = file.attrs();
        attrs.set("count", 3).unwrap();
        attrs.set("label", "left hemisphere").unwrap();
        attrs.update([("a", 1.5), ("b", 2.5)]).unwrap();

        assert_eq!(attrs.keys().unwrap(), ["a", "b", "count", "label"]);
        assert_eq!(attrs.get("count").unwrap(), Some(AttrValue::Int(3)));
        assert_eq!(attrs.len().unwrap(), 4);
        assert_eq!(attrs.remove("a").unwrap(), Some(AttrValue::Float(1.5)));
        assert_eq!(attrs.remove("a").unwrap(), None);
        assert!(!attrs.contains("a").unwrap());

        // A second view sees the same record.
        assert_eq!(file.attrs().get("label").unwrap().unwrap().as_str(), Some("left hemisphere"));
    }

    #[test]
    fn nested_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let attrs = file.attrs();
        attrs.set("probe", AttrMap::new()).unwrap();
        let probe = attrs.scope("probe");
        probe.set("channels", 64).unwrap();
        probe.set("geometry", AttrMap::new()).unwrap();
        probe.scope("geometry").set("pitch", 20.0).unwrap();

        assert_eq!(probe.path(), ["probe"]);
        assert_eq!(
            attrs.get_path(&["probe", "geometry", "pitch"]).unwrap(),
            Some(AttrValue::Float(20.0))
        );
        assert_eq!(probe.keys().unwrap(), ["channels", "geometry"]);

        let err = attrs.scope("missing").set("x", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = probe.scope("channels").set("x", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(attrs.scope("missing").to_map().unwrap().is_empty());
    }

    #[test]
    fn quantity_attribute_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let quantity = Quantity::new(vec![1i64, 2, 3], "m");
        file.attrs().set("position", quantity.clone()).unwrap();
        let read = file.attrs().get("position").unwrap().unwrap();
        assert_eq!(read.as_quantity(), Some(&quantity));

        let with_uncertainty =
            Quantity::new(vec![1.0f64, 2.0], "mV").with_uncertainty(vec![3i64, 4]);
        file.attrs().set("noise", with_uncertainty.clone()).unwrap();
        let read = file.attrs().get("noise").unwrap().unwrap();
        let read = read.as_quantity().unwrap();
        assert_eq!(read, &with_uncertainty);
        assert_eq!(read.uncertainty, Some(ArrayValue::from(vec![3i64, 4])));
    }

    #[test]
    fn meta_is_separate_from_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        file.meta().set("note", "bookkeeping").unwrap();

        assert!(file.meta().is_meta());
        assert!(file.meta().contains("exdir").unwrap());
        assert_eq!(
            file.meta().get_path(&["exdir", "type"]).unwrap(),
            Some(AttrValue::from("file"))
        );
        assert!(!file.attrs().contains("note").unwrap());
    }

    #[test]
    fn writes_fail_on_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        file(&dir).attrs().set("x", 1).unwrap();
        let read_only = File::open(dir.path().join("attrs"), OpenMode::ReadOnly).unwrap();
        assert_eq!(read_only.attrs().get("x").unwrap(), Some(AttrValue::Int(1)));
        let err = read_only.attrs().set("x", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
        let err = read_only.meta().remove("exdir").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
    }
}
