use std::path::Path;

use exdir_types::{AttrMap, DatasetValue};

use crate::error::PluginResult;

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Output of a dataset write stage: the (possibly transformed) value plus
/// attribute and meta entries to merge into the dataset's records.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetWrite {
    pub value: DatasetValue,
    pub attrs: AttrMap,
    pub meta: AttrMap,
}

impl DatasetWrite {
    /// Pass `value` through without contributing any records.
    pub fn new(value: DatasetValue) -> Self {
        Self {
            value,
            attrs: AttrMap::new(),
            meta: AttrMap::new(),
        }
    }
}

/// Output of an attribute write stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeWrite {
    pub attrs: AttrMap,
    pub meta: AttrMap,
}

impl AttributeWrite {
    pub fn new(attrs: AttrMap) -> Self {
        Self {
            attrs,
            meta: AttrMap::new(),
        }
    }
}

/// Records of the dataset being read, as stored on disk.
#[derive(Clone, Copy, Debug)]
pub struct ReadContext<'a> {
    pub attrs: &'a AttrMap,
    pub meta: &'a AttrMap,
}

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// Transforms dataset values on their way to and from disk.
///
/// Both directions default to passing the value through, so a stage only
/// implements the side it cares about.
pub trait DatasetStage: Send + Sync {
    fn prepare_write(&self, value: DatasetValue) -> PluginResult<DatasetWrite> {
        Ok(DatasetWrite::new(value))
    }

    fn prepare_read(
        &self,
        value: DatasetValue,
        _context: &ReadContext<'_>,
    ) -> PluginResult<DatasetValue> {
        Ok(value)
    }
}

/// Transforms a whole attribute record on write and on read.
pub trait AttributeStage: Send + Sync {
    fn prepare_write(&self, attrs: AttrMap) -> PluginResult<AttributeWrite> {
        Ok(AttributeWrite::new(attrs))
    }

    fn prepare_read(&self, attrs: AttrMap, _meta: &AttrMap) -> PluginResult<AttrMap> {
        Ok(attrs)
    }
}

/// Runs when a group, file or raw directory is created.
///
/// The returned map is merged into the new object's meta record. Raw
/// directories have no record, so their contributions are discarded.
pub trait ObjectStage: Send + Sync {
    fn on_create(&self, name: &str, directory: &Path) -> PluginResult<AttrMap>;
}

/// Any closure with the right signature is an object stage.
impl<F> ObjectStage for F
where
    F: Fn(&str, &Path) -> PluginResult<AttrMap> + Send + Sync,
{
    fn on_create(&self, name: &str, directory: &Path) -> PluginResult<AttrMap> {
        self(name, directory)
    }
}
