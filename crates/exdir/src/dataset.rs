//! Datasets: one `.npy` array per directory, memory-mapped on first use.
//!
//! Each [`Dataset`] handle owns its own mapping of `data.npy`. Writes through
//! one mapping land in the shared page cache, so other handles on the same
//! file see them immediately. Replacing the array file (a reshape) only
//! remaps the handle that did it; other handles keep the old contents until
//! they [`reload`](Dataset::reload).
//!
//! A `unit` attribute marks a dataset as a physical quantity. Reads then
//! return [`DatasetValue::Quantity`], with the uncertainty taken from the
//! `uncertainty` attribute when present.

use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use exdir_array::{AxisSelection, MappedArray, Selection};
use exdir_plugin::{merge_into, DatasetWrite};
use exdir_store::layout::DATA_FILENAME;
use exdir_types::ndarray::{ArrayViewD, ArrayViewMutD};
use exdir_types::{
    ArrayValue, AttrMap, AttrValue, DType, DatasetValue, Element, Quantity, Scalar,
};
use tracing::debug;

use crate::attributes::RecordKind;
use crate::error::{ExdirError, Result};
use crate::file::{read_lock, write_lock};
use crate::object::Object;

/// Attribute holding the unit of a quantity dataset.
pub const UNIT_KEY: &str = "unit";
/// Attribute holding the uncertainty of a quantity dataset.
pub const UNCERTAINTY_KEY: &str = "uncertainty";

// ---------------------------------------------------------------------------
// Mapping slot
// ---------------------------------------------------------------------------

/// The mapping behind one handle. Shared with the file only so `close` can
/// reach it.
pub(crate) enum Slot {
    Unmapped,
    Mapped(MappedArray),
    Released,
}

impl Slot {
    pub(crate) fn flush(&self) -> Result<()> {
        if let Self::Mapped(mapped) = self {
            mapped.flush()?;
        }
        Ok(())
    }

    /// Flush and drop the mapping for good.
    pub(crate) fn release(&mut self) -> Result<()> {
        let flushed = self.flush();
        *self = Self::Released;
        flushed
    }
}

// ---------------------------------------------------------------------------
// Creation parameters
// ---------------------------------------------------------------------------

/// How to initialise a new dataset: from data, or from a shape filled with
/// a constant.
///
/// ```
/// use exdir::{DatasetInit, DType, Scalar};
///
/// let zeros = DatasetInit::shape([10, 3]);
/// let ones = DatasetInit::shape([4]).dtype(DType::I32).fillvalue(Scalar::Int(1));
/// let given = DatasetInit::data(vec![1.0f64, 2.0, 3.0]);
/// # let _ = (zeros, ones, given);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetInit {
    pub data: Option<DatasetValue>,
    pub shape: Option<Vec<usize>>,
    pub dtype: Option<DType>,
    pub fillvalue: Option<Scalar>,
}

impl DatasetInit {
    pub fn data(value: impl Into<DatasetValue>) -> Self {
        Self {
            data: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn shape(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: Some(shape.into()),
            ..Self::default()
        }
    }

    pub fn with_shape(mut self, shape: impl Into<Vec<usize>>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn fillvalue(mut self, fill: Scalar) -> Self {
        self.fillvalue = Some(fill);
        self
    }

    /// Shape the dataset will have, if known without building it.
    pub(crate) fn requested_shape(&self) -> Option<&[usize]> {
        self.shape
            .as_deref()
            .or_else(|| self.data.as_ref().map(DatasetValue::shape))
    }

    pub(crate) fn requested_dtype(&self) -> Option<DType> {
        self.dtype
            .or_else(|| self.data.as_ref().map(DatasetValue::dtype))
    }

    /// Check the parameters against each other and produce the value to
    /// store. Only given data is a candidate for the write pipeline.
    pub(crate) fn into_value(self) -> Result<(DatasetValue, bool)> {
        match self.data {
            Some(data) => {
                if let Some(shape) = self.shape {
                    if shape != data.shape() {
                        return Err(ExdirError::ShapeMismatch {
                            expected: shape,
                            actual: data.shape().to_vec(),
                        });
                    }
                }
                let data = match self.dtype {
                    Some(dtype) if dtype != data.dtype() => {
                        if !data.dtype().can_cast_safe(dtype) {
                            return Err(ExdirError::DtypeMismatch {
                                expected: dtype,
                                actual: data.dtype(),
                            });
                        }
                        data.map_array(|a| a.cast(dtype))
                    }
                    _ => data,
                };
                Ok((data, true))
            }
            None => {
                let shape = self.shape.ok_or(ExdirError::MissingShapeOrData)?;
                let dtype = self.dtype.unwrap_or(DType::F64);
                let fill = self.fillvalue.unwrap_or(Scalar::Int(0));
                Ok((ArrayValue::full(dtype, &shape, fill).into(), false))
            }
        }
    }
}

impl From<DatasetValue> for DatasetInit {
    fn from(value: DatasetValue) -> Self {
        Self::data(value)
    }
}

impl From<ArrayValue> for DatasetInit {
    fn from(value: ArrayValue) -> Self {
        Self::data(value)
    }
}

impl From<Quantity> for DatasetInit {
    fn from(value: Quantity) -> Self {
        Self::data(value)
    }
}

impl<T: Element> From<Vec<T>> for DatasetInit {
    fn from(value: Vec<T>) -> Self {
        Self::data(value)
    }
}

/// Split a value into the stored magnitudes and the attributes that carry
/// its unit and uncertainty.
fn decompose(value: DatasetValue) -> (ArrayValue, Option<(String, Option<ArrayValue>)>) {
    match value {
        DatasetValue::Array(array) => (array, None),
        DatasetValue::Quantity(q) => (q.value, Some((q.unit, q.uncertainty))),
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Handle to a dataset.
///
/// Reading methods take `&self`; anything that writes or remaps takes
/// `&mut self`, so a view borrowed from a handle cannot outlive a reshape
/// of that handle.
pub struct Dataset {
    object: Object,
    slot: Arc<RwLock<Slot>>,
}

impl Dataset {
    /// A handle that maps its array file on first use.
    pub(crate) fn open(object: Object) -> Self {
        Self::with_slot(object, Slot::Unmapped)
    }

    fn with_slot(object: Object, slot: Slot) -> Self {
        let slot = Arc::new(RwLock::new(slot));
        object.core().register(&slot);
        Self { object, slot }
    }

    /// Write the array file into an already created dataset directory.
    pub(crate) fn create(object: Object, write: DatasetWrite) -> Result<Self> {
        let (array, quantity) = decompose(write.value);
        let path = object.directory().join(DATA_FILENAME);
        let mapped = MappedArray::create(&path, &array, object.core().access_mode())?;

        let mut attrs = write.attrs;
        if let Some((unit, uncertainty)) = quantity {
            attrs.insert(UNIT_KEY.into(), unit.into());
            if let Some(uncertainty) = uncertainty {
                attrs.insert(UNCERTAINTY_KEY.into(), uncertainty.into());
            }
        }
        if !attrs.is_empty() {
            object.attrs().update(attrs)?;
        }
        object.merge_meta(write.meta)?;

        debug!(
            name = %object.name(),
            dtype = %array.dtype(),
            shape = ?array.shape(),
            "created dataset"
        );
        Ok(Self::with_slot(object, Slot::Mapped(mapped)))
    }

    fn data_path(&self) -> PathBuf {
        self.object.directory().join(DATA_FILENAME)
    }

    fn map_if_needed(&self, slot: &mut Slot) -> Result<()> {
        if let Slot::Unmapped = slot {
            let mapped = MappedArray::open(&self.data_path(), self.object.core().access_mode())?;
            *slot = Slot::Mapped(mapped);
        }
        Ok(())
    }

    fn mapped<T>(&self, f: impl FnOnce(&MappedArray) -> Result<T>) -> Result<T> {
        self.object.core().ensure_open()?;
        self.map_if_needed(&mut write_lock(&self.slot))?;
        match &*read_lock(&self.slot) {
            Slot::Mapped(mapped) => f(mapped),
            Slot::Unmapped | Slot::Released => Err(ExdirError::Closed),
        }
    }

    fn mapped_mut<T>(&mut self, f: impl FnOnce(&mut MappedArray) -> Result<T>) -> Result<T> {
        self.object.core().ensure_writable()?;
        let mut slot = write_lock(&self.slot);
        self.map_if_needed(&mut slot)?;
        match &mut *slot {
            Slot::Mapped(mapped) => f(mapped),
            Slot::Unmapped | Slot::Released => Err(ExdirError::Closed),
        }
    }

    /// The `unit` attribute as stored.
    fn stored_unit(&self) -> Result<Option<String>> {
        let attrs = self.object.record(RecordKind::Attributes).load()?;
        Ok(attrs
            .get(UNIT_KEY)
            .and_then(AttrValue::as_str)
            .map(str::to_string))
    }

    fn merge_records(&self, attrs: AttrMap, meta: AttrMap) -> Result<()> {
        if !attrs.is_empty() {
            self.object.attrs().update(attrs)?;
        }
        self.object.merge_meta(meta)
    }

    // ---- shape and type ----

    pub fn shape(&self) -> Result<Vec<usize>> {
        self.mapped(|m| Ok(m.shape().to_vec()))
    }

    pub fn dtype(&self) -> Result<DType> {
        self.mapped(|m| Ok(m.dtype()))
    }

    pub fn ndim(&self) -> Result<usize> {
        self.mapped(|m| Ok(m.ndim()))
    }

    /// Number of elements.
    pub fn size(&self) -> Result<usize> {
        self.mapped(|m| Ok(m.len()))
    }

    pub fn is_scalar(&self) -> Result<bool> {
        Ok(self.ndim()? == 0)
    }

    /// Length of the first axis. Zero-dimensional datasets have none.
    pub fn len(&self) -> Result<usize> {
        self.shape()?
            .first()
            .copied()
            .ok_or_else(|| ExdirError::NotIterable(self.object.name()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    // ---- reading ----

    /// Everything, through the dataset read pipeline.
    pub fn data(&self) -> Result<DatasetValue> {
        self.get(&Selection::all())
    }

    /// The selected region, through the dataset read pipeline.
    pub fn get(&self, selection: &Selection) -> Result<DatasetValue> {
        let (shape, array) = self.mapped(|m| Ok((m.shape().to_vec(), m.read(selection)?)))?;
        let attrs = self.object.record(RecordKind::Attributes).load()?;

        let value = match attrs.get(UNIT_KEY).and_then(AttrValue::as_str) {
            Some(unit) => {
                let uncertainty = attrs
                    .get(UNCERTAINTY_KEY)
                    .and_then(AttrValue::to_array)
                    .map(|u| {
                        // Element-wise uncertainties follow the selection.
                        if u.shape() == shape.as_slice() && !selection.is_all() {
                            selection.apply(&u)
                        } else {
                            Ok(u)
                        }
                    })
                    .transpose()?;
                DatasetValue::Quantity(Quantity {
                    value: array,
                    unit: unit.to_string(),
                    uncertainty,
                })
            }
            None => DatasetValue::Array(array),
        };

        // Required-plugin markers are checked even with no plugins enabled.
        let meta = self.object.record(RecordKind::Meta).load()?;
        Ok(self
            .object
            .core()
            .pipeline()
            .read_dataset(value, &attrs, &meta)?)
    }

    /// One stored element, without unit or plugins.
    pub fn get_scalar(&self, index: &[isize]) -> Result<Scalar> {
        let selection = Selection::new(index.iter().map(|&i| AxisSelection::Index(i)).collect());
        let value = self.mapped(|m| Ok(m.read(&selection)?))?;
        value.scalar().ok_or_else(|| ExdirError::ShapeMismatch {
            expected: Vec::new(),
            actual: value.shape().to_vec(),
        })
    }

    /// First-axis iteration, each row read through [`Dataset::get`].
    pub fn rows(&self) -> Result<Rows<'_>> {
        let len = self.len()?;
        Ok(Rows {
            dataset: self,
            next: 0,
            len,
        })
    }

    /// Run `f` on a typed view of the live mapping. Bypasses plugins.
    pub fn view<T: Element, R>(&self, f: impl FnOnce(ArrayViewD<'_, T>) -> R) -> Result<R> {
        self.mapped(|m| Ok(f(m.view::<T>()?)))
    }

    /// Run `f` on a mutable typed view of the live mapping. Bypasses plugins.
    pub fn view_mut<T: Element, R>(
        &mut self,
        f: impl FnOnce(ArrayViewMutD<'_, T>) -> R,
    ) -> Result<R> {
        self.mapped_mut(|m| Ok(f(m.view_mut::<T>()?)))
    }

    // ---- writing ----

    /// Write `value` into the selected region of the existing array.
    ///
    /// Quantities must carry the dataset's unit. Only magnitudes are
    /// written; the stored uncertainty is left alone.
    pub fn set(&mut self, selection: &Selection, value: impl Into<DatasetValue>) -> Result<()> {
        self.object.core().ensure_writable()?;
        let write = self.object.core().pipeline().write_dataset(value.into())?;
        let array = match write.value {
            DatasetValue::Array(array) => array,
            DatasetValue::Quantity(q) => {
                let stored = self.stored_unit()?;
                if stored.as_deref() != Some(q.unit.as_str()) {
                    return Err(ExdirError::UnitMismatch {
                        expected: stored,
                        actual: q.unit,
                    });
                }
                q.value
            }
        };
        self.mapped_mut(|m| Ok(m.write(selection, &array)?))?;
        self.merge_records(write.attrs, write.meta)
    }

    /// Replace the whole dataset.
    ///
    /// Values of the same shape and dtype are written in place; anything
    /// else replaces the array file. The `unit` and `uncertainty`
    /// attributes follow the new value; other attributes are kept.
    pub fn set_data(&mut self, value: impl Into<DatasetValue>) -> Result<()> {
        self.replace(value.into(), false)
    }

    /// Like [`Dataset::set_data`], but always rewrites the array file.
    pub fn reset(&mut self, value: impl Into<DatasetValue>) -> Result<()> {
        self.replace(value.into(), true)
    }

    fn replace(&mut self, value: DatasetValue, rewrite: bool) -> Result<()> {
        self.object.core().ensure_writable()?;
        let write = self.object.core().pipeline().write_dataset(value)?;
        let (array, quantity) = decompose(write.value);

        let (shape, dtype) = self.mapped(|m| Ok((m.shape().to_vec(), m.dtype())))?;
        if !rewrite && shape == array.shape() && dtype == array.dtype() {
            self.mapped_mut(|m| Ok(m.write(&Selection::all(), &array)?))?;
        } else {
            self.rewrite_file(&array)?;
        }

        let attrs = write.attrs;
        self.object.attrs().modify(|stored| {
            stored.remove(UNIT_KEY);
            stored.remove(UNCERTAINTY_KEY);
            if let Some((unit, uncertainty)) = quantity {
                stored.insert(UNIT_KEY.into(), unit.into());
                if let Some(uncertainty) = uncertainty {
                    stored.insert(UNCERTAINTY_KEY.into(), uncertainty.into());
                }
            }
            merge_into(stored, attrs);
            Ok(())
        })?;
        self.object.merge_meta(write.meta)
    }

    fn rewrite_file(&mut self, array: &ArrayValue) -> Result<()> {
        let mut slot = write_lock(&self.slot);
        // The old mapping must be gone before its file is.
        *slot = Slot::Unmapped;
        let path = self.data_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *slot = Slot::Mapped(MappedArray::create(
            &path,
            array,
            self.object.core().access_mode(),
        )?);
        debug!(
            name = %self.object.name(),
            dtype = %array.dtype(),
            shape = ?array.shape(),
            "rewrote dataset array"
        );
        Ok(())
    }

    // ---- mapping lifecycle ----

    /// Force pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.object.core().ensure_open()?;
        read_lock(&self.slot).flush()
    }

    /// Drop the mapping; the next access maps the file again.
    pub fn reload(&mut self) -> Result<()> {
        self.object.core().ensure_open()?;
        *write_lock(&self.slot) = Slot::Unmapped;
        Ok(())
    }
}

impl Deref for Dataset {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.object
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapped = matches!(*read_lock(&self.slot), Slot::Mapped(_));
        f.debug_struct("Dataset")
            .field("object", &self.object)
            .field("mapped", &mapped)
            .finish()
    }
}

/// Iterator over the first axis of a dataset.
#[derive(Debug)]
pub struct Rows<'a> {
    dataset: &'a Dataset,
    next: usize,
    len: usize,
}

impl Iterator for Rows<'_> {
    type Item = Result<DatasetValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let index = self.next as isize;
        self.next += 1;
        Some(self.dataset.get(&Selection::index(index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Rows<'_> {}

#[cfg(test)]
mod tests {
    use crate::{DatasetInit, File, OpenMode, Selection};
    use exdir_types::ndarray::array;
    use exdir_types::{ArrayValue, AttrValue, DType, DatasetValue, ErrorKind, Quantity, Scalar};

    fn file(dir: &tempfile::TempDir) -> File {
        File::open(dir.path().join("data"), OpenMode::Append).unwrap()
    }

    #[test]
    fn create_from_shape_fills_constant() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let ds = file
            .create_dataset("ones", DatasetInit::shape([2, 2]).dtype(DType::I32).fillvalue(Scalar::Int(1)))
            .unwrap();
        assert_eq!(ds.shape().unwrap(), [2, 2]);
        assert_eq!(ds.dtype().unwrap(), DType::I32);
        assert_eq!(ds.get_scalar(&[1, 1]).unwrap(), Scalar::Int(1));

        let zeros = file.create_dataset("zeros", DatasetInit::shape([3])).unwrap();
        assert_eq!(zeros.dtype().unwrap(), DType::F64);
        assert_eq!(zeros.data().unwrap(), DatasetValue::from(vec![0.0f64; 3]));
    }

    #[test]
    fn create_checks_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let err = file.create_dataset("none", DatasetInit::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        let err = file
            .create_dataset("bad", DatasetInit::data(vec![1i32, 2]).with_shape([3]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        let err = file
            .create_dataset("narrow", DatasetInit::data(vec![1.5f64]).dtype(DType::I64))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DtypeMismatch);

        let widened = file
            .create_dataset("wide", DatasetInit::data(vec![1i16, 2]).dtype(DType::F64))
            .unwrap();
        assert_eq!(widened.dtype().unwrap(), DType::F64);
    }

    #[test]
    fn partial_write_is_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut first = file.create_dataset("shared", vec![0i64; 5]).unwrap();
        let second = file.dataset("shared").unwrap();
        assert_eq!(first, second);

        first
            .set(&Selection::range(1, 3), vec![7i64, 8])
            .unwrap();
        assert_eq!(second.data().unwrap(), DatasetValue::from(vec![0i64, 7, 8, 0, 0]));
    }

    #[test]
    fn reshape_replaces_array_and_keeps_other_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut ds = file.create_dataset("trace", vec![1.0f64, 2.0, 3.0]).unwrap();
        ds.attrs().set("channel", 4).unwrap();

        let replacement = ArrayValue::from(array![[1u8, 2], [3, 4]].into_dyn());
        ds.set_data(replacement.clone()).unwrap();
        assert_eq!(ds.shape().unwrap(), [2, 2]);
        assert_eq!(ds.dtype().unwrap(), DType::U8);
        assert_eq!(ds.data().unwrap(), DatasetValue::Array(replacement.clone()));
        assert_eq!(ds.attrs().get("channel").unwrap(), Some(AttrValue::Int(4)));

        // A handle opened after the reshape maps the new file.
        let fresh = file.dataset("trace").unwrap();
        assert_eq!(fresh.data().unwrap(), DatasetValue::Array(replacement));
    }

    #[test]
    fn reset_always_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut ds = file.create_dataset("same", vec![1i32, 2]).unwrap();
        ds.reset(vec![3i32, 4]).unwrap();
        assert_eq!(ds.data().unwrap(), DatasetValue::from(vec![3i32, 4]));
    }

    #[test]
    fn quantity_dataset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let quantity =
            Quantity::new(vec![1.0f64, 2.0, 3.0], "mV").with_uncertainty(vec![0.5f64, 0.5, 0.25]);
        let mut ds = file.create_dataset("voltage", quantity.clone()).unwrap();

        assert_eq!(ds.attrs().get("unit").unwrap(), Some(AttrValue::from("mV")));
        assert_eq!(ds.data().unwrap(), DatasetValue::Quantity(quantity));

        let tail = ds.get(&Selection::range(1, 3)).unwrap();
        let tail = tail.as_quantity().unwrap();
        assert_eq!(tail.value, ArrayValue::from(vec![2.0f64, 3.0]));
        assert_eq!(tail.uncertainty, Some(ArrayValue::from(vec![0.5f64, 0.25])));

        ds.set(&Selection::index(0), Quantity::scalar(9.0, "mV")).unwrap();
        let err = ds
            .set(&Selection::index(0), Quantity::scalar(9.0, "V"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnitMismatch);

        ds.set_data(vec![1.0f64, 2.0, 3.0]).unwrap();
        assert!(!ds.attrs().contains("unit").unwrap());
        assert!(!ds.attrs().contains("uncertainty").unwrap());
        assert_eq!(ds.data().unwrap().unit(), None);
    }

    #[test]
    fn views_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut ds = file
            .create_dataset("grid", ArrayValue::from(array![[1i32, 2], [3, 4], [5, 6]].into_dyn()))
            .unwrap();

        let total = ds.view::<i32, _>(|v| v.sum()).unwrap();
        assert_eq!(total, 21);
        let err = ds.view::<f64, _>(|v| v.len()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DtypeMismatch);

        ds.view_mut::<i32, _>(|mut v| v[[0, 0]] = 10).unwrap();
        assert_eq!(ds.get_scalar(&[0, 0]).unwrap(), Scalar::Int(10));

        let rows: Vec<_> = ds.rows().unwrap().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], DatasetValue::from(vec![5i32, 6]));
        assert_eq!(ds.len().unwrap(), 3);
        assert_eq!(ds.size().unwrap(), 6);
    }

    #[test]
    fn zero_dimensional_dataset_is_not_iterable() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let ds = file.create_dataset("scalar", ArrayValue::from_scalar(Scalar::Float(2.5))).unwrap();
        assert!(ds.is_scalar().unwrap());
        assert_eq!(ds.get_scalar(&[]).unwrap(), Scalar::Float(2.5));
        assert_eq!(ds.len().unwrap_err().kind(), ErrorKind::NotIterable);
        assert_eq!(ds.rows().unwrap_err().kind(), ErrorKind::NotIterable);
    }

    #[test]
    fn read_only_file_maps_read_only() {
        let dir = tempfile::tempdir().unwrap();
        file(&dir).create_dataset("fixed", vec![1u16, 2]).unwrap();

        let file = File::open(dir.path().join("data"), OpenMode::ReadOnly).unwrap();
        let mut ds = file.dataset("fixed").unwrap();
        assert_eq!(ds.data().unwrap(), DatasetValue::from(vec![1u16, 2]));
        let err = ds.set(&Selection::all(), vec![3u16, 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
        let err = ds.view_mut::<u16, _>(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
    }

    #[test]
    fn close_releases_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut ds = file.create_dataset("closing", vec![1i64, 2, 3]).unwrap();
        ds.set(&Selection::index(0), vec![5i64]).unwrap();
        file.close().unwrap();

        assert_eq!(ds.data().unwrap_err().kind(), ErrorKind::Closed);
        assert_eq!(ds.reload().unwrap_err().kind(), ErrorKind::Closed);

        let reopened = File::open(dir.path().join("data"), OpenMode::ReadOnly).unwrap();
        let ds = reopened.dataset("closing").unwrap();
        assert_eq!(ds.data().unwrap(), DatasetValue::from(vec![5i64, 2, 3]));
    }

    #[test]
    fn reload_picks_up_replacement_from_other_handle() {
        let dir = tempfile::tempdir().unwrap();
        let file = file(&dir);
        let mut writer = file.create_dataset("swap", vec![1i64, 2]).unwrap();
        let mut reader = file.dataset("swap").unwrap();
        assert_eq!(reader.len().unwrap(), 2);

        writer.set_data(vec![1i64, 2, 3, 4]).unwrap();
        reader.reload().unwrap();
        assert_eq!(reader.len().unwrap(), 4);
    }
}
