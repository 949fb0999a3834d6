//! Memory-mapped `.npy` arrays.
//!
//! [`MappedArray`] maps a whole `.npy` file and lays typed `ndarray` views
//! over the element bytes. Writes through a read-write mapping land in the
//! page cache immediately and are visible to every other mapping of the
//! same file; [`MappedArray::flush`] forces them to disk.
//!
//! Element data is interpreted in native byte order, which matches the
//! little-endian files this crate writes on little-endian hosts.

use std::fs;
use std::path::{Path, PathBuf};

use exdir_types::{with_element_type, ArrayValue, DType, Element};
use memmap2::{Mmap, MmapMut};
use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};
use tracing::debug;

use crate::error::{ArrayError, ArrayResult};
use crate::npy::{self, NpyHeader};
use crate::selection::Selection;

/// How a file is mapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::ReadOnly(m) => m,
            Self::ReadWrite(m) => m,
        }
    }
}

/// A `.npy` file mapped into memory.
pub struct MappedArray {
    path: PathBuf,
    header: NpyHeader,
    map: Mapping,
    _file: fs::File,
}

impl std::fmt::Debug for MappedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedArray")
            .field("path", &self.path)
            .field("dtype", &self.header.dtype)
            .field("shape", &self.header.shape)
            .field("mode", &self.mode())
            .finish()
    }
}

impl MappedArray {
    /// Map an existing `.npy` file.
    pub fn open(path: &Path, mode: AccessMode) -> ArrayResult<Self> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(mode == AccessMode::ReadWrite)
            .open(path)?;

        // SAFETY: the mapping is only sound while no other process truncates
        // or rewrites the file. Within this process, callers drop a mapping
        // before replacing its file.
        let map = match mode {
            AccessMode::ReadOnly => Mapping::ReadOnly(unsafe { Mmap::map(&file)? }),
            AccessMode::ReadWrite => Mapping::ReadWrite(unsafe { MmapMut::map_mut(&file)? }),
        };

        let header = NpyHeader::decode(map.bytes())?;
        npy::data_slice(map.bytes(), &header)?;
        debug!(
            path = %path.display(),
            dtype = %header.dtype,
            shape = ?header.shape,
            ?mode,
            "mapped array"
        );
        Ok(Self {
            path: path.to_path_buf(),
            header,
            map,
            _file: file,
        })
    }

    /// Write `value` to a new file at `path` and map it.
    pub fn create(path: &Path, value: &ArrayValue, mode: AccessMode) -> ArrayResult<Self> {
        npy::write_array(path, value)?;
        Self::open(path, mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dtype(&self) -> DType {
        self.header.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.header.shape
    }

    pub fn ndim(&self) -> usize {
        self.header.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn mode(&self) -> AccessMode {
        match self.map {
            Mapping::ReadOnly(_) => AccessMode::ReadOnly,
            Mapping::ReadWrite(_) => AccessMode::ReadWrite,
        }
    }

    fn check_dtype<T: Element>(&self) -> ArrayResult<()> {
        if T::DTYPE != self.header.dtype {
            return Err(ArrayError::DtypeMismatch {
                expected: T::DTYPE,
                actual: self.header.dtype,
            });
        }
        Ok(())
    }

    /// Typed view over the mapped elements.
    pub fn view<T: Element>(&self) -> ArrayResult<ArrayViewD<'_, T>> {
        self.check_dtype::<T>()?;
        let bytes = npy::data_slice(self.map.bytes(), &self.header)?;
        let elements: &[T] = bytemuck::try_cast_slice(bytes)
            .map_err(|e| ArrayError::InvalidFormat(format!("element data: {e:?}")))?;
        Ok(ArrayViewD::from_shape(IxDyn(&self.header.shape), elements)?)
    }

    /// Mutable typed view. Fails on a read-only mapping.
    pub fn view_mut<T: Element>(&mut self) -> ArrayResult<ArrayViewMutD<'_, T>> {
        self.check_dtype::<T>()?;
        let Mapping::ReadWrite(map) = &mut self.map else {
            return Err(ArrayError::ReadOnly);
        };
        let start = self.header.data_offset;
        let end = start + self.header.data_len();
        let bytes = map
            .get_mut(start..end)
            .ok_or_else(|| ArrayError::InvalidFormat("element data out of range".into()))?;
        let elements: &mut [T] = bytemuck::try_cast_slice_mut(bytes)
            .map_err(|e| ArrayError::InvalidFormat(format!("element data: {e:?}")))?;
        Ok(ArrayViewMutD::from_shape(IxDyn(&self.header.shape), elements)?)
    }

    /// Copy out the selected elements.
    pub fn read(&self, selection: &Selection) -> ArrayResult<ArrayValue> {
        let elems = selection.resolve(self.shape())?;
        with_element_type!(self.dtype(), T => {
            let view = self.view::<T>()?;
            Ok(T::into_value(view.slice(elems.as_slice()).to_owned()))
        })
    }

    /// Copy out every element.
    pub fn to_value(&self) -> ArrayResult<ArrayValue> {
        self.read(&Selection::all())
    }

    /// Assign `value` to the selected region in place.
    ///
    /// `value` is cast to the stored dtype when that is lossless and
    /// broadcast to the shape of the region.
    pub fn write(&mut self, selection: &Selection, value: &ArrayValue) -> ArrayResult<()> {
        let elems = selection.resolve(self.shape())?;
        let dtype = self.dtype();
        let value = value.cast_safe(dtype)?;
        with_element_type!(dtype, T => {
            let source = value.as_array::<T>().ok_or(ArrayError::DtypeMismatch {
                expected: dtype,
                actual: value.dtype(),
            })?;
            let mut view = self.view_mut::<T>()?;
            let mut target = view.slice_mut(elems.as_slice());
            let source = source.broadcast(target.raw_dim()).ok_or_else(|| {
                ArrayError::ShapeMismatch {
                    expected: target.shape().to_vec(),
                    actual: source.shape().to_vec(),
                }
            })?;
            target.assign(&source);
            Ok(())
        })
    }

    /// Flush outstanding writes to disk. A no-op for read-only mappings.
    pub fn flush(&self) -> ArrayResult<()> {
        if let Mapping::ReadWrite(map) = &self.map {
            map.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::AxisSelection;
    use exdir_types::{ErrorKind, Scalar};
    use ndarray::array;

    fn create(dir: &tempfile::TempDir, value: ArrayValue) -> MappedArray {
        MappedArray::create(&dir.path().join("data.npy"), &value, AccessMode::ReadWrite).unwrap()
    }

    #[test]
    fn view_matches_written_data() {
        let dir = tempfile::tempdir().unwrap();
        let value = ArrayValue::from(array![[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn());
        let mapped = create(&dir, value.clone());
        assert_eq!(mapped.shape(), &[2, 3]);
        assert_eq!(mapped.dtype(), DType::F64);
        assert_eq!(mapped.view::<f64>().unwrap()[[1, 2]], 6.0);
        assert_eq!(mapped.to_value().unwrap(), value);
    }

    #[test]
    fn view_checks_dtype() {
        let dir = tempfile::tempdir().unwrap();
        let mapped = create(&dir, ArrayValue::from(vec![1i32, 2]));
        let err = mapped.view::<i64>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DtypeMismatch);
    }

    #[test]
    fn partial_write_is_visible_to_other_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = create(&dir, ArrayValue::from(vec![0i64; 5]));
        let reader = MappedArray::open(writer.path(), AccessMode::ReadOnly).unwrap();

        writer
            .write(&Selection::range(1, 3), &ArrayValue::from(vec![7i64, 8]))
            .unwrap();
        assert_eq!(
            reader.to_value().unwrap(),
            ArrayValue::from(vec![0i64, 7, 8, 0, 0])
        );
    }

    #[test]
    fn write_broadcasts_and_casts_safely() {
        let dir = tempfile::tempdir().unwrap();
        let mut mapped = create(&dir, ArrayValue::full(DType::F64, &[2, 3], Scalar::Float(0.0)));

        mapped
            .write(&Selection::all(), &ArrayValue::from_scalar(Scalar::Int(1)))
            .unwrap();
        mapped
            .write(&Selection::index(1), &ArrayValue::from(vec![1u8, 2, 3]))
            .unwrap();
        assert_eq!(
            mapped.to_value().unwrap(),
            ArrayValue::from(array![[1.0f64, 1.0, 1.0], [1.0, 2.0, 3.0]].into_dyn())
        );

        let err = mapped
            .write(&Selection::index(0), &ArrayValue::from(vec![1.0f64, 2.0]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn unsafe_cast_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut mapped = create(&dir, ArrayValue::from(vec![0i16; 3]));
        let err = mapped
            .write(&Selection::all(), &ArrayValue::from(vec![1.5f64, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DtypeMismatch);
    }

    #[test]
    fn read_only_mapping_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.npy");
        npy::write_array(&path, &ArrayValue::from(vec![1u8, 2])).unwrap();
        let mut mapped = MappedArray::open(&path, AccessMode::ReadOnly).unwrap();
        assert_eq!(mapped.view_mut::<u8>().unwrap_err().kind(), ErrorKind::ReadOnlyViolation);
        assert!(mapped.flush().is_ok());
    }

    #[test]
    fn read_selection_returns_owned_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mapped = create(&dir, ArrayValue::from(array![[1u32, 2], [3, 4], [5, 6]].into_dyn()));
        let column = mapped
            .read(&Selection::new(vec![AxisSelection::Full, AxisSelection::Index(1)]))
            .unwrap();
        assert_eq!(column, ArrayValue::from(vec![2u32, 4, 6]));

        let err = mapped.read(&Selection::index(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_and_scalar_arrays_map() {
        let dir = tempfile::tempdir().unwrap();
        let empty = create(&dir, ArrayValue::from(Vec::<f32>::new()));
        assert!(empty.is_empty());
        assert_eq!(empty.to_value().unwrap().shape(), &[0]);

        let path = dir.path().join("scalar.npy");
        let scalar = MappedArray::create(
            &path,
            &ArrayValue::from_scalar(Scalar::Float(2.5)),
            AccessMode::ReadOnly,
        )
        .unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.to_value().unwrap().scalar(), Some(Scalar::Float(2.5)));
    }
}
