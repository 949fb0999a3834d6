//! Index selections over N-dimensional arrays.
//!
//! Selections follow Python slicing: negative indices count from the end,
//! range bounds are clamped to the axis, and axes left unspecified at the
//! end are selected whole. Everything is checked up front so slicing the
//! underlying `ndarray` view never panics.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use exdir_types::{with_element_type, ArrayValue, Element};
use ndarray::SliceInfoElem;

use crate::error::{ArrayError, ArrayResult};

/// Selection along a single axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisSelection {
    /// A single position; the axis is removed from the result.
    Index(isize),
    /// `start..stop` with a positive `step`; missing bounds mean the ends
    /// of the axis.
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    Full,
}

impl AxisSelection {
    pub fn range(start: isize, stop: isize) -> Self {
        Self::Range {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    pub fn stepped(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self::Range { start, stop, step }
    }

    fn resolve(self, axis: usize, len: usize) -> ArrayResult<SliceInfoElem> {
        let signed_len = len as isize;
        match self {
            Self::Full => Ok(SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1,
            }),
            Self::Index(index) => {
                let absolute = if index < 0 { index + signed_len } else { index };
                if absolute < 0 || absolute >= signed_len {
                    return Err(ArrayError::IndexOutOfBounds { axis, index, len });
                }
                Ok(SliceInfoElem::Index(absolute))
            }
            Self::Range { start, stop, step } => {
                if step <= 0 {
                    return Err(ArrayError::InvalidSelection(format!(
                        "step must be positive, got {step} on axis {axis}"
                    )));
                }
                let clamp = |bound: isize| {
                    let b = if bound < 0 { bound + signed_len } else { bound };
                    b.clamp(0, signed_len)
                };
                let start = start.map_or(0, clamp);
                let stop = stop.map_or(signed_len, clamp).max(start);
                Ok(SliceInfoElem::Slice {
                    start,
                    end: Some(stop),
                    step,
                })
            }
        }
    }
}

impl From<isize> for AxisSelection {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<Range<isize>> for AxisSelection {
    fn from(r: Range<isize>) -> Self {
        Self::range(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for AxisSelection {
    fn from(r: RangeFrom<isize>) -> Self {
        Self::stepped(Some(r.start), None, 1)
    }
}

impl From<RangeTo<isize>> for AxisSelection {
    fn from(r: RangeTo<isize>) -> Self {
        Self::stepped(None, Some(r.end), 1)
    }
}

impl From<RangeFull> for AxisSelection {
    fn from(_: RangeFull) -> Self {
        Self::Full
    }
}

/// A selection over every axis of an array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    axes: Vec<AxisSelection>,
}

impl Selection {
    /// Select everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(axes: Vec<AxisSelection>) -> Self {
        Self { axes }
    }

    /// A single position on the first axis.
    pub fn index(index: isize) -> Self {
        Self::new(vec![AxisSelection::Index(index)])
    }

    /// `start..stop` on the first axis.
    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(vec![AxisSelection::range(start, stop)])
    }

    /// Append a selection for the next axis.
    pub fn then(mut self, axis: impl Into<AxisSelection>) -> Self {
        self.axes.push(axis.into());
        self
    }

    pub fn axes(&self) -> &[AxisSelection] {
        &self.axes
    }

    pub fn is_all(&self) -> bool {
        self.axes.iter().all(|a| *a == AxisSelection::Full)
    }

    /// Resolve against `shape` into absolute slice elements, one per axis.
    pub fn resolve(&self, shape: &[usize]) -> ArrayResult<Vec<SliceInfoElem>> {
        if self.axes.len() > shape.len() {
            return Err(ArrayError::InvalidSelection(format!(
                "{} indices for an array with {} dimensions",
                self.axes.len(),
                shape.len()
            )));
        }
        shape
            .iter()
            .enumerate()
            .map(|(axis, &len)| {
                self.axes
                    .get(axis)
                    .copied()
                    .unwrap_or(AxisSelection::Full)
                    .resolve(axis, len)
            })
            .collect()
    }

    /// Shape of the array this selection produces from `shape`.
    pub fn result_shape(&self, shape: &[usize]) -> ArrayResult<Vec<usize>> {
        let elems = self.resolve(shape)?;
        Ok(elems
            .iter()
            .zip(shape)
            .filter_map(|(elem, &len)| match *elem {
                SliceInfoElem::Slice { start, end, step } => {
                    let end = end.unwrap_or(len as isize);
                    let span = (end - start).max(0) as usize;
                    Some(span.div_ceil(step as usize))
                }
                _ => None,
            })
            .collect())
    }

    /// Copy the selected elements out of an in-memory array.
    pub fn apply(&self, value: &ArrayValue) -> ArrayResult<ArrayValue> {
        let elems = self.resolve(value.shape())?;
        let dtype = value.dtype();
        with_element_type!(dtype, T => {
            let array = value.as_array::<T>().ok_or(ArrayError::DtypeMismatch {
                expected: dtype,
                actual: dtype,
            })?;
            Ok(T::into_value(array.slice(elems.as_slice()).to_owned()))
        })
    }
}

impl From<AxisSelection> for Selection {
    fn from(axis: AxisSelection) -> Self {
        Self::new(vec![axis])
    }
}

impl From<Vec<AxisSelection>> for Selection {
    fn from(axes: Vec<AxisSelection>) -> Self {
        Self::new(axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exdir_types::ErrorKind;
    use ndarray::{Array, IxDyn};
    use proptest::prelude::*;

    fn values(a: &ndarray::ArrayD<i32>, sel: &Selection) -> Vec<i32> {
        let elems = sel.resolve(a.shape()).unwrap();
        a.slice(elems.as_slice()).iter().copied().collect()
    }

    fn sliced(shape: &[usize], sel: &Selection) -> Vec<usize> {
        let a = Array::<i32, _>::zeros(IxDyn(shape));
        let elems = sel.resolve(shape).unwrap();
        a.slice(elems.as_slice()).shape().to_vec()
    }

    #[test]
    fn missing_axes_are_full() {
        let sel = Selection::index(1);
        assert_eq!(sliced(&[3, 4, 5], &sel), vec![4, 5]);
        assert_eq!(sel.result_shape(&[3, 4, 5]).unwrap(), vec![4, 5]);
        assert_eq!(sliced(&[3, 4], &Selection::all()), vec![3, 4]);
    }

    #[test]
    fn negative_indices_count_from_end() {
        let a = Array::from_iter(0..5).into_dyn();
        assert_eq!(values(&a, &Selection::index(-1)), vec![4]);
        assert_eq!(Selection::index(-1).result_shape(a.shape()).unwrap(), Vec::<usize>::new());
        assert_eq!(
            values(&a, &Selection::from(AxisSelection::from(-3..-1))),
            vec![2, 3]
        );
    }

    #[test]
    fn ranges_clamp_like_python() {
        let a = Array::from_iter(0..5).into_dyn();
        for (sel, expected) in [
            (AxisSelection::from(3..100), vec![3, 4]),
            (AxisSelection::from(-100..2), vec![0, 1]),
            (AxisSelection::from(4..2), vec![]),
            (AxisSelection::stepped(None, None, 2), vec![0, 2, 4]),
            (AxisSelection::from(..2), vec![0, 1]),
            (AxisSelection::from(3..), vec![3, 4]),
        ] {
            let sel = Selection::from(sel);
            assert_eq!(values(&a, &sel), expected, "{sel:?}");
            assert_eq!(sel.result_shape(a.shape()).unwrap(), vec![expected.len()]);
        }
    }

    #[test]
    fn out_of_bounds_and_invalid_selections() {
        let err = Selection::index(5).resolve(&[5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(Selection::index(-6).resolve(&[5]).is_err());

        let err = Selection::index(0).then(0isize).resolve(&[5]).unwrap_err();
        assert!(matches!(err, ArrayError::InvalidSelection(_)));

        let err = Selection::from(AxisSelection::stepped(None, None, 0))
            .resolve(&[5])
            .unwrap_err();
        assert!(matches!(err, ArrayError::InvalidSelection(_)));

        // Nothing to index in a 0-d array.
        assert!(Selection::index(0).resolve(&[]).is_err());
        assert!(Selection::all().resolve(&[]).unwrap().is_empty());
    }

    #[test]
    fn apply_copies_in_memory_selection() {
        let grid = Array::from_iter(0..6i64).into_shape_with_order((2, 3)).unwrap();
        let value = ArrayValue::from(grid.into_dyn());
        let row = Selection::index(-1).apply(&value).unwrap();
        assert_eq!(row, ArrayValue::from(vec![3i64, 4, 5]));
        let column = Selection::all().then(..).then(1isize).apply(&value).unwrap();
        assert_eq!(column, ArrayValue::from(vec![1i64, 4]));
    }

    proptest! {
        #[test]
        fn resolved_ranges_never_panic(
            len in 0usize..20,
            start in -30isize..30,
            stop in -30isize..30,
            step in 1isize..5,
        ) {
            let a = Array::from_iter(0..len as i64).into_dyn();
            let sel = Selection::from(AxisSelection::stepped(Some(start), Some(stop), step));
            let elems = sel.resolve(a.shape()).unwrap();
            let view = a.slice(elems.as_slice());
            prop_assert_eq!(view.len(), sel.result_shape(a.shape()).unwrap()[0]);
        }
    }
}
