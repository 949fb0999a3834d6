//! Attribute values, physical quantities, and dataset payloads.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{ArrayD, IxDyn};

use crate::array::ArrayValue;
use crate::dtype::{DType, Element, Scalar};

/// An attribute record: keys are kept sorted so records serialize
/// deterministically.
pub type AttrMap = BTreeMap<String, AttrValue>;

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

/// A numeric magnitude with a unit and an optional uncertainty.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantity {
    pub value: ArrayValue,
    pub unit: String,
    pub uncertainty: Option<ArrayValue>,
}

impl Quantity {
    pub fn new(value: impl Into<ArrayValue>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
            uncertainty: None,
        }
    }

    /// A zero-dimensional `float64` quantity.
    pub fn scalar(value: f64, unit: impl Into<String>) -> Self {
        Self::new(Scalar::Float(value), unit)
    }

    pub fn with_uncertainty(mut self, uncertainty: impl Into<ArrayValue>) -> Self {
        self.uncertainty = Some(uncertainty.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn dtype(&self) -> DType {
        self.value.dtype()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.scalar() {
            Some(s) => write!(f, "{s} {}", self.unit)?,
            None => write!(f, "{:?} {}", self.value.shape(), self.unit)?,
        }
        if let Some(u) = self.uncertainty.as_ref().and_then(ArrayValue::scalar) {
            write!(f, " ± {u}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DatasetValue
// ---------------------------------------------------------------------------

/// What a dataset holds: a plain array, or an array carrying a unit.
#[derive(Clone, Debug, PartialEq)]
pub enum DatasetValue {
    Array(ArrayValue),
    Quantity(Quantity),
}

impl DatasetValue {
    /// The numeric magnitude, ignoring any unit.
    pub fn array(&self) -> &ArrayValue {
        match self {
            Self::Array(a) => a,
            Self::Quantity(q) => &q.value,
        }
    }

    pub fn into_array(self) -> ArrayValue {
        match self {
            Self::Array(a) => a,
            Self::Quantity(q) => q.value,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Self::Quantity(q) => Some(q),
            Self::Array(_) => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.as_quantity().map(|q| q.unit.as_str())
    }

    pub fn uncertainty(&self) -> Option<&ArrayValue> {
        self.as_quantity().and_then(|q| q.uncertainty.as_ref())
    }

    pub fn shape(&self) -> &[usize] {
        self.array().shape()
    }

    pub fn dtype(&self) -> DType {
        self.array().dtype()
    }

    /// Apply `f` to the magnitude, keeping unit and uncertainty.
    pub fn map_array(self, f: impl FnOnce(ArrayValue) -> ArrayValue) -> Self {
        match self {
            Self::Array(a) => Self::Array(f(a)),
            Self::Quantity(q) => Self::Quantity(Quantity {
                value: f(q.value),
                ..q
            }),
        }
    }
}

impl From<ArrayValue> for DatasetValue {
    fn from(a: ArrayValue) -> Self {
        Self::Array(a)
    }
}

impl From<Quantity> for DatasetValue {
    fn from(q: Quantity) -> Self {
        Self::Quantity(q)
    }
}

impl<T: Element> From<ArrayD<T>> for DatasetValue {
    fn from(a: ArrayD<T>) -> Self {
        Self::Array(a.into())
    }
}

impl<T: Element> From<Vec<T>> for DatasetValue {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into())
    }
}

impl From<Scalar> for DatasetValue {
    fn from(s: Scalar) -> Self {
        Self::Array(s.into())
    }
}

// ---------------------------------------------------------------------------
// AttrValue
// ---------------------------------------------------------------------------

/// Everything an attribute record can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<AttrValue>),
    Map(AttrMap),
    /// Written as nested lists; read back as [`AttrValue::List`].
    Array(ArrayValue),
    Quantity(Quantity),
}

impl AttrValue {
    /// Short lowercase name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Array(_) => "array",
            Self::Quantity(_) => "quantity",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().map(Scalar::as_f64)
    }

    /// The numeric value of a number, or of a zero-dimensional array.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Int(v) => Some(Scalar::Int(*v)),
            Self::UInt(v) => Some(Scalar::UInt(*v)),
            Self::Float(v) => Some(Scalar::Float(*v)),
            Self::Array(a) => a.scalar(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut AttrMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Self::Quantity(q) => Some(q),
            _ => None,
        }
    }

    /// Interpret a number or a rectangular nested list of numbers as an
    /// array.
    ///
    /// Integers give `int64` (or `uint64` when a value exceeds `i64`); any
    /// float in the input gives `float64`. Ragged or non-numeric lists
    /// return `None`.
    pub fn to_array(&self) -> Option<ArrayValue> {
        if let Self::Array(a) = self {
            return Some(a.clone());
        }
        let mut shape = Vec::new();
        let mut scalars = Vec::new();
        collect_nested(self, 0, &mut shape, &mut scalars)?;

        let dtype = if scalars.iter().any(|s| matches!(s, Scalar::Float(_))) {
            DType::F64
        } else if scalars.iter().all(|s| s.as_i64().is_some()) {
            DType::I64
        } else if scalars.iter().all(|s| matches!(s, Scalar::UInt(_))) {
            DType::U64
        } else {
            return None;
        };
        ArrayValue::from_scalars(dtype, &shape, &scalars).ok()
    }

    /// Nested lists of numbers for an array; a plain number for 0-d.
    pub fn nested_from_array(array: &ArrayValue) -> AttrValue {
        let scalars = array.to_scalars();
        let mut iter = scalars.into_iter();
        nest(array.shape(), &mut iter)
    }
}

fn collect_nested(
    value: &AttrValue,
    depth: usize,
    shape: &mut Vec<usize>,
    out: &mut Vec<Scalar>,
) -> Option<()> {
    match value {
        AttrValue::List(items) => {
            match shape.get(depth) {
                Some(&len) if len != items.len() => return None,
                Some(_) => {}
                None if depth == shape.len() && out.is_empty() => shape.push(items.len()),
                None => return None,
            }
            for item in items {
                collect_nested(item, depth + 1, shape, out)?;
            }
            Some(())
        }
        other => {
            // A leaf must sit at the same depth as every previous leaf.
            if depth != shape.len() {
                return None;
            }
            out.push(other.as_scalar()?);
            Some(())
        }
    }
}

fn nest(shape: &[usize], iter: &mut impl Iterator<Item = Scalar>) -> AttrValue {
    match shape.split_first() {
        None => iter.next().map(AttrValue::from).unwrap_or(AttrValue::Null),
        Some((&len, rest)) => AttrValue::List((0..len).map(|_| nest(rest, iter)).collect()),
    }
}

impl From<Scalar> for AttrValue {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Int(v) => Self::Int(v),
            Scalar::UInt(v) => Self::UInt(v),
            Scalar::Float(v) => Self::Float(v),
        }
    }
}

macro_rules! attr_from {
    ($variant:ident, $wide:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(v: $ty) -> Self {
                    AttrValue::$variant(v as $wide)
                }
            }
        )*
    };
}

attr_from!(Int, i64: i8, i16, i32, i64);
attr_from!(UInt, u64: u8, u16, u32, u64);
attr_from!(Float, f64: f32, f64);

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(v: Vec<AttrValue>) -> Self {
        Self::List(v)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(v: AttrMap) -> Self {
        Self::Map(v)
    }
}

impl From<ArrayValue> for AttrValue {
    fn from(v: ArrayValue) -> Self {
        Self::Array(v)
    }
}

impl From<Quantity> for AttrValue {
    fn from(v: Quantity) -> Self {
        Self::Quantity(v)
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttrValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A zero-dimensional array of `value`.
pub fn scalar_array<T: Element>(value: T) -> ArrayValue {
    T::into_value(ArrayD::from_elem(IxDyn(&[]), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<AttrValue>) -> AttrValue {
        AttrValue::List(items)
    }

    #[test]
    fn integer_lists_become_int64_arrays() {
        let v = list(vec![1.into(), 2.into(), 3.into()]);
        let a = v.to_array().unwrap();
        assert_eq!(a, ArrayValue::from(vec![1i64, 2, 3]));
    }

    #[test]
    fn any_float_promotes_to_float64() {
        let v = list(vec![
            list(vec![1.into(), 2.5.into()]),
            list(vec![3.into(), 4.into()]),
        ]);
        let a = v.to_array().unwrap();
        assert_eq!(a.dtype(), DType::F64);
        assert_eq!(a.shape(), &[2, 2]);
        assert_eq!(a.get(&[1, 0]), Some(Scalar::Float(3.0)));
    }

    #[test]
    fn ragged_or_non_numeric_lists_are_not_arrays() {
        let ragged = list(vec![list(vec![1.into()]), list(vec![1.into(), 2.into()])]);
        assert!(ragged.to_array().is_none());

        let mixed_depth = list(vec![1.into(), list(vec![2.into()])]);
        assert!(mixed_depth.to_array().is_none());

        let strings = list(vec!["a".into()]);
        assert!(strings.to_array().is_none());
    }

    #[test]
    fn numbers_are_zero_dimensional_arrays() {
        let a = AttrValue::Float(1.5).to_array().unwrap();
        assert!(a.is_scalar());
        assert_eq!(a.scalar(), Some(Scalar::Float(1.5)));
    }

    #[test]
    fn nested_from_array_mirrors_shape() {
        let a = ArrayValue::from(ndarray::array![[1u8, 2], [3, 4]].into_dyn());
        let nested = AttrValue::nested_from_array(&a);
        assert_eq!(
            nested,
            list(vec![
                list(vec![AttrValue::UInt(1), AttrValue::UInt(2)]),
                list(vec![AttrValue::UInt(3), AttrValue::UInt(4)]),
            ])
        );
        assert_eq!(
            AttrValue::nested_from_array(&scalar_array(2.0f64)),
            AttrValue::Float(2.0)
        );
    }

    #[test]
    fn quantity_display() {
        let q = Quantity::scalar(1.5, "m").with_uncertainty(Scalar::Float(0.1));
        assert_eq!(q.to_string(), "1.5 m ± 0.1");
        let v = Quantity::new(vec![1i64, 2], "s");
        assert_eq!(v.to_string(), "[2] s");
    }

    #[test]
    fn dataset_value_accessors() {
        let q: DatasetValue = Quantity::new(vec![1.0f64, 2.0], "mV").into();
        assert_eq!(q.unit(), Some("mV"));
        assert_eq!(q.shape(), &[2]);
        assert!(q.uncertainty().is_none());

        let doubled = q.map_array(|a| a.cast(DType::F32));
        assert_eq!(doubled.dtype(), DType::F32);
        assert_eq!(doubled.unit(), Some("mV"));

        let plain: DatasetValue = vec![1u8].into();
        assert_eq!(plain.unit(), None);
    }

    #[test]
    fn map_from_pairs() {
        let m: AttrValue = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(m.as_map().unwrap().len(), 2);
        assert_eq!(m.as_map().unwrap()["b"].as_i64(), Some(2));
    }
}
