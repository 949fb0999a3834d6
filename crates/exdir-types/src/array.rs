//! Dynamically-typed N-dimensional arrays.

use ndarray::{ArrayD, IxDyn};

use crate::dtype::{DType, Element, Scalar};
use crate::error::{TypeError, TypeResult};

/// An owned array whose element type is only known at runtime.
///
/// Every variant wraps an `ndarray::ArrayD` of the matching primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValue {
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Evaluate `$body` with `$a` bound to the inner `ArrayD` of any variant.
macro_rules! each_variant {
    ($value:expr, $a:ident => $body:expr) => {
        match $value {
            ArrayValue::I8($a) => $body,
            ArrayValue::I16($a) => $body,
            ArrayValue::I32($a) => $body,
            ArrayValue::I64($a) => $body,
            ArrayValue::U8($a) => $body,
            ArrayValue::U16($a) => $body,
            ArrayValue::U32($a) => $body,
            ArrayValue::U64($a) => $body,
            ArrayValue::F32($a) => $body,
            ArrayValue::F64($a) => $body,
        }
    };
}

impl ArrayValue {
    /// An array of `shape` where every element is `fill` cast to `dtype`.
    pub fn full(dtype: DType, shape: &[usize], fill: Scalar) -> Self {
        crate::with_element_type!(dtype, T => {
            T::into_value(ArrayD::from_elem(IxDyn(shape), T::from_scalar(fill)))
        })
    }

    /// A zero-dimensional array holding one scalar.
    pub fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Int(v) => Self::I64(ArrayD::from_elem(IxDyn(&[]), v)),
            Scalar::UInt(v) => Self::U64(ArrayD::from_elem(IxDyn(&[]), v)),
            Scalar::Float(v) => Self::F64(ArrayD::from_elem(IxDyn(&[]), v)),
        }
    }

    /// Build an array from scalars in row-major order.
    pub fn from_scalars(dtype: DType, shape: &[usize], values: &[Scalar]) -> TypeResult<Self> {
        crate::with_element_type!(dtype, T => {
            let data: Vec<T> = values.iter().map(|s| T::from_scalar(*s)).collect();
            Ok(T::into_value(ArrayD::from_shape_vec(IxDyn(shape), data)?))
        })
    }

    /// Decode little-endian element bytes into an array of `shape`.
    pub fn from_le_bytes(dtype: DType, shape: &[usize], bytes: &[u8]) -> TypeResult<Self> {
        let expected = shape.iter().product::<usize>() * dtype.size();
        if bytes.len() != expected {
            return Err(TypeError::InvalidShape(format!(
                "{} bytes cannot hold {shape:?} elements of {dtype}",
                bytes.len()
            )));
        }
        crate::with_element_type!(dtype, T => {
            let data: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
            Ok(T::into_value(ArrayD::from_shape_vec(IxDyn(shape), data)?))
        })
    }

    pub fn dtype(&self) -> DType {
        match self {
            Self::I8(_) => DType::I8,
            Self::I16(_) => DType::I16,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
            Self::U16(_) => DType::U16,
            Self::U32(_) => DType::U32,
            Self::U64(_) => DType::U64,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_variant!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        each_variant!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for zero-dimensional arrays.
    pub fn is_scalar(&self) -> bool {
        self.ndim() == 0
    }

    /// The single element of a zero-dimensional array.
    pub fn scalar(&self) -> Option<Scalar> {
        if !self.is_scalar() {
            return None;
        }
        self.get(&[])
    }

    /// Element at a full multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<Scalar> {
        each_variant!(self, a => a.get(IxDyn(index)).map(|v| v.to_scalar()))
    }

    /// All elements in row-major order.
    pub fn to_scalars(&self) -> Vec<Scalar> {
        each_variant!(self, a => a.iter().map(|v| v.to_scalar()).collect())
    }

    /// Elements as little-endian bytes in row-major order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        each_variant!(self, a => {
            let standard = a.as_standard_layout();
            match standard.as_slice() {
                Some(slice) => bytemuck::cast_slice(slice).to_vec(),
                None => standard.iter().flat_map(|v| bytemuck::bytes_of(v).to_vec()).collect(),
            }
        })
    }

    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::array_ref(self)
    }

    /// Unwrap into a typed array. The dtype must match exactly.
    pub fn into_array<T: Element>(self) -> TypeResult<ArrayD<T>> {
        T::array_owned(self).map_err(|other| TypeError::DtypeMismatch {
            expected: T::DTYPE,
            actual: other.dtype(),
        })
    }

    /// Convert to `to` with `as`-cast semantics (may lose precision).
    pub fn cast(&self, to: DType) -> ArrayValue {
        if self.dtype() == to {
            return self.clone();
        }
        crate::with_element_type!(to, T => {
            each_variant!(self, a => T::into_value(a.mapv(|v| T::from_scalar(v.to_scalar()))))
        })
    }

    /// Convert to `to`, refusing conversions that could lose information.
    pub fn cast_safe(&self, to: DType) -> TypeResult<ArrayValue> {
        if !self.dtype().can_cast_safe(to) {
            return Err(TypeError::UnsafeCast {
                from: self.dtype(),
                to,
            });
        }
        Ok(self.cast(to))
    }
}

impl<T: Element> From<ArrayD<T>> for ArrayValue {
    fn from(array: ArrayD<T>) -> Self {
        T::into_value(array)
    }
}

impl<T: Element> From<Vec<T>> for ArrayValue {
    fn from(values: Vec<T>) -> Self {
        T::into_value(ndarray::Array1::from(values).into_dyn())
    }
}

impl From<Scalar> for ArrayValue {
    fn from(scalar: Scalar) -> Self {
        Self::from_scalar(scalar)
    }
}
