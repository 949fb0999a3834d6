//! Element types.
//!
//! Datasets store little-endian, fixed-width numeric elements. [`DType`]
//! names them the way the `.npy` header does, and [`Element`] ties each one
//! to its Rust primitive so typed views can be taken over mapped bytes.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::array::ArrayValue;
use crate::error::TypeError;

/// Element type of a dataset or array value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "uint32")]
    U32,
    #[serde(rename = "uint64")]
    U64,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// NumPy type name (`"float64"`, `"uint8"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    /// The `descr` string written into `.npy` headers.
    pub fn descr(self) -> &'static str {
        match self {
            Self::I8 => "|i1",
            Self::I16 => "<i2",
            Self::I32 => "<i4",
            Self::I64 => "<i8",
            Self::U8 => "|u1",
            Self::U16 => "<u2",
            Self::U32 => "<u4",
            Self::U64 => "<u8",
            Self::F32 => "<f4",
            Self::F64 => "<f8",
        }
    }

    /// Parse a `.npy` descriptor. Big-endian descriptors are not supported.
    pub fn from_descr(descr: &str) -> Option<DType> {
        let code = match descr.as_bytes().first()? {
            b'<' | b'|' | b'=' => &descr[1..],
            b'>' => {
                // Single-byte types have no byte order, so '>' is harmless there.
                let code = &descr[1..];
                if !code.ends_with('1') {
                    return None;
                }
                code
            }
            _ => descr,
        };
        let dtype = match code {
            "i1" => Self::I8,
            "i2" => Self::I16,
            "i4" => Self::I32,
            "i8" => Self::I64,
            "u1" => Self::U8,
            "u2" => Self::U16,
            "u4" => Self::U32,
            "u8" => Self::U64,
            "f4" => Self::F32,
            "f8" => Self::F64,
            _ => return None,
        };
        Some(dtype)
    }

    /// Whether every value of `self` is representable in `to` without loss.
    ///
    /// Mirrors NumPy's `can_cast(from, to, casting="safe")` for the supported
    /// numeric types.
    pub fn can_cast_safe(self, to: DType) -> bool {
        if self == to {
            return true;
        }
        let (from_size, to_size) = (self.size(), to.size());
        match (self.is_float(), to.is_float()) {
            (true, true) => to_size >= from_size,
            (true, false) => false,
            // Integers fit a float when they fit its mantissa: up to 16 bits
            // for float32; float64 is accepted for every width, as NumPy does.
            (false, true) => to == Self::F64 || from_size <= 2,
            (false, false) => match (self.is_signed(), to.is_signed()) {
                (true, true) | (false, false) => to_size >= from_size,
                (false, true) => to_size > from_size,
                (true, false) => false,
            },
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TypeError;

    /// Accepts NumPy names (`"float64"`) and full `.npy` descriptors
    /// (`"<f8"`, `"|u1"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(dtype) = Self::ALL.iter().find(|d| d.name() == s) {
            return Ok(*dtype);
        }
        if s.starts_with(['<', '>', '|', '=']) {
            if let Some(dtype) = Self::from_descr(s) {
                return Ok(dtype);
            }
        }
        Err(TypeError::UnknownDtype(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single numeric value, widened to 64 bits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    /// The widest dtype of this scalar's family.
    pub fn dtype(self) -> DType {
        match self {
            Self::Int(_) => DType::I64,
            Self::UInt(_) => DType::U64,
            Self::Float(_) => DType::F64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::UInt(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Integer value, if this scalar holds one that fits in `i64`.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::UInt(v) => i64::try_from(v).ok(),
            Self::Float(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident, $wide:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(v as $wide)
                }
            }
        )*
    };
}

scalar_from!(Int, i64: i8, i16, i32, i64, isize);
scalar_from!(UInt, u64: u8, u16, u32, u64, usize);
scalar_from!(Float, f64: f32, f64);

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// A Rust primitive that can be stored in a dataset.
///
/// The `Pod` bound is what allows a typed view to be laid directly over the
/// bytes of a memory-mapped array file.
pub trait Element:
    bytemuck::Pod + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const DTYPE: DType;

    fn into_value(array: ArrayD<Self>) -> ArrayValue;

    fn array_ref(value: &ArrayValue) -> Option<&ArrayD<Self>>;

    /// Unwrap an owned array of this type, handing the value back otherwise.
    fn array_owned(value: ArrayValue) -> Result<ArrayD<Self>, ArrayValue>;

    /// Convert with `as`-cast semantics; callers check safety beforehand.
    fn from_scalar(scalar: Scalar) -> Self;

    fn to_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident, $scalar:ident, $wide:ty) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_value(array: ArrayD<Self>) -> ArrayValue {
                ArrayValue::$variant(array)
            }

            fn array_ref(value: &ArrayValue) -> Option<&ArrayD<Self>> {
                match value {
                    ArrayValue::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn array_owned(value: ArrayValue) -> Result<ArrayD<Self>, ArrayValue> {
                match value {
                    ArrayValue::$variant(a) => Ok(a),
                    other => Err(other),
                }
            }

            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Int(v) => v as $ty,
                    Scalar::UInt(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                }
            }

            fn to_scalar(self) -> Scalar {
                Scalar::$scalar(self as $wide)
            }
        }
    };
}

impl_element!(i8, I8, Int, i64);
impl_element!(i16, I16, Int, i64);
impl_element!(i32, I32, Int, i64);
impl_element!(i64, I64, Int, i64);
impl_element!(u8, U8, UInt, u64);
impl_element!(u16, U16, UInt, u64);
impl_element!(u32, U32, UInt, u64);
impl_element!(u64, U64, UInt, u64);
impl_element!(f32, F32, Float, f64);
impl_element!(f64, F64, Float, f64);

/// Run `$body` with `$t` bound to the Rust primitive for `$dtype`.
///
/// ```
/// use exdir_types::{with_element_type, DType, Element};
///
/// let size = with_element_type!(DType::U16, T => std::mem::size_of::<T>());
/// assert_eq!(size, 2);
/// ```
#[macro_export]
macro_rules! with_element_type {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::DType::I8 => {
                type $t = i8;
                $body
            }
            $crate::DType::I16 => {
                type $t = i16;
                $body
            }
            $crate::DType::I32 => {
                type $t = i32;
                $body
            }
            $crate::DType::I64 => {
                type $t = i64;
                $body
            }
            $crate::DType::U8 => {
                type $t = u8;
                $body
            }
            $crate::DType::U16 => {
                type $t = u16;
                $body
            }
            $crate::DType::U32 => {
                type $t = u32;
                $body
            }
            $crate::DType::U64 => {
                type $t = u64;
                $body
            }
            $crate::DType::F32 => {
                type $t = f32;
                $body
            }
            $crate::DType::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}
