//! The NumPy `.npy` file format.
//!
//! A file is the magic string `\x93NUMPY`, a two-byte version, the header
//! length (u16 for version 1.0, u32 for 2.0), and an ASCII Python dict
//! literal describing the array:
//!
//! ```text
//! {'descr': '<f8', 'fortran_order': False, 'shape': (3, 4), }
//! ```
//!
//! The header is space-padded and newline-terminated so the element data
//! starts on a 64-byte boundary. Element data follows in C order.
//!
//! Only little-endian numeric dtypes in C order are supported.

use std::io::Write;
use std::path::Path;

use exdir_types::{ArrayValue, DType};

use crate::error::{ArrayError, ArrayResult};

pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Data offset alignment in bytes.
const ALIGNMENT: usize = 64;

/// Decoded `.npy` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: DType,
    pub shape: Vec<usize>,
    /// Byte offset of the first element.
    pub data_offset: usize,
}

impl NpyHeader {
    pub fn new(dtype: DType, shape: &[usize]) -> Self {
        let data_offset = Self::layout(&dict_literal(dtype, shape)).0;
        Self {
            dtype,
            shape: shape.to_vec(),
            data_offset,
        }
    }

    /// Number of elements. Decoded headers are checked so that this,
    /// [`data_len`](Self::data_len) and the data end fit in `usize`.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the element data in bytes.
    pub fn data_len(&self) -> usize {
        self.len() * self.dtype.size()
    }

    /// Total data offset and preamble size for a dict literal.
    fn layout(dict: &str) -> (usize, usize) {
        // The dict is followed by at least one byte: the newline.
        let body = dict.len() + 1;
        let v1 = round_up(10 + body, ALIGNMENT);
        if v1 - 10 <= u16::MAX as usize {
            (v1, 10)
        } else {
            (round_up(12 + body, ALIGNMENT), 12)
        }
    }

    /// Serialize the preamble: everything before the element data.
    pub fn encode(&self) -> Vec<u8> {
        let dict = dict_literal(self.dtype, &self.shape);
        let (total, preamble) = Self::layout(&dict);
        let header_len = total - preamble;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(MAGIC);
        if preamble == 10 {
            out.extend_from_slice(&[1, 0]);
            out.extend_from_slice(&(header_len as u16).to_le_bytes());
        } else {
            out.extend_from_slice(&[2, 0]);
            out.extend_from_slice(&(header_len as u32).to_le_bytes());
        }
        out.extend_from_slice(dict.as_bytes());
        out.resize(total - 1, b' ');
        out.push(b'\n');
        out
    }

    /// Parse the preamble at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> ArrayResult<Self> {
        if bytes.len() < 10 || &bytes[..6] != MAGIC {
            return Err(ArrayError::InvalidFormat("missing NUMPY magic".into()));
        }
        let (header_len, preamble) = match bytes[6] {
            1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
            2 | 3 => {
                let raw = bytes
                    .get(8..12)
                    .ok_or_else(|| ArrayError::InvalidFormat("truncated preamble".into()))?;
                (u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize, 12)
            }
            v => {
                return Err(ArrayError::UnsupportedFormat(format!(
                    "format version {v}.{}",
                    bytes[7]
                )))
            }
        };
        let data_offset = preamble + header_len;
        let raw = bytes
            .get(preamble..data_offset)
            .ok_or_else(|| ArrayError::InvalidFormat("truncated header".into()))?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| ArrayError::InvalidFormat("header is not ASCII".into()))?;

        let descr = parse_descr(text)?;
        let dtype = DType::from_descr(descr)
            .ok_or_else(|| ArrayError::UnsupportedFormat(format!("dtype {descr:?}")))?;
        if parse_fortran_order(text)? {
            return Err(ArrayError::UnsupportedFormat("Fortran-ordered array".into()));
        }
        let shape = parse_shape(text)?;
        shape
            .iter()
            .try_fold(dtype.size(), |bytes, &dim| bytes.checked_mul(dim))
            .and_then(|bytes| bytes.checked_add(data_offset))
            .ok_or_else(|| ArrayError::InvalidFormat(format!("shape {shape:?} overflows")))?;

        Ok(Self {
            dtype,
            shape,
            data_offset,
        })
    }
}

fn round_up(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

fn dict_literal(dtype: DType, shape: &[usize]) -> String {
    let shape = match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    };
    format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {shape}, }}",
        dtype.descr()
    )
}

/// The text after `'key':`, with leading whitespace removed.
fn value_after<'a>(header: &'a str, key: &str) -> ArrayResult<&'a str> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        if let Some(pos) = header.find(&needle) {
            let rest = header[pos + needle.len()..].trim_start();
            let rest = rest
                .strip_prefix(':')
                .ok_or_else(|| ArrayError::InvalidFormat(format!("no value for {key:?}")))?;
            return Ok(rest.trim_start());
        }
    }
    Err(ArrayError::InvalidFormat(format!("header has no {key:?} entry")))
}

fn parse_descr(header: &str) -> ArrayResult<&str> {
    let rest = value_after(header, "descr")?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| ArrayError::UnsupportedFormat("structured dtype".into()))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| ArrayError::InvalidFormat("unterminated descr".into()))?;
    Ok(&body[..end])
}

fn parse_fortran_order(header: &str) -> ArrayResult<bool> {
    let rest = value_after(header, "fortran_order")?;
    if rest.starts_with("True") {
        Ok(true)
    } else if rest.starts_with("False") {
        Ok(false)
    } else {
        Err(ArrayError::InvalidFormat("fortran_order is not a bool".into()))
    }
}

fn parse_shape(header: &str) -> ArrayResult<Vec<usize>> {
    let rest = value_after(header, "shape")?;
    let inner = rest
        .strip_prefix('(')
        .and_then(|r| r.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| ArrayError::InvalidFormat("shape is not a tuple".into()))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| ArrayError::InvalidFormat(format!("bad dimension {s:?}")))
        })
        .collect()
}

/// Write `value` as a complete `.npy` file, replacing any existing file.
pub fn write_array(path: &Path, value: &ArrayValue) -> ArrayResult<()> {
    let header = NpyHeader::new(value.dtype(), value.shape());
    let mut file = std::fs::File::create(path)?;
    file.write_all(&header.encode())?;
    file.write_all(&value.to_le_bytes())?;
    file.sync_data()?;
    Ok(())
}

/// Read a whole `.npy` file into memory.
pub fn read_array(path: &Path) -> ArrayResult<ArrayValue> {
    let bytes = std::fs::read(path)?;
    let header = NpyHeader::decode(&bytes)?;
    let data = data_slice(&bytes, &header)?;
    Ok(ArrayValue::from_le_bytes(header.dtype, &header.shape, data)?)
}

/// Element bytes of a file whose preamble decoded to `header`.
pub(crate) fn data_slice<'a>(bytes: &'a [u8], header: &NpyHeader) -> ArrayResult<&'a [u8]> {
    bytes
        .get(header.data_offset..header.data_offset + header.data_len())
        .ok_or_else(|| {
            ArrayError::InvalidFormat(format!(
                "expected {} data bytes after offset {}, file has {}",
                header.data_len(),
                header.data_offset,
                bytes.len()
            ))
        })
}
