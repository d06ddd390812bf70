//! Typed data arrays attached to image data.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrayError};

/// Element type of a data array.
///
/// This is the full enumeration an image can carry. Not every type can be
/// rendered; the GPU side decides which ones it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Platform-dependent narrow character (signedness unspecified).
    Char,
    /// Signed 8-bit integer.
    SignedChar,
    /// Unsigned 8-bit integer.
    UnsignedChar,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UnsignedShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UnsignedInt,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UnsignedInt64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Opaque 64-bit identifiers.
    IdType,
    /// Bit-packed booleans.
    Bit,
    /// Text.
    String,
}

impl ScalarType {
    /// Returns a display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Char => "char",
            ScalarType::SignedChar => "signed char",
            ScalarType::UnsignedChar => "unsigned char",
            ScalarType::Short => "short",
            ScalarType::UnsignedShort => "unsigned short",
            ScalarType::Int => "int",
            ScalarType::UnsignedInt => "unsigned int",
            ScalarType::Int64 => "int64",
            ScalarType::UnsignedInt64 => "unsigned int64",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::IdType => "id type",
            ScalarType::Bit => "bit",
            ScalarType::String => "string",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage for the values of a data array.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarBuffer {
    Char(Vec<i8>),
    SignedChar(Vec<i8>),
    UnsignedChar(Vec<u8>),
    Short(Vec<i16>),
    UnsignedShort(Vec<u16>),
    Int(Vec<i32>),
    UnsignedInt(Vec<u32>),
    Int64(Vec<i64>),
    UnsignedInt64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    IdType(Vec<i64>),
    /// Packed bits, most significant bit first, with the logical bit count.
    Bit { bits: Vec<u8>, len: usize },
    String(Vec<String>),
}

impl ScalarBuffer {
    /// Returns the element type tag.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarBuffer::Char(_) => ScalarType::Char,
            ScalarBuffer::SignedChar(_) => ScalarType::SignedChar,
            ScalarBuffer::UnsignedChar(_) => ScalarType::UnsignedChar,
            ScalarBuffer::Short(_) => ScalarType::Short,
            ScalarBuffer::UnsignedShort(_) => ScalarType::UnsignedShort,
            ScalarBuffer::Int(_) => ScalarType::Int,
            ScalarBuffer::UnsignedInt(_) => ScalarType::UnsignedInt,
            ScalarBuffer::Int64(_) => ScalarType::Int64,
            ScalarBuffer::UnsignedInt64(_) => ScalarType::UnsignedInt64,
            ScalarBuffer::Float(_) => ScalarType::Float,
            ScalarBuffer::Double(_) => ScalarType::Double,
            ScalarBuffer::IdType(_) => ScalarType::IdType,
            ScalarBuffer::Bit { .. } => ScalarType::Bit,
            ScalarBuffer::String(_) => ScalarType::String,
        }
    }

    /// Returns the number of stored values (all components).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ScalarBuffer::Char(v) | ScalarBuffer::SignedChar(v) => v.len(),
            ScalarBuffer::UnsignedChar(v) => v.len(),
            ScalarBuffer::Short(v) => v.len(),
            ScalarBuffer::UnsignedShort(v) => v.len(),
            ScalarBuffer::Int(v) => v.len(),
            ScalarBuffer::UnsignedInt(v) => v.len(),
            ScalarBuffer::Int64(v) | ScalarBuffer::IdType(v) => v.len(),
            ScalarBuffer::UnsignedInt64(v) => v.len(),
            ScalarBuffer::Float(v) => v.len(),
            ScalarBuffer::Double(v) => v.len(),
            ScalarBuffer::Bit { len, .. } => *len,
            ScalarBuffer::String(v) => v.len(),
        }
    }

    /// Returns true if the buffer holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value at `index` widened to `f64`, or `None` for text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        match self {
            ScalarBuffer::Char(v) | ScalarBuffer::SignedChar(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::UnsignedChar(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::Short(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::UnsignedShort(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::Int(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::UnsignedInt(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::Int64(v) | ScalarBuffer::IdType(v) => v.get(index).map(|&x| x as f64),
            ScalarBuffer::UnsignedInt64(v) => v.get(index).map(|&x| x as f64),
            ScalarBuffer::Float(v) => v.get(index).map(|&x| f64::from(x)),
            ScalarBuffer::Double(v) => v.get(index).copied(),
            ScalarBuffer::Bit { bits, len } => {
                if index >= *len {
                    return None;
                }
                let byte = bits.get(index / 8)?;
                Some(f64::from((byte >> (7 - index % 8)) & 1))
            }
            ScalarBuffer::String(_) => None,
        }
    }

    /// Returns the raw bytes of numeric storage in native byte order.
    ///
    /// Text has no byte representation and returns `None`; bit arrays return
    /// the packed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ScalarBuffer::Char(v) | ScalarBuffer::SignedChar(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::UnsignedChar(v) => Some(v),
            ScalarBuffer::Short(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::UnsignedShort(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::Int(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::UnsignedInt(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::Int64(v) | ScalarBuffer::IdType(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::UnsignedInt64(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::Float(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::Double(v) => Some(bytemuck::cast_slice(v)),
            ScalarBuffer::Bit { bits, .. } => Some(bits),
            ScalarBuffer::String(_) => None,
        }
    }
}

/// A named array of tuples with a fixed number of components.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: String,
    components: usize,
    values: ScalarBuffer,
}

impl DataArray {
    /// Creates a new data array.
    ///
    /// # Errors
    /// Fails if `components` is zero or the value count is not a multiple of
    /// `components`.
    pub fn new(name: impl Into<String>, components: usize, values: ScalarBuffer) -> Result<Self> {
        let name = name.into();
        if components == 0 {
            return Err(VolrayError::ZeroComponents(name));
        }
        let len = values.len();
        if len % components != 0 {
            return Err(VolrayError::SizeMismatch {
                expected: len.next_multiple_of(components),
                actual: len,
            });
        }
        Ok(Self {
            name,
            components,
            values,
        })
    }

    /// Creates a single-component array.
    pub fn scalars(name: impl Into<String>, values: ScalarBuffer) -> Self {
        Self {
            name: name.into(),
            components: 1,
            values,
        }
    }

    /// Returns the array name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of components per tuple.
    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Returns the number of tuples.
    #[must_use]
    pub fn tuples(&self) -> usize {
        self.values.len() / self.components
    }

    /// Returns the element type.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        self.values.scalar_type()
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn values(&self) -> &ScalarBuffer {
        &self.values
    }

    /// Returns the `[min, max]` range of one component.
    ///
    /// Returns `None` for text arrays, empty arrays, or an out-of-range
    /// component. NaN values are skipped.
    #[must_use]
    pub fn range(&self, component: usize) -> Option<[f64; 2]> {
        if component >= self.components {
            return None;
        }
        let mut range: Option<[f64; 2]> = None;
        for tuple in 0..self.tuples() {
            let value = self.values.value_f64(tuple * self.components + component)?;
            if value.is_nan() {
                continue;
            }
            range = Some(match range {
                None => [value, value],
                Some([lo, hi]) => [lo.min(value), hi.max(value)],
            });
        }
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_range_per_component() {
        let array = DataArray::new(
            "rgba",
            4,
            ScalarBuffer::UnsignedChar(vec![10, 0, 0, 255, 20, 5, 0, 128]),
        )
        .unwrap();
        assert_eq!(array.tuples(), 2);
        assert_eq!(array.range(0), Some([10.0, 20.0]));
        assert_eq!(array.range(1), Some([0.0, 5.0]));
        assert_eq!(array.range(3), Some([128.0, 255.0]));
        assert_eq!(array.range(4), None);
    }

    #[test]
    fn test_array_rejects_ragged_tuples() {
        let err = DataArray::new("bad", 3, ScalarBuffer::Float(vec![1.0; 7])).unwrap_err();
        assert!(matches!(err, VolrayError::SizeMismatch { expected: 9, actual: 7 }));
        assert!(DataArray::new("none", 0, ScalarBuffer::Float(vec![])).is_err());
    }

    #[test]
    fn test_float_range_skips_nan() {
        let array = DataArray::scalars("f", ScalarBuffer::Float(vec![f32::NAN, -2.5, 4.0]));
        assert_eq!(array.range(0), Some([-2.5, 4.0]));
    }

    #[test]
    fn test_bit_and_text_values() {
        let bits = ScalarBuffer::Bit {
            bits: vec![0b1010_0000],
            len: 3,
        };
        assert_eq!(bits.value_f64(0), Some(1.0));
        assert_eq!(bits.value_f64(1), Some(0.0));
        assert_eq!(bits.value_f64(2), Some(1.0));
        assert_eq!(bits.value_f64(3), None);

        let text = ScalarBuffer::String(vec!["a".into()]);
        assert_eq!(text.scalar_type(), ScalarType::String);
        assert!(text.as_bytes().is_none());
        assert!(text.value_f64(0).is_none());
    }

    #[test]
    fn test_numeric_bytes_are_native() {
        let shorts = ScalarBuffer::Short(vec![1, -1]);
        let bytes = shorts.as_bytes().unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(i16::from_ne_bytes([bytes[2], bytes[3]]), -1);
    }
}
