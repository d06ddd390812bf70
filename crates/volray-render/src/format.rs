//! Voxel format resolution.
//!
//! Maps a scalar element type and component count to the internal texture
//! format, the conversion applied on upload, and the `shift`/`scale` pair the
//! shader uses to turn a sampled texel into a lookup-table coordinate:
//!
//! ```text
//! table_coord = (texel + shift) * scale
//! ```
//!
//! `shift` moves the texel of the data minimum to zero and `scale` stretches
//! the texel of the data maximum to one.

use half::f16;
use volray_core::{DataArray, ScalarType};

use crate::device::{DeviceCapabilities, InternalFormat};
use crate::error::{RenderError, RenderResult};

/// How raw values become texel bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Upload the array bytes unchanged.
    Passthrough,
    /// Narrow 64-bit floats to 32-bit floats.
    CastF32,
    /// Divide by `norm` and store as 32-bit float.
    NormalizedF32 { norm: f64 },
    /// Map `[lo, hi]` onto `[0, 1]` and store as half float.
    RangeHalf { lo: f64, hi: f64 },
}

/// Result of format resolution for one scalar array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFormat {
    pub internal: InternalFormat,
    pub conversion: Conversion,
    pub shift: f64,
    pub scale: f64,
}

impl ResolvedFormat {
    /// The value the shader samples for a raw scalar `value`.
    #[must_use]
    pub fn texel(&self, value: f64) -> f64 {
        match (self.internal, self.conversion) {
            (_, Conversion::RangeHalf { lo, hi }) => (value - lo) / range_width(lo, hi),
            (_, Conversion::NormalizedF32 { norm }) => value / norm,
            (InternalFormat::R8Unorm | InternalFormat::Rgba8Unorm, _) => value / 255.0,
            (InternalFormat::R8Snorm, _) => (value / 127.0).max(-1.0),
            (InternalFormat::R16Unorm, _) => value / 65535.0,
            (InternalFormat::R16Snorm, _) => (value / 32767.0).max(-1.0),
            (InternalFormat::R16Float | InternalFormat::R32Float, _) => value,
        }
    }

    /// Maps a raw scalar to its lookup-table coordinate.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        (self.texel(value) + self.shift) * self.scale
    }
}

fn range_width(lo: f64, hi: f64) -> f64 {
    if hi > lo {
        hi - lo
    } else {
        1.0
    }
}

/// Upload policy of one scalar type.
#[derive(Debug, Clone, Copy)]
enum Policy {
    /// A format that always exists.
    Fixed(InternalFormat),
    /// 16-bit normalized storage when available.
    Norm16(InternalFormat),
    /// 32-bit float when filterable, with the given conversion.
    Float32(Conversion),
    Unsupported,
}

fn policy(scalar_type: ScalarType) -> Policy {
    match scalar_type {
        ScalarType::UnsignedChar => Policy::Fixed(InternalFormat::R8Unorm),
        ScalarType::SignedChar => Policy::Fixed(InternalFormat::R8Snorm),
        ScalarType::UnsignedShort => Policy::Norm16(InternalFormat::R16Unorm),
        ScalarType::Short => Policy::Norm16(InternalFormat::R16Snorm),
        ScalarType::UnsignedInt => Policy::Float32(Conversion::NormalizedF32 {
            norm: f64::from(u32::MAX),
        }),
        ScalarType::Int => Policy::Float32(Conversion::NormalizedF32 {
            norm: f64::from(i32::MAX),
        }),
        ScalarType::Float => Policy::Float32(Conversion::Passthrough),
        ScalarType::Double => Policy::Float32(Conversion::CastF32),
        ScalarType::Char
        | ScalarType::Int64
        | ScalarType::UnsignedInt64
        | ScalarType::IdType
        | ScalarType::Bit
        | ScalarType::String => Policy::Unsupported,
    }
}

/// Returns true if single-component arrays of this type can be uploaded.
#[must_use]
pub fn is_supported(scalar_type: ScalarType) -> bool {
    !matches!(policy(scalar_type), Policy::Unsupported)
}

/// Resolves the texture format for `components` values of `scalar_type`
/// spanning `range`.
pub fn resolve(
    scalar_type: ScalarType,
    components: usize,
    range: [f64; 2],
    caps: &DeviceCapabilities,
) -> RenderResult<ResolvedFormat> {
    match components {
        1 => {}
        4 if scalar_type == ScalarType::UnsignedChar => {
            return Ok(ResolvedFormat {
                internal: InternalFormat::Rgba8Unorm,
                conversion: Conversion::Passthrough,
                shift: 0.0,
                scale: 1.0,
            });
        }
        4 => return Err(RenderError::UnsupportedScalarType(scalar_type)),
        _ => {
            return Err(RenderError::UnsupportedComponentLayout {
                components,
                independent: true,
            })
        }
    }

    let [lo, hi] = range;
    let fallback = Conversion::RangeHalf { lo, hi };
    let (internal, conversion) = match policy(scalar_type) {
        Policy::Fixed(format) => (format, Conversion::Passthrough),
        Policy::Norm16(format) if caps.norm16_textures => (format, Conversion::Passthrough),
        Policy::Float32(conversion) if caps.float32_filterable => {
            (InternalFormat::R32Float, conversion)
        }
        Policy::Norm16(_) | Policy::Float32(_) => (InternalFormat::R16Float, fallback),
        Policy::Unsupported => return Err(RenderError::UnsupportedScalarType(scalar_type)),
    };

    let mut resolved = ResolvedFormat {
        internal,
        conversion,
        shift: 0.0,
        scale: 1.0,
    };
    let texel_lo = resolved.texel(lo);
    let texel_hi = resolved.texel(hi);
    let width = texel_hi - texel_lo;
    resolved.shift = -texel_lo;
    resolved.scale = if width > 0.0 { 1.0 / width } else { 1.0 };
    Ok(resolved)
}

/// Converts the values of `array` into tightly packed texel bytes.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_texels(array: &DataArray, format: &ResolvedFormat) -> RenderResult<Vec<u8>> {
    let values = array.values();
    let len = values.len();
    let unsupported = || RenderError::UnsupportedScalarType(array.scalar_type());
    let widened = |i: usize| values.value_f64(i).ok_or_else(unsupported);

    match format.conversion {
        Conversion::Passthrough => values.as_bytes().map(<[u8]>::to_vec).ok_or_else(unsupported),
        Conversion::CastF32 => {
            let out = (0..len)
                .map(|i| widened(i).map(|v| v as f32))
                .collect::<RenderResult<Vec<f32>>>()?;
            Ok(bytemuck::cast_slice(&out).to_vec())
        }
        Conversion::NormalizedF32 { norm } => {
            let out = (0..len)
                .map(|i| widened(i).map(|v| (v / norm) as f32))
                .collect::<RenderResult<Vec<f32>>>()?;
            Ok(bytemuck::cast_slice(&out).to_vec())
        }
        Conversion::RangeHalf { lo, hi } => {
            let width = range_width(lo, hi);
            let out = (0..len)
                .map(|i| widened(i).map(|v| f16::from_f64((v - lo) / width).to_bits()))
                .collect::<RenderResult<Vec<u16>>>()?;
            Ok(bytemuck::cast_slice(&out).to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use volray_core::ScalarBuffer;

    fn caps(float32_filterable: bool, norm16_textures: bool) -> DeviceCapabilities {
        DeviceCapabilities {
            float32_filterable,
            norm16_textures,
            ..DeviceCapabilities::default()
        }
    }

    const SUPPORTED: [ScalarType; 8] = [
        ScalarType::UnsignedChar,
        ScalarType::SignedChar,
        ScalarType::UnsignedShort,
        ScalarType::Short,
        ScalarType::UnsignedInt,
        ScalarType::Int,
        ScalarType::Float,
        ScalarType::Double,
    ];

    #[test]
    fn test_unsigned_char_full_range() {
        let f = resolve(ScalarType::UnsignedChar, 1, [0.0, 255.0], &caps(false, false)).unwrap();
        assert_eq!(f.internal, InternalFormat::R8Unorm);
        assert_eq!(f.conversion, Conversion::Passthrough);
        assert!((f.shift).abs() < 1e-6);
        assert!((f.scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_capabilities_pick_formats() {
        let short = resolve(ScalarType::Short, 1, [-10.0, 10.0], &caps(false, true)).unwrap();
        assert_eq!(short.internal, InternalFormat::R16Snorm);
        let short = resolve(ScalarType::Short, 1, [-10.0, 10.0], &caps(false, false)).unwrap();
        assert_eq!(short.internal, InternalFormat::R16Float);

        let float = resolve(ScalarType::Float, 1, [0.0, 2.0], &caps(true, false)).unwrap();
        assert_eq!(float.internal, InternalFormat::R32Float);
        assert_eq!(float.conversion, Conversion::Passthrough);
        let float = resolve(ScalarType::Float, 1, [0.0, 2.0], &caps(false, false)).unwrap();
        assert_eq!(float.internal, InternalFormat::R16Float);
        assert!(matches!(float.conversion, Conversion::RangeHalf { .. }));
    }

    #[test]
    fn test_rgba_bytes_are_prenormalized() {
        let f = resolve(ScalarType::UnsignedChar, 4, [0.0, 255.0], &caps(false, false)).unwrap();
        assert_eq!(f.internal, InternalFormat::Rgba8Unorm);
        assert_eq!((f.shift, f.scale), (0.0, 1.0));
        assert!(resolve(ScalarType::Float, 4, [0.0, 1.0], &caps(true, true)).is_err());
        assert!(matches!(
            resolve(ScalarType::Float, 3, [0.0, 1.0], &caps(true, true)),
            Err(RenderError::UnsupportedComponentLayout { components: 3, .. })
        ));
    }

    #[test]
    fn test_unsupported_types_fail() {
        for t in [
            ScalarType::Char,
            ScalarType::Bit,
            ScalarType::Int64,
            ScalarType::UnsignedInt64,
            ScalarType::IdType,
            ScalarType::String,
        ] {
            assert!(!is_supported(t));
            assert!(matches!(
                resolve(t, 1, [0.0, 1.0], &caps(true, true)),
                Err(RenderError::UnsupportedScalarType(found)) if found == t
            ));
        }
    }

    #[test]
    fn test_empty_range_keeps_unit_scale() {
        let f = resolve(ScalarType::Float, 1, [3.0, 3.0], &caps(true, false)).unwrap();
        assert_eq!(f.scale, 1.0);
        assert!((f.normalize(3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_encode_half_fallback() {
        let array = DataArray::scalars("d", ScalarBuffer::Double(vec![10.0, 15.0, 20.0]));
        let f = resolve(ScalarType::Double, 1, [10.0, 20.0], &caps(false, false)).unwrap();
        let bytes = encode_texels(&array, &f).unwrap();
        assert_eq!(bytes.len(), 6);
        let mid = u16::from_ne_bytes([bytes[2], bytes[3]]);
        assert_eq!(f16::from_bits(mid).to_f32(), 0.5);
    }

    #[test]
    fn test_encode_normalized_int() {
        let array = DataArray::scalars("i", ScalarBuffer::Int(vec![0, i32::MAX]));
        let f = resolve(ScalarType::Int, 1, [0.0, f64::from(i32::MAX)], &caps(true, false)).unwrap();
        let floats: Vec<f32> = encode_texels(&array, &f)
            .unwrap()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(floats, vec![0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_range_maps_onto_unit_interval(
            type_index in 0usize..8,
            a in -30000.0f64..30000.0,
            b in -30000.0f64..30000.0,
            float32 in any::<bool>(),
            norm16 in any::<bool>(),
        ) {
            let t = SUPPORTED[type_index];
            let (lo, hi) = match t {
                ScalarType::UnsignedChar => (a.abs() % 128.0, 128.0 + b.abs() % 127.0),
                ScalarType::SignedChar => (-(a.abs() % 128.0), 1.0 + b.abs() % 126.0),
                ScalarType::UnsignedShort | ScalarType::UnsignedInt => (a.abs(), a.abs() + 1.0 + b.abs()),
                _ => (a.min(b), a.min(b) + 1.0 + (a - b).abs()),
            };
            let f = resolve(t, 1, [lo, hi], &caps(float32, norm16)).unwrap();
            let n_lo = f.normalize(lo);
            let n_hi = f.normalize(hi);
            prop_assert!(n_lo.abs() < 1e-3, "lo mapped to {}", n_lo);
            prop_assert!((n_hi - 1.0).abs() < 1e-3, "hi mapped to {}", n_hi);
            let mid = f.normalize((lo + hi) / 2.0);
            prop_assert!(n_lo <= mid && mid <= n_hi);
        }
    }
}
