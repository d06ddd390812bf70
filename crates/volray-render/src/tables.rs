//! Lookup tables baked from transfer functions.
//!
//! Both tables are `width x 1` 2D textures sampled at texel centers. The color
//! table stores RGBA8 with opaque alpha; the opacity table stores half floats
//! corrected for the ray step length.

use half::f16;
use volray_core::{BlendMode, ColorTransferFunction, PiecewiseFunction, TimeStamp};

use crate::device::{
    FilterMode, GraphicsDevice, InternalFormat, TextureDesc, TextureDimension, WrapMode,
};
use crate::error::{RenderError, RenderResult};

/// Opacities at or below this value are not step-corrected.
const CORRECTION_FLOOR: f64 = 1e-4;

/// Adds black and white endpoints at `range` if `tf` has no points.
///
/// Returns true if points were added.
pub fn seed_color(tf: &mut ColorTransferFunction, range: [f64; 2]) -> bool {
    if tf.size() >= 1 {
        return false;
    }
    tf.add_rgb_point(range[0], 0.0, 0.0, 0.0);
    tf.add_rgb_point(range[1], 1.0, 1.0, 1.0);
    true
}

/// Adds opacity endpoints 0.0 and 0.5 at `range` if `tf` has no points.
pub fn seed_opacity(tf: &mut PiecewiseFunction, range: [f64; 2]) -> bool {
    if tf.size() >= 1 {
        return false;
    }
    tf.add_point(range[0], 0.0);
    tf.add_point(range[1], 0.5);
    true
}

/// Rejects layouts other than one component or four dependent components.
pub fn check_component_layout(components: usize, independent: bool) -> RenderResult<()> {
    if components == 1 || (components == 4 && !independent) {
        Ok(())
    } else {
        Err(RenderError::UnsupportedComponentLayout {
            components,
            independent,
        })
    }
}

fn sample_positions(range: [f64; 2], width: u32) -> impl Iterator<Item = f64> {
    let [lo, hi] = range;
    let last = f64::from(width.max(2) - 1);
    (0..width).map(move |i| lo + (hi - lo) * f64::from(i) / last)
}

/// Bakes `width` RGBA8 texels spanning `range`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bake_color(tf: &ColorTransferFunction, range: [f64; 2], width: u32) -> Vec<[u8; 4]> {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    sample_positions(range, width)
        .map(|x| {
            let rgb = tf.evaluate(x);
            [to_byte(rgb.x), to_byte(rgb.y), to_byte(rgb.z), 255]
        })
        .collect()
}

/// Bakes `width` opacities spanning `range`.
///
/// Except for additive blending, opacities above a small floor are corrected
/// for the step length: `1 - (1 - a)^(sample_distance / unit_distance)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bake_opacity(
    tf: &PiecewiseFunction,
    range: [f64; 2],
    width: u32,
    blend_mode: BlendMode,
    sample_distance: f64,
    unit_distance: f64,
) -> Vec<f32> {
    let correct = blend_mode != BlendMode::Additive && unit_distance > 0.0;
    let exponent = sample_distance / unit_distance;
    sample_positions(range, width)
        .map(|x| {
            let mut a = tf.evaluate(x).clamp(0.0, 1.0);
            if correct && a > CORRECTION_FLOOR {
                a = 1.0 - (1.0 - a).powf(exponent);
            }
            a as f32
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColorKey {
    range: [f64; 2],
    width: u32,
    filter: FilterMode,
}

/// Color lookup texture.
#[derive(Debug)]
pub struct ColorTable<T> {
    texture: Option<T>,
    key: Option<ColorKey>,
    build_time: TimeStamp,
}

impl<T> Default for ColorTable<T> {
    fn default() -> Self {
        Self {
            texture: None,
            key: None,
            build_time: TimeStamp::NEVER,
        }
    }
}

impl<T> ColorTable<T> {
    /// Rebuilds the table if the function or any bake parameter changed.
    /// Returns true if a new texture was created.
    pub fn update<D>(
        &mut self,
        device: &mut D,
        tf: &ColorTransferFunction,
        range: [f64; 2],
        filter: FilterMode,
        width: u32,
    ) -> RenderResult<bool>
    where
        D: GraphicsDevice<Texture = T>,
    {
        let width = width.min(device.capabilities().max_texture_dimension_2d);
        let key = ColorKey {
            range,
            width,
            filter,
        };
        if self.texture.is_some() && self.key == Some(key) && tf.mtime() <= self.build_time {
            return Ok(false);
        }
        let texels = bake_color(tf, range, width);
        let desc = TextureDesc {
            label: "color table",
            dimension: TextureDimension::D2,
            size: [width, 1, 1],
            format: InternalFormat::Rgba8Unorm,
            filter,
            wrap: WrapMode::ClampToEdge,
        };
        let texture = device.create_texture(&desc, bytemuck::cast_slice(&texels))?;
        self.texture = Some(texture);
        self.key = Some(key);
        self.build_time = TimeStamp::now();
        log::trace!("baked color table over {range:?}");
        Ok(true)
    }

    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }
}

/// Parameters of an opacity bake besides the function itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityParams {
    pub range: [f64; 2],
    pub width: u32,
    pub filter: FilterMode,
    pub blend_mode: BlendMode,
    pub sample_distance: f64,
    pub unit_distance: f64,
}

/// Scalar opacity lookup texture.
///
/// Holds a single level; there is no per-resolution cache.
#[derive(Debug)]
pub struct OpacityTable<T> {
    texture: Option<T>,
    key: Option<OpacityParams>,
    build_time: TimeStamp,
}

impl<T> Default for OpacityTable<T> {
    fn default() -> Self {
        Self {
            texture: None,
            key: None,
            build_time: TimeStamp::NEVER,
        }
    }
}

impl<T> OpacityTable<T> {
    /// Rebuilds the table if the function or any bake parameter changed.
    /// Returns true if a new texture was created.
    pub fn update<D>(
        &mut self,
        device: &mut D,
        tf: &PiecewiseFunction,
        params: &OpacityParams,
    ) -> RenderResult<bool>
    where
        D: GraphicsDevice<Texture = T>,
    {
        let width = params
            .width
            .min(device.capabilities().max_texture_dimension_2d);
        let key = OpacityParams { width, ..*params };
        if self.texture.is_some() && self.key == Some(key) && tf.mtime() <= self.build_time {
            return Ok(false);
        }
        let texels: Vec<u16> = bake_opacity(
            tf,
            params.range,
            width,
            params.blend_mode,
            params.sample_distance,
            params.unit_distance,
        )
        .into_iter()
        .map(|a| f16::from_f32(a).to_bits())
        .collect();
        let desc = TextureDesc {
            label: "opacity table",
            dimension: TextureDimension::D2,
            size: [width, 1, 1],
            format: InternalFormat::R16Float,
            filter: params.filter,
            wrap: WrapMode::ClampToEdge,
        };
        let texture = device.create_texture(&desc, bytemuck::cast_slice(&texels))?;
        self.texture = Some(texture);
        self.key = Some(key);
        self.build_time = TimeStamp::now();
        log::trace!(
            "baked opacity table over {:?} for {} blending",
            params.range,
            params.blend_mode
        );
        Ok(true)
    }

    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }
}
