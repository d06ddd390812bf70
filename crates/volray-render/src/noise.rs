//! Procedural jitter texture for ray start offsets.

use half::f16;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::device::{
    FilterMode, GraphicsDevice, InternalFormat, TextureDesc, TextureDimension, WrapMode,
};
use crate::error::RenderResult;

/// Amplitude of the jitter as a fraction of one step.
pub const NOISE_AMPLITUDE: f32 = 0.05;

/// Texels per lattice cell of the noise function.
const TEXELS_PER_CELL: u32 = 8;

const SEED: u64 = 0x766f_6c72_6179;

/// Side length actually used for a requested size on a device.
#[must_use]
pub fn noise_size(requested: u32, max_texture_dimension_2d: u32) -> u32 {
    requested.min(max_texture_dimension_2d).max(1)
}

/// Classic 2D gradient noise over a shuffled permutation table.
struct Perlin {
    perm: [u8; 512],
}

impl Perlin {
    fn new(seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        table.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut perm = [0; 512];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = table[i & 255];
        }
        Self { perm }
    }

    fn gradient(hash: u8, x: f32, y: f32) -> f32 {
        match hash & 7 {
            0 => x + y,
            1 => -x + y,
            2 => x - y,
            3 => -x - y,
            4 => x,
            5 => -x,
            6 => y,
            _ => -y,
        }
    }

    fn fade(t: f32) -> f32 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    /// Noise at `(x, y)`, roughly in [-1, 1], repeating every `period`
    /// lattice cells on both axes. `period` must be in `1..=256`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample(&self, x: f32, y: f32, period: i64) -> f32 {
        let (xf, yf) = (x.floor(), y.floor());
        let wrap = |c: i64| c.rem_euclid(period) as usize;
        let (x0, x1) = (wrap(xf as i64), wrap(xf as i64 + 1));
        let (y0, y1) = (wrap(yf as i64), wrap(yf as i64 + 1));
        let (dx, dy) = (x - xf, y - yf);
        let (u, v) = (Self::fade(dx), Self::fade(dy));

        let p = &self.perm;
        let aa = p[p[x0] as usize + y0];
        let ab = p[p[x0] as usize + y1];
        let ba = p[p[x1] as usize + y0];
        let bb = p[p[x1] as usize + y1];

        let lerp = |a: f32, b: f32, t: f32| a + t * (b - a);
        let x0 = lerp(
            Self::gradient(aa, dx, dy),
            Self::gradient(ba, dx - 1.0, dy),
            u,
        );
        let x1 = lerp(
            Self::gradient(ab, dx, dy - 1.0),
            Self::gradient(bb, dx - 1.0, dy - 1.0),
            u,
        );
        lerp(x0, x1, v)
    }
}

/// Lattice cells across a texture of side `size`. The noise repeats with
/// this period, so the texture tiles under repeat addressing.
#[must_use]
pub fn lattice_cells(size: u32) -> u32 {
    (size / TEXELS_PER_CELL).clamp(1, 256)
}

/// Jitter value of texel `(i, j)` in a texture of side `size`.
#[allow(clippy::cast_precision_loss)]
fn jitter(perlin: &Perlin, i: u32, j: u32, size: u32) -> f32 {
    let cells = lattice_cells(size);
    let at = |t: u32| (u64::from(t) * u64::from(cells)) as f32 / size.max(1) as f32;
    let n = perlin
        .sample(at(i), at(j), i64::from(cells))
        .clamp(-1.0, 1.0);
    NOISE_AMPLITUDE + NOISE_AMPLITUDE * n
}

/// Generates `size * size` jitter values in `[0, 2 * NOISE_AMPLITUDE]`, row
/// by row.
#[must_use]
pub fn generate(size: u32) -> Vec<f32> {
    let perlin = Perlin::new(SEED);
    let mut values = Vec::with_capacity(size as usize * size as usize);
    for j in 0..size {
        for i in 0..size {
            values.push(jitter(&perlin, i, j, size));
        }
    }
    values
}

/// Jitter texture, generated on first use and kept for the mapper's
/// lifetime.
#[derive(Debug)]
pub struct NoiseTexture<T> {
    texture: Option<T>,
    size: u32,
}

impl<T> Default for NoiseTexture<T> {
    fn default() -> Self {
        Self {
            texture: None,
            size: 0,
        }
    }
}

impl<T> NoiseTexture<T> {
    /// Creates the texture if it does not exist yet. Later calls are no-ops
    /// even if `requested` changes.
    pub fn ensure<D>(&mut self, device: &mut D, requested: u32) -> RenderResult<()>
    where
        D: GraphicsDevice<Texture = T>,
    {
        if self.texture.is_none() {
            let size = noise_size(requested, device.capabilities().max_texture_dimension_2d);
            let texels: Vec<u16> = generate(size)
                .into_iter()
                .map(|v| f16::from_f32(v).to_bits())
                .collect();
            let desc = TextureDesc {
                label: "noise texture",
                dimension: TextureDimension::D2,
                size: [size, size, 1],
                format: InternalFormat::R16Float,
                filter: FilterMode::Nearest,
                wrap: WrapMode::Repeat,
            };
            let texture = device.create_texture(&desc, bytemuck::cast_slice(&texels))?;
            log::debug!("generated {size}x{size} noise texture");
            self.size = size;
            self.texture = Some(texture);
        }
        Ok(())
    }

    /// Side length of the generated texture, 0 before generation.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, DeviceCapabilities, RecordingDevice};

    #[test]
    fn test_values_stay_in_jitter_range() {
        let values = generate(64);
        assert_eq!(values.len(), 64 * 64);
        assert!(values
            .iter()
            .all(|&v| (0.0..=2.0 * NOISE_AMPLITUDE).contains(&v)));
        let first = values[0];
        assert!(values.iter().any(|&v| (v - first).abs() > 1e-4));
    }

    #[test]
    fn test_pattern_tiles_across_the_wrap() {
        let perlin = Perlin::new(SEED);
        for size in [16, 100, 128] {
            for j in 0..size {
                assert_eq!(jitter(&perlin, size, j, size), jitter(&perlin, 0, j, size));
                assert_eq!(jitter(&perlin, j, size, size), jitter(&perlin, j, 0, size));
            }
        }
    }

    #[test]
    fn test_lattice_follows_size() {
        assert_eq!(lattice_cells(4), 1);
        assert_eq!(lattice_cells(128), 16);
        assert_eq!(lattice_cells(8192), 256);
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate(16), generate(16));
    }

    #[test]
    fn test_size_clamped_to_device_limit() {
        let mut device = RecordingDevice::with_capabilities(DeviceCapabilities {
            max_texture_dimension_2d: 64,
            ..DeviceCapabilities::default()
        });
        let mut noise = NoiseTexture::default();
        noise.ensure(&mut device, 128).unwrap();
        assert_eq!(noise.size(), 64);
        assert!(device.calls().iter().any(|c| matches!(
            c,
            DeviceCall::CreateTexture { label, size: [64, 64, 1], .. } if label == "noise texture"
        )));
    }

    #[test]
    fn test_generated_once() {
        let mut device = RecordingDevice::new();
        let mut noise = NoiseTexture::default();
        noise.ensure(&mut device, 32).unwrap();
        noise.ensure(&mut device, 16).unwrap();
        assert_eq!(noise.size(), 32);
        assert_eq!(device.texture_creations("noise texture"), 1);
    }
}
