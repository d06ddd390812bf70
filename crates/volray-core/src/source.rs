//! Upstream producers of image data.

use glam::DVec3;

use crate::data_array::{DataArray, ScalarBuffer};
use crate::error::{Result, VolrayError};
use crate::image_data::ImageData;
use crate::timestamp::TimeStamp;

/// Something that produces the image a mapper renders.
///
/// The mapper calls [`FieldSource::update`] once per frame before reading
/// the output, giving the source a chance to recompute.
pub trait FieldSource {
    /// Brings the output up to date.
    ///
    /// # Errors
    /// Returns an error if the output could not be produced.
    fn update(&mut self) -> Result<()>;

    /// Returns the current output.
    fn output(&self) -> &ImageData;

    /// Returns the output for in-place edits.
    fn output_mut(&mut self) -> &mut ImageData;
}

impl FieldSource for ImageData {
    fn update(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self) -> &ImageData {
        self
    }

    fn output_mut(&mut self) -> &mut ImageData {
        self
    }
}

type Sampler = Box<dyn FnMut(DVec3) -> f32>;

/// Samples a function of world position on a regular grid.
///
/// The grid is resampled on the next update after [`ImplicitSource::modified`]
/// or a change of dimensions, bounds or function.
pub struct ImplicitSource {
    function: Sampler,
    dimensions: [u32; 3],
    bounds_min: DVec3,
    bounds_max: DVec3,
    output: ImageData,
    mtime: TimeStamp,
    sampled: TimeStamp,
}

impl std::fmt::Debug for ImplicitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplicitSource")
            .field("dimensions", &self.dimensions)
            .field("bounds_min", &self.bounds_min)
            .field("bounds_max", &self.bounds_max)
            .finish_non_exhaustive()
    }
}

impl ImplicitSource {
    /// Creates a source sampling `function` over `[bounds_min, bounds_max]`.
    pub fn new(
        dimensions: [u32; 3],
        bounds_min: DVec3,
        bounds_max: DVec3,
        function: impl FnMut(DVec3) -> f32 + 'static,
    ) -> Self {
        Self {
            function: Box::new(function),
            dimensions,
            bounds_min,
            bounds_max,
            output: ImageData::new([1, 1, 1]),
            mtime: TimeStamp::now(),
            sampled: TimeStamp::NEVER,
        }
    }

    /// Replaces the sampled function.
    pub fn set_function(&mut self, function: impl FnMut(DVec3) -> f32 + 'static) {
        self.function = Box::new(function);
        self.modified();
    }

    pub fn set_dimensions(&mut self, dimensions: [u32; 3]) {
        self.dimensions = dimensions;
        self.modified();
    }

    pub fn set_bounds(&mut self, bounds_min: DVec3, bounds_max: DVec3) {
        self.bounds_min = bounds_min;
        self.bounds_max = bounds_max;
        self.modified();
    }

    /// Forces a resample on the next update.
    pub fn modified(&mut self) {
        self.mtime.modified();
    }

    fn sample(&mut self) -> Result<()> {
        if self.dimensions.contains(&0) {
            return Err(VolrayError::UpdateFailed(format!(
                "implicit source has empty dimensions {:?}",
                self.dimensions
            )));
        }
        let [nx, ny, nz] = self.dimensions;
        let step = |axis: usize, n: u32| {
            if n > 1 {
                (self.bounds_max[axis] - self.bounds_min[axis]) / f64::from(n - 1)
            } else {
                1.0
            }
        };
        let spacing = DVec3::new(step(0, nx), step(1, ny), step(2, nz));

        let mut values = Vec::with_capacity(nx as usize * ny as usize * nz as usize);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let index = DVec3::new(f64::from(i), f64::from(j), f64::from(k));
                    values.push((self.function)(self.bounds_min + index * spacing));
                }
            }
        }

        let mut image = ImageData::new(self.dimensions);
        image.set_origin(self.bounds_min);
        image.set_spacing(spacing);
        image.set_point_scalars(DataArray::scalars("implicit", ScalarBuffer::Float(values)))?;
        self.output = image;
        self.sampled = TimeStamp::now();
        log::debug!("sampled implicit source at {:?}", self.dimensions);
        Ok(())
    }
}

impl FieldSource for ImplicitSource {
    fn update(&mut self) -> Result<()> {
        if self.mtime > self.sampled {
            self.sample()?;
        }
        Ok(())
    }

    fn output(&self) -> &ImageData {
        &self.output
    }

    fn output_mut(&mut self) -> &mut ImageData {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{select_scalars, ArrayAccess, ScalarMode};

    #[test]
    fn test_samples_on_first_update_only() {
        let mut source = ImplicitSource::new([3, 2, 2], DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0), |p| {
            p.x as f32
        });
        source.update().unwrap();
        let first = source.output().mtime();
        assert_eq!(source.output().dimensions(), [3, 2, 2]);
        assert_eq!(source.output().spacing(), DVec3::ONE);

        let (array, _) =
            select_scalars(source.output(), ScalarMode::Default, &ArrayAccess::default()).unwrap();
        assert_eq!(array.range(0), Some([0.0, 2.0]));

        source.update().unwrap();
        assert_eq!(source.output().mtime(), first);

        source.modified();
        source.update().unwrap();
        assert!(source.output().mtime() > first);
    }

    #[test]
    fn test_empty_dimensions_fail() {
        let mut source = ImplicitSource::new([0, 4, 4], DVec3::ZERO, DVec3::ONE, |_| 0.0);
        assert!(matches!(source.update(), Err(VolrayError::UpdateFailed(_))));
    }
}
