//! Headless rendering.
//!
//! Renders a volume to an image buffer or file without a window. Each call
//! creates a fresh GPU device, so the mapper's resources are released first
//! and rebuilt on the new device.

use glam::{DVec3, Vec3};
use pollster::FutureExt;
use volray_core::Volume;
use volray_render::{
    save_image, Bounds, SceneRenderer, ScreenshotOptions, Viewport, VolumeMapper, WgpuDevice,
};

use crate::{Error, Result};

/// World-space box around `bounds` placed by `volume`'s matrix.
fn world_box(bounds: &Bounds, volume: &Volume) -> (Vec3, Vec3) {
    let matrix = volume.matrix();
    let mut min = DVec3::splat(f64::INFINITY);
    let mut max = DVec3::splat(f64::NEG_INFINITY);
    for corner in 0..8 {
        let local = DVec3::new(
            bounds[corner & 1],
            bounds[2 + ((corner >> 1) & 1)],
            bounds[4 + ((corner >> 2) & 1)],
        );
        let world = matrix.transform_point3(local);
        min = min.min(world);
        max = max.max(world);
    }
    (min.as_vec3(), max.as_vec3())
}

/// Renders `volume` through `mapper` into a raw RGBA pixel buffer.
///
/// The camera frames the volume's world-space bounding box and the target
/// is cleared to the mapper's background color first. The buffer holds
/// `width * height * 4` bytes, row by row from the top left.
///
/// # Example
/// ```no_run
/// use volray::*;
///
/// let mut mapper = VolumeMapper::new();
/// mapper.set_input(ImplicitSource::new(
///     [32, 32, 32],
///     DVec3::splat(-1.0),
///     DVec3::splat(1.0),
///     |p| p.length() as f32,
/// ));
/// let mut volume = Volume::new();
/// let pixels = render_to_image(&mut mapper, &mut volume, 320, 240).unwrap();
/// assert_eq!(pixels.len(), 320 * 240 * 4);
/// ```
pub fn render_to_image(
    mapper: &mut VolumeMapper<WgpuDevice>,
    volume: &mut Volume,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let bounds = mapper
        .input_bounds()?
        .ok_or(Error::NothingToRender("the input has no scalars"))?;

    let device = WgpuDevice::new_headless(width, height).block_on()?;
    mapper.release_graphics_resources();

    let mut viewport = Viewport::new(device, width, height);
    let (min, max) = world_box(&bounds, volume);
    viewport.camera.look_at_box(min, max);

    let background = mapper.options().background_color.as_dvec3();
    viewport
        .device_mut()
        .clear([background.x, background.y, background.z, 1.0]);
    mapper.render(Some(&mut viewport), Some(volume))?;
    Ok(viewport.device().read_pixels()?)
}

/// Renders `volume` through `mapper` and saves the frame as PNG or JPEG.
pub fn render_to_file(
    path: impl AsRef<std::path::Path>,
    mapper: &mut VolumeMapper<WgpuDevice>,
    volume: &mut Volume,
    width: u32,
    height: u32,
) -> Result<()> {
    let pixels = render_to_image(mapper, volume, width, height)?;
    save_image(path, &pixels, width, height, &ScreenshotOptions::default())?;
    Ok(())
}
