//! volray: single-pass GPU ray casting for regular volume grids.
//!
//! A [`VolumeMapper`] renders one [`ImageData`] grid of scalars (or
//! unsigned-byte RGBA) by marching rays through a 3D texture in a single
//! draw of the grid's bounding box. Appearance comes from the [`Volume`]'s
//! [`VolumeProperty`]: a color transfer function, a scalar opacity function,
//! interpolation and shading.
//!
//! # Quick Start
//!
//! ```no_run
//! use volray::*;
//!
//! fn main() -> Result<()> {
//!     init();
//!
//!     // A sphere sampled on a 64^3 grid
//!     let source = ImplicitSource::new(
//!         [64, 64, 64],
//!         DVec3::splat(-1.0),
//!         DVec3::splat(1.0),
//!         |p| (1.0 - p.length() as f32).max(0.0),
//!     );
//!     let mut mapper = VolumeMapper::new();
//!     mapper.set_input(source);
//!
//!     let mut volume = Volume::new();
//!     volume.property_mut().set_interpolation(Interpolation::Linear);
//!
//!     render_to_file("sphere.png", &mut mapper, &mut volume, 800, 600)?;
//!     Ok(())
//! }
//! ```
//!
//! # Blend modes
//!
//! - [`BlendMode::Composite`] - front-to-back alpha compositing
//! - [`BlendMode::MaximumIntensity`] / [`BlendMode::MinimumIntensity`] - extremum projection
//! - [`BlendMode::Additive`] - opacity-weighted sum of single-component scalars

mod error;
mod headless;

pub use error::{Error, Result};
pub use headless::{render_to_file, render_to_image};

// Re-export core types
pub use volray_core::{
    select_scalars, ArrayAccess, BlendMode, ColorTransferFunction, DataArray, FieldSource,
    ImageData, ImplicitSource, Interpolation, MapperOptions, PiecewiseFunction, ScalarBuffer,
    ScalarMode, ScalarOrigin, ScalarType, TimeStamp, VolrayError, Volume, VolumeProperty,
};

// Re-export render types
pub use volray_render::{
    Camera, CameraView, DeviceCall, DeviceCapabilities, GraphicsDevice, RecordingDevice, RenderError,
    RenderEvent, SceneRenderer, ScreenshotOptions, ValidationError, Viewport, VolumeMapper,
    WgpuDevice,
};

pub use glam::{DMat4, DVec3, Vec3};

/// Sets up logging from `RUST_LOG` (default level `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let initialized = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init()
    .is_ok();
    if initialized {
        log::info!("volray initialized");
    }
}
