//! Rendering backend for volray.
//!
//! This crate provides:
//! - the [`GraphicsDevice`] abstraction with a wgpu and a recording backend
//! - texture format resolution and volume upload
//! - color and opacity lookup tables baked from transfer functions
//! - the ray-casting shader and its uniforms
//! - [`VolumeMapper`], which ties them together into a single draw

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Texture sizes and extents move between u32, i32 and f32 throughout
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]

pub mod camera;
pub mod device;
pub mod error;
pub mod format;
pub mod geometry;
pub mod mapper;
pub mod noise;
pub mod screenshot;
pub mod shader;
pub mod state;
pub mod tables;
pub mod validate;
pub mod viewport;
pub mod volume_texture;

pub use camera::{Camera, CameraView};
pub use device::{
    BlendState, DeviceCall, DeviceCapabilities, GraphicsDevice, PipelineState, RecordingDevice,
    WgpuDevice,
};
pub use error::{RenderError, RenderResult};
pub use format::ResolvedFormat;
pub use geometry::Bounds;
pub use mapper::{RenderEvent, VolumeMapper};
pub use screenshot::{save_image, save_to_buffer, ScreenshotError, ScreenshotOptions};
pub use shader::{RayCastUniforms, RAYCAST_SHADER};
pub use validate::ValidationError;
pub use viewport::{SceneRenderer, Viewport};
