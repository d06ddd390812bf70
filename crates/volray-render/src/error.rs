//! Rendering error types.

use thiserror::Error;
use volray_core::{ScalarType, VolrayError};

use crate::validate::ValidationError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Reading the offscreen target back failed.
    #[error("pixel readback failed: {0}")]
    ReadbackFailed(String),

    /// The scalar element type has no GPU texture format.
    #[error("unsupported scalar type: {0}")]
    UnsupportedScalarType(ScalarType),

    /// The component layout cannot be rendered by this mapper.
    #[error("unsupported component layout: {components} components (independent: {independent})")]
    UnsupportedComponentLayout { components: usize, independent: bool },

    /// Render preconditions were not met.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A data-model operation failed.
    #[error(transparent)]
    Core(#[from] VolrayError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
