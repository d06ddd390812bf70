//! Graphics device abstraction.
//!
//! The mapper talks to the GPU only through [`GraphicsDevice`]. Two
//! implementations ship with the crate: [`WgpuDevice`] renders offscreen with
//! wgpu, and [`RecordingDevice`] records every call for tests.

mod recording;
mod wgpu_device;

pub use recording::{DeviceCall, RecordingDevice};
pub use wgpu_device::{WgpuBuffer, WgpuDevice, WgpuProgram, WgpuTexture};

use crate::error::RenderResult;
use crate::shader::RayCastUniforms;

/// Limits and optional features probed once when the device is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Largest width/height of a 2D texture.
    pub max_texture_dimension_2d: u32,
    /// Largest side of a 3D texture.
    pub max_texture_dimension_3d: u32,
    /// 32-bit float textures can be sampled with linear filtering.
    pub float32_filterable: bool,
    /// 16-bit normalized integer formats are available.
    pub norm16_textures: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        let limits = wgpu::Limits::downlevel_defaults();
        Self {
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_texture_dimension_3d: limits.max_texture_dimension_3d,
            float32_filterable: false,
            norm16_textures: false,
        }
    }
}

/// Internal storage format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    R8Unorm,
    R8Snorm,
    R16Unorm,
    R16Snorm,
    R16Float,
    R32Float,
    Rgba8Unorm,
}

impl InternalFormat {
    /// Size of one texel in bytes.
    #[must_use]
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            InternalFormat::R8Unorm | InternalFormat::R8Snorm => 1,
            InternalFormat::R16Unorm | InternalFormat::R16Snorm | InternalFormat::R16Float => 2,
            InternalFormat::R32Float | InternalFormat::Rgba8Unorm => 4,
        }
    }

    /// The matching wgpu format.
    #[must_use]
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            InternalFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            InternalFormat::R8Snorm => wgpu::TextureFormat::R8Snorm,
            InternalFormat::R16Unorm => wgpu::TextureFormat::R16Unorm,
            InternalFormat::R16Snorm => wgpu::TextureFormat::R16Snorm,
            InternalFormat::R16Float => wgpu::TextureFormat::R16Float,
            InternalFormat::R32Float => wgpu::TextureFormat::R32Float,
            InternalFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    D3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Everything needed to allocate a texture with one mip level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub dimension: TextureDimension,
    /// Width, height and depth; depth is 1 for 2D textures.
    pub size: [u32; 3],
    pub format: InternalFormat,
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl TextureDesc<'_> {
    /// Number of bytes a tightly packed upload must contain.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.size.iter().map(|&s| s as usize).product::<usize>()
            * self.format.bytes_per_texel() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Color blending applied to the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendState {
    #[default]
    Off,
    /// `src * src_alpha + dst * (1 - src_alpha)`.
    Over,
}

/// Fixed-function state that affects draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineState {
    pub blend: BlendState,
    pub depth_test: bool,
}

/// One indexed draw of the ray-casting program.
pub struct DrawCall<'a, D: GraphicsDevice + ?Sized> {
    pub program: &'a D::Program,
    pub vertices: &'a D::Buffer,
    pub indices: &'a D::Buffer,
    pub index_count: u32,
    /// Textures in unit order: volume, color table, opacity table, noise.
    pub textures: [&'a D::Texture; 4],
    pub uniforms: &'a RayCastUniforms,
}

/// The GPU operations the volume mapper relies on.
pub trait GraphicsDevice {
    type Program;
    type Texture;
    type Buffer;

    /// Makes this device's context the target of subsequent calls.
    fn make_current(&mut self);

    /// Returns the capabilities probed at creation.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Compiles a shader program.
    fn create_program(&mut self, label: &str, source: &str) -> RenderResult<Self::Program>;

    /// Allocates a texture and uploads `data`, which must be tightly packed.
    fn create_texture(&mut self, desc: &TextureDesc<'_>, data: &[u8])
        -> RenderResult<Self::Texture>;

    /// Allocates a buffer initialized with `data`.
    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        data: &[u8],
    ) -> RenderResult<Self::Buffer>;

    /// Overwrites the start of `buffer` with `data`.
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]);

    /// Returns the current fixed-function state.
    fn pipeline_state(&self) -> PipelineState;

    /// Replaces the fixed-function state.
    fn set_pipeline_state(&mut self, state: PipelineState);

    /// Issues an indexed draw with the current state.
    fn draw(&mut self, call: &DrawCall<'_, Self>) -> RenderResult<()>;
}
