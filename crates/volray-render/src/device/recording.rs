//! A graphics device that records calls instead of touching a GPU.

use crate::device::{
    BufferKind, DeviceCapabilities, DrawCall, FilterMode, GraphicsDevice, InternalFormat,
    PipelineState, TextureDesc, TextureDimension,
};
use crate::error::{RenderError, RenderResult};
use crate::shader::RayCastUniforms;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    MakeCurrent,
    CreateProgram {
        id: u64,
        label: String,
    },
    CreateTexture {
        id: u64,
        label: String,
        dimension: TextureDimension,
        size: [u32; 3],
        format: InternalFormat,
        filter: FilterMode,
        bytes: usize,
    },
    CreateBuffer {
        id: u64,
        label: String,
        kind: BufferKind,
        bytes: usize,
    },
    WriteBuffer {
        id: u64,
        bytes: usize,
    },
    SetState(PipelineState),
    Draw {
        program: u64,
        index_count: u32,
        textures: [u64; 4],
        state: PipelineState,
        uniforms: Box<RayCastUniforms>,
    },
}

/// Records every call and hands out integer handles.
///
/// Allocation failures can be injected to exercise error paths.
#[derive(Debug)]
pub struct RecordingDevice {
    capabilities: DeviceCapabilities,
    state: PipelineState,
    calls: Vec<DeviceCall>,
    next_id: u64,
    fail_programs: bool,
    fail_textures: bool,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::with_capabilities(DeviceCapabilities::default())
    }
}

impl RecordingDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device reporting `capabilities`.
    #[must_use]
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            state: PipelineState::default(),
            calls: Vec::new(),
            next_id: 1,
            fail_programs: false,
            fail_textures: false,
        }
    }

    /// Makes subsequent program creations fail.
    pub fn fail_program_creation(&mut self, fail: bool) {
        self.fail_programs = fail;
    }

    /// Makes subsequent texture creations fail.
    pub fn fail_texture_allocations(&mut self, fail: bool) {
        self.fail_textures = fail;
    }

    /// Returns the recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Counts texture creations with the given label.
    #[must_use]
    pub fn texture_creations(&self, label: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::CreateTexture { label: l, .. } if l == label))
            .count()
    }

    /// Returns the recorded draws.
    #[must_use]
    pub fn draws(&self) -> Vec<&DeviceCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::Draw { .. }))
            .collect()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsDevice for RecordingDevice {
    type Program = u64;
    type Texture = u64;
    type Buffer = u64;

    fn make_current(&mut self) {
        self.calls.push(DeviceCall::MakeCurrent);
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn create_program(&mut self, label: &str, _source: &str) -> RenderResult<u64> {
        if self.fail_programs {
            return Err(RenderError::ShaderCompilationFailed(format!(
                "{label}: injected failure"
            )));
        }
        let id = self.next_id();
        self.calls.push(DeviceCall::CreateProgram {
            id,
            label: label.to_string(),
        });
        Ok(id)
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>, data: &[u8]) -> RenderResult<u64> {
        if self.fail_textures {
            return Err(RenderError::TextureCreationFailed(format!(
                "{}: injected failure",
                desc.label
            )));
        }
        if data.len() != desc.byte_len() {
            return Err(RenderError::TextureCreationFailed(format!(
                "{}: expected {} bytes, got {}",
                desc.label,
                desc.byte_len(),
                data.len()
            )));
        }
        let id = self.next_id();
        self.calls.push(DeviceCall::CreateTexture {
            id,
            label: desc.label.to_string(),
            dimension: desc.dimension,
            size: desc.size,
            format: desc.format,
            filter: desc.filter,
            bytes: data.len(),
        });
        Ok(id)
    }

    fn create_buffer(&mut self, label: &str, kind: BufferKind, data: &[u8]) -> RenderResult<u64> {
        let id = self.next_id();
        self.calls.push(DeviceCall::CreateBuffer {
            id,
            label: label.to_string(),
            kind,
            bytes: data.len(),
        });
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: &u64, data: &[u8]) {
        self.calls.push(DeviceCall::WriteBuffer {
            id: *buffer,
            bytes: data.len(),
        });
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.state = state;
        self.calls.push(DeviceCall::SetState(state));
    }

    fn draw(&mut self, call: &DrawCall<'_, Self>) -> RenderResult<()> {
        self.calls.push(DeviceCall::Draw {
            program: *call.program,
            index_count: call.index_count,
            textures: call.textures.map(|t| *t),
            state: self.state,
            uniforms: Box::new(*call.uniforms),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::WrapMode;

    #[test]
    fn test_texture_size_is_checked() {
        let mut device = RecordingDevice::new();
        let desc = TextureDesc {
            label: "t",
            dimension: TextureDimension::D2,
            size: [4, 1, 1],
            format: InternalFormat::Rgba8Unorm,
            filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
        };
        assert!(device.create_texture(&desc, &[0; 16]).is_ok());
        assert!(device.create_texture(&desc, &[0; 15]).is_err());
        assert_eq!(device.texture_creations("t"), 1);
    }

    #[test]
    fn test_injected_failures() {
        let mut device = RecordingDevice::new();
        device.fail_program_creation(true);
        assert!(matches!(
            device.create_program("p", ""),
            Err(RenderError::ShaderCompilationFailed(_))
        ));
        device.fail_program_creation(false);
        assert!(device.create_program("p", "").is_ok());
    }
}
