//! Offscreen wgpu implementation of [`GraphicsDevice`].

use std::collections::HashMap;
use std::num::NonZeroU64;

use pollster::FutureExt;
use wgpu::util::DeviceExt;

use crate::device::{
    BlendState, BufferKind, DeviceCapabilities, DrawCall, FilterMode, GraphicsDevice,
    PipelineState, TextureDesc, TextureDimension, WrapMode,
};
use crate::error::{RenderError, RenderResult};
use crate::shader::{RayCastUniforms, TextureUnit};

/// Format of the offscreen color target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Format of the offscreen depth target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Optional features used when the adapter has them.
const OPTIONAL_FEATURES: [wgpu::Features; 2] = [
    wgpu::Features::FLOAT32_FILTERABLE,
    wgpu::Features::TEXTURE_FORMAT_16BIT_NORM,
];

/// A compiled shader module.
#[derive(Debug)]
pub struct WgpuProgram {
    id: u64,
    module: wgpu::ShaderModule,
}

/// A sampled texture together with its view and sampler.
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl WgpuTexture {
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

#[derive(Debug)]
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
}

/// Renders into an offscreen RGBA8 target with a depth buffer.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    capabilities: DeviceCapabilities,
    state: PipelineState,
    width: u32,
    height: u32,
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    pipelines: HashMap<(u64, PipelineState), wgpu::RenderPipeline>,
    next_program_id: u64,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl WgpuDevice {
    /// Creates a device rendering into a `width` x `height` offscreen target.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}, driver {} {})",
            info.name,
            info.backend,
            info.driver,
            info.driver_info
        );

        let available = adapter.features();
        let required_features = OPTIONAL_FEATURES
            .into_iter()
            .filter(|f| available.contains(*f))
            .fold(wgpu::Features::empty(), |acc, f| acc | f);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("volray device (headless)"),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let limits = device.limits();
        let capabilities = DeviceCapabilities {
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_texture_dimension_3d: limits.max_texture_dimension_3d,
            float32_filterable: required_features.contains(wgpu::Features::FLOAT32_FILTERABLE),
            norm16_textures: required_features.contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM),
        };
        log::debug!("device capabilities: {capabilities:?}");

        let (color_texture, color_view) = Self::create_color_texture(&device, width, height);
        let depth_view = Self::create_depth_texture(&device, width, height);
        let bind_group_layout = Self::create_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ray cast pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ray cast uniforms"),
            contents: bytemuck::cast_slice(&[RayCastUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            device,
            queue,
            capabilities,
            state: PipelineState::default(),
            width,
            height,
            color_texture,
            color_view,
            depth_view,
            bind_group_layout,
            pipeline_layout,
            uniform_buffer,
            pipelines: HashMap::new(),
            next_program_id: 1,
        })
    }

    /// Blocking version of [`WgpuDevice::new_headless`].
    pub fn new_headless_blocking(width: u32, height: u32) -> RenderResult<Self> {
        Self::new_headless(width, height).block_on()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Resizes the offscreen targets. Their contents are lost.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        let (color_texture, color_view) = Self::create_color_texture(&self.device, width, height);
        self.color_texture = color_texture;
        self.color_view = color_view;
        self.depth_view = Self::create_depth_texture(&self.device, width, height);
        self.width = width;
        self.height = height;
    }

    /// Clears color to `rgba` and depth to the far plane.
    pub fn clear(&mut self, rgba: [f64; 4]) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: rgba[0],
                            g: rgba[1],
                            b: rgba[2],
                            a: rgba[3],
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Reads the color target back as tightly packed RGBA8 rows, top row
    /// first.
    pub fn read_pixels(&self) -> RenderResult<Vec<u8>> {
        let bytes_per_row = aligned_bytes_per_row(self.width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(bytes_per_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?
            .map_err(|e| RenderError::ReadbackFailed(e.to_string()))?;

        let data = slice.get_mapped_range();
        let row_bytes = (self.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        buffer.unmap();
        Ok(pixels)
    }

    fn create_color_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("color target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(std::mem::size_of::<RayCastUniforms>() as u64),
            },
            count: None,
        }];
        for unit in TextureUnit::ALL {
            let view_dimension = if unit == TextureUnit::Volume {
                wgpu::TextureViewDimension::D3
            } else {
                wgpu::TextureViewDimension::D2
            };
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: unit.binding(),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: unit.binding() + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ray cast bind group layout"),
            entries: &entries,
        })
    }

    fn pipeline(&mut self, program: &WgpuProgram) -> &wgpu::RenderPipeline {
        let state = self.state;
        let (device, layout) = (&self.device, &self.pipeline_layout);
        self.pipelines
            .entry((program.id, state))
            .or_insert_with(|| {
                log::debug!("building ray cast pipeline for {state:?}");
                create_pipeline(device, layout, &program.module, state)
            })
    }

    /// Runs `f` inside an error scope and turns a captured error into a
    /// [`RenderError`].
    fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        f: impl FnOnce(&wgpu::Device) -> T,
        on_error: impl FnOnce(wgpu::Error) -> RenderError,
    ) -> RenderResult<T> {
        self.device.push_error_scope(filter);
        let value = f(&self.device);
        match self.device.pop_error_scope().block_on() {
            None => Ok(value),
            Some(error) => Err(on_error(error)),
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    state: PipelineState,
) -> wgpu::RenderPipeline {
    let blend = match state.blend {
        BlendState::Off => None,
        BlendState::Over => Some(wgpu::BlendState::ALPHA_BLENDING),
    };
    let depth_compare = if state.depth_test {
        wgpu::CompareFunction::LessEqual
    } else {
        wgpu::CompareFunction::Always
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("ray cast pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Rays are cast from the back faces of the bounding cube.
            cull_mode: Some(wgpu::Face::Front),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

fn sampler_descriptor(desc: &TextureDesc<'_>) -> wgpu::SamplerDescriptor<'static> {
    let filter = match desc.filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };
    let address = match desc.wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    };
    wgpu::SamplerDescriptor {
        label: None,
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

impl GraphicsDevice for WgpuDevice {
    type Program = WgpuProgram;
    type Texture = WgpuTexture;
    type Buffer = WgpuBuffer;

    fn make_current(&mut self) {
        // A wgpu device is not bound to a thread-local context.
        log::trace!("make current");
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn create_program(&mut self, label: &str, source: &str) -> RenderResult<WgpuProgram> {
        let module = self.scoped(
            wgpu::ErrorFilter::Validation,
            |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            },
            |e| RenderError::ShaderCompilationFailed(e.to_string()),
        )?;
        let id = self.next_program_id;
        self.next_program_id += 1;
        Ok(WgpuProgram { id, module })
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>, data: &[u8]) -> RenderResult<WgpuTexture> {
        if data.len() != desc.byte_len() {
            return Err(RenderError::TextureCreationFailed(format!(
                "{}: expected {} bytes, got {}",
                desc.label,
                desc.byte_len(),
                data.len()
            )));
        }
        let [width, height, depth] = desc.size;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: depth,
        };
        let dimension = match desc.dimension {
            TextureDimension::D2 => wgpu::TextureDimension::D2,
            TextureDimension::D3 => wgpu::TextureDimension::D3,
        };
        let format = desc.format.to_wgpu();

        let texture = self.scoped(
            wgpu::ErrorFilter::OutOfMemory,
            |device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(desc.label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension,
                    format,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                })
            },
            |_| RenderError::OutOfMemory,
        )?;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * desc.format.bytes_per_texel()),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&sampler_descriptor(desc));
        Ok(WgpuTexture {
            texture,
            view,
            sampler,
        })
    }

    fn create_buffer(
        &mut self,
        label: &str,
        kind: BufferKind,
        data: &[u8],
    ) -> RenderResult<WgpuBuffer> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        let buffer = self.scoped(
            wgpu::ErrorFilter::OutOfMemory,
            |device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: data,
                    usage,
                })
            },
            |e| RenderError::BufferCreationFailed(format!("{label}: {e}")),
        )?;
        Ok(WgpuBuffer { buffer })
    }

    fn write_buffer(&mut self, buffer: &WgpuBuffer, data: &[u8]) {
        self.queue.write_buffer(&buffer.buffer, 0, data);
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    fn draw(&mut self, call: &DrawCall<'_, Self>) -> RenderResult<()> {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(call.uniforms));

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        }];
        for (unit, texture) in TextureUnit::ALL.iter().zip(call.textures) {
            entries.push(wgpu::BindGroupEntry {
                binding: unit.binding(),
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: unit.binding() + 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ray cast bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let pipeline = self.pipeline(call.program).clone();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ray cast encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ray cast pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, call.vertices.buffer.slice(..));
            pass.set_index_buffer(call.indices.buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..call.index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readback_rows_are_aligned() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
    }

    #[test]
    fn test_sampler_follows_desc() {
        let desc = TextureDesc {
            label: "noise",
            dimension: TextureDimension::D2,
            size: [8, 8, 1],
            format: crate::device::InternalFormat::R16Float,
            filter: FilterMode::Nearest,
            wrap: WrapMode::Repeat,
        };
        let sampler = sampler_descriptor(&desc);
        assert_eq!(sampler.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(sampler.mag_filter, wgpu::FilterMode::Nearest);
    }
}
