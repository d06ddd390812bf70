//! Single-pass ray-casting volume mapper.
//!
//! One [`VolumeMapper::render`] call validates its inputs, brings every GPU
//! resource up to date and draws the bounding cube once with the ray-casting
//! program. Resources are rebuilt lazily:
//!
//! - the volume texture and cube geometry when the input image or the
//!   selected array changed,
//! - the lookup tables when a transfer function or bake parameter changed,
//!   always after the volume so they match the uploaded range,
//! - the noise texture never, once created.

use std::time::{Duration, Instant};

use glam::DVec3;
use volray_core::{
    select_scalars, BlendMode, FieldSource, Interpolation, MapperOptions, Volume,
};

use crate::camera::CameraView;
use crate::device::{DrawCall, FilterMode, GraphicsDevice};
use crate::error::{RenderError, RenderResult};
use crate::format::{self, ResolvedFormat};
use crate::geometry::{compute_bounds, texture_extents, Bounds, CubeGeometry, TextureMapping};
use crate::noise::NoiseTexture;
use crate::shader::{
    check_program_source, shader_matrix, shader_matrix_cols, RayCastUniforms, AMBIENT, DIFFUSE,
    RAYCAST_SHADER, SHININESS, SPECULAR,
};
use crate::state::{StateScope, RAYCAST_STATE};
use crate::tables::{
    check_component_layout, seed_color, seed_opacity, ColorTable, OpacityParams, OpacityTable,
};
use crate::validate::{validate, ValidationError};
use crate::viewport::SceneRenderer;
use crate::volume_texture::VolumeTexture;

/// Lifecycle notification sent around every render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    RenderStart,
    RenderEnd,
}

type Observer = Box<dyn FnMut(RenderEvent)>;

struct Resources<D: GraphicsDevice> {
    program: D::Program,
    cube: CubeGeometry<D::Buffer>,
}

/// Where the uploaded volume sits in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    bounds: Bounds,
    mapping: TextureMapping,
    texture_extents: [i32; 6],
}

/// Camera values captured before the device is borrowed.
struct CameraState {
    projection: [[f64; 4]; 4],
    view: [[f64; 4]; 4],
    position: DVec3,
}

/// Renders one scalar or RGBA image by ray casting on a [`GraphicsDevice`].
pub struct VolumeMapper<D: GraphicsDevice> {
    options: MapperOptions,
    input: Option<Box<dyn FieldSource>>,
    resources: Option<Resources<D>>,
    volume_texture: VolumeTexture<D::Texture>,
    color_table: ColorTable<D::Texture>,
    opacity_table: OpacityTable<D::Texture>,
    noise: NoiseTexture<D::Texture>,
    placement: Option<Placement>,
    observers: Vec<Observer>,
    last_draw_time: Duration,
}

impl<D: GraphicsDevice> std::fmt::Debug for VolumeMapper<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeMapper")
            .field("options", &self.options)
            .field("has_input", &self.input.is_some())
            .field("initialized", &self.resources.is_some())
            .field("placement", &self.placement)
            .field("observers", &self.observers.len())
            .field("last_draw_time", &self.last_draw_time)
            .finish_non_exhaustive()
    }
}

impl<D: GraphicsDevice> Default for VolumeMapper<D> {
    fn default() -> Self {
        Self {
            options: MapperOptions::default(),
            input: None,
            resources: None,
            volume_texture: VolumeTexture::new(),
            color_table: ColorTable::default(),
            opacity_table: OpacityTable::default(),
            noise: NoiseTexture::default(),
            placement: None,
            observers: Vec::new(),
            last_draw_time: Duration::ZERO,
        }
    }
}

impl<D: GraphicsDevice> VolumeMapper<D> {
    /// Creates a mapper with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper with `options`.
    ///
    /// # Errors
    /// Fails if the options are out of range.
    pub fn with_options(options: MapperOptions) -> RenderResult<Self> {
        let mut mapper = Self::default();
        mapper.set_options(options)?;
        Ok(mapper)
    }

    #[must_use]
    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Replaces the options.
    ///
    /// # Errors
    /// Fails if the options are out of range; the previous options are kept.
    pub fn set_options(&mut self, options: MapperOptions) -> RenderResult<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.options.blend_mode = blend_mode;
    }

    /// Sets the ray step length in world units. Non-positive values are
    /// ignored.
    pub fn set_sample_distance(&mut self, sample_distance: f32) {
        if sample_distance > 0.0 && sample_distance.is_finite() {
            self.options.sample_distance = sample_distance;
        } else {
            log::warn!("ignoring sample distance {sample_distance}");
        }
    }

    /// Sets the source of the image to render.
    pub fn set_input(&mut self, input: impl FieldSource + 'static) {
        self.input = Some(Box::new(input));
        self.placement = None;
        self.volume_texture = VolumeTexture::new();
    }

    #[must_use]
    pub fn input(&self) -> Option<&dyn FieldSource> {
        self.input.as_deref()
    }

    pub fn input_mut(&mut self) -> Option<&mut (dyn FieldSource + 'static)> {
        self.input.as_deref_mut()
    }

    /// Registers a callback for [`RenderEvent`]s.
    pub fn add_observer(&mut self, observer: impl FnMut(RenderEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Model-space bounds of the last uploaded volume.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.placement.map(|p| p.bounds)
    }

    /// Brings the input up to date and returns the bounds its selected
    /// scalars would cover, without touching any GPU resource.
    ///
    /// Returns `Ok(None)` when there is no input or no scalars to select.
    pub fn input_bounds(&mut self) -> RenderResult<Option<Bounds>> {
        let Some(input) = self.input.as_deref_mut() else {
            return Ok(None);
        };
        input.update()?;
        let image = input.output();
        Ok(
            select_scalars(image, self.options.scalar_mode, &self.options.array_access)
                .map(|(_, origin)| compute_bounds(image, origin)),
        )
    }

    /// Wall time of the last [`VolumeMapper::render`] call.
    #[must_use]
    pub fn last_draw_time(&self) -> Duration {
        self.last_draw_time
    }

    /// Number of volume texture uploads so far.
    #[must_use]
    pub fn volume_uploads(&self) -> usize {
        self.volume_texture.uploads()
    }

    /// Side length of the noise texture, 0 before the first draw.
    #[must_use]
    pub fn noise_size(&self) -> u32 {
        self.noise.size()
    }

    /// Returns true once the program and cube buffers exist.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Drops every GPU resource. The next render starts from scratch.
    pub fn release_graphics_resources(&mut self) {
        self.resources = None;
        self.volume_texture = VolumeTexture::new();
        self.color_table = ColorTable::default();
        self.opacity_table = OpacityTable::default();
        self.noise = NoiseTexture::default();
        self.placement = None;
    }

    /// Renders `volume` into `renderer`.
    ///
    /// [`RenderEvent::RenderStart`] and [`RenderEvent::RenderEnd`] are sent
    /// and the draw time recorded whatever the outcome. A failed validation
    /// skips the frame without touching the device.
    ///
    /// # Errors
    /// Returns the validation failure or the GPU error that stopped the
    /// frame. Resources uploaded before a failure stay valid.
    pub fn render<R>(
        &mut self,
        renderer: Option<&mut R>,
        volume: Option<&mut Volume>,
    ) -> RenderResult<()>
    where
        R: SceneRenderer<Device = D>,
    {
        self.notify(RenderEvent::RenderStart);
        let start = Instant::now();

        let result = self.render_frame(renderer, volume);
        match &result {
            Ok(()) => {}
            Err(RenderError::Validation(reason)) => {
                log::warn!("skipping volume render: {reason}");
            }
            Err(e) => log::error!("volume render failed: {e}"),
        }

        self.last_draw_time = start.elapsed();
        log::debug!("volume render took {:?}", self.last_draw_time);
        self.notify(RenderEvent::RenderEnd);
        result
    }

    fn notify(&mut self, event: RenderEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }

    /// Creates the program and cube buffers once. Returns true if they were
    /// created by this call.
    fn ensure_resources(&mut self, device: &mut D) -> RenderResult<bool> {
        if self.resources.is_some() {
            return Ok(false);
        }
        check_program_source(RAYCAST_SHADER)?;
        let program = device.create_program("ray cast program", RAYCAST_SHADER)?;
        let cube = CubeGeometry::new(device)?;
        self.resources = Some(Resources { program, cube });
        log::debug!("volume mapper initialized");
        Ok(true)
    }

    fn render_frame<R>(
        &mut self,
        renderer: Option<&mut R>,
        volume: Option<&mut Volume>,
    ) -> RenderResult<()>
    where
        R: SceneRenderer<Device = D>,
    {
        let summary = validate(
            renderer.as_deref(),
            volume.as_deref(),
            self.input.as_deref_mut(),
            &self.options,
        )?;
        let (Some(renderer), Some(volume)) = (renderer, volume) else {
            return Err(ValidationError::MissingRenderer.into());
        };

        let aspect = renderer.aspect();
        let camera = renderer.active_camera();
        let camera = CameraState {
            projection: camera.projection_matrix(aspect),
            view: camera.view_matrix(),
            position: camera.position(),
        };

        let device = renderer.device_mut();
        device.make_current();
        let fresh = self.ensure_resources(device)?;

        let input = self
            .input
            .as_deref()
            .ok_or(ValidationError::MissingInput)?;
        let image = input.output();
        let (scalars, origin) =
            select_scalars(image, self.options.scalar_mode, &self.options.array_access)
                .ok_or(ValidationError::NoScalars)?;

        let range = if summary.components == 4 {
            [0.0, 255.0]
        } else {
            scalars.range(0).unwrap_or([0.0, 1.0])
        };
        let resolved = format::resolve(
            summary.scalar_type,
            summary.components,
            range,
            device.capabilities(),
        )?;
        let filter = filter_mode(volume.property().interpolation());

        if self
            .volume_texture
            .is_dirty(image.mtime(), scalars, origin, filter)
        {
            let placement = Placement {
                bounds: compute_bounds(image, origin),
                mapping: TextureMapping::new(image, origin),
                texture_extents: texture_extents(image, origin),
            };
            self.volume_texture
                .update(device, image, scalars, origin, &resolved, filter)?;
            if let Some(resources) = &self.resources {
                resources.cube.rebuild(device, &placement.bounds);
            }
            self.placement = Some(placement);
        } else if fresh {
            if let (Some(resources), Some(placement)) = (&self.resources, &self.placement) {
                resources.cube.rebuild(device, &placement.bounds);
            }
        }

        check_component_layout(
            summary.components,
            volume.property().independent_components(),
        )?;
        let property = volume.property_mut();
        if seed_opacity(property.scalar_opacity_mut(), range) {
            log::debug!("seeded scalar opacity over {range:?}");
        }
        if seed_color(property.color_mut(), range) {
            log::debug!("seeded color over {range:?}");
        }
        let params = OpacityParams {
            range,
            width: self.options.table_width,
            filter,
            blend_mode: self.options.blend_mode,
            sample_distance: f64::from(self.options.sample_distance),
            unit_distance: property.scalar_opacity_unit_distance(),
        };
        self.opacity_table
            .update(device, property.scalar_opacity(), &params)?;
        self.color_table.update(
            device,
            property.color(),
            range,
            filter,
            self.options.table_width,
        )?;
        self.noise.ensure(device, self.options.noise_size)?;

        let placement = self
            .placement
            .ok_or_else(|| missing("volume placement"))?;
        let uploaded = self.volume_texture.format().copied().unwrap_or(resolved);
        let uniforms = self.uniforms(&placement, &uploaded, &camera, volume, summary.components);

        let resources = self
            .resources
            .as_ref()
            .ok_or_else(|| missing("ray cast program"))?;
        let textures = [
            self.volume_texture
                .texture()
                .ok_or_else(|| missing("volume texture"))?,
            self.color_table
                .texture()
                .ok_or_else(|| missing("color table"))?,
            self.opacity_table
                .texture()
                .ok_or_else(|| missing("opacity table"))?,
            self.noise
                .texture()
                .ok_or_else(|| missing("noise texture"))?,
        ];

        let call: DrawCall<'_, D> = DrawCall {
            program: &resources.program,
            vertices: resources.cube.vertices(),
            indices: resources.cube.indices(),
            index_count: resources.cube.index_count(),
            textures,
            uniforms: &uniforms,
        };
        let mut scope = StateScope::new(device, RAYCAST_STATE);
        scope.draw(&call)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn uniforms(
        &self,
        placement: &Placement,
        format: &ResolvedFormat,
        camera: &CameraState,
        volume: &Volume,
        components: usize,
    ) -> RayCastUniforms {
        let b = &placement.bounds;
        let min = [b[0], b[2], b[4]];
        let max = [b[1], b[3], b[5]];
        let size: [f64; 3] = std::array::from_fn(|i| max[i] - min[i]);
        let to_f32 = |v: [f64; 3]| v.map(|x| x as f32);
        let ext = &placement.texture_extents;
        let position = to_f32(camera.position.to_array());

        RayCastUniforms {
            projection_matrix: shader_matrix(&camera.projection),
            modelview_matrix: shader_matrix(&camera.view),
            scene_matrix: shader_matrix_cols(volume.matrix()),
            inverse_scene_matrix: shader_matrix_cols(volume.matrix().inverse()),
            camera_pos: position,
            sample_distance: self.options.sample_distance,
            // The light sits at the camera.
            light_pos: position,
            shift: format.shift as f32,
            step_size: to_f32(size.map(|s| if s > 0.0 { 1.0 / s } else { 0.0 })),
            scale: format.scale as f32,
            cell_scale: to_f32(size.map(|s| 0.5 * s)),
            shininess: SHININESS,
            vol_extents_min: to_f32(min),
            enable_shading: u32::from(volume.property().shade()),
            vol_extents_max: to_f32(max),
            blend_mode: blend_mode_code(self.options.blend_mode),
            texture_extents_min: [ext[0], ext[2], ext[4]].map(|e| e as f32),
            num_components: components as u32,
            texture_extents_max: [ext[1], ext[3], ext[5]].map(|e| e as f32),
            noise_size: self.noise.size().max(1) as f32,
            texture_coord_offset: to_f32(placement.mapping.offset),
            texture_coord_scale: to_f32(placement.mapping.scale),
            ambient: AMBIENT,
            diffuse: DIFFUSE,
            specular: SPECULAR,
            ..RayCastUniforms::default()
        }
    }
}

fn missing(what: &str) -> RenderError {
    RenderError::TextureCreationFailed(format!("{what} is not available"))
}

fn filter_mode(interpolation: Interpolation) -> FilterMode {
    match interpolation {
        Interpolation::Nearest => FilterMode::Nearest,
        Interpolation::Linear => FilterMode::Linear,
    }
}

/// Blend mode as the shader's `blend_mode` uniform encodes it.
#[must_use]
pub fn blend_mode_code(mode: BlendMode) -> u32 {
    match mode {
        BlendMode::MaximumIntensity => 1,
        BlendMode::MinimumIntensity => 2,
        BlendMode::Additive => 3,
        BlendMode::Composite | BlendMode::AverageIntensity | BlendMode::Isosurface => 0,
    }
}
