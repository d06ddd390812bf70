//! Ray-casting shader interface.
//!
//! The WGSL program lives in `shaders/raycast.wgsl`. Its uniform block mirrors
//! [`RayCastUniforms`] field for field, and its texture bindings follow
//! [`TextureUnit`]. [`check_program_source`] verifies once at initialization
//! that every [`ShaderParam`] is declared, so a renamed or missing parameter
//! fails early instead of silently reading garbage every frame.

use bytemuck::{Pod, Zeroable};
use glam::{DMat4, Mat4};

use crate::error::{RenderError, RenderResult};

/// WGSL source of the ray-casting program.
pub const RAYCAST_SHADER: &str = include_str!("shaders/raycast.wgsl");

/// Texture units of the ray-casting program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUnit {
    Volume = 0,
    ColorTable = 1,
    OpacityTable = 2,
    Noise = 3,
}

impl TextureUnit {
    pub const ALL: [TextureUnit; 4] = [
        TextureUnit::Volume,
        TextureUnit::ColorTable,
        TextureUnit::OpacityTable,
        TextureUnit::Noise,
    ];

    /// Binding of the texture view; the sampler follows at `binding + 1`.
    #[must_use]
    pub fn binding(self) -> u32 {
        1 + 2 * self as u32
    }
}

/// Named parameters of the ray-casting program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderParam {
    ProjectionMatrix,
    ModelviewMatrix,
    SceneMatrix,
    InverseSceneMatrix,
    CameraPos,
    LightPos,
    StepSize,
    SampleDistance,
    Shift,
    Scale,
    CellScale,
    VolExtentsMin,
    VolExtentsMax,
    TextureExtentsMin,
    TextureExtentsMax,
    TextureCoordOffset,
    TextureCoordScale,
    EnableShading,
    Ambient,
    Diffuse,
    Specular,
    Shininess,
    BlendMode,
    NumComponents,
    NoiseSize,
    Volume,
    ColorTransferFunc,
    OpacityTransferFunc,
    Noise,
}

impl ShaderParam {
    pub const ALL: [ShaderParam; 29] = [
        ShaderParam::ProjectionMatrix,
        ShaderParam::ModelviewMatrix,
        ShaderParam::SceneMatrix,
        ShaderParam::InverseSceneMatrix,
        ShaderParam::CameraPos,
        ShaderParam::LightPos,
        ShaderParam::StepSize,
        ShaderParam::SampleDistance,
        ShaderParam::Shift,
        ShaderParam::Scale,
        ShaderParam::CellScale,
        ShaderParam::VolExtentsMin,
        ShaderParam::VolExtentsMax,
        ShaderParam::TextureExtentsMin,
        ShaderParam::TextureExtentsMax,
        ShaderParam::TextureCoordOffset,
        ShaderParam::TextureCoordScale,
        ShaderParam::EnableShading,
        ShaderParam::Ambient,
        ShaderParam::Diffuse,
        ShaderParam::Specular,
        ShaderParam::Shininess,
        ShaderParam::BlendMode,
        ShaderParam::NumComponents,
        ShaderParam::NoiseSize,
        ShaderParam::Volume,
        ShaderParam::ColorTransferFunc,
        ShaderParam::OpacityTransferFunc,
        ShaderParam::Noise,
    ];

    /// Name of the parameter in the WGSL source.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ShaderParam::ProjectionMatrix => "projection_matrix",
            ShaderParam::ModelviewMatrix => "modelview_matrix",
            ShaderParam::SceneMatrix => "scene_matrix",
            ShaderParam::InverseSceneMatrix => "inverse_scene_matrix",
            ShaderParam::CameraPos => "camera_pos",
            ShaderParam::LightPos => "light_pos",
            ShaderParam::StepSize => "step_size",
            ShaderParam::SampleDistance => "sample_distance",
            ShaderParam::Shift => "shift",
            ShaderParam::Scale => "scale",
            ShaderParam::CellScale => "cell_scale",
            ShaderParam::VolExtentsMin => "vol_extents_min",
            ShaderParam::VolExtentsMax => "vol_extents_max",
            ShaderParam::TextureExtentsMin => "texture_extents_min",
            ShaderParam::TextureExtentsMax => "texture_extents_max",
            ShaderParam::TextureCoordOffset => "texture_coord_offset",
            ShaderParam::TextureCoordScale => "texture_coord_scale",
            ShaderParam::EnableShading => "enable_shading",
            ShaderParam::Ambient => "ambient",
            ShaderParam::Diffuse => "diffuse",
            ShaderParam::Specular => "specular",
            ShaderParam::Shininess => "shininess",
            ShaderParam::BlendMode => "blend_mode",
            ShaderParam::NumComponents => "num_components",
            ShaderParam::NoiseSize => "noise_size",
            ShaderParam::Volume => "volume",
            ShaderParam::ColorTransferFunc => "color_transfer_func",
            ShaderParam::OpacityTransferFunc => "opacity_transfer_func",
            ShaderParam::Noise => "noise",
        }
    }
}

/// Checks that `source` declares every [`ShaderParam`].
///
/// Uniform fields are declared as `name:` and textures as `var name:`.
pub fn check_program_source(source: &str) -> RenderResult<()> {
    let missing: Vec<&str> = ShaderParam::ALL
        .iter()
        .map(|p| p.name())
        .filter(|name| !declares(source, name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RenderError::ShaderCompilationFailed(format!(
            "ray-casting program does not declare: {}",
            missing.join(", ")
        )))
    }
}

fn declares(source: &str, name: &str) -> bool {
    source.match_indices(name).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + name.len()..].trim_start();
        let boundary = !before.is_some_and(|c| c.is_alphanumeric() || c == '_');
        boundary && after.starts_with(':')
    })
}

/// Constant Phong coefficients.
pub const AMBIENT: [f32; 3] = [0.0, 0.0, 0.0];
pub const DIFFUSE: [f32; 3] = [0.2, 0.2, 0.2];
pub const SPECULAR: [f32; 3] = [0.2, 0.2, 0.2];
pub const SHININESS: f32 = 10.0;

/// Uniforms of the ray-casting program.
///
/// Matrices are column-major; every `vec3` shares a 16-byte slot with the
/// scalar that follows it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RayCastUniforms {
    pub projection_matrix: [[f32; 4]; 4],
    pub modelview_matrix: [[f32; 4]; 4],
    pub scene_matrix: [[f32; 4]; 4],
    pub inverse_scene_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub sample_distance: f32,
    pub light_pos: [f32; 3],
    pub shift: f32,
    pub step_size: [f32; 3],
    pub scale: f32,
    pub cell_scale: [f32; 3],
    pub shininess: f32,
    pub vol_extents_min: [f32; 3],
    /// Non-zero enables gradient shading.
    pub enable_shading: u32,
    pub vol_extents_max: [f32; 3],
    /// 0 composite, 1 maximum, 2 minimum, 3 additive.
    pub blend_mode: u32,
    pub texture_extents_min: [f32; 3],
    pub num_components: u32,
    pub texture_extents_max: [f32; 3],
    pub noise_size: f32,
    pub texture_coord_offset: [f32; 3],
    pub _pad0: f32,
    pub texture_coord_scale: [f32; 3],
    pub _pad1: f32,
    pub ambient: [f32; 3],
    pub _pad2: f32,
    pub diffuse: [f32; 3],
    pub _pad3: f32,
    pub specular: [f32; 3],
    pub _pad4: f32,
}

impl Default for RayCastUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            projection_matrix: identity,
            modelview_matrix: identity,
            scene_matrix: identity,
            inverse_scene_matrix: identity,
            camera_pos: [0.0; 3],
            sample_distance: 1.0,
            light_pos: [0.0; 3],
            shift: 0.0,
            step_size: [1.0; 3],
            scale: 1.0,
            cell_scale: [0.5; 3],
            shininess: SHININESS,
            vol_extents_min: [0.0; 3],
            enable_shading: 0,
            vol_extents_max: [1.0; 3],
            blend_mode: 0,
            texture_extents_min: [0.0; 3],
            num_components: 1,
            texture_extents_max: [0.0; 3],
            noise_size: 1.0,
            texture_coord_offset: [0.0; 3],
            _pad0: 0.0,
            texture_coord_scale: [1.0; 3],
            _pad1: 0.0,
            ambient: AMBIENT,
            _pad2: 0.0,
            diffuse: DIFFUSE,
            _pad3: 0.0,
            specular: SPECULAR,
            _pad4: 0.0,
        }
    }
}

/// Converts a row-major matrix (as handed out by cameras and volumes) into
/// the column-major single-precision layout the shader reads.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn shader_matrix(row_major: &[[f64; 4]; 4]) -> [[f32; 4]; 4] {
    let columns = DMat4::from_cols_array_2d(row_major).transpose();
    columns.as_mat4().to_cols_array_2d()
}

/// Same as [`shader_matrix`] for matrices already in column form.
#[must_use]
pub fn shader_matrix_cols(matrix: DMat4) -> [[f32; 4]; 4] {
    matrix.as_mat4().to_cols_array_2d()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_size_alignment() {
        let size = std::mem::size_of::<RayCastUniforms>();
        assert_eq!(size % 16, 0, "RayCastUniforms must be 16-byte aligned");
        assert_eq!(size, 464);
    }

    #[test]
    fn test_program_declares_every_param() {
        check_program_source(RAYCAST_SHADER).unwrap();
    }

    #[test]
    fn test_missing_param_is_reported() {
        let source = RAYCAST_SHADER.replace("noise_size:", "noise_len:");
        let err = check_program_source(&source).unwrap_err();
        assert!(err.to_string().contains("noise_size"));
    }

    #[test]
    fn test_row_major_is_transposed() {
        let row_major = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 6.0],
            [0.0, 0.0, 1.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let cols = shader_matrix(&row_major);
        assert_eq!(cols[3], [5.0, 6.0, 7.0, 1.0]);
    }

    #[test]
    fn test_texture_bindings_interleave_samplers() {
        let bindings: Vec<u32> = TextureUnit::ALL.iter().map(|u| u.binding()).collect();
        assert_eq!(bindings, vec![1, 3, 5, 7]);
    }
}
