//! Volume and volume property: how a field is placed and shaded in a scene.

use glam::DMat4;
use serde::{Deserialize, Serialize};

use crate::timestamp::TimeStamp;
use crate::transfer_function::{ColorTransferFunction, PiecewiseFunction};

/// How samples are composited along a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Front-to-back alpha compositing.
    #[default]
    Composite,
    /// Maximum intensity projection.
    MaximumIntensity,
    /// Minimum intensity projection.
    MinimumIntensity,
    /// Sum of opacity-weighted samples.
    Additive,
    /// Mean of the samples along the ray.
    AverageIntensity,
    /// First crossing of an iso value.
    Isosurface,
}

impl BlendMode {
    /// Returns a display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Composite => "composite",
            BlendMode::MaximumIntensity => "maximum intensity",
            BlendMode::MinimumIntensity => "minimum intensity",
            BlendMode::Additive => "additive",
            BlendMode::AverageIntensity => "average intensity",
            BlendMode::Isosurface => "isosurface",
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sampling filter for the volume and lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
}

/// Appearance parameters of a volume.
#[derive(Debug, Clone)]
pub struct VolumeProperty {
    color: ColorTransferFunction,
    scalar_opacity: PiecewiseFunction,
    interpolation: Interpolation,
    shade: bool,
    independent_components: bool,
    scalar_opacity_unit_distance: f64,
    mtime: TimeStamp,
}

impl Default for VolumeProperty {
    fn default() -> Self {
        Self {
            color: ColorTransferFunction::new(),
            scalar_opacity: PiecewiseFunction::new(),
            interpolation: Interpolation::Nearest,
            shade: false,
            independent_components: true,
            scalar_opacity_unit_distance: 1.0,
            mtime: TimeStamp::now(),
        }
    }
}

impl VolumeProperty {
    #[must_use]
    pub fn color(&self) -> &ColorTransferFunction {
        &self.color
    }

    /// Returns the color function for editing. Edits are tracked by the
    /// function's own time stamp.
    pub fn color_mut(&mut self) -> &mut ColorTransferFunction {
        &mut self.color
    }

    #[must_use]
    pub fn scalar_opacity(&self) -> &PiecewiseFunction {
        &self.scalar_opacity
    }

    pub fn scalar_opacity_mut(&mut self) -> &mut PiecewiseFunction {
        &mut self.scalar_opacity
    }

    #[must_use]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
        self.mtime.modified();
    }

    /// Returns true if gradient shading is enabled.
    #[must_use]
    pub fn shade(&self) -> bool {
        self.shade
    }

    pub fn set_shade(&mut self, shade: bool) {
        self.shade = shade;
        self.mtime.modified();
    }

    /// Returns true if multi-component data maps each component through its
    /// own transfer function.
    #[must_use]
    pub fn independent_components(&self) -> bool {
        self.independent_components
    }

    pub fn set_independent_components(&mut self, independent: bool) {
        self.independent_components = independent;
        self.mtime.modified();
    }

    /// Returns the distance over which the opacity function's values apply.
    #[must_use]
    pub fn scalar_opacity_unit_distance(&self) -> f64 {
        self.scalar_opacity_unit_distance
    }

    pub fn set_scalar_opacity_unit_distance(&mut self, distance: f64) {
        self.scalar_opacity_unit_distance = distance;
        self.mtime.modified();
    }

    #[must_use]
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }
}

/// A volume placed in the scene.
#[derive(Debug, Clone)]
pub struct Volume {
    property: VolumeProperty,
    matrix: DMat4,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            property: VolumeProperty::default(),
            matrix: DMat4::IDENTITY,
        }
    }
}

impl Volume {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn property(&self) -> &VolumeProperty {
        &self.property
    }

    pub fn property_mut(&mut self) -> &mut VolumeProperty {
        &mut self.property
    }

    /// Returns the model-to-world matrix.
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: DMat4) {
        self.matrix = matrix;
    }
}
