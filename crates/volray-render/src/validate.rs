//! Render preconditions.
//!
//! Checks run in a fixed order and stop at the first failure. Apart from
//! bringing the upstream source up to date they have no side effects.

use thiserror::Error;
use volray_core::{
    select_scalars, BlendMode, FieldSource, MapperOptions, ScalarOrigin, ScalarType, Volume,
};

use crate::format;

/// Why a frame was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no renderer")]
    MissingRenderer,

    #[error("no volume")]
    MissingVolume,

    #[error("no input")]
    MissingInput,

    #[error("updating the input failed: {0}")]
    UpstreamUpdateFailed(String),

    #[error("no scalars found on the input")]
    NoScalars,

    #[error("scalars from field data are not supported")]
    FieldScalarsUnsupported,

    #[error("scalar type {0} is not supported")]
    UnsupportedScalarType(ScalarType),

    #[error("blend mode {0} is not supported")]
    UnsupportedBlendMode(BlendMode),

    #[error("{components} components (independent: {independent}) are not supported; use 1 component or 4 dependent components")]
    UnsupportedComponentLayout { components: usize, independent: bool },

    #[error("4-component scalars must be unsigned char, got {0}")]
    NonByteRgba(ScalarType),

    #[error("additive blending needs 1 component, got {0}")]
    AdditiveRequiresSingleComponent(usize),
}

/// What validation learned about the selected scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSummary {
    pub scalar_type: ScalarType,
    pub components: usize,
    pub origin: ScalarOrigin,
}

/// Blend modes the ray caster implements.
#[must_use]
pub fn is_supported_blend_mode(mode: BlendMode) -> bool {
    matches!(
        mode,
        BlendMode::Composite
            | BlendMode::MaximumIntensity
            | BlendMode::MinimumIntensity
            | BlendMode::Additive
    )
}

/// Checks that a frame can be rendered.
pub fn validate<R, S>(
    renderer: Option<&R>,
    volume: Option<&Volume>,
    input: Option<&mut S>,
    options: &MapperOptions,
) -> Result<ScalarSummary, ValidationError>
where
    R: ?Sized,
    S: FieldSource + ?Sized,
{
    if renderer.is_none() {
        return Err(ValidationError::MissingRenderer);
    }
    let volume = volume.ok_or(ValidationError::MissingVolume)?;
    let input = input.ok_or(ValidationError::MissingInput)?;
    input
        .update()
        .map_err(|e| ValidationError::UpstreamUpdateFailed(e.to_string()))?;

    let (scalars, origin) =
        select_scalars(input.output(), options.scalar_mode, &options.array_access)
            .ok_or(ValidationError::NoScalars)?;
    if origin == ScalarOrigin::Field {
        return Err(ValidationError::FieldScalarsUnsupported);
    }

    let scalar_type = scalars.scalar_type();
    if !format::is_supported(scalar_type) {
        return Err(ValidationError::UnsupportedScalarType(scalar_type));
    }

    if !is_supported_blend_mode(options.blend_mode) {
        return Err(ValidationError::UnsupportedBlendMode(options.blend_mode));
    }

    let components = scalars.components();
    let independent = volume.property().independent_components();
    if !(components == 1 || (components == 4 && !independent)) {
        return Err(ValidationError::UnsupportedComponentLayout {
            components,
            independent,
        });
    }

    if components == 4 && scalar_type != ScalarType::UnsignedChar {
        return Err(ValidationError::NonByteRgba(scalar_type));
    }

    if options.blend_mode == BlendMode::Additive && components != 1 {
        return Err(ValidationError::AdditiveRequiresSingleComponent(components));
    }

    Ok(ScalarSummary {
        scalar_type,
        components,
        origin,
    })
}
