//! Core data model for volray.
//!
//! This crate holds everything a volume mapper reads but never owns:
//! - [`ImageData`] regular grids with typed [`DataArray`] attributes
//! - scalar selection by [`ScalarMode`] and [`ArrayAccess`]
//! - [`ColorTransferFunction`] and [`PiecewiseFunction`]
//! - [`Volume`] and [`VolumeProperty`]
//! - modification [`TimeStamp`]s used for dirty checks
//! - [`MapperOptions`] configuration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod data_array;
pub mod error;
pub mod image_data;
pub mod options;
pub mod selection;
pub mod source;
pub mod timestamp;
pub mod transfer_function;
pub mod volume;

pub use data_array::{DataArray, ScalarBuffer, ScalarType};
pub use error::{Result, VolrayError};
pub use image_data::{AttributeSet, ImageData};
pub use options::MapperOptions;
pub use selection::{select_scalars, ArrayAccess, ScalarMode, ScalarOrigin};
pub use source::{FieldSource, ImplicitSource};
pub use timestamp::TimeStamp;
pub use transfer_function::{ColorPoint, ColorTransferFunction, OpacityPoint, PiecewiseFunction};
pub use volume::{BlendMode, Interpolation, Volume, VolumeProperty};

// Re-export glam types for convenience
pub use glam::{DMat4, DVec3, Mat4, Vec3, Vec4};
