//! Error type of the volray facade.

use thiserror::Error;

/// Any failure surfaced by the facade functions.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] volray_core::VolrayError),

    #[error(transparent)]
    Render(#[from] volray_render::RenderError),

    #[error("failed to save image: {0}")]
    Screenshot(#[from] volray_render::ScreenshotError),

    #[error("nothing to render: {0}")]
    NothingToRender(&'static str),
}

/// A specialized Result type for the facade.
pub type Result<T> = std::result::Result<T, Error>;
