//! Presentation surface the loop renders into

use thiserror::Error;

/// Surface errors. All of them are recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The platform refused pointer capture (e.g. no user gesture yet)
    #[error("Pointer lock refused: {0}")]
    PointerLockRefused(String),

    /// The surface is gone
    #[error("Surface unavailable")]
    Unavailable,
}

/// Window/canvas the frames are presented to
pub trait RenderSurface {
    /// Drawable size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Capture the pointer for mouse look
    fn lock_pointer(&mut self) -> Result<(), SurfaceError>;

    /// Release pointer capture
    fn unlock_pointer(&mut self) -> Result<(), SurfaceError>;
}
