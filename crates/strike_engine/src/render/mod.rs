//! Rendering boundary
//!
//! The orchestrator never talks to a graphics API directly. Everything it
//! needs from the GPU side goes through [`RenderBackend`]: creating and
//! freeing per-entity visuals, requesting pipeline compilation, uploading the
//! per-frame uniform block and submitting a frame. The scene graph itself
//! ([`Scene`]) is plain data owned by the loop and handed to the backend by
//! reference.

pub mod camera;
pub mod light;
pub mod scene;
pub mod surface;

pub use camera::Camera;
pub use light::ShadowLight;
pub use scene::{NodeKey, Scene, SceneContext, SceneNode};
pub use surface::{RenderSurface, SurfaceError};

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Kinds of pickup the level can spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickupKind {
    /// Restores health
    Health,
    /// Refills ammunition
    Ammo,
    /// Adds a throwable explosive
    Grenade,
}

impl PickupKind {
    /// Every pickup kind, in a stable order
    pub const ALL: [Self; 3] = [Self::Health, Self::Ammo, Self::Grenade];
}

/// Every distinct visual the renderer has to build a pipeline for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// Enemy model
    Hostile,
    /// Pickup model
    Pickup(PickupKind),
    /// Thrown explosive
    Explosive,
    /// Bullet tracer segment
    Tracer,
    /// Bullet impact decal/flash
    Impact,
}

impl VisualKind {
    /// Every visual kind, used to instantiate warmup throwaways
    pub const ALL: [Self; 7] = [
        Self::Hostile,
        Self::Pickup(PickupKind::Health),
        Self::Pickup(PickupKind::Ammo),
        Self::Pickup(PickupKind::Grenade),
        Self::Explosive,
        Self::Tracer,
        Self::Impact,
    ];
}

/// GPU-side resources backing one scene node: a geometry and a material
/// allocated together and released together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuVisual {
    /// Backend-unique id of this allocation
    pub id: u64,
    /// Geometry buffer handle
    pub geometry: u32,
    /// Material/pipeline handle
    pub material: u32,
}

/// Per-frame uniform block shared by every shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    /// Player position (xyz) and elapsed time (w)
    pub player_position_time: [f32; 4],
    /// Camera forward (xyz) and vertical field of view in radians (w)
    pub camera_forward_fov: [f32; 4],
    /// Damage flash, clamped delta, weather intensity, combat flag
    pub flash_delta_weather_combat: [f32; 4],
}

/// How a frame should be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Run the post-processing chain
    pub post_processing: bool,
    /// Re-render the shadow map this frame
    pub shadow_dirty: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            post_processing: true,
            shadow_dirty: false,
        }
    }
}

/// Rendering errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The backend lacks a feature (e.g. async pipeline compilation)
    #[error("Unsupported by backend: {0}")]
    Unsupported(String),

    /// Pipeline compilation failed
    #[error("Pipeline compilation failed: {0}")]
    CompileFailed(String),

    /// A visual id the backend does not know
    #[error("Unknown visual {0}")]
    UnknownVisual(u64),

    /// Device lost or surface gone
    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result alias for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// GPU-facing side of the engine
pub trait RenderBackend {
    /// Acquire the device/context for the given surface size
    fn initialize(&mut self, _surface_size: (u32, u32)) -> RenderResult<()> {
        Ok(())
    }

    /// Build the post-processing chain
    fn configure_post_processing(&mut self) -> RenderResult<()> {
        Ok(())
    }

    /// Free the post-processing chain
    fn release_post_processing(&mut self) -> RenderResult<()> {
        Ok(())
    }

    /// Allocate geometry and material for one visual
    fn create_visual(&mut self, kind: VisualKind) -> RenderResult<GpuVisual>;

    /// Free a visual's GPU resources
    fn release_visual(&mut self, visual: GpuVisual) -> RenderResult<()>;

    /// Whether [`RenderBackend::compile_pipelines`] can run without a draw
    fn supports_async_compile(&self) -> bool {
        true
    }

    /// Request compilation of every pipeline the scene needs from the
    /// current camera. Completion is not awaited by the caller.
    fn compile_pipelines(&mut self, scene: &Scene) -> RenderResult<()>;

    /// Upload the per-frame uniform block
    fn write_global_uniforms(&mut self, bytes: &[u8]);

    /// Encode and submit one frame
    fn render(&mut self, scene: &Scene, options: RenderOptions) -> RenderResult<()>;

    /// Tear down device-level resources
    fn dispose(&mut self) -> RenderResult<()> {
        Ok(())
    }
}
