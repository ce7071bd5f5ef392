//! External collaborators
//!
//! Everything the orchestrator drives but does not implement: physics,
//! pathfinding, terrain, game state, particles, audio, weather, GPU compute,
//! level streaming, player input and hostile AI. Each is a narrow trait; the
//! loop receives boxed implementations at construction instead of reaching
//! for process-wide singletons, so every collaborator can be swapped for a
//! fake under test.
//!
//! Collaborators only return data. None of them is ever handed mutable
//! access to the scene graph or the effect pools.

mod gameplay;
mod services;
mod world;

pub use gameplay::{
    GameSnapshot, GameState, HostileAi, HostileId, HostileIntent, HostileView, PlayerController, PlayerShot,
    PlayerUpdate, RangedAttack, ThrowRequest,
};
pub use services::{
    AudioMode, ComputeSlot, ComputeSystem, EmitSpec, LevelStreaming, ParticleSystem, SoundCue, SoundService,
    WeatherKind, WeatherSystem,
};
pub use world::{Pathfinder, PhysicsWorld, RayHit, Terrain};

use thiserror::Error;

use crate::render::RenderBackend;

/// Failure reported by a collaborator during initialization or teardown
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{subsystem} failed: {reason}")]
pub struct CollaboratorError {
    /// Which subsystem failed
    pub subsystem: &'static str,
    /// Human-readable reason
    pub reason: String,
}

impl CollaboratorError {
    /// Create an error for `subsystem`
    pub fn new(subsystem: &'static str, reason: impl Into<String>) -> Self {
        Self {
            subsystem,
            reason: reason.into(),
        }
    }
}

/// Read-only world queries handed to the player controller and hostile AI
#[derive(Clone, Copy)]
pub struct WorldQueries<'a> {
    /// Ground height lookup
    pub terrain: &'a dyn Terrain,
    /// Raycasts and collision
    pub physics: &'a dyn PhysicsWorld,
    /// Navigation
    pub pathfinder: &'a dyn Pathfinder,
}

/// Every collaborator the loop needs, injected at construction
pub struct Collaborators {
    /// GPU side
    pub renderer: Box<dyn RenderBackend>,
    /// Ground height
    pub terrain: Box<dyn Terrain>,
    /// Physics integration
    pub physics: Box<dyn PhysicsWorld>,
    /// Navigation queries
    pub pathfinder: Box<dyn Pathfinder>,
    /// Health, score, death flag
    pub game_state: Box<dyn GameState>,
    /// GPU particles
    pub particles: Box<dyn ParticleSystem>,
    /// Fire-and-forget audio
    pub sound: Box<dyn SoundService>,
    /// Weather cycle
    pub weather: Box<dyn WeatherSystem>,
    /// GPU compute-driven entities
    pub compute: Box<dyn ComputeSystem>,
    /// Level LOD
    pub level: Box<dyn LevelStreaming>,
    /// Player input and movement
    pub player: Box<dyn PlayerController>,
    /// Hostile decision making
    pub hostile_ai: Box<dyn HostileAi>,
}
