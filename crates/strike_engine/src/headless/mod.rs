//! Headless collaborators
//!
//! In-process fakes for every collaborator trait. Each fake shares an
//! `Rc<RefCell<_>>` probe with the caller so tests (and the headless demo
//! binary) can script behaviour and inspect what the loop asked for without
//! a GPU, a window or an audio device.

mod gameplay;
mod render;
mod services;
mod world;

pub use gameplay::{
    AiProbe, GameProbe, HeadlessGameState, PlayerProbe, ScriptedHostileAi, ScriptedPlayer, STARTING_HEALTH,
};
pub use render::{HeadlessRenderer, HeadlessSurface, RenderProbe, RenderRecord, SurfaceProbe};
pub use services::{
    ComputeProbe, CyclingWeather, HeadlessCompute, HeadlessLevel, HeadlessParticles, HeadlessSound, LevelProbe,
    ParticleProbe, SoundProbe,
};
pub use world::{FlatTerrain, HeadlessPhysics, OpenPathfinder, PhysicsProbe};

use std::cell::RefCell;
use std::rc::Rc;

use crate::collaborators::Collaborators;

/// Compute slots available in a headless rig
pub const HEADLESS_COMPUTE_SLOTS: u32 = 64;

/// Half-width of the walkable headless arena
pub const HEADLESS_ARENA_HALF_EXTENT: f32 = 200.0;

/// Probes for every collaborator in a headless rig
pub struct HeadlessProbes {
    /// Renderer
    pub render: Rc<RefCell<RenderProbe>>,
    /// Surface
    pub surface: Rc<RefCell<SurfaceProbe>>,
    /// Physics
    pub physics: Rc<RefCell<PhysicsProbe>>,
    /// Game state
    pub game: Rc<RefCell<GameProbe>>,
    /// Particles
    pub particles: Rc<RefCell<ParticleProbe>>,
    /// Sound
    pub sound: Rc<RefCell<SoundProbe>>,
    /// Compute
    pub compute: Rc<RefCell<ComputeProbe>>,
    /// Level streaming
    pub level: Rc<RefCell<LevelProbe>>,
    /// Player
    pub player: Rc<RefCell<PlayerProbe>>,
    /// Hostile AI
    pub ai: Rc<RefCell<AiProbe>>,
}

/// A full set of headless collaborators on flat ground
pub struct HeadlessRig {
    /// Collaborators to hand to the loop
    pub collaborators: Collaborators,
    /// Surface to hand to the loop
    pub surface: HeadlessSurface,
    /// Probes observing them
    pub probes: HeadlessProbes,
}

impl HeadlessRig {
    /// Build a rig whose ground sits at `ground_height`
    pub fn new(ground_height: f32) -> Self {
        let (renderer, render) = HeadlessRenderer::new();
        let (surface, surface_probe) = HeadlessSurface::new(1280, 720);
        let (physics, physics_probe) = HeadlessPhysics::new(ground_height);
        let (game_state, game) = HeadlessGameState::new();
        let (particles, particle_probe) = HeadlessParticles::new();
        let (sound, sound_probe) = HeadlessSound::new();
        let (compute, compute_probe) = HeadlessCompute::new(HEADLESS_COMPUTE_SLOTS);
        let (level, level_probe) = HeadlessLevel::new();
        let (player, player_probe) = ScriptedPlayer::new();
        let (hostile_ai, ai) = ScriptedHostileAi::new();

        Self {
            collaborators: Collaborators {
                renderer: Box::new(renderer),
                terrain: Box::new(FlatTerrain::new(ground_height)),
                physics: Box::new(physics),
                pathfinder: Box::new(OpenPathfinder::new(HEADLESS_ARENA_HALF_EXTENT)),
                game_state: Box::new(game_state),
                particles: Box::new(particles),
                sound: Box::new(sound),
                weather: Box::new(CyclingWeather::new()),
                compute: Box::new(compute),
                level: Box::new(level),
                player: Box::new(player),
                hostile_ai: Box::new(hostile_ai),
            },
            surface,
            probes: HeadlessProbes {
                render,
                surface: surface_probe,
                physics: physics_probe,
                game,
                particles: particle_probe,
                sound: sound_probe,
                compute: compute_probe,
                level: level_probe,
                player: player_probe,
                ai,
            },
        }
    }
}
