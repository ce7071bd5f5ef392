//! Frame orchestrator
//!
//! [`SimulationLoop`] is the single owner of the scene graph, the effect
//! pools, the shadow light and the entity lists. The host calls
//! [`SimulationLoop::tick`] once per presented frame with the measured
//! delta; everything else happens inside it.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► start ──► Initializing ──► Warmup ──► Running ⇄ GameOverPaused
//!                        (one stage       (one step              │
//!                         per tick)        per tick)             ▼
//!                                                   dispose ──► Disposed
//! ```
//!
//! While initializing or warming up each tick performs one unit of work and
//! returns, so the host can keep a loading screen responsive. Running ticks
//! run every stage to completion in a fixed order (see [`SimulationLoop::tick`]).

mod frame;
mod gameplay;
mod lifecycle;
mod spawn;
mod startup;

#[cfg(test)]
mod tests;

pub use frame::{FrameContext, Hostile, Pickup, HOSTILE_CENTER_HEIGHT};
pub use spawn::{Population, SpawnRequest, SpawnScheduler};
pub use startup::{LoadedCallback, ProgressCallback, StartupStage, Subsystems};

use thiserror::Error;

use crate::collaborators::{AudioMode, CollaboratorError, Collaborators, WeatherKind};
use crate::config::{ConfigError, EngineConfig, RuntimeSettings};
use crate::effects::{ExplosiveEffect, TrailEffect};
use crate::foundation::math::Vec3;
use crate::pool::{PoolError, PoolStats, ResourcePool};
use crate::profiling::{HitchProfiler, HitchReport};
use crate::render::{Camera, RenderError, RenderSurface, Scene, SceneContext, ShadowLight};
use crate::shadow::ShadowUpdateScheduler;
use crate::warmup::WarmupSequencer;
use startup::{LoadedSignal, ProgressReporter};

/// Errors surfaced to the host
#[derive(Error, Debug)]
pub enum EngineError {
    /// Rendering failed outside warmup
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// A collaborator failed to initialize
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pool misuse
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// `start` called more than once
    #[error("Simulation loop already started")]
    AlreadyStarted,

    /// Operation not valid after dispose
    #[error("Simulation loop has been disposed")]
    Disposed,
}

/// Lifecycle state of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Running startup stages (or waiting for `start`)
    Initializing,
    /// Running the warmup sequencer
    Warmup,
    /// Gameplay
    Running,
    /// Player is dead; frames render but nothing updates
    GameOverPaused,
    /// Terminal
    Disposed,
}

/// Diagnostic snapshot of the loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStats {
    /// Lifecycle state
    pub state: LoopState,
    /// Running and paused frames presented
    pub frames: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Live hostiles
    pub hostiles: usize,
    /// Live pickups
    pub pickups: usize,
    /// Active tracers
    pub active_trails: usize,
    /// Idle tracers
    pub pooled_trails: usize,
    /// Active explosives
    pub active_explosives: usize,
    /// Idle explosives
    pub pooled_explosives: usize,
    /// Tracer pool counters
    pub trail_pool: PoolStats,
    /// Explosive pool counters
    pub explosive_pool: PoolStats,
    /// Shadow refreshes so far
    pub shadow_refreshes: u64,
    /// Current damage flash
    pub damage_flash: f32,
    /// Current background audio mode
    pub audio_mode: Option<AudioMode>,
    /// Current weather
    pub weather: WeatherKind,
    /// Frames over the hitch threshold
    pub hitches: u64,
    /// Collaborators initialized
    pub initialized: Subsystems,
}

/// The per-frame driver
pub struct SimulationLoop {
    config: EngineConfig,
    settings: RuntimeSettings,
    state: LoopState,
    startup: Option<StartupStage>,
    started: bool,
    initialized: Subsystems,

    surface: Box<dyn RenderSurface>,
    collab: Collaborators,

    scene: Scene,
    explosives: ResourcePool<ExplosiveEffect>,
    trails: ResourcePool<TrailEffect>,
    hostiles: Vec<Hostile>,
    pickups: Vec<Pickup>,
    next_hostile_id: u64,

    spawns: SpawnScheduler,
    shadow: ShadowUpdateScheduler,
    profiler: HitchProfiler,
    last_hitch: Option<HitchReport>,
    warmup: Option<WarmupSequencer>,
    progress: ProgressReporter,
    loaded: LoadedSignal,

    player_position: Vec3,
    damage_flash: f32,
    flash_set_this_tick: bool,
    audio_mode: Option<AudioMode>,
    in_combat: bool,
    elapsed: f32,
    frames: u64,
}

impl SimulationLoop {
    /// Build the loop around its collaborators. No collaborator is touched
    /// until [`SimulationLoop::start`] and the ticks that follow.
    pub fn create(
        surface: Box<dyn RenderSurface>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let spawn_point = Vec3::from(config.frame.spawn_point);
        let camera = Camera::perspective(
            spawn_point + Vec3::y() * config.frame.eye_height,
            config.frame.fov_degrees,
            16.0 / 9.0,
            config.frame.near,
            config.frame.far,
        );
        let light = ShadowLight::new(spawn_point, Vec3::from(config.shadow.light_offset));

        log::info!(
            "Simulation loop created (explosive pool {}, trail pool {})",
            config.pools.explosive_capacity,
            config.pools.trail_capacity
        );

        Ok(Self {
            settings: config.settings.clone(),
            state: LoopState::Initializing,
            startup: None,
            started: false,
            initialized: Subsystems::empty(),
            surface,
            collab: collaborators,
            scene: Scene::new(camera, light),
            explosives: ResourcePool::new("explosives", config.pools.explosive_capacity),
            trails: ResourcePool::new("trails", config.pools.trail_capacity),
            hostiles: Vec::new(),
            pickups: Vec::new(),
            next_hostile_id: 0,
            spawns: SpawnScheduler::new(&config.spawn),
            shadow: ShadowUpdateScheduler::new(&config.shadow),
            profiler: HitchProfiler::new(&config.hitch),
            last_hitch: None,
            warmup: None,
            progress: ProgressReporter::detached(),
            loaded: LoadedSignal::new(config.frame.loaded_after_frames),
            player_position: spawn_point,
            damage_flash: 0.0,
            flash_set_this_tick: false,
            audio_mode: None,
            in_combat: false,
            elapsed: 0.0,
            frames: 0,
            config,
        })
    }

    /// Begin staged startup. `on_progress` receives `(percent, stage_key)`
    /// with a non-decreasing percentage; `on_loaded` fires once, after the
    /// configured number of real frames has been presented post-warmup.
    pub fn start(
        &mut self,
        on_progress: ProgressCallback,
        on_loaded: LoadedCallback,
        settings: RuntimeSettings,
    ) -> Result<(), EngineError> {
        if self.state == LoopState::Disposed {
            return Err(EngineError::Disposed);
        }
        if self.started {
            return Err(EngineError::AlreadyStarted);
        }
        self.started = true;
        self.settings = settings;
        self.progress.attach(on_progress);
        self.loaded.attach(on_loaded);
        self.startup = Some(StartupStage::Init);
        log::info!("Simulation loop starting");
        Ok(())
    }

    /// Advance one presented frame.
    ///
    /// While initializing or warming up this performs exactly one stage or
    /// warmup step. While running it clamps the delta and then, in order:
    /// player (physics, input, shots, throws), shadow scheduling, global
    /// uniforms, compute (target then update), particles, weather, level LOD,
    /// pickups, hostiles, tracers, explosives, damage-flash decay, spawn
    /// timers, render, hitch profiling and the loaded countdown. Once the
    /// player is dead only rendering continues.
    ///
    /// Errors during a running tick are not recovered here.
    pub fn tick(&mut self, raw_delta_seconds: f32) -> Result<(), EngineError> {
        match self.state {
            LoopState::Disposed => Ok(()),
            LoopState::Initializing => self.advance_startup(),
            LoopState::Warmup => self.advance_warmup(),
            LoopState::Running | LoopState::GameOverPaused => self.run_frame(raw_delta_seconds),
        }
    }

    /// Hot-swap runtime settings
    pub fn set_runtime_settings(&mut self, settings: RuntimeSettings) {
        log::debug!("Runtime settings updated");
        self.settings = settings;
        self.collab.player.apply_settings(&self.settings);
        if matches!(self.state, LoopState::Running | LoopState::GameOverPaused) {
            self.apply_camera_settings();
        }
    }

    /// Capture the pointer for mouse look. Failure is logged, not returned.
    pub fn lock_pointer(&mut self) {
        if let Err(e) = self.surface.lock_pointer() {
            log::warn!("Pointer lock failed: {}", e);
        }
    }

    /// Release the pointer. Failure is logged, not returned.
    pub fn unlock_pointer(&mut self) {
        if let Err(e) = self.surface.unlock_pointer() {
            log::warn!("Pointer unlock failed: {}", e);
        }
    }

    /// Advance the weather to its next kind
    pub fn cycle_weather(&mut self) -> WeatherKind {
        let weather = self.collab.weather.cycle();
        log::info!("Weather changed to {:?}", weather);
        weather
    }

    /// Start a fresh game without tearing down GPU resources
    pub fn reset(&mut self) {
        if !matches!(self.state, LoopState::Running | LoopState::GameOverPaused) {
            log::warn!("Reset ignored in state {:?}", self.state);
            return;
        }

        self.collab.game_state.reset();
        self.clear_entities();
        {
            let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
            self.trails.release_all(&mut ctx);
            self.explosives.release_all(&mut ctx);
        }
        self.spawns.reset();
        self.damage_flash = 0.0;
        self.flash_set_this_tick = false;
        self.spawn_player();
        self.shadow.invalidate();
        self.state = LoopState::Running;
        log::info!("Game reset");
    }

    /// Release every owned resource. Valid in any state; later calls do
    /// nothing.
    pub fn dispose(&mut self) {
        if self.state == LoopState::Disposed {
            return;
        }
        log::info!("Disposing simulation loop from state {:?}", self.state);

        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        if let Some(mut warmup) = self.warmup.take() {
            warmup.abort(&mut ctx);
        }
        let effects = self.trails.dispose_all(&mut ctx) + self.explosives.dispose_all(&mut ctx);
        log::debug!("Disposed {} pooled effects", effects);

        self.clear_entities();

        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        let strays: Vec<_> = ctx.scene.iter().map(|(key, _)| key).collect();
        if !strays.is_empty() {
            log::warn!("{} scene nodes outlived their owners; releasing", strays.len());
        }
        for key in strays {
            ctx.despawn(key);
        }

        if self.initialized.contains(Subsystems::COMPUTE) {
            if let Err(e) = self.collab.compute.dispose() {
                log::warn!("Compute disposal failed: {}", e);
            }
        }
        if self.initialized.contains(Subsystems::PARTICLES) {
            if let Err(e) = self.collab.particles.dispose() {
                log::warn!("Particle disposal failed: {}", e);
            }
        }
        if self.initialized.contains(Subsystems::PATHFINDING) {
            if let Err(e) = self.collab.pathfinder.dispose() {
                log::warn!("Pathfinder disposal failed: {}", e);
            }
        }
        if self.initialized.contains(Subsystems::PHYSICS) {
            if let Err(e) = self.collab.physics.dispose() {
                log::warn!("Physics disposal failed: {}", e);
            }
        }
        if self.initialized.contains(Subsystems::POST_FX) {
            if let Err(e) = self.collab.renderer.release_post_processing() {
                log::warn!("Post-processing release failed: {}", e);
            }
        }
        if self.initialized.contains(Subsystems::RENDERER) {
            if let Err(e) = self.collab.renderer.dispose() {
                log::warn!("Renderer disposal failed: {}", e);
            }
        }
        self.initialized = Subsystems::empty();

        self.unlock_pointer();
        self.startup = None;
        self.state = LoopState::Disposed;
        log::info!("Simulation loop disposed");
    }

    /// Lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Scene graph (read-only)
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Live hostiles
    pub fn hostiles(&self) -> &[Hostile] {
        &self.hostiles
    }

    /// Live pickups
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Tracer pool
    pub fn trails(&self) -> &ResourcePool<TrailEffect> {
        &self.trails
    }

    /// Explosive pool
    pub fn explosives(&self) -> &ResourcePool<ExplosiveEffect> {
        &self.explosives
    }

    /// Current damage flash intensity
    pub fn damage_flash(&self) -> f32 {
        self.damage_flash
    }

    /// Player feet position as of the last tick
    pub fn player_position(&self) -> Vec3 {
        self.player_position
    }

    /// Active settings
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Most recent frame that ran over the hitch threshold
    pub fn last_hitch(&self) -> Option<&HitchReport> {
        self.last_hitch.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnostic snapshot
    pub fn stats(&self) -> LoopStats {
        LoopStats {
            state: self.state,
            frames: self.frames,
            elapsed: self.elapsed,
            hostiles: self.hostiles.len(),
            pickups: self.pickups.len(),
            active_trails: self.trails.active_len(),
            pooled_trails: self.trails.pooled_len(),
            active_explosives: self.explosives.active_len(),
            pooled_explosives: self.explosives.pooled_len(),
            trail_pool: self.trails.stats(),
            explosive_pool: self.explosives.stats(),
            shadow_refreshes: self.shadow.refreshes(),
            damage_flash: self.damage_flash,
            audio_mode: self.audio_mode,
            weather: self.collab.weather.current(),
            hitches: self.profiler.hitches(),
            initialized: self.initialized,
        }
    }

    /// Remove every hostile and pickup, freeing nodes and compute slots
    fn clear_entities(&mut self) {
        for hostile in std::mem::take(&mut self.hostiles) {
            self.retire_hostile(hostile, false);
        }
        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        for pickup in self.pickups.drain(..) {
            ctx.despawn(pickup.node);
        }
        self.audio_mode = None;
        self.in_combat = false;
    }

    /// Apply camera-affecting runtime settings
    fn apply_camera_settings(&mut self) {
        self.scene.camera.fov_degrees = self.settings.fov_degrees.unwrap_or(self.config.frame.fov_degrees);
    }
}

impl Drop for SimulationLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}
