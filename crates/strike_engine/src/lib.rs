//! # Strike Engine
//!
//! Frame orchestration for a browser-style first-person action game.
//!
//! ## Features
//!
//! - **Staged startup**: one initialization stage per tick with monotonic progress
//! - **Pipeline warmup**: compile and render sweeps before the first real frame
//! - **Pooled effects**: bounded, generational pools for tracers and explosives
//! - **Shadow scheduling**: texel-snapped, rate-limited shadow refreshes
//! - **Hitch profiling**: per-stage timings logged on slow frames
//!
//! Every external subsystem (renderer, physics, AI, audio and so on) sits
//! behind a trait in [`collaborators`]; [`headless`] provides in-process fakes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strike_engine::prelude::*;
//! use strike_engine::headless::HeadlessRig;
//!
//! fn main() -> Result<(), EngineError> {
//!     let rig = HeadlessRig::new(0.0);
//!     let mut sim = SimulationLoop::create(Box::new(rig.surface), rig.collaborators, EngineConfig::default())?;
//!     sim.start(
//!         Box::new(|percent, key| println!("{percent:>3}% {key}")),
//!         Box::new(|| println!("loaded")),
//!         RuntimeSettings::default(),
//!     )?;
//!     for _ in 0..600 {
//!         sim.tick(1.0 / 60.0)?;
//!     }
//!     sim.dispose();
//!     Ok(())
//! }
//! ```

pub mod collaborators;
pub mod config;
pub mod effects;
pub mod foundation;
pub mod headless;
pub mod pool;
pub mod profiling;
pub mod render;
pub mod shadow;
pub mod simulation;
pub mod warmup;

pub use simulation::{EngineError, LoopState, LoopStats, SimulationLoop};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        collaborators::{Collaborators, WorldQueries},
        config::{Config, EngineConfig, RuntimeSettings},
        foundation::{
            math::Vec3,
            time::{IntervalTimer, Timer},
        },
        pool::{PoolKey, Poolable, ResourcePool},
        render::{Camera, RenderBackend, RenderSurface, Scene},
        EngineError, LoopState, LoopStats, SimulationLoop,
    };
}
