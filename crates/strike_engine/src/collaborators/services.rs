//! Particles, sound, weather, compute and level streaming

use super::CollaboratorError;
use crate::foundation::math::Vec3;

/// Generic particle emission request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitSpec {
    /// Emission center
    pub position: Vec3,
    /// Number of particles
    pub count: u32,
    /// Initial speed
    pub speed: f32,
    /// Seconds each particle lives
    pub lifetime: f32,
    /// RGBA tint
    pub color: [f32; 4],
}

impl EmitSpec {
    /// Fireball burst for a detonation
    pub fn explosion(position: Vec3) -> Self {
        Self {
            position,
            count: 96,
            speed: 9.0,
            lifetime: 0.9,
            color: [1.0, 0.55, 0.15, 1.0],
        }
    }
}

/// GPU particle system
pub trait ParticleSystem {
    /// Allocate particle buffers
    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Weapon muzzle flash
    fn emit_muzzle_flash(&mut self, position: Vec3, direction: Vec3);

    /// Impact sparks
    fn emit_sparks(&mut self, position: Vec3, normal: Vec3);

    /// Blood spray
    fn emit_blood(&mut self, position: Vec3, direction: Vec3);

    /// Anything else
    fn emit(&mut self, spec: &EmitSpec);

    /// Advance the simulation
    fn update(&mut self, dt: f32);

    /// Free particle buffers
    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Audio cues the loop triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Player weapon
    PlayerFire,
    /// Hostile weapon
    HostileFire,
    /// Player took damage
    PlayerHurt,
    /// Hostile died
    HostileDeath,
    /// Explosive detonated
    Explosion,
    /// Explosive thrown
    Throw,
    /// Pickup collected
    Pickup,
    /// Player died
    GameOver,
}

/// Background audio mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMode {
    /// No hostile nearby
    Ambient,
    /// A live hostile is within the combat radius
    Combat,
}

/// Fire-and-forget audio triggers
pub trait SoundService {
    /// Play a cue, optionally positioned
    fn play(&mut self, cue: SoundCue, position: Option<Vec3>);

    /// Switch background mode
    fn set_mode(&mut self, mode: AudioMode);
}

/// Weather states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherKind {
    /// Clear sky
    Clear,
    /// Rain
    Rain,
    /// Fog
    Fog,
    /// Storm
    Storm,
}

/// Weather simulation
pub trait WeatherSystem {
    /// Advance weather around the viewer
    fn update(&mut self, dt: f32, viewer: Vec3);

    /// Current weather
    fn current(&self) -> WeatherKind;

    /// Precipitation/fog intensity in `[0, 1]`
    fn intensity(&self) -> f32;

    /// Advance to the next weather kind
    fn cycle(&mut self) -> WeatherKind;
}

/// Slot of an entity in the compute system's buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputeSlot(pub u32);

/// GPU compute-driven entities
pub trait ComputeSystem {
    /// Allocate buffers and pipelines
    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Claim a slot for an entity
    fn allocate_slot(&mut self, position: Vec3) -> Option<ComputeSlot>;

    /// Stop simulating a slot. Must happen no later than the entity's scene
    /// removal.
    fn deactivate_slot(&mut self, slot: ComputeSlot);

    /// Point every compute agent at a target. Must precede `update` in a tick.
    fn set_target(&mut self, target: Vec3);

    /// Dispatch one simulation step
    fn update(&mut self, dt: f32);

    /// Number of live slots
    fn active_slots(&self) -> usize;

    /// Free buffers
    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Level chunk LOD management
pub trait LevelStreaming {
    /// Re-evaluate chunk detail levels around the viewer
    fn update_lod(&mut self, viewer: Vec3);
}
