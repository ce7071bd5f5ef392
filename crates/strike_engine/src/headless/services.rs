//! Recording particles, sound, weather, compute and level streaming

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::collaborators::{
    AudioMode, CollaboratorError, ComputeSlot, ComputeSystem, EmitSpec, LevelStreaming, ParticleSystem, SoundCue,
    SoundService, WeatherKind, WeatherSystem,
};
use crate::foundation::math::Vec3;

/// Emissions seen by [`HeadlessParticles`]
#[derive(Debug, Default)]
pub struct ParticleProbe {
    /// Muzzle flashes
    pub muzzle_flashes: u32,
    /// Spark bursts
    pub sparks: u32,
    /// Blood sprays
    pub blood: u32,
    /// Generic emissions
    pub emitted: Vec<EmitSpec>,
    /// `update` calls
    pub updates: u64,
    /// Whether `dispose` ran
    pub disposed: bool,
}

/// [`ParticleSystem`] that counts emissions
pub struct HeadlessParticles {
    probe: Rc<RefCell<ParticleProbe>>,
}

impl HeadlessParticles {
    /// Create the system and its probe
    pub fn new() -> (Self, Rc<RefCell<ParticleProbe>>) {
        let probe = Rc::new(RefCell::new(ParticleProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl ParticleSystem for HeadlessParticles {
    fn emit_muzzle_flash(&mut self, _position: Vec3, _direction: Vec3) {
        self.probe.borrow_mut().muzzle_flashes += 1;
    }

    fn emit_sparks(&mut self, _position: Vec3, _normal: Vec3) {
        self.probe.borrow_mut().sparks += 1;
    }

    fn emit_blood(&mut self, _position: Vec3, _direction: Vec3) {
        self.probe.borrow_mut().blood += 1;
    }

    fn emit(&mut self, spec: &EmitSpec) {
        self.probe.borrow_mut().emitted.push(*spec);
    }

    fn update(&mut self, _dt: f32) {
        self.probe.borrow_mut().updates += 1;
    }

    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        self.probe.borrow_mut().disposed = true;
        Ok(())
    }
}

/// Cues and mode changes seen by [`HeadlessSound`]
#[derive(Debug, Default)]
pub struct SoundProbe {
    /// Every cue played, in order
    pub cues: Vec<SoundCue>,
    /// Every mode switch, in order
    pub modes: Vec<AudioMode>,
}

impl SoundProbe {
    /// How many times a cue was played
    pub fn count(&self, cue: SoundCue) -> usize {
        self.cues.iter().filter(|c| **c == cue).count()
    }
}

/// Silent [`SoundService`]
pub struct HeadlessSound {
    probe: Rc<RefCell<SoundProbe>>,
}

impl HeadlessSound {
    /// Create the service and its probe
    pub fn new() -> (Self, Rc<RefCell<SoundProbe>>) {
        let probe = Rc::new(RefCell::new(SoundProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl SoundService for HeadlessSound {
    fn play(&mut self, cue: SoundCue, _position: Option<Vec3>) {
        self.probe.borrow_mut().cues.push(cue);
    }

    fn set_mode(&mut self, mode: AudioMode) {
        self.probe.borrow_mut().modes.push(mode);
    }
}

/// Weather that only changes when cycled
#[derive(Debug, Clone, Copy)]
pub struct CyclingWeather {
    current: WeatherKind,
    elapsed: f32,
}

impl CyclingWeather {
    /// Start with a clear sky
    pub fn new() -> Self {
        Self {
            current: WeatherKind::Clear,
            elapsed: 0.0,
        }
    }
}

impl Default for CyclingWeather {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherSystem for CyclingWeather {
    fn update(&mut self, dt: f32, _viewer: Vec3) {
        self.elapsed += dt;
    }

    fn current(&self) -> WeatherKind {
        self.current
    }

    fn intensity(&self) -> f32 {
        match self.current {
            WeatherKind::Clear => 0.0,
            WeatherKind::Fog => 0.5,
            WeatherKind::Rain => 0.7,
            WeatherKind::Storm => 1.0,
        }
    }

    fn cycle(&mut self) -> WeatherKind {
        self.current = match self.current {
            WeatherKind::Clear => WeatherKind::Rain,
            WeatherKind::Rain => WeatherKind::Fog,
            WeatherKind::Fog => WeatherKind::Storm,
            WeatherKind::Storm => WeatherKind::Clear,
        };
        self.current
    }
}

/// Slot bookkeeping of [`HeadlessCompute`]
#[derive(Debug, Default)]
pub struct ComputeProbe {
    next_slot: u32,
    target_fresh: bool,
    /// Slots currently simulated
    pub active: BTreeSet<u32>,
    /// Last target set
    pub target: Option<Vec3>,
    /// `update` calls
    pub updates: u64,
    /// `update` calls not preceded by a `set_target` in the same tick
    pub stale_updates: u64,
    /// Whether `dispose` ran
    pub disposed: bool,
}

/// [`ComputeSystem`] that tracks slot lifetimes
pub struct HeadlessCompute {
    capacity: u32,
    probe: Rc<RefCell<ComputeProbe>>,
}

impl HeadlessCompute {
    /// Create a compute system with `capacity` slots
    pub fn new(capacity: u32) -> (Self, Rc<RefCell<ComputeProbe>>) {
        let probe = Rc::new(RefCell::new(ComputeProbe::default()));
        (
            Self {
                capacity,
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl ComputeSystem for HeadlessCompute {
    fn allocate_slot(&mut self, _position: Vec3) -> Option<ComputeSlot> {
        let mut probe = self.probe.borrow_mut();
        if probe.active.len() as u32 >= self.capacity {
            return None;
        }
        let slot = probe.next_slot;
        probe.next_slot += 1;
        probe.active.insert(slot);
        Some(ComputeSlot(slot))
    }

    fn deactivate_slot(&mut self, slot: ComputeSlot) {
        self.probe.borrow_mut().active.remove(&slot.0);
    }

    fn set_target(&mut self, target: Vec3) {
        let mut probe = self.probe.borrow_mut();
        probe.target = Some(target);
        probe.target_fresh = true;
    }

    fn update(&mut self, _dt: f32) {
        let mut probe = self.probe.borrow_mut();
        probe.updates += 1;
        if !probe.target_fresh {
            probe.stale_updates += 1;
        }
        probe.target_fresh = false;
    }

    fn active_slots(&self) -> usize {
        self.probe.borrow().active.len()
    }

    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        let mut probe = self.probe.borrow_mut();
        probe.disposed = true;
        probe.active.clear();
        Ok(())
    }
}

/// LOD requests seen by [`HeadlessLevel`]
#[derive(Debug, Default)]
pub struct LevelProbe {
    /// `update_lod` calls
    pub lod_updates: u64,
    /// Last viewer position
    pub last_viewer: Option<Vec3>,
}

/// [`LevelStreaming`] without chunks
pub struct HeadlessLevel {
    probe: Rc<RefCell<LevelProbe>>,
}

impl HeadlessLevel {
    /// Create the level and its probe
    pub fn new() -> (Self, Rc<RefCell<LevelProbe>>) {
        let probe = Rc::new(RefCell::new(LevelProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl LevelStreaming for HeadlessLevel {
    fn update_lod(&mut self, viewer: Vec3) {
        let mut probe = self.probe.borrow_mut();
        probe.lod_updates += 1;
        probe.last_viewer = Some(viewer);
    }
}
