//! Per-stage frame timing with budgeted hitch logging

use std::fmt;
use std::time::{Duration, Instant};

use crate::config::HitchConfig;

/// Timed sections of a running tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    /// Physics step, player controller, shots and throws
    Player,
    /// Global uniform upload
    Uniforms,
    /// Compute target assignment and dispatch
    Compute,
    /// Particle simulation
    Particles,
    /// Weather simulation
    Weather,
    /// Pickup bobbing and collection
    Pickups,
    /// Hostile AI and combat
    Enemies,
    /// Tracer fading
    Trails,
    /// Explosive flight and detonation
    Explosives,
    /// Frame submission
    Render,
}

impl FrameStage {
    /// Number of stages
    pub const COUNT: usize = 10;

    /// Every stage in tick order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Player,
        Self::Uniforms,
        Self::Compute,
        Self::Particles,
        Self::Weather,
        Self::Pickups,
        Self::Enemies,
        Self::Trails,
        Self::Explosives,
        Self::Render,
    ];

    /// Short name used in the hitch line
    pub fn label(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Uniforms => "uniforms",
            Self::Compute => "compute",
            Self::Particles => "particles",
            Self::Weather => "weather",
            Self::Pickups => "pickups",
            Self::Enemies => "enemies",
            Self::Trails => "trails",
            Self::Explosives => "explosives",
            Self::Render => "render",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Live entity counts attached to a hitch line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Live hostiles
    pub hostiles: usize,
    /// Live pickups
    pub pickups: usize,
    /// Active tracers
    pub trails: usize,
    /// Active explosives
    pub explosives: usize,
}

/// One frame that ran over the threshold
#[derive(Debug, Clone, PartialEq)]
pub struct HitchReport {
    /// Whole-frame duration
    pub total: Duration,
    /// Per-stage durations indexed in [`FrameStage::ALL`] order
    pub stages: [Duration; FrameStage::COUNT],
    /// Which stages were timed this frame, in the same order
    pub recorded: [bool; FrameStage::COUNT],
    /// Entity counts at the end of the frame
    pub counts: EntityCounts,
}

impl HitchReport {
    /// Duration of one stage
    pub fn stage(&self, stage: FrameStage) -> Duration {
        self.stages[stage.index()]
    }

    /// Whether the stage was timed at all, even if it took no measurable time
    pub fn was_recorded(&self, stage: FrameStage) -> bool {
        self.recorded[stage.index()]
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl fmt::Display for HitchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hitch {:.1}ms |", millis(self.total))?;
        for stage in FrameStage::ALL {
            write!(f, " {} {:.2}", stage.label(), millis(self.stage(stage)))?;
        }
        write!(
            f,
            " | hostiles {} pickups {} trails {} explosives {}",
            self.counts.hostiles, self.counts.pickups, self.counts.trails, self.counts.explosives
        )
    }
}

/// Times each stage of a running tick and reports frames over a threshold.
///
/// When disabled no clock is read at all: [`HitchProfiler::stage_start`]
/// returns `None` and every other call is a branch.
#[derive(Debug)]
pub struct HitchProfiler {
    enabled: bool,
    threshold: Duration,
    log_budget: u32,
    frame_start: Option<Instant>,
    stages: [Duration; FrameStage::COUNT],
    recorded: [bool; FrameStage::COUNT],
    hitches: u64,
}

impl HitchProfiler {
    /// Build from config, resolving the enable flag against the environment
    /// and build profile
    pub fn new(config: &HitchConfig) -> Self {
        Self::with_settings(config.resolve_enabled(), config.threshold_ms, config.log_budget)
    }

    /// Build with explicit settings
    pub fn with_settings(enabled: bool, threshold_ms: f32, log_budget: u32) -> Self {
        if enabled {
            log::debug!(
                "Hitch profiler enabled: threshold {:.1}ms, log budget {}",
                threshold_ms,
                log_budget
            );
        }
        Self {
            enabled,
            threshold: Duration::from_secs_f32(threshold_ms.max(0.0) / 1000.0),
            log_budget,
            frame_start: None,
            stages: [Duration::ZERO; FrameStage::COUNT],
            recorded: [false; FrameStage::COUNT],
            hitches: 0,
        }
    }

    /// Whether timing is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mark the start of a running tick
    pub fn begin_frame(&mut self) {
        if self.enabled {
            self.stages = [Duration::ZERO; FrameStage::COUNT];
            self.recorded = [false; FrameStage::COUNT];
            self.frame_start = Some(Instant::now());
        }
    }

    /// Start timing a stage
    pub fn stage_start(&self) -> Option<Instant> {
        self.enabled.then(Instant::now)
    }

    /// Finish timing a stage started with [`HitchProfiler::stage_start`]
    pub fn stage_end(&mut self, stage: FrameStage, start: Option<Instant>) {
        if let Some(start) = start {
            self.record_stage(stage, start.elapsed());
        }
    }

    /// Add time to a stage directly
    pub fn record_stage(&mut self, stage: FrameStage, duration: Duration) {
        self.stages[stage.index()] += duration;
        self.recorded[stage.index()] = true;
    }

    /// Close the frame started by [`HitchProfiler::begin_frame`]
    pub fn end_frame(&mut self, counts: EntityCounts) -> Option<HitchReport> {
        if !self.enabled {
            return None;
        }
        let total = self.frame_start.take()?.elapsed();
        self.evaluate(total, counts)
    }

    /// Judge a frame of length `total` against the threshold using the
    /// stage times recorded so far, then clear them. Logs one line while
    /// the budget lasts.
    pub fn evaluate(&mut self, total: Duration, counts: EntityCounts) -> Option<HitchReport> {
        let stages = std::mem::replace(&mut self.stages, [Duration::ZERO; FrameStage::COUNT]);
        let recorded = std::mem::replace(&mut self.recorded, [false; FrameStage::COUNT]);
        if total <= self.threshold {
            return None;
        }

        let report = HitchReport {
            total,
            stages,
            recorded,
            counts,
        };
        self.hitches += 1;
        if self.log_budget > 0 {
            self.log_budget -= 1;
            log::warn!("{}", report);
            if self.log_budget == 0 {
                log::info!("Hitch log budget exhausted; further hitches are counted only");
            }
        }
        Some(report)
    }

    /// Frames over threshold so far
    pub fn hitches(&self) -> u64 {
        self.hitches
    }

    /// Hitch lines still allowed
    pub fn log_budget(&self) -> u32 {
        self.log_budget
    }
}
