//! Staged startup: stage list, progress reporting and the loaded countdown

use bitflags::bitflags;

/// Progress callback: `(percent, stage_key)`
pub type ProgressCallback = Box<dyn FnMut(u8, &str)>;

/// Fired once when the game is ready to be shown
pub type LoadedCallback = Box<dyn FnOnce()>;

/// Initialization stages run before warmup, one per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartupStage {
    /// Validate and log
    Init,
    /// Acquire the GPU device/context
    Context,
    /// Camera, light and scene
    Scene,
    /// Physics colliders
    Physics,
    /// Navigation grid
    Pathfinding,
    /// GPU compute buffers
    Compute,
    /// Particle buffers
    Effects,
    /// Player spawn and settings
    Player,
    /// Post-processing chain
    PostFx,
    /// Arm the spawn scheduler
    Spawn,
}

impl StartupStage {
    /// Progress key reported to the host
    pub fn key(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Context => "webgpu-context",
            Self::Scene => "scene",
            Self::Physics => "physics",
            Self::Pathfinding => "pathfinding",
            Self::Compute => "compute",
            Self::Effects => "effects",
            Self::Player => "player",
            Self::PostFx => "postfx",
            Self::Spawn => "spawn",
        }
    }

    /// Progress percentage reported when the stage starts
    pub fn percent(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Context => 5,
            Self::Scene => 10,
            Self::Physics => 18,
            Self::Pathfinding => 25,
            Self::Compute => 32,
            Self::Effects => 40,
            Self::Player => 48,
            Self::PostFx => 55,
            Self::Spawn => 60,
        }
    }

    /// Stage after this one; `None` hands over to warmup
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Context),
            Self::Context => Some(Self::Scene),
            Self::Scene => Some(Self::Physics),
            Self::Physics => Some(Self::Pathfinding),
            Self::Pathfinding => Some(Self::Compute),
            Self::Compute => Some(Self::Effects),
            Self::Effects => Some(Self::Player),
            Self::Player => Some(Self::PostFx),
            Self::PostFx => Some(Self::Spawn),
            Self::Spawn => None,
        }
    }
}

/// Key and percentage of the wrap-up reported after warmup
pub const START_LOOP: (u8, &str) = (96, "start-loop");

/// Key and percentage reported just before the first running tick
pub const FINALIZE: (u8, &str) = (98, "finalize");

/// Key and percentage reported with the loaded signal
pub const READY: (u8, &str) = (100, "ready");

bitflags! {
    /// Collaborators that completed initialization and so need disposal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Subsystems: u8 {
        /// Render device/context
        const RENDERER = 1 << 0;
        /// Physics world
        const PHYSICS = 1 << 1;
        /// Navigation grid
        const PATHFINDING = 1 << 2;
        /// Compute buffers
        const COMPUTE = 1 << 3;
        /// Particle buffers
        const PARTICLES = 1 << 4;
        /// Post-processing chain
        const POST_FX = 1 << 5;
    }
}

/// Forwards progress to the host, never letting the percentage go backwards
/// or past 100
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: u8,
}

impl ProgressReporter {
    /// Reporter with no callback attached
    pub fn detached() -> Self {
        Self {
            callback: None,
            last: 0,
        }
    }

    /// Attach the host callback
    pub fn attach(&mut self, callback: ProgressCallback) {
        self.callback = Some(callback);
    }

    /// Report a stage
    pub fn report(&mut self, percent: u8, key: &str) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        log::debug!("Startup progress {:>3}% {}", percent, key);
        if let Some(callback) = self.callback.as_mut() {
            callback(percent, key);
        }
    }

    /// Highest percentage reported so far
    pub fn last(&self) -> u8 {
        self.last
    }
}

/// Counts presented frames after warmup and fires the loaded callback once
pub struct LoadedSignal {
    callback: Option<LoadedCallback>,
    frames_required: u32,
    remaining: Option<u32>,
    fired: bool,
}

impl LoadedSignal {
    /// Signal that fires after `frames_required` presented frames
    pub fn new(frames_required: u32) -> Self {
        Self {
            callback: None,
            frames_required,
            remaining: None,
            fired: false,
        }
    }

    /// Attach the host callback
    pub fn attach(&mut self, callback: LoadedCallback) {
        self.callback = Some(callback);
    }

    /// Start counting; frames presented before this do not count
    pub fn arm(&mut self) {
        if !self.fired && self.remaining.is_none() {
            self.remaining = Some(self.frames_required);
        }
    }

    /// Record one presented frame. Returns `true` on the frame the signal
    /// fires.
    pub fn frame_presented(&mut self) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return false;
        }
        self.remaining = None;
        self.fired = true;
        if let Some(callback) = self.callback.take() {
            callback();
        }
        true
    }

    /// Whether the signal has fired
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
