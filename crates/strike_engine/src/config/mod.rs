//! Configuration system
//!
//! All tunables for the frame orchestrator live here. Every struct carries
//! serde defaults so a partial `strike.toml` or `.ron` file only overrides the
//! fields it names.

pub use serde::{Deserialize, Serialize};

mod settings;

pub use settings::RuntimeSettings;

use crate::foundation::time::DEFAULT_MAX_DELTA;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Top-level orchestrator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame loop behaviour
    pub frame: LoopConfig,
    /// Periodic and initial spawning
    pub spawn: SpawnConfig,
    /// Pool capacities
    pub pools: PoolConfig,
    /// Shadow-follow light
    pub shadow: ShadowConfig,
    /// Hitch instrumentation
    pub hitch: HitchConfig,
    /// Startup pipeline warmup
    pub warmup: WarmupConfig,
    /// Combat responses
    pub combat: CombatConfig,
    /// Initial player-facing tunables
    pub settings: RuntimeSettings,
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                })
            }
        }

        positive("frame.max_delta", self.frame.max_delta)?;
        positive("spawn.enemy_interval", self.spawn.enemy_interval)?;
        positive("spawn.pickup_interval", self.spawn.pickup_interval)?;
        positive("shadow.extent", self.shadow.extent)?;
        positive("shadow.refresh_interval", self.shadow.refresh_interval)?;
        positive("warmup.widened_fov_degrees", self.warmup.widened_fov_degrees)?;
        positive("warmup.widened_far", self.warmup.widened_far)?;

        if self.shadow.resolution == 0 {
            return Err(ConfigError::Invalid {
                field: "shadow.resolution",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pools.explosive_capacity == 0 || self.pools.trail_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "pools",
                reason: "pool capacities must be at least 1".to_string(),
            });
        }
        if !(self.hitch.threshold_ms.is_finite() && self.hitch.threshold_ms >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "hitch.threshold_ms",
                reason: format!("must be zero or more, got {}", self.hitch.threshold_ms),
            });
        }
        if self.warmup.widened_fov_degrees < 1.0 {
            return Err(ConfigError::Invalid {
                field: "warmup.widened_fov_degrees",
                reason: "must be at least 1 degree".to_string(),
            });
        }
        if self.warmup.widened_fov_degrees >= 180.0 {
            return Err(ConfigError::Invalid {
                field: "warmup.widened_fov_degrees",
                reason: "must be below 180 degrees".to_string(),
            });
        }
        if self.spawn.spawn_radius_min > self.spawn.spawn_radius_max {
            return Err(ConfigError::Invalid {
                field: "spawn.spawn_radius_min",
                reason: "must not exceed spawn_radius_max".to_string(),
            });
        }
        Ok(())
    }
}

/// Frame loop behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Largest delta handed to subsystems, in seconds
    pub max_delta: f32,
    /// Real frames presented after warmup before the loaded signal fires
    pub loaded_after_frames: u32,
    /// Radius around the player that switches audio into combat mode
    pub combat_radius: f32,
    /// Player spawn point on the ground plane (height comes from terrain)
    pub spawn_point: [f32; 3],
    /// Eye height above the ground
    pub eye_height: f32,
    /// Default camera vertical field of view
    pub fov_degrees: f32,
    /// Camera near plane
    pub near: f32,
    /// Camera far plane
    pub far: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_delta: DEFAULT_MAX_DELTA,
            loaded_after_frames: 8,
            combat_radius: 30.0,
            spawn_point: [0.0, 0.0, 0.0],
            eye_height: 1.7,
            fov_degrees: 75.0,
            near: 0.1,
            far: 400.0,
        }
    }
}

/// Spawning of hostiles and pickups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Whether periodic spawning starts when the loop starts running
    pub enabled: bool,
    /// Maximum live hostiles
    pub max_enemies: usize,
    /// Seconds between periodic hostile spawns
    pub enemy_interval: f32,
    /// Maximum live pickups
    pub max_pickups: usize,
    /// Seconds between periodic pickup spawns
    pub pickup_interval: f32,
    /// Hostiles queued when spawning is first enabled
    pub initial_count: usize,
    /// Real-time gap between two queued initial spawns
    pub initial_cooldown: f32,
    /// Closest spawn distance from the player
    pub spawn_radius_min: f32,
    /// Furthest spawn distance from the player
    pub spawn_radius_max: f32,
    /// Placement attempts before a spawn is skipped
    pub placement_attempts: u32,
    /// Hostile starting health
    pub enemy_health: f32,
    /// Seed for spawn placement
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_enemies: 10,
            enemy_interval: 3.0,
            max_pickups: 4,
            pickup_interval: 12.0,
            initial_count: 5,
            initial_cooldown: 0.3,
            spawn_radius_min: 25.0,
            spawn_radius_max: 60.0,
            placement_attempts: 8,
            enemy_health: 100.0,
            seed: 0x5EED,
        }
    }
}

/// Pool capacities per effect type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle thrown explosives kept for reuse
    pub explosive_capacity: usize,
    /// Idle tracer trails kept for reuse
    pub trail_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            explosive_capacity: 24,
            trail_capacity: 64,
        }
    }
}

/// Shadow-follow light configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// World-space width covered by the shadow projection
    pub extent: f32,
    /// Shadow map resolution in texels
    pub resolution: u32,
    /// Maximum seconds between refreshes
    pub refresh_interval: f32,
    /// Light offset from its snapped target
    pub light_offset: [f32; 3],
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            extent: 120.0,
            resolution: 2048,
            refresh_interval: 0.1,
            light_offset: [40.0, 80.0, 30.0],
        }
    }
}

/// Hitch profiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitchConfig {
    /// Explicit opt-in/out. `None` means on for debug builds only.
    pub enabled: Option<bool>,
    /// Frame cost above which a hitch is reported
    pub threshold_ms: f32,
    /// Maximum number of hitch lines per session
    pub log_budget: u32,
}

/// Environment variable that overrides [`HitchConfig::enabled`]
pub const HITCH_ENV_VAR: &str = "STRIKE_HITCH_PROFILER";

impl HitchConfig {
    /// Resolve whether profiling is on: environment first, then config,
    /// then the build type
    pub fn resolve_enabled(&self) -> bool {
        match std::env::var(HITCH_ENV_VAR).ok().as_deref() {
            Some("1" | "true" | "on") => true,
            Some("0" | "false" | "off") => false,
            _ => self.enabled.unwrap_or(cfg!(debug_assertions)),
        }
    }
}

impl Default for HitchConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            threshold_ms: 24.0,
            log_budget: 50,
        }
    }
}

/// Pipeline warmup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Skip the whole sweep (tests, tools)
    pub enabled: bool,
    /// Field of view used while sweeping
    pub widened_fov_degrees: f32,
    /// Far plane used while sweeping
    pub widened_far: f32,
    /// Pitch angles crossed with every yaw step
    pub pitch_degrees: Vec<f32>,
    /// Distance in front of the spawn point where throwaways are placed
    pub placement_distance: f32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            widened_fov_degrees: 110.0,
            widened_far: 1500.0,
            pitch_degrees: vec![0.0, 35.0, -35.0],
            placement_distance: 8.0,
        }
    }
}

/// Combat response tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Damage flash value set on a hit
    pub damage_flash_intensity: f32,
    /// Flash decay per second
    pub damage_flash_decay: f32,
    /// Damage of one player shot
    pub player_shot_damage: f32,
    /// Maximum player shot range
    pub player_shot_range: f32,
    /// Hostile hit sphere radius used for shot tests
    pub hostile_hit_radius: f32,
    /// Score per kill
    pub kill_score: i32,
    /// Explosive fuse in seconds
    pub explosive_fuse: f32,
    /// Explosive blast radius
    pub explosive_radius: f32,
    /// Explosive damage at the center
    pub explosive_damage: f32,
    /// Seconds a tracer takes to fade out
    pub tracer_fade: f32,
    /// Pickup collection radius
    pub pickup_radius: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            damage_flash_intensity: 0.6,
            damage_flash_decay: 1.5,
            player_shot_damage: 34.0,
            player_shot_range: 150.0,
            hostile_hit_radius: 0.8,
            kill_score: 100,
            explosive_fuse: 2.0,
            explosive_radius: 6.0,
            explosive_damage: 120.0,
            tracer_fade: 0.12,
            pickup_radius: 1.5,
        }
    }
}
