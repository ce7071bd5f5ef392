//! Player-facing runtime settings
//!
//! Persisted by an external store; the loop only ever receives an immutable
//! value and hot-swaps it between frames.

use serde::{Deserialize, Serialize};

/// Tunables that may change while the loop is running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Mouse look sensitivity multiplier
    pub mouse_sensitivity: f32,
    /// Invert vertical look
    pub invert_y: bool,
    /// Walking speed in metres per second
    pub move_speed: f32,
    /// Sprint multiplier applied to `move_speed`
    pub sprint_multiplier: f32,
    /// Jump impulse
    pub jump_velocity: f32,
    /// Seconds between two shots
    pub fire_cooldown: f32,
    /// Seconds between two thrown explosives
    pub throw_cooldown: f32,
    /// Field of view override in degrees
    pub fov_degrees: Option<f32>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.0,
            invert_y: false,
            move_speed: 6.0,
            sprint_multiplier: 1.6,
            jump_velocity: 5.5,
            fire_cooldown: 0.12,
            throw_cooldown: 1.0,
            fov_degrees: None,
        }
    }
}
