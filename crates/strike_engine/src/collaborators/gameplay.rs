//! Game state, player control and hostile AI boundaries

use super::WorldQueries;
use crate::config::RuntimeSettings;
use crate::foundation::math::Vec3;
use crate::render::PickupKind;

/// Read-only view of game state taken once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSnapshot {
    /// Current player health
    pub health: f32,
    /// Player death flag
    pub game_over: bool,
}

/// Health, score and death flag
pub trait GameState {
    /// Current values
    fn snapshot(&self) -> GameSnapshot;

    /// Add (or with a negative value, subtract) health
    fn update_health(&mut self, delta: f32);

    /// Add to the score
    fn update_score(&mut self, delta: i32);

    /// Apply a collected pickup
    fn grant_pickup(&mut self, kind: PickupKind);

    /// Back to a fresh game
    fn reset(&mut self);
}

/// A shot the player fired this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerShot {
    /// Muzzle position
    pub origin: Vec3,
    /// Unit aim direction
    pub direction: Vec3,
}

/// An explosive the player threw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowRequest {
    /// Release position
    pub origin: Vec3,
    /// Initial velocity
    pub velocity: Vec3,
}

/// Result of one player update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerUpdate {
    /// Feet position
    pub position: Vec3,
    /// Look yaw in radians
    pub yaw: f32,
    /// Look pitch in radians
    pub pitch: f32,
    /// Shot fired this frame
    pub shot: Option<PlayerShot>,
    /// Explosive thrown this frame
    pub throw: Option<ThrowRequest>,
}

/// Player input and movement
pub trait PlayerController {
    /// Place the player at a spawn point
    fn spawn(&mut self, position: Vec3);

    /// Hot-swap sensitivity, speeds and cooldowns
    fn apply_settings(&mut self, settings: &RuntimeSettings);

    /// Consume input and move
    fn update(&mut self, dt: f32, queries: &WorldQueries<'_>) -> PlayerUpdate;
}

/// Stable id of a hostile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostileId(pub u64);

/// What the AI may read about a hostile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileView {
    /// Stable id
    pub id: HostileId,
    /// Ground position
    pub position: Vec3,
    /// Heading
    pub yaw: f32,
    /// Remaining health
    pub health: f32,
}

/// Result of a hostile's ranged attack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangedAttack {
    /// Muzzle position
    pub origin: Vec3,
    /// Whether the attack connected with the player
    pub hit: bool,
    /// Damage dealt on hit
    pub damage: f32,
}

/// What a hostile wants to do this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileIntent {
    /// Desired ground position (height is re-grounded by the loop)
    pub position: Vec3,
    /// Desired heading
    pub yaw: f32,
    /// Attack fired this frame
    pub attack: Option<RangedAttack>,
}

/// Hostile decision making
pub trait HostileAi {
    /// Decide one hostile's move for this frame
    fn update(&mut self, hostile: &HostileView, player: Vec3, dt: f32, queries: &WorldQueries<'_>) -> HostileIntent;

    /// Forget any per-hostile memory
    fn forget(&mut self, _id: HostileId) {}
}
