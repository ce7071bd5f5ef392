//! Per-tick frame data and the loop-owned entity records

use crate::collaborators::{ComputeSlot, GameSnapshot, HostileId, HostileView};
use crate::foundation::math::Vec3;
use crate::foundation::time::clamp_delta;
use crate::render::{NodeKey, PickupKind};

/// Built fresh at the top of every running tick and dropped at its end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Delta as measured by the host
    pub raw_delta: f32,
    /// Delta every subsystem uses
    pub delta: f32,
    /// Player feet position (updated after the player stage)
    pub player_position: Vec3,
    /// Game state read once per tick
    pub game: GameSnapshot,
}

impl FrameContext {
    /// Clamp the raw delta and capture the game state
    pub fn new(raw_delta: f32, max_delta: f32, player_position: Vec3, game: GameSnapshot) -> Self {
        Self {
            raw_delta,
            delta: clamp_delta(raw_delta, max_delta),
            player_position,
            game,
        }
    }

    /// Raw delta usable for real-time cooldowns (non-negative, finite)
    pub fn real_delta(&self) -> f32 {
        if self.raw_delta.is_finite() {
            self.raw_delta.max(0.0)
        } else {
            0.0
        }
    }
}

/// Height of a hostile's hit sphere center above its feet
pub const HOSTILE_CENTER_HEIGHT: f32 = 1.0;

/// A live enemy
#[derive(Debug, Clone, PartialEq)]
pub struct Hostile {
    /// Stable id
    pub id: HostileId,
    /// Scene node
    pub node: NodeKey,
    /// Feet position
    pub position: Vec3,
    /// Heading
    pub yaw: f32,
    /// Remaining health
    pub health: f32,
    /// Compute slot, if one was available
    pub slot: Option<ComputeSlot>,
}

impl Hostile {
    /// Read-only view for the AI
    pub fn view(&self) -> HostileView {
        HostileView {
            id: self.id,
            position: self.position,
            yaw: self.yaw,
            health: self.health,
        }
    }

    /// Center of the hit sphere
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::y() * HOSTILE_CENTER_HEIGHT
    }

    /// Whether the hostile should be removed
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// Bob amplitude in meters
const PICKUP_BOB_HEIGHT: f32 = 0.25;

/// Bob rate in radians per second
const PICKUP_BOB_RATE: f32 = 2.5;

/// Hover height above the ground
const PICKUP_HOVER: f32 = 0.6;

/// Spin rate in radians per second
const PICKUP_SPIN_RATE: f32 = 1.5;

/// A collectible item waiting on the ground
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    /// What it grants
    pub kind: PickupKind,
    /// Scene node
    pub node: NodeKey,
    /// Ground position it hovers over
    pub base: Vec3,
    phase: f32,
}

impl Pickup {
    /// Pickup resting at `base`
    pub fn new(kind: PickupKind, node: NodeKey, base: Vec3) -> Self {
        Self {
            kind,
            node,
            base,
            phase: 0.0,
        }
    }

    /// Advance the bob animation. Returns `(position, yaw)` for the node.
    pub fn animate(&mut self, delta_time: f32) -> (Vec3, f32) {
        self.phase += delta_time;
        let lift = PICKUP_HOVER + (self.phase * PICKUP_BOB_RATE).sin() * PICKUP_BOB_HEIGHT;
        (self.base + Vec3::y() * lift, self.phase * PICKUP_SPIN_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_context_clamps_long_stall() {
        let game = GameSnapshot {
            health: 100.0,
            game_over: false,
        };
        let frame = FrameContext::new(5.0, 0.1, Vec3::zeros(), game);
        assert_relative_eq!(frame.delta, 0.1);
        assert_relative_eq!(frame.real_delta(), 5.0);

        let frame = FrameContext::new(f32::NAN, 0.1, Vec3::zeros(), game);
        assert_relative_eq!(frame.delta, 0.0);
        assert_relative_eq!(frame.real_delta(), 0.0);
    }

    #[test]
    fn test_pickup_bob_stays_above_ground() {
        let mut pickup = Pickup::new(PickupKind::Ammo, NodeKey::default(), Vec3::zeros());
        for _ in 0..120 {
            let (position, _) = pickup.animate(1.0 / 30.0);
            assert!(position.y >= PICKUP_HOVER - PICKUP_BOB_HEIGHT - 1e-5);
            assert!(position.y <= PICKUP_HOVER + PICKUP_BOB_HEIGHT + 1e-5);
        }
    }
}
