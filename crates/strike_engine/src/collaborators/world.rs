//! Terrain, physics and navigation queries

use super::CollaboratorError;
use crate::foundation::math::Vec3;

/// Procedural terrain height field
pub trait Terrain {
    /// Ground height at a world-space `(x, z)`
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Result of a physics raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}

/// Physics integration surface
pub trait PhysicsWorld {
    /// Build colliders for the level
    fn initialize(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Advance the simulation
    fn step(&mut self, dt: f32);

    /// First static hit along a ray
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;

    /// Free colliders built by [`PhysicsWorld::initialize`]
    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Height of the first collider below `position`, probing from slightly
    /// above it
    fn ground_below(&self, position: Vec3) -> Option<f32> {
        const PROBE_LIFT: f32 = 2.0;
        const PROBE_DEPTH: f32 = 50.0;
        let origin = position + Vec3::y() * PROBE_LIFT;
        self.raycast(origin, -Vec3::y(), PROBE_LIFT + PROBE_DEPTH)
            .map(|hit| hit.point.y)
    }
}

/// Navigation queries
pub trait Pathfinder {
    /// Build the navigation grid
    fn initialize(&mut self, _terrain: &dyn Terrain) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Whether an agent may stand at `position`
    fn is_walkable(&self, position: Vec3) -> bool;

    /// Next point on a path from `from` toward `to`
    fn next_waypoint(&self, from: Vec3, to: Vec3) -> Option<Vec3>;

    /// Drop the navigation grid
    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
