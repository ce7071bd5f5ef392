//! Flat terrain, trivial physics and an open navigation grid

use std::cell::RefCell;
use std::rc::Rc;

use crate::collaborators::{CollaboratorError, Pathfinder, PhysicsWorld, RayHit, Terrain};
use crate::foundation::math::Vec3;

/// Terrain at a constant height
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    height: f32,
}

impl FlatTerrain {
    /// Flat ground at `height`
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl Terrain for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Physics steps seen by [`HeadlessPhysics`]
#[derive(Debug, Default)]
pub struct PhysicsProbe {
    /// Number of `step` calls
    pub steps: u64,
    /// Sum of stepped time
    pub simulated: f32,
    /// Set once `dispose` has been called
    pub disposed: bool,
}

/// Physics world containing only a ground plane
pub struct HeadlessPhysics {
    ground: f32,
    probe: Rc<RefCell<PhysicsProbe>>,
}

impl HeadlessPhysics {
    /// Ground plane at `ground` height
    pub fn new(ground: f32) -> (Self, Rc<RefCell<PhysicsProbe>>) {
        let probe = Rc::new(RefCell::new(PhysicsProbe::default()));
        (
            Self {
                ground,
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl PhysicsWorld for HeadlessPhysics {
    fn step(&mut self, dt: f32) {
        let mut probe = self.probe.borrow_mut();
        probe.steps += 1;
        probe.simulated += dt;
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if direction.y >= -f32::EPSILON {
            return None;
        }
        let distance = (self.ground - origin.y) / direction.y;
        if distance < 0.0 || distance > max_distance {
            return None;
        }
        Some(RayHit {
            point: origin + direction * distance,
            normal: Vec3::y(),
            distance,
        })
    }

    fn dispose(&mut self) -> Result<(), CollaboratorError> {
        self.probe.borrow_mut().disposed = true;
        Ok(())
    }
}

/// Navigation where everything inside a square arena is walkable
#[derive(Debug, Clone, Copy)]
pub struct OpenPathfinder {
    half_extent: f32,
}

impl OpenPathfinder {
    /// Arena spanning `[-half_extent, half_extent]` on X and Z
    pub fn new(half_extent: f32) -> Self {
        Self { half_extent }
    }
}

impl Pathfinder for OpenPathfinder {
    fn is_walkable(&self, position: Vec3) -> bool {
        position.x.abs() <= self.half_extent && position.z.abs() <= self.half_extent
    }

    fn next_waypoint(&self, _from: Vec3, to: Vec3) -> Option<Vec3> {
        self.is_walkable(to).then_some(to)
    }
}
