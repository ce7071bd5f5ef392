//! Thrown explosive: ballistic flight, ground bounce, fused detonation

use crate::collaborators::Terrain;
use crate::foundation::math::Vec3;
use crate::pool::{EffectState, Poolable};
use crate::render::{NodeKey, RenderError, Scene, SceneContext, VisualKind};

/// Downward acceleration in m/s²
pub const GRAVITY: f32 = 9.81;

/// Fraction of vertical speed kept after a bounce
const RESTITUTION: f32 = 0.35;

/// Fraction of horizontal speed kept after a bounce
const GROUND_FRICTION: f32 = 0.7;

/// Resting height of the explosive's center above the ground
const BODY_RADIUS: f32 = 0.12;

/// Tumble rate in radians per second while airborne
const SPIN_RATE: f32 = 9.0;

/// Parameters for one throw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosiveParams {
    /// Release position
    pub origin: Vec3,
    /// Initial velocity
    pub velocity: Vec3,
    /// Seconds until detonation
    pub fuse: f32,
}

/// A thrown explosive
#[derive(Debug)]
pub struct ExplosiveEffect {
    node: NodeKey,
    position: Vec3,
    velocity: Vec3,
    fuse: f32,
    spin: f32,
    detonated: bool,
    state: EffectState,
}

impl ExplosiveEffect {
    /// Integrate one step. Returns the detonation point on the step the fuse
    /// runs out, and `None` on every other step.
    pub fn update(&mut self, delta_time: f32, terrain: &dyn Terrain, scene: &mut Scene) -> Option<Vec3> {
        if self.detonated {
            return None;
        }

        self.velocity.y -= GRAVITY * delta_time;
        self.position += self.velocity * delta_time;

        let rest_height = terrain.height_at(self.position.x, self.position.z) + BODY_RADIUS;
        let grounded = self.position.y <= rest_height;
        if grounded {
            self.position.y = rest_height;
            if self.velocity.y < 0.0 {
                self.velocity.y = -self.velocity.y * RESTITUTION;
                self.velocity.x *= GROUND_FRICTION;
                self.velocity.z *= GROUND_FRICTION;
            }
        } else {
            self.spin += SPIN_RATE * delta_time;
        }

        if let Some(node) = scene.get_mut(self.node) {
            node.position = self.position;
            node.yaw = self.spin;
        }

        self.fuse -= delta_time;
        if self.fuse <= 0.0 {
            self.detonated = true;
            return Some(self.position);
        }
        None
    }

    /// Whether the fuse has run out
    pub fn has_detonated(&self) -> bool {
        self.detonated
    }

    /// Current position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Lifecycle state
    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Scene node drawing this explosive
    pub fn node(&self) -> NodeKey {
        self.node
    }

    fn apply(&mut self, scene: &mut Scene, params: &ExplosiveParams) {
        self.position = params.origin;
        self.velocity = params.velocity;
        self.fuse = params.fuse;
        self.spin = 0.0;
        self.detonated = false;
        self.state = EffectState::Active;
        if let Some(node) = scene.get_mut(self.node) {
            node.position = params.origin;
            node.yaw = 0.0;
            node.visible = true;
        }
    }
}

impl<'a> Poolable<SceneContext<'a>> for ExplosiveEffect {
    type Params = ExplosiveParams;
    type Error = RenderError;

    fn create(ctx: &mut SceneContext<'a>, params: &ExplosiveParams) -> Result<Self, RenderError> {
        let node = ctx.spawn(VisualKind::Explosive, params.origin)?;
        let mut explosive = Self {
            node,
            position: params.origin,
            velocity: params.velocity,
            fuse: params.fuse,
            spin: 0.0,
            detonated: false,
            state: EffectState::Active,
        };
        explosive.apply(ctx.scene, params);
        Ok(explosive)
    }

    fn reset(&mut self, ctx: &mut SceneContext<'a>, params: &ExplosiveParams) {
        self.apply(ctx.scene, params);
    }

    fn park(&mut self, ctx: &mut SceneContext<'a>) {
        self.state = EffectState::Pooled;
        self.velocity = Vec3::zeros();
        if let Some(node) = ctx.scene.get_mut(self.node) {
            node.visible = false;
        }
    }

    fn dispose(mut self, ctx: &mut SceneContext<'a>) {
        self.state = EffectState::Disposed;
        ctx.despawn(self.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FlatTerrain, HeadlessRenderer};
    use approx::assert_relative_eq;

    fn throw(fuse: f32) -> ExplosiveParams {
        ExplosiveParams {
            origin: Vec3::new(0.0, 1.5, 0.0),
            velocity: Vec3::new(0.0, 3.0, -8.0),
            fuse,
        }
    }

    #[test]
    fn test_explosive_never_sinks_below_ground() {
        let (mut renderer, _probe) = HeadlessRenderer::new();
        let mut scene = Scene::default();
        let terrain = FlatTerrain::new(0.0);
        let mut explosive =
            ExplosiveEffect::create(&mut SceneContext::new(&mut scene, &mut renderer), &throw(10.0)).unwrap();

        for _ in 0..300 {
            explosive.update(1.0 / 60.0, &terrain, &mut scene);
            assert!(explosive.position().y >= BODY_RADIUS - 1e-5);
        }
        assert!(explosive.velocity().y.abs() < 1.0);
    }

    #[test]
    fn test_detonates_once_when_fuse_expires() {
        let (mut renderer, _probe) = HeadlessRenderer::new();
        let mut scene = Scene::default();
        let terrain = FlatTerrain::new(0.0);
        let mut explosive =
            ExplosiveEffect::create(&mut SceneContext::new(&mut scene, &mut renderer), &throw(0.5)).unwrap();

        let detonations: Vec<_> = (0..60)
            .filter_map(|_| explosive.update(1.0 / 60.0, &terrain, &mut scene))
            .collect();
        assert_eq!(detonations.len(), 1);
        assert!(explosive.has_detonated());
    }

    #[test]
    fn test_scene_node_follows_flight() {
        let (mut renderer, _probe) = HeadlessRenderer::new();
        let mut scene = Scene::default();
        let terrain = FlatTerrain::new(0.0);
        let mut explosive =
            ExplosiveEffect::create(&mut SceneContext::new(&mut scene, &mut renderer), &throw(5.0)).unwrap();

        explosive.update(0.1, &terrain, &mut scene);
        let node = scene.get(explosive.node()).unwrap();
        assert_relative_eq!(node.position.z, explosive.position().z);
        assert!(node.position.z < 0.0);
    }
}
