//! Bullet tracer segment that fades out

use crate::foundation::math::Vec3;
use crate::pool::{EffectState, Poolable};
use crate::render::{NodeKey, RenderError, Scene, SceneContext, VisualKind};

/// Parameters for one tracer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailParams {
    /// Muzzle end
    pub start: Vec3,
    /// Impact end
    pub end: Vec3,
    /// Seconds until fully transparent
    pub fade_seconds: f32,
}

/// Tracer from muzzle to impact
#[derive(Debug)]
pub struct TrailEffect {
    node: NodeKey,
    start: Vec3,
    end: Vec3,
    fade_seconds: f32,
    age: f32,
    opacity: f32,
    state: EffectState,
}

impl TrailEffect {
    /// Age the tracer and push its opacity into the scene. Returns `true`
    /// once it has fully faded.
    pub fn update(&mut self, delta_time: f32, scene: &mut Scene) -> bool {
        self.age += delta_time;
        self.opacity = if self.fade_seconds > 0.0 {
            (1.0 - self.age / self.fade_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if let Some(node) = scene.get_mut(self.node) {
            node.opacity = self.opacity;
        }
        self.is_finished()
    }

    /// Whether the tracer has faded out
    pub fn is_finished(&self) -> bool {
        self.opacity <= 0.0
    }

    /// Current opacity
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Segment endpoints
    pub fn segment(&self) -> (Vec3, Vec3) {
        (self.start, self.end)
    }

    /// Lifecycle state
    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Scene node drawing this tracer
    pub fn node(&self) -> NodeKey {
        self.node
    }

    fn apply(&mut self, scene: &mut Scene, params: &TrailParams) {
        self.start = params.start;
        self.end = params.end;
        self.fade_seconds = params.fade_seconds;
        self.age = 0.0;
        self.opacity = 1.0;
        self.state = EffectState::Active;
        if let Some(node) = scene.get_mut(self.node) {
            node.position = params.start;
            node.end = Some(params.end);
            node.opacity = 1.0;
            node.visible = true;
            // A long thin segment's bounds rarely match its visibility
            node.frustum_culled = false;
        }
    }
}

impl<'a> Poolable<SceneContext<'a>> for TrailEffect {
    type Params = TrailParams;
    type Error = RenderError;

    fn create(ctx: &mut SceneContext<'a>, params: &TrailParams) -> Result<Self, RenderError> {
        let node = ctx.spawn(VisualKind::Tracer, params.start)?;
        let mut trail = Self {
            node,
            start: params.start,
            end: params.end,
            fade_seconds: params.fade_seconds,
            age: 0.0,
            opacity: 1.0,
            state: EffectState::Active,
        };
        trail.apply(ctx.scene, params);
        Ok(trail)
    }

    fn reset(&mut self, ctx: &mut SceneContext<'a>, params: &TrailParams) {
        self.apply(ctx.scene, params);
    }

    fn park(&mut self, ctx: &mut SceneContext<'a>) {
        self.state = EffectState::Pooled;
        self.opacity = 0.0;
        if let Some(node) = ctx.scene.get_mut(self.node) {
            node.visible = false;
            node.opacity = 0.0;
        }
    }

    fn dispose(mut self, ctx: &mut SceneContext<'a>) {
        self.state = EffectState::Disposed;
        ctx.despawn(self.node);
    }
}
