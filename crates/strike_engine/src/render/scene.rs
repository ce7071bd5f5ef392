//! Scene graph owned by the frame loop
//!
//! A flat slot map of renderable nodes plus the camera and the shadow light.
//! Collaborators never receive mutable access; every insertion and removal
//! funnels through the loop (or the warmup sequencer it drives) via
//! [`SceneContext`], which keeps node lifetime and GPU visual lifetime in
//! step.

use slotmap::{new_key_type, SlotMap};

use super::{Camera, GpuVisual, RenderBackend, RenderResult, ShadowLight, VisualKind};
use crate::foundation::math::Vec3;

new_key_type! {
    /// Key of a node in the [`Scene`]
    pub struct NodeKey;
}

/// One renderable object
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// What the node draws
    pub kind: VisualKind,
    /// GPU resources backing the node
    pub visual: GpuVisual,
    /// World position (segment start for tracers)
    pub position: Vec3,
    /// Segment end for tracers
    pub end: Option<Vec3>,
    /// Heading in radians
    pub yaw: f32,
    /// Uniform scale
    pub scale: f32,
    /// Material opacity
    pub opacity: f32,
    /// Whether the node is drawn at all
    pub visible: bool,
    /// Whether the renderer may skip the node when it is outside the frustum
    pub frustum_culled: bool,
}

impl SceneNode {
    /// Create a visible, culled, opaque node at `position`
    pub fn new(kind: VisualKind, visual: GpuVisual, position: Vec3) -> Self {
        Self {
            kind,
            visual,
            position,
            end: None,
            yaw: 0.0,
            scale: 1.0,
            opacity: 1.0,
            visible: true,
            frustum_culled: true,
        }
    }
}

/// Saved per-node culling flags
pub type CullingSnapshot = Vec<(NodeKey, bool)>;

/// The loop-owned scene graph
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeKey, SceneNode>,
    /// Active camera
    pub camera: Camera,
    /// Shadow-casting sun
    pub light: ShadowLight,
}

impl Scene {
    /// Create an empty scene around a camera and light
    pub fn new(camera: Camera, light: ShadowLight) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            camera,
            light,
        }
    }

    /// Insert a node
    pub fn insert(&mut self, node: SceneNode) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Remove a node, returning it so its visual can be freed
    pub fn remove(&mut self, key: NodeKey) -> Option<SceneNode> {
        self.nodes.remove(key)
    }

    /// Borrow a node
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutably borrow a node
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Whether the key is live
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    /// Turn frustum culling off on every node, returning the previous flags
    pub fn disable_frustum_culling(&mut self) -> CullingSnapshot {
        self.nodes
            .iter_mut()
            .map(|(key, node)| {
                let previous = node.frustum_culled;
                node.frustum_culled = false;
                (key, previous)
            })
            .collect()
    }

    /// Restore flags saved by [`Scene::disable_frustum_culling`]. Nodes
    /// removed in between are skipped.
    pub fn restore_frustum_culling(&mut self, snapshot: CullingSnapshot) {
        for (key, culled) in snapshot {
            if let Some(node) = self.nodes.get_mut(key) {
                node.frustum_culled = culled;
            }
        }
    }

    /// Remove every node and return them for disposal
    pub fn drain(&mut self) -> Vec<SceneNode> {
        self.nodes.drain().map(|(_, node)| node).collect()
    }
}

/// Scene plus the backend that owns the GPU side of its nodes.
///
/// Borrowed for the duration of one operation so that creating a node always
/// allocates its visual and removing a node always frees it.
pub struct SceneContext<'a> {
    /// Scene being edited
    pub scene: &'a mut Scene,
    /// Backend owning the visuals
    pub renderer: &'a mut dyn RenderBackend,
}

impl<'a> SceneContext<'a> {
    /// Bundle a scene and its backend
    pub fn new(scene: &'a mut Scene, renderer: &'a mut dyn RenderBackend) -> Self {
        Self { scene, renderer }
    }

    /// Allocate a visual and insert a node for it
    pub fn spawn(&mut self, kind: VisualKind, position: Vec3) -> RenderResult<NodeKey> {
        let visual = self.renderer.create_visual(kind)?;
        Ok(self.scene.insert(SceneNode::new(kind, visual, position)))
    }

    /// Remove a node and free its visual. Release failures are logged and
    /// swallowed; returns whether the node existed.
    pub fn despawn(&mut self, key: NodeKey) -> bool {
        match self.scene.remove(key) {
            Some(node) => {
                release_visual_logged(self.renderer, node.visual);
                true
            }
            None => false,
        }
    }
}

/// Free a visual, downgrading failure to a warning
pub fn release_visual_logged(renderer: &mut dyn RenderBackend, visual: GpuVisual) {
    if let Err(e) = renderer.release_visual(visual) {
        log::warn!("Failed to release visual {}: {}", visual.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRenderer;

    #[test]
    fn test_spawn_and_despawn_balance_visuals() {
        let (mut renderer, probe) = HeadlessRenderer::new();
        let mut scene = Scene::default();

        let key = {
            let mut ctx = SceneContext::new(&mut scene, &mut renderer);
            ctx.spawn(VisualKind::Hostile, Vec3::zeros()).unwrap()
        };
        assert_eq!(probe.borrow().live_visuals(), 1);
        assert!(scene.contains(key));

        let mut ctx = SceneContext::new(&mut scene, &mut renderer);
        assert!(ctx.despawn(key));
        assert!(!ctx.despawn(key));
        assert_eq!(probe.borrow().live_visuals(), 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_culling_snapshot_restores_per_node_flags() {
        let (mut renderer, _probe) = HeadlessRenderer::new();
        let mut scene = Scene::default();
        let mut ctx = SceneContext::new(&mut scene, &mut renderer);
        let a = ctx.spawn(VisualKind::Hostile, Vec3::zeros()).unwrap();
        let b = ctx.spawn(VisualKind::Tracer, Vec3::zeros()).unwrap();
        scene.get_mut(b).unwrap().frustum_culled = false;

        let snapshot = scene.disable_frustum_culling();
        assert!(scene.iter().all(|(_, node)| !node.frustum_culled));

        scene.restore_frustum_culling(snapshot);
        assert!(scene.get(a).unwrap().frustum_culled);
        assert!(!scene.get(b).unwrap().frustum_culled);
    }
}
