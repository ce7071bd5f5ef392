//! Recording render backend and surface

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::render::{
    Camera, GlobalUniforms, GpuVisual, RenderBackend, RenderError, RenderOptions, RenderResult, RenderSurface, Scene,
    SurfaceError, VisualKind,
};

/// One submitted frame as the backend saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    /// Camera at submission time
    pub camera: Camera,
    /// Submission options
    pub options: RenderOptions,
    /// Nodes in the scene
    pub node_count: usize,
    /// Nodes that still had frustum culling enabled
    pub culled_nodes: usize,
}

/// What the headless renderer has been asked to do
#[derive(Debug, Default)]
pub struct RenderProbe {
    next_id: u64,
    live: BTreeMap<u64, VisualKind>,
    /// Visuals created since construction
    pub created: u64,
    /// Visuals released since construction
    pub released: u64,
    /// Successful `compile_pipelines` calls, with the camera used for each
    pub compiles: Vec<Camera>,
    /// Every submitted frame
    pub renders: Vec<RenderRecord>,
    /// Last uniform block written
    pub last_uniforms: Option<GlobalUniforms>,
    /// Number of uniform uploads
    pub uniform_writes: u64,
    /// Make `compile_pipelines` fail
    pub fail_compile: bool,
    /// Report no async compile support
    pub no_async_compile: bool,
    /// Make `release_visual` fail (the visual is still dropped from the live set)
    pub fail_release: bool,
    /// Make `dispose` fail
    pub fail_dispose: bool,
    /// Whether `dispose` ran
    pub disposed: bool,
    /// Post-processing chain built and not yet released
    pub post_processing: bool,
}

impl RenderProbe {
    /// Visuals created and not yet released
    pub fn live_visuals(&self) -> usize {
        self.live.len()
    }

    /// Live visuals of one kind
    pub fn live_of(&self, kind: VisualKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    /// Frames submitted
    pub fn render_count(&self) -> usize {
        self.renders.len()
    }

    /// Successful compile requests
    pub fn compile_count(&self) -> usize {
        self.compiles.len()
    }
}

/// [`RenderBackend`] that records instead of drawing
pub struct HeadlessRenderer {
    probe: Rc<RefCell<RenderProbe>>,
}

impl HeadlessRenderer {
    /// Create a renderer and the probe that observes it
    pub fn new() -> (Self, Rc<RefCell<RenderProbe>>) {
        let probe = Rc::new(RefCell::new(RenderProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl RenderBackend for HeadlessRenderer {
    fn configure_post_processing(&mut self) -> RenderResult<()> {
        self.probe.borrow_mut().post_processing = true;
        Ok(())
    }

    fn release_post_processing(&mut self) -> RenderResult<()> {
        self.probe.borrow_mut().post_processing = false;
        Ok(())
    }

    fn create_visual(&mut self, kind: VisualKind) -> RenderResult<GpuVisual> {
        let mut probe = self.probe.borrow_mut();
        probe.next_id += 1;
        let id = probe.next_id;
        probe.live.insert(id, kind);
        probe.created += 1;
        Ok(GpuVisual {
            id,
            geometry: id as u32,
            material: id as u32,
        })
    }

    fn release_visual(&mut self, visual: GpuVisual) -> RenderResult<()> {
        let mut probe = self.probe.borrow_mut();
        if probe.live.remove(&visual.id).is_none() {
            return Err(RenderError::UnknownVisual(visual.id));
        }
        probe.released += 1;
        if probe.fail_release {
            return Err(RenderError::Backend("release rejected".to_string()));
        }
        Ok(())
    }

    fn supports_async_compile(&self) -> bool {
        !self.probe.borrow().no_async_compile
    }

    fn compile_pipelines(&mut self, scene: &Scene) -> RenderResult<()> {
        let mut probe = self.probe.borrow_mut();
        if probe.no_async_compile {
            return Err(RenderError::Unsupported("compile_pipelines".to_string()));
        }
        if probe.fail_compile {
            return Err(RenderError::CompileFailed("headless compile failure".to_string()));
        }
        probe.compiles.push(scene.camera.clone());
        Ok(())
    }

    fn write_global_uniforms(&mut self, bytes: &[u8]) {
        let mut probe = self.probe.borrow_mut();
        probe.uniform_writes += 1;
        probe.last_uniforms = bytemuck::try_pod_read_unaligned::<GlobalUniforms>(bytes).ok();
    }

    fn render(&mut self, scene: &Scene, options: RenderOptions) -> RenderResult<()> {
        let record = RenderRecord {
            camera: scene.camera.clone(),
            options,
            node_count: scene.len(),
            culled_nodes: scene.iter().filter(|(_, node)| node.frustum_culled).count(),
        };
        self.probe.borrow_mut().renders.push(record);
        Ok(())
    }

    fn dispose(&mut self) -> RenderResult<()> {
        let mut probe = self.probe.borrow_mut();
        probe.disposed = true;
        if probe.fail_dispose {
            return Err(RenderError::DeviceLost("headless".to_string()));
        }
        Ok(())
    }
}

/// Pointer capture state of the headless surface
#[derive(Debug, Default)]
pub struct SurfaceProbe {
    /// Whether the pointer is captured
    pub locked: bool,
    /// Refuse the next lock requests
    pub refuse_lock: bool,
    /// Lock requests seen
    pub lock_requests: u32,
    /// Unlock requests seen
    pub unlock_requests: u32,
}

/// Fixed-size [`RenderSurface`]
pub struct HeadlessSurface {
    size: (u32, u32),
    probe: Rc<RefCell<SurfaceProbe>>,
}

impl HeadlessSurface {
    /// Create a surface of the given size
    pub fn new(width: u32, height: u32) -> (Self, Rc<RefCell<SurfaceProbe>>) {
        let probe = Rc::new(RefCell::new(SurfaceProbe::default()));
        (
            Self {
                size: (width, height),
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn lock_pointer(&mut self) -> Result<(), SurfaceError> {
        let mut probe = self.probe.borrow_mut();
        probe.lock_requests += 1;
        if probe.refuse_lock {
            return Err(SurfaceError::PointerLockRefused("no user gesture".to_string()));
        }
        probe.locked = true;
        Ok(())
    }

    fn unlock_pointer(&mut self) -> Result<(), SurfaceError> {
        let mut probe = self.probe.borrow_mut();
        probe.unlock_requests += 1;
        probe.locked = false;
        Ok(())
    }
}
