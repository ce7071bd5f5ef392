//! Resumable pipeline warmup
//!
//! Every distinct material/geometry combination the game can show must have
//! its GPU pipeline built before the first real frame, or the first time it
//! appears the frame stalls. The sequencer makes one throwaway of every
//! visual kind, sweeps the camera through a yaw × pitch grid asking the
//! backend to compile, forces one unculled render, sweeps again with real
//! post-processed renders and then puts everything back.
//!
//! Each call to [`WarmupSequencer::step`] performs one unit of work and
//! returns, so the host gets control back between samples.

use crate::collaborators::ParticleSystem;
use crate::config::WarmupConfig;
use crate::foundation::math::{constants, utils, Vec3};
use crate::render::{Camera, NodeKey, RenderBackend, RenderOptions, Scene, SceneContext, VisualKind};

/// Sideways spacing between throwaway instances in meters
const THROWAWAY_SPACING: f32 = 1.2;

/// Step used to prime particle buffers
const PRIME_DELTA: f32 = 1.0 / 60.0;

/// Minimum number of yaw samples per pitch
const MIN_YAW_STEPS: usize = 4;

/// Where the sequencer is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupPhase {
    /// Save the camera and widen its frustum
    WidenCamera,
    /// Instantiate one throwaway per visual kind
    SpawnThrowaways,
    /// Emit one burst of every weapon particle archetype
    PrimeParticles,
    /// Compile pipelines for one yaw/pitch sample
    CompileSweep {
        /// Sample index
        index: usize,
    },
    /// One render with frustum culling disabled scene-wide
    ForcedRender,
    /// Real post-processed render for one yaw/pitch sample
    RenderSweep {
        /// Sample index
        index: usize,
    },
    /// Put the saved camera back
    RestoreCamera,
    /// Remove the throwaways
    Cleanup,
    /// Nothing left to do
    Done,
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupStatus {
    /// More work remains; call `step` again on a later tick
    Yield,
    /// Warmup is over
    Finished,
}

/// Counters describing what the warmup did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupStats {
    /// Successful compile requests
    pub compiles: u32,
    /// Successful renders
    pub renders: u32,
    /// Renders that returned an error
    pub render_failures: u32,
    /// Whether the synchronous fallback replaced the compile sweep
    pub used_fallback: bool,
}

/// Borrowed state the sequencer works on
pub struct WarmupContext<'a> {
    /// Loop-owned scene
    pub scene: &'a mut Scene,
    /// Backend that compiles and renders
    pub renderer: &'a mut dyn RenderBackend,
    /// Particle system to prime
    pub particles: &'a mut dyn ParticleSystem,
}

/// Number of yaw samples for a given field of view: enough that the angle
/// between neighbours is strictly smaller than the field of view
pub fn yaw_steps(fov_radians: f32) -> usize {
    if !fov_radians.is_finite() || fov_radians <= 0.0 {
        return MIN_YAW_STEPS;
    }
    let steps = (constants::TAU / fov_radians).ceil() as usize + 1;
    steps.max(MIN_YAW_STEPS)
}

/// Staged pipeline warmup driven one step per tick
#[derive(Debug)]
pub struct WarmupSequencer {
    config: WarmupConfig,
    phase: WarmupPhase,
    saved_camera: Option<Camera>,
    throwaways: Vec<NodeKey>,
    samples: Vec<(f32, f32)>,
    progress: (u8, &'static str),
    stats: WarmupStats,
}

impl WarmupSequencer {
    /// Prepare a warmup; nothing happens until the first step
    pub fn new(config: &WarmupConfig) -> Self {
        Self {
            config: config.clone(),
            phase: WarmupPhase::WidenCamera,
            saved_camera: None,
            throwaways: Vec::new(),
            samples: Vec::new(),
            progress: (65, "dummy-entities"),
            stats: WarmupStats::default(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> WarmupPhase {
        self.phase
    }

    /// Whether every step has run
    pub fn is_finished(&self) -> bool {
        self.phase == WarmupPhase::Done
    }

    /// Orientation samples as `(yaw, pitch)` in radians, in sweep order
    pub fn samples(&self) -> &[(f32, f32)] {
        &self.samples
    }

    /// Throwaway nodes currently in the scene
    pub fn throwaways(&self) -> &[NodeKey] {
        &self.throwaways
    }

    /// What the warmup has done so far
    pub fn stats(&self) -> WarmupStats {
        self.stats
    }

    /// Progress percentage and stage key for the last step performed
    pub fn progress(&self) -> (u8, &'static str) {
        self.progress
    }

    /// Perform one unit of work
    pub fn step(&mut self, ctx: &mut WarmupContext<'_>) -> WarmupStatus {
        match self.phase {
            WarmupPhase::WidenCamera => {
                self.widen_camera(ctx.scene);
                self.progress = (65, "dummy-entities");
                self.phase = WarmupPhase::SpawnThrowaways;
            }
            WarmupPhase::SpawnThrowaways => {
                self.spawn_throwaways(&mut SceneContext::new(ctx.scene, ctx.renderer));
                self.progress = (65, "dummy-entities");
                self.phase = WarmupPhase::PrimeParticles;
            }
            WarmupPhase::PrimeParticles => {
                self.prime_particles(ctx.scene, ctx.particles);
                self.progress = (70, "shader-warmup");
                self.phase = WarmupPhase::CompileSweep { index: 0 };
            }
            WarmupPhase::CompileSweep { index } => {
                self.compile_sample(ctx, index);
            }
            WarmupPhase::ForcedRender => {
                self.forced_render(ctx);
                self.progress = (82, "gpu-warmup");
                self.phase = WarmupPhase::RenderSweep { index: 0 };
            }
            WarmupPhase::RenderSweep { index } => {
                self.render_sample(ctx, index);
            }
            WarmupPhase::RestoreCamera => {
                self.restore_camera(ctx.scene);
                self.progress = (94, "render-warmup");
                self.phase = WarmupPhase::Cleanup;
            }
            WarmupPhase::Cleanup => {
                self.cleanup(&mut SceneContext::new(ctx.scene, ctx.renderer));
                self.phase = WarmupPhase::Done;
                log::info!(
                    "Warmup finished: {} compiles, {} renders, {} render failures{}",
                    self.stats.compiles,
                    self.stats.renders,
                    self.stats.render_failures,
                    if self.stats.used_fallback { " (synchronous fallback)" } else { "" }
                );
            }
            WarmupPhase::Done => {}
        }

        if self.phase == WarmupPhase::Done {
            WarmupStatus::Finished
        } else {
            WarmupStatus::Yield
        }
    }

    /// Stop wherever the sequence is: restore the camera and remove every
    /// throwaway. Safe to call in any phase, more than once.
    pub fn abort(&mut self, ctx: &mut SceneContext<'_>) {
        if self.phase != WarmupPhase::Done {
            log::debug!("Warmup aborted in phase {:?}", self.phase);
        }
        self.restore_camera(ctx.scene);
        self.cleanup(ctx);
        self.phase = WarmupPhase::Done;
    }

    fn widen_camera(&mut self, scene: &mut Scene) {
        self.saved_camera = Some(scene.camera.clone());
        scene.camera.fov_degrees = self.config.widened_fov_degrees;
        scene.camera.far = self.config.widened_far;

        let base_yaw = scene.camera.yaw;
        let steps = yaw_steps(scene.camera.fov_radians());
        let step_angle = constants::TAU / steps as f32;
        self.samples = self
            .config
            .pitch_degrees
            .iter()
            .flat_map(|pitch| {
                let pitch = utils::deg_to_rad(*pitch);
                (0..steps).map(move |i| (base_yaw + i as f32 * step_angle, pitch))
            })
            .collect();
        log::debug!(
            "Warmup sweep: {} yaw steps of {:.1}° × {} pitches",
            steps,
            utils::rad_to_deg(step_angle),
            self.config.pitch_degrees.len()
        );
    }

    fn spawn_throwaways(&mut self, ctx: &mut SceneContext<'_>) {
        let camera = &ctx.scene.camera;
        let forward = utils::forward_from_yaw_pitch(camera.yaw, 0.0);
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        let center = camera.position + forward * self.config.placement_distance;
        let half_span = (VisualKind::ALL.len() as f32 - 1.0) * 0.5;

        for (i, kind) in VisualKind::ALL.into_iter().enumerate() {
            let position = center + right * ((i as f32 - half_span) * THROWAWAY_SPACING);
            match ctx.spawn(kind, position) {
                Ok(key) => {
                    if let Some(node) = ctx.scene.get_mut(key) {
                        if kind == VisualKind::Tracer {
                            node.end = Some(position + forward);
                        }
                    }
                    self.throwaways.push(key);
                }
                Err(e) => log::warn!("Warmup could not instantiate {:?}: {}", kind, e),
            }
        }
    }

    fn prime_particles(&self, scene: &Scene, particles: &mut dyn ParticleSystem) {
        let camera = &scene.camera;
        let forward = camera.forward();
        let position = camera.position + forward * self.config.placement_distance;
        particles.emit_muzzle_flash(camera.position, forward);
        particles.emit_sparks(position, -forward);
        particles.emit_blood(position, forward);
        particles.update(PRIME_DELTA);
    }

    fn compile_sample(&mut self, ctx: &mut WarmupContext<'_>, index: usize) {
        if !ctx.renderer.supports_async_compile() {
            log::warn!("Backend cannot pre-compile pipelines; falling back to one synchronous render");
            self.synchronous_fallback(ctx);
            return;
        }
        let Some(&(yaw, pitch)) = self.samples.get(index) else {
            self.phase = WarmupPhase::ForcedRender;
            return;
        };

        ctx.scene.camera.set_orientation(yaw, pitch);
        if let Err(e) = ctx.renderer.compile_pipelines(ctx.scene) {
            log::warn!("Pipeline pre-compilation failed ({}); falling back to one synchronous render", e);
            self.synchronous_fallback(ctx);
            return;
        }
        self.stats.compiles += 1;

        let done = index + 1;
        self.progress = (sweep_percent(70, 10, done, self.samples.len()), "shader-warmup");
        self.phase = if done < self.samples.len() {
            WarmupPhase::CompileSweep { index: done }
        } else {
            WarmupPhase::ForcedRender
        };
    }

    fn synchronous_fallback(&mut self, ctx: &mut WarmupContext<'_>) {
        self.stats.used_fallback = true;
        self.face_home(ctx.scene);
        let options = RenderOptions {
            post_processing: false,
            shadow_dirty: false,
        };
        self.render_logged(ctx, options);
        self.progress = (80, "shader-warmup");
        self.phase = WarmupPhase::ForcedRender;
    }

    fn forced_render(&mut self, ctx: &mut WarmupContext<'_>) {
        self.face_home(ctx.scene);
        let culling = ctx.scene.disable_frustum_culling();
        let options = RenderOptions {
            post_processing: true,
            shadow_dirty: true,
        };
        self.render_logged(ctx, options);
        ctx.scene.restore_frustum_culling(culling);
    }

    fn render_sample(&mut self, ctx: &mut WarmupContext<'_>, index: usize) {
        let Some(&(yaw, pitch)) = self.samples.get(index) else {
            self.phase = WarmupPhase::RestoreCamera;
            return;
        };
        ctx.scene.camera.set_orientation(yaw, pitch);
        self.render_logged(ctx, RenderOptions::default());

        let done = index + 1;
        self.progress = (sweep_percent(85, 9, done, self.samples.len()), "render-warmup");
        self.phase = if done < self.samples.len() {
            WarmupPhase::RenderSweep { index: done }
        } else {
            WarmupPhase::RestoreCamera
        };
    }

    fn render_logged(&mut self, ctx: &mut WarmupContext<'_>, options: RenderOptions) {
        match ctx.renderer.render(ctx.scene, options) {
            Ok(()) => self.stats.renders += 1,
            Err(e) => {
                self.stats.render_failures += 1;
                log::warn!("Warmup render failed: {}", e);
            }
        }
    }

    /// Point the camera back along the saved orientation, keeping the
    /// widened frustum
    fn face_home(&self, scene: &mut Scene) {
        if let Some(saved) = &self.saved_camera {
            scene.camera.set_orientation(saved.yaw, saved.pitch);
        }
    }

    fn restore_camera(&mut self, scene: &mut Scene) {
        if let Some(saved) = self.saved_camera.take() {
            scene.camera = saved;
        }
    }

    fn cleanup(&mut self, ctx: &mut SceneContext<'_>) {
        for key in self.throwaways.drain(..) {
            ctx.despawn(key);
        }
    }
}

fn sweep_percent(base: u8, span: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return base + span;
    }
    let fraction = done.min(total) as f32 / total as f32;
    base + (fraction * span as f32).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessParticles, HeadlessRenderer, ParticleProbe, RenderProbe};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        scene: Scene,
        renderer: HeadlessRenderer,
        particles: HeadlessParticles,
        render: Rc<RefCell<RenderProbe>>,
        particle_probe: Rc<RefCell<ParticleProbe>>,
    }

    impl Harness {
        fn new() -> Self {
            let (renderer, render) = HeadlessRenderer::new();
            let (particles, particle_probe) = HeadlessParticles::new();
            let mut scene = Scene::default();
            scene.camera.position = Vec3::new(0.0, 1.7, 0.0);
            scene.camera.set_orientation(0.3, -0.1);
            Self {
                scene,
                renderer,
                particles,
                render,
                particle_probe,
            }
        }

        fn step(&mut self, sequencer: &mut WarmupSequencer) -> WarmupStatus {
            sequencer.step(&mut WarmupContext {
                scene: &mut self.scene,
                renderer: &mut self.renderer,
                particles: &mut self.particles,
            })
        }

        fn run(&mut self, sequencer: &mut WarmupSequencer) -> usize {
            let mut steps = 1;
            while self.step(sequencer) == WarmupStatus::Yield {
                steps += 1;
                assert!(steps < 1000, "warmup never finished");
            }
            steps
        }
    }

    #[test]
    fn test_yaw_step_is_smaller_than_fov() {
        for degrees in [30.0_f32, 60.0, 75.0, 90.0, 110.0, 170.0] {
            let fov = utils::deg_to_rad(degrees);
            let steps = yaw_steps(fov);
            assert!(steps >= MIN_YAW_STEPS);
            assert!(constants::TAU / (steps as f32) < fov, "fov {}", degrees);
        }
    }

    #[test]
    fn test_full_sweep_covers_every_sample() {
        let mut harness = Harness::new();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        let samples = sequencer.samples().len();
        let steps = yaw_steps(utils::deg_to_rad(WarmupConfig::default().widened_fov_degrees));
        assert_eq!(samples, steps * WarmupConfig::default().pitch_degrees.len());

        let render = harness.render.borrow();
        assert_eq!(render.compile_count(), samples);
        // one forced render plus one per sample
        assert_eq!(render.render_count(), samples + 1);
        assert!(!sequencer.stats().used_fallback);
    }

    #[test]
    fn test_compiled_yaws_leave_no_gap_wider_than_fov() {
        let mut harness = Harness::new();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        let render = harness.render.borrow();
        let fov = utils::deg_to_rad(WarmupConfig::default().widened_fov_degrees);
        let mut yaws: Vec<f32> = render
            .compiles
            .iter()
            .filter(|camera| camera.pitch == 0.0)
            .map(|camera| camera.yaw.rem_euclid(constants::TAU))
            .collect();
        yaws.sort_by(f32::total_cmp);
        assert!(yaws.len() >= MIN_YAW_STEPS);
        for pair in yaws.windows(2) {
            assert!(pair[1] - pair[0] < fov);
        }
        let wrap = yaws[0] + constants::TAU - yaws[yaws.len() - 1];
        assert!(wrap < fov);
        assert!(render.compiles.iter().all(|camera| camera.fov_degrees == 110.0));
    }

    #[test]
    fn test_camera_is_restored_exactly() {
        let mut harness = Harness::new();
        let before = harness.scene.camera.clone();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        assert_eq!(harness.scene.camera, before);
        assert_eq!(harness.scene.camera.yaw.to_bits(), before.yaw.to_bits());
        assert_eq!(harness.scene.camera.fov_degrees.to_bits(), before.fov_degrees.to_bits());
    }

    #[test]
    fn test_throwaways_cover_every_kind_and_are_removed() {
        let mut harness = Harness::new();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());

        harness.step(&mut sequencer);
        harness.step(&mut sequencer);
        assert_eq!(sequencer.throwaways().len(), VisualKind::ALL.len());
        for kind in VisualKind::ALL {
            assert_eq!(harness.render.borrow().live_of(kind), 1);
        }
        for key in sequencer.throwaways() {
            let node = harness.scene.get(*key).unwrap();
            assert!(harness.scene.camera.contains_point(&node.position));
        }

        harness.run(&mut sequencer);
        assert_eq!(harness.render.borrow().live_visuals(), 0);
        assert!(harness.scene.is_empty());
    }

    #[test]
    fn test_particles_are_primed_once() {
        let mut harness = Harness::new();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        let particles = harness.particle_probe.borrow();
        assert_eq!(particles.muzzle_flashes, 1);
        assert_eq!(particles.sparks, 1);
        assert_eq!(particles.blood, 1);
        assert_eq!(particles.updates, 1);
    }

    #[test]
    fn test_forced_render_disables_then_restores_culling() {
        let mut harness = Harness::new();
        let existing = {
            let mut ctx = SceneContext::new(&mut harness.scene, &mut harness.renderer);
            ctx.spawn(VisualKind::Hostile, Vec3::new(0.0, 0.0, 30.0)).unwrap()
        };
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        let render = harness.render.borrow();
        let forced = render
            .renders
            .iter()
            .find(|record| record.options.shadow_dirty)
            .unwrap();
        assert_eq!(forced.culled_nodes, 0);
        assert!(forced.node_count > 1);
        assert!(harness.scene.get(existing).unwrap().frustum_culled);
    }

    #[test]
    fn test_compile_failure_falls_back_and_still_finishes() {
        let mut harness = Harness::new();
        harness.render.borrow_mut().fail_compile = true;
        let before = harness.scene.camera.clone();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);

        assert!(sequencer.stats().used_fallback);
        assert!(sequencer.is_finished());
        let render = harness.render.borrow();
        assert_eq!(render.compile_count(), 0);
        assert!(!render.renders[0].options.post_processing);
        assert_eq!(harness.scene.camera, before);
        assert_eq!(render.live_visuals(), 0);
    }

    #[test]
    fn test_missing_async_compile_uses_fallback() {
        let mut harness = Harness::new();
        harness.render.borrow_mut().no_async_compile = true;
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        harness.run(&mut sequencer);
        assert!(sequencer.stats().used_fallback);
    }

    #[test]
    fn test_abort_mid_sweep_restores_and_cleans_up() {
        let mut harness = Harness::new();
        let before = harness.scene.camera.clone();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        for _ in 0..6 {
            harness.step(&mut sequencer);
        }
        assert!(matches!(sequencer.phase(), WarmupPhase::CompileSweep { .. }));

        sequencer.abort(&mut SceneContext::new(&mut harness.scene, &mut harness.renderer));
        assert!(sequencer.is_finished());
        assert_eq!(harness.scene.camera, before);
        assert_eq!(harness.render.borrow().live_visuals(), 0);

        sequencer.abort(&mut SceneContext::new(&mut harness.scene, &mut harness.renderer));
        assert_eq!(harness.step(&mut sequencer), WarmupStatus::Finished);
    }

    #[test]
    fn test_progress_stays_in_warmup_band() {
        let mut harness = Harness::new();
        let mut sequencer = WarmupSequencer::new(&WarmupConfig::default());
        let mut last = 0;
        while harness.step(&mut sequencer) == WarmupStatus::Yield {
            let (percent, _) = sequencer.progress();
            assert!(percent >= last);
            assert!((65..=94).contains(&percent));
            last = percent;
        }
    }
}
