//! Startup stages and warmup hand-off

use super::startup::{FINALIZE, START_LOOP};
use super::{EngineError, LoopState, SimulationLoop, StartupStage, Subsystems};
use crate::foundation::math::Vec3;
use crate::warmup::{WarmupContext, WarmupSequencer, WarmupStatus};

impl SimulationLoop {
    /// Run the next startup stage, if `start` has been called
    pub(super) fn advance_startup(&mut self) -> Result<(), EngineError> {
        let Some(stage) = self.startup else {
            log::trace!("Tick before start ignored");
            return Ok(());
        };
        self.progress.report(stage.percent(), stage.key());
        self.run_stage(stage)?;
        self.startup = stage.next();

        if self.startup.is_none() {
            if self.config.warmup.enabled {
                self.warmup = Some(WarmupSequencer::new(&self.config.warmup));
                self.state = LoopState::Warmup;
                log::info!("Startup stages complete; warming up pipelines");
            } else {
                log::info!("Startup stages complete; warmup disabled");
                self.finish_startup();
            }
        }
        Ok(())
    }

    fn run_stage(&mut self, stage: StartupStage) -> Result<(), EngineError> {
        log::debug!("Startup stage '{}'", stage.key());
        match stage {
            StartupStage::Init => {
                log::info!(
                    "Loop config: max delta {:.3}s, loaded after {} frames, hitch profiler {}",
                    self.config.frame.max_delta,
                    self.config.frame.loaded_after_frames,
                    if self.profiler.is_enabled() { "on" } else { "off" }
                );
            }
            StartupStage::Context => {
                let size = self.surface.size();
                self.collab.renderer.initialize(size)?;
                self.initialized |= Subsystems::RENDERER;
            }
            StartupStage::Scene => {
                let (width, height) = self.surface.size();
                if height > 0 {
                    self.scene.camera.set_aspect_ratio(width as f32 / height as f32);
                }
                self.apply_camera_settings();
            }
            StartupStage::Physics => {
                self.collab.physics.initialize()?;
                self.initialized |= Subsystems::PHYSICS;
            }
            StartupStage::Pathfinding => {
                self.collab.pathfinder.initialize(self.collab.terrain.as_ref())?;
                self.initialized |= Subsystems::PATHFINDING;
            }
            StartupStage::Compute => {
                self.collab.compute.initialize()?;
                self.initialized |= Subsystems::COMPUTE;
            }
            StartupStage::Effects => {
                self.collab.particles.initialize()?;
                self.initialized |= Subsystems::PARTICLES;
            }
            StartupStage::Player => {
                self.collab.player.apply_settings(&self.settings);
                self.spawn_player();
            }
            StartupStage::PostFx => {
                self.collab.renderer.configure_post_processing()?;
                self.initialized |= Subsystems::POST_FX;
            }
            StartupStage::Spawn => {
                self.spawns.enable();
            }
        }
        Ok(())
    }

    /// Run one warmup step
    pub(super) fn advance_warmup(&mut self) -> Result<(), EngineError> {
        let Some(sequencer) = self.warmup.as_mut() else {
            self.finish_startup();
            return Ok(());
        };
        let status = sequencer.step(&mut WarmupContext {
            scene: &mut self.scene,
            renderer: self.collab.renderer.as_mut(),
            particles: self.collab.particles.as_mut(),
        });
        let (percent, key) = sequencer.progress();
        self.progress.report(percent, key);

        if status == WarmupStatus::Finished {
            self.warmup = None;
            self.finish_startup();
        }
        Ok(())
    }

    /// Wrap up after warmup and begin running
    fn finish_startup(&mut self) {
        self.progress.report(START_LOOP.0, START_LOOP.1);
        self.shadow.invalidate();
        self.apply_camera_settings();

        self.progress.report(FINALIZE.0, FINALIZE.1);
        self.loaded.arm();
        self.state = LoopState::Running;
        log::info!("Frame loop running");
    }

    /// Put the player on the ground at the configured spawn point and point
    /// the camera from their eyes
    pub(super) fn spawn_player(&mut self) {
        let spawn = Vec3::from(self.config.frame.spawn_point);
        let ground = self.collab.terrain.height_at(spawn.x, spawn.z);
        let position = Vec3::new(spawn.x, ground, spawn.z);
        self.collab.player.spawn(position);
        self.player_position = position;
        self.scene.camera.position = position + Vec3::y() * self.config.frame.eye_height;
        self.scene.camera.set_orientation(0.0, 0.0);
    }
}
