//! Running-tick stages

use super::frame::{FrameContext, Hostile, Pickup};
use super::spawn::{Population, SpawnRequest};
use super::startup::READY;
use super::{EngineError, LoopState, SimulationLoop};
use crate::collaborators::{
    AudioMode, EmitSpec, HostileId, PlayerShot, RangedAttack, SoundCue, ThrowRequest, WorldQueries,
};
use crate::effects::{ExplosiveParams, TrailParams};
use crate::foundation::math::{utils, Vec3};
use crate::profiling::{EntityCounts, FrameStage};
use crate::render::{GlobalUniforms, PickupKind, RenderOptions, SceneContext, VisualKind};

/// Height above the player's feet where hostile fire lands
const PLAYER_HIT_HEIGHT: f32 = 1.2;

/// Sideways distance a missed hostile shot passes the player by
const HOSTILE_MISS_OFFSET: f32 = 1.5;

impl SimulationLoop {
    pub(super) fn run_frame(&mut self, raw_delta: f32) -> Result<(), EngineError> {
        let mut frame = FrameContext::new(
            raw_delta,
            self.config.frame.max_delta,
            self.player_position,
            self.collab.game_state.snapshot(),
        );
        self.elapsed += frame.delta;
        self.frames += 1;

        if frame.game.game_over {
            self.enter_game_over();
        }
        if self.state == LoopState::GameOverPaused {
            self.render()?;
            self.present();
            return Ok(());
        }

        self.profiler.begin_frame();

        let t = self.profiler.stage_start();
        self.update_player(&mut frame)?;
        self.profiler.stage_end(FrameStage::Player, t);

        self.shadow
            .update(&frame.player_position, frame.delta, &mut self.scene.light);

        let t = self.profiler.stage_start();
        self.write_uniforms(&frame);
        self.profiler.stage_end(FrameStage::Uniforms, t);

        let t = self.profiler.stage_start();
        self.collab.compute.set_target(frame.player_position);
        self.collab.compute.update(frame.delta);
        self.profiler.stage_end(FrameStage::Compute, t);

        let t = self.profiler.stage_start();
        self.collab.particles.update(frame.delta);
        self.profiler.stage_end(FrameStage::Particles, t);

        let t = self.profiler.stage_start();
        self.collab.weather.update(frame.delta, frame.player_position);
        self.profiler.stage_end(FrameStage::Weather, t);

        self.collab.level.update_lod(frame.player_position);

        let t = self.profiler.stage_start();
        self.update_pickups(&frame);
        self.profiler.stage_end(FrameStage::Pickups, t);

        let t = self.profiler.stage_start();
        self.update_hostiles(&frame)?;
        self.profiler.stage_end(FrameStage::Enemies, t);

        let t = self.profiler.stage_start();
        self.update_trails(frame.delta);
        self.profiler.stage_end(FrameStage::Trails, t);

        let t = self.profiler.stage_start();
        self.update_explosives(frame.delta);
        self.profiler.stage_end(FrameStage::Explosives, t);

        self.decay_damage_flash(frame.delta);
        self.run_spawns(&frame)?;

        let t = self.profiler.stage_start();
        self.render()?;
        self.profiler.stage_end(FrameStage::Render, t);

        let counts = EntityCounts {
            hostiles: self.hostiles.len(),
            pickups: self.pickups.len(),
            trails: self.trails.active_len(),
            explosives: self.explosives.active_len(),
        };
        if let Some(report) = self.profiler.end_frame(counts) {
            self.last_hitch = Some(report);
        }

        self.present();
        Ok(())
    }

    fn enter_game_over(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        self.state = LoopState::GameOverPaused;
        log::info!("Player died after {:.1}s; gameplay paused", self.elapsed);
        self.collab.sound.play(SoundCue::GameOver, None);
        self.unlock_pointer();
    }

    /// Count a presented frame toward the loaded signal
    fn present(&mut self) {
        if self.loaded.frame_presented() {
            self.progress.report(READY.0, READY.1);
            log::info!("Loaded after {} frames", self.frames);
        }
    }

    fn update_player(&mut self, frame: &mut FrameContext) -> Result<(), EngineError> {
        self.collab.physics.step(frame.delta);
        let queries = WorldQueries {
            terrain: self.collab.terrain.as_ref(),
            physics: self.collab.physics.as_ref(),
            pathfinder: self.collab.pathfinder.as_ref(),
        };
        let update = self.collab.player.update(frame.delta, &queries);

        self.player_position = update.position;
        frame.player_position = update.position;
        self.scene.camera.position = update.position + Vec3::y() * self.config.frame.eye_height;
        self.scene.camera.set_orientation(update.yaw, update.pitch);

        if let Some(shot) = update.shot {
            self.fire_shot(shot)?;
        }
        if let Some(throw) = update.throw {
            self.throw_explosive(throw)?;
        }
        Ok(())
    }

    fn fire_shot(&mut self, shot: PlayerShot) -> Result<(), EngineError> {
        let Some(direction) = shot.direction.try_normalize(f32::EPSILON) else {
            return Ok(());
        };
        let origin = shot.origin;
        let range = self.config.combat.player_shot_range;

        self.collab.particles.emit_muzzle_flash(origin, direction);
        self.collab.sound.play(SoundCue::PlayerFire, Some(origin));

        let wall = self.collab.physics.raycast(origin, direction, range);
        let reach = wall.map_or(range, |hit| hit.distance);
        let radius = self.config.combat.hostile_hit_radius;
        let target = self
            .hostiles
            .iter()
            .enumerate()
            .filter(|(_, hostile)| !hostile.is_dead())
            .filter_map(|(index, hostile)| {
                utils::ray_sphere_distance(&origin, &direction, &hostile.center(), radius)
                    .filter(|distance| *distance <= reach)
                    .map(|distance| (index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let end = if let Some((index, distance)) = target {
            let point = origin + direction * distance;
            self.hostiles[index].health -= self.config.combat.player_shot_damage;
            self.collab.particles.emit_blood(point, direction);
            point
        } else if let Some(hit) = wall {
            self.collab.particles.emit_sparks(hit.point, hit.normal);
            hit.point
        } else {
            origin + direction * range
        };

        self.spawn_tracer(origin, end)
    }

    fn throw_explosive(&mut self, throw: ThrowRequest) -> Result<(), EngineError> {
        let params = ExplosiveParams {
            origin: throw.origin,
            velocity: throw.velocity,
            fuse: self.config.combat.explosive_fuse,
        };
        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        self.explosives.acquire(&mut ctx, &params)?;
        self.collab.sound.play(SoundCue::Throw, Some(throw.origin));
        Ok(())
    }

    fn spawn_tracer(&mut self, start: Vec3, end: Vec3) -> Result<(), EngineError> {
        let params = TrailParams {
            start,
            end,
            fade_seconds: self.config.combat.tracer_fade,
        };
        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        self.trails.acquire(&mut ctx, &params)?;
        Ok(())
    }

    fn write_uniforms(&mut self, frame: &FrameContext) {
        let p = frame.player_position;
        let forward = self.scene.camera.forward();
        let uniforms = GlobalUniforms {
            player_position_time: [p.x, p.y, p.z, self.elapsed],
            camera_forward_fov: [forward.x, forward.y, forward.z, self.scene.camera.fov_radians()],
            flash_delta_weather_combat: [
                self.damage_flash,
                frame.delta,
                self.collab.weather.intensity(),
                if self.in_combat { 1.0 } else { 0.0 },
            ],
        };
        self.collab
            .renderer
            .write_global_uniforms(bytemuck::bytes_of(&uniforms));
    }

    fn update_pickups(&mut self, frame: &FrameContext) {
        let radius_sq = self.config.combat.pickup_radius * self.config.combat.pickup_radius;
        let mut collected = Vec::new();
        for (index, pickup) in self.pickups.iter_mut().enumerate() {
            let (position, yaw) = pickup.animate(frame.delta);
            if let Some(node) = self.scene.get_mut(pickup.node) {
                node.position = position;
                node.yaw = yaw;
            }
            if utils::ground_distance_squared(&pickup.base, &frame.player_position) <= radius_sq {
                collected.push(index);
            }
        }

        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        for index in collected.into_iter().rev() {
            let pickup = self.pickups.swap_remove(index);
            self.collab.game_state.grant_pickup(pickup.kind);
            self.collab.sound.play(SoundCue::Pickup, Some(pickup.base));
            ctx.despawn(pickup.node);
            log::debug!("Collected {:?}", pickup.kind);
        }
    }

    fn update_hostiles(&mut self, frame: &FrameContext) -> Result<(), EngineError> {
        let player = frame.player_position;
        let mut attacks = Vec::new();
        {
            let queries = WorldQueries {
                terrain: self.collab.terrain.as_ref(),
                physics: self.collab.physics.as_ref(),
                pathfinder: self.collab.pathfinder.as_ref(),
            };
            for hostile in self.hostiles.iter_mut().filter(|hostile| !hostile.is_dead()) {
                let intent = self
                    .collab
                    .hostile_ai
                    .update(&hostile.view(), player, frame.delta, &queries);
                let ground = queries
                    .physics
                    .ground_below(intent.position)
                    .unwrap_or_else(|| queries.terrain.height_at(intent.position.x, intent.position.z));
                hostile.position = Vec3::new(intent.position.x, ground, intent.position.z);
                hostile.yaw = intent.yaw;
                if let Some(node) = self.scene.get_mut(hostile.node) {
                    node.position = hostile.position;
                    node.yaw = hostile.yaw;
                }
                if let Some(attack) = intent.attack {
                    attacks.push(attack);
                }
            }
        }

        for attack in attacks {
            self.resolve_attack(attack, player)?;
        }

        let mut index = 0;
        while index < self.hostiles.len() {
            if self.hostiles[index].is_dead() {
                let hostile = self.hostiles.swap_remove(index);
                self.retire_hostile(hostile, true);
            } else {
                index += 1;
            }
        }

        self.update_audio_mode(player);
        Ok(())
    }

    /// Tracer, damage, flash and particles for one hostile shot
    fn resolve_attack(&mut self, attack: RangedAttack, player: Vec3) -> Result<(), EngineError> {
        self.collab.sound.play(SoundCue::HostileFire, Some(attack.origin));
        if !attack.hit {
            let mut to_player = player - attack.origin;
            to_player.y = 0.0;
            let side = to_player
                .try_normalize(f32::EPSILON)
                .map_or(Vec3::x(), |dir| Vec3::new(-dir.z, 0.0, dir.x));
            let miss = player + Vec3::y() * PLAYER_HIT_HEIGHT + side * HOSTILE_MISS_OFFSET;
            return self.spawn_tracer(attack.origin, miss);
        }

        self.spawn_tracer(attack.origin, player)?;
        self.collab.game_state.update_health(-attack.damage);
        self.damage_flash = self.config.combat.damage_flash_intensity;
        self.flash_set_this_tick = true;
        let impact = player + Vec3::y() * PLAYER_HIT_HEIGHT;
        let direction = (impact - attack.origin)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::y);
        self.collab.particles.emit_blood(impact, direction);
        self.collab.sound.play(SoundCue::PlayerHurt, Some(player));
        log::debug!("Player hit for {:.1}", attack.damage);
        Ok(())
    }

    /// Remove a hostile. The compute slot goes first so the compute pass
    /// never sees a freed entity.
    pub(super) fn retire_hostile(&mut self, hostile: Hostile, killed: bool) {
        if let Some(slot) = hostile.slot {
            self.collab.compute.deactivate_slot(slot);
        }
        SceneContext::new(&mut self.scene, self.collab.renderer.as_mut()).despawn(hostile.node);
        self.collab.hostile_ai.forget(hostile.id);

        if killed {
            self.collab.game_state.update_score(self.config.combat.kill_score);
            self.collab.sound.play(SoundCue::HostileDeath, Some(hostile.position));
            self.collab.particles.emit_blood(hostile.center(), Vec3::y());
            log::debug!("Hostile {} killed", hostile.id.0);
        }
    }

    fn update_audio_mode(&mut self, player: Vec3) {
        let radius_sq = self.config.frame.combat_radius * self.config.frame.combat_radius;
        self.in_combat = self
            .hostiles
            .iter()
            .any(|hostile| utils::ground_distance_squared(&hostile.position, &player) <= radius_sq);
        let mode = if self.in_combat {
            AudioMode::Combat
        } else {
            AudioMode::Ambient
        };
        if self.audio_mode != Some(mode) {
            self.collab.sound.set_mode(mode);
            self.audio_mode = Some(mode);
        }
    }

    fn update_trails(&mut self, delta: f32) {
        for (_, trail) in self.trails.iter_mut() {
            trail.update(delta, &mut self.scene);
        }
        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        self.trails.release_where(&mut ctx, |trail| trail.is_finished());
    }

    fn update_explosives(&mut self, delta: f32) {
        let mut detonations = Vec::new();
        for (_, explosive) in self.explosives.iter_mut() {
            if let Some(point) = explosive.update(delta, self.collab.terrain.as_ref(), &mut self.scene) {
                detonations.push(point);
            }
        }
        for point in detonations {
            self.detonate(point);
        }
        let mut ctx = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut());
        self.explosives
            .release_where(&mut ctx, |explosive| explosive.has_detonated());
    }

    /// Area damage with linear falloff; deaths are collected next hostile
    /// stage
    fn detonate(&mut self, point: Vec3) {
        let radius = self.config.combat.explosive_radius;
        let damage = self.config.combat.explosive_damage;
        let mut hit = 0;
        for hostile in self.hostiles.iter_mut().filter(|hostile| !hostile.is_dead()) {
            let distance = (hostile.center() - point).norm();
            if distance < radius {
                hostile.health -= damage * (1.0 - distance / radius);
                hit += 1;
            }
        }
        self.collab.particles.emit(&EmitSpec::explosion(point));
        self.collab.sound.play(SoundCue::Explosion, Some(point));
        log::debug!("Explosive detonated, {} hostiles in radius", hit);
    }

    fn decay_damage_flash(&mut self, delta: f32) {
        if self.flash_set_this_tick {
            self.flash_set_this_tick = false;
            return;
        }
        self.damage_flash = (self.damage_flash - self.config.combat.damage_flash_decay * delta).max(0.0);
    }

    fn run_spawns(&mut self, frame: &FrameContext) -> Result<(), EngineError> {
        let population = Population {
            hostiles: self.hostiles.len(),
            pickups: self.pickups.len(),
        };
        let requests = {
            let queries = WorldQueries {
                terrain: self.collab.terrain.as_ref(),
                physics: self.collab.physics.as_ref(),
                pathfinder: self.collab.pathfinder.as_ref(),
            };
            self.spawns
                .update(frame.real_delta(), frame.delta, population, frame.player_position, &queries)
        };
        for request in requests {
            match request {
                SpawnRequest::Hostile(position) => self.spawn_hostile(position)?,
                SpawnRequest::Pickup(kind, position) => self.spawn_pickup(kind, position)?,
            }
        }
        Ok(())
    }

    fn spawn_hostile(&mut self, position: Vec3) -> Result<(), EngineError> {
        let node = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut())
            .spawn(VisualKind::Hostile, position)?;
        let slot = self.collab.compute.allocate_slot(position);
        if slot.is_none() {
            log::debug!("No compute slot for new hostile; it will not be GPU-simulated");
        }
        self.next_hostile_id += 1;
        self.hostiles.push(Hostile {
            id: HostileId(self.next_hostile_id),
            node,
            position,
            yaw: 0.0,
            health: self.config.spawn.enemy_health,
            slot,
        });
        Ok(())
    }

    fn spawn_pickup(&mut self, kind: PickupKind, position: Vec3) -> Result<(), EngineError> {
        let node = SceneContext::new(&mut self.scene, self.collab.renderer.as_mut())
            .spawn(VisualKind::Pickup(kind), position)?;
        self.pickups.push(Pickup::new(kind, node, position));
        Ok(())
    }

    fn render(&mut self) -> Result<(), EngineError> {
        let options = RenderOptions {
            post_processing: true,
            shadow_dirty: self.scene.light.needs_update(),
        };
        self.collab.renderer.render(&self.scene, options)?;
        if options.shadow_dirty {
            self.scene.light.mark_rendered();
        }
        Ok(())
    }
}
