use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_relative_eq;

use super::*;
use crate::collaborators::{PlayerShot, RangedAttack, SoundCue, ThrowRequest};
use crate::headless::{HeadlessProbes, HeadlessRig, STARTING_HEALTH};
use crate::profiling::FrameStage;
use crate::render::VisualKind;

const DT: f32 = 1.0 / 60.0;

type ProgressLog = Rc<RefCell<Vec<(u8, String)>>>;

struct Harness {
    sim: SimulationLoop,
    probes: HeadlessProbes,
    progress: ProgressLog,
    loaded: Rc<Cell<u32>>,
}

impl Harness {
    fn new(config: EngineConfig) -> Self {
        let mut harness = Self::created(config);
        let progress = Rc::clone(&harness.progress);
        let loaded = Rc::clone(&harness.loaded);
        harness
            .sim
            .start(
                Box::new(move |percent, key| progress.borrow_mut().push((percent, key.to_string()))),
                Box::new(move || loaded.set(loaded.get() + 1)),
                RuntimeSettings::default(),
            )
            .unwrap();
        harness
    }

    fn created(config: EngineConfig) -> Self {
        crate::foundation::logging::init_for_tests();
        let rig = HeadlessRig::new(0.0);
        let sim = SimulationLoop::create(Box::new(rig.surface), rig.collaborators, config).unwrap();
        Self {
            sim,
            probes: rig.probes,
            progress: Rc::new(RefCell::new(Vec::new())),
            loaded: Rc::new(Cell::new(0)),
        }
    }

    fn run_until_running(&mut self) {
        for _ in 0..200 {
            if self.sim.state() == LoopState::Running {
                return;
            }
            self.sim.tick(DT).unwrap();
        }
        panic!("loop never reached Running, stuck in {:?}", self.sim.state());
    }

    fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.sim.tick(DT).unwrap();
        }
    }

    fn run_seconds(&mut self, seconds: f32) {
        self.ticks((seconds / DT).round() as usize);
    }

    /// Run until exactly one hostile is alive and return a copy of it
    fn wait_for_hostile(&mut self) -> Hostile {
        for _ in 0..120 {
            if let Some(hostile) = self.sim.hostiles().first() {
                return hostile.clone();
            }
            self.sim.tick(DT).unwrap();
        }
        panic!("no hostile spawned");
    }

    fn keys(&self) -> Vec<String> {
        self.progress.borrow().iter().map(|(_, key)| key.clone()).collect()
    }
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.hitch.enabled = Some(false);
    config
}

/// One hostile, no periodic spawns, no pickups
fn duel_config() -> EngineConfig {
    let mut config = config();
    config.spawn.initial_count = 1;
    config.spawn.max_enemies = 1;
    config.spawn.enemy_interval = 1000.0;
    config.spawn.max_pickups = 0;
    config
}

#[test]
fn test_tick_before_start_does_nothing() {
    let mut harness = Harness::created(config());
    harness.ticks(5);
    assert_eq!(harness.sim.state(), LoopState::Initializing);
    assert_eq!(harness.probes.render.borrow().created, 0);
    assert_eq!(harness.probes.render.borrow().render_count(), 0);
    assert!(harness.sim.stats().initialized.is_empty());
}

#[test]
fn test_start_twice_is_rejected() {
    let mut harness = Harness::new(config());
    let again = harness
        .sim
        .start(Box::new(|_, _| {}), Box::new(|| {}), RuntimeSettings::default());
    assert!(matches!(again, Err(EngineError::AlreadyStarted)));
}

#[test]
fn test_startup_runs_one_stage_per_tick() {
    let mut harness = Harness::new(config());
    harness.sim.tick(DT).unwrap();
    assert_eq!(harness.keys(), vec!["init"]);
    harness.sim.tick(DT).unwrap();
    assert_eq!(harness.keys(), vec!["init", "webgpu-context"]);
    assert!(harness.sim.stats().initialized.contains(Subsystems::RENDERER));
    assert!(!harness.sim.stats().initialized.contains(Subsystems::PHYSICS));
}

#[test]
fn test_progress_is_monotonic_and_ready_comes_with_loaded() {
    let mut harness = Harness::new(config());
    harness.run_until_running();

    let keys = harness.keys();
    let stages = [
        "init",
        "webgpu-context",
        "scene",
        "physics",
        "pathfinding",
        "compute",
        "effects",
        "player",
        "postfx",
        "spawn",
    ];
    assert_eq!(&keys[..stages.len()], &stages);
    let position = |key: &str| keys.iter().position(|k| k == key).unwrap();
    assert!(position("dummy-entities") < position("shader-warmup"));
    assert!(position("shader-warmup") < position("render-warmup"));
    assert!(position("render-warmup") < position("start-loop"));
    assert!(position("start-loop") < position("finalize"));
    assert!(!keys.iter().any(|key| key == "ready"));
    assert_eq!(harness.loaded.get(), 0);

    harness.ticks(20);
    let progress = harness.progress.borrow();
    assert!(progress.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert!(progress.iter().all(|(percent, _)| *percent <= 100));
    assert_eq!(progress.last().unwrap(), &(100, "ready".to_string()));
    assert_eq!(progress.iter().filter(|(_, key)| key == "ready").count(), 1);
    assert_eq!(harness.loaded.get(), 1);
}

#[test]
fn test_loaded_fires_once_after_configured_frames() {
    let mut harness = Harness::new(config());
    harness.run_until_running();

    harness.ticks(7);
    assert_eq!(harness.loaded.get(), 0);
    harness.ticks(1);
    assert_eq!(harness.loaded.get(), 1);
    harness.ticks(12);
    assert_eq!(harness.loaded.get(), 1);
}

#[test]
fn test_warmup_disabled_goes_straight_to_running() {
    let mut config = config();
    config.warmup.enabled = false;
    let mut harness = Harness::new(config);
    harness.ticks(10);
    assert_eq!(harness.sim.state(), LoopState::Running);
    assert!(!harness.keys().iter().any(|key| key == "shader-warmup"));
    assert_eq!(harness.probes.render.borrow().compile_count(), 0);
}

#[test]
fn test_warmup_leaves_no_throwaway_visuals() {
    let mut config = config();
    config.spawn.enabled = false;
    let mut harness = Harness::new(config);
    harness.run_until_running();

    let render = harness.probes.render.borrow();
    assert!(render.compile_count() > 0);
    assert!(render.render_count() > 0);
    assert_eq!(render.live_visuals(), 0);
    assert!(harness.sim.scene().is_empty());
}

#[test]
fn test_hostiles_saturate_at_cap() {
    let mut harness = Harness::new(config());
    harness.run_until_running();
    harness.run_seconds(30.0);
    assert_eq!(harness.sim.hostiles().len(), 10);
    assert_eq!(harness.probes.render.borrow().live_of(VisualKind::Hostile), 10);
    assert_eq!(harness.probes.compute.borrow().active.len(), 10);
}

#[test]
fn test_compute_target_is_fresh_every_update() {
    let mut harness = Harness::new(config());
    harness.run_until_running();
    harness.run_seconds(5.0);
    let compute = harness.probes.compute.borrow();
    assert_eq!(compute.updates, 300);
    assert_eq!(compute.stale_updates, 0);
}

#[test]
fn test_hostile_hit_damages_player_and_flashes() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();
    let trails_before = harness.sim.trails().active_len();

    harness.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
        origin: hostile.center(),
        hit: true,
        damage: 15.0,
    });
    harness.sim.tick(DT).unwrap();

    assert_relative_eq!(harness.probes.game.borrow().health, STARTING_HEALTH - 15.0);
    assert_relative_eq!(
        harness.sim.damage_flash(),
        harness.sim.config().combat.damage_flash_intensity
    );
    assert_eq!(harness.sim.trails().active_len(), trails_before + 1);
    let player = harness.sim.player_position();
    let ends_at_player = harness
        .sim
        .trails()
        .iter()
        .filter(|(_, trail)| trail.segment().1 == player)
        .count();
    assert_eq!(ends_at_player, 1);

    let sound = harness.probes.sound.borrow();
    assert_eq!(sound.count(SoundCue::HostileFire), 1);
    assert_eq!(sound.count(SoundCue::PlayerHurt), 1);
    drop(sound);

    harness.sim.tick(DT).unwrap();
    assert!(harness.sim.damage_flash() < harness.sim.config().combat.damage_flash_intensity);
}

#[test]
fn test_hostile_miss_leaves_health_alone() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();

    harness.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
        origin: hostile.center(),
        hit: false,
        damage: 15.0,
    });
    harness.sim.tick(DT).unwrap();

    assert_relative_eq!(harness.probes.game.borrow().health, STARTING_HEALTH);
    assert_relative_eq!(harness.sim.damage_flash(), 0.0);
    assert_eq!(harness.sim.trails().active_len(), 1);
    let player = harness.sim.player_position();
    assert!(harness.sim.trails().iter().all(|(_, trail)| trail.segment().1 != player));
}

#[test]
fn test_tracers_fade_back_into_pool() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();

    harness.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
        origin: hostile.center(),
        hit: false,
        damage: 0.0,
    });
    harness.sim.tick(DT).unwrap();
    assert_eq!(harness.sim.trails().active_len(), 1);

    harness.run_seconds(1.0);
    assert_eq!(harness.sim.trails().active_len(), 0);
    assert_eq!(harness.sim.trails().pooled_len(), 1);
}

#[test]
fn test_shot_kill_frees_slot_and_node() {
    let mut config = duel_config();
    config.combat.player_shot_damage = 500.0;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();
    assert!(hostile.slot.is_some());
    let flashes = harness.probes.particles.borrow().muzzle_flashes;

    let eye = harness.sim.player_position() + Vec3::y() * harness.sim.config().frame.eye_height;
    harness.probes.player.borrow_mut().queued_shots.push_back(PlayerShot {
        origin: eye,
        direction: hostile.center() - eye,
    });
    harness.sim.tick(DT).unwrap();

    assert!(harness.sim.hostiles().is_empty());
    assert!(harness.probes.compute.borrow().active.is_empty());
    assert_eq!(harness.probes.render.borrow().live_of(VisualKind::Hostile), 0);
    assert_eq!(harness.probes.ai.borrow().forgotten, vec![hostile.id]);
    assert_eq!(harness.probes.game.borrow().score, harness.sim.config().combat.kill_score);
    let sound = harness.probes.sound.borrow();
    assert_eq!(sound.count(SoundCue::PlayerFire), 1);
    assert_eq!(sound.count(SoundCue::HostileDeath), 1);
    assert_eq!(harness.probes.particles.borrow().muzzle_flashes, flashes + 1);
}

#[test]
fn test_shot_into_ground_throws_sparks() {
    let mut config = duel_config();
    config.spawn.enabled = false;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    let sparks = harness.probes.particles.borrow().sparks;

    harness.probes.player.borrow_mut().queued_shots.push_back(PlayerShot {
        origin: Vec3::new(0.0, 1.7, 0.0),
        direction: Vec3::new(0.0, -1.0, -1.0),
    });
    harness.sim.tick(DT).unwrap();

    assert_eq!(harness.probes.particles.borrow().sparks, sparks + 1);
    let (_, trail) = harness.sim.trails().iter().next().unwrap();
    let (_, end) = trail.segment();
    assert_relative_eq!(end.y, 0.0, epsilon = 1e-4);
    assert_relative_eq!(end.z, -1.7, epsilon = 1e-4);
}

#[test]
fn test_explosive_kills_nearby_hostile() {
    let mut config = duel_config();
    config.combat.explosive_damage = 500.0;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();

    harness.probes.player.borrow_mut().queued_throws.push_back(ThrowRequest {
        origin: hostile.position + Vec3::y() * 0.5,
        velocity: Vec3::zeros(),
    });
    harness.sim.tick(DT).unwrap();
    assert_eq!(harness.sim.explosives().active_len(), 1);
    assert_eq!(harness.probes.render.borrow().live_of(VisualKind::Explosive), 1);

    harness.run_seconds(harness.sim.config().combat.explosive_fuse + 0.5);

    assert!(harness.sim.hostiles().is_empty());
    assert_eq!(harness.sim.explosives().active_len(), 0);
    assert_eq!(harness.sim.explosives().pooled_len(), 1);
    assert_eq!(harness.probes.game.borrow().score, harness.sim.config().combat.kill_score);
    let sound = harness.probes.sound.borrow();
    assert_eq!(sound.count(SoundCue::Throw), 1);
    assert_eq!(sound.count(SoundCue::Explosion), 1);
    assert_eq!(harness.probes.particles.borrow().emitted.len(), 1);
}

#[test]
fn test_walking_onto_pickup_collects_it() {
    let mut config = config();
    config.spawn.initial_count = 0;
    config.spawn.max_enemies = 0;
    config.spawn.max_pickups = 1;
    config.spawn.pickup_interval = 0.5;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    harness.run_seconds(0.6);

    let pickup = harness.sim.pickups().first().cloned().unwrap();
    harness.probes.player.borrow_mut().position = pickup.base;
    harness.sim.tick(DT).unwrap();

    assert_eq!(harness.probes.game.borrow().pickups, vec![pickup.kind]);
    assert_eq!(harness.probes.sound.borrow().count(SoundCue::Pickup), 1);
    assert!(!harness.sim.scene().contains(pickup.node));
}

#[test]
fn test_audio_switches_to_combat_once() {
    let mut config = duel_config();
    config.frame.combat_radius = 100.0;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    harness.wait_for_hostile();
    harness.ticks(30);

    assert_eq!(
        harness.probes.sound.borrow().modes,
        vec![AudioMode::Ambient, AudioMode::Combat]
    );
    assert_eq!(harness.sim.stats().audio_mode, Some(AudioMode::Combat));
}

#[test]
fn test_game_over_pauses_everything_but_rendering() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();

    harness.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
        origin: hostile.center(),
        hit: true,
        damage: 250.0,
    });
    harness.sim.tick(DT).unwrap();
    harness.sim.tick(DT).unwrap();
    assert_eq!(harness.sim.state(), LoopState::GameOverPaused);

    let ai_updates = harness.probes.ai.borrow().updates;
    let renders = harness.probes.render.borrow().render_count();
    harness.ticks(10);
    assert_eq!(harness.probes.ai.borrow().updates, ai_updates);
    assert_eq!(harness.probes.render.borrow().render_count(), renders + 10);
    assert_eq!(harness.probes.sound.borrow().count(SoundCue::GameOver), 1);

    harness.sim.reset();
    assert_eq!(harness.sim.state(), LoopState::Running);
    assert!(harness.sim.hostiles().is_empty());
    assert_eq!(harness.probes.game.borrow().resets, 1);
    assert_relative_eq!(harness.probes.game.borrow().health, STARTING_HEALTH);
    harness.ticks(2);
    assert_eq!(harness.sim.state(), LoopState::Running);
}

#[test]
fn test_reset_respawns_initial_wave() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    harness.wait_for_hostile();

    harness.sim.reset();
    assert!(harness.sim.hostiles().is_empty());
    assert_eq!(harness.probes.player.borrow().spawns, 2);
    assert_eq!(harness.probes.render.borrow().live_of(VisualKind::Hostile), 0);
    harness.wait_for_hostile();
}

#[test]
fn test_long_stall_is_clamped() {
    let mut harness = Harness::new(config());
    harness.run_until_running();
    let simulated = harness.probes.physics.borrow().simulated;

    harness.sim.tick(5.0).unwrap();
    let physics = harness.probes.physics.borrow();
    assert_relative_eq!(
        physics.simulated - simulated,
        harness.sim.config().frame.max_delta,
        epsilon = 1e-5
    );
}

#[test]
fn test_uniforms_track_player_and_time() {
    let mut harness = Harness::new(config());
    harness.run_until_running();
    harness.ticks(3);

    let stats = harness.sim.stats();
    let render = harness.probes.render.borrow();
    assert_eq!(render.uniform_writes, 3);
    let uniforms = render.last_uniforms.unwrap();
    assert_relative_eq!(uniforms.player_position_time[3], stats.elapsed, epsilon = 1e-5);
    assert_relative_eq!(uniforms.flash_delta_weather_combat[1], DT, epsilon = 1e-6);
}

#[test]
fn test_shadow_is_redrawn_only_when_dirty() {
    let mut config = config();
    config.spawn.enabled = false;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    harness.ticks(1);
    assert!(harness.probes.render.borrow().renders.last().unwrap().options.shadow_dirty);
    harness.ticks(1);
    assert!(!harness.probes.render.borrow().renders.last().unwrap().options.shadow_dirty);
    assert!(!harness.sim.scene().light.needs_update());
}

#[test]
fn test_refused_pointer_lock_is_not_fatal() {
    let mut harness = Harness::new(config());
    harness.run_until_running();
    harness.probes.surface.borrow_mut().refuse_lock = true;

    harness.sim.lock_pointer();
    assert_eq!(harness.probes.surface.borrow().lock_requests, 1);
    assert!(!harness.probes.surface.borrow().locked);
    harness.ticks(1);
    assert_eq!(harness.sim.state(), LoopState::Running);
}

#[test]
fn test_runtime_settings_reach_player_and_camera() {
    let mut harness = Harness::new(config());
    harness.run_until_running();

    let settings = RuntimeSettings {
        mouse_sensitivity: 2.0,
        fov_degrees: Some(90.0),
        ..RuntimeSettings::default()
    };
    harness.sim.set_runtime_settings(settings.clone());
    assert_eq!(harness.probes.player.borrow().settings.as_ref(), Some(&settings));
    assert_relative_eq!(harness.sim.scene().camera.fov_degrees, 90.0);
}

#[test]
fn test_weather_cycles_through_collaborator() {
    let mut harness = Harness::new(config());
    let first = harness.sim.cycle_weather();
    assert_eq!(harness.sim.stats().weather, first);
}

#[test]
fn test_dispose_mid_warmup_releases_everything() {
    let mut harness = Harness::new(config());
    while harness.sim.state() != LoopState::Warmup {
        harness.sim.tick(DT).unwrap();
    }
    harness.ticks(4);
    assert!(harness.probes.render.borrow().live_visuals() > 0);

    harness.sim.dispose();
    assert_eq!(harness.sim.state(), LoopState::Disposed);
    assert_eq!(harness.probes.render.borrow().live_visuals(), 0);
    assert!(harness.probes.render.borrow().disposed);
    assert!(harness.probes.compute.borrow().disposed);
    assert!(harness.probes.particles.borrow().disposed);

    let renders = harness.probes.render.borrow().render_count();
    harness.ticks(3);
    assert_eq!(harness.probes.render.borrow().render_count(), renders);
    harness.sim.dispose();
    assert_eq!(harness.sim.state(), LoopState::Disposed);
}

/// Open grid that records its own disposal
struct RecordingPathfinder {
    inner: crate::headless::OpenPathfinder,
    disposed: Rc<Cell<bool>>,
}

impl crate::collaborators::Pathfinder for RecordingPathfinder {
    fn is_walkable(&self, position: Vec3) -> bool {
        self.inner.is_walkable(position)
    }

    fn next_waypoint(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        self.inner.next_waypoint(from, to)
    }

    fn dispose(&mut self) -> Result<(), crate::collaborators::CollaboratorError> {
        self.disposed.set(true);
        Ok(())
    }
}

#[test]
fn test_dispose_releases_world_subsystems_and_post_processing() {
    crate::foundation::logging::init_for_tests();
    let mut rig = HeadlessRig::new(0.0);
    let pathfinder_disposed = Rc::new(Cell::new(false));
    rig.collaborators.pathfinder = Box::new(RecordingPathfinder {
        inner: crate::headless::OpenPathfinder::new(100.0),
        disposed: Rc::clone(&pathfinder_disposed),
    });
    let probes = rig.probes;
    let mut sim = SimulationLoop::create(Box::new(rig.surface), rig.collaborators, config()).unwrap();
    sim.start(Box::new(|_, _| {}), Box::new(|| {}), RuntimeSettings::default())
        .unwrap();
    for _ in 0..200 {
        if sim.state() == LoopState::Running {
            break;
        }
        sim.tick(DT).unwrap();
    }
    assert_eq!(sim.state(), LoopState::Running);
    assert!(probes.render.borrow().post_processing);

    sim.dispose();
    assert!(probes.physics.borrow().disposed);
    assert!(pathfinder_disposed.get());
    assert!(!probes.render.borrow().post_processing);
    assert!(probes.render.borrow().disposed);
}

#[test]
fn test_dispose_before_start_leaves_world_subsystems_alone() {
    let mut harness = Harness::created(config());
    harness.sim.dispose();
    assert!(!harness.probes.physics.borrow().disposed);
    assert!(!harness.probes.render.borrow().post_processing);
}

#[test]
fn test_dispose_while_running_releases_pools_and_entities() {
    let mut harness = Harness::new(duel_config());
    harness.run_until_running();
    let hostile = harness.wait_for_hostile();
    harness.probes.player.borrow_mut().queued_throws.push_back(ThrowRequest {
        origin: Vec3::new(0.0, 1.5, 0.0),
        velocity: Vec3::new(0.0, 2.0, -4.0),
    });
    harness.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
        origin: hostile.center(),
        hit: false,
        damage: 0.0,
    });
    harness.sim.tick(DT).unwrap();

    harness.sim.dispose();
    assert_eq!(harness.probes.render.borrow().live_visuals(), 0);
    assert!(harness.probes.compute.borrow().active.is_empty());
    assert!(harness.sim.scene().is_empty());
}

#[test]
fn test_start_after_dispose_is_rejected() {
    let mut harness = Harness::created(config());
    harness.sim.dispose();
    let result = harness
        .sim
        .start(Box::new(|_, _| {}), Box::new(|| {}), RuntimeSettings::default());
    assert!(matches!(result, Err(EngineError::Disposed)));
}

#[test]
fn test_running_tick_times_every_stage() {
    // The environment switch wins over config; only check when it is unset.
    if std::env::var(crate::config::HITCH_ENV_VAR).is_ok() {
        return;
    }
    let mut config = config();
    config.hitch.enabled = Some(true);
    config.hitch.threshold_ms = 0.0;
    let mut harness = Harness::new(config);
    harness.run_until_running();
    harness.ticks(1);

    let report = harness.sim.last_hitch().expect("every frame is over a zero threshold");
    for stage in FrameStage::ALL {
        assert!(report.was_recorded(stage), "{} was not timed", stage.label());
    }
    assert!(harness.sim.stats().hitches >= 1);
}
