//! Headless session
//!
//! Drives the frame orchestrator with the in-process collaborators at a fixed
//! 60 Hz step: a scripted player shoots and throws at random, hostiles close
//! in and return fire, the weather cycles, and the game resets after death.
//! Useful for watching startup, pooling and hitch logs without a GPU.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strike_engine::collaborators::{PlayerShot, RangedAttack, ThrowRequest};
use strike_engine::headless::{HeadlessProbes, HeadlessRig};
use strike_engine::prelude::*;

const CONFIG_PATH: &str = "strike.toml";
const STEP: f32 = 1.0 / 60.0;
const SESSION_SECONDS: f32 = 90.0;
const WEATHER_PERIOD: f32 = 20.0;
const STATS_PERIOD: f32 = 5.0;
const RESET_DELAY: f32 = 2.0;

/// Application errors
#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Random player and hostile behaviour on top of the scripted fakes
struct Director {
    rng: StdRng,
    probes: HeadlessProbes,
}

impl Director {
    fn new(probes: HeadlessProbes) -> Self {
        probes.ai.borrow_mut().speed = 3.0;
        Self {
            rng: StdRng::seed_from_u64(7),
            probes,
        }
    }

    fn direct(&mut self, sim: &SimulationLoop) {
        if sim.state() != LoopState::Running {
            return;
        }
        let eye = sim.player_position() + Vec3::y() * sim.config().frame.eye_height;
        let hostiles = sim.hostiles();

        if !hostiles.is_empty() && self.rng.gen_bool(0.04) {
            let target = &hostiles[self.rng.gen_range(0..hostiles.len())];
            let spread = Vec3::new(
                self.rng.gen_range(-0.6..0.6),
                self.rng.gen_range(-0.6..0.6),
                self.rng.gen_range(-0.6..0.6),
            );
            self.probes.player.borrow_mut().queued_shots.push_back(PlayerShot {
                origin: eye,
                direction: target.center() + spread - eye,
            });
        }

        if self.rng.gen_bool(0.005) {
            let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
            self.probes.player.borrow_mut().queued_throws.push_back(ThrowRequest {
                origin: eye,
                velocity: Vec3::new(heading.cos() * 9.0, 4.0, heading.sin() * 9.0),
            });
        }

        for hostile in hostiles {
            if self.rng.gen_bool(0.002) {
                self.probes.ai.borrow_mut().queued_attacks.push_back(RangedAttack {
                    origin: hostile.center(),
                    hit: self.rng.gen_bool(0.4),
                    damage: 8.0,
                });
            }
        }
    }
}

fn load_config() -> EngineConfig {
    if !Path::new(CONFIG_PATH).exists() {
        log::info!("No {} found, using defaults", CONFIG_PATH);
        return EngineConfig::default();
    }
    match EngineConfig::load_from_file(CONFIG_PATH) {
        Ok(config) => {
            log::info!("Loaded {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            log::warn!("Ignoring {}: {}", CONFIG_PATH, e);
            EngineConfig::default()
        }
    }
}

fn run() -> Result<(), AppError> {
    let config = load_config();
    let settings = config.settings.clone();
    let rig = HeadlessRig::new(0.0);
    let mut director = Director::new(rig.probes);
    let mut sim = SimulationLoop::create(Box::new(rig.surface), rig.collaborators, config)?;

    let loaded = Rc::new(Cell::new(false));
    let loaded_flag = Rc::clone(&loaded);
    sim.start(
        Box::new(|percent, key| log::info!("Loading {:>3}% {}", percent, key)),
        Box::new(move || loaded_flag.set(true)),
        settings,
    )?;
    sim.lock_pointer();

    let mut wall = Timer::new();
    let mut weather = IntervalTimer::new(WEATHER_PERIOD);
    let mut report = IntervalTimer::new(STATS_PERIOD);
    let mut paused_for = 0.0;
    let mut simulated = 0.0;

    while simulated < SESSION_SECONDS {
        director.direct(&sim);
        sim.tick(STEP)?;
        wall.update();

        if sim.state() == LoopState::Initializing || sim.state() == LoopState::Warmup {
            continue;
        }
        simulated += STEP;

        weather.advance(STEP);
        if weather.is_ready() {
            weather.consume();
            sim.cycle_weather();
        }

        report.advance(STEP);
        if report.is_ready() {
            report.consume();
            let stats = sim.stats();
            log::info!(
                "t={:.0}s hostiles={} pickups={} tracers={}/{} explosives={}/{} flash={:.2} audio={:?} weather={:?}",
                stats.elapsed,
                stats.hostiles,
                stats.pickups,
                stats.active_trails,
                stats.pooled_trails,
                stats.active_explosives,
                stats.pooled_explosives,
                stats.damage_flash,
                stats.audio_mode,
                stats.weather
            );
        }

        if sim.state() == LoopState::GameOverPaused {
            paused_for += STEP;
            if paused_for >= RESET_DELAY {
                paused_for = 0.0;
                sim.reset();
                sim.lock_pointer();
            }
        }
    }

    let stats = sim.stats();
    log::info!(
        "Session over: {} frames in {:.2}s wall ({:.0} fps), loaded={}, hitches={}, tracer pool {:?}",
        wall.frame_count(),
        wall.total_time(),
        wall.average_fps(),
        loaded.get(),
        stats.hitches,
        stats.trail_pool
    );
    sim.dispose();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    log::info!("Starting headless strike session");
    run()?;
    Ok(())
}
