//! Rate-limited hostile and pickup spawning
//!
//! The first time spawning is enabled a small wave is queued and drained one
//! hostile per real-time cooldown, so startup never pays for the whole wave
//! in one frame. After that, hostiles and pickups each come from their own
//! interval timer, at most one of each per tick, up to their caps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::collaborators::WorldQueries;
use crate::config::SpawnConfig;
use crate::foundation::math::{constants, Vec3};
use crate::foundation::time::IntervalTimer;
use crate::render::PickupKind;

/// Pickups are placed closer than hostiles, on a ring scaled by this factor
const PICKUP_RING_SCALE: f32 = 0.4;

/// Something the loop should create this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnRequest {
    /// Spawn a hostile at a ground position
    Hostile(Vec3),
    /// Spawn a pickup at a ground position
    Pickup(PickupKind, Vec3),
}

/// Live entity counts the scheduler caps against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Population {
    /// Live hostiles
    pub hostiles: usize,
    /// Live pickups
    pub pickups: usize,
}

/// Decides when and where new entities appear
#[derive(Debug)]
pub struct SpawnScheduler {
    config: SpawnConfig,
    rng: StdRng,
    enabled: bool,
    queued_initial: usize,
    initial_cooldown: IntervalTimer,
    hostile_timer: IntervalTimer,
    pickup_timer: IntervalTimer,
    next_pickup: usize,
}

impl SpawnScheduler {
    /// Disabled scheduler; nothing spawns until [`SpawnScheduler::enable`]
    pub fn new(config: &SpawnConfig) -> Self {
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            enabled: false,
            queued_initial: 0,
            initial_cooldown: IntervalTimer::ready(config.initial_cooldown),
            hostile_timer: IntervalTimer::new(config.enemy_interval),
            pickup_timer: IntervalTimer::new(config.pickup_interval),
            next_pickup: 0,
        }
    }

    /// Turn periodic spawning on. The first call queues the initial wave.
    pub fn enable(&mut self) {
        if self.enabled || !self.config.enabled {
            return;
        }
        self.enabled = true;
        self.queued_initial = self.config.initial_count;
        log::info!(
            "Spawning enabled: {} initial hostiles every {:.2}s, then one per {:.1}s up to {}",
            self.queued_initial,
            self.config.initial_cooldown,
            self.config.enemy_interval,
            self.config.max_enemies
        );
    }

    /// Back to the state right after the first enable
    pub fn reset(&mut self) {
        self.initial_cooldown = IntervalTimer::ready(self.config.initial_cooldown);
        self.hostile_timer.reset();
        self.pickup_timer.reset();
        self.next_pickup = 0;
        self.queued_initial = if self.enabled { self.config.initial_count } else { 0 };
    }

    /// Whether spawning is on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Initial hostiles still waiting
    pub fn queued_initial(&self) -> usize {
        self.queued_initial
    }

    /// Advance timers and return what to spawn this tick.
    ///
    /// `real_delta` drives the initial-wave cooldown, `delta` (clamped) the
    /// periodic timers.
    pub fn update(
        &mut self,
        real_delta: f32,
        delta: f32,
        population: Population,
        player: Vec3,
        queries: &WorldQueries<'_>,
    ) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        if !self.enabled {
            return requests;
        }

        self.initial_cooldown.advance(real_delta);
        self.hostile_timer.advance(delta);
        self.pickup_timer.advance(delta);

        if population.hostiles < self.config.max_enemies {
            let from_queue = self.queued_initial > 0;
            let due = if from_queue {
                self.initial_cooldown.is_ready()
            } else {
                self.hostile_timer.is_ready()
            };
            if due {
                let (min, max) = (self.config.spawn_radius_min, self.config.spawn_radius_max);
                if let Some(position) = self.place(player, min, max, queries) {
                    if from_queue {
                        self.initial_cooldown.consume();
                        self.queued_initial -= 1;
                    } else {
                        self.hostile_timer.consume();
                    }
                    requests.push(SpawnRequest::Hostile(position));
                } else {
                    log::debug!("No walkable hostile spawn point found this tick");
                }
            }
        }

        if population.pickups < self.config.max_pickups && self.pickup_timer.is_ready() {
            let min = self.config.spawn_radius_min * PICKUP_RING_SCALE;
            let max = self.config.spawn_radius_max * PICKUP_RING_SCALE;
            if let Some(position) = self.place(player, min, max, queries) {
                self.pickup_timer.consume();
                let kind = PickupKind::ALL[self.next_pickup % PickupKind::ALL.len()];
                self.next_pickup += 1;
                requests.push(SpawnRequest::Pickup(kind, position));
            }
        }

        requests
    }

    /// Random walkable ground point on a ring around `center`
    fn place(&mut self, center: Vec3, min_radius: f32, max_radius: f32, queries: &WorldQueries<'_>) -> Option<Vec3> {
        for _ in 0..self.config.placement_attempts.max(1) {
            let angle = self.rng.gen_range(0.0..constants::TAU);
            let radius = if max_radius > min_radius {
                self.rng.gen_range(min_radius..max_radius)
            } else {
                min_radius
            };
            let x = center.x + angle.cos() * radius;
            let z = center.z + angle.sin() * radius;
            let candidate = Vec3::new(x, queries.terrain.height_at(x, z), z);
            if queries.pathfinder.is_walkable(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils;
    use crate::headless::{FlatTerrain, HeadlessPhysics, OpenPathfinder};

    const DT: f32 = 1.0 / 60.0;

    fn run(
        scheduler: &mut SpawnScheduler,
        seconds: f32,
        population: &mut Population,
        pathfinder: &OpenPathfinder,
    ) -> usize {
        let terrain = FlatTerrain::new(0.0);
        let (physics, _probe) = HeadlessPhysics::new(0.0);
        let queries = WorldQueries {
            terrain: &terrain,
            physics: &physics,
            pathfinder,
        };
        let mut peak = population.hostiles;
        let ticks = (seconds / DT).round() as usize;
        for _ in 0..ticks {
            for request in scheduler.update(DT, DT, *population, Vec3::zeros(), &queries) {
                match request {
                    SpawnRequest::Hostile(_) => population.hostiles += 1,
                    SpawnRequest::Pickup(..) => population.pickups += 1,
                }
            }
            peak = peak.max(population.hostiles);
        }
        peak
    }

    fn config() -> SpawnConfig {
        SpawnConfig {
            max_enemies: 10,
            enemy_interval: 3.0,
            ..SpawnConfig::default()
        }
    }

    #[test]
    fn test_disabled_scheduler_spawns_nothing() {
        let mut scheduler = SpawnScheduler::new(&config());
        let mut population = Population::default();
        run(&mut scheduler, 10.0, &mut population, &OpenPathfinder::new(500.0));
        assert_eq!(population, Population::default());
    }

    #[test]
    fn test_initial_wave_is_staggered() {
        let config = config();
        let mut scheduler = SpawnScheduler::new(&config);
        scheduler.enable();
        let mut population = Population::default();
        let pathfinder = OpenPathfinder::new(500.0);

        run(&mut scheduler, DT, &mut population, &pathfinder);
        assert_eq!(population.hostiles, 1);
        run(&mut scheduler, config.initial_cooldown * 0.5, &mut population, &pathfinder);
        assert_eq!(population.hostiles, 1);
        run(&mut scheduler, config.initial_cooldown * 5.0, &mut population, &pathfinder);
        assert_eq!(population.hostiles, config.initial_count);
        assert_eq!(scheduler.queued_initial(), 0);
    }

    #[test]
    fn test_periodic_spawns_saturate_at_cap() {
        let mut scheduler = SpawnScheduler::new(&config());
        scheduler.enable();
        let mut population = Population::default();
        let peak = run(&mut scheduler, 30.0, &mut population, &OpenPathfinder::new(500.0));
        assert_eq!(population.hostiles, 10);
        assert_eq!(peak, 10);
    }

    #[test]
    fn test_spawns_land_on_ring_around_player() {
        let config = config();
        let mut scheduler = SpawnScheduler::new(&config);
        scheduler.enable();
        let terrain = FlatTerrain::new(2.0);
        let (physics, _probe) = HeadlessPhysics::new(2.0);
        let pathfinder = OpenPathfinder::new(500.0);
        let queries = WorldQueries {
            terrain: &terrain,
            physics: &physics,
            pathfinder: &pathfinder,
        };
        let requests = scheduler.update(DT, DT, Population::default(), Vec3::zeros(), &queries);
        let SpawnRequest::Hostile(position) = requests[0] else {
            panic!("expected a hostile first");
        };
        let distance = utils::ground_distance_squared(&position, &Vec3::zeros()).sqrt();
        assert!(distance >= config.spawn_radius_min - 1e-3);
        assert!(distance <= config.spawn_radius_max + 1e-3);
        assert!((position.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_unwalkable_world_defers_spawn() {
        let mut scheduler = SpawnScheduler::new(&config());
        scheduler.enable();
        let mut population = Population::default();
        run(&mut scheduler, 5.0, &mut population, &OpenPathfinder::new(1.0));
        assert_eq!(population.hostiles, 0);
        assert_eq!(scheduler.queued_initial(), config().initial_count);
    }
}
