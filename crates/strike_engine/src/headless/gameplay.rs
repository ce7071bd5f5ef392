//! Scripted game state, player and hostile AI

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::collaborators::{
    GameSnapshot, GameState, HostileAi, HostileId, HostileIntent, HostileView, PlayerController, PlayerShot,
    PlayerUpdate, RangedAttack, ThrowRequest, WorldQueries,
};
use crate::config::RuntimeSettings;
use crate::foundation::math::Vec3;
use crate::render::PickupKind;

/// Health every fresh game starts with
pub const STARTING_HEALTH: f32 = 100.0;

/// Health, score and history of [`HeadlessGameState`]
#[derive(Debug)]
pub struct GameProbe {
    /// Current health
    pub health: f32,
    /// Current score
    pub score: i32,
    /// Pickups collected
    pub pickups: Vec<PickupKind>,
    /// Every health delta applied, in order
    pub health_deltas: Vec<f32>,
    /// Number of resets
    pub resets: u32,
}

impl Default for GameProbe {
    fn default() -> Self {
        Self {
            health: STARTING_HEALTH,
            score: 0,
            pickups: Vec::new(),
            health_deltas: Vec::new(),
            resets: 0,
        }
    }
}

/// In-memory [`GameState`]; the player is dead at zero health
pub struct HeadlessGameState {
    probe: Rc<RefCell<GameProbe>>,
}

impl HeadlessGameState {
    /// Fresh game
    pub fn new() -> (Self, Rc<RefCell<GameProbe>>) {
        let probe = Rc::new(RefCell::new(GameProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl GameState for HeadlessGameState {
    fn snapshot(&self) -> GameSnapshot {
        let probe = self.probe.borrow();
        GameSnapshot {
            health: probe.health,
            game_over: probe.health <= 0.0,
        }
    }

    fn update_health(&mut self, delta: f32) {
        let mut probe = self.probe.borrow_mut();
        probe.health = (probe.health + delta).clamp(0.0, STARTING_HEALTH);
        probe.health_deltas.push(delta);
    }

    fn update_score(&mut self, delta: i32) {
        self.probe.borrow_mut().score += delta;
    }

    fn grant_pickup(&mut self, kind: PickupKind) {
        let mut probe = self.probe.borrow_mut();
        if kind == PickupKind::Health {
            probe.health = (probe.health + 25.0).min(STARTING_HEALTH);
        }
        probe.pickups.push(kind);
    }

    fn reset(&mut self) {
        let mut probe = self.probe.borrow_mut();
        probe.health = STARTING_HEALTH;
        probe.score = 0;
        probe.resets += 1;
    }
}

/// Script and observations for [`ScriptedPlayer`]
#[derive(Debug, Default)]
pub struct PlayerProbe {
    /// Feet position
    pub position: Vec3,
    /// Look yaw
    pub yaw: f32,
    /// Look pitch
    pub pitch: f32,
    /// Horizontal velocity applied every update
    pub velocity: Vec3,
    /// Shots to fire, one per update
    pub queued_shots: VecDeque<PlayerShot>,
    /// Throws to perform, one per update
    pub queued_throws: VecDeque<ThrowRequest>,
    /// Last settings applied
    pub settings: Option<RuntimeSettings>,
    /// Number of `spawn` calls
    pub spawns: u32,
    /// Number of `update` calls
    pub updates: u64,
}

/// [`PlayerController`] that replays a script
pub struct ScriptedPlayer {
    probe: Rc<RefCell<PlayerProbe>>,
}

impl ScriptedPlayer {
    /// Idle player
    pub fn new() -> (Self, Rc<RefCell<PlayerProbe>>) {
        let probe = Rc::new(RefCell::new(PlayerProbe::default()));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl PlayerController for ScriptedPlayer {
    fn spawn(&mut self, position: Vec3) {
        let mut probe = self.probe.borrow_mut();
        probe.position = position;
        probe.yaw = 0.0;
        probe.pitch = 0.0;
        probe.spawns += 1;
    }

    fn apply_settings(&mut self, settings: &RuntimeSettings) {
        self.probe.borrow_mut().settings = Some(settings.clone());
    }

    fn update(&mut self, dt: f32, queries: &WorldQueries<'_>) -> PlayerUpdate {
        let mut probe = self.probe.borrow_mut();
        probe.updates += 1;
        let velocity = probe.velocity;
        let mut position = probe.position + velocity * dt;
        position.y = queries.terrain.height_at(position.x, position.z);
        probe.position = position;
        PlayerUpdate {
            position,
            yaw: probe.yaw,
            pitch: probe.pitch,
            shot: probe.queued_shots.pop_front(),
            throw: probe.queued_throws.pop_front(),
        }
    }
}

/// Script and observations for [`ScriptedHostileAi`]
#[derive(Debug, Default)]
pub struct AiProbe {
    /// Ground speed toward the player
    pub speed: f32,
    /// Hostiles stop approaching inside this distance
    pub stop_distance: f32,
    /// Attacks to perform, one per `update` call, in hostile update order
    pub queued_attacks: VecDeque<RangedAttack>,
    /// Number of `update` calls
    pub updates: u64,
    /// Hostiles the loop told the AI to forget
    pub forgotten: Vec<HostileId>,
}

/// [`HostileAi`] that walks straight at the player and fires on script
pub struct ScriptedHostileAi {
    probe: Rc<RefCell<AiProbe>>,
}

impl ScriptedHostileAi {
    /// Stationary AI that never fires
    pub fn new() -> (Self, Rc<RefCell<AiProbe>>) {
        let probe = Rc::new(RefCell::new(AiProbe {
            stop_distance: 4.0,
            ..AiProbe::default()
        }));
        (
            Self {
                probe: Rc::clone(&probe),
            },
            probe,
        )
    }
}

impl HostileAi for ScriptedHostileAi {
    fn update(&mut self, hostile: &HostileView, player: Vec3, dt: f32, _queries: &WorldQueries<'_>) -> HostileIntent {
        let mut probe = self.probe.borrow_mut();
        probe.updates += 1;

        let mut to_player = player - hostile.position;
        to_player.y = 0.0;
        let distance = to_player.norm();
        let mut position = hostile.position;
        let mut yaw = hostile.yaw;
        if distance > f32::EPSILON {
            yaw = (-to_player.x).atan2(-to_player.z);
            if distance > probe.stop_distance {
                let step = (probe.speed * dt).min(distance - probe.stop_distance);
                position += to_player / distance * step;
            }
        }

        HostileIntent {
            position,
            yaw,
            attack: probe.queued_attacks.pop_front(),
        }
    }

    fn forget(&mut self, id: HostileId) {
        self.probe.borrow_mut().forgotten.push(id);
    }
}
