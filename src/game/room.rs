//! Per-mode room state: players, enemies and lifecycle flags

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::drivers::MatchDrivers;
use super::geometry::Rect;
use super::mode::{Mode, ARENA_HEIGHT, ARENA_WIDTH, ENEMY_MAX_SPEED, ENEMY_MIN_SPEED, ENEMY_SIZE};
use super::ConnectionId;

/// A player's authoritative state inside a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub alive: bool,
    pub ready: bool,
}

impl Player {
    /// Fresh player at the mode's start position
    pub fn for_mode(mode: Mode) -> Self {
        let rules = mode.rules();
        Self {
            x: rules.start_x,
            y: rules.start_y,
            width: rules.player_width,
            height: rules.player_height,
            alive: true,
            ready: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Store a client-claimed position, clamped to the arena
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = clamp_axis(x, ARENA_WIDTH - self.width);
        self.y = clamp_axis(y, ARENA_HEIGHT - self.height);
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    // NaN from a hostile client lands on the lower bound
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max.max(0.0))
}

/// A falling square obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

impl Enemy {
    /// New enemy just above the visible area at a random column
    pub fn spawn<R: Rng>(rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0.0..=ARENA_WIDTH - ENEMY_SIZE),
            y: -ENEMY_SIZE,
            speed: rng.gen_range(ENEMY_MIN_SPEED..=ENEMY_MAX_SPEED),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, ENEMY_SIZE, ENEMY_SIZE)
    }

    pub fn is_out_of_bounds(&self) -> bool {
        self.y > ARENA_HEIGHT + ENEMY_SIZE
    }
}

/// Maximum occupants of a room
pub const ROOM_CAPACITY: usize = 2;

/// One arena. Lives for the whole process and cycles lobby -> match -> lobby.
#[derive(Debug)]
pub struct Room {
    pub mode: Mode,
    pub players: HashMap<ConnectionId, Player>,
    pub enemies: Vec<Enemy>,
    pub started: bool,
    pub first_eliminated: Option<ConnectionId>,
    /// Ticks simulated in the current match
    pub ticks: u64,
    generation: u64,
    drivers: Option<MatchDrivers>,
}

impl Room {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            players: HashMap::new(),
            enemies: Vec::new(),
            started: false,
            first_eliminated: None,
            ticks: 0,
            generation: 0,
            drivers: None,
        }
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.players.contains_key(id)
    }

    /// Whether a join from `id` must be turned away
    pub fn is_full_for(&self, id: &ConnectionId) -> bool {
        self.players.len() >= ROOM_CAPACITY && !self.contains(id)
    }

    /// Connections that receive room broadcasts
    pub fn members(&self) -> Vec<ConnectionId> {
        self.players.keys().copied().collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_drivers(&self) -> bool {
        self.drivers.is_some()
    }

    /// Guard for LOBBY -> RUNNING: two players, both ready, not already running
    pub fn can_start(&self) -> bool {
        !self.started
            && self.players.len() == ROOM_CAPACITY
            && self.players.values().all(|p| p.ready)
    }

    /// Generation the next match will run under
    pub fn next_generation(&self) -> u64 {
        self.generation + 1
    }

    /// Enter RUNNING, taking ownership of the match drivers
    pub fn begin_match(&mut self, drivers: MatchDrivers) {
        self.enemies.clear();
        self.first_eliminated = None;
        self.ticks = 0;
        self.generation = drivers.generation();
        self.drivers = Some(drivers);
        self.started = true;
    }

    /// Back to LOBBY. Drops the drivers, which stops them.
    pub fn reset(&mut self) {
        self.drivers = None;
        self.enemies.clear();
        self.first_eliminated = None;
        self.ticks = 0;
        self.started = false;

        let defaults = Player::for_mode(self.mode);
        for player in self.players.values_mut() {
            player.alive = true;
            player.ready = false;
            player.x = defaults.x;
            player.y = defaults.y;
        }
    }

    /// Move every enemy down by its speed and drop the ones past the bottom
    pub fn advance_enemies(&mut self) {
        for enemy in &mut self.enemies {
            enemy.y += enemy.speed;
        }
        self.enemies.retain(|e| !e.is_out_of_bounds());
    }

    /// Mark every living player touching an enemy as dead.
    /// Returns the newly eliminated connections.
    pub fn eliminate_colliding(&mut self) -> Vec<ConnectionId> {
        let enemies = &self.enemies;
        let mut eliminated = Vec::new();

        for (id, player) in self.players.iter_mut() {
            if !player.alive {
                continue;
            }
            let bounds = player.bounds();
            if enemies.iter().any(|e| bounds.intersects(&e.bounds())) {
                player.alive = false;
                eliminated.push(*id);
            }
        }

        eliminated
    }

    /// The occupant that is not `id`, if any
    pub fn opponent_of(&self, id: &ConnectionId) -> Option<ConnectionId> {
        self.players.keys().find(|k| *k != id).copied()
    }
}
