//! Authoritative match engine
//!
//! Owns the room registry and applies every state change: lobby joins,
//! readiness, moves, disconnects and the tick/spawn driver firings. The
//! engine is plain synchronous code; the session service feeds it one
//! command at a time and delivers whatever it queued in its [`Outbox`].
//!
//! Room lifecycle:
//!
//! ```text
//!  LOBBY --(2 players, both ready)--> RUNNING
//!    ^                                   |
//!    +----(second elimination, leave, ---+
//!          or time limit)
//! ```

use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use crate::ws::protocol::ServerMsg;

use super::drivers::{DriverEvent, DriverKind, DriverScheduler};
use super::mode::Mode;
use super::registry::RoomRegistry;
use super::room::{Enemy, Player, Room};
use super::ConnectionId;

/// Who an outbound message is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A single connection (directed notice)
    Connection(ConnectionId),
    /// Every member of a room, resolved when the message was queued
    Room {
        mode: Mode,
        members: Vec<ConnectionId>,
    },
}

impl Recipient {
    pub fn targets(&self) -> &[ConnectionId] {
        match self {
            Self::Connection(id) => std::slice::from_ref(id),
            Self::Room { members, .. } => members,
        }
    }

    pub fn includes(&self, id: &ConnectionId) -> bool {
        self.targets().contains(id)
    }
}

/// A message queued by the engine for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMsg,
}

/// Messages produced while handling one command, in emission order
#[derive(Debug, Default)]
pub struct Outbox {
    queued: Vec<Outbound>,
}

impl Outbox {
    fn direct(&mut self, id: ConnectionId, msg: ServerMsg) {
        self.queued.push(Outbound {
            to: Recipient::Connection(id),
            msg,
        });
    }

    fn broadcast(&mut self, room: &Room, msg: ServerMsg) {
        self.queued.push(Outbound {
            to: Recipient::Room {
                mode: room.mode,
                members: room.members(),
            },
            msg,
        });
    }

    fn take(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.queued)
    }
}

fn lobby_msg(room: &Room) -> ServerMsg {
    ServerMsg::Lobby {
        mode: room.mode,
        players: room.players.clone(),
        started: room.started,
    }
}

fn state_msg(room: &Room) -> ServerMsg {
    ServerMsg::StateUpdate {
        players: room.players.clone(),
        enemies: room.enemies.clone(),
    }
}

/// Announce the result and put the room back into its lobby.
/// `winner` is `None` for a draw.
fn finish_match(room: &mut Room, outbox: &mut Outbox, winner: Option<ConnectionId>) {
    if let Some(winner) = winner {
        outbox.direct(winner, ServerMsg::YouWon {});
    }
    outbox.broadcast(room, ServerMsg::MatchOver {});
    room.reset();

    match winner {
        Some(winner) => info!(mode = %room.mode, winner = %winner, "Match over"),
        None => info!(mode = %room.mode, "Match over without a winner"),
    }
}

fn resolve_mode(name: &str) -> Mode {
    let mode = Mode::from_name(name);
    if name != mode.as_str() {
        debug!(requested = name, mode = %mode, "Unknown mode, using default");
    }
    mode
}

/// The state machine over all rooms
pub struct MatchEngine {
    registry: RoomRegistry,
    scheduler: Box<dyn DriverScheduler>,
    rng: ChaCha8Rng,
    /// Ticks after which a running match is ended, if set
    tick_limit: Option<u64>,
    outbox: Outbox,
}

impl MatchEngine {
    pub fn new(scheduler: Box<dyn DriverScheduler>, rng: ChaCha8Rng) -> Self {
        Self {
            registry: RoomRegistry::new(),
            scheduler,
            rng,
            tick_limit: None,
            outbox: Outbox::default(),
        }
    }

    /// End matches after `limit` ticks (`None` = run until resolved)
    pub fn with_tick_limit(mut self, limit: Option<u64>) -> Self {
        self.tick_limit = limit;
        self
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Take everything queued since the last call
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        self.outbox.take()
    }

    /// `joinLobby`: claim a seat in the room for `mode_name`
    pub fn join(&mut self, id: ConnectionId, mode_name: &str) {
        let mode = resolve_mode(mode_name);
        let room = self.registry.room_mut(mode);

        if room.is_full_for(&id) {
            info!(mode = %mode, conn_id = %id, "Room full, join rejected");
            self.outbox.direct(id, ServerMsg::RoomFull { mode });
            return;
        }

        if room.started {
            // Only a current occupant gets here; their match state is kept
            debug!(mode = %mode, conn_id = %id, "Rejoin during match");
        } else {
            room.players.insert(id, Player::for_mode(mode));
            info!(
                mode = %mode,
                conn_id = %id,
                player_count = room.players.len(),
                "Player joined lobby"
            );
        }

        self.outbox.direct(id, ServerMsg::Joined { mode });
        self.outbox.broadcast(room, lobby_msg(room));
    }

    /// `setReady`: update readiness, then try to start the match
    pub fn set_ready(&mut self, id: ConnectionId, mode_name: &str, ready: bool) {
        let mode = resolve_mode(mode_name);
        let room = self.registry.room_mut(mode);

        let Some(player) = room.players.get_mut(&id) else {
            debug!(mode = %mode, conn_id = %id, "Ready from connection not in room");
            return;
        };
        player.ready = ready;

        self.outbox.broadcast(room, lobby_msg(room));
        self.try_start(mode);
    }

    /// `playerMove`: store a clamped position while the match runs
    pub fn move_player(&mut self, id: ConnectionId, mode_name: &str, x: f32, y: f32) {
        let mode = resolve_mode(mode_name);
        let room = self.registry.room_mut(mode);

        if !room.started {
            trace!(mode = %mode, conn_id = %id, "Move outside of a match");
            return;
        }
        match room.players.get_mut(&id) {
            Some(player) => player.move_to(x, y),
            None => trace!(mode = %mode, conn_id = %id, "Move from connection not in room"),
        }
    }

    /// Connection closed: drop its player from every room it sat in
    pub fn disconnect(&mut self, id: ConnectionId) {
        let outbox = &mut self.outbox;

        for room in self.registry.rooms_mut() {
            if room.players.remove(&id).is_none() {
                continue;
            }
            info!(mode = %room.mode, conn_id = %id, "Player left room");

            if room.started {
                let survivor = if room.players.len() == 1 {
                    room.players.keys().next().copied()
                } else {
                    None
                };
                finish_match(room, outbox, survivor);
            } else {
                outbox.broadcast(room, lobby_msg(room));
            }
        }
    }

    /// LOBBY -> RUNNING if the room's guard holds
    fn try_start(&mut self, mode: Mode) {
        let room = self.registry.room_mut(mode);
        if !room.can_start() {
            return;
        }

        let drivers = self.scheduler.start(mode, room.next_generation());
        room.begin_match(drivers);

        info!(mode = %mode, generation = room.generation(), "Match started");
        self.outbox.broadcast(
            room,
            ServerMsg::MatchStart {
                mode,
                players: room.players.clone(),
                enemies: room.enemies.clone(),
            },
        );
    }

    /// Apply a driver firing if it belongs to the room's current match
    pub fn on_driver(&mut self, event: DriverEvent) {
        let room = self.registry.room(event.mode);
        if !room.started || room.generation() != event.generation {
            trace!(mode = %event.mode, generation = event.generation, "Stale driver firing");
            return;
        }

        match event.kind {
            DriverKind::Tick => self.tick(event.mode),
            DriverKind::Spawn => self.spawn_enemy(event.mode),
        }
    }

    /// Spawn driver body: one new enemy above the arena
    pub fn spawn_enemy(&mut self, mode: Mode) {
        let room = self.registry.room_mut(mode);
        if !room.started {
            return;
        }
        room.enemies.push(Enemy::spawn(&mut self.rng));
    }

    /// Tick driver body: move enemies, collide, adjudicate, broadcast
    pub fn tick(&mut self, mode: Mode) {
        let room = self.registry.room_mut(mode);
        if !room.started {
            return;
        }

        room.ticks += 1;
        room.advance_enemies();

        // Some(winner) once the match is decided; inner None is a draw
        let mut outcome: Option<Option<ConnectionId>> = None;

        for id in room.eliminate_colliding() {
            match room.first_eliminated {
                None => {
                    room.first_eliminated = Some(id);
                    info!(mode = %mode, conn_id = %id, "Player eliminated first");
                    self.outbox.direct(id, ServerMsg::YouLost {});
                }
                Some(first) => {
                    outcome = Some(room.opponent_of(&first));
                    break;
                }
            }
        }

        if outcome.is_none() && self.tick_limit.is_some_and(|limit| room.ticks >= limit) {
            info!(mode = %mode, ticks = room.ticks, "Match time limit reached");
            outcome = Some(room.first_eliminated.and_then(|f| room.opponent_of(&f)));
        }

        self.outbox.broadcast(room, state_msg(room));

        if let Some(winner) = outcome {
            finish_match(room, &mut self.outbox, winner);
        }
    }
}
