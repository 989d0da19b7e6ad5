//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": <name>, "data": {...}}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::game::{Enemy, Mode, Player};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMsg {
    /// Join the lobby of the room for `mode`
    #[serde(rename = "joinLobby")]
    JoinLobby {
        #[serde(default)]
        mode: String,
    },

    /// Toggle readiness in a room's lobby
    #[serde(rename = "setReady")]
    SetReady {
        #[serde(default)]
        mode: String,
        ready: bool,
    },

    /// Client-claimed position during a match
    #[serde(rename = "playerMove")]
    PlayerMove {
        #[serde(default)]
        mode: String,
        x: f32,
        y: f32,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMsg {
    /// Sent once after connection with the client's own id
    #[serde(rename = "welcome")]
    Welcome { id: Uuid },

    /// Join accepted (to requester)
    #[serde(rename = "joined")]
    Joined { mode: Mode },

    /// Join rejected, room already has two players (to requester)
    #[serde(rename = "room_full")]
    RoomFull { mode: Mode },

    /// Lobby snapshot (to room)
    #[serde(rename = "lobby")]
    Lobby {
        mode: Mode,
        players: HashMap<Uuid, Player>,
        started: bool,
    },

    /// Match began (to room)
    #[serde(rename = "matchStart")]
    MatchStart {
        mode: Mode,
        players: HashMap<Uuid, Player>,
        enemies: Vec<Enemy>,
    },

    /// Simulation state, every tick while running (to room)
    #[serde(rename = "stateUpdate")]
    StateUpdate {
        players: HashMap<Uuid, Player>,
        enemies: Vec<Enemy>,
    },

    /// This connection was eliminated first
    #[serde(rename = "you_lost")]
    YouLost {},

    /// This connection won the match
    #[serde(rename = "you_won")]
    YouWon {},

    /// The match is over (to room)
    #[serde(rename = "matchOver")]
    MatchOver {},
}

impl ServerMsg {
    /// Event name on the wire
    pub fn event(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Joined { .. } => "joined",
            Self::RoomFull { .. } => "room_full",
            Self::Lobby { .. } => "lobby",
            Self::MatchStart { .. } => "matchStart",
            Self::StateUpdate { .. } => "stateUpdate",
            Self::YouLost {} => "you_lost",
            Self::YouWon {} => "you_won",
            Self::MatchOver {} => "matchOver",
        }
    }
}
