//! Fixed registry of rooms, one per mode

use serde::Serialize;
use std::collections::BTreeMap;

use super::mode::Mode;
use super::room::Room;

/// Summary of one room for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomStatus {
    pub mode: Mode,
    pub players: usize,
    pub started: bool,
}

/// Owns every room. Built once at startup; rooms are never added or removed.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: BTreeMap<Mode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mode::ALL.into_iter().map(|m| (m, Room::new(m))).collect(),
        }
    }

    pub fn room(&self, mode: Mode) -> &Room {
        // Every mode is inserted in `new`
        &self.rooms[&mode]
    }

    pub fn room_mut(&mut self, mode: Mode) -> &mut Room {
        self.rooms
            .get_mut(&mode)
            .unwrap_or_else(|| unreachable!("room for {mode} is created at startup"))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn rooms_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn status(&self) -> Vec<RoomStatus> {
        self.rooms
            .values()
            .map(|r| RoomStatus {
                mode: r.mode,
                players: r.players.len(),
                started: r.started,
            })
            .collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
