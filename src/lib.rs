//! Dodge! arena server library.
//!
//! Two clients join a room named by its mode, ready up, and the server
//! runs the match: enemy spawning, enemy motion, collision checks and the
//! win/loss decision, broadcasting state to both clients every tick.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod session;
pub mod util;
pub mod ws;
