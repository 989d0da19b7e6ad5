//! WebSocket transport: wire protocol and connection handler

pub mod handler;
pub mod protocol;

pub use handler::ws_handler;
