//! HTTP surface: liveness, health and the WebSocket upgrade route

pub mod routes;

pub use routes::build_router;
