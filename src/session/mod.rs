//! Connection sessions and event routing

pub mod service;

pub use service::{
    ConnectionSender, ServiceStatus, SessionCommand, SessionHandle, SessionService, OUTBOUND_QUEUE,
};
