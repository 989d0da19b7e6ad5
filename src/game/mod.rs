//! Game simulation modules

pub mod drivers;
pub mod engine;
pub mod geometry;
pub mod mode;
pub mod registry;
pub mod room;

pub use drivers::{DriverEvent, DriverKind, DriverScheduler, MatchDrivers, TokioScheduler};
pub use engine::{MatchEngine, Outbound, Recipient};
pub use mode::Mode;
pub use registry::{RoomRegistry, RoomStatus};
pub use room::{Enemy, Player, Room};

use uuid::Uuid;

/// Opaque id of one client connection, used as the player key
pub type ConnectionId = Uuid;
