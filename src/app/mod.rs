//! Process-lifetime application context

pub mod state;

pub use state::AppState;
