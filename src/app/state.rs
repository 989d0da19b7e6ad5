//! Application state shared across routes

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::{MatchEngine, TokioScheduler};
use crate::session::{SessionHandle, SessionService};
use crate::util::time::{ticks_within, Uptime};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionHandle,
    pub uptime: Uptime,
}

impl AppState {
    /// Build the state and the session service that backs it.
    /// The caller must spawn `SessionService::run`.
    pub fn new(config: Config) -> (Self, SessionService) {
        let config = Arc::new(config);

        // Driver firings flow back into the session service
        let (driver_tx, driver_rx) = mpsc::channel(256);
        let scheduler = TokioScheduler::new(driver_tx, config.tick_interval, config.spawn_interval);

        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let tick_limit = config
            .match_time_limit
            .map(|limit| ticks_within(limit, config.tick_interval));

        let engine = MatchEngine::new(Box::new(scheduler), rng).with_tick_limit(tick_limit);
        let (service, sessions) = SessionService::new(engine, driver_rx);

        let state = Self {
            config,
            sessions,
            uptime: Uptime::start(),
        };

        (state, service)
    }
}
