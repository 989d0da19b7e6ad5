//! Periodic match drivers (simulation tick and enemy spawn)
//!
//! Drivers never touch room state. Each firing is sent back as a
//! [`DriverEvent`] into the session service loop, which applies it to the
//! engine between other commands, so all mutation stays on one task.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::mode::Mode;

/// Which periodic driver fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Tick,
    Spawn,
}

/// A single driver firing for one room's match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverEvent {
    pub mode: Mode,
    /// Match generation the driver was started for
    pub generation: u64,
    pub kind: DriverKind,
}

/// Guard owning a room's running drivers. Dropping it stops them.
pub struct MatchDrivers {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl MatchDrivers {
    pub fn new(generation: u64, handles: Vec<JoinHandle<()>>) -> Self {
        Self {
            generation,
            handles,
        }
    }

    /// Guard with no backing tasks, for engines driven by hand
    pub fn detached(generation: u64) -> Self {
        Self::new(generation, Vec::new())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for MatchDrivers {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for MatchDrivers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchDrivers")
            .field("generation", &self.generation)
            .field("tasks", &self.handles.len())
            .finish()
    }
}

/// Starts the drivers for a match that just entered RUNNING
pub trait DriverScheduler: Send {
    fn start(&self, mode: Mode, generation: u64) -> MatchDrivers;
}

/// Scheduler backed by tokio interval tasks
pub struct TokioScheduler {
    events_tx: mpsc::Sender<DriverEvent>,
    tick_period: Duration,
    spawn_period: Duration,
}

impl TokioScheduler {
    pub fn new(
        events_tx: mpsc::Sender<DriverEvent>,
        tick_period: Duration,
        spawn_period: Duration,
    ) -> Self {
        Self {
            events_tx,
            tick_period,
            spawn_period,
        }
    }

    fn spawn_driver(&self, event: DriverEvent, period: Duration) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // First firing is one full period after the match starts
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tx.send(event).await.is_err() {
                    debug!(mode = %event.mode, kind = ?event.kind, "Driver channel closed");
                    break;
                }
            }
        })
    }
}

impl DriverScheduler for TokioScheduler {
    fn start(&self, mode: Mode, generation: u64) -> MatchDrivers {
        let tick = self.spawn_driver(
            DriverEvent {
                mode,
                generation,
                kind: DriverKind::Tick,
            },
            self.tick_period,
        );
        let spawn = self.spawn_driver(
            DriverEvent {
                mode,
                generation,
                kind: DriverKind::Spawn,
            },
            self.spawn_period,
        );

        debug!(mode = %mode, generation, "Match drivers started");
        MatchDrivers::new(generation, vec![tick, spawn])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (TokioScheduler, mpsc::Receiver<DriverEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let scheduler = TokioScheduler::new(
            tx,
            Duration::from_millis(50),
            Duration::from_millis(500),
        );
        (scheduler, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn drivers_fire_at_their_periods() {
        let (scheduler, mut rx) = scheduler();
        let _drivers = scheduler.start(Mode::Advanced, 3);

        tokio::time::sleep(Duration::from_millis(510)).await;

        let mut ticks = 0;
        let mut spawns = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.mode, Mode::Advanced);
            assert_eq!(event.generation, 3);
            match event.kind {
                DriverKind::Tick => ticks += 1,
                DriverKind::Spawn => spawns += 1,
            }
        }

        assert!((9..=10).contains(&ticks), "ticks = {}", ticks);
        assert_eq!(spawns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_stops_both_drivers() {
        let (scheduler, mut rx) = scheduler();
        let drivers = scheduler.start(Mode::Normal, 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(drivers);
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn detached_guard_keeps_generation() {
        let drivers = MatchDrivers::detached(7);
        assert_eq!(drivers.generation(), 7);
    }
}
