//! Session service - the single task that owns the match engine
//!
//! Connection handlers and match drivers only talk to it through channels,
//! so every engine mutation happens here, one command at a time.

use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::game::{ConnectionId, DriverEvent, MatchEngine, Outbound, RoomStatus};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound channel for one connection
pub type ConnectionSender = mpsc::Sender<ServerMsg>;

/// Capacity of each connection's outbound queue
pub const OUTBOUND_QUEUE: usize = 64;

/// Commands from connection handlers and HTTP routes
#[derive(Debug)]
pub enum SessionCommand {
    /// A new connection is established
    Connect {
        id: ConnectionId,
        sender: ConnectionSender,
    },
    /// A parsed event from a connection
    Client { id: ConnectionId, msg: ClientMsg },
    /// A connection was torn down
    Disconnect { id: ConnectionId },
    /// Status query for the health endpoint
    Status { reply: oneshot::Sender<ServiceStatus> },
}

/// Snapshot of the service for status reporting
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceStatus {
    pub connections: usize,
    pub rooms: Vec<RoomStatus>,
}

/// Cheap, cloneable handle for sending commands to the service
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Register a connection and its outbound channel
    pub async fn connect(&self, id: ConnectionId, sender: ConnectionSender) -> bool {
        self.send(SessionCommand::Connect { id, sender }).await
    }

    /// Forward a client event. Returns false if the service is gone.
    pub async fn client_msg(&self, id: ConnectionId, msg: ClientMsg) -> bool {
        self.send(SessionCommand::Client { id, msg }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        self.send(SessionCommand::Disconnect { id }).await
    }

    pub async fn status(&self) -> Option<ServiceStatus> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::Status { reply }).await {
            return None;
        }
        rx.await.ok()
    }

    async fn send(&self, cmd: SessionCommand) -> bool {
        self.cmd_tx.send(cmd).await.is_ok()
    }
}

/// The session actor
pub struct SessionService {
    engine: MatchEngine,
    connections: HashMap<ConnectionId, ConnectionSender>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    driver_rx: mpsc::Receiver<DriverEvent>,
}

impl SessionService {
    /// Create the service around an engine whose drivers report on `driver_rx`
    pub fn new(
        engine: MatchEngine,
        driver_rx: mpsc::Receiver<DriverEvent>,
    ) -> (Self, SessionHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);

        let service = Self {
            engine,
            connections: HashMap::new(),
            cmd_rx,
            driver_rx,
        };

        (service, SessionHandle { cmd_tx })
    }

    /// Process commands and driver firings until every handle is dropped
    pub async fn run(mut self) {
        info!("Session service started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = self.driver_rx.recv() => {
                    self.engine.on_driver(event);
                }
            }

            self.flush();
        }

        info!("Session service stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Connect { id, sender } => {
                info!(conn_id = %id, "Connection registered");
                let _ = sender.try_send(ServerMsg::Welcome { id });
                self.connections.insert(id, sender);
            }
            SessionCommand::Client { id, msg } => {
                if !self.connections.contains_key(&id) {
                    warn!(conn_id = %id, "Event from unregistered connection");
                    return;
                }
                self.route(id, msg);
            }
            SessionCommand::Disconnect { id } => {
                self.connections.remove(&id);
                self.engine.disconnect(id);
                info!(conn_id = %id, "Connection removed");
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(ServiceStatus {
                    connections: self.connections.len(),
                    rooms: self.engine.registry().status(),
                });
            }
        }
    }

    fn route(&mut self, id: ConnectionId, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinLobby { mode } => self.engine.join(id, &mode),
            ClientMsg::SetReady { mode, ready } => self.engine.set_ready(id, &mode, ready),
            ClientMsg::PlayerMove { mode, x, y } => self.engine.move_player(id, &mode, x, y),
        }
    }

    /// Deliver everything the engine queued, in order.
    ///
    /// A connection whose queue is full skips state updates. If anything
    /// else no longer fits, the connection is dropped and treated as a
    /// disconnect, which may queue more messages for the others.
    fn flush(&mut self) {
        loop {
            let stalled = self.deliver();
            if stalled.is_empty() {
                break;
            }
            for id in stalled {
                if self.connections.remove(&id).is_some() {
                    warn!(conn_id = %id, "Outbound queue full, dropping connection");
                    self.engine.disconnect(id);
                }
            }
        }
    }

    /// Returns the connections that could not take a required message
    fn deliver(&mut self) -> Vec<ConnectionId> {
        let mut stalled = Vec::new();

        for Outbound { to, msg } in self.engine.take_outbound() {
            for id in to.targets() {
                let Some(sender) = self.connections.get(id) else {
                    debug!(conn_id = %id, event = msg.event(), "No connection for recipient");
                    continue;
                };
                match sender.try_send(msg.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) if matches!(msg, ServerMsg::StateUpdate { .. }) => {
                        warn!(conn_id = %id, "Client lagging, skipping state update");
                    }
                    Err(TrySendError::Full(_)) => stalled.push(*id),
                    Err(TrySendError::Closed(_)) => {
                        debug!(conn_id = %id, event = msg.event(), "Connection writer gone");
                    }
                }
            }
        }

        stalled
    }
}
