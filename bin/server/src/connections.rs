//! Registry of live WebSocket connections.
//!
//! Each connection gets an unbounded outbound queue. The socket's writer
//! task drains it, so sending never waits on a slow client.

use crate::messages::ServerMessage;
use std::collections::HashMap;
use taskmate_core::ConnectionId;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

/// Tracks connections for personal sends and broadcasts.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl ConnectionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its outbound queue.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id, tx);
        debug!(connection_id = %id, "connection registered");
        (id, rx)
    }

    /// Removes a connection. Unknown ids are ignored.
    pub async fn disconnect(&self, id: ConnectionId) {
        if self.connections.write().await.remove(&id).is_some() {
            debug!(connection_id = %id, "connection removed");
        }
    }

    /// Queues `message` for one connection.
    ///
    /// Returns false if the connection is gone.
    pub async fn send(&self, id: ConnectionId, message: ServerMessage) -> bool {
        self.connections
            .read()
            .await
            .get(&id)
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Queues `message` for every connection and drops dead ones.
    ///
    /// Returns the number of connections reached.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut reached = 0;
        let mut dead = Vec::new();
        for (id, tx) in self.connections.read().await.iter() {
            if tx.send(message.clone()).is_ok() {
                reached += 1;
            } else {
                dead.push(*id);
            }
        }

        if !dead.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &dead {
                connections.remove(id);
                debug!(connection_id = %id, "dropped dead connection during broadcast");
            }
        }
        reached
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns true if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
