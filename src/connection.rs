//! Connection Registry
//!
//! Tracks live connections, their outbound queues and the username each
//! one registered during its handshake.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::error::{RegistryError, SendError};
use crate::types::ConnectionId;

/// Outbound frames buffered per connection before it counts as stalled
pub const OUTBOUND_BUFFER: usize = 256;

/// A live connection
///
/// Holds the outbound queue drained by the connection's writer task and a
/// handle to its reader task. Dropping the record closes both.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Username (None until the handshake frame arrives)
    pub username: Option<String>,
    /// Server → client payload queue
    sender: mpsc::Sender<String>,
    /// Reader task feeding the event loop
    reader: Option<AbortHandle>,
}

impl Connection {
    /// Create a new connection with the given ID and outbound queue
    pub fn new(id: ConnectionId, sender: mpsc::Sender<String>) -> Self {
        Self {
            id,
            username: None,
            sender,
            reader: None,
        }
    }

    /// Attach the reader task so it stops together with this record
    pub fn with_reader(mut self, reader: AbortHandle) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Queue a payload without waiting
    pub fn send(&self, payload: String) -> Result<(), SendError> {
        self.sender.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Get the display name for this connection
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("(handshake pending)")
    }

    /// Check if this connection has completed its handshake
    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// All live connections, keyed by id
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Track a freshly accepted connection, pending its handshake
    pub fn accept(&mut self, connection: Connection) {
        debug!("Connection {} pending handshake", connection.id);
        self.connections.insert(connection.id, connection);
    }

    /// Bind a username to a pending connection
    ///
    /// The username is trimmed; it must be non-empty, must not look like a
    /// command and must not be in use by another live connection.
    pub fn register(&mut self, id: ConnectionId, username: &str) -> Result<&str, RegistryError> {
        let username = username.trim();
        if username.is_empty() || username.starts_with("$$") {
            return Err(RegistryError::InvalidUsername(username.to_string()));
        }
        if self.find_by_username(username).is_some() {
            return Err(RegistryError::DuplicateUsername(username.to_string()));
        }

        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection)?;
        info!("Connection {} registered as '{}'", id, username);
        Ok(connection.username.insert(username.to_string()).as_str())
    }

    /// Username bound to a connection, if its handshake is done
    pub fn lookup(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id).and_then(|c| c.username.as_deref())
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Live connection registered under `username`
    pub fn find_by_username(&self, username: &str) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|c| c.username.as_deref() == Some(username))
            .map(|c| c.id)
    }

    /// Forget a connection
    ///
    /// Dropping the returned record aborts its reader task and closes its
    /// outbound queue, which ends the writer task and closes the socket.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        debug!(
            "Connection {} ({}) removed, {} remaining",
            id,
            connection.display_name(),
            self.connections.len()
        );
        Some(connection)
    }

    /// Queue a payload for one connection
    pub fn send(&self, id: ConnectionId, payload: String) -> Result<(), SendError> {
        self.connections
            .get(&id)
            .ok_or(SendError::ChannelClosed)?
            .send(payload)
    }
}
