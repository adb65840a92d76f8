//! Event Loop
//!
//! `ChatServer` owns the listening socket, the Room Store and the
//! Connection Registry. It waits in one place for either a new connection
//! or an event from a connection task, and handles each to completion
//! before waiting again.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::connection::{Connection, ConnectionRegistry, OUTBOUND_BUFFER};
use crate::dispatcher::{self, Outbound};
use crate::error::AppError;
use crate::handler::{self, ServerEvent};
use crate::message::ServerMessage;
use crate::room::RoomStore;
use crate::types::{ConnectionId, ConnectionIds};

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:9001";

/// Default limit on inbound payload size
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 64 * 1024;

/// Channel buffer size for connection events
const EVENT_BUFFER_SIZE: usize = 256;

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:9001`
    pub addr: String,
    /// Largest inbound payload accepted before the connection is dropped
    pub max_frame_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Room and connection state
///
/// Everything here is mutated only by the event loop, one event at a time.
#[derive(Debug, Default)]
pub struct ServerState {
    pub rooms: RoomStore,
    pub connections: ConnectionRegistry,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one connection event
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Frame { id, payload } => self.handle_frame(id, payload),
            ServerEvent::Closed { id, error } => {
                match error {
                    Some(e) => warn!("Dropping connection {}: {}", id, e),
                    None => debug!("Connection {} reached end of stream", id),
                }
                self.disconnect(id);
            }
        }
    }

    fn handle_frame(&mut self, id: ConnectionId, payload: Vec<u8>) {
        let Some(connection) = self.connections.get(id) else {
            debug!("Frame for unknown connection {} ignored", id);
            return;
        };
        let handshake_done = connection.has_username();

        let text = match String::from_utf8(payload) {
            Ok(text) => text,
            Err(_) => {
                warn!("Non UTF-8 payload from {}, dropping connection", id);
                self.disconnect(id);
                return;
            }
        };

        if handshake_done {
            let outbound = dispatcher::dispatch(&mut self.rooms, &self.connections, id, &text);
            self.deliver(outbound);
        } else {
            self.handshake(id, &text);
        }
    }

    /// The first frame on a connection is its username
    fn handshake(&mut self, id: ConnectionId, username: &str) {
        match self.connections.register(id, username) {
            Ok(username) => {
                let welcome = ServerMessage::Welcome {
                    username: username.to_string(),
                };
                self.deliver(vec![Outbound::new(id, welcome)]);
            }
            Err(e) => {
                warn!("Handshake refused for {}: {}", id, e);
                // Queued before removal so the writer flushes it before closing
                let _ = self
                    .connections
                    .send(id, ServerMessage::HandshakeRejected(e).to_string());
                self.disconnect(id);
            }
        }
    }

    /// Queue messages; connections whose queue is unusable are dropped
    pub fn deliver(&mut self, outbound: Vec<Outbound>) {
        let mut stalled = Vec::new();
        for Outbound { to, message } in outbound {
            if let Err(e) = self.connections.send(to, message.to_string()) {
                warn!("Cannot deliver to {}: {}", to, e);
                stalled.push(to);
            }
        }
        for id in stalled {
            self.disconnect(id);
        }
    }

    /// Forget a connection and its active presence
    ///
    /// Room memberships survive so the user finds them on reconnect.
    pub fn disconnect(&mut self, id: ConnectionId) {
        let Some(connection) = self.connections.remove(id) else {
            return;
        };
        if let Some(username) = &connection.username {
            self.rooms.purge_presence(username);
            info!("Closed connection from '{}' ({})", username, id);
        }
    }
}

/// The chat server event loop
pub struct ChatServer {
    listener: TcpListener,
    config: ServerConfig,
    state: ServerState,
    ids: ConnectionIds,
    events_tx: mpsc::Sender<ServerEvent>,
    events_rx: mpsc::Receiver<ServerEvent>,
}

impl ChatServer {
    /// Bind the listening socket
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.addr).await?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        Ok(Self {
            listener,
            config,
            state: ServerState::new(),
            ids: ConnectionIds::new(),
            events_tx,
            events_rx,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Run until `shutdown` completes
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Central server now listening on {}", self.config.addr);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.handle_accept(stream, addr),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                Some(event) = self.events_rx.recv() => self.state.handle_event(event),
            }
        }

        info!(
            "ChatServer shutting down with {} connections and {} rooms",
            self.state.connections.len(),
            self.state.rooms.len()
        );
    }

    /// Spawn the connection's I/O tasks and track it pending handshake
    fn handle_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.ids.allocate();
        info!("Accepted new connection {} from {}", id, addr);

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        tokio::spawn(handler::write_loop(write_half, id, outbound_rx));
        let reader = tokio::spawn(handler::read_loop(
            read_half,
            id,
            self.events_tx.clone(),
            self.config.max_frame_bytes,
        ));

        let connection = Connection::new(id, outbound_tx).with_reader(reader.abort_handle());
        self.state.connections.accept(connection);
    }
}
