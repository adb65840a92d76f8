//! Room-based TCP Chat Relay Library
//!
//! Clients connect over TCP, register a username and exchange text
//! through named rooms mediated by a central server.
//!
//! # Features
//! - Length-prefixed framing (10-byte ASCII decimal header)
//! - Username handshake with uniqueness among live connections
//! - Room creation, deletion, membership and admin rights
//! - Active room sessions with implicit routing of plain lines
//! - Broadcast to every room member except the sender
//! - Client library with a persisted `$HOME/.tiny` config
//!
//! # Architecture
//! A single event loop owns all state:
//! - `ChatServer` waits on either the listener or connection events
//! - Each connection has a reader task and a writer task doing only I/O
//! - No locks needed - room and registry state never leaves the loop
//!
//! # Example
//! ```ignore
//! use tinychat::{ChatServer, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::default()).await.unwrap();
//!     server.run().await;
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod handler;
pub mod logger;
pub mod message;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::{ChatClient, Session};
pub use command::{Command, Input, ParseError};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionRegistry};
pub use dispatcher::{dispatch, Outbound};
pub use error::{AppError, FrameError, RegistryError, RoomError, SendError};
pub use handler::ServerEvent;
pub use message::ServerMessage;
pub use room::{ListScope, Room, RoomStore};
pub use server::{ChatServer, ServerConfig, ServerState};
pub use types::ConnectionId;
