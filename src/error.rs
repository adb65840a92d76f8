//! Error types for the chat server
//!
//! Defines wire-level, room-level and connection-level errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Fatal for whatever owns them (a connection task or a binary),
/// never for the server loop itself.
#[derive(Debug, Error)]
pub enum AppError {
    /// Framing violation or socket failure
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed or written
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Server closed the connection
    #[error("Connection closed by the server")]
    ConnectionClosed,
}

/// Wire framing errors (ProtocolError / ConnectionError)
///
/// Any of these terminates the offending connection.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload length does not fit the header or exceeds the allowed maximum
    #[error("Frame too large: {len} bytes (limit {limit})")]
    FrameTooLarge { len: u64, limit: u64 },

    /// Header bytes are not a non-negative decimal integer
    #[error("Malformed frame header: {0:?}")]
    MalformedHeader(String),

    /// Underlying socket failure, including end-of-stream inside a frame
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Room Store errors (CommandError)
///
/// Reported to the issuing connection only; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// A room with this name already exists
    #[error("Room already exists: {0}")]
    AlreadyExists(String),

    /// `mine` and `all` are reserved for `$$list`
    #[error("Reserved room name: {0}")]
    ReservedName(String),

    /// Name is not 1-48 ASCII letters
    #[error("Invalid room name: {0}")]
    InvalidName(String),

    /// No room with this name
    #[error("Room not found: {0}")]
    NotFound(String),

    /// Requester is not an admin of the room
    #[error("Not an admin of room {0}")]
    NotAdmin(String),

    /// User is already a member
    #[error("Already a member of room {0}")]
    AlreadyMember(String),

    /// User is not a member
    #[error("Not a member of room {0}")]
    NotMember(String),

    /// The creator must stay a member; delete the room instead
    #[error("Creator cannot leave room {0}")]
    CreatorCannotLeave(String),
}

/// Connection Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another live connection already uses this username
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Handshake carried no usable username
    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),

    /// Connection id is not registered
    #[error("Unknown connection")]
    UnknownConnection,
}

/// Outbound queue errors
///
/// Occurs when a reply or broadcast cannot be queued for a connection.
#[derive(Debug, Error)]
pub enum SendError {
    /// The peer is not draining its queue fast enough
    #[error("Outbound queue full")]
    QueueFull,

    /// The writer task has gone away
    #[error("Channel closed")]
    ChannelClosed,
}
