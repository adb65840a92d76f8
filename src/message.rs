//! Server → client message texts
//!
//! Replies and broadcasts share the same framing on the wire, so every
//! message is rendered to a plain UTF-8 string through `Display`.

use std::fmt;

use crate::error::{RegistryError, RoomError};

/// Help text shown by `$$help`
pub const HELP_TEXT: &str = "\
Available commands:
$$whoami -- Show your username
$$create ROOM -- Create a new chat room (1-48 letters)
$$delete ROOM -- Delete a room you administer
$$join ROOM -- Add a room to your memberships
$$leave ROOM -- Remove a room from your memberships
$$list [ROOM|mine|all] -- List rooms, your rooms, every room in detail, or one room's users
$$send ROOM TEXT -- Send TEXT to every other member of ROOM
$$enter ROOM -- Enter an active session; plain lines then go to ROOM
$$exit -- Leave the active session
$$help -- Show this help";

/// Server → client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake accepted
    Welcome { username: String },
    /// Handshake refused; the connection is closed afterwards
    HandshakeRejected(RegistryError),
    /// Answer to `$$whoami`
    WhoAmI { username: String },
    /// Answer to `$$help`
    Help,
    /// Room created successfully
    RoomCreated { room: String },
    /// Room deleted successfully
    RoomDeleted { room: String },
    /// Room joined successfully
    RoomJoined { room: String },
    /// Room left successfully
    RoomLeft { room: String },
    /// Active session started, possibly replacing another one
    RoomEntered {
        room: String,
        previous: Option<String>,
    },
    /// Active session ended
    RoomExited { room: Option<String> },
    /// Answer to `$$list`
    Listing(String),
    /// Chat line fanned out to room members
    Chat {
        room: String,
        from: String,
        body: String,
    },
    /// Plain text typed outside an entered session
    UnknownLobbyInput,
    /// `$$`-prefixed token that is not a command
    PossibleTypo { token: String },
    /// Known command with a bad argument list
    Usage { usage: &'static str },
    /// Room Store refused the command
    RoomError(RoomError),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome { username } => write!(
                f,
                "Welcome to the lobby, {}. Enter a valid $$ command or $$help if you need help.",
                username
            ),
            ServerMessage::HandshakeRejected(RegistryError::DuplicateUsername(name)) => write!(
                f,
                "Username {} is already connected, please pick another one.",
                name
            ),
            ServerMessage::HandshakeRejected(err) => write!(f, "Handshake refused: {}", err),
            ServerMessage::WhoAmI { username } => write!(f, "You are {}.", username),
            ServerMessage::Help => f.write_str(HELP_TEXT),
            ServerMessage::RoomCreated { room } => {
                write!(f, "Room {} created. You are its admin.", room)
            }
            ServerMessage::RoomDeleted { room } => write!(f, "Room {} deleted.", room),
            ServerMessage::RoomJoined { room } => write!(f, "Joined room {}.", room),
            ServerMessage::RoomLeft { room } => write!(f, "Left room {}.", room),
            ServerMessage::RoomEntered { room, previous } => {
                if let Some(previous) = previous {
                    write!(f, "Exited room {}. ", previous)?;
                }
                write!(
                    f,
                    "Entered room {}. Plain lines now go to {}; $$exit returns to the lobby.",
                    room, room
                )
            }
            ServerMessage::RoomExited { room: Some(room) } => {
                write!(f, "Exited room {}. Back in the lobby.", room)
            }
            ServerMessage::RoomExited { room: None } => {
                f.write_str("You are not in a room session.")
            }
            ServerMessage::Listing(text) => f.write_str(text),
            ServerMessage::Chat { room, from, body } => write!(f, "[{}] {}: {}", room, from, body),
            ServerMessage::UnknownLobbyInput => f.write_str(
                "Unknown lobby input, please enter a valid command. $$help can display available commands.",
            ),
            ServerMessage::PossibleTypo { token } => write!(
                f,
                "Hmmm, {} was close to a valid command with $$, are you sure this wasn't a typo?",
                token
            ),
            ServerMessage::Usage { usage } => write!(f, "Invalid format. Usage: {}", usage),
            ServerMessage::RoomError(err) => match err {
                RoomError::AlreadyExists(room) => write!(f, "Room {} already exists.", room),
                RoomError::ReservedName(room) => {
                    write!(f, "Room name {} is reserved, please pick another.", room)
                }
                RoomError::InvalidName(room) => write!(
                    f,
                    "Invalid room name {:?}: use 1-48 letters only.",
                    room
                ),
                RoomError::NotFound(room) => write!(f, "Room {} does not exist.", room),
                RoomError::NotAdmin(room) => write!(
                    f,
                    "You are not permitted to do that: you are not an admin of room {}.",
                    room
                ),
                RoomError::AlreadyMember(room) => {
                    write!(f, "You are already a member of room {}.", room)
                }
                RoomError::NotMember(room) => write!(f, "You are not a member of room {}.", room),
                RoomError::CreatorCannotLeave(room) => write!(
                    f,
                    "You created room {}, so you cannot leave it; delete it instead.",
                    room
                ),
            },
        }
    }
}

/// Convert RoomError to ServerMessage for client notification
impl From<RoomError> for ServerMessage {
    fn from(err: RoomError) -> Self {
        ServerMessage::RoomError(err)
    }
}

impl From<ServerMessage> for String {
    fn from(msg: ServerMessage) -> Self {
        msg.to_string()
    }
}
