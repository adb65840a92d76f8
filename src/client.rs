//! Client side of the protocol
//!
//! `ChatClient` performs the handshake and exchanges framed lines with the
//! server. `Session` tracks what the server has confirmed (entered room,
//! joined rooms) and rewrites plain lines inside an entered room into
//! `$$send`.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::command::{self, Input};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::frame;
use crate::room::validate_room_name;

/// Receiving half of a client connection
///
/// Server messages are only bounded by the header width: chat lines and
/// `$$list all` answers may exceed the server's inbound limit.
#[derive(Debug)]
pub struct Incoming {
    reader: OwnedReadHalf,
}

impl Incoming {
    /// Next message from the server; `None` once the server closed
    pub async fn recv(&mut self) -> Result<Option<String>, AppError> {
        match frame::read_frame(&mut self.reader, frame::MAX_ENCODABLE_LEN).await? {
            Some(payload) => Ok(Some(String::from_utf8_lossy(&payload).into_owned())),
            None => Ok(None),
        }
    }
}

/// Sending half of a client connection
#[derive(Debug)]
pub struct Outgoing {
    writer: OwnedWriteHalf,
}

impl Outgoing {
    pub async fn send(&mut self, line: &str) -> Result<(), AppError> {
        frame::write_frame(&mut self.writer, line.as_bytes()).await?;
        Ok(())
    }
}

/// A connected, handshaken client
#[derive(Debug)]
pub struct ChatClient {
    incoming: Incoming,
    outgoing: Outgoing,
}

impl ChatClient {
    /// Connect and send `username` as the handshake frame
    pub async fn connect(addr: &str, username: &str) -> Result<Self, AppError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            incoming: Incoming { reader },
            outgoing: Outgoing { writer },
        };
        client.send(username).await?;
        debug!("Connected to {} as '{}'", addr, username);
        Ok(client)
    }

    pub async fn send(&mut self, line: &str) -> Result<(), AppError> {
        self.outgoing.send(line).await
    }

    pub async fn recv(&mut self) -> Result<Option<String>, AppError> {
        self.incoming.recv().await
    }

    /// Next message, treating a closed connection as an error
    pub async fn expect_message(&mut self) -> Result<String, AppError> {
        self.recv().await?.ok_or(AppError::ConnectionClosed)
    }

    pub fn into_split(self) -> (Incoming, Outgoing) {
        (self.incoming, self.outgoing)
    }
}

/// Local view of the user's session
///
/// Changes only when a server reply confirms them, so a refused
/// `$$enter` or `$$join` leaves nothing behind.
#[derive(Debug, Default)]
pub struct Session {
    entered: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entered(&self) -> Option<&str> {
        self.entered.as_deref()
    }

    /// Turn a typed line into the payload to send, if any
    pub fn outgoing(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match (command::parse(line), &self.entered) {
            (Ok(Input::Text(text)), Some(room)) => Some(format!("$$send {} {}", room, text)),
            // Commands, lobby text and malformed commands go out as typed
            _ => Some(line.to_string()),
        }
    }

    /// Apply a message received from the server
    ///
    /// Replies confirming room changes update the session and the
    /// remembered room list in `config`. Broadcasts always start with
    /// `[room]` and never match.
    pub fn observe(&mut self, message: &str, config: &mut ClientConfig) {
        if let Some(room) = between(message, "Room ", " created.") {
            config.remember_room(room);
        } else if let Some(room) = between(message, "Joined room ", ".") {
            config.remember_room(room);
        } else if let Some(room) = between(message, "Left room ", ".")
            .or_else(|| between(message, "Room ", " deleted."))
        {
            if self.entered.as_deref() == Some(room) {
                self.entered = None;
            }
            config.forget_room(room);
        } else if let Some(rest) = entered_reply(message) {
            self.entered = rest.split_once('.').map(|(room, _)| room.to_string());
        } else if message.starts_with("Exited room ") {
            self.entered = None;
        }
    }

    /// Prompt shown before each typed line
    pub fn prompt(&self, username: &str) -> String {
        match &self.entered {
            Some(room) => format!("{} [{}] > ", username, room),
            None => format!("{} > ", username),
        }
    }
}

/// Room name between `prefix` and the first `suffix`, if it is a valid name
fn between<'a>(message: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let rest = message.strip_prefix(prefix)?;
    let (room, _) = rest.split_once(suffix)?;
    validate_room_name(room).ok().map(|()| room)
}

/// Text after "Entered room ", also when preceded by an eviction notice
fn entered_reply(message: &str) -> Option<&str> {
    const ENTERED: &str = "Entered room ";
    if let Some(rest) = message.strip_prefix(ENTERED) {
        return Some(rest);
    }
    if message.starts_with("Exited room ") {
        let (_, rest) = message.split_once(ENTERED)?;
        return Some(rest);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoomError;
    use crate::message::ServerMessage;

    fn observe(session: &mut Session, config: &mut ClientConfig, message: ServerMessage) {
        session.observe(&message.to_string(), config);
    }

    #[test]
    fn test_plain_lines_in_lobby_pass_through() {
        let session = Session::new();
        assert_eq!(session.outgoing("hello"), Some("hello".to_string()));
        assert_eq!(session.outgoing("   "), None);
        assert_eq!(session.outgoing("$$create"), Some("$$create".to_string()));
    }

    #[test]
    fn test_confirmed_enter_prefixes_lines() {
        let mut session = Session::new();
        let mut config = ClientConfig::new("alice".to_string());

        // Nothing changes until the server confirms
        assert_eq!(
            session.outgoing("$$enter pokemon"),
            Some("$$enter pokemon".to_string())
        );
        assert_eq!(session.entered(), None);

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomEntered {
                room: "pokemon".to_string(),
                previous: None,
            },
        );
        assert_eq!(session.entered(), Some("pokemon"));
        assert_eq!(session.prompt("alice"), "alice [pokemon] > ");
        assert_eq!(
            session.outgoing("hello there"),
            Some("$$send pokemon hello there".to_string())
        );
        assert_eq!(session.outgoing("$$list"), Some("$$list".to_string()));

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomEntered {
                room: "digimon".to_string(),
                previous: Some("pokemon".to_string()),
            },
        );
        assert_eq!(session.entered(), Some("digimon"));

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomExited {
                room: Some("digimon".to_string()),
            },
        );
        assert_eq!(session.entered(), None);
        assert_eq!(session.outgoing("hello"), Some("hello".to_string()));
    }

    #[test]
    fn test_refused_commands_leave_no_trace() {
        let mut session = Session::new();
        let mut config = ClientConfig::new("alice".to_string());

        for line in ["$$enter nosuchroom", "$$create pokemon", "$$join digimon"] {
            session.outgoing(line);
        }
        for err in [
            RoomError::NotFound("nosuchroom".to_string()),
            RoomError::NotMember("nosuchroom".to_string()),
            RoomError::AlreadyExists("pokemon".to_string()),
            RoomError::AlreadyMember("digimon".to_string()),
            RoomError::NotFound("digimon".to_string()),
        ] {
            observe(&mut session, &mut config, err.into());
        }

        assert_eq!(session.entered(), None);
        assert!(config.rooms.is_empty());
        assert_eq!(session.outgoing("hello"), Some("hello".to_string()));
    }

    #[test]
    fn test_confirmed_room_changes_update_config() {
        let mut session = Session::new();
        let mut config = ClientConfig::new("alice".to_string());

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomJoined {
                room: "pokemon".to_string(),
            },
        );
        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomCreated {
                room: "digimon".to_string(),
            },
        );
        assert_eq!(config.rooms, vec!["pokemon", "digimon"]);

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomEntered {
                room: "pokemon".to_string(),
                previous: None,
            },
        );
        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomLeft {
                room: "pokemon".to_string(),
            },
        );
        assert_eq!(config.rooms, vec!["digimon"]);
        assert_eq!(session.entered(), None);

        observe(
            &mut session,
            &mut config,
            ServerMessage::RoomDeleted {
                room: "digimon".to_string(),
            },
        );
        assert!(config.rooms.is_empty());
    }

    #[test]
    fn test_broadcasts_never_change_state() {
        let mut session = Session::new();
        let mut config = ClientConfig::new("alice".to_string());

        observe(
            &mut session,
            &mut config,
            ServerMessage::Chat {
                room: "pokemon".to_string(),
                from: "bob".to_string(),
                body: "Joined room evil.".to_string(),
            },
        );
        assert!(config.rooms.is_empty());
        assert_eq!(session.entered(), None);
    }
}
