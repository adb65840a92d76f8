//! Command Dispatcher
//!
//! Turns one payload from a registered connection into Room Store calls
//! and the messages they produce.

use tracing::debug;

use crate::command::{self, Command, Input, ParseError};
use crate::connection::ConnectionRegistry;
use crate::message::ServerMessage;
use crate::room::RoomStore;
use crate::types::ConnectionId;

/// A message addressed to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn new(to: ConnectionId, message: impl Into<ServerMessage>) -> Self {
        Self {
            to,
            message: message.into(),
        }
    }
}

/// Handle one command payload from `from`
///
/// Produces exactly one reply to the sender, except for a successful send,
/// which produces one chat message per reachable member and no reply.
pub fn dispatch(
    rooms: &mut RoomStore,
    connections: &ConnectionRegistry,
    from: ConnectionId,
    payload: &str,
) -> Vec<Outbound> {
    let Some(username) = connections.lookup(from) else {
        return Vec::new();
    };
    debug!("Dispatching from '{}': {:?}", username, payload);

    let reply = |message: ServerMessage| vec![Outbound::new(from, message)];

    let command = match command::parse(payload) {
        Ok(Input::Command(command)) => command,
        Ok(Input::Text(text)) => {
            return match rooms.active_room(username) {
                Some(room) if !text.is_empty() => {
                    let room = room.to_string();
                    send(rooms, connections, from, username, room, text)
                }
                _ => reply(ServerMessage::UnknownLobbyInput),
            };
        }
        Err(ParseError::Usage(usage)) => return reply(ServerMessage::Usage { usage }),
        Err(ParseError::PossibleTypo(token)) => {
            return reply(ServerMessage::PossibleTypo { token })
        }
    };

    let message = match command {
        Command::WhoAmI => ServerMessage::WhoAmI {
            username: username.to_string(),
        },
        Command::Help => ServerMessage::Help,
        Command::Create { room } => match rooms.create(&room, username) {
            Ok(_) => ServerMessage::RoomCreated { room },
            Err(e) => e.into(),
        },
        Command::Delete { room } => match rooms.delete(&room, username) {
            Ok(_) => ServerMessage::RoomDeleted { room },
            Err(e) => e.into(),
        },
        Command::Join { room } => match rooms.join(&room, username) {
            Ok(()) => ServerMessage::RoomJoined { room },
            Err(e) => e.into(),
        },
        Command::Leave { room } => match rooms.leave(&room, username) {
            Ok(()) => ServerMessage::RoomLeft { room },
            Err(e) => e.into(),
        },
        Command::List { scope } => match rooms.list(&scope, username) {
            Ok(text) => ServerMessage::Listing(text),
            Err(e) => e.into(),
        },
        Command::Enter { room } => match rooms.enter(&room, username) {
            Ok(previous) => ServerMessage::RoomEntered { room, previous },
            Err(e) => e.into(),
        },
        Command::Exit => ServerMessage::RoomExited {
            room: rooms.exit(username),
        },
        Command::Send { room, body } => {
            return send(rooms, connections, from, username, room, body);
        }
    };
    reply(message)
}

/// Fan a chat line out to every member of `room` except the sender
///
/// Members without a live connection are skipped.
fn send(
    rooms: &RoomStore,
    connections: &ConnectionRegistry,
    from: ConnectionId,
    sender: &str,
    room: String,
    body: String,
) -> Vec<Outbound> {
    let recipients = match rooms.send(&room, sender) {
        Ok(recipients) => recipients,
        Err(e) => return vec![Outbound::new(from, e)],
    };

    let message = ServerMessage::Chat {
        room,
        from: sender.to_string(),
        body,
    };
    recipients
        .iter()
        .filter_map(|member| {
            let to = connections.find_by_username(member);
            if to.is_none() {
                debug!("Member '{}' is offline, skipping", member);
            }
            to
        })
        .map(|to| Outbound::new(to, message.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::{Connection, OUTBOUND_BUFFER};
    use crate::error::RoomError;

    struct Fixture {
        rooms: RoomStore,
        connections: ConnectionRegistry,
        _queues: Vec<mpsc::Receiver<String>>,
    }

    impl Fixture {
        fn new(users: &[&str]) -> Self {
            let mut connections = ConnectionRegistry::new();
            let mut queues = Vec::new();
            for (i, user) in users.iter().enumerate() {
                let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
                let id = ConnectionId(i as u64);
                connections.accept(Connection::new(id, tx));
                connections.register(id, user).unwrap();
                queues.push(rx);
            }
            Self {
                rooms: RoomStore::new(),
                connections,
                _queues: queues,
            }
        }

        fn run(&mut self, from: u64, payload: &str) -> Vec<Outbound> {
            dispatch(
                &mut self.rooms,
                &self.connections,
                ConnectionId(from),
                payload,
            )
        }

        fn reply(&mut self, from: u64, payload: &str) -> ServerMessage {
            let mut out = self.run(from, payload);
            assert_eq!(out.len(), 1, "expected exactly one reply to {payload}");
            let out = out.remove(0);
            assert_eq!(out.to, ConnectionId(from));
            out.message
        }
    }

    const ALICE: u64 = 0;
    const BOB: u64 = 1;
    const CAROL: u64 = 2;

    #[test]
    fn test_whoami_and_help() {
        let mut fx = Fixture::new(&["alice"]);
        assert_eq!(
            fx.reply(ALICE, "$$whoami"),
            ServerMessage::WhoAmI {
                username: "alice".to_string()
            }
        );
        assert_eq!(fx.reply(ALICE, "$$help"), ServerMessage::Help);
    }

    #[test]
    fn test_create_join_leave() {
        let mut fx = Fixture::new(&["alice", "bob"]);
        assert_eq!(
            fx.reply(ALICE, "$$create pokemon"),
            ServerMessage::RoomCreated {
                room: "pokemon".to_string()
            }
        );
        assert_eq!(
            fx.reply(BOB, "$$create pokemon"),
            ServerMessage::RoomError(RoomError::AlreadyExists("pokemon".to_string()))
        );
        assert_eq!(
            fx.reply(BOB, "$$join pokemon"),
            ServerMessage::RoomJoined {
                room: "pokemon".to_string()
            }
        );
        assert!(fx.rooms.get("pokemon").unwrap().is_member("bob"));
        assert_eq!(
            fx.reply(BOB, "$$leave pokemon"),
            ServerMessage::RoomLeft {
                room: "pokemon".to_string()
            }
        );
        assert!(!fx.rooms.get("pokemon").unwrap().is_member("bob"));
    }

    #[test]
    fn test_reserved_and_invalid_names() {
        let mut fx = Fixture::new(&["alice"]);
        assert_eq!(
            fx.reply(ALICE, "$$create mine"),
            ServerMessage::RoomError(RoomError::ReservedName("mine".to_string()))
        );
        assert_eq!(
            fx.reply(ALICE, "$$create all"),
            ServerMessage::RoomError(RoomError::ReservedName("all".to_string()))
        );
        assert_eq!(
            fx.reply(ALICE, "$$create room42"),
            ServerMessage::RoomError(RoomError::InvalidName("room42".to_string()))
        );
        assert!(fx.rooms.is_empty());
    }

    #[test]
    fn test_usage_errors_do_not_mutate() {
        let mut fx = Fixture::new(&["alice"]);
        assert_eq!(
            fx.reply(ALICE, "$$create"),
            ServerMessage::Usage {
                usage: Command::USAGE_CREATE
            }
        );
        assert_eq!(
            fx.reply(ALICE, "$$crate pokemon"),
            ServerMessage::PossibleTypo {
                token: "$$crate".to_string()
            }
        );
        assert!(fx.rooms.is_empty());
    }

    #[test]
    fn test_lobby_text_rejected() {
        let mut fx = Fixture::new(&["alice"]);
        fx.reply(ALICE, "$$create pokemon");
        assert_eq!(fx.reply(ALICE, "hello"), ServerMessage::UnknownLobbyInput);
        assert_eq!(
            fx.rooms.list(&crate::room::ListScope::Rooms, "alice").unwrap(),
            "Rooms: pokemon"
        );
    }

    #[test]
    fn test_send_excludes_sender() {
        let mut fx = Fixture::new(&["alice", "bob", "carol"]);
        fx.reply(ALICE, "$$create pokemon");
        fx.reply(BOB, "$$join pokemon");
        fx.reply(CAROL, "$$join pokemon");

        let out = fx.run(ALICE, "$$send pokemon hi");
        let expected = ServerMessage::Chat {
            room: "pokemon".to_string(),
            from: "alice".to_string(),
            body: "hi".to_string(),
        };
        assert_eq!(
            out,
            vec![
                Outbound::new(ConnectionId(BOB), expected.clone()),
                Outbound::new(ConnectionId(CAROL), expected),
            ]
        );
    }

    #[test]
    fn test_send_skips_non_members() {
        let mut fx = Fixture::new(&["alice", "bob", "carol"]);
        fx.reply(ALICE, "$$create pokemon");
        fx.reply(CAROL, "$$create digimon");
        fx.reply(CAROL, "$$enter digimon");

        let out = fx.run(BOB, "$$send pokemon hi");
        assert_eq!(out, vec![Outbound::new(ConnectionId(ALICE), expected_chat("bob", "hi"))]);
        assert_eq!(
            fx.reply(BOB, "$$send nothing hi"),
            ServerMessage::RoomError(RoomError::NotFound("nothing".to_string()))
        );
    }

    fn expected_chat(from: &str, body: &str) -> ServerMessage {
        ServerMessage::Chat {
            room: "pokemon".to_string(),
            from: from.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_entered_session_routes_text() {
        let mut fx = Fixture::new(&["alice", "bob"]);
        fx.reply(ALICE, "$$create pokemon");
        fx.reply(BOB, "$$join pokemon");
        assert_eq!(
            fx.reply(BOB, "$$enter pokemon"),
            ServerMessage::RoomEntered {
                room: "pokemon".to_string(),
                previous: None
            }
        );

        let out = fx.run(BOB, "good morning");
        assert_eq!(
            out,
            vec![Outbound::new(
                ConnectionId(ALICE),
                expected_chat("bob", "good morning")
            )]
        );

        assert_eq!(
            fx.reply(BOB, "$$exit"),
            ServerMessage::RoomExited {
                room: Some("pokemon".to_string())
            }
        );
        assert_eq!(fx.reply(BOB, "good morning"), ServerMessage::UnknownLobbyInput);
        assert_eq!(
            fx.reply(BOB, "$$exit"),
            ServerMessage::RoomExited { room: None }
        );
    }

    #[test]
    fn test_enter_requires_membership() {
        let mut fx = Fixture::new(&["alice", "bob"]);
        fx.reply(ALICE, "$$create pokemon");
        assert_eq!(
            fx.reply(BOB, "$$enter pokemon"),
            ServerMessage::RoomError(RoomError::NotMember("pokemon".to_string()))
        );
    }

    #[test]
    fn test_delete_permissions() {
        let mut fx = Fixture::new(&["alice", "bob"]);
        fx.reply(ALICE, "$$create pokemon");
        fx.reply(BOB, "$$join pokemon");
        assert_eq!(
            fx.reply(BOB, "$$delete pokemon"),
            ServerMessage::RoomError(RoomError::NotAdmin("pokemon".to_string()))
        );
        assert_eq!(
            fx.reply(ALICE, "$$delete pokemon"),
            ServerMessage::RoomDeleted {
                room: "pokemon".to_string()
            }
        );
        assert_eq!(
            fx.reply(ALICE, "$$list"),
            ServerMessage::Listing("No rooms available.".to_string())
        );
    }

    #[test]
    fn test_list_unknown_room() {
        let mut fx = Fixture::new(&["alice"]);
        assert_eq!(
            fx.reply(ALICE, "$$list pokemon"),
            ServerMessage::RoomError(RoomError::NotFound("pokemon".to_string()))
        );
    }

    #[test]
    fn test_unregistered_connection_ignored() {
        let mut fx = Fixture::new(&["alice"]);
        assert!(fx.run(42, "$$whoami").is_empty());
    }
}
