//! Lobby command grammar
//!
//! Parses a decoded payload into a closed set of commands. The dispatcher
//! matches exhaustively over the result.

use crate::room::ListScope;

/// Prefix every command starts with
pub const COMMAND_PREFIX: &str = "$$";

/// Parsed client → server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report the caller's username
    WhoAmI,
    /// Create a new room
    Create { room: String },
    /// Delete a room (admins only)
    Delete { room: String },
    /// Become a member of a room
    Join { room: String },
    /// Stop being a member of a room
    Leave { room: String },
    /// List rooms or room details
    List { scope: ListScope },
    /// Broadcast a line to a room's members
    Send { room: String, body: String },
    /// Start an active session in a room
    Enter { room: String },
    /// End the active session
    Exit,
    /// Show available commands
    Help,
}

/// One client payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A `$$` command
    Command(Command),
    /// Anything else; only meaningful inside an entered session
    Text(String),
}

/// Why a `$$` payload was not a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Known command with missing or extra arguments
    Usage(&'static str),
    /// `$$`-prefixed but not a known command
    PossibleTypo(String),
}

impl Command {
    /// Usage line for each command
    pub const USAGE_CREATE: &'static str = "$$create ROOM";
    pub const USAGE_DELETE: &'static str = "$$delete ROOM";
    pub const USAGE_JOIN: &'static str = "$$join ROOM";
    pub const USAGE_LEAVE: &'static str = "$$leave ROOM";
    pub const USAGE_LIST: &'static str = "$$list [ROOM|mine|all]";
    pub const USAGE_SEND: &'static str = "$$send ROOM TEXT...";
    pub const USAGE_ENTER: &'static str = "$$enter ROOM";
    pub const USAGE_WHOAMI: &'static str = "$$whoami";
    pub const USAGE_HELP: &'static str = "$$help";
    pub const USAGE_EXIT: &'static str = "$$exit";
}

/// Parse one payload
pub fn parse(payload: &str) -> Result<Input, ParseError> {
    let line = payload.trim();
    if !line.starts_with(COMMAND_PREFIX) {
        return Ok(Input::Text(line.to_string()));
    }

    let (name, rest) = split_token(line);
    let command = match name {
        "$$whoami" => no_args(rest, Command::WhoAmI, Command::USAGE_WHOAMI)?,
        "$$help" => no_args(rest, Command::Help, Command::USAGE_HELP)?,
        "$$exit" => no_args(rest, Command::Exit, Command::USAGE_EXIT)?,
        "$$create" => Command::Create {
            room: single_arg(rest, Command::USAGE_CREATE)?,
        },
        "$$delete" => Command::Delete {
            room: single_arg(rest, Command::USAGE_DELETE)?,
        },
        "$$join" => Command::Join {
            room: single_arg(rest, Command::USAGE_JOIN)?,
        },
        "$$leave" => Command::Leave {
            room: single_arg(rest, Command::USAGE_LEAVE)?,
        },
        "$$enter" => Command::Enter {
            room: single_arg(rest, Command::USAGE_ENTER)?,
        },
        "$$list" => {
            let scope = match split_token(rest) {
                ("", _) => ListScope::Rooms,
                (_, extra) if !extra.is_empty() => {
                    return Err(ParseError::Usage(Command::USAGE_LIST))
                }
                ("all", _) => ListScope::All,
                ("mine", _) => ListScope::Mine,
                (room, _) => ListScope::Room(room.to_string()),
            };
            Command::List { scope }
        }
        "$$send" => {
            let (room, body) = split_token(rest);
            if room.is_empty() || body.is_empty() {
                return Err(ParseError::Usage(Command::USAGE_SEND));
            }
            Command::Send {
                room: room.to_string(),
                body: body.to_string(),
            }
        }
        other => return Err(ParseError::PossibleTypo(other.to_string())),
    };
    Ok(Input::Command(command))
}

/// Split off the first whitespace-delimited token
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (text, ""),
    }
}

fn no_args(rest: &str, command: Command, usage: &'static str) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::Usage(usage))
    }
}

fn single_arg(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    match split_token(rest) {
        (arg, "") if !arg.is_empty() => Ok(arg.to_string()),
        _ => Err(ParseError::Usage(usage)),
    }
}
