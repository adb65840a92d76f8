//! Room Store
//!
//! Owns every room and its membership, admin and active-presence sets.
//! Users are referenced by username only, never by connection.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::RoomError;

/// Longest accepted room name
pub const MAX_ROOM_NAME_LEN: usize = 48;

/// Names that collide with `$$list` scopes
pub const RESERVED_NAMES: [&str; 2] = ["mine", "all"];

/// Topic given to every new room
pub const DEFAULT_TOPIC: &str = "Default";

/// Check a room name: 1-48 ASCII letters, not a reserved word
pub fn validate_room_name(name: &str) -> Result<(), RoomError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(RoomError::ReservedName(name.to_string()));
    }
    if name.is_empty()
        || name.len() > MAX_ROOM_NAME_LEN
        || !name.bytes().all(|b| b.is_ascii_alphabetic())
    {
        return Err(RoomError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// What `$$list` should report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every room name
    Rooms,
    /// Every room with members and admins
    All,
    /// Rooms the querying user belongs to
    Mine,
    /// Members and active users of one room
    Room(String),
}

/// A named chat room
///
/// Invariants: `active ⊆ members`, and `creator` is in both
/// `admins` and `members` for the room's whole lifetime.
#[derive(Debug)]
pub struct Room {
    /// Unique room name
    pub name: String,
    /// Free-form topic
    pub topic: String,
    /// User who created the room
    pub creator: String,
    admins: BTreeSet<String>,
    members: BTreeSet<String>,
    active: BTreeSet<String>,
}

impl Room {
    /// Create a new room seeded with its creator
    pub fn new(name: String, creator: String) -> Self {
        let seed = BTreeSet::from([creator.clone()]);
        Self {
            name,
            topic: DEFAULT_TOPIC.to_string(),
            creator,
            admins: seed.clone(),
            members: seed,
            active: BTreeSet::new(),
        }
    }

    pub fn is_member(&self, user: &str) -> bool {
        self.members.contains(user)
    }

    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.contains(user)
    }

    pub fn is_active(&self, user: &str) -> bool {
        self.active.contains(user)
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn admins(&self) -> impl Iterator<Item = &str> {
        self.admins.iter().map(String::as_str)
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    /// Remove a member, including any active presence
    ///
    /// The creator cannot stop being a member; returns false for them.
    fn remove_member(&mut self, user: &str) -> bool {
        if user == self.creator {
            return false;
        }
        self.active.remove(user);
        self.admins.remove(user);
        self.members.remove(user)
    }
}

/// All rooms, kept in creation order
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: Vec<Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Room, RoomError> {
        self.rooms
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))
    }

    /// Create a room owned by `creator`
    pub fn create(&mut self, name: &str, creator: &str) -> Result<&Room, RoomError> {
        validate_room_name(name)?;
        if self.get(name).is_some() {
            return Err(RoomError::AlreadyExists(name.to_string()));
        }

        info!("User '{}' created room {}", creator, name);
        self.rooms.push(Room::new(name.to_string(), creator.to_string()));
        let index = self.rooms.len() - 1;
        Ok(&self.rooms[index])
    }

    /// Delete a room; only admins may do this
    pub fn delete(&mut self, name: &str, requester: &str) -> Result<Room, RoomError> {
        let index = self
            .rooms
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        if !self.rooms[index].is_admin(requester) {
            return Err(RoomError::NotAdmin(name.to_string()));
        }

        info!("User '{}' deleted room {}", requester, name);
        Ok(self.rooms.remove(index))
    }

    /// Add `user` to a room's members
    pub fn join(&mut self, name: &str, user: &str) -> Result<(), RoomError> {
        let room = self.get_mut(name)?;
        if !room.members.insert(user.to_string()) {
            return Err(RoomError::AlreadyMember(name.to_string()));
        }
        debug!("User '{}' joined room {}", user, name);
        Ok(())
    }

    /// Remove `user` from a room's members and active set
    ///
    /// The creator stays a member for the room's lifetime.
    pub fn leave(&mut self, name: &str, user: &str) -> Result<(), RoomError> {
        let room = self.get_mut(name)?;
        if !room.is_member(user) {
            return Err(RoomError::NotMember(name.to_string()));
        }
        if !room.remove_member(user) {
            return Err(RoomError::CreatorCannotLeave(name.to_string()));
        }
        debug!("User '{}' left room {}", user, name);
        Ok(())
    }

    /// Mark `user` active in a room
    ///
    /// Evicts the user from any other room's active set first. Returns the
    /// name of the room they were evicted from, if any.
    pub fn enter(&mut self, name: &str, user: &str) -> Result<Option<String>, RoomError> {
        let room = self.get_mut(name)?;
        if !room.is_member(user) {
            return Err(RoomError::NotMember(name.to_string()));
        }

        let previous = self.exit(user).filter(|prev| prev != name);
        if let Ok(room) = self.get_mut(name) {
            room.active.insert(user.to_string());
        }
        debug!("User '{}' entered room {}", user, name);
        Ok(previous)
    }

    /// Remove `user` from whichever active set holds them
    pub fn exit(&mut self, user: &str) -> Option<String> {
        let mut left = None;
        for room in &mut self.rooms {
            if room.active.remove(user) {
                left = Some(room.name.clone());
            }
        }
        left
    }

    /// Room `user` is currently active in
    pub fn active_room(&self, user: &str) -> Option<&str> {
        self.rooms
            .iter()
            .find(|r| r.is_active(user))
            .map(|r| r.name.as_str())
    }

    /// Recipients of a chat line: every member except the sender
    pub fn send(&self, name: &str, sender: &str) -> Result<Vec<String>, RoomError> {
        let room = self
            .get(name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        Ok(room
            .members()
            .filter(|member| *member != sender)
            .map(str::to_string)
            .collect())
    }

    /// Render a `$$list` answer for `user`
    pub fn list(&self, scope: &ListScope, user: &str) -> Result<String, RoomError> {
        match scope {
            ListScope::Rooms => {
                if self.rooms.is_empty() {
                    return Ok("No rooms available.".to_string());
                }
                let names: Vec<&str> = self.rooms.iter().map(|r| r.name.as_str()).collect();
                Ok(format!("Rooms: {}", names.join(", ")))
            }
            ListScope::All => {
                if self.rooms.is_empty() {
                    return Ok("No rooms available.".to_string());
                }
                let mut out = String::from("Rooms:");
                for room in &self.rooms {
                    out.push_str(&format!(
                        "\n  {} (topic: {}) members: {} admins: {}",
                        room.name,
                        room.topic,
                        join(room.members()),
                        join(room.admins()),
                    ));
                }
                Ok(out)
            }
            ListScope::Mine => {
                let names: Vec<&str> = self
                    .rooms
                    .iter()
                    .filter(|r| r.is_member(user))
                    .map(|r| r.name.as_str())
                    .collect();
                if names.is_empty() {
                    Ok("You are not a member of any room.".to_string())
                } else {
                    Ok(format!("Your rooms: {}", names.join(", ")))
                }
            }
            ListScope::Room(name) => {
                let room = self
                    .get(name)
                    .ok_or_else(|| RoomError::NotFound(name.clone()))?;
                Ok(format!(
                    "Room {} (topic: {})\n  members: {}\n  active: {}",
                    room.name,
                    room.topic,
                    join(room.members()),
                    join(room.active()),
                ))
            }
        }
    }

    /// Drop `user` from every active set (disconnect cleanup)
    ///
    /// Membership is kept so the user finds their rooms on reconnect.
    pub fn purge_presence(&mut self, user: &str) {
        for room in &mut self.rooms {
            room.active.remove(user);
        }
    }
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
