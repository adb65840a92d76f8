//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: monotonically increasing connection identifier
//! - `ConnectionIds`: the allocator handing out fresh ids

/// Unique connection identifier (newtype pattern)
///
/// Ids are handed out in increasing order and never reused for the
/// lifetime of the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocator for `ConnectionId`s
#[derive(Debug, Default)]
pub struct ConnectionIds {
    next: u64,
}

impl ConnectionIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next unused id
    pub fn allocate(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next);
        self.next += 1;
        id
    }
}
