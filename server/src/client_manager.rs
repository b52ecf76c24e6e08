//! Connection tracking and seating for the word game server
//!
//! This module owns every live connection. Connections are split into two
//! ordered groups:
//! - *pending*: connected, but no accepted name yet. They receive no
//!   broadcasts and never hold the turn.
//! - *active*: seated players. Insertion order is the seating order that turn
//!   rotation follows.
//!
//! A connection lives in exactly one group at a time, and names are unique
//! among active players. Removal closes the transport and is idempotent, so a
//! connection that fails several times in one cycle is only torn down once.

use crate::error::RegistryError;
use indexmap::IndexMap;
use log::{debug, info};
use shared::LineFramer;
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Messages a connection may have queued before it counts as not keeping up
pub const OUTBOUND_QUEUE: usize = 256;

/// Server-assigned handle for one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outbound channel to this connection's writer task has closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendError;

/// One accepted client
///
/// Each connection keeps:
/// - Its peer address for logging
/// - The display name, empty until a name is accepted
/// - A line framer for partially received input
/// - The sending side of its writer task's queue
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub name: String,
    pub framer: LineFramer,
    outbound: mpsc::Sender<String>,
    reader: Option<AbortHandle>,
}

impl Connection {
    /// Creates an unnamed connection whose framer holds at most `capacity` bytes
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        capacity: usize,
        outbound: mpsc::Sender<String>,
    ) -> Self {
        Self {
            id,
            addr,
            name: String::new(),
            framer: LineFramer::new(capacity),
            outbound,
            reader: None,
        }
    }

    /// Attaches the reader task so closing the connection can stop it
    pub fn with_reader(mut self, reader: AbortHandle) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Queues `message` for the writer task without blocking
    ///
    /// Fails once the writer has exited, which happens after a failed socket
    /// write or after the connection was closed. Also fails when the queue is
    /// full because the peer stopped reading.
    pub fn send(&self, message: &str) -> Result<(), SendError> {
        self.outbound
            .try_send(message.to_string())
            .map_err(|_| SendError)
    }

    /// Stops the reader task and releases the outbound channel
    pub fn close(self) {
        if let Some(reader) = &self.reader {
            reader.abort();
        }
        // Dropping the sender lets the writer flush what is queued and shut
        // down its half of the socket.
    }
}

/// Owns all connections, partitioned into pending and active groups
#[derive(Debug, Default)]
pub struct ClientRegistry {
    pending: IndexMap<ConnectionId, Connection>,
    active: IndexMap<ConnectionId, Connection>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection as pending
    pub fn add_pending(&mut self, connection: Connection) {
        info!("Adding client {} from {}", connection.id, connection.addr);
        self.pending.insert(connection.id, connection);
    }

    /// Seats a pending connection under `name`
    ///
    /// The name must be non-empty, contain no line breaks, and not match any
    /// active player's name exactly. On success the connection is appended to
    /// the end of the seating order. On failure it stays pending.
    pub fn promote(&mut self, id: ConnectionId, name: &str) -> Result<(), RegistryError> {
        if !self.pending.contains_key(&id) {
            return Err(RegistryError::UnknownConnection(id));
        }
        if name.is_empty() || name.contains(['\r', '\n']) {
            return Err(RegistryError::InvalidName);
        }
        if self.name_taken(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let Some(mut connection) = self.pending.shift_remove(&id) else {
            return Err(RegistryError::UnknownConnection(id));
        };
        connection.name = name.to_string();
        self.active.insert(id, connection);
        Ok(())
    }

    /// Removes a connection from whichever group holds it and closes it
    ///
    /// Returns the departed connection's name (empty for pending ones), or
    /// `None` if it was already gone.
    pub fn remove(&mut self, id: ConnectionId) -> Option<String> {
        let connection = match self.active.shift_remove(&id) {
            Some(connection) => connection,
            None => match self.pending.shift_remove(&id) {
                Some(connection) => connection,
                None => {
                    debug!("Connection {} already removed", id);
                    return None;
                }
            },
        };

        info!("Removing client {} {}", connection.id, connection.addr);
        let name = connection.name.clone();
        connection.close();
        Some(name)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.active.get(&id).or_else(|| self.pending.get(&id))
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        match self.active.get_mut(&id) {
            Some(connection) => Some(connection),
            None => self.pending.get_mut(&id),
        }
    }

    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn is_pending(&self, id: ConnectionId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Display name of an active player
    pub fn name_of(&self, id: ConnectionId) -> Option<&str> {
        self.active.get(&id).map(|c| c.name.as_str())
    }

    /// Returns true if an active player already uses exactly this name
    pub fn name_taken(&self, name: &str) -> bool {
        self.active.values().any(|c| c.name == name)
    }

    /// Active players in seating order
    pub fn active(&self) -> impl Iterator<Item = &Connection> {
        self.active.values()
    }

    /// Pending connections in arrival order
    pub fn pending(&self) -> impl Iterator<Item = &Connection> {
        self.pending.values()
    }

    pub fn first_active(&self) -> Option<ConnectionId> {
        self.active.keys().next().copied()
    }

    /// The seat after `id`, wrapping to the first seat
    ///
    /// If `id` is not seated the first seat is returned; with nobody seated
    /// the result is `None`. A lone player is their own successor.
    pub fn next_seat_after(&self, id: ConnectionId) -> Option<ConnectionId> {
        match self.active.get_index_of(&id) {
            Some(index) => self
                .active
                .get_index((index + 1) % self.active.len())
                .map(|(next, _)| *next),
            None => self.first_active(),
        }
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of live connections
    pub fn len(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }
}
