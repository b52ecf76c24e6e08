//! Fan-out of server messages with deferred disconnects
//!
//! Sends never remove anything from the registry. A connection whose send
//! fails is recorded in the deferred set and skipped by every later send in
//! the same dispatch cycle; the dispatcher tears those connections down once
//! the cycle's messages are out.

use crate::client_manager::{ClientRegistry, Connection, ConnectionId};
use indexmap::IndexSet;
use log::debug;
use shared::{messages, YOUR_GUESS_MSG};

#[derive(Debug, Default)]
pub struct Broadcaster {
    deferred: IndexSet<ConnectionId>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `message` to every active player not already deferred
    pub fn broadcast(&mut self, registry: &ClientRegistry, message: &str) {
        self.broadcast_each(registry, |_| message.to_string());
    }

    /// Sends each active player a message built for them
    pub fn broadcast_each<F>(&mut self, registry: &ClientRegistry, mut build: F)
    where
        F: FnMut(&Connection) -> String,
    {
        for connection in registry.active() {
            if self.deferred.contains(&connection.id) {
                continue;
            }
            let message = build(connection);
            self.deliver(connection, &message);
        }
    }

    /// Sends `message` to one connection, pending or active
    pub fn unicast(&mut self, registry: &ClientRegistry, id: ConnectionId, message: &str) {
        if self.deferred.contains(&id) {
            return;
        }
        match registry.get(id) {
            Some(connection) => self.deliver(connection, message),
            None => debug!("Dropping message for unknown connection {}", id),
        }
    }

    /// Tells the turn holder to guess and everyone else whose turn it is
    pub fn announce_turn(&mut self, registry: &ClientRegistry, turn: Option<ConnectionId>) {
        let Some(turn) = turn else {
            return;
        };
        let Some(name) = registry.name_of(turn) else {
            return;
        };
        let others = messages::turn_of(name);
        self.broadcast_each(registry, |connection| {
            if connection.id == turn {
                YOUR_GUESS_MSG.to_string()
            } else {
                others.clone()
            }
        });
    }

    fn deliver(&mut self, connection: &Connection, message: &str) {
        if connection.send(message).is_err() {
            debug!("Write to client {} failed", connection.id);
            self.deferred.insert(connection.id);
        }
    }

    /// Marks a connection for teardown at the end of the cycle
    pub fn defer(&mut self, id: ConnectionId) {
        self.deferred.insert(id);
    }

    pub fn is_deferred(&self, id: ConnectionId) -> bool {
        self.deferred.contains(&id)
    }

    /// The `index`th deferred connection, in the order failures were seen
    pub fn deferred_at(&self, index: usize) -> Option<ConnectionId> {
        self.deferred.get_index(index).copied()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn clear_deferred(&mut self) {
        self.deferred.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_manager::OUTBOUND_QUEUE;
    use std::net::SocketAddr;
    use tokio::sync::mpsc::{self, Receiver};

    fn drain(rx: &mut Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Registry with seated players `names` plus one pending connection
    fn setup(names: &[&str]) -> (ClientRegistry, Vec<Receiver<String>>) {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let mut registry = ClientRegistry::new();
        let mut receivers = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let id = ConnectionId(i as u64 + 1);
            let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
            registry.add_pending(Connection::new(id, addr, 30, tx));
            registry.promote(id, name).unwrap();
            receivers.push(rx);
        }
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        registry.add_pending(Connection::new(ConnectionId(100), addr, 30, tx));
        receivers.push(rx);
        (registry, receivers)
    }

    #[test]
    fn test_broadcast_reaches_active_only() {
        let (registry, mut rxs) = setup(&["a", "b"]);
        let mut broadcaster = Broadcaster::new();

        broadcaster.broadcast(&registry, "hi\r\n");

        assert_eq!(drain(&mut rxs[0]), vec!["hi\r\n"]);
        assert_eq!(drain(&mut rxs[1]), vec!["hi\r\n"]);
        assert!(drain(&mut rxs[2]).is_empty());
        assert_eq!(broadcaster.deferred_len(), 0);
    }

    #[test]
    fn test_failed_send_is_deferred_and_skipped() {
        let (registry, mut rxs) = setup(&["a", "b", "c"]);
        let mut broadcaster = Broadcaster::new();
        let dead = rxs.remove(1);
        drop(dead);

        broadcaster.broadcast(&registry, "one\r\n");
        broadcaster.broadcast(&registry, "two\r\n");

        // Delivery to the others continued past the failure
        assert_eq!(drain(&mut rxs[0]), vec!["one\r\n", "two\r\n"]);
        assert_eq!(drain(&mut rxs[1]), vec!["one\r\n", "two\r\n"]);
        assert!(broadcaster.is_deferred(ConnectionId(2)));
        assert_eq!(broadcaster.deferred_len(), 1);
        // Not removed from the registry
        assert!(registry.is_active(ConnectionId(2)));
    }

    #[test]
    fn test_unicast_to_pending_and_deferred() {
        let (registry, mut rxs) = setup(&["a"]);
        let mut broadcaster = Broadcaster::new();

        broadcaster.unicast(&registry, ConnectionId(100), "welcome");
        assert_eq!(drain(&mut rxs[1]), vec!["welcome"]);

        broadcaster.defer(ConnectionId(1));
        broadcaster.unicast(&registry, ConnectionId(1), "skipped\r\n");
        assert!(drain(&mut rxs[0]).is_empty());

        // Unknown ids are ignored
        broadcaster.unicast(&registry, ConnectionId(55), "nobody\r\n");
        assert_eq!(broadcaster.deferred_len(), 1);
    }

    #[test]
    fn test_announce_turn() {
        let (registry, mut rxs) = setup(&["a", "b", "c"]);
        let mut broadcaster = Broadcaster::new();

        broadcaster.announce_turn(&registry, Some(ConnectionId(2)));

        assert_eq!(drain(&mut rxs[0]), vec!["It's b's turn.\r\n"]);
        assert_eq!(drain(&mut rxs[1]), vec!["Your guess?\r\n"]);
        assert_eq!(drain(&mut rxs[2]), vec!["It's b's turn.\r\n"]);
        assert!(drain(&mut rxs[3]).is_empty());
    }

    #[test]
    fn test_announce_without_turn_is_silent() {
        let (registry, mut rxs) = setup(&["a"]);
        let mut broadcaster = Broadcaster::new();

        broadcaster.announce_turn(&registry, None);
        broadcaster.announce_turn(&registry, Some(ConnectionId(77)));

        assert!(drain(&mut rxs[0]).is_empty());
    }

    #[test]
    fn test_deferred_order_and_dedup() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.defer(ConnectionId(3));
        broadcaster.defer(ConnectionId(1));
        broadcaster.defer(ConnectionId(3));

        assert_eq!(broadcaster.deferred_len(), 2);
        assert_eq!(broadcaster.deferred_at(0), Some(ConnectionId(3)));
        assert_eq!(broadcaster.deferred_at(1), Some(ConnectionId(1)));
        assert_eq!(broadcaster.deferred_at(2), None);

        broadcaster.clear_deferred();
        assert_eq!(broadcaster.deferred_len(), 0);
    }
}
