//! Connection registry: every live transport connection, its declared device
//! class, liveness flag and outbound queue.

use crate::protocol::{DeviceClass, ServerMessage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Work item for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Message produced by the server (`joined`, `room-update`, `pong`).
    Event(ServerMessage),
    /// Negotiation frame from another member, forwarded as received.
    Relay(Arc<str>),
    /// Transport-level liveness probe.
    Probe,
    /// Close the transport.
    Close,
}

#[derive(Debug)]
struct ConnectionEntry {
    device: DeviceClass,
    /// Cleared when a probe goes out, set again by the probe response.
    alive: bool,
    tx: mpsc::Sender<Outbound>,
}

/// All connections currently open.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with device class `unknown`.
    pub fn admit(&mut self, id: ConnectionId, tx: mpsc::Sender<Outbound>) {
        self.connections.insert(
            id,
            ConnectionEntry {
                device: DeviceClass::default(),
                alive: true,
                tx,
            },
        );
    }

    /// Set or overwrite the declared device class.
    pub fn record_device_class(&mut self, id: ConnectionId, device: DeviceClass) {
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.device = device;
        }
    }

    /// Drop all state for a connection. Returns whether it was known; calling
    /// it again is a no-op.
    pub fn forget(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn device_class(&self, id: ConnectionId) -> DeviceClass {
        self.connections
            .get(&id)
            .map(|e| e.device.clone())
            .unwrap_or_default()
    }

    pub fn mark_alive(&mut self, id: ConnectionId) {
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.alive = true;
        }
    }

    /// Probe every connection that answered the previous probe. Returns the
    /// connections that did not answer, plus any whose queue rejected the probe.
    pub fn probe_all(&mut self) -> Vec<ConnectionId> {
        let mut dead = Vec::new();
        for (id, entry) in self.connections.iter_mut() {
            if !entry.alive || entry.tx.try_send(Outbound::Probe).is_err() {
                dead.push(*id);
                continue;
            }
            entry.alive = false;
        }
        dead
    }

    /// Enqueue an item for a connection. `false` means the connection is gone or
    /// its writer cannot keep up, and it should be reclaimed.
    pub fn send(&self, id: ConnectionId, item: Outbound) -> bool {
        match self.connections.get(&id) {
            Some(entry) => entry.tx.try_send(item).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(reg: &mut ConnectionRegistry) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(8);
        let id = ConnectionId::new();
        reg.admit(id, tx);
        (id, rx)
    }

    #[test]
    fn admit_starts_unknown_and_forget_is_idempotent() {
        let mut reg = ConnectionRegistry::new();
        let (id, _rx) = admitted(&mut reg);
        assert_eq!(reg.device_class(id), DeviceClass::default());

        reg.record_device_class(id, DeviceClass::new("mobile"));
        assert_eq!(reg.device_class(id).as_str(), "mobile");

        assert!(reg.forget(id));
        assert!(!reg.forget(id));
        assert!(reg.is_empty());
    }

    #[test]
    fn unanswered_probe_marks_connection_dead() {
        let mut reg = ConnectionRegistry::new();
        let (quiet, mut quiet_rx) = admitted(&mut reg);
        let (chatty, mut chatty_rx) = admitted(&mut reg);

        assert!(reg.probe_all().is_empty());
        assert_eq!(quiet_rx.try_recv().unwrap(), Outbound::Probe);
        assert_eq!(chatty_rx.try_recv().unwrap(), Outbound::Probe);

        reg.mark_alive(chatty);
        assert_eq!(reg.probe_all(), vec![quiet]);
    }

    #[test]
    fn send_fails_once_writer_is_gone() {
        let mut reg = ConnectionRegistry::new();
        let (id, rx) = admitted(&mut reg);
        assert!(reg.send(id, Outbound::Event(ServerMessage::Pong)));
        drop(rx);
        assert!(!reg.send(id, Outbound::Event(ServerMessage::Pong)));
        assert!(!reg.send(ConnectionId::new(), Outbound::Probe));
    }
}
