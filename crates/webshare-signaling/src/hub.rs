//! Signaling hub: the single coordinator for registry and room table.
//!
//! Every mutation goes through one lock, so a join, its room switch and both
//! broadcasts happen as a unit. That is what keeps two simultaneous joins to a
//! brand-new room from both seeing `initiator: true`.
//!
//! Per connection the state machine is `UNJOINED → JOINED(room)`:
//! - `ping` → `pong`, in any state
//! - `join` → `joined` to the sender, `room-update` to the old room (if switching)
//!   and then to the new room
//! - `offer` / `answer` / `ice-candidate` → forwarded verbatim to every other
//!   member of the sender's room, dropped when unjoined

use crate::error::ProtocolError;
use crate::presence;
use crate::protocol::{ClientMessage, DeviceClass, Inbound, RoomId, ServerMessage};
use crate::registry::{ConnectionId, ConnectionRegistry, Outbound};
use crate::rooms::RoomTable;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Outbound queue depth used by [`SignalingHub::default`].
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

#[derive(Default)]
struct HubState {
    registry: ConnectionRegistry,
    rooms: RoomTable,
}

impl HubState {
    fn join(&mut self, id: ConnectionId, room: RoomId, device: DeviceClass) {
        self.registry.record_device_class(id, device.clone());
        let outcome = self.rooms.join(id, room);

        let mut dead = Vec::new();
        if let Some(old) = &outcome.left {
            dead.extend(presence::notify_room(&self.registry, &self.rooms, old));
        }

        let peer_types = self
            .rooms
            .members_except(id)
            .into_iter()
            .map(|m| self.registry.device_class(m))
            .collect();
        let joined = ServerMessage::Joined {
            room: outcome.room.clone(),
            count: outcome.count,
            initiator: outcome.initiator,
            peer_types,
        };
        if !self.registry.send(id, Outbound::Event(joined)) {
            dead.push(id);
        }

        tracing::info!(
            conn = %id,
            room = %outcome.room,
            count = outcome.count,
            initiator = outcome.initiator,
            device = %device,
            "Connection joined room"
        );

        dead.extend(presence::notify_room(&self.registry, &self.rooms, &outcome.room));
        self.reap(dead);
    }

    fn relay(&mut self, id: ConnectionId, inbound: &Inbound) {
        let Some(room) = self.rooms.room_of(id) else {
            tracing::debug!(conn = %id, kind = inbound.message.kind(), "Dropping relay from unjoined connection");
            return;
        };
        if let Some(claimed) = inbound.message.claimed_room() {
            if claimed != room {
                tracing::debug!(conn = %id, room = %room, claimed = %claimed, "Relay names another room, using sender's room");
            }
        }

        let peers = self.rooms.members_except(id);
        tracing::debug!(
            conn = %id,
            room = %room,
            kind = inbound.message.kind(),
            peers = peers.len(),
            "Forwarding signal"
        );

        let payload = inbound.raw.clone();
        let dead: Vec<_> = peers
            .into_iter()
            .filter(|peer| !self.registry.send(*peer, Outbound::Relay(payload.clone())))
            .collect();
        self.reap(dead);
    }

    /// Forget a connection and leave its room. Returns the room it was in.
    fn remove(&mut self, id: ConnectionId) -> Option<RoomId> {
        self.registry.forget(id);
        self.rooms.leave(id)
    }

    /// Reclaim connections whose queues refused a message. Each removal may
    /// surface more dead members through its own broadcast.
    fn reap(&mut self, mut dead: Vec<ConnectionId>) {
        while let Some(id) = dead.pop() {
            if !self.registry.contains(id) {
                continue;
            }
            tracing::info!(conn = %id, "Reclaiming unreachable connection");
            if let Some(room) = self.remove(id) {
                dead.extend(presence::notify_room(&self.registry, &self.rooms, &room));
            }
        }
    }
}

/// Counts exposed by `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub active_rooms: usize,
    pub connections: usize,
    pub joined_connections: usize,
}

/// Shared handle passed to every connection task.
#[derive(Clone)]
pub struct SignalingHub {
    state: Arc<Mutex<HubState>>,
    outbound_buffer: usize,
}

impl SignalingHub {
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Admit a new connection. The receiver feeds its writer task.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        self.state.lock().await.registry.admit(id, tx);
        tracing::info!(conn = %id, "Connection opened");
        (id, rx)
    }

    /// Handle one text frame from `id`. Malformed frames are logged and dropped.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        self.handle_parsed(id, Inbound::parse(text)).await;
    }

    /// Handle one binary frame carrying UTF-8 JSON.
    pub async fn handle_bytes(&self, id: ConnectionId, bytes: &[u8]) {
        self.handle_parsed(id, Inbound::parse_bytes(bytes)).await;
    }

    async fn handle_parsed(&self, id: ConnectionId, parsed: Result<Inbound, ProtocolError>) {
        match parsed {
            Ok(inbound) => self.dispatch(id, inbound).await,
            Err(e) => tracing::warn!(conn = %id, error = %e, "Dropping message"),
        }
    }

    /// Apply a parsed message from `id`.
    pub async fn dispatch(&self, id: ConnectionId, inbound: Inbound) {
        let mut state = self.state.lock().await;
        if !state.registry.contains(id) {
            tracing::debug!(conn = %id, "Message from reclaimed connection ignored");
            return;
        }

        match &inbound.message {
            ClientMessage::Ping => {
                if !state.registry.send(id, Outbound::Event(ServerMessage::Pong)) {
                    state.reap(vec![id]);
                }
            }
            ClientMessage::Join { room, device_type } => {
                state.join(id, room.clone(), device_type.clone());
            }
            ClientMessage::Offer { .. }
            | ClientMessage::Answer { .. }
            | ClientMessage::IceCandidate { .. } => state.relay(id, &inbound),
        }
    }

    /// Record a probe response.
    pub async fn mark_alive(&self, id: ConnectionId) {
        self.state.lock().await.registry.mark_alive(id);
    }

    /// Cleanup for a closed connection: forget, leave, broadcast. Safe to call
    /// more than once; returns whether anything was removed.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        if !state.registry.contains(id) {
            return false;
        }
        if let Some(room) = state.remove(id) {
            tracing::info!(conn = %id, room = %room, "Connection left room");
            let dead = presence::notify_room(&state.registry, &state.rooms, &room);
            state.reap(dead);
        }
        tracing::info!(conn = %id, "Connection closed");
        true
    }

    /// One keepalive pass: reclaim connections that missed the previous probe
    /// and probe the rest. Returns how many were reclaimed.
    pub async fn sweep(&self) -> usize {
        let mut state = self.state.lock().await;
        let dead = state.registry.probe_all();
        for id in &dead {
            state.registry.send(*id, Outbound::Close);
            tracing::info!(conn = %id, "Keepalive probe unanswered, closing");
        }
        let reclaimed = dead.len();
        state.reap(dead);
        reclaimed
    }

    pub async fn room_of(&self, id: ConnectionId) -> Option<RoomId> {
        self.state.lock().await.rooms.room_of(id).cloned()
    }

    pub async fn stats(&self) -> HubStats {
        let state = self.state.lock().await;
        HubStats {
            active_rooms: state.rooms.room_count(),
            connections: state.registry.len(),
            joined_connections: state.rooms.joined_count(),
        }
    }
}

impl Default for SignalingHub {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_BUFFER)
    }
}
