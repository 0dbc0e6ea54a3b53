//! Room table: who is in which room.
//!
//! Owns the membership relation in both directions:
//! - `rooms`: room → members in arrival order
//! - `membership`: connection → its single current room
//!
//! A room exists only while it has members.

use crate::protocol::{DeviceClass, RoomId};
use crate::registry::{ConnectionId, ConnectionRegistry};
use std::collections::HashMap;

/// Result of [`RoomTable::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room: RoomId,
    /// Member count right after the join.
    pub count: usize,
    /// True only for the sole member of the room right after joining.
    pub initiator: bool,
    /// Room the connection was moved out of, if it switched rooms.
    pub left: Option<RoomId>,
}

/// Member count and device classes of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub count: usize,
    pub devices: Vec<DeviceClass>,
}

#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Vec<ConnectionId>>,
    membership: HashMap<ConnectionId, RoomId>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `conn` in `room`, leaving its previous room first if different.
    /// Joining the room it is already in keeps its place.
    pub fn join(&mut self, conn: ConnectionId, room: RoomId) -> JoinOutcome {
        let left = match self.membership.get(&conn) {
            Some(current) if *current == room => None,
            Some(_) => self.leave(conn),
            None => None,
        };

        let members = self.rooms.entry(room.clone()).or_insert_with(|| {
            tracing::info!(room = %room, "Room created");
            Vec::new()
        });
        if !members.contains(&conn) {
            members.push(conn);
        }
        let count = members.len();
        self.membership.insert(conn, room.clone());

        JoinOutcome {
            room,
            count,
            initiator: count == 1,
            left,
        }
    }

    /// Remove `conn` from its room. Returns the room it left; the room itself is
    /// deleted when this empties it.
    pub fn leave(&mut self, conn: ConnectionId) -> Option<RoomId> {
        let room = self.membership.remove(&conn)?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.retain(|m| *m != conn);
            if members.is_empty() {
                self.rooms.remove(&room);
                tracing::info!(room = %room, "Room is empty, deleted");
            }
        }
        Some(room)
    }

    pub fn room_of(&self, conn: ConnectionId) -> Option<&RoomId> {
        self.membership.get(&conn)
    }

    /// Everyone else in `conn`'s room; empty if it has no room.
    pub fn members_except(&self, conn: ConnectionId) -> Vec<ConnectionId> {
        self.room_of(conn)
            .and_then(|room| self.rooms.get(room))
            .map(|members| members.iter().copied().filter(|m| *m != conn).collect())
            .unwrap_or_default()
    }

    pub fn members(&self, room: &RoomId) -> &[ConnectionId] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Count and device classes for a room, `None` once it no longer exists.
    pub fn snapshot(&self, room: &RoomId, registry: &ConnectionRegistry) -> Option<RoomSnapshot> {
        let members = self.rooms.get(room)?;
        Some(RoomSnapshot {
            count: members.len(),
            devices: members.iter().map(|m| registry.device_class(*m)).collect(),
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn joined_count(&self) -> usize {
        self.membership.len()
    }
}
