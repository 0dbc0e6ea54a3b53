//! Presence broadcasts: `room-update` snapshots after membership changes.

use crate::protocol::{RoomId, ServerMessage};
use crate::registry::{ConnectionId, ConnectionRegistry, Outbound};
use crate::rooms::RoomTable;

/// Send the current snapshot of `room` to each of its members.
///
/// No-op when the room no longer exists. Returns members whose queue refused
/// the update so the caller can reclaim them.
pub(crate) fn notify_room(
    registry: &ConnectionRegistry,
    rooms: &RoomTable,
    room: &RoomId,
) -> Vec<ConnectionId> {
    let Some(snapshot) = rooms.snapshot(room, registry) else {
        return Vec::new();
    };

    tracing::debug!(
        room = %room,
        count = snapshot.count,
        devices = ?snapshot.devices,
        "Broadcasting room update"
    );

    let update = ServerMessage::RoomUpdate {
        room: room.clone(),
        count: snapshot.count,
        devices: snapshot.devices,
    };

    rooms
        .members(room)
        .iter()
        .copied()
        .filter(|member| !registry.send(*member, Outbound::Event(update.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DeviceClass;
    use tokio::sync::mpsc;

    #[test]
    fn every_member_gets_the_same_snapshot() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomTable::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        let (a_tx, mut a_rx) = mpsc::channel(4);
        let (b_tx, mut b_rx) = mpsc::channel(4);
        registry.admit(a, a_tx);
        registry.admit(b, b_tx);
        registry.record_device_class(b, DeviceClass::new("mobile"));
        rooms.join(a, RoomId::new("abc"));
        rooms.join(b, RoomId::new("abc"));

        let dead = notify_room(&registry, &rooms, &RoomId::new("abc"));
        assert!(dead.is_empty());

        let expected = Outbound::Event(ServerMessage::RoomUpdate {
            room: RoomId::new("abc"),
            count: 2,
            devices: vec![DeviceClass::default(), DeviceClass::new("mobile")],
        });
        assert_eq!(a_rx.try_recv().unwrap(), expected);
        assert_eq!(b_rx.try_recv().unwrap(), expected);
    }

    #[test]
    fn missing_room_sends_nothing() {
        let registry = ConnectionRegistry::new();
        let rooms = RoomTable::new();
        assert!(notify_room(&registry, &rooms, &RoomId::new("nowhere")).is_empty());
    }

    #[test]
    fn closed_queue_is_reported() {
        let mut registry = ConnectionRegistry::new();
        let mut rooms = RoomTable::new();
        let a = ConnectionId::new();
        let (tx, rx) = mpsc::channel(4);
        registry.admit(a, tx);
        rooms.join(a, RoomId::new("abc"));
        drop(rx);

        assert_eq!(notify_room(&registry, &rooms, &RoomId::new("abc")), vec![a]);
    }
}
