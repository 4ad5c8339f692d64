//! Room transport abstraction and the in-process loopback mesh
//!
//! `RoomChannel` is the seam the production transport implements. The
//! frame loop polls it once per frame and gets the events that arrived
//! since the last poll, so all network activity reaches the simulation
//! at well-defined points. `RoomHub`/`LoopbackRoom` implement the same
//! contract in-process for demos and tests: per-endpoint FIFO queues,
//! best-effort broadcast, no delivery guarantee to members that left.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConnectionError;

/// Session-scoped participant identifier assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Transport event drained by the frame loop
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    Message { from: PeerId, payload: Vec<u8> },
}

/// A joined room session. Join/leave/message events are queued and
/// drained by `poll`; `broadcast` is fire-and-forget with no delivery
/// guarantee or acknowledgment.
pub trait RoomChannel {
    fn local_id(&self) -> PeerId;

    /// Best-effort send to every current member. Silently drops for
    /// members that cannot be reached.
    fn broadcast(&self, payload: &[u8]);

    /// Drain events received since the last poll, in arrival order.
    fn poll(&mut self) -> Vec<RoomEvent>;

    /// Live members, excluding self.
    fn peer_count(&self) -> usize;
}

type RoomKey = (String, String);

struct HubInner {
    next_id: u64,
    closed: bool,
    rooms: HashMap<RoomKey, HashMap<PeerId, Sender<RoomEvent>>>,
}

/// In-process relay: every `LoopbackRoom` joined under the same
/// (app id, room id) pair sees the others' joins, leaves, and
/// broadcasts. Cloning shares the hub.
#[derive(Clone)]
pub struct RoomHub {
    inner: Arc<Mutex<HubInner>>,
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 1,
                closed: false,
                rooms: HashMap::new(),
            })),
        }
    }

    /// Join a room, announcing the newcomer to existing members and the
    /// existing members to the newcomer.
    pub fn join(&self, app_id: &str, room_id: &str) -> Result<LoopbackRoom, ConnectionError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ConnectionError::Unreachable {
                room: room_id.to_string(),
                reason: "relay is closed".to_string(),
            });
        }

        let id = PeerId(inner.next_id);
        inner.next_id += 1;

        let key = (app_id.to_string(), room_id.to_string());
        let (tx, rx) = unbounded();
        let members = inner.rooms.entry(key.clone()).or_default();
        for (other, sender) in members.iter() {
            let _ = sender.send(RoomEvent::PeerJoined(id));
            let _ = tx.send(RoomEvent::PeerJoined(*other));
        }
        members.insert(id, tx);

        log::info!("[RoomHub] {} joined {}/{}", id, key.0, key.1);
        Ok(LoopbackRoom {
            hub: Arc::clone(&self.inner),
            key,
            id,
            rx,
        })
    }

    /// Refuse all future joins. Existing sessions keep running.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }
}

/// One endpoint of the in-process mesh
pub struct LoopbackRoom {
    hub: Arc<Mutex<HubInner>>,
    key: RoomKey,
    id: PeerId,
    rx: Receiver<RoomEvent>,
}

impl RoomChannel for LoopbackRoom {
    fn local_id(&self) -> PeerId {
        self.id
    }

    fn broadcast(&self, payload: &[u8]) {
        let targets: Vec<Sender<RoomEvent>> = {
            let inner = self.hub.lock();
            match inner.rooms.get(&self.key) {
                Some(members) => members
                    .iter()
                    .filter(|(other, _)| **other != self.id)
                    .map(|(_, sender)| sender.clone())
                    .collect(),
                None => Vec::new(),
            }
        };
        for sender in targets {
            let _ = sender.send(RoomEvent::Message {
                from: self.id,
                payload: payload.to_vec(),
            });
        }
    }

    fn poll(&mut self) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn peer_count(&self) -> usize {
        let inner = self.hub.lock();
        inner
            .rooms
            .get(&self.key)
            .map_or(0, |members| members.len().saturating_sub(1))
    }
}

impl Drop for LoopbackRoom {
    fn drop(&mut self) {
        let mut inner = self.hub.lock();
        if let Some(members) = inner.rooms.get_mut(&self.key) {
            members.remove(&self.id);
            for sender in members.values() {
                let _ = sender.send(RoomEvent::PeerLeft(self.id));
            }
            if members.is_empty() {
                inner.rooms.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = "vigil-park";

    #[test]
    fn test_join_announces_both_sides() {
        let hub = RoomHub::new();
        let mut a = hub.join(APP, "garden").unwrap();
        let mut b = hub.join(APP, "garden").unwrap();

        assert_eq!(a.poll(), vec![RoomEvent::PeerJoined(b.local_id())]);
        assert_eq!(b.poll(), vec![RoomEvent::PeerJoined(a.local_id())]);
        assert_eq!(a.peer_count(), 1);
    }

    #[test]
    fn test_broadcast_reaches_others_not_self() {
        let hub = RoomHub::new();
        let mut a = hub.join(APP, "garden").unwrap();
        let mut b = hub.join(APP, "garden").unwrap();
        a.poll();
        b.poll();

        a.broadcast(b"hello");
        assert!(a.poll().is_empty());
        assert_eq!(
            b.poll(),
            vec![RoomEvent::Message {
                from: a.local_id(),
                payload: b"hello".to_vec(),
            }]
        );
    }

    #[test]
    fn test_drop_notifies_leave() {
        let hub = RoomHub::new();
        let a = hub.join(APP, "garden").unwrap();
        let mut b = hub.join(APP, "garden").unwrap();
        b.poll();

        let a_id = a.local_id();
        drop(a);
        assert_eq!(b.poll(), vec![RoomEvent::PeerLeft(a_id)]);
        assert_eq!(b.peer_count(), 0);
    }

    #[test]
    fn test_rooms_are_isolated() {
        let hub = RoomHub::new();
        let a = hub.join(APP, "garden").unwrap();
        let mut b = hub.join(APP, "orchard").unwrap();

        a.broadcast(b"x");
        assert!(b.poll().is_empty());
        assert_eq!(a.peer_count(), 0);
    }

    #[test]
    fn test_closed_hub_refuses_joins() {
        let hub = RoomHub::new();
        hub.close();
        match hub.join(APP, "garden") {
            Err(ConnectionError::Unreachable { room, .. }) => assert_eq!(room, "garden"),
            other => panic!("expected unreachable, got {:?}", other.map(|r| r.local_id())),
        }
    }

    #[test]
    fn test_same_sender_messages_stay_ordered() {
        let hub = RoomHub::new();
        let a = hub.join(APP, "garden").unwrap();
        let mut b = hub.join(APP, "garden").unwrap();
        b.poll();

        for i in 0..10u8 {
            a.broadcast(&[i]);
        }
        let payloads: Vec<u8> = b
            .poll()
            .into_iter()
            .filter_map(|e| match e {
                RoomEvent::Message { payload, .. } => Some(payload[0]),
                _ => None,
            })
            .collect();
        assert_eq!(payloads, (0..10).collect::<Vec<u8>>());
    }
}
