//! Peer-to-peer replication plumbing
//!
//! Architecture overview:
//! - `protocol` defines the one wire message (a full avatar snapshot)
//!   and validates it at the boundary
//! - `channel` is the transport seam: join/leave/message events drained
//!   by the frame loop, with an in-process loopback mesh for tests
//! - `publish` throttles outbound snapshots and handles the immediate
//!   send owed to a freshly joined peer

pub mod channel;
pub mod protocol;
pub mod publish;

pub use channel::{LoopbackRoom, PeerId, RoomChannel, RoomEvent, RoomHub};
pub use protocol::{wrap_angle, PlayerSnapshot};
pub use publish::{PublisherConfig, PublishStats, SnapshotPublisher};
