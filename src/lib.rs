// Vigil Engine - a shared memorial park
//
// An open procedural landscape streamed in chunks around the player,
// with best-effort presence replication so visitors see each other
// walk the same ground. The engine is headless: hosts own the window,
// renderer, input devices, transport, and asset pipeline, and drive
// `WorldState::advance` once per frame.
//
// Subsystem seams are traits so every piece runs under plain `cargo
// test`:
// - net::RoomChannel for the transport (loopback hub included)
// - assets::CharacterSource for model loading (scripted source included)

// Constants module
pub mod constants;

// Core simulation modules
pub mod anim;
pub mod assets;
pub mod error;
pub mod npc;
pub mod peers;
pub mod player;
pub mod terrain;
pub mod vehicle;
pub mod world_state;

// Networking
pub mod net;

pub use error::{AssetLoadError, ConnectionError, ProtocolError};

// === Terrain ===
pub use terrain::{
    Chunk, ChunkManager, ChunkManagerConfig, ChunkPos, ChunkStats, DecorInstance, DecorKind,
    Surface, TerrainField, TerrainParams, TerrainVertex,
};

// === Replication ===
pub use net::{
    PeerId, PlayerSnapshot, RoomChannel, RoomEvent, RoomHub, SnapshotPublisher,
};
pub use peers::{PeerRecord, PeerStore};

// === Entities and assets ===
pub use assets::{CharacterModel, CharacterSource, LoadOwner, LoadTicket, Visual};
pub use npc::{Wanderer, WandererSpec};
pub use player::{AvatarInput, LocalAvatar};
pub use vehicle::{DriveInput, Vehicle};

// === Frame orchestration ===
pub use world_state::{FrameInput, FrameReport, SessionState, WorldConfig, WorldState};
