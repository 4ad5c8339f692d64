//! Procedural terrain: pure field, chunk tiles, windowed streaming
//!
//! Architecture overview:
//! - `field` is the ground truth: deterministic height/classification
//!   over unbounded coordinates, queried by mesh generation and by
//!   every entity that clamps to the ground
//! - `chunk` turns a grid coordinate into a tile: vertex lattice,
//!   normals, per-vertex tint, and prop placement
//! - `streaming` owns residency: the active window around the focus,
//!   lazy generation, and eviction the frame a chunk leaves the window

pub mod chunk;
pub mod field;
pub mod streaming;

pub use chunk::{Chunk, ChunkMesh, ChunkPos, DecorInstance, DecorKind, TerrainVertex};
pub use field::{Surface, TerrainField, TerrainParams, TerrainSample};
pub use streaming::{AdvanceReport, ChunkManager, ChunkManagerConfig, ChunkStats};
