//! Chunk geometry and decoration placement
//!
//! A chunk is a square terrain tile: a vertex lattice sampled from the
//! field plus the static props scattered over it. Everything here is a
//! pure function of (params, chunk coordinate), so an evicted chunk
//! rebuilds exactly.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::fmt;

use crate::constants::terrain::*;
use crate::terrain::field::{Surface, TerrainField};

/// Chunk grid coordinate (world position / chunk size, floored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Grid coordinate containing a world-space point
    pub fn of_world(x: f32, z: f32) -> Self {
        Self {
            x: (x / CHUNK_SIZE).floor() as i32,
            z: (z / CHUNK_SIZE).floor() as i32,
        }
    }

    /// World-space minimum corner of this chunk
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x as f32 * CHUNK_SIZE, self.z as f32 * CHUNK_SIZE)
    }

    /// Chebyshev distance in chunk units
    pub fn chebyshev(&self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// One terrain mesh vertex, host-uploadable as raw bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Chunk-local position; world = chunk origin + (x, 0, z)
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Triangle-list lattice for one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

/// Prop species placed on terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorKind {
    /// Memorial marker scattered through the grass
    Marker,
    Fountain,
    Lamp,
    Bench,
    Bush,
}

/// One placed prop instance
#[derive(Debug, Clone, PartialEq)]
pub struct DecorInstance {
    pub kind: DecorKind,
    /// Chunk-local position, y already clamped to ground
    pub position: Vec3,
    pub yaw: f32,
    /// Small (x, z) lean angles
    pub tilt: [f32; 2],
    pub scale: f32,
}

/// A resident terrain tile
pub struct Chunk {
    pub pos: ChunkPos,
    pub mesh: ChunkMesh,
    pub decorations: Vec<DecorInstance>,
}

impl Chunk {
    /// Build the tile at `pos`: mesh lattice plus either the scattered
    /// markers or, for the origin chunk, the fixed plaza layout.
    pub fn generate(field: &TerrainField, pos: ChunkPos) -> Self {
        let mesh = build_mesh(field, pos);
        let decorations = if pos.x == 0 && pos.z == 0 {
            plaza_props(field)
        } else {
            scatter_markers(field, pos)
        };
        Chunk {
            pos,
            mesh,
            decorations,
        }
    }

    /// World-space minimum corner
    pub fn origin(&self) -> Vec2 {
        self.pos.origin()
    }
}

/// Sample the field over a (R+1)^2 lattice and stitch triangles.
fn build_mesh(field: &TerrainField, pos: ChunkPos) -> ChunkMesh {
    let res = MESH_RESOLUTION;
    let step = CHUNK_SIZE / res as f32;
    let origin = pos.origin();

    let side = res + 1;
    let mut vertices = Vec::with_capacity(side * side);
    for gz in 0..side {
        for gx in 0..side {
            let local_x = gx as f32 * step;
            let local_z = gz as f32 * step;
            let wx = origin.x + local_x;
            let wz = origin.y + local_z;
            let s = field.sample(wx, wz);
            vertices.push(TerrainVertex {
                position: [local_x, s.height, local_z],
                normal: lattice_normal(field, wx, wz, step),
                color: s.surface.color(),
            });
        }
    }

    let mut indices = Vec::with_capacity(res * res * 6);
    for gz in 0..res {
        for gx in 0..res {
            let a = (gz * side + gx) as u32;
            let b = a + 1;
            let c = a + side as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    ChunkMesh { vertices, indices }
}

/// Central-difference normal on the pure height field. Sampling the
/// field rather than the lattice keeps normals seamless across chunk
/// borders.
fn lattice_normal(field: &TerrainField, wx: f32, wz: f32, step: f32) -> [f32; 3] {
    let hl = field.height(wx - step, wz);
    let hr = field.height(wx + step, wz);
    let hd = field.height(wx, wz - step);
    let hu = field.height(wx, wz + step);
    Vec3::new(hl - hr, 2.0 * step, hd - hu)
        .normalize()
        .to_array()
}

/// Scatter memorial markers over a non-origin chunk. Placement is
/// seeded by (world seed, chunk coordinate); rejected placements are
/// skipped, not retried, so marker count varies per chunk.
fn scatter_markers(field: &TerrainField, pos: ChunkPos) -> Vec<DecorInstance> {
    let origin = pos.origin();
    if origin.length() < DECOR_CHUNK_EXCLUSION {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(decor_seed(field.params().seed, pos));
    let mut placed = Vec::with_capacity(DECOR_PER_CHUNK);
    for _ in 0..DECOR_PER_CHUNK {
        let local_x = rng.gen::<f32>() * CHUNK_SIZE;
        let local_z = rng.gen::<f32>() * CHUNK_SIZE;
        let yaw = (rng.gen::<f32>() - 0.5) * std::f32::consts::PI;
        let tilt = [
            (rng.gen::<f32>() - 0.5) * 0.1,
            (rng.gen::<f32>() - 0.5) * 0.1,
        ];
        let scale = 1.0 + rng.gen::<f32>() * 0.3;

        let wx = origin.x + local_x;
        let wz = origin.y + local_z;
        if Vec2::new(wx, wz).length() < DECOR_CLEARANCE {
            continue;
        }
        let sample = field.sample(wx, wz);
        if sample.surface == Surface::Path {
            continue;
        }
        placed.push(DecorInstance {
            kind: DecorKind::Marker,
            position: Vec3::new(local_x, sample.height, local_z),
            yaw,
            tilt,
            scale,
        });
    }
    placed
}

/// Fixed plaza layout owned by the origin chunk: central fountain, a
/// lamp ring with benches between, and a bush fringe. Bush scatter is
/// seeded like marker placement so the origin chunk round-trips too.
fn plaza_props(field: &TerrainField) -> Vec<DecorInstance> {
    use std::f32::consts::TAU;

    let mut props = Vec::with_capacity(1 + 8 + 8 + 20);
    props.push(DecorInstance {
        kind: DecorKind::Fountain,
        position: Vec3::ZERO,
        yaw: 0.0,
        tilt: [0.0, 0.0],
        scale: 1.0,
    });

    for i in 0..8 {
        let angle = i as f32 / 8.0 * TAU;
        props.push(DecorInstance {
            kind: DecorKind::Lamp,
            position: Vec3::new(angle.cos() * 35.0, 0.0, angle.sin() * 35.0),
            yaw: 0.0,
            tilt: [0.0, 0.0],
            scale: 1.0,
        });
        let between = (i as f32 + 0.5) / 8.0 * TAU;
        props.push(DecorInstance {
            kind: DecorKind::Bench,
            // Benches face the fountain
            position: Vec3::new(between.cos() * 32.0, 0.0, between.sin() * 32.0),
            yaw: -between + std::f32::consts::FRAC_PI_2,
            tilt: [0.0, 0.0],
            scale: 1.0,
        });
    }

    let mut rng = StdRng::seed_from_u64(decor_seed(field.params().seed, ChunkPos::new(0, 0)));
    for _ in 0..20 {
        let angle = rng.gen::<f32>() * TAU;
        let radius = 38.0 + rng.gen::<f32>() * 4.0;
        let (x, z) = (angle.cos() * radius, angle.sin() * radius);
        props.push(DecorInstance {
            kind: DecorKind::Bush,
            position: Vec3::new(x, field.height(x, z), z),
            yaw: rng.gen::<f32>() * TAU,
            tilt: [0.0, 0.0],
            scale: 0.8 + rng.gen::<f32>() * 0.6,
        });
    }
    props
}

/// Mix the world seed and chunk coordinate into an RNG seed.
fn decor_seed(world_seed: u32, pos: ChunkPos) -> u64 {
    let mut h = u64::from(world_seed) ^ 0x9E37_79B9_7F4A_7C15;
    h ^= (pos.x as u32 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = h.rotate_left(27);
    h ^= (pos.z as u32 as u64).wrapping_mul(0x94D0_49BB_1331_11EB);
    h
}
