//! Windowed chunk residency around a moving focus
//!
//! The manager keeps exactly the chunks within the draw distance of the
//! focus chunk resident. Residency is rediffed only when the focus
//! crosses a chunk border, and the diff walks the window and the
//! resident set, never the history of everything generated.

use rustc_hash::FxHashMap;

use crate::constants::terrain::DRAW_DISTANCE;
use crate::terrain::chunk::{Chunk, ChunkPos};
use crate::terrain::field::TerrainField;

/// Streaming policy
#[derive(Debug, Clone)]
pub struct ChunkManagerConfig {
    /// Chebyshev radius of the active window, in chunks
    pub draw_distance: i32,
}

impl Default for ChunkManagerConfig {
    fn default() -> Self {
        Self {
            draw_distance: DRAW_DISTANCE,
        }
    }
}

/// Residency counters
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkStats {
    pub resident: usize,
    pub generated_total: u64,
    pub evicted_total: u64,
    pub window_recomputes: u64,
}

/// Chunks that changed residency during one `advance`
#[derive(Debug, Clone, Default)]
pub struct AdvanceReport {
    pub loaded: Vec<ChunkPos>,
    pub evicted: Vec<ChunkPos>,
}

impl AdvanceReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.evicted.is_empty()
    }
}

/// Generates and evicts chunks as the focus moves
pub struct ChunkManager {
    config: ChunkManagerConfig,
    chunks: FxHashMap<ChunkPos, Chunk>,
    focus: Option<ChunkPos>,
    stats: ChunkStats,
}

impl ChunkManager {
    pub fn new(config: ChunkManagerConfig) -> Self {
        Self {
            config,
            chunks: FxHashMap::default(),
            focus: None,
            stats: ChunkStats::default(),
        }
    }

    /// Retarget the window at a world-space focus. No-ops unless the
    /// focus chunk changed. Jumps of any size are fine: the window is
    /// recomputed whole, never stepped. Non-finite focus coordinates
    /// are ignored and leave the previous window resident.
    pub fn advance(&mut self, field: &TerrainField, focus_x: f32, focus_z: f32) -> AdvanceReport {
        if !focus_x.is_finite() || !focus_z.is_finite() {
            log::warn!("[ChunkManager] ignoring non-finite focus ({focus_x}, {focus_z})");
            return AdvanceReport::default();
        }

        let focus = ChunkPos::of_world(focus_x, focus_z);
        if self.focus == Some(focus) {
            return AdvanceReport::default();
        }
        self.focus = Some(focus);
        self.stats.window_recomputes += 1;

        let d = self.config.draw_distance;
        let mut report = AdvanceReport::default();

        for dz in -d..=d {
            for dx in -d..=d {
                let pos = ChunkPos::new(focus.x + dx, focus.z + dz);
                if !self.chunks.contains_key(&pos) {
                    self.chunks.insert(pos, Chunk::generate(field, pos));
                    report.loaded.push(pos);
                }
            }
        }

        report.evicted = self
            .chunks
            .keys()
            .filter(|pos| pos.chebyshev(focus) > d)
            .copied()
            .collect();
        for pos in &report.evicted {
            self.chunks.remove(pos);
        }

        self.stats.generated_total += report.loaded.len() as u64;
        self.stats.evicted_total += report.evicted.len() as u64;
        self.stats.resident = self.chunks.len();

        if !report.is_empty() {
            log::debug!(
                "[ChunkManager] focus {} -> +{} -{} chunks ({} resident)",
                focus,
                report.loaded.len(),
                report.evicted.len(),
                self.chunks.len()
            );
        }
        report
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn is_resident(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn resident(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Focus chunk from the last accepted advance
    pub fn focus(&self) -> Option<ChunkPos> {
        self.focus
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::field::TerrainParams;
    use std::collections::HashSet;

    fn setup() -> (TerrainField, ChunkManager) {
        (
            TerrainField::new(TerrainParams::default()),
            ChunkManager::new(ChunkManagerConfig { draw_distance: 2 }),
        )
    }

    fn expected_window(focus: ChunkPos, d: i32) -> HashSet<ChunkPos> {
        let mut set = HashSet::new();
        for dz in -d..=d {
            for dx in -d..=d {
                set.insert(ChunkPos::new(focus.x + dx, focus.z + dz));
            }
        }
        set
    }

    fn resident_set(mgr: &ChunkManager) -> HashSet<ChunkPos> {
        mgr.resident().map(|c| c.pos).collect()
    }

    #[test]
    fn test_window_tracks_focus_exactly() {
        let (field, mut mgr) = setup();
        // Walks, border crossings, a long teleport, negative space.
        let route = [
            (0.0, 0.0),
            (49.0, 10.0),
            (101.0, 10.0),
            (150.0, -320.0),
            (5000.0, 5000.0),
            (-9999.0, 42.0),
            (-9999.0, 42.0),
        ];
        for (x, z) in route {
            mgr.advance(&field, x, z);
            let focus = ChunkPos::of_world(x, z);
            assert_eq!(resident_set(&mgr), expected_window(focus, 2), "at ({x}, {z})");
        }
    }

    #[test]
    fn test_advance_noops_within_chunk() {
        let (field, mut mgr) = setup();
        mgr.advance(&field, 10.0, 10.0);
        let before = mgr.stats();
        let report = mgr.advance(&field, 60.0, 90.0);
        assert!(report.is_empty());
        assert_eq!(mgr.stats().window_recomputes, before.window_recomputes);
    }

    #[test]
    fn test_border_step_loads_one_column() {
        let (field, mut mgr) = setup();
        mgr.advance(&field, 50.0, 50.0);
        let report = mgr.advance(&field, 150.0, 50.0);
        assert_eq!(report.loaded.len(), 5);
        assert_eq!(report.evicted.len(), 5);
        assert!(report.loaded.iter().all(|p| p.x == 3));
        assert!(report.evicted.iter().all(|p| p.x == -2));
    }

    #[test]
    fn test_non_finite_focus_keeps_window() {
        let (field, mut mgr) = setup();
        mgr.advance(&field, 0.0, 0.0);
        let before = resident_set(&mgr);
        for (x, z) in [(f32::NAN, 0.0), (0.0, f32::INFINITY), (f32::NEG_INFINITY, f32::NAN)] {
            let report = mgr.advance(&field, x, z);
            assert!(report.is_empty());
            assert_eq!(resident_set(&mgr), before);
        }
        // A finite focus afterwards still works.
        mgr.advance(&field, 300.0, 0.0);
        assert_eq!(
            resident_set(&mgr),
            expected_window(ChunkPos::new(3, 0), 2)
        );
    }

    #[test]
    fn test_reentered_chunk_regenerates_identically() {
        let (field, mut mgr) = setup();
        mgr.advance(&field, 0.0, 0.0);
        let first = mgr.chunk(ChunkPos::new(0, 0)).unwrap().mesh.clone();

        // Move far enough to evict the origin, then come back.
        mgr.advance(&field, 1000.0, 1000.0);
        assert!(!mgr.is_resident(ChunkPos::new(0, 0)));
        mgr.advance(&field, 0.0, 0.0);

        let second = &mgr.chunk(ChunkPos::new(0, 0)).unwrap().mesh;
        assert_eq!(&first, second);
    }

    #[test]
    fn test_stats_accumulate() {
        let (field, mut mgr) = setup();
        mgr.advance(&field, 0.0, 0.0);
        mgr.advance(&field, 1000.0, 0.0);
        let stats = mgr.stats();
        assert_eq!(stats.resident, 25);
        assert_eq!(stats.generated_total, 50);
        assert_eq!(stats.evicted_total, 25);
        assert_eq!(stats.window_recomputes, 2);
    }
}
