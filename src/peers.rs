//! Remote peer records and per-frame reconciliation
//!
//! A peer exists the moment anything arrives from it: a snapshot from
//! an unknown sender is an implicit join, because join notifications
//! and first messages race on a serverless mesh. Records own their
//! visuals outright, so departure is a plain map removal and the
//! generation stamp on asset requests keeps late completions from
//! touching anything that changed since.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::anim::AnimationPlayer;
use crate::assets::{height_scale, CharacterModel, CharacterSource, LoadOwner, LoadTicket, Visual};
use crate::constants::character::{CROSSFADE, MOVEMENT_CROSSFADE};
use crate::constants::replication::{LERP_RATE, TELEPORT_SNAP_DISTANCE};
use crate::error::AssetLoadError;
use crate::net::protocol::{wrap_angle, PlayerSnapshot};
use crate::net::PeerId;

/// Reconciliation tuning
#[derive(Debug, Clone)]
pub struct PeerStoreConfig {
    /// Exponential-decay rate toward the target transform
    pub lerp_rate: f32,
    /// Displayed/target distance beyond which the peer snaps
    pub teleport_snap_distance: f32,
}

impl Default for PeerStoreConfig {
    fn default() -> Self {
        Self {
            lerp_rate: LERP_RATE,
            teleport_snap_distance: TELEPORT_SNAP_DISTANCE,
        }
    }
}

/// Lifecycle counters
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerStats {
    pub joined: u64,
    pub departed: u64,
    pub snapshots_applied: u64,
    pub stale_loads_discarded: u64,
    pub failed_loads: u64,
}

/// Everything known about one remote participant
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub name: String,
    pub character: String,
    pub target_position: Vec3,
    pub target_yaw: f32,
    /// Smoothed, render-facing transform
    pub position: Vec3,
    pub yaw: f32,
    pub visual: Visual,
    pub animation: AnimationPlayer,
    /// Last animation name the peer declared, replayed after swaps
    pub requested_anim: String,
    /// Bumped on every character swap; stamps asset requests
    generation: u32,
}

impl PeerRecord {
    fn new(snapshot: &PlayerSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            character: snapshot.character.clone(),
            target_position: snapshot.position(),
            target_yaw: snapshot.ry,
            // First sight places the peer directly; there is nothing
            // meaningful to interpolate from.
            position: snapshot.position(),
            yaw: snapshot.ry,
            visual: Visual::pending(),
            animation: AnimationPlayer::default(),
            requested_anim: snapshot.anim.clone(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// All live peers, keyed by transport identifier
pub struct PeerStore {
    config: PeerStoreConfig,
    records: FxHashMap<PeerId, PeerRecord>,
    stats: PeerStats,
}

impl PeerStore {
    pub fn new(config: PeerStoreConfig) -> Self {
        Self {
            config,
            records: FxHashMap::default(),
            stats: PeerStats::default(),
        }
    }

    /// Fold one validated snapshot into the store, creating the record
    /// if this sender is new and kicking off whatever asset load the
    /// declared character requires.
    pub fn apply_snapshot(
        &mut self,
        from: PeerId,
        snapshot: &PlayerSnapshot,
        assets: &mut dyn CharacterSource,
    ) {
        self.stats.snapshots_applied += 1;

        let record = self.records.entry(from).or_insert_with(|| {
            self.stats.joined += 1;
            log::info!(
                "[PeerStore] first sight of {from}: '{}' as '{}'",
                snapshot.name,
                snapshot.character
            );
            let record = PeerRecord::new(snapshot);
            assets.request(
                &snapshot.character,
                LoadTicket {
                    owner: LoadOwner::Peer(from),
                    generation: 0,
                },
            );
            record
        });

        record.target_position = snapshot.position();
        record.target_yaw = snapshot.ry;
        record.name = snapshot.name.clone();

        if record.character != snapshot.character {
            record.character = snapshot.character.clone();
            record.generation += 1;
            record.visual = Visual::pending();
            record.animation.reset();
            log::debug!(
                "[PeerStore] {from} swapped to '{}' (generation {})",
                record.character,
                record.generation
            );
            assets.request(
                &record.character,
                LoadTicket {
                    owner: LoadOwner::Peer(from),
                    generation: record.generation,
                },
            );
        }

        record.requested_anim = snapshot.anim.clone();
        let fade = fade_for(&snapshot.anim);
        record.animation.play(record.visual.clips(), &snapshot.anim, fade);
    }

    /// Smooth every displayed transform toward its target. Distances
    /// past the snap threshold teleport instead of sliding.
    pub fn tick(&mut self, dt: f32) {
        let step = (self.config.lerp_rate * dt).min(1.0);
        for record in self.records.values_mut() {
            let offset = record.target_position - record.position;
            if offset.length() > self.config.teleport_snap_distance {
                record.position = record.target_position;
            } else {
                record.position += offset * step;
            }

            let yaw_diff = wrap_angle(record.target_yaw - record.yaw);
            record.yaw = wrap_angle(record.yaw + yaw_diff * step);
        }
    }

    /// Drop the record and everything it owns. Safe to call for
    /// unknown ids (leave notifications can race departure cleanup).
    pub fn peer_left(&mut self, id: PeerId) {
        if self.records.remove(&id).is_some() {
            self.stats.departed += 1;
            log::info!("[PeerStore] {id} left ({} remain)", self.records.len());
        }
    }

    /// Apply a finished character load. Returns false when the result
    /// was discarded: owner gone, or the record swapped again since
    /// this request went out.
    pub fn apply_load(
        &mut self,
        id: PeerId,
        generation: u32,
        outcome: Result<CharacterModel, AssetLoadError>,
        reference_height: Option<f32>,
    ) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            log::debug!("[PeerStore] load finished for departed {id}; discarding");
            self.stats.stale_loads_discarded += 1;
            return false;
        };
        if record.generation != generation {
            log::debug!(
                "[PeerStore] stale load (generation {generation} != {}) for {id}; discarding",
                record.generation
            );
            self.stats.stale_loads_discarded += 1;
            return false;
        }

        match outcome {
            Ok(model) => {
                let scale = height_scale(model.native_height(), reference_height);
                record.visual = Visual::Model { model, scale };
                record
                    .animation
                    .play_or_idle(record.visual.clips(), &record.requested_anim, CROSSFADE);
                true
            }
            Err(err) => {
                log::warn!("[PeerStore] load failed for {id}: {err}; keeping placeholder");
                record.visual = Visual::failed();
                self.stats.failed_loads += 1;
                true
            }
        }
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeerId, &PeerRecord)> {
        self.records.iter().map(|(id, r)| (*id, r))
    }

    pub fn stats(&self) -> PeerStats {
        self.stats
    }
}

/// Movement clips fade faster so direction changes read immediately.
fn fade_for(anim: &str) -> f32 {
    let lower = anim.to_lowercase();
    if lower.contains("run") || lower.contains("walk") {
        MOVEMENT_CROSSFADE
    } else {
        CROSSFADE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ScriptedSource;

    fn snapshot(x: f32, z: f32, character: &str, anim: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            x,
            y: 0.0,
            z,
            ry: 1.57,
            character: character.into(),
            anim: anim.into(),
            name: "Bob".into(),
        }
    }

    fn store() -> PeerStore {
        PeerStore::new(PeerStoreConfig::default())
    }

    #[test]
    fn test_first_snapshot_creates_record_and_schedules_load() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(10.0, 5.0, "a", "walk"), &mut assets);

        assert_eq!(peers.len(), 1);
        let record = peers.get(PeerId(1)).unwrap();
        assert_eq!(record.target_position, Vec3::new(10.0, 0.0, 5.0));
        assert!((record.target_yaw - 1.57).abs() < 1e-6);
        assert!(record.visual.is_placeholder());

        assert_eq!(assets.pending().len(), 1);
        assert_eq!(assets.pending()[0].0, "a");
        assert_eq!(
            assets.pending()[0].1,
            LoadTicket {
                owner: LoadOwner::Peer(PeerId(1)),
                generation: 0,
            }
        );
    }

    #[test]
    fn test_duplicate_snapshot_is_idempotent() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        let snap = snapshot(10.0, 5.0, "a", "walk");
        peers.apply_snapshot(PeerId(1), &snap, &mut assets);
        peers.apply_snapshot(PeerId(1), &snap, &mut assets);

        assert_eq!(peers.len(), 1);
        // No second load for the same character.
        assert_eq!(assets.pending().len(), 1);
    }

    #[test]
    fn test_reconciliation_step_is_bounded() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "idle"), &mut assets);
        // Move the target a sub-threshold distance away.
        peers.apply_snapshot(PeerId(1), &snapshot(6.0, 0.0, "a", "walk"), &mut assets);

        let dt = 0.016;
        let step = LERP_RATE * dt;
        let mut previous = peers.get(PeerId(1)).unwrap().position;
        for _ in 0..30 {
            let gap_before = (peers.get(PeerId(1)).unwrap().target_position - previous).length();
            peers.tick(dt);
            let now = peers.get(PeerId(1)).unwrap().position;
            let moved = (now - previous).length();
            assert!(moved <= gap_before * step + 1e-4, "moved {moved} of {gap_before}");
            previous = now;
        }
        // Converging on the target, never past it.
        assert!((previous - Vec3::new(6.0, 0.0, 0.0)).length() < 6.0);
    }

    #[test]
    fn test_teleport_snaps_to_target() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "idle"), &mut assets);
        peers.apply_snapshot(PeerId(1), &snapshot(50.0, -30.0, "a", "idle"), &mut assets);

        peers.tick(0.016);
        assert_eq!(
            peers.get(PeerId(1)).unwrap().position,
            Vec3::new(50.0, 0.0, -30.0)
        );
    }

    #[test]
    fn test_yaw_takes_shortest_path() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        let mut snap = snapshot(0.0, 0.0, "a", "idle");
        snap.ry = 3.0;
        peers.apply_snapshot(PeerId(1), &snap, &mut assets);
        snap.ry = -3.0;
        peers.apply_snapshot(PeerId(1), &snap, &mut assets);

        peers.tick(0.016);
        let yaw = peers.get(PeerId(1)).unwrap().yaw;
        // Shortest path from 3.0 to -3.0 crosses pi, so yaw grows.
        assert!(yaw > 3.0 || yaw < -3.0, "yaw went the long way: {yaw}");
    }

    #[test]
    fn test_leave_removes_record_and_late_load_is_noop() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(1.0, 1.0, "a", "idle"), &mut assets);

        peers.peer_left(PeerId(1));
        assert!(peers.is_empty());

        let model = CharacterModel {
            character: "a".into(),
            native_size: Vec3::new(0.4, 1.6, 0.3),
            clips: vec!["Idle".into()],
        };
        assert!(!peers.apply_load(PeerId(1), 0, Ok(model), None));
        assert!(peers.is_empty());
        assert_eq!(peers.stats().stale_loads_discarded, 1);
    }

    #[test]
    fn test_character_swap_bumps_generation_and_discards_stale_load() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "idle"), &mut assets);
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "b", "idle"), &mut assets);

        let record = peers.get(PeerId(1)).unwrap();
        assert_eq!(record.character, "b");
        assert_eq!(record.generation(), 1);
        assert!(record.visual.is_placeholder());

        // The load for 'a' (generation 0) finishes after the swap.
        let stale = CharacterModel {
            character: "a".into(),
            native_size: Vec3::ONE,
            clips: vec!["Idle".into()],
        };
        assert!(!peers.apply_load(PeerId(1), 0, Ok(stale), None));
        assert!(peers.get(PeerId(1)).unwrap().visual.is_placeholder());

        // The load for 'b' (generation 1) applies.
        let fresh = CharacterModel {
            character: "b".into(),
            native_size: Vec3::new(0.5, 2.6, 0.4),
            clips: vec!["Idle".into(), "Walk".into()],
        };
        assert!(peers.apply_load(PeerId(1), 1, Ok(fresh), Some(1.3)));
        let record = peers.get(PeerId(1)).unwrap();
        match &record.visual {
            Visual::Model { scale, .. } => assert!((scale - 0.5).abs() < 1e-6),
            other => panic!("expected model, got {other:?}"),
        }
        assert_eq!(record.animation.current(), Some("Idle"));
    }

    #[test]
    fn test_failed_load_keeps_peer_with_error_placeholder() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "idle"), &mut assets);

        assert!(peers.apply_load(
            PeerId(1),
            0,
            Err(AssetLoadError::NotFound("a".into())),
            None,
        ));
        let record = peers.get(PeerId(1)).unwrap();
        assert_eq!(record.visual, Visual::failed());

        // State updates keep flowing afterwards.
        peers.apply_snapshot(PeerId(1), &snapshot(9.0, 9.0, "a", "run"), &mut assets);
        assert_eq!(
            peers.get(PeerId(1)).unwrap().target_position,
            Vec3::new(9.0, 0.0, 9.0)
        );
    }

    #[test]
    fn test_animation_resumes_after_model_arrives() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "walk"), &mut assets);
        // Placeholder has no clips yet.
        assert_eq!(peers.get(PeerId(1)).unwrap().animation.current(), None);

        let model = CharacterModel {
            character: "a".into(),
            native_size: Vec3::new(0.4, 1.6, 0.3),
            clips: vec!["Armature|Idle".into(), "Armature|Walk".into()],
        };
        peers.apply_load(PeerId(1), 0, Ok(model), None);
        assert_eq!(
            peers.get(PeerId(1)).unwrap().animation.current(),
            Some("Armature|Walk")
        );
    }

    #[test]
    fn test_movement_anim_uses_fast_fade() {
        let mut peers = store();
        let mut assets = ScriptedSource::new();
        peers.apply_snapshot(PeerId(1), &snapshot(0.0, 0.0, "a", "idle"), &mut assets);
        let model = CharacterModel {
            character: "a".into(),
            native_size: Vec3::ONE,
            clips: vec!["Idle".into(), "Run".into()],
        };
        peers.apply_load(PeerId(1), 0, Ok(model), None);

        peers.apply_snapshot(PeerId(1), &snapshot(1.0, 0.0, "a", "run"), &mut assets);
        let record = peers.get(PeerId(1)).unwrap();
        assert_eq!(record.animation.current(), Some("Run"));
        assert_eq!(record.animation.fade(), MOVEMENT_CROSSFADE);
    }
}
