//! World aggregate and frame orchestration
//!
//! `WorldState` owns every subsystem and advances them in a fixed
//! order each frame: drain network events, drain asset completions,
//! integrate entities, stream chunks, reconcile peers, publish. The
//! host owns rendering and the real transport/loader; both reach the
//! world through the trait seams, so the whole loop runs headless.

use glam::Vec2;

use crate::assets::{CharacterSource, LoadOwner, LoadWatchdog};
use crate::error::ConnectionError;
use crate::net::protocol::PlayerSnapshot;
use crate::net::{PublishStats, PublisherConfig, SnapshotPublisher};
use crate::net::{RoomChannel, RoomEvent, RoomHub};
use crate::npc::{Wanderer, WandererSpec};
use crate::peers::{PeerStore, PeerStoreConfig};
use crate::player::{AvatarConfig, AvatarInput, LocalAvatar};
use crate::terrain::{AdvanceReport, ChunkManager, ChunkManagerConfig, ChunkStats};
use crate::terrain::{Chunk, TerrainField, TerrainParams};
use crate::vehicle::{DriveInput, Vehicle, VehicleConfig};

/// Whether the world is part of a shared session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Offline,
    Online,
}

/// Everything the world needs at construction
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub player_name: String,
    pub character: String,
    /// Where the avatar first stands
    pub spawn: Vec2,
    pub terrain: TerrainParams,
    pub chunks: ChunkManagerConfig,
    pub peers: PeerStoreConfig,
    pub publisher: PublisherConfig,
    pub avatar: AvatarConfig,
    pub vehicle: Option<VehicleConfig>,
    pub npcs: Vec<WandererSpec>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player_name: "visitor".to_string(),
            character: "visitor".to_string(),
            spawn: Vec2::new(0.0, 5.0),
            terrain: TerrainParams::default(),
            chunks: ChunkManagerConfig::default(),
            peers: PeerStoreConfig::default(),
            publisher: PublisherConfig::default(),
            avatar: AvatarConfig::default(),
            vehicle: Some(VehicleConfig::default()),
            npcs: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// The stock park population: one strolling visitor, one
    /// groundskeeper planted by the east lamps, and the car.
    pub fn park(player_name: &str, character: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            character: character.to_string(),
            npcs: vec![
                WandererSpec {
                    name: "strolling visitor".into(),
                    character: "stroller".into(),
                    anchor: Vec2::new(30.0, -20.0),
                    wander_radius: 30.0,
                },
                WandererSpec {
                    name: "groundskeeper".into(),
                    character: "keeper".into(),
                    anchor: Vec2::new(28.0, 10.0),
                    wander_radius: 0.0,
                },
            ],
            ..Self::default()
        }
    }
}

/// One frame of host input
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub avatar: AvatarInput,
    /// Steering while driving; ignored on foot
    pub drive: Option<DriveInput>,
    pub enter_vehicle: bool,
    pub exit_vehicle: bool,
    pub respawn: bool,
}

/// What changed this frame, for the host's scene graph
#[derive(Debug, Default)]
pub struct FrameReport {
    pub chunks: AdvanceReport,
    pub published: bool,
}

/// The whole simulation, advanced one frame at a time
pub struct WorldState {
    field: TerrainField,
    chunks: ChunkManager,
    peers: PeerStore,
    publisher: SnapshotPublisher,
    avatar: LocalAvatar,
    vehicle: Option<Vehicle>,
    npcs: Vec<Wanderer>,
    channel: Option<Box<dyn RoomChannel>>,
    watchdog: LoadWatchdog,
    reference_height: Option<f32>,
    clock: f64,
    frame: u64,
}

impl WorldState {
    /// Build the world and fire the boot-time asset requests (avatar,
    /// NPCs, vehicle) through the host's loader.
    pub fn new(config: WorldConfig, assets: &mut dyn CharacterSource) -> Self {
        let field = TerrainField::new(config.terrain.clone());
        let mut avatar = LocalAvatar::new(config.avatar, &config.player_name, &config.character);
        avatar.place(&field, config.spawn);

        let npcs: Vec<Wanderer> = config
            .npcs
            .into_iter()
            .map(|spec| Wanderer::new(spec, &field))
            .collect();
        let vehicle = config.vehicle.map(|cfg| Vehicle::new(cfg, &field));

        let mut watchdog = LoadWatchdog::default();
        avatar.request_model(assets);
        watchdog.on_request(0.0);
        for (index, npc) in npcs.iter().enumerate() {
            npc.request_model(index, assets);
            watchdog.on_request(0.0);
        }
        if let Some(vehicle) = &vehicle {
            vehicle.request_model(assets);
            watchdog.on_request(0.0);
        }

        Self {
            field,
            chunks: ChunkManager::new(config.chunks),
            peers: PeerStore::new(config.peers),
            publisher: SnapshotPublisher::new(config.publisher),
            avatar,
            vehicle,
            npcs,
            channel: None,
            watchdog,
            reference_height: None,
            clock: 0.0,
            frame: 0,
        }
    }

    /// Join a shared room, or stay single-player if the relay refuses.
    /// Returns whether the world is now online.
    pub fn connect(&mut self, hub: &RoomHub, app_id: &str, room_id: &str) -> bool {
        match hub.join(app_id, room_id) {
            Ok(room) => {
                self.go_online(Box::new(room));
                true
            }
            Err(err) => {
                self.log_degrade(&err);
                false
            }
        }
    }

    /// Attach an established transport session.
    pub fn go_online(&mut self, channel: Box<dyn RoomChannel>) {
        log::info!(
            "[World] online as {} ({} peers already present)",
            channel.local_id(),
            channel.peer_count()
        );
        self.channel = Some(channel);
    }

    fn log_degrade(&self, err: &ConnectionError) {
        log::warn!("[World] {err}; continuing single-player");
    }

    pub fn session(&self) -> SessionState {
        if self.channel.is_some() {
            SessionState::Online
        } else {
            SessionState::Offline
        }
    }

    /// Advance one frame.
    pub fn advance(
        &mut self,
        input: &FrameInput,
        assets: &mut dyn CharacterSource,
        dt: f32,
    ) -> FrameReport {
        self.clock += f64::from(dt);
        self.frame += 1;
        let mut report = FrameReport::default();

        self.pump_network(assets);
        self.pump_assets(assets);
        self.step_entities(input, dt);

        report.chunks = self
            .chunks
            .advance(&self.field, self.avatar.position.x, self.avatar.position.z);

        self.peers.tick(dt);

        if let Some(channel) = &self.channel {
            report.published =
                self.publisher
                    .publish(self.clock, &self.avatar.snapshot(), channel.as_ref());
        }
        report
    }

    /// Drain transport events. A snapshot from an unknown sender is an
    /// implicit join; a malformed payload costs the message, never the
    /// peer.
    fn pump_network(&mut self, assets: &mut dyn CharacterSource) {
        let Some(channel) = &mut self.channel else {
            return;
        };
        let events = channel.poll();
        for event in events {
            match event {
                RoomEvent::PeerJoined(id) => {
                    log::debug!("[World] {id} joined; sending immediate snapshot");
                    if let Some(channel) = &self.channel {
                        self.publisher
                            .publish_now(&self.avatar.snapshot(), channel.as_ref());
                    }
                }
                RoomEvent::PeerLeft(id) => self.peers.peer_left(id),
                RoomEvent::Message { from, payload } => match PlayerSnapshot::decode(&payload) {
                    Ok(snapshot) => self.peers.apply_snapshot(from, &snapshot, assets),
                    Err(err) => {
                        log::warn!("[World] rejected snapshot from {from}: {err}");
                    }
                },
            }
        }
    }

    /// Drain finished loads and route them by ticket owner. Stale
    /// generations and departed owners fall on the floor by design.
    fn pump_assets(&mut self, assets: &mut dyn CharacterSource) {
        for result in assets.poll() {
            match result.ticket.owner {
                LoadOwner::Avatar => {
                    self.watchdog.on_completion();
                    if let Ok(model) = &result.outcome {
                        let current = result.ticket.generation == self.avatar.generation();
                        if current && self.reference_height.is_none() {
                            // The avatar's own model defines the height
                            // every other character normalizes against.
                            self.reference_height = Some(model.native_height());
                        }
                    }
                    self.avatar.apply_load(
                        result.ticket.generation,
                        result.outcome,
                        self.reference_height,
                    );
                }
                LoadOwner::Peer(id) => {
                    self.peers.apply_load(
                        id,
                        result.ticket.generation,
                        result.outcome,
                        self.reference_height,
                    );
                }
                LoadOwner::Npc(index) => {
                    self.watchdog.on_completion();
                    match self.npcs.get_mut(index) {
                        Some(npc) => npc.apply_load(result.outcome, self.reference_height),
                        None => log::debug!("[World] load for unknown npc slot {index}"),
                    }
                }
                LoadOwner::Vehicle => {
                    self.watchdog.on_completion();
                    if let Some(vehicle) = &mut self.vehicle {
                        vehicle.apply_load(result.outcome);
                    }
                }
            }
        }
    }

    fn step_entities(&mut self, input: &FrameInput, dt: f32) {
        let driving = self
            .vehicle
            .as_ref()
            .map_or(false, |vehicle| vehicle.occupied());

        if driving {
            if let Some(vehicle) = &mut self.vehicle {
                if input.exit_vehicle {
                    let spot = vehicle.exit();
                    self.avatar.place(&self.field, Vec2::new(spot.x, spot.z));
                } else {
                    vehicle.update(
                        Some(input.drive.unwrap_or_default()),
                        self.avatar.position,
                        &self.field,
                        dt,
                    );
                    self.avatar.set_transform(vehicle.position, vehicle.yaw);
                }
            }
        } else {
            if input.respawn {
                self.avatar.respawn(&self.field);
            }
            if input.enter_vehicle {
                if let Some(vehicle) = &mut self.vehicle {
                    vehicle.try_enter(self.avatar.position);
                }
            }
            self.avatar.update(&input.avatar, &self.field, dt);
            if let Some(vehicle) = &mut self.vehicle {
                vehicle.update(None, self.avatar.position, &self.field, dt);
            }
        }

        for npc in &mut self.npcs {
            npc.update(&self.field, dt);
        }
    }

    // ===== Accessors for the host's render extraction =====

    pub fn field(&self) -> &TerrainField {
        &self.field
    }

    pub fn avatar(&self) -> &LocalAvatar {
        &self.avatar
    }

    pub fn avatar_mut(&mut self) -> &mut LocalAvatar {
        &mut self.avatar
    }

    pub fn peers(&self) -> &PeerStore {
        &self.peers
    }

    pub fn npcs(&self) -> &[Wanderer] {
        &self.npcs
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn resident_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.resident()
    }

    pub fn chunk_stats(&self) -> ChunkStats {
        self.chunks.stats()
    }

    pub fn publish_stats(&self) -> PublishStats {
        self.publisher.stats()
    }

    /// Everyone in the shared space, self included
    pub fn population(&self) -> usize {
        self.peers.len() + 1
    }

    /// Height other characters normalize to, once the avatar loaded
    pub fn reference_height(&self) -> Option<f32> {
        self.reference_height
    }

    /// Boot asset loading has been quiet past the grace period
    pub fn loading_stalled(&self) -> bool {
        self.watchdog.stalled(self.clock)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
