//! Scripted park visitors
//!
//! A wanderer loops between waiting and walking: pick a point near its
//! anchor, stroll there, linger, repeat. A zero wander radius makes a
//! stationary idler. NPCs clamp to the terrain and load their
//! characters through the same ticketed asset path as peers.

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::anim::AnimationPlayer;
use crate::assets::{height_scale, CharacterModel, CharacterSource, LoadOwner, LoadTicket, Visual};
use crate::constants::npc::*;
use crate::error::AssetLoadError;
use crate::net::protocol::wrap_angle;
use crate::terrain::TerrainField;

/// Where an NPC lives and what it looks like
#[derive(Debug, Clone)]
pub struct WandererSpec {
    pub name: String,
    pub character: String,
    pub anchor: Vec2,
    /// Zero keeps the NPC planted at its anchor
    pub wander_radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Waiting { remaining: f32 },
    Walking { target: Vec2 },
}

pub struct Wanderer {
    pub spec: WandererSpec,
    pub position: Vec3,
    pub yaw: f32,
    phase: Phase,
    pub visual: Visual,
    pub animation: AnimationPlayer,
}

impl Wanderer {
    pub fn new(spec: WandererSpec, field: &TerrainField) -> Self {
        let y = field.height(spec.anchor.x, spec.anchor.y);
        let position = Vec3::new(spec.anchor.x, y, spec.anchor.y);
        Self {
            spec,
            position,
            yaw: 0.0,
            phase: Phase::Waiting {
                remaining: WAIT_MIN_SECONDS,
            },
            visual: Visual::pending(),
            animation: AnimationPlayer::default(),
        }
    }

    /// Ask the loader for this NPC's character. `index` is the slot the
    /// world tracks this NPC under.
    pub fn request_model(&self, index: usize, assets: &mut dyn CharacterSource) {
        assets.request(
            &self.spec.character,
            LoadTicket {
                owner: LoadOwner::Npc(index),
                generation: 0,
            },
        );
    }

    /// NPCs never swap characters, so any load for them is generation 0.
    pub fn apply_load(
        &mut self,
        outcome: Result<CharacterModel, AssetLoadError>,
        reference_height: Option<f32>,
    ) {
        match outcome {
            Ok(model) => {
                let scale = height_scale(model.native_height(), reference_height);
                self.visual = Visual::Model { model, scale };
                self.animation
                    .play_or_idle(self.visual.clips(), "idle", CROSSFADE);
            }
            Err(err) => {
                log::warn!(
                    "[Npc] '{}' model load failed: {err}; keeping placeholder",
                    self.spec.name
                );
                self.visual = Visual::failed();
            }
        }
    }

    /// Steer directly for a point, interrupting any wait.
    pub fn walk_to(&mut self, target: Vec2) {
        self.phase = Phase::Walking { target };
    }

    pub fn is_walking(&self) -> bool {
        matches!(self.phase, Phase::Walking { .. })
    }

    pub fn update(&mut self, field: &TerrainField, dt: f32) {
        match self.phase {
            Phase::Waiting { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 && self.spec.wander_radius > 0.0 {
                    let mut rng = rand::thread_rng();
                    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
                    let radius = rng.gen::<f32>() * self.spec.wander_radius;
                    self.phase = Phase::Walking {
                        target: self.spec.anchor + Vec2::new(angle.cos(), angle.sin()) * radius,
                    };
                } else {
                    self.phase = Phase::Waiting { remaining };
                }
                self.animation
                    .play(self.visual.clips(), "idle", CROSSFADE);
            }
            Phase::Walking { target } => {
                let here = Vec2::new(self.position.x, self.position.z);
                let offset = target - here;
                let distance = offset.length();
                if distance < ARRIVE_DISTANCE {
                    let mut rng = rand::thread_rng();
                    self.phase = Phase::Waiting {
                        remaining: WAIT_MIN_SECONDS + rng.gen::<f32>() * WAIT_SPREAD_SECONDS,
                    };
                } else {
                    let step = (WALK_SPEED * dt).min(distance);
                    let dir = offset / distance;
                    self.position.x += dir.x * step;
                    self.position.z += dir.y * step;

                    let desired = dir.x.atan2(dir.y);
                    let diff = wrap_angle(desired - self.yaw);
                    self.yaw = wrap_angle(self.yaw + diff * (TURN_RATE * dt).min(1.0));
                    self.animation
                        .play(self.visual.clips(), "walk", CROSSFADE);
                }
            }
        }
        self.position.y = field.height(self.position.x, self.position.z);
    }
}
