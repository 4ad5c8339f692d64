//! Local avatar kinematics and outbound state
//!
//! The avatar is the focus everything else keys off: chunk streaming
//! follows its position and the publisher serializes it. Movement is
//! velocity-integrated with gravity and a ground clamp against the
//! terrain field; the host supplies a world-space movement intent and
//! the triggers, already mapped from whatever input device it has.

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::anim::{idle_clips, AnimationPlayer};
use crate::assets::{height_scale, CharacterModel, CharacterSource, LoadOwner, LoadTicket, Visual};
use crate::constants::character::{CROSSFADE, IDLE_CROSSFADE, MOVEMENT_CROSSFADE};
use crate::constants::movement::*;
use crate::error::AssetLoadError;
use crate::net::protocol::{wrap_angle, PlayerSnapshot};
use crate::terrain::TerrainField;

/// Kinematic tuning
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub gravity: f32,
    pub jump_impulse: f32,
    pub turn_rate: f32,
    pub idle_cycle_seconds: f32,
    pub respawn_min_radius: f32,
    pub respawn_spread: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            walk_speed: WALK_SPEED,
            sprint_speed: SPRINT_SPEED,
            gravity: GRAVITY,
            jump_impulse: JUMP_IMPULSE,
            turn_rate: TURN_RATE,
            idle_cycle_seconds: IDLE_CYCLE_SECONDS,
            respawn_min_radius: RESPAWN_MIN_RADIUS,
            respawn_spread: RESPAWN_SPREAD,
        }
    }
}

/// One frame of local input, already mapped to world space
#[derive(Debug, Clone, Copy, Default)]
pub struct AvatarInput {
    /// Horizontal movement intent on the XZ plane; clamped to unit
    /// length before integration
    pub movement: Vec2,
    pub sprint: bool,
    pub jump: bool,
}

/// The player-controlled character
pub struct LocalAvatar {
    config: AvatarConfig,
    pub name: String,
    pub character: String,
    pub position: Vec3,
    pub yaw: f32,
    vertical_velocity: f32,
    grounded: bool,
    pub visual: Visual,
    pub animation: AnimationPlayer,
    generation: u32,
    idle_timer: f32,
    idle_index: usize,
}

impl LocalAvatar {
    pub fn new(config: AvatarConfig, name: &str, character: &str) -> Self {
        Self {
            config,
            name: name.to_string(),
            character: character.to_string(),
            position: Vec3::ZERO,
            yaw: 0.0,
            vertical_velocity: 0.0,
            grounded: true,
            visual: Visual::pending(),
            animation: AnimationPlayer::default(),
            generation: 0,
            idle_timer: 0.0,
            idle_index: 0,
        }
    }

    /// Ask the loader for this avatar's current character.
    pub fn request_model(&self, assets: &mut dyn CharacterSource) {
        assets.request(
            &self.character,
            LoadTicket {
                owner: LoadOwner::Avatar,
                generation: self.generation,
            },
        );
    }

    /// Swap to a different character: placeholder now, model later.
    pub fn select_character(&mut self, character: &str, assets: &mut dyn CharacterSource) {
        if self.character == character {
            return;
        }
        self.character = character.to_string();
        self.generation += 1;
        self.visual = Visual::pending();
        self.animation.reset();
        self.request_model(assets);
    }

    /// Apply a finished load if its generation still matches.
    pub fn apply_load(
        &mut self,
        generation: u32,
        outcome: Result<CharacterModel, AssetLoadError>,
        reference_height: Option<f32>,
    ) -> bool {
        if generation != self.generation {
            log::debug!("[Avatar] stale load (generation {generation}) discarded");
            return false;
        }
        match outcome {
            Ok(model) => {
                let scale = height_scale(model.native_height(), reference_height);
                self.visual = Visual::Model { model, scale };
                self.animation
                    .play_or_idle(self.visual.clips(), "idle", CROSSFADE);
                true
            }
            Err(err) => {
                log::warn!("[Avatar] model load failed: {err}; keeping placeholder");
                self.visual = Visual::failed();
                true
            }
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Integrate one frame of movement against the terrain.
    pub fn update(&mut self, input: &AvatarInput, field: &TerrainField, dt: f32) {
        let mut intent = input.movement;
        if intent.length_squared() > 1.0 {
            intent = intent.normalize();
        }
        let moving = intent.length_squared() > 1e-6;

        if input.jump && self.grounded {
            self.vertical_velocity = self.config.jump_impulse;
            self.grounded = false;
        }

        let speed = if input.sprint {
            self.config.sprint_speed
        } else {
            self.config.walk_speed
        };
        self.position.x += intent.x * speed * dt;
        self.position.z += intent.y * speed * dt;

        if moving {
            let desired = intent.x.atan2(intent.y);
            let diff = wrap_angle(desired - self.yaw);
            self.yaw = wrap_angle(self.yaw + diff * (self.config.turn_rate * dt).min(1.0));
        }

        self.vertical_velocity += self.config.gravity * dt;
        self.position.y += self.vertical_velocity * dt;
        let ground = field.height(self.position.x, self.position.z);
        if self.position.y <= ground {
            self.position.y = ground;
            self.vertical_velocity = 0.0;
            self.grounded = true;
        } else {
            self.grounded = false;
        }

        self.select_animation(moving, input.sprint, dt);
    }

    /// Land on a random point of the respawn annulus around the plaza.
    pub fn respawn(&mut self, field: &TerrainField) {
        let mut rng = rand::thread_rng();
        let angle = rng.gen::<f32>() * std::f32::consts::TAU;
        let radius = self.config.respawn_min_radius + rng.gen::<f32>() * self.config.respawn_spread;
        self.place(field, Vec2::new(angle.cos() * radius, angle.sin() * radius));
        log::info!("[Avatar] respawned at {:.1}", self.position);
    }

    /// Teleport to a ground-clamped point.
    pub fn place(&mut self, field: &TerrainField, at: Vec2) {
        self.position = Vec3::new(at.x, field.height(at.x, at.y), at.y);
        self.vertical_velocity = 0.0;
        self.grounded = true;
    }

    /// Vehicle override while driving.
    pub fn set_transform(&mut self, position: Vec3, yaw: f32) {
        self.position = position;
        self.yaw = yaw;
        self.vertical_velocity = 0.0;
    }

    /// The outbound snapshot for this frame.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            ry: self.yaw,
            character: self.character.clone(),
            anim: self
                .animation
                .current()
                .unwrap_or("idle")
                .to_string(),
            name: self.name.clone(),
        }
    }

    fn select_animation(&mut self, moving: bool, sprint: bool, dt: f32) {
        let clips = self.visual.clips();
        if clips.is_empty() {
            return;
        }
        if moving {
            self.idle_timer = 0.0;
            let request = if sprint { "run" } else { "walk" };
            // Falls back to walk when the model has no run clip.
            if !self.animation.play(clips, request, MOVEMENT_CROSSFADE) && sprint {
                self.animation.play(clips, "walk", MOVEMENT_CROSSFADE);
            }
            return;
        }

        let idles = idle_clips(clips);
        if idles.is_empty() {
            return;
        }
        let on_idle = self
            .animation
            .current()
            .map_or(false, |current| idles.contains(&current));
        if !on_idle {
            let clip = idles[self.idle_index % idles.len()].to_string();
            self.animation.play(clips, &clip, CROSSFADE);
            self.idle_timer = 0.0;
            return;
        }

        self.idle_timer += dt;
        if self.idle_timer >= self.config.idle_cycle_seconds && idles.len() > 1 {
            self.idle_index = (self.idle_index + 1) % idles.len();
            let clip = idles[self.idle_index].to_string();
            self.animation.play(clips, &clip, IDLE_CROSSFADE);
            self.idle_timer = 0.0;
        }
    }
}
