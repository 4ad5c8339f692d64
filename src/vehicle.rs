//! The park's one drivable prop
//!
//! Plain kinematic car: throttle integrates speed against friction,
//! steering only bites when the wheels are rolling and flips with
//! reverse. An abandoned car left far from both its home spawn and the
//! player long enough teleports home so visitors can always find it.

use glam::{Vec2, Vec3};

use crate::assets::{size_scale, CharacterModel, CharacterSource, LoadOwner, LoadTicket, Visual};
use crate::constants::vehicle::*;
use crate::error::AssetLoadError;
use crate::terrain::TerrainField;

#[derive(Debug, Clone)]
pub struct VehicleConfig {
    pub max_speed: f32,
    pub acceleration: f32,
    /// Exponential damping rate applied off-throttle
    pub friction: f32,
    pub turn_rate: f32,
    pub steer_deadzone: f32,
    pub enter_radius: f32,
    /// Longest bounding dimension after normalization
    pub target_size: f32,
    pub home: Vec2,
    pub abandon_home_distance: f32,
    pub abandon_player_distance: f32,
    pub abandon_seconds: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            acceleration: ACCELERATION,
            friction: FRICTION,
            turn_rate: TURN_RATE,
            steer_deadzone: STEER_DEADZONE,
            enter_radius: ENTER_RADIUS,
            target_size: TARGET_SIZE,
            home: Vec2::new(0.0, 15.0),
            abandon_home_distance: ABANDON_HOME_DISTANCE,
            abandon_player_distance: ABANDON_PLAYER_DISTANCE,
            abandon_seconds: ABANDON_SECONDS,
        }
    }
}

/// One frame of driving intent, both axes in [-1, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveInput {
    /// Positive accelerates forward, negative reverses
    pub throttle: f32,
    /// Positive steers left
    pub steer: f32,
}

pub struct Vehicle {
    config: VehicleConfig,
    pub position: Vec3,
    pub yaw: f32,
    speed: f32,
    occupied: bool,
    abandon_timer: f32,
    pub visual: Visual,
}

impl Vehicle {
    pub fn new(config: VehicleConfig, field: &TerrainField) -> Self {
        let home = config.home;
        let y = field.height(home.x, home.y);
        Self {
            config,
            position: Vec3::new(home.x, y, home.y),
            yaw: 0.0,
            speed: 0.0,
            occupied: false,
            abandon_timer: 0.0,
            visual: Visual::pending(),
        }
    }

    pub fn request_model(&self, assets: &mut dyn CharacterSource) {
        assets.request(
            "vehicle",
            LoadTicket {
                owner: LoadOwner::Vehicle,
                generation: 0,
            },
        );
    }

    pub fn apply_load(&mut self, outcome: Result<CharacterModel, AssetLoadError>) {
        match outcome {
            Ok(model) => {
                let scale = size_scale(model.longest_dimension(), self.config.target_size);
                self.visual = Visual::Model { model, scale };
            }
            Err(err) => {
                log::warn!("[Vehicle] model load failed: {err}; keeping placeholder");
                self.visual = Visual::failed();
            }
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn occupied(&self) -> bool {
        self.occupied
    }

    /// Board if the player is close enough.
    pub fn try_enter(&mut self, player_position: Vec3) -> bool {
        if self.occupied {
            return false;
        }
        let gap = Vec2::new(
            player_position.x - self.position.x,
            player_position.z - self.position.z,
        );
        if gap.length() <= self.config.enter_radius {
            self.occupied = true;
            self.abandon_timer = 0.0;
            log::debug!("[Vehicle] boarded at {:.1}", self.position);
            true
        } else {
            false
        }
    }

    /// Step out; returns where the driver lands (a side offset rotated
    /// by the car's heading, ground-clamped by the caller).
    pub fn exit(&mut self) -> Vec3 {
        self.occupied = false;
        self.position + rotate_y(Vec3::new(3.0, 0.0, 0.0), self.yaw)
    }

    /// Integrate one frame. `input` is Some only while the player
    /// drives; a parked car still coasts, settles, and watches its
    /// abandonment clock.
    pub fn update(
        &mut self,
        input: Option<DriveInput>,
        player_position: Vec3,
        field: &TerrainField,
        dt: f32,
    ) {
        let throttle = input.map_or(0.0, |i| i.throttle.clamp(-1.0, 1.0));
        let steer = input.map_or(0.0, |i| i.steer.clamp(-1.0, 1.0));

        if throttle.abs() > f32::EPSILON {
            self.speed += throttle * self.config.acceleration * dt;
            self.speed = self
                .speed
                .clamp(-self.config.max_speed / 2.0, self.config.max_speed);
        } else {
            self.speed *= 1.0 - (self.config.friction * dt).min(1.0);
        }

        if self.speed.abs() > self.config.steer_deadzone {
            self.yaw += steer * self.config.turn_rate * dt * self.speed.signum();
        }

        self.position.x += self.yaw.sin() * self.speed * dt;
        self.position.z += self.yaw.cos() * self.speed * dt;
        self.position.y = field.height(self.position.x, self.position.z);

        if self.occupied {
            self.abandon_timer = 0.0;
        } else {
            self.tick_abandonment(player_position, field, dt);
        }
    }

    fn tick_abandonment(&mut self, player_position: Vec3, field: &TerrainField, dt: f32) {
        let here = Vec2::new(self.position.x, self.position.z);
        let from_home = (here - self.config.home).length();
        let from_player = Vec2::new(
            player_position.x - self.position.x,
            player_position.z - self.position.z,
        )
        .length();

        if from_home > self.config.abandon_home_distance
            && from_player > self.config.abandon_player_distance
        {
            self.abandon_timer += dt;
            if self.abandon_timer >= self.config.abandon_seconds {
                let home = self.config.home;
                self.position = Vec3::new(home.x, field.height(home.x, home.y), home.y);
                self.yaw = 0.0;
                self.speed = 0.0;
                self.abandon_timer = 0.0;
                log::info!("[Vehicle] abandoned; returned home");
            }
        } else {
            self.abandon_timer = 0.0;
        }
    }
}

/// Rotate a vector about +Y by `angle` radians.
fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}
