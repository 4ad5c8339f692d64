//! Engine-wide tuning constants
//!
//! Grouped by subsystem. Config structs default to these values; tests
//! and demos reference them directly so behavior and expectations stay
//! in one place.

/// Terrain shape and chunk layout
pub mod terrain {
    /// Side length of one chunk in world units
    pub const CHUNK_SIZE: f32 = 100.0;

    /// Chebyshev draw distance around the focus chunk, in chunks
    pub const DRAW_DISTANCE: i32 = 2;

    /// Grid cells per chunk side (vertex lattice is RESOLUTION + 1)
    pub const MESH_RESOLUTION: usize = 64;

    /// Radius of the flat central plaza
    pub const PLAZA_RADIUS: f32 = 40.0;

    /// Outer radius of the plaza blend annulus; full noise beyond
    pub const PLAZA_BLEND_RADIUS: f32 = 60.0;

    /// Half-extent of the square that trails never cross
    pub const TRAIL_EXCLUSION: f32 = 55.0;

    /// Trail field absolute-value threshold
    pub const TRAIL_THRESHOLD: f64 = 0.15;

    /// Depth trails are worn into the unblended height
    pub const TRAIL_RUT_DEPTH: f32 = 0.2;

    /// Random decoration instances per chunk
    pub const DECOR_PER_CHUNK: usize = 15;

    /// Chunks anchored within this distance of the origin place no
    /// random decorations (the plaza layout owns that ground)
    pub const DECOR_CHUNK_EXCLUSION: f32 = 60.0;

    /// Individual decoration placements are rejected inside this radius
    pub const DECOR_CLEARANCE: f32 = 50.0;
}

/// Replication cadence and reconciliation thresholds
pub mod replication {
    /// Minimum seconds between outbound snapshot broadcasts
    pub const PUBLISH_INTERVAL: f64 = 0.1;

    /// Exponential-decay rate for displayed-toward-target interpolation
    pub const LERP_RATE: f32 = 10.0;

    /// Displayed/target distance beyond which a peer snaps instead of
    /// interpolating (respawn or first-sight teleport)
    pub const TELEPORT_SNAP_DISTANCE: f32 = 10.0;

    /// Longest accepted string field in a wire snapshot, in bytes
    pub const MAX_WIRE_STRING: usize = 64;
}

/// Local avatar kinematics
pub mod movement {
    pub const GRAVITY: f32 = -20.0;
    pub const JUMP_IMPULSE: f32 = 8.0;
    pub const WALK_SPEED: f32 = 6.0;
    pub const SPRINT_SPEED: f32 = 10.0;

    /// Yaw easing rate toward the movement heading
    pub const TURN_RATE: f32 = 10.0;

    /// Seconds between idle-animation changes while stationary
    pub const IDLE_CYCLE_SECONDS: f32 = 8.0;

    /// Respawn lands on the annulus [MIN, MIN + SPREAD) around origin
    pub const RESPAWN_MIN_RADIUS: f32 = 10.0;
    pub const RESPAWN_SPREAD: f32 = 25.0;
}

/// Character and animation defaults
pub mod character {
    /// Normalization target when no reference height is known yet
    pub const DEFAULT_HEIGHT: f32 = 1.3;

    /// Default animation cross-fade seconds
    pub const CROSSFADE: f32 = 0.3;

    /// Faster fade when entering a movement clip
    pub const MOVEMENT_CROSSFADE: f32 = 0.2;

    /// Slow fade between cycling idle clips
    pub const IDLE_CROSSFADE: f32 = 0.5;

    /// Seconds of silence after which outstanding loads count as stalled
    pub const LOAD_GRACE_SECONDS: f64 = 8.0;
}

/// Drivable vehicle tuning
pub mod vehicle {
    pub const MAX_SPEED: f32 = 30.0;
    pub const ACCELERATION: f32 = 15.0;
    pub const FRICTION: f32 = 2.0;
    pub const TURN_RATE: f32 = 3.5;

    /// Below this |speed| the wheels don't steer
    pub const STEER_DEADZONE: f32 = 0.1;

    /// Player must be within this distance to enter
    pub const ENTER_RADIUS: f32 = 5.0;

    /// Longest bounding dimension is normalized to this size
    pub const TARGET_SIZE: f32 = 6.5;

    /// Abandonment: farther than this from home...
    pub const ABANDON_HOME_DISTANCE: f32 = 40.0;
    /// ...and farther than this from the player...
    pub const ABANDON_PLAYER_DISTANCE: f32 = 20.0;
    /// ...for this many seconds teleports the vehicle home
    pub const ABANDON_SECONDS: f32 = 5.0;
}

/// Wandering NPC tuning
pub mod npc {
    pub const WALK_SPEED: f32 = 2.0;
    pub const ARRIVE_DISTANCE: f32 = 0.5;
    pub const TURN_RATE: f32 = 5.0;
    pub const WANDER_RADIUS: f32 = 30.0;

    /// Wait at each target for MIN + rand * SPREAD seconds
    pub const WAIT_MIN_SECONDS: f32 = 2.0;
    pub const WAIT_SPREAD_SECONDS: f32 = 3.0;

    pub const CROSSFADE: f32 = 0.2;
}
