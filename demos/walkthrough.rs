//! Scripted two-visitor session
//!
//! Drives two headless worlds over the loopback hub: walk to the car,
//! drive it, abandon it, stream terrain on a sprint away from the
//! plaza, and check that the second visitor sees the first move.

use anyhow::{ensure, Result};
use glam::{Vec2, Vec3};

use vigil_engine::assets::ScriptedSource;
use vigil_engine::{
    AvatarInput, DriveInput, FrameInput, RoomHub, WorldConfig, WorldState,
};

const APP: &str = "vigil-park";
const ROOM: &str = "walkthrough";
const DT: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    env_logger::init();

    println!("Vigil Engine walkthrough...");

    let hub = RoomHub::new();
    let mut bob_assets = ScriptedSource::new();
    let mut bob = WorldState::new(WorldConfig::park("Bob", "a"), &mut bob_assets);
    let mut ada_assets = ScriptedSource::new();
    let mut ada = WorldState::new(WorldConfig::park("Ada", "b"), &mut ada_assets);

    ensure!(bob.connect(&hub, APP, ROOM), "relay refused Bob");
    ensure!(ada.connect(&hub, APP, ROOM), "relay refused Ada");
    println!("[OK] Both visitors joined '{ROOM}'");

    // Boot loads: avatars, NPCs, the car.
    let size = Vec3::new(0.5, 1.56, 0.4);
    let clips = ["Idle_A", "Idle_B", "Walk", "Run"];
    bob_assets.complete_all(size, &clips);
    ada_assets.complete_all(size, &clips);
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &FrameInput::default(), 2);
    ensure!(!bob.loading_stalled(), "boot loads should be done");
    println!(
        "[OK] Models loaded (reference height {:?})",
        bob.reference_height()
    );

    // The first snapshot exchange schedules each other's character.
    bob_assets.complete_all(size, &clips);
    ada_assets.complete_all(size, &clips);
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &FrameInput::default(), 2);
    ensure!(bob.population() == 2, "Bob should see Ada");
    ensure!(ada.population() == 2, "Ada should see Bob");
    println!("[OK] Presence exchanged ({} in the park)", bob.population());

    // Walk Bob from the spawn up to the parked car.
    let walk_north = FrameInput {
        avatar: AvatarInput {
            movement: Vec2::new(0.0, 1.0),
            ..Default::default()
        },
        ..Default::default()
    };
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &walk_north, 75);
    step(
        &mut bob,
        &mut bob_assets,
        &mut ada,
        &mut ada_assets,
        &FrameInput {
            enter_vehicle: true,
            ..Default::default()
        },
        1,
    );
    ensure!(
        bob.vehicle().expect("park has a car").occupied(),
        "Bob should be driving"
    );
    println!("[OK] Entered the car at {:.1}", bob.avatar().position);

    // A lap: full throttle with some steering, then step out.
    let lap = FrameInput {
        drive: Some(DriveInput {
            throttle: 1.0,
            steer: 0.4,
        }),
        ..Default::default()
    };
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &lap, 240);
    println!(
        "  car at {:.1}, speed {:.1}",
        bob.vehicle().expect("park has a car").position,
        bob.vehicle().expect("park has a car").speed()
    );
    step(
        &mut bob,
        &mut bob_assets,
        &mut ada,
        &mut ada_assets,
        &FrameInput {
            exit_vehicle: true,
            ..Default::default()
        },
        1,
    );
    ensure!(
        !bob.vehicle().expect("park has a car").occupied(),
        "Bob should be on foot again"
    );
    println!("[OK] Parked and stepped out at {:.1}", bob.avatar().position);

    // Sprint away from the plaza so the window recenters.
    let before = bob.chunk_stats();
    let sprint_north = FrameInput {
        avatar: AvatarInput {
            movement: Vec2::new(0.0, 1.0),
            sprint: true,
            ..Default::default()
        },
        ..Default::default()
    };
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &sprint_north, 1200);
    let after = bob.chunk_stats();
    ensure!(after.resident == 25, "window is always 5x5");
    ensure!(
        after.generated_total > before.generated_total,
        "the sprint should cross chunk borders"
    );
    println!(
        "[OK] Streaming followed the sprint ({} generated, {} evicted, {} resident)",
        after.generated_total, after.evicted_total, after.resident
    );

    // Stand still and let Ada's smoothed copy of Bob settle.
    step(&mut bob, &mut bob_assets, &mut ada, &mut ada_assets, &FrameInput::default(), 90);
    let (_, seen) = ada
        .peers()
        .iter()
        .next()
        .expect("Ada should still track Bob");
    let gap = (seen.position - bob.avatar().position).length();
    ensure!(gap < 0.5, "replication should converge, gap was {gap}");
    ensure!(!seen.visual.is_placeholder(), "Bob's model should be loaded");
    println!(
        "[OK] Ada sees '{}' at {:.1} (gap {:.2})",
        seen.name, seen.position, gap
    );

    for npc in bob.npcs() {
        println!("  {} is at {:.1}", npc.spec.name, npc.position);
    }

    // Back to the plaza rim.
    step(
        &mut bob,
        &mut bob_assets,
        &mut ada,
        &mut ada_assets,
        &FrameInput {
            respawn: true,
            ..Default::default()
        },
        1,
    );
    let radius = Vec2::new(bob.avatar().position.x, bob.avatar().position.z).length();
    ensure!((10.0..=35.0).contains(&radius), "respawn radius was {radius}");
    println!("[OK] Respawned on the plaza rim (radius {radius:.1})");

    println!("\n[OK] Walkthrough completed after {} frames", bob.frame());
    Ok(())
}

/// Advance both worlds `frames` times; only Bob gets live input.
fn step(
    bob: &mut WorldState,
    bob_assets: &mut ScriptedSource,
    ada: &mut WorldState,
    ada_assets: &mut ScriptedSource,
    input: &FrameInput,
    frames: usize,
) {
    for _ in 0..frames {
        bob.advance(input, bob_assets, DT);
        ada.advance(&FrameInput::default(), ada_assets, DT);
    }
}
