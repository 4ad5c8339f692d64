//! Character asset boundary
//!
//! Model and clip fetching is a host concern. The engine fires
//! requests through `CharacterSource` and drains completions once per
//! frame; every request carries a `LoadTicket` stamping the owning
//! entity and that entity's swap generation, so a completion that
//! arrives after the owner left or swapped again is discarded instead
//! of applied. `ScriptedSource` implements the trait in-process for
//! tests and demos.

use glam::Vec3;

use crate::constants::character::{DEFAULT_HEIGHT, LOAD_GRACE_SECONDS};
use crate::error::AssetLoadError;
use crate::net::PeerId;

/// Entity a load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOwner {
    Avatar,
    Peer(PeerId),
    Npc(usize),
    Vehicle,
}

/// Stamp carried by a request and echoed by its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub owner: LoadOwner,
    pub generation: u32,
}

/// A loaded character: its animation clip names and native bounds
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterModel {
    pub character: String,
    /// Bounding-box size before any normalization
    pub native_size: Vec3,
    pub clips: Vec<String>,
}

impl CharacterModel {
    pub fn native_height(&self) -> f32 {
        self.native_size.y
    }

    pub fn longest_dimension(&self) -> f32 {
        self.native_size.max_element()
    }
}

/// Completed load, success or failure
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub character: String,
    pub outcome: Result<CharacterModel, AssetLoadError>,
}

/// Host-implemented loader: `request` is fire-and-forget, completions
/// are drained by the frame loop via `poll`.
pub trait CharacterSource {
    fn request(&mut self, character: &str, ticket: LoadTicket);
    fn poll(&mut self) -> Vec<LoadResult>;
}

/// Render-facing body of any character-bearing entity
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// Capsule stand-in while a load is pending; `error` recolors it
    /// after a failed load
    Placeholder { error: bool },
    /// Loaded model plus its normalization scale
    Model { model: CharacterModel, scale: f32 },
}

impl Visual {
    pub fn pending() -> Self {
        Visual::Placeholder { error: false }
    }

    pub fn failed() -> Self {
        Visual::Placeholder { error: true }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Visual::Placeholder { .. })
    }

    /// Clip names, when a model is present
    pub fn clips(&self) -> &[String] {
        match self {
            Visual::Placeholder { .. } => &[],
            Visual::Model { model, .. } => &model.clips,
        }
    }
}

/// Scale factor normalizing a native height to the shared reference
/// height (the default when no reference is known yet). Degenerate
/// bounds leave the model unscaled.
pub fn height_scale(native_height: f32, reference: Option<f32>) -> f32 {
    let target = reference.unwrap_or(DEFAULT_HEIGHT);
    if native_height > f32::EPSILON {
        target / native_height
    } else {
        1.0
    }
}

/// Scale factor normalizing a longest bounding dimension to `target`
/// (used by the vehicle, which is wider than it is tall).
pub fn size_scale(longest_dimension: f32, target: f32) -> f32 {
    if longest_dimension > f32::EPSILON {
        target / longest_dimension
    } else {
        1.0
    }
}

/// Surfaces a "still loading" flag once requests have been outstanding
/// past the grace period, for the host's manual skip affordance.
#[derive(Debug, Clone)]
pub struct LoadWatchdog {
    grace: f64,
    outstanding: usize,
    waiting_since: Option<f64>,
}

impl Default for LoadWatchdog {
    fn default() -> Self {
        Self {
            grace: LOAD_GRACE_SECONDS,
            outstanding: 0,
            waiting_since: None,
        }
    }
}

impl LoadWatchdog {
    pub fn on_request(&mut self, now: f64) {
        self.outstanding += 1;
        self.waiting_since.get_or_insert(now);
    }

    pub fn on_completion(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 {
            self.waiting_since = None;
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn stalled(&self, now: f64) -> bool {
        self.waiting_since
            .map_or(false, |since| now - since > self.grace)
    }
}

/// In-process `CharacterSource` whose completions are injected by the
/// caller, one frame boundary away from the request.
#[derive(Default)]
pub struct ScriptedSource {
    pending: Vec<(String, LoadTicket)>,
    ready: Vec<LoadResult>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet completed or failed
    pub fn pending(&self) -> &[(String, LoadTicket)] {
        &self.pending
    }

    /// Complete every pending request for `character` with a model of
    /// the given bounds and clips.
    pub fn complete(&mut self, character: &str, native_size: Vec3, clips: &[&str]) {
        let model = CharacterModel {
            character: character.to_string(),
            native_size,
            clips: clips.iter().map(|c| c.to_string()).collect(),
        };
        self.take_pending(character, |ticket, name| LoadResult {
            ticket,
            character: name,
            outcome: Ok(model.clone()),
        });
    }

    /// Fail every pending request for `character`.
    pub fn fail(&mut self, character: &str, error: AssetLoadError) {
        self.take_pending(character, |ticket, name| LoadResult {
            ticket,
            character: name,
            outcome: Err(error.clone()),
        });
    }

    /// Complete everything still pending with uniform bounds and clips.
    pub fn complete_all(&mut self, native_size: Vec3, clips: &[&str]) {
        let characters: Vec<String> = self.pending.iter().map(|(c, _)| c.clone()).collect();
        for character in characters {
            self.complete(&character, native_size, clips);
        }
    }

    fn take_pending(
        &mut self,
        character: &str,
        mut make: impl FnMut(LoadTicket, String) -> LoadResult,
    ) {
        let mut kept = Vec::with_capacity(self.pending.len());
        for (name, ticket) in self.pending.drain(..) {
            if name == character {
                self.ready.push(make(ticket, name));
            } else {
                kept.push((name, ticket));
            }
        }
        self.pending = kept;
    }
}

impl CharacterSource for ScriptedSource {
    fn request(&mut self, character: &str, ticket: LoadTicket) {
        log::debug!("[Assets] load requested: '{character}' for {:?}", ticket.owner);
        self.pending.push((character.to_string(), ticket));
    }

    fn poll(&mut self) -> Vec<LoadResult> {
        std::mem::take(&mut self.ready)
    }
}
