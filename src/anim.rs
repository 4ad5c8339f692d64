//! Animation clip resolution and playback state
//!
//! Clip names come off the wire and out of model files, so lookups are
//! forgiving: exact match first, then case-insensitive substring. A
//! request that resolves to the clip already playing is a no-op, and a
//! request that resolves to nothing leaves the current clip alone.

/// Case-insensitive substring search over a clip list.
pub fn find_clip<'a>(clips: &'a [String], needle: &str) -> Option<&'a str> {
    let needle = needle.to_lowercase();
    clips
        .iter()
        .find(|clip| clip.to_lowercase().contains(&needle))
        .map(String::as_str)
}

/// Exact name, then case-insensitive substring. None when nothing fits.
pub fn resolve_clip<'a>(clips: &'a [String], requested: &str) -> Option<&'a str> {
    clips
        .iter()
        .find(|clip| clip.as_str() == requested)
        .map(String::as_str)
        .or_else(|| find_clip(clips, requested))
}

/// Resolution for a fresh model: the requested clip if it resolves,
/// else an idle-named clip, else the first clip the model has.
pub fn resolve_or_idle<'a>(clips: &'a [String], requested: &str) -> Option<&'a str> {
    resolve_clip(clips, requested)
        .or_else(|| find_clip(clips, "idle"))
        .or_else(|| clips.first().map(String::as_str))
}

/// Every idle-flavored clip, for stationary cycling.
pub fn idle_clips(clips: &[String]) -> Vec<&str> {
    let mut idles: Vec<&str> = clips
        .iter()
        .filter(|clip| clip.to_lowercase().contains("idle"))
        .map(String::as_str)
        .collect();
    if idles.is_empty() {
        if let Some(first) = clips.first() {
            idles.push(first);
        }
    }
    idles
}

/// Active clip plus the cross-fade the current transition used
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationPlayer {
    current: Option<String>,
    fade: f32,
}

impl AnimationPlayer {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Seconds of cross-fade the latest transition was given
    pub fn fade(&self) -> f32 {
        self.fade
    }

    /// Transition to `requested` if it resolves to a clip different
    /// from the one playing. Returns whether a transition started.
    pub fn play(&mut self, clips: &[String], requested: &str, fade: f32) -> bool {
        match resolve_clip(clips, requested) {
            Some(clip) => self.start(clip, fade),
            None => false,
        }
    }

    /// Transition used right after a model swap, falling back through
    /// idle and first-clip rather than staying silent.
    pub fn play_or_idle(&mut self, clips: &[String], requested: &str, fade: f32) -> bool {
        match resolve_or_idle(clips, requested) {
            Some(clip) => self.start(clip, fade),
            None => false,
        }
    }

    /// Forget the playing clip (the mixer went away with its model).
    pub fn reset(&mut self) {
        self.current = None;
    }

    fn start(&mut self, clip: &str, fade: f32) -> bool {
        if self.current.as_deref() == Some(clip) {
            return false;
        }
        self.current = Some(clip.to_string());
        self.fade = fade;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips() -> Vec<String> {
        ["Armature|Idle", "Armature|Walk", "Armature|Run", "Wave"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let clips = vec!["walk".to_string(), "Walk_fast".to_string()];
        assert_eq!(resolve_clip(&clips, "walk"), Some("walk"));
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let clips = clips();
        assert_eq!(resolve_clip(&clips, "walk"), Some("Armature|Walk"));
        assert_eq!(resolve_clip(&clips, "RUN"), Some("Armature|Run"));
        assert_eq!(resolve_clip(&clips, "moonwalk"), None);
    }

    #[test]
    fn test_idle_fallback_order() {
        let clips = clips();
        assert_eq!(resolve_or_idle(&clips, "dance"), Some("Armature|Idle"));
        let no_idle = vec!["Spin".to_string()];
        assert_eq!(resolve_or_idle(&no_idle, "dance"), Some("Spin"));
        assert_eq!(resolve_or_idle(&[], "dance"), None);
    }

    #[test]
    fn test_player_switches_only_on_difference() {
        let clips = clips();
        let mut player = AnimationPlayer::default();
        assert!(player.play(&clips, "walk", 0.3));
        assert_eq!(player.current(), Some("Armature|Walk"));
        // Same resolved clip: no new transition.
        assert!(!player.play(&clips, "Walk", 0.2));
        assert!(player.play(&clips, "run", 0.2));
        assert_eq!(player.fade(), 0.2);
    }

    #[test]
    fn test_unresolved_request_keeps_current() {
        let clips = clips();
        let mut player = AnimationPlayer::default();
        player.play(&clips, "idle", 0.3);
        assert!(!player.play(&clips, "backflip", 0.3));
        assert_eq!(player.current(), Some("Armature|Idle"));
    }

    #[test]
    fn test_idle_clip_listing() {
        let clips = vec![
            "Idle_A".to_string(),
            "idle_b".to_string(),
            "Walk".to_string(),
        ];
        assert_eq!(idle_clips(&clips), vec!["Idle_A", "idle_b"]);
        let no_idle = vec!["Walk".to_string()];
        assert_eq!(idle_clips(&no_idle), vec!["Walk"]);
    }
}
