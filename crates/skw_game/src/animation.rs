//! Animation clip registry and the per-sprite animator.
//!
//! The registry holds clips from any number of definition files keyed by the
//! file's `animation_id`. `SpriteAnimator` is the playback handle a sprite
//! owns: it remembers which clip is running and which atlas frame is on
//! screen, and keeps that frame when playback stops.

use std::collections::HashMap;
use std::path::Path;

use skw_core::animation::{load_animation_file, AnimationClip, AnimationFile, AnimationState};

use crate::atlas::AtlasRegistry;

pub struct AnimationRegistry {
    /// animation_id -> clip_name -> clip
    clips: HashMap<String, HashMap<String, AnimationClip>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self {
            clips: HashMap::new(),
        }
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), String> {
        let file = load_animation_file(path)?;
        log::info!(
            "Loaded animation file '{}' ({} clips) from {}",
            file.animation_id,
            file.animations.len(),
            path.display()
        );
        self.insert_file(file)
    }

    /// Register a parsed file. Clip names must be unique across all files.
    pub fn insert_file(&mut self, file: AnimationFile) -> Result<(), String> {
        for clip_name in file.animations.keys() {
            if let Some(owner) = self.source_of(clip_name) {
                if owner != file.animation_id {
                    return Err(format!(
                        "Animation clip '{}' from '{}' is already defined by '{}'",
                        clip_name, file.animation_id, owner
                    ));
                }
            }
        }
        self.clips.insert(file.animation_id, file.animations);
        Ok(())
    }

    /// Resolve a clip by name. With `source` set only that file is searched.
    pub fn resolve_clip(&self, source: Option<&str>, name: &str) -> Option<&AnimationClip> {
        if let Some(source_id) = source {
            return self.clips.get(source_id).and_then(|clips| clips.get(name));
        }
        self.clips.values().find_map(|clips| clips.get(name))
    }

    /// `animation_id` of the file that defines clip `name`.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.clips
            .iter()
            .find(|(_, clips)| clips.contains_key(name))
            .map(|(id, _)| id.as_str())
    }

    pub fn clip_count(&self) -> usize {
        self.clips.values().map(HashMap::len).sum()
    }

    /// Check that every frame of every clip exists in the atlas.
    pub fn validate_frames(&self, atlas: &AtlasRegistry) -> Result<(), String> {
        for (anim_id, file_clips) in &self.clips {
            for (clip_name, clip) in file_clips {
                for frame in &clip.frames {
                    if !atlas.contains(&frame.frame) {
                        return Err(format!(
                            "Animation '{}' clip '{}' references missing frame '{}'",
                            anim_id, clip_name, frame.frame
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Playback handle for one sprite.
#[derive(Debug, Clone)]
pub struct SpriteAnimator {
    state: Option<AnimationState>,
    frame: String,
}

impl SpriteAnimator {
    pub fn new(initial_frame: &str) -> Self {
        Self {
            state: None,
            frame: initial_frame.to_string(),
        }
    }

    /// Start clip `key` from its first frame. With `ignore_if_playing`, a
    /// request for the clip that is already running leaves it untouched.
    /// Returns false if the clip is unknown.
    pub fn play(&mut self, key: &str, ignore_if_playing: bool, registry: &AnimationRegistry) -> bool {
        if ignore_if_playing && self.current_clip() == Some(key) {
            return true;
        }
        let Some(source) = registry.source_of(key) else {
            log::warn!("Unknown animation clip '{}'", key);
            return false;
        };
        let Some(first) = registry
            .resolve_clip(Some(source), key)
            .and_then(|clip| clip.frames.first())
        else {
            log::warn!("Animation clip '{}' has no frames", key);
            return false;
        };
        self.frame = first.frame.clone();
        self.state = Some(AnimationState::new(source, key));
        true
    }

    /// Stop playback; the frame on screen stays.
    pub fn stop(&mut self) {
        self.state = None;
    }

    pub fn set_frame(&mut self, frame: &str) {
        if self.frame != frame {
            self.frame = frame.to_string();
        }
    }

    pub fn tick(&mut self, dt_us: u64, registry: &AnimationRegistry) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match registry.resolve_clip(Some(&state.source_id), &state.clip_name) {
            Some(clip) => {
                let frame = state.tick(dt_us, clip);
                if self.frame != frame {
                    self.frame = frame.to_string();
                }
            }
            None => {
                log::warn!(
                    "Animation clip '{}' vanished from registry, stopping",
                    state.clip_name
                );
                self.state = None;
            }
        }
    }

    pub fn current_frame(&self) -> &str {
        &self.frame
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.clip_name.as_str())
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.state.as_ref().is_some_and(|s| !s.finished)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::atlas::parse_atlas;
    use crate::atlas::tests::misa_atlas_json;
    use skw_core::animation::parse_animation_file;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "skw_animreg_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    pub(crate) const MISA_ANIMATIONS: &str = r#"
    {
      "version": "0.1",
      "animation_id": "misa",
      "animations": {
        "misa-left-walk":  { "generate": { "prefix": "misa-left-walk.",  "start": 0, "end": 3, "zero_pad": 3 }, "frame_rate": 10, "repeat": -1 },
        "misa-right-walk": { "generate": { "prefix": "misa-right-walk.", "start": 0, "end": 3, "zero_pad": 3 }, "frame_rate": 10, "repeat": -1 },
        "misa-back-walk":  { "generate": { "prefix": "misa-back-walk.",  "start": 0, "end": 3, "zero_pad": 3 }, "frame_rate": 10, "repeat": -1 },
        "misa-front-walk": { "generate": { "prefix": "misa-front-walk.", "start": 0, "end": 3, "zero_pad": 3 }, "frame_rate": 10, "repeat": -1 }
      }
    }
    "#;

    pub(crate) fn misa_registry() -> AnimationRegistry {
        let mut registry = AnimationRegistry::new();
        registry
            .insert_file(parse_animation_file(MISA_ANIMATIONS).expect("clips parse"))
            .expect("insert");
        registry
    }

    #[test]
    fn load_file_registers_clips() {
        let path = temp_file_path("valid");
        fs::write(&path, MISA_ANIMATIONS).expect("write temp file");

        let mut registry = AnimationRegistry::new();
        registry.load_file(&path).expect("should load");
        assert_eq!(registry.clip_count(), 4);
        assert!(registry.resolve_clip(Some("misa"), "misa-left-walk").is_some());
        assert!(registry.resolve_clip(None, "misa-front-walk").is_some());
        assert!(registry.resolve_clip(Some("other"), "misa-left-walk").is_none());
        assert_eq!(registry.source_of("misa-back-walk"), Some("misa"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn duplicate_clip_across_files_is_rejected() {
        let mut registry = misa_registry();
        let other = parse_animation_file(
            r#"{ "version": "0.1", "animation_id": "copy",
                 "animations": { "misa-left-walk": { "frames": [{ "frame": "misa-left", "duration_ms": 100 }] } } }"#,
        )
        .expect("parse");
        let err = registry.insert_file(other).expect_err("duplicate clip");
        assert!(err.contains("already defined by 'misa'"));
    }

    #[test]
    fn validate_frames_against_atlas() {
        let registry = misa_registry();
        let atlas = parse_atlas(&misa_atlas_json(), "atlas.png").expect("atlas");
        registry.validate_frames(&atlas).expect("all frames exist");

        let sparse = parse_atlas(
            r#"{ "frames": { "misa-front": { "frame": { "x": 0, "y": 0, "w": 32, "h": 64 } } } }"#,
            "atlas.png",
        )
        .expect("atlas");
        let err = registry.validate_frames(&sparse).expect_err("frames missing");
        assert!(err.contains("references missing frame"));
    }

    #[test]
    fn play_sets_first_frame_and_ticks_at_ten_fps() {
        let registry = misa_registry();
        let mut animator = SpriteAnimator::new("misa-front");

        assert!(animator.play("misa-left-walk", true, &registry));
        assert_eq!(animator.current_frame(), "misa-left-walk.000");
        assert!(animator.is_playing());

        animator.tick(100_000, &registry);
        assert_eq!(animator.current_frame(), "misa-left-walk.001");
        animator.tick(300_000, &registry);
        assert_eq!(animator.current_frame(), "misa-left-walk.000");
    }

    #[test]
    fn play_ignore_if_playing_keeps_progress() {
        let registry = misa_registry();
        let mut animator = SpriteAnimator::new("misa-front");
        animator.play("misa-back-walk", true, &registry);
        animator.tick(150_000, &registry);
        assert_eq!(animator.current_frame(), "misa-back-walk.001");

        animator.play("misa-back-walk", true, &registry);
        assert_eq!(animator.current_frame(), "misa-back-walk.001");

        animator.play("misa-back-walk", false, &registry);
        assert_eq!(animator.current_frame(), "misa-back-walk.000");
    }

    #[test]
    fn stop_keeps_current_frame() {
        let registry = misa_registry();
        let mut animator = SpriteAnimator::new("misa-front");
        animator.play("misa-right-walk", true, &registry);
        animator.tick(200_000, &registry);
        animator.stop();
        assert!(!animator.is_playing());
        assert_eq!(animator.current_clip(), None);
        assert_eq!(animator.current_frame(), "misa-right-walk.002");

        animator.tick(500_000, &registry);
        assert_eq!(animator.current_frame(), "misa-right-walk.002");
    }

    #[test]
    fn unknown_clip_is_refused() {
        let registry = misa_registry();
        let mut animator = SpriteAnimator::new("misa-front");
        assert!(!animator.play("misa-jump", true, &registry));
        assert_eq!(animator.current_frame(), "misa-front");
        assert_eq!(animator.current_clip(), None);
    }

    #[test]
    fn shipped_misa_clips_match_atlas() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/animations/misa.json");
        let mut registry = AnimationRegistry::new();
        registry.load_file(&path).expect("shipped clips should load");
        assert_eq!(registry.clip_count(), 4);
        let atlas = parse_atlas(&misa_atlas_json(), "atlas.png").expect("atlas");
        registry.validate_frames(&atlas).expect("all frames exist");
    }
}
