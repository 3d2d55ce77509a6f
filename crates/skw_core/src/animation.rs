//! Frame-based sprite animation types and deterministic tick logic.
//!
//! A clip is a list of atlas frame names with per-frame durations. Clips are
//! usually authored as a generated range (`misa-left-walk.000` ..
//! `misa-left-walk.003` at 10 fps) rather than listing every frame.
//!
//! All timing uses integer microseconds (`u64`) so playback advances
//! identically under the fixed-timestep model on every platform.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A single frame in an animation clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub frame: String,
    pub duration_us: u64,
}

/// How many extra times a clip plays after the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

impl Repeat {
    /// `-1` loops forever, `n >= 0` replays `n` more times.
    pub fn from_count(count: i32) -> Option<Self> {
        match count {
            -1 => Some(Self::Forever),
            n if n >= 0 => Some(Self::Times(n as u32)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    pub repeat: Repeat,
}

impl AnimationClip {
    pub fn looping(&self) -> bool {
        self.repeat == Repeat::Forever
    }

    /// Total duration of one full pass in microseconds.
    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }
}

/// Top-level animation definition file.
#[derive(Debug, Clone)]
pub struct AnimationFile {
    pub version: String,
    pub animation_id: String,
    pub animations: HashMap<String, AnimationClip>,
}

/// Runtime state for one playing clip.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub source_id: String,
    pub clip_name: String,
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub repeats_done: u32,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(source_id: &str, clip_name: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            clip_name: clip_name.to_string(),
            frame_index: 0,
            elapsed_us: 0,
            repeats_done: 0,
            finished: false,
        }
    }

    /// Name of the frame currently shown, if the clip has one at this index.
    pub fn current_frame<'a>(&self, clip: &'a AnimationClip) -> Option<&'a str> {
        clip.frames
            .get(self.frame_index)
            .or_else(|| clip.frames.last())
            .map(|f| f.frame.as_str())
    }

    /// Advance by `dt_us` microseconds and return the frame to display.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() {
            return "";
        }
        if self.finished {
            return self.current_frame(clip).unwrap_or("");
        }

        self.elapsed_us += dt_us;

        loop {
            let current_frame = &clip.frames[self.frame_index];
            if self.elapsed_us < current_frame.duration_us {
                break;
            }

            self.elapsed_us -= current_frame.duration_us;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                let replay = match clip.repeat {
                    Repeat::Forever => true,
                    Repeat::Times(n) => self.repeats_done < n,
                };
                if replay {
                    self.frame_index = 0;
                    if clip.repeat != Repeat::Forever {
                        self.repeats_done += 1;
                    }
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        &clip.frames[self.frame_index].frame
    }
}

/// Build frame names `prefix + zero-padded index + suffix` for every index
/// from `start` to `end` inclusive. A `start` above `end` counts down.
pub fn generate_frame_names(
    prefix: &str,
    start: u32,
    end: u32,
    zero_pad: usize,
    suffix: &str,
) -> Vec<String> {
    let indices: Vec<u32> = if start <= end {
        (start..=end).collect()
    } else {
        (end..=start).rev().collect()
    };
    indices
        .into_iter()
        .map(|i| format!("{prefix}{i:0>width$}{suffix}", width = zero_pad))
        .collect()
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct AnimationFileJson {
    version: String,
    animation_id: String,
    animations: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    #[serde(default)]
    frames: Option<Vec<AnimationFrameJson>>,
    #[serde(default)]
    generate: Option<FrameRangeJson>,
    #[serde(default = "default_frame_rate")]
    frame_rate: u32,
    #[serde(default)]
    repeat: i32,
}

#[derive(Debug, Deserialize)]
struct AnimationFrameJson {
    frame: String,
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct FrameRangeJson {
    prefix: String,
    start: u32,
    end: u32,
    #[serde(default)]
    zero_pad: usize,
    #[serde(default)]
    suffix: String,
}

/// Load an animation definition file from disk.
pub fn load_animation_file(path: &Path) -> Result<AnimationFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read animation file {}: {e}", path.display()))?;
    parse_animation_file(&raw)
        .map_err(|e| format!("Animation file {}: {e}", path.display()))
}

pub fn parse_animation_file(raw: &str) -> Result<AnimationFile, String> {
    let json: AnimationFileJson =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse animation JSON: {e}"))?;
    validate_animation_json(&json)?;

    let mut animations = HashMap::new();
    for (name, clip_json) in json.animations {
        let frames = match (clip_json.frames, clip_json.generate) {
            (Some(frames), _) => frames
                .into_iter()
                .map(|f| AnimationFrame {
                    frame: f.frame,
                    duration_us: f.duration_ms * 1000,
                })
                .collect(),
            (None, Some(range)) => {
                let duration_us = 1_000_000 / u64::from(clip_json.frame_rate);
                generate_frame_names(
                    &range.prefix,
                    range.start,
                    range.end,
                    range.zero_pad,
                    &range.suffix,
                )
                .into_iter()
                .map(|frame| AnimationFrame { frame, duration_us })
                .collect()
            }
            (None, None) => Vec::new(),
        };
        // Validation already rejected counts below -1.
        let repeat = Repeat::from_count(clip_json.repeat).unwrap_or(Repeat::Times(0));
        animations.insert(name, AnimationClip { frames, repeat });
    }

    Ok(AnimationFile {
        version: json.version,
        animation_id: json.animation_id,
        animations,
    })
}

fn validate_animation_json(json: &AnimationFileJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Animation validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.animation_id.is_empty() {
        return Err("Animation validation failed: animation_id is empty".to_string());
    }
    for (name, clip) in &json.animations {
        if Repeat::from_count(clip.repeat).is_none() {
            return Err(format!(
                "Animation validation failed: clip '{}' has repeat {} (expected -1 or >= 0)",
                name, clip.repeat
            ));
        }
        match (&clip.frames, &clip.generate) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "Animation validation failed: clip '{}' sets both 'frames' and 'generate'",
                    name
                ));
            }
            (None, None) => {
                return Err(format!(
                    "Animation validation failed: clip '{}' has no frames",
                    name
                ));
            }
            (Some(frames), None) => {
                if frames.is_empty() {
                    return Err(format!(
                        "Animation validation failed: clip '{}' has no frames",
                        name
                    ));
                }
                for (i, frame) in frames.iter().enumerate() {
                    if frame.frame.is_empty() {
                        return Err(format!(
                            "Animation validation failed: clip '{}' frame {} has empty name",
                            name, i
                        ));
                    }
                    if frame.duration_ms == 0 {
                        return Err(format!(
                            "Animation validation failed: clip '{}' frame {} has zero duration",
                            name, i
                        ));
                    }
                }
            }
            (None, Some(range)) => {
                if range.prefix.is_empty() && range.suffix.is_empty() && range.zero_pad == 0 {
                    log::warn!(
                        "Animation clip '{}' generates bare numeric frame names",
                        name
                    );
                }
                if clip.frame_rate == 0 || clip.frame_rate > 1_000_000 {
                    return Err(format!(
                        "Animation validation failed: clip '{}' has frame_rate {}",
                        name, clip.frame_rate
                    ));
                }
            }
        }
    }
    Ok(())
}

const fn default_frame_rate() -> u32 {
    24
}
