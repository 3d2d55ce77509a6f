//! Recorded arrow-key sequences fed through the player tick by tick.

use serde::Deserialize;
use skw_core::motion::DirectionalInput;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<DirectionalInput> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(DirectionalInput {
                    up: frame.up,
                    down: frame.down,
                    left: frame.left,
                    right: frame.right,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::tests::misa_registry;
    use crate::collision::{CollisionGrid, GridCell};
    use crate::player::Player;
    use crate::scene::BodySettings;
    use glam::Vec2;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "skw_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    /// A walled 20x12 room with two pillars.
    fn sample_grid() -> CollisionGrid {
        let mut solids = Vec::new();
        for x in 0..20 {
            solids.push(GridCell { x, y: 0 });
            solids.push(GridCell { x, y: 11 });
        }
        for y in 1..11 {
            solids.push(GridCell { x: 0, y });
            solids.push(GridCell { x: 19, y });
        }
        for y in 3..6 {
            solids.push(GridCell { x: 6, y });
            solids.push(GridCell { x: 12, y });
        }
        CollisionGrid::new(32.0, 32.0, 20, 12, solids)
    }

    fn spawn() -> Player {
        Player::spawn(
            Vec2::new(96.0, 128.0),
            Vec2::new(32.0, 64.0),
            Vec2::splat(0.5),
            BodySettings {
                width: 30.0,
                height: 40.0,
                offset_x: 0.0,
                offset_y: 24.0,
            },
            175.0,
            "misa",
            "misa-front",
        )
    }

    fn run(inputs: &[DirectionalInput], dt: f32, grid: &CollisionGrid) -> Player {
        let registry = misa_registry();
        let dt_us = (dt as f64 * 1_000_000.0).round() as u64;
        let mut player = spawn();
        for input in inputs {
            let outcome = player.step(*input, dt, grid);
            player.apply_animation(outcome.animation, &registry);
            player.animator.tick(dt_us, &registry);
        }
        player
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 3 },
                { "up": true, "left": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].right && !expanded[0].left);
        assert!(expanded[3].up && expanded[3].left);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay must fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 90 },
                { "down": true, "right": true, "repeat": 40 },
                { "up": true, "down": true, "repeat": 30 },
                { "left": true, "right": true, "up": true, "repeat": 45 },
                { "repeat": 10 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_inputs();
        let grid = sample_grid();

        let run_a = run(&inputs, replay.fixed_dt, &grid);
        let run_b = run(&inputs, replay.fixed_dt, &grid);

        assert!((run_a.body.center_x - run_b.body.center_x).abs() < 0.0001);
        assert!((run_a.body.center_y - run_b.body.center_y).abs() < 0.0001);
        assert_eq!(run_a.velocity, run_b.velocity);
        assert_eq!(run_a.animator.current_frame(), run_b.animator.current_frame());
        assert_eq!(run_a.facing, run_b.facing);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn walking_into_pillar_stops_flush_against_it() {
        let grid = sample_grid();
        let right = DirectionalInput {
            right: true,
            ..Default::default()
        };
        let player = run(&[right; 120], 1.0 / 60.0, &grid);

        // Pillar at column 6 spans rows 3..6; the body (rows 3..4) hits its left side.
        assert!(player.contacts.right);
        assert!((player.body.max().x - 192.0).abs() < 0.001);
        assert_eq!(player.velocity, Vec2::ZERO);
        assert_eq!(player.animator.current_clip(), Some("misa-right-walk"));
    }
}
