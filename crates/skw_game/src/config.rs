//! Top-level game configuration: window, background colour, physics backend
//! and the scene to start.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use skw_platform::PlatformConfig;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsBackend {
    #[default]
    Arcade,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_resizable")]
    pub resizable: bool,
    /// `0xRRGGBB` or `#RRGGBB`.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default)]
    pub physics: PhysicsBackend,
    #[serde(default = "default_scene")]
    pub scene: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            resizable: default_resizable(),
            background_color: default_background_color(),
            physics: PhysicsBackend::default(),
            scene: default_scene(),
        }
    }
}

impl GameConfig {
    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            resizable: self.resizable,
        }
    }

    pub fn background_rgb(&self) -> Result<[u8; 3], String> {
        parse_hex_color(&self.background_color)
    }
}

/// Parse `0xRRGGBB` or `#RRGGBB` (case-insensitive) into bytes.
pub fn parse_hex_color(raw: &str) -> Result<[u8; 3], String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_prefix('#'))
        .ok_or_else(|| format!("Colour '{raw}' must start with '0x' or '#'"))?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Colour '{raw}' must have exactly six hex digits"));
    }
    let value = u32::from_str_radix(digits, 16)
        .map_err(|e| format!("Colour '{raw}' is not valid hex: {e}"))?;
    Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

/// Load the game config, or fall back to defaults when the file does not exist.
pub fn load_game_config_or_default(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::warn!(
            "Game config '{}' not found, using defaults",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    load_game_config_from_path(path)
}

pub fn load_game_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read game config {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse game config {}: {e}", path.display()))?;
    validate_game_config(&config)?;
    Ok(config)
}

fn validate_game_config(config: &GameConfig) -> Result<(), String> {
    if config.title.trim().is_empty() {
        return Err("Game config validation failed: title is empty".to_string());
    }
    if config.width == 0 || config.height == 0 {
        return Err("Game config validation failed: width and height must be > 0".to_string());
    }
    if config.scene.trim().is_empty() {
        return Err("Game config validation failed: scene path is empty".to_string());
    }
    config
        .background_rgb()
        .map_err(|e| format!("Game config validation failed: {e}"))?;
    Ok(())
}

fn default_title() -> String {
    "Medienprojekt Phaser Skunkworks".to_string()
}

const fn default_width() -> u32 {
    1280
}

const fn default_height() -> u32 {
    720
}

const fn default_resizable() -> bool {
    true
}

fn default_background_color() -> String {
    "0xFFFFFF".to_string()
}

fn default_scene() -> String {
    "assets/scenes/game.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "skw_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn parse_hex_color_accepts_both_prefixes() {
        assert_eq!(parse_hex_color("0xFFFFFF"), Ok([255, 255, 255]));
        assert_eq!(parse_hex_color("#f38630"), Ok([243, 134, 48]));
        assert_eq!(parse_hex_color(" 0X282725 "), Ok([40, 39, 37]));
    }

    #[test]
    fn parse_hex_color_rejects_malformed_values() {
        assert!(parse_hex_color("FFFFFF").is_err());
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("0xGGGGGG").is_err());
    }

    #[test]
    fn empty_object_yields_defaults() {
        let path = temp_file_path("defaults");
        fs::write(&path, "{}").expect("write temp file");

        let config = load_game_config_from_path(&path).expect("defaults should load");
        assert_eq!(config.title, "Medienprojekt Phaser Skunkworks");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.physics, PhysicsBackend::Arcade);
        assert_eq!(config.background_rgb(), Ok([255, 255, 255]));
        assert_eq!(config.scene, "assets/scenes/game.json");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_physics_backend_fails_to_parse() {
        let path = temp_file_path("matter");
        fs::write(&path, r#"{ "physics": "matter" }"#).expect("write temp file");

        let err = load_game_config_from_path(&path).expect_err("matter is not supported");
        assert!(err.contains("Failed to parse game config"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn bad_background_fails_validation() {
        let path = temp_file_path("bad_bg");
        fs::write(&path, r#"{ "background_color": "white" }"#).expect("write temp file");

        let err = load_game_config_from_path(&path).expect_err("bad colour should fail");
        assert!(err.contains("Game config validation failed"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        let config = load_game_config_or_default(&path).expect("missing file uses defaults");
        assert_eq!(config.width, 1280);
    }

    #[test]
    fn platform_config_carries_window_fields() {
        let config = GameConfig {
            width: 640,
            height: 480,
            ..GameConfig::default()
        };
        let platform = config.platform_config();
        assert_eq!(platform.title, config.title);
        assert_eq!((platform.width, platform.height), (640, 480));
        assert!(platform.resizable);
    }

    #[test]
    fn shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/game.json");
        let config = load_game_config_from_path(&path).expect("shipped config should load");
        assert_eq!(config.title, "Medienprojekt Phaser Skunkworks");
        assert_eq!(config.background_rgb(), Ok([255, 255, 255]));
        assert_eq!(config.physics, PhysicsBackend::Arcade);
    }
}
