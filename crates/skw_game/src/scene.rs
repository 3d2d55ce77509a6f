//! Scene definition: which assets to preload, which map layers to build and
//! at what depth, where the player spawns and how it is set up.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct SceneFile {
    pub version: String,
    pub scene_id: String,
    pub assets: SceneAssets,
    /// Tileset name as authored in the Tiled map.
    pub tileset_name: String,
    pub layers: Vec<SceneLayer>,
    pub spawn: SpawnPoint,
    pub player: PlayerSettings,
    #[serde(default)]
    pub camera: SceneCamera,
    #[serde(default)]
    pub debug_graphic: DebugGraphicSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SceneAssets {
    pub tileset_image: String,
    pub tilemap: String,
    pub atlas_image: String,
    pub atlas: String,
    #[serde(default)]
    pub animations: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SceneLayer {
    pub name: String,
    #[serde(default)]
    pub depth: f32,
    /// Tiles whose tileset property of this name is `true` become solid.
    #[serde(default)]
    pub collides_by_property: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpawnPoint {
    pub object_layer: String,
    pub object_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerSettings {
    /// Frame and clip name prefix, e.g. `misa` for `misa-left-walk`.
    pub frame_prefix: String,
    pub initial_frame: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    pub body: BodySettings,
    #[serde(default)]
    pub depth: f32,
}

/// Physics body size and its offset from the sprite's top-left corner.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BodySettings {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SceneCamera {
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default = "default_true")]
    pub follow_player: bool,
    #[serde(default = "default_true")]
    pub clamp_to_map: bool,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            follow_player: true,
            clamp_to_map: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DebugGraphicSettings {
    #[serde(default = "default_debug_depth")]
    pub depth: f32,
    #[serde(default = "default_debug_alpha")]
    pub alpha: f32,
    #[serde(default = "default_colliding_tile_color")]
    pub colliding_tile_color: [u8; 3],
    #[serde(default = "default_face_color")]
    pub face_color: [u8; 3],
    #[serde(default = "default_face_thickness")]
    pub face_thickness: f32,
    #[serde(default = "default_body_color")]
    pub body_color: [u8; 3],
}

impl Default for DebugGraphicSettings {
    fn default() -> Self {
        Self {
            depth: default_debug_depth(),
            alpha: default_debug_alpha(),
            colliding_tile_color: default_colliding_tile_color(),
            face_color: default_face_color(),
            face_thickness: default_face_thickness(),
            body_color: default_body_color(),
        }
    }
}

impl SceneFile {
    /// The layer that carries collision, if any.
    pub fn collision_layer(&self) -> Option<(&SceneLayer, &str)> {
        self.layers.iter().find_map(|layer| {
            layer
                .collides_by_property
                .as_deref()
                .map(|property| (layer, property))
        })
    }
}

pub fn load_scene_from_path(scene_path: &Path) -> Result<SceneFile, String> {
    let raw = fs::read_to_string(scene_path)
        .map_err(|e| format!("Failed to read scene file {}: {e}", scene_path.display()))?;
    let scene: SceneFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse scene JSON {}: {e}", scene_path.display()))?;
    validate_scene(&scene)?;
    Ok(scene)
}

fn validate_scene(scene: &SceneFile) -> Result<(), String> {
    if scene.version != "0.1" {
        return Err(format!(
            "Scene validation failed: unsupported version '{}'",
            scene.version
        ));
    }
    if scene.layers.is_empty() {
        return Err("Scene validation failed: layers array is empty".to_string());
    }
    if scene.tileset_name.is_empty() {
        return Err("Scene validation failed: tileset_name is empty".to_string());
    }

    let mut names = HashSet::new();
    let mut collision_layers = 0;
    for layer in &scene.layers {
        if !names.insert(layer.name.as_str()) {
            return Err(format!(
                "Scene validation failed: duplicate layer '{}'",
                layer.name
            ));
        }
        if !layer.depth.is_finite() {
            return Err(format!(
                "Scene validation failed: layer '{}' has non-finite depth",
                layer.name
            ));
        }
        if let Some(property) = &layer.collides_by_property {
            if property.is_empty() {
                return Err(format!(
                    "Scene validation failed: layer '{}' has empty collides_by_property",
                    layer.name
                ));
            }
            collision_layers += 1;
        }
    }
    if collision_layers > 1 {
        return Err("Scene validation failed: only one layer may carry collision".to_string());
    }
    if collision_layers == 0 {
        log::warn!(
            "Scene '{}' declares no collision layer; the player will walk through everything.",
            scene.scene_id
        );
    }

    let player = &scene.player;
    if player.frame_prefix.is_empty() || player.initial_frame.is_empty() {
        return Err(
            "Scene validation failed: player frame_prefix and initial_frame must be set"
                .to_string(),
        );
    }
    if !(player.speed.is_finite() && player.speed > 0.0) {
        return Err("Scene validation failed: player speed must be > 0".to_string());
    }
    if player.body.width <= 0.0 || player.body.height <= 0.0 {
        return Err("Scene validation failed: player body size must be > 0".to_string());
    }
    if !(scene.camera.zoom.is_finite() && scene.camera.zoom > 0.0) {
        return Err("Scene validation failed: camera zoom must be > 0".to_string());
    }
    if !(0.0..=1.0).contains(&scene.debug_graphic.alpha) {
        return Err("Scene validation failed: debug_graphic alpha must be in [0, 1]".to_string());
    }

    Ok(())
}

const fn default_speed() -> f32 {
    175.0
}

const fn default_zoom() -> f32 {
    1.0
}

const fn default_true() -> bool {
    true
}

const fn default_debug_depth() -> f32 {
    20.0
}

const fn default_debug_alpha() -> f32 {
    0.75
}

const fn default_colliding_tile_color() -> [u8; 3] {
    [243, 134, 48]
}

const fn default_face_color() -> [u8; 3] {
    [40, 39, 37]
}

const fn default_face_thickness() -> f32 {
    2.0
}

const fn default_body_color() -> [u8; 3] {
    [255, 0, 255]
}
