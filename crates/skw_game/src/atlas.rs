//! Texture atlas metadata in the JSON layout Phaser's `load.atlas` reads
//! (TexturePacker "JSON Hash" and "JSON Array").
//!
//! Frames are addressed by name (`misa-front`, `misa-left-walk.002`, ...).
//! Pixel rects are kept as authored; UVs are derived against the size of the
//! texture that actually got uploaded.

use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectPx {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone)]
pub struct AtlasFrame {
    /// Region of the atlas image holding the frame's pixels.
    pub rect_px: RectPx,
    /// Untrimmed frame size.
    pub source_size: (u32, u32),
    /// Where the trimmed rect sits inside the untrimmed frame.
    pub trim_offset: (u32, u32),
    /// Anchor inside the untrimmed frame, as fractions of `source_size`.
    pub pivot: (f32, f32),
}

impl AtlasFrame {
    /// `[u0, v0, u1, v1]` for an atlas image of `texture_size` pixels.
    pub fn uv(&self, texture_size: (u32, u32)) -> [f32; 4] {
        let tw = texture_size.0.max(1) as f32;
        let th = texture_size.1.max(1) as f32;
        [
            self.rect_px.x as f32 / tw,
            self.rect_px.y as f32 / th,
            (self.rect_px.x + self.rect_px.w) as f32 / tw,
            (self.rect_px.y + self.rect_px.h) as f32 / th,
        ]
    }

    /// World `(min, max)` of the trimmed pixels for a sprite whose pivot sits at `position`.
    pub fn placed_rect(&self, position: Vec2) -> (Vec2, Vec2) {
        let source = Vec2::new(self.source_size.0 as f32, self.source_size.1 as f32);
        let trim = Vec2::new(self.trim_offset.0 as f32, self.trim_offset.1 as f32);
        let min = position - source * Vec2::from(self.pivot) + trim;
        (min, min + Vec2::new(self.rect_px.w as f32, self.rect_px.h as f32))
    }
}

#[derive(Debug, Clone)]
pub struct AtlasRegistry {
    pub texture_path: String,
    /// From `meta.size` when present.
    pub declared_size: Option<(u32, u32)>,
    frames: HashMap<String, AtlasFrame>,
}

impl AtlasRegistry {
    pub fn frame(&self, name: &str) -> Option<&AtlasFrame> {
        self.frames.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

// --- JSON (private) ---

#[derive(Debug, Deserialize)]
struct AtlasJson {
    frames: FramesJson,
    #[serde(default)]
    meta: Option<MetaJson>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FramesJson {
    Hash(HashMap<String, FrameJson>),
    Array(Vec<NamedFrameJson>),
}

#[derive(Debug, Deserialize)]
struct NamedFrameJson {
    filename: String,
    #[serde(flatten)]
    frame: FrameJson,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameJson {
    frame: RectJson,
    #[serde(default)]
    rotated: bool,
    #[serde(default)]
    sprite_source_size: Option<RectJson>,
    #[serde(default)]
    source_size: Option<SizeJson>,
    #[serde(default)]
    pivot: Option<PivotJson>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct RectJson {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct SizeJson {
    w: u32,
    h: u32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct PivotJson {
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
struct MetaJson {
    #[serde(default)]
    size: Option<SizeJson>,
}

/// Load atlas metadata from `path`; `texture_path` is the image it describes.
pub fn load_atlas_from_path(path: &Path, texture_path: &str) -> Result<AtlasRegistry, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read atlas metadata {}: {e}", path.display()))?;
    parse_atlas(&raw, texture_path)
        .map_err(|e| format!("Atlas metadata {}: {e}", path.display()))
}

pub fn parse_atlas(raw: &str, texture_path: &str) -> Result<AtlasRegistry, String> {
    let json: AtlasJson =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse atlas JSON: {e}"))?;
    let declared_size = json.meta.and_then(|m| m.size).map(|s| (s.w, s.h));

    let named: Vec<(String, FrameJson)> = match json.frames {
        FramesJson::Hash(map) => map.into_iter().collect(),
        FramesJson::Array(list) => list.into_iter().map(|f| (f.filename, f.frame)).collect(),
    };

    let mut frames = HashMap::with_capacity(named.len());
    for (name, frame) in named {
        validate_frame(&name, &frame, declared_size)?;
        let trim = frame.sprite_source_size;
        let entry = AtlasFrame {
            rect_px: RectPx {
                x: frame.frame.x,
                y: frame.frame.y,
                w: frame.frame.w,
                h: frame.frame.h,
            },
            source_size: frame
                .source_size
                .map(|s| (s.w, s.h))
                .unwrap_or((frame.frame.w, frame.frame.h)),
            trim_offset: trim.map(|t| (t.x, t.y)).unwrap_or((0, 0)),
            pivot: frame.pivot.map(|p| (p.x, p.y)).unwrap_or((0.5, 0.5)),
        };
        if frames.insert(name.clone(), entry).is_some() {
            return Err(format!(
                "Atlas validation failed: duplicate frame '{}'",
                name
            ));
        }
    }

    if frames.is_empty() {
        return Err("Atlas validation failed: no frames".to_string());
    }

    log::info!("Loaded atlas '{}' with {} frames", texture_path, frames.len());
    Ok(AtlasRegistry {
        texture_path: texture_path.to_string(),
        declared_size,
        frames,
    })
}

fn validate_frame(
    name: &str,
    frame: &FrameJson,
    declared_size: Option<(u32, u32)>,
) -> Result<(), String> {
    if name.is_empty() {
        return Err("Atlas validation failed: frame with empty name".to_string());
    }
    if frame.rotated {
        return Err(format!(
            "Atlas validation failed: frame '{}' is rotated, which is not supported",
            name
        ));
    }
    let rect = frame.frame;
    if rect.w == 0 || rect.h == 0 {
        return Err(format!(
            "Atlas validation failed: frame '{}' has zero-sized rect",
            name
        ));
    }
    let right = rect.x.checked_add(rect.w).ok_or_else(|| {
        format!(
            "Atlas validation failed: frame '{}' rect overflows u32 range",
            name
        )
    })?;
    let bottom = rect.y.checked_add(rect.h).ok_or_else(|| {
        format!(
            "Atlas validation failed: frame '{}' rect overflows u32 range",
            name
        )
    })?;
    if let Some((width, height)) = declared_size {
        if right > width || bottom > height {
            return Err(format!(
                "Atlas validation failed: frame '{}' rect exceeds atlas bounds",
                name
            ));
        }
    }
    if let Some(pivot) = frame.pivot {
        if !(0.0..=1.0).contains(&pivot.x) || !(0.0..=1.0).contains(&pivot.y) {
            return Err(format!(
                "Atlas validation failed: frame '{}' pivot outside [0, 1]",
                name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "skw_atlas_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    /// Hash-form atlas holding the four still frames and four walk frames per
    /// facing, each 32x64, laid out on a 512x128 sheet.
    pub(crate) fn misa_atlas_json() -> String {
        let mut names = Vec::new();
        for facing in ["left", "right", "back", "front"] {
            names.push(format!("misa-{facing}"));
            for i in 0..4 {
                names.push(format!("misa-{facing}-walk.{i:03}"));
            }
        }
        let frames: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let x = (i % 16) as u32 * 32;
                let y = (i / 16) as u32 * 64;
                format!(
                    r#""{name}": {{ "frame": {{ "x": {x}, "y": {y}, "w": 32, "h": 64 }},
                       "rotated": false, "trimmed": false,
                       "sourceSize": {{ "w": 32, "h": 64 }} }}"#
                )
            })
            .collect();
        format!(
            r#"{{ "frames": {{ {} }}, "meta": {{ "image": "atlas.png", "size": {{ "w": 512, "h": 128 }} }} }}"#,
            frames.join(",")
        )
    }

    #[test]
    fn parse_hash_form() {
        let atlas = parse_atlas(&misa_atlas_json(), "assets/atlas/atlas.png")
            .expect("atlas should parse");
        assert_eq!(atlas.len(), 20);
        assert_eq!(atlas.declared_size, Some((512, 128)));
        let front = atlas.frame("misa-front").expect("misa-front");
        assert_eq!(front.source_size, (32, 64));
        assert_eq!(front.pivot, (0.5, 0.5));
        assert!(atlas.contains("misa-back-walk.003"));
    }

    #[test]
    fn parse_array_form_with_trim() {
        let atlas = parse_atlas(
            r#"{ "frames": [
                 { "filename": "coin", "frame": { "x": 2, "y": 4, "w": 10, "h": 12 },
                   "trimmed": true,
                   "spriteSourceSize": { "x": 3, "y": 1, "w": 10, "h": 12 },
                   "sourceSize": { "w": 16, "h": 16 },
                   "pivot": { "x": 0.5, "y": 1.0 } }
               ] }"#,
            "coin.png",
        )
        .expect("array atlas should parse");
        let coin = atlas.frame("coin").expect("coin");
        assert_eq!(coin.rect_px, RectPx { x: 2, y: 4, w: 10, h: 12 });
        assert_eq!(coin.source_size, (16, 16));
        assert_eq!(coin.trim_offset, (3, 1));
        assert_eq!(coin.pivot, (0.5, 1.0));
        assert!(atlas.declared_size.is_none());

        // Bottom-centre pivot: the untrimmed frame spans (92,84)..(108,100).
        let (min, max) = coin.placed_rect(Vec2::new(100.0, 100.0));
        assert_eq!(min, Vec2::new(95.0, 85.0));
        assert_eq!(max, Vec2::new(105.0, 97.0));
    }

    #[test]
    fn default_pivot_centres_the_frame() {
        let atlas = parse_atlas(&misa_atlas_json(), "atlas.png").expect("atlas");
        let front = atlas.frame("misa-front").expect("frame");
        let (min, max) = front.placed_rect(Vec2::new(48.0, 80.0));
        assert_eq!(min, Vec2::new(32.0, 48.0));
        assert_eq!(max, Vec2::new(64.0, 112.0));
    }

    #[test]
    fn uv_uses_texture_size() {
        let atlas = parse_atlas(&misa_atlas_json(), "atlas.png").expect("atlas");
        let frame = atlas.frame("misa-front").expect("frame");
        let uv = frame.uv((512, 128));
        let x0 = frame.rect_px.x as f32 / 512.0;
        assert!((uv[0] - x0).abs() < 1e-6);
        assert!((uv[2] - (x0 + 32.0 / 512.0)).abs() < 1e-6);
        assert!((uv[3] - uv[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn load_atlas_from_path_reads_file() {
        let path = temp_file_path("valid");
        fs::write(&path, misa_atlas_json()).expect("write temp file");
        let atlas = load_atlas_from_path(&path, "atlas.png").expect("atlas should load");
        assert_eq!(atlas.texture_path, "atlas.png");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_out_of_bounds_rect() {
        let err = parse_atlas(
            r#"{ "frames": { "big": { "frame": { "x": 500, "y": 0, "w": 32, "h": 32 } } },
                 "meta": { "size": { "w": 512, "h": 512 } } }"#,
            "a.png",
        )
        .expect_err("rect past the edge should fail");
        assert!(err.contains("exceeds atlas bounds"));
    }

    #[test]
    fn rejects_overflowing_rect() {
        let err = parse_atlas(
            r#"{ "frames": { "wrap": { "frame": { "x": 4294967295, "y": 0, "w": 8, "h": 8 } } } }"#,
            "a.png",
        )
        .expect_err("overflow should fail");
        assert!(err.contains("rect overflows u32 range"));
    }

    #[test]
    fn rejects_duplicate_array_names() {
        let err = parse_atlas(
            r#"{ "frames": [
                 { "filename": "a", "frame": { "x": 0, "y": 0, "w": 8, "h": 8 } },
                 { "filename": "a", "frame": { "x": 8, "y": 0, "w": 8, "h": 8 } }
               ] }"#,
            "a.png",
        )
        .expect_err("duplicate should fail");
        assert!(err.contains("duplicate frame 'a'"));
    }

    #[test]
    fn rejects_rotated_frames() {
        let err = parse_atlas(
            r#"{ "frames": { "r": { "frame": { "x": 0, "y": 0, "w": 8, "h": 8 }, "rotated": true } } }"#,
            "a.png",
        )
        .expect_err("rotated should fail");
        assert!(err.contains("is rotated"));
    }
}
