//! Tiled JSON map loading.
//!
//! Supports orthogonal maps with embedded tilesets, uncompressed tile layers
//! and object groups. Tile properties are read from both the `tiles[]` array
//! form and the older `tileproperties` map form.
//!
//! Global tile ids (gids) carry flip flags in their top three bits; these are
//! masked off on load. Gid 0 is an empty cell.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

const GID_FLAG_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone)]
pub struct Tilemap {
    /// Size in tiles.
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
    /// Sorted by ascending `first_gid`.
    pub tilesets: Vec<Tileset>,
}

#[derive(Debug, Clone)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub opacity: f32,
    data: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ObjectLayer {
    pub name: String,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct Tileset {
    pub name: String,
    pub image: String,
    pub image_width: u32,
    pub image_height: u32,
    pub first_gid: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub margin: u32,
    pub spacing: u32,
    pub columns: u32,
    pub tile_count: u32,
    properties: HashMap<u32, HashMap<String, serde_json::Value>>,
}

impl Tilemap {
    pub fn width_in_pixels(&self) -> u32 {
        self.width * self.tile_width
    }

    pub fn height_in_pixels(&self) -> u32 {
        self.height * self.tile_height
    }

    pub fn tileset_by_name(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.name == name)
    }

    /// The tileset a gid belongs to: the one with the highest `first_gid` not
    /// above it.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .rev()
            .find(|t| t.first_gid <= gid)
            .filter(|t| t.contains_gid(gid))
    }

    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.tile_layers.iter().find(|l| l.name == name)
    }

    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.object_layers.iter().find(|l| l.name == name)
    }

    /// First object named `object_name` in object layer `layer_name`.
    pub fn find_object(&self, layer_name: &str, object_name: &str) -> Option<&MapObject> {
        self.object_layer(layer_name)?
            .objects
            .iter()
            .find(|o| o.name == object_name)
    }
}

impl TileLayer {
    /// Gid at tile `(x, y)` with flip flags removed; 0 when empty or out of range.
    pub fn gid_at(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    /// Non-empty cells as `(x, y, gid)`, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &gid)| gid != 0)
            .map(move |(i, &gid)| (i as u32 % width, i as u32 / width, gid))
    }
}

impl Tileset {
    pub fn contains_gid(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }

    pub fn local_id(&self, gid: u32) -> Option<u32> {
        self.contains_gid(gid).then(|| gid - self.first_gid)
    }

    /// Pixel rect `(x, y, w, h)` of a tile inside the tileset image.
    pub fn tile_rect_px(&self, local_id: u32) -> (u32, u32, u32, u32) {
        let col = local_id % self.columns;
        let row = local_id / self.columns;
        (
            self.margin + col * (self.tile_width + self.spacing),
            self.margin + row * (self.tile_height + self.spacing),
            self.tile_width,
            self.tile_height,
        )
    }

    /// Texture coordinates `[u0, v0, u1, v1]` of a tile, `v0` at the top.
    pub fn tile_uv(&self, local_id: u32) -> [f32; 4] {
        let (x, y, w, h) = self.tile_rect_px(local_id);
        let iw = self.image_width as f32;
        let ih = self.image_height as f32;
        [
            x as f32 / iw,
            y as f32 / ih,
            (x + w) as f32 / iw,
            (y + h) as f32 / ih,
        ]
    }

    pub fn tile_property_is_true(&self, local_id: u32, property: &str) -> bool {
        self.properties
            .get(&local_id)
            .and_then(|props| props.get(property))
            .is_some_and(|value| matches!(value, serde_json::Value::Bool(true)))
    }
}

// --- Tiled JSON (private) ---

#[derive(Debug, Deserialize)]
struct TiledMapJson {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default = "default_orientation")]
    orientation: String,
    layers: Vec<TiledLayerJson>,
    #[serde(default)]
    tilesets: Vec<TilesetJson>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TiledLayerJson {
    #[serde(rename = "tilelayer")]
    Tiles(TileLayerJson),
    #[serde(rename = "objectgroup")]
    Objects(ObjectGroupJson),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct TileLayerJson {
    name: String,
    width: u32,
    height: u32,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default = "default_opacity")]
    opacity: f32,
}

#[derive(Debug, Deserialize)]
struct ObjectGroupJson {
    name: String,
    #[serde(default)]
    objects: Vec<ObjectJson>,
}

#[derive(Debug, Deserialize)]
struct ObjectJson {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
}

#[derive(Debug, Deserialize)]
struct TilesetJson {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    tiles: Vec<TileJson>,
    #[serde(default)]
    tileproperties: HashMap<String, HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct TileJson {
    id: u32,
    #[serde(default)]
    properties: Vec<PropertyJson>,
}

#[derive(Debug, Deserialize)]
struct PropertyJson {
    name: String,
    value: serde_json::Value,
}

pub fn load_tilemap_from_path(path: &Path) -> Result<Tilemap, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read tilemap {}: {e}", path.display()))?;
    parse_tilemap(&raw).map_err(|e| format!("Tilemap {}: {e}", path.display()))
}

pub fn parse_tilemap(raw: &str) -> Result<Tilemap, String> {
    let json: TiledMapJson =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse tilemap JSON: {e}"))?;
    validate_tilemap(&json)?;

    let mut tile_layers = Vec::new();
    let mut object_layers = Vec::new();
    for layer in json.layers {
        match layer {
            TiledLayerJson::Tiles(tiles) => tile_layers.push(TileLayer {
                name: tiles.name,
                width: tiles.width,
                height: tiles.height,
                visible: tiles.visible,
                opacity: tiles.opacity,
                data: tiles.data.iter().map(|gid| gid & GID_FLAG_MASK).collect(),
            }),
            TiledLayerJson::Objects(group) => object_layers.push(ObjectLayer {
                name: group.name,
                objects: group
                    .objects
                    .into_iter()
                    .map(|o| MapObject {
                        id: o.id,
                        name: o.name,
                        kind: o.kind,
                        x: o.x,
                        y: o.y,
                        width: o.width,
                        height: o.height,
                    })
                    .collect(),
            }),
            TiledLayerJson::Unsupported => {}
        }
    }

    let mut tilesets = Vec::with_capacity(json.tilesets.len());
    for ts in json.tilesets {
        let mut properties: HashMap<u32, HashMap<String, serde_json::Value>> = HashMap::new();
        for (id, props) in ts.tileproperties {
            let local_id: u32 = id.parse().map_err(|_| {
                format!(
                    "Tilemap validation failed: tileset '{}' has non-numeric tile id '{}'",
                    ts.name, id
                )
            })?;
            properties.entry(local_id).or_default().extend(props);
        }
        for tile in ts.tiles {
            let entry = properties.entry(tile.id).or_default();
            for prop in tile.properties {
                entry.insert(prop.name, prop.value);
            }
        }
        tilesets.push(Tileset {
            name: ts.name,
            image: ts.image,
            image_width: ts.imagewidth,
            image_height: ts.imageheight,
            first_gid: ts.firstgid,
            tile_width: ts.tilewidth,
            tile_height: ts.tileheight,
            margin: ts.margin,
            spacing: ts.spacing,
            columns: ts.columns,
            tile_count: ts.tilecount,
            properties,
        });
    }

    log::info!(
        "Loaded tilemap {}x{} tiles ({} tile layers, {} object layers, {} tilesets)",
        json.width,
        json.height,
        tile_layers.len(),
        object_layers.len(),
        tilesets.len()
    );

    Ok(Tilemap {
        width: json.width,
        height: json.height,
        tile_width: json.tilewidth,
        tile_height: json.tileheight,
        tile_layers,
        object_layers,
        tilesets,
    })
}

fn validate_tilemap(map: &TiledMapJson) -> Result<(), String> {
    if map.orientation != "orthogonal" {
        return Err(format!(
            "Tilemap validation failed: unsupported orientation '{}'",
            map.orientation
        ));
    }
    if map.tilewidth == 0 || map.tileheight == 0 {
        return Err("Tilemap validation failed: tile size must be > 0".to_string());
    }

    let mut names = HashSet::new();
    for layer in &map.layers {
        let name = match layer {
            TiledLayerJson::Tiles(tiles) => {
                if let Some(encoding) = &tiles.encoding {
                    if encoding != "csv" {
                        return Err(format!(
                            "Tilemap validation failed: layer '{}' uses unsupported encoding '{}'",
                            tiles.name, encoding
                        ));
                    }
                }
                let expected = tiles.width as usize * tiles.height as usize;
                if tiles.data.len() != expected {
                    return Err(format!(
                        "Tilemap validation failed: layer '{}' has {} tiles, expected {}",
                        tiles.name,
                        tiles.data.len(),
                        expected
                    ));
                }
                &tiles.name
            }
            TiledLayerJson::Objects(group) => &group.name,
            TiledLayerJson::Unsupported => continue,
        };
        if !names.insert(name.as_str()) {
            return Err(format!(
                "Tilemap validation failed: duplicate layer name '{}'",
                name
            ));
        }
    }

    let mut previous_first_gid = 0;
    for ts in &map.tilesets {
        if let Some(source) = &ts.source {
            return Err(format!(
                "Tilemap validation failed: external tileset '{}' is not supported",
                source
            ));
        }
        if ts.firstgid == 0 || ts.firstgid <= previous_first_gid {
            return Err(format!(
                "Tilemap validation failed: tileset '{}' firstgid {} is not ascending",
                ts.name, ts.firstgid
            ));
        }
        previous_first_gid = ts.firstgid;
        if ts.columns == 0 || ts.tilewidth == 0 || ts.tileheight == 0 {
            return Err(format!(
                "Tilemap validation failed: tileset '{}' needs columns and tile size > 0",
                ts.name
            ));
        }
        if ts.imagewidth == 0 || ts.imageheight == 0 {
            return Err(format!(
                "Tilemap validation failed: tileset '{}' image size must be > 0",
                ts.name
            ));
        }
    }

    Ok(())
}

fn default_orientation() -> String {
    "orthogonal".to_string()
}

const fn default_visible() -> bool {
    true
}

const fn default_opacity() -> f32 {
    1.0
}
