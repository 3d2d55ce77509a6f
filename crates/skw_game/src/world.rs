//! The walkabout scene without any GPU state: map, collision, atlas
//! metadata, animations and the player, plus the per-tick update.

use glam::Vec2;
use skw_core::motion::{DirectionalInput, Facing, MotionOutcome};
use std::path::Path;

use crate::animation::AnimationRegistry;
use crate::atlas::{load_atlas_from_path, AtlasRegistry};
use crate::collision::CollisionGrid;
use crate::debug_graphic::{build_debug_graphic, DebugRect};
use crate::player::Player;
use crate::scene::{load_scene_from_path, SceneFile};
use crate::tilemap::{load_tilemap_from_path, Tilemap};

pub struct SceneWorld {
    pub scene: SceneFile,
    pub map: Tilemap,
    pub atlas: AtlasRegistry,
    pub animations: AnimationRegistry,
    pub collision: CollisionGrid,
    pub player: Player,
    /// Turned on by the first `D` press; never turned off.
    pub collision_debug: bool,
    last_outcome: Option<MotionOutcome>,
}

impl SceneWorld {
    pub fn load(scene_path: &Path) -> Result<Self, String> {
        let scene = load_scene_from_path(scene_path)?;
        let map = load_tilemap_from_path(Path::new(&scene.assets.tilemap))?;
        let atlas = load_atlas_from_path(
            Path::new(&scene.assets.atlas),
            &scene.assets.atlas_image,
        )?;
        let mut animations = AnimationRegistry::new();
        for path in &scene.assets.animations {
            animations.load_file(Path::new(path))?;
        }
        Self::create(scene, map, atlas, animations)
    }

    /// Wire loaded content into a playable scene.
    pub fn create(
        scene: SceneFile,
        map: Tilemap,
        atlas: AtlasRegistry,
        animations: AnimationRegistry,
    ) -> Result<Self, String> {
        if map.tileset_by_name(&scene.tileset_name).is_none() {
            return Err(format!(
                "Scene '{}' needs tileset '{}' but the map does not define it",
                scene.scene_id, scene.tileset_name
            ));
        }
        for layer in &scene.layers {
            if map.tile_layer(&layer.name).is_none() {
                return Err(format!(
                    "Scene '{}' needs tile layer '{}' but the map does not define it",
                    scene.scene_id, layer.name
                ));
            }
        }

        let collision = match scene.collision_layer() {
            Some((layer, property)) => match map.tile_layer(&layer.name) {
                Some(tile_layer) => CollisionGrid::from_tile_layer(&map, tile_layer, property),
                None => {
                    return Err(format!("Collision layer '{}' is missing", layer.name));
                }
            },
            None => CollisionGrid::new(
                map.tile_width as f32,
                map.tile_height as f32,
                map.width as i32,
                map.height as i32,
                [],
            ),
        };

        let spawn = map
            .find_object(&scene.spawn.object_layer, &scene.spawn.object_name)
            .ok_or_else(|| {
                format!(
                    "Spawn object '{}' not found in object layer '{}'",
                    scene.spawn.object_name, scene.spawn.object_layer
                )
            })?;
        let spawn_point = Vec2::new(spawn.x, spawn.y);

        let settings = &scene.player;
        let initial = atlas.frame(&settings.initial_frame).ok_or_else(|| {
            format!(
                "Player initial frame '{}' is not in the atlas",
                settings.initial_frame
            )
        })?;
        let frame_size = Vec2::new(initial.source_size.0 as f32, initial.source_size.1 as f32);

        animations.validate_frames(&atlas)?;
        check_player_animations(&scene, &atlas, &animations)?;

        let player = Player::spawn(
            spawn_point,
            frame_size,
            Vec2::from(initial.pivot),
            settings.body,
            settings.speed,
            &settings.frame_prefix,
            &settings.initial_frame,
        );

        log::info!(
            "Scene '{}' created: map {}x{} tiles, {} layers, {} solid cells, {} frames, {} clips",
            scene.scene_id,
            map.width,
            map.height,
            scene.layers.len(),
            collision.solid_count(),
            atlas.len(),
            animations.clip_count()
        );

        Ok(Self {
            scene,
            map,
            atlas,
            animations,
            collision,
            player,
            collision_debug: false,
            last_outcome: None,
        })
    }

    /// One fixed tick: motion, collision, animation.
    pub fn tick(&mut self, input: DirectionalInput, dt: f32, dt_us: u64) {
        let outcome = self.player.step(input, dt, &self.collision);
        self.player.apply_animation(outcome.animation, &self.animations);
        self.player.animator.tick(dt_us, &self.animations);
        if self.last_outcome.map(|o| o.animation) != Some(outcome.animation) {
            log::trace!("Player animation command: {:?}", outcome.animation);
        }
        self.last_outcome = Some(outcome);
    }

    pub fn enable_collision_debug(&mut self) {
        if !self.collision_debug {
            self.collision_debug = true;
            log::info!("Collision debug graphic enabled");
        }
    }

    pub fn debug_rects(&self) -> Vec<DebugRect> {
        if !self.collision_debug {
            return Vec::new();
        }
        build_debug_graphic(
            &self.collision,
            Some(&self.player.body),
            &self.scene.debug_graphic,
        )
    }

    pub fn map_size_px(&self) -> Vec2 {
        Vec2::new(
            self.map.width_in_pixels() as f32,
            self.map.height_in_pixels() as f32,
        )
    }
}

/// Every walk clip and still frame the motion resolver can ask for must exist.
fn check_player_animations(
    scene: &SceneFile,
    atlas: &AtlasRegistry,
    animations: &AnimationRegistry,
) -> Result<(), String> {
    let prefix = &scene.player.frame_prefix;
    for facing in Facing::ALL {
        let clip = facing.walk_clip(prefix);
        if animations.source_of(&clip).is_none() {
            return Err(format!(
                "Scene '{}' player walk clip '{}' is not defined",
                scene.scene_id, clip
            ));
        }
        let still = facing.still_frame(prefix);
        if !atlas.contains(&still) {
            return Err(format!(
                "Scene '{}' player still frame '{}' is not in the atlas",
                scene.scene_id, still
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::tests::misa_registry;
    use crate::atlas::parse_atlas;
    use crate::atlas::tests::misa_atlas_json;
    use crate::tilemap::parse_tilemap;
    use crate::tilemap::tests::SMALL_MAP;

    const SCENE: &str = r#"
    {
      "version": "0.1",
      "scene_id": "town",
      "assets": {
        "tileset_image": "tiles.png",
        "tilemap": "map.json",
        "atlas_image": "atlas.png",
        "atlas": "atlas.json"
      },
      "tileset_name": "tuxmon-sample-32px-extruded",
      "layers": [
        { "name": "Below Player", "depth": 0 },
        { "name": "World", "depth": 0, "collides_by_property": "collides" }
      ],
      "spawn": { "object_layer": "Objects", "object_name": "Spawn Point" },
      "player": {
        "frame_prefix": "misa",
        "initial_frame": "misa-front",
        "body": { "width": 30, "height": 40, "offset_x": 0, "offset_y": 24 }
      }
    }
    "#;

    fn scene() -> SceneFile {
        serde_json::from_str(SCENE).expect("scene parses")
    }

    fn create(scene: SceneFile) -> Result<SceneWorld, String> {
        SceneWorld::create(
            scene,
            parse_tilemap(SMALL_MAP).expect("map"),
            parse_atlas(&misa_atlas_json(), "atlas.png").expect("atlas"),
            misa_registry(),
        )
    }

    #[test]
    fn create_spawns_player_on_spawn_point() {
        let world = create(scene()).expect("world");
        assert_eq!(world.player.position(), Vec2::new(48.0, 80.0));
        assert_eq!(world.player.animator.current_frame(), "misa-front");
        assert_eq!(world.collision.solid_count(), 6);
        assert_eq!(world.map_size_px(), Vec2::new(128.0, 96.0));
        assert!(world.debug_rects().is_empty());
    }

    #[test]
    fn missing_tileset_fails() {
        let mut scene = scene();
        scene.tileset_name = "other".to_string();
        let err = create(scene).err().expect("should fail");
        assert!(err.contains("tileset 'other'"));
    }

    #[test]
    fn missing_layer_fails() {
        let mut scene = scene();
        scene.layers[0].name = "Nope".to_string();
        let err = create(scene).err().expect("should fail");
        assert!(err.contains("tile layer 'Nope'"));
    }

    #[test]
    fn missing_spawn_fails() {
        let mut scene = scene();
        scene.spawn.object_name = "Elsewhere".to_string();
        let err = create(scene).err().expect("should fail");
        assert!(err.contains("Spawn object 'Elsewhere'"));
    }

    #[test]
    fn missing_initial_frame_fails() {
        let mut scene = scene();
        scene.player.initial_frame = "misa-sideways".to_string();
        let err = create(scene).err().expect("should fail");
        assert!(err.contains("misa-sideways"));
    }

    #[test]
    fn misspelled_frame_prefix_fails() {
        let mut scene = scene();
        scene.player.frame_prefix = "mias".to_string();
        let err = create(scene).err().expect("should fail");
        assert!(err.contains("Scene 'town' player walk clip 'mias-left-walk'"));
    }

    #[test]
    fn missing_still_frame_fails() {
        let atlas_json = misa_atlas_json().replace(r#""misa-back":"#, r#""misa-backside":"#);
        let result = SceneWorld::create(
            scene(),
            parse_tilemap(SMALL_MAP).expect("map"),
            parse_atlas(&atlas_json, "atlas.png").expect("atlas"),
            misa_registry(),
        );
        let err = result.err().expect("should fail");
        assert!(err.contains("still frame 'misa-back'"));
    }

    #[test]
    fn tick_walks_then_idles() {
        let mut world = create(scene()).expect("world");
        let down = DirectionalInput {
            down: true,
            ..Default::default()
        };
        world.tick(down, 1.0 / 60.0, 16_667);
        assert_eq!(world.player.animator.current_clip(), Some("misa-front-walk"));
        assert!(world.player.velocity.y > 0.0);

        world.tick(DirectionalInput::default(), 1.0 / 60.0, 16_667);
        assert_eq!(world.player.animator.current_frame(), "misa-front");
        assert_eq!(world.player.facing, Some(Facing::Front));
    }

    #[test]
    fn debug_graphic_turns_on_once() {
        let mut world = create(scene()).expect("world");
        world.enable_collision_debug();
        world.enable_collision_debug();
        assert!(world.collision_debug);
        // Six solid cells, their exposed faces and the body outline.
        let rects = world.debug_rects();
        assert!(rects.len() > 6 + 4);
    }
}
