//! Collision debug graphic: filled colliding tiles, their exposed faces, and
//! the player's physics body outline. Built as plain rectangles that the
//! renderer turns into untextured quads.

use glam::Vec2;

use crate::collision::{Aabb, CollisionGrid};
use crate::scene::DebugGraphicSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugRect {
    pub min: Vec2,
    pub max: Vec2,
    pub color: [f32; 4],
}

fn rgba(rgb: [u8; 3], alpha: f32) -> [f32; 4] {
    [
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
        alpha,
    ]
}

/// Four edge strips of `thickness` lying inside `min..max`.
fn outline(min: Vec2, max: Vec2, thickness: f32, color: [f32; 4]) -> [DebugRect; 4] {
    [
        DebugRect {
            min,
            max: Vec2::new(max.x, min.y + thickness),
            color,
        },
        DebugRect {
            min: Vec2::new(min.x, max.y - thickness),
            max,
            color,
        },
        DebugRect {
            min,
            max: Vec2::new(min.x + thickness, max.y),
            color,
        },
        DebugRect {
            min: Vec2::new(max.x - thickness, min.y),
            max,
            color,
        },
    ]
}

pub fn build_debug_graphic(
    grid: &CollisionGrid,
    body: Option<&Aabb>,
    settings: &DebugGraphicSettings,
) -> Vec<DebugRect> {
    let tile_color = rgba(settings.colliding_tile_color, settings.alpha);
    let face_color = rgba(settings.face_color, settings.alpha);
    let t = settings.face_thickness;

    let cells = grid.solids_sorted();
    let mut rects = Vec::with_capacity(cells.len() * 2 + 4);

    for &cell in &cells {
        let (min, max) = grid.cell_bounds(cell);
        rects.push(DebugRect {
            min,
            max,
            color: tile_color,
        });
    }

    for &cell in &cells {
        let (min, max) = grid.cell_bounds(cell);
        let faces = grid.exposed_faces(cell);
        let [top, bottom, left, right] = outline(min, max, t, face_color);
        if faces.top {
            rects.push(top);
        }
        if faces.bottom {
            rects.push(bottom);
        }
        if faces.left {
            rects.push(left);
        }
        if faces.right {
            rects.push(right);
        }
    }

    if let Some(body) = body {
        rects.extend(outline(body.min(), body.max(), 1.0, rgba(settings.body_color, 1.0)));
    }

    rects
}
