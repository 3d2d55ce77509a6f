//! CPU-side scene mesh, rebuilt every frame that simulated at least one tick.
//!
//! Quads are emitted in depth order (ties keep insertion order) and
//! consecutive quads sharing a texture collapse into one draw call.

use glam::Vec2;
use skw_render::vertex::QUAD_INDICES;
use skw_render::SpriteVertex;
use std::sync::Arc;

use crate::debug_graphic::DebugRect;
use crate::tilemap::{TileLayer, Tileset};

/// A contiguous run of indices that share the same texture binding.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct SceneMesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
    pub quad_count: u32,
    pub tile_count: u32,
}

impl SceneMesh {
    pub fn with_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
            draw_calls: Vec::with_capacity(8),
            quad_count: 0,
            tile_count: 0,
        }
    }

    pub fn push_quad(&mut self, texture_key: &Arc<str>, quad: [SpriteVertex; 4]) {
        let base_index = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&quad);
        let draw_start = self.indices.len() as u32;
        self.indices
            .extend(QUAD_INDICES.iter().map(|i| base_index + i));
        push_draw_call(&mut self.draw_calls, texture_key, draw_start, 6);
        self.quad_count += 1;
    }

    /// Emit the tiles of `layer` that overlap `view` and belong to `tileset`.
    pub fn push_tile_layer(
        &mut self,
        texture_key: &Arc<str>,
        layer: &TileLayer,
        tileset: &Tileset,
        tile_size: Vec2,
        view: (Vec2, Vec2),
    ) {
        if !layer.visible || layer.width == 0 || layer.height == 0 {
            return;
        }
        let (view_min, view_max) = view;
        let x0 = (view_min.x / tile_size.x).floor().max(0.0) as i32;
        let y0 = (view_min.y / tile_size.y).floor().max(0.0) as i32;
        let x1 = ((view_max.x / tile_size.x).ceil() as i32).min(layer.width as i32) - 1;
        let y1 = ((view_max.y / tile_size.y).ceil() as i32).min(layer.height as i32) - 1;

        let color = [1.0, 1.0, 1.0, layer.opacity];
        for y in y0..=y1 {
            for x in x0..=x1 {
                let Some(local) = tileset.local_id(layer.gid_at(x, y)) else {
                    continue;
                };
                let min = Vec2::new(x as f32 * tile_size.x, y as f32 * tile_size.y);
                let max = min + tile_size;
                self.push_quad(
                    texture_key,
                    SpriteVertex::quad(min.into(), max.into(), tileset.tile_uv(local), color),
                );
                self.tile_count += 1;
            }
        }
    }

    pub fn push_debug_rects(&mut self, texture_key: &Arc<str>, rects: &[DebugRect]) {
        for rect in rects {
            self.push_quad(
                texture_key,
                SpriteVertex::quad(
                    rect.min.into(),
                    rect.max.into(),
                    [0.0, 0.0, 1.0, 1.0],
                    rect.color,
                ),
            );
        }
    }
}

/// Append a draw call, merging with the previous one when the texture matches
/// and indices are contiguous.
pub fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture_key: &Arc<str>,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if *last.texture_key == **texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key: Arc::clone(texture_key),
        index_start,
        index_count,
    });
}

pub fn count_texture_binds(draw_calls: &[DrawCall]) -> usize {
    let mut binds = 0usize;
    let mut current: Option<&str> = None;
    for draw in draw_calls {
        let key: &str = &draw.texture_key;
        if current != Some(key) {
            current = Some(key);
            binds += 1;
        }
    }
    binds
}

/// Indices of `depths` in draw order: ascending depth, ties in input order.
pub fn depth_order(depths: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..depths.len()).collect();
    order.sort_by(|&a, &b| depths[a].total_cmp(&depths[b]));
    order
}
