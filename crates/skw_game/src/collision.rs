//! Static tile collision.
//!
//! Solid cells come from one tile layer: a cell is solid when its tile has a
//! boolean tileset property (e.g. `collides`) set to `true`. Moving bodies
//! resolve against the grid with axis-separable move-and-slide: X first, then
//! Y from the corrected X position, so a body pressed into a wall still
//! slides along it.
//!
//! World space is y-down with the grid origin at the map's top-left corner.

use glam::Vec2;
use std::collections::HashSet;

use crate::tilemap::{TileLayer, Tilemap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self {
            center_x: min.x + size.x * 0.5,
            center_y: min.y + size.y * 0.5,
            half_w: size.x * 0.5,
            half_h: size.y * 0.5,
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.center_x - self.half_w, self.center_y - self.half_h)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.center_x + self.half_w, self.center_y + self.half_h)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollisionMoveResult {
    pub aabb: Aabb,
    pub blocked_left: bool,
    pub blocked_right: bool,
    pub blocked_up: bool,
    pub blocked_down: bool,
}

/// Sides of a solid cell that border a non-solid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExposedFaces {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone)]
pub struct CollisionGrid {
    pub cell_width: f32,
    pub cell_height: f32,
    pub origin: Vec2,
    /// Size in cells.
    pub width: i32,
    pub height: i32,
    solids: HashSet<GridCell>,
}

impl CollisionGrid {
    pub fn new(
        cell_width: f32,
        cell_height: f32,
        width: i32,
        height: i32,
        solids: impl IntoIterator<Item = GridCell>,
    ) -> Self {
        Self {
            cell_width,
            cell_height,
            origin: Vec2::ZERO,
            width,
            height,
            solids: solids.into_iter().collect(),
        }
    }

    /// Mark every tile of `layer` whose tileset property `property` is `true`.
    pub fn from_tile_layer(map: &Tilemap, layer: &TileLayer, property: &str) -> Self {
        let solids: Vec<GridCell> = layer
            .tiles()
            .filter(|&(_, _, gid)| {
                map.tileset_for_gid(gid).is_some_and(|ts| {
                    ts.local_id(gid)
                        .is_some_and(|local| ts.tile_property_is_true(local, property))
                })
            })
            .map(|(x, y, _)| GridCell {
                x: x as i32,
                y: y as i32,
            })
            .collect();
        log::info!(
            "Collision grid from layer '{}' by property '{}': {} solid cells",
            layer.name,
            property,
            solids.len()
        );
        Self::new(
            map.tile_width as f32,
            map.tile_height as f32,
            layer.width as i32,
            layer.height as i32,
            solids,
        )
    }

    /// Outside the grid nothing is solid.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        self.solids.contains(&GridCell { x, y })
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// Solid cells in row-major order.
    pub fn solids_sorted(&self) -> Vec<GridCell> {
        let mut cells: Vec<GridCell> = self.solids.iter().copied().collect();
        cells.sort_by_key(|c| (c.y, c.x));
        cells
    }

    pub fn exposed_faces(&self, cell: GridCell) -> ExposedFaces {
        if !self.is_solid(cell.x, cell.y) {
            return ExposedFaces::default();
        }
        ExposedFaces {
            top: !self.is_solid(cell.x, cell.y - 1),
            bottom: !self.is_solid(cell.x, cell.y + 1),
            left: !self.is_solid(cell.x - 1, cell.y),
            right: !self.is_solid(cell.x + 1, cell.y),
        }
    }

    /// World-space `(min, max)` of a cell.
    pub fn cell_bounds(&self, cell: GridCell) -> (Vec2, Vec2) {
        let min = Vec2::new(
            self.cell_left_world(cell.x),
            self.cell_top_world(cell.y),
        );
        (min, min + Vec2::new(self.cell_width, self.cell_height))
    }

    pub fn move_and_collide(&self, aabb: Aabb, dx: f32, dy: f32) -> CollisionMoveResult {
        const EPS: f32 = 0.0001;

        let resolved_x = self.resolve_axis_x(aabb, dx);
        let collided_x = (resolved_x - (aabb.center_x + dx)).abs() > EPS;

        let mut moved = aabb;
        moved.center_x = resolved_x;
        let resolved_y = self.resolve_axis_y(moved, dy);
        let collided_y = (resolved_y - (aabb.center_y + dy)).abs() > EPS;
        moved.center_y = resolved_y;

        CollisionMoveResult {
            aabb: moved,
            blocked_left: collided_x && dx < 0.0,
            blocked_right: collided_x && dx > 0.0,
            blocked_up: collided_y && dy < 0.0,
            blocked_down: collided_y && dy > 0.0,
        }
    }

    fn resolve_axis_x(&self, aabb: Aabb, dx: f32) -> f32 {
        if dx == 0.0 {
            return aabb.center_x;
        }

        const EPS: f32 = 0.001;
        let mut candidate_x = aabb.center_x + dx;
        let y0 = self.world_to_cell_y(aabb.center_y - aabb.half_h + EPS);
        let y1 = self.world_to_cell_y(aabb.center_y + aabb.half_h - EPS);

        if dx > 0.0 {
            let x_cell = self.world_to_cell_x(candidate_x + aabb.half_w - EPS);
            for y in y0..=y1 {
                if self.is_solid(x_cell, y) {
                    candidate_x = candidate_x.min(self.cell_left_world(x_cell) - aabb.half_w);
                }
            }
            // Never push against the direction of travel.
            candidate_x = candidate_x.max(aabb.center_x);
        } else {
            let x_cell = self.world_to_cell_x(candidate_x - aabb.half_w + EPS);
            for y in y0..=y1 {
                if self.is_solid(x_cell, y) {
                    candidate_x = candidate_x.max(self.cell_right_world(x_cell) + aabb.half_w);
                }
            }
            candidate_x = candidate_x.min(aabb.center_x);
        }

        candidate_x
    }

    fn resolve_axis_y(&self, aabb: Aabb, dy: f32) -> f32 {
        if dy == 0.0 {
            return aabb.center_y;
        }

        const EPS: f32 = 0.001;
        let mut candidate_y = aabb.center_y + dy;
        let x0 = self.world_to_cell_x(aabb.center_x - aabb.half_w + EPS);
        let x1 = self.world_to_cell_x(aabb.center_x + aabb.half_w - EPS);

        if dy > 0.0 {
            let y_cell = self.world_to_cell_y(candidate_y + aabb.half_h - EPS);
            for x in x0..=x1 {
                if self.is_solid(x, y_cell) {
                    candidate_y = candidate_y.min(self.cell_top_world(y_cell) - aabb.half_h);
                }
            }
            candidate_y = candidate_y.max(aabb.center_y);
        } else {
            let y_cell = self.world_to_cell_y(candidate_y - aabb.half_h + EPS);
            for x in x0..=x1 {
                if self.is_solid(x, y_cell) {
                    candidate_y = candidate_y.max(self.cell_bottom_world(y_cell) + aabb.half_h);
                }
            }
            candidate_y = candidate_y.min(aabb.center_y);
        }

        candidate_y
    }

    fn world_to_cell_x(&self, world_x: f32) -> i32 {
        ((world_x - self.origin.x) / self.cell_width).floor() as i32
    }

    fn world_to_cell_y(&self, world_y: f32) -> i32 {
        ((world_y - self.origin.y) / self.cell_height).floor() as i32
    }

    fn cell_left_world(&self, x: i32) -> f32 {
        self.origin.x + x as f32 * self.cell_width
    }

    fn cell_right_world(&self, x: i32) -> f32 {
        self.origin.x + (x + 1) as f32 * self.cell_width
    }

    fn cell_top_world(&self, y: i32) -> f32 {
        self.origin.y + y as f32 * self.cell_height
    }

    fn cell_bottom_world(&self, y: i32) -> f32 {
        self.origin.y + (y + 1) as f32 * self.cell_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::parse_tilemap;
    use crate::tilemap::tests::SMALL_MAP;

    fn wall_grid() -> CollisionGrid {
        CollisionGrid::new(32.0, 32.0, 8, 8, [GridCell { x: 2, y: 1 }])
    }

    fn box_at(x: f32, y: f32) -> Aabb {
        Aabb {
            center_x: x,
            center_y: y,
            half_w: 8.0,
            half_h: 8.0,
        }
    }

    #[test]
    fn from_tile_layer_uses_property() {
        let map = parse_tilemap(SMALL_MAP).expect("map");
        let world = map.tile_layer("World").expect("World");
        let grid = CollisionGrid::from_tile_layer(&map, world, "collides");

        assert_eq!(grid.solid_count(), 6);
        assert!(grid.is_solid(0, 0));
        assert!(grid.is_solid(1, 1));
        assert!(grid.is_solid(3, 2));
        assert!(!grid.is_solid(0, 1));
        assert_eq!((grid.cell_width, grid.cell_height), (32.0, 32.0));

        let below = map.tile_layer("Below Player").expect("Below");
        let none = CollisionGrid::from_tile_layer(&map, below, "collides");
        assert_eq!(none.solid_count(), 0);
    }

    #[test]
    fn moving_right_stops_at_wall() {
        let grid = wall_grid();
        let start = box_at(40.0, 40.0);
        let moved = grid.move_and_collide(start, 40.0, 0.0);
        assert!((moved.aabb.center_x - (64.0 - 8.0)).abs() < 0.001);
        assert!(moved.blocked_right);
        assert!(!moved.blocked_left);
        assert!(!moved.blocked_up && !moved.blocked_down);
    }

    #[test]
    fn moving_down_onto_cell_sets_blocked_down() {
        let grid = wall_grid();
        // Directly above the wall cell, which spans y 32..64.
        let start = box_at(80.0, 16.0);
        let moved = grid.move_and_collide(start, 0.0, 20.0);
        assert!(moved.blocked_down);
        assert!(!moved.blocked_up);
        assert!((moved.aabb.center_y - 24.0).abs() < 0.001);
    }

    #[test]
    fn moving_up_into_cell_sets_blocked_up() {
        let grid = wall_grid();
        let start = box_at(80.0, 80.0);
        let moved = grid.move_and_collide(start, 0.0, -20.0);
        assert!(moved.blocked_up);
        assert!((moved.aabb.center_y - 72.0).abs() < 0.001);
    }

    #[test]
    fn diagonal_slides_along_wall() {
        let grid = wall_grid();
        let start = box_at(56.0, 40.0);
        let moved = grid.move_and_collide(start, 5.0, 30.0);
        assert!(moved.blocked_right);
        assert!(!moved.blocked_down);
        assert!((moved.aabb.center_y - 70.0).abs() < 0.001);
    }

    #[test]
    fn outside_the_grid_is_open() {
        let grid = wall_grid();
        let moved = grid.move_and_collide(box_at(-100.0, -100.0), -50.0, -50.0);
        assert_eq!(moved.aabb.center_x, -150.0);
        assert_eq!(moved.aabb.center_y, -150.0);
    }

    #[test]
    fn exposed_faces_skip_shared_edges() {
        let grid = CollisionGrid::new(
            32.0,
            32.0,
            4,
            4,
            [GridCell { x: 1, y: 1 }, GridCell { x: 2, y: 1 }],
        );
        let left_cell = grid.exposed_faces(GridCell { x: 1, y: 1 });
        assert_eq!(
            left_cell,
            ExposedFaces {
                top: true,
                bottom: true,
                left: true,
                right: false
            }
        );
        let right_cell = grid.exposed_faces(GridCell { x: 2, y: 1 });
        assert!(!right_cell.left && right_cell.right);
        assert_eq!(grid.exposed_faces(GridCell { x: 0, y: 0 }), ExposedFaces::default());
    }

    #[test]
    fn rectangular_cells() {
        let grid = CollisionGrid::new(16.0, 32.0, 4, 4, [GridCell { x: 1, y: 1 }]);
        let (min, max) = grid.cell_bounds(GridCell { x: 1, y: 1 });
        assert_eq!(min, Vec2::new(16.0, 32.0));
        assert_eq!(max, Vec2::new(32.0, 64.0));
        let moved = grid.move_and_collide(box_at(8.0, 48.0), 10.0, 0.0);
        assert!((moved.aabb.center_x - 8.0).abs() < 0.001);
        assert!(moved.blocked_right);
    }
}
