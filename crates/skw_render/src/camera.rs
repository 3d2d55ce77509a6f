//! 2D orthographic camera over a y-down world.
//!
//! `position` is the world point at the centre of the viewport. World y grows
//! downward (tile row 0 is at the top of the map), so the projection flips y
//! to keep the map upright on screen.

use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// World-space rectangle the camera view must stay inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub viewport: (u32, u32),
    pub bounds: Option<CameraBounds>,
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport: (viewport_width, viewport_height),
            bounds: None,
        }
    }

    /// Half extents of the view in world units.
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(
            self.viewport.0 as f32 / (2.0 * self.zoom),
            self.viewport.1 as f32 / (2.0 * self.zoom),
        )
    }

    /// Centre the view on `target`, then keep it inside `bounds` if set.
    pub fn follow(&mut self, target: Vec2) {
        self.position = target;
        if let Some(bounds) = self.bounds {
            self.clamp_to_bounds(bounds);
        }
    }

    /// On an axis where the bounds are narrower than the view, the view's
    /// leading edge is pinned to the bounds origin.
    pub fn clamp_to_bounds(&mut self, bounds: CameraBounds) {
        let half = self.half_extents();
        self.position.x = clamp_axis(self.position.x, half.x, bounds.x, bounds.width);
        self.position.y = clamp_axis(self.position.y, half.y, bounds.y, bounds.height);
    }

    /// Visible world rectangle as `(min, max)` corners.
    pub fn visible_rect(&self) -> (Vec2, Vec2) {
        let half = self.half_extents();
        (self.position - half, self.position + half)
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let half = self.half_extents();

        let proj = Mat4::orthographic_rh(
            self.position.x - half.x,
            self.position.x + half.x,
            self.position.y + half.y,
            self.position.y - half.y,
            -1.0,
            1.0,
        );

        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}

fn clamp_axis(center: f32, half_view: f32, start: f32, extent: f32) -> f32 {
    if extent <= half_view * 2.0 {
        start + half_view
    } else {
        center.clamp(start + half_view, start + extent - half_view)
    }
}
