use glam::Vec2;
use skw_core::motion::{self, AnimationCommand, DirectionalInput, Facing, MotionOutcome};

use crate::animation::{AnimationRegistry, SpriteAnimator};
use crate::collision::{Aabb, CollisionGrid, CollisionMoveResult};
use crate::scene::BodySettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// The walking character: a sprite drawn around a smaller physics body.
///
/// The sprite's position is the point `origin` (a fraction of the untrimmed
/// frame, the atlas pivot) inside the frame. The body's top-left corner sits
/// at the sprite's top-left corner plus `body_offset`, so the body covers the
/// character's feet rather than the whole frame.
#[derive(Debug, Clone)]
pub struct Player {
    pub body: Aabb,
    pub velocity: Vec2,
    pub speed: f32,
    pub frame_size: Vec2,
    pub origin: Vec2,
    pub body_offset: Vec2,
    pub contacts: ContactState,
    pub animator: SpriteAnimator,
    pub frame_prefix: String,
    /// Last facing shown, for the overlay.
    pub facing: Option<Facing>,
}

impl Player {
    pub fn spawn(
        position: Vec2,
        frame_size: Vec2,
        origin: Vec2,
        body: BodySettings,
        speed: f32,
        frame_prefix: &str,
        initial_frame: &str,
    ) -> Self {
        let body_offset = Vec2::new(body.offset_x, body.offset_y);
        let top_left = position - frame_size * origin;
        let aabb = Aabb::from_min_size(top_left + body_offset, Vec2::new(body.width, body.height));
        log::info!(
            "Player spawned at ({:.1}, {:.1}), body {}x{} offset ({}, {})",
            position.x,
            position.y,
            body.width,
            body.height,
            body.offset_x,
            body.offset_y
        );
        Self {
            body: aabb,
            velocity: Vec2::ZERO,
            speed,
            frame_size,
            origin,
            body_offset,
            contacts: ContactState::default(),
            animator: SpriteAnimator::new(initial_frame),
            frame_prefix: frame_prefix.to_string(),
            facing: None,
        }
    }

    pub fn sprite_top_left(&self) -> Vec2 {
        self.body.min() - self.body_offset
    }

    pub fn position(&self) -> Vec2 {
        self.sprite_top_left() + self.frame_size * self.origin
    }

    /// One fixed tick: resolve input against the velocity left over from the
    /// previous tick, then move the body through the grid.
    pub fn step(&mut self, input: DirectionalInput, dt: f32, grid: &CollisionGrid) -> MotionOutcome {
        let outcome = motion::resolve(input, self.velocity, self.speed);
        self.velocity = outcome.velocity;

        let delta = self.velocity * dt;
        let result = grid.move_and_collide(self.body, delta.x, delta.y);
        self.apply_collision_result(result);
        outcome
    }

    fn apply_collision_result(&mut self, result: CollisionMoveResult) {
        self.body = result.aabb;
        self.contacts = ContactState {
            left: result.blocked_left,
            right: result.blocked_right,
            up: result.blocked_up,
            down: result.blocked_down,
        };

        if (result.blocked_left && self.velocity.x < 0.0)
            || (result.blocked_right && self.velocity.x > 0.0)
        {
            self.velocity.x = 0.0;
        }
        if (result.blocked_up && self.velocity.y < 0.0)
            || (result.blocked_down && self.velocity.y > 0.0)
        {
            self.velocity.y = 0.0;
        }
    }

    pub fn apply_animation(&mut self, command: AnimationCommand, registry: &AnimationRegistry) {
        match command {
            AnimationCommand::Walk(facing) => {
                self.animator
                    .play(&facing.walk_clip(&self.frame_prefix), true, registry);
                self.facing = Some(facing);
            }
            AnimationCommand::Idle { facing } => {
                self.animator.stop();
                if let Some(facing) = facing {
                    self.animator.set_frame(&facing.still_frame(&self.frame_prefix));
                    self.facing = Some(facing);
                }
            }
        }
    }
}
