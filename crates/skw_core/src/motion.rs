//! Per-tick resolution of directional key state into a velocity and an
//! animation decision.
//!
//! `resolve` is pure: it takes the four arrow-key flags plus the velocity the
//! body ended the previous tick with, and returns a fresh `MotionOutcome`. The
//! caller owns the body and writes the returned velocity back before the
//! physics step consumes it.
//!
//! Tie-breaks are expressed as ordered rule tables rather than nested
//! conditionals. The first matching rule wins:
//!
//! - horizontal axis: left, then right
//! - vertical axis: up, then down
//! - walk animation: left, right, up, down
//! - idle facing (from the *previous* velocity): -x, +x, -y, +y
//!
//! World space is y-down, so "up" is negative y.

use glam::Vec2;

/// Snapshot of the four directional keys for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionalInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionalInput {
    pub fn is_down(self, direction: Direction) -> bool {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    pub fn any(self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// A logical directional key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit step along the key's axis in y-down world space.
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
        }
    }

    /// Which way the character looks while travelling in this direction.
    pub fn facing(self) -> Facing {
        match self {
            Self::Left => Facing::Left,
            Self::Right => Facing::Right,
            Self::Up => Facing::Back,
            Self::Down => Facing::Front,
        }
    }
}

/// Which side of the character is shown. `Back` faces up the screen,
/// `Front` faces down toward the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    Left,
    Right,
    Back,
    Front,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Left, Facing::Right, Facing::Back, Facing::Front];

    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Back => "back",
            Self::Front => "front",
        }
    }

    /// Key of the looping walk clip for this facing, e.g. `misa-left-walk`.
    pub fn walk_clip(self, prefix: &str) -> String {
        format!("{prefix}-{}-walk", self.label())
    }

    /// Name of the static atlas frame for this facing, e.g. `misa-left`.
    pub fn still_frame(self, prefix: &str) -> String {
        format!("{prefix}-{}", self.label())
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What the sprite animator should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationCommand {
    /// Play the walk clip for `Facing` on loop; keep it running if it already is.
    Walk(Facing),
    /// Stop the current clip. When `facing` is `Some`, show that still frame;
    /// otherwise leave whatever frame is on screen.
    Idle { facing: Option<Facing> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOutcome {
    pub velocity: Vec2,
    pub animation: AnimationCommand,
}

pub const HORIZONTAL_RULES: [Direction; 2] = [Direction::Left, Direction::Right];
pub const VERTICAL_RULES: [Direction; 2] = [Direction::Up, Direction::Down];
pub const WALK_PRIORITY: [Direction; 4] = [
    Direction::Left,
    Direction::Right,
    Direction::Up,
    Direction::Down,
];

type VelocityTest = fn(Vec2) -> bool;

fn moving_left(v: Vec2) -> bool {
    v.x < 0.0
}

fn moving_right(v: Vec2) -> bool {
    v.x > 0.0
}

fn moving_up(v: Vec2) -> bool {
    v.y < 0.0
}

fn moving_down(v: Vec2) -> bool {
    v.y > 0.0
}

pub const IDLE_FACING_RULES: [(VelocityTest, Facing); 4] = [
    (moving_left, Facing::Left),
    (moving_right, Facing::Right),
    (moving_up, Facing::Back),
    (moving_down, Facing::Front),
];

/// First direction in `rules` whose key is held.
fn first_held(input: DirectionalInput, rules: &[Direction]) -> Option<Direction> {
    rules.iter().copied().find(|&d| input.is_down(d))
}

/// Facing implied by the sign of a velocity, or `None` for the zero vector.
pub fn idle_facing(previous_velocity: Vec2) -> Option<Facing> {
    IDLE_FACING_RULES
        .iter()
        .find(|(test, _)| test(previous_velocity))
        .map(|&(_, facing)| facing)
}

/// Velocity for this tick: one winner per axis, rescaled to `speed` when non-zero.
pub fn resolve_velocity(input: DirectionalInput, speed: f32) -> Vec2 {
    let mut velocity = Vec2::ZERO;
    if let Some(d) = first_held(input, &HORIZONTAL_RULES) {
        velocity += d.unit() * speed;
    }
    if let Some(d) = first_held(input, &VERTICAL_RULES) {
        velocity += d.unit() * speed;
    }
    if velocity != Vec2::ZERO {
        velocity = velocity.normalize() * speed;
    }
    velocity
}

pub fn resolve(input: DirectionalInput, previous_velocity: Vec2, speed: f32) -> MotionOutcome {
    let velocity = resolve_velocity(input, speed);
    let animation = match first_held(input, &WALK_PRIORITY) {
        Some(direction) => AnimationCommand::Walk(direction.facing()),
        None => AnimationCommand::Idle {
            facing: idle_facing(previous_velocity),
        },
    };
    MotionOutcome {
        velocity,
        animation,
    }
}
