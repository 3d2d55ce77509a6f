pub mod animation;
pub mod input;
pub mod motion;
pub mod time;
