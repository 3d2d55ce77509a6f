pub mod window;

pub use window::{create_window, PlatformConfig};
