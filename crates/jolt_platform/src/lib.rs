//! Window creation on top of winit.

pub mod window;

pub use window::{create_window, PlatformConfig};
