//! Runtime core: spring-driven transforms, the retained UI tree, the
//! draw-command buffer and the per-entity shader pipeline recorder.
//!
//! Everything in this crate is backend-agnostic. Rendering goes through the
//! [`draw::RenderBackend`] trait; the GPU implementation lives in `jolt_render`.

pub mod animation;
pub mod color;
pub mod draw;
pub mod entity;
pub mod error;
pub mod event;
pub mod globals;
pub mod input;
pub mod loading;
pub mod math;
pub mod shader;
pub mod text;
pub mod time;
pub mod transform;
pub mod ui;
pub mod world;

pub use entity::Entity;
pub use error::{CoreError, CoreResult};
pub use time::FrameContext;
