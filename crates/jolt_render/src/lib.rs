//! wgpu rendering for the runtime: device setup, the sprite pipeline and a
//! [`MeshBackend`] that turns draw commands into batched sprite geometry.

pub mod camera;
pub mod error;
pub mod gpu_context;
pub mod gpu_mesh;
pub mod mesh_backend;
pub mod sprite_pipeline;
pub mod texture;
pub mod vertex;

pub use camera::{Camera2D, CameraUniform};
pub use error::RenderError;
pub use gpu_context::GpuContext;
pub use gpu_mesh::{GpuMesh, GpuTexture};
pub use mesh_backend::{DrawCall, MeshBackend, MeshStats};
pub use sprite_pipeline::SpritePipeline;
pub use texture::Texture;
pub use vertex::SpriteVertex;
