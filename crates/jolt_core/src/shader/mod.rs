//! Named shader passes per entity and the recorder that turns them into
//! draw commands.

pub mod pipeline;
pub mod recorder;
pub mod registry;
pub mod uniforms;

pub use pipeline::{OverlayInputSource, OverlayPass, ShaderPass, ShaderPipeline};
pub use recorder::{PipelineRecorder, ShadowInfo, SpriteDraw, SpriteFrame};
pub use registry::{ShaderInfo, ShaderRegistry};
pub use uniforms::{ShaderUniforms, UniformSet, UniformValue};
