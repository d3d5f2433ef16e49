//! Deferred draw commands: recording, reordering and execution against a
//! [`RenderBackend`].

pub mod backend;
pub mod buffer;
pub mod command;
pub mod local;

pub use backend::RenderBackend;
pub use buffer::{DrawCommandBuffer, ExecuteStats, OptimizeStats};
pub use command::{
    CommandMeta, CommandSink, CustomFn, DrawCommand, DrawSpace, FontId, LocalFlags, NPatchInfo,
    RecordedCommand, TextureId,
};
pub use local::BatchedLocalCommands;
