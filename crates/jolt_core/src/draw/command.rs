use std::fmt;
use std::sync::Arc;

use glam::Vec2;

use crate::color::Color;
use crate::draw::backend::RenderBackend;
use crate::math::Rect;
use crate::shader::uniforms::UniformValue;
use crate::ui::rounded_rect::RoundedRectGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl TextureId {
    /// 1x1 white pixel every backend provides for untextured fills.
    pub const WHITE: TextureId = TextureId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontId(pub u32);

/// World commands run under the world camera, Screen commands outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DrawSpace {
    #[default]
    World,
    Screen,
}

/// Routing flags for commands attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalFlags {
    pub force_text_pass: bool,
    pub force_uv_passthrough: bool,
    pub force_sticker_pass: bool,
}

impl LocalFlags {
    pub const TEXT: LocalFlags = LocalFlags {
        force_text_pass: true,
        force_uv_passthrough: false,
        force_sticker_pass: false,
    };

    pub const STICKER: LocalFlags = LocalFlags {
        force_text_pass: false,
        force_uv_passthrough: false,
        force_sticker_pass: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandMeta {
    pub z: i32,
    pub space: DrawSpace,
    pub flags: LocalFlags,
    /// Run the command was recorded in; 0 for none. `optimize` never
    /// reorders commands inside one run.
    pub group: u32,
}

impl CommandMeta {
    pub fn new(z: i32, space: DrawSpace) -> Self {
        Self {
            z,
            space,
            flags: LocalFlags::default(),
            group: 0,
        }
    }

    pub fn with_flags(mut self, flags: LocalFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Nine-slice description: `source` in texture pixels plus border widths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NPatchInfo {
    pub source: Rect,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

pub type CustomFn = Arc<dyn Fn(&mut dyn RenderBackend)>;

#[derive(Clone)]
pub enum DrawCommand {
    BeginShader(String),
    EndShader,
    PushMatrix,
    PopMatrix,
    Translate(Vec2),
    Scale(Vec2),
    /// Degrees.
    Rotate(f32),
    /// `dst.x/y` is where `origin` lands; rotation pivots about it.
    DrawTexturePro {
        texture: TextureId,
        src: Rect,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    },
    DrawText {
        text: String,
        font: FontId,
        position: Vec2,
        size: f32,
        spacing: f32,
        color: Color,
    },
    DrawRectanglePro {
        rect: Rect,
        origin: Vec2,
        rotation: f32,
        color: Color,
    },
    RenderRectFilled {
        geometry: Arc<RoundedRectGeometry>,
        color: Color,
    },
    RenderRectOutline {
        geometry: Arc<RoundedRectGeometry>,
        color: Color,
    },
    RenderNPatch {
        texture: TextureId,
        info: NPatchInfo,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        color: Color,
    },
    SetUniform {
        shader: String,
        name: String,
        value: UniformValue,
    },
    BeginRenderTarget(TextureId),
    EndRenderTarget,
    Custom(CustomFn),
}

impl DrawCommand {
    pub fn label(&self) -> &'static str {
        match self {
            DrawCommand::BeginShader(_) => "BeginShader",
            DrawCommand::EndShader => "EndShader",
            DrawCommand::PushMatrix => "PushMatrix",
            DrawCommand::PopMatrix => "PopMatrix",
            DrawCommand::Translate(_) => "Translate",
            DrawCommand::Scale(_) => "Scale",
            DrawCommand::Rotate(_) => "Rotate",
            DrawCommand::DrawTexturePro { .. } => "DrawTexturePro",
            DrawCommand::DrawText { .. } => "DrawText",
            DrawCommand::DrawRectanglePro { .. } => "DrawRectanglePro",
            DrawCommand::RenderRectFilled { .. } => "RenderRectFilled",
            DrawCommand::RenderRectOutline { .. } => "RenderRectOutline",
            DrawCommand::RenderNPatch { .. } => "RenderNPatch",
            DrawCommand::SetUniform { .. } => "SetUniform",
            DrawCommand::BeginRenderTarget(_) => "BeginRenderTarget",
            DrawCommand::EndRenderTarget => "EndRenderTarget",
            DrawCommand::Custom(_) => "Custom",
        }
    }

    /// Run this command against `backend`.
    pub fn apply(&self, backend: &mut dyn RenderBackend) {
        match self {
            DrawCommand::BeginShader(name) => backend.begin_shader(name),
            DrawCommand::EndShader => backend.end_shader(),
            DrawCommand::PushMatrix => backend.push_matrix(),
            DrawCommand::PopMatrix => backend.pop_matrix(),
            DrawCommand::Translate(d) => backend.translate(*d),
            DrawCommand::Scale(s) => backend.scale(*s),
            DrawCommand::Rotate(deg) => backend.rotate(*deg),
            DrawCommand::DrawTexturePro {
                texture,
                src,
                dst,
                origin,
                rotation,
                tint,
            } => backend.draw_texture_pro(*texture, *src, *dst, *origin, *rotation, *tint),
            DrawCommand::DrawText {
                text,
                font,
                position,
                size,
                spacing,
                color,
            } => backend.draw_text(text, *font, *position, *size, *spacing, *color),
            DrawCommand::DrawRectanglePro {
                rect,
                origin,
                rotation,
                color,
            } => backend.draw_rectangle_pro(*rect, *origin, *rotation, *color),
            DrawCommand::RenderRectFilled { geometry, color } => {
                backend.draw_triangles(&geometry.fill, *color)
            }
            DrawCommand::RenderRectOutline { geometry, color } => {
                backend.draw_triangles(&geometry.outline, *color)
            }
            DrawCommand::RenderNPatch {
                texture,
                info,
                dst,
                origin,
                rotation,
                color,
            } => backend.draw_npatch(*texture, info, *dst, *origin, *rotation, *color),
            DrawCommand::SetUniform {
                shader,
                name,
                value,
            } => backend.set_uniform(shader, name, value),
            DrawCommand::BeginRenderTarget(target) => backend.begin_render_target(*target),
            DrawCommand::EndRenderTarget => backend.end_render_target(),
            DrawCommand::Custom(f) => f(backend),
        }
    }
}

impl fmt::Debug for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCommand::BeginShader(name) => write!(f, "BeginShader({name})"),
            DrawCommand::SetUniform { shader, name, value } => {
                write!(f, "SetUniform({shader}.{name} = {value:?})")
            }
            DrawCommand::DrawText { text, .. } => write!(f, "DrawText({text:?})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Anything commands can be recorded into: the frame buffer or an entity's
/// local batch.
pub trait CommandSink {
    fn push_command(&mut self, command: DrawCommand, meta: CommandMeta);
}

#[derive(Clone, Debug)]
pub struct RecordedCommand {
    pub command: DrawCommand,
    pub meta: CommandMeta,
}

impl RecordedCommand {
    pub fn new(command: DrawCommand, meta: CommandMeta) -> Self {
        Self { command, meta }
    }
}
