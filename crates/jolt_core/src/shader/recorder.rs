//! Turns one entity's sprite, shader pipeline and local commands into an
//! ordered run of draw commands.
//!
//! Emission order per entity: background fill, shadow (plain, when no pass
//! is enabled), before-sprite locals, each enabled pass (shadow inside the
//! last one), each enabled overlay, the sticker pass, the text pass and
//! finally the after-sprite locals. The whole run is one buffer group, so
//! `optimize` moves it as a unit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::color::Color;
use crate::draw::backend::RenderBackend;
use crate::draw::buffer::DrawCommandBuffer;
use crate::draw::command::{CommandMeta, CustomFn, DrawCommand, RecordedCommand, TextureId};
use crate::draw::local::BatchedLocalCommands;
use crate::entity::Entity;
use crate::error::CoreError;
use crate::math::{Pose, Rect};
use crate::shader::pipeline::ShaderPipeline;
use crate::shader::registry::ShaderRegistry;
use crate::shader::uniforms::{ShaderUniforms, UniformSet};

pub const SHADOW_ALPHA: f32 = 0.8;
/// Px of shadow offset per unit of displacement at height 0.
pub const SHADOW_OFFSET_SCALE: f32 = 3.0;
pub const SHADOW_DRAG_LIFT: f32 = 1.5;

/// The atlas region an animation frame samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteFrame {
    pub texture: TextureId,
    pub src: Rect,
    pub atlas_size: Vec2,
}

impl SpriteFrame {
    /// `(regionRate, pivot)`: the frame's size and corner as fractions of
    /// the atlas.
    fn atlas_rect(&self) -> (Vec2, Vec2) {
        if self.atlas_size.x <= 0.0 || self.atlas_size.y <= 0.0 {
            return (Vec2::ONE, Vec2::ZERO);
        }
        (
            Vec2::new(self.src.w, self.src.h) / self.atlas_size,
            Vec2::new(self.src.x, self.src.y) / self.atlas_size,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowInfo {
    pub displacement: Vec2,
    pub height: f32,
    pub dragged: bool,
}

impl ShadowInfo {
    pub fn offset(&self) -> Vec2 {
        let lift = if self.dragged { SHADOW_DRAG_LIFT } else { 1.0 };
        -self.displacement * SHADOW_OFFSET_SCALE * (1.0 + self.height) * lift
    }
}

/// Everything the recorder reads about one drawable entity.
pub struct SpriteDraw<'a> {
    pub entity: Entity,
    /// None when the animation has no frame to show.
    pub frame: Option<SpriteFrame>,
    /// Visual pose with hover and juice already composed.
    pub pose: Pose,
    pub fg: Color,
    pub bg: Option<Color>,
    pub no_draw: bool,
    pub shadow: Option<ShadowInfo>,
    pub pipeline: &'a ShaderPipeline,
    pub uniforms: Option<&'a ShaderUniforms>,
    pub meta: CommandMeta,
}

/// Where the sprite lands: `dst.x/y` is the center and rotation pivots
/// about it.
#[derive(Debug, Clone, Copy)]
struct Placement {
    dst: Rect,
    origin: Vec2,
    rotation: f32,
    pose: Pose,
}

impl Placement {
    fn new(pose: Pose) -> Self {
        let center = pose.center();
        let w = pose.w * pose.scale;
        let h = pose.h * pose.scale;
        Self {
            dst: Rect::new(center.x, center.y, w, h),
            origin: Vec2::new(w * 0.5, h * 0.5),
            rotation: pose.r,
            pose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SkewUniforms {
    region_rate: Vec2,
    pivot: Vec2,
    quad_center: Vec2,
    quad_size: Vec2,
    card_rotation: f32,
    uv_passthrough: f32,
}

impl SkewUniforms {
    fn write(&self, set: &mut UniformSet) {
        set.set("regionRate", self.region_rate);
        set.set("pivot", self.pivot);
        set.set("quad_center", self.quad_center);
        set.set("quad_size", self.quad_size);
        set.set("card_rotation", self.card_rotation);
        set.set("tilt_enabled", 1.0f32);
        set.set("uv_passthrough", self.uv_passthrough);
    }
}

/// Skew uniforms last applied to the backend, per shader. Consulted when
/// the recorded commands run, so a reordered buffer still sees the values
/// that are actually bound.
type SkewCache = Rc<RefCell<HashMap<String, SkewUniforms>>>;

/// Which atlas state a shader stage samples with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// The sprite's own atlas region.
    Sprite { inject_atlas: bool },
    /// Identity region with UV passthrough, for stickers and text.
    Identity,
}

#[derive(Default)]
pub struct PipelineRecorder {
    skew_cache: SkewCache,
}

impl PipelineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets applied skew uniforms; call once per recorded frame.
    pub fn begin_frame(&mut self) {
        self.skew_cache.borrow_mut().clear();
    }

    /// Records one entity. Local commands are drained even when nothing is
    /// drawn. Returns the number of commands added.
    pub fn record(
        &mut self,
        buffer: &mut DrawCommandBuffer,
        registry: &ShaderRegistry,
        draw: &SpriteDraw<'_>,
        locals: &mut BatchedLocalCommands,
    ) -> usize {
        let locals = locals.take_sorted();
        if draw.no_draw {
            return 0;
        }
        let Some(frame) = draw.frame else {
            log::warn!(
                "{}",
                CoreError::AssetMissing {
                    what: "animation frame".to_string(),
                    entity: draw.entity,
                }
            );
            return 0;
        };

        let start = buffer.len();
        let meta = draw.meta;
        let place = Placement::new(draw.pose);
        buffer.begin_group();

        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut stickers = Vec::new();
        let mut texts = Vec::new();
        for cmd in locals {
            let flags = cmd.meta.flags;
            if flags.force_text_pass {
                texts.push(cmd);
            } else if flags.force_sticker_pass || flags.force_uv_passthrough {
                stickers.push(cmd);
            } else if cmd.meta.z < 0 {
                before.push(cmd);
            } else {
                after.push(cmd);
            }
        }

        if let Some(bg) = draw.bg {
            buffer.add(
                DrawCommand::DrawRectanglePro {
                    rect: place.dst,
                    origin: place.origin,
                    rotation: place.rotation,
                    color: bg,
                },
                meta,
            );
        }

        let pipeline = draw.pipeline;
        let passes: Vec<_> = pipeline.enabled_passes().collect();

        if passes.is_empty() {
            if let Some(shadow) = draw.shadow {
                add_shadow(buffer, &frame, &place, &shadow, meta);
            }
        }

        add_locals(buffer, before, &place, meta);

        if passes.is_empty() {
            add_sprite(buffer, &frame, &place, draw.fg, meta);
        }

        let last = passes.len().saturating_sub(1);
        for (i, pass) in passes.iter().enumerate() {
            let name = pass.shader_name.as_str();
            buffer.add_begin_shader(name, meta);
            self.add_stage_uniforms(
                buffer,
                registry,
                draw,
                &frame,
                &place,
                name,
                Stage::Sprite {
                    inject_atlas: pass.inject_atlas_uniforms,
                },
                pass.custom_pre_pass.clone(),
            );
            if i == last {
                if let Some(shadow) = draw.shadow {
                    let pass_aware = registry.get(name).is_some_and(|s| s.pass_aware);
                    if pass_aware {
                        buffer.add_set_uniform(name, "shadow", 1.0f32, meta);
                    }
                    add_shadow(buffer, &frame, &place, &shadow, meta);
                    if pass_aware {
                        buffer.add_set_uniform(name, "shadow", 0.0f32, meta);
                    }
                }
            }
            add_sprite(buffer, &frame, &place, draw.fg, meta);
            buffer.add_end_shader(meta);
        }

        for overlay in pipeline.enabled_overlays() {
            let name = overlay.shader_name.as_str();
            buffer.add_begin_shader(name, meta);
            self.add_stage_uniforms(
                buffer,
                registry,
                draw,
                &frame,
                &place,
                name,
                Stage::Sprite {
                    inject_atlas: overlay.inject_atlas_uniforms,
                },
                overlay.custom_pre_pass.clone(),
            );
            add_sprite(buffer, &frame, &place, Color::WHITE, meta);
            buffer.add_end_shader(meta);
        }

        match pipeline.last_enabled_shader() {
            Some(shader) => {
                for group in [stickers, texts] {
                    if group.is_empty() {
                        continue;
                    }
                    buffer.add_begin_shader(shader, meta);
                    self.add_stage_uniforms(
                        buffer,
                        registry,
                        draw,
                        &frame,
                        &place,
                        shader,
                        Stage::Identity,
                        None,
                    );
                    add_locals(buffer, group, &place, meta);
                    buffer.add_end_shader(meta);
                }
            }
            None => {
                add_locals(buffer, stickers, &place, meta);
                add_locals(buffer, texts, &place, meta);
            }
        }

        add_locals(buffer, after, &place, meta);
        buffer.end_group();

        buffer.len() - start
    }

    /// Adds the one custom command that configures `shader` for a stage.
    /// Unregistered shaders get no uniforms, only a warning.
    #[allow(clippy::too_many_arguments)]
    fn add_stage_uniforms(
        &mut self,
        buffer: &mut DrawCommandBuffer,
        registry: &ShaderRegistry,
        draw: &SpriteDraw<'_>,
        frame: &SpriteFrame,
        place: &Placement,
        shader: &str,
        stage: Stage,
        pre_pass: Option<CustomFn>,
    ) {
        if !registry.contains(shader) {
            log::warn!(
                "{}",
                CoreError::Config(format!(
                    "shader '{shader}' used by {} is not registered, drawing with the default pipeline",
                    draw.entity
                ))
            );
            return;
        }

        let mut set = UniformSet::new();
        let (region_rate, pivot) = match stage {
            Stage::Sprite { inject_atlas } => {
                if inject_atlas {
                    let pad = draw.pipeline.padding * 2.0;
                    let render = Vec2::new(frame.src.w + pad, frame.src.h + pad);
                    set.set("uImageSize", render);
                    set.set("uGridRect", Vec4::new(0.0, 0.0, render.x, render.y));
                }
                frame.atlas_rect()
            }
            Stage::Identity => (Vec2::ONE, Vec2::ZERO),
        };

        let skew = if ShaderRegistry::is_3d_skew(shader) {
            Some(SkewUniforms {
                region_rate,
                pivot,
                quad_center: Vec2::new(place.dst.x, place.dst.y),
                quad_size: Vec2::new(place.dst.w, place.dst.h),
                card_rotation: place.pose.r.to_radians(),
                uv_passthrough: if stage == Stage::Identity { 1.0 } else { 0.0 },
            })
        } else {
            if stage == Stage::Identity {
                set.set("regionRate", region_rate);
                set.set("pivot", pivot);
            }
            None
        };

        let entity_uniforms = draw.uniforms.and_then(|u| u.get(shader)).cloned();
        let shader_name = shader.to_string();
        let applied = Rc::clone(&self.skew_cache);
        let apply: CustomFn = Arc::new(move |backend: &mut dyn RenderBackend| {
            for (name, value) in set.iter() {
                backend.set_uniform(&shader_name, name, value);
            }
            if let Some(skew) = skew {
                let mut applied = applied.borrow_mut();
                if applied.get(&shader_name) != Some(&skew) {
                    let mut skew_set = UniformSet::new();
                    skew.write(&mut skew_set);
                    for (name, value) in skew_set.iter() {
                        backend.set_uniform(&shader_name, name, value);
                    }
                    applied.insert(shader_name.clone(), skew);
                }
            }
            if let Some(f) = &pre_pass {
                f(backend);
            }
            if let Some(extra) = &entity_uniforms {
                for (name, value) in extra.iter() {
                    backend.set_uniform(&shader_name, name, value);
                }
            }
        });
        buffer.add_custom(apply, draw.meta);
    }
}

fn add_sprite(
    buffer: &mut DrawCommandBuffer,
    frame: &SpriteFrame,
    place: &Placement,
    tint: Color,
    meta: CommandMeta,
) {
    buffer.add_draw_texture(
        frame.texture,
        frame.src,
        place.dst,
        place.origin,
        place.rotation,
        tint,
        meta,
    );
}

fn add_shadow(
    buffer: &mut DrawCommandBuffer,
    frame: &SpriteFrame,
    place: &Placement,
    shadow: &ShadowInfo,
    meta: CommandMeta,
) {
    let offset = shadow.offset();
    let mut dst = place.dst;
    dst.x += offset.x;
    dst.y += offset.y;
    buffer.add_draw_texture(
        frame.texture,
        frame.src,
        dst,
        place.origin,
        place.rotation,
        Color::BLACK.fade(SHADOW_ALPHA),
        meta,
    );
}

/// Emits local commands inside a matrix whose origin is the sprite's
/// top-left corner, rotated and scaled about its center. Each command keeps
/// its own space and flags; z is the entity's.
fn add_locals(
    buffer: &mut DrawCommandBuffer,
    commands: Vec<RecordedCommand>,
    place: &Placement,
    meta: CommandMeta,
) {
    if commands.is_empty() {
        return;
    }
    let pose = place.pose;
    buffer.add_push_matrix(meta);
    buffer.add(DrawCommand::Translate(pose.center()), meta);
    buffer.add(DrawCommand::Rotate(pose.r), meta);
    buffer.add(DrawCommand::Scale(Vec2::splat(pose.scale)), meta);
    buffer.add(DrawCommand::Translate(Vec2::new(-pose.w * 0.5, -pose.h * 0.5)), meta);
    for cmd in commands {
        let own = CommandMeta {
            space: cmd.meta.space,
            flags: cmd.meta.flags,
            ..meta
        };
        buffer.add(cmd.command, own);
    }
    buffer.add_pop_matrix(meta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::backend::testing::RecordingBackend;
    use crate::draw::command::{DrawSpace, LocalFlags};
    use crate::shader::pipeline::OverlayInputSource;
    use crate::shader::registry::ShaderInfo;

    fn frame() -> SpriteFrame {
        SpriteFrame {
            texture: TextureId(3),
            src: Rect::new(32.0, 0.0, 32.0, 32.0),
            atlas_size: Vec2::new(128.0, 64.0),
        }
    }

    fn sprite(pipeline: &ShaderPipeline) -> SpriteDraw<'_> {
        SpriteDraw {
            entity: Entity::from_raw(1, 0),
            frame: Some(frame()),
            pose: Pose::rect(10.0, 20.0, 32.0, 32.0),
            fg: Color::WHITE,
            bg: None,
            no_draw: false,
            shadow: None,
            pipeline,
            uniforms: None,
            meta: CommandMeta::new(0, DrawSpace::World),
        }
    }

    fn registry(names: &[&str]) -> ShaderRegistry {
        let mut registry = ShaderRegistry::new();
        for name in names {
            registry.register(ShaderInfo::new(name));
        }
        registry
    }

    fn labels(buffer: &DrawCommandBuffer) -> Vec<String> {
        buffer
            .commands()
            .iter()
            .map(|c| format!("{:?}", c.command))
            .collect()
    }

    fn record(
        recorder: &mut PipelineRecorder,
        registry: &ShaderRegistry,
        draw: &SpriteDraw<'_>,
        locals: &mut BatchedLocalCommands,
    ) -> DrawCommandBuffer {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        recorder.record(&mut buffer, registry, draw, locals);
        buffer.end_recording();
        buffer
    }

    #[test]
    fn pass_then_overlay_exact_sequence() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("X");
        pipeline.add_overlay(OverlayInputSource::BaseSprite, "Y");
        let registry = registry(&["X", "Y"]);
        let mut recorder = PipelineRecorder::new();
        let buffer = record(
            &mut recorder,
            &registry,
            &sprite(&pipeline),
            &mut BatchedLocalCommands::new(),
        );
        assert_eq!(
            labels(&buffer),
            vec![
                "BeginShader(X)",
                "Custom",
                "DrawTexturePro",
                "EndShader",
                "BeginShader(Y)",
                "Custom",
                "DrawTexturePro",
                "EndShader",
            ]
        );
        let overlay_tint = match &buffer.commands()[6].command {
            DrawCommand::DrawTexturePro { tint, .. } => *tint,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(overlay_tint, Color::WHITE);

        let mut backend = RecordingBackend::new();
        buffer.execute(&mut backend).expect("execute");
        assert!(backend
            .calls
            .contains(&"uniform X.uImageSize=Vec2(Vec2(62.0, 62.0))".to_string()));
        assert_eq!(backend.count("uniform Y.uGridRect"), 1);
    }

    #[test]
    fn plain_sprite_without_passes() {
        let pipeline = ShaderPipeline::new();
        let mut draw = sprite(&pipeline);
        draw.bg = Some(Color::BLUE);
        draw.shadow = Some(ShadowInfo {
            displacement: Vec2::new(1.0, -1.5),
            height: 0.0,
            dragged: false,
        });
        let buffer = record(
            &mut PipelineRecorder::new(),
            &ShaderRegistry::new(),
            &draw,
            &mut BatchedLocalCommands::new(),
        );
        assert_eq!(
            labels(&buffer),
            vec!["DrawRectanglePro", "DrawTexturePro", "DrawTexturePro"]
        );
        match &buffer.commands()[1].command {
            DrawCommand::DrawTexturePro { dst, tint, .. } => {
                assert_eq!(tint.a, 204);
                assert_eq!(dst.x, 26.0 - 3.0);
                assert_eq!(dst.y, 36.0 + 4.5);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &buffer.commands()[2].command {
            DrawCommand::DrawTexturePro { dst, origin, .. } => {
                assert_eq!(*dst, Rect::new(26.0, 36.0, 32.0, 32.0));
                assert_eq!(*origin, Vec2::new(16.0, 16.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_frame_or_no_draw_emits_nothing_and_drains_locals() {
        let pipeline = ShaderPipeline::new();
        let mut draw = sprite(&pipeline);
        draw.frame = None;
        let mut locals = BatchedLocalCommands::new();
        locals.add(DrawCommand::Rotate(1.0), CommandMeta::default());
        let buffer = record(&mut PipelineRecorder::new(), &ShaderRegistry::new(), &draw, &mut locals);
        assert!(buffer.is_empty());
        assert!(locals.is_empty());

        let mut draw = sprite(&pipeline);
        draw.no_draw = true;
        locals.add(DrawCommand::Rotate(1.0), CommandMeta::default());
        let buffer = record(&mut PipelineRecorder::new(), &ShaderRegistry::new(), &draw, &mut locals);
        assert!(buffer.is_empty());
        assert!(locals.is_empty());
    }

    #[test]
    fn unregistered_shader_keeps_brackets() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("ghost");
        let buffer = record(
            &mut PipelineRecorder::new(),
            &ShaderRegistry::new(),
            &sprite(&pipeline),
            &mut BatchedLocalCommands::new(),
        );
        assert_eq!(
            labels(&buffer),
            vec!["BeginShader(ghost)", "DrawTexturePro", "EndShader"]
        );
    }

    #[test]
    fn locals_route_around_the_sprite() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("X");
        let registry = registry(&["X"]);
        let mut locals = BatchedLocalCommands::new();
        let world = |z| CommandMeta::new(z, DrawSpace::World);
        locals.add(DrawCommand::Scale(Vec2::ONE), world(5));
        locals.add(DrawCommand::Rotate(9.0), world(-2));
        locals.add(
            DrawCommand::DrawText {
                text: "hp".to_string(),
                font: Default::default(),
                position: Vec2::ZERO,
                size: 12.0,
                spacing: 1.0,
                color: Color::WHITE,
            },
            world(1).with_flags(LocalFlags::TEXT),
        );
        locals.add(
            DrawCommand::Translate(Vec2::ONE),
            world(0).with_flags(LocalFlags::STICKER),
        );

        let buffer = record(&mut PipelineRecorder::new(), &registry, &sprite(&pipeline), &mut locals);
        let got = labels(&buffer);
        let matrix = ["PushMatrix", "Translate", "Rotate", "Scale", "Translate"];
        let mut want: Vec<String> = Vec::new();
        let local = |want: &mut Vec<String>, inner: &str| {
            want.extend(matrix.iter().map(|s| s.to_string()));
            want.push(inner.to_string());
            want.push("PopMatrix".to_string());
        };
        local(&mut want, "Rotate");
        want.extend(["BeginShader(X)", "Custom", "DrawTexturePro", "EndShader"].map(String::from));
        want.extend(["BeginShader(X)", "Custom"].map(String::from));
        local(&mut want, "Translate");
        want.push("EndShader".to_string());
        want.extend(["BeginShader(X)", "Custom"].map(String::from));
        local(&mut want, "DrawText(\"hp\")");
        want.push("EndShader".to_string());
        local(&mut want, "Scale");
        assert_eq!(got, want);
        assert!(locals.is_empty());
    }

    #[test]
    fn stickers_draw_plain_without_passes() {
        let pipeline = ShaderPipeline::new();
        let mut locals = BatchedLocalCommands::new();
        locals.add(
            DrawCommand::Rotate(1.0),
            CommandMeta::new(0, DrawSpace::World).with_flags(LocalFlags::STICKER),
        );
        let buffer = record(
            &mut PipelineRecorder::new(),
            &ShaderRegistry::new(),
            &sprite(&pipeline),
            &mut locals,
        );
        let got = labels(&buffer);
        assert_eq!(got[0], "DrawTexturePro");
        assert_eq!(got[1], "PushMatrix");
        assert!(!got.iter().any(|l| l.starts_with("BeginShader")));
    }

    #[test]
    fn shadow_rides_in_last_pass_with_flag() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("A");
        pipeline.add_pass("B");
        let mut registry = registry(&["A"]);
        registry.register(ShaderInfo::new("B").pass_aware());
        let mut draw = sprite(&pipeline);
        draw.shadow = Some(ShadowInfo {
            displacement: Vec2::new(0.0, -1.5),
            height: 1.0,
            dragged: true,
        });
        let buffer = record(
            &mut PipelineRecorder::new(),
            &registry,
            &draw,
            &mut BatchedLocalCommands::new(),
        );
        assert_eq!(
            labels(&buffer)[4..],
            [
                "BeginShader(B)",
                "Custom",
                "SetUniform(B.shadow = Float(1.0))",
                "DrawTexturePro",
                "SetUniform(B.shadow = Float(0.0))",
                "DrawTexturePro",
                "EndShader",
            ]
        );
        match &buffer.commands()[7].command {
            DrawCommand::DrawTexturePro { dst, .. } => assert_eq!(dst.y, 36.0 + 13.5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn skew_uniforms_are_cached_per_frame() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("3d_skew_foil");
        let registry = registry(&["3d_skew_foil"]);
        let mut recorder = PipelineRecorder::new();
        let draw = sprite(&pipeline);

        let mut backend = RecordingBackend::new();
        for _ in 0..2 {
            let buffer = record(&mut recorder, &registry, &draw, &mut BatchedLocalCommands::new());
            buffer.execute(&mut backend).expect("execute");
        }
        assert_eq!(backend.count("uniform 3d_skew_foil.regionRate"), 1);
        assert!(backend
            .calls
            .contains(&"uniform 3d_skew_foil.regionRate=Vec2(Vec2(0.25, 0.5))".to_string()));
        assert!(backend
            .calls
            .contains(&"uniform 3d_skew_foil.pivot=Vec2(Vec2(0.25, 0.0))".to_string()));

        recorder.begin_frame();
        let buffer = record(&mut recorder, &registry, &draw, &mut BatchedLocalCommands::new());
        buffer.execute(&mut backend).expect("execute");
        assert_eq!(backend.count("uniform 3d_skew_foil.regionRate"), 2);

        let mut moved = sprite(&pipeline);
        moved.pose.x += 4.0;
        let buffer = record(&mut recorder, &registry, &moved, &mut BatchedLocalCommands::new());
        buffer.execute(&mut backend).expect("execute");
        assert_eq!(backend.count("uniform 3d_skew_foil.quad_center"), 3);
    }

    #[test]
    fn optimize_keeps_after_locals_above_the_sprite() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("X");
        let registry = registry(&["X"]);
        let mut locals = BatchedLocalCommands::new();
        locals.add(DrawCommand::Rotate(77.0), CommandMeta::new(3, DrawSpace::World));
        let mut buffer = record(&mut PipelineRecorder::new(), &registry, &sprite(&pipeline), &mut locals);
        let recorded = labels(&buffer);

        buffer.optimize();
        assert_eq!(labels(&buffer), recorded);
        assert_eq!(recorded[0], "BeginShader(X)");
        assert_eq!(recorded.last().map(String::as_str), Some("PopMatrix"));
    }

    #[test]
    fn locals_keep_their_own_space() {
        let pipeline = ShaderPipeline::new();
        let mut locals = BatchedLocalCommands::new();
        locals.add(DrawCommand::Rotate(5.0), CommandMeta::new(1, DrawSpace::Screen));
        let buffer = record(
            &mut PipelineRecorder::new(),
            &ShaderRegistry::new(),
            &sprite(&pipeline),
            &mut locals,
        );
        let rotate = buffer
            .commands()
            .iter()
            .rev()
            .find(|c| matches!(c.command, DrawCommand::Rotate(_)))
            .expect("local");
        assert_eq!(rotate.meta.space, DrawSpace::Screen);
        assert_eq!(rotate.meta.z, 0);
        let pop = buffer.commands().last().expect("pop");
        assert_eq!(pop.meta.space, DrawSpace::World);
        assert!(buffer.commands().iter().all(|c| c.meta.group == 1));
    }

    #[test]
    fn skew_uniforms_follow_execution_order() {
        let mut pipeline = ShaderPipeline::new();
        pipeline.add_pass("3d_skew_foil");
        let registry = registry(&["3d_skew_foil"]);
        let mut recorder = PipelineRecorder::new();

        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        recorder.begin_frame();
        let mut first = sprite(&pipeline);
        first.meta.z = 5;
        let mut under = sprite(&pipeline);
        under.entity = Entity::from_raw(2, 0);
        under.meta.z = 0;
        let mut moved = sprite(&pipeline);
        moved.entity = Entity::from_raw(3, 0);
        moved.meta.z = 5;
        moved.pose.x += 40.0;
        for draw in [&first, &under, &moved] {
            recorder.record(&mut buffer, &registry, draw, &mut BatchedLocalCommands::new());
        }
        buffer.end_recording();
        buffer.optimize();

        let mut backend = RecordingBackend::new();
        buffer.execute(&mut backend).expect("execute");
        let first_draw = backend
            .calls
            .iter()
            .position(|c| c.starts_with("texture"))
            .expect("draw");
        assert!(backend.calls[..first_draw]
            .iter()
            .any(|c| c.starts_with("uniform 3d_skew_foil.regionRate")));
        assert!(backend.calls[..first_draw]
            .iter()
            .any(|c| c.starts_with("uniform 3d_skew_foil.quad_center")));
        // `under` and `first` share a pose; only `moved` needs new values.
        assert_eq!(backend.count("uniform 3d_skew_foil.quad_center"), 2);
    }

    #[test]
    fn entity_uniforms_and_pre_pass_run_in_custom() {
        let mut pipeline = ShaderPipeline::new();
        let pre: CustomFn = Arc::new(|backend: &mut dyn RenderBackend| backend.rotate(45.0));
        pipeline.add_pass("X").custom_pre_pass = Some(pre);
        pipeline.passes[0].inject_atlas_uniforms = false;
        let registry = registry(&["X"]);
        let mut uniforms = ShaderUniforms::new();
        uniforms.set("X", "glow", 0.5f32);
        let mut draw = sprite(&pipeline);
        draw.uniforms = Some(&uniforms);

        let buffer = record(
            &mut PipelineRecorder::new(),
            &registry,
            &draw,
            &mut BatchedLocalCommands::new(),
        );
        let mut backend = RecordingBackend::new();
        buffer.execute(&mut backend).expect("execute");
        let pre_at = backend.calls.iter().position(|c| c == "rotate 45");
        let glow_at = backend
            .calls
            .iter()
            .position(|c| c == "uniform X.glow=Float(0.5)");
        assert!(pre_at.is_some() && glow_at.is_some());
        assert!(pre_at < glow_at);
        assert_eq!(backend.count("uniform X.uImageSize"), 0);
    }
}
