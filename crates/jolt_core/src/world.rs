//! The frame driver.
//!
//! `World` owns every per-entity store and runs one frame in a fixed order:
//! frame counter, transforms, UI, animations, texts, then recording,
//! optimizing and executing the command buffer.

use std::collections::HashMap;

use glam::Vec2;

use crate::animation::{AnimationClip, AnimationQueue};
use crate::color::Color;
use crate::draw::backend::RenderBackend;
use crate::draw::buffer::{DrawCommandBuffer, ExecuteStats, OptimizeStats};
use crate::draw::command::{CommandMeta, DrawSpace};
use crate::draw::local::BatchedLocalCommands;
use crate::entity::{Entity, EntityAllocator};
use crate::error::CoreResult;
use crate::event::EventBus;
use crate::globals;
use crate::input::InputState;
use crate::math::Pose;
use crate::shader::pipeline::ShaderPipeline;
use crate::shader::recorder::{PipelineRecorder, ShadowInfo, SpriteDraw, SpriteFrame};
use crate::shader::uniforms::ShaderUniforms;
use crate::text::layout::{MonospaceMetrics, TextMeasure};
use crate::text::object::{Text, TextStyle};
use crate::time::FrameContext;
use crate::transform::system::TransformSystem;
use crate::ui::definition::UiTemplate;
use crate::ui::tree::UiRegistry;

/// How a sprite entity is tinted and layered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteStyle {
    pub fg: Color,
    pub bg: Option<Color>,
    pub z: i32,
    pub space: DrawSpace,
}

impl Default for SpriteStyle {
    fn default() -> Self {
        Self {
            fg: Color::WHITE,
            bg: None,
            z: 0,
            space: DrawSpace::World,
        }
    }
}

/// A text object placed at its entity's transform.
pub struct TextEntity {
    pub text: Text,
    pub z: i32,
    pub space: DrawSpace,
}

/// What the last frame did, for overlays and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub recorded: usize,
    pub optimize: OptimizeStats,
    pub execute: ExecuteStats,
    pub entities: usize,
    pub ui_nodes: usize,
    pub ui_layouts: usize,
}

pub struct World {
    pub entities: EntityAllocator,
    pub transforms: TransformSystem,
    pub ui: UiRegistry,
    pub events: EventBus,
    pub pipelines: HashMap<Entity, ShaderPipeline>,
    pub uniforms: HashMap<Entity, ShaderUniforms>,
    pub animations: HashMap<Entity, AnimationQueue>,
    pub sprites: HashMap<Entity, SpriteStyle>,
    pub texts: HashMap<Entity, TextEntity>,
    /// Atlas regions by sprite id.
    pub sprite_frames: HashMap<String, SpriteFrame>,
    pub buffer: DrawCommandBuffer,
    locals: HashMap<Entity, BatchedLocalCommands>,
    recorder: PipelineRecorder,
    measure: Box<dyn TextMeasure>,
    last_stats: FrameStats,
    /// Clock of the last frame; texts spawned between frames start here.
    now: f64,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Box::new(MonospaceMetrics::default()))
    }
}

impl World {
    pub fn new(measure: Box<dyn TextMeasure>) -> Self {
        Self {
            entities: EntityAllocator::new(),
            transforms: TransformSystem::new(),
            ui: UiRegistry::new(),
            events: EventBus::new(),
            pipelines: HashMap::new(),
            uniforms: HashMap::new(),
            animations: HashMap::new(),
            sprites: HashMap::new(),
            texts: HashMap::new(),
            sprite_frames: HashMap::new(),
            buffer: DrawCommandBuffer::new(),
            locals: HashMap::new(),
            recorder: PipelineRecorder::new(),
            measure,
            last_stats: FrameStats::default(),
            now: 0.0,
        }
    }

    pub fn measure(&self) -> &dyn TextMeasure {
        self.measure.as_ref()
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// A drawable entity showing `clip` by default.
    pub fn spawn_sprite(&mut self, pose: Pose, clip: AnimationClip, style: SpriteStyle) -> Entity {
        let entity = self.entities.spawn();
        self.transforms.create(entity, pose);
        self.animations.insert(entity, AnimationQueue::new(clip));
        self.sprites.insert(entity, style);
        entity
    }

    pub fn spawn_text(&mut self, raw: &str, style: TextStyle, position: Vec2, z: i32, space: DrawSpace) -> Entity {
        let entity = self.entities.spawn();
        let text = Text::new(raw, style, self.measure.as_ref(), self.now);
        let size = text.size();
        self.transforms
            .create(entity, Pose::rect(position.x, position.y, size.x, size.y));
        self.texts.insert(entity, TextEntity { text, z, space });
        entity
    }

    pub fn create_ui(&mut self, template: &UiTemplate, position: Vec2) -> CoreResult<Entity> {
        self.ui
            .create_box(template, position, &mut self.entities, &mut self.transforms)
    }

    /// Pipeline of `entity`, created empty on first use.
    pub fn pipeline_mut(&mut self, entity: Entity) -> &mut ShaderPipeline {
        self.pipelines.entry(entity).or_default()
    }

    /// Local commands of `entity` for the current frame.
    pub fn locals_mut(&mut self, entity: Entity) -> &mut BatchedLocalCommands {
        self.locals.entry(entity).or_default()
    }

    pub fn pending_locals(&self) -> usize {
        self.locals.values().map(BatchedLocalCommands::len).sum()
    }

    /// Removes `entity`, its followers and everything they own.
    pub fn despawn(&mut self, entity: Entity) -> usize {
        if self.ui.node(entity).is_some() {
            return self
                .ui
                .remove_node(entity, &mut self.entities, &mut self.transforms)
                .len();
        }
        let mut removed = self.transforms.remove(entity);
        if removed.is_empty() && self.entities.is_alive(entity) {
            removed.push(entity);
        }
        for e in &removed {
            self.pipelines.remove(e);
            self.uniforms.remove(e);
            self.animations.remove(e);
            self.sprites.remove(e);
            self.texts.remove(e);
            self.locals.remove(e);
            self.entities.despawn(*e);
        }
        removed.len()
    }

    /// Runs one frame and executes it against `backend`. The buffer is
    /// empty afterwards even when execution fails.
    ///
    /// `ctx.frame` is replaced by the process-wide counter, which is what
    /// the move-once bookkeeping keys on.
    pub fn frame(
        &mut self,
        ctx: &FrameContext,
        input: &InputState,
        backend: &mut dyn RenderBackend,
    ) -> CoreResult<FrameStats> {
        let frame = globals::advance_frame();
        let ctx = &FrameContext { frame, ..*ctx };
        self.now = ctx.now;
        self.transforms.update(ctx)?;

        let ui_scale = globals::ui_scale();
        let ui_layouts = self
            .ui
            .layout_dirty(&mut self.transforms, self.measure.as_ref(), ui_scale);
        self.ui.update(
            ctx,
            input,
            &mut self.transforms,
            self.measure.as_ref(),
            ui_scale,
        );

        for animation in self.animations.values_mut() {
            animation.advance(ctx.dt);
        }
        for entry in self.texts.values_mut() {
            entry.text.update(ctx);
        }

        self.buffer.clear();
        self.buffer.begin_recording();
        self.recorder.begin_frame();
        let mut recorded = self.record_sprites(ctx.now);
        recorded += self.record_texts(ctx.now);
        recorded += self
            .ui
            .record_all(&self.transforms, &mut self.buffer, ctx.now);
        recorded += self.flush_orphan_locals();
        self.buffer.end_recording();

        let optimize = self.buffer.optimize();
        let executed = self.buffer.execute(backend);
        self.buffer.clear();
        let execute = executed?;

        self.last_stats = FrameStats {
            frame,
            recorded,
            optimize,
            execute,
            entities: self.entities.len(),
            ui_nodes: self.ui.node_count(),
            ui_layouts,
        };
        log::trace!(
            "Frame {frame}: {} commands, {} shader switches saved",
            execute.commands,
            optimize.shader_switches_saved()
        );
        Ok(self.last_stats)
    }

    fn record_sprites(&mut self, now: f64) -> usize {
        let mut order: Vec<Entity> = self.sprites.keys().copied().collect();
        order.sort();
        let empty = ShaderPipeline::new();
        let mut recorded = 0;
        for entity in order {
            let (Some(style), Some(transform)) = (self.sprites.get(&entity), self.transforms.get(entity))
            else {
                continue;
            };
            let animation = self.animations.get(&entity);
            let frame = animation
                .and_then(AnimationQueue::current_frame)
                .and_then(|id| self.sprite_frames.get(id).copied());
            let shadow = transform.has_shadow.then(|| ShadowInfo {
                displacement: transform.shadow_displacement,
                height: transform.shadow_height,
                dragged: transform.dragged,
            });
            let draw = SpriteDraw {
                entity,
                frame,
                pose: transform.visual_with_hover_and_dynamic_motion(now),
                fg: style.fg,
                bg: style.bg,
                no_draw: animation.is_some_and(|a| a.no_draw),
                shadow,
                pipeline: self.pipelines.get(&entity).unwrap_or(&empty),
                uniforms: self.uniforms.get(&entity),
                meta: CommandMeta::new(style.z, style.space),
            };
            let locals = self.locals.entry(entity).or_default();
            let buffer = &mut self.buffer;
            let recorder = &mut self.recorder;
            recorded += globals::with_shaders(|registry| recorder.record(buffer, registry, &draw, locals));
        }
        recorded
    }

    fn record_texts(&mut self, now: f64) -> usize {
        let mut order: Vec<Entity> = self.texts.keys().copied().collect();
        order.sort();
        let mut recorded = 0;
        for entity in order {
            let (Some(entry), Some(transform)) = (self.texts.get(&entity), self.transforms.get(entity))
            else {
                continue;
            };
            let origin = transform.visual_with_hover_and_dynamic_motion(now).position();
            self.buffer.begin_group();
            recorded += entry.text.render(
                &mut self.buffer,
                origin,
                CommandMeta::new(entry.z, entry.space),
            );
            self.buffer.end_group();
        }
        recorded
    }

    /// Locals of entities without a sprite are emitted on their own.
    fn flush_orphan_locals(&mut self) -> usize {
        let mut order: Vec<Entity> = self.locals.keys().copied().collect();
        order.sort();
        let mut flushed = 0;
        for entity in order {
            let Some(locals) = self.locals.get_mut(&entity) else {
                continue;
            };
            let commands = locals.take_sorted();
            flushed += commands.len();
            self.buffer.extend(commands);
        }
        self.locals.retain(|e, _| self.sprites.contains_key(e));
        flushed
    }
}
