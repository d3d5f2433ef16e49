//! Frame-scoped command list.
//!
//! Commands are grouped into atomic units before sorting: a balanced
//! `PushMatrix..PopMatrix`, `BeginShader..EndShader` or
//! `BeginRenderTarget..EndRenderTarget` span moves as one piece, so sorting
//! never separates a draw from the state it was recorded under. Commands
//! added between `begin_group` and `end_group` form a single unit, so one
//! entity's passes, overlays and locals keep their recorded order. Units sort
//! stably by `(z, space, shader)` where the shader key is the rank at which
//! that shader name first appears in the stream. Ranking by first
//! appearance keeps pass-before-overlay order intact while still gathering
//! every use of a shader into one run.

use std::collections::HashMap;

use glam::Vec2;

use crate::color::Color;
use crate::draw::backend::RenderBackend;
use crate::draw::command::{
    CommandMeta, CommandSink, CustomFn, DrawCommand, RecordedCommand, TextureId,
};
use crate::error::{CoreError, CoreResult};
use crate::math::Rect;
use crate::shader::uniforms::UniformValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub commands_before: usize,
    pub commands_after: usize,
    pub shader_begins_before: usize,
    pub shader_begins_after: usize,
    /// Unbalanced end markers that were dropped.
    pub strays_dropped: usize,
    /// Missing end markers that were appended.
    pub closers_added: usize,
}

impl OptimizeStats {
    pub fn shader_switches_saved(&self) -> usize {
        self.shader_begins_before
            .saturating_sub(self.shader_begins_after)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteStats {
    pub commands: usize,
    pub shader_begins: usize,
    pub camera_toggles: usize,
}

#[derive(Default)]
pub struct DrawCommandBuffer {
    commands: Vec<RecordedCommand>,
    recording: bool,
    ignored: u64,
    /// Open run, 0 when none.
    group: u32,
    groups_issued: u32,
}

impl DrawCommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new window. Anything left from the previous frame is dropped.
    pub fn begin_recording(&mut self) {
        self.commands.clear();
        self.recording = true;
        self.group = 0;
        self.groups_issued = 0;
    }

    /// Opens a run: everything added until `end_group` sorts as one unit.
    /// Opening a run while one is open starts a new one.
    pub fn begin_group(&mut self) -> u32 {
        self.groups_issued += 1;
        self.group = self.groups_issued;
        self.group
    }

    pub fn end_group(&mut self) {
        self.group = 0;
    }

    pub fn end_recording(&mut self) {
        self.recording = false;
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Commands rejected because no recording window was open.
    pub fn ignored_count(&self) -> u64 {
        self.ignored
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn add(&mut self, command: DrawCommand, mut meta: CommandMeta) {
        if !self.recording {
            self.ignored += 1;
            log::warn!(
                "{}",
                CoreError::OutOfContract(format!(
                    "{} added outside a recording window, ignored",
                    command.label()
                ))
            );
            return;
        }
        if self.group != 0 {
            meta.group = self.group;
        }
        self.commands.push(RecordedCommand::new(command, meta));
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = RecordedCommand>) {
        for cmd in commands {
            self.add(cmd.command, cmd.meta);
        }
    }

    pub fn add_begin_shader(&mut self, name: &str, meta: CommandMeta) {
        self.add(DrawCommand::BeginShader(name.to_string()), meta);
    }

    pub fn add_end_shader(&mut self, meta: CommandMeta) {
        self.add(DrawCommand::EndShader, meta);
    }

    pub fn add_push_matrix(&mut self, meta: CommandMeta) {
        self.add(DrawCommand::PushMatrix, meta);
    }

    pub fn add_pop_matrix(&mut self, meta: CommandMeta) {
        self.add(DrawCommand::PopMatrix, meta);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_draw_texture(
        &mut self,
        texture: TextureId,
        src: Rect,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
        meta: CommandMeta,
    ) {
        self.add(
            DrawCommand::DrawTexturePro {
                texture,
                src,
                dst,
                origin,
                rotation,
                tint,
            },
            meta,
        );
    }

    pub fn add_set_uniform(
        &mut self,
        shader: &str,
        name: &str,
        value: impl Into<UniformValue>,
        meta: CommandMeta,
    ) {
        self.add(
            DrawCommand::SetUniform {
                shader: shader.to_string(),
                name: name.to_string(),
                value: value.into(),
            },
            meta,
        );
    }

    pub fn add_custom(&mut self, f: CustomFn, meta: CommandMeta) {
        self.add(DrawCommand::Custom(f), meta);
    }

    /// Stable reorder by `(z, space, shader)` and removal of redundant
    /// `EndShader X; BeginShader X` pairs.
    pub fn optimize(&mut self) -> OptimizeStats {
        let mut stats = OptimizeStats {
            commands_before: self.commands.len(),
            shader_begins_before: count_shader_begins(&self.commands),
            ..Default::default()
        };

        let commands = std::mem::take(&mut self.commands);
        let units = split_units(commands, &mut stats);

        let mut ranks: HashMap<String, usize> = HashMap::new();
        let mut keyed: Vec<((i32, u8, usize), Vec<RecordedCommand>)> = units
            .into_iter()
            .map(|unit| {
                let shader_rank = match unit_shader(&unit) {
                    Some(name) => {
                        let next = ranks.len() + 1;
                        *ranks.entry(name.to_string()).or_insert(next)
                    }
                    None => 0,
                };
                let meta = unit[0].meta;
                ((meta.z, meta.space as u8, shader_rank), unit)
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);

        let mut merged: Vec<RecordedCommand> = Vec::with_capacity(stats.commands_before);
        for (_, unit) in keyed {
            for cmd in unit {
                if let DrawCommand::BeginShader(name) = &cmd.command {
                    if let Some(pos) = pending_end_of(&merged, name, cmd.meta) {
                        merged.remove(pos);
                        continue;
                    }
                }
                merged.push(cmd);
            }
        }

        self.commands = merged;
        stats.commands_after = self.commands.len();
        stats.shader_begins_after = count_shader_begins(&self.commands);
        stats
    }

    /// Dispatch every command in order. Commands are not consumed.
    pub fn execute(&self, backend: &mut dyn RenderBackend) -> CoreResult<ExecuteStats> {
        if !backend.is_ready() {
            return Err(CoreError::Fatal(
                "draw command buffer executed against an uninitialized backend".to_string(),
            ));
        }
        let mut stats = ExecuteStats::default();
        let mut camera_active = false;
        for cmd in &self.commands {
            let wants_camera = cmd.meta.space == crate::draw::DrawSpace::World;
            if wants_camera != camera_active {
                if wants_camera {
                    backend.begin_world_camera();
                } else {
                    backend.end_world_camera();
                }
                camera_active = wants_camera;
                stats.camera_toggles += 1;
            }
            if matches!(cmd.command, DrawCommand::BeginShader(_)) {
                stats.shader_begins += 1;
            }
            cmd.command.apply(backend);
            stats.commands += 1;
        }
        if camera_active {
            backend.end_world_camera();
        }
        Ok(stats)
    }
}

fn count_shader_begins(commands: &[RecordedCommand]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c.command, DrawCommand::BeginShader(_)))
        .count()
}

/// Index of a trailing `EndShader` (possibly followed only by nothing) that
/// closes `name` in the same space, so the next begin can reopen it for free.
fn pending_end_of(merged: &[RecordedCommand], name: &str, meta: CommandMeta) -> Option<usize> {
    let last = merged.len().checked_sub(1)?;
    if !matches!(merged[last].command, DrawCommand::EndShader)
        || merged[last].meta.space != meta.space
    {
        return None;
    }
    // The shader the trailing end closes is the most recent begin.
    let open = merged[..last].iter().rev().find_map(|c| match &c.command {
        DrawCommand::BeginShader(n) => Some(n.as_str()),
        _ => None,
    })?;
    (open == name).then_some(last)
}

fn unit_shader(unit: &[RecordedCommand]) -> Option<&str> {
    unit.iter().find_map(|c| match &c.command {
        DrawCommand::BeginShader(name) => Some(name.as_str()),
        _ => None,
    })
}

impl CommandSink for DrawCommandBuffer {
    fn push_command(&mut self, command: DrawCommand, meta: CommandMeta) {
        self.add(command, meta);
    }
}

#[derive(Default)]
struct Depths {
    matrix: usize,
    shader: usize,
    target: usize,
}

impl Depths {
    fn is_zero(&self) -> bool {
        self.matrix == 0 && self.shader == 0 && self.target == 0
    }
}

fn split_units(commands: Vec<RecordedCommand>, stats: &mut OptimizeStats) -> Vec<Vec<RecordedCommand>> {
    let mut units = Vec::new();
    let mut current: Vec<RecordedCommand> = Vec::new();
    let mut depths = Depths::default();

    for cmd in commands {
        let counter = match cmd.command {
            DrawCommand::PushMatrix | DrawCommand::PopMatrix => Some(&mut depths.matrix),
            DrawCommand::BeginShader(_) | DrawCommand::EndShader => Some(&mut depths.shader),
            DrawCommand::BeginRenderTarget(_) | DrawCommand::EndRenderTarget => {
                Some(&mut depths.target)
            }
            _ => None,
        };
        let opens = matches!(
            cmd.command,
            DrawCommand::PushMatrix | DrawCommand::BeginShader(_) | DrawCommand::BeginRenderTarget(_)
        );
        if let Some(depth) = counter {
            if opens {
                *depth += 1;
            } else if *depth == 0 {
                stats.strays_dropped += 1;
                log::warn!("optimize: dropping unbalanced {}", cmd.command.label());
                continue;
            } else {
                *depth -= 1;
            }
        }
        current.push(cmd);
        if depths.is_zero() {
            push_unit(&mut units, std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        let meta = current[current.len() - 1].meta;
        for _ in 0..depths.shader {
            current.push(RecordedCommand::new(DrawCommand::EndShader, meta));
        }
        for _ in 0..depths.matrix {
            current.push(RecordedCommand::new(DrawCommand::PopMatrix, meta));
        }
        for _ in 0..depths.target {
            current.push(RecordedCommand::new(DrawCommand::EndRenderTarget, meta));
        }
        stats.closers_added += depths.shader + depths.matrix + depths.target;
        log::warn!(
            "optimize: closed {} dangling scope(s) at end of buffer",
            depths.shader + depths.matrix + depths.target
        );
        push_unit(&mut units, current);
    }
    units
}

/// Appends `unit`, joining it to the previous unit when both belong to the
/// same recorded run.
fn push_unit(units: &mut Vec<Vec<RecordedCommand>>, unit: Vec<RecordedCommand>) {
    let group = unit.first().map_or(0, |c| c.meta.group);
    if group != 0 {
        if let Some(last) = units.last_mut() {
            if last.first().is_some_and(|c| c.meta.group == group) {
                last.extend(unit);
                return;
            }
        }
    }
    units.push(unit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::backend::testing::RecordingBackend;
    use crate::draw::command::DrawSpace;
    use std::sync::Arc;

    fn meta(z: i32) -> CommandMeta {
        CommandMeta::new(z, DrawSpace::World)
    }

    fn rect(buffer: &mut DrawCommandBuffer, w: f32, m: CommandMeta) {
        buffer.add(
            DrawCommand::DrawRectanglePro {
                rect: Rect::new(0.0, 0.0, w, 1.0),
                origin: Vec2::ZERO,
                rotation: 0.0,
                color: Color::WHITE,
            },
            m,
        );
    }

    fn shaded(buffer: &mut DrawCommandBuffer, shader: &str, w: f32, m: CommandMeta) {
        buffer.add_begin_shader(shader, m);
        rect(buffer, w, m);
        buffer.add_end_shader(m);
    }

    fn labels(buffer: &DrawCommandBuffer) -> Vec<String> {
        buffer
            .commands()
            .iter()
            .map(|c| format!("{:?}", c.command))
            .collect()
    }

    fn widths(buffer: &DrawCommandBuffer) -> Vec<f32> {
        buffer
            .commands()
            .iter()
            .filter_map(|c| match c.command {
                DrawCommand::DrawRectanglePro { rect, .. } => Some(rect.w),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn add_outside_recording_is_ignored() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.add_push_matrix(meta(0));
        assert!(buffer.is_empty());
        assert_eq!(buffer.ignored_count(), 1);

        buffer.begin_recording();
        assert!(buffer.recording());
        buffer.add_push_matrix(meta(0));
        buffer.end_recording();
        buffer.add_pop_matrix(meta(0));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn execute_is_repeatable_and_clear_drops() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        shaded(&mut buffer, "glow", 4.0, meta(0));
        buffer.end_recording();

        let mut first = RecordingBackend::new();
        let mut second = RecordingBackend::new();
        buffer.execute(&mut first).expect("execute");
        buffer.execute(&mut second).expect("execute again");
        assert_eq!(first.calls, second.calls);
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        let mut third = RecordingBackend::new();
        buffer.execute(&mut third).expect("execute empty");
        assert!(third.calls.is_empty());
    }

    #[test]
    fn execute_on_unready_backend_is_fatal() {
        let buffer = DrawCommandBuffer::new();
        let mut backend = RecordingBackend {
            not_ready: true,
            ..Default::default()
        };
        let err = buffer.execute(&mut backend).expect_err("backend not ready");
        assert_eq!(err.severity(), crate::error::Severity::Fatal);
    }

    #[test]
    fn world_commands_run_under_camera() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        rect(&mut buffer, 1.0, meta(0));
        rect(&mut buffer, 2.0, CommandMeta::new(0, DrawSpace::Screen));
        rect(&mut buffer, 3.0, meta(0));
        buffer.end_recording();

        let mut backend = RecordingBackend::new();
        let stats = buffer.execute(&mut backend).expect("execute");
        assert_eq!(
            backend.calls,
            vec![
                "camera_on",
                "texture 0 1 1",
                "camera_off",
                "texture 0 2 1",
                "camera_on",
                "texture 0 3 1",
                "camera_off",
            ]
        );
        assert_eq!(stats.camera_toggles, 3);
    }

    #[test]
    fn optimize_sorts_by_z_stably() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        rect(&mut buffer, 1.0, meta(5));
        rect(&mut buffer, 2.0, meta(-1));
        rect(&mut buffer, 3.0, meta(5));
        rect(&mut buffer, 4.0, meta(-1));
        buffer.end_recording();

        buffer.optimize();
        assert_eq!(widths(&buffer), vec![2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn optimize_groups_shaders_and_coalesces() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        for i in 0..3 {
            shaded(&mut buffer, "foil", i as f32, meta(0));
            shaded(&mut buffer, "holo", 10.0 + i as f32, meta(0));
        }
        buffer.end_recording();

        let stats = buffer.optimize();
        assert_eq!(stats.shader_begins_before, 6);
        assert_eq!(stats.shader_begins_after, 2);
        assert_eq!(stats.shader_switches_saved(), 4);
        assert_eq!(widths(&buffer), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(labels(&buffer)[0], "BeginShader(foil)");
        assert_eq!(labels(&buffer)[4], "EndShader");
        assert_eq!(labels(&buffer)[5], "BeginShader(holo)");
    }

    #[test]
    fn optimize_keeps_a_run_in_recorded_order() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        rect(&mut buffer, 1.0, meta(2));
        let group = buffer.begin_group();
        assert_eq!(group, 1);
        shaded(&mut buffer, "foil", 2.0, meta(2));
        buffer.add_push_matrix(meta(2));
        buffer.add(DrawCommand::Rotate(77.0), meta(2));
        buffer.add_pop_matrix(meta(2));
        rect(&mut buffer, 3.0, meta(2));
        buffer.end_group();
        rect(&mut buffer, 4.0, meta(2));
        rect(&mut buffer, 5.0, meta(0));
        buffer.end_recording();

        assert!(buffer.commands()[1..7].iter().all(|c| c.meta.group == 1));
        assert_eq!(buffer.commands()[7].meta.group, 0);

        buffer.optimize();
        assert_eq!(widths(&buffer), vec![5.0, 1.0, 4.0, 2.0, 3.0]);
        assert_eq!(
            labels(&buffer)[3..],
            [
                "BeginShader(foil)",
                "DrawRectanglePro",
                "EndShader",
                "PushMatrix",
                "Rotate",
                "PopMatrix",
                "DrawRectanglePro",
            ]
        );
    }

    #[test]
    fn groups_restart_with_each_recording() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        buffer.begin_group();
        buffer.begin_group();
        buffer.end_recording();
        buffer.begin_recording();
        assert_eq!(buffer.begin_group(), 1);
    }

    #[test]
    fn optimize_keeps_matrix_spans_whole() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        buffer.add_push_matrix(meta(2));
        buffer.add(DrawCommand::Translate(Vec2::new(5.0, 0.0)), meta(2));
        // Recorded with a lower z, but it belongs to the open span.
        rect(&mut buffer, 1.0, meta(-3));
        buffer.add_pop_matrix(meta(2));
        rect(&mut buffer, 2.0, meta(0));
        buffer.end_recording();

        buffer.optimize();
        assert_eq!(
            labels(&buffer),
            vec![
                "DrawRectanglePro",
                "PushMatrix",
                "Translate",
                "DrawRectanglePro",
                "PopMatrix"
            ]
        );
        assert_eq!(widths(&buffer), vec![2.0, 1.0]);
    }

    #[test]
    fn optimize_repairs_unbalanced_streams() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        buffer.add_end_shader(meta(0));
        buffer.add_pop_matrix(meta(0));
        buffer.add_begin_shader("glow", meta(0));
        rect(&mut buffer, 1.0, meta(0));
        buffer.end_recording();

        let stats = buffer.optimize();
        assert_eq!(stats.strays_dropped, 2);
        assert_eq!(stats.closers_added, 1);
        assert_eq!(
            labels(&buffer),
            vec!["BeginShader(glow)", "DrawRectanglePro", "EndShader"]
        );
    }

    #[test]
    fn optimize_leaves_custom_commands_in_place() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        buffer.add_begin_shader("glow", meta(0));
        buffer.add_custom(
            Arc::new(|b: &mut dyn RenderBackend| b.rotate(1.0)),
            meta(0),
        );
        buffer.add_set_uniform("glow", "strength", 0.5f32, meta(0));
        buffer.add_end_shader(meta(0));
        buffer.end_recording();

        buffer.optimize();
        let mut backend = RecordingBackend::new();
        buffer.execute(&mut backend).expect("execute");
        assert_eq!(
            backend.calls,
            vec![
                "camera_on",
                "begin_shader glow",
                "rotate 1",
                "uniform glow.strength=Float(0.5)",
                "end_shader",
                "camera_off",
            ]
        );
    }
}
