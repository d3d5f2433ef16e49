//! Default drawing of UI nodes.
//!
//! Every node draws inside its own matrix: translate to the visual center,
//! rotate, scale, then translate back to the top-left so geometry is built
//! in node-local pixels.

use glam::Vec2;

use crate::color::Color;
use crate::draw::buffer::DrawCommandBuffer;
use crate::draw::command::{CommandMeta, DrawCommand};
use crate::error::CoreError;
use crate::math::{Pose, Rect};
use crate::ui::button::delay_progress;
use crate::ui::config::{StylingType, UiType};
use crate::ui::layout::text_content;
use crate::ui::node::{UiNode, UiState};

pub const SHADOW_OFFSET: Vec2 = Vec2::new(0.0, 4.0);
pub const DEFAULT_SHADOW_COLOR: Color = Color::rgba(0, 0, 0, 100);
pub const TEXT_SHADOW_OFFSET: Vec2 = Vec2::new(1.0, 1.5);
const EMBOSS_DARKEN: f32 = 0.35;
const DISABLED_GRAY: f32 = 0.5;
const DELAY_FILL: Color = Color::rgba(255, 255, 255, 80);

/// Records `node` at `pose`. A custom draw hook replaces the default.
pub fn record_node(
    node: &mut UiNode,
    pose: &Pose,
    buffer: &mut DrawCommandBuffer,
    meta: CommandMeta,
    now: f64,
) {
    if let Some(draw) = node.hooks.draw.clone() {
        draw(node, pose, buffer, meta);
        return;
    }
    if pose.w <= 0.0 || pose.h <= 0.0 {
        return;
    }

    buffer.add_push_matrix(meta);
    buffer.add(DrawCommand::Translate(pose.center()), meta);
    buffer.add(DrawCommand::Rotate(pose.r), meta);
    buffer.add(DrawCommand::Scale(Vec2::splat(pose.scale)), meta);
    buffer.add(DrawCommand::Translate(-pose.size() * 0.5), meta);
    match node.config.ui_type {
        UiType::Text => record_text(node, buffer, meta),
        _ => record_panel(node, pose.w, pose.h, buffer, meta, now),
    }
    buffer.add_pop_matrix(meta);
}

fn fill_color(node: &UiNode) -> Option<Color> {
    let color = node.config.color?;
    Some(if node.config.disabled {
        color.lerp(Color::GRAY, DISABLED_GRAY)
    } else {
        color
    })
}

fn record_panel(
    node: &mut UiNode,
    w: f32,
    h: f32,
    buffer: &mut DrawCommandBuffer,
    meta: CommandMeta,
    now: f64,
) {
    let thickness = node.config.outline_thickness;
    if let Some(color) = fill_color(node) {
        if node.config.shadow {
            let shadow = node.config.shadow_color.unwrap_or(DEFAULT_SHADOW_COLOR);
            offset_fill(node, w, h, SHADOW_OFFSET, shadow, buffer, meta);
        }
        if node.config.emboss > 0.0 {
            let emboss = color.lerp(Color::BLACK, EMBOSS_DARKEN);
            offset_fill(node, w, h, Vec2::new(0.0, node.config.emboss), emboss, buffer, meta);
        }
        fill(node, w, h, color, buffer, meta);
    }

    if node.config.progress_bar {
        let empty = node.config.progress_empty_color.unwrap_or(Color::DARKGRAY);
        let full = node.config.progress_full_color.unwrap_or(Color::GREEN);
        let base = UiState::geometry_for(&mut node.state.geometry, w, h, thickness, 1.0);
        buffer.add(DrawCommand::RenderRectFilled { geometry: base, color: empty }, meta);
        let progress = node.config.progress.clamp(0.0, 1.0);
        let bar = UiState::geometry_for(&mut node.state.progress_geometry, w, h, thickness, progress);
        buffer.add(DrawCommand::RenderRectFilled { geometry: bar, color: full }, meta);
    } else if let Some(progress) = delay_progress(node, now) {
        let bar = UiState::geometry_for(&mut node.state.progress_geometry, w, h, thickness, progress);
        buffer.add(DrawCommand::RenderRectFilled { geometry: bar, color: DELAY_FILL }, meta);
    }

    if thickness > 0.0 {
        let color = node.config.outline_color.unwrap_or(Color::WHITE);
        let geometry = UiState::geometry_for(&mut node.state.geometry, w, h, thickness, 1.0);
        buffer.add(DrawCommand::RenderRectOutline { geometry, color }, meta);
    }
}

fn offset_fill(
    node: &mut UiNode,
    w: f32,
    h: f32,
    offset: Vec2,
    color: Color,
    buffer: &mut DrawCommandBuffer,
    meta: CommandMeta,
) {
    buffer.add_push_matrix(meta);
    buffer.add(DrawCommand::Translate(offset), meta);
    fill(node, w, h, color, buffer, meta);
    buffer.add_pop_matrix(meta);
}

fn fill(node: &mut UiNode, w: f32, h: f32, color: Color, buffer: &mut DrawCommandBuffer, meta: CommandMeta) {
    if node.config.styling == StylingType::NinepatchBorders {
        match (node.config.npatch_texture, node.config.npatch) {
            (Some(texture), Some(info)) => {
                buffer.add(
                    DrawCommand::RenderNPatch {
                        texture,
                        info,
                        dst: Rect::new(0.0, 0.0, w, h),
                        origin: Vec2::ZERO,
                        rotation: 0.0,
                        color,
                    },
                    meta,
                );
                return;
            }
            _ => log::warn!(
                "{}",
                CoreError::AssetMissing {
                    what: "n-patch texture".into(),
                    entity: node.entity,
                }
            ),
        }
    }
    let thickness = node.config.outline_thickness;
    let geometry = UiState::geometry_for(&mut node.state.geometry, w, h, thickness, 1.0);
    buffer.add(DrawCommand::RenderRectFilled { geometry, color }, meta);
}

fn record_text(node: &UiNode, buffer: &mut DrawCommandBuffer, meta: CommandMeta) {
    let text = text_content(&node.config);
    if text.is_empty() {
        return;
    }
    let size = node.config.font_size * node.config.scale * node.state.render_scale;
    let color = if node.config.disabled {
        node.config.text_color.lerp(Color::GRAY, DISABLED_GRAY)
    } else {
        node.config.text_color
    };
    if node.config.shadow {
        buffer.add(
            DrawCommand::DrawText {
                text: text.clone(),
                font: Default::default(),
                position: TEXT_SHADOW_OFFSET * node.state.render_scale,
                size,
                spacing: node.config.text_spacing,
                color: node.config.shadow_color.unwrap_or(DEFAULT_SHADOW_COLOR),
            },
            meta,
        );
    }
    buffer.add(
        DrawCommand::DrawText {
            text,
            font: Default::default(),
            position: Vec2::ZERO,
            size,
            spacing: node.config.text_spacing,
            color,
        },
        meta,
    );
}
