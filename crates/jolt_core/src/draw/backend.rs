//! The surface a command buffer executes against.

use glam::Vec2;

use crate::color::Color;
use crate::draw::command::{FontId, NPatchInfo, TextureId};
use crate::math::Rect;
use crate::shader::uniforms::UniformValue;

pub trait RenderBackend {
    /// Executing against a backend that reports false is a fatal error.
    fn is_ready(&self) -> bool {
        true
    }

    fn begin_world_camera(&mut self);
    fn end_world_camera(&mut self);

    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn translate(&mut self, delta: Vec2);
    fn scale(&mut self, factor: Vec2);
    /// Degrees.
    fn rotate(&mut self, degrees: f32);

    fn begin_shader(&mut self, name: &str);
    fn end_shader(&mut self);
    fn set_uniform(&mut self, shader: &str, name: &str, value: &UniformValue);

    fn draw_texture_pro(
        &mut self,
        texture: TextureId,
        src: Rect,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    );

    fn draw_rectangle_pro(&mut self, rect: Rect, origin: Vec2, rotation: f32, color: Color) {
        self.draw_texture_pro(
            TextureId::WHITE,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            rect,
            origin,
            rotation,
            color,
        );
    }

    /// Triangle list in the current matrix space.
    fn draw_triangles(&mut self, vertices: &[Vec2], color: Color);

    fn draw_text(
        &mut self,
        text: &str,
        font: FontId,
        position: Vec2,
        size: f32,
        spacing: f32,
        color: Color,
    );

    fn begin_render_target(&mut self, target: TextureId);
    fn end_render_target(&mut self);

    /// Nine slices, each a plain textured quad in a rotated local frame.
    fn draw_npatch(
        &mut self,
        texture: TextureId,
        info: &NPatchInfo,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        color: Color,
    ) {
        self.push_matrix();
        self.translate(Vec2::new(dst.x, dst.y));
        self.rotate(rotation);
        self.translate(-origin);
        for (src, local) in npatch_slices(info, dst.w, dst.h) {
            if src.w > 0.0 && src.h > 0.0 && local.w > 0.0 && local.h > 0.0 {
                self.draw_texture_pro(texture, src, local, Vec2::ZERO, 0.0, color);
            }
        }
        self.pop_matrix();
    }
}

/// Source and destination rects of the nine slices, destination relative to
/// the patch's top-left corner. Borders shrink proportionally when the
/// target is smaller than both borders together.
pub fn npatch_slices(info: &NPatchInfo, w: f32, h: f32) -> Vec<(Rect, Rect)> {
    let s = info.source;
    let (mut l, mut r) = (info.left, info.right);
    if l + r > w && l + r > 0.0 {
        let k = w / (l + r);
        l *= k;
        r *= k;
    }
    let (mut t, mut b) = (info.top, info.bottom);
    if t + b > h && t + b > 0.0 {
        let k = h / (t + b);
        t *= k;
        b *= k;
    }

    let src_cols = [
        (s.x, info.left),
        (s.x + info.left, s.w - info.left - info.right),
        (s.x + s.w - info.right, info.right),
    ];
    let src_rows = [
        (s.y, info.top),
        (s.y + info.top, s.h - info.top - info.bottom),
        (s.y + s.h - info.bottom, info.bottom),
    ];
    let dst_cols = [(0.0, l), (l, w - l - r), (w - r, r)];
    let dst_rows = [(0.0, t), (t, h - t - b), (h - b, b)];

    let mut out = Vec::with_capacity(9);
    for row in 0..3 {
        for col in 0..3 {
            out.push((
                Rect::new(src_cols[col].0, src_rows[row].0, src_cols[col].1, src_rows[row].1),
                Rect::new(dst_cols[col].0, dst_rows[row].0, dst_cols[col].1, dst_rows[row].1),
            ));
        }
    }
    out
}
