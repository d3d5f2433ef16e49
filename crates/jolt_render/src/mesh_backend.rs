//! A [`RenderBackend`] that flattens a command stream into one vertex list,
//! one index list and a run of draw calls for the sprite pipeline.
//!
//! Consecutive draws that share texture, shader and camera space merge into
//! a single call, the same batching the scene mesh always used. Matrix
//! commands keep a `glam::Affine2` stack and every vertex is transformed on
//! the CPU.
//!
//! Only the built-in sprite shader exists on the GPU side. Other shader
//! names are kept on the draw call so that batching and statistics still
//! see pass boundaries; their uniforms are stored for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{Affine2, Vec2};
use jolt_core::color::Color;
use jolt_core::draw::{DrawSpace, FontId, RenderBackend, TextureId};
use jolt_core::math::Rect;
use jolt_core::shader::UniformValue;

use crate::vertex::SpriteVertex;

/// A contiguous index run drawn with one texture binding under one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture: TextureId,
    pub shader: Option<Arc<str>>,
    pub space: DrawSpace,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub quads: usize,
    pub triangles: usize,
    pub draw_calls: usize,
    pub texture_binds: usize,
}

pub struct MeshBackend {
    vertices: Vec<SpriteVertex>,
    indices: Vec<u32>,
    draw_calls: Vec<DrawCall>,
    stack: Vec<Affine2>,
    current: Affine2,
    space: DrawSpace,
    shader: Option<Arc<str>>,
    texture_sizes: HashMap<TextureId, Vec2>,
    uniforms: HashMap<String, HashMap<String, UniformValue>>,
    warned: HashSet<&'static str>,
    ready: bool,
    quads: usize,
    triangles: usize,
}

impl Default for MeshBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBackend {
    pub fn new() -> Self {
        let mut texture_sizes = HashMap::new();
        texture_sizes.insert(TextureId::WHITE, Vec2::ONE);
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            draw_calls: Vec::new(),
            stack: Vec::new(),
            current: Affine2::IDENTITY,
            space: DrawSpace::Screen,
            shader: None,
            texture_sizes,
            uniforms: HashMap::new(),
            warned: HashSet::new(),
            ready: false,
            quads: 0,
            triangles: 0,
        }
    }

    /// Texel size used to turn source rects into UVs.
    pub fn register_texture(&mut self, texture: TextureId, width: u32, height: u32) {
        self.texture_sizes
            .insert(texture, Vec2::new(width.max(1) as f32, height.max(1) as f32));
    }

    /// Clears last frame's mesh. The backend reports ready from here on.
    pub fn begin_frame(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
        self.stack.clear();
        self.current = Affine2::IDENTITY;
        self.space = DrawSpace::Screen;
        self.shader = None;
        self.quads = 0;
        self.triangles = 0;
        self.ready = true;
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    pub fn uniform(&self, shader: &str, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(shader)?.get(name)
    }

    pub fn stats(&self) -> MeshStats {
        let texture_binds = self
            .draw_calls
            .iter()
            .enumerate()
            .filter(|(i, call)| *i == 0 || self.draw_calls[i - 1].texture != call.texture)
            .count();
        MeshStats {
            quads: self.quads,
            triangles: self.triangles,
            draw_calls: self.draw_calls.len(),
            texture_binds,
        }
    }

    fn warn_once(&mut self, key: &'static str, message: &str) {
        if self.warned.insert(key) {
            log::warn!("{message}");
        }
    }

    fn texture_size(&mut self, texture: TextureId) -> Vec2 {
        match self.texture_sizes.get(&texture) {
            Some(size) => *size,
            None => {
                self.warn_once(
                    "unregistered texture",
                    &format!("texture {} has no registered size, sampling it whole", texture.0),
                );
                Vec2::ONE
            }
        }
    }

    fn push_vertices(&mut self, texture: TextureId, vertices: &[SpriteVertex], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        let start = self.indices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| base + i));
        self.push_draw_call(texture, start, indices.len() as u32);
    }

    /// Extends the previous call when texture, shader and space match and the
    /// indices are contiguous.
    fn push_draw_call(&mut self, texture: TextureId, index_start: u32, index_count: u32) {
        if let Some(last) = self.draw_calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if contiguous && last.texture == texture && last.shader == self.shader && last.space == self.space {
                last.index_count += index_count;
                return;
            }
        }
        self.draw_calls.push(DrawCall {
            texture,
            shader: self.shader.clone(),
            space: self.space,
            index_start,
            index_count,
        });
    }
}

impl RenderBackend for MeshBackend {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn begin_world_camera(&mut self) {
        self.space = DrawSpace::World;
    }

    fn end_world_camera(&mut self) {
        self.space = DrawSpace::Screen;
    }

    fn push_matrix(&mut self) {
        self.stack.push(self.current);
    }

    fn pop_matrix(&mut self) {
        match self.stack.pop() {
            Some(m) => self.current = m,
            None => {
                self.warn_once("matrix underflow", "pop_matrix with an empty stack");
                self.current = Affine2::IDENTITY;
            }
        }
    }

    fn translate(&mut self, delta: Vec2) {
        self.current = self.current * Affine2::from_translation(delta);
    }

    fn scale(&mut self, factor: Vec2) {
        self.current = self.current * Affine2::from_scale(factor);
    }

    fn rotate(&mut self, degrees: f32) {
        self.current = self.current * Affine2::from_angle(degrees.to_radians());
    }

    fn begin_shader(&mut self, name: &str) {
        self.shader = Some(Arc::from(name));
    }

    fn end_shader(&mut self) {
        self.shader = None;
    }

    fn set_uniform(&mut self, shader: &str, name: &str, value: &UniformValue) {
        self.uniforms
            .entry(shader.to_string())
            .or_default()
            .insert(name.to_string(), *value);
    }

    fn draw_texture_pro(
        &mut self,
        texture: TextureId,
        src: Rect,
        dst: Rect,
        origin: Vec2,
        rotation: f32,
        tint: Color,
    ) {
        if dst.w == 0.0 || dst.h == 0.0 {
            return;
        }
        let size = self.texture_size(texture);
        let local = Affine2::from_translation(Vec2::new(dst.x, dst.y))
            * Affine2::from_angle(rotation.to_radians())
            * Affine2::from_translation(-origin);
        let to_screen = self.current * local;
        let color = tint.to_array();

        let corners = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::ONE, Vec2::new(0.0, 1.0)];
        let quad = corners.map(|c| {
            let position = to_screen.transform_point2(c * Vec2::new(dst.w, dst.h));
            let uv = (Vec2::new(src.x, src.y) + c * Vec2::new(src.w, src.h)) / size;
            SpriteVertex::new(position, uv, color)
        });
        self.push_vertices(texture, &quad, &[0, 1, 2, 0, 2, 3]);
        self.quads += 1;
    }

    fn draw_triangles(&mut self, vertices: &[Vec2], color: Color) {
        if vertices.len() % 3 != 0 {
            self.warn_once(
                "ragged triangles",
                &format!("triangle list of {} points, dropping the remainder", vertices.len()),
            );
        }
        let whole = vertices.len() / 3 * 3;
        if whole == 0 {
            return;
        }
        let color = color.to_array();
        let mesh: Vec<SpriteVertex> = vertices[..whole]
            .iter()
            .map(|v| SpriteVertex::new(self.current.transform_point2(*v), Vec2::splat(0.5), color))
            .collect();
        let indices: Vec<u32> = (0..whole as u32).collect();
        self.push_vertices(TextureId::WHITE, &mesh, &indices);
        self.triangles += whole / 3;
    }

    fn draw_text(&mut self, text: &str, _font: FontId, _position: Vec2, _size: f32, _spacing: f32, _color: Color) {
        if !text.trim().is_empty() {
            self.warn_once("no glyphs", "backend has no glyph source, text is not drawn");
        }
    }

    fn begin_render_target(&mut self, target: TextureId) {
        self.warn_once(
            "render targets",
            &format!("render target {} is not supported, drawing to the surface", target.0),
        );
    }

    fn end_render_target(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_core::draw::{CommandMeta, DrawCommand, DrawCommandBuffer};

    fn positions(backend: &MeshBackend) -> Vec<Vec2> {
        backend
            .vertices()
            .iter()
            .map(|v| Vec2::from_array(v.position))
            .collect()
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    fn rect(backend: &mut MeshBackend, texture: TextureId) {
        backend.draw_texture_pro(
            texture,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
    }

    #[test]
    fn quad_follows_matrix_and_origin() {
        let mut backend = MeshBackend::new();
        backend.begin_frame();
        backend.translate(Vec2::new(100.0, 50.0));
        backend.draw_texture_pro(
            TextureId::WHITE,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(10.0, 10.0, 20.0, 10.0),
            Vec2::new(10.0, 5.0),
            0.0,
            Color::WHITE,
        );
        let p = positions(&backend);
        assert!(close(p[0], Vec2::new(100.0, 55.0)));
        assert!(close(p[2], Vec2::new(120.0, 65.0)));
        assert_eq!(backend.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn rotation_pivots_on_destination() {
        let mut backend = MeshBackend::new();
        backend.begin_frame();
        backend.draw_texture_pro(
            TextureId::WHITE,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(0.0, 0.0, 10.0, 2.0),
            Vec2::ZERO,
            90.0,
            Color::WHITE,
        );
        let p = positions(&backend);
        assert!(close(p[1], Vec2::new(0.0, 10.0)));
    }

    #[test]
    fn uvs_come_from_registered_size() {
        let mut backend = MeshBackend::new();
        backend.register_texture(TextureId(3), 128, 64);
        backend.begin_frame();
        backend.draw_texture_pro(
            TextureId(3),
            Rect::new(32.0, 16.0, 32.0, 16.0),
            Rect::new(0.0, 0.0, 32.0, 16.0),
            Vec2::ZERO,
            0.0,
            Color::WHITE,
        );
        let uv0 = Vec2::from_array(backend.vertices()[0].tex_coords);
        let uv2 = Vec2::from_array(backend.vertices()[2].tex_coords);
        assert!(close(uv0, Vec2::new(0.25, 0.25)));
        assert!(close(uv2, Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn batching_splits_on_texture_shader_and_space() {
        let mut backend = MeshBackend::new();
        backend.register_texture(TextureId(1), 8, 8);
        backend.begin_frame();
        rect(&mut backend, TextureId::WHITE);
        backend.draw_triangles(&[Vec2::ZERO, Vec2::X, Vec2::Y], Color::RED);
        assert_eq!(backend.draw_calls().len(), 1);

        rect(&mut backend, TextureId(1));
        backend.begin_shader("holo");
        rect(&mut backend, TextureId(1));
        backend.end_shader();
        backend.begin_world_camera();
        rect(&mut backend, TextureId(1));
        backend.end_world_camera();

        let calls = backend.draw_calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].index_count, 9);
        assert_eq!(calls[2].shader.as_deref(), Some("holo"));
        assert_eq!(calls[3].space, DrawSpace::World);
        let stats = backend.stats();
        assert_eq!(stats.quads, 4);
        assert_eq!(stats.triangles, 1);
        assert_eq!(stats.texture_binds, 2);
    }

    #[test]
    fn text_and_underflow_do_not_draw() {
        let mut backend = MeshBackend::new();
        backend.begin_frame();
        backend.pop_matrix();
        backend.draw_text("hi", FontId::default(), Vec2::ZERO, 16.0, 1.0, Color::WHITE);
        backend.draw_triangles(&[Vec2::ZERO, Vec2::X], Color::WHITE);
        assert!(backend.vertices().is_empty());
        assert!(backend.draw_calls().is_empty());
    }

    #[test]
    fn executes_a_recorded_buffer() {
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        let meta = CommandMeta::default();
        buffer.add_push_matrix(meta);
        buffer.add(DrawCommand::Translate(Vec2::new(5.0, 5.0)), meta);
        buffer.add(
            DrawCommand::DrawRectanglePro {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                origin: Vec2::ZERO,
                rotation: 0.0,
                color: Color::BLUE,
            },
            meta,
        );
        buffer.add_pop_matrix(meta);
        buffer.add_set_uniform("holo", "time", 1.5f32, meta);

        let mut backend = MeshBackend::new();
        let err = buffer.execute(&mut backend).expect_err("not ready before a frame");
        assert!(err.to_string().contains("uninitialized backend"));

        backend.begin_frame();
        buffer.execute(&mut backend).expect("execute");
        assert!(close(positions(&backend)[0], Vec2::new(5.0, 5.0)));
        assert_eq!(backend.draw_calls()[0].space, DrawSpace::World);
        assert_eq!(backend.uniform("holo", "time"), Some(&UniformValue::Float(1.5)));
    }
}
