use std::collections::HashMap;

use jolt_core::draw::{DrawSpace, TextureId};

use crate::mesh_backend::MeshBackend;
use crate::sprite_pipeline::SpritePipeline;
use crate::texture::Texture;
use crate::vertex::SpriteVertex;

pub struct GpuTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

/// GPU side of [`MeshBackend`]: streamed vertex and index buffers plus the
/// texture bind groups draw calls refer to.
///
/// Buffers grow to the next power of two and never shrink.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,
    textures: HashMap<TextureId, GpuTexture>,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            vertex_buffer: create_vertex_buffer(device, 1),
            index_buffer: create_index_buffer(device, 1),
            vertex_capacity: 0,
            index_capacity: 0,
            textures: HashMap::new(),
        }
    }

    /// Binds `texture` under `id` and tells `backend` its size for UVs.
    pub fn insert_texture(
        &mut self,
        device: &wgpu::Device,
        pipeline: &SpritePipeline,
        backend: &mut MeshBackend,
        id: TextureId,
        texture: Texture,
    ) {
        backend.register_texture(id, texture.size.0, texture.size.1);
        let bind_group = pipeline.create_texture_bind_group(device, &texture);
        self.textures.insert(id, GpuTexture { texture, bind_group });
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn estimate_memory_mb(&self) -> f32 {
        let mut bytes: usize = 0;
        for tex in self.textures.values() {
            let (w, h) = tex.texture.size;
            bytes += (w as usize) * (h as usize) * 4;
        }
        bytes += self.vertex_capacity * std::mem::size_of::<SpriteVertex>();
        bytes += self.index_capacity * std::mem::size_of::<u32>();
        bytes as f32 / (1024.0 * 1024.0)
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, backend: &MeshBackend) {
        let vertices = backend.vertices();
        let indices = backend.indices();
        self.ensure_capacity(device, vertices.len(), indices.len());
        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }
        if !indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
        }
    }

    /// Issues every draw call of `backend`, switching camera bind groups on
    /// space changes and texture bind groups on texture changes.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipeline: &SpritePipeline,
        world_camera: &wgpu::BindGroup,
        screen_camera: &wgpu::BindGroup,
        backend: &MeshBackend,
    ) {
        if backend.draw_calls().is_empty() {
            return;
        }
        pass.set_pipeline(&pipeline.render_pipeline);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        let mut bound_space = None;
        let mut bound_texture = None;
        for call in backend.draw_calls() {
            let Some(texture) = self.textures.get(&call.texture) else {
                log::trace!("Skipping draw call with unbound texture {}", call.texture.0);
                continue;
            };
            if bound_space != Some(call.space) {
                let camera = match call.space {
                    DrawSpace::World => world_camera,
                    DrawSpace::Screen => screen_camera,
                };
                pass.set_bind_group(0, camera, &[]);
                bound_space = Some(call.space);
            }
            if bound_texture != Some(call.texture) {
                pass.set_bind_group(1, &texture.bind_group, &[]);
                bound_texture = Some(call.texture);
            }
            pass.draw_indexed(call.index_start..call.index_start + call.index_count, 0, 0..1);
        }
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.vertex_capacity {
            self.vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.index_capacity {
            self.index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(device, self.index_capacity);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Mesh Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Mesh Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
