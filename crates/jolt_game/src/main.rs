//! Jolt demo runtime -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All simulation
//! runs inside `RedrawRequested` using a **fixed-timestep** model (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- each fixed step syncs the Lua bridge and runs
//!      `World::frame`, which records, optimizes and executes the draw buffer
//!      into the `MeshBackend`
//!   3. Upload the mesh and both camera uniforms, issue draw calls
//!   4. Composite the egui overlay (F3)
//!
//! Edge-triggered input is cleared after every step, so a click is consumed by
//! exactly one `World::frame` even when a slow frame runs several steps.

mod demo;
mod lua_bridge;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use demo::Demo;
use glam::Vec2;
use jolt_core::globals::{self, GlobalSettings};
use jolt_core::input::{InputState, Key, MouseBtn};
use jolt_core::time::TimeState;
use jolt_core::world::{FrameStats, World};
use jolt_devtools::{DebugOverlay, OverlayStats};
use jolt_platform::PlatformConfig;
use jolt_render::{
    Camera2D, CameraUniform, GpuContext, GpuMesh, MeshBackend, SpritePipeline,
};
use lua_bridge::LuaBridge;

const LUA_SCRIPT_PATH: &str = "assets/scripts/demo.lua";

/// All mutable engine state lives here. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,

    world: World,
    demo: Demo,
    lua_bridge: LuaBridge,
    paused: bool,
    single_step_requested: bool,
    last_stats: FrameStats,

    // --- Per-frame GPU mesh state -----------------------------------------------
    mesh: MeshBackend,
    gpu_mesh: GpuMesh,
    world_camera_buffer: wgpu::Buffer,
    world_camera_bind_group: wgpu::BindGroup,
    screen_camera_buffer: wgpu::Buffer,
    screen_camera_bind_group: wgpu::BindGroup,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone()).expect("Failed to initialize GPU");
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);
        let camera = Camera2D::new(gpu.size.0, gpu.size.1);

        let mut mesh = MeshBackend::new();
        let mut gpu_mesh = GpuMesh::new(&gpu.device);
        demo::load_textures(&gpu, &sprite_pipeline, &mut gpu_mesh, &mut mesh)
            .expect("Failed to create demo textures");

        let mut world = World::default();
        let demo = Demo::build(&mut world, Vec2::new(gpu.size.0 as f32, gpu.size.1 as f32))
            .expect("Failed to build demo scene");

        let world_camera_buffer = create_camera_buffer(&gpu.device, "World Camera Buffer", camera.build_uniform());
        let world_camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &world_camera_buffer);
        let screen_camera_buffer = create_camera_buffer(
            &gpu.device,
            "Screen Camera Buffer",
            CameraUniform::screen(gpu.size),
        );
        let screen_camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &screen_camera_buffer);

        Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            world,
            demo,
            lua_bridge: LuaBridge::new(std::path::PathBuf::from(LUA_SCRIPT_PATH)),
            paused: false,
            single_step_requested: false,
            last_stats: FrameStats::default(),
            mesh,
            gpu_mesh,
            world_camera_buffer,
            world_camera_bind_group,
            screen_camera_buffer,
            screen_camera_bind_group,
        }
    }

    /// One fixed step. Returns false when the app should exit.
    fn step(&mut self) -> bool {
        if self.input.is_just_pressed(Key::Escape) {
            return false;
        }
        if self.input.is_just_pressed(Key::F3) {
            self.debug_overlay.toggle();
        }
        if self.input.is_just_pressed(Key::F4) {
            self.paused = !self.paused;
            log::info!("Simulation {}", if self.paused { "PAUSED" } else { "RESUMED" });
        }
        if self.input.is_just_pressed(Key::F5) {
            self.lua_bridge.force_reload();
        }

        let ctx = self.time.step_context(globals::frame() + 1);
        if self.input.is_just_pressed(Key::Space) {
            self.demo.juice_all(&mut self.world, ctx.now);
        }
        self.demo.apply_pending(&mut self.world, ctx.now);

        self.lua_bridge.call_update(ctx.dt);
        self.lua_bridge.sync(&mut self.world, ctx.now);

        self.mesh.begin_frame();
        match self.world.frame(&ctx, &self.input, &mut self.mesh) {
            Ok(stats) => self.last_stats = stats,
            Err(err) => log::error!("Frame {} aborted: {}", ctx.frame, err),
        }
        true
    }

    fn overlay_stats(&self) -> OverlayStats {
        let mesh_stats = self.mesh.stats();
        OverlayStats {
            recorded_commands: self.last_stats.recorded as u32,
            shader_switches_saved: self.last_stats.optimize.shader_switches_saved() as u32,
            live_entities: self.last_stats.entities as u32,
            ui_nodes: self.last_stats.ui_nodes as u32,
            draw_calls: mesh_stats.draw_calls as u32,
            texture_binds: mesh_stats.texture_binds as u32,
            memory_estimate_mb: self.gpu_mesh.estimate_memory_mb(),
            lua_status_label: self.lua_bridge.status().label().to_string(),
            paused: self.paused,
        }
    }

    fn render(&mut self) {
        self.gpu.queue.write_buffer(
            &self.world_camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );
        self.gpu.queue.write_buffer(
            &self.screen_camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::screen(self.gpu.size)]),
        );
        self.gpu_mesh.upload(&self.gpu.device, &self.gpu.queue, &self.mesh);

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.debug_overlay
                .prepare(&self.window, &self.time, Some(stats));
        if overlay_actions.toggle_pause {
            self.paused = !self.paused;
            log::info!("Simulation {}", if self.paused { "PAUSED" } else { "RESUMED" });
        }
        if overlay_actions.single_step {
            self.single_step_requested = true;
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.13,
                            g: 0.35,
                            b: 0.24,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            self.gpu_mesh.draw(
                &mut render_pass,
                &self.sprite_pipeline,
                &self.world_camera_bind_group,
                &self.screen_camera_bind_group,
                &self.mesh,
            );
        }

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = jolt_platform::create_window(event_loop, &self.config)
            .expect("Failed to create window");
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.input.cursor_position = Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } if !egui_consumed => {
                if let Some(btn) = map_mouse(button) {
                    match button_state {
                        ElementState::Pressed => state.input.mouse_down(btn),
                        ElementState::Released => state.input.mouse_up(btn),
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();
                state.lua_bridge.check_reload();

                while state.time.should_step() {
                    // Skip simulation update when paused (unless single-step requested)
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    if !state.step() {
                        event_loop.exit();
                        return;
                    }
                    state.input.end_frame();
                }
                state.time.end_frame();

                state.render();
            }

            _ => {}
        }
    }
}

fn create_camera_buffer(device: &wgpu::Device, label: &str, uniform: CameraUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Tab => Some(Key::Tab),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::F5 => Some(Key::F5),
        _ => None,
    }
}

fn map_mouse(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        MouseButton::Right => Some(MouseBtn::Right),
        MouseButton::Middle => Some(MouseBtn::Middle),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Jolt starting...");
    globals::init(GlobalSettings::default());

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");

    globals::teardown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_engine_keys() {
        assert_eq!(map_key(KeyCode::F3), Some(Key::F3));
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::KeyQ), None);
        assert_eq!(map_mouse(MouseButton::Left), Some(MouseBtn::Left));
        assert_eq!(map_mouse(MouseButton::Back), None);
    }
}
