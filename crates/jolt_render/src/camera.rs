use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Pixel space: origin at the top-left, y grows downward. UI and other
    /// screen-space commands draw through this.
    pub fn screen(viewport: (u32, u32)) -> Self {
        let proj = Mat4::orthographic_rh(
            0.0,
            viewport.0.max(1) as f32,
            viewport.1.max(1) as f32,
            0.0,
            -1.0,
            1.0,
        );
        Self {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}

/// World camera. `position` is the world point at the viewport center; y
/// grows downward like screen space.
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::new(viewport_width as f32 * 0.5, viewport_height as f32 * 0.5),
            zoom: 1.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    fn half_extent(&self) -> Vec2 {
        let zoom = self.zoom.max(f32::EPSILON);
        Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32) / (2.0 * zoom)
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let half = self.half_extent();
        let proj = Mat4::orthographic_rh(
            self.position.x - half.x,
            self.position.x + half.x,
            self.position.y + half.y,
            self.position.y - half.y,
            -1.0,
            1.0,
        );
        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }

    /// Maps a cursor position in window pixels to world coordinates.
    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        let viewport = Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32);
        self.position + (point - viewport * 0.5) / self.zoom.max(f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(uniform: &CameraUniform, point: Vec2) -> Vec2 {
        let m = Mat4::from_cols_array_2d(&uniform.view_proj);
        let clip = m * Vec4::new(point.x, point.y, 0.0, 1.0);
        Vec2::new(clip.x, clip.y)
    }

    #[test]
    fn screen_origin_is_top_left() {
        let uniform = CameraUniform::screen((800, 600));
        let top_left = project(&uniform, Vec2::ZERO);
        assert!((top_left - Vec2::new(-1.0, 1.0)).length() < 1e-5);
        let bottom_right = project(&uniform, Vec2::new(800.0, 600.0));
        assert!((bottom_right - Vec2::new(1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn world_camera_centers_on_position() {
        let mut camera = Camera2D::new(800, 600);
        camera.position = Vec2::new(100.0, 50.0);
        camera.zoom = 2.0;
        let center = project(&camera.build_uniform(), camera.position);
        assert!(center.length() < 1e-5);
        let world = camera.screen_to_world(Vec2::new(600.0, 300.0));
        assert!((world - Vec2::new(200.0, 50.0)).length() < 1e-4);
    }
}
