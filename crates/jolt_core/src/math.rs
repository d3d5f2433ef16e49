//! Pose and rectangle primitives. Rotations are in degrees throughout.

use glam::Vec2;

/// Position, size, rotation and scale of a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Degrees, clockwise in screen space.
    pub r: f32,
    pub scale: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, w: f32, h: f32, r: f32, scale: f32) -> Self {
        Self { x, y, w, h, r, scale }
    }

    pub const fn rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, w, h, 0.0, 1.0)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::rect(0.0, 0.0, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }

    /// Grows the rect by `amount` on every side.
    pub fn expand(&self, amount: f32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.w + amount * 2.0,
            self.h + amount * 2.0,
        )
    }
}

pub fn rotate_point(point: Vec2, pivot: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let d = point - pivot;
    pivot + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Hit test against `rect` rotated by `degrees` about its center.
pub fn point_in_rotated_rect(point: Vec2, rect: Rect, degrees: f32) -> bool {
    if degrees.abs() < 0.0001 {
        return rect.contains(point);
    }
    rect.contains(rotate_point(point, rect.center(), -degrees))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn() {
        let p = rotate_point(Vec2::new(10.0, 0.0), Vec2::ZERO, 90.0);
        assert!(p.x.abs() < 1e-4);
        assert!((p.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn rotated_rect_hit_test() {
        // A long thin bar rotated 90 degrees stands upright.
        let bar = Rect::new(0.0, 45.0, 100.0, 10.0);
        let above_center = Vec2::new(50.0, 10.0);
        assert!(!point_in_rotated_rect(above_center, bar, 0.0));
        assert!(point_in_rotated_rect(above_center, bar, 90.0));
    }

    #[test]
    fn pose_center_and_bounds() {
        let pose = Pose::rect(10.0, 20.0, 30.0, 40.0);
        assert_eq!(pose.center(), Vec2::new(25.0, 40.0));
        assert_eq!(pose.bounds().expand(1.0), Rect::new(9.0, 19.0, 32.0, 42.0));
    }
}
