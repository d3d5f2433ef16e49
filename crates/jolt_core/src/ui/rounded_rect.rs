//! Cached rounded-rectangle triangles for UI fills and outlines.
//!
//! Vertices are in node-local space: the rect spans `(0, 0)..(width, height)`.

use glam::Vec2;

pub const CORNER_RADIUS: f32 = 12.0;
pub const CORNER_SEGMENTS: usize = 6;
pub const SIZE_TOLERANCE: f32 = 0.5;
pub const PROGRESS_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct RoundedRectGeometry {
    pub width: f32,
    pub height: f32,
    pub line_thickness: f32,
    /// Fraction of the width the fill covers, from the left.
    pub progress: f32,
    /// Outer perimeter, clockwise from the top-left arc.
    pub outer: Vec<Vec2>,
    /// Perimeter inset by `line_thickness`.
    pub inner: Vec<Vec2>,
    /// Triangle list covering the (progress-clipped) interior.
    pub fill: Vec<Vec2>,
    /// Triangle list of the ring between `outer` and `inner`.
    pub outline: Vec<Vec2>,
}

impl RoundedRectGeometry {
    pub fn new(width: f32, height: f32, line_thickness: f32, progress: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let line_thickness = line_thickness.max(0.0);
        let progress = progress.clamp(0.0, 1.0);
        let radius = corner_radius(width, height);

        let outer = perimeter(width, height, radius, 0.0);
        let inner = perimeter(width, height, radius, line_thickness.min(width.min(height) * 0.5));

        let mut fill = Vec::new();
        if progress > 0.0 && width > 0.0 && height > 0.0 {
            let limit = width * progress;
            let clip = |p: Vec2| Vec2::new(p.x.min(limit), p.y);
            let center = clip(Vec2::new(width * 0.5, height * 0.5));
            fill.reserve(outer.len() * 3);
            for i in 0..outer.len() {
                let next = (i + 1) % outer.len();
                fill.push(center);
                fill.push(clip(outer[i]));
                fill.push(clip(outer[next]));
            }
        }

        let mut outline = Vec::new();
        if line_thickness > 0.0 {
            outline.reserve(outer.len() * 6);
            for i in 0..outer.len() {
                let next = (i + 1) % outer.len();
                outline.extend_from_slice(&[outer[i], outer[next], inner[i]]);
                outline.extend_from_slice(&[inner[i], outer[next], inner[next]]);
            }
        }

        Self {
            width,
            height,
            line_thickness,
            progress,
            outer,
            inner,
            fill,
            outline,
        }
    }

    pub fn radius(&self) -> f32 {
        corner_radius(self.width, self.height)
    }

    /// True once any input drifted past its tolerance.
    pub fn needs_regen(&self, width: f32, height: f32, line_thickness: f32, progress: f32) -> bool {
        (self.width - width).abs() > SIZE_TOLERANCE
            || (self.height - height).abs() > SIZE_TOLERANCE
            || (self.line_thickness - line_thickness).abs() > SIZE_TOLERANCE
            || (self.progress - progress.clamp(0.0, 1.0)).abs() > PROGRESS_TOLERANCE
    }
}

fn corner_radius(width: f32, height: f32) -> f32 {
    CORNER_RADIUS.min(width.min(height) * 0.5).max(0.0)
}

fn perimeter(width: f32, height: f32, radius: f32, inset: f32) -> Vec<Vec2> {
    let c = radius.max(inset);
    let r = c - inset;
    let corners = [
        (Vec2::new(c, c), 180.0f32),
        (Vec2::new(width - c, c), 270.0),
        (Vec2::new(width - c, height - c), 0.0),
        (Vec2::new(c, height - c), 90.0),
    ];
    let mut points = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1));
    for (center, start) in corners {
        for step in 0..=CORNER_SEGMENTS {
            let angle = (start + 90.0 * step as f32 / CORNER_SEGMENTS as f32).to_radians();
            points.push(center + Vec2::new(angle.cos(), angle.sin()) * r);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_stays_inside_bounds() {
        let g = RoundedRectGeometry::new(100.0, 40.0, 2.0, 1.0);
        assert_eq!(g.radius(), 12.0);
        assert_eq!(g.outer.len(), 4 * (CORNER_SEGMENTS + 1));
        assert_eq!(g.fill.len(), g.outer.len() * 3);
        assert_eq!(g.outline.len(), g.outer.len() * 6);
        for p in g.fill.iter().chain(&g.outline) {
            assert!(p.x >= -1e-3 && p.x <= 100.0 + 1e-3);
            assert!(p.y >= -1e-3 && p.y <= 40.0 + 1e-3);
        }
        assert!((g.outer[0] - Vec2::new(0.0, 12.0)).length() < 1e-4);
        assert!((g.inner[0] - Vec2::new(2.0, 12.0)).length() < 1e-4);
    }

    #[test]
    fn radius_shrinks_for_small_rects() {
        let g = RoundedRectGeometry::new(10.0, 30.0, 0.0, 1.0);
        assert_eq!(g.radius(), 5.0);
        assert!(g.outline.is_empty());
    }

    #[test]
    fn progress_clips_the_fill() {
        let g = RoundedRectGeometry::new(200.0, 20.0, 0.0, 0.25);
        let max_x = g.fill.iter().map(|p| p.x).fold(0.0f32, f32::max);
        assert!((max_x - 50.0).abs() < 1e-4);
        assert!(RoundedRectGeometry::new(200.0, 20.0, 0.0, 0.0).fill.is_empty());
    }

    #[test]
    fn regen_only_past_tolerance() {
        let g = RoundedRectGeometry::new(50.0, 50.0, 1.0, 0.5);
        assert!(!g.needs_regen(50.4, 49.6, 1.0, 0.505));
        assert!(g.needs_regen(50.6, 50.0, 1.0, 0.5));
        assert!(g.needs_regen(50.0, 50.0, 2.0, 0.5));
        assert!(g.needs_regen(50.0, 50.0, 1.0, 0.52));
    }
}
