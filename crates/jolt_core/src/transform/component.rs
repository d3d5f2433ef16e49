//! Per-entity transform state: the target pose, the eased visual pose and
//! the velocities that connect them.

use glam::Vec2;
use rand::Rng;

use crate::math::Pose;
use crate::transform::motion::{DynamicMotion, DRAG_SCALE, HOVER_SCALE, JUICE_KICK};
use crate::transform::spring::{
    approach, step_axis, POSITION_SPRING, ROTATION_SPRING, SCALE_SPRING,
};

/// Lean in degrees per px/s of horizontal velocity.
pub const LEAN_PER_VELOCITY: f32 = 0.05 / 60.0;
pub const LEAN_MAX: f32 = 30.0;
const LEAN_FOLLOW_RATE: f32 = 50.0;
const LEAN_DECAY_RATE: f32 = 100.0;
const LEAN_IDLE_VELOCITY: f32 = 0.6;
/// Pinched sizes shrink by this fraction of the actual size per second.
pub const PINCH_RATE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    /// px/s
    pub x: f32,
    pub y: f32,
    /// deg/s
    pub r: f32,
    pub scale: f32,
}

impl Velocity {
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.r == 0.0 && self.scale == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub actual: Pose,
    pub visual: Pose,
    pub velocity: Velocity,
    /// Tilt from horizontal motion, added to the rotation target.
    pub rotation_offset: f32,
    pub motion: Option<DynamicMotion>,
    pub hovered: bool,
    pub dragged: bool,
    pub reduce_x_to_zero: bool,
    pub reduce_y_to_zero: bool,
    pub has_shadow: bool,
    pub shadow_height: f32,
    pub shadow_displacement: Vec2,
    pub(crate) frame_last_moved: Option<u64>,
}

impl Transform {
    pub fn new(pose: Pose) -> Self {
        Self {
            actual: pose,
            visual: pose,
            velocity: Velocity::default(),
            rotation_offset: 0.0,
            motion: None,
            hovered: false,
            dragged: false,
            reduce_x_to_zero: false,
            reduce_y_to_zero: false,
            has_shadow: false,
            shadow_height: 0.0,
            shadow_displacement: Vec2::ZERO,
            frame_last_moved: None,
        }
    }

    /// New target; the visual pose keeps easing from where it is.
    pub fn set_actual(&mut self, pose: Pose) {
        self.actual = pose;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.actual.x = x;
        self.actual.y = y;
    }

    pub fn set_size(&mut self, w: f32, h: f32) {
        self.actual.w = w;
        self.actual.h = h;
    }

    /// Target and visual both jump to `pose`; all motion stops.
    pub fn hard_set(&mut self, pose: Pose) {
        self.actual = pose;
        self.visual = pose;
        self.velocity = Velocity::default();
        self.rotation_offset = 0.0;
    }

    pub fn moved_in_frame(&self, frame: u64) -> bool {
        self.frame_last_moved == Some(frame)
    }

    /// Visual matches target, nothing is moving and no juice is live.
    pub fn is_stationary(&self) -> bool {
        self.visual == self.actual
            && self.velocity.is_zero()
            && self.rotation_offset == 0.0
            && self.motion.is_none()
    }

    /// Advance every axis on this entity's own springs.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.step_position(dt);
        self.step_size(dt);
        self.step_rotation(dt);
        self.step_scale(dt);
    }

    pub(crate) fn step_position(&mut self, dt: f32) {
        step_axis(
            &mut self.visual.x,
            &mut self.velocity.x,
            self.actual.x,
            dt,
            &POSITION_SPRING,
        );
        step_axis(
            &mut self.visual.y,
            &mut self.velocity.y,
            self.actual.y,
            dt,
            &POSITION_SPRING,
        );
    }

    pub(crate) fn step_size(&mut self, dt: f32) {
        if self.reduce_x_to_zero {
            self.visual.w = (self.visual.w - PINCH_RATE * dt * self.actual.w).clamp(0.0, self.actual.w.max(0.0));
        } else {
            approach(&mut self.visual.w, self.actual.w, dt);
        }
        if self.reduce_y_to_zero {
            self.visual.h = (self.visual.h - PINCH_RATE * dt * self.actual.h).clamp(0.0, self.actual.h.max(0.0));
        } else {
            approach(&mut self.visual.h, self.actual.h, dt);
        }
    }

    pub(crate) fn step_rotation(&mut self, dt: f32) {
        self.update_lean(dt);
        let target = self.actual.r + self.rotation_offset;
        step_axis(
            &mut self.visual.r,
            &mut self.velocity.r,
            target,
            dt,
            &ROTATION_SPRING,
        );
    }

    pub(crate) fn step_scale(&mut self, dt: f32) {
        step_axis(
            &mut self.visual.scale,
            &mut self.velocity.scale,
            self.actual.scale,
            dt,
            &SCALE_SPRING,
        );
    }

    fn update_lean(&mut self, dt: f32) {
        let vx = self.velocity.x;
        if vx.abs() < LEAN_IDLE_VELOCITY {
            self.rotation_offset *= (-LEAN_DECAY_RATE * dt).exp();
        } else {
            let want = vx * LEAN_PER_VELOCITY;
            self.rotation_offset += (want - self.rotation_offset) * (1.0 - (-LEAN_FOLLOW_RATE * dt).exp());
        }
        self.rotation_offset = self.rotation_offset.clamp(-LEAN_MAX, LEAN_MAX);
        if self.rotation_offset.abs() < 1e-4 {
            self.rotation_offset = 0.0;
        }
    }

    /// Starts a 0.4 s juice impulse. With `dampened` and a live impulse the
    /// two combine; otherwise the new one replaces it and kicks the scale.
    pub fn inject_dynamic_motion(
        &mut self,
        now: f64,
        amount: f32,
        rotation: f32,
        dampened: bool,
        rng: &mut impl Rng,
    ) {
        let fresh = DynamicMotion::new(now, amount, rotation, rng);
        match self.motion {
            Some(live) if dampened && live.is_live(now) => {
                self.motion = Some(live.combine(now, fresh.amount, fresh.rotation));
            }
            _ => {
                self.visual.scale = self.actual.scale * (1.0 - JUICE_KICK * fresh.amount);
                self.motion = Some(fresh);
            }
        }
    }

    pub fn expire_motion(&mut self, now: f64) {
        if matches!(self.motion, Some(m) if !m.is_live(now)) {
            self.motion = None;
        }
    }

    pub fn juice_scale(&self, now: f64) -> f32 {
        self.motion
            .filter(|m| m.is_live(now))
            .map(|m| m.scale_add(now))
            .unwrap_or(0.0)
    }

    pub fn juice_rotation(&self, now: f64) -> f32 {
        self.motion
            .filter(|m| m.is_live(now))
            .map(|m| m.rotation_add(now))
            .unwrap_or(0.0)
    }

    /// The pose to render: visual plus hover/drag emphasis plus juice.
    pub fn visual_with_hover_and_dynamic_motion(&self, now: f64) -> Pose {
        let mut pose = self.visual;
        let emphasis = if self.dragged {
            DRAG_SCALE
        } else if self.hovered {
            HOVER_SCALE
        } else {
            0.0
        };
        pose.scale = pose.scale * (1.0 + emphasis) + self.juice_scale(now);
        pose.r += self.juice_rotation(now);
        pose
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Pose::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn hard_set_then_steps_stays_exact() {
        let mut t = Transform::default();
        let pose = Pose::new(100.0, 100.0, 32.0, 32.0, 0.0, 1.0);
        t.hard_set(pose);
        for _ in 0..30 {
            t.step(DT);
        }
        assert_eq!(t.visual, pose);
        assert!(t.is_stationary());
    }

    #[test]
    fn settles_after_one_second() {
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 10.0, 10.0));
        t.set_actual(Pose::new(240.0, -80.0, 64.0, 20.0, 15.0, 1.5));
        let mut max_vx = 0.0f32;
        for _ in 0..60 {
            t.step(DT);
            max_vx = max_vx.max(t.velocity.x.abs());
        }
        assert!(max_vx <= POSITION_SPRING.v_max);
        assert_eq!(t.visual, t.actual);
        assert!(t.velocity.is_zero());
        assert!(t.is_stationary());
    }

    #[test]
    fn set_actual_does_not_snap() {
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 10.0, 10.0));
        t.set_actual(Pose::rect(50.0, 0.0, 10.0, 10.0));
        assert_eq!(t.visual.x, 0.0);
        t.step(DT);
        assert!(t.visual.x > 0.0 && t.visual.x < 50.0);
    }

    #[test]
    fn non_positive_dt_is_noop() {
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 10.0, 10.0));
        t.set_actual(Pose::rect(50.0, 0.0, 10.0, 10.0));
        let before = t.clone();
        t.step(0.0);
        t.step(-0.5);
        assert_eq!(t, before);
    }

    #[test]
    fn horizontal_motion_leans() {
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 10.0, 10.0));
        t.set_position(2000.0, 0.0);
        for _ in 0..3 {
            t.step(DT);
        }
        assert!(t.rotation_offset > 0.0);
        assert!(t.visual.r > 0.0);
    }

    #[test]
    fn pinch_shrinks_to_zero_and_recovers() {
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 40.0, 20.0));
        t.reduce_x_to_zero = true;
        for _ in 0..10 {
            t.step(DT);
        }
        assert_eq!(t.visual.w, 0.0);
        assert_eq!(t.visual.h, 20.0);

        t.reduce_x_to_zero = false;
        for _ in 0..60 {
            t.step(DT);
        }
        assert_eq!(t.visual.w, 40.0);
    }

    #[test]
    fn juice_kicks_scale_and_composes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut t = Transform::new(Pose::rect(0.0, 0.0, 10.0, 10.0));
        t.inject_dynamic_motion(1.0, 0.5, 10.0, false, &mut rng);
        assert!((t.visual.scale - 0.65).abs() < 1e-5);
        assert_eq!(t.actual.scale, 1.0);

        let composed = t.visual_with_hover_and_dynamic_motion(1.02);
        let expected = t.visual.scale + t.juice_scale(1.02);
        assert!((composed.scale - expected).abs() < 1e-6);
        assert!(composed.r != t.visual.r);

        t.expire_motion(1.5);
        assert!(t.motion.is_none());
        assert_eq!(t.visual_with_hover_and_dynamic_motion(1.5).r, t.visual.r);
    }

    #[test]
    fn dampened_juice_combines() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut t = Transform::default();
        t.inject_dynamic_motion(0.0, 0.4, 10.0, false, &mut rng);
        let kicked = t.visual.scale;
        t.inject_dynamic_motion(0.0, 0.4, 10.0, true, &mut rng);
        let m = t.motion.expect("live motion");
        assert!((m.amount - 0.8).abs() < 1e-5);
        assert!((m.rotation - 20.0).abs() < 1e-5);
        // Combining does not kick the scale again.
        assert_eq!(t.visual.scale, kicked);
    }

    #[test]
    fn hover_and_drag_emphasis() {
        let mut t = Transform::default();
        t.hovered = true;
        assert!((t.visual_with_hover_and_dynamic_motion(0.0).scale - 1.03).abs() < 1e-6);
        t.dragged = true;
        assert!((t.visual_with_hover_and_dynamic_motion(0.0).scale - 1.06).abs() < 1e-6);
    }
}
