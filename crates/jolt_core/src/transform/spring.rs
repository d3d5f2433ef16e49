//! Per-axis critically-tuned spring used for position, rotation and scale.
//!
//! ```text
//! alpha = exp(-k * clamp(dt * 1000, 0, 1))
//! v     = alpha * v + (1 - alpha) * (target - value) * gain * dt
//! |v|   = min(|v|, v_max)
//! value = value + v * dt
//! ```
//!
//! Steps longer than [`MAX_SUBSTEP`] are split so a frame hitch cannot
//! inject energy. Size has no velocity and uses [`approach`] instead.

pub const MAX_SUBSTEP: f32 = 1.0 / 60.0;

/// Rate of the exponential size approach, per second.
pub const SIZE_RATE: f32 = 25.0;
pub const SIZE_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub k: f32,
    pub gain: f32,
    pub v_max: f32,
    pub eps_pos: f32,
    pub eps_vel: f32,
}

pub const POSITION_SPRING: SpringParams = SpringParams {
    k: 0.834,
    gain: 2100.0,
    v_max: 2400.0,
    eps_pos: 0.01,
    eps_vel: 0.05,
};

/// Degrees.
pub const ROTATION_SPRING: SpringParams = SpringParams {
    k: 3.17,
    gain: 2100.0,
    v_max: 2400.0,
    eps_pos: 0.001,
    eps_vel: 0.05,
};

pub const SCALE_SPRING: SpringParams = SpringParams {
    k: 1.0,
    gain: 2100.0,
    v_max: 40.0,
    eps_pos: 0.0005,
    eps_vel: 0.005,
};

/// Advances one axis by `dt`. Returns true once the axis has snapped to
/// its target with zero velocity.
pub fn step_axis(value: &mut f32, velocity: &mut f32, target: f32, dt: f32, p: &SpringParams) -> bool {
    if dt <= 0.0 {
        return settled(*value, *velocity, target);
    }
    let mut remaining = dt;
    while remaining > 0.0 {
        let h = remaining.min(MAX_SUBSTEP);
        remaining -= h;

        let alpha = (-p.k * (h * 1000.0).clamp(0.0, 1.0)).exp();
        *velocity = alpha * *velocity + (1.0 - alpha) * (target - *value) * p.gain * h;
        *velocity = velocity.clamp(-p.v_max, p.v_max);
        *value += *velocity * h;

        if (*value - target).abs() < p.eps_pos && velocity.abs() < p.eps_vel {
            *value = target;
            *velocity = 0.0;
            return true;
        }
    }
    false
}

fn settled(value: f32, velocity: f32, target: f32) -> bool {
    value == target && velocity == 0.0
}

/// Exponential approach with no overshoot.
pub fn approach(value: &mut f32, target: f32, dt: f32) {
    if dt <= 0.0 {
        return;
    }
    *value += (target - *value) * (1.0 - (-SIZE_RATE * dt).exp());
    if (*value - target).abs() < SIZE_EPSILON {
        *value = target;
    }
}
