//! Short additive "juice" impulses and hover/drag emphasis.

use rand::Rng;

pub const JUICE_DURATION: f64 = 0.4;
pub const JUICE_SCALE_FREQ: f32 = 50.8;
pub const JUICE_ROTATION_FREQ: f32 = 40.8;
/// Degrees at `amount = 1` when no rotation is requested.
pub const JUICE_MAX_ROTATION: f32 = 34.0;
/// Visual scale is kicked down to `1 - JUICE_KICK * amount` on injection.
pub const JUICE_KICK: f32 = 0.7;

pub const HOVER_SCALE: f32 = 0.03;
pub const DRAG_SCALE: f32 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicMotion {
    pub amount: f32,
    /// Degrees.
    pub rotation: f32,
    pub start: f64,
    pub end: f64,
}

impl DynamicMotion {
    /// `rotation == 0` picks a random sign at full strength for `amount`.
    pub fn new(now: f64, amount: f32, rotation: f32, rng: &mut impl Rng) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let rotation = if rotation == 0.0 {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            sign * JUICE_MAX_ROTATION * amount
        } else {
            rotation
        };
        Self {
            amount,
            rotation,
            start: now,
            end: now + JUICE_DURATION,
        }
    }

    /// 1 at the start of the window, 0 at the end.
    pub fn progress(&self, now: f64) -> f32 {
        let span = self.end - self.start;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.end - now) / span) as f32
    }

    pub fn is_live(&self, now: f64) -> bool {
        now < self.end
    }

    pub fn scale_add(&self, now: f64) -> f32 {
        let t = (now - self.start) as f32;
        let p = self.progress(now).max(0.0);
        self.amount * (JUICE_SCALE_FREQ * t).sin() * p.powi(3)
    }

    pub fn rotation_add(&self, now: f64) -> f32 {
        let t = (now - self.start) as f32;
        let p = self.progress(now).max(0.0);
        self.rotation * (JUICE_ROTATION_FREQ * t).sin() * p.powi(2)
    }

    /// Folds a new impulse into a live one: strength adds up (capped at 1)
    /// and the window restarts.
    pub fn combine(&self, now: f64, amount: f32, rotation: f32) -> Self {
        let p = self.progress(now).clamp(0.0, 1.0);
        Self {
            amount: (self.amount * p + amount).min(1.0),
            rotation: (self.rotation * p + rotation).clamp(-JUICE_MAX_ROTATION, JUICE_MAX_ROTATION),
            start: now,
            end: now + JUICE_DURATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_at_start_and_end() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = DynamicMotion::new(10.0, 0.5, 8.0, &mut rng);
        assert_eq!(m.scale_add(10.0), 0.0);
        assert_eq!(m.rotation_add(10.0), 0.0);
        assert_eq!(m.scale_add(10.0 + JUICE_DURATION), 0.0);
        assert!(!m.is_live(10.0 + JUICE_DURATION));
        assert!(m.is_live(10.2));
    }

    #[test]
    fn contribution_decays() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = DynamicMotion::new(0.0, 1.0, 10.0, &mut rng);
        let peak = (0..40)
            .map(|i| m.scale_add(i as f64 / 100.0).abs())
            .fold(0.0f32, f32::max);
        assert!(peak <= 1.0);
        assert!(m.scale_add(0.39).abs() < 0.01);
    }

    #[test]
    fn random_rotation_has_full_strength() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let m = DynamicMotion::new(0.0, 0.5, 0.0, &mut rng);
            assert!((m.rotation.abs() - 17.0).abs() < 1e-4);
        }
    }

    #[test]
    fn amount_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = DynamicMotion::new(0.0, 3.0, 1.0, &mut rng);
        assert_eq!(m.amount, 1.0);
    }

    #[test]
    fn combine_adds_remaining_strength() {
        let mut rng = StdRng::seed_from_u64(1);
        let m = DynamicMotion::new(0.0, 0.6, 20.0, &mut rng);
        // Halfway through, 0.3 of the first impulse remains.
        let c = m.combine(0.2, 0.5, 20.0);
        assert!((c.amount - 0.8).abs() < 1e-4);
        assert!((c.rotation - 30.0).abs() < 1e-4);
        assert!((c.start - 0.2).abs() < 1e-9);

        let capped = c.combine(0.2, 0.9, 30.0);
        assert_eq!(capped.amount, 1.0);
        assert_eq!(capped.rotation, JUICE_MAX_ROTATION);
    }
}
