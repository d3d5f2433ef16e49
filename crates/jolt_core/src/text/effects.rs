//! Per-character text effects.
//!
//! Every effect is a function of the frame time, the character and its
//! string arguments. Effects write into their own keyed slot of the
//! character (offset, scale modifier, custom data) so several can stack.
//! Rotation and color are reset to their base values before effects run
//! each frame, so effects add onto a clean slate.
//!
//! | effect | arguments (defaults) |
//! |---|---|
//! | color | name or hex (white) |
//! | shake | x (1), y (1) |
//! | pulse | min (0.8), max (1.2), speed (2), stagger (0.5) |
//! | rotate | speed (2), angle (10) |
//! | float | speed (2.5), amplitude (5), stagger (0.4) |
//! | bump | speed (6), amplitude (3), threshold (0.8), stagger (1.2) |
//! | wiggle | speed (10), angle (12), stagger (1) |
//! | slide | duration (0.3), stagger (0.1), direction l/r/t/b (l), mode in/out (in) |
//! | pop | duration (0.3), stagger (0.1), mode in/out (in) |
//! | spin | speed (1), stagger (0.5) |
//! | fan | angle (10) |
//! | fade | speed (3), min (0.4), max (1), stagger (0.5) |
//! | highlight | speed (4), brightness (0.4), stagger (0.5), direction l/r (r), mode bleed/threshold (bleed), threshold (0.7) |
//! | rainbow | speed (60), stagger (10), mode smooth/stepped (smooth), steps (6) |
//! | expand | min (0.8), max (1.2), speed (2), axis x/y/both (both) |
//! | bounce | height (20), gravity (700), damping (0.5), stagger (0.1) |
//! | scramble | duration (0.4), stagger (0.1), rate (15) |

use std::collections::HashMap;
use std::f32::consts::PI;
use std::rc::Rc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;

use crate::color::Color;
use crate::error::CoreError;
use crate::text::character::Character;

pub const SLIDE_DISTANCE: f32 = 20.0;
const BOUNCE_REST_VELOCITY: f32 = 20.0;

pub struct EffectContext<'a> {
    pub dt: f32,
    pub now: f64,
    pub char_count: usize,
    pub rng: &'a mut StdRng,
}

pub type EffectFn = Rc<dyn Fn(&mut EffectContext<'_>, &mut Character, &[String])>;

#[derive(Clone, Default)]
pub struct EffectRegistry {
    effects: HashMap<String, EffectFn>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, fn(&mut EffectContext<'_>, &mut Character, &[String])); 17] = [
            ("color", color),
            ("shake", shake),
            ("pulse", pulse),
            ("rotate", rotate),
            ("float", float),
            ("bump", bump),
            ("wiggle", wiggle),
            ("slide", slide),
            ("pop", pop),
            ("spin", spin),
            ("fan", fan),
            ("fade", fade),
            ("highlight", highlight),
            ("rainbow", rainbow),
            ("expand", expand),
            ("bounce", bounce),
            ("scramble", scramble),
        ];
        for (name, f) in builtins {
            registry.register(name, Rc::new(f));
        }
        registry
    }

    pub fn register(&mut self, name: &str, f: EffectFn) {
        self.effects.insert(name.to_string(), f);
    }

    pub fn get(&self, name: &str) -> Option<&EffectFn> {
        self.effects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Runs every effect attached to `ch`, in attachment order.
    pub fn apply(&self, ctx: &mut EffectContext<'_>, ch: &mut Character) {
        let effects = std::mem::take(&mut ch.effects);
        for spec in &effects {
            if let Some(f) = self.effects.get(&spec.name) {
                f(ctx, ch, &spec.args);
            }
        }
        ch.effects = effects;
    }
}

/// Numeric argument `i`, falling back to `default` when missing or invalid.
fn num(args: &[String], i: usize, default: f32, effect: &str) -> f32 {
    match args.get(i) {
        None => default,
        Some(raw) => match raw.parse::<f32>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                log::warn!(
                    "{}",
                    CoreError::Config(format!(
                        "text effect '{effect}': bad argument '{raw}', using {default}"
                    ))
                );
                default
            }
        },
    }
}

fn word<'a>(args: &'a [String], i: usize, default: &'a str) -> &'a str {
    args.get(i).map(String::as_str).unwrap_or(default)
}

/// Seconds since this character's staggered start; negative before it.
fn local_time(ctx: &EffectContext<'_>, ch: &Character, stagger: f32) -> f32 {
    (ctx.now - ch.created_at) as f32 - ch.index as f32 * stagger
}

fn wave(ctx: &EffectContext<'_>, ch: &Character, speed: f32, stagger: f32) -> f32 {
    (ctx.now as f32 * speed - ch.index as f32 * stagger).sin()
}

fn progress(ctx: &EffectContext<'_>, ch: &Character, duration: f32, stagger: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (local_time(ctx, ch, stagger) / duration).clamp(0.0, 1.0)
}

fn with_alpha(color: Color, alpha: f32) -> Color {
    color.fade(alpha.clamp(0.0, 1.0) * color.a as f32 / 255.0)
}

fn color(_ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let name = word(args, 0, "white");
    let parsed = Color::named(name).or_else(|| Color::from_hex(name));
    let c = match parsed {
        Some(c) => c,
        None => {
            if ch.first_frame {
                log::warn!(
                    "{}",
                    CoreError::Config(format!("text effect 'color': unknown color '{name}'"))
                );
            }
            Color::WHITE
        }
    };
    ch.base_color = c;
    ch.color = c;
}

fn shake(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let x = num(args, 0, 1.0, "shake").abs();
    let y = num(args, 1, 1.0, "shake").abs();
    let offset = Vec2::new(ctx.rng.gen_range(-x..=x), ctx.rng.gen_range(-y..=y));
    ch.offsets.insert("shake".into(), offset);
}

fn pulse(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let min = num(args, 0, 0.8, "pulse");
    let max = num(args, 1, 1.2, "pulse");
    let speed = num(args, 2, 2.0, "pulse");
    let stagger = num(args, 3, 0.5, "pulse");
    let t = 0.5 + 0.5 * wave(ctx, ch, speed, stagger);
    ch.scale_modifiers
        .insert("pulse".into(), Vec2::splat(min + (max - min) * t));
}

fn rotate(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 2.0, "rotate");
    let angle = num(args, 1, 10.0, "rotate");
    ch.rotation += (ctx.now as f32 * speed + ch.index as f32).sin() * angle;
}

fn float(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 2.5, "float");
    let amplitude = num(args, 1, 5.0, "float");
    let stagger = num(args, 2, 0.4, "float");
    let y = (ctx.now as f32 * speed + ch.index as f32 * stagger).sin() * amplitude;
    ch.offsets.insert("float".into(), Vec2::new(0.0, y));
}

fn bump(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 6.0, "bump");
    let amplitude = num(args, 1, 3.0, "bump");
    let threshold = num(args, 2, 0.8, "bump");
    let stagger = num(args, 3, 1.2, "bump");
    let s = (ctx.now as f32 * speed + ch.index as f32 * stagger).sin();
    let y = if s > threshold { -amplitude } else { 0.0 };
    ch.offsets.insert("bump".into(), Vec2::new(0.0, y));
}

fn wiggle(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 10.0, "wiggle");
    let angle = num(args, 1, 12.0, "wiggle");
    let stagger = num(args, 2, 1.0, "wiggle");
    ch.rotation += (ctx.now as f32 * speed + ch.index as f32 * stagger).sin() * angle;
}

fn slide(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let duration = num(args, 0, 0.3, "slide");
    let stagger = num(args, 1, 0.1, "slide");
    let dir = match word(args, 2, "l") {
        "r" => Vec2::new(1.0, 0.0),
        "t" => Vec2::new(0.0, -1.0),
        "b" => Vec2::new(0.0, 1.0),
        _ => Vec2::new(-1.0, 0.0),
    };
    let outgoing = word(args, 3, "in") == "out";
    let t = progress(ctx, ch, duration, stagger);
    let eased = 1.0 - (1.0 - t).powi(3);
    let (distance, alpha) = if outgoing {
        (eased, 1.0 - t)
    } else {
        (1.0 - eased, t)
    };
    ch.offsets
        .insert("slide".into(), dir * SLIDE_DISTANCE * distance);
    ch.color = with_alpha(ch.color, alpha);
    ch.finished.insert("slide".into(), t >= 1.0);
}

fn pop(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let duration = num(args, 0, 0.3, "pop");
    let stagger = num(args, 1, 0.1, "pop");
    let outgoing = word(args, 2, "in") == "out";
    let t = progress(ctx, ch, duration, stagger);
    // Ease-out-back overshoots slightly before settling at 1.
    let c1 = 1.70158;
    let c3 = c1 + 1.0;
    let back = 1.0 + c3 * (t - 1.0).powi(3) + c1 * (t - 1.0).powi(2);
    let s = if outgoing { 1.0 - t } else { back.max(0.0) };
    ch.scale_modifiers.insert("pop".into(), Vec2::splat(s));
    ch.finished.insert("pop".into(), t >= 1.0);
}

fn spin(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 1.0, "spin");
    let stagger = num(args, 1, 0.5, "spin");
    let t = local_time(ctx, ch, stagger).max(0.0);
    ch.rotation += (t * speed * 360.0).rem_euclid(360.0);
}

fn fan(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let angle = num(args, 0, 10.0, "fan");
    if ctx.char_count > 1 {
        let f = ch.index as f32 / (ctx.char_count - 1) as f32;
        ch.rotation += -angle + 2.0 * angle * f;
    }
}

fn fade(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 3.0, "fade");
    let min = num(args, 1, 0.4, "fade");
    let max = num(args, 2, 1.0, "fade");
    let stagger = num(args, 3, 0.5, "fade");
    let t = 0.5 + 0.5 * wave(ctx, ch, speed, stagger);
    ch.color = with_alpha(ch.color, min + (max - min) * t);
}

fn highlight(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 4.0, "highlight");
    let brightness = num(args, 1, 0.4, "highlight");
    let stagger = num(args, 2, 0.5, "highlight");
    let sign = if word(args, 3, "r") == "l" { -1.0 } else { 1.0 };
    let threshold_mode = word(args, 4, "bleed") == "threshold";
    let threshold = num(args, 5, 0.7, "highlight");
    let w = 0.5 + 0.5 * wave(ctx, ch, speed, sign * stagger);
    let amount = if threshold_mode {
        if w > threshold {
            brightness
        } else {
            0.0
        }
    } else {
        w * brightness
    };
    let alpha = ch.color.a;
    ch.color = Color {
        a: alpha,
        ..ch.color.lerp(Color::WHITE, amount)
    };
}

fn rainbow(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let speed = num(args, 0, 60.0, "rainbow");
    let stagger = num(args, 1, 10.0, "rainbow");
    let stepped = word(args, 2, "smooth") == "stepped";
    let steps = num(args, 3, 6.0, "rainbow").max(1.0);
    let mut hue = ctx.now as f32 * speed + ch.index as f32 * stagger;
    if stepped {
        let band = 360.0 / steps;
        hue = (hue / band).floor() * band;
    }
    let alpha = ch.color.a;
    ch.color = Color {
        a: alpha,
        ..Color::from_hsv(hue, 1.0, 1.0)
    };
}

fn expand(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let min = num(args, 0, 0.8, "expand");
    let max = num(args, 1, 1.2, "expand");
    let speed = num(args, 2, 2.0, "expand");
    let t = 0.5 + 0.5 * (ctx.now as f32 * speed + ch.index as f32 * PI * 0.25).sin();
    let s = min + (max - min) * t;
    let modifier = match word(args, 3, "both") {
        "x" => Vec2::new(s, 1.0),
        "y" => Vec2::new(1.0, s),
        _ => Vec2::splat(s),
    };
    ch.scale_modifiers.insert("expand".into(), modifier);
}

fn bounce(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let height = num(args, 0, 20.0, "bounce");
    let gravity = num(args, 1, 700.0, "bounce");
    let damping = num(args, 2, 0.5, "bounce");
    let stagger = num(args, 3, 0.1, "bounce");

    if !ch.custom.contains_key("bounce_y") {
        ch.custom.insert("bounce_y".into(), -height);
        ch.custom.insert("bounce_v".into(), 0.0);
    }
    let done = ch.finished.get("bounce").copied().unwrap_or(false);
    let mut y = ch.custom.get("bounce_y").copied().unwrap_or(0.0);
    let mut v = ch.custom.get("bounce_v").copied().unwrap_or(0.0);

    if !done && local_time(ctx, ch, stagger) >= 0.0 {
        v += gravity * ctx.dt;
        y += v * ctx.dt;
        if y >= 0.0 {
            y = 0.0;
            v = -v * damping;
            if v.abs() < BOUNCE_REST_VELOCITY {
                v = 0.0;
                ch.finished.insert("bounce".into(), true);
            }
        }
    }
    ch.custom.insert("bounce_y".into(), y);
    ch.custom.insert("bounce_v".into(), v);
    ch.offsets.insert("bounce".into(), Vec2::new(0.0, y));
}

fn scramble(ctx: &mut EffectContext<'_>, ch: &mut Character, args: &[String]) {
    let duration = num(args, 0, 0.4, "scramble");
    let stagger = num(args, 1, 0.1, "scramble");
    let rate = num(args, 2, 15.0, "scramble").max(1.0);
    let t = local_time(ctx, ch, stagger);

    if t >= duration || ch.is_space() {
        ch.override_codepoint = None;
        ch.finished.insert("scramble".into(), true);
        return;
    }
    let next = ch.custom.get("scramble_next").copied().unwrap_or(f32::MIN);
    let elapsed = (ctx.now - ch.created_at) as f32;
    if elapsed >= next {
        ch.override_codepoint = Some(ctx.rng.gen_range('!'..='~'));
        ch.custom.insert("scramble_next".into(), elapsed + 1.0 / rate);
    }
    ch.finished.insert("scramble".into(), false);
}
