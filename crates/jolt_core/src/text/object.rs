use std::cell::Cell;
use std::collections::HashMap;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::color::Color;
use crate::draw::command::FontId;
use crate::error::CoreError;
use crate::shader::recorder::SpriteFrame;
use crate::text::character::{Character, InlineImage};
use crate::text::effects::{EffectContext, EffectFn, EffectRegistry};
use crate::text::layout::{layout_characters, LayoutParams, TextAlignment, TextMeasure, WrapMode};
use crate::text::markup::{attr, parse_markup, EffectSpec, Segment};
use crate::time::FrameContext;

/// Delay between consecutive characters when popping in.
pub const POP_IN_STAGGER: f32 = 0.05;
pub const POP_IN_DURATION: f32 = 0.15;
/// Placeholder codepoint for inline images.
pub const IMAGE_GLYPH: char = '\u{FFFC}';
const RNG_SEED: u64 = 0x7465_7874;

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontId,
    pub font_size: f32,
    pub spacing: f32,
    pub wrap_width: Option<f32>,
    pub wrap_mode: WrapMode,
    pub alignment: TextAlignment,
    pub color: Color,
    /// Characters scale up from zero one after another.
    pub pop_in: bool,
    pub shadow: bool,
    /// Draw the text bounds and their dimensions.
    pub debug: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: FontId::default(),
            font_size: 16.0,
            spacing: 1.0,
            wrap_width: None,
            wrap_mode: WrapMode::Word,
            alignment: TextAlignment::Left,
            color: Color::WHITE,
            pop_in: false,
            shadow: true,
            debug: false,
        }
    }
}

impl TextStyle {
    fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            font_size: self.font_size,
            spacing: self.spacing,
            wrap_width: self.wrap_width,
            wrap_mode: self.wrap_mode,
            alignment: self.alignment,
        }
    }
}

/// A laid-out, animated string.
///
/// Markup is parsed once per `set_text`; every frame `update` resets each
/// character to its base rotation and color, applies the pop-in and then
/// its effects in attachment order.
pub struct Text {
    raw: String,
    style: TextStyle,
    characters: Vec<Character>,
    effects: EffectRegistry,
    size: Vec2,
    rng: StdRng,
    pub(crate) images: HashMap<String, SpriteFrame>,
    on_finished: Option<Box<dyn FnMut()>>,
    finished_fired: bool,
    pub(crate) missing_image_warned: Cell<bool>,
}

impl Text {
    pub fn new(raw: &str, style: TextStyle, measure: &dyn TextMeasure, now: f64) -> Self {
        Self::with_registry(raw, style, EffectRegistry::with_builtins(), measure, now)
    }

    pub fn with_registry(
        raw: &str,
        style: TextStyle,
        effects: EffectRegistry,
        measure: &dyn TextMeasure,
        now: f64,
    ) -> Self {
        let mut text = Self {
            raw: String::new(),
            style,
            characters: Vec::new(),
            effects,
            size: Vec2::ZERO,
            rng: StdRng::seed_from_u64(RNG_SEED),
            images: HashMap::new(),
            on_finished: None,
            finished_fired: false,
            missing_image_warned: Cell::new(false),
        };
        text.set_text(raw, measure, now);
        text
    }

    /// Reparses `raw`. Every character restarts its effects at `now`.
    pub fn set_text(&mut self, raw: &str, measure: &dyn TextMeasure, now: f64) {
        self.raw = raw.to_string();
        self.characters.clear();
        self.finished_fired = false;

        for segment in parse_markup(raw) {
            match segment {
                Segment::Plain(s) => {
                    for c in s.chars() {
                        self.push_char(c, Vec::new(), now);
                    }
                }
                Segment::Styled { text, effects } => {
                    let effects = self.known_effects(effects);
                    for c in text.chars() {
                        self.push_char(c, effects.clone(), now);
                    }
                }
                Segment::Image { attrs } => self.push_image(&attrs, false, now),
                Segment::Animation { attrs } => self.push_image(&attrs, true, now),
            }
        }
        self.relayout(measure);
        log::debug!("Text set: {} characters", self.characters.len());
    }

    fn known_effects(&self, effects: Vec<EffectSpec>) -> Vec<EffectSpec> {
        effects
            .into_iter()
            .filter(|e| {
                let known = self.effects.contains(&e.name);
                if !known {
                    log::warn!(
                        "{}",
                        CoreError::Config(format!("unknown text effect '{}'", e.name))
                    );
                }
                known
            })
            .collect()
    }

    fn push_char(&mut self, c: char, effects: Vec<EffectSpec>, now: f64) {
        let mut ch = Character::new(c, self.characters.len(), now);
        ch.color = self.style.color;
        ch.base_color = self.style.color;
        ch.effects = effects;
        self.characters.push(ch);
    }

    fn push_image(&mut self, attrs: &[EffectSpec], animated: bool, now: f64) {
        let Some(uuid) = attr(attrs, "uuid") else {
            log::warn!(
                "{}",
                CoreError::Config("inline image without a uuid, skipped".into())
            );
            return;
        };
        let scale = attr(attrs, "scale")
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        let fg = match attr(attrs, "fg").map(Color::parse) {
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                log::warn!("{e}");
                Color::WHITE
            }
            None => Color::WHITE,
        };
        let shadow = attr(attrs, "shadow").map_or(true, |s| s == "true" || s == "1");

        let mut ch = Character::new(IMAGE_GLYPH, self.characters.len(), now);
        ch.image = Some(InlineImage {
            uuid: uuid.to_string(),
            scale,
            fg,
            shadow,
            animated,
        });
        self.characters.push(ch);
    }

    /// Recomputes positions after a style or measure change. Effect state
    /// is kept.
    pub fn relayout(&mut self, measure: &dyn TextMeasure) {
        let font_size = self.style.font_size;
        for ch in &mut self.characters {
            if let Some(image) = &ch.image {
                ch.size = Vec2::splat(font_size * image.scale);
            }
        }
        self.size = layout_characters(&mut self.characters, measure, &self.style.layout_params());
    }

    pub fn set_style(&mut self, style: TextStyle, measure: &dyn TextMeasure) {
        self.style = style;
        self.relayout(measure);
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn characters_mut(&mut self) -> &mut [Character] {
        &mut self.characters
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn register_effect(&mut self, name: &str, f: EffectFn) {
        self.effects.register(name, f);
    }

    /// Resolves an inline image uuid to an atlas frame.
    pub fn bind_image(&mut self, uuid: &str, frame: SpriteFrame) {
        self.images.insert(uuid.to_string(), frame);
        self.missing_image_warned.set(false);
    }

    /// Called once, the first time the last character finishes an effect,
    /// then dropped. `set_text` does not re-arm it.
    pub fn set_on_finished(&mut self, f: impl FnMut() + 'static) {
        self.on_finished = Some(Box::new(f));
    }

    /// Whether the finished callback has fired since the last `set_text`.
    pub fn is_finished(&self) -> bool {
        self.finished_fired
    }

    fn last_character_finished(&self) -> bool {
        self.characters
            .last()
            .map(Character::has_finished_any)
            .unwrap_or(false)
    }

    pub fn update(&mut self, ctx: &FrameContext) {
        let char_count = self.characters.len();
        for ch in self.characters.iter_mut() {
            ch.rotation = 0.0;
            ch.color = ch.base_color;
            if self.style.pop_in {
                let t = (ctx.now - ch.created_at) as f32 - ch.index as f32 * POP_IN_STAGGER;
                ch.scale = (t / POP_IN_DURATION).clamp(0.0, 1.0);
            }
            let mut effect_ctx = EffectContext {
                dt: ctx.dt,
                now: ctx.now,
                char_count,
                rng: &mut self.rng,
            };
            self.effects.apply(&mut effect_ctx, ch);
            ch.first_frame = false;
        }

        if !self.finished_fired && self.last_character_finished() {
            self.finished_fired = true;
            if let Some(mut callback) = self.on_finished.take() {
                callback();
            }
        }
    }
}
