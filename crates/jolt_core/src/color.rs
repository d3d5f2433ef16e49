//! RGBA8 colors with the named palette used by UI templates and text effects.

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const BLANK: Color = Color::rgba(0, 0, 0, 0);
    pub const RED: Color = Color::rgba(230, 41, 55, 255);
    pub const GREEN: Color = Color::rgba(0, 228, 48, 255);
    pub const BLUE: Color = Color::rgba(0, 121, 241, 255);
    pub const YELLOW: Color = Color::rgba(253, 249, 0, 255);
    pub const ORANGE: Color = Color::rgba(255, 161, 0, 255);
    pub const PURPLE: Color = Color::rgba(200, 122, 255, 255);
    pub const PINK: Color = Color::rgba(255, 109, 194, 255);
    pub const GOLD: Color = Color::rgba(255, 203, 0, 255);
    pub const GRAY: Color = Color::rgba(130, 130, 130, 255);
    pub const LIGHTGRAY: Color = Color::rgba(200, 200, 200, 255);
    pub const DARKGRAY: Color = Color::rgba(80, 80, 80, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn named(name: &str) -> Option<Color> {
        let color = match name.to_ascii_lowercase().as_str() {
            "white" => Color::WHITE,
            "black" => Color::BLACK,
            "blank" | "transparent" => Color::BLANK,
            "red" => Color::RED,
            "green" => Color::GREEN,
            "blue" => Color::BLUE,
            "yellow" => Color::YELLOW,
            "orange" => Color::ORANGE,
            "purple" => Color::PURPLE,
            "pink" => Color::PINK,
            "gold" => Color::GOLD,
            "gray" | "grey" => Color::GRAY,
            "lightgray" | "lightgrey" => Color::LIGHTGRAY,
            "darkgray" | "darkgrey" => Color::DARKGRAY,
            _ => return None,
        };
        Some(color)
    }

    /// Parses `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(hex.len(), 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }

    /// Named color or hex string.
    pub fn parse(value: &str) -> CoreResult<Color> {
        Color::named(value)
            .or_else(|| Color::from_hex(value))
            .ok_or_else(|| CoreError::Config(format!("unknown color '{value}'")))
    }

    /// `hue` in degrees, `saturation` and `value` in 0..=1.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Color {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = value * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = value - c;
        let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::rgba(to_u8(r), to_u8(g), to_u8(b), 255)
    }

    /// Same color with alpha replaced by `alpha` (0..=1).
    pub fn fade(self, alpha: f32) -> Color {
        Color {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// Channel-wise interpolation toward `other`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
