//! Line wrapping and alignment of parsed characters.

use glam::Vec2;
use serde::Deserialize;

use crate::text::character::Character;

/// Glyph metrics source, so layout does not depend on a loaded font.
pub trait TextMeasure {
    /// Advance and line height of one codepoint at `font_size`.
    fn measure(&self, codepoint: char, font_size: f32) -> Vec2;
}

/// Fixed-advance metrics for headless runs and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    /// Advance as a fraction of the font size.
    pub advance: f32,
    pub line_height: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance: 0.5,
            line_height: 1.0,
        }
    }
}

impl TextMeasure for MonospaceMetrics {
    fn measure(&self, codepoint: char, font_size: f32) -> Vec2 {
        let advance = if codepoint == '\n' {
            0.0
        } else {
            self.advance * font_size
        };
        Vec2::new(advance, self.line_height * font_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Word,
    Character,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub font_size: f32,
    pub spacing: f32,
    pub wrap_width: Option<f32>,
    pub wrap_mode: WrapMode,
    pub alignment: TextAlignment,
}

/// Size of a single-style string, honoring explicit newlines.
pub fn measure_str(measure: &dyn TextMeasure, text: &str, font_size: f32, spacing: f32) -> Vec2 {
    let mut size = Vec2::ZERO;
    for line in text.split('\n') {
        let mut width = 0.0f32;
        let mut height = measure.measure(' ', font_size).y;
        for (i, c) in line.chars().enumerate() {
            let m = measure.measure(c, font_size);
            if i > 0 {
                width += spacing;
            }
            width += m.x;
            height = height.max(m.y);
        }
        size.x = size.x.max(width);
        size.y += height;
    }
    size
}

/// Positions every character and returns the bounding size.
///
/// Word mode breaks at the space in front of a word that would overflow;
/// the space stays at the end of the old line. Character mode breaks in
/// front of any character that would overflow. A newline always breaks.
pub fn layout_characters(chars: &mut [Character], measure: &dyn TextMeasure, params: &LayoutParams) -> Vec2 {
    let line_height = measure.measure(' ', params.font_size).y;
    let limit = params.wrap_width.filter(|w| *w > 0.0);
    let mut x = 0.0f32;
    let mut line = 0usize;

    for c in chars.iter_mut() {
        if c.image.is_none() {
            c.size = measure.measure(c.codepoint, params.font_size);
        }
    }

    let mut i = 0;
    while i < chars.len() {
        if chars[i].codepoint == '\n' && chars[i].image.is_none() {
            chars[i].line = line;
            chars[i].position = Vec2::new(x, line as f32 * line_height);
            chars[i].size.x = 0.0;
            line += 1;
            x = 0.0;
            i += 1;
            continue;
        }

        let advance = chars[i].size.x;
        if let Some(limit) = limit {
            match params.wrap_mode {
                WrapMode::Word if chars[i].is_space() => {
                    let word = next_word_width(&chars[i + 1..], params.spacing);
                    if x > 0.0 && x + advance + params.spacing + word > limit {
                        chars[i].line = line;
                        chars[i].position = Vec2::new(x, line as f32 * line_height);
                        line += 1;
                        x = 0.0;
                        i += 1;
                        continue;
                    }
                }
                WrapMode::Character if x > 0.0 && x + advance > limit => {
                    line += 1;
                    x = 0.0;
                }
                _ => {}
            }
        }

        chars[i].line = line;
        chars[i].position = Vec2::new(x, line as f32 * line_height);
        x += advance + params.spacing;
        i += 1;
    }

    let line_count = chars.last().map(|c| c.line + 1).unwrap_or(0);
    let widths: Vec<f32> = (0..line_count).map(|l| line_width(chars, l)).collect();
    let widest = widths.iter().copied().fold(0.0f32, f32::max);
    let target = limit.unwrap_or(widest);

    if params.alignment != TextAlignment::Left {
        for (l, width) in widths.iter().enumerate() {
            let leftover = (target - width).max(0.0);
            align_line(chars, l, leftover, params.alignment);
        }
    }

    let width = if params.alignment == TextAlignment::Left {
        widest
    } else {
        target.max(widest)
    };
    Vec2::new(width, line_count as f32 * line_height)
}

fn next_word_width(rest: &[Character], spacing: f32) -> f32 {
    let mut width = 0.0;
    for (n, c) in rest
        .iter()
        .take_while(|c| !c.is_space() && c.codepoint != '\n')
        .enumerate()
    {
        if n > 0 {
            width += spacing;
        }
        width += c.size.x;
    }
    width
}

/// Right edge of the last visible character on `line`.
fn line_width(chars: &[Character], line: usize) -> f32 {
    chars
        .iter()
        .filter(|c| c.line == line && !c.is_space() && c.codepoint != '\n')
        .map(|c| c.position.x + c.size.x)
        .fold(0.0, f32::max)
}

fn align_line(chars: &mut [Character], line: usize, leftover: f32, alignment: TextAlignment) {
    match alignment {
        TextAlignment::Left => {}
        TextAlignment::Center | TextAlignment::Right => {
            let shift = if alignment == TextAlignment::Center {
                leftover * 0.5
            } else {
                leftover
            };
            for c in chars.iter_mut().filter(|c| c.line == line) {
                c.position.x += shift;
            }
        }
        TextAlignment::Justified => {
            // Interior spaces only: those followed by something visible on
            // the same line.
            let indices: Vec<usize> = chars
                .iter()
                .enumerate()
                .filter(|(_, c)| c.line == line)
                .map(|(i, _)| i)
                .collect();
            let last_visible = indices
                .iter()
                .rev()
                .find(|i| !chars[**i].is_space() && chars[**i].codepoint != '\n')
                .copied();
            let Some(last_visible) = last_visible else {
                return;
            };
            let spaces = indices
                .iter()
                .filter(|i| **i < last_visible && chars[**i].is_space())
                .count();
            if spaces == 0 {
                return;
            }
            let per_space = leftover / spaces as f32;
            let mut shift = 0.0;
            for i in indices {
                chars[i].position.x += shift;
                if i < last_visible && chars[i].is_space() {
                    shift += per_space;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> Vec<Character> {
        text.chars()
            .enumerate()
            .map(|(i, c)| Character::new(c, i, 0.0))
            .collect()
    }

    fn params(wrap: Option<f32>, mode: WrapMode, alignment: TextAlignment) -> LayoutParams {
        LayoutParams {
            font_size: 10.0,
            spacing: 0.0,
            wrap_width: wrap,
            wrap_mode: mode,
            alignment,
        }
    }

    fn lines(chars: &[Character]) -> Vec<String> {
        let count = chars.last().map(|c| c.line + 1).unwrap_or(0);
        (0..count)
            .map(|l| chars.iter().filter(|c| c.line == l).map(|c| c.codepoint).collect())
            .collect()
    }

    #[test]
    fn measure_str_spacing_and_lines() {
        let m = MonospaceMetrics::default();
        assert_eq!(measure_str(&m, "abcd", 10.0, 1.0), Vec2::new(23.0, 10.0));
        assert_eq!(measure_str(&m, "ab\nabc", 10.0, 0.0), Vec2::new(15.0, 20.0));
    }

    #[test]
    fn no_wrap_keeps_one_line() {
        let mut cs = chars("hello world");
        let size = layout_characters(&mut cs, &MonospaceMetrics::default(), &params(None, WrapMode::Word, TextAlignment::Left));
        assert_eq!(size, Vec2::new(55.0, 10.0));
        assert!(cs.iter().all(|c| c.line == 0));
        assert_eq!(cs[6].position.x, 30.0);
    }

    #[test]
    fn word_wrap_breaks_before_overflowing_word() {
        let mut cs = chars("aa bb cc");
        // Each glyph is 5 px; "aa bb" is 25 px, adding " cc" makes 40.
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(27.0), WrapMode::Word, TextAlignment::Left));
        assert_eq!(lines(&cs), vec!["aa bb ", "cc"]);
        assert_eq!(cs[6].position, Vec2::new(0.0, 10.0));
        let order: String = cs.iter().map(|c| c.codepoint).collect();
        assert_eq!(order, "aa bb cc");
    }

    #[test]
    fn character_wrap_splits_anywhere() {
        let mut cs = chars("abcdef");
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(20.0), WrapMode::Character, TextAlignment::Left));
        assert_eq!(lines(&cs), vec!["abcd", "ef"]);
    }

    #[test]
    fn newline_always_breaks() {
        let mut cs = chars("a\nb");
        let size = layout_characters(&mut cs, &MonospaceMetrics::default(), &params(None, WrapMode::Word, TextAlignment::Left));
        assert_eq!(cs[2].line, 1);
        assert_eq!(cs[2].position.x, 0.0);
        assert_eq!(size.y, 20.0);
    }

    #[test]
    fn center_and_right_shift_lines() {
        let mut cs = chars("ab");
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(30.0), WrapMode::Word, TextAlignment::Center));
        assert_eq!(cs[0].position.x, 10.0);
        let mut cs = chars("ab");
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(30.0), WrapMode::Word, TextAlignment::Right));
        assert_eq!(cs[0].position.x, 20.0);
    }

    #[test]
    fn justify_spreads_over_interior_spaces() {
        let mut cs = chars("a b c");
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(45.0), WrapMode::Word, TextAlignment::Justified));
        // 25 px of text, 20 px spread over two spaces.
        assert_eq!(cs[2].position.x, 20.0);
        assert_eq!(cs[4].position.x, 40.0);

        let mut cs = chars("abc");
        layout_characters(&mut cs, &MonospaceMetrics::default(), &params(Some(45.0), WrapMode::Word, TextAlignment::Justified));
        assert_eq!(cs[0].position.x, 0.0);
    }
}
