//! Turns a [`Text`] into draw commands, one local matrix per character.

use glam::Vec2;

use crate::color::Color;
use crate::draw::command::{CommandMeta, CommandSink, DrawCommand};
use crate::math::Rect;
use crate::text::character::{Character, InlineImage};
use crate::text::object::Text;

pub const SHADOW_ALPHA: f32 = 0.7;
/// Shadow displacement at full font factor and zero height.
pub const SHADOW_OFFSET: Vec2 = Vec2::new(2.0, 2.0);
/// Font size at which the shadow reaches its full displacement.
const SHADOW_FULL_SIZE: f32 = 60.0;

impl Text {
    /// Records the text with its top-left at `origin`. Returns the number of
    /// characters drawn.
    pub fn render(&self, sink: &mut dyn CommandSink, origin: Vec2, meta: CommandMeta) -> usize {
        let mut drawn = 0;
        for ch in self.characters() {
            if ch.is_space() {
                continue;
            }
            let scale = ch.total_scale();
            if scale.x == 0.0 || scale.y == 0.0 {
                continue;
            }

            let center = origin + ch.center() + ch.total_offset();
            sink.push_command(DrawCommand::PushMatrix, meta);
            sink.push_command(DrawCommand::Translate(center), meta);
            sink.push_command(DrawCommand::Scale(scale), meta);
            sink.push_command(DrawCommand::Rotate(ch.rotation), meta);
            sink.push_command(DrawCommand::Translate(-ch.size * 0.5), meta);
            match &ch.image {
                Some(image) => self.render_image(sink, ch, image, meta),
                None => self.render_glyph(sink, ch, meta),
            }
            sink.push_command(DrawCommand::PopMatrix, meta);
            drawn += 1;
        }

        if self.style().debug {
            self.render_bounds(sink, origin, meta);
        }
        drawn
    }

    /// Where the shadow lands relative to the character, growing with its
    /// height and shrinking for small fonts.
    pub fn shadow_offset(&self, ch: &Character) -> Vec2 {
        let font_factor = (self.style().font_size / SHADOW_FULL_SIZE).clamp(0.05, 1.0);
        SHADOW_OFFSET * (1.0 + ch.shadow_height) * font_factor
    }

    fn shadow_color(ch: &Character) -> Color {
        Color::BLACK.fade(SHADOW_ALPHA * ch.color.a as f32 / 255.0)
    }

    fn render_glyph(&self, sink: &mut dyn CommandSink, ch: &Character, meta: CommandMeta) {
        let style = self.style();
        let glyph = ch.shown().to_string();
        if style.shadow {
            sink.push_command(
                DrawCommand::DrawText {
                    text: glyph.clone(),
                    font: style.font,
                    position: self.shadow_offset(ch),
                    size: style.font_size,
                    spacing: 0.0,
                    color: Self::shadow_color(ch),
                },
                meta,
            );
        }
        sink.push_command(
            DrawCommand::DrawText {
                text: glyph,
                font: style.font,
                position: Vec2::ZERO,
                size: style.font_size,
                spacing: 0.0,
                color: ch.color,
            },
            meta,
        );
    }

    fn render_image(
        &self,
        sink: &mut dyn CommandSink,
        ch: &Character,
        image: &InlineImage,
        meta: CommandMeta,
    ) {
        let Some(frame) = self.images.get(&image.uuid) else {
            if !self.missing_image_warned.replace(true) {
                log::warn!("Text image '{}' has no bound sprite frame", image.uuid);
            }
            return;
        };
        let dst = |at: Vec2| Rect::new(at.x, at.y, ch.size.x, ch.size.y);
        if self.style().shadow && image.shadow {
            sink.push_command(
                DrawCommand::DrawTexturePro {
                    texture: frame.texture,
                    src: frame.src,
                    dst: dst(self.shadow_offset(ch)),
                    origin: Vec2::ZERO,
                    rotation: 0.0,
                    tint: Self::shadow_color(ch),
                },
                meta,
            );
        }
        let alpha = ch.color.a as f32 / 255.0;
        sink.push_command(
            DrawCommand::DrawTexturePro {
                texture: frame.texture,
                src: frame.src,
                dst: dst(Vec2::ZERO),
                origin: Vec2::ZERO,
                rotation: 0.0,
                tint: image.fg.fade(alpha * image.fg.a as f32 / 255.0),
            },
            meta,
        );
    }

    fn render_bounds(&self, sink: &mut dyn CommandSink, origin: Vec2, meta: CommandMeta) {
        let size = self.size();
        sink.push_command(
            DrawCommand::DrawRectanglePro {
                rect: Rect::new(origin.x, origin.y, size.x, size.y),
                origin: Vec2::ZERO,
                rotation: 0.0,
                color: Color::RED.fade(0.25),
            },
            meta,
        );
        sink.push_command(
            DrawCommand::DrawText {
                text: format!("{:.0}x{:.0}", size.x, size.y),
                font: self.style().font,
                position: origin - Vec2::new(0.0, self.style().font_size),
                size: self.style().font_size * 0.5,
                spacing: 0.0,
                color: Color::YELLOW,
            },
            meta,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::buffer::DrawCommandBuffer;
    use crate::draw::command::{DrawSpace, TextureId};
    use crate::draw::local::BatchedLocalCommands;
    use crate::shader::recorder::SpriteFrame;
    use crate::text::layout::MonospaceMetrics;
    use crate::text::object::TextStyle;

    fn text(raw: &str, shadow: bool) -> Text {
        let style = TextStyle {
            font_size: 10.0,
            spacing: 0.0,
            shadow,
            ..TextStyle::default()
        };
        Text::new(raw, style, &MonospaceMetrics::default(), 0.0)
    }

    fn labels(buffer: &DrawCommandBuffer) -> Vec<&'static str> {
        buffer.commands().iter().map(|c| c.command.label()).collect()
    }

    #[test]
    fn one_matrix_per_visible_character() {
        let t = text("a b", true);
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        let drawn = t.render(&mut buffer, Vec2::new(100.0, 50.0), CommandMeta::new(3, DrawSpace::Screen));
        assert_eq!(drawn, 2);
        let per_char = [
            "PushMatrix",
            "Translate",
            "Scale",
            "Rotate",
            "Translate",
            "DrawText",
            "DrawText",
            "PopMatrix",
        ];
        assert_eq!(labels(&buffer), [per_char, per_char].concat());

        match &buffer.commands()[1].command {
            // 'a' centered on its 5x10 cell.
            DrawCommand::Translate(at) => assert_eq!(*at, Vec2::new(102.5, 55.0)),
            other => panic!("unexpected {other:?}"),
        }
        match &buffer.commands()[5].command {
            DrawCommand::DrawText { color, position, .. } => {
                assert!((178..=179).contains(&color.a));
                assert!(position.x > 0.0 && position.y > 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(buffer.commands().iter().all(|c| c.meta.z == 3));
    }

    #[test]
    fn no_shadow_and_scramble_override() {
        let mut t = text("a", false);
        t.characters_mut()[0].override_codepoint = Some('#');
        let mut locals = BatchedLocalCommands::new();
        t.render(&mut locals, Vec2::ZERO, CommandMeta::default());
        let sorted = locals.take_sorted();
        let texts: Vec<String> = sorted
            .iter()
            .filter_map(|c| match &c.command {
                DrawCommand::DrawText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["#"]);
    }

    #[test]
    fn zero_scale_characters_are_skipped() {
        let mut t = text("ab", true);
        t.characters_mut()[0].scale = 0.0;
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        assert_eq!(t.render(&mut buffer, Vec2::ZERO, CommandMeta::default()), 1);
    }

    #[test]
    fn images_need_a_bound_frame() {
        let mut t = text("[img](uuid=coin)", true);
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        t.render(&mut buffer, Vec2::ZERO, CommandMeta::default());
        assert_eq!(
            labels(&buffer),
            vec!["PushMatrix", "Translate", "Scale", "Rotate", "Translate", "PopMatrix"]
        );

        t.bind_image(
            "coin",
            SpriteFrame {
                texture: TextureId(7),
                src: Rect::new(0.0, 0.0, 16.0, 16.0),
                atlas_size: Vec2::splat(64.0),
            },
        );
        buffer.clear();
        t.render(&mut buffer, Vec2::ZERO, CommandMeta::default());
        let textured = buffer
            .commands()
            .iter()
            .filter(|c| matches!(c.command, DrawCommand::DrawTexturePro { texture: TextureId(7), .. }))
            .count();
        assert_eq!(textured, 2);
    }

    #[test]
    fn debug_draws_bounds() {
        let style = TextStyle {
            font_size: 10.0,
            spacing: 0.0,
            shadow: false,
            debug: true,
            ..TextStyle::default()
        };
        let t = Text::new("ab", style, &MonospaceMetrics::default(), 0.0);
        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        t.render(&mut buffer, Vec2::ZERO, CommandMeta::default());
        let last = buffer.commands().last().expect("commands");
        match &last.command {
            DrawCommand::DrawText { text, .. } => assert_eq!(text, "10x10"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
