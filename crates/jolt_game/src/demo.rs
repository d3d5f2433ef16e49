//! Demo scene: a row of animated cards in world space, a title text and a
//! menu box built from `assets/ui/demo_menu.json`.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;
use jolt_core::animation::{AnimationClip, AnimationFrame};
use jolt_core::color::Color;
use jolt_core::draw::{DrawSpace, TextureId};
use jolt_core::event::Payload;
use jolt_core::globals;
use jolt_core::math::{Pose, Rect};
use jolt_core::shader::recorder::SpriteFrame;
use jolt_core::shader::registry::ShaderInfo;
use jolt_core::text::TextStyle;
use jolt_core::ui::UiTemplate;
use jolt_core::world::{SpriteStyle, World};
use jolt_core::{CoreResult, Entity};
use jolt_render::{GpuContext, GpuMesh, MeshBackend, RenderError, SpritePipeline, Texture};

const MENU_TEMPLATE: &str = include_str!("../../../assets/ui/demo_menu.json");
const CARD_TEXTURE: TextureId = TextureId(1);
const CARD_ATLAS_SIZE: u32 = 64;
const CARD_COUNT: usize = 5;
const CARD_SIZE: Vec2 = Vec2::new(64.0, 88.0);
const CARD_GAP: f32 = 24.0;

pub fn load_textures(
    gpu: &GpuContext,
    pipeline: &SpritePipeline,
    gpu_mesh: &mut GpuMesh,
    mesh: &mut MeshBackend,
) -> Result<(), RenderError> {
    let white = Texture::white(&gpu.device, &gpu.queue)?;
    gpu_mesh.insert_texture(&gpu.device, pipeline, mesh, TextureId::WHITE, white);
    let cards = Texture::checkerboard(&gpu.device, &gpu.queue, CARD_ATLAS_SIZE, 8, "cards")?;
    gpu_mesh.insert_texture(&gpu.device, pipeline, mesh, CARD_TEXTURE, cards);
    Ok(())
}

pub struct Demo {
    pub cards: Vec<Entity>,
    pub menu: Entity,
    pub title: Entity,
    shuffle_requested: Rc<Cell<bool>>,
}

impl Demo {
    pub fn build(world: &mut World, viewport: Vec2) -> CoreResult<Self> {
        let half = CARD_ATLAS_SIZE as f32 * 0.5;
        let atlas_size = Vec2::splat(CARD_ATLAS_SIZE as f32);
        for (name, x) in [("card_a", 0.0), ("card_b", half)] {
            world.sprite_frames.insert(
                name.to_string(),
                SpriteFrame {
                    texture: CARD_TEXTURE,
                    src: Rect::new(x, 0.0, half, half),
                    atlas_size,
                },
            );
        }
        globals::register_shader(ShaderInfo::new("dissolve"))?;

        let row_width = CARD_COUNT as f32 * (CARD_SIZE.x + CARD_GAP) - CARD_GAP;
        let left = (viewport.x - row_width) * 0.5;
        let top = viewport.y * 0.5;
        let cards: Vec<Entity> = (0..CARD_COUNT)
            .map(|i| {
                let x = left + i as f32 * (CARD_SIZE.x + CARD_GAP);
                world.spawn_sprite(
                    Pose::rect(x, top, CARD_SIZE.x, CARD_SIZE.y),
                    card_clip(i),
                    SpriteStyle {
                        fg: Color::WHITE,
                        z: i as i32,
                        ..SpriteStyle::default()
                    },
                )
            })
            .collect();
        if let Some(&first) = cards.first() {
            world.pipeline_mut(first).add_pass("dissolve");
        }

        let title = world.spawn_text(
            "[Jolt](float=2) runtime",
            TextStyle::default(),
            Vec2::new(24.0, viewport.y - 40.0),
            10,
            DrawSpace::Screen,
        );

        let shuffle_requested = Rc::new(Cell::new(false));
        let flag = Rc::clone(&shuffle_requested);
        world
            .ui
            .callbacks_mut()
            .register("shuffle", Rc::new(move |_: Entity| flag.set(true)));
        world.events.subscribe_named(
            "cheered",
            Rc::new(|payload: &Payload| {
                let shuffles = payload.get("shuffles").map(ToString::to_string);
                log::info!("Cheered after {} shuffles", shuffles.as_deref().unwrap_or("?"));
            }),
        );
        world.events.subscribe_named(
            "script_ready",
            Rc::new(|_: &Payload| log::info!("Demo script ready")),
        );

        let template = UiTemplate::from_json(MENU_TEMPLATE)?;
        let menu = world.create_ui(&template, Vec2::new(24.0, 24.0))?;

        log::info!("Demo scene built: {} cards", cards.len());
        Ok(Self {
            cards,
            menu,
            title,
            shuffle_requested,
        })
    }

    pub fn juice_all(&self, world: &mut World, now: f64) {
        for &card in &self.cards {
            world.transforms.inject_dynamic_motion(card, now, 0.4, None, true);
        }
    }

    /// Runs a shuffle requested by the menu since the last step.
    pub fn apply_pending(&mut self, world: &mut World, now: f64) {
        if !self.shuffle_requested.replace(false) {
            return;
        }
        let slots: Vec<(f32, f32)> = self
            .cards
            .iter()
            .filter_map(|&card| world.transforms.get(card))
            .map(|t| (t.actual.x, t.actual.y))
            .collect();
        if slots.len() != self.cards.len() {
            log::warn!("Shuffle skipped: a card lost its transform");
            return;
        }
        for (i, &card) in self.cards.iter().enumerate() {
            let (x, y) = slots[(i + 1) % slots.len()];
            if let Some(t) = world.transforms.get_mut(card) {
                t.actual.x = x;
                t.actual.y = y;
            }
            world.transforms.inject_dynamic_motion(card, now, 0.3, None, false);
        }

        let mut payload = Payload::new();
        payload.insert("count".into(), (self.cards.len() as i64).into());
        if let Some(&first) = self.cards.first() {
            payload.insert("first".into(), first.into());
        }
        world.events.publish_named("shuffled", &payload);
    }
}

fn card_clip(seed: usize) -> AnimationClip {
    let frame = |id: &str, ms: u64| AnimationFrame {
        sprite_id: id.to_string(),
        duration_us: ms * 1000,
    };
    AnimationClip {
        frames: vec![frame("card_a", 400 + seed as u64 * 40), frame("card_b", 400)],
        looping: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_core::draw::RenderBackend;
    use jolt_core::input::InputState;
    use jolt_core::FrameContext;
    use std::sync::Once;

    static GLOBALS: Once = Once::new();

    fn build() -> (World, Demo) {
        GLOBALS.call_once(|| globals::init(globals::GlobalSettings::default()));
        let mut world = World::default();
        let demo = Demo::build(&mut world, Vec2::new(1280.0, 720.0)).expect("demo");
        (world, demo)
    }

    #[test]
    fn menu_shuffle_rotates_cards() {
        let (mut world, mut demo) = build();
        assert_eq!(demo.cards.len(), CARD_COUNT);
        assert!(world.ui.ui_box(demo.menu).is_some());
        assert!(world.texts.contains_key(&demo.title));

        let before: Vec<f32> = demo
            .cards
            .iter()
            .map(|&c| world.transforms.get(c).expect("card").actual.x)
            .collect();
        let shuffle = world.ui.callbacks().callback("shuffle").expect("shuffle");
        shuffle(demo.menu);
        demo.apply_pending(&mut world, 1.0);

        let after = world.transforms.get(demo.cards[0]).expect("card").actual.x;
        assert!((after - before[1]).abs() < 1e-3);
        assert!(world.events.has_occurred("shuffled"));

        demo.apply_pending(&mut world, 2.0);
        let again = world.transforms.get(demo.cards[0]).expect("card").actual.x;
        assert!((again - after).abs() < 1e-3);
    }

    #[test]
    fn demo_frame_reaches_the_mesh() {
        let (mut world, _demo) = build();
        let mut mesh = MeshBackend::new();
        mesh.register_texture(CARD_TEXTURE, CARD_ATLAS_SIZE, CARD_ATLAS_SIZE);
        let input = InputState::new();
        let mut ctx = FrameContext::new(1, 0.0, 1.0 / 60.0);
        for _ in 0..3 {
            mesh.begin_frame();
            assert!(mesh.is_ready());
            let stats = world.frame(&ctx, &input, &mut mesh).expect("frame");
            assert!(stats.recorded > 0);
            ctx = ctx.next(1.0 / 60.0);
        }
        let calls = mesh.draw_calls();
        assert!(calls.iter().any(|c| c.texture == CARD_TEXTURE && c.space == DrawSpace::World));
        assert!(calls.iter().any(|c| c.space == DrawSpace::Screen));
        assert!(calls.iter().any(|c| c.shader.as_deref() == Some("dissolve")));
    }
}
