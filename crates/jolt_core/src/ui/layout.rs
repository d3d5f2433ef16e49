//! Two-pass layout of a UI box.
//!
//! `measure_tree` walks the tree post-order and stores every node's
//! unscaled content size. `place_tree` walks it again top-down, writes the
//! scaled sizes as transform actuals and rebuilds each child's role offset
//! from its container's alignment. The transform springs then carry the
//! nodes to their new targets.

use std::collections::HashMap;

use glam::Vec2;

use crate::entity::Entity;
use crate::text::layout::{measure_str, TextMeasure};
use crate::transform::system::TransformSystem;
use crate::ui::align::{child_offsets, stack_extent};
use crate::ui::config::{UiConfig, UiType};
use crate::ui::node::UiNode;

/// Text as laid out: one glyph per line when vertical.
pub fn text_content(config: &UiConfig) -> String {
    let text = config.text.as_deref().unwrap_or("");
    if config.vertical_text {
        text.chars()
            .filter(|c| *c != '\n')
            .map(String::from)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    }
}

/// Size of one node from its own options and its children's sizes.
pub fn content_size(
    config: &UiConfig,
    children: &[Vec2],
    transforms: &TransformSystem,
    measure: &dyn TextMeasure,
) -> Vec2 {
    let raw = match config.ui_type {
        UiType::Rect => Vec2::new(config.width.unwrap_or(0.0), config.height.unwrap_or(0.0)),
        UiType::Text => measure_str(
            measure,
            &text_content(config),
            config.font_size * config.scale,
            config.text_spacing,
        ),
        UiType::Object => config
            .object
            .and_then(|o| transforms.get(o))
            .map(|t| t.actual.size())
            .unwrap_or(Vec2::ZERO),
        UiType::Root | UiType::VContainer | UiType::HContainer => {
            let run = stack_extent(children, config.padding, config.ui_type.is_horizontal());
            Vec2::new(
                run.x.max(config.width.unwrap_or(0.0)),
                run.y.max(config.height.unwrap_or(0.0)),
            )
        }
    };
    let (w, h) = config.clamp_size(raw.x, raw.y);
    Vec2::new(w, h)
}

/// Stores the content size of `root` and everything below it.
pub fn measure_tree(
    nodes: &mut HashMap<Entity, UiNode>,
    root: Entity,
    transforms: &TransformSystem,
    measure: &dyn TextMeasure,
) -> Vec2 {
    let Some(children) = nodes.get(&root).map(|n| n.children.clone()) else {
        return Vec2::ZERO;
    };
    let sizes: Vec<Vec2> = children
        .iter()
        .map(|c| measure_tree(nodes, *c, transforms, measure))
        .collect();
    match nodes.get_mut(&root) {
        Some(node) => {
            let size = content_size(&node.config, &sizes, transforms, measure);
            node.state.content_size = size;
            size
        }
        None => Vec2::ZERO,
    }
}

/// Writes scaled sizes and child offsets for the subtree at `root`, whose
/// top-left goes to `origin`.
pub fn place_tree(
    nodes: &mut HashMap<Entity, UiNode>,
    root: Entity,
    origin: Vec2,
    transforms: &mut TransformSystem,
    ui_scale: f32,
) {
    if let Some(t) = transforms.get_mut(root) {
        t.set_position(origin.x, origin.y);
    }
    place_node(nodes, root, transforms, ui_scale);
}

fn place_node(
    nodes: &mut HashMap<Entity, UiNode>,
    entity: Entity,
    transforms: &mut TransformSystem,
    ui_scale: f32,
) {
    let Some(node) = nodes.get_mut(&entity) else {
        return;
    };
    node.state.render_scale = ui_scale;
    let size = node.state.content_size;
    if let Some(t) = transforms.get_mut(entity) {
        t.set_size(size.x * ui_scale, size.y * ui_scale);
    }
    if node.children.is_empty() {
        return;
    }

    let config = node.config.clone();
    let children = node.children.clone();
    let sizes: Vec<Vec2> = children
        .iter()
        .map(|c| nodes.get(c).map(|n| n.state.content_size).unwrap_or(Vec2::ZERO))
        .collect();
    for (child, offset) in children.iter().zip(child_offsets(&config, size, &sizes)) {
        transforms.set_role_offset(*child, offset * ui_scale);
        place_node(nodes, *child, transforms, ui_scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pose;
    use crate::text::layout::MonospaceMetrics;
    use crate::transform::role::{Alignment, Role};

    struct Tree {
        nodes: HashMap<Entity, UiNode>,
        transforms: TransformSystem,
        next: u32,
        root: Entity,
    }

    impl Tree {
        fn new(root_config: UiConfig) -> Self {
            let root = Entity::from_raw(0, 0);
            let mut transforms = TransformSystem::new();
            transforms.create(root, Pose::default());
            let mut nodes = HashMap::new();
            nodes.insert(root, UiNode::new(root, root_config, None, root));
            Self {
                nodes,
                transforms,
                next: 1,
                root,
            }
        }

        fn add(&mut self, parent: Entity, config: UiConfig) -> Entity {
            let e = Entity::from_raw(self.next, 0);
            self.next += 1;
            self.transforms.create(e, Pose::default());
            self.transforms
                .assign_role(e, Role::minor(parent, Vec2::ZERO))
                .expect("role");
            self.nodes
                .insert(e, UiNode::new(e, config, Some(parent), self.root));
            self.nodes.get_mut(&parent).expect("parent").children.push(e);
            e
        }

        fn run(&mut self, scale: f32) {
            let measure = MonospaceMetrics::default();
            measure_tree(&mut self.nodes, self.root, &self.transforms, &measure);
            place_tree(&mut self.nodes, self.root, Vec2::new(5.0, 5.0), &mut self.transforms, scale);
        }

        fn offset(&self, e: Entity) -> Vec2 {
            self.transforms.role(e).expect("role").offset
        }
    }

    #[test]
    fn three_rects_with_padding() {
        let mut tree = Tree::new(UiConfig::new(UiType::Root));
        let row = tree.add(tree.root, UiConfig::container(UiType::HContainer, 4.0));
        let rects: Vec<Entity> = (0..3)
            .map(|_| tree.add(row, UiConfig::rect(20.0, 20.0)))
            .collect();
        tree.run(1.0);

        assert_eq!(tree.nodes[&row].state.content_size, Vec2::new(68.0, 20.0));
        assert_eq!(tree.offset(rects[2]), Vec2::new(48.0, 0.0));
        let actual = tree.transforms.get(tree.root).expect("root").actual;
        assert_eq!((actual.x, actual.y, actual.w, actual.h), (5.0, 5.0, 68.0, 20.0));
    }

    #[test]
    fn min_max_clamp_containers() {
        let mut config = UiConfig::container(UiType::VContainer, 0.0);
        config.min_width = Some(50.0);
        config.max_height = Some(15.0);
        let mut tree = Tree::new(UiConfig::new(UiType::Root));
        let column = tree.add(tree.root, config);
        tree.add(column, UiConfig::rect(10.0, 10.0));
        tree.add(column, UiConfig::rect(10.0, 10.0));
        tree.run(1.0);
        assert_eq!(tree.nodes[&column].state.content_size, Vec2::new(50.0, 15.0));
    }

    #[test]
    fn text_and_object_sizes() {
        let mut tree = Tree::new(UiConfig::new(UiType::Root));
        let mut label = UiConfig::text("abcd");
        label.font_size = 10.0;
        label.text_spacing = 0.0;
        let text = tree.add(tree.root, label);

        let card = Entity::from_raw(99, 0);
        tree.transforms.create(card, Pose::rect(0.0, 0.0, 30.0, 40.0));
        let mut embed = UiConfig::new(UiType::Object);
        embed.object = Some(card);
        let object = tree.add(tree.root, embed);

        let mut vertical = UiConfig::text("abc");
        vertical.font_size = 10.0;
        vertical.vertical_text = true;
        let column = tree.add(tree.root, vertical);

        tree.run(1.0);
        assert_eq!(tree.nodes[&text].state.content_size, Vec2::new(20.0, 10.0));
        assert_eq!(tree.nodes[&object].state.content_size, Vec2::new(30.0, 40.0));
        assert_eq!(tree.nodes[&column].state.content_size, Vec2::new(5.0, 30.0));
        // Root stacks vertically.
        assert_eq!(tree.offset(object), Vec2::new(0.0, 10.0));
    }

    #[test]
    fn alignment_is_idempotent() {
        let mut root = UiConfig::new(UiType::Root);
        root.width = Some(100.0);
        root.height = Some(100.0);
        root.align = Alignment::H_CENTER | Alignment::V_CENTER;
        let mut tree = Tree::new(root);
        let child = tree.add(tree.root, UiConfig::rect(20.0, 10.0));
        tree.run(1.0);
        let first = tree.offset(child);
        tree.run(1.0);
        assert_eq!(tree.offset(child), first);
        assert_eq!(first, Vec2::new(40.0, 45.0));
    }

    #[test]
    fn ui_scale_multiplies_sizes_and_offsets() {
        let mut tree = Tree::new(UiConfig::container(UiType::Root, 2.0));
        tree.add(tree.root, UiConfig::rect(10.0, 10.0));
        let second = tree.add(tree.root, UiConfig::rect(10.0, 10.0));
        tree.run(2.0);
        assert_eq!(tree.offset(second), Vec2::new(0.0, 24.0));
        let t = tree.transforms.get(second).expect("transform");
        assert_eq!(t.actual.size(), Vec2::new(20.0, 20.0));
        assert_eq!(tree.nodes[&second].state.render_scale, 2.0);
        // Content sizes stay unscaled.
        assert_eq!(tree.nodes[&tree.root].state.content_size, Vec2::new(10.0, 22.0));
    }
}
