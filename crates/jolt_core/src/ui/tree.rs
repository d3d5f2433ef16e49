//! The UI registry: every box, every node, and the per-frame pass that
//! lays them out, tracks the pointer and fires button callbacks.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;

use crate::draw::buffer::DrawCommandBuffer;
use crate::draw::command::CommandMeta;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{CoreError, CoreResult};
use crate::input::InputState;
use crate::math::Pose;
use crate::text::layout::TextMeasure;
use crate::time::FrameContext;
use crate::transform::role::Role;
use crate::transform::system::TransformSystem;
use crate::ui::button::{self, ClickOutcome};
use crate::ui::config::{UiConfig, UiType};
use crate::ui::definition::UiTemplate;
use crate::ui::draw::record_node;
use crate::ui::hit_test::pick;
use crate::ui::layout::{measure_tree, place_tree};
use crate::ui::node::{UiBox, UiCallback, UiNode, UpdateFn};

/// Juice applied to a button when its callback fires.
pub const CLICK_JUICE: f32 = 0.4;

/// Reads a reflected value as text: `(entity, component, field)`.
pub type RefResolver = Box<dyn Fn(Entity, &str, &str) -> Option<String>>;

/// Named closures that templates refer to.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, UiCallback>,
    updates: HashMap<String, UpdateFn>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Used for `button_callback`, `click_callback` and `init_func`.
    pub fn register(&mut self, name: &str, callback: UiCallback) {
        self.callbacks.insert(name.to_string(), callback);
    }

    /// Used for `update_func`.
    pub fn register_update(&mut self, name: &str, update: UpdateFn) {
        self.updates.insert(name.to_string(), update);
    }

    pub fn callback(&self, name: &str) -> Option<UiCallback> {
        self.callbacks.get(name).cloned()
    }

    pub fn update_fn(&self, name: &str) -> Option<UpdateFn> {
        self.updates.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct UiRegistry {
    boxes: BTreeMap<Entity, UiBox>,
    nodes: HashMap<Entity, UiNode>,
    callbacks: CallbackRegistry,
    ref_resolver: Option<RefResolver>,
    hovered: Option<Entity>,
    pressed: Option<Entity>,
}

impl UiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    pub fn set_ref_resolver(&mut self, resolver: impl Fn(Entity, &str, &str) -> Option<String> + 'static) {
        self.ref_resolver = Some(Box::new(resolver));
    }

    /// Builds a new box from a root template with its top-left at `position`.
    pub fn create_box(
        &mut self,
        template: &UiTemplate,
        position: Vec2,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> CoreResult<Entity> {
        template.validate()?;
        let root = self.spawn_root(template.to_config(), position, entities, transforms);
        for child in &template.children {
            if let Err(e) = self.build(root, child, entities, transforms) {
                self.remove_box(root, entities, transforms);
                return Err(e);
            }
        }
        log::info!(
            "UI box {root} created with {} nodes",
            template.node_count()
        );
        Ok(root)
    }

    fn build(
        &mut self,
        parent: Entity,
        template: &UiTemplate,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> CoreResult<()> {
        let entity = self.add_node(parent, template.to_config(), entities, transforms)?;
        for child in &template.children {
            self.build(entity, child, entities, transforms)?;
        }
        Ok(())
    }

    /// A box with a bare root, for trees built in code.
    pub fn create_empty_box(
        &mut self,
        position: Vec2,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> Entity {
        let root = self.spawn_root(UiConfig::new(UiType::Root), position, entities, transforms);
        log::info!("UI box {root} created");
        root
    }

    fn spawn_root(
        &mut self,
        config: UiConfig,
        position: Vec2,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> Entity {
        let root = entities.spawn();
        transforms.create(root, Pose::rect(position.x, position.y, 0.0, 0.0));
        let mut ui_box = UiBox::new(root, position);
        ui_box.nodes.push(root);
        if let Some(layer) = &config.draw_layer {
            ui_box.add_draw_layer(layer);
        }
        let mut node = UiNode::new(root, config, None, root);
        self.attach_update(&mut node);
        self.nodes.insert(root, node);
        self.boxes.insert(root, ui_box);
        root
    }

    /// Adds a node under a container. The node follows its parent through a
    /// strongly bonded Minor role; layout fills in the offset.
    pub fn add_node(
        &mut self,
        parent: Entity,
        config: UiConfig,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> CoreResult<Entity> {
        let Some(parent_node) = self.nodes.get(&parent) else {
            return Err(CoreError::Config(format!("UI parent {parent} does not exist")));
        };
        if !parent_node.config.ui_type.is_container() {
            return Err(CoreError::Config(format!(
                "cannot add a child to {parent}: it is a {}",
                parent_node.config.ui_type
            )));
        }
        if config.ui_type == UiType::Root {
            return Err(CoreError::Config(format!(
                "a root node cannot be added under {parent}"
            )));
        }
        let owning_box = parent_node.owning_box;

        let entity = entities.spawn();
        let origin = transforms
            .get(parent)
            .map(|t| t.actual.position())
            .unwrap_or(Vec2::ZERO);
        let size = Vec2::new(config.width.unwrap_or(0.0), config.height.unwrap_or(0.0));
        transforms.create(entity, Pose::rect(origin.x, origin.y, size.x, size.y));
        if let Err(e) = transforms.assign_role(entity, Role::minor(parent, Vec2::ZERO)) {
            transforms.remove(entity);
            entities.despawn(entity);
            return Err(e);
        }

        if let Some(object) = config.object {
            let embedded = transforms.assign_role(object, Role::minor(entity, Vec2::ZERO));
            if let Err(e) = embedded {
                log::warn!("UI node {entity}: cannot embed object {object}: {e}");
            }
        }

        let init = config.init_func.clone();
        let layer = config.draw_layer.clone();
        let mut node = UiNode::new(entity, config, Some(parent), owning_box);
        self.attach_update(&mut node);
        self.nodes.insert(entity, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(entity);
        }
        if let Some(ui_box) = self.boxes.get_mut(&owning_box) {
            ui_box.nodes.push(entity);
            ui_box.layout_dirty = true;
            if let Some(layer) = &layer {
                ui_box.add_draw_layer(layer);
            }
        }

        if let Some(name) = init {
            match self.callbacks.callback(&name) {
                Some(init) => init(entity),
                None => log::warn!(
                    "{}",
                    CoreError::Config(format!("UI node {entity}: unknown init_func '{name}'"))
                ),
            }
        }
        Ok(entity)
    }

    fn attach_update(&self, node: &mut UiNode) {
        let Some(name) = &node.config.update_func else {
            return;
        };
        match self.callbacks.update_fn(name) {
            Some(update) => node.hooks.update = Some(update),
            None => log::warn!(
                "{}",
                CoreError::Config(format!(
                    "UI node {}: unknown update_func '{name}'",
                    node.entity
                ))
            ),
        }
    }

    /// Removes `entity` and its subtree, their transforms and entity ids.
    /// Embedded objects are released, not destroyed.
    pub fn remove_node(
        &mut self,
        entity: Entity,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> Vec<Entity> {
        let mut subtree = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if let Some(object) = node.config.object {
                    if transforms.contains(object) {
                        let _ = transforms.assign_role(object, Role::major());
                    }
                }
                stack.extend(node.children.iter().copied());
                subtree.push((current, node.parent, node.owning_box));
            }
        }
        let Some((_, parent, owning_box)) = subtree.first().copied() else {
            return Vec::new();
        };

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != entity);
        }
        transforms.remove(entity);

        let removed: Vec<Entity> = subtree.iter().map(|(e, _, _)| *e).collect();
        for e in &removed {
            entities.despawn(*e);
            if self.hovered == Some(*e) {
                self.hovered = None;
            }
            if self.pressed == Some(*e) {
                self.pressed = None;
            }
        }
        if owning_box == entity {
            self.boxes.remove(&entity);
        } else if let Some(ui_box) = self.boxes.get_mut(&owning_box) {
            ui_box.nodes.retain(|n| !removed.contains(n));
            ui_box.layout_dirty = true;
        }
        log::debug!("Removed {} UI nodes under {entity}", removed.len());
        removed
    }

    pub fn remove_box(
        &mut self,
        root: Entity,
        entities: &mut EntityAllocator,
        transforms: &mut TransformSystem,
    ) -> bool {
        if !self.boxes.contains_key(&root) {
            return false;
        }
        let removed = self.remove_node(root, entities, transforms);
        log::info!("UI box {root} removed ({} nodes)", removed.len());
        true
    }

    pub fn node(&self, entity: Entity) -> Option<&UiNode> {
        self.nodes.get(&entity)
    }

    pub fn node_mut(&mut self, entity: Entity) -> Option<&mut UiNode> {
        self.nodes.get_mut(&entity)
    }

    pub fn ui_box(&self, root: Entity) -> Option<&UiBox> {
        self.boxes.get(&root)
    }

    pub fn ui_box_mut(&mut self, root: Entity) -> Option<&mut UiBox> {
        self.boxes.get_mut(&root)
    }

    pub fn boxes(&self) -> impl Iterator<Item = &UiBox> {
        self.boxes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn hovered(&self) -> Option<Entity> {
        self.hovered
    }

    pub fn find_by_id(&self, root: Entity, id: &str) -> Option<Entity> {
        self.boxes.get(&root)?.nodes.iter().copied().find(|e| {
            self.nodes
                .get(e)
                .is_some_and(|n| n.config.id.as_deref() == Some(id))
        })
    }

    fn mark_dirty(&mut self, root: Entity) {
        if let Some(ui_box) = self.boxes.get_mut(&root) {
            ui_box.layout_dirty = true;
        }
    }

    /// Replaces a node's text; the box is laid out again if it changed.
    pub fn set_text(&mut self, entity: Entity, text: &str) -> bool {
        let Some(node) = self.nodes.get_mut(&entity) else {
            return false;
        };
        let owning_box = node.owning_box;
        let changed = node.set_text(text);
        if changed {
            self.mark_dirty(owning_box);
        }
        changed
    }

    /// Edits a node's options and schedules a layout.
    pub fn configure(&mut self, entity: Entity, edit: impl FnOnce(&mut UiConfig)) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            edit(&mut node.config);
            let owning_box = node.owning_box;
            self.mark_dirty(owning_box);
        }
    }

    pub fn layout(
        &mut self,
        root: Entity,
        transforms: &mut TransformSystem,
        measure: &dyn TextMeasure,
        ui_scale: f32,
    ) {
        let Some(ui_box) = self.boxes.get_mut(&root) else {
            return;
        };
        ui_box.layout_dirty = false;
        let position = ui_box.position;
        measure_tree(&mut self.nodes, root, transforms, measure);
        place_tree(&mut self.nodes, root, position, transforms, ui_scale);
    }

    /// Lays out every box whose dirty flag is set. Returns how many ran.
    pub fn layout_dirty(
        &mut self,
        transforms: &mut TransformSystem,
        measure: &dyn TextMeasure,
        ui_scale: f32,
    ) -> usize {
        let dirty: Vec<Entity> = self
            .boxes
            .values()
            .filter(|b| b.layout_dirty)
            .map(|b| b.root)
            .collect();
        for root in &dirty {
            self.layout(*root, transforms, measure, ui_scale);
        }
        dirty.len()
    }

    /// One UI frame: reflected values, layout, hover, clicks, releases and
    /// update hooks, in that order.
    pub fn update(
        &mut self,
        ctx: &FrameContext,
        input: &InputState,
        transforms: &mut TransformSystem,
        measure: &dyn TextMeasure,
        ui_scale: f32,
    ) {
        self.refresh_references();
        self.layout_dirty(transforms, measure, ui_scale);
        self.update_hover(input.cursor_position, ctx, transforms);

        if input.cursor_pressed() {
            if let Some(entity) = self.hovered {
                self.pressed = Some(entity);
                self.click(entity, ctx.now, transforms);
            }
        }
        if input.cursor_released() {
            if let Some(entity) = self.pressed.take() {
                let hook = self.nodes.get(&entity).and_then(|n| n.hooks.on_release.clone());
                if let Some(hook) = hook {
                    hook(entity);
                }
            }
        }
        self.run_update_hooks(ctx);
    }

    fn refresh_references(&mut self) {
        let Some(resolver) = &self.ref_resolver else {
            return;
        };
        let mut dirty = Vec::new();
        for node in self.nodes.values_mut() {
            let (Some(entity), Some(component), Some(field)) = (
                node.config.ref_entity,
                node.config.ref_component.as_deref(),
                node.config.ref_field.as_deref(),
            ) else {
                continue;
            };
            if let Some(value) = resolver(entity, component, field) {
                if node.set_text(&value) {
                    dirty.push(node.owning_box);
                }
            }
        }
        for root in dirty {
            self.mark_dirty(root);
        }
    }

    /// Topmost interactive node under `point`, across every box that takes
    /// part in collision.
    pub fn hit_test(&self, point: Vec2, transforms: &TransformSystem, now: f64) -> Option<Entity> {
        let mut boxes: Vec<&UiBox> = self.boxes.values().filter(|b| b.collision_enabled).collect();
        boxes.sort_by_key(|b| b.z);
        let candidates = boxes.iter().flat_map(|b| b.nodes.iter()).filter_map(|e| {
            let node = self.nodes.get(e)?;
            if !node.config.is_interactive() && node.hooks.on_click.is_none() {
                return None;
            }
            let pose = transforms.get(*e)?.visual_with_hover_and_dynamic_motion(now);
            Some((*e, pose, node.state.hovered))
        });
        pick(candidates, point)
    }

    fn update_hover(&mut self, point: Vec2, ctx: &FrameContext, transforms: &mut TransformSystem) {
        let hit = self.hit_test(point, transforms, ctx.now);
        if hit != self.hovered {
            if let Some(old) = self.hovered.take() {
                if let Some(node) = self.nodes.get_mut(&old) {
                    node.state.hovered = false;
                    node.state.focus_timer = 0.0;
                    if let Some(hook) = node.hooks.on_stop_hover.clone() {
                        hook(old);
                    }
                }
                if let Some(t) = transforms.get_mut(old) {
                    t.hovered = false;
                }
            }
            if let Some(new) = hit {
                if let Some(node) = self.nodes.get_mut(&new) {
                    node.state.hovered = true;
                    if let Some(t) = transforms.get_mut(new) {
                        t.hovered = node.config.hover || node.config.is_button();
                    }
                    if let Some(hook) = node.hooks.on_hover.clone() {
                        hook(new);
                    }
                }
            }
            self.hovered = hit;
        }
        if let Some(node) = self.hovered.and_then(|e| self.nodes.get_mut(&e)) {
            node.state.focus_timer += ctx.dt;
        }
    }

    /// Clicks `entity` at `now` and runs its callback when it fires.
    pub fn click(&mut self, entity: Entity, now: f64, transforms: &mut TransformSystem) -> ClickOutcome {
        let Some(node) = self.nodes.get_mut(&entity) else {
            return ClickOutcome::NotAButton;
        };
        let outcome = button::click(node, now);
        log::debug!("UI click on {entity}: {outcome}");
        if outcome != ClickOutcome::Fired {
            return outcome;
        }

        let hook = node.hooks.on_click.clone();
        let name = node
            .config
            .button_callback
            .clone()
            .or_else(|| node.config.click_callback.clone());
        let radio = node
            .config
            .choice
            .then(|| (node.owning_box, node.config.group.clone()));

        let callback = hook.or_else(|| {
            let name = name?;
            let found = self.callbacks.callback(&name);
            if found.is_none() {
                log::warn!(
                    "{}",
                    CoreError::Config(format!("UI node {entity}: unknown callback '{name}'"))
                );
            }
            found
        });
        if let Some((owning_box, group)) = radio {
            self.choose(entity, owning_box, group.as_deref());
        }
        transforms.inject_dynamic_motion(entity, now, CLICK_JUICE, None, false);
        if let Some(callback) = callback {
            callback(entity);
        }
        outcome
    }

    fn choose(&mut self, entity: Entity, owning_box: Entity, group: Option<&str>) {
        let Some(members) = self.boxes.get(&owning_box).map(|b| b.nodes.clone()) else {
            return;
        };
        for member in members {
            if let Some(node) = self.nodes.get_mut(&member) {
                if node.config.choice && node.config.group.as_deref() == group {
                    node.config.chosen = member == entity;
                }
            }
        }
    }

    fn run_update_hooks(&mut self, ctx: &FrameContext) {
        let mut hooked: Vec<(Entity, UpdateFn)> = self
            .nodes
            .iter()
            .filter_map(|(e, n)| n.hooks.update.clone().map(|f| (*e, f)))
            .collect();
        hooked.sort_by_key(|(e, _)| *e);
        for (entity, update) in hooked {
            if let Some(node) = self.nodes.get_mut(&entity) {
                update(node, ctx);
            }
        }
    }

    /// Records every node of one box, parents before children.
    pub fn record(
        &mut self,
        root: Entity,
        transforms: &TransformSystem,
        buffer: &mut DrawCommandBuffer,
        now: f64,
    ) -> usize {
        let Some(ui_box) = self.boxes.get(&root) else {
            return 0;
        };
        let plan: Vec<(Entity, CommandMeta)> = ui_box
            .nodes
            .iter()
            .filter_map(|e| {
                let node = self.nodes.get(e)?;
                let z = ui_box.layer_z(node.config.draw_layer.as_deref());
                Some((*e, CommandMeta::new(z, ui_box.space)))
            })
            .collect();

        let mut recorded = 0;
        for (entity, meta) in plan {
            let Some(pose) = transforms
                .get(entity)
                .map(|t| t.visual_with_hover_and_dynamic_motion(now))
            else {
                continue;
            };
            if let Some(node) = self.nodes.get_mut(&entity) {
                record_node(node, &pose, buffer, meta, now);
                recorded += 1;
            }
        }
        recorded
    }

    pub fn record_all(&mut self, transforms: &TransformSystem, buffer: &mut DrawCommandBuffer, now: f64) -> usize {
        let roots: Vec<Entity> = self.boxes.keys().copied().collect();
        roots
            .into_iter()
            .map(|root| self.record(root, transforms, buffer, now))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseBtn;
    use crate::text::layout::MonospaceMetrics;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Fixture {
        ui: UiRegistry,
        entities: EntityAllocator,
        transforms: TransformSystem,
        ctx: FrameContext,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ui: UiRegistry::new(),
                entities: EntityAllocator::new(),
                transforms: TransformSystem::new(),
                ctx: FrameContext::new(0, 0.0, 1.0 / 60.0),
            }
        }

        fn build(&mut self, json: &str, position: Vec2) -> Entity {
            let template = UiTemplate::from_json(json).expect("template");
            self.ui
                .create_box(&template, position, &mut self.entities, &mut self.transforms)
                .expect("box")
        }

        /// Runs enough frames for the springs to settle.
        fn settle(&mut self, input: &InputState) {
            for _ in 0..120 {
                self.ctx = self.ctx.next(1.0 / 60.0);
                self.ui.update(
                    &self.ctx,
                    input,
                    &mut self.transforms,
                    &MonospaceMetrics::default(),
                    1.0,
                );
                self.transforms.update(&self.ctx).expect("transform update");
            }
        }
    }

    const ROW: &str = r#"{
        "type": "root",
        "children": [
            { "type": "h_container", "id": "row", "padding": 4, "children": [
                { "type": "rect", "id": "a", "width": 20, "height": 20, "button_callback": "pick" },
                { "type": "rect", "id": "b", "width": 20, "height": 20 },
                { "type": "rect", "id": "c", "width": 20, "height": 20 }
            ] }
        ]
    }"#;

    #[test]
    fn template_box_lays_out_and_settles() {
        let mut f = Fixture::new();
        let root = f.build(ROW, Vec2::new(100.0, 50.0));
        assert_eq!(f.ui.node_count(), 5);
        assert_eq!(f.ui.ui_box(root).expect("box").nodes.len(), 5);

        f.settle(&InputState::new());
        let row = f.ui.find_by_id(root, "row").expect("row");
        assert_eq!(f.ui.node(row).expect("node").state.content_size, Vec2::new(68.0, 20.0));
        let c = f.ui.find_by_id(root, "c").expect("c");
        let visual = f.transforms.get(c).expect("transform").visual;
        assert!((visual.x - 148.0).abs() < 1e-2);
        assert!((visual.y - 50.0).abs() < 1e-2);
        assert!(!f.ui.ui_box(root).expect("box").layout_dirty);
    }

    #[test]
    fn pointer_hover_and_click() {
        let mut f = Fixture::new();
        let picked = Rc::new(Cell::new(0));
        let counter = picked.clone();
        f.ui
            .callbacks_mut()
            .register("pick", Rc::new(move |_| counter.set(counter.get() + 1)));
        let root = f.build(ROW, Vec2::ZERO);
        let a = f.ui.find_by_id(root, "a").expect("a");

        let mut input = InputState::new();
        input.cursor_position = Vec2::new(10.0, 10.0);
        f.settle(&input);
        assert_eq!(f.ui.hovered(), Some(a));
        assert!(f.transforms.get(a).expect("transform").hovered);

        input.mouse_down(MouseBtn::Left);
        f.ctx = f.ctx.next(1.0 / 60.0);
        f.ui.update(&f.ctx, &input, &mut f.transforms, &MonospaceMetrics::default(), 1.0);
        assert_eq!(picked.get(), 1);
        assert!(f.transforms.get(a).expect("transform").motion.is_some());

        // Moving away clears the hover.
        input.end_frame();
        input.cursor_position = Vec2::new(500.0, 500.0);
        f.ctx = f.ctx.next(1.0 / 60.0);
        f.ui.update(&f.ctx, &input, &mut f.transforms, &MonospaceMetrics::default(), 1.0);
        assert_eq!(f.ui.hovered(), None);
    }

    #[test]
    fn delayed_button_scenario() {
        let mut f = Fixture::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        f.ui
            .callbacks_mut()
            .register("go", Rc::new(move |_| flag.set(true)));
        let root = f.build(
            r#"{ "type": "root", "children": [
                { "type": "rect", "id": "go", "width": 10, "height": 10,
                  "button_callback": "go", "button_delay": 0.5 } ] }"#,
            Vec2::ZERO,
        );
        let go = f.ui.find_by_id(root, "go").expect("button");
        assert_eq!(f.ui.click(go, 0.0, &mut f.transforms), ClickOutcome::DelayStarted);
        assert_eq!(f.ui.click(go, 0.3, &mut f.transforms), ClickOutcome::DelayPending);
        assert!(!fired.get());
        assert_eq!(f.ui.click(go, 0.6, &mut f.transforms), ClickOutcome::Fired);
        assert!(fired.get());
    }

    #[test]
    fn radio_group_keeps_one_chosen() {
        let mut f = Fixture::new();
        let root = f.build(
            r#"{ "type": "root", "children": [
                { "type": "rect", "id": "x", "choice": true, "group": "size", "chosen": true },
                { "type": "rect", "id": "y", "choice": true, "group": "size" },
                { "type": "rect", "id": "z", "choice": true, "group": "other", "chosen": true } ] }"#,
            Vec2::ZERO,
        );
        let id = |name: &str| f.ui.find_by_id(root, name).expect("node");
        let (x, y, z) = (id("x"), id("y"), id("z"));
        assert_eq!(f.ui.click(y, 1.0, &mut f.transforms), ClickOutcome::Fired);
        let chosen = |e: Entity| f.ui.node(e).expect("node").config.chosen;
        assert!(!chosen(x));
        assert!(chosen(y));
        assert!(chosen(z));
    }

    #[test]
    fn remove_box_cleans_everything() {
        let mut f = Fixture::new();
        let card = f.entities.spawn();
        f.transforms.create(card, Pose::rect(0.0, 0.0, 30.0, 40.0));
        let root = f.build(ROW, Vec2::ZERO);
        let row = f.ui.find_by_id(root, "row").expect("row");
        let mut embed = UiConfig::new(UiType::Object);
        embed.object = Some(card);
        f.ui
            .add_node(row, embed, &mut f.entities, &mut f.transforms)
            .expect("object node");
        assert_eq!(f.transforms.role(card).expect("role").master.is_some(), true);

        assert!(f.ui.remove_box(root, &mut f.entities, &mut f.transforms));
        assert_eq!(f.ui.node_count(), 0);
        assert!(f.ui.ui_box(root).is_none());
        assert!(!f.entities.is_alive(root));
        assert_eq!(f.transforms.len(), 1);
        assert!(f.transforms.role(card).expect("role").master.is_none());
        assert!(!f.ui.remove_box(root, &mut f.entities, &mut f.transforms));
    }

    #[test]
    fn add_node_rejects_leaf_parents() {
        let mut f = Fixture::new();
        let root = f.build(ROW, Vec2::ZERO);
        let a = f.ui.find_by_id(root, "a").expect("a");
        let err = f
            .ui
            .add_node(a, UiConfig::rect(1.0, 1.0), &mut f.entities, &mut f.transforms)
            .expect_err("leaf parent");
        assert!(err.to_string().contains("it is a rect"));
    }

    #[test]
    fn references_and_hooks_run_each_frame() {
        let mut f = Fixture::new();
        let inits = Rc::new(RefCell::new(Vec::new()));
        let seen = inits.clone();
        f.ui
            .callbacks_mut()
            .register("init", Rc::new(move |e| seen.borrow_mut().push(e)));
        f.ui.callbacks_mut().register_update(
            "grow",
            Rc::new(|node: &mut UiNode, _: &FrameContext| node.config.font_size += 1.0),
        );
        f.ui.set_ref_resolver(|_, component, field| Some(format!("{component}.{field}")));

        let root = f.build(
            &format!(
                r#"{{ "type": "root", "children": [
                    {{ "type": "text", "id": "hp", "text": "?", "ref_entity": {},
                       "ref_component": "health", "ref_field": "current",
                       "update_func": "grow", "init_func": "init" }} ] }}"#,
                Entity::from_raw(7, 0).to_bits()
            ),
            Vec2::ZERO,
        );
        let hp = f.ui.find_by_id(root, "hp").expect("hp");
        assert_eq!(*inits.borrow(), vec![hp]);

        f.ui.update(&f.ctx, &InputState::new(), &mut f.transforms, &MonospaceMetrics::default(), 1.0);
        let node = f.ui.node(hp).expect("node");
        assert_eq!(node.config.text.as_deref(), Some("health.current"));
        assert_eq!(node.config.font_size, 17.0);
        assert!(f.ui.ui_box(root).expect("box").layout_dirty);
    }

    #[test]
    fn record_uses_draw_layers() {
        let mut f = Fixture::new();
        let root = f.build(
            r#"{ "type": "root", "children": [
                { "type": "rect", "width": 10, "height": 10, "color": "red" },
                { "type": "rect", "width": 10, "height": 10, "color": "blue", "draw_layer": "front" } ] }"#,
            Vec2::ZERO,
        );
        f.ui.ui_box_mut(root).expect("box").z = 5;
        f.settle(&InputState::new());

        let mut buffer = DrawCommandBuffer::new();
        buffer.begin_recording();
        assert_eq!(f.ui.record_all(&f.transforms, &mut buffer, f.ctx.now), 3);
        let zs: Vec<i32> = buffer
            .commands()
            .iter()
            .filter(|c| c.command.label() == "RenderRectFilled")
            .map(|c| c.meta.z)
            .collect();
        assert_eq!(zs, vec![5, 6]);
    }
}
