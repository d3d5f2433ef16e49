//! UI nodes, their runtime state and the boxes that own them.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;

use crate::draw::buffer::DrawCommandBuffer;
use crate::draw::command::{CommandMeta, DrawSpace};
use crate::entity::Entity;
use crate::math::Pose;
use crate::time::FrameContext;
use crate::ui::config::UiConfig;
use crate::ui::rounded_rect::RoundedRectGeometry;

/// Runs with the node that triggered it.
pub type UiCallback = Rc<dyn Fn(Entity)>;
pub type UpdateFn = Rc<dyn Fn(&mut UiNode, &FrameContext)>;
/// Replaces the default drawing of a node. Receives the visual pose.
pub type DrawFn = Rc<dyn Fn(&UiNode, &Pose, &mut DrawCommandBuffer, CommandMeta)>;

/// Per-node behavior slots. Empty slots fall back to the default behavior
/// of the node's type.
#[derive(Clone, Default)]
pub struct NodeHooks {
    pub on_click: Option<UiCallback>,
    pub on_hover: Option<UiCallback>,
    pub on_stop_hover: Option<UiCallback>,
    pub on_release: Option<UiCallback>,
    pub update: Option<UpdateFn>,
    pub draw: Option<DrawFn>,
}

impl fmt::Debug for NodeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHooks")
            .field("on_click", &self.on_click.is_some())
            .field("on_hover", &self.on_hover.is_some())
            .field("on_stop_hover", &self.on_stop_hover.is_some())
            .field("on_release", &self.on_release.is_some())
            .field("update", &self.update.is_some())
            .field("draw", &self.draw.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    /// Unscaled size computed by the last layout.
    pub content_size: Vec2,
    /// Global UI scale applied by the last layout.
    pub render_scale: f32,
    pub last_clicked: Option<f64>,
    /// Set while a delayed button waits to fire.
    pub delay_started: Option<f64>,
    /// Seconds the node has been hovered.
    pub focus_timer: f32,
    pub hovered: bool,
    pub times_fired: u32,
    pub geometry: Option<Arc<RoundedRectGeometry>>,
    pub progress_geometry: Option<Arc<RoundedRectGeometry>>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            content_size: Vec2::ZERO,
            render_scale: 1.0,
            last_clicked: None,
            delay_started: None,
            focus_timer: 0.0,
            hovered: false,
            times_fired: 0,
            geometry: None,
            progress_geometry: None,
        }
    }
}

impl UiState {
    /// Returns the cached geometry, rebuilding it once it drifted.
    pub fn geometry_for(
        slot: &mut Option<Arc<RoundedRectGeometry>>,
        width: f32,
        height: f32,
        thickness: f32,
        progress: f32,
    ) -> Arc<RoundedRectGeometry> {
        match slot {
            Some(g) if !g.needs_regen(width, height, thickness, progress) => g.clone(),
            _ => {
                let g = Arc::new(RoundedRectGeometry::new(width, height, thickness, progress));
                *slot = Some(g.clone());
                g
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiNode {
    pub entity: Entity,
    pub config: UiConfig,
    pub state: UiState,
    pub children: Vec<Entity>,
    pub parent: Option<Entity>,
    pub owning_box: Entity,
    pub hooks: NodeHooks,
}

impl UiNode {
    pub fn new(entity: Entity, config: UiConfig, parent: Option<Entity>, owning_box: Entity) -> Self {
        Self {
            entity,
            config,
            state: UiState::default(),
            children: Vec::new(),
            parent,
            owning_box,
            hooks: NodeHooks::default(),
        }
    }

    /// Replaces the text and reports whether it changed.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.config.text.as_deref() == Some(text) {
            return false;
        }
        self.config.text = Some(text.to_string());
        true
    }

    /// Drops cached GPU-side geometry.
    pub fn release_geometry(&mut self) {
        self.state.geometry = None;
        self.state.progress_geometry = None;
    }
}

/// Root of one UI subtree. The box entity is also its root node.
#[derive(Debug, Clone)]
pub struct UiBox {
    pub root: Entity,
    pub position: Vec2,
    pub z: i32,
    pub space: DrawSpace,
    /// Takes part in pointer hit tests.
    pub collision_enabled: bool,
    pub layout_dirty: bool,
    /// Named z planes, as offsets from `z`.
    pub draw_layers: BTreeMap<String, i32>,
    /// Every node of the box, in creation order.
    pub nodes: Vec<Entity>,
}

impl UiBox {
    pub fn new(root: Entity, position: Vec2) -> Self {
        Self {
            root,
            position,
            z: 0,
            space: DrawSpace::Screen,
            collision_enabled: true,
            layout_dirty: true,
            draw_layers: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Registers `name` as the next plane above the existing ones.
    pub fn add_draw_layer(&mut self, name: &str) -> i32 {
        if let Some(z) = self.draw_layers.get(name) {
            return *z;
        }
        let z = self.draw_layers.len() as i32 + 1;
        self.draw_layers.insert(name.to_string(), z);
        z
    }

    pub fn layer_z(&self, layer: Option<&str>) -> i32 {
        match layer {
            Some(name) => match self.draw_layers.get(name) {
                Some(offset) => self.z + offset,
                None => {
                    log::warn!("UI box {}: unknown draw layer '{name}'", self.root);
                    self.z
                }
            },
            None => self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::config::UiType;

    #[test]
    fn draw_layers_stack_in_registration_order() {
        let mut ui_box = UiBox::new(Entity::from_raw(0, 0), Vec2::ZERO);
        ui_box.z = 10;
        assert_eq!(ui_box.add_draw_layer("back"), 1);
        assert_eq!(ui_box.add_draw_layer("front"), 2);
        assert_eq!(ui_box.add_draw_layer("back"), 1);
        assert_eq!(ui_box.layer_z(Some("front")), 12);
        assert_eq!(ui_box.layer_z(Some("nope")), 10);
        assert_eq!(ui_box.layer_z(None), 10);
    }

    #[test]
    fn geometry_cache_rebuilds_on_drift() {
        let mut slot = None;
        let a = UiState::geometry_for(&mut slot, 40.0, 20.0, 1.0, 1.0);
        let b = UiState::geometry_for(&mut slot, 40.2, 20.0, 1.0, 1.0);
        assert!(Arc::ptr_eq(&a, &b));
        let c = UiState::geometry_for(&mut slot, 48.0, 20.0, 1.0, 1.0);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn set_text_reports_change() {
        let e = Entity::from_raw(1, 0);
        let mut node = UiNode::new(e, UiConfig::new(UiType::Text), None, e);
        assert!(node.set_text("a"));
        assert!(!node.set_text("a"));
        node.state.geometry = Some(Arc::new(RoundedRectGeometry::new(1.0, 1.0, 0.0, 1.0)));
        node.release_geometry();
        assert!(node.state.geometry.is_none());
    }
}
