//! Recognized options of a UI node.

use serde::Deserialize;

use crate::color::Color;
use crate::draw::command::{NPatchInfo, TextureId};
use crate::entity::Entity;
use crate::transform::role::Alignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    Root,
    #[serde(alias = "vertical_container")]
    VContainer,
    #[serde(alias = "horizontal_container")]
    HContainer,
    Rect,
    Text,
    Object,
}

impl UiType {
    pub fn label(&self) -> &'static str {
        match self {
            UiType::Root => "root",
            UiType::VContainer => "v_container",
            UiType::HContainer => "h_container",
            UiType::Rect => "rect",
            UiType::Text => "text",
            UiType::Object => "object",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, UiType::Root | UiType::VContainer | UiType::HContainer)
    }

    /// Containers lay children along x only when horizontal.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, UiType::HContainer)
    }
}

impl std::fmt::Display for UiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StylingType {
    #[default]
    RoundedRect,
    NinepatchBorders,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub ui_type: UiType,
    pub id: Option<String>,
    pub group: Option<String>,
    pub draw_layer: Option<String>,

    pub width: Option<f32>,
    pub height: Option<f32>,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub padding: f32,
    pub align: Alignment,

    pub color: Option<Color>,
    pub outline_color: Option<Color>,
    pub outline_thickness: f32,
    pub shadow: bool,
    pub shadow_color: Option<Color>,
    pub emboss: f32,
    pub styling: StylingType,
    pub npatch: Option<NPatchInfo>,
    pub npatch_texture: Option<TextureId>,
    pub progress_bar: bool,
    /// 0..1, read when `progress_bar` is set.
    pub progress: f32,
    pub progress_empty_color: Option<Color>,
    pub progress_full_color: Option<Color>,

    pub hover: bool,
    pub click_callback: Option<String>,
    pub button_callback: Option<String>,
    pub button_delay: Option<f32>,
    pub disabled: bool,
    pub choice: bool,
    pub chosen: bool,
    pub one_press: bool,

    pub ref_entity: Option<Entity>,
    pub ref_component: Option<String>,
    pub ref_field: Option<String>,
    pub update_func: Option<String>,
    pub init_func: Option<String>,

    pub text: Option<String>,
    pub text_color: Color,
    pub font_size: f32,
    pub text_spacing: f32,
    pub language: Option<String>,
    pub vertical_text: bool,
    pub object: Option<Entity>,
    pub scale: f32,
}

impl UiConfig {
    pub fn new(ui_type: UiType) -> Self {
        Self {
            ui_type,
            id: None,
            group: None,
            draw_layer: None,
            width: None,
            height: None,
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
            padding: 0.0,
            align: Alignment::NONE,
            color: None,
            outline_color: None,
            outline_thickness: 0.0,
            shadow: false,
            shadow_color: None,
            emboss: 0.0,
            styling: StylingType::default(),
            npatch: None,
            npatch_texture: None,
            progress_bar: false,
            progress: 0.0,
            progress_empty_color: None,
            progress_full_color: None,
            hover: false,
            click_callback: None,
            button_callback: None,
            button_delay: None,
            disabled: false,
            choice: false,
            chosen: false,
            one_press: false,
            ref_entity: None,
            ref_component: None,
            ref_field: None,
            update_func: None,
            init_func: None,
            text: None,
            text_color: Color::WHITE,
            font_size: 16.0,
            text_spacing: 1.0,
            language: None,
            vertical_text: false,
            object: None,
            scale: 1.0,
        }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::new(UiType::Rect)
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new(UiType::Text)
        }
    }

    pub fn container(ui_type: UiType, padding: f32) -> Self {
        Self {
            padding,
            ..Self::new(ui_type)
        }
    }

    /// Has something to run when clicked.
    pub fn is_button(&self) -> bool {
        self.button_callback.is_some() || self.click_callback.is_some() || self.choice
    }

    pub fn is_interactive(&self) -> bool {
        self.hover || self.is_button()
    }

    /// Whether the reflected value needs all three reference fields.
    pub fn has_reference(&self) -> bool {
        self.ref_entity.is_some() && self.ref_component.is_some() && self.ref_field.is_some()
    }

    /// Clamps one axis by the min/max options.
    pub fn clamp_size(&self, w: f32, h: f32) -> (f32, f32) {
        let mut w = w;
        let mut h = h;
        if let Some(min) = self.min_width {
            w = w.max(min);
        }
        if let Some(max) = self.max_width {
            w = w.min(max);
        }
        if let Some(min) = self.min_height {
            h = h.max(min);
        }
        if let Some(max) = self.max_height {
            h = h.min(max);
        }
        (w, h)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self::new(UiType::Rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_applies_min_then_max() {
        let mut config = UiConfig::rect(10.0, 10.0);
        config.min_width = Some(20.0);
        config.max_height = Some(5.0);
        assert_eq!(config.clamp_size(10.0, 10.0), (20.0, 5.0));
    }

    #[test]
    fn buttons_are_interactive() {
        let mut config = UiConfig::rect(1.0, 1.0);
        assert!(!config.is_interactive());
        config.button_callback = Some("start".into());
        assert!(config.is_button());
        assert!(config.is_interactive());
        assert!(UiType::HContainer.is_container());
        assert!(!UiType::VContainer.is_horizontal());
        assert_eq!(UiType::VContainer.to_string(), "v_container");
    }
}
