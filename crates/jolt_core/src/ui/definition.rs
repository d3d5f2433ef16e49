//! JSON UI templates.
//!
//! A template is a tree of node options in the same vocabulary as
//! [`UiConfig`]. Unknown fields are rejected; every field is optional.
//! Bad colors and alignment names only warn and fall back, so a template
//! with a typo still builds.

use serde::Deserialize;

use crate::color::Color;
use crate::draw::command::{NPatchInfo, TextureId};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::math::Rect;
use crate::transform::role::Alignment;
use crate::ui::config::{StylingType, UiConfig, UiType};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NPatchTemplate {
    pub texture: u32,
    /// `[x, y, w, h]` in texture pixels.
    pub source: [f32; 4],
    /// `[left, top, right, bottom]`.
    pub borders: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UiTemplate {
    #[serde(rename = "type")]
    pub ui_type: Option<UiType>,
    pub id: Option<String>,
    pub group: Option<String>,
    pub draw_layer: Option<String>,

    pub width: Option<f32>,
    pub height: Option<f32>,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub padding: Option<f32>,
    /// Flag names such as `"h_center | v_center"`.
    pub align: Option<String>,

    pub color: Option<String>,
    pub outline_color: Option<String>,
    pub outline_thickness: Option<f32>,
    pub shadow: Option<bool>,
    pub shadow_color: Option<String>,
    pub emboss: Option<f32>,
    pub styling: Option<StylingType>,
    pub npatch: Option<NPatchTemplate>,
    pub progress_bar: Option<bool>,
    pub progress: Option<f32>,
    pub progress_empty_color: Option<String>,
    pub progress_full_color: Option<String>,

    pub hover: Option<bool>,
    pub click_callback: Option<String>,
    pub button_callback: Option<String>,
    pub button_delay: Option<f32>,
    pub disabled: Option<bool>,
    pub choice: Option<bool>,
    pub chosen: Option<bool>,
    pub one_press: Option<bool>,

    /// Entity bits, as handed out to scripts.
    pub ref_entity: Option<u64>,
    pub ref_component: Option<String>,
    pub ref_field: Option<String>,
    pub update_func: Option<String>,
    pub init_func: Option<String>,

    pub text: Option<String>,
    pub text_color: Option<String>,
    pub font_size: Option<f32>,
    pub text_spacing: Option<f32>,
    pub language: Option<String>,
    pub vertical_text: Option<bool>,
    pub scale: Option<f32>,

    pub children: Vec<UiTemplate>,
}

impl UiTemplate {
    /// Parses and validates a template whose top node is a root.
    pub fn from_json(json: &str) -> CoreResult<UiTemplate> {
        let template: UiTemplate = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Failed to parse UI template: {e}")))?;
        template.validate()?;
        Ok(template)
    }

    pub fn ui_type(&self) -> UiType {
        self.ui_type.unwrap_or(UiType::Rect)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.ui_type() != UiType::Root {
            return Err(CoreError::Config(format!(
                "UI template validation failed: top node is '{}', expected 'root'",
                self.ui_type()
            )));
        }
        for child in &self.children {
            child.validate_child(1)?;
        }
        Ok(())
    }

    fn validate_child(&self, depth: usize) -> CoreResult<()> {
        let name = self.id.as_deref().unwrap_or("<unnamed>");
        let ty = self.ui_type();
        if ty == UiType::Root {
            return Err(CoreError::Config(format!(
                "UI template validation failed: nested root '{name}' at depth {depth}"
            )));
        }
        if !ty.is_container() && !self.children.is_empty() {
            return Err(CoreError::Config(format!(
                "UI template validation failed: '{name}' is a {ty} and cannot have children"
            )));
        }
        if ty == UiType::Text && self.text.is_none() {
            return Err(CoreError::Config(format!(
                "UI template validation failed: text node '{name}' has no text"
            )));
        }
        for child in &self.children {
            child.validate_child(depth + 1)?;
        }
        Ok(())
    }

    /// Node options for this template node; children are not included.
    pub fn to_config(&self) -> UiConfig {
        let mut c = UiConfig::new(self.ui_type());
        c.id = self.id.clone();
        c.group = self.group.clone();
        c.draw_layer = self.draw_layer.clone();
        c.width = self.width;
        c.height = self.height;
        c.min_width = self.min_width;
        c.min_height = self.min_height;
        c.max_width = self.max_width;
        c.max_height = self.max_height;
        c.padding = self.padding.unwrap_or(c.padding);
        if let Some(spec) = &self.align {
            c.align = Alignment::parse(spec).unwrap_or_else(|| {
                log::warn!(
                    "{}",
                    CoreError::Config(format!("unknown alignment '{spec}', using none"))
                );
                Alignment::NONE
            });
        }

        c.color = color_option(&self.color);
        c.outline_color = color_option(&self.outline_color);
        c.outline_thickness = self.outline_thickness.unwrap_or(c.outline_thickness);
        c.shadow = self.shadow.unwrap_or(c.shadow);
        c.shadow_color = color_option(&self.shadow_color);
        c.emboss = self.emboss.unwrap_or(c.emboss);
        c.styling = self.styling.unwrap_or(c.styling);
        if let Some(n) = &self.npatch {
            let [x, y, w, h] = n.source;
            let [left, top, right, bottom] = n.borders;
            c.npatch = Some(NPatchInfo {
                source: Rect::new(x, y, w, h),
                left,
                top,
                right,
                bottom,
            });
            c.npatch_texture = Some(TextureId(n.texture));
        }
        c.progress_bar = self.progress_bar.unwrap_or(c.progress_bar);
        c.progress = self.progress.unwrap_or(c.progress);
        c.progress_empty_color = color_option(&self.progress_empty_color);
        c.progress_full_color = color_option(&self.progress_full_color);

        c.hover = self.hover.unwrap_or(c.hover);
        c.click_callback = self.click_callback.clone();
        c.button_callback = self.button_callback.clone();
        c.button_delay = self.button_delay;
        c.disabled = self.disabled.unwrap_or(c.disabled);
        c.choice = self.choice.unwrap_or(c.choice);
        c.chosen = self.chosen.unwrap_or(c.chosen);
        c.one_press = self.one_press.unwrap_or(c.one_press);

        c.ref_entity = self.ref_entity.map(Entity::from_bits);
        c.ref_component = self.ref_component.clone();
        c.ref_field = self.ref_field.clone();
        c.update_func = self.update_func.clone();
        c.init_func = self.init_func.clone();

        c.text = self.text.clone();
        if let Some(color) = color_option(&self.text_color) {
            c.text_color = color;
        }
        c.font_size = self.font_size.unwrap_or(c.font_size);
        c.text_spacing = self.text_spacing.unwrap_or(c.text_spacing);
        c.language = self.language.clone();
        c.vertical_text = self.vertical_text.unwrap_or(c.vertical_text);
        c.scale = self.scale.unwrap_or(c.scale);
        c
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiTemplate::node_count).sum::<usize>()
    }
}

/// Unknown colors warn and fall back to white.
fn color_option(value: &Option<String>) -> Option<Color> {
    let value = value.as_deref()?;
    match Color::parse(value) {
        Ok(c) => Some(c),
        Err(e) => {
            log::warn!("{e}, using white");
            Some(Color::WHITE)
        }
    }
}
