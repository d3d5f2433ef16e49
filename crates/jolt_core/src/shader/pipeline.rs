//! Ordered shader passes and overlays attached to one entity.

use std::fmt;

use serde::Deserialize;

use crate::draw::command::CustomFn;

/// Atlas padding in px added around a frame when sizing `uImageSize`.
pub const DEFAULT_PADDING: f32 = 15.0;

#[derive(Clone)]
pub struct ShaderPass {
    pub shader_name: String,
    pub enabled: bool,
    pub inject_atlas_uniforms: bool,
    /// Runs inside the pass, after atlas and skew uniforms are applied.
    pub custom_pre_pass: Option<CustomFn>,
}

impl ShaderPass {
    pub fn new(shader_name: &str) -> Self {
        Self {
            shader_name: shader_name.to_string(),
            enabled: true,
            inject_atlas_uniforms: true,
            custom_pre_pass: None,
        }
    }

    pub fn with_pre_pass(mut self, f: CustomFn) -> Self {
        self.custom_pre_pass = Some(f);
        self
    }
}

impl fmt::Debug for ShaderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderPass")
            .field("shader_name", &self.shader_name)
            .field("enabled", &self.enabled)
            .field("inject_atlas_uniforms", &self.inject_atlas_uniforms)
            .field("custom_pre_pass", &self.custom_pre_pass.is_some())
            .finish()
    }
}

/// What an overlay samples. Only recorded; both sources draw the base
/// sprite region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayInputSource {
    #[default]
    BaseSprite,
    PostPass,
}

#[derive(Clone)]
pub struct OverlayPass {
    pub input_source: OverlayInputSource,
    pub shader_name: String,
    pub inject_atlas_uniforms: bool,
    pub custom_pre_pass: Option<CustomFn>,
    pub enabled: bool,
}

impl OverlayPass {
    pub fn new(shader_name: &str) -> Self {
        Self {
            input_source: OverlayInputSource::default(),
            shader_name: shader_name.to_string(),
            inject_atlas_uniforms: true,
            custom_pre_pass: None,
            enabled: true,
        }
    }

    pub fn with_input(mut self, source: OverlayInputSource) -> Self {
        self.input_source = source;
        self
    }
}

impl fmt::Debug for OverlayPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayPass")
            .field("input_source", &self.input_source)
            .field("shader_name", &self.shader_name)
            .field("inject_atlas_uniforms", &self.inject_atlas_uniforms)
            .field("custom_pre_pass", &self.custom_pre_pass.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ShaderPipeline {
    pub passes: Vec<ShaderPass>,
    pub overlays: Vec<OverlayPass>,
    pub padding: f32,
}

impl ShaderPipeline {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            overlays: Vec::new(),
            padding: DEFAULT_PADDING,
        }
    }

    /// Appends an enabled pass. A name already present is re-enabled in
    /// place instead of duplicated.
    pub fn add_pass(&mut self, shader_name: &str) -> &mut ShaderPass {
        let index = match self.passes.iter().position(|p| p.shader_name == shader_name) {
            Some(i) => {
                self.passes[i].enabled = true;
                i
            }
            None => {
                self.passes.push(ShaderPass::new(shader_name));
                self.passes.len() - 1
            }
        };
        &mut self.passes[index]
    }

    pub fn remove_pass(&mut self, shader_name: &str) -> bool {
        let before = self.passes.len();
        self.passes.retain(|p| p.shader_name != shader_name);
        before != self.passes.len()
    }

    /// Flips `enabled`; returns the new state, or None when absent.
    pub fn toggle_pass(&mut self, shader_name: &str) -> Option<bool> {
        let pass = self.passes.iter_mut().find(|p| p.shader_name == shader_name)?;
        pass.enabled = !pass.enabled;
        Some(pass.enabled)
    }

    pub fn has_pass(&self, shader_name: &str) -> bool {
        self.passes.iter().any(|p| p.shader_name == shader_name)
    }

    pub fn add_overlay(&mut self, source: OverlayInputSource, shader_name: &str) -> &mut OverlayPass {
        self.overlays
            .push(OverlayPass::new(shader_name).with_input(source));
        let last = self.overlays.len() - 1;
        &mut self.overlays[last]
    }

    pub fn remove_overlay(&mut self, shader_name: &str) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.shader_name != shader_name);
        before != self.overlays.len()
    }

    pub fn toggle_overlay(&mut self, shader_name: &str) -> Option<bool> {
        let overlay = self
            .overlays
            .iter_mut()
            .find(|o| o.shader_name == shader_name)?;
        overlay.enabled = !overlay.enabled;
        Some(overlay.enabled)
    }

    pub fn clear_all(&mut self) {
        self.passes.clear();
        self.overlays.clear();
    }

    pub fn enabled_passes(&self) -> impl Iterator<Item = &ShaderPass> {
        self.passes.iter().filter(|p| p.enabled)
    }

    pub fn enabled_overlays(&self) -> impl Iterator<Item = &OverlayPass> {
        self.overlays.iter().filter(|o| o.enabled)
    }

    pub fn has_enabled(&self) -> bool {
        self.enabled_passes().next().is_some() || self.enabled_overlays().next().is_some()
    }

    /// The shader the sticker and text passes re-bind: the last enabled
    /// overlay, else the last enabled pass.
    pub fn last_enabled_shader(&self) -> Option<&str> {
        self.overlays
            .iter()
            .rev()
            .find(|o| o.enabled)
            .map(|o| o.shader_name.as_str())
            .or_else(|| {
                self.passes
                    .iter()
                    .rev()
                    .find(|p| p.enabled)
                    .map(|p| p.shader_name.as_str())
            })
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty() && self.overlays.is_empty()
    }
}

impl Default for ShaderPipeline {
    fn default() -> Self {
        Self::new()
    }
}
