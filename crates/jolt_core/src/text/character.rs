use std::collections::BTreeMap;

use glam::Vec2;

use crate::color::Color;
use crate::text::markup::EffectSpec;

/// An image or animation embedded in the text flow.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub uuid: String,
    pub scale: f32,
    pub fg: Color,
    pub shadow: bool,
    pub animated: bool,
}

/// One laid-out codepoint and the state its effects mutate.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub codepoint: char,
    /// Drawn instead of `codepoint` while set (scramble).
    pub override_codepoint: Option<char>,
    pub index: usize,
    pub line: usize,
    /// Top-left, relative to the text origin.
    pub position: Vec2,
    pub size: Vec2,
    /// Degrees.
    pub rotation: f32,
    pub scale: f32,
    pub color: Color,
    pub base_color: Color,
    pub shadow_height: f32,
    pub offsets: BTreeMap<String, Vec2>,
    pub scale_modifiers: BTreeMap<String, Vec2>,
    pub custom: BTreeMap<String, f32>,
    pub created_at: f64,
    pub first_frame: bool,
    pub finished: BTreeMap<String, bool>,
    pub effects: Vec<EffectSpec>,
    pub image: Option<InlineImage>,
}

impl Character {
    pub fn new(codepoint: char, index: usize, created_at: f64) -> Self {
        Self {
            codepoint,
            override_codepoint: None,
            index,
            line: 0,
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
            color: Color::WHITE,
            base_color: Color::WHITE,
            shadow_height: 1.0,
            offsets: BTreeMap::new(),
            scale_modifiers: BTreeMap::new(),
            custom: BTreeMap::new(),
            created_at,
            first_frame: true,
            finished: BTreeMap::new(),
            effects: Vec::new(),
            image: None,
        }
    }

    pub fn shown(&self) -> char {
        self.override_codepoint.unwrap_or(self.codepoint)
    }

    pub fn is_space(&self) -> bool {
        self.image.is_none() && self.codepoint.is_whitespace()
    }

    pub fn total_offset(&self) -> Vec2 {
        self.offsets.values().copied().sum()
    }

    /// Product of every effect's scale modifier and the base scale.
    pub fn total_scale(&self) -> Vec2 {
        self.scale_modifiers
            .values()
            .fold(Vec2::splat(self.scale), |acc, m| acc * *m)
    }

    pub fn has_finished_any(&self) -> bool {
        self.finished.values().any(|f| *f)
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }
}
