//! Per-frame keyboard and pointer state consumed by the UI.
//!
//! - **Held:** `is_held(key)` / `cursor_down()` are true every frame the
//!   key or primary button is physically down.
//! - **Edge:** `is_just_pressed` / `cursor_pressed` / `cursor_released` are
//!   true only during the frame of the transition and are cleared by
//!   `end_frame()`, which the main loop calls after at least one fixed step
//!   has consumed them.

use std::collections::HashSet;

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Space,
    Enter,
    Tab,
    F3,
    F4,
    F5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
    Middle,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,

    mouse_held: HashSet<MouseBtn>,
    mouse_just_pressed: HashSet<MouseBtn>,
    mouse_just_released: HashSet<MouseBtn>,

    /// Screen-space cursor position in pixels.
    pub cursor_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_just_pressed: HashSet::new(),
            mouse_just_released: HashSet::new(),
            cursor_position: Vec2::ZERO,
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        if self.mouse_held.insert(btn) {
            self.mouse_just_pressed.insert(btn);
        }
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        if self.mouse_held.remove(&btn) {
            self.mouse_just_released.insert(btn);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn cursor_down(&self) -> bool {
        self.mouse_held.contains(&MouseBtn::Left)
    }

    pub fn cursor_pressed(&self) -> bool {
        self.mouse_just_pressed.contains(&MouseBtn::Left)
    }

    pub fn cursor_released(&self) -> bool {
        self.mouse_just_released.contains(&MouseBtn::Left)
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_edges_and_levels() {
        let mut input = InputState::new();
        input.key_down(Key::Enter);
        assert!(input.is_held(Key::Enter));
        assert!(input.is_just_pressed(Key::Enter));
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Enter));
        assert!(input.is_held(Key::Enter));
        input.key_up(Key::Enter);
        assert!(input.is_just_released(Key::Enter));
    }

    #[test]
    fn key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Tab);
        assert!(!input.is_just_released(Key::Tab));
    }

    #[test]
    fn cursor_tracks_left_button() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Right);
        assert!(!input.cursor_down());

        input.mouse_down(MouseBtn::Left);
        assert!(input.cursor_down());
        assert!(input.cursor_pressed());
        input.end_frame();
        assert!(input.cursor_down());
        assert!(!input.cursor_pressed());

        input.mouse_up(MouseBtn::Left);
        assert!(input.cursor_released());
        assert!(!input.cursor_down());
        input.end_frame();
        assert!(!input.cursor_released());
    }

    #[test]
    fn repeat_press_keeps_single_edge() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Left);
        input.end_frame();
        input.mouse_down(MouseBtn::Left);
        assert!(!input.cursor_pressed());
        assert!(input.is_mouse_held(MouseBtn::Left));
    }
}
