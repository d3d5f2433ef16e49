//! Sprite animation clips and the per-entity animation queue.
//!
//! Clip timing is kept in integer microseconds so that stepping with the
//! same fixed dt always lands on the same frame. The JSON format stores
//! `duration_ms`; loading converts it.
//!
//! A sprite entity owns an [`AnimationQueue`]: queued clips play in order,
//! finished non-looping clips pop, and the default clip shows whenever the
//! queue is empty.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

pub const SUPPORTED_VERSION: &str = "0.1";

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub sprite_id: String,
    pub duration_us: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    pub looping: bool,
}

impl AnimationClip {
    /// A looping one-frame clip, for sprites that never animate.
    pub fn still(sprite_id: &str) -> Self {
        Self {
            frames: vec![AnimationFrame {
                sprite_id: sprite_id.to_string(),
                duration_us: u64::MAX,
            }],
            looping: true,
        }
    }

    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }
}

#[derive(Debug, Clone)]
pub struct AnimationFile {
    pub version: String,
    pub animation_id: String,
    pub animations: HashMap<String, AnimationClip>,
}

/// Playback position inside one clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationState {
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `dt_us` and returns the sprite now showing.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() {
            return "";
        }
        if self.finished {
            return self.current(clip);
        }
        self.elapsed_us = self.elapsed_us.saturating_add(dt_us);

        loop {
            let frame = &clip.frames[self.frame_index];
            if self.elapsed_us < frame.duration_us {
                break;
            }
            self.elapsed_us -= frame.duration_us;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                if clip.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }
        self.current(clip)
    }

    pub fn current<'a>(&self, clip: &'a AnimationClip) -> &'a str {
        clip.frames
            .get(self.frame_index)
            .or_else(|| clip.frames.last())
            .map(|f| f.sprite_id.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
struct Playing {
    clip: AnimationClip,
    state: AnimationState,
}

impl Playing {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            state: AnimationState::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationQueue {
    default_clip: Option<Playing>,
    queue: VecDeque<Playing>,
    /// Keeps the entity in the world but skips its sprite when recording.
    pub no_draw: bool,
}

impl AnimationQueue {
    pub fn new(default_clip: AnimationClip) -> Self {
        Self {
            default_clip: Some(Playing::new(default_clip)),
            ..Self::default()
        }
    }

    pub fn set_default(&mut self, clip: AnimationClip) {
        self.default_clip = Some(Playing::new(clip));
    }

    /// Plays `clip` after everything already queued.
    pub fn queue(&mut self, clip: AnimationClip) {
        self.queue.push_back(Playing::new(clip));
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_playing_default(&self) -> bool {
        self.queue.is_empty()
    }

    /// Steps the head of the queue, or the default clip when it is empty.
    pub fn advance(&mut self, dt: f32) {
        let dt_us = (dt.max(0.0) as f64 * 1_000_000.0).round() as u64;
        if let Some(head) = self.queue.front_mut() {
            head.state.tick(dt_us, &head.clip);
            if head.state.finished && !head.clip.looping {
                self.queue.pop_front();
            }
        } else if let Some(default) = self.default_clip.as_mut() {
            default.state.tick(dt_us, &default.clip);
        }
    }

    /// Sprite id to draw this frame. None when nothing is playing.
    pub fn current_frame(&self) -> Option<&str> {
        let playing = self.queue.front().or(self.default_clip.as_ref())?;
        let id = playing.state.current(&playing.clip);
        (!id.is_empty()).then_some(id)
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct AnimationFileJson {
    version: String,
    animation_id: String,
    animations: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    frames: Vec<AnimationFrameJson>,
    #[serde(default)]
    looping: bool,
}

#[derive(Debug, Deserialize)]
struct AnimationFrameJson {
    sprite_id: String,
    duration_ms: u64,
}

pub fn parse_animation_file(json: &str) -> CoreResult<AnimationFile> {
    let json: AnimationFileJson = serde_json::from_str(json)
        .map_err(|e| CoreError::Config(format!("Failed to parse animation file: {e}")))?;
    validate_animation_json(&json)?;

    let animations = json
        .animations
        .into_iter()
        .map(|(name, clip)| {
            let frames = clip
                .frames
                .into_iter()
                .map(|f| AnimationFrame {
                    sprite_id: f.sprite_id,
                    duration_us: f.duration_ms * 1000,
                })
                .collect();
            (
                name,
                AnimationClip {
                    frames,
                    looping: clip.looping,
                },
            )
        })
        .collect();

    Ok(AnimationFile {
        version: json.version,
        animation_id: json.animation_id,
        animations,
    })
}

pub fn load_animation_file(path: &Path) -> CoreResult<AnimationFile> {
    let raw = fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!("Failed to read animation file {}: {e}", path.display()))
    })?;
    parse_animation_file(&raw)
}

fn validate_animation_json(json: &AnimationFileJson) -> CoreResult<()> {
    let fail = |msg: String| Err(CoreError::Config(format!("Animation validation failed: {msg}")));
    if json.version != SUPPORTED_VERSION {
        return fail(format!("unsupported version '{}'", json.version));
    }
    if json.animation_id.is_empty() {
        return fail("animation_id is empty".to_string());
    }
    for (name, clip) in &json.animations {
        if clip.frames.is_empty() {
            return fail(format!("clip '{name}' has no frames"));
        }
        for (i, frame) in clip.frames.iter().enumerate() {
            if frame.sprite_id.is_empty() {
                return fail(format!("clip '{name}' frame {i} has empty sprite_id"));
            }
            if frame.duration_ms == 0 {
                return fail(format!("clip '{name}' frame {i} has zero duration"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_clip(durations_ms: &[u64], looping: bool) -> AnimationClip {
        AnimationClip {
            frames: durations_ms
                .iter()
                .enumerate()
                .map(|(i, &d)| AnimationFrame {
                    sprite_id: format!("sprite_{i}"),
                    duration_us: d * 1000,
                })
                .collect(),
            looping,
        }
    }

    #[test]
    fn tick_walks_variable_durations() {
        let clip = make_clip(&[50, 200, 100], true);
        let mut state = AnimationState::new();
        assert_eq!(state.tick(0, &clip), "sprite_0");
        assert_eq!(state.tick(50_000, &clip), "sprite_1");
        assert_eq!(state.tick(150_000, &clip), "sprite_1");
        assert_eq!(state.tick(50_000, &clip), "sprite_2");
        assert_eq!(state.tick(100_000, &clip), "sprite_0");
        assert!(!state.finished);
    }

    #[test]
    fn non_looping_holds_last_frame() {
        let clip = make_clip(&[100, 100], false);
        let mut state = AnimationState::new();
        assert_eq!(state.tick(300_000, &clip), "sprite_1");
        assert!(state.finished);
        assert_eq!(state.tick(100_000, &clip), "sprite_1");
    }

    #[test]
    fn fixed_steps_are_deterministic() {
        let clip = make_clip(&[100, 150, 80], true);
        let mut a = AnimationState::new();
        let mut b = AnimationState::new();
        for _ in 0..100 {
            assert_eq!(a.tick(16_667, &clip), b.tick(16_667, &clip));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn queue_plays_then_falls_back_to_default() {
        let mut anim = AnimationQueue::new(make_clip(&[100], true));
        anim.queue(make_clip(&[50, 50], false));
        assert!(!anim.is_playing_default());
        assert_eq!(anim.current_frame(), Some("sprite_0"));

        anim.advance(0.06);
        assert_eq!(anim.current_frame(), Some("sprite_1"));
        anim.advance(0.06);
        assert!(anim.is_playing_default());
        assert_eq!(anim.current_frame(), Some("sprite_0"));
    }

    #[test]
    fn empty_queue_without_default_shows_nothing() {
        let mut anim = AnimationQueue::default();
        anim.advance(1.0);
        assert_eq!(anim.current_frame(), None);
        anim.set_default(AnimationClip::still("card"));
        anim.advance(100.0);
        assert_eq!(anim.current_frame(), Some("card"));
    }

    #[test]
    fn parses_valid_file() {
        let file = parse_animation_file(
            r#"{
              "version": "0.1",
              "animation_id": "hero",
              "animations": {
                "idle": { "frames": [
                    { "sprite_id": "a", "duration_ms": 100 },
                    { "sprite_id": "b", "duration_ms": 100 } ], "looping": true },
                "jump": { "frames": [ { "sprite_id": "c", "duration_ms": 120 } ] }
              }
            }"#,
        )
        .expect("should parse");
        assert_eq!(file.animation_id, "hero");
        assert_eq!(file.animations.len(), 2);
        assert!(file.animations["idle"].looping);
        assert_eq!(file.animations["idle"].frames[1].duration_us, 100_000);
        assert!(!file.animations["jump"].looping);
    }

    #[test]
    fn rejects_invalid_files() {
        let err = parse_animation_file(
            r#"{ "version": "9.9", "animation_id": "hero", "animations": {} }"#,
        )
        .expect_err("bad version");
        assert!(err.to_string().contains("unsupported version"));

        let err = parse_animation_file(
            r#"{ "version": "0.1", "animation_id": "hero",
                 "animations": { "idle": { "frames": [ { "sprite_id": "a", "duration_ms": 0 } ] } } }"#,
        )
        .expect_err("zero duration");
        assert!(err.to_string().contains("zero duration"));

        let err = parse_animation_file("{").expect_err("not json");
        assert!(err.to_string().contains("Failed to parse animation file"));
    }
}
