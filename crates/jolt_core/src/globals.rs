//! Process-wide state: the frame counter, the UI scale and the shader
//! registry.
//!
//! `init()` and `teardown()` bracket the lifetime of the settings. Within a
//! frame everything here is read-only except the frame counter, which
//! `advance_frame()` bumps once per frame. The counter is never reset, so
//! frame numbers stay unique for the life of the process.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::shader::registry::{ShaderInfo, ShaderRegistry};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalSettings {
    pub ui_scale: f32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self { ui_scale: 1.0 }
    }
}

struct GlobalState {
    settings: GlobalSettings,
    shaders: ShaderRegistry,
}

static FRAME: AtomicU64 = AtomicU64::new(0);
static STATE: RwLock<Option<GlobalState>> = parking_lot::const_rwlock(None);

pub fn init(settings: GlobalSettings) {
    let mut state = STATE.write();
    if state.is_some() {
        log::warn!("globals::init called twice; replacing settings");
    }
    *state = Some(GlobalState {
        settings,
        shaders: ShaderRegistry::new(),
    });
    log::info!("Globals initialized (ui_scale {})", settings.ui_scale);
}

pub fn teardown() {
    *STATE.write() = None;
    log::info!("Globals torn down");
}

pub fn is_initialized() -> bool {
    STATE.read().is_some()
}

pub fn frame() -> u64 {
    FRAME.load(Ordering::Acquire)
}

/// Returns the new frame number.
pub fn advance_frame() -> u64 {
    FRAME.fetch_add(1, Ordering::AcqRel) + 1
}

/// 1.0 when uninitialized.
pub fn ui_scale() -> f32 {
    STATE
        .read()
        .as_ref()
        .map(|s| s.settings.ui_scale)
        .unwrap_or(1.0)
}

pub fn set_ui_scale(scale: f32) -> CoreResult<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CoreError::Config(format!("invalid ui scale {scale}")));
    }
    match STATE.write().as_mut() {
        Some(state) => {
            state.settings.ui_scale = scale;
            Ok(())
        }
        None => Err(CoreError::Config(
            "set_ui_scale before globals::init".to_string(),
        )),
    }
}

pub fn register_shader(info: ShaderInfo) -> CoreResult<()> {
    match STATE.write().as_mut() {
        Some(state) => {
            state.shaders.register(info);
            Ok(())
        }
        None => Err(CoreError::Config(format!(
            "shader '{}' registered before globals::init",
            info.name
        ))),
    }
}

/// Runs `f` against the registered shaders. An uninitialized process sees
/// an empty registry.
pub fn with_shaders<R>(f: impl FnOnce(&ShaderRegistry) -> R) -> R {
    let state = STATE.read();
    match state.as_ref() {
        Some(s) => f(&s.shaders),
        None => f(&ShaderRegistry::new()),
    }
}
