//! Loading progress shared between a loader thread and the frame loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Messages {
    stage_name: String,
    error_message: Option<String>,
}

/// Shared through `Arc`. Counters are atomics so the frame loop can poll
/// without taking the lock; names go through a mutex.
#[derive(Debug, Default)]
pub struct LoadingProgress {
    /// Percent in hundredths, 0..=10000.
    percentage: AtomicU32,
    current_stage: AtomicU32,
    total_stages: AtomicU32,
    finished: AtomicBool,
    messages: Mutex<Messages>,
}

/// A consistent copy for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingSnapshot {
    pub percentage: f32,
    pub current_stage: u32,
    pub total_stages: u32,
    pub stage_name: String,
    pub error_message: Option<String>,
    pub finished: bool,
}

impl LoadingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, total_stages: u32) {
        self.percentage.store(0, Ordering::Release);
        self.current_stage.store(0, Ordering::Release);
        self.total_stages.store(total_stages, Ordering::Release);
        self.finished.store(false, Ordering::Release);
        let mut messages = self.messages.lock();
        messages.stage_name.clear();
        messages.error_message = None;
        log::info!("Loading started ({total_stages} stages)");
    }

    /// Moves to the next stage. Percentage follows completed stages; the
    /// last stage marks loading finished.
    pub fn advance_stage(&self, name: &str) {
        let total = self.total_stages.load(Ordering::Acquire);
        let stage = (self.current_stage.fetch_add(1, Ordering::AcqRel) + 1).min(total.max(1));
        self.current_stage.store(stage, Ordering::Release);
        if total > 0 {
            self.set_percentage(stage as f32 / total as f32 * 100.0);
        }
        if stage >= total {
            self.finished.store(true, Ordering::Release);
        }
        self.messages.lock().stage_name = name.to_string();
        log::debug!("Loading stage {stage}/{total}: {name}");
    }

    pub fn set_percentage(&self, percent: f32) {
        let hundredths = (percent.clamp(0.0, 100.0) * 100.0).round() as u32;
        self.percentage.store(hundredths, Ordering::Release);
    }

    pub fn fail(&self, message: &str) {
        log::error!("Loading failed: {message}");
        self.messages.lock().error_message = Some(message.to_string());
    }

    pub fn has_failed(&self) -> bool {
        self.messages.lock().error_message.is_some()
    }

    pub fn snapshot(&self) -> LoadingSnapshot {
        let messages = self.messages.lock();
        LoadingSnapshot {
            percentage: self.percentage.load(Ordering::Acquire) as f32 / 100.0,
            current_stage: self.current_stage.load(Ordering::Acquire),
            total_stages: self.total_stages.load(Ordering::Acquire),
            stage_name: messages.stage_name.clone(),
            error_message: messages.error_message.clone(),
            finished: self.finished.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn stages_drive_percentage() {
        let progress = LoadingProgress::new();
        progress.begin(4);
        progress.advance_stage("textures");
        let snap = progress.snapshot();
        assert_eq!(snap.current_stage, 1);
        assert!((snap.percentage - 25.0).abs() < 1e-3);
        assert_eq!(snap.stage_name, "textures");
        assert!(!snap.finished);

        for name in ["shaders", "ui", "scripts", "extra"] {
            progress.advance_stage(name);
        }
        let snap = progress.snapshot();
        assert_eq!(snap.current_stage, 4);
        assert!((snap.percentage - 100.0).abs() < 1e-3);
        assert!(snap.finished);
    }

    #[test]
    fn failure_is_reported() {
        let progress = LoadingProgress::new();
        progress.begin(2);
        progress.set_percentage(140.0);
        progress.fail("missing atlas");
        let snap = progress.snapshot();
        assert!(progress.has_failed());
        assert_eq!(snap.error_message.as_deref(), Some("missing atlas"));
        assert!((snap.percentage - 100.0).abs() < 1e-3);
    }

    #[test]
    fn loader_thread_updates_are_visible() {
        let progress = Arc::new(LoadingProgress::new());
        progress.begin(3);
        let worker = {
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                for name in ["a", "b", "c"] {
                    progress.advance_stage(name);
                }
            })
        };
        worker.join().expect("loader thread");
        assert!(progress.snapshot().finished);
    }
}
