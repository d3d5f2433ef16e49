//! Click handling for button nodes.

use crate::ui::node::UiNode;

/// Minimum seconds between two accepted clicks on one button.
pub const CLICK_DEBOUNCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The callback should run now.
    Fired,
    /// Too soon after the previous click.
    Debounced,
    Disabled,
    /// A delayed button started its countdown.
    DelayStarted,
    /// A delayed button is still counting down.
    DelayPending,
    NotAButton,
}

impl ClickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ClickOutcome::Fired => "fired",
            ClickOutcome::Debounced => "debounced",
            ClickOutcome::Disabled => "disabled",
            ClickOutcome::DelayStarted => "delay started",
            ClickOutcome::DelayPending => "delay pending",
            ClickOutcome::NotAButton => "not a button",
        }
    }
}

impl std::fmt::Display for ClickOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Applies one click at `now` to `node`'s button state. The caller runs the
/// callback when this returns [`ClickOutcome::Fired`].
pub fn click(node: &mut UiNode, now: f64) -> ClickOutcome {
    if !node.config.is_button() && node.hooks.on_click.is_none() {
        return ClickOutcome::NotAButton;
    }
    if node.config.disabled {
        return ClickOutcome::Disabled;
    }
    if let Some(last) = node.state.last_clicked {
        if now - last < CLICK_DEBOUNCE {
            return ClickOutcome::Debounced;
        }
    }
    node.state.last_clicked = Some(now);

    if let Some(delay) = node.config.button_delay.filter(|d| *d > 0.0) {
        match node.state.delay_started {
            None => {
                node.state.delay_started = Some(now);
                return ClickOutcome::DelayStarted;
            }
            Some(started) if now - started < delay as f64 => {
                return ClickOutcome::DelayPending;
            }
            Some(_) => node.state.delay_started = None,
        }
    }

    node.state.times_fired += 1;
    if node.config.one_press {
        node.config.disabled = true;
    }
    ClickOutcome::Fired
}

/// Fraction of the button delay already elapsed, while one is running.
pub fn delay_progress(node: &UiNode, now: f64) -> Option<f32> {
    let started = node.state.delay_started?;
    let delay = node.config.button_delay.filter(|d| *d > 0.0)?;
    Some((((now - started) as f32) / delay).clamp(0.0, 1.0))
}
