//! Retained UI: boxes of nodes laid out as containers, attached to the
//! transform system through Minor roles, and drawn through the command
//! buffer.

pub mod align;
pub mod button;
pub mod config;
pub mod definition;
pub mod draw;
pub mod layout;
pub mod node;
pub mod rounded_rect;
pub mod tree;

pub use button::ClickOutcome;
pub use config::{StylingType, UiConfig, UiType};
pub use definition::UiTemplate;
pub use node::{NodeHooks, UiBox, UiCallback, UiNode, UiState};
pub use tree::{CallbackRegistry, UiRegistry};
