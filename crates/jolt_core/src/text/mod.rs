//! Animated rich text: bracket markup, per-character effects, wrapping
//! layout and rendering into draw commands.

pub mod character;
pub mod effects;
pub mod layout;
pub mod markup;
pub mod object;
pub mod render;

pub use character::{Character, InlineImage};
pub use effects::{EffectContext, EffectFn, EffectRegistry};
pub use layout::{measure_str, MonospaceMetrics, TextAlignment, TextMeasure, WrapMode};
pub use markup::{parse_markup, EffectSpec, Segment};
pub use object::{Text, TextStyle};
