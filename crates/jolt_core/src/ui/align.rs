//! Placement of children inside a container.
//!
//! Containers stack children along their primary axis (x for horizontal,
//! y otherwise) with `padding` between neighbors. Alignment flags shift the
//! whole run on the primary axis and each child on the secondary axis.

use glam::Vec2;

use crate::transform::role::Alignment;
use crate::ui::config::UiConfig;

/// Extent of `children` stacked with `padding` between neighbors.
pub fn stack_extent(children: &[Vec2], padding: f32, horizontal: bool) -> Vec2 {
    if children.is_empty() {
        return Vec2::ZERO;
    }
    let gaps = padding * (children.len() - 1) as f32;
    if horizontal {
        Vec2::new(
            children.iter().map(|c| c.x).sum::<f32>() + gaps,
            children.iter().map(|c| c.y).fold(0.0, f32::max),
        )
    } else {
        Vec2::new(
            children.iter().map(|c| c.x).fold(0.0, f32::max),
            children.iter().map(|c| c.y).sum::<f32>() + gaps,
        )
    }
}

fn h_shift(flags: Alignment, leftover: f32) -> f32 {
    let leftover = leftover.max(0.0);
    if flags.contains(Alignment::H_CENTER) {
        leftover * 0.5
    } else if flags.contains(Alignment::H_RIGHT) {
        leftover
    } else {
        0.0
    }
}

fn v_shift(flags: Alignment, leftover: f32) -> f32 {
    let leftover = leftover.max(0.0);
    if flags.contains(Alignment::V_CENTER) {
        leftover * 0.5
    } else if flags.contains(Alignment::V_BOTTOM) {
        leftover
    } else {
        0.0
    }
}

/// Top-left offset of every child relative to the container's top-left,
/// in unscaled units. Depends only on its inputs, so repeated passes agree.
pub fn child_offsets(config: &UiConfig, container: Vec2, children: &[Vec2]) -> Vec<Vec2> {
    let horizontal = config.ui_type.is_horizontal();
    let run = stack_extent(children, config.padding, horizontal);
    let flags = config.align;
    let primary_shift = if horizontal {
        h_shift(flags, container.x - run.x)
    } else {
        v_shift(flags, container.y - run.y)
    };

    let mut offsets = Vec::with_capacity(children.len());
    let mut cursor = primary_shift;
    for size in children {
        if horizontal {
            offsets.push(Vec2::new(cursor, v_shift(flags, container.y - size.y)));
            cursor += size.x + config.padding;
        } else {
            offsets.push(Vec2::new(h_shift(flags, container.x - size.x), cursor));
            cursor += size.y + config.padding;
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::config::UiType;

    #[test]
    fn horizontal_run_with_padding() {
        let config = UiConfig::container(UiType::HContainer, 4.0);
        let children = [Vec2::new(20.0, 10.0), Vec2::new(20.0, 30.0)];
        assert_eq!(stack_extent(&children, 4.0, true), Vec2::new(44.0, 30.0));
        let offsets = child_offsets(&config, Vec2::new(44.0, 30.0), &children);
        assert_eq!(offsets, vec![Vec2::ZERO, Vec2::new(24.0, 0.0)]);
    }

    #[test]
    fn centered_vertical_column() {
        let mut config = UiConfig::container(UiType::VContainer, 2.0);
        config.align = Alignment::H_CENTER | Alignment::V_CENTER;
        let children = [Vec2::new(10.0, 10.0), Vec2::new(30.0, 10.0)];
        let offsets = child_offsets(&config, Vec2::new(50.0, 42.0), &children);
        // Run is 22 tall in a 42 box: shifted down by 10.
        assert_eq!(offsets, vec![Vec2::new(20.0, 10.0), Vec2::new(10.0, 22.0)]);
    }

    #[test]
    fn right_and_bottom() {
        let mut config = UiConfig::container(UiType::HContainer, 0.0);
        config.align = Alignment::H_RIGHT | Alignment::V_BOTTOM;
        let offsets = child_offsets(&config, Vec2::new(100.0, 40.0), &[Vec2::new(30.0, 10.0)]);
        assert_eq!(offsets, vec![Vec2::new(70.0, 30.0)]);
    }

    #[test]
    fn overflow_never_shifts_negative() {
        let mut config = UiConfig::container(UiType::HContainer, 0.0);
        config.align = Alignment::H_CENTER;
        let offsets = child_offsets(&config, Vec2::new(10.0, 10.0), &[Vec2::new(30.0, 10.0)]);
        assert_eq!(offsets, vec![Vec2::ZERO]);
    }
}
