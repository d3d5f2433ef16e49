//! Role of a transform in the master/follower graph.

use std::ops::{BitOr, BitOrAssign};

use glam::Vec2;
use serde::Deserialize;

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RoleType {
    /// Owns its motion; never has a master.
    #[default]
    Major,
    /// Inherits from its master per bond.
    Minor,
    /// Copies the master's poses wholesale every frame.
    Glued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Bond {
    /// Copy the master's visual value.
    #[default]
    Strong,
    /// Ease toward the target on the entity's own spring.
    Weak,
}

/// Alignment bitset shared by transform alignment and UI layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Alignment(u32);

impl Alignment {
    pub const NONE: Alignment = Alignment(0);
    pub const H_LEFT: Alignment = Alignment(1);
    pub const H_CENTER: Alignment = Alignment(2);
    pub const H_RIGHT: Alignment = Alignment(4);
    pub const V_TOP: Alignment = Alignment(8);
    pub const V_CENTER: Alignment = Alignment(16);
    pub const V_BOTTOM: Alignment = Alignment(32);
    /// Align inside the master's horizontal extent instead of against its edge.
    pub const H_INSIDE: Alignment = Alignment(64);
    pub const V_INSIDE: Alignment = Alignment(128);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Alignment(bits & 0xff)
    }

    pub const fn contains(self, other: Alignment) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses names like `"h_center | v_bottom"`; unknown names yield `None`.
    pub fn parse(spec: &str) -> Option<Alignment> {
        let mut out = Alignment::NONE;
        for part in spec.split(['|', ',', ' ']).filter(|p| !p.is_empty()) {
            out |= match part.to_ascii_lowercase().as_str() {
                "h_left" => Alignment::H_LEFT,
                "h_center" => Alignment::H_CENTER,
                "h_right" => Alignment::H_RIGHT,
                "v_top" => Alignment::V_TOP,
                "v_center" => Alignment::V_CENTER,
                "v_bottom" => Alignment::V_BOTTOM,
                "h_inside" => Alignment::H_INSIDE,
                "v_inside" => Alignment::V_INSIDE,
                _ => return None,
            };
        }
        Some(out)
    }

    /// Offset of a `size` box aligned against a `parent` box.
    pub fn offset(self, size: Vec2, parent: Vec2, fine: Vec2) -> Vec2 {
        let h_inside = self.contains(Alignment::H_INSIDE);
        let v_inside = self.contains(Alignment::V_INSIDE);
        let x = if self.contains(Alignment::H_CENTER) {
            0.5 * parent.x - 0.5 * size.x
        } else if self.contains(Alignment::H_RIGHT) {
            if h_inside {
                parent.x - size.x
            } else {
                parent.x
            }
        } else if self.contains(Alignment::H_LEFT) {
            if h_inside {
                0.0
            } else {
                -size.x
            }
        } else {
            0.0
        };
        let y = if self.contains(Alignment::V_CENTER) {
            0.5 * parent.y - 0.5 * size.y
        } else if self.contains(Alignment::V_BOTTOM) {
            if v_inside {
                parent.y - size.y
            } else {
                parent.y
            }
        } else if self.contains(Alignment::V_TOP) {
            if v_inside {
                0.0
            } else {
                -size.y
            }
        } else {
            0.0
        };
        Vec2::new(x, y) + fine
    }
}

impl BitOr for Alignment {
    type Output = Alignment;

    fn bitor(self, rhs: Alignment) -> Alignment {
        Alignment(self.0 | rhs.0)
    }
}

impl BitOrAssign for Alignment {
    fn bitor_assign(&mut self, rhs: Alignment) {
        self.0 |= rhs.0;
    }
}

/// Alignment of a follower against its master's rect. Recomputed only when
/// the flags or either size change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignToMaster {
    pub flags: Alignment,
    pub fine_tune: Vec2,
    last: Option<(Alignment, Vec2, Vec2, Vec2)>,
}

impl AlignToMaster {
    pub fn new(flags: Alignment, fine_tune: Vec2) -> Self {
        Self {
            flags,
            fine_tune,
            last: None,
        }
    }

    /// `Some(offset)` when the inputs changed since the last call.
    pub fn resolve(&mut self, size: Vec2, master_size: Vec2) -> Option<Vec2> {
        let key = (self.flags, self.fine_tune, size, master_size);
        if self.last == Some(key) {
            return None;
        }
        self.last = Some(key);
        Some(self.flags.offset(size, master_size, self.fine_tune))
    }

    pub fn is_dirty(&self, size: Vec2, master_size: Vec2) -> bool {
        self.last != Some((self.flags, self.fine_tune, size, master_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Role {
    pub role_type: RoleType,
    pub master: Option<Entity>,
    /// Top-left of this entity relative to the master's top-left.
    pub offset: Vec2,
    pub bond_xy: Bond,
    pub bond_wh: Bond,
    pub bond_r: Bond,
    pub bond_scale: Bond,
    pub align: Option<AlignToMaster>,
}

impl Role {
    pub fn major() -> Self {
        Self {
            role_type: RoleType::Major,
            master: None,
            offset: Vec2::ZERO,
            bond_xy: Bond::Strong,
            bond_wh: Bond::Strong,
            bond_r: Bond::Strong,
            bond_scale: Bond::Strong,
            align: None,
        }
    }

    pub fn minor(master: Entity, offset: Vec2) -> Self {
        Self {
            role_type: RoleType::Minor,
            master: Some(master),
            offset,
            ..Self::major()
        }
    }

    pub fn glued(master: Entity) -> Self {
        Self {
            role_type: RoleType::Glued,
            master: Some(master),
            ..Self::major()
        }
    }

    pub fn with_bonds(mut self, xy: Bond, wh: Bond, r: Bond, scale: Bond) -> Self {
        self.bond_xy = xy;
        self.bond_wh = wh;
        self.bond_r = r;
        self.bond_scale = scale;
        self
    }

    pub fn with_alignment(mut self, flags: Alignment, fine_tune: Vec2) -> Self {
        self.align = Some(AlignToMaster::new(flags, fine_tune));
        self
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::major()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flags() {
        let a = Alignment::parse("h_center | v_bottom").expect("valid");
        assert!(a.contains(Alignment::H_CENTER));
        assert!(a.contains(Alignment::V_BOTTOM));
        assert!(!a.contains(Alignment::H_LEFT));
        assert_eq!(a.bits(), 2 | 32);
        assert!(Alignment::parse("diagonal").is_none());
        assert_eq!(Alignment::parse(""), Some(Alignment::NONE));
    }

    #[test]
    fn offsets_against_master() {
        let size = Vec2::new(10.0, 4.0);
        let parent = Vec2::new(100.0, 50.0);
        let fine = Vec2::ZERO;
        assert_eq!(
            (Alignment::H_CENTER | Alignment::V_CENTER).offset(size, parent, fine),
            Vec2::new(45.0, 23.0)
        );
        assert_eq!(Alignment::H_RIGHT.offset(size, parent, fine).x, 100.0);
        assert_eq!(
            (Alignment::H_RIGHT | Alignment::H_INSIDE).offset(size, parent, fine).x,
            90.0
        );
        assert_eq!(Alignment::H_LEFT.offset(size, parent, fine).x, -10.0);
        assert_eq!(Alignment::V_TOP.offset(size, parent, fine).y, -4.0);
        assert_eq!(
            (Alignment::V_BOTTOM | Alignment::V_INSIDE).offset(size, parent, fine).y,
            46.0
        );
        assert_eq!(
            Alignment::H_CENTER.offset(size, parent, Vec2::new(2.0, 3.0)),
            Vec2::new(47.0, 3.0)
        );
    }

    #[test]
    fn align_to_master_resolves_only_on_change() {
        let mut align = AlignToMaster::new(Alignment::H_CENTER, Vec2::ZERO);
        let size = Vec2::new(10.0, 10.0);
        assert!(align.resolve(size, Vec2::new(50.0, 50.0)).is_some());
        assert!(align.resolve(size, Vec2::new(50.0, 50.0)).is_none());
        assert!(align.is_dirty(size, Vec2::new(60.0, 50.0)));
        assert_eq!(
            align.resolve(size, Vec2::new(60.0, 50.0)),
            Some(Vec2::new(25.0, 0.0))
        );
    }
}
