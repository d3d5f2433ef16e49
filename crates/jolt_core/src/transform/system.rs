//! Owns every transform and role and moves them once per frame, masters
//! before followers.

use std::collections::HashMap;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::math::{Pose, Rect};
use crate::time::FrameContext;
use crate::transform::component::Transform;
use crate::transform::role::{Bond, Role, RoleType};

/// Horizontal shadow shift at the edge of the world, in px before height
/// scaling.
pub const PARALLAX_STRENGTH: f32 = 1.5;
pub const SHADOW_DROP: f32 = -1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MajorInfo {
    pub major: Entity,
    /// Sum of role offsets from the entity up to `major`.
    pub offset: Vec2,
}

pub struct TransformSystem {
    transforms: HashMap<Entity, Transform>,
    roles: HashMap<Entity, Role>,
    major_cache: HashMap<Entity, (u64, MajorInfo)>,
    world_bounds: Rect,
    rng: StdRng,
}

impl TransformSystem {
    pub fn new() -> Self {
        Self::with_seed(0x6a6f_6c74)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            transforms: HashMap::new(),
            roles: HashMap::new(),
            major_cache: HashMap::new(),
            world_bounds: Rect::new(0.0, 0.0, 1280.0, 720.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn set_world_bounds(&mut self, bounds: Rect) {
        self.world_bounds = bounds;
    }

    pub fn world_bounds(&self) -> Rect {
        self.world_bounds
    }

    /// Adds (or replaces) a transform hard-set to `pose`.
    pub fn create(&mut self, entity: Entity, pose: Pose) -> &mut Transform {
        self.transforms.insert(entity, Transform::new(pose));
        self.transforms.entry(entity).or_default()
    }

    pub fn get(&self, entity: Entity) -> Option<&Transform> {
        self.transforms.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut Transform> {
        self.transforms.get_mut(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.transforms.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn role(&self, entity: Entity) -> Option<&Role> {
        self.roles.get(&entity)
    }

    /// Replaces the offset of an existing role (used by layout).
    pub fn set_role_offset(&mut self, entity: Entity, offset: Vec2) {
        if let Some(role) = self.roles.get_mut(&entity) {
            role.offset = offset;
        }
    }

    /// Rejects missing transforms, missing masters and cycles. A Major's
    /// master is always cleared.
    pub fn assign_role(&mut self, entity: Entity, role: Role) -> CoreResult<()> {
        if !self.contains(entity) {
            return Err(CoreError::Config(format!(
                "cannot assign a role to {entity}: it has no transform"
            )));
        }
        let mut role = role;
        match role.role_type {
            RoleType::Major => role.master = None,
            RoleType::Minor | RoleType::Glued => {
                let master = role.master.ok_or_else(|| {
                    CoreError::Config(format!(
                        "{:?} role for {entity} needs a master",
                        role.role_type
                    ))
                })?;
                if master == entity {
                    return Err(CoreError::Config(format!(
                        "{entity} cannot be its own master"
                    )));
                }
                if !self.contains(master) {
                    return Err(CoreError::Config(format!(
                        "master {master} of {entity} has no transform"
                    )));
                }
                let mut cursor = Some(master);
                let mut steps = 0;
                while let Some(current) = cursor {
                    if current == entity {
                        return Err(CoreError::Config(format!(
                            "making {master} the master of {entity} would create a cycle"
                        )));
                    }
                    steps += 1;
                    if steps > self.roles.len() + 1 {
                        break;
                    }
                    cursor = self.roles.get(&current).and_then(|r| r.master);
                }
            }
        }
        self.roles.insert(entity, role);
        self.major_cache.clear();
        Ok(())
    }

    /// Removes the entity and, recursively, everything that follows it.
    pub fn remove(&mut self, entity: Entity) -> Vec<Entity> {
        let mut removed = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            let had_transform = self.transforms.remove(&current).is_some();
            let had_role = self.roles.remove(&current).is_some();
            if had_transform || had_role {
                removed.push(current);
            }
            let mut followers: Vec<Entity> = self
                .roles
                .iter()
                .filter(|(_, r)| r.master == Some(current))
                .map(|(e, _)| *e)
                .collect();
            followers.sort();
            stack.extend(followers);
        }
        self.major_cache.clear();
        removed
    }

    pub fn inject_dynamic_motion(
        &mut self,
        entity: Entity,
        now: f64,
        amount: f32,
        rotation: Option<f32>,
        dampened: bool,
    ) -> bool {
        let rng = &mut self.rng;
        match self.transforms.get_mut(&entity) {
            Some(t) => {
                t.inject_dynamic_motion(now, amount, rotation.unwrap_or(0.0), dampened, rng);
                true
            }
            None => false,
        }
    }

    /// Walks master pointers up to the governing Major. The walk stops early
    /// at an entity whose position and rotation are both weakly bonded, since
    /// it moves on its own. Cached per frame.
    pub fn get_major(&mut self, entity: Entity, frame: u64) -> MajorInfo {
        if let Some((cached_frame, info)) = self.major_cache.get(&entity) {
            if *cached_frame == frame {
                return *info;
            }
        }
        let mut current = entity;
        let mut offset = Vec2::ZERO;
        for _ in 0..=self.roles.len() {
            let Some(role) = self.roles.get(&current) else {
                break;
            };
            let Some(master) = role.master else {
                break;
            };
            if role.bond_xy == Bond::Weak && role.bond_r == Bond::Weak {
                break;
            }
            offset += role.offset;
            current = master;
        }
        let info = MajorInfo {
            major: current,
            offset,
        };
        self.major_cache.insert(entity, (frame, info));
        info
    }

    /// Moves every entity once for this frame.
    pub fn update(&mut self, ctx: &FrameContext) -> CoreResult<()> {
        let mut order: Vec<Entity> = self.transforms.keys().copied().collect();
        order.sort();
        for entity in order {
            self.move_with_master(entity, ctx)?;
        }
        Ok(())
    }

    /// Moves `entity` for this frame, moving its master chain first. A
    /// second call in the same frame does nothing.
    pub fn move_with_master(&mut self, entity: Entity, ctx: &FrameContext) -> CoreResult<()> {
        self.move_entity(entity, ctx, 0)
    }

    fn move_entity(&mut self, entity: Entity, ctx: &FrameContext, depth: usize) -> CoreResult<()> {
        if depth > self.transforms.len() {
            return Err(CoreError::Fatal(format!(
                "master chain of {entity} is deeper than the entity count"
            )));
        }
        let Some(t) = self.transforms.get(&entity) else {
            return Ok(());
        };
        if t.moved_in_frame(ctx.frame) {
            return Ok(());
        }

        let role = self.roles.get(&entity).copied().unwrap_or_default();
        match role.master.filter(|_| role.role_type != RoleType::Major) {
            Some(master) if self.transforms.contains_key(&master) => {
                self.move_entity(master, ctx, depth + 1)?;
                self.follow(entity, master, role, ctx);
            }
            Some(master) => {
                log::warn!("{entity} follows {master}, which has no transform; moving on its own");
                self.step_own(entity, ctx);
            }
            None => self.step_own(entity, ctx),
        }

        if let Some(t) = self.transforms.get_mut(&entity) {
            t.frame_last_moved = Some(ctx.frame);
        }
        self.update_parallax(entity);
        Ok(())
    }

    fn step_own(&mut self, entity: Entity, ctx: &FrameContext) {
        if let Some(t) = self.transforms.get_mut(&entity) {
            t.expire_motion(ctx.now);
            if !t.is_stationary() {
                t.step(ctx.dt);
            }
        }
    }

    fn follow(&mut self, entity: Entity, master_id: Entity, role: Role, ctx: &FrameContext) {
        let Some(master) = self.transforms.get(&master_id).cloned() else {
            return;
        };
        let Some(t) = self.transforms.get_mut(&entity) else {
            return;
        };
        t.expire_motion(ctx.now);

        if role.role_type == RoleType::Glued {
            t.actual = master.actual;
            t.visual = master.visual;
            t.velocity = master.velocity;
            t.reduce_x_to_zero = master.reduce_x_to_zero;
            t.reduce_y_to_zero = master.reduce_y_to_zero;
            t.shadow_displacement = master.shadow_displacement;
            return;
        }

        let mut role = role;
        let mut realigned = false;
        if let Some(align) = role.align.as_mut() {
            if let Some(offset) = align.resolve(t.actual.size(), master.actual.size()) {
                role.offset = offset;
                realigned = true;
            }
            self.roles.insert(entity, role);
        }

        let target = rotated_offset(role.offset, t.actual.size(), master.actual.size(), master.actual.r);
        t.actual.x = master.actual.x + target.x;
        t.actual.y = master.actual.y + target.y;

        if !realigned && master.is_stationary() && t.is_stationary() {
            return;
        }

        let dt = ctx.dt;
        match role.bond_xy {
            Bond::Strong => {
                let shown = rotated_offset(role.offset, t.visual.size(), master.visual.size(), master.visual.r);
                t.visual.x = master.visual.x + shown.x;
                t.visual.y = master.visual.y + shown.y;
                t.velocity.x = master.velocity.x;
                t.velocity.y = master.velocity.y;
            }
            Bond::Weak => t.step_position(dt),
        }

        match role.bond_r {
            Bond::Strong => {
                t.visual.r = t.actual.r + master.rotation_offset;
                t.velocity.r = 0.0;
            }
            Bond::Weak => t.step_rotation(dt),
        }

        match role.bond_scale {
            Bond::Strong => {
                t.visual.scale = t.actual.scale * ratio(master.visual.scale, master.actual.scale);
                t.velocity.scale = 0.0;
            }
            Bond::Weak => t.step_scale(dt),
        }

        match role.bond_wh {
            Bond::Strong => {
                let rw = ratio(master.visual.w, master.actual.w);
                let rh = ratio(master.visual.h, master.actual.h);
                if role.bond_xy == Bond::Strong {
                    t.visual.x += 0.5 * (1.0 - rw) * t.visual.w;
                    t.visual.y += 0.5 * (1.0 - rh) * t.visual.h;
                }
                t.visual.w = t.actual.w * rw;
                t.visual.h = t.actual.h * rh;
            }
            Bond::Weak => t.step_size(dt),
        }
    }

    fn update_parallax(&mut self, entity: Entity) {
        let bounds = self.world_bounds;
        let Some(t) = self.transforms.get_mut(&entity) else {
            return;
        };
        if !t.has_shadow {
            return;
        }
        let half = bounds.w * 0.5;
        if half > 0.0 {
            let center_x = t.visual.x + t.visual.w * 0.5;
            t.shadow_displacement.x = (center_x - bounds.center().x) / half * PARALLAX_STRENGTH;
        }
        t.shadow_displacement.y = SHADOW_DROP;
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.transforms.keys().copied()
    }
}

impl Default for TransformSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(visual: f32, actual: f32) -> f32 {
    if actual.abs() < 1e-6 {
        1.0
    } else {
        visual / actual
    }
}

/// `offset` of a child's top-left from its master's top-left, rotated with
/// the master about the master's center.
fn rotated_offset(offset: Vec2, size: Vec2, master_size: Vec2, degrees: f32) -> Vec2 {
    if degrees.abs() < 0.0001 {
        return offset;
    }
    let pivot = master_size * 0.5 - size * 0.5;
    let (sin, cos) = degrees.to_radians().sin_cos();
    let d = offset - pivot;
    Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos) + pivot
}
