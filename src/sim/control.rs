//! Scripted per-bullet behavior attached to pools
//!
//! A pool's [`ControlProgram`] is a priority-sorted list of actions run against
//! every bullet each frame. Two thresholds split the list into three phases:
//! before velocity integration (`priority < POST_VEL`), between integration and
//! the direction update, and after the direction update (`priority >= POST_DIR`).

use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::bullet::{BulletRecord, ParametricInfo};
use super::context::{SimShared, Transfer};
use super::side_table::BulletAux;
use super::store::CompactingStore;
use super::tick::FrameEvent;
use crate::priority;

pub type ControlAction = Rc<dyn Fn(&mut ControlCtx<'_>)>;
/// Per-bullet condition gating a built-in control
pub type BulletPred = Rc<dyn Fn(&ParametricInfo) -> bool>;
pub type PersistFn = Rc<dyn Fn() -> bool>;

/// Condition that always holds
pub fn always() -> BulletPred {
    Rc::new(|_: &ParametricInfo| true)
}

/// How long a control stays attached
#[derive(Clone, Default)]
pub enum Persist {
    #[default]
    Always,
    /// Removed after the first frame it runs
    Once,
    While(PersistFn),
}

impl Persist {
    #[inline]
    pub fn holds(&self) -> bool {
        match self {
            Persist::Always => true,
            Persist::Once => false,
            Persist::While(f) => f(),
        }
    }
}

/// Access a control action has to the bullet it runs on
pub struct ControlCtx<'a> {
    pub(crate) store: &'a mut CompactingStore<BulletRecord>,
    pub(crate) index: usize,
    pub(crate) next_dt: &'a mut f32,
    pub(crate) shared: &'a mut SimShared,
}

impl ControlCtx<'_> {
    #[inline]
    pub fn bullet(&self) -> &BulletRecord {
        &self.store[self.index]
    }

    #[inline]
    pub fn bullet_mut(&mut self) -> &mut BulletRecord {
        &mut self.store[self.index]
    }

    #[inline]
    pub fn info(&self) -> &ParametricInfo {
        &self.store[self.index].info
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.store.is_removed(self.index)
    }

    /// Delete the bullet and drop its auxiliary state
    pub fn delete(&mut self) {
        let id = self.bullet().id();
        if self.store.delete(self.index) {
            self.shared.release(id);
        }
    }

    /// Scale the timestep used for this bullet's integration this frame
    #[inline]
    pub fn speedup(&mut self, ratio: f32) {
        *self.next_dt *= ratio;
    }

    /// Auxiliary state of this bullet, created if missing
    pub fn aux_mut(&mut self) -> &mut BulletAux {
        let id = self.bullet().id();
        self.shared.aux.entry(id)
    }

    /// Move this bullet into another style, keeping its id
    pub fn restyle(&mut self, style: &str) {
        if !self.store.delete(self.index) {
            return;
        }
        let record = self.bullet().clone();
        self.shared.outbox.push(Transfer::Move {
            style: style.to_string(),
            record,
        });
    }

    /// Add an independent copy of this bullet to another style
    pub fn copy_to(&mut self, style: &str) {
        let mut record = self.bullet().clone();
        let id = self.shared.alloc_id();
        self.shared.aux.clone_entry(record.id(), id);
        record.info.id = id;
        self.shared.outbox.push(Transfer::Copy {
            style: style.to_string(),
            record,
        });
    }

    /// Spawn a motionless bullet of another style where this one is
    pub fn copy_null(&mut self, style: &str) {
        let b = self.bullet();
        let transfer = Transfer::Null {
            style: style.to_string(),
            loc: b.loc(),
            direction: b.direction,
            time_advance: 0.0,
            softcull: false,
        };
        self.shared.outbox.push(transfer);
    }

    /// Replace this bullet with a fading copy in a soft-cull style
    pub fn softcull(&mut self, style: &str, time_advance: f32) {
        let b = self.bullet();
        let transfer = Transfer::Null {
            style: style.to_string(),
            loc: b.loc(),
            direction: b.direction,
            time_advance,
            softcull: true,
        };
        self.shared.outbox.push(transfer);
        self.delete();
    }

    /// Raise a named event for the game layer
    pub fn emit(&mut self, name: &str) {
        let b = self.bullet();
        let event = FrameEvent::Script {
            name: name.to_string(),
            bullet_id: b.id(),
            loc: b.loc(),
        };
        self.shared.events.push(event);
    }
}

/// A pool a control spawns into, checked when the control is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTarget {
    pub style: String,
    /// The pool must be a soft-cull style
    pub softcull: bool,
}

#[derive(Clone)]
pub struct BulletControl {
    pub priority: i32,
    pub action: ControlAction,
    pub persist: Persist,
    /// Pools this control may spawn into
    pub targets: Vec<ControlTarget>,
}

impl fmt::Debug for BulletControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulletControl")
            .field("priority", &self.priority)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

/// Wrap `body` so it only runs when `cond` holds for the bullet
fn gated(cond: BulletPred, body: impl Fn(&mut ControlCtx<'_>) + 'static) -> ControlAction {
    Rc::new(move |ctx: &mut ControlCtx<'_>| {
        if cond(ctx.info()) {
            body(ctx);
        }
    })
}

impl BulletControl {
    pub fn new(priority: i32, action: ControlAction) -> Self {
        Self {
            priority,
            action,
            persist: Persist::Always,
            targets: Vec::new(),
        }
    }

    fn targeting(mut self, style: &str, softcull: bool) -> Self {
        self.targets.push(ControlTarget {
            style: style.to_string(),
            softcull,
        });
        self
    }

    /// Detach after the first frame
    pub fn once(mut self) -> Self {
        self.persist = Persist::Once;
        self
    }

    pub fn persist_while(mut self, f: PersistFn) -> Self {
        self.persist = Persist::While(f);
        self
    }

    /// Same underlying action, used when asserting controls are attached
    pub fn same_as(&self, other: &BulletControl) -> bool {
        self.priority == other.priority && Rc::ptr_eq(&self.action, &other.action)
    }

    pub fn set_x(x: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_1, gated(cond, move |ctx| ctx.bullet_mut().info.loc.x = x))
    }

    pub fn set_y(y: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_1, gated(cond, move |ctx| ctx.bullet_mut().info.loc.y = y))
    }

    pub fn set_time(t: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_1, gated(cond, move |ctx| ctx.bullet_mut().info.t = t))
    }

    pub fn dx(dx: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_2, gated(cond, move |ctx| ctx.bullet_mut().info.loc.x += dx))
    }

    pub fn dy(dy: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_2, gated(cond, move |ctx| ctx.bullet_mut().info.loc.y += dy))
    }

    pub fn dt(dt: f32, cond: BulletPred) -> Self {
        Self::new(priority::MOVE_1, gated(cond, move |ctx| ctx.bullet_mut().info.t += dt))
    }

    /// Mirror horizontal motion in place
    pub fn flip_x(cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, |ctx| {
                let b = ctx.bullet_mut();
                b.velocity.flip_x = !b.velocity.flip_x;
                b.direction.x = -b.direction.x;
            }),
        )
    }

    pub fn flip_y(cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, |ctx| {
                let b = ctx.bullet_mut();
                b.velocity.flip_y = !b.velocity.flip_y;
                b.direction.y = -b.direction.y;
            }),
        )
    }

    /// Bounce off the wall `x = wall` when crossing it to the right
    pub fn flip_x_gt(wall: f32, cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, move |ctx| {
                if ctx.info().loc.x > wall {
                    ctx.bullet_mut().flip_x_about(wall);
                }
            }),
        )
    }

    pub fn flip_x_lt(wall: f32, cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, move |ctx| {
                if ctx.info().loc.x < wall {
                    ctx.bullet_mut().flip_x_about(wall);
                }
            }),
        )
    }

    pub fn flip_y_gt(wall: f32, cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, move |ctx| {
                if ctx.info().loc.y > wall {
                    ctx.bullet_mut().flip_y_about(wall);
                }
            }),
        )
    }

    pub fn flip_y_lt(wall: f32, cond: BulletPred) -> Self {
        Self::new(
            priority::MOVE_3,
            gated(cond, move |ctx| {
                if ctx.info().loc.y < wall {
                    ctx.bullet_mut().flip_y_about(wall);
                }
            }),
        )
    }

    /// Multiply the bullet's timestep by `ratio` while `cond` holds
    pub fn slowdown(ratio: f32, cond: BulletPred) -> Self {
        Self::new(priority::TIME_CONTROL, gated(cond, move |ctx| ctx.speedup(ratio)))
    }

    pub fn freeze(cond: BulletPred) -> Self {
        Self::slowdown(0.0, cond)
    }

    pub fn cull(cond: BulletPred) -> Self {
        Self::new(priority::CULL, gated(cond, |ctx| ctx.delete()))
    }

    pub fn restyle(style: &str, cond: BulletPred) -> Self {
        let target = style.to_string();
        Self::new(priority::CULL, gated(cond, move |ctx| ctx.restyle(&target)))
            .targeting(style, false)
    }

    /// Restyle, leaving a motionless effect bullet behind
    pub fn restyle_effect(style: &str, effect: &str, cond: BulletPred) -> Self {
        let (target, spark) = (style.to_string(), effect.to_string());
        Self::new(
            priority::CULL,
            gated(cond, move |ctx| {
                ctx.copy_null(&spark);
                ctx.restyle(&target);
            }),
        )
        .targeting(style, false)
        .targeting(effect, false)
    }

    pub fn copy(style: &str, cond: BulletPred) -> Self {
        let target = style.to_string();
        Self::new(priority::RUN, gated(cond, move |ctx| ctx.copy_to(&target)))
            .targeting(style, false)
    }

    pub fn copy_null(style: &str, cond: BulletPred) -> Self {
        let target = style.to_string();
        Self::new(priority::RUN, gated(cond, move |ctx| ctx.copy_null(&target)))
            .targeting(style, false)
    }

    /// Replace the bullet with a fading copy in `style`, which must be a soft-cull pool
    pub fn softcull(style: &str, cond: BulletPred) -> Self {
        let target = style.to_string();
        Self::new(priority::CULL, gated(cond, move |ctx| ctx.softcull(&target, 0.0)))
            .targeting(style, true)
    }

    /// Store `f(info)` under `name` in the bullet's auxiliary state
    pub fn save_float(
        name: &str,
        f: Rc<dyn Fn(&ParametricInfo) -> f32>,
        cond: BulletPred,
    ) -> Self {
        let name = name.to_string();
        Self::new(
            priority::SAVE,
            gated(cond, move |ctx| {
                let value = f(ctx.info());
                ctx.aux_mut().floats.insert(name.clone(), value);
            }),
        )
    }

    pub fn save_vector(
        name: &str,
        f: Rc<dyn Fn(&ParametricInfo) -> Vec2>,
        cond: BulletPred,
    ) -> Self {
        let name = name.to_string();
        Self::new(
            priority::SAVE,
            gated(cond, move |ctx| {
                let value = f(ctx.info());
                ctx.aux_mut().vectors.insert(name.clone(), value);
            }),
        )
    }

    pub fn event(name: &str, cond: BulletPred) -> Self {
        let name = name.to_string();
        Self::new(priority::RUN, gated(cond, move |ctx| ctx.emit(&name)))
    }

    /// Run `controls` in order, under one condition, stopping once the bullet is deleted
    pub fn batch(priority: i32, cond: BulletPred, controls: Vec<BulletControl>) -> Self {
        let targets: Vec<ControlTarget> = controls.iter().flat_map(|c| c.targets.clone()).collect();
        let mut control = Self::new(
            priority,
            gated(cond, move |ctx| {
                for c in &controls {
                    if ctx.is_deleted() {
                        break;
                    }
                    (c.action)(ctx);
                }
            }),
        );
        control.targets = targets;
        control
    }
}

/// Priority-sorted control list of one pool
#[derive(Debug, Clone, Default)]
pub struct ControlProgram {
    controls: Vec<BulletControl>,
}

impl ControlProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every control with priority <= the new one
    pub fn add(&mut self, control: BulletControl) {
        let at = self
            .controls
            .partition_point(|c| c.priority <= control.priority);
        self.controls.insert(at, control);
    }

    /// Index of the first control with priority >= `priority`
    #[inline]
    pub fn first_at_least(&self, priority: i32) -> usize {
        self.controls.partition_point(|c| c.priority < priority)
    }

    /// Drop controls whose persistence condition no longer holds
    pub fn prune(&mut self) {
        if !self.controls.is_empty() {
            self.controls.retain(|c| c.persist.holds());
        }
    }

    pub fn contains(&self, control: &BulletControl) -> bool {
        self.controls.iter().any(|c| c.same_as(control))
    }

    #[inline]
    pub fn as_slice(&self) -> &[BulletControl] {
        &self.controls
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn clear(&mut self) {
        self.controls.clear();
    }
}
