//! A pool of bullets sharing one style
//!
//! Each frame the driver takes a snapshot of every active pool, then runs the
//! velocity/control pass, the collision (or cull-only) pass and compaction.
//! Bullets added after the snapshot are not moved until the next frame, but
//! are visible to collision.

use rand::Rng;

use super::bullet::BulletRecord;
use super::collision::{Hurtbox, circle_on_circle};
use super::context::SimShared;
use super::control::{BulletControl, ControlCtx, ControlProgram};
use super::store::CompactingStore;
use super::style::StyleMetadata;
use super::target::HostileTarget;
use super::tick::FrameEvent;
use crate::config::{PlayableBounds, SoftcullDef};
use crate::consts::{CULL_EVERY_MASK, FRAME_TIME};
use crate::{priority, rotate_deg};

/// Index of a pool inside its registry. Invalidated by destroying copy pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(pub(crate) usize);

/// Which active partition a pool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolRole {
    /// Copy of the built-in non-colliding style
    EmptyCopy,
    /// Style defined at registry construction
    Base,
    /// Runtime `parent.variant` copy
    Copy,
    /// `p-` prefixed copy fired by the player
    Player,
}

impl PoolRole {
    /// Frame order of the active partitions
    pub const ORDER: [PoolRole; 4] = [
        PoolRole::EmptyCopy,
        PoolRole::Base,
        PoolRole::Copy,
        PoolRole::Player,
    ];

    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn is_copy(self) -> bool {
        matches!(self, PoolRole::EmptyCopy | PoolRole::Copy)
    }
}

/// Aggregated outcome of one pool's collision pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolCollision {
    /// Damage of a hit this frame, 0 if none
    pub damage: i32,
    pub graze: u32,
}

pub struct BulletPool {
    pub(crate) style: StyleMetadata,
    pub(crate) store: CompactingStore<BulletRecord>,
    pub(crate) controls: ControlProgram,
    pub(crate) role: PoolRole,
    pub(crate) active: bool,
    temp_last: usize,
    next_dt: f32,
}

/// Run `controls` on one bullet, stopping once it is deleted
fn run_controls(
    controls: &[BulletControl],
    store: &mut CompactingStore<BulletRecord>,
    index: usize,
    next_dt: &mut f32,
    shared: &mut SimShared,
) {
    for control in controls {
        if store.is_removed(index) {
            return;
        }
        let mut ctx = ControlCtx {
            store: &mut *store,
            index,
            next_dt: &mut *next_dt,
            shared: &mut *shared,
        };
        (control.action)(&mut ctx);
    }
}

/// Advance the cull counter and report whether the bullet should be culled now
#[inline]
fn cull_due(record: &mut BulletRecord, radius: f32, bounds: &PlayableBounds) -> bool {
    record.cull_frame_counter = record.cull_frame_counter.wrapping_add(1);
    record.cull_frame_counter & CULL_EVERY_MASK == 0 && bounds.off_screen_by(radius, record.loc())
}

impl BulletPool {
    pub fn new(style: StyleMetadata, role: PoolRole) -> Self {
        Self {
            style,
            store: CompactingStore::with_capacity(64),
            controls: ControlProgram::new(),
            role,
            active: false,
            temp_last: 0,
            next_dt: FRAME_TIME,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.style.name
    }

    #[inline]
    pub fn style(&self) -> &StyleMetadata {
        &self.style
    }

    #[inline]
    pub fn role(&self) -> PoolRole {
        self.role
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Live bullets
    #[inline]
    pub fn count(&self) -> usize {
        self.store.count()
    }

    #[inline]
    pub fn controls(&self) -> &ControlProgram {
        &self.controls
    }

    /// Bullet records; dense once the pool has been compacted
    #[inline]
    pub fn records(&self) -> &[BulletRecord] {
        self.store.as_slice()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &BulletRecord> {
        self.store.iter_live().map(|(_, r)| r)
    }

    /// Add a bullet. New bullets run the attached controls immediately.
    pub fn add(&mut self, mut record: BulletRecord, is_new: bool, shared: &mut SimShared) -> usize {
        if let Some(sc) = self.style.softcull {
            randomize_softcull(&mut record, &sc, shared);
            return self.store.add(record);
        }
        let index = self.store.add(record);
        if is_new && !self.controls.is_empty() {
            let mut dt = FRAME_TIME;
            run_controls(
                self.controls.as_slice(),
                &mut self.store,
                index,
                &mut dt,
                shared,
            );
        }
        index
    }

    pub fn add_control(&mut self, control: BulletControl) {
        self.controls.add(control);
    }

    /// Fix the number of bullets the velocity pass will visit this frame
    #[inline]
    pub fn snapshot(&mut self) {
        self.temp_last = self.store.slots();
    }

    /// Integrate motion and run controls for every bullet in the snapshot
    pub fn update_velocity(&mut self, shared: &mut SimShared) {
        if let Some(sc) = self.style.softcull {
            self.update_softcull(&sc, shared);
            return;
        }
        let controls = self.controls.as_slice();
        let post_vel = self.controls.first_at_least(priority::POST_VEL);
        let post_dir = self.controls.first_at_least(priority::POST_DIR);
        for i in 0..self.temp_last {
            if self.store.is_removed(i) {
                continue;
            }
            self.next_dt = FRAME_TIME;
            run_controls(&controls[..post_vel], &mut self.store, i, &mut self.next_dt, shared);
            if self.store.is_removed(i) {
                continue;
            }
            self.store[i].integrate(self.next_dt);
            run_controls(
                &controls[post_vel..post_dir],
                &mut self.store,
                i,
                &mut self.next_dt,
                shared,
            );
            if self.store.is_removed(i) {
                continue;
            }
            self.store[i].update_direction();
            run_controls(&controls[post_dir..], &mut self.store, i, &mut self.next_dt, shared);
        }
        self.controls.prune();
    }

    fn update_softcull(&mut self, sc: &SoftcullDef, shared: &mut SimShared) {
        for i in 0..self.temp_last {
            if self.store.is_removed(i) {
                continue;
            }
            let record = &mut self.store[i];
            record.info.t += FRAME_TIME;
            if record.info.t > sc.ttl {
                let id = record.id();
                self.store.delete(i);
                shared.release(id);
            }
        }
    }

    /// Test every live bullet against the tracked target, then cull
    pub fn check_collision(
        &mut self,
        hurtbox: &Hurtbox,
        bounds: &PlayableBounds,
        shared: &mut SimShared,
    ) -> PoolCollision {
        let mut out = PoolCollision::default();
        if !self.style.collides() {
            self.cull_only(bounds, shared);
            return out;
        }
        let style = &self.style;
        for i in 0..self.store.slots() {
            if self.store.is_removed(i) {
                continue;
            }
            let record = &mut self.store[i];
            let check_graze = if record.graze_frame_counter == 0 {
                true
            } else {
                record.graze_frame_counter -= 1;
                false
            };
            let result = style
                .collider
                .check(hurtbox, record.loc(), record.direction, record.scale);
            if result.collide {
                out.damage = out.damage.max(style.damage);
                if style.destructible {
                    let id = record.id();
                    self.store.delete(i);
                    shared.release(id);
                }
            } else if check_graze && result.graze {
                record.graze_frame_counter = style.graze_every;
                out.graze += 1;
            } else if style.runtime.allow_cull
                && cull_due(record, style.runtime.cull_radius, bounds)
            {
                let id = record.id();
                self.store.delete(i);
                shared.release(id);
            }
        }
        out
    }

    /// Off-screen culling only, for frames without a tracked target
    pub fn cull_only(&mut self, bounds: &PlayableBounds, shared: &mut SimShared) {
        if !self.style.runtime.allow_cull || self.style.is_softcull() {
            return;
        }
        let radius = self.style.runtime.cull_radius;
        for i in 0..self.store.slots() {
            if self.store.is_removed(i) {
                continue;
            }
            let record = &mut self.store[i];
            if cull_due(record, radius, bounds) {
                let id = record.id();
                self.store.delete(i);
                shared.release(id);
            }
        }
    }

    /// Player bullets against hostile targets
    pub fn check_player<T: HostileTarget>(
        &mut self,
        targets: &mut [T],
        bounds: &PlayableBounds,
        shared: &mut SimShared,
    ) {
        let style = &self.style;
        for i in 0..self.store.slots() {
            if self.store.is_removed(i) {
                continue;
            }
            let record = &mut self.store[i];
            // Player bullets always leave once off screen
            if cull_due(record, style.runtime.cull_radius, bounds) {
                let id = record.id();
                self.store.delete(i);
                shared.release(id);
                continue;
            }
            let loc = record.loc();
            let id = record.id();
            for (target_index, target) in targets.iter_mut().enumerate() {
                if !target.accepts_damage()
                    || !circle_on_circle(target.location(), target.radius(), loc, style.effective_radius)
                {
                    continue;
                }
                if !style.destructible && !target.try_hit_indestructible(id, style.enemy_cooldown) {
                    continue;
                }
                if let Some(fire) = shared.aux.player_fire(id).copied() {
                    target.receive_player_fire(&fire, loc);
                    shared.events.push(FrameEvent::EnemyHit {
                        target: target_index,
                        bullet_id: id,
                        loc,
                        fire,
                    });
                }
                if style.destructible {
                    self.store.delete(i);
                    shared.release(id);
                    break;
                }
            }
        }
    }

    #[inline]
    pub fn compact(&mut self) {
        self.store.compact();
    }

    /// Remove every bullet and its auxiliary state
    pub fn clear(&mut self, shared: &mut SimShared) {
        for (_, record) in self.store.iter_live() {
            shared.release(record.id());
        }
        self.store.clear();
        self.temp_last = 0;
    }

    /// Remove every bullet and restore runtime style fields
    pub fn reset(&mut self, shared: &mut SimShared) {
        self.clear(shared);
        self.style.reset_runtime();
    }

    pub(crate) fn activate(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.temp_last = 0;
        true
    }
}

fn randomize_softcull(record: &mut BulletRecord, sc: &SoftcullDef, shared: &mut SimShared) {
    if sc.time_randomization > 0.0 {
        record.info.t += shared.rng.random_range(0.0..sc.time_randomization);
    }
    if sc.rotation_randomization > 0.0 {
        let half = sc.rotation_randomization / 2.0;
        record.direction = rotate_deg(record.direction, shared.rng.random_range(-half..half));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleDef;
    use crate::sim::bullet::Velocity;
    use crate::sim::control::always;
    use crate::sim::side_table::PlayerFire;
    use crate::sim::target::Enemy;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pool(def: StyleDef) -> BulletPool {
        let mut pool = BulletPool::new(StyleMetadata::from_def(&def).unwrap(), PoolRole::Base);
        pool.activate();
        pool
    }

    fn moving(pool: &mut BulletPool, shared: &mut SimShared, loc: Vec2, vel: Vec2) -> usize {
        let id = shared.alloc_id();
        let record = BulletRecord::new(Velocity::constant(loc, vel), None, None, 0.0, id, 0);
        pool.add(record, true, shared)
    }

    fn frame(pool: &mut BulletPool, shared: &mut SimShared, hurtbox: &Hurtbox) -> PoolCollision {
        pool.snapshot();
        pool.update_velocity(shared);
        let out = pool.check_collision(hurtbox, &PlayableBounds::default(), shared);
        pool.compact();
        out
    }

    fn far_hurtbox() -> Hurtbox {
        Hurtbox::new(Vec2::new(100.0, 100.0), 0.05, 0.5)
    }

    #[test]
    fn test_control_phases_run_in_order() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        for (prio, tag) in [(priority::POST_DIR, "post_dir"), (-5, "pre"), (priority::DEFAULT, "mid")] {
            let seen = seen.clone();
            p.add_control(BulletControl::new(
                prio,
                Rc::new(move |ctx: &mut ControlCtx<'_>| {
                    seen.borrow_mut().push((tag, ctx.bullet().info.t, ctx.bullet().direction));
                }),
            ));
        }
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::new(0.0, 1.0));
        p.store[0].direction = Vec2::X;
        seen.borrow_mut().clear();
        frame(&mut p, &mut shared, &far_hurtbox());
        let seen = seen.borrow();
        assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), vec!["pre", "mid", "post_dir"]);
        // Integration happens between the pre and mid phases
        assert_eq!(seen[0].1, 0.0);
        assert!((seen[1].1 - FRAME_TIME).abs() < 1e-7);
        // Direction is refreshed before the post-direction phase
        assert_eq!(seen[1].2, Vec2::X);
        assert!((seen[2].2 - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_deleted_bullet_skips_remaining_controls() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        let runs = Rc::new(RefCell::new(0));
        let counter = runs.clone();
        p.add_control(BulletControl::cull(always()));
        p.add_control(BulletControl::new(
            priority::ON_COLLIDE,
            Rc::new(move |_: &mut ControlCtx<'_>| *counter.borrow_mut() += 1),
        ));
        // Controls run on spawn, so the bullet dies immediately
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::X);
        assert_eq!(p.count(), 0);
        assert_eq!(*runs.borrow(), 0);
    }

    #[test]
    fn test_slowdown_scales_integration() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::new(1.0, 0.0));
        p.add_control(BulletControl::slowdown(0.5, always()));
        frame(&mut p, &mut shared, &far_hurtbox());
        assert!((p.records()[0].loc().x - 0.5 * FRAME_TIME).abs() < 1e-7);
    }

    #[test]
    fn test_snapshot_excludes_late_additions() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::X);
        p.snapshot();
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::X);
        p.update_velocity(&mut shared);
        assert!(p.records()[0].loc().x > 0.0);
        assert_eq!(p.records()[1].loc().x, 0.0);
    }

    #[test]
    fn test_hit_deletes_destructible_and_reports_damage() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1).with_damage(3));
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        let hurtbox = Hurtbox::new(Vec2::ZERO, 0.05, 0.5);
        let out = frame(&mut p, &mut shared, &hurtbox);
        assert_eq!(out, PoolCollision { damage: 3, graze: 0 });
        assert_eq!(p.count(), 0);

        let mut hard = pool(StyleDef::circle("h", 0.1).indestructible());
        moving(&mut hard, &mut shared, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(frame(&mut hard, &mut shared, &hurtbox).damage, 1);
        assert_eq!(hard.count(), 1);
    }

    #[test]
    fn test_graze_cadence() {
        let mut shared = SimShared::new(1);
        let k = 4u16;
        let mut p = pool(StyleDef::circle("c", 0.1).with_graze_every(k));
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        // In graze range but outside the hit circle
        let hurtbox = Hurtbox::new(Vec2::new(0.4, 0.0), 0.05, 0.5);
        let grazes: Vec<u32> = (0..20).map(|_| frame(&mut p, &mut shared, &hurtbox).graze).collect();
        let frames: Vec<usize> = grazes
            .iter()
            .enumerate()
            .filter(|(_, g)| **g > 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(frames, vec![0, 5, 10, 15]);
        for pair in frames.windows(2) {
            assert!(pair[1] - pair[0] >= k as usize + 1);
        }
    }

    #[test]
    fn test_off_screen_cull_within_mask_period() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        // Stationary, well beyond the cull radius
        moving(&mut p, &mut shared, Vec2::new(20.0, 0.0), Vec2::ZERO);
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        let hurtbox = far_hurtbox();
        for _ in 0..=CULL_EVERY_MASK {
            frame(&mut p, &mut shared, &hurtbox);
        }
        assert_eq!(p.count(), 1);
        assert_eq!(p.records()[0].loc(), Vec2::ZERO);
    }

    #[test]
    fn test_cull_disabled_keeps_bullets() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("c", 0.1));
        p.style.runtime.allow_cull = false;
        moving(&mut p, &mut shared, Vec2::new(20.0, 0.0), Vec2::ZERO);
        for _ in 0..300 {
            p.snapshot();
            p.update_velocity(&mut shared);
            p.cull_only(&PlayableBounds::default(), &mut shared);
            p.compact();
        }
        assert_eq!(p.count(), 1);
    }

    #[test]
    fn test_softcull_ttl_and_randomization() {
        let mut shared = SimShared::new(42);
        let mut def = StyleDef::softcull("fade", 0.1);
        if let Some(sc) = def.softcull.as_mut() {
            sc.time_randomization = 0.05;
            sc.rotation_randomization = 30.0;
        }
        let mut p = pool(def);
        let id = shared.alloc_id();
        p.add(BulletRecord::null(Vec2::ZERO, Vec2::X, id), true, &mut shared);
        let record = &p.records()[0];
        assert!(record.info.t >= 0.0 && record.info.t < 0.05);
        let angle = record.direction.y.atan2(record.direction.x).to_degrees();
        assert!(angle.abs() <= 15.0);

        let hurtbox = Hurtbox::new(Vec2::ZERO, 1.0, 2.0);
        let mut frames = 0;
        while p.count() > 0 {
            // Soft-culled bullets never collide
            assert_eq!(frame(&mut p, &mut shared, &hurtbox), PoolCollision::default());
            frames += 1;
        }
        assert!(frames <= 13);
    }

    #[test]
    fn test_player_sweep_destructible() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("p-c", 0.1));
        let i = moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        let id = p.records()[i].id();
        shared.aux.entry(id).player_fire = Some(PlayerFire::new(5, 2));
        let mut targets = vec![Enemy::new(Vec2::new(0.5, 0.0), 0.5), Enemy::new(Vec2::ZERO, 0.5)];
        p.check_player(&mut targets, &PlayableBounds::default(), &mut shared);
        p.compact();
        // Deleted on the first hit; the second target is untouched
        assert_eq!(targets[0].damage_taken, 2);
        assert_eq!(targets[1].damage_taken, 0);
        assert_eq!(p.count(), 0);
        assert!(shared.aux.get(id).is_none());
        assert!(matches!(shared.events[..], [FrameEvent::EnemyHit { target: 0, .. }]));
    }

    #[test]
    fn test_player_sweep_indestructible_cooldown() {
        let mut shared = SimShared::new(1);
        let mut def = StyleDef::circle("p-l", 0.1).indestructible();
        def.enemy_cooldown = 3;
        let mut p = pool(def);
        let i = moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        let id = p.records()[i].id();
        shared.aux.entry(id).player_fire = Some(PlayerFire::new(1, 1));
        let mut targets = vec![Enemy::new(Vec2::ZERO, 0.5)];
        for _ in 0..6 {
            p.check_player(&mut targets, &PlayableBounds::default(), &mut shared);
            targets[0].end_frame();
        }
        // Hits on frames 0 and 3
        assert_eq!(targets[0].damage_taken, 2);
        assert_eq!(p.count(), 1);
    }

    #[test]
    fn test_player_bullets_culled_even_when_cull_disabled() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("p-c", 0.1));
        p.style.runtime.allow_cull = false;
        moving(&mut p, &mut shared, Vec2::new(0.0, 20.0), Vec2::ZERO);
        let mut targets: Vec<Enemy> = Vec::new();
        for _ in 0..=CULL_EVERY_MASK {
            p.check_player(&mut targets, &PlayableBounds::default(), &mut shared);
            p.compact();
        }
        assert_eq!(p.count(), 0);
    }

    #[test]
    fn test_invulnerable_target_ignored() {
        let mut shared = SimShared::new(1);
        let mut p = pool(StyleDef::circle("p-c", 0.1));
        moving(&mut p, &mut shared, Vec2::ZERO, Vec2::ZERO);
        let mut enemy = Enemy::new(Vec2::ZERO, 1.0);
        enemy.vulnerable = false;
        let mut targets = [enemy];
        p.check_player(&mut targets, &PlayableBounds::default(), &mut shared);
        assert_eq!(p.count(), 1);
    }
}
