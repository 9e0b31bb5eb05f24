//! Fixed timestep frame driver
//!
//! One call to [`CollisionRouter::tick`] advances every active pool by one
//! frame and reports what the game layer needs to react to.

use glam::Vec2;

use super::collision::Hurtbox;
use super::pool::{PoolId, PoolRole};
use super::registry::PoolRegistry;
use super::side_table::PlayerFire;
use super::target::HostileTarget;
use crate::error::Result;

/// Something the game layer should react to
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// The tracked target was hit; `damage` is the largest single hit this frame
    PlayerHit { damage: i32 },
    /// Grazes summed over every pool this frame
    Graze { count: u32 },
    /// A player bullet damaged a hostile target
    EnemyHit {
        target: usize,
        bullet_id: u32,
        loc: Vec2,
        fire: PlayerFire,
    },
    /// Raised by an event control
    Script {
        name: String,
        bullet_id: u32,
        loc: Vec2,
    },
}

/// Per-frame outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub damage: i32,
    pub graze: u32,
    pub events: Vec<FrameEvent>,
}

/// Per-frame input
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Tracked target; `None` while it is absent or cannot be hit
    pub hurtbox: Option<Hurtbox>,
}

/// Drives the registry one frame at a time and keeps running totals
#[derive(Debug, Clone, Default)]
pub struct CollisionRouter {
    pub frame: u64,
    pub total_graze: u64,
    pub total_hits: u64,
}

impl CollisionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every active pool by one frame
    pub fn tick<T: HostileTarget>(
        &mut self,
        registry: &mut PoolRegistry,
        input: &TickInput,
        targets: &mut [T],
    ) -> Result<FrameReport> {
        for role in PoolRole::ORDER {
            for k in 0..registry.active(role).len() {
                let id = registry.active(role)[k];
                registry.pools[id.0].snapshot();
            }
        }

        for role in PoolRole::ORDER {
            // Transfers may activate pools mid-pass; they join with an empty snapshot
            let mut k = 0;
            while k < registry.active(role).len() {
                let id = registry.active(role)[k];
                registry.pools[id.0].update_velocity(&mut registry.shared);
                registry.flush_transfers()?;
                k += 1;
            }
        }

        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };
        let hostile = [PoolRole::EmptyCopy, PoolRole::Base, PoolRole::Copy];
        match &input.hurtbox {
            Some(hurtbox) => {
                for id in Self::listed(registry, &hostile) {
                    let PoolRegistry {
                        pools,
                        shared,
                        bounds,
                        ..
                    } = &mut *registry;
                    let pool = &mut pools[id.0];
                    if pool.store.slots() == 0 {
                        continue;
                    }
                    let hit = pool.check_collision(hurtbox, bounds, shared);
                    report.damage = report.damage.max(hit.damage);
                    report.graze += hit.graze;
                    pool.compact();
                }
            }
            None => {
                for id in Self::listed(registry, &hostile) {
                    let PoolRegistry {
                        pools,
                        shared,
                        bounds,
                        ..
                    } = &mut *registry;
                    let pool = &mut pools[id.0];
                    pool.cull_only(bounds, shared);
                    pool.compact();
                }
            }
        }

        for id in Self::listed(registry, &[PoolRole::Player]) {
            let PoolRegistry {
                pools,
                shared,
                bounds,
                ..
            } = &mut *registry;
            let pool = &mut pools[id.0];
            pool.check_player(targets, bounds, shared);
            pool.compact();
        }
        for target in targets.iter_mut() {
            target.end_frame();
        }

        if report.damage > 0 {
            self.total_hits += 1;
            report.events.push(FrameEvent::PlayerHit {
                damage: report.damage,
            });
        }
        if report.graze > 0 {
            self.total_graze += u64::from(report.graze);
            report.events.push(FrameEvent::Graze {
                count: report.graze,
            });
        }
        report.events.append(&mut registry.shared.events);
        self.frame += 1;
        Ok(report)
    }

    fn listed(registry: &PoolRegistry, roles: &[PoolRole]) -> Vec<PoolId> {
        roles
            .iter()
            .flat_map(|role| registry.active(*role).iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, StyleDef};
    use crate::consts::{CULL_EVERY_MASK, FRAME_TIME};
    use crate::sim::bullet::{BulletRecord, DirectionFn, ParametricInfo, ScaleFn, Velocity};
    use crate::sim::control::{BulletControl, always};
    use crate::sim::registry::SpawnRequest;
    use crate::sim::target::Enemy;
    use crate::cos_sin_deg;
    use std::rc::Rc;

    fn no_targets() -> Vec<Enemy> {
        Vec::new()
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_style(StyleDef::circle("small", 0.05).with_damage(3))
            .with_style(StyleDef::circle("big", 0.05).with_damage(5))
            .with_style(StyleDef::softcull("fade", 0.1))
    }

    #[test]
    fn test_damage_is_max_and_graze_is_sum() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        registry.spawn_null("small", Vec2::ZERO, Vec2::X).unwrap();
        registry.spawn_null("big", Vec2::ZERO, Vec2::X).unwrap();
        registry.spawn_null("small", Vec2::new(0.4, 0.0), Vec2::X).unwrap();
        registry.spawn_null("big", Vec2::new(-0.4, 0.0), Vec2::X).unwrap();
        let input = TickInput {
            hurtbox: Some(Hurtbox::new(Vec2::ZERO, 0.05, 0.5)),
        };
        let report = router.tick(&mut registry, &input, &mut no_targets()).unwrap();
        assert_eq!(report.damage, 5);
        assert_eq!(report.graze, 2);
        assert_eq!(
            report.events,
            vec![FrameEvent::PlayerHit { damage: 5 }, FrameEvent::Graze { count: 2 }]
        );
        // Both hits were destructible
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_no_hurtbox_only_culls() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        registry.spawn_null("small", Vec2::ZERO, Vec2::X).unwrap();
        registry.spawn_null("small", Vec2::new(30.0, 0.0), Vec2::X).unwrap();
        let input = TickInput::default();
        for _ in 0..=CULL_EVERY_MASK {
            let report = router.tick(&mut registry, &input, &mut no_targets()).unwrap();
            assert_eq!(report.damage, 0);
            assert!(report.events.is_empty());
        }
        assert_eq!(registry.count(), 1);
        assert_eq!(router.frame, u64::from(CULL_EVERY_MASK) + 1);
    }

    #[test]
    fn test_radial_burst_clears_screen() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        for i in 0..1000 {
            let dir = cos_sin_deg(i as f32 * 0.36);
            registry
                .spawn(SpawnRequest::new("small", Velocity::constant(Vec2::ZERO, dir * 4.0)).with_index(i))
                .unwrap();
        }
        assert_eq!(registry.count(), 1000);
        // Hurtbox parked far away so nothing is hit or grazed
        let input = TickInput {
            hurtbox: Some(Hurtbox::new(Vec2::new(0.0, -100.0), 0.05, 0.5)),
        };
        // Farthest cull corner is about 10 units out; at 4 units/s that is 2.5 s
        let frames = (3.0 / FRAME_TIME) as usize + usize::from(CULL_EVERY_MASK) + 1;
        for _ in 0..frames {
            let report = router.tick(&mut registry, &input, &mut no_targets()).unwrap();
            assert_eq!(report.graze, 0);
        }
        assert_eq!(registry.count(), 0);
        assert!(registry.aux().is_empty());
    }

    #[test]
    fn test_player_bullets_hit_enemies() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        let handle = registry
            .spawn(
                SpawnRequest::new("p-small", Velocity::constant(Vec2::ZERO, Vec2::new(0.0, 6.0)))
                    .with_player_fire(crate::sim::side_table::PlayerFire::new(10, 4)),
            )
            .unwrap();
        let mut enemies = vec![Enemy::boss(Vec2::new(0.0, 1.0), 0.3)];
        let input = TickInput::default();
        let mut hit_frame = None;
        for f in 0..60 {
            let report = router.tick(&mut registry, &input, &mut enemies).unwrap();
            if report.events.iter().any(|e| matches!(e, FrameEvent::EnemyHit { .. })) {
                hit_frame = Some(f);
                break;
            }
        }
        assert!(hit_frame.is_some());
        assert_eq!(enemies[0].damage_taken, 10);
        assert!(registry.find(handle).is_none());
        assert!(registry.aux().is_empty());
    }

    #[test]
    fn test_autocull_moves_bullets_to_softcull_pool() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        for x in 0..5 {
            registry.spawn_null("small", Vec2::new(x as f32 * 0.2, 2.0), Vec2::X).unwrap();
        }
        registry.spawn_null("p-big", Vec2::ZERO, Vec2::X).unwrap();
        registry.autocull("fade").unwrap();
        let input = TickInput::default();
        router.tick(&mut registry, &input, &mut no_targets()).unwrap();
        assert_eq!(registry.count_of("small"), 0);
        assert_eq!(registry.count_of("fade"), 5);
        assert_eq!(registry.count_of("p-big"), 1);
        // One-shot control is gone after the frame
        assert!(registry.pool_by_name("small").unwrap().controls().is_empty());
        for _ in 0..20 {
            router.tick(&mut registry, &input, &mut no_targets()).unwrap();
        }
        assert_eq!(registry.count_of("fade"), 0);
    }

    #[test]
    fn test_script_events_reported() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        registry.spawn_null("small", Vec2::ONE, Vec2::X).unwrap();
        registry
            .add_pool_control("small", BulletControl::event("ping", always()).once())
            .unwrap();
        let report = router
            .tick(&mut registry, &TickInput::default(), &mut no_targets())
            .unwrap();
        assert!(matches!(
            &report.events[..],
            [FrameEvent::Script { name, loc, .. }] if name == "ping" && *loc == Vec2::ONE
        ));
        let report = router
            .tick(&mut registry, &TickInput::default(), &mut no_targets())
            .unwrap();
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_rejected_softcull_control_keeps_frame_intact() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        let a = registry
            .spawn(SpawnRequest::new("small", Velocity::constant(Vec2::ZERO, Vec2::X)))
            .unwrap();
        let b = registry
            .spawn(SpawnRequest::new("big", Velocity::constant(Vec2::ZERO, Vec2::X)))
            .unwrap();
        assert!(registry
            .add_pool_control("small", BulletControl::softcull("big", always()))
            .is_err());
        router
            .tick(&mut registry, &TickInput::default(), &mut no_targets())
            .unwrap();
        assert_eq!(router.frame, 1);
        for handle in [a, b] {
            let x = registry.find(handle).map(|r| r.loc().x);
            assert!((x.unwrap() - FRAME_TIME).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scale_and_direction_functions_run_every_frame() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        let scale: ScaleFn = Rc::new(|info: &ParametricInfo| 1.0 + info.t);
        let facing: DirectionFn = Rc::new(|rec: &BulletRecord| Vec2::new(0.0, -rec.scale));
        let handle = registry
            .spawn(
                SpawnRequest::new("small", Velocity::constant(Vec2::ZERO, Vec2::new(2.0, 0.0)))
                    .with_scale(scale)
                    .with_direction(facing),
            )
            .unwrap();
        for _ in 0..12 {
            router
                .tick(&mut registry, &TickInput::default(), &mut no_targets())
                .unwrap();
        }
        let record = registry.find(handle).unwrap();
        let t = 12.0 * FRAME_TIME;
        assert!((record.info.t - t).abs() < 1e-5);
        assert!((record.scale - (1.0 + t)).abs() < 1e-5);
        // The direction function wins over the +x motion
        assert_eq!(record.direction, Vec2::new(0.0, -record.scale));
        assert!((record.loc().x - 2.0 * t).abs() < 1e-5);
    }

    #[test]
    fn test_bullets_spawned_mid_frame_move_next_frame() {
        let mut registry = PoolRegistry::new(&config()).unwrap();
        let mut router = CollisionRouter::new();
        registry
            .add_pool_control("small", BulletControl::copy("big", always()).once())
            .unwrap();
        registry
            .spawn(SpawnRequest::new("small", Velocity::constant(Vec2::ZERO, Vec2::X)))
            .unwrap();
        // The spawn already ran the copy once; the control lasts until the frame ends
        assert_eq!(registry.count_of("big"), 1);
        router
            .tick(&mut registry, &TickInput::default(), &mut no_targets())
            .unwrap();
        let big = registry.pool_by_name("big").unwrap();
        assert_eq!(big.count(), 2);
        let xs: Vec<f32> = big.records().iter().map(|b| b.loc().x).collect();
        // The spawn-time copy moved this frame; the mid-frame copy was taken after
        // the source bullet moved and is not integrated until the next frame
        assert!((xs[0] - FRAME_TIME).abs() < 1e-6);
        assert!((xs[1] - FRAME_TIME).abs() < 1e-6);
    }
}
