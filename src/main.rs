//! Danmaku Pools headless driver
//!
//! Fires rotating radial rings at a stationary target for a fixed number of
//! frames and logs pool counts, damage and graze. Pass a JSON config path as
//! the first argument to use custom styles; the ring style must be named
//! `ring`.

use std::rc::Rc;

use glam::Vec2;

use danmaku_pools::config::{EngineConfig, StyleDef};
use danmaku_pools::consts::FRAME_TIME;
use danmaku_pools::sim::{
    BulletControl, BulletPred, CollisionRouter, Enemy, FrameEvent, Hurtbox, ParametricInfo,
    PlayerFire, PoolRegistry, SpawnRequest, TickInput, Velocity,
};
use danmaku_pools::{PoolError, cos_sin_deg};

const FRAMES: u32 = 1200;
const RING_EVERY: u32 = 6;
const RING_SIZE: u32 = 96;

fn default_config() -> EngineConfig {
    EngineConfig::default()
        .with_style(StyleDef::circle("ring", 0.06))
        .with_style(StyleDef::rectangle("arrow", 0.08, 0.03).with_damage(2))
        .with_style(StyleDef::circle("shot", 0.1))
        .with_style(StyleDef::softcull("fade", 0.4))
}

fn load_config() -> Result<EngineConfig, PoolError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| PoolError::Config(format!("{path}: {e}")))?;
            EngineConfig::from_json(&json)
        }
        None => Ok(default_config()),
    }
}

fn run() -> Result<(), PoolError> {
    let config = load_config()?;
    let mut registry = PoolRegistry::new(&config)?;
    let mut router = CollisionRouter::new();
    let mut enemies = vec![Enemy::boss(Vec2::new(0.0, 3.0), 0.4)];

    // Bounce ring bullets off the side walls once
    let bounds = *registry.bounds();
    let young: BulletPred = Rc::new(|info: &ParametricInfo| info.t < 2.0);
    registry.add_pool_control("ring", BulletControl::flip_x_gt(bounds.right, young.clone()))?;
    registry.add_pool_control("ring", BulletControl::flip_x_lt(bounds.left, young))?;

    let input = TickInput {
        hurtbox: Some(Hurtbox::new(Vec2::new(0.0, -3.0), 0.03, 0.4)),
    };
    let mut damage_frames = 0u32;

    for frame in 0..FRAMES {
        if frame % RING_EVERY == 0 {
            let spin = frame as f32 * 3.7;
            for i in 0..RING_SIZE {
                let dir = cos_sin_deg(spin + 360.0 * i as f32 / RING_SIZE as f32);
                let velocity = Velocity::constant(Vec2::new(0.0, 3.0), dir * 1.5);
                registry.spawn(SpawnRequest::new("ring", velocity).with_index(i as i32))?;
            }
        }
        if frame % 4 == 0 {
            let velocity = Velocity::constant(Vec2::new(0.0, -3.0), Vec2::new(0.0, 8.0));
            registry.spawn(
                SpawnRequest::new("p-shot", velocity).with_player_fire(PlayerFire::new(12, 4)),
            )?;
        }
        if frame == FRAMES / 2 {
            registry.autocull("fade")?;
            log::info!("Autocull at frame {frame}");
        }

        let report = router.tick(&mut registry, &input, &mut enemies)?;
        if report.damage > 0 {
            damage_frames += 1;
        }
        let enemy_hits = report
            .events
            .iter()
            .filter(|e| matches!(e, FrameEvent::EnemyHit { .. }))
            .count();
        if frame % 120 == 0 {
            log::info!(
                "t={:.1}s bullets={} damage={} graze={} enemy_hits={}",
                frame as f32 * FRAME_TIME,
                registry.count(),
                report.damage,
                report.graze,
                enemy_hits
            );
        }
    }

    for view in registry.render_views() {
        log::info!("pool {} -> {} live", view.name(), view.count());
    }
    log::info!(
        "Done: {} frames, hit on {} frames, {} total graze, boss took {} damage",
        router.frame,
        damage_frames,
        router.total_graze,
        enemies[0].damage_taken
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Danmaku Pools starting...");
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
