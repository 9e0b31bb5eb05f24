//! Hostile targets hit by player bullets

use std::collections::HashMap;

use glam::Vec2;

use super::side_table::PlayerFire;

/// An enemy player bullets can damage
pub trait HostileTarget {
    fn location(&self) -> Vec2;
    fn radius(&self) -> f32;

    fn accepts_damage(&self) -> bool {
        true
    }

    /// Whether an indestructible bullet may hit this frame; records the hit if so
    fn try_hit_indestructible(&mut self, bullet_id: u32, cooldown_frames: u32) -> bool;

    fn receive_player_fire(&mut self, fire: &PlayerFire, loc: Vec2);

    /// Called once per frame after the player sweep
    fn end_frame(&mut self) {}
}

impl<T: HostileTarget + ?Sized> HostileTarget for Box<T> {
    fn location(&self) -> Vec2 {
        (**self).location()
    }

    fn radius(&self) -> f32 {
        (**self).radius()
    }

    fn accepts_damage(&self) -> bool {
        (**self).accepts_damage()
    }

    fn try_hit_indestructible(&mut self, bullet_id: u32, cooldown_frames: u32) -> bool {
        (**self).try_hit_indestructible(bullet_id, cooldown_frames)
    }

    fn receive_player_fire(&mut self, fire: &PlayerFire, loc: Vec2) {
        (**self).receive_player_fire(fire, loc)
    }

    fn end_frame(&mut self) {
        (**self).end_frame()
    }
}

/// Circular enemy with a per-bullet re-hit cooldown
#[derive(Debug, Clone)]
pub struct Enemy {
    pub location: Vec2,
    pub radius: f32,
    pub vulnerable: bool,
    /// Bosses take boss damage, everything else takes stage damage
    pub is_boss: bool,
    pub damage_taken: i32,
    /// Effect ids delivered by hits, in order
    pub effects: Vec<(u32, Vec2)>,
    cooldowns: HashMap<u32, u32>,
}

impl Enemy {
    pub fn new(location: Vec2, radius: f32) -> Self {
        Self {
            location,
            radius,
            vulnerable: true,
            is_boss: false,
            damage_taken: 0,
            effects: Vec::new(),
            cooldowns: HashMap::new(),
        }
    }

    pub fn boss(location: Vec2, radius: f32) -> Self {
        Self {
            is_boss: true,
            ..Self::new(location, radius)
        }
    }
}

impl HostileTarget for Enemy {
    fn location(&self) -> Vec2 {
        self.location
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn accepts_damage(&self) -> bool {
        self.vulnerable
    }

    fn try_hit_indestructible(&mut self, bullet_id: u32, cooldown_frames: u32) -> bool {
        if self.cooldowns.contains_key(&bullet_id) {
            return false;
        }
        self.cooldowns.insert(bullet_id, cooldown_frames);
        true
    }

    fn receive_player_fire(&mut self, fire: &PlayerFire, loc: Vec2) {
        self.damage_taken += if self.is_boss {
            fire.boss_damage
        } else {
            fire.stage_damage
        };
        if let Some(effect) = fire.effect {
            self.effects.push((effect, loc));
        }
    }

    fn end_frame(&mut self) {
        self.cooldowns.retain(|_, frames| {
            *frames = frames.saturating_sub(1);
            *frames > 0
        });
    }
}
