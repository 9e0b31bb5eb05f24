//! Per-bullet auxiliary state keyed by bullet id
//!
//! Most bullets carry nothing here. Player bullets store their damage payload,
//! and controls may save named values for later use.

use std::collections::HashMap;

use glam::Vec2;

/// Damage a player bullet deals to enemies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerFire {
    pub boss_damage: i32,
    pub stage_damage: i32,
    /// Opaque on-hit effect id forwarded to the target
    pub effect: Option<u32>,
}

impl PlayerFire {
    pub fn new(boss_damage: i32, stage_damage: i32) -> Self {
        Self {
            boss_damage,
            stage_damage,
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: u32) -> Self {
        self.effect = Some(effect);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulletAux {
    pub player_fire: Option<PlayerFire>,
    pub floats: HashMap<String, f32>,
    pub vectors: HashMap<String, Vec2>,
}

#[derive(Debug, Clone, Default)]
pub struct AuxTable {
    entries: HashMap<u32, BulletAux>,
}

impl AuxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&BulletAux> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut BulletAux> {
        self.entries.get_mut(&id)
    }

    /// The entry for `id`, created empty if missing
    pub fn entry(&mut self, id: u32) -> &mut BulletAux {
        self.entries.entry(id).or_default()
    }

    pub fn player_fire(&self, id: u32) -> Option<&PlayerFire> {
        self.entries.get(&id).and_then(|aux| aux.player_fire.as_ref())
    }

    pub fn remove(&mut self, id: u32) -> Option<BulletAux> {
        self.entries.remove(&id)
    }

    /// Give `to` a copy of whatever `from` carries
    pub fn clone_entry(&mut self, from: u32, to: u32) {
        if let Some(aux) = self.entries.get(&from).cloned() {
            self.entries.insert(to, aux);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
