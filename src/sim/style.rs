//! Per-style metadata shared by a pool and its copies

use serde::{Deserialize, Serialize};

use super::collision::Collider;
use crate::config::{RenderHints, SoftcullDef, StyleDef};
use crate::error::{PoolError, Result};

/// Palette endpoints for recolorable sprites
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recolor {
    pub black: [f32; 4],
    pub white: [f32; 4],
}

/// Fields scripts may change at runtime; restored on reset
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStyle {
    pub cull_radius: f32,
    pub allow_cull: bool,
    pub deletable: bool,
    pub tint: [f32; 4],
    pub recolor: Option<Recolor>,
}

/// Pool-wide setting changes applied from scripts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoolControl {
    CullRadius(f32),
    AllowCull(bool),
    Deletable(bool),
    Tint([f32; 4]),
    Recolor(Recolor),
    /// Restore every runtime field to the style's defaults
    Reset,
}

#[derive(Debug, Clone)]
pub struct StyleMetadata {
    pub name: String,
    pub collider: Collider,
    pub damage: i32,
    pub destructible: bool,
    /// Radius used for player bullets against enemies
    pub effective_radius: f32,
    pub enemy_cooldown: u32,
    /// Frames skipped after a graze
    pub graze_every: u16,
    pub render: RenderHints,
    pub softcull: Option<SoftcullDef>,
    pub runtime: RuntimeStyle,
    defaults: RuntimeStyle,
}

impl StyleMetadata {
    pub fn from_def(def: &StyleDef) -> Result<Self> {
        let defaults = RuntimeStyle {
            cull_radius: def.cull_radius,
            allow_cull: true,
            deletable: def.deletable,
            tint: def.render.tint,
            recolor: None,
        };
        Ok(Self {
            name: def.name.clone(),
            collider: Collider::from_def(&def.collider, &def.name)?,
            damage: def.damage,
            destructible: def.destructible,
            effective_radius: def.effective_radius(),
            enemy_cooldown: def.enemy_cooldown,
            graze_every: def.graze_every,
            render: def.render.clone(),
            softcull: def.softcull,
            runtime: defaults.clone(),
            defaults,
        })
    }

    /// Same collision and render data under a new name, with default runtime fields
    pub fn copy_named(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.name = name.to_string();
        copy.reset_runtime();
        copy
    }

    pub fn reset_runtime(&mut self) {
        self.runtime = self.defaults.clone();
    }

    #[inline]
    pub fn collides(&self) -> bool {
        self.collider.collides()
    }

    #[inline]
    pub fn is_softcull(&self) -> bool {
        self.softcull.is_some()
    }

    pub fn apply(&mut self, control: PoolControl) -> Result<()> {
        match control {
            PoolControl::CullRadius(r) => self.runtime.cull_radius = r,
            PoolControl::AllowCull(allow) => self.runtime.allow_cull = allow,
            PoolControl::Deletable(deletable) => self.runtime.deletable = deletable,
            PoolControl::Tint(tint) => self.runtime.tint = tint,
            PoolControl::Recolor(recolor) => {
                if !self.render.recolorizable {
                    return Err(PoolError::NotRecolorizable(self.name.clone()));
                }
                self.runtime.recolor = Some(recolor);
            }
            PoolControl::Reset => self.reset_runtime(),
        }
        Ok(())
    }
}
