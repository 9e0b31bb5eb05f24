//! Data-driven engine configuration
//!
//! Styles are loaded from JSON (or built in code) before the registry is
//! constructed. Everything here is plain data; the registry turns each
//! [`StyleDef`] into a pool with precomputed collision parameters.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CULL_RADIUS, DEFAULT_ENEMY_COOLDOWN, DEFAULT_GRAZE_EVERY, EMPTY_STYLE, PLAYER_PREFIX,
};
use crate::error::{PoolError, Result};

/// Playable field rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayableBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Default for PlayableBounds {
    fn default() -> Self {
        Self {
            left: -3.6,
            right: 3.6,
            bottom: -4.5,
            top: 4.1,
        }
    }
}

impl PlayableBounds {
    /// Whether `loc` lies more than `margin` outside the playable field
    #[inline]
    pub fn off_screen_by(&self, margin: f32, loc: Vec2) -> bool {
        loc.x < self.left - margin
            || loc.x > self.right + margin
            || loc.y < self.bottom - margin
            || loc.y > self.top + margin
    }
}

/// Collision shape of a style, before precomputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderDef {
    #[default]
    None,
    Circle {
        radius: f32,
    },
    Rectangle {
        half_width: f32,
        half_height: f32,
    },
    /// Capsule around the segment `start -> end`, in the bullet's local frame
    Line {
        start: Vec2,
        end: Vec2,
        radius: f32,
    },
    /// Multi-segment curve; accepted by the parser but not simulated
    Segments {
        radius: f32,
        count: u32,
    },
}

impl ColliderDef {
    pub fn shape_name(&self) -> &'static str {
        match self {
            ColliderDef::None => "none",
            ColliderDef::Circle { .. } => "circle",
            ColliderDef::Rectangle { .. } => "rectangle",
            ColliderDef::Line { .. } => "line",
            ColliderDef::Segments { .. } => "segments",
        }
    }

    /// Radius used when a player bullet of this shape is tested against enemies
    pub fn effective_radius(&self) -> f32 {
        match self {
            ColliderDef::None => 0.0,
            ColliderDef::Circle { radius } => *radius,
            ColliderDef::Rectangle {
                half_width,
                half_height,
            } => half_width.min(*half_height),
            ColliderDef::Line { radius, .. } | ColliderDef::Segments { radius, .. } => *radius,
        }
    }
}

/// Presentation hints passed through to the renderer untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderHints {
    /// Draw order; lower values draw first
    pub priority: i32,
    /// Multiplier on per-instance animation time
    pub stagger: f32,
    pub hue_shift: f32,
    pub recolorizable: bool,
    pub tint: [f32; 4],
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            priority: 0,
            stagger: 1.0,
            hue_shift: 0.0,
            recolorizable: false,
            tint: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Decorative fade-out pool parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftcullDef {
    /// Seconds before an instance is removed
    pub ttl: f32,
    /// Upper bound of the random time added on spawn
    pub time_randomization: f32,
    /// Total spread, in degrees, of the random rotation applied on spawn
    pub rotation_randomization: f32,
}

impl Default for SoftcullDef {
    fn default() -> Self {
        Self {
            ttl: 0.5,
            time_randomization: 0.0,
            rotation_randomization: 0.0,
        }
    }
}

/// One named bullet style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDef {
    pub name: String,
    pub collider: ColliderDef,
    /// Overrides the shape-derived radius for player-vs-enemy tests
    pub effective_radius: Option<f32>,
    pub damage: i32,
    pub destructible: bool,
    pub deletable: bool,
    /// Frames skipped after a graze before the next one counts
    pub graze_every: u16,
    pub cull_radius: f32,
    /// Frames an indestructible player bullet waits before re-hitting an enemy
    pub enemy_cooldown: u32,
    pub render: RenderHints,
    /// Present on soft-cull (decorative) styles only
    pub softcull: Option<SoftcullDef>,
}

impl Default for StyleDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            collider: ColliderDef::None,
            effective_radius: None,
            damage: 1,
            destructible: true,
            deletable: true,
            graze_every: DEFAULT_GRAZE_EVERY,
            cull_radius: DEFAULT_CULL_RADIUS,
            enemy_cooldown: DEFAULT_ENEMY_COOLDOWN,
            render: RenderHints::default(),
            softcull: None,
        }
    }
}

impl StyleDef {
    pub fn circle(name: &str, radius: f32) -> Self {
        Self {
            name: name.to_string(),
            collider: ColliderDef::Circle { radius },
            ..Default::default()
        }
    }

    pub fn rectangle(name: &str, half_width: f32, half_height: f32) -> Self {
        Self {
            name: name.to_string(),
            collider: ColliderDef::Rectangle {
                half_width,
                half_height,
            },
            ..Default::default()
        }
    }

    pub fn line(name: &str, start: Vec2, end: Vec2, radius: f32) -> Self {
        Self {
            name: name.to_string(),
            collider: ColliderDef::Line { start, end, radius },
            ..Default::default()
        }
    }

    /// Non-colliding style whose instances fade out after `ttl` seconds
    pub fn softcull(name: &str, ttl: f32) -> Self {
        Self {
            name: name.to_string(),
            collider: ColliderDef::None,
            destructible: false,
            deletable: false,
            softcull: Some(SoftcullDef {
                ttl,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// The built-in non-colliding style
    pub fn empty() -> Self {
        Self {
            name: EMPTY_STYLE.to_string(),
            collider: ColliderDef::None,
            destructible: false,
            ..Default::default()
        }
    }

    pub fn effective_radius(&self) -> f32 {
        self.effective_radius
            .unwrap_or_else(|| self.collider.effective_radius())
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    pub fn indestructible(mut self) -> Self {
        self.destructible = false;
        self
    }

    pub fn with_graze_every(mut self, frames: u16) -> Self {
        self.graze_every = frames;
        self
    }

    pub fn with_render_priority(mut self, priority: i32) -> Self {
        self.render.priority = priority;
        self
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the soft-cull randomization RNG
    pub seed: u64,
    pub bounds: PlayableBounds,
    pub styles: Vec<StyleDef>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            bounds: PlayableBounds::default(),
            styles: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        log::info!("Loaded engine config with {} styles", config.styles.len());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_style(mut self, style: StyleDef) -> Self {
        self.styles.push(style);
        self
    }

    /// Reject names the registry would misinterpret and shapes it cannot simulate
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for style in &self.styles {
            if style.name.is_empty() {
                return Err(PoolError::Config("style with empty name".into()));
            }
            if style.name.contains('.') || style.name.starts_with(PLAYER_PREFIX) {
                return Err(PoolError::Config(format!(
                    "style name \"{}\" uses a reserved prefix or separator",
                    style.name
                )));
            }
            if style.name == EMPTY_STYLE || !seen.insert(style.name.as_str()) {
                return Err(PoolError::DuplicateStyle(style.name.clone()));
            }
            if let ColliderDef::Segments { .. } = style.collider {
                return Err(PoolError::UnsupportedShape {
                    style: style.name.clone(),
                    shape: style.collider.shape_name(),
                });
            }
        }
        Ok(())
    }
}
