//! Danmaku Pools - bullet-pool simulation and collision engine
//!
//! Core modules:
//! - `sim`: Fixed-timestep bullet pools (storage, controls, collision, frame driver)
//! - `renderer`: Draw-ready instance buffers for batched rendering
//! - `config`: Data-driven style definitions
//! - `error`: Crate error type

pub mod config;
pub mod error;
pub mod renderer;
pub mod sim;

pub use config::{ColliderDef, EngineConfig, PlayableBounds, StyleDef};
pub use error::{PoolError, Result};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Engine frame rate
    pub const ENGINE_FPS: u32 = 120;
    /// Fixed simulation timestep
    pub const FRAME_TIME: f32 = 1.0 / ENGINE_FPS as f32;

    /// Off-screen culling runs once every `CULL_EVERY_MASK + 1` frames per bullet
    pub const CULL_EVERY_MASK: u16 = 127;
    /// Squared displacement below which a bullet keeps its previous direction
    pub const MAG_ERR: f32 = 1e-10;

    /// Instances per draw batch
    pub const BATCH_SIZE: usize = 1023;

    /// Name of the built-in non-colliding style
    pub const EMPTY_STYLE: &str = "empty";
    /// Prefix selecting the player-owned copy of a style
    pub const PLAYER_PREFIX: &str = "p-";

    /// Default frames skipped between grazes (one graze per 30 frames)
    pub const DEFAULT_GRAZE_EVERY: u16 = 29;
    /// Default distance beyond the playable bounds before a bullet is culled
    pub const DEFAULT_CULL_RADIUS: f32 = 3.0;
    /// Default frames before an indestructible player bullet may hit the same enemy again
    pub const DEFAULT_ENEMY_COOLDOWN: u32 = 12;
}

/// Control priorities. Lower values run earlier in the frame.
pub mod priority {
    pub const SETTINGS: i32 = -20;
    pub const TIME_CONTROL: i32 = -10;
    /// First priority that runs after velocity integration
    pub const POST_VEL: i32 = 0;
    pub const DEFAULT: i32 = 20;
    pub const MOVE_1: i32 = 40;
    pub const MOVE_2: i32 = 44;
    pub const MOVE_3: i32 = 46;
    /// First priority that runs after the direction update
    pub const POST_DIR: i32 = 100;
    pub const SAVE: i32 = 110;
    pub const RUN: i32 = 130;
    pub const CULL: i32 = 140;
    pub const ON_COLLIDE: i32 = 300;
}

/// Unit vector pointing at `degrees`
#[inline]
pub fn cos_sin_deg(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Rotate `v` by a (cos, sin) pair
#[inline]
pub fn rotate_by(v: Vec2, cos_sin: Vec2) -> Vec2 {
    Vec2::new(
        cos_sin.x * v.x - cos_sin.y * v.y,
        cos_sin.y * v.x + cos_sin.x * v.y,
    )
}

/// Rotate `v` by the inverse of a (cos, sin) pair
#[inline]
pub fn derotate_by(v: Vec2, cos_sin: Vec2) -> Vec2 {
    Vec2::new(
        cos_sin.x * v.x + cos_sin.y * v.y,
        cos_sin.x * v.y - cos_sin.y * v.x,
    )
}

/// Rotate `v` counterclockwise by `degrees`
#[inline]
pub fn rotate_deg(v: Vec2, degrees: f32) -> Vec2 {
    rotate_by(v, cos_sin_deg(degrees))
}
