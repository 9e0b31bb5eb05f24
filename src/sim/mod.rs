//! Bullet-pool simulation
//!
//! Everything that moves, collides or dies lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (pool partitions, then slot order)
//! - Nothing here draws; renderers read pools through views

pub mod bullet;
pub mod collision;
pub mod context;
pub mod control;
pub mod pool;
pub mod registry;
pub mod side_table;
pub mod store;
pub mod style;
pub mod target;
pub mod tick;

pub use bullet::{BulletRecord, DirectionFn, ParametricInfo, ScaleFn, Velocity, VelocityFn, VelocityKind};
pub use collision::{Collider, CollisionResult, Hurtbox, ShapeKind, circle_on_circle};
pub use context::SimShared;
pub use control::{
    BulletControl, BulletPred, ControlCtx, ControlProgram, ControlTarget, Persist, always,
};
pub use pool::{BulletPool, PoolCollision, PoolId, PoolRole};
pub use registry::{BulletHandle, PoolRegistry, SpawnRequest};
pub use side_table::{AuxTable, BulletAux, PlayerFire};
pub use store::CompactingStore;
pub use style::{PoolControl, Recolor, RuntimeStyle, StyleMetadata};
pub use target::{Enemy, HostileTarget};
pub use tick::{CollisionRouter, FrameEvent, FrameReport, TickInput};
