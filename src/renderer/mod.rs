//! Rendering hand-off
//!
//! The engine does not draw. It exposes compacted per-pool instance data in
//! fixed-size batches for an external instanced renderer.

pub mod instance;

pub use instance::{BulletInstance, InstanceBuffer, PoolRenderView};
