//! Per-instance data for batched bullet rendering

use bytemuck::{Pod, Zeroable};

use crate::consts::BATCH_SIZE;
use crate::sim::{BulletPool, BulletRecord, PoolRole, Recolor};

/// One bullet as the instanced draw sees it
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BulletInstance {
    pub position: [f32; 2],
    /// Heading multiplied by scale
    pub dir_scaled: [f32; 2],
    /// Animation time, already multiplied by the style's stagger
    pub time: f32,
}

impl BulletInstance {
    pub const STRIDE: usize = std::mem::size_of::<BulletInstance>();

    #[inline]
    pub fn from_record(record: &BulletRecord, stagger: f32) -> Self {
        let dir = record.direction * record.scale;
        Self {
            position: record.loc().to_array(),
            dir_scaled: dir.to_array(),
            time: record.info.t * stagger,
        }
    }
}

/// Read-only view of one pool with its presentation metadata
#[derive(Clone, Copy)]
pub struct PoolRenderView<'a> {
    pool: &'a BulletPool,
}

impl<'a> PoolRenderView<'a> {
    pub fn new(pool: &'a BulletPool) -> Self {
        Self { pool }
    }

    pub fn name(&self) -> &'a str {
        self.pool.name()
    }

    pub fn count(&self) -> usize {
        self.pool.count()
    }

    pub fn priority(&self) -> i32 {
        self.pool.style().render.priority
    }

    pub fn is_player(&self) -> bool {
        self.pool.role() == PoolRole::Player
    }

    pub fn stagger(&self) -> f32 {
        self.pool.style().render.stagger
    }

    pub fn hue_shift(&self) -> f32 {
        self.pool.style().render.hue_shift
    }

    pub fn tint(&self) -> [f32; 4] {
        self.pool.style().runtime.tint
    }

    pub fn recolor(&self) -> Option<Recolor> {
        self.pool.style().runtime.recolor
    }

    /// Fill `buffer` with this pool's live bullets
    pub fn write_instances(&self, buffer: &mut InstanceBuffer) {
        let stagger = self.stagger();
        buffer.instances.clear();
        buffer.instances.extend(
            self.pool
                .iter_live()
                .map(|r| BulletInstance::from_record(r, stagger)),
        );
    }
}

/// Reusable instance storage, split into fixed-size draw batches
#[derive(Debug, Default)]
pub struct InstanceBuffer {
    instances: Vec<BulletInstance>,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> &[BulletInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Slices of at most `BATCH_SIZE` instances
    pub fn batches(&self) -> impl Iterator<Item = &[BulletInstance]> {
        self.instances.chunks(BATCH_SIZE)
    }

    /// Raw bytes of one batch, ready for upload
    pub fn batch_bytes(batch: &[BulletInstance]) -> &[u8] {
        bytemuck::cast_slice(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, StyleDef};
    use crate::sim::PoolRegistry;
    use glam::Vec2;

    #[test]
    fn test_instance_layout() {
        assert_eq!(BulletInstance::STRIDE, 20);
        let mut record = BulletRecord::null(Vec2::new(1.0, 2.0), Vec2::Y, 1);
        record.scale = 2.0;
        record.info.t = 0.5;
        let inst = BulletInstance::from_record(&record, 3.0);
        assert_eq!(inst.position, [1.0, 2.0]);
        assert_eq!(inst.dir_scaled, [0.0, 2.0]);
        assert_eq!(inst.time, 1.5);
    }

    #[test]
    fn test_batches_split_at_batch_size() {
        let config = EngineConfig::default().with_style(StyleDef::circle("dot", 0.1));
        let mut registry = PoolRegistry::new(&config).unwrap();
        for i in 0..(BATCH_SIZE * 2 + 10) {
            registry
                .spawn_null("dot", Vec2::new(i as f32 * 1e-3, 0.0), Vec2::X)
                .unwrap();
        }
        let views = registry.render_views();
        assert_eq!(views.len(), 1);
        let mut buffer = InstanceBuffer::new();
        views[0].write_instances(&mut buffer);
        let sizes: Vec<usize> = buffer.batches().map(<[BulletInstance]>::len).collect();
        assert_eq!(sizes, vec![BATCH_SIZE, BATCH_SIZE, 10]);
        let first = buffer.batches().next().unwrap();
        assert_eq!(InstanceBuffer::batch_bytes(first).len(), BATCH_SIZE * BulletInstance::STRIDE);
    }

    #[test]
    fn test_views_sorted_by_priority() {
        let config = EngineConfig::default()
            .with_style(StyleDef::circle("front", 0.1).with_render_priority(5))
            .with_style(StyleDef::circle("back", 0.1).with_render_priority(-5));
        let mut registry = PoolRegistry::new(&config).unwrap();
        registry.spawn_null("front", Vec2::ZERO, Vec2::X).unwrap();
        registry.spawn_null("p-back", Vec2::ZERO, Vec2::X).unwrap();
        registry.spawn_null("back", Vec2::ZERO, Vec2::X).unwrap();
        let names: Vec<&str> = registry.render_views().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["back", "p-back", "front"]);
    }
}
