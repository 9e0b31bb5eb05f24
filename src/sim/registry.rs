//! Owned table of bullet pools keyed by style name
//!
//! Pools are created lazily: `parent.variant` names become copies of their
//! parent, `p-` names become player copies of their base style. A pool joins
//! its active partition the first time it is resolved.

use std::collections::HashMap;

use glam::Vec2;

use super::bullet::{BulletRecord, DirectionFn, ScaleFn, Velocity};
use super::context::{SimShared, Transfer};
use super::control::{BulletControl, BulletPred};
use super::pool::{BulletPool, PoolId, PoolRole};
use super::side_table::{AuxTable, PlayerFire};
use super::style::{PoolControl, StyleMetadata};
use crate::config::{EngineConfig, PlayableBounds, StyleDef};
use crate::consts::{EMPTY_STYLE, PLAYER_PREFIX};
use crate::error::{PoolError, Result};
use crate::renderer::PoolRenderView;

/// Everything needed to create one bullet
#[derive(Clone)]
pub struct SpawnRequest {
    pub style: String,
    pub velocity: Velocity,
    pub scale: Option<ScaleFn>,
    pub direction: Option<DirectionFn>,
    pub firing_index: i32,
    pub time_offset: f32,
    /// Reuse an existing id instead of allocating one
    pub id: Option<u32>,
    pub player_fire: Option<PlayerFire>,
}

impl SpawnRequest {
    pub fn new(style: &str, velocity: Velocity) -> Self {
        Self {
            style: style.to_string(),
            velocity,
            scale: None,
            direction: None,
            firing_index: 0,
            time_offset: 0.0,
            id: None,
            player_fire: None,
        }
    }

    pub fn with_scale(mut self, scale: ScaleFn) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_direction(mut self, direction: DirectionFn) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.firing_index = index;
        self
    }

    pub fn with_time_offset(mut self, t: f32) -> Self {
        self.time_offset = t;
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_player_fire(mut self, fire: PlayerFire) -> Self {
        self.player_fire = Some(fire);
        self
    }
}

/// Locates a spawned bullet. The slot index is not stable, the id is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletHandle {
    pub pool: PoolId,
    pub id: u32,
}

pub struct PoolRegistry {
    pub(crate) pools: Vec<BulletPool>,
    by_name: HashMap<String, PoolId>,
    /// Active pools per partition, indexed by `PoolRole::slot`
    pub(crate) active: [Vec<PoolId>; 4],
    pub(crate) shared: SimShared,
    pub(crate) bounds: PlayableBounds,
}

impl PoolRegistry {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut registry = Self {
            pools: Vec::with_capacity(config.styles.len() + 1),
            by_name: HashMap::new(),
            active: Default::default(),
            shared: SimShared::new(config.seed),
            bounds: config.bounds,
        };
        registry.insert_pool(StyleMetadata::from_def(&StyleDef::empty())?, PoolRole::Base);
        for def in &config.styles {
            registry.insert_pool(StyleMetadata::from_def(def)?, PoolRole::Base);
        }
        log::info!("Bullet registry ready with {} styles", registry.pools.len());
        Ok(registry)
    }

    fn insert_pool(&mut self, style: StyleMetadata, role: PoolRole) -> PoolId {
        let id = PoolId(self.pools.len());
        self.by_name.insert(style.name.clone(), id);
        self.pools.push(BulletPool::new(style, role));
        id
    }

    #[inline]
    pub fn bounds(&self) -> &PlayableBounds {
        &self.bounds
    }

    pub fn set_bounds(&mut self, bounds: PlayableBounds) {
        self.bounds = bounds;
    }

    #[inline]
    pub fn pool(&self, id: PoolId) -> &BulletPool {
        &self.pools[id.0]
    }

    pub fn pool_by_name(&self, style: &str) -> Option<&BulletPool> {
        self.by_name.get(style).map(|id| &self.pools[id.0])
    }

    pub fn pools(&self) -> impl Iterator<Item = &BulletPool> {
        self.pools.iter()
    }

    /// Active pools of one partition, in activation order
    pub fn active(&self, role: PoolRole) -> &[PoolId] {
        &self.active[role.slot()]
    }

    pub fn aux(&self) -> &AuxTable {
        &self.shared.aux
    }

    pub fn aux_mut(&mut self) -> &mut AuxTable {
        &mut self.shared.aux
    }

    /// Live bullets across every pool
    pub fn count(&self) -> usize {
        self.pools.iter().map(BulletPool::count).sum()
    }

    pub fn count_of(&self, style: &str) -> usize {
        self.pool_by_name(style).map_or(0, BulletPool::count)
    }

    /// Active pools in draw order: render priority, then hostile before player
    pub fn render_views(&self) -> Vec<PoolRenderView<'_>> {
        let mut views: Vec<PoolRenderView<'_>> = self
            .pools
            .iter()
            .filter(|p| p.is_active())
            .map(PoolRenderView::new)
            .collect();
        views.sort_by_key(|v| (v.priority(), v.is_player()));
        views
    }

    /// Find or create the pool for `style` and make sure it is active
    pub fn resolve(&mut self, style: &str) -> Result<PoolId> {
        let id = match self.by_name.get(style) {
            Some(id) => *id,
            None => self.create_pool(style)?,
        };
        self.activate(id);
        Ok(id)
    }

    fn create_pool(&mut self, style: &str) -> Result<PoolId> {
        if let Some(base) = style.strip_prefix(PLAYER_PREFIX) {
            let Some(base_id) = self.by_name.get(base) else {
                return Err(PoolError::MissingPlayerBase(base.to_string()));
            };
            let meta = self.pools[base_id.0].style.copy_named(style);
            log::debug!("Created player pool {style}");
            return Ok(self.insert_pool(meta, PoolRole::Player));
        }
        if let Some((parent, _)) = style.split_once('.') {
            if let Some(parent_id) = self.by_name.get(parent) {
                let role = if parent == EMPTY_STYLE {
                    PoolRole::EmptyCopy
                } else {
                    PoolRole::Copy
                };
                let meta = self.pools[parent_id.0].style.copy_named(style);
                log::debug!("Created copy pool {style}");
                return Ok(self.insert_pool(meta, role));
            }
        }
        Err(PoolError::UnknownStyle(style.to_string()))
    }

    fn activate(&mut self, id: PoolId) {
        let pool = &mut self.pools[id.0];
        if pool.activate() {
            self.active[pool.role.slot()].push(id);
        }
    }

    /// Create a bullet and run the destination pool's controls on it
    pub fn spawn(&mut self, req: SpawnRequest) -> Result<BulletHandle> {
        let pool = self.resolve(&req.style)?;
        let id = req.id.unwrap_or_else(|| self.shared.alloc_id());
        if let Some(fire) = req.player_fire {
            self.shared.aux.entry(id).player_fire = Some(fire);
        }
        let record = BulletRecord::new(
            req.velocity,
            req.scale,
            req.direction,
            req.time_offset,
            id,
            req.firing_index,
        );
        self.pools[pool.0].add(record, true, &mut self.shared);
        self.flush_transfers()?;
        Ok(BulletHandle { pool, id })
    }

    /// Spawn a motionless bullet
    pub fn spawn_null(&mut self, style: &str, loc: Vec2, direction: Vec2) -> Result<BulletHandle> {
        self.spawn(SpawnRequest::new(style, Velocity::facing(loc, direction)))
    }

    /// Look a bullet up by handle
    pub fn find(&self, handle: BulletHandle) -> Option<&BulletRecord> {
        self.pools
            .get(handle.pool.0)?
            .iter_live()
            .find(|r| r.id() == handle.id)
    }

    /// Deliver cross-pool spawns queued by control actions.
    ///
    /// On failure every undelivered transfer is dropped and its auxiliary
    /// state released.
    pub(crate) fn flush_transfers(&mut self) -> Result<()> {
        while !self.shared.outbox.is_empty() {
            let mut batch = std::mem::take(&mut self.shared.outbox).into_iter();
            while let Some(transfer) = batch.next() {
                let record_id = transfer.record_id();
                if let Err(e) = self.deliver(transfer) {
                    let rest: Vec<Transfer> = batch.chain(self.shared.outbox.drain(..)).collect();
                    let ids = record_id.into_iter().chain(rest.iter().filter_map(Transfer::record_id));
                    for id in ids {
                        self.shared.release(id);
                    }
                    log::warn!("Dropped {} undelivered transfers: {e}", rest.len() + 1);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn deliver(&mut self, transfer: Transfer) -> Result<()> {
        match transfer {
            Transfer::Move { style, record } | Transfer::Copy { style, record } => {
                let pool = self.resolve(&style)?;
                self.pools[pool.0].add(record, false, &mut self.shared);
            }
            Transfer::Null {
                style,
                loc,
                direction,
                time_advance,
                softcull,
            } => {
                let pool = self.resolve(&style)?;
                if softcull && !self.pools[pool.0].style.is_softcull() {
                    return Err(PoolError::NotSoftcullPool(style));
                }
                let id = self.shared.alloc_id();
                let mut record = BulletRecord::null(loc, direction, id);
                record.info.t += time_advance;
                self.pools[pool.0].add(record, true, &mut self.shared);
            }
        }
        Ok(())
    }

    /// Resolve every pool `control` spawns into, so bad targets fail before a frame runs
    fn check_targets(&mut self, control: &BulletControl) -> Result<()> {
        for target in &control.targets {
            let id = self.resolve(&target.style)?;
            if target.softcull && !self.pools[id.0].style.is_softcull() {
                return Err(PoolError::NotSoftcullPool(target.style.clone()));
            }
        }
        Ok(())
    }

    pub fn add_pool_control(&mut self, style: &str, control: BulletControl) -> Result<()> {
        let id = self.resolve(style)?;
        self.check_targets(&control)?;
        self.pools[id.0].add_control(control);
        Ok(())
    }

    /// Attach `controls` unless they are all attached already.
    ///
    /// A pool holding only some of them is an error.
    pub fn assert_controls(&mut self, style: &str, controls: &[BulletControl]) -> Result<()> {
        let id = self.resolve(style)?;
        for control in controls {
            self.check_targets(control)?;
        }
        let pool = &mut self.pools[id.0];
        let present = controls
            .iter()
            .filter(|c| pool.controls.contains(c))
            .count();
        if present == controls.len() {
            return Ok(());
        }
        if present > 0 {
            return Err(PoolError::PartialControlMatch(style.to_string()));
        }
        for control in controls {
            pool.add_control(control.clone());
        }
        Ok(())
    }

    pub fn apply_pool_control(&mut self, style: &str, control: PoolControl) -> Result<()> {
        let id = self.resolve(style)?;
        self.pools[id.0].style.apply(control)
    }

    /// Remove every bullet from every pool; pools and controls are kept
    pub fn clear_all(&mut self) {
        for pool in &mut self.pools {
            pool.reset(&mut self.shared);
        }
        if !self.shared.outbox.is_empty() {
            log::warn!("Dropping {} queued transfers", self.shared.outbox.len());
            self.shared.outbox.clear();
        }
    }

    pub fn clear_empty(&mut self) {
        if let Some(id) = self.by_name.get(EMPTY_STYLE) {
            self.pools[id.0].reset(&mut self.shared);
        }
    }

    /// Drop controls and restore runtime style fields
    pub fn clear_pool_controls(&mut self, clear_player: bool) {
        for pool in &mut self.pools {
            if pool.role == PoolRole::Player && !clear_player {
                continue;
            }
            pool.controls.clear();
            pool.style.reset_runtime();
        }
    }

    /// Remove every copy pool along with its bullets
    pub fn destroy_copies(&mut self) {
        let before = self.pools.len();
        for pool in self.pools.iter_mut().filter(|p| p.role.is_copy()) {
            pool.clear(&mut self.shared);
        }
        let old: Vec<PoolId> = self.active.iter().flatten().copied().collect();
        let mut remap = vec![None; before];
        let mut kept = Vec::with_capacity(before);
        for (i, pool) in std::mem::take(&mut self.pools).into_iter().enumerate() {
            if !pool.role.is_copy() {
                remap[i] = Some(PoolId(kept.len()));
                kept.push(pool);
            }
        }
        self.pools = kept;
        self.by_name = self
            .pools
            .iter()
            .enumerate()
            .map(|(i, p)| (p.style.name.clone(), PoolId(i)))
            .collect();
        for list in &mut self.active {
            list.clear();
        }
        for id in old {
            if let Some(new_id) = remap[id.0] {
                let role = self.pools[new_id.0].role;
                self.active[role.slot()].push(new_id);
            }
        }
        log::info!("Destroyed {} copy pools", before - self.pools.len());
    }

    /// Clear controls, bullets and activation of every pool, then destroy copies
    pub fn orphan_all(&mut self) {
        self.clear_pool_controls(true);
        for pool in &mut self.pools {
            pool.reset(&mut self.shared);
            pool.active = false;
        }
        self.destroy_copies();
        for list in &mut self.active {
            list.clear();
        }
        self.shared.outbox.clear();
    }

    /// Softcull every hostile bullet into `target` on the next frame.
    ///
    /// Every pool fades into the same `target` style; picking a cull style
    /// per bullet color is left to the caller.
    pub fn autocull(&mut self, target: &str) -> Result<()> {
        self.attach_to_hostile(target, crate::sim::control::always(), false)
    }

    /// Like [`autocull`](Self::autocull), restricted to deletable colliding pools and `cond`
    pub fn autodelete(&mut self, target: &str, cond: BulletPred) -> Result<()> {
        self.attach_to_hostile(target, cond, true)
    }

    fn attach_to_hostile(&mut self, target: &str, cond: BulletPred, deleting: bool) -> Result<()> {
        let target_id = self.resolve(target)?;
        if !self.pools[target_id.0].style.is_softcull() {
            return Err(PoolError::NotSoftcullPool(target.to_string()));
        }
        let mut attached = 0;
        for role in [PoolRole::Base, PoolRole::Copy] {
            for id in &self.active[role.slot()] {
                let pool = &mut self.pools[id.0];
                if pool.style.is_softcull() || pool.count() == 0 {
                    continue;
                }
                if deleting && !(pool.style.runtime.deletable && pool.style.collides()) {
                    continue;
                }
                pool.add_control(BulletControl::softcull(target, cond.clone()).once());
                attached += 1;
            }
        }
        log::debug!("Soft-culling {attached} pools into {target}");
        Ok(())
    }
}
