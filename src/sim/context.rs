//! State shared by every pool during a frame
//!
//! Pools never touch each other directly. Cross-pool spawns requested by
//! controls are queued as [`Transfer`]s and delivered by the registry once the
//! current pool finishes its pass.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::bullet::BulletRecord;
use super::side_table::AuxTable;
use super::tick::FrameEvent;

/// A spawn into another pool, queued by a control action
#[derive(Debug, Clone)]
pub enum Transfer {
    /// Move the record as-is; id and auxiliary state are kept
    Move { style: String, record: BulletRecord },
    /// Add a copy that already has its own id
    Copy { style: String, record: BulletRecord },
    /// Spawn a motionless bullet at `loc`
    Null {
        style: String,
        loc: Vec2,
        direction: Vec2,
        time_advance: f32,
        /// Target must be a soft-cull pool
        softcull: bool,
    },
}

impl Transfer {
    /// Id of the record carried by a move or copy
    pub fn record_id(&self) -> Option<u32> {
        match self {
            Transfer::Move { record, .. } | Transfer::Copy { record, .. } => Some(record.id()),
            Transfer::Null { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct SimShared {
    pub aux: AuxTable,
    pub(crate) rng: Pcg32,
    pub(crate) outbox: Vec<Transfer>,
    pub(crate) events: Vec<FrameEvent>,
    next_id: u32,
}

impl SimShared {
    pub fn new(seed: u64) -> Self {
        Self {
            aux: AuxTable::new(),
            rng: Pcg32::seed_from_u64(seed),
            outbox: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a fresh bullet id
    #[inline]
    pub fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Delete bookkeeping for a bullet that is gone for good
    #[inline]
    pub fn release(&mut self, id: u32) {
        self.aux.remove(id);
    }
}
