//! Test utilities and mock types for Fell development.
//!
//! Provides an in-memory [`MockWorld`] implementing the collaborator
//! traits, a [`RecordingSink`] for drops, a manually advanced
//! [`FakeClock`], and tree-building [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fell_core::{
    ActorId, BlockState, Clock, DropBatch, DropSink, FallingBody, FoliageDecay, Implement, ItemId,
    ItemStack, Items, SpawnRejected, VoxelPos, VoxelWorld, WorldOracle,
};
use smallvec::smallvec;

/// Item dropped by a broken trunk voxel.
pub const TRUNK_ITEM: ItemId = ItemId(1);
/// Item dropped by a broken foliage voxel.
pub const FOLIAGE_ITEM: ItemId = ItemId(2);
/// Item dropped by anything else.
pub const GROUND_ITEM: ItemId = ItemId(3);
/// State returned when a trunk voxel is lifted.
pub const TRUNK_STATE: BlockState = BlockState(1);

/// Monotonic clock advanced by hand.
///
/// Clones share the same time, so a test can keep one handle while the
/// code under test owns another.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    nanos: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// Contents of a [`MockWorld`] voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockVoxel {
    Trunk,
    Foliage(FoliageDecay),
    /// Solid, top-supporting, not part of any tree.
    Ground,
}

/// In-memory voxel world.
///
/// Trunk and ground voxels are top-supporting; foliage and air are not.
/// Every `is_trunk` probe can optionally advance a [`FakeClock`] to make
/// tick budgets deterministic.
#[derive(Debug, Default)]
pub struct MockWorld {
    voxels: HashMap<VoxelPos, MockVoxel>,
    protected: HashSet<VoxelPos>,
    probe_clock: Option<(FakeClock, Duration)>,
    probes: Cell<u64>,
    /// Bodies spawned and not yet landed.
    pub falling: Vec<FallingBody>,
    /// Every body ever spawned, in spawn order.
    pub spawned: Vec<FallingBody>,
    /// Refuse every falling-body spawn.
    pub reject_spawns: bool,
    /// Uses left on the actor's implement; `None` is unbreakable.
    pub durability: Option<u32>,
    /// Answer for `actor_engaged`.
    pub disengaged: bool,
    /// Voxels broken, in order.
    pub broken: Vec<VoxelPos>,
    /// Voxels lifted, in order.
    pub lifted: Vec<VoxelPos>,
    /// Positions where break feedback played.
    pub feedback: Vec<VoxelPos>,
    /// Implement uses consumed.
    pub wear: u32,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pos: VoxelPos, voxel: MockVoxel) {
        self.voxels.insert(pos, voxel);
    }

    pub fn set_trunk(&mut self, pos: VoxelPos) {
        self.set(pos, MockVoxel::Trunk);
    }

    pub fn set_ground(&mut self, pos: VoxelPos) {
        self.set(pos, MockVoxel::Ground);
    }

    pub fn set_foliage(&mut self, pos: VoxelPos, distance: u8, max_distance: u8) {
        self.set(
            pos,
            MockVoxel::Foliage(FoliageDecay {
                distance,
                max_distance,
            }),
        );
    }

    pub fn remove(&mut self, pos: VoxelPos) -> Option<MockVoxel> {
        self.voxels.remove(&pos)
    }

    pub fn get(&self, pos: VoxelPos) -> Option<MockVoxel> {
        self.voxels.get(&pos).copied()
    }

    pub fn protect(&mut self, pos: VoxelPos) {
        self.protected.insert(pos);
    }

    /// Advance `clock` by `cost` on every `is_trunk` probe.
    pub fn charge_probes(&mut self, clock: FakeClock, cost: Duration) {
        self.probe_clock = Some((clock, cost));
    }

    /// `is_trunk` probes answered so far.
    pub fn probes(&self) -> u64 {
        self.probes.get()
    }

    /// Trunk voxels remaining.
    pub fn trunk_count(&self) -> usize {
        self.voxels
            .values()
            .filter(|v| matches!(v, MockVoxel::Trunk))
            .count()
    }

    /// Foliage voxels remaining.
    pub fn foliage_count(&self) -> usize {
        self.voxels
            .values()
            .filter(|v| matches!(v, MockVoxel::Foliage(_)))
            .count()
    }

    /// Land every falling body.
    pub fn land_all(&mut self) {
        self.falling.clear();
    }
}

impl WorldOracle for MockWorld {
    fn is_trunk(&self, pos: VoxelPos) -> bool {
        self.probes.set(self.probes.get() + 1);
        if let Some((clock, cost)) = &self.probe_clock {
            clock.advance(*cost);
        }
        matches!(self.voxels.get(&pos), Some(MockVoxel::Trunk))
    }

    fn foliage(&self, pos: VoxelPos) -> Option<FoliageDecay> {
        match self.voxels.get(&pos) {
            Some(MockVoxel::Foliage(decay)) => Some(*decay),
            _ => None,
        }
    }

    fn is_protected(&self, pos: VoxelPos) -> bool {
        self.protected.contains(&pos)
    }

    fn is_top_supporting(&self, pos: VoxelPos) -> bool {
        matches!(
            self.voxels.get(&pos),
            Some(MockVoxel::Trunk | MockVoxel::Ground)
        )
    }

    fn implement_usable(&self, _actor: ActorId, _implement: &Implement) -> bool {
        self.durability.is_none_or(|d| d > 0)
    }

    fn actor_engaged(&self, _actor: ActorId, _implement: Option<&Implement>) -> bool {
        !self.disengaged
    }
}

impl VoxelWorld for MockWorld {
    fn break_voxel(&mut self, pos: VoxelPos, _actor: Option<ActorId>) -> Items {
        let Some(voxel) = self.voxels.remove(&pos) else {
            return Items::new();
        };
        self.broken.push(pos);
        let item = match voxel {
            MockVoxel::Trunk => TRUNK_ITEM,
            MockVoxel::Foliage(_) => FOLIAGE_ITEM,
            MockVoxel::Ground => GROUND_ITEM,
        };
        smallvec![ItemStack::new(item, 1)]
    }

    fn lift_voxel(&mut self, pos: VoxelPos) -> Option<BlockState> {
        match self.voxels.get(&pos) {
            Some(MockVoxel::Trunk) => {
                self.voxels.remove(&pos);
                self.lifted.push(pos);
                Some(TRUNK_STATE)
            }
            _ => None,
        }
    }

    fn drops_for(&self, _pos: VoxelPos, _state: BlockState) -> Items {
        smallvec![ItemStack::new(TRUNK_ITEM, 1)]
    }

    fn spawn_falling(&mut self, body: FallingBody) -> Result<(), SpawnRejected> {
        if self.reject_spawns {
            return Err(SpawnRejected {
                reason: "spawns disabled".to_string(),
            });
        }
        self.falling.push(body);
        self.spawned.push(body);
        Ok(())
    }

    fn falling_body_count(&self) -> usize {
        self.falling.len()
    }

    fn wear_implement(&mut self, _actor: ActorId, _implement: &Implement) {
        self.wear += 1;
        if let Some(d) = &mut self.durability {
            *d = d.saturating_sub(1);
        }
    }

    fn play_break_feedback(&mut self, pos: VoxelPos) {
        self.feedback.push(pos);
    }
}

/// Drop sink that keeps every batch.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub batches: Vec<DropBatch>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total count of `item` across all batches.
    pub fn count(&self, item: ItemId) -> u64 {
        self.batches
            .iter()
            .flat_map(|b| b.items.iter())
            .filter(|s| s.item == item)
            .map(|s| u64::from(s.count))
            .sum()
    }
}

impl DropSink for RecordingSink {
    fn emit(&mut self, batch: DropBatch) {
        self.batches.push(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_clones_share_time() {
        let a = FakeClock::new();
        let b = a.clone();
        a.advance(Duration::from_micros(5));
        assert_eq!(b.now(), Duration::from_micros(5));
    }

    #[test]
    fn probes_advance_clock() {
        let clock = FakeClock::new();
        let mut world = MockWorld::new();
        world.charge_probes(clock.clone(), Duration::from_micros(100));
        world.is_trunk(VoxelPos::new(0, 0, 0));
        world.is_trunk(VoxelPos::new(0, 1, 0));
        assert_eq!(clock.now(), Duration::from_micros(200));
        assert_eq!(world.probes(), 2);
    }

    #[test]
    fn break_removes_and_drops() {
        let mut world = MockWorld::new();
        let p = VoxelPos::new(1, 2, 3);
        world.set_trunk(p);
        let items = world.break_voxel(p, None);
        assert_eq!(items.as_slice(), &[ItemStack::new(TRUNK_ITEM, 1)]);
        assert!(!world.is_trunk(p));
        assert!(world.break_voxel(p, None).is_empty());
    }
}
