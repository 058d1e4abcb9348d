//! Values exchanged with the host: items, block states, implements,
//! falling bodies, and drop batches.

use smallvec::SmallVec;

use crate::id::{ActorId, ItemId};
use crate::pos::{Axis, VoxelPos};

/// A quantity of one item type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemStack {
    /// The item type.
    pub item: ItemId,
    /// How many.
    pub count: u32,
}

impl ItemStack {
    /// Create a stack.
    pub fn new(item: ItemId, count: u32) -> Self {
        Self { item, count }
    }
}

/// Item list produced by a single voxel; almost always one or two stacks.
pub type Items = SmallVec<[ItemStack; 2]>;

/// Opaque host block state captured when a voxel is lifted out of the
/// world for intact falling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockState(pub u32);

/// The tool an actor used to start a job.
///
/// `tier` raises the log limit linearly; `felling_level` is the
/// enchantment-style multiplier level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Implement {
    /// Item type of the tool.
    pub item: ItemId,
    /// Material tier (0 = weakest).
    pub tier: u8,
    /// Felling enchantment level (0 = none).
    pub felling_level: u8,
}

/// A trunk voxel re-materialised as a physics-driven body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallingBody {
    /// Where the voxel stood before it was lifted.
    pub pos: VoxelPos,
    /// The lifted block state.
    pub state: BlockState,
    /// Initial velocity in blocks per tick (`[x, y, z]`).
    pub velocity: [f32; 3],
    /// Axis the body should tumble around.
    pub rotation_axis: Axis,
}

/// Items handed to the [`DropSink`](crate::DropSink) in one call.
#[derive(Clone, Debug, PartialEq)]
pub struct DropBatch {
    /// Where the items appear.
    pub pos: VoxelPos,
    /// The payload. Stacks are not merged unless the engine was
    /// configured to consolidate.
    pub items: SmallVec<[ItemStack; 4]>,
    /// Actor that should receive the items directly, if any.
    pub receiver: Option<ActorId>,
}

impl DropBatch {
    /// Total item count across all stacks.
    pub fn total(&self) -> u64 {
        self.items.iter().map(|s| u64::from(s.count)).sum()
    }
}
