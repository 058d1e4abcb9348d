//! Collaborator traits implemented by the host world.
//!
//! The engine never classifies voxels itself. [`WorldOracle`] answers the
//! read-only questions the analysis needs, [`VoxelWorld`] adds the
//! mutations performed while tearing a structure down, and [`DropSink`]
//! receives the resulting items.
//!
//! The world is handed to the engine for the duration of each tick rather
//! than stored in it, so any number of jobs in a space can share it.

use crate::error::SpawnRejected;
use crate::id::ActorId;
use crate::payload::{BlockState, DropBatch, FallingBody, Implement, Items};
use crate::pos::VoxelPos;

/// Decay bookkeeping stored on a foliage voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FoliageDecay {
    /// Distance to the nearest trunk as recorded by the world.
    pub distance: u8,
    /// Largest distance this foliage type tracks before it decays.
    pub max_distance: u8,
}

/// Read-only voxel classification.
///
/// Implementations must be side-effect free from the engine's point of
/// view: asking the same question twice without an intervening mutation
/// returns the same answer.
pub trait WorldOracle {
    /// Whether the voxel is a trunk (log-like) block.
    fn is_trunk(&self, pos: VoxelPos) -> bool;

    /// Decay state if the voxel is foliage, `None` otherwise.
    fn foliage(&self, pos: VoxelPos) -> Option<FoliageDecay>;

    /// Whether the voxel must never be removed by the engine
    /// (e.g. player-placed logs).
    fn is_protected(&self, pos: VoxelPos) -> bool;

    /// Whether the voxel's top face fully supports a block above it.
    fn is_top_supporting(&self, pos: VoxelPos) -> bool;

    /// Whether `actor` still holds `implement` with durability left.
    fn implement_usable(&self, actor: ActorId, implement: &Implement) -> bool;

    /// Whether `actor` is still engaged with the job it started: present
    /// in the space, holding the same implement, not otherwise
    /// interrupted. Only consulted while a job is cancellable.
    fn actor_engaged(&self, actor: ActorId, implement: Option<&Implement>) -> bool {
        let _ = (actor, implement);
        true
    }
}

/// World mutations performed while tearing a structure down.
pub trait VoxelWorld: WorldOracle {
    /// Break the voxel in place and return the items it yields.
    ///
    /// `actor` is the initiating actor, if any, for loot rules.
    fn break_voxel(&mut self, pos: VoxelPos, actor: Option<ActorId>) -> Items;

    /// Remove the voxel without drops and return its state, or `None` if
    /// nothing removable was there.
    fn lift_voxel(&mut self, pos: VoxelPos) -> Option<BlockState>;

    /// Items a lifted voxel yields when it cannot become a falling body.
    fn drops_for(&self, pos: VoxelPos, state: BlockState) -> Items;

    /// Spawn a falling body. On rejection the engine drops items instead.
    fn spawn_falling(&mut self, body: FallingBody) -> Result<(), SpawnRejected>;

    /// Falling bodies currently alive in this world.
    fn falling_body_count(&self) -> usize;

    /// Consume one use of the actor's implement.
    fn wear_implement(&mut self, actor: ActorId, implement: &Implement);

    /// Play the break effect (particles, sound) at `pos`.
    fn play_break_feedback(&mut self, pos: VoxelPos);
}

/// Receives item drops produced by finished or interrupted jobs.
///
/// Batching and stacking policy belong to the sink.
pub trait DropSink {
    /// Accept one batch of items.
    fn emit(&mut self, batch: DropBatch);
}

impl DropSink for Vec<DropBatch> {
    fn emit(&mut self, batch: DropBatch) {
        self.push(batch);
    }
}
