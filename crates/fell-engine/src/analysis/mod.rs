//! Structural analysis state machine.
//!
//! An [`Engine`] processes one job at a time as a sequence of short
//! [`step`](Engine::step) calls. Each call runs the current [`Phase`] for a
//! bounded number of work units and returns, so a host can interleave
//! many jobs inside a fixed per-tick time slice:
//!
//! ```text
//! Start -> ForwardSearch -> [ReverseSearch] -> Limit -> [FoliageSearch]
//!       -> ClearTrunk | LiftTrunk -> SpawnFalling
//!       -> [ClearFoliage] -> EmitDrops -> Complete
//! ```
//!
//! The world, sink, and limiters are borrowed through a [`StepContext`]
//! for the duration of a step and never stored.

mod clear;
mod fall;
mod foliage;
mod forward;
mod limit;
mod reverse;
mod visit;

use std::collections::VecDeque;

use fell_core::{ActorId, BlockState, Clock, DropSink, Implement, Items, VoxelPos, VoxelWorld};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use crate::config::FellConfig;
use crate::job::Job;
use crate::limiter::{SpaceLimits, TickBudget};

pub use fall::{Drift, MassSums};
pub use visit::{Visit, VisitKind};

use foliage::FoliageStep;
use visit::{PathClass, Pending, Sense};

/// Where an [`Engine`] is in its job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Validate the origin.
    Start,
    /// Flood the trunk cluster looking for support.
    ForwardSearch,
    /// Save diagonal trunk that leans on a support candidate.
    ReverseSearch,
    /// Build the destruction list and apply the log limit.
    Limit,
    /// Claim attached foliage.
    FoliageSearch,
    /// Break trunk voxels in place.
    ClearTrunk,
    /// Lift trunk voxels out bottom-to-top.
    LiftTrunk,
    /// Respawn lifted voxels as falling bodies top-to-bottom.
    SpawnFalling,
    /// Break foliage, deepest first.
    ClearFoliage,
    /// Hand pending drops to the sink and settle the outcome.
    EmitDrops,
    /// Terminal.
    Complete,
}

impl Phase {
    /// Whether each unit of the phase breaks or lifts a voxel and so draws
    /// on the destructive budget. Spawning falling bodies does not.
    pub fn draws_budget(self) -> bool {
        matches!(self, Self::ClearTrunk | Self::LiftTrunk | Self::ClearFoliage)
    }
}

/// Result of one [`Engine::step`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Work was done or the phase advanced.
    Progressed,
    /// Nothing could be done with the current budget.
    Starved,
    /// The job has reached a terminal outcome.
    Complete,
}

/// How a job ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The structure is supported; nothing was touched.
    Standing,
    /// The origin was not an unprotected trunk voxel.
    NoTrunk,
    /// The structure was destroyed.
    Felled {
        /// Trunk voxels removed.
        trunk: usize,
        /// Foliage voxels removed.
        foliage: usize,
        /// Trunk voxels spared by the log limit.
        truncated: usize,
    },
    /// Cancelled before any trunk was removed.
    Cancelled,
    /// Forced to finish by age. Partial removal is kept.
    TimedOut {
        /// Trunk voxels removed before the timeout.
        trunk: usize,
        /// Foliage voxels removed before the timeout.
        foliage: usize,
    },
    /// The actor's implement gave out mid-clear.
    ImplementExhausted {
        /// Trunk voxels removed before the implement failed.
        trunk: usize,
    },
}

/// Borrowed collaborators for one [`Engine::step`].
pub struct StepContext<'a> {
    pub(crate) world: &'a mut dyn VoxelWorld,
    pub(crate) sink: &'a mut dyn DropSink,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) config: &'a FellConfig,
    pub(crate) deadline: &'a mut TickBudget,
    pub(crate) job_budget: &'a mut u32,
    pub(crate) limits: &'a mut SpaceLimits,
}

impl<'a> StepContext<'a> {
    /// Construct a step context.
    ///
    /// Typically called by the scheduler. `job_budget` is this job's share
    /// of the space's destructive budget for the tick; `limits` is the
    /// space-wide allowance it is drawn from.
    pub fn new(
        world: &'a mut dyn VoxelWorld,
        sink: &'a mut dyn DropSink,
        clock: &'a dyn Clock,
        config: &'a FellConfig,
        deadline: &'a mut TickBudget,
        job_budget: &'a mut u32,
        limits: &'a mut SpaceLimits,
    ) -> Self {
        Self {
            world,
            sink,
            clock,
            config,
            deadline,
            job_budget,
            limits,
        }
    }

    /// The world being analysed.
    pub fn world(&self) -> &dyn VoxelWorld {
        self.world
    }

    /// Remaining destructive budget for this job.
    pub fn job_budget(&self) -> u32 {
        *self.job_budget
    }

    /// Take one unit of destructive budget from both the job share and the
    /// space allowance.
    pub(crate) fn take_budget(&mut self) -> bool {
        if *self.job_budget == 0 || !self.limits.breaks.try_take() {
            return false;
        }
        *self.job_budget -= 1;
        true
    }

    /// Tell the feedback limiter about destructions this job has just
    /// committed to.
    pub(crate) fn expect_destructions(&mut self, n: usize) {
        self.limits.feedback.add_remaining(n);
    }

    /// Roll the feedback limiter and play the effect if it comes up.
    pub(crate) fn feedback(&mut self, pos: VoxelPos) {
        if self.limits.feedback.should_emit() {
            self.world.play_break_feedback(pos);
        }
    }
}

/// Incremental structural analysis for one job at a time.
///
/// All collections are retained across [`reset`](Self::reset) so a pooled
/// engine stops allocating once it has seen its largest structure.
#[derive(Debug)]
pub struct Engine {
    phase: Phase,
    origin: VoxelPos,
    actor: Option<ActorId>,
    implement: Option<Implement>,
    serial: u64,
    units: u32,
    committed: bool,
    timed_out: bool,
    outcome: Option<JobOutcome>,

    // forward
    visited: IndexMap<VoxelPos, Visit>,
    queued: IndexMap<VoxelPos, PathClass>,
    direct: VecDeque<Pending>,
    diagonal: VecDeque<Pending>,
    candidates: Vec<VoxelPos>,

    // reverse
    reverse: VecDeque<(VoxelPos, Sense)>,
    senses: IndexMap<VoxelPos, u8>,

    // limit
    trunk: Vec<VoxelPos>,
    doomed: IndexSet<VoxelPos>,
    truncated: usize,

    // foliage
    foliage_seen: IndexMap<VoxelPos, Visit>,
    buckets: Vec<VecDeque<FoliageStep>>,
    foliage: Vec<VoxelPos>,
    mass: MassSums,
    drift: Option<Drift>,

    // destruction
    cursor: usize,
    lifted: Vec<(VoxelPos, BlockState)>,
    drops: Vec<(VoxelPos, Items)>,
    flushed: bool,
    trunk_destroyed: usize,
    foliage_destroyed: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An idle engine. Call [`begin`](Self::begin) to give it a job.
    pub fn new() -> Self {
        Self {
            phase: Phase::Complete,
            origin: VoxelPos::new(0, 0, 0),
            actor: None,
            implement: None,
            serial: 0,
            units: 0,
            committed: false,
            timed_out: false,
            outcome: None,
            visited: IndexMap::new(),
            queued: IndexMap::new(),
            direct: VecDeque::new(),
            diagonal: VecDeque::new(),
            candidates: Vec::new(),
            reverse: VecDeque::new(),
            senses: IndexMap::new(),
            trunk: Vec::new(),
            doomed: IndexSet::new(),
            truncated: 0,
            foliage_seen: IndexMap::new(),
            buckets: Vec::new(),
            foliage: Vec::new(),
            mass: MassSums::default(),
            drift: None,
            cursor: 0,
            lifted: Vec::new(),
            drops: Vec::new(),
            flushed: false,
            trunk_destroyed: 0,
            foliage_destroyed: 0,
        }
    }

    /// Start analysing `job`. Any previous job state is discarded.
    ///
    /// Tool bonuses and wear only apply when the job's implement was
    /// validated.
    pub fn begin(&mut self, job: &Job) {
        self.reset();
        self.phase = Phase::Start;
        self.origin = job.origin;
        self.actor = job.actor;
        self.implement = job.valid_implement().copied();
        self.serial = job.serial;
    }

    /// Discard all job state, keeping allocated capacity. The engine is
    /// idle afterwards.
    pub fn reset(&mut self) {
        self.phase = Phase::Complete;
        self.origin = VoxelPos::new(0, 0, 0);
        self.actor = None;
        self.implement = None;
        self.serial = 0;
        self.units = 0;
        self.committed = false;
        self.timed_out = false;
        self.outcome = None;
        self.visited.clear();
        self.queued.clear();
        self.direct.clear();
        self.diagonal.clear();
        self.candidates.clear();
        self.reverse.clear();
        self.senses.clear();
        self.trunk.clear();
        self.doomed.clear();
        self.truncated = 0;
        self.foliage_seen.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.foliage.clear();
        self.mass = MassSums::default();
        self.drift = None;
        self.cursor = 0;
        self.lifted.clear();
        self.drops.clear();
        self.flushed = false;
        self.trunk_destroyed = 0;
        self.foliage_destroyed = 0;
    }

    /// Run the current phase for at most one step's worth of work.
    pub fn step(&mut self, ctx: &mut StepContext<'_>) -> StepStatus {
        if self.phase == Phase::Complete {
            return StepStatus::Complete;
        }
        self.units = 0;
        let before = self.phase;
        let next = match before {
            Phase::Start => self.start(ctx),
            Phase::ForwardSearch => self.forward_step(ctx),
            Phase::ReverseSearch => self.reverse_step(ctx),
            Phase::Limit => self.limit(ctx),
            Phase::FoliageSearch => self.foliage_step(ctx),
            Phase::ClearTrunk => self.clear_trunk_step(ctx),
            Phase::LiftTrunk => self.lift_step(ctx),
            Phase::SpawnFalling => self.spawn_step(ctx),
            Phase::ClearFoliage => self.clear_foliage_step(ctx),
            Phase::EmitDrops => self.emit_drops(ctx),
            Phase::Complete => Phase::Complete,
        };
        if next != before {
            trace!("job at {}: {:?} -> {:?}", self.origin, before, next);
            self.phase = next;
        }
        if next == Phase::Complete {
            StepStatus::Complete
        } else if next != before || self.units > 0 {
            StepStatus::Progressed
        } else {
            StepStatus::Starved
        }
    }

    /// Force the job towards completion after it outlived its age limit.
    ///
    /// Searches stop without mutating; an interrupted teardown keeps what
    /// it removed and turns lifted voxels into drops.
    pub fn expire(&mut self) {
        match self.phase {
            Phase::EmitDrops | Phase::Complete => {}
            _ => {
                self.timed_out = true;
                trace!("job at {}: {:?} -> EmitDrops (expired)", self.origin, self.phase);
                self.phase = Phase::EmitDrops;
            }
        }
    }

    /// Cancel the job if no trunk has been removed yet.
    pub fn cancel(&mut self) -> bool {
        if self.committed || self.phase == Phase::Complete {
            return false;
        }
        self.outcome = Some(JobOutcome::Cancelled);
        self.phase = Phase::Complete;
        true
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Terminal outcome, once [`Phase::Complete`] is reached.
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.outcome
    }

    /// Whether trunk removal has begun. A committed job cannot be
    /// cancelled.
    pub fn committed(&self) -> bool {
        self.committed
    }

    /// Origin of the current job.
    pub fn origin(&self) -> VoxelPos {
        self.origin
    }

    /// Whether the current analysis has marked `pos` for destruction.
    ///
    /// Only true between the log limit and the end of clearing.
    pub fn is_doomed(&self, pos: VoxelPos) -> bool {
        match self.phase {
            Phase::FoliageSearch
            | Phase::ClearTrunk
            | Phase::LiftTrunk
            | Phase::SpawnFalling
            | Phase::ClearFoliage => self.doomed.contains(&pos) || self.foliage_claimed(pos),
            _ => false,
        }
    }

    fn foliage_claimed(&self, pos: VoxelPos) -> bool {
        self.foliage_seen
            .get(&pos)
            .is_some_and(|v| v.kind == VisitKind::Foliage)
    }

    /// Destructions still ahead of this job.
    pub fn remaining_destructions(&self) -> usize {
        match self.phase {
            Phase::ClearTrunk | Phase::LiftTrunk => {
                self.trunk.len().saturating_sub(self.cursor) + self.foliage.len()
            }
            Phase::SpawnFalling => self.foliage.len(),
            Phase::ClearFoliage => self.foliage.len().saturating_sub(self.cursor),
            _ => 0,
        }
    }

    /// The trunk destruction list, shallowest first.
    pub fn doomed_trunk(&self) -> &[VoxelPos] {
        &self.trunk
    }

    /// Foliage claimed by the job, in discovery order.
    pub fn doomed_foliage(&self) -> &[VoxelPos] {
        &self.foliage
    }

    /// Forward-search record for `pos`, if probed.
    pub fn visit(&self, pos: VoxelPos) -> Option<&Visit> {
        self.visited.get(&pos)
    }

    /// Fall direction, once computed.
    pub fn drift(&self) -> Option<Drift> {
        self.drift
    }

    /// Record the terminal outcome.
    fn finish(&mut self, outcome: JobOutcome) -> Phase {
        debug!("job at {}: {:?}", self.origin, outcome);
        self.outcome = Some(outcome);
        Phase::Complete
    }

    /// Whether another unit of work fits in this step.
    ///
    /// The first unit always runs; afterwards the unit cap and the tick
    /// deadline are checked.
    fn has_time(&mut self, ctx: &mut StepContext<'_>) -> bool {
        if self.units == 0 {
            return true;
        }
        if self.units >= ctx.config.search_units_per_step {
            return false;
        }
        !ctx.deadline.expired(ctx.clock)
    }
}
