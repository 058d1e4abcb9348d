//! Per-tick and cumulative scheduler metrics.
//!
//! [`TickMetrics`] describes one scheduler tick; [`SchedulerStats`]
//! accumulates over the scheduler's lifetime.

use fell_core::VoxelPos;

use crate::analysis::JobOutcome;

/// A job that finished during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedJob {
    /// Origin the job was submitted for.
    pub origin: VoxelPos,
    /// How it ended.
    pub outcome: JobOutcome,
}

/// Work done during a single scheduler tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct TickMetrics {
    /// Wall-clock time for the whole tick, in microseconds.
    pub total_us: u64,
    /// Engine steps executed.
    pub steps: u32,
    /// Jobs promoted from waiting to running.
    pub promoted: u32,
    /// Jobs that reached a terminal outcome this tick.
    pub completed: Vec<CompletedJob>,
    /// Whether stepping stopped because the tick deadline passed.
    pub deadline_hit: bool,
    /// Destructive budget units consumed.
    pub breaks_used: u32,
    /// Break effects played.
    pub effects_emitted: u32,
    /// Jobs still running after the tick.
    pub running: usize,
    /// Jobs still waiting after the tick.
    pub waiting: usize,
}

/// Cumulative counters for one scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks processed.
    pub ticks: u64,
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Submissions folded into an already queued job.
    pub deduplicated: u64,
    /// Submissions refused because the waiting queue was full.
    pub queue_full_rejections: u64,
    /// Jobs that found support.
    pub standing: u64,
    /// Jobs whose origin was not an unprotected trunk.
    pub no_trunk: u64,
    /// Jobs that destroyed their structure.
    pub felled: u64,
    /// Jobs cancelled before committing.
    pub cancelled: u64,
    /// Jobs forced to finish by age.
    pub timed_out: u64,
    /// Jobs stopped by a worn-out implement.
    pub implement_exhausted: u64,
    /// Trunk voxels removed.
    pub trunk_destroyed: u64,
    /// Foliage voxels removed.
    pub foliage_destroyed: u64,
    /// Ticks whose stepping was cut short by the deadline.
    pub deadline_hits: u64,
}

impl SchedulerStats {
    /// Fold one finished job into the counters.
    pub fn record(&mut self, outcome: &JobOutcome) {
        match *outcome {
            JobOutcome::Standing => self.standing += 1,
            JobOutcome::NoTrunk => self.no_trunk += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
            JobOutcome::Felled { trunk, foliage, .. } => {
                self.felled += 1;
                self.trunk_destroyed += trunk as u64;
                self.foliage_destroyed += foliage as u64;
            }
            JobOutcome::TimedOut { trunk, foliage } => {
                self.timed_out += 1;
                self.trunk_destroyed += trunk as u64;
                self.foliage_destroyed += foliage as u64;
            }
            JobOutcome::ImplementExhausted { trunk } => {
                self.implement_exhausted += 1;
                self.trunk_destroyed += trunk as u64;
            }
        }
    }

    /// Jobs that reached any terminal outcome.
    pub fn finished(&self) -> u64 {
        self.standing
            + self.no_trunk
            + self.felled
            + self.cancelled
            + self.timed_out
            + self.implement_exhausted
    }
}
