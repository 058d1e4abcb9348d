//! Per-space job scheduler.
//!
//! [`Scheduler`] owns every job of one space: a de-duplicated FIFO of
//! waiting jobs, a bounded running set, and the limiters they share. Each
//! [`tick()`](Scheduler::tick) runs five stages:
//!
//! 1. Promote waiting jobs up to `max_concurrent_jobs`.
//! 2. Refill the break budget and open the feedback window.
//! 3. Prepare running jobs: age, cancellation, timeout, budget share.
//! 4. Step running jobs round-robin until none progress or the tick
//!    deadline passes.
//! 5. Retire completed jobs and release their origins.
//!
//! # Invariants
//!
//! - An origin is waiting or running at most once.
//! - The queued-origin set is empty exactly when no job is waiting or
//!   running.
//! - At most `max_concurrent_jobs` jobs run at once.

use std::collections::VecDeque;
use std::sync::Arc;

use fell_core::{
    ActorId, Clock, DropSink, Implement, SubmitError, TickId, VoxelPos, VoxelWorld,
};
use indexmap::IndexSet;
use log::{debug, warn};

use crate::analysis::{Engine, Phase, StepContext, StepStatus};
use crate::config::{ConfigError, FellConfig};
use crate::job::{Job, JobId, JobPool};
use crate::limiter::{SpaceLimits, TickBudget};
use crate::metrics::{CompletedJob, SchedulerStats, TickMetrics};

/// Result of a successful [`Scheduler::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// A new job was queued.
    Queued {
        /// Handle to the queued job.
        job: JobId,
    },
    /// A job for the same origin is already waiting or running.
    AlreadyQueued,
}

#[derive(Debug)]
struct Running {
    job: JobId,
    engine: Engine,
    budget: u32,
}

/// Scheduler for one space.
#[derive(Debug)]
pub struct Scheduler {
    config: Arc<FellConfig>,
    pool: JobPool,
    waiting: VecDeque<JobId>,
    running: Vec<Running>,
    idle: Vec<Engine>,
    queued: IndexSet<VoxelPos>,
    limits: SpaceLimits,
    rotation: usize,
    tick: TickId,
    next_serial: u64,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a scheduler after validating `config`.
    pub fn new(config: Arc<FellConfig>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_validated(config))
    }

    pub(crate) fn with_validated(config: Arc<FellConfig>) -> Self {
        let limits = SpaceLimits::new(&config);
        Self {
            pool: JobPool::new(),
            waiting: VecDeque::new(),
            running: Vec::with_capacity(config.max_concurrent_jobs),
            idle: Vec::new(),
            queued: IndexSet::new(),
            limits,
            rotation: 0,
            tick: TickId::default(),
            next_serial: 0,
            stats: SchedulerStats::default(),
            config,
        }
    }

    /// Queue an analysis rooted at `origin`.
    ///
    /// The first submission for an origin wins; later ones return
    /// [`Submission::AlreadyQueued`] until that job retires.
    pub fn submit(
        &mut self,
        origin: VoxelPos,
        actor: Option<ActorId>,
        implement: Option<Implement>,
    ) -> Result<Submission, SubmitError> {
        if self.queued.contains(&origin) {
            self.stats.deduplicated += 1;
            return Ok(Submission::AlreadyQueued);
        }
        let capacity = self.config.max_pending_jobs;
        if self.waiting.len() >= capacity {
            self.stats.queue_full_rejections += 1;
            return Err(SubmitError::QueueFull { capacity });
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        let job = self.pool.insert(Job::new(origin, actor, implement, serial));
        self.waiting.push_back(job);
        self.queued.insert(origin);
        self.stats.submitted += 1;
        Ok(Submission::Queued { job })
    }

    /// Run one tick of every job in this space.
    pub fn tick(
        &mut self,
        world: &mut dyn VoxelWorld,
        sink: &mut dyn DropSink,
        clock: &dyn Clock,
    ) -> TickMetrics {
        let config = Arc::clone(&self.config);
        let start = clock.now();
        let mut metrics = TickMetrics::default();
        self.tick = self.tick.next();
        self.stats.ticks += 1;
        let mut deadline = TickBudget::new(
            start,
            config.tick_time_budget(),
            config.clock_check_interval,
        );

        // 1. Promote.
        metrics.promoted = self.promote(world);

        // 2. Space-wide limits.
        self.limits.breaks.refill();
        let remaining = self
            .running
            .iter()
            .map(|r| r.engine.remaining_destructions())
            .sum();
        self.limits.feedback.begin_tick(start, remaining);

        // 3. Prepare.
        self.prepare(world);

        // 4. Round-robin.
        let n = self.running.len();
        if n > 0 {
            let first = self.rotation % n;
            self.rotation = self.rotation.wrapping_add(1);
            let mut first_step = true;
            'rounds: loop {
                let mut progressed = false;
                for k in 0..n {
                    let r = &mut self.running[(first + k) % n];
                    let phase = r.engine.phase();
                    if phase == Phase::Complete || (phase.draws_budget() && r.budget == 0) {
                        continue;
                    }
                    if !first_step && deadline.expired_now(clock) {
                        break 'rounds;
                    }
                    first_step = false;
                    let mut ctx = StepContext::new(
                        &mut *world,
                        &mut *sink,
                        clock,
                        &config,
                        &mut deadline,
                        &mut r.budget,
                        &mut self.limits,
                    );
                    metrics.steps += 1;
                    if r.engine.step(&mut ctx) != StepStatus::Starved {
                        progressed = true;
                    }
                    if let Some(job) = self.pool.get_mut(r.job) {
                        job.cancel_enabled = !r.engine.committed();
                    }
                }
                if !progressed || deadline.is_expired() {
                    break;
                }
            }
        }
        metrics.deadline_hit = deadline.is_expired();
        if metrics.deadline_hit {
            self.stats.deadline_hits += 1;
        }

        // 5. Retire.
        let mut i = 0;
        while i < self.running.len() {
            if self.running[i].engine.phase() == Phase::Complete {
                let running = self.running.remove(i);
                if let Some(done) = self.retire(running) {
                    metrics.completed.push(done);
                }
            } else {
                i += 1;
            }
        }

        metrics.breaks_used = self.limits.breaks.used_this_tick();
        metrics.effects_emitted = self.limits.feedback.emitted_this_tick();
        metrics.running = self.running.len();
        metrics.waiting = self.waiting.len();
        metrics.total_us = clock.now().saturating_sub(start).as_micros() as u64;
        metrics
    }

    fn promote(&mut self, world: &dyn VoxelWorld) -> u32 {
        let mut promoted = 0;
        while self.running.len() < self.config.max_concurrent_jobs {
            let Some(id) = self.waiting.pop_front() else {
                break;
            };
            let Some(job) = self.pool.get_mut(id) else {
                continue;
            };
            job.implement_valid = match (job.actor, job.implement.as_ref()) {
                (Some(actor), Some(implement)) => world.implement_usable(actor, implement),
                _ => false,
            };
            let mut engine = self.idle.pop().unwrap_or_default();
            engine.begin(job);
            self.running.push(Running {
                job: id,
                engine,
                budget: 0,
            });
            promoted += 1;
        }
        promoted
    }

    fn prepare(&mut self, world: &dyn VoxelWorld) {
        let n = self.running.len() as u32;
        let share = if n == 0 {
            0
        } else {
            self.limits.breaks.available().div_ceil(n)
        };
        let max_age = self.config.max_job_age_ticks;
        for r in &mut self.running {
            r.budget = share;
            let Some(job) = self.pool.get_mut(r.job) else {
                continue;
            };
            job.age_ticks += 1;
            job.cancel_enabled = !r.engine.committed();
            if job.cancel_enabled {
                if let Some(actor) = job.actor {
                    if !world.actor_engaged(actor, job.implement.as_ref()) {
                        debug!("job at {}: actor {actor} disengaged", job.origin);
                        r.engine.cancel();
                        continue;
                    }
                }
            }
            if job.age_ticks > max_age && r.engine.phase() != Phase::Complete {
                warn!(
                    "job at {} timed out after {} ticks in {:?}",
                    job.origin,
                    job.age_ticks,
                    r.engine.phase()
                );
                r.engine.expire();
            }
        }
    }

    fn retire(&mut self, mut running: Running) -> Option<CompletedJob> {
        let outcome = running.engine.outcome();
        running.engine.reset();
        self.idle.push(running.engine);
        let job = self.pool.release(running.job)?;
        self.queued.swap_remove(&job.origin);
        let outcome = outcome?;
        self.stats.record(&outcome);
        Some(CompletedJob {
            origin: job.origin,
            outcome,
        })
    }

    /// Cancel the job for `origin`.
    ///
    /// A waiting job is dropped; a running one is cancelled only while it
    /// has not started removing trunk. Returns whether a job was cancelled.
    pub fn cancel(&mut self, origin: VoxelPos) -> bool {
        if let Some(i) = self
            .waiting
            .iter()
            .position(|id| self.pool.get(*id).is_some_and(|j| j.origin == origin))
        {
            if let Some(id) = self.waiting.remove(i) {
                self.pool.release(id);
            }
            self.queued.swap_remove(&origin);
            self.stats.cancelled += 1;
            return true;
        }
        let Some(i) = self
            .running
            .iter()
            .position(|r| r.engine.origin() == origin && r.engine.phase() != Phase::Complete)
        else {
            return false;
        };
        if !self.running[i].engine.cancel() {
            return false;
        }
        let running = self.running.remove(i);
        self.retire(running);
        true
    }

    /// Drop every job, e.g. when the space unloads. Nothing is rolled back.
    pub fn clear(&mut self) {
        for mut r in self.running.drain(..) {
            r.engine.reset();
            self.idle.push(r.engine);
        }
        self.waiting.clear();
        self.pool.clear();
        self.queued.clear();
        self.limits.breaks.reset();
    }

    /// Whether a running job has marked `pos` for destruction.
    pub fn is_doomed(&self, pos: VoxelPos) -> bool {
        self.running.iter().any(|r| r.engine.is_doomed(pos))
    }

    /// Whether a job for `origin` is waiting or running.
    pub fn is_queued(&self, origin: VoxelPos) -> bool {
        self.queued.contains(&origin)
    }

    /// Whether there is nothing to do.
    pub fn is_idle(&self) -> bool {
        self.waiting.is_empty() && self.running.is_empty()
    }

    /// Jobs waiting or running.
    pub fn pending_jobs(&self) -> usize {
        self.waiting.len() + self.running.len()
    }

    /// Jobs running.
    pub fn running_jobs(&self) -> usize {
        self.running.len()
    }

    /// Jobs waiting.
    pub fn waiting_jobs(&self) -> usize {
        self.waiting.len()
    }

    /// Origins currently waiting or running.
    pub fn queued_origins(&self) -> impl Iterator<Item = VoxelPos> + '_ {
        self.queued.iter().copied()
    }

    /// Look up a live job.
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.pool.get(id)
    }

    /// Ticks processed.
    pub fn tick_id(&self) -> TickId {
        self.tick
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// The configuration this scheduler runs with.
    pub fn config(&self) -> &FellConfig {
        &self.config
    }
}
