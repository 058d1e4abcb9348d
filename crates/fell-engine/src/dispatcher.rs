//! Registry of per-space schedulers owned by the host simulation.
//!
//! A [`Dispatcher`] maps each [`SpaceId`] to its [`Scheduler`], creating
//! schedulers on first submission. It also owns the clock every tick is
//! measured against and the optional suspension predicate that lets the
//! host break trunk voxels itself without triggering new analyses.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use fell_core::{
    ActorId, Clock, DropSink, Implement, SpaceId, SubmitError, SystemClock, VoxelPos, VoxelWorld,
};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::config::{ConfigError, FellConfig};
use crate::metrics::{SchedulerStats, TickMetrics};
use crate::scheduler::{Scheduler, Submission};

type SuspendPredicate = Box<dyn Fn(SpaceId, VoxelPos) -> bool + Send>;

/// Routes submissions, ticks, and queries to per-space schedulers.
pub struct Dispatcher {
    config: Arc<FellConfig>,
    clock: Box<dyn Clock + Send>,
    spaces: IndexMap<SpaceId, Scheduler>,
    suspension: Option<SuspendPredicate>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("spaces", &self.spaces.keys().collect::<Vec<_>>())
            .field("suspended", &self.suspension.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher measuring ticks against the system clock.
    pub fn new(config: FellConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Create a dispatcher with an explicit clock.
    pub fn with_clock(
        config: FellConfig,
        clock: Box<dyn Clock + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            clock,
            spaces: IndexMap::new(),
            suspension: None,
        })
    }

    /// Queue an analysis rooted at `origin` in `space`.
    pub fn submit(
        &mut self,
        space: SpaceId,
        origin: VoxelPos,
        actor: Option<ActorId>,
        implement: Option<Implement>,
    ) -> Result<Submission, SubmitError> {
        if self.suspension.as_ref().is_some_and(|p| p(space, origin)) {
            warn!("submission at {origin} in space {space} refused: suspended");
            return Err(SubmitError::Suspended);
        }
        let config = &self.config;
        self.spaces
            .entry(space)
            .or_insert_with(|| {
                debug!("space {space}: scheduler created");
                Scheduler::with_validated(Arc::clone(config))
            })
            .submit(origin, actor, implement)
    }

    /// Tick the scheduler of `space`.
    ///
    /// Returns `None` without touching the world when the space has no
    /// scheduler or nothing to do.
    pub fn route_tick(
        &mut self,
        space: SpaceId,
        world: &mut dyn VoxelWorld,
        sink: &mut dyn DropSink,
    ) -> Option<TickMetrics> {
        let scheduler = self.spaces.get_mut(&space)?;
        if scheduler.is_idle() {
            return None;
        }
        Some(scheduler.tick(world, sink, &*self.clock))
    }

    /// Whether a running job in `space` has marked `pos` for destruction.
    ///
    /// Always false while a suspension is active.
    pub fn is_doomed(&self, space: SpaceId, pos: VoxelPos) -> bool {
        if self.suspension.is_some() {
            return false;
        }
        self.spaces
            .get(&space)
            .is_some_and(|s| s.is_doomed(pos))
    }

    /// Refuse submissions selected by `predicate` until [`resume`](Self::resume).
    ///
    /// Replaces any predicate already installed.
    pub fn suspend<F>(&mut self, predicate: F)
    where
        F: Fn(SpaceId, VoxelPos) -> bool + Send + 'static,
    {
        self.suspension = Some(Box::new(predicate));
    }

    /// Lift any suspension. Idempotent.
    pub fn resume(&mut self) {
        self.suspension = None;
    }

    /// Whether a suspension is active.
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Suspend for the lifetime of the returned guard.
    ///
    /// The guard derefs to the dispatcher and resumes when dropped, also
    /// during unwinding.
    pub fn suspended<F>(&mut self, predicate: F) -> SuspendGuard<'_>
    where
        F: Fn(SpaceId, VoxelPos) -> bool + Send + 'static,
    {
        self.suspend(predicate);
        SuspendGuard { dispatcher: self }
    }

    /// Cancel the job for `origin` in `space`. See [`Scheduler::cancel`].
    pub fn cancel(&mut self, space: SpaceId, origin: VoxelPos) -> bool {
        self.spaces
            .get_mut(&space)
            .is_some_and(|s| s.cancel(origin))
    }

    /// Drop a space and every job in it, e.g. when it unloads.
    pub fn remove_space(&mut self, space: SpaceId) -> bool {
        match self.spaces.shift_remove(&space) {
            Some(scheduler) => {
                debug!(
                    "space {space}: removed with {} pending jobs",
                    scheduler.pending_jobs()
                );
                true
            }
            None => false,
        }
    }

    /// Cumulative counters for `space`.
    pub fn stats(&self, space: SpaceId) -> Option<&SchedulerStats> {
        self.spaces.get(&space).map(Scheduler::stats)
    }

    /// Jobs waiting or running in `space`.
    pub fn pending_jobs(&self, space: SpaceId) -> usize {
        self.spaces.get(&space).map_or(0, Scheduler::pending_jobs)
    }

    /// The scheduler of `space`, if one exists.
    pub fn scheduler(&self, space: SpaceId) -> Option<&Scheduler> {
        self.spaces.get(&space)
    }

    /// Spaces with a scheduler, in creation order.
    pub fn spaces(&self) -> impl Iterator<Item = SpaceId> + '_ {
        self.spaces.keys().copied()
    }

    /// The shared configuration.
    pub fn config(&self) -> &FellConfig {
        &self.config
    }
}

/// Keeps a [`Dispatcher`] suspended while alive.
#[derive(Debug)]
#[must_use = "dropping the guard resumes immediately"]
pub struct SuspendGuard<'a> {
    dispatcher: &'a mut Dispatcher,
}

impl Deref for SuspendGuard<'_> {
    type Target = Dispatcher;

    fn deref(&self) -> &Dispatcher {
        self.dispatcher
    }
}

impl DerefMut for SuspendGuard<'_> {
    fn deref_mut(&mut self) -> &mut Dispatcher {
        self.dispatcher
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.resume();
    }
}
