//! Jobs and the generational slot pool that owns them.
//!
//! A [`JobId`] is generation-scoped: releasing a slot bumps its generation,
//! so a stale id held by the host resolves to `None` instead of aliasing
//! the job that reuses the slot.

use std::fmt;

use fell_core::{ActorId, Implement, VoxelPos};

/// One queued or running analysis request.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    /// Voxel the analysis starts from.
    pub origin: VoxelPos,
    /// Initiating actor, if any.
    pub actor: Option<ActorId>,
    /// Tool the actor used.
    pub implement: Option<Implement>,
    /// Whether the oracle confirmed the implement usable when the job
    /// started. Tool bonuses and wear only apply when set.
    pub implement_valid: bool,
    /// Whether the job may still be cancelled. Cleared once trunk removal
    /// begins.
    pub cancel_enabled: bool,
    /// Ticks since the job started running.
    pub age_ticks: u64,
    /// Per-space submission counter, mixed into the drift seed.
    pub serial: u64,
}

impl Job {
    /// A fresh job that has not started running.
    pub fn new(
        origin: VoxelPos,
        actor: Option<ActorId>,
        implement: Option<Implement>,
        serial: u64,
    ) -> Self {
        Self {
            origin,
            actor,
            implement,
            implement_valid: false,
            cancel_enabled: true,
            age_ticks: 0,
            serial,
        }
    }

    /// The implement, but only when it was validated.
    pub fn valid_implement(&self) -> Option<&Implement> {
        if self.implement_valid {
            self.implement.as_ref()
        } else {
            None
        }
    }
}

/// Handle to a job slot in a [`JobPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct JobId {
    index: u32,
    generation: u32,
}

impl JobId {
    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({}v{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    job: Option<Job>,
}

/// Slot allocator for jobs with O(1) insert, lookup, and release.
#[derive(Debug, Default)]
pub struct JobPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl JobPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a job, reusing a released slot when one exists.
    pub fn insert(&mut self, job: Job) -> JobId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.job = Some(job);
            return JobId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            job: Some(job),
        });
        JobId {
            index,
            generation: 0,
        }
    }

    /// Resolve a handle; `None` if it is stale.
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.job.as_ref())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.job.as_mut())
    }

    /// Remove a job and invalidate its handle.
    pub fn release(&mut self, id: JobId) -> Option<Job> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let job = slot.job.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(job)
    }

    /// Live jobs.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no jobs are live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Release every job. Slots and their generations are kept.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.job.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_at(x: i32) -> Job {
        Job::new(VoxelPos::new(x, 0, 0), None, None, x as u64)
    }

    #[test]
    fn insert_and_get() {
        let mut pool = JobPool::new();
        let a = pool.insert(job_at(1));
        let b = pool.insert(job_at(2));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(a).map(|j| j.origin.x), Some(1));
        assert_eq!(pool.get(b).map(|j| j.origin.x), Some(2));
    }

    #[test]
    fn released_handle_is_stale() {
        let mut pool = JobPool::new();
        let a = pool.insert(job_at(1));
        assert!(pool.release(a).is_some());
        assert!(pool.get(a).is_none());
        assert!(pool.release(a).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut pool = JobPool::new();
        let a = pool.insert(job_at(1));
        pool.release(a);
        let b = pool.insert(job_at(2));
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(pool.get(a).is_none());
        assert_eq!(pool.get(b).map(|j| j.origin.x), Some(2));
    }

    #[test]
    fn clear_invalidates_all_handles() {
        let mut pool = JobPool::new();
        let ids: Vec<JobId> = (0..4).map(|i| pool.insert(job_at(i))).collect();
        pool.clear();
        assert!(pool.is_empty());
        assert!(ids.iter().all(|id| pool.get(*id).is_none()));
        let fresh = pool.insert(job_at(9));
        assert!(fresh.index() < 4);
    }

    #[test]
    fn valid_implement_requires_validation() {
        let mut job = job_at(0);
        job.implement = Some(Implement {
            item: fell_core::ItemId(3),
            tier: 1,
            felling_level: 0,
        });
        assert!(job.valid_implement().is_none());
        job.implement_valid = true;
        assert!(job.valid_implement().is_some());
    }
}
