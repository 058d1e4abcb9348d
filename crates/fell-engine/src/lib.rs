//! Budgeted structural-collapse analysis for voxel trees.
//!
//! When a trunk voxel is removed, an [`Engine`] decides whether the
//! remaining structure is still supported and, if not, tears it down:
//! breaking it in place or converting it to falling bodies, clearing the
//! foliage that depended on it, and handing the drops to the host.
//!
//! Analyses run incrementally. A [`Scheduler`] per space interleaves jobs
//! under a per-tick time budget and a destructive rate limit, and a
//! [`Dispatcher`] routes submissions and ticks to the right space.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod dispatcher;
pub mod job;
pub mod limiter;
pub mod metrics;
pub mod scheduler;

pub use analysis::{Drift, Engine, JobOutcome, Phase, StepContext, StepStatus, Visit, VisitKind};
pub use config::{
    ConfigError, DropConfig, FallConfig, FallMode, FellConfig, FoliageConfig, LogLimitConfig,
    SearchRange, MAX_SEARCH_DEPTH, MAX_SEARCH_RANGE,
};
pub use dispatcher::{Dispatcher, SuspendGuard};
pub use fell_core::{Clock, SystemClock};
pub use job::{Job, JobId, JobPool};
pub use limiter::{BreakBudget, FeedbackLimiter, SpaceLimits, TickBudget};
pub use metrics::{CompletedJob, SchedulerStats, TickMetrics};
pub use scheduler::{Scheduler, Submission};
