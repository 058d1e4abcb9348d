//! Fell: incremental structural-collapse analysis for voxel trees.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Fell sub-crates. For most hosts, adding `fell` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use fell::prelude::*;
//! use fell_test_utils::{fixtures::column, MockWorld, RecordingSink};
//!
//! // A five-voxel trunk whose base the player just broke.
//! let mut world = MockWorld::new();
//! column(&mut world, VoxelPos::new(0, 65, 0), 5);
//!
//! let mut dispatcher = Dispatcher::new(FellConfig::default()).unwrap();
//! let space = SpaceId(0);
//! dispatcher
//!     .submit(space, VoxelPos::new(0, 65, 0), None, None)
//!     .unwrap();
//!
//! let mut sink = RecordingSink::new();
//! while let Some(metrics) = dispatcher.route_tick(space, &mut world, &mut sink) {
//!     for job in &metrics.completed {
//!         assert!(matches!(job.outcome, JobOutcome::Felled { trunk: 5, .. }));
//!     }
//! }
//! assert_eq!(world.trunk_count(), 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fell-core` | IDs, voxel addresses, payloads, world traits, errors |
//! | [`engine`] | `fell-engine` | Analysis engine, schedulers, dispatcher, limiters |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`fell-core`).
///
/// Contains voxel addresses and neighbourhood offsets, item and
/// falling-body payloads, and the collaborator traits a host implements
/// ([`types::WorldOracle`], [`types::VoxelWorld`], [`types::DropSink`]).
pub use fell_core as types;

/// Analysis engine and scheduling (`fell-engine`).
///
/// [`engine::Dispatcher`] for hosts with several spaces,
/// [`engine::Scheduler`] for a single space, and [`engine::Engine`] to
/// drive one analysis by hand.
pub use fell_engine as engine;

/// Common imports for typical Fell usage.
///
/// ```rust
/// use fell::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use fell_core::{
        ActorId, BlockState, Clock, DropBatch, DropSink, FallingBody, FoliageDecay, Implement,
        ItemId, ItemStack, SpaceId, VoxelPos, VoxelWorld, WorldOracle,
    };

    // Errors
    pub use fell_core::{SpawnRejected, SubmitError};
    pub use fell_engine::ConfigError;

    // Engine
    pub use fell_engine::{
        Dispatcher, FallMode, FellConfig, JobOutcome, Scheduler, SchedulerStats, Submission,
        SuspendGuard, TickMetrics,
    };
}
