//! Core types and traits for the Fell structural-collapse engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the engine, test utilities, and host
//! integrations: identifiers, voxel addresses and neighbourhood offsets,
//! item and falling-body payloads, the monotonic [`Clock`], the world
//! collaborator traits, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod id;
pub mod payload;
pub mod pos;
pub mod world;

pub use clock::{Clock, SystemClock};
pub use error::{SpawnRejected, SubmitError};
pub use id::{ActorId, ItemId, SpaceId, TickId};
pub use payload::{BlockState, DropBatch, FallingBody, Implement, ItemStack, Items};
pub use pos::{Adjacency, Axis, Offset, VoxelPos, NEIGHBOURS_26};
pub use world::{DropSink, FoliageDecay, VoxelWorld, WorldOracle};
