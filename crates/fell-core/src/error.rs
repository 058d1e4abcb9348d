//! Error types shared across the Fell workspace.
//!
//! Structural analysis itself has no error taxonomy: support found,
//! timeouts, and exhausted tools are terminal job outcomes. The errors
//! here cover the two places where the host can be told "no": job
//! submission and falling-body placement.

use std::error::Error;
use std::fmt;

/// Reasons a submission was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// A suspension predicate matched the submission.
    Suspended,
    /// The space's waiting queue is at capacity.
    QueueFull {
        /// Configured maximum number of waiting jobs.
        capacity: usize,
    },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended => write!(f, "submissions are suspended"),
            Self::QueueFull { capacity } => {
                write!(f, "job queue full ({capacity} waiting)")
            }
        }
    }
}

impl Error for SubmitError {}

/// Returned by the host when a falling body cannot be placed.
///
/// The engine converts the voxel into an item drop instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnRejected {
    /// Human-readable reason from the host.
    pub reason: String,
}

impl fmt::Display for SpawnRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "falling body rejected: {}", self.reason)
    }
}

impl Error for SpawnRejected {}
