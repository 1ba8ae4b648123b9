//! Checkpoint module for resumable runs.
//!
//! Provides `CheckpointManager`, which persists the set of row indices that
//! have already been turned into notes.

mod store;

pub use store::*;
