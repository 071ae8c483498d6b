//! Core protocol types and sequencing logic for onebuild.
//!
//! This crate contains:
//! - Build snapshots and the query shape used to read provider state
//! - The ControlPlane capability trait
//! - The Sequencer: election, staleness detection, self-cancellation
//!   and restart chaining

pub mod build;
pub mod control_plane;
pub mod error;
pub mod sequencer;

pub use build::{Build, BuildQuery, BuildState, SortKey};
pub use control_plane::ControlPlane;
pub use error::{Error, Result};
pub use sequencer::{BuildContext, CancelReason, Sequencer, StartDecision};
