//! Build snapshots and the query shape used to ask the provider for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a build as reported by the provider.
///
/// The protocol only distinguishes `Started`, the finished subset
/// (`Passed`, `Failed`, `Errored`) and `Canceled`; anything else the
/// provider reports collapses into `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Created,
    Started,
    Passed,
    Failed,
    Errored,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl BuildState {
    /// A terminal, non-canceled state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BuildState::Passed | BuildState::Failed | BuildState::Errored
        )
    }
}

/// Snapshot of one build as reported by the provider.
///
/// Builds are owned entirely by the provider; the sequencer only observes
/// snapshots and never assumes one stays valid beyond the instant it was
/// taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Provider-assigned, monotonically increasing. The only trusted
    /// total order across builds.
    pub id: u64,
    /// Human-readable sequence label, display only.
    pub number: String,
    pub state: BuildState,
    /// Present once the build enters `started`.
    pub started_at: Option<DateTime<Utc>>,
}

/// Provider-interpreted sort order for a build query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Ascending start time.
    StartedAt,
    /// Descending id, newest first.
    IdDescending,
}

/// Request shape for "the build matching X that sorts first by Y".
#[derive(Debug, Clone)]
pub struct BuildQuery {
    pub branch: String,
    pub event_type: String,
    /// Empty means any state.
    pub states: Vec<BuildState>,
    pub sort: SortKey,
    pub limit: u32,
}

impl BuildQuery {
    /// The `started` build with the smallest start time on this branch.
    pub fn earliest_started(branch: &str, event_type: &str) -> Self {
        Self {
            branch: branch.to_string(),
            event_type: event_type.to_string(),
            states: vec![BuildState::Started],
            sort: SortKey::StartedAt,
            limit: 1,
        }
    }

    /// The finished build with the largest id on this branch.
    pub fn newest_finished(branch: &str, event_type: &str) -> Self {
        Self {
            branch: branch.to_string(),
            event_type: event_type.to_string(),
            states: vec![BuildState::Passed, BuildState::Failed, BuildState::Errored],
            sort: SortKey::IdDescending,
            limit: 1,
        }
    }

    /// The build with the largest id on this branch, in any state.
    pub fn newest(branch: &str, event_type: &str) -> Self {
        Self {
            branch: branch.to_string(),
            event_type: event_type.to_string(),
            states: Vec::new(),
            sort: SortKey::IdDescending,
            limit: 1,
        }
    }
}
