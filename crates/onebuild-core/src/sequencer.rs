//! Election, staleness detection, self-cancellation and restart chaining.
//!
//! Each CI job runs the sequencer once, in its own process. Competing
//! executions never talk to each other directly; the provider's build
//! table is the only shared state, and leadership is derived from it:
//! the leader is the started build with the earliest start time that no
//! newer finished build has superseded.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::{BuildQuery, BuildState, ControlPlane, Error, Result};

/// How long a self-cancelled invocation stays out of the way. Travis
/// kills builds after two hours, so the provider acts first.
pub const CANCEL_STALL: Duration = Duration::from_secs(3 * 60 * 60);

/// Identity of the currently-executing build, supplied by the invoking
/// environment and immutable for the lifetime of the decision.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub build_id: u64,
    pub branch: String,
    pub event_type: String,
}

/// Outcome of the start-phase election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDecision {
    /// This build is the leader and nothing newer has finished.
    Proceed,
    /// This build must take itself out of the running.
    Cancel(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// Another started build has an earlier start time.
    NotEarliest { earliest_id: u64 },
    /// A newer build already finished while this one was pending.
    Superseded { finished_id: u64 },
}

/// Runs the coordination protocol for one build execution.
pub struct Sequencer {
    control: Arc<dyn ControlPlane>,
    ctx: BuildContext,
}

impl Sequencer {
    pub fn new(control: Arc<dyn ControlPlane>, ctx: BuildContext) -> Self {
        Self { control, ctx }
    }

    /// Decide whether this execution may proceed.
    ///
    /// A zero-result query is fatal: whatever else is true, the provider
    /// should at least report this build's own existence.
    pub async fn start_decision(&self) -> Result<StartDecision> {
        let earliest = self
            .control
            .find(&BuildQuery::earliest_started(
                &self.ctx.branch,
                &self.ctx.event_type,
            ))
            .await?;
        if earliest.id != self.ctx.build_id {
            info!(
                number = %earliest.number,
                id = earliest.id,
                started_at = ?earliest.started_at,
                "Found an older build running"
            );
            return Ok(StartDecision::Cancel(CancelReason::NotEarliest {
                earliest_id: earliest.id,
            }));
        }

        let finished = self
            .control
            .find(&BuildQuery::newest_finished(
                &self.ctx.branch,
                &self.ctx.event_type,
            ))
            .await?;
        if finished.id > self.ctx.build_id {
            info!(
                number = %finished.number,
                id = finished.id,
                state = ?finished.state,
                "Found a newer finished build"
            );
            return Ok(StartDecision::Cancel(CancelReason::Superseded {
                finished_id: finished.id,
            }));
        }

        Ok(StartDecision::Proceed)
    }

    /// Run the start phase end to end.
    ///
    /// Returns `Ok(())` when this execution may proceed. On a cancel
    /// decision this issues one cancel request and then stalls until the
    /// provider kills the job; it only returns if that never happens.
    pub async fn start(&self) -> Result<()> {
        match self.start_decision().await? {
            StartDecision::Proceed => Ok(()),
            StartDecision::Cancel(reason) => Err(self.cancel_self(reason).await),
        }
    }

    /// Run the finish phase: revive the newest build if it was canceled.
    ///
    /// Only the newest build is worth reviving; older canceled builds are
    /// superseded and would cancel themselves again anyway. A build whose
    /// self-cancellation is not yet visible here is missed — the next
    /// push on the branch heals that, so no synchronization is attempted.
    pub async fn finish(&self) -> Result<()> {
        let newest = self
            .control
            .find(&BuildQuery::newest(&self.ctx.branch, &self.ctx.event_type))
            .await?;
        if newest.state == BuildState::Canceled {
            info!(number = %newest.number, id = newest.id, "Restarting cancelled build");
            self.control.restart(newest.id).await?;
        }
        Ok(())
    }

    /// Request cancellation of this build, then stay out of the way.
    ///
    /// Terminal: the stall outlives the provider's build timeout, so
    /// control only comes back here if the cancellation never took
    /// effect, which is reported as its own fatal error.
    async fn cancel_self(&self, reason: CancelReason) -> Error {
        info!(id = self.ctx.build_id, ?reason, "Cancelling this build");
        if let Err(e) = self.control.cancel(self.ctx.build_id).await {
            return e;
        }
        sleep(CANCEL_STALL).await;
        Error::CancelNotEffective(self.ctx.build_id)
    }
}
