//! The capability surface for reading and mutating provider build state.

use async_trait::async_trait;

use crate::{Build, BuildQuery, Result};

/// Operations the sequencer needs from the CI provider.
///
/// Each is a single request with no transactional guarantee. There is no
/// retry policy: a failure of any of them is fatal to the invocation,
/// because proceeding under uncertain provider state risks two builds
/// running at once.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Return the first build matching `query` in its sort order.
    /// Fails with [`Error::NoMatch`](crate::Error::NoMatch) when nothing
    /// matches.
    async fn find(&self, query: &BuildQuery) -> Result<Build>;

    /// Request cancellation of a build. Success means the provider
    /// accepted the request, not that the state already changed.
    async fn cancel(&self, id: u64) -> Result<()>;

    /// Request that a build be re-queued. Same acknowledgment semantics
    /// as [`cancel`](ControlPlane::cancel).
    async fn restart(&self, id: u64) -> Result<()>;
}
