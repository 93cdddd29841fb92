//! Guard for operations that write application-scoped state
//!
//! Only the leader unit of an application may write its application databags. Every other unit
//! skips the operation, so there is at most one writer per application at any time.

use tracing::debug;

use crate::error::CharmError;
use crate::model::Backend;

/// Run `op` if the local unit is the leader, otherwise do nothing and return `Ok(None)`
pub fn leader_only<B, T, F>(backend: &B, op: F) -> Result<Option<T>, CharmError>
where
    B: Backend + ?Sized,
    F: FnOnce() -> Result<T, CharmError>,
{
    if !backend.is_leader()? {
        debug!("{} is not the leader, skipping", backend.unit_name());
        return Ok(None);
    }

    op().map(Some)
}
