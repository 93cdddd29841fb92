//! The `ldap` relation interface
//!
//! The requirer writes the identity it wants a bind account for ([`RequirerRecord`]) into its
//! application databag when the relation is created. The provider reacts with
//! [`LdapEvent::Requested`], and once the embedding charm has prepared an account it publishes a
//! [`ProviderRecord`] into its own application databag. The requirer then sees
//! [`LdapEvent::Ready`] and reads the record back with [`LdapRequirer::consume`]. When the
//! relation is removed the requirer sees [`LdapEvent::Unavailable`].
//!
//! Application databags may only be written by the leader, so every write is leader-gated and
//! non-leader units simply skip it.

pub mod events;
pub mod provider;
pub mod records;
pub mod requirer;

pub use events::{IntegrationState, LdapEvent};
pub use provider::LdapProvider;
pub use records::{ProviderBaseRecord, ProviderRecord, RequirerRecord};
pub use requirer::LdapRequirer;

use serde::Serialize;
use tracing::debug;

use crate::databag::encode;
use crate::error::CharmError;
use crate::leadership::leader_only;
use crate::model::{Backend, Scope};

/// Default endpoint name for the interface in `metadata.yaml`
pub const DEFAULT_ENDPOINT: &str = "ldap";

pub const AUTH_METHOD_SIMPLE: &str = "simple";

/// Write `record` into the local application databag of a relation in one update
///
/// Skipped on non-leader units. A relation that no longer exists is skipped too, since the
/// other side may have gone away while the record was being prepared.
fn update_app_databag<B, T>(
    backend: &B,
    endpoint: &str,
    relation_id: u32,
    record: &T,
) -> Result<(), CharmError>
where
    B: Backend + ?Sized,
    T: Serialize,
{
    leader_only(backend, || {
        if backend.get_relation(endpoint, Some(relation_id))?.is_none() {
            debug!("Relation {}:{} is gone, not publishing", endpoint, relation_id);
            return Ok(());
        }

        backend.relation_set(relation_id, Scope::LocalApp, &encode(record)?)
    })
    .map(|_| ())
}
