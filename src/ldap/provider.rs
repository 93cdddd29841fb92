//! Provider side of the `ldap` interface

use tracing::{debug, info};

use super::events::LdapEvent;
use super::records::{ProviderBaseRecord, ProviderRecord, RequirerRecord};
use super::{update_app_databag, DEFAULT_ENDPOINT};
use crate::databag::decode;
use crate::error::CharmError;
use crate::leadership::leader_only;
use crate::model::{Backend, RelationEvent, Scope};

/// Serves bind accounts to charms that require the `ldap` interface
pub struct LdapProvider<'a, B: Backend + ?Sized> {
    backend: &'a B,
    endpoint: String,
}

impl<'a, B: Backend + ?Sized> LdapProvider<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self::with_endpoint(backend, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(backend: &'a B, endpoint: &str) -> Self {
        Self {
            backend,
            endpoint: endpoint.to_string(),
        }
    }

    /// Translate a relation lifecycle notification into a domain event
    pub fn handle(&self, event: &RelationEvent) -> Result<Option<LdapEvent>, CharmError> {
        match event {
            RelationEvent::Changed(id) => self.on_relation_changed(*id),
            _ => Ok(None),
        }
    }

    /// The requirer's databag changed
    ///
    /// Raises `Requested` on the leader. A databag that doesn't hold a usable identity yet is
    /// reported as `data: None` rather than as an error.
    pub fn on_relation_changed(&self, relation_id: u32) -> Result<Option<LdapEvent>, CharmError> {
        leader_only(self.backend, || {
            let app = self.backend.remote_app(relation_id)?;
            let databag = self.backend.relation_get(relation_id, Scope::RemoteApp)?;

            let data = decode::<RequirerRecord>(&databag).unwrap_or_else(|err| {
                debug!("Requirer data on relation {} is not usable yet: {}", relation_id, err);
                None
            });

            info!("LDAP bind account requested on relation {}", relation_id);
            Ok(LdapEvent::Requested {
                relation_id,
                app,
                data,
            })
        })
    }

    /// Publish connection details for one requirer
    pub fn publish(&self, relation_id: u32, record: &ProviderRecord) -> Result<(), CharmError> {
        update_app_databag(self.backend, &self.endpoint, relation_id, record)
    }

    /// Publish the account-independent connection details to every requirer
    pub fn publish_all(&self, base: &ProviderBaseRecord) -> Result<(), CharmError> {
        for relation_id in self.backend.relation_ids(&self.endpoint)? {
            update_app_databag(self.backend, &self.endpoint, relation_id, base)?;
        }

        Ok(())
    }
}
