//! Requirer side of the `ldap` interface

use tracing::{debug, info, warn};

use super::events::{IntegrationState, IntegrationStates, LdapEvent};
use super::records::{ProviderRecord, RequirerRecord};
use super::{update_app_databag, DEFAULT_ENDPOINT};
use crate::databag::decode;
use crate::error::CharmError;
use crate::model::{Backend, RelationEvent, Scope};

/// Requests a bind account from an LDAP server and consumes the resulting connection details
pub struct LdapRequirer<'a, B: Backend + ?Sized> {
    backend: &'a B,
    endpoint: String,
    user: Option<String>,
    group: Option<String>,
    states: IntegrationStates,
}

impl<'a, B: Backend + ?Sized> LdapRequirer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self::with_endpoint(backend, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(backend: &'a B, endpoint: &str) -> Self {
        Self {
            backend,
            endpoint: endpoint.to_string(),
            user: None,
            group: None,
            states: IntegrationStates::default(),
        }
    }

    /// Ask for a specific user and group instead of the application and model names
    pub fn with_identity(mut self, user: Option<&str>, group: Option<&str>) -> Self {
        self.user = user.filter(|u| !u.is_empty()).map(String::from);
        self.group = group.filter(|g| !g.is_empty()).map(String::from);
        self
    }

    /// The identity this requirer publishes
    pub fn identity(&self) -> RequirerRecord {
        RequirerRecord {
            user: self.user.clone().unwrap_or_else(|| self.backend.app_name()),
            group: self.group.clone().unwrap_or_else(|| self.backend.model_name()),
        }
    }

    pub fn state(&self, relation_id: u32) -> IntegrationState {
        self.states.get(relation_id)
    }

    /// Translate a relation lifecycle notification into a domain event
    pub fn handle(&mut self, event: &RelationEvent) -> Result<Option<LdapEvent>, CharmError> {
        match event {
            RelationEvent::Created(id) => self.on_relation_created(*id).map(|_| None),
            RelationEvent::Changed(id) => self.on_relation_changed(*id),
            RelationEvent::Broken(id) => Ok(self.on_relation_broken(*id)),
            RelationEvent::Joined(_) => Ok(None),
        }
    }

    /// Publish the requested identity
    pub fn on_relation_created(&mut self, relation_id: u32) -> Result<(), CharmError> {
        self.states.created(relation_id);

        let identity = self.identity();
        debug!(
            "Requesting LDAP account {}/{} on relation {}",
            identity.group, identity.user, relation_id
        );
        update_app_databag(self.backend, &self.endpoint, relation_id, &identity)
    }

    /// Raise `Ready` if the provider has written anything
    pub fn on_relation_changed(
        &mut self,
        relation_id: u32,
    ) -> Result<Option<LdapEvent>, CharmError> {
        if self.states.get(relation_id) == IntegrationState::Gone {
            return Ok(None);
        }

        let has_data = !self
            .backend
            .relation_get(relation_id, Scope::RemoteApp)?
            .is_empty();

        if self.states.changed(relation_id, has_data) {
            info!("LDAP connection details ready on relation {}", relation_id);
            Ok(Some(LdapEvent::Ready { relation_id }))
        } else {
            Ok(None)
        }
    }

    pub fn on_relation_broken(&mut self, relation_id: u32) -> Option<LdapEvent> {
        if self.states.broken(relation_id) {
            info!("LDAP relation {} is unavailable", relation_id);
            Some(LdapEvent::Unavailable { relation_id })
        } else {
            None
        }
    }

    /// Read the provider's connection details
    ///
    /// Looks the relation up by id, or takes the only one if no id is given. Returns `None` if
    /// there is no such relation, the provider hasn't published yet, or what it published is
    /// incomplete.
    pub fn consume(&self, relation_id: Option<u32>) -> Result<Option<ProviderRecord>, CharmError> {
        let relation_id = match self.backend.get_relation(&self.endpoint, relation_id)? {
            Some(id) => id,
            None => return Ok(None),
        };

        let databag = self.backend.relation_get(relation_id, Scope::RemoteApp)?;
        Ok(decode(&databag).unwrap_or_else(|err| {
            warn!("Ignoring LDAP data on relation {}: {}", relation_id, err);
            None
        }))
    }
}
