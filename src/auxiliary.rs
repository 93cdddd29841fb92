//! Provider side of the `glauth_auxiliary` interface
//!
//! Companion charms such as glauth-utils manage GLAuth's directory directly, so they are handed
//! the same database credentials GLAuth runs on. The provider publishes them whenever a
//! companion asks and whenever the database answers or moves.

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::AUXILIARY_INTEGRATION_NAME;
use crate::databag::encode;
use crate::database::DatabaseConfig;
use crate::error::CharmError;
use crate::leadership::leader_only;
use crate::model::{Backend, RelationEvent, Scope};

/// Database access published to companion charms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuxiliaryRecord {
    pub database: String,
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl AuxiliaryRecord {
    /// `None` until the database charm has filled in every field
    pub fn from_config(config: &DatabaseConfig) -> Option<Self> {
        Some(Self {
            database: config.database.clone()?,
            endpoint: config.endpoint.clone()?,
            username: config.username.clone()?,
            password: config.password.clone()?,
        })
    }
}

pub struct AuxiliaryProvider<'a, B: Backend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> AuxiliaryProvider<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// The relation whose companion is asking for credentials, on the leader only
    pub fn handle(&self, event: &RelationEvent) -> Result<Option<u32>, CharmError> {
        match event {
            RelationEvent::Created(id) | RelationEvent::Changed(id) => {
                leader_only(self.backend, || {
                    info!("Auxiliary data requested on relation {}", id);
                    Ok(*id)
                })
            }
            _ => Ok(None),
        }
    }

    /// Publish `record` to one relation, or to every companion when `relation_id` is `None`
    pub fn publish(
        &self,
        relation_id: Option<u32>,
        record: &AuxiliaryRecord,
    ) -> Result<(), CharmError> {
        leader_only(self.backend, || {
            let relation_ids: Vec<u32> = match relation_id {
                Some(id) => self
                    .backend
                    .get_relation(AUXILIARY_INTEGRATION_NAME, Some(id))?
                    .into_iter()
                    .collect(),
                None => self.backend.relation_ids(AUXILIARY_INTEGRATION_NAME)?,
            };

            let databag = encode(record)?;
            for id in relation_ids {
                debug!("Publishing auxiliary data on relation {}", id);
                self.backend.relation_set(id, Scope::LocalApp, &databag)?;
            }

            Ok(())
        })
        .map(|_| ())
    }
}
