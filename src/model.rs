//! The charm's view of the Juju model
//!
//! Everything the charm reads from or writes to Juju goes through [`Backend`], so that the same
//! handlers run against the real hook tools and against the in-memory harness used in tests.

use std::fmt;

use serde_json::Value;

use crate::databag::Databag;
use crate::error::CharmError;

/// Which side of a relation a databag belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// The application databag of the local application
    LocalApp,

    /// The unit databag of the local unit
    LocalUnit,

    /// The application databag of the related application
    RemoteApp,
}

/// Workload status as shown in `juju status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Active,
    Blocked(String),
    Maintenance(String),
    Waiting(String),
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Blocked(_) => "blocked",
            Status::Maintenance(_) => "maintenance",
            Status::Waiting(_) => "waiting",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Status::Active => "",
            Status::Blocked(msg) | Status::Maintenance(msg) | Status::Waiting(msg) => msg,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            "" => write!(f, "{}", self.name()),
            msg => write!(f, "{}: {}", self.name(), msg),
        }
    }
}

/// Lifecycle notification for a single relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationEvent {
    Created(u32),
    Joined(u32),
    Changed(u32),
    Broken(u32),
}

impl RelationEvent {
    pub fn relation_id(&self) -> u32 {
        match self {
            RelationEvent::Created(id)
            | RelationEvent::Joined(id)
            | RelationEvent::Changed(id)
            | RelationEvent::Broken(id) => *id,
        }
    }
}

/// Access to the hosting Juju model
pub trait Backend {
    /// Name of the local application
    fn app_name(&self) -> String;

    /// Name of the local unit, e.g. `glauth-k8s/0`
    fn unit_name(&self) -> String;

    /// Name of the model the charm is deployed in
    fn model_name(&self) -> String;

    /// True if the local unit is the elected leader of its application
    fn is_leader(&self) -> Result<bool, CharmError>;

    /// Ids of every relation established on `endpoint`
    fn relation_ids(&self, endpoint: &str) -> Result<Vec<u32>, CharmError>;

    /// Name of the application on the other side of a relation
    ///
    /// `None` once the relation is gone.
    fn remote_app(&self, relation_id: u32) -> Result<Option<String>, CharmError>;

    /// Read one side's databag
    fn relation_get(&self, relation_id: u32, scope: Scope) -> Result<Databag, CharmError>;

    /// Update the local application or unit databag
    ///
    /// All keys are written in one call. A key set to the empty string is removed.
    fn relation_set(
        &self,
        relation_id: u32,
        scope: Scope,
        data: &Databag,
    ) -> Result<(), CharmError>;

    /// Current charm configuration, as returned by `config-get`
    fn config(&self) -> Result<Value, CharmError>;

    fn status_set(&self, status: &Status) -> Result<(), CharmError>;

    /// Look up a relation by endpoint, either by id or the only one established
    fn get_relation(
        &self,
        endpoint: &str,
        relation_id: Option<u32>,
    ) -> Result<Option<u32>, CharmError> {
        let ids = self.relation_ids(endpoint)?;

        Ok(match relation_id {
            Some(id) => ids.into_iter().find(|&i| i == id),
            None if ids.len() == 1 => ids.first().copied(),
            None => None,
        })
    }
}
