use std::collections::BTreeMap;

use super::records::RequirerRecord;

/// Domain events raised by the `ldap` interface handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdapEvent {
    /// A requirer wants a bind account
    ///
    /// `data` is `None` if the requirer hasn't written a usable identity yet.
    Requested {
        relation_id: u32,
        app: Option<String>,
        data: Option<RequirerRecord>,
    },

    /// The provider has published connection details
    ///
    /// May fire more than once per relation, e.g. when credentials rotate. Each firing means
    /// "call `consume` again".
    Ready { relation_id: u32 },

    /// The relation was torn down
    Unavailable { relation_id: u32 },
}

impl LdapEvent {
    pub fn relation_id(&self) -> u32 {
        match self {
            LdapEvent::Requested { relation_id, .. }
            | LdapEvent::Ready { relation_id }
            | LdapEvent::Unavailable { relation_id } => *relation_id,
        }
    }
}

/// Where a single relation is in its life, from the requirer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationState {
    AwaitingData,
    Ready,
    Gone,
}

/// Per-relation state for the requirer
///
/// Relations not seen before are treated as awaiting data, since a fresh hook process has no
/// memory of earlier hooks.
#[derive(Debug, Clone, Default)]
pub struct IntegrationStates {
    states: BTreeMap<u32, IntegrationState>,
}

impl IntegrationStates {
    pub fn get(&self, relation_id: u32) -> IntegrationState {
        self.states
            .get(&relation_id)
            .copied()
            .unwrap_or(IntegrationState::AwaitingData)
    }

    pub fn created(&mut self, relation_id: u32) {
        self.states
            .insert(relation_id, IntegrationState::AwaitingData);
    }

    /// Record a change notification, returning whether `Ready` should fire
    pub fn changed(&mut self, relation_id: u32, has_data: bool) -> bool {
        match (self.get(relation_id), has_data) {
            (IntegrationState::Gone, _) | (_, false) => false,
            (_, true) => {
                self.states.insert(relation_id, IntegrationState::Ready);
                true
            }
        }
    }

    /// Record teardown, returning whether `Unavailable` should fire
    pub fn broken(&mut self, relation_id: u32) -> bool {
        match self.get(relation_id) {
            IntegrationState::Gone => false,
            _ => {
                self.states.insert(relation_id, IntegrationState::Gone);
                true
            }
        }
    }
}
