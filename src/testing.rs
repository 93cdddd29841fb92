//! In-memory stand-ins for Juju, Pebble and the GLAuth database
//!
//! [`Harness`] implements [`Backend`] with relations held in memory, [`FakeContainer`]
//! implements [`Workload`] with a map of files and [`FakeDirectory`] records accounts.
//! They record what the charm did so tests can assert on it. The harness also enforces the
//! rules the real model does: only the leader writes application databags, and nobody
//! writes the remote side.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};

use crate::databag::Databag;
use crate::directory::Directory;
use crate::error::CharmError;
use crate::model::{Backend, Scope, Status};
use crate::users::User;
use crate::workload::{Layer, Workload};

#[derive(Debug, Clone, Default)]
struct FakeRelation {
    endpoint: String,
    remote_app: String,
    data: BTreeMap<Scope, Databag>,
}

/// An in-memory Juju model with a single local unit
#[derive(Debug)]
pub struct Harness {
    app: String,
    model: String,
    leader: Cell<bool>,
    next_id: Cell<u32>,
    relations: RefCell<BTreeMap<u32, FakeRelation>>,
    config: RefCell<Value>,
    statuses: RefCell<Vec<Status>>,
}

impl Harness {
    /// Create a harness for unit 0 of `app`, which starts out as the leader
    pub fn new(app: &str, model: &str) -> Self {
        Self {
            app: app.to_string(),
            model: model.to_string(),
            leader: Cell::new(true),
            next_id: Cell::new(1),
            relations: RefCell::new(BTreeMap::new()),
            config: RefCell::new(json!({})),
            statuses: RefCell::new(Vec::new()),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.leader.set(leader);
    }

    /// Establish a relation on `endpoint` with `remote_app`, returning its id
    pub fn add_relation(&self, endpoint: &str, remote_app: &str) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.relations.borrow_mut().insert(
            id,
            FakeRelation {
                endpoint: endpoint.to_string(),
                remote_app: remote_app.to_string(),
                data: BTreeMap::new(),
            },
        );

        id
    }

    pub fn remove_relation(&self, relation_id: u32) {
        self.relations.borrow_mut().remove(&relation_id);
    }

    /// Write into the remote application's databag, as the related charm would
    pub fn update_remote_data(&self, relation_id: u32, pairs: &[(&str, &str)]) {
        let mut relations = self.relations.borrow_mut();
        let relation = relations
            .get_mut(&relation_id)
            .unwrap_or_else(|| panic!("No relation with id {}", relation_id));

        apply(
            relation.data.entry(Scope::RemoteApp).or_default(),
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }

    /// Snapshot of one side's databag, empty if the relation doesn't exist
    pub fn relation_data(&self, relation_id: u32, scope: Scope) -> Databag {
        self.relations
            .borrow()
            .get(&relation_id)
            .and_then(|r| r.data.get(&scope).cloned())
            .unwrap_or_default()
    }

    pub fn update_config(&self, config: Value) {
        *self.config.borrow_mut() = config;
    }

    /// The most recently set status, if any
    pub fn status(&self) -> Option<Status> {
        self.statuses.borrow().last().cloned()
    }
}

/// Merge `update` into `databag`, dropping keys set to the empty string
fn apply(databag: &mut Databag, update: Databag) {
    for (key, value) in update {
        if value.is_empty() {
            databag.remove(&key);
        } else {
            databag.insert(key, value);
        }
    }
}

impl Backend for Harness {
    fn app_name(&self) -> String {
        self.app.clone()
    }

    fn unit_name(&self) -> String {
        format!("{}/0", self.app)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    fn is_leader(&self) -> Result<bool, CharmError> {
        Ok(self.leader.get())
    }

    fn relation_ids(&self, endpoint: &str) -> Result<Vec<u32>, CharmError> {
        Ok(self
            .relations
            .borrow()
            .iter()
            .filter(|(_, r)| r.endpoint == endpoint)
            .map(|(id, _)| *id)
            .collect())
    }

    fn remote_app(&self, relation_id: u32) -> Result<Option<String>, CharmError> {
        Ok(self
            .relations
            .borrow()
            .get(&relation_id)
            .map(|r| r.remote_app.clone()))
    }

    fn relation_get(&self, relation_id: u32, scope: Scope) -> Result<Databag, CharmError> {
        let relations = self.relations.borrow();
        let relation = relations
            .get(&relation_id)
            .ok_or_else(|| CharmError::RelationNotFound("harness".into(), relation_id))?;

        Ok(relation.data.get(&scope).cloned().unwrap_or_default())
    }

    fn relation_set(
        &self,
        relation_id: u32,
        scope: Scope,
        data: &Databag,
    ) -> Result<(), CharmError> {
        match scope {
            Scope::RemoteApp => {
                return Err(CharmError::SubcommandError(
                    "relation-set".into(),
                    "cannot write the remote application databag".into(),
                ))
            }
            Scope::LocalApp if !self.leader.get() => {
                return Err(CharmError::SubcommandError(
                    "relation-set".into(),
                    "cannot write application settings: not the leader".into(),
                ))
            }
            _ => {}
        }

        let mut relations = self.relations.borrow_mut();
        let relation = relations
            .get_mut(&relation_id)
            .ok_or_else(|| CharmError::RelationNotFound("harness".into(), relation_id))?;

        apply(relation.data.entry(scope).or_default(), data.clone());
        Ok(())
    }

    fn config(&self) -> Result<Value, CharmError> {
        Ok(self.config.borrow().clone())
    }

    fn status_set(&self, status: &Status) -> Result<(), CharmError> {
        self.statuses.borrow_mut().push(status.clone());
        Ok(())
    }
}

/// An in-memory workload container
#[derive(Debug, Default)]
pub struct FakeContainer {
    connected: Cell<bool>,
    files: RefCell<BTreeMap<String, String>>,
    dirs: RefCell<BTreeSet<String>>,
    layers: RefCell<Vec<(String, Layer)>>,
    restarts: RefCell<Vec<String>>,
    fail_restart: Cell<bool>,
}

impl FakeContainer {
    /// A reachable container with no files
    pub fn new() -> Self {
        let container = Self::default();
        container.connected.set(true);
        container
    }

    pub fn set_can_connect(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Make subsequent restarts fail, as a broken Pebble change would
    pub fn set_fail_restart(&self, fail: bool) {
        self.fail_restart.set(fail);
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.borrow().contains(path)
    }

    pub fn layers(&self) -> Vec<(String, Layer)> {
        self.layers.borrow().clone()
    }

    pub fn restarts(&self) -> Vec<String> {
        self.restarts.borrow().clone()
    }

    fn check_connected(&self) -> Result<(), CharmError> {
        if self.connected.get() {
            Ok(())
        } else {
            Err(CharmError::SubcommandError(
                "pebble".into(),
                "cannot connect to the container".into(),
            ))
        }
    }
}

impl Workload for FakeContainer {
    fn can_connect(&self) -> bool {
        self.connected.get()
    }

    fn push(&self, path: &str, content: &str) -> Result<(), CharmError> {
        self.check_connected()?;
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, CharmError> {
        self.check_connected()?;
        Ok(self.files.borrow().contains_key(path) || self.is_dir(path))
    }

    fn make_dir(&self, path: &str) -> Result<(), CharmError> {
        self.check_connected()?;
        self.dirs.borrow_mut().insert(path.to_string());
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), CharmError> {
        self.check_connected()?;
        match self.files.borrow_mut().remove(path) {
            Some(_) => Ok(()),
            None => Err(CharmError::SubcommandError(
                "pebble rm".into(),
                format!("{} not found", path),
            )),
        }
    }

    fn add_layer(&self, label: &str, layer: &Layer) -> Result<(), CharmError> {
        self.check_connected()?;
        self.layers
            .borrow_mut()
            .push((label.to_string(), layer.clone()));
        Ok(())
    }

    fn restart(&self, service: &str) -> Result<(), CharmError> {
        self.check_connected()?;
        if self.fail_restart.get() {
            return Err(CharmError::SubcommandError(
                "pebble restart".into(),
                format!("cannot start service {}", service),
            ));
        }
        self.restarts.borrow_mut().push(service.to_string());
        Ok(())
    }
}

/// A GLAuth database that keeps accounts in memory, keyed by user name
#[derive(Debug, Default)]
pub struct FakeDirectory {
    accounts: RefCell<BTreeMap<String, (String, User)>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored account for `name` and the DSN it was written through
    pub fn account(&self, name: &str) -> Option<(String, User)> {
        self.accounts.borrow().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.accounts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.borrow().is_empty()
    }
}

impl Directory for FakeDirectory {
    fn add_account(&self, dsn: &str, user: &User) -> Result<(), CharmError> {
        self.accounts
            .borrow_mut()
            .entry(user.name.clone())
            .or_insert_with(|| (dsn.to_string(), user.clone()));
        Ok(())
    }
}
