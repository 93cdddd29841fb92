//! [`Backend`] implemented with the hook tools Juju places on `$PATH` during a hook

use std::env;

use serde_json::{from_slice, Value};
use tracing::debug;

use crate::cmd::{get_output, run};
use crate::databag::Databag;
use crate::error::CharmError;
use crate::model::{Backend, Scope, Status};

/// Parses a relation id such as `ldap:3`
pub fn parse_relation_id(raw: &str) -> Result<u32, CharmError> {
    raw.rsplit(':').next().unwrap_or(raw).parse().map_err(|_| {
        CharmError::SubcommandError("relation-ids".into(), format!("bad relation id `{}`", raw))
    })
}

/// The model as seen from inside a running hook
#[derive(Debug, Clone)]
pub struct HookTools {
    unit: String,
    model: String,
}

/// The relation the current hook fires for, if it is a relation hook
pub fn relation_id_from_env() -> Result<Option<u32>, CharmError> {
    match env::var("JUJU_RELATION_ID") {
        Ok(raw) if !raw.is_empty() => parse_relation_id(&raw).map(Some),
        _ => Ok(None),
    }
}

impl HookTools {
    /// Reads the unit and model names from the hook environment
    pub fn from_env() -> Result<Self, CharmError> {
        let var = |name: &str| {
            env::var(name).map_err(|_| CharmError::ConfigError(format!("${} is not set", name)))
        };

        Ok(Self {
            unit: var("JUJU_UNIT_NAME")?,
            model: var("JUJU_MODEL_NAME")?,
        })
    }
}

impl Backend for HookTools {
    fn app_name(&self) -> String {
        self.unit.split('/').next().unwrap_or(&self.unit).to_string()
    }

    fn unit_name(&self) -> String {
        self.unit.clone()
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    fn is_leader(&self) -> Result<bool, CharmError> {
        Ok(from_slice(&get_output("is-leader", &["--format=json"])?)?)
    }

    fn relation_ids(&self, endpoint: &str) -> Result<Vec<u32>, CharmError> {
        let raw: Option<Vec<String>> =
            from_slice(&get_output("relation-ids", &[endpoint, "--format=json"])?)?;

        raw.unwrap_or_default()
            .iter()
            .map(|id| parse_relation_id(id))
            .collect()
    }

    fn remote_app(&self, relation_id: u32) -> Result<Option<String>, CharmError> {
        let id = relation_id.to_string();

        match get_output("relation-list", &["-r", id.as_str(), "--app", "--format=json"]) {
            Ok(output) => Ok(from_slice(&output)?),
            Err(CharmError::SubcommandError(cmd, err)) => {
                debug!("Relation {} has no remote app ({}: {})", id, cmd, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn relation_get(&self, relation_id: u32, scope: Scope) -> Result<Databag, CharmError> {
        let id = relation_id.to_string();
        let (owner, app) = match scope {
            Scope::LocalApp => (self.app_name(), true),
            Scope::LocalUnit => (self.unit_name(), false),
            Scope::RemoteApp => match self.remote_app(relation_id)? {
                Some(remote) => (remote, true),
                None => return Err(CharmError::RelationNotFound("remote".into(), relation_id)),
            },
        };

        let mut args = vec!["-r", id.as_str(), "--format=json"];
        if app {
            args.push("--app");
        }
        args.extend_from_slice(&["-", owner.as_str()]);

        let data: Option<Databag> = from_slice(&get_output("relation-get", &args)?)?;
        Ok(data.unwrap_or_default())
    }

    fn relation_set(
        &self,
        relation_id: u32,
        scope: Scope,
        data: &Databag,
    ) -> Result<(), CharmError> {
        let mut args = vec!["-r".to_string(), relation_id.to_string()];

        match scope {
            Scope::LocalApp => args.push("--app".into()),
            Scope::LocalUnit => {}
            Scope::RemoteApp => {
                return Err(CharmError::SubcommandError(
                    "relation-set".into(),
                    "cannot write the remote application databag".into(),
                ))
            }
        }

        args.extend(data.iter().map(|(k, v)| format!("{}={}", k, v)));
        run("relation-set", &args)
    }

    fn config(&self) -> Result<Value, CharmError> {
        Ok(from_slice(&get_output("config-get", &["--format=json"])?)?)
    }

    fn status_set(&self, status: &Status) -> Result<(), CharmError> {
        run("status-set", &[status.name(), status.message()])
    }
}
