//! Bind accounts handed out to `ldap` requirers
//!
//! Accounts are remembered in the application databag of the peer relation, one key per uid
//! number holding the account as JSON, so that every unit and every later hook sees the same
//! password for the same requirer. GLAuth itself learns about them through
//! [`crate::directory`].

use rand::RngCore;
use serde_derive::{Deserialize, Serialize};
use serde_json::{from_str, to_string};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::constants::{DEFAULT_GID, DEFAULT_UID, PEER_INTEGRATION_NAME};
use crate::databag::Databag;
use crate::error::CharmError;
use crate::leadership::leader_only;
use crate::model::{Backend, Scope};

/// A GLAuth user as stored in the peer databag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub group: String,
    pub password: String,
    #[serde(rename = "passsha256")]
    pub password_sha256: String,
    #[serde(rename = "uidnumber")]
    pub uid_number: u32,
    #[serde(rename = "gidnumber")]
    pub gid_number: u32,
}

/// Credentials a requirer binds with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAccount {
    pub cn: String,
    pub ou: String,
    pub password: String,
}

impl BindAccount {
    pub fn bind_dn(&self, base_dn: &str) -> String {
        format!("cn={},ou={},{}", self.cn, self.ou, base_dn)
    }
}

/// Hex SHA-256 of 32 random bytes
fn generate_password() -> String {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    hex::encode(Sha256::digest(&seed))
}

/// The digest GLAuth compares a bind password against
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl User {
    pub fn bind_account(&self) -> BindAccount {
        BindAccount {
            cn: self.name.clone(),
            ou: self.group.clone(),
            password: self.password.clone(),
        }
    }
}

pub struct UserStore<'a, B: Backend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> UserStore<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    fn peer_relation(&self) -> Result<Option<u32>, CharmError> {
        Ok(self
            .backend
            .relation_ids(PEER_INTEGRATION_NAME)?
            .first()
            .copied())
    }

    /// Return the user for `name`, creating it if it doesn't exist yet
    ///
    /// Users are keyed by name alone, since that is the only thing GLAuth keys them on. Only
    /// the leader can create users. `None` means this unit can't hand out an account, either
    /// because it isn't the leader or because the peer relation isn't up yet.
    pub fn ensure_user(&self, name: &str, group: &str) -> Result<Option<User>, CharmError> {
        let relation_id = match self.peer_relation()? {
            Some(id) => id,
            None => {
                warn!("Peer relation {} is not ready", PEER_INTEGRATION_NAME);
                return Ok(None);
            }
        };

        leader_only(self.backend, || {
            let databag = self.backend.relation_get(relation_id, Scope::LocalApp)?;

            if let Some(user) = parse_users(&databag).into_iter().find(|u| u.name == name) {
                if user.group != group {
                    warn!(
                        "User {} already exists in group {}, ignoring requested group {}",
                        user.name, user.group, group
                    );
                }
                return Ok(user);
            }

            let password = generate_password();
            let user = User {
                name: name.to_string(),
                group: group.to_string(),
                password_sha256: hash_password(&password),
                password,
                uid_number: next_uid_number(&databag),
                gid_number: DEFAULT_GID,
            };

            let mut update = Databag::new();
            update.insert(user.uid_number.to_string(), to_string(&user)?);
            self.backend
                .relation_set(relation_id, Scope::LocalApp, &update)?;

            info!("Created bind account {} in group {}", user.name, user.group);
            Ok(user)
        })
    }
}

fn parse_users(databag: &Databag) -> Vec<User> {
    databag
        .iter()
        .filter_map(|(key, raw)| match from_str::<User>(raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!("Skipping malformed user entry {}: {}", key, err);
                None
            }
        })
        .collect()
}

/// One past the highest uid in use, counting keys whose entry can't be parsed
fn next_uid_number(databag: &Databag) -> u32 {
    databag
        .keys()
        .filter_map(|key| key.parse::<u32>().ok())
        .max()
        .map(|uid| uid + 1)
        .unwrap_or(DEFAULT_UID)
        .max(DEFAULT_UID)
}
