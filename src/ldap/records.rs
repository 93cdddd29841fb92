use serde_derive::{Deserialize, Serialize};

use crate::databag::string_bool;

/// Connection details published by the LDAP server for one requirer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderRecord {
    /// Endpoint including scheme and port, e.g. `ldap://glauth.example.com:3893`
    pub url: String,

    /// Root of the directory tree to search under
    pub base_dn: String,

    /// Distinguished name the requirer binds as
    pub bind_dn: String,

    /// Reference to the bind password, resolved by the requirer out of band
    pub bind_password_secret: String,

    /// Bind method, currently always `simple`
    pub auth_method: String,

    /// Whether the requirer must upgrade the connection with StartTLS
    #[serde(with = "string_bool", default)]
    pub starttls: bool,
}

/// The part of [`ProviderRecord`] that doesn't depend on the requirer's bind account
///
/// Re-published to every requirer whenever the server's own configuration changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderBaseRecord {
    pub url: String,
    pub base_dn: String,
    #[serde(with = "string_bool", default)]
    pub starttls: bool,
}

impl From<&ProviderRecord> for ProviderBaseRecord {
    fn from(record: &ProviderRecord) -> Self {
        Self {
            url: record.url.clone(),
            base_dn: record.base_dn.clone(),
            starttls: record.starttls,
        }
    }
}

/// Identity a requirer asks the LDAP server to create a bind account for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirerRecord {
    pub user: String,
    pub group: String,
}
