//! Charm for the GLAuth LDAP server, and the `ldap` relation interface it provides
//!
//! The [`ldap`] module is usable on its own by charms on either side of the interface. The rest
//! of the crate is the GLAuth charm, driven hook by hook through [`charm::GlauthCharm`].

pub mod auxiliary;
pub mod certificates;
pub mod charm;
pub mod cmd;
pub mod conditions;
pub mod config;
pub mod constants;
pub mod databag;
pub mod database;
pub mod directory;
pub mod error;
pub mod glauth_config;
pub mod hook_tools;
pub mod ldap;
pub mod leadership;
pub mod model;
pub mod paths;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod users;
pub mod workload;
