//! Presents functions related to locating charm and workload files

use std::env;
use std::path::PathBuf;

/// Get a dir from an env var, falling back to a fixed location
fn dir_from_env(env_var: &str, fallback: &str) -> PathBuf {
    env::var(env_var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(fallback))
}

/// The unpacked charm, containing `config.yaml` and `metadata.yaml`
pub fn charm_dir() -> PathBuf {
    dir_from_env("JUJU_CHARM_DIR", ".")
}

/// Where the charm keeps files between hook invocations
pub fn charm_state_dir() -> PathBuf {
    dir_from_env("CHARM_STATE_DIR", "/var/lib/juju/glauth-k8s")
}

/// Pebble socket for the named workload container
pub fn pebble_socket(container: &str) -> PathBuf {
    dir_from_env("CHARM_CONTAINERS_DIR", "/charm/containers")
        .join(container)
        .join("pebble.socket")
}

/// Root of the system certificate store on the charm container
fn certs_root() -> PathBuf {
    dir_from_env("CHARM_CERTS_DIR", "/usr/local/share/ca-certificates")
}

pub fn server_ca_cert() -> PathBuf {
    certs_root().join("glauth-ca.crt")
}

pub fn server_cert() -> PathBuf {
    charm_state_dir().join("glauth.crt")
}

pub fn server_key() -> PathBuf {
    charm_state_dir().join("glauth.key")
}

/// Bundle produced by `update-ca-certificates`
pub fn certificate_bundle() -> PathBuf {
    dir_from_env("CHARM_CERT_BUNDLE", "/etc/ssl/certs/ca-certificates.crt")
}
