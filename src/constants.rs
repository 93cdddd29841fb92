//! Names and workload-side locations shared across the charm

pub const DATABASE_INTEGRATION_NAME: &str = "pg-database";
pub const LDAP_INTEGRATION_NAME: &str = "ldap";
pub const PEER_INTEGRATION_NAME: &str = "glauth-peers";
pub const CERTIFICATES_INTEGRATION_NAME: &str = "certificates";
pub const CERTIFICATES_TRANSFER_INTEGRATION_NAME: &str = "send-ca-cert";
pub const AUXILIARY_INTEGRATION_NAME: &str = "glauth-auxiliary";

pub const WORKLOAD_CONTAINER: &str = "glauth";
pub const WORKLOAD_SERVICE: &str = "glauth";

pub const GLAUTH_CONFIG_FILE: &str = "/etc/config/glauth.cfg";
pub const GLAUTH_LDAP_PORT: u16 = 3893;
pub const GLAUTH_API_PORT: u16 = 5555;

pub const LOG_DIR: &str = "/var/log";
pub const LOG_FILE: &str = "/var/log/glauth.log";

pub const SERVER_KEY: &str = "/etc/ssl/private/glauth.key";
pub const SERVER_CERT: &str = "/etc/ssl/certs/glauth.crt";
pub const SERVER_CA_CERT: &str = "/usr/local/share/ca-certificates/glauth-ca.crt";
pub const CERTIFICATE_FILE: &str = "/etc/ssl/certs/ca-certificates.crt";

pub const DEFAULT_UID: u32 = 5001;
pub const DEFAULT_GID: u32 = 5501;
