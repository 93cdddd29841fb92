//! The GLAuth charm: hooks in, workload configuration and relation data out

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::auxiliary::{AuxiliaryProvider, AuxiliaryRecord};
use crate::certificates::{CertificatePaths, CertificatesIntegration, CertificatesTransfer};
use crate::conditions::{block_when, wait_when, Condition};
use crate::config::CharmConfig;
use crate::constants::{
    AUXILIARY_INTEGRATION_NAME, CERTIFICATES_INTEGRATION_NAME,
    CERTIFICATES_TRANSFER_INTEGRATION_NAME, DATABASE_INTEGRATION_NAME, GLAUTH_CONFIG_FILE,
    GLAUTH_LDAP_PORT, LDAP_INTEGRATION_NAME, LOG_DIR, WORKLOAD_CONTAINER, WORKLOAD_SERVICE,
};
use crate::database::DatabaseRequirer;
use crate::directory::Directory;
use crate::error::CharmError;
use crate::glauth_config::{pebble_layer, ConfigFile, StartTlsConfig};
use crate::ldap::{
    LdapEvent, LdapProvider, ProviderBaseRecord, ProviderRecord, RequirerRecord,
    AUTH_METHOD_SIMPLE,
};
use crate::leadership::leader_only;
use crate::model::{Backend, RelationEvent, Status};
use crate::users::{BindAccount, UserStore};
use crate::workload::Workload;

/// The hooks this charm reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Install,
    ConfigChanged,
    Remove,
    PebbleReady,
    UpdateStatus,
    Database(RelationEvent),
    Ldap(RelationEvent),
    Certificates(RelationEvent),
    CertificatesTransfer(RelationEvent),
    Auxiliary(RelationEvent),
}

impl HookEvent {
    /// Map a hook name such as `hooks/ldap-relation-changed` to an event
    ///
    /// Relation hooks need the id of the relation they fire for.
    pub fn parse(hook: &str, relation_id: Option<u32>) -> Result<Self, CharmError> {
        let name = hook.rsplit('/').next().unwrap_or(hook);
        let unknown = || CharmError::UnknownHook(name.to_string());

        match name {
            "install" => return Ok(HookEvent::Install),
            "config-changed" => return Ok(HookEvent::ConfigChanged),
            "remove" => return Ok(HookEvent::Remove),
            "update-status" => return Ok(HookEvent::UpdateStatus),
            _ => {}
        }

        if name == format!("{}-pebble-ready", WORKLOAD_CONTAINER) {
            return Ok(HookEvent::PebbleReady);
        }

        let (endpoint, kind) = name.rsplit_once("-relation-").ok_or_else(unknown)?;
        let id = relation_id.ok_or_else(unknown)?;
        let event = match kind {
            "created" => RelationEvent::Created(id),
            "joined" => RelationEvent::Joined(id),
            "changed" => RelationEvent::Changed(id),
            "broken" => RelationEvent::Broken(id),
            _ => return Err(unknown()),
        };

        match (endpoint, &event) {
            (DATABASE_INTEGRATION_NAME, RelationEvent::Joined(_)) => Err(unknown()),
            (DATABASE_INTEGRATION_NAME, _) => Ok(HookEvent::Database(event)),
            (LDAP_INTEGRATION_NAME, RelationEvent::Changed(_))
            | (LDAP_INTEGRATION_NAME, RelationEvent::Broken(_)) => Ok(HookEvent::Ldap(event)),
            (CERTIFICATES_INTEGRATION_NAME, RelationEvent::Changed(_)) => {
                Ok(HookEvent::Certificates(event))
            }
            (CERTIFICATES_TRANSFER_INTEGRATION_NAME, RelationEvent::Joined(_)) => {
                Ok(HookEvent::CertificatesTransfer(event))
            }
            (AUXILIARY_INTEGRATION_NAME, RelationEvent::Created(_))
            | (AUXILIARY_INTEGRATION_NAME, RelationEvent::Changed(_)) => {
                Ok(HookEvent::Auxiliary(event))
            }
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::Install => write!(f, "install"),
            HookEvent::ConfigChanged => write!(f, "config-changed"),
            HookEvent::Remove => write!(f, "remove"),
            HookEvent::PebbleReady => write!(f, "{}-pebble-ready", WORKLOAD_CONTAINER),
            HookEvent::UpdateStatus => write!(f, "update-status"),
            HookEvent::Database(event) => write!(f, "{} {:?}", DATABASE_INTEGRATION_NAME, event),
            HookEvent::Ldap(event) => write!(f, "{} {:?}", LDAP_INTEGRATION_NAME, event),
            HookEvent::Certificates(event) => {
                write!(f, "{} {:?}", CERTIFICATES_INTEGRATION_NAME, event)
            }
            HookEvent::CertificatesTransfer(event) => {
                write!(f, "{} {:?}", CERTIFICATES_TRANSFER_INTEGRATION_NAME, event)
            }
            HookEvent::Auxiliary(event) => write!(f, "{} {:?}", AUXILIARY_INTEGRATION_NAME, event),
        }
    }
}

pub struct GlauthCharm<'a, B, W, D>
where
    B: Backend + ?Sized,
    W: Workload + ?Sized,
    D: Directory + ?Sized,
{
    backend: &'a B,
    workload: &'a W,
    directory: &'a D,
    config: CharmConfig,
    cert_paths: CertificatePaths,
    refresh: Vec<String>,
}

impl<'a, B, W, D> GlauthCharm<'a, B, W, D>
where
    B: Backend + ?Sized,
    W: Workload + ?Sized,
    D: Directory + ?Sized,
{
    pub fn new(backend: &'a B, workload: &'a W, directory: &'a D, config: CharmConfig) -> Self {
        Self {
            backend,
            workload,
            directory,
            config,
            cert_paths: CertificatePaths::default(),
            refresh: vec!["update-ca-certificates".into(), "--fresh".into()],
        }
    }

    /// Stage certificates under `paths` and rebuild the trust store with `refresh`
    pub fn with_certificate_paths(mut self, paths: CertificatePaths, refresh: &[&str]) -> Self {
        self.cert_paths = paths;
        self.refresh = refresh.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    pub fn workload(&self) -> &W {
        self.workload
    }

    pub fn config(&self) -> &CharmConfig {
        &self.config
    }

    pub fn database(&self) -> DatabaseRequirer<'a, B> {
        DatabaseRequirer::new(self.backend)
    }

    pub fn certificates(&self) -> CertificatesIntegration<'a, B, W> {
        let refresh: Vec<&str> = self.refresh.iter().map(String::as_str).collect();
        CertificatesIntegration::new(self.backend, self.workload)
            .with_paths(self.cert_paths.clone(), &refresh)
    }

    fn ldap_provider(&self) -> LdapProvider<'a, B> {
        LdapProvider::new(self.backend)
    }

    fn ldap_url(&self) -> String {
        format!("ldap://{}:{}", self.config.hostname, GLAUTH_LDAP_PORT)
    }

    pub fn provider_base_record(&self) -> ProviderBaseRecord {
        ProviderBaseRecord {
            url: self.ldap_url(),
            base_dn: self.config.base_dn.clone(),
            starttls: self.config.starttls_enabled,
        }
    }

    pub fn provider_record(&self, account: &BindAccount) -> ProviderRecord {
        ProviderRecord {
            url: self.ldap_url(),
            base_dn: self.config.base_dn.clone(),
            bind_dn: account.bind_dn(&self.config.base_dn),
            bind_password_secret: account.password.clone(),
            auth_method: AUTH_METHOD_SIMPLE.into(),
            starttls: self.config.starttls_enabled,
        }
    }

    pub fn config_file(&self) -> Result<ConfigFile, CharmError> {
        Ok(ConfigFile {
            base_dn: Some(self.config.base_dn.clone()),
            database: Some(self.database().config()?),
            starttls: Some(StartTlsConfig::new(self.config.starttls_enabled)),
        })
    }

    pub fn handle(&self, event: &HookEvent) -> Result<(), CharmError> {
        debug!("Handling event: {}", event);

        match event {
            HookEvent::Install | HookEvent::UpdateStatus => self.update(),
            HookEvent::ConfigChanged => self.on_config_changed(),
            HookEvent::Remove => self.on_remove(),
            HookEvent::PebbleReady => self.on_pebble_ready(),
            HookEvent::Database(RelationEvent::Created(id)) => {
                self.database().on_relation_created(*id)
            }
            HookEvent::Database(RelationEvent::Changed(_)) => self.on_database_changed(),
            HookEvent::Database(_) => self.update(),
            HookEvent::Ldap(event) => match self.ldap_provider().handle(event)? {
                Some(LdapEvent::Requested {
                    relation_id,
                    app,
                    data,
                }) => self.on_ldap_requested(relation_id, app, data),
                _ => Ok(()),
            },
            HookEvent::Certificates(_) => self.on_cert_changed(),
            HookEvent::CertificatesTransfer(event) => {
                self.on_certificates_transfer_joined(event.relation_id())
            }
            HookEvent::Auxiliary(event) => {
                match AuxiliaryProvider::new(self.backend).handle(event)? {
                    Some(relation_id) => self.on_auxiliary_requested(relation_id),
                    None => Ok(()),
                }
            }
        }
    }

    /// Bring the workload in line with the current configuration and relations
    pub fn update(&self) -> Result<(), CharmError> {
        if block_when(
            self,
            &[
                Condition::IntegrationNotExists(DATABASE_INTEGRATION_NAME),
                Condition::IntegrationNotExists(CERTIFICATES_INTEGRATION_NAME),
            ],
        )? {
            return Ok(());
        }

        if wait_when(
            self,
            &[
                Condition::ContainerNotConnected,
                Condition::DatabaseNotReady,
                Condition::TlsCertificatesNotReady,
            ],
        )? {
            return Ok(());
        }

        self.backend
            .status_set(&Status::Maintenance("Configuring GLAuth container".into()))?;

        self.workload
            .push(GLAUTH_CONFIG_FILE, &self.config_file()?.render())?;
        self.workload.add_layer(WORKLOAD_CONTAINER, &pebble_layer())?;

        if let Err(err) = self.workload.restart(WORKLOAD_SERVICE) {
            error!("{}", err);
            return self.backend.status_set(&Status::Blocked(
                "Failed to restart the service, please check the logs".into(),
            ));
        }

        self.backend.status_set(&Status::Active)
    }

    /// Credentials for companion charms, `None` until the database is fully set up
    fn auxiliary_record(&self) -> Result<Option<AuxiliaryRecord>, CharmError> {
        Ok(AuxiliaryRecord::from_config(&self.database().config()?))
    }

    fn publish_auxiliary(&self, relation_id: Option<u32>) -> Result<(), CharmError> {
        match self.auxiliary_record()? {
            Some(record) => AuxiliaryProvider::new(self.backend).publish(relation_id, &record),
            None => {
                debug!("Database credentials are not complete, not publishing auxiliary data");
                Ok(())
            }
        }
    }

    fn on_database_changed(&self) -> Result<(), CharmError> {
        self.update()?;
        self.publish_auxiliary(None)
    }

    fn on_auxiliary_requested(&self, relation_id: u32) -> Result<(), CharmError> {
        if wait_when(self, &[Condition::DatabaseNotReady])? {
            return Ok(());
        }

        self.publish_auxiliary(Some(relation_id))
    }

    fn on_config_changed(&self) -> Result<(), CharmError> {
        self.update()?;
        self.ldap_provider().publish_all(&self.provider_base_record())
    }

    fn on_remove(&self) -> Result<(), CharmError> {
        leader_only(self.backend, || {
            if let Err(err) = self.workload.remove(GLAUTH_CONFIG_FILE) {
                debug!("Not removing {}: {}", GLAUTH_CONFIG_FILE, err);
            }
            Ok(())
        })
        .map(|_| ())
    }

    fn on_pebble_ready(&self) -> Result<(), CharmError> {
        if wait_when(self, &[Condition::ContainerNotConnected])? {
            return Ok(());
        }

        if !self.workload.exists(LOG_DIR)? {
            self.workload.make_dir(LOG_DIR)?;
            debug!("Created logging directory {}", LOG_DIR);
        }

        self.update()
    }

    fn on_ldap_requested(
        &self,
        relation_id: u32,
        app: Option<String>,
        data: Option<RequirerRecord>,
    ) -> Result<(), CharmError> {
        if wait_when(self, &[Condition::DatabaseNotReady])? {
            return Ok(());
        }

        let requirer = match data {
            Some(data) => data,
            None => {
                error!(
                    "The LDAP requirer {} does not provide necessary data.",
                    app.unwrap_or_default()
                );
                return Ok(());
            }
        };

        let user = match UserStore::new(self.backend).ensure_user(&requirer.user, &requirer.group)?
        {
            Some(user) => user,
            None => {
                warn!("No bind account for {} yet", requirer.user);
                return Ok(());
            }
        };

        self.directory
            .add_account(&self.database().config()?.dsn(), &user)?;

        info!("Publishing bind account {} on relation {}", user.name, relation_id);
        self.ldap_provider()
            .publish(relation_id, &self.provider_record(&user.bind_account()))
    }

    fn on_cert_changed(&self) -> Result<(), CharmError> {
        if wait_when(self, &[Condition::ContainerNotConnected])? {
            return Ok(());
        }

        let certificates = self.certificates();
        let data = certificates.cert_data()?;

        match certificates.update_certificates(&data) {
            Err(CharmError::CertificatesError(err)) => {
                error!("{}", err);
                return self.backend.status_set(&Status::Blocked(
                    "Failed to update the TLS certificates, please check the logs".into(),
                ));
            }
            other => other?,
        }

        self.update()?;
        CertificatesTransfer::new(self.backend).transfer_certificates(&data, None)
    }

    fn on_certificates_transfer_joined(&self, relation_id: u32) -> Result<(), CharmError> {
        let data = self.certificates().cert_data()?;

        if !data.is_ready() {
            info!(
                "Certificates are not ready, relation {} is served once they are",
                relation_id
            );
            return Ok(());
        }

        CertificatesTransfer::new(self.backend).transfer_certificates(&data, Some(relation_id))
    }
}
