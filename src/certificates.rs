//! TLS material for StartTLS
//!
//! Issuing certificates is the job of whatever charm sits on the other side of the
//! `certificates` relation. This module only picks the issued certificate up, places it where
//! GLAuth and the system trust store expect it, and hands the CA on to charms related over
//! `send-ca-cert`.

use std::path::PathBuf;
use std::time::Duration;

use ex::fs::{create_dir_all, read_to_string, write};
use serde_derive::Deserialize;
use serde_json::{from_str, to_string};
use tracing::{debug, error, info, warn};

use crate::cmd::{retry, run};
use crate::constants::{
    CERTIFICATES_INTEGRATION_NAME, CERTIFICATES_TRANSFER_INTEGRATION_NAME, CERTIFICATE_FILE,
    SERVER_CA_CERT, SERVER_CERT, SERVER_KEY,
};
use crate::databag::Databag;
use crate::error::CharmError;
use crate::model::{Backend, Scope};
use crate::paths;
use crate::workload::Workload;

/// One issued certificate as published by the certificates provider
#[derive(Debug, Clone, Deserialize)]
struct IssuedCertificate {
    certificate: String,
    ca: String,
    #[serde(default)]
    chain: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateData {
    pub ca_cert: Option<String>,
    pub ca_chain: Option<String>,
    pub cert: Option<String>,
    pub private_key: Option<String>,
}

impl CertificateData {
    /// True when every piece needed to serve StartTLS is present
    pub fn is_ready(&self) -> bool {
        self.ca_cert.is_some()
            && self.ca_chain.is_some()
            && self.cert.is_some()
            && self.private_key.is_some()
    }
}

/// Split a PEM bundle into its individual certificates
fn split_pem(bundle: &str) -> Vec<String> {
    const END: &str = "-----END CERTIFICATE-----";

    bundle
        .split_inclusive(END)
        .map(str::trim)
        .filter(|block| block.ends_with(END))
        .map(String::from)
        .collect()
}

/// Local files the certificates are staged in before they're pushed to the workload
#[derive(Debug, Clone)]
pub struct CertificatePaths {
    pub ca_cert: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub bundle: PathBuf,
}

impl Default for CertificatePaths {
    fn default() -> Self {
        Self {
            ca_cert: paths::server_ca_cert(),
            server_cert: paths::server_cert(),
            server_key: paths::server_key(),
            bundle: paths::certificate_bundle(),
        }
    }
}

pub struct CertificatesIntegration<'a, B: Backend + ?Sized, W: Workload + ?Sized> {
    backend: &'a B,
    workload: &'a W,
    paths: CertificatePaths,
    refresh: Vec<String>,
}

impl<'a, B: Backend + ?Sized, W: Workload + ?Sized> CertificatesIntegration<'a, B, W> {
    pub fn new(backend: &'a B, workload: &'a W) -> Self {
        Self {
            backend,
            workload,
            paths: CertificatePaths::default(),
            refresh: vec!["update-ca-certificates".into(), "--fresh".into()],
        }
    }

    /// Stage files under `paths` and rebuild the trust store with `refresh` instead
    pub fn with_paths(mut self, paths: CertificatePaths, refresh: &[&str]) -> Self {
        self.paths = paths;
        self.refresh = refresh.iter().map(|s| s.to_string()).collect();
        self
    }

    fn is_enabled(&self) -> Result<bool, CharmError> {
        Ok(!self
            .backend
            .relation_ids(CERTIFICATES_INTEGRATION_NAME)?
            .is_empty())
    }

    /// The certificate issued for this charm, if any
    ///
    /// The private key never leaves the charm, so it is read from the staging area rather than
    /// from the relation.
    pub fn cert_data(&self) -> Result<CertificateData, CharmError> {
        let mut data = CertificateData {
            private_key: read_to_string(&self.paths.server_key).ok(),
            ..Default::default()
        };

        let relation_id = match self
            .backend
            .relation_ids(CERTIFICATES_INTEGRATION_NAME)?
            .first()
        {
            Some(id) => *id,
            None => return Ok(data),
        };

        let databag = self.backend.relation_get(relation_id, Scope::RemoteApp)?;
        let issued: Vec<IssuedCertificate> = match databag.get("certificates") {
            Some(raw) => from_str(raw).unwrap_or_else(|err| {
                warn!("Ignoring malformed certificates data: {}", err);
                vec![]
            }),
            None => vec![],
        };

        if let Some(issued) = issued.into_iter().next() {
            data.ca_chain = if issued.chain.is_empty() {
                Some(issued.ca.clone())
            } else {
                Some(issued.chain.join("\n"))
            };
            data.ca_cert = Some(issued.ca);
            data.cert = Some(issued.certificate);
        }

        Ok(data)
    }

    /// Put the current certificates in place, or take them away if there are none
    pub fn update_certificates(&self, data: &CertificateData) -> Result<(), CharmError> {
        if !self.is_enabled()? {
            debug!("The certificates integration is not ready.");
            self.remove_certificates();
            return Ok(());
        }

        if !data.is_ready() {
            debug!("The certificates data is not ready.");
            self.remove_certificates();
            return Ok(());
        }

        self.prepare_certificates(data)?;
        self.push_certificates(data)
    }

    fn prepare_certificates(&self, data: &CertificateData) -> Result<(), CharmError> {
        for path in &[&self.paths.ca_cert, &self.paths.server_cert] {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
        }

        write(&self.paths.ca_cert, data.ca_cert.as_deref().unwrap_or_default())?;
        write(&self.paths.server_cert, data.cert.as_deref().unwrap_or_default())?;

        let (cmd, args) = match self.refresh.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };

        retry(3, Duration::from_secs(3), || run(cmd, args)).map_err(|err| {
            error!("{}", err);
            CharmError::CertificatesError("Update the TLS certificates failed.".into())
        })
    }

    fn push_certificates(&self, data: &CertificateData) -> Result<(), CharmError> {
        let bundle = read_to_string(&self.paths.bundle)?;
        let field = |f: &Option<String>| f.clone().unwrap_or_default();

        self.workload.push(CERTIFICATE_FILE, &bundle)?;
        self.workload.push(SERVER_CA_CERT, &field(&data.ca_cert))?;
        self.workload.push(SERVER_KEY, &field(&data.private_key))?;
        self.workload.push(SERVER_CERT, &field(&data.cert))?;

        info!("Pushed TLS certificates to the workload");
        Ok(())
    }

    fn remove_certificates(&self) {
        for file in &[CERTIFICATE_FILE, SERVER_CA_CERT, SERVER_KEY, SERVER_CERT] {
            if let Err(err) = self.workload.remove(file) {
                debug!("Not removing {}: {}", file, err);
            }
        }
    }
}

/// Shares the CA with charms related over `send-ca-cert`
pub struct CertificatesTransfer<'a, B: Backend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> CertificatesTransfer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Publish the CA to one relation, or to all of them if no id is given
    ///
    /// Incomplete data removes whatever was published before.
    pub fn transfer_certificates(
        &self,
        data: &CertificateData,
        relation_id: Option<u32>,
    ) -> Result<(), CharmError> {
        let relations: Vec<u32> = self
            .backend
            .relation_ids(CERTIFICATES_TRANSFER_INTEGRATION_NAME)?
            .into_iter()
            .filter(|id| relation_id.map(|wanted| wanted == *id).unwrap_or(true))
            .collect();

        let update: Databag = match (&data.ca_cert, &data.ca_chain, &data.cert) {
            (Some(ca), Some(chain), Some(cert)) => vec![
                ("certificate".to_string(), cert.clone()),
                ("ca".to_string(), ca.clone()),
                ("chain".to_string(), to_string(&split_pem(chain))?),
            ],
            _ => vec![
                ("certificate".to_string(), String::new()),
                ("ca".to_string(), String::new()),
                ("chain".to_string(), String::new()),
            ],
        }
        .into_iter()
        .collect();

        for id in relations {
            self.backend.relation_set(id, Scope::LocalUnit, &update)?;
        }

        Ok(())
    }
}
