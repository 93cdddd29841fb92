//! Preconditions that hold a hook back
//!
//! A hook that can't make progress yet reports why through the unit status and returns. The
//! next hook, at the latest `update-status`, evaluates the conditions again.

use tracing::debug;

use crate::charm::GlauthCharm;
use crate::constants::{SERVER_CERT, SERVER_KEY};
use crate::directory::Directory;
use crate::error::CharmError;
use crate::model::{Backend, Status};
use crate::workload::Workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    ContainerNotConnected,
    IntegrationNotExists(&'static str),
    DatabaseNotReady,
    TlsCertificatesNotReady,
}

impl Condition {
    /// Why the condition holds, or `None` if it doesn't
    pub fn evaluate<B, W, D>(
        &self,
        charm: &GlauthCharm<B, W, D>,
    ) -> Result<Option<String>, CharmError>
    where
        B: Backend + ?Sized,
        W: Workload + ?Sized,
        D: Directory + ?Sized,
    {
        let holds = match self {
            Condition::ContainerNotConnected => !charm.workload().can_connect(),
            Condition::IntegrationNotExists(name) => {
                charm.backend().relation_ids(name)?.is_empty()
            }
            Condition::DatabaseNotReady => !charm.database().is_resource_created()?,
            Condition::TlsCertificatesNotReady => {
                let workload = charm.workload();

                charm.config().starttls_enabled
                    && !(workload.exists(SERVER_KEY)? && workload.exists(SERVER_CERT)?)
            }
        };

        Ok(if holds { Some(self.reason()) } else { None })
    }

    fn reason(&self) -> String {
        match self {
            Condition::ContainerNotConnected => "Container is not connected yet".into(),
            Condition::IntegrationNotExists(name) => format!("Missing integration {}", name),
            Condition::DatabaseNotReady => "Waiting for database creation".into(),
            Condition::TlsCertificatesNotReady => "Missing TLS certificate and private key".into(),
        }
    }
}

fn first_reason<B, W, D>(
    charm: &GlauthCharm<B, W, D>,
    conditions: &[Condition],
) -> Result<Option<String>, CharmError>
where
    B: Backend + ?Sized,
    W: Workload + ?Sized,
    D: Directory + ?Sized,
{
    for condition in conditions {
        if let Some(reason) = condition.evaluate(charm)? {
            debug!("{:?} holds: {}", condition, reason);
            return Ok(Some(reason));
        }
    }

    Ok(None)
}

/// Set a Blocked status for the first condition that holds
///
/// Returns true if the unit was blocked and the hook should stop.
pub fn block_when<B, W, D>(
    charm: &GlauthCharm<B, W, D>,
    conditions: &[Condition],
) -> Result<bool, CharmError>
where
    B: Backend + ?Sized,
    W: Workload + ?Sized,
    D: Directory + ?Sized,
{
    match first_reason(charm, conditions)? {
        Some(reason) => {
            charm.backend().status_set(&Status::Blocked(reason))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Like [`block_when`], with a Waiting status
pub fn wait_when<B, W, D>(
    charm: &GlauthCharm<B, W, D>,
    conditions: &[Condition],
) -> Result<bool, CharmError>
where
    B: Backend + ?Sized,
    W: Workload + ?Sized,
    D: Directory + ?Sized,
{
    match first_reason(charm, conditions)? {
        Some(reason) => {
            charm.backend().status_set(&Status::Waiting(reason))?;
            Ok(true)
        }
        None => Ok(false),
    }
}
