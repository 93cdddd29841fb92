//! Access to the workload container through Pebble

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};
use serde_yaml::to_vec;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cmd::get_output_with_env;
use crate::error::CharmError;
use crate::paths::pebble_socket;

/// Location of the Pebble client inside the charm container
const PEBBLE_BIN: &str = "/charm/bin/pebble";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Override {
    Merge,
    Replace,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Startup {
    Enabled,
    Disabled,
}

/// A service definition within a Pebble layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Service {
    #[serde(rename = "override")]
    pub override_: Override,
    pub summary: String,
    pub startup: Startup,
    pub command: String,
}

/// A Pebble configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Layer {
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

/// Operations the charm performs on its workload container
pub trait Workload {
    /// True if Pebble in the container is reachable
    fn can_connect(&self) -> bool;

    /// Write a file, creating parent directories as needed
    fn push(&self, path: &str, content: &str) -> Result<(), CharmError>;

    fn exists(&self, path: &str) -> Result<bool, CharmError>;

    /// Create a directory and any missing parents
    fn make_dir(&self, path: &str) -> Result<(), CharmError>;

    fn remove(&self, path: &str) -> Result<(), CharmError>;

    /// Combine `layer` into the plan under `label`
    fn add_layer(&self, label: &str, layer: &Layer) -> Result<(), CharmError>;

    fn restart(&self, service: &str) -> Result<(), CharmError>;
}

/// A workload container driven through the Pebble CLI
#[derive(Debug, Clone)]
pub struct PebbleContainer {
    name: String,
    socket: PathBuf,
}

impl PebbleContainer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            socket: pebble_socket(name),
        }
    }

    fn pebble(&self, args: &[&str]) -> Result<Vec<u8>, CharmError> {
        let socket = self.socket.to_string_lossy();
        get_output_with_env(PEBBLE_BIN, args, &[("PEBBLE_SOCKET", &*socket)])
    }

    fn temp_file(&self, content: &[u8]) -> Result<NamedTempFile, CharmError> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content)?;
        file.flush()?;
        Ok(file)
    }
}

impl Workload for PebbleContainer {
    fn can_connect(&self) -> bool {
        match self.pebble(&["services"]) {
            Ok(_) => true,
            Err(err) => {
                debug!("Cannot connect to container {}: {}", self.name, err);
                false
            }
        }
    }

    fn push(&self, path: &str, content: &str) -> Result<(), CharmError> {
        let file = self.temp_file(content.as_bytes())?;
        let source = file.path().to_string_lossy();
        self.pebble(&["push", "--parents", &*source, path])?;
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, CharmError> {
        match self.pebble(&["ls", "-d", path]) {
            Ok(_) => Ok(true),
            Err(CharmError::SubcommandError(_, stderr)) if stderr.contains("not found") => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn make_dir(&self, path: &str) -> Result<(), CharmError> {
        self.pebble(&["mkdir", "-p", path])?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), CharmError> {
        self.pebble(&["rm", path])?;
        Ok(())
    }

    fn add_layer(&self, label: &str, layer: &Layer) -> Result<(), CharmError> {
        let file = self.temp_file(&to_vec(layer)?)?;
        let source = file.path().to_string_lossy();
        self.pebble(&["add", "--combine", label, &*source])?;
        Ok(())
    }

    fn restart(&self, service: &str) -> Result<(), CharmError> {
        self.pebble(&["restart", service])?;
        Ok(())
    }
}
