use std::env;
use std::io::stderr;

use clap::{clap_app, crate_authors, crate_description, crate_version};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use glauth::charm::{GlauthCharm, HookEvent};
use glauth::config::{CharmConfig, ConfigSchema};
use glauth::constants::WORKLOAD_CONTAINER;
use glauth::directory::PostgresDirectory;
use glauth::error::CharmError;
use glauth::hook_tools::{relation_id_from_env, HookTools};
use glauth::paths;
use glauth::workload::PebbleContainer;

/// Log to stderr, which Juju forwards to debug-log
///
/// `$RUST_LOG` wins over the charm's `log_level` option.
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(stderr)
        .try_init();
}

fn main() -> Result<(), String> {
    let matches = clap_app!(glauth_k8s =>
        (version: crate_version!())
        (author: crate_authors!())
        (about: crate_description!())
        (@arg HOOK: --hook +takes_value "Hook to run instead of $JUJU_DISPATCH_PATH")
    )
    .get_matches();

    let backend = HookTools::from_env()?;
    let schema = ConfigSchema::load(paths::charm_dir()).ok();
    let config = CharmConfig::load(&backend, schema.as_ref());

    init_logging(
        config
            .as_ref()
            .map(|c| c.log_level.as_str())
            .unwrap_or("info"),
    );

    let config = config.map_err(|err| {
        error!("{}", err);
        err
    })?;

    let hook = match matches.value_of("HOOK") {
        Some(hook) => hook.to_string(),
        None => env::var("JUJU_DISPATCH_PATH")
            .map_err(|_| "Neither --hook nor $JUJU_DISPATCH_PATH is set".to_string())?,
    };

    let event = match HookEvent::parse(&hook, relation_id_from_env()?) {
        Ok(event) => event,
        Err(CharmError::UnknownHook(name)) => {
            info!("Nothing to do for {}", name);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let workload = PebbleContainer::new(WORKLOAD_CONTAINER);
    let charm = GlauthCharm::new(&backend, &workload, &PostgresDirectory, config);

    charm.handle(&event).map_err(|err| {
        error!("Handling {} failed: {}", event, err);
        err.into()
    })
}
