use std::ffi::OsStr;
use std::process::Command;
use std::time::Duration;

use backoff::backoff::Constant;
use backoff::retry_notify;
use tracing::{debug, warn};

use crate::error::CharmError;

fn describe<S: AsRef<OsStr>>(cmd: &str, args: &[S]) -> String {
    format!(
        "`{} {}`",
        cmd,
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    )
}

pub fn run<S: AsRef<OsStr>>(cmd: &str, args: &[S]) -> Result<(), CharmError> {
    get_output_with_env(cmd, args, &[]).map(|_| ())
}

pub fn get_output<S: AsRef<OsStr>>(cmd: &str, args: &[S]) -> Result<Vec<u8>, CharmError> {
    get_output_with_env(cmd, args, &[])
}

/// Runs `cmd` to completion with extra environment variables, returning stdout
///
/// A non-zero exit status is reported along with whatever the command wrote to stderr.
pub fn get_output_with_env<S: AsRef<OsStr>>(
    cmd: &str,
    args: &[S],
    env: &[(&str, &str)],
) -> Result<Vec<u8>, CharmError> {
    debug!("Running {}", describe(cmd, args));

    let output = Command::new(cmd)
        .args(args)
        .envs(env.iter().cloned())
        .output()
        .map_err(|err| CharmError::SubcommandError(cmd.to_string(), err.to_string()))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(CharmError::SubcommandError(
            describe(cmd, args),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Calls `f` up to `attempts` times, waiting `wait` between failed attempts
///
/// Only `SubcommandError`s are retried, anything else is returned immediately. The last error
/// is returned if every attempt fails.
pub fn retry<T, F>(attempts: u32, wait: Duration, mut f: F) -> Result<T, CharmError>
where
    F: FnMut() -> Result<T, CharmError>,
{
    let mut attempt = 0;
    let op = || {
        attempt += 1;
        f().map_err(|err| match err {
            CharmError::SubcommandError(..) if attempt < attempts => {
                backoff::Error::transient(err)
            }
            _ => backoff::Error::permanent(err),
        })
    };

    let notify = |err: CharmError, _: Duration| warn!("Attempt failed, retrying: {}", err);

    retry_notify(Constant::new(wait), op, notify).map_err(|err| match err {
        backoff::Error::Permanent(err) => err,
        backoff::Error::Transient { err, .. } => err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_gives_up_after_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = retry(3, Duration::from_millis(0), || {
            calls += 1;
            Err(CharmError::SubcommandError("false".into(), "".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_stops_on_success() {
        let mut calls = 0;
        let result = retry(3, Duration::from_millis(0), || {
            calls += 1;
            if calls < 2 {
                Err(CharmError::SubcommandError("flaky".into(), "".into()))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn test_retry_does_not_retry_other_errors() {
        let mut calls = 0;
        let result: Result<(), _> = retry(3, Duration::from_millis(0), || {
            calls += 1;
            Err(CharmError::ConfigError("bad".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
