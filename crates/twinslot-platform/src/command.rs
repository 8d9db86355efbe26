//! Bounded subprocess execution.
//!
//! Every external CLI twinslot drives (compose, proxy reload, database dump)
//! goes through [`run_command`]: argv only, no shell, captured output, and a
//! hard timeout after which the child is killed.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
}

/// Run `argv` with extra environment variables and return its stdout.
pub async fn run_command(
    argv: &[String],
    env: &[(String, String)],
    limit: Duration,
) -> Result<Vec<u8>, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    debug!(command = %argv.join(" "), "running command");

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
        Ok(Ok(output)) => Err(CommandError::Failed {
            program: program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Err(source)) => Err(CommandError::Spawn {
            program: program.clone(),
            source,
        }),
        Err(_) => Err(CommandError::Timeout {
            program: program.clone(),
            secs: limit.as_secs(),
        }),
    }
}
