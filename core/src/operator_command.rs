use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use log::debug;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("command killed after {0:?}")]
    TimedOut(Duration),

    #[error("command exited with {status}: {stderr}")]
    Failed {
        status: ExitStatus,
        stderr: String,
    },
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Runs a configured operator command through the platform shell. The child
/// is killed when it outlives `timeout`.
pub async fn run_operator_command(command: &str, timeout: Duration) -> Result<(), CommandError> {
    let child = shell_command(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => return Err(CommandError::TimedOut(timeout)),
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("Command output: {}", stdout.trim());
    }
    if output.status.success() {
        Ok(())
    } else {
        Err(CommandError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
