//! Process-backed command runner.
//!
//! Children run with an explicit environment: the parent's variables are
//! cleared and only the invocation's map is applied, so a build sees exactly
//! the baseline and override variables it was configured with.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::{CommandRunner, ExecuteError, Invocation};

/// Spawns invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
  /// Forward child stdout/stderr to the terminal instead of capturing them.
  pub stream_output: bool,
}

impl ProcessRunner {
  pub fn new(stream_output: bool) -> Self {
    Self { stream_output }
  }
}

impl CommandRunner for ProcessRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), ExecuteError> {
    let cmd = invocation.command_line();
    info!(cmd = %cmd, "executing command");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).env_clear().envs(&invocation.env);

    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    debug!(program = %invocation.program.display(), cwd = ?invocation.cwd, "spawning process");

    let spawn_err = |source| ExecuteError::Spawn {
      program: invocation.program.display().to_string(),
      source,
    };

    let status = if self.stream_output {
      command
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(spawn_err)?
    } else {
      let output = command.stdin(Stdio::null()).output().await.map_err(spawn_err)?;

      if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !stderr.is_empty() {
          debug!(stderr = %stderr, "command stderr");
        }
        if !stdout.is_empty() {
          debug!(stdout = %stdout, "command stdout");
        }
      }

      output.status
    };

    if !status.success() {
      return Err(ExecuteError::CmdFailed {
        cmd,
        code: status.code(),
      });
    }

    Ok(())
  }
}
