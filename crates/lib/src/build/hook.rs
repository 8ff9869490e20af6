//! Pre-build shell command.
//!
//! Runs once after provisioning and before the first bucket, through the
//! platform shell. It may prepare native libraries or write the `.env`
//! overlay named by [`ENV_FILE_VAR`] for the bucket builds to pick up.

use std::collections::BTreeMap;

use tracing::info;

use crate::execute::{CommandRunner, ExecuteError, Invocation};
use crate::platform::Os;

/// Path of the `.env` overlay, as seen by the command.
pub const ENV_FILE_VAR: &str = "WHEELHOUSE_ENV_FILE";
/// The build environment's interpreter.
pub const PYTHON_VAR: &str = "WHEELHOUSE_PYTHON";
/// The shared wheel output directory.
pub const WHEEL_DIR_VAR: &str = "WHEELHOUSE_WHEEL_DIR";
/// The configured interpreter track, e.g. `py3`.
pub const VARIANT_VAR: &str = "WHEELHOUSE_VARIANT";

pub struct BuildHook<'a> {
  command: &'a str,
  os: Os,
}

impl<'a> BuildHook<'a> {
  pub fn new(command: &'a str, os: Os) -> Self {
    Self { command, os }
  }

  pub fn invocation(&self, env: &BTreeMap<String, String>) -> Invocation {
    let shell = match self.os {
      Os::Windows => Invocation::new("cmd").args(["/C", self.command]),
      Os::Linux | Os::MacOs => Invocation::new("/bin/sh").args(["-c", self.command]),
    };
    shell.envs(env)
  }

  pub async fn run<R: CommandRunner>(&self, runner: &R, env: &BTreeMap<String, String>) -> Result<(), ExecuteError> {
    info!(command = %self.command, "running build command");
    runner.run(&self.invocation(env)).await
  }
}
