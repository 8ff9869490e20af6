//! Test utilities for wheelhouse-lib.
//!
//! Provides a recording [`CommandRunner`] for asserting invocation order and
//! arguments, and helpers for writing fake interpreters as shell scripts.

use std::path::Path;
use std::sync::Mutex;

use crate::execute::{CommandRunner, ExecuteError, Invocation};
use crate::provision::{BuildEnvironment, PYVENV_CFG};

type FailPredicate = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// Records every invocation and succeeds unless the fail predicate matches.
#[derive(Default)]
pub struct RecordingRunner {
  calls: Mutex<Vec<Invocation>>,
  fail_when: Option<FailPredicate>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail (exit code 1) every invocation for which `predicate` returns true.
  pub fn failing_when(predicate: impl Fn(&Invocation) -> bool + Send + Sync + 'static) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      fail_when: Some(Box::new(predicate)),
    }
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }
}

impl CommandRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), ExecuteError> {
    self.calls.lock().unwrap().push(invocation.clone());
    match &self.fail_when {
      Some(predicate) if predicate(invocation) => Err(ExecuteError::CmdFailed {
        cmd: invocation.command_line(),
        code: Some(1),
      }),
      _ => Ok(()),
    }
  }
}

/// Whether the invocation's argument list contains `needle` as a full argument.
pub fn has_arg(invocation: &Invocation, needle: &str) -> bool {
  invocation.args.iter().any(|arg| arg == needle)
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Lay out an environment as `python -m venv` would: an interpreter file
/// and a `pyvenv.cfg` naming the environment's base interpreter.
pub fn fake_venv(environment: &BuildEnvironment) {
  touch(&environment.python());
  let home = environment.base_python.parent().unwrap_or(Path::new(""));
  let cfg = format!(
    "home = {}\nexecutable = {}\nversion = 3.12.4\n",
    home.display(),
    environment.base_python.display()
  );
  std::fs::write(environment.root.join(PYVENV_CFG), cfg).unwrap();
}

/// Write an empty file, creating parent directories.
pub fn touch(path: &Path) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, "").unwrap();
}
