//! Types for subprocess execution.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The program could not be started at all.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// Command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },
}

impl ExecuteError {
  /// Exit code of a failed command, if the process ran and reported one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ExecuteError::CmdFailed { code, .. } => *code,
      ExecuteError::Spawn { .. } => None,
    }
  }
}

/// A fully described external command.
///
/// `env` is the complete environment of the child; runners do not inherit the
/// parent's variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: PathBuf,
  pub args: Vec<String>,
  pub env: BTreeMap<String, String>,
  pub cwd: Option<PathBuf>,
}

impl Invocation {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      env: BTreeMap::new(),
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.to_string_lossy())
  }

  pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
    for (key, value) in env {
      self.env.insert(key.clone(), value.clone());
    }
    self
  }

  pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  /// Number of times `flag` appears as a standalone argument.
  pub fn count_flag(&self, flag: &str) -> usize {
    self.args.iter().filter(|arg| *arg == flag).count()
  }

  /// Value following the first occurrence of `flag`.
  pub fn flag_value(&self, flag: &str) -> Option<&str> {
    let pos = self.args.iter().position(|arg| arg == flag)?;
    self.args.get(pos + 1).map(String::as_str)
  }

  /// Human-readable command line for logs and error messages.
  pub fn command_line(&self) -> String {
    let mut parts = Vec::with_capacity(self.args.len() + 1);
    parts.push(quote(&self.program.to_string_lossy()));
    parts.extend(self.args.iter().map(|arg| quote(arg)));
    parts.join(" ")
  }
}

fn quote(part: &str) -> String {
  if !part.is_empty()
    && part
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c))
  {
    part.to_string()
  } else {
    format!("'{}'", part.replace('\'', r"'\''"))
  }
}

/// Runs invocations to completion, one at a time.
///
/// Implementations must fail with [`ExecuteError::CmdFailed`] for any non-zero
/// exit; callers never inspect output.
pub trait CommandRunner {
  fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<(), ExecuteError>> + Send;
}
