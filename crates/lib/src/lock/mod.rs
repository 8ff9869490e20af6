//! Lock file generation and verification.
//!
//! After every bucket has built, the environment's `piptools compile` resolves
//! the default bucket against the output directory only (`--no-index`) and
//! records a hash for every pin. The result is parsed and checked against the
//! wheels on disk before it replaces the lock file, so a failed run never
//! leaves a partial or unverified lock behind.

mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::execute::{CommandRunner, ExecuteError, Invocation};
use crate::provision::BuildEnvironment;
use crate::util::hash::HashError;
use crate::wheel::WheelError;

pub use file::{LockEntry, LockFile};

/// Errors that can occur while generating or verifying the lock file.
#[derive(Debug, Error)]
pub enum LockError {
  #[error("lock file generation failed (exit code {:?}): {source}", source.exit_code())]
  GenerateFailed {
    #[source]
    source: ExecuteError,
  },

  #[error("requirements for lock generation not found: {}", path.display())]
  MissingManifest { path: PathBuf },

  #[error("failed to read lock file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write lock file {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("lock line {line_number} is not pinned with ==: {line}")]
  NotPinned { line_number: usize, line: String },

  #[error("{name}=={version} has no sha256 hash")]
  MissingHash { name: String, version: String },

  #[error("{name}=={version} has no wheel in the output directory")]
  MissingArtifact { name: String, version: String },

  #[error("{name}=={version} hashes do not match the wheel in the output directory")]
  HashMismatch { name: String, version: String },

  #[error(transparent)]
  Wheel(#[from] WheelError),

  #[error(transparent)]
  Hash(#[from] HashError),
}

/// Runs the lock generator with the environment's interpreter.
pub struct LockGenerator<'a, R> {
  runner: &'a R,
  python: PathBuf,
  output_dir: PathBuf,
  env: BTreeMap<String, String>,
}

impl<'a, R: CommandRunner> LockGenerator<'a, R> {
  pub fn new(runner: &'a R, environment: &BuildEnvironment, env: BTreeMap<String, String>) -> Self {
    Self {
      runner,
      python: environment.python(),
      output_dir: environment.output_dir.clone(),
      env,
    }
  }

  /// The invocation that compiles `manifest` into `output`.
  pub fn lock_invocation(&self, manifest: &Path, output: &Path) -> Invocation {
    Invocation::new(&self.python)
      .args([
        "-m",
        "piptools",
        "compile",
        "--quiet",
        "--no-header",
        "--no-index",
        "--generate-hashes",
        "--allow-unsafe",
        "--find-links",
      ])
      .path_arg(&self.output_dir)
      .arg("--output-file")
      .path_arg(output)
      .path_arg(manifest)
      .envs(&self.env)
  }

  /// Generate, verify and install the lock file at `lock_path`.
  ///
  /// The generator writes to a fresh temporary file beside `lock_path`, so an
  /// existing lock never seeds the resolution and the output depends only on
  /// the manifest and the output directory.
  pub async fn generate(&self, manifest: &Path, lock_path: &Path) -> Result<LockFile, LockError> {
    if !manifest.is_file() {
      return Err(LockError::MissingManifest {
        path: manifest.to_path_buf(),
      });
    }

    let parent = lock_path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or(Path::new("."));
    let write_err = |source| LockError::Write {
      path: lock_path.to_path_buf(),
      source,
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let staging = tempfile::Builder::new()
      .prefix(".lock-")
      .suffix(".txt")
      .tempfile_in(parent)
      .map_err(write_err)?
      .into_temp_path();

    let invocation = self.lock_invocation(manifest, &staging);
    info!(manifest = %manifest.display(), "generating lock file");
    debug!(cmd = %invocation.command_line(), "piptools compile");
    self
      .runner
      .run(&invocation)
      .await
      .map_err(|source| LockError::GenerateFailed { source })?;

    let lock = LockFile::load(&staging)?;
    lock.verify(&self.output_dir)?;

    staging.persist(lock_path).map_err(|e| write_err(e.error))?;
    info!(path = %lock_path.display(), entries = lock.len(), "lock file written");
    Ok(lock)
  }
}
