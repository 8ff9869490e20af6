//! Isolated build environment provisioning.
//!
//! Creates a virtual environment from a base interpreter at a deterministic
//! root and installs the bootstrap build dependencies into it. Every later
//! step runs the environment's own interpreter, never the system one.
//!
//! Provisioning is all-or-nothing from the caller's point of view: any failure
//! is fatal and nothing is retried or rolled back.

mod pyvenv;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use pyvenv::{PYVENV_CFG, PyvenvCfg};

use crate::execute::{CommandRunner, ExecuteError, Invocation};
use crate::platform::{Os, Target};

/// Errors that can occur while provisioning the build environment.
#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("base interpreter not found: {}", path.display())]
  BaseInterpreterMissing { path: PathBuf },

  #[error("build dependencies file not found: {}", path.display())]
  BuildDependenciesMissing { path: PathBuf },

  #[error("failed to create environment at {}: {source}", root.display())]
  CreateFailed {
    root: PathBuf,
    #[source]
    source: ExecuteError,
  },

  #[error("failed to install build dependencies: {source}")]
  BootstrapFailed {
    #[source]
    source: ExecuteError,
  },

  #[error("failed to remove stale environment {}: {source}", root.display())]
  RemoveStale {
    root: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// An isolated interpreter plus its package-install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
  pub root: PathBuf,
  pub base_python: PathBuf,
  pub output_dir: PathBuf,
  os: Os,
}

impl BuildEnvironment {
  pub fn new(root: impl Into<PathBuf>, base_python: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, os: Os) -> Self {
    Self {
      root: root.into(),
      base_python: base_python.into(),
      output_dir: output_dir.into(),
      os,
    }
  }

  /// Directory holding the environment's executables.
  pub fn bin_dir(&self) -> PathBuf {
    env_bin_dir(&self.root, self.os)
  }

  /// The environment's own interpreter.
  pub fn python(&self) -> PathBuf {
    match self.os {
      Os::Windows => self.bin_dir().join("python.exe"),
      Os::Linux | Os::MacOs => self.bin_dir().join("python"),
    }
  }

  /// Whether an interpreter exists at the root and its `pyvenv.cfg` records
  /// `base_python` as the interpreter it was created from.
  pub fn is_provisioned(&self) -> bool {
    self.python().is_file() && PyvenvCfg::load(&self.root).is_some_and(|cfg| cfg.created_from(&self.base_python))
  }
}

/// Executable directory of a virtual environment rooted at `root`.
pub fn env_bin_dir(root: &Path, os: Os) -> PathBuf {
  match os {
    Os::Windows => root.join("Scripts"),
    Os::Linux | Os::MacOs => root.join("bin"),
  }
}

/// Creates [`BuildEnvironment`]s through a [`CommandRunner`].
pub struct Provisioner<'a, R> {
  runner: &'a R,
  target: Target,
  root: PathBuf,
  output_dir: PathBuf,
  env: BTreeMap<String, String>,
}

impl<'a, R: CommandRunner> Provisioner<'a, R> {
  pub fn new(runner: &'a R, target: Target, root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      runner,
      target,
      root: root.into(),
      output_dir: output_dir.into(),
      env: BTreeMap::new(),
    }
  }

  /// Environment variables for the venv and bootstrap invocations.
  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env = env;
    self
  }

  /// Create the environment and install `build_dependencies` into it.
  ///
  /// An environment at the root created from the same base interpreter is
  /// reused. One created from a different interpreter is removed and
  /// recreated. The bootstrap install always runs.
  pub async fn create(&self, base_python: &Path, build_dependencies: &Path) -> Result<BuildEnvironment, ProvisionError> {
    if !base_python.is_file() {
      return Err(ProvisionError::BaseInterpreterMissing {
        path: base_python.to_path_buf(),
      });
    }
    if !build_dependencies.is_file() {
      return Err(ProvisionError::BuildDependenciesMissing {
        path: build_dependencies.to_path_buf(),
      });
    }

    let environment = BuildEnvironment::new(&self.root, base_python, &self.output_dir, self.target.os);

    if environment.is_provisioned() {
      info!(root = %self.root.display(), "reusing existing build environment");
    } else {
      if environment.python().is_file() {
        let previous = PyvenvCfg::load(&self.root).unwrap_or_default();
        warn!(
          root = %self.root.display(),
          previous = %previous.describe(),
          base = %base_python.display(),
          "environment was created from another interpreter, recreating"
        );
        std::fs::remove_dir_all(&self.root).map_err(|source| ProvisionError::RemoveStale {
          root: self.root.clone(),
          source,
        })?;
      }

      info!(root = %self.root.display(), base = %base_python.display(), "creating build environment");
      let venv = Invocation::new(base_python)
        .args(["-m", "venv"])
        .path_arg(&self.root)
        .envs(&self.env);
      self
        .runner
        .run(&venv)
        .await
        .map_err(|source| ProvisionError::CreateFailed {
          root: self.root.clone(),
          source,
        })?;
    }

    info!(file = %build_dependencies.display(), "installing build dependencies");
    let bootstrap = Invocation::new(environment.python())
      .args(["-m", "pip", "install", "-r"])
      .path_arg(build_dependencies)
      .envs(&self.env);
    self
      .runner
      .run(&bootstrap)
      .await
      .map_err(|source| ProvisionError::BootstrapFailed { source })?;

    std::fs::create_dir_all(&environment.output_dir).map_err(|source| ProvisionError::CreateDir {
      path: environment.output_dir.clone(),
      source,
    })?;

    Ok(environment)
  }
}
