//! Build configuration.
//!
//! A run is described by a JSON file (default `wheelhouse.json`). A few
//! settings can be overridden from the environment:
//!
//! - `WHEELHOUSE_WORK_DIR`: work directory
//! - `WHEELHOUSE_BASE_PYTHON`: base interpreter
//! - `WHEELHOUSE_CONSTRAINT`: constraint file
//! - `WHEELHOUSE_BUILD_COMMAND`: pre-build shell command
//!
//! Relative paths, from the file or the environment, resolve against the
//! file's directory. Per-run outputs default to `<work_dir>/<triple>-<variant>/`
//! so variants and targets sharing a work directory never overwrite each
//! other.
//!
//! ```json
//! {
//!   "variant": "py3",
//!   "base_python": "/usr/bin/python3",
//!   "build_dependencies": "build_dependencies.txt",
//!   "requirements": "requirements.in",
//!   "exclusions": [{ "match": { "name": "^pywin32$" }, "when": { "os": ["linux", "darwin"] } }],
//!   "overrides": [{ "id": "aerospike", "match": { "name": "^aerospike$" }, "env": { "EXT_CFLAGS": "-std=gnu99" } }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_BUCKET, LOCK_FILENAME, SYNTHETIC_REQUIREMENT};
use crate::partition::{ExclusionRule, OverrideRule, PartitionError, RuleSet, Substitution};
use crate::platform::{Target, paths};

pub const WORK_DIR_ENV: &str = "WHEELHOUSE_WORK_DIR";
pub const BASE_PYTHON_ENV: &str = "WHEELHOUSE_BASE_PYTHON";
pub const CONSTRAINT_ENV: &str = "WHEELHOUSE_CONSTRAINT";
pub const BUILD_COMMAND_ENV: &str = "WHEELHOUSE_BUILD_COMMAND";

const ENV_FILENAME: &str = ".env";

static BUCKET_ID: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("static regex is valid"));

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid override id {0:?}: ids name bucket files and must be [A-Za-z0-9_.-], not starting with a separator")]
  InvalidOverrideId(String),

  #[error("override id {0:?} is reserved")]
  ReservedOverrideId(String),

  #[error("duplicate override id {0:?}")]
  DuplicateOverrideId(String),
}

/// Variables copied from the host into every build environment, when set.
pub fn default_passthrough_env() -> Vec<String> {
  [
    "HOME",
    "PATH",
    "TMPDIR",
    "SYSTEMROOT",
    "PIP_CONFIG_FILE",
    "PIP_INDEX_URL",
    "PIP_EXTRA_INDEX_URL",
    "PIP_TRUSTED_HOST",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "CC",
    "CXX",
    "CFLAGS",
    "CXXFLAGS",
    "LDFLAGS",
    "CPPFLAGS",
    "PKG_CONFIG_PATH",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

fn default_variant() -> String {
  "py3".to_string()
}

fn default_synthetic() -> String {
  SYNTHETIC_REQUIREMENT.to_string()
}

/// The complete description of one build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
  /// Interpreter track, e.g. `py3`. Part of the environment root path.
  #[serde(default = "default_variant")]
  pub variant: String,
  /// Interpreter the isolated environment is created from.
  pub base_python: PathBuf,
  /// Bootstrap requirements installed into the environment before any build.
  pub build_dependencies: PathBuf,
  /// Requirement manifest to build.
  pub requirements: PathBuf,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub work_dir: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub env_root: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_dir: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lock_file: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub constraint_file: Option<PathBuf>,
  #[serde(default = "default_synthetic")]
  pub synthetic_requirement: String,
  #[serde(default)]
  pub exclusions: Vec<ExclusionRule>,
  #[serde(default)]
  pub substitutions: Vec<Substitution>,
  #[serde(default)]
  pub overrides: Vec<OverrideRule>,
  /// Variables set for every build, over the passthrough values.
  #[serde(default)]
  pub baseline_env: BTreeMap<String, String>,
  #[serde(default = "default_passthrough_env")]
  pub passthrough_env: Vec<String>,
  /// Extra arguments appended to every `pip wheel` invocation.
  #[serde(default)]
  pub extra_build_args: Vec<String>,
  /// Shell command run once before the first bucket builds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build_command: Option<String>,
  /// `.env` overlay applied over the baseline for bucket builds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub env_file: Option<PathBuf>,
}

impl BuildConfig {
  /// Minimal configuration with defaults for everything optional.
  pub fn new(
    base_python: impl Into<PathBuf>,
    build_dependencies: impl Into<PathBuf>,
    requirements: impl Into<PathBuf>,
  ) -> Self {
    Self {
      variant: default_variant(),
      base_python: base_python.into(),
      build_dependencies: build_dependencies.into(),
      requirements: requirements.into(),
      work_dir: None,
      env_root: None,
      output_dir: None,
      lock_file: None,
      constraint_file: None,
      synthetic_requirement: default_synthetic(),
      exclusions: Vec::new(),
      substitutions: Vec::new(),
      overrides: Vec::new(),
      baseline_env: BTreeMap::new(),
      passthrough_env: default_passthrough_env(),
      extra_build_args: Vec::new(),
      build_command: None,
      env_file: None,
    }
  }

  /// Load a configuration file, resolve its relative paths and apply
  /// environment overrides.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config: BuildConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let base = path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
    let base = dunce::canonicalize(&base).unwrap_or(base);
    config.apply_env_overrides();
    config.resolve_relative_to(&base);
    config.validate()?;

    debug!(path = %path.display(), variant = %config.variant, "loaded build config");
    Ok(config)
  }

  fn resolve_relative_to(&mut self, base: &Path) {
    let resolve = |p: &mut PathBuf| {
      if p.is_relative() {
        *p = base.join(&*p);
      }
    };

    resolve(&mut self.base_python);
    resolve(&mut self.build_dependencies);
    resolve(&mut self.requirements);
    for p in [
      &mut self.work_dir,
      &mut self.env_root,
      &mut self.output_dir,
      &mut self.lock_file,
      &mut self.constraint_file,
      &mut self.env_file,
    ]
    .into_iter()
    .flatten()
    {
      resolve(p);
    }
  }

  fn apply_env_overrides(&mut self) {
    if let Some(dir) = env_work_dir() {
      self.work_dir = Some(dir);
    }
    if let Some(python) = env_path(BASE_PYTHON_ENV) {
      self.base_python = python;
    }
    if let Some(constraint) = env_path(CONSTRAINT_ENV) {
      self.constraint_file = Some(constraint);
    }
    if let Ok(command) = std::env::var(BUILD_COMMAND_ENV) {
      self.build_command = Some(command).filter(|c| !c.trim().is_empty());
    }
  }

  /// Check override ids: they name bucket files and must be unique.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for rule in &self.overrides {
      if rule.id == DEFAULT_BUCKET {
        return Err(ConfigError::ReservedOverrideId(rule.id.clone()));
      }
      if !BUCKET_ID.is_match(&rule.id) {
        return Err(ConfigError::InvalidOverrideId(rule.id.clone()));
      }
      if !seen.insert(rule.id.as_str()) {
        return Err(ConfigError::DuplicateOverrideId(rule.id.clone()));
      }
    }
    Ok(())
  }

  /// Compile the rules active for `target`.
  pub fn rules(&self, target: &Target) -> Result<RuleSet, PartitionError> {
    RuleSet::compile(&self.exclusions, &self.substitutions, &self.overrides, target)
  }

  pub fn work_dir(&self) -> PathBuf {
    self.work_dir.clone().unwrap_or_else(paths::default_work_dir)
  }

  /// Environment root, unique per (target, variant) pair.
  pub fn env_root(&self, target: &Target) -> PathBuf {
    self
      .env_root
      .clone()
      .unwrap_or_else(|| self.work_dir().join("envs").join(self.run_name(target)))
  }

  fn run_name(&self, target: &Target) -> String {
    format!("{}-{}", target.triple(), self.variant)
  }

  /// Directory holding the default per-run outputs for `target`.
  pub fn run_dir(&self, target: &Target) -> PathBuf {
    self.work_dir().join(self.run_name(target))
  }

  pub fn output_dir(&self, target: &Target) -> PathBuf {
    self
      .output_dir
      .clone()
      .unwrap_or_else(|| self.run_dir(target).join("wheels"))
  }

  pub fn bucket_dir(&self, target: &Target) -> PathBuf {
    self.run_dir(target).join("buckets")
  }

  pub fn lock_file(&self, target: &Target) -> PathBuf {
    self
      .lock_file
      .clone()
      .unwrap_or_else(|| self.run_dir(target).join(LOCK_FILENAME))
  }

  pub fn env_file(&self, target: &Target) -> PathBuf {
    self
      .env_file
      .clone()
      .unwrap_or_else(|| self.run_dir(target).join(ENV_FILENAME))
  }
}

/// Work directory named by `WHEELHOUSE_WORK_DIR`, if set.
pub fn env_work_dir() -> Option<PathBuf> {
  env_path(WORK_DIR_ENV)
}

fn env_path(name: &str) -> Option<PathBuf> {
  std::env::var_os(name).filter(|value| !value.is_empty()).map(PathBuf::from)
}
