//! End-to-end build sequencing.
//!
//! provision -> partition -> build command -> build every bucket -> lock -> inventory
//!
//! Each step runs only after the previous one succeeded. The first error
//! aborts the run; artifacts already in the output directory stay there.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::build::{
  ArtifactBuilder, BuildError, BuildHook, BuildReport, ENV_FILE_VAR, EnvFileError, EnvOverlay, PYTHON_VAR,
  VARIANT_VAR, WHEEL_DIR_VAR, host_baseline_env,
};
use crate::config::BuildConfig;
use crate::execute::{CommandRunner, ExecuteError};
use crate::lock::{LockError, LockFile, LockGenerator};
use crate::manifest::{ManifestError, RequirementManifest};
use crate::partition::{Partition, PartitionError, partition};
use crate::platform::Target;
use crate::provision::{BuildEnvironment, ProvisionError, Provisioner, env_bin_dir};
use crate::util::hash::{ContentHash, HashError, hash_wheel_dir};
use crate::wheel::{Inventory, WheelError};

/// Any failure of a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("provisioning failed: {0}")]
  Provision(#[from] ProvisionError),

  #[error("partitioning failed: {0}")]
  Manifest(#[from] ManifestError),

  #[error("partitioning failed: {0}")]
  Partition(#[from] PartitionError),

  #[error("build command failed: {0}")]
  BuildCommand(#[source] ExecuteError),

  #[error("invalid build environment overlay: {0}")]
  EnvFile(#[from] EnvFileError),

  #[error("build failed: {0}")]
  Build(#[from] BuildError),

  #[error("lock generation failed: {0}")]
  Lock(#[from] LockError),

  #[error("inventory failed: {0}")]
  Inventory(#[from] WheelError),

  #[error("failed to digest output directory: {0}")]
  Digest(#[from] HashError),

  #[error("no build environment at {}; run a full build first", root.display())]
  EnvironmentMissing { root: PathBuf },

  #[error("build environment at {} was not created from {}; run a full build first", root.display(), base.display())]
  EnvironmentStale { root: PathBuf, base: PathBuf },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
  /// Skip writing `frozen.txt` and `sizes.json`.
  pub skip_inventory: bool,
}

/// A bucket file as written for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFile {
  pub id: String,
  pub path: PathBuf,
  pub lines: usize,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
  pub target: Target,
  pub environment: BuildEnvironment,
  pub buckets: Vec<BucketFile>,
  pub build: BuildReport,
  pub lock_file: PathBuf,
  pub lock: LockFile,
  pub inventory: Option<Inventory>,
  /// Digest over the names and contents of every wheel in the output directory.
  pub wheels_digest: ContentHash,
}

/// Runs the build steps for one configuration on one target.
pub struct Pipeline<'a, R> {
  config: &'a BuildConfig,
  target: Target,
  runner: &'a R,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
  pub fn new(config: &'a BuildConfig, target: Target, runner: &'a R) -> Self {
    Self { config, target, runner }
  }

  fn env_root(&self) -> PathBuf {
    self.config.env_root(&self.target)
  }

  pub fn output_dir(&self) -> PathBuf {
    self.config.output_dir(&self.target)
  }

  pub fn bucket_dir(&self) -> PathBuf {
    self.config.bucket_dir(&self.target)
  }

  pub fn lock_file(&self) -> PathBuf {
    self.config.lock_file(&self.target)
  }

  fn baseline(&self) -> BTreeMap<String, String> {
    host_baseline_env(
      &self.config.passthrough_env,
      &self.config.baseline_env,
      &env_bin_dir(&self.env_root(), self.target.os),
    )
  }

  /// Partition the configured manifest for this target, without writing.
  pub fn partition(&self) -> Result<Partition, PipelineError> {
    let manifest = RequirementManifest::load(&self.config.requirements)?;
    let rules = self.config.rules(&self.target)?;
    let partition = partition(&manifest, &rules, &self.config.synthetic_requirement)?;
    debug!(
      lines = manifest.len(),
      overrides = ?rules.override_ids(),
      default = partition.default.lines.len(),
      "partitioned manifest"
    );
    Ok(partition)
  }

  /// Partition and write the bucket files into `dir`.
  pub fn write_buckets(&self, dir: &Path) -> Result<(Partition, Vec<BucketFile>), PipelineError> {
    let partition = self.partition()?;

    let files = partition
      .write(dir)?
      .into_iter()
      .map(|(id, path)| {
        let lines = partition.get(&id).map_or(0, |bucket| bucket.lines.len());
        BucketFile { id, path, lines }
      })
      .collect();
    Ok((partition, files))
  }

  pub async fn provision(&self) -> Result<BuildEnvironment, PipelineError> {
    let environment = Provisioner::new(self.runner, self.target, self.env_root(), self.output_dir())
      .with_env(self.baseline())
      .create(&self.config.base_python, &self.config.build_dependencies)
      .await?;
    Ok(environment)
  }

  /// The environment of a previous run, without provisioning.
  pub fn existing_environment(&self) -> Result<BuildEnvironment, PipelineError> {
    let environment = BuildEnvironment::new(
      self.env_root(),
      &self.config.base_python,
      self.output_dir(),
      self.target.os,
    );
    if !environment.python().is_file() {
      return Err(PipelineError::EnvironmentMissing {
        root: environment.root,
      });
    }
    if !environment.is_provisioned() {
      return Err(PipelineError::EnvironmentStale {
        root: environment.root,
        base: environment.base_python,
      });
    }
    Ok(environment)
  }

  /// Run the configured build command, if any.
  ///
  /// It sees the baseline plus the paths of the `.env` overlay, the
  /// environment's interpreter and the wheel directory.
  pub async fn run_build_command(&self, environment: &BuildEnvironment) -> Result<bool, PipelineError> {
    let Some(command) = self.config.build_command.as_deref() else {
      return Ok(false);
    };

    let mut env = self.baseline();
    env.insert(
      ENV_FILE_VAR.to_string(),
      self.config.env_file(&self.target).to_string_lossy().into_owned(),
    );
    env.insert(PYTHON_VAR.to_string(), environment.python().to_string_lossy().into_owned());
    env.insert(WHEEL_DIR_VAR.to_string(), environment.output_dir.to_string_lossy().into_owned());
    env.insert(VARIANT_VAR.to_string(), self.config.variant.clone());

    BuildHook::new(command, self.target.os)
      .run(self.runner, &env)
      .await
      .map_err(PipelineError::BuildCommand)?;
    Ok(true)
  }

  /// Baseline for bucket builds: the baseline with the `.env` overlay applied.
  pub fn build_env(&self) -> Result<BTreeMap<String, String>, PipelineError> {
    let overlay = EnvOverlay::load(&self.config.env_file(&self.target))?;
    Ok(overlay.apply(self.baseline()))
  }

  /// Lock the default bucket against the wheels already in the output directory.
  pub async fn lock(&self, environment: &BuildEnvironment, partition: &Partition) -> Result<LockFile, PipelineError> {
    let manifest = self.bucket_dir().join(partition.default.file_name());
    let lock = LockGenerator::new(self.runner, environment, self.baseline())
      .generate(&manifest, &self.lock_file())
      .await?;
    Ok(lock)
  }

  /// Regenerate the lock file for an already built output directory.
  pub async fn relock(&self) -> Result<(PathBuf, LockFile), PipelineError> {
    let environment = self.existing_environment()?;
    let (partition, _) = self.write_buckets(&self.bucket_dir())?;
    let lock = self.lock(&environment, &partition).await?;
    Ok((self.lock_file(), lock))
  }

  /// Write `frozen.txt` and `sizes.json` for the output directory.
  ///
  /// When a lock is given, the wheel it pins is reported for every project
  /// it names, even if other builds of that project remain in the directory.
  pub fn inventory(&self, lock: Option<&LockFile>) -> Result<Inventory, PipelineError> {
    let output_dir = self.output_dir();
    let pins = lock.map(LockFile::pins).unwrap_or_default();
    let inventory = Inventory::collect_pinned(&output_dir, &pins)?;
    inventory.write(&output_dir)?;
    info!(wheels = inventory.len(), dir = %output_dir.display(), "wrote inventory");
    Ok(inventory)
  }

  /// The lock file of a previous run, if there is one.
  pub fn existing_lock(&self) -> Result<Option<LockFile>, PipelineError> {
    let path = self.lock_file();
    if !path.is_file() {
      return Ok(None);
    }
    Ok(Some(LockFile::load(&path)?))
  }

  /// Run every step in order.
  pub async fn run(&self, options: PipelineOptions) -> Result<PipelineReport, PipelineError> {
    info!(target = %self.target, variant = %self.config.variant, "starting build");

    let environment = self.provision().await?;
    let bucket_dir = self.bucket_dir();
    let (partition, buckets) = self.write_buckets(&bucket_dir)?;

    self.run_build_command(&environment).await?;

    let build = ArtifactBuilder::new(
      self.runner,
      &environment,
      self.config.constraint_file.clone(),
      self.build_env()?,
    )
    .with_extra_args(self.config.extra_build_args.clone())
    .build_all(&partition, &bucket_dir)
    .await?;

    let lock = self.lock(&environment, &partition).await?;

    let inventory = if options.skip_inventory {
      None
    } else {
      Some(self.inventory(Some(&lock))?)
    };

    let wheels_digest = hash_wheel_dir(&environment.output_dir)?;
    info!(digest = %wheels_digest, "build complete");

    Ok(PipelineReport {
      target: self.target,
      environment,
      buckets,
      build,
      lock_file: self.lock_file(),
      lock,
      inventory,
      wheels_digest,
    })
  }
}
