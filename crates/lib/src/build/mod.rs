//! Artifact building: one `pip wheel` run per bucket into a shared directory.
//!
//! Buckets are built strictly in sequence, override buckets first and the
//! default bucket last, so artifacts produced by earlier buckets are
//! visible to later ones through `--find-links`. The first failing bucket
//! aborts the run.

mod dotenv;
mod env;
mod hook;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::execute::{CommandRunner, ExecuteError, Invocation};
use crate::partition::{Bucket, Partition};
use crate::provision::BuildEnvironment;

pub use dotenv::{EnvFileError, EnvOverlay};
pub use env::{baseline_env, host_baseline_env};
pub use hook::{BuildHook, ENV_FILE_VAR, PYTHON_VAR, VARIANT_VAR, WHEEL_DIR_VAR};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("bucket {bucket:?} failed to build (exit code {code:?})")]
  BucketFailed {
    bucket: String,
    code: Option<i32>,
    #[source]
    source: ExecuteError,
  },

  #[error("bucket file for {bucket:?} not found: {}", path.display())]
  MissingBucketFile { bucket: String, path: PathBuf },
}

impl BuildError {
  /// Id of the bucket that failed.
  pub fn bucket(&self) -> &str {
    match self {
      BuildError::BucketFailed { bucket, .. } | BuildError::MissingBucketFile { bucket, .. } => bucket,
    }
  }
}

/// Outcome of a successful [`ArtifactBuilder::build_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
  /// Buckets built, in order.
  pub built: Vec<String>,
  /// Empty override buckets that were skipped.
  pub skipped: Vec<String>,
}

/// Builds bucket files into wheels with the environment's interpreter.
pub struct ArtifactBuilder<'a, R> {
  runner: &'a R,
  python: PathBuf,
  output_dir: PathBuf,
  constraint: Option<PathBuf>,
  baseline: BTreeMap<String, String>,
  extra_args: Vec<String>,
}

impl<'a, R: CommandRunner> ArtifactBuilder<'a, R> {
  /// `constraint` is fixed for the builder's lifetime; when set, every
  /// invocation carries exactly one `-c <constraint>`.
  pub fn new(
    runner: &'a R,
    environment: &BuildEnvironment,
    constraint: Option<PathBuf>,
    baseline: BTreeMap<String, String>,
  ) -> Self {
    Self {
      runner,
      python: environment.python(),
      output_dir: environment.output_dir.clone(),
      constraint,
      baseline,
      extra_args: Vec::new(),
    }
  }

  /// Arguments inserted before `-r` on every invocation.
  pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
    self.extra_args = args;
    self
  }

  pub fn constraint(&self) -> Option<&Path> {
    self.constraint.as_deref()
  }

  /// The invocation that builds `bucket` from `bucket_file`.
  pub fn wheel_invocation(&self, bucket: &Bucket, bucket_file: &Path) -> Invocation {
    let mut invocation = Invocation::new(&self.python)
      .args(["-m", "pip", "wheel", "--no-build-isolation", "--wheel-dir"])
      .path_arg(&self.output_dir)
      .arg("--find-links")
      .path_arg(&self.output_dir);

    if let Some(constraint) = &self.constraint {
      invocation = invocation.arg("-c").path_arg(constraint);
    }

    invocation
      .args(self.extra_args.iter().cloned())
      .arg("-r")
      .path_arg(bucket_file)
      .envs(&self.baseline)
      .envs(&bucket.env)
  }

  /// Build one bucket. Fails with [`BuildError::BucketFailed`] naming it.
  pub async fn build_bucket(&self, bucket: &Bucket, bucket_file: &Path) -> Result<(), BuildError> {
    if !bucket_file.is_file() {
      return Err(BuildError::MissingBucketFile {
        bucket: bucket.id.clone(),
        path: bucket_file.to_path_buf(),
      });
    }

    let invocation = self.wheel_invocation(bucket, bucket_file);
    info!(bucket = %bucket.id, requirements = bucket.lines.len(), "building bucket");
    debug!(cmd = %invocation.command_line(), "pip wheel");

    self
      .runner
      .run(&invocation)
      .await
      .map_err(|source| BuildError::BucketFailed {
        bucket: bucket.id.clone(),
        code: source.exit_code(),
        source,
      })
  }

  /// Build every bucket of `partition` from the files written to `bucket_dir`.
  ///
  /// Empty override buckets are skipped. The default bucket always builds
  /// and always builds last.
  pub async fn build_all(&self, partition: &Partition, bucket_dir: &Path) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::default();

    for bucket in &partition.overrides {
      if bucket.is_empty() {
        debug!(bucket = %bucket.id, "skipping empty bucket");
        report.skipped.push(bucket.id.clone());
        continue;
      }
      self.build_bucket(bucket, &bucket_dir.join(bucket.file_name())).await?;
      report.built.push(bucket.id.clone());
    }

    let default = &partition.default;
    self.build_bucket(default, &bucket_dir.join(default.file_name())).await?;
    report.built.push(default.id.clone());

    info!(built = report.built.len(), skipped = report.skipped.len(), "all buckets built");
    Ok(report)
  }
}
