//! Implementation of the `wheelhouse build` command.
//!
//! Runs the whole pipeline: provision the environment, write the bucket
//! files, build each bucket, generate the lock file, and write the inventory.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use wheelhouse_lib::execute::ProcessRunner;
use wheelhouse_lib::pipeline::{Pipeline, PipelineOptions, PipelineReport};

use crate::output::{OutputFormat, Status, bucket_line, count, elapsed, emit_json, field, headline, short_digest};

use super::{host_target, load_config};

#[derive(Serialize)]
struct BucketOutput<'a> {
  id: &'a str,
  path: &'a Path,
  lines: usize,
}

#[derive(Serialize)]
struct BuildOutput<'a> {
  target: String,
  environment: &'a Path,
  wheel_dir: &'a Path,
  buckets: Vec<BucketOutput<'a>>,
  built: &'a [String],
  skipped: &'a [String],
  lock_file: &'a Path,
  locked: usize,
  wheels: Option<usize>,
  wheels_digest: &'a str,
}

impl<'a> From<&'a PipelineReport> for BuildOutput<'a> {
  fn from(report: &'a PipelineReport) -> Self {
    Self {
      target: report.target.triple(),
      environment: &report.environment.root,
      wheel_dir: &report.environment.output_dir,
      buckets: report
        .buckets
        .iter()
        .map(|b| BucketOutput {
          id: &b.id,
          path: &b.path,
          lines: b.lines,
        })
        .collect(),
      built: &report.build.built,
      skipped: &report.build.skipped,
      lock_file: &report.lock_file,
      locked: report.lock.len(),
      wheels: report.inventory.as_ref().map(|inventory| inventory.len()),
      wheels_digest: &report.wheels_digest.0,
    }
  }
}

pub fn cmd_build(config: &Path, skip_inventory: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let config = load_config(config)?;
  let target = host_target()?;

  // Child output would corrupt the JSON document on stdout.
  let runner = ProcessRunner::new(!output.is_json());
  let pipeline = Pipeline::new(&config, target, &runner);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(pipeline.run(PipelineOptions { skip_inventory }))
    .context("Build failed")?;

  if output.is_json() {
    emit_json(&BuildOutput::from(&report))?;
    return Ok(());
  }

  println!();
  headline(Status::Done, format!("Built {} for {}", config.variant, report.target));
  field("Environment", report.environment.root.display());
  field("Wheel dir", report.environment.output_dir.display());
  if let Some(command) = &config.build_command {
    field("Build command", command);
  }
  for bucket in &report.buckets {
    if report.build.built.contains(&bucket.id) {
      bucket_line(&bucket.id, bucket.lines);
    }
  }
  for skipped in &report.build.skipped {
    headline(Status::Skipped, format!("Skipped empty bucket {}", skipped));
  }
  field("Lock file", report.lock_file.display());
  field("Locked", count(report.lock.len(), "requirement"));
  if let Some(inventory) = &report.inventory {
    field("Wheels", inventory.len());
  }
  field("Digest", short_digest(&report.wheels_digest.0));
  field("Elapsed", elapsed(start.elapsed()));

  Ok(())
}
