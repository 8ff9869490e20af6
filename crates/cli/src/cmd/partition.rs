use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use wheelhouse_lib::execute::ProcessRunner;
use wheelhouse_lib::pipeline::Pipeline;

use crate::output::{OutputFormat, Status, bucket_line, count, emit_json, headline};

use super::{host_target, load_config};

#[derive(Serialize)]
struct BucketOutput<'a> {
  id: &'a str,
  path: &'a Path,
  lines: &'a [String],
  env: Vec<&'a str>,
}

pub fn cmd_partition(config: &Path, out: Option<&Path>, output: OutputFormat) -> Result<()> {
  let config = load_config(config)?;
  let target = host_target()?;
  let runner = ProcessRunner::default();
  let pipeline = Pipeline::new(&config, target, &runner);
  let dir = out.map(Path::to_path_buf).unwrap_or_else(|| pipeline.bucket_dir());

  let (partition, files) = pipeline
    .write_buckets(&dir)
    .context("Partition failed")?;

  if output.is_json() {
    let buckets: Vec<_> = files
      .iter()
      .filter_map(|file| {
        let bucket = partition.get(&file.id)?;
        Some(BucketOutput {
          id: &bucket.id,
          path: &file.path,
          lines: &bucket.lines,
          env: bucket.env.keys().map(String::as_str).collect(),
        })
      })
      .collect();
    emit_json(&buckets)?;
    return Ok(());
  }

  headline(
    Status::Done,
    format!("Wrote {} to {}", count(files.len(), "bucket file"), dir.display()),
  );
  for file in &files {
    bucket_line(&file.id, file.lines);
  }

  Ok(())
}
