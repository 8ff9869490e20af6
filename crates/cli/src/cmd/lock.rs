use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use wheelhouse_lib::execute::ProcessRunner;
use wheelhouse_lib::pipeline::Pipeline;

use crate::output::{OutputFormat, Status, count, emit_json, field, headline};

use super::{host_target, load_config};

pub fn cmd_lock(config: &Path, output: OutputFormat) -> Result<()> {
  let config = load_config(config)?;
  let target = host_target()?;
  let runner = ProcessRunner::new(!output.is_json());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let (path, lock) = rt
    .block_on(Pipeline::new(&config, target, &runner).relock())
    .context("Lock generation failed")?;

  if output.is_json() {
    emit_json(&json!({ "lock_file": path, "entries": lock.entries }))?;
  } else {
    headline(Status::Done, "Lock file verified against the wheel directory");
    field("Path", path.display());
    field("Pinned", count(lock.len(), "requirement"));
  }

  Ok(())
}
