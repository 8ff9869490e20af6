use std::path::Path;

use anyhow::{Context, Result};

use wheelhouse_lib::consts::{FROZEN_FILENAME, SIZES_FILENAME};
use wheelhouse_lib::execute::ProcessRunner;
use wheelhouse_lib::pipeline::Pipeline;

use crate::output::{OutputFormat, Status, count, emit_json, field, headline, wheel_line};

use super::{host_target, load_config};

pub fn cmd_inventory(config: &Path, output: OutputFormat) -> Result<()> {
  let config = load_config(config)?;
  let target = host_target()?;
  let runner = ProcessRunner::default();
  let pipeline = Pipeline::new(&config, target, &runner);
  let dir = pipeline.output_dir();

  let lock = pipeline.existing_lock().context("Failed to read lock file")?;
  let inventory = pipeline.inventory(lock.as_ref()).context("Failed to write inventory")?;

  if output.is_json() {
    emit_json(&inventory)?;
    return Ok(());
  }

  if inventory.is_empty() {
    headline(Status::Warning, format!("No wheels in {}", dir.display()));
  }
  for (name, entry) in inventory.entries() {
    wheel_line(name, entry);
  }
  println!();
  headline(Status::Done, format!("Inventoried {}", count(inventory.len(), "wheel")));
  field("Frozen", dir.join(FROZEN_FILENAME).display());
  field("Sizes", dir.join(SIZES_FILENAME).display());

  Ok(())
}
