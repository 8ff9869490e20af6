mod build;
mod info;
mod inventory;
mod lock;
mod partition;

use std::path::Path;

use anyhow::{Context, Result};

use wheelhouse_lib::config::BuildConfig;
use wheelhouse_lib::platform::Target;

pub use build::cmd_build;
pub use info::cmd_info;
pub use inventory::cmd_inventory;
pub use lock::cmd_lock;
pub use partition::cmd_partition;

fn load_config(path: &Path) -> Result<BuildConfig> {
  BuildConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn host_target() -> Result<Target> {
  Target::current().context("Unsupported host platform")
}
