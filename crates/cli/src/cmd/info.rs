use anyhow::Result;
use serde_json::json;

use wheelhouse_lib::config::env_work_dir;
use wheelhouse_lib::platform::{paths, platform_triple};

use crate::output::{OutputFormat, emit_json, field};

use super::host_target;

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let target = host_target()?;
  let work_dir = env_work_dir().unwrap_or_else(paths::default_work_dir);

  if output.is_json() {
    return emit_json(&json!({
      "triple": platform_triple(),
      "os": target.os.as_str(),
      "arch": target.arch.as_str(),
      "is_64bit": target.is_64bit,
      "work_dir": work_dir,
    }));
  }

  println!("Host:");
  field("Target", target.triple());
  field("OS", target.os.as_str());
  field("Arch", target.arch.as_str());
  field("64-bit", target.is_64bit);
  field("Work dir", work_dir.display());

  Ok(())
}
