//! Baseline environment composition for build subprocesses.

use std::collections::BTreeMap;
use std::path::Path;

use crate::consts::SOURCE_DATE_EPOCH;

/// Compose the environment every build invocation starts from.
///
/// Layers, later wins:
/// 1. `passthrough` variables present on the host (looked up via `host`)
/// 2. `configured` baseline variables
/// 3. `PATH` with `bin_dir` prepended
///
/// `SOURCE_DATE_EPOCH` defaults to the ZIP epoch so archive timestamps are
/// reproducible; `LC_ALL` defaults to `C`.
pub fn baseline_env(
  passthrough: &[String],
  configured: &BTreeMap<String, String>,
  bin_dir: &Path,
  host: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
  let mut env = BTreeMap::new();

  for key in passthrough {
    if let Some(value) = host(key) {
      env.insert(key.clone(), value);
    }
  }

  for (key, value) in configured {
    env.insert(key.clone(), value.clone());
  }

  let existing = env.get("PATH").cloned().unwrap_or_default();
  env.insert("PATH".to_string(), prepend_path(bin_dir, &existing));

  env
    .entry("SOURCE_DATE_EPOCH".to_string())
    .or_insert_with(|| SOURCE_DATE_EPOCH.to_string());
  env.entry("LC_ALL".to_string()).or_insert_with(|| "C".to_string());

  env
}

/// Baseline environment using the current process environment for passthrough.
pub fn host_baseline_env(passthrough: &[String], configured: &BTreeMap<String, String>, bin_dir: &Path) -> BTreeMap<String, String> {
  baseline_env(passthrough, configured, bin_dir, |key| std::env::var(key).ok())
}

fn prepend_path(dir: &Path, existing: &str) -> String {
  let dirs = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(existing).filter(|p| !p.as_os_str().is_empty()));
  match std::env::join_paths(dirs) {
    Ok(joined) => joined.to_string_lossy().into_owned(),
    Err(_) => dir.to_string_lossy().into_owned(),
  }
}
