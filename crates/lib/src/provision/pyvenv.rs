//! `pyvenv.cfg`, written by `python -m venv` at the environment root.

use std::path::{Path, PathBuf};

pub const PYVENV_CFG: &str = "pyvenv.cfg";

/// The keys of `pyvenv.cfg` that identify the base interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PyvenvCfg {
  /// Directory of the base interpreter.
  pub home: Option<PathBuf>,
  /// Resolved base interpreter, written by Python 3.11 and later.
  pub executable: Option<PathBuf>,
  pub version: Option<String>,
}

impl PyvenvCfg {
  /// Read `<root>/pyvenv.cfg`. A missing or unreadable file gives `None`.
  pub fn load(root: &Path) -> Option<Self> {
    std::fs::read_to_string(root.join(PYVENV_CFG))
      .ok()
      .map(|content| Self::parse(&content))
  }

  pub fn parse(content: &str) -> Self {
    let mut cfg = Self::default();
    for line in content.lines() {
      let Some((key, value)) = line.split_once('=') else {
        continue;
      };
      let value = value.trim();
      if value.is_empty() {
        continue;
      }
      match key.trim().to_ascii_lowercase().as_str() {
        "home" => cfg.home = Some(PathBuf::from(value)),
        "executable" => cfg.executable = Some(PathBuf::from(value)),
        "version" | "version_info" => cfg.version = Some(value.to_string()),
        _ => {}
      }
    }
    cfg
  }

  /// Whether the environment was created from `base_python`.
  ///
  /// Compares `executable` when present, otherwise `home` against the
  /// interpreter's directory. Symlinks are resolved on both sides.
  pub fn created_from(&self, base_python: &Path) -> bool {
    match (&self.executable, &self.home) {
      (Some(executable), _) => same_path(executable, base_python),
      (None, Some(home)) => base_python.parent().is_some_and(|dir| same_path(home, dir)),
      (None, None) => false,
    }
  }

  /// The recorded interpreter, for diagnostics.
  pub fn describe(&self) -> String {
    let origin = self
      .executable
      .as_ref()
      .or(self.home.as_ref())
      .map_or_else(|| "unknown interpreter".to_string(), |p| p.display().to_string());
    match &self.version {
      Some(version) => format!("{} ({})", origin, version),
      None => origin,
    }
  }
}

fn same_path(a: &Path, b: &Path) -> bool {
  let resolve = |p: &Path| dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
  resolve(a) == resolve(b)
}
