//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use tempfile::TempDir;

use wheelhouse_lib::platform::Target;

/// Fake interpreter: logs every invocation, creates the venv by copying
/// itself and recording itself in `pyvenv.cfg`, fails `pip wheel` for requirement files mentioning `broken`,
/// and writes an empty lock for `piptools compile`.
const FAKE_PYTHON: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_LOG"
if [ "$1 $2" = "-m venv" ]; then
  mkdir -p "$3/bin" && cp "$0" "$3/bin/python" || exit 1
  echo "executable = $0" > "$3/pyvenv.cfg"
  exit 0
fi
if [ "$1 $2 $3" = "-m pip wheel" ]; then
  for last; do :; done
  if grep -q broken "$last"; then
    exit 7
  fi
  exit 0
fi
if [ "$1 $2 $3" = "-m piptools compile" ]; then
  while [ $# -gt 0 ]; do
    if [ "$1" = "--output-file" ]; then
      : > "$2"
    fi
    shift
  done
fi
exit 0
"#;

/// Isolated test environment with a fake interpreter and a config file.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Write requirements and a config, with `extra` merged into the config object.
  pub fn new(requirements: &str, extra: Value) -> Self {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let env = Self { temp };

    let python = env.path("bin/python3");
    env.write_file("bin/python3", FAKE_PYTHON);
    std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

    env.write_file("requirements.in", requirements);
    env.write_file("build_dependencies.txt", "pip-tools==7.4.1\n");

    let mut config = json!({
      "base_python": "bin/python3",
      "build_dependencies": "build_dependencies.txt",
      "requirements": "requirements.in",
      "work_dir": "work",
      "baseline_env": { "FAKE_LOG": env.log_path() },
    });
    if let (Some(config), Value::Object(extra)) = (config.as_object_mut(), extra) {
      config.extend(extra);
    }
    env.write_file("wheelhouse.json", &serde_json::to_string_pretty(&config).unwrap());
    env
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn log_path(&self) -> PathBuf {
    self.path("invocations.log")
  }

  /// Every interpreter invocation so far, one argument string per call.
  pub fn invocations(&self) -> Vec<String> {
    std::fs::read_to_string(self.log_path())
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  pub fn work_path(&self, relative_path: &str) -> PathBuf {
    self.path("work").join(relative_path)
  }

  /// `<triple>-<variant>` for the host target.
  pub fn run_name(&self, variant: &str) -> String {
    format!("{}-{}", Target::current().unwrap().triple(), variant)
  }

  /// Path under the default per-run directory of the host target and `variant`.
  pub fn run_path(&self, variant: &str, relative_path: &str) -> PathBuf {
    self.work_path(&self.run_name(variant)).join(relative_path)
  }

  /// Install another copy of the fake interpreter at `relative_path`.
  pub fn copy_python(&self, relative_path: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = self.path(relative_path);
    self.write_file(relative_path, FAKE_PYTHON);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  /// Get a pre-configured Command for the wheelhouse binary.
  ///
  /// Runs in the temp directory so the default `wheelhouse.json` is found,
  /// with the `WHEELHOUSE_*` overrides cleared.
  pub fn wheelhouse_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("wheelhouse");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("WHEELHOUSE_WORK_DIR");
    cmd.env_remove("WHEELHOUSE_CONSTRAINT");
    cmd.env_remove("WHEELHOUSE_BASE_PYTHON");
    cmd.env_remove("WHEELHOUSE_BUILD_COMMAND");
    cmd
  }
}
