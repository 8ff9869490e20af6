use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

#[test]
fn lock_reuses_environment_from_build() {
  let env = TestEnv::new("foo==1.0\n", json!({}));
  env.wheelhouse_cmd().arg("build").assert().success();
  let before = env.invocations().len();

  env
    .wheelhouse_cmd()
    .arg("lock")
    .assert()
    .success()
    .stdout(predicate::str::contains("Lock file verified"));

  let calls = env.invocations();
  assert_eq!(calls.len(), before + 1);
  assert!(calls[before].starts_with("-m piptools compile"));
  assert!(calls[before].contains("--no-index"));
  assert!(calls[before].ends_with("requirements-default.txt"));
}

#[test]
fn lock_regeneration_is_identical() {
  let env = TestEnv::new("foo==1.0\n", json!({}));
  env.wheelhouse_cmd().arg("build").assert().success();
  let first = std::fs::read(env.run_path("py3", "frozen.lock")).unwrap();

  env.wheelhouse_cmd().arg("lock").assert().success();
  assert_eq!(std::fs::read(env.run_path("py3", "frozen.lock")).unwrap(), first);
}

#[test]
fn lock_json_output_is_valid() {
  let env = TestEnv::new("foo==1.0\n", json!({}));
  env.wheelhouse_cmd().arg("build").assert().success();

  let output = env.wheelhouse_cmd().args(["lock", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["entries"], json!([]));
  assert!(json["lock_file"].as_str().unwrap().ends_with("frozen.lock"));
}

#[test]
fn lock_rejects_environment_from_another_interpreter() {
  let env = TestEnv::new("foo==1.0\n", json!({}));
  env.wheelhouse_cmd().arg("build").assert().success();
  env.copy_python("bin/python3-alt");
  let before = env.invocations().len();

  env
    .wheelhouse_cmd()
    .arg("lock")
    .env("WHEELHOUSE_BASE_PYTHON", "bin/python3-alt")
    .assert()
    .failure()
    .stderr(predicate::str::contains("was not created from"));

  assert_eq!(env.invocations().len(), before);
}
