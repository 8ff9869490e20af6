use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

const REQUIREMENTS: &str = "foo==1.0\naerospike==1.2\n";

fn aerospike_override() -> serde_json::Value {
  json!({
    "overrides": [
      { "id": "aerospike", "match": { "name": "^aerospike$" }, "env": { "EXT_CFLAGS": "-std=gnu99" } }
    ]
  })
}

#[test]
fn build_runs_every_step_in_order() {
  let env = TestEnv::new(REQUIREMENTS, aerospike_override());

  env
    .wheelhouse_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Built py3 for"));

  let calls = env.invocations();
  assert_eq!(calls.len(), 5, "{:#?}", calls);
  assert!(calls[0].starts_with("-m venv "));
  assert!(calls[1].starts_with("-m pip install -r "));
  assert!(calls[2].starts_with("-m pip wheel --no-build-isolation"));
  assert!(calls[2].ends_with("requirements-aerospike.txt"));
  assert!(calls[3].ends_with("requirements-default.txt"));
  assert!(calls[4].starts_with("-m piptools compile"));

  assert!(env.run_path("py3", "frozen.lock").is_file());
  assert!(env.run_path("py3", "wheels/frozen.txt").is_file());
  assert!(env.run_path("py3", "wheels/sizes.json").is_file());
}

#[test]
fn build_reuses_existing_environment() {
  let env = TestEnv::new(REQUIREMENTS, json!({}));

  env.wheelhouse_cmd().arg("build").assert().success();
  env.wheelhouse_cmd().arg("build").assert().success();

  let venvs = env.invocations().iter().filter(|c| c.starts_with("-m venv")).count();
  assert_eq!(venvs, 1);
}

#[test]
fn failing_bucket_is_named_and_nothing_is_locked() {
  let env = TestEnv::new(
    "foo==1.0\nbroken==2.0\n",
    json!({ "overrides": [ { "id": "broken", "match": { "name": "^broken$" } } ] }),
  );

  env
    .wheelhouse_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("bucket \"broken\""))
    .stderr(predicate::str::contains("exit code Some(7)"));

  let calls = env.invocations();
  assert!(!calls.iter().any(|c| c.contains("piptools")));
  assert!(!calls.iter().any(|c| c.ends_with("requirements-default.txt")));
  assert!(!env.run_path("py3", "frozen.lock").exists());
}

#[test]
fn constraint_is_passed_once_to_every_build() {
  let env = TestEnv::new(REQUIREMENTS, aerospike_override());
  env.write_file("constraints.txt", "foo<2\n");

  env
    .wheelhouse_cmd()
    .arg("build")
    .env("WHEELHOUSE_CONSTRAINT", env.path("constraints.txt"))
    .assert()
    .success();

  let flag = format!("-c {}", env.path("constraints.txt").display());
  let builds: Vec<_> = env
    .invocations()
    .into_iter()
    .filter(|c| c.starts_with("-m pip wheel"))
    .collect();
  assert_eq!(builds.len(), 2);
  for build in builds {
    assert_eq!(build.matches(&flag).count(), 1, "{}", build);
  }
}

#[test]
fn no_constraint_means_no_flag() {
  let env = TestEnv::new(REQUIREMENTS, json!({}));

  env.wheelhouse_cmd().arg("build").assert().success();

  for call in env.invocations() {
    assert!(!call.split(' ').any(|arg| arg == "-c"), "{}", call);
  }
}

#[test]
fn build_json_output_is_valid() {
  let env = TestEnv::new(REQUIREMENTS, aerospike_override());

  let output = env.wheelhouse_cmd().args(["build", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["built"], json!(["aerospike", "default"]));
  assert_eq!(json["locked"], 0);
  assert_eq!(json["wheels"], 0);
  assert_eq!(json["wheels_digest"].as_str().map(str::len), Some(64));
}

#[test]
fn skip_inventory_leaves_no_reports() {
  let env = TestEnv::new(REQUIREMENTS, json!({}));

  env.wheelhouse_cmd().args(["build", "--skip-inventory"]).assert().success();

  assert!(env.run_path("py3", "frozen.lock").is_file());
  assert!(!env.run_path("py3", "wheels/frozen.txt").exists());
}

#[test]
fn missing_base_interpreter_fails_before_any_invocation() {
  let env = TestEnv::new(REQUIREMENTS, json!({ "base_python": "bin/missing" }));

  env
    .wheelhouse_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("base interpreter not found"));

  assert!(env.invocations().is_empty());
}

#[test]
fn build_command_from_env_runs_before_buckets() {
  let env = TestEnv::new(REQUIREMENTS, json!({}));

  env
    .wheelhouse_cmd()
    .arg("build")
    .env("WHEELHOUSE_BUILD_COMMAND", "echo \"hook $WHEELHOUSE_VARIANT\" >> \"$FAKE_LOG\"")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build command"));

  let calls = env.invocations();
  assert_eq!(calls[2], "hook py3", "{:#?}", calls);
  assert!(calls[3].starts_with("-m pip wheel"));
}

#[test]
fn build_command_env_file_reaches_bucket_builds() {
  let env = TestEnv::new(REQUIREMENTS, json!({ "build_command": "echo FAKE_LOG > \"$WHEELHOUSE_ENV_FILE\"" }));

  env.wheelhouse_cmd().arg("build").assert().success();

  // The overlay unsets FAKE_LOG, so only the steps before and after the builds log.
  let calls = env.invocations();
  assert!(!calls.iter().any(|c| c.starts_with("-m pip wheel")), "{:#?}", calls);
  assert!(calls.iter().any(|c| c.starts_with("-m piptools compile")));
  assert!(env.run_path("py3", ".env").is_file());
}

#[test]
fn changed_base_interpreter_recreates_environment() {
  let env = TestEnv::new(REQUIREMENTS, json!({}));
  env.wheelhouse_cmd().arg("build").assert().success();
  env.copy_python("bin/python3-alt");

  env
    .wheelhouse_cmd()
    .arg("build")
    .env("WHEELHOUSE_BASE_PYTHON", "bin/python3-alt")
    .assert()
    .success();

  let venvs: Vec<_> = env
    .invocations()
    .into_iter()
    .filter(|c| c.starts_with("-m venv"))
    .collect();
  assert_eq!(venvs.len(), 2);
  let cfg = std::fs::read_to_string(env.work_path(&format!("envs/{}", env.run_name("py3"))).join("pyvenv.cfg")).unwrap();
  assert!(cfg.contains("python3-alt"), "{}", cfg);
}
