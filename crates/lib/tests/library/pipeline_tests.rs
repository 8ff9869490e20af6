use wheelhouse_lib::execute::ProcessRunner;
use wheelhouse_lib::lock::LockError;
use wheelhouse_lib::pipeline::{Pipeline, PipelineError, PipelineOptions};
use wheelhouse_lib::provision::BuildEnvironment;
use wheelhouse_lib::util::hash::hash_wheel_dir;

use super::common::{Fixture, host_target, pinned, write_wheel};

#[tokio::test]
async fn full_run_produces_verified_lock_and_inventory() {
  let fixture = Fixture::new_pinning_index();
  let runner = ProcessRunner::new(false);

  let report = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap();

  assert_eq!(report.build.built, ["default"]);
  assert_eq!(report.lock.len(), 2);
  assert!(report.lock_file.is_file());
  assert_eq!(report.inventory.as_ref().map(|i| i.len()), Some(2));

  let output_dir = fixture.output_dir();
  assert_eq!(
    std::fs::read_to_string(output_dir.join("frozen.txt")).unwrap(),
    "bar==2.0\nfoo==1.0\n"
  );
  assert_eq!(report.wheels_digest, hash_wheel_dir(&output_dir).unwrap());
  assert!(report.environment.is_provisioned());
}

#[tokio::test]
async fn lock_referencing_absent_wheel_is_rejected() {
  let fixture = Fixture::new(|foo, _| format!("{}{}", pinned("foo", "1.0", foo), pinned("baz", "3.0", foo)));
  let runner = ProcessRunner::new(false);

  let err = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Lock(LockError::MissingArtifact { ref name, .. }) if name == "baz"
  ));
  assert!(!fixture.config.lock_file(&host_target()).exists());
}

#[tokio::test]
async fn lock_with_foreign_hash_is_rejected() {
  let fixture = Fixture::new(|_, bar| pinned("foo", "1.0", bar));
  let runner = ProcessRunner::new(false);

  let err = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Lock(LockError::HashMismatch { .. })));
}

#[tokio::test]
async fn stale_wheels_do_not_reach_the_inventory() {
  let fixture = Fixture::new_pinning_index();
  let output_dir = fixture.output_dir();
  std::fs::create_dir_all(&output_dir).unwrap();
  write_wheel(&output_dir, "foo", "1.10");
  let runner = ProcessRunner::new(false);

  Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap();

  assert_eq!(
    std::fs::read_to_string(output_dir.join("frozen.txt")).unwrap(),
    "bar==2.0\nfoo==1.0\n"
  );
}

#[tokio::test]
async fn rebuild_after_base_change_recreates_environment() {
  let mut fixture = Fixture::new_pinning_index();
  let runner = ProcessRunner::new(false);
  let first = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap();

  let other_base = fixture.temp.path().join("py313").join("python3");
  std::fs::create_dir_all(other_base.parent().unwrap()).unwrap();
  std::fs::copy(&fixture.config.base_python, &other_base).unwrap();
  fixture.config.base_python = other_base.clone();

  let second = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap();

  assert_eq!(first.environment.root, second.environment.root);
  let cfg = std::fs::read_to_string(second.environment.root.join("pyvenv.cfg")).unwrap();
  assert_eq!(cfg.trim(), format!("executable = {}", other_base.display()));
  assert!(
    BuildEnvironment::new(&second.environment.root, &other_base, fixture.output_dir(), host_target().os)
      .is_provisioned()
  );
}

#[tokio::test]
async fn build_command_env_file_redirects_bucket_builds() {
  let mut fixture = Fixture::new_pinning_index();
  let index = fixture.index.to_string_lossy().into_owned();
  fixture.config.baseline_env.insert("INDEX".to_string(), "/nonexistent".to_string());
  fixture.config.build_command = Some(format!(
    r#"printf 'INDEX={}\n' > "$WHEELHOUSE_ENV_FILE""#,
    index
  ));
  let runner = ProcessRunner::new(false);

  let report = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap();

  assert_eq!(report.lock.len(), 2);
  let env_file = fixture.config.env_file(&host_target());
  assert!(std::fs::read_to_string(env_file).unwrap().starts_with("INDEX="));
}

#[tokio::test]
async fn failing_build_command_builds_nothing() {
  let mut fixture = Fixture::new_pinning_index();
  fixture.config.build_command = Some("exit 7".to_string());
  let runner = ProcessRunner::new(false);

  let err = Pipeline::new(&fixture.config, host_target(), &runner)
    .run(PipelineOptions::default())
    .await
    .unwrap_err();

  match err {
    PipelineError::BuildCommand(source) => assert_eq!(source.exit_code(), Some(7)),
    other => panic!("unexpected error: {other}"),
  }
  assert!(std::fs::read_dir(fixture.output_dir()).unwrap().next().is_none());
}
