//! Property tests for requirement partitioning.

use std::collections::BTreeSet;

use proptest::prelude::*;
use tempfile::TempDir;

use wheelhouse_lib::consts::SYNTHETIC_REQUIREMENT;
use wheelhouse_lib::manifest::{RequirementManifest, normalize_name, requirement_name};
use wheelhouse_lib::partition::{ExclusionRule, Matcher, OverrideRule, PartitionError, RuleSet, partition};
use wheelhouse_lib::platform::{Arch, Os, Target, TargetSelector};

const NAMES: &[&str] = &[
  "foo",
  "bar",
  "Baz_Qux",
  "aerospike",
  "psycopg-c",
  "pywin32",
  "zope.interface",
  "numpy",
];

fn target() -> Target {
  Target::new(Arch::X86_64, Os::Linux)
}

fn name_pattern(name: &str) -> Matcher {
  Matcher::Name(format!("^{}$", normalize_name(name)))
}

fn exclusion(name: &str) -> ExclusionRule {
  ExclusionRule {
    matcher: name_pattern(name),
    when: TargetSelector::default(),
  }
}

fn override_rule(id: &str, name: &str) -> OverrideRule {
  OverrideRule {
    id: id.to_string(),
    matcher: name_pattern(name),
    env: [("EXT_CFLAGS".to_string(), "-std=gnu99".to_string())].into(),
    when: TargetSelector::default(),
  }
}

/// A manifest line: a pin, a pin with extras or a marker, a comment, or blank.
fn manifest_line() -> impl Strategy<Value = String> {
  let name = prop::sample::select(NAMES);
  prop_oneof![
    6 => (name.clone(), 0u32..20, 0u32..20).prop_map(|(n, major, minor)| format!("{}=={}.{}", n, major, minor)),
    1 => (name.clone(), 0u32..5).prop_map(|(n, major)| format!("{}[extra]=={}.0", n, major)),
    1 => (name, 0u32..5).prop_map(|(n, major)| format!("{}=={}.0 ; python_version >= \"3.8\"", n, major)),
    1 => Just("# pinned for the agent".to_string()),
    1 => Just(String::new()),
  ]
}

fn manifest() -> impl Strategy<Value = Vec<String>> {
  prop::collection::vec(manifest_line(), 0..30)
}

/// Disjoint exclusion and override name sets.
fn rule_names() -> impl Strategy<Value = (BTreeSet<&'static str>, Vec<&'static str>)> {
  prop::collection::vec(0u8..3, NAMES.len()).prop_map(|roles| {
    let mut excluded = BTreeSet::new();
    let mut overridden = Vec::new();
    for (name, role) in NAMES.iter().zip(roles) {
      match role {
        1 => {
          excluded.insert(*name);
        }
        2 => overridden.push(*name),
        _ => {}
      }
    }
    (excluded, overridden)
  })
}

fn name_of(line: &str) -> Option<String> {
  requirement_name(line)
}

fn is_requirement(line: &str) -> bool {
  let text = line.trim();
  !text.is_empty() && !text.starts_with('#')
}

proptest! {
  #![proptest_config(ProptestConfig {
    cases: 64,
    .. ProptestConfig::default()
  })]

  /// No bucket holds an excluded requirement; the default bucket holds every
  /// other requirement in manifest order, then the synthetic line; override
  /// buckets are ordered subsets of the default bucket.
  #[test]
  fn partition_preserves_and_excludes(lines in manifest(), (excluded, overridden) in rule_names()) {
    let exclusions: Vec<_> = excluded.iter().map(|n| exclusion(n)).collect();
    let overrides: Vec<_> = overridden
      .iter()
      .enumerate()
      .map(|(i, n)| override_rule(&format!("ov{}", i), n))
      .collect();
    let rules = RuleSet::compile(&exclusions, &[], &overrides, &target()).unwrap();
    let excluded_names: BTreeSet<String> = excluded.iter().map(|n| normalize_name(n)).collect();

    let result = partition(&RequirementManifest::from_lines(&lines), &rules, SYNTHETIC_REQUIREMENT).unwrap();

    let expected: Vec<String> = lines
      .iter()
      .filter(|line| is_requirement(line))
      .filter(|line| !name_of(line).is_some_and(|n| excluded_names.contains(&n)))
      .map(|line| line.trim().to_string())
      .collect();
    let (synthetic, kept) = result.default.lines.split_last().unwrap();
    prop_assert_eq!(synthetic.as_str(), SYNTHETIC_REQUIREMENT);
    prop_assert_eq!(kept, expected.as_slice());

    let ids: Vec<&str> = result.overrides.iter().map(|b| b.id.as_str()).collect();
    prop_assert_eq!(ids, rules.override_ids());

    for (bucket, name) in result.overrides.iter().zip(&overridden) {
      let wanted = normalize_name(name);
      let matching: Vec<&String> = kept.iter().filter(|l| name_of(l).as_deref() == Some(wanted.as_str())).collect();
      prop_assert_eq!(bucket.lines.iter().collect::<Vec<_>>(), matching);
    }

    for bucket in result.build_order() {
      for line in &bucket.lines {
        prop_assert!(!name_of(line).is_some_and(|n| excluded_names.contains(&n)), "{} leaked into {}", line, bucket.id);
      }
    }
  }

  /// Writing the same partition twice, to fresh or existing directories,
  /// yields byte-identical bucket files.
  #[test]
  fn bucket_files_are_reproducible(lines in manifest(), (excluded, overridden) in rule_names()) {
    let exclusions: Vec<_> = excluded.iter().map(|n| exclusion(n)).collect();
    let overrides: Vec<_> = overridden
      .iter()
      .enumerate()
      .map(|(i, n)| override_rule(&format!("ov{}", i), n))
      .collect();
    let rules = RuleSet::compile(&exclusions, &[], &overrides, &target()).unwrap();
    let manifest = RequirementManifest::from_lines(&lines);

    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let first = partition(&manifest, &rules, SYNTHETIC_REQUIREMENT).unwrap().write(first_dir.path()).unwrap();
    let second = partition(&manifest, &rules, SYNTHETIC_REQUIREMENT).unwrap().write(second_dir.path()).unwrap();
    let rewritten = partition(&manifest, &rules, SYNTHETIC_REQUIREMENT).unwrap().write(first_dir.path()).unwrap();

    prop_assert_eq!(first.len(), overrides.len() + 1);
    for (((id_a, a), (id_b, b)), (_, c)) in first.iter().zip(&second).zip(&rewritten) {
      prop_assert_eq!(id_a, id_b);
      let bytes = std::fs::read(a).unwrap();
      prop_assert_eq!(&bytes, &std::fs::read(b).unwrap());
      prop_assert_eq!(&bytes, &std::fs::read(c).unwrap());
      prop_assert!(bytes.is_empty() || bytes.ends_with(b"\n"));
      prop_assert!(!bytes.contains(&b'\r'));
    }
  }

  /// Two overrides matching a requirement that is present is an error naming both.
  #[test]
  fn overlapping_overrides_are_rejected(lines in manifest(), pick in 0..NAMES.len()) {
    let name = NAMES[pick];
    let mut lines = lines;
    lines.push(format!("{}==1.0", name));
    let overrides = [override_rule("first", name), override_rule("second", name)];
    let rules = RuleSet::compile(&[], &[], &overrides, &target()).unwrap();

    let result = partition(&RequirementManifest::from_lines(&lines), &rules, SYNTHETIC_REQUIREMENT);
    match result {
      Err(PartitionError::OverlappingOverrides { first, second, .. }) => {
        prop_assert_eq!(first, "first");
        prop_assert_eq!(second, "second");
      }
      other => prop_assert!(false, "expected overlap error, got {:?}", other),
    }
  }
}
