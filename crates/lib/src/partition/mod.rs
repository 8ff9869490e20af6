//! Requirement partitioning.
//!
//! Splits a manifest into the default bucket plus one bucket per active
//! override rule. A line matched by an override is copied into that rule's
//! bucket and also kept in the default bucket, so the default bucket is always
//! a superset of every override bucket.
//!
//! Per line, in manifest order:
//! 1. Blank lines and comments are dropped.
//! 2. Lines matching any exclusion are dropped.
//! 3. Substitutions rewrite the text.
//! 4. Each matching override bucket receives the line.
//! 5. The default bucket receives the line.
//!
//! Finally the synthetic diagnostic requirement is appended to the default
//! bucket.

mod rules;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEFAULT_BUCKET;
use crate::manifest::{RequirementManifest, strip_comment};
use crate::util::fs::write_atomic;

pub use rules::{ExclusionRule, Matcher, OverrideRule, RuleSet, Substitution};

/// Errors that can occur while partitioning requirements.
#[derive(Debug, Error)]
pub enum PartitionError {
  #[error("invalid pattern {pattern:?} in {rule}: {source}")]
  InvalidPattern {
    rule: String,
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("requirement {line:?} matches both override {first:?} and override {second:?}")]
  OverlappingOverrides {
    first: String,
    second: String,
    line: String,
  },

  #[error("failed to write bucket file {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A named subset of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
  pub id: String,
  /// Environment variables layered over the baseline when building this bucket.
  pub env: BTreeMap<String, String>,
  pub lines: Vec<String>,
}

impl Bucket {
  fn new(id: &str, env: BTreeMap<String, String>) -> Self {
    Self {
      id: id.to_string(),
      env,
      lines: Vec::new(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// File content: one requirement per line, `\n` terminated.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for line in &self.lines {
      out.push_str(line);
      out.push('\n');
    }
    out
  }

  pub fn file_name(&self) -> String {
    bucket_file_name(&self.id)
  }
}

pub fn bucket_file_name(id: &str) -> String {
  format!("requirements-{}.txt", id)
}

/// Result of partitioning a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
  pub default: Bucket,
  /// One bucket per active override rule, in declaration order.
  pub overrides: Vec<Bucket>,
}

impl Partition {
  /// Buckets in build order: overrides first, default last.
  pub fn build_order(&self) -> impl Iterator<Item = &Bucket> {
    self.overrides.iter().chain(std::iter::once(&self.default))
  }

  pub fn get(&self, id: &str) -> Option<&Bucket> {
    self.build_order().find(|bucket| bucket.id == id)
  }

  /// Write every bucket to `dir`, returning `(bucket id, path)` in build order.
  ///
  /// Content depends only on the partition, so rewriting is byte-identical.
  pub fn write(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>, PartitionError> {
    let mut written = Vec::new();
    for bucket in self.build_order() {
      let path = dir.join(bucket.file_name());
      write_atomic(&path, bucket.render().as_bytes()).map_err(|source| PartitionError::Write {
        path: path.clone(),
        source,
      })?;
      debug!(bucket = %bucket.id, path = %path.display(), lines = bucket.lines.len(), "wrote bucket file");
      written.push((bucket.id.clone(), path));
    }
    Ok(written)
  }
}

/// Partition `manifest` into buckets according to `rules`.
///
/// `synthetic` is appended to the default bucket unconditionally, so even an
/// empty manifest produces a one-line default bucket.
pub fn partition(
  manifest: &RequirementManifest,
  rules: &RuleSet,
  synthetic: &str,
) -> Result<Partition, PartitionError> {
  let mut default = Bucket::new(DEFAULT_BUCKET, BTreeMap::new());
  let mut overrides: Vec<Bucket> = rules
    .overrides
    .iter()
    .map(|o| Bucket::new(&o.id, o.env.clone()))
    .collect();
  let mut excluded = 0usize;

  for raw in manifest.lines() {
    if strip_comment(raw).trim().is_empty() {
      continue;
    }

    if rules.exclusions.iter().any(|e| e.is_match(raw)) {
      debug!(line = %raw, "excluded requirement");
      excluded += 1;
      continue;
    }

    let mut line = raw.trim().to_string();
    for substitution in &rules.substitutions {
      line = substitution
        .regex
        .replace_all(&line, substitution.replacement.as_str())
        .into_owned();
    }

    let mut matched: Option<usize> = None;
    for (i, rule) in rules.overrides.iter().enumerate() {
      if !rule.matcher.is_match(&line) {
        continue;
      }
      if let Some(first) = matched {
        return Err(PartitionError::OverlappingOverrides {
          first: rules.overrides[first].id.clone(),
          second: rule.id.clone(),
          line,
        });
      }
      matched = Some(i);
    }

    if let Some(i) = matched {
      overrides[i].lines.push(line.clone());
    }
    default.lines.push(line);
  }

  default.lines.push(synthetic.to_string());

  info!(
    default = default.lines.len(),
    overrides = overrides.len(),
    excluded,
    "partitioned requirements"
  );

  Ok(Partition { default, overrides })
}
