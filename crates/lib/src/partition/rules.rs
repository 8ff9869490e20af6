//! Exclusion, substitution and override rules.
//!
//! Rules arrive as configuration data and are compiled once per run against
//! the resolved [`Target`]: rules whose selector does not match are dropped,
//! and patterns are compiled to regexes.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::manifest::requirement_name;
use crate::platform::{Target, TargetSelector};

use super::PartitionError;

/// What a rule pattern is tested against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Matcher {
  /// Regex over the normalized project name (`Foo_Bar` is seen as `foo-bar`).
  Name(String),
  /// Regex over the raw requirement line.
  Line(String),
}

impl Matcher {
  pub fn pattern(&self) -> &str {
    match self {
      Matcher::Name(p) | Matcher::Line(p) => p,
    }
  }
}

/// Drops matching requirement lines entirely for the selected targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionRule {
  #[serde(rename = "match")]
  pub matcher: Matcher,
  #[serde(default)]
  pub when: TargetSelector,
}

/// Rewrites requirement text before override matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Substitution {
  pub pattern: String,
  pub replacement: String,
  #[serde(default)]
  pub when: TargetSelector,
}

/// Builds matching lines in their own bucket with extra environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRule {
  pub id: String,
  #[serde(rename = "match")]
  pub matcher: Matcher,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
  #[serde(default)]
  pub when: TargetSelector,
}

#[derive(Debug)]
pub(crate) enum CompiledMatcher {
  Name(Regex),
  Line(Regex),
}

impl CompiledMatcher {
  fn compile(rule: &str, matcher: &Matcher) -> Result<Self, PartitionError> {
    let regex = compile_pattern(rule, matcher.pattern())?;
    Ok(match matcher {
      Matcher::Name(_) => CompiledMatcher::Name(regex),
      Matcher::Line(_) => CompiledMatcher::Line(regex),
    })
  }

  /// Test a line; name matchers never match lines without a project name.
  pub(crate) fn is_match(&self, line: &str) -> bool {
    match self {
      CompiledMatcher::Name(regex) => requirement_name(line).is_some_and(|name| regex.is_match(&name)),
      CompiledMatcher::Line(regex) => regex.is_match(line.trim()),
    }
  }
}

#[derive(Debug)]
pub(crate) struct CompiledSubstitution {
  pub(crate) regex: Regex,
  pub(crate) replacement: String,
}

#[derive(Debug)]
pub(crate) struct CompiledOverride {
  pub(crate) id: String,
  pub(crate) matcher: CompiledMatcher,
  pub(crate) env: BTreeMap<String, String>,
}

/// Rules active for one target, ready for partitioning.
#[derive(Debug, Default)]
pub struct RuleSet {
  pub(crate) exclusions: Vec<CompiledMatcher>,
  pub(crate) substitutions: Vec<CompiledSubstitution>,
  pub(crate) overrides: Vec<CompiledOverride>,
}

impl RuleSet {
  /// Compile the rules whose selectors match `target`.
  ///
  /// Override declaration order is kept; it is the bucket build order.
  pub fn compile(
    exclusions: &[ExclusionRule],
    substitutions: &[Substitution],
    overrides: &[OverrideRule],
    target: &Target,
  ) -> Result<Self, PartitionError> {
    let mut rules = RuleSet::default();

    for (i, rule) in exclusions.iter().enumerate() {
      if rule.when.matches(target) {
        rules
          .exclusions
          .push(CompiledMatcher::compile(&format!("exclusion #{}", i + 1), &rule.matcher)?);
      }
    }

    for (i, rule) in substitutions.iter().enumerate() {
      if rule.when.matches(target) {
        rules.substitutions.push(CompiledSubstitution {
          regex: compile_pattern(&format!("substitution #{}", i + 1), &rule.pattern)?,
          replacement: rule.replacement.clone(),
        });
      }
    }

    for rule in overrides {
      if rule.when.matches(target) {
        rules.overrides.push(CompiledOverride {
          id: rule.id.clone(),
          matcher: CompiledMatcher::compile(&rule.id, &rule.matcher)?,
          env: rule.env.clone(),
        });
      }
    }

    Ok(rules)
  }

  /// Ids of the active override rules, in build order.
  pub fn override_ids(&self) -> Vec<&str> {
    self.overrides.iter().map(|o| o.id.as_str()).collect()
  }
}

fn compile_pattern(rule: &str, pattern: &str) -> Result<Regex, PartitionError> {
  Regex::new(pattern).map_err(|source| PartitionError::InvalidPattern {
    rule: rule.to_string(),
    pattern: pattern.to_string(),
    source,
  })
}
