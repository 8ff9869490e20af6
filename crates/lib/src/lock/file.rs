//! Parsing and verification of hash-pinned lock files.
//!
//! The format is the requirements format emitted with `--generate-hashes`:
//!
//! ```text
//! foo==1.0 \
//!     --hash=sha256:0123... \
//!     --hash=sha256:4567...
//!     # via -r requirements-default.txt
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::manifest::{normalize_name, strip_comment};
use crate::util::hash::hash_file;
use crate::wheel::{iter_wheels, same_version};

use super::LockError;

/// One pinned requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
  pub name: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub markers: Option<String>,
  /// Hashes as written, e.g. `sha256:0123...`.
  pub hashes: Vec<String>,
}

impl LockEntry {
  pub fn normalized_name(&self) -> String {
    normalize_name(&self.name)
  }

  fn sha256_hashes(&self) -> impl Iterator<Item = &str> {
    self.hashes.iter().filter_map(|hash| hash.strip_prefix("sha256:"))
  }
}

/// Parsed lock file, entries in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
  pub entries: Vec<LockEntry>,
}

impl LockFile {
  pub fn load(path: &Path) -> Result<Self, LockError> {
    let content = std::fs::read_to_string(path).map_err(|source| LockError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content)
  }

  /// Parse lock file content.
  ///
  /// Backslash continuations are joined, comments and option lines
  /// (`--find-links`, `--index-url`, ...) are ignored. Every requirement
  /// must be pinned with `==`.
  pub fn parse(content: &str) -> Result<Self, LockError> {
    let mut entries = Vec::new();

    for (line_number, logical) in logical_lines(content) {
      let line = strip_comment(&logical).trim();
      if line.is_empty() || line.starts_with('-') {
        continue;
      }

      let mut requirement = Vec::new();
      let mut hashes = Vec::new();
      for token in line.split_whitespace() {
        if let Some(hash) = token.strip_prefix("--hash=") {
          hashes.push(hash.to_string());
        } else if token.starts_with("--") {
          continue;
        } else {
          requirement.push(token);
        }
      }
      let requirement = requirement.join(" ");

      let (spec, markers) = match requirement.split_once(';') {
        Some((spec, markers)) => (spec.trim(), Some(markers.trim().to_string())),
        None => (requirement.trim(), None),
      };

      let not_pinned = || LockError::NotPinned {
        line_number,
        line: line.to_string(),
      };
      let (name, version) = spec.split_once("==").ok_or_else(not_pinned)?;
      let name = name.split('[').next().unwrap_or(name).trim();
      let version = version.trim();
      if name.is_empty() || version.is_empty() {
        return Err(not_pinned());
      }

      entries.push(LockEntry {
        name: name.to_string(),
        version: version.to_string(),
        markers,
        hashes,
      });
    }

    Ok(Self { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&LockEntry> {
    let name = normalize_name(name);
    self.entries.iter().find(|entry| entry.normalized_name() == name)
  }

  /// Pinned version per normalized project name.
  pub fn pins(&self) -> BTreeMap<String, String> {
    self
      .entries
      .iter()
      .map(|entry| (entry.normalized_name(), entry.version.clone()))
      .collect()
  }

  /// Check that every entry refers to a wheel present in `wheel_dir`.
  ///
  /// An entry must carry at least one `sha256` hash, a wheel with the same
  /// normalized name and an equal PEP 440 version must exist, and one of the
  /// entry's hashes must equal that wheel's digest.
  pub fn verify(&self, wheel_dir: &Path) -> Result<(), LockError> {
    let mut present = Vec::new();
    for wheel in iter_wheels(wheel_dir)? {
      let digest = hash_file(&wheel.path)?;
      present.push((wheel.filename, digest.0));
    }

    for entry in &self.entries {
      if entry.sha256_hashes().next().is_none() {
        return Err(LockError::MissingHash {
          name: entry.name.clone(),
          version: entry.version.clone(),
        });
      }

      let name = entry.normalized_name();
      let digests: Vec<&str> = present
        .iter()
        .filter(|(filename, _)| filename.normalized_name() == name && same_version(&filename.version, &entry.version))
        .map(|(_, digest)| digest.as_str())
        .collect();
      if digests.is_empty() {
        return Err(LockError::MissingArtifact {
          name: entry.name.clone(),
          version: entry.version.clone(),
        });
      }

      if !entry.sha256_hashes().any(|hash| digests.contains(&hash)) {
        return Err(LockError::HashMismatch {
          name: entry.name.clone(),
          version: entry.version.clone(),
        });
      }
    }

    Ok(())
  }
}

/// Join backslash-continued lines, yielding the 1-based number of each
/// logical line's first physical line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
  let mut lines = Vec::new();
  let mut current: Option<(usize, String)> = None;

  for (i, raw) in content.lines().enumerate() {
    let raw = raw.trim_end();
    let (text, continued) = match raw.strip_suffix('\\') {
      Some(text) => (text, true),
      None => (raw, false),
    };

    let (_, buffer) = current.get_or_insert_with(|| (i + 1, String::new()));
    buffer.push(' ');
    buffer.push_str(text);

    if !continued && let Some(done) = current.take() {
      lines.push(done);
    }
  }
  lines.extend(current);
  lines
}
