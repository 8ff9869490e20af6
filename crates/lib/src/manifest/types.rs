//! Requirement manifest types.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::name::{requirement_name, strip_comment};

/// Errors raised while reading a requirement manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("manifest {} is not valid UTF-8: {source}", path.display())]
  Encoding {
    path: PathBuf,
    #[source]
    source: std::string::FromUtf8Error,
  },

  #[error("invalid requirement {}#{line_number}: {line}", path.display())]
  InvalidRequirement {
    path: PathBuf,
    line_number: usize,
    line: String,
  },
}

/// Ordered requirement lines, as written in the source document.
///
/// Lines are stored without their terminator. Order is significant: bucket
/// files and the lock file are derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementManifest {
  lines: Vec<String>,
}

impl RequirementManifest {
  pub fn from_lines<I, S>(lines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      lines: lines
        .into_iter()
        .map(|line| line.as_ref().trim_end_matches(['\r', '\n']).to_string())
        .collect(),
    }
  }

  /// Parse manifest text, validating every requirement line.
  ///
  /// `origin` is only used in error messages.
  pub fn parse(content: &str, origin: &Path) -> Result<Self, ManifestError> {
    let manifest = Self::from_lines(content.lines());

    for (i, line) in manifest.lines.iter().enumerate() {
      let text = strip_comment(line).trim();
      if text.is_empty() || text.starts_with('-') {
        continue;
      }
      if requirement_name(text).is_none() {
        return Err(ManifestError::InvalidRequirement {
          path: origin.to_path_buf(),
          line_number: i + 1,
          line: line.clone(),
        });
      }
    }

    Ok(manifest)
  }

  /// Read and validate a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let bytes = std::fs::read(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let content = String::from_utf8(bytes).map_err(|source| ManifestError::Encoding {
      path: path.to_path_buf(),
      source,
    })?;

    let manifest = Self::parse(&content, path)?;
    debug!(path = %path.display(), lines = manifest.len(), "loaded requirement manifest");
    Ok(manifest)
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Normalized names of every requirement, in manifest order.
  pub fn names(&self) -> Vec<String> {
    self.lines.iter().filter_map(|line| requirement_name(line)).collect()
  }
}
