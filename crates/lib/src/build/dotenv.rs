//! `.env` overlays applied over the baseline build environment.
//!
//! ```text
//! # comment
//! export CFLAGS="-O2 -g"
//! OPENSSL_DIR=/opt/openssl   # trailing comment
//! PIP_CONSTRAINT
//! ```
//!
//! `KEY=value` sets a variable. A bare `KEY` removes it from the build
//! environment. `KEY=` sets it to the empty string.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvFileError {
  #[error("failed to read env file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{}:{line_number}: invalid entry {line:?}", path.display())]
  Syntax {
    path: PathBuf,
    line_number: usize,
    line: String,
  },
}

/// Ordered `.env` entries; `None` unsets the variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
  entries: Vec<(String, Option<String>)>,
}

impl EnvOverlay {
  /// Read an overlay file. A missing file is an empty overlay.
  pub fn load(path: &Path) -> Result<Self, EnvFileError> {
    if !path.is_file() {
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| EnvFileError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let overlay = Self::parse(&content).map_err(|(line_number, line)| EnvFileError::Syntax {
      path: path.to_path_buf(),
      line_number,
      line,
    })?;
    debug!(path = %path.display(), entries = overlay.len(), "loaded env file");
    Ok(overlay)
  }

  /// Parse overlay content. Errors carry the 1-based line number and text.
  pub fn parse(content: &str) -> Result<Self, (usize, String)> {
    let mut entries = Vec::new();

    for (i, raw) in content.lines().enumerate() {
      let line = raw.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let line = line.strip_prefix("export ").map_or(line, str::trim_start);
      let invalid = || (i + 1, raw.to_string());

      let (key, value) = match line.split_once('=') {
        Some((key, value)) => (key.trim(), Some(parse_value(value.trim()).ok_or_else(invalid)?)),
        None => (line, None),
      };
      if !is_valid_key(key) {
        return Err(invalid());
      }
      entries.push((key.to_string(), value));
    }

    Ok(Self { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Apply the entries in order over `env`.
  pub fn apply(&self, mut env: BTreeMap<String, String>) -> BTreeMap<String, String> {
    for (key, value) in &self.entries {
      match value {
        Some(value) => {
          env.insert(key.clone(), value.clone());
        }
        None => {
          env.remove(key);
        }
      }
    }
    env
  }
}

fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && !key.starts_with(|c: char| c.is_ascii_digit())
    && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Unquote a value. `None` for an unterminated quote.
fn parse_value(value: &str) -> Option<String> {
  if let Some(rest) = value.strip_prefix('\'') {
    let end = rest.find('\'')?;
    return Some(rest[..end].to_string());
  }

  if let Some(rest) = value.strip_prefix('"') {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
      match c {
        '"' => return Some(out),
        '\\' => match chars.next()? {
          'n' => out.push('\n'),
          't' => out.push('\t'),
          other => out.push(other),
        },
        c => out.push(c),
      }
    }
    return None;
  }

  let value = match value.find(" #").or_else(|| value.find("\t#")) {
    Some(pos) => &value[..pos],
    None => value,
  };
  Some(value.trim_end().to_string())
}
