//! Hashing utilities for artifact verification.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hash
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing
//! - `hash_wheel_dir()`: Deterministic fingerprint of a wheel directory

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A full 64-character SHA256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters), the same
/// encoding pip uses in `--hash=sha256:<hex>` entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error during file or directory hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let mut file = fs::File::open(path).map_err(|e| HashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| HashError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Compute a deterministic fingerprint of the wheels in a directory.
///
/// Only top-level `*.whl` files take part; each contributes its file name and
/// content hash, in file-name order. Timestamps and other files are ignored, so
/// the fingerprint only changes when the set of built artifacts changes.
pub fn hash_wheel_dir(path: &Path) -> Result<ContentHash, HashError> {
  let mut hasher = Sha256::new();

  let walker = WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name();
  for entry in walker {
    let entry = entry.map_err(|e| HashError::WalkDir { message: e.to_string() })?;
    let name = entry.file_name().to_string_lossy();
    if !entry.file_type().is_file() || !name.ends_with(".whl") {
      continue;
    }

    let content_hash = hash_file(entry.path())?;
    hasher.update(format!("{}:{}\n", name, content_hash.0).as_bytes());
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}
