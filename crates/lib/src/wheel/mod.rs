//! Wheel artifacts in the shared output directory.
//!
//! File name parsing, PEP 440 versions, `METADATA` reading, and the
//! inventory reports (`frozen.txt`, `sizes.json`) written after a build.

mod filename;
mod inventory;
mod metadata;
mod version;

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

pub use filename::WheelFilename;
pub use inventory::{Inventory, InventoryEntry};
pub use metadata::{WheelMetadata, WheelSizes, read_metadata, wheel_sizes};
pub use version::{Version, compare_versions, same_version};

#[derive(Debug, Error)]
pub enum WheelError {
  #[error("invalid wheel file name: {0}")]
  InvalidFilename(String),

  #[error("invalid version: {0}")]
  InvalidVersion(String),

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to open wheel archive {}: {source}", path.display())]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("wheel has no .dist-info directory: {}", .0.display())]
  MissingDistInfo(PathBuf),

  #[error("wheel {} has no usable {dist_info}/METADATA", path.display())]
  MissingMetadata { path: PathBuf, dist_info: String },

  #[error("failed to list wheel directory {}: {message}", path.display())]
  List { path: PathBuf, message: String },

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize size report: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// A wheel file found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelArtifact {
  pub path: PathBuf,
  pub filename: WheelFilename,
}

/// List the `*.whl` files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list. Files with a `.whl`
/// extension whose names do not parse are an error.
pub fn iter_wheels(dir: &Path) -> Result<Vec<WheelArtifact>, WheelError> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let mut wheels = Vec::new();
  for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| WheelError::List {
      path: dir.to_path_buf(),
      message: e.to_string(),
    })?;
    if !entry.file_type().is_file() {
      continue;
    }
    let Some(name) = entry.file_name().to_str() else {
      continue;
    };
    if !name.ends_with(".whl") {
      continue;
    }
    wheels.push(WheelArtifact {
      filename: name.parse()?,
      path: entry.into_path(),
    });
  }
  Ok(wheels)
}
