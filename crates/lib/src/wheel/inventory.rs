use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{FROZEN_FILENAME, SIZES_FILENAME};
use crate::manifest::normalize_name;
use crate::util::fs::write_atomic;

use super::{WheelError, compare_versions, iter_wheels, read_metadata, same_version, wheel_sizes};

/// Whether a wheel at `candidate` should replace one at `current`.
fn supersedes(candidate: &str, current: &str, pin: Option<&str>) -> bool {
  if let Some(pin) = pin {
    match (same_version(candidate, pin), same_version(current, pin)) {
      (true, false) => return true,
      (false, true) => return false,
      _ => {}
    }
  }
  compare_versions(candidate, current).is_gt()
}

/// Size report entry for one project, as serialized into `sizes.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
  pub version: String,
  pub compressed: u64,
  pub uncompressed: u64,
}

/// Metadata-derived view of every wheel in the output directory.
///
/// Keyed by the normalized project name recorded in the wheel's `METADATA`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
  entries: BTreeMap<String, InventoryEntry>,
}

impl Inventory {
  /// Read every wheel in `dir`.
  ///
  /// When several wheels carry the same project name the highest PEP 440
  /// version is kept.
  pub fn collect(dir: &Path) -> Result<Self, WheelError> {
    Self::collect_pinned(dir, &BTreeMap::new())
  }

  /// Like [`Inventory::collect`], but a wheel whose version matches the pin
  /// for its normalized name is kept over any other build of that project.
  pub fn collect_pinned(dir: &Path, pins: &BTreeMap<String, String>) -> Result<Self, WheelError> {
    let mut entries: BTreeMap<String, InventoryEntry> = BTreeMap::new();

    for wheel in iter_wheels(dir)? {
      let metadata = read_metadata(&wheel.path)?;
      let sizes = wheel_sizes(&wheel.path)?;
      debug!(
        wheel = %wheel.filename,
        name = %metadata.name,
        version = %metadata.version,
        "inventoried wheel"
      );

      let name = normalize_name(&metadata.name);
      let entry = InventoryEntry {
        version: metadata.version,
        compressed: sizes.compressed,
        uncompressed: sizes.uncompressed,
      };

      match entries.get(&name) {
        Some(current) => {
          let replace = supersedes(&entry.version, &current.version, pins.get(&name).map(String::as_str));
          let (kept, ignored) = if replace {
            (&entry.version, &current.version)
          } else {
            (&current.version, &entry.version)
          };
          warn!(name = %name, kept = %kept, ignored = %ignored, "multiple wheels for one project");
          if replace {
            entries.insert(name, entry);
          }
        }
        None => {
          entries.insert(name, entry);
        }
      }
    }

    Ok(Self { entries })
  }

  pub fn entries(&self) -> &BTreeMap<String, InventoryEntry> {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// `name==version` lines sorted by name, newline terminated.
  pub fn frozen(&self) -> String {
    self
      .entries
      .iter()
      .map(|(name, entry)| format!("{}=={}\n", name, entry.version))
      .collect()
  }

  pub fn sizes_json(&self) -> Result<String, WheelError> {
    let mut json = serde_json::to_string_pretty(&self.entries)?;
    json.push('\n');
    Ok(json)
  }

  /// Write `frozen.txt` and `sizes.json` into `dir`, returning both paths.
  pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf), WheelError> {
    let frozen_path = dir.join(FROZEN_FILENAME);
    let sizes_path = dir.join(SIZES_FILENAME);

    write_atomic(&frozen_path, self.frozen().as_bytes()).map_err(|source| WheelError::Write {
      path: frozen_path.clone(),
      source,
    })?;
    write_atomic(&sizes_path, self.sizes_json()?.as_bytes()).map_err(|source| WheelError::Write {
      path: sizes_path.clone(),
      source,
    })?;

    Ok((frozen_path, sizes_path))
  }
}
