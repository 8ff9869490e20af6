use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use super::WheelError;

/// Core metadata fields read from a wheel's `.dist-info/METADATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelMetadata {
  pub name: String,
  pub version: String,
}

/// Compressed (on disk) and uncompressed (sum of members) wheel sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSizes {
  pub compressed: u64,
  pub uncompressed: u64,
}

fn open(path: &Path) -> Result<ZipArchive<File>, WheelError> {
  let file = File::open(path).map_err(|source| WheelError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  ZipArchive::new(file).map_err(|source| WheelError::Archive {
    path: path.to_path_buf(),
    source,
  })
}

/// Read `Name` and `Version` from the wheel's `METADATA` file.
pub fn read_metadata(path: &Path) -> Result<WheelMetadata, WheelError> {
  let mut archive = open(path)?;

  let dist_info = archive
    .file_names()
    .filter_map(|name| name.split('/').next())
    .find(|root| root.ends_with(".dist-info"))
    .map(str::to_string)
    .ok_or_else(|| WheelError::MissingDistInfo(path.to_path_buf()))?;

  let mut content = String::new();
  {
    let mut file = archive
      .by_name(&format!("{}/METADATA", dist_info))
      .map_err(|_| WheelError::MissingMetadata {
        path: path.to_path_buf(),
        dist_info: dist_info.clone(),
      })?;
    file.read_to_string(&mut content).map_err(|source| WheelError::Read {
      path: path.to_path_buf(),
      source,
    })?;
  }

  parse_metadata(&content).ok_or_else(|| WheelError::MissingMetadata {
    path: path.to_path_buf(),
    dist_info,
  })
}

/// Extract `Name` and `Version` from RFC 822 style metadata headers.
///
/// Only the header block (up to the first blank line) is considered.
fn parse_metadata(content: &str) -> Option<WheelMetadata> {
  let mut name = None;
  let mut version = None;

  for line in content.lines() {
    if line.is_empty() {
      break;
    }
    if line.starts_with([' ', '\t']) {
      continue;
    }
    if let Some((key, value)) = line.split_once(':') {
      match key.trim() {
        "Name" if name.is_none() => name = Some(value.trim().to_string()),
        "Version" if version.is_none() => version = Some(value.trim().to_string()),
        _ => {}
      }
    }
  }

  Some(WheelMetadata {
    name: name?,
    version: version?,
  })
}

pub fn wheel_sizes(path: &Path) -> Result<WheelSizes, WheelError> {
  let compressed = std::fs::metadata(path)
    .map_err(|source| WheelError::Read {
      path: path.to_path_buf(),
      source,
    })?
    .len();

  let mut archive = open(path)?;
  let mut uncompressed = 0;
  for i in 0..archive.len() {
    let file = archive.by_index(i).map_err(|source| WheelError::Archive {
      path: path.to_path_buf(),
      source,
    })?;
    uncompressed += file.size();
  }

  Ok(WheelSizes {
    compressed,
    uncompressed,
  })
}
