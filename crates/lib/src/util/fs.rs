//! Atomic file writes.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `content` to `path` by persisting a sibling temp file.
///
/// Readers never observe a partially written file, and a failed write leaves
/// any previous file at `path` untouched.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  std::fs::create_dir_all(parent)?;

  let mut file = NamedTempFile::new_in(parent)?;
  file.write_all(content)?;
  file.flush()?;
  file.persist(path).map_err(|e| e.error)?;
  Ok(())
}
