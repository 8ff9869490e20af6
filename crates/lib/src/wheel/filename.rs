use std::fmt;
use std::str::FromStr;

use crate::manifest::normalize_name;

use super::WheelError;

/// Components of a wheel file name:
/// `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`.
///
/// See <https://packaging.python.org/en/latest/specifications/binary-distribution-format/>.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WheelFilename {
  pub name: String,
  pub version: String,
  pub build: Option<String>,
  pub python_tag: String,
  pub abi_tag: String,
  pub platform_tag: String,
}

impl WheelFilename {
  /// Project name normalized for comparison with requirement names.
  pub fn normalized_name(&self) -> String {
    normalize_name(&self.name)
  }

  /// Whether the wheel is platform independent (`any`).
  pub fn is_pure(&self) -> bool {
    self.platform_tag == "any"
  }
}

impl FromStr for WheelFilename {
  type Err = WheelError;

  fn from_str(file_name: &str) -> Result<Self, Self::Err> {
    let invalid = || WheelError::InvalidFilename(file_name.to_string());

    let stem = file_name.strip_suffix(".whl").ok_or_else(invalid)?;
    let parts: Vec<&str> = stem.split('-').collect();
    if parts.iter().any(|p| p.is_empty()) {
      return Err(invalid());
    }

    let (name, version, build, tags) = match parts.as_slice() {
      [name, version, py, abi, plat] => (name, version, None, [py, abi, plat]),
      [name, version, build, py, abi, plat] => {
        if !build.starts_with(|c: char| c.is_ascii_digit()) {
          return Err(invalid());
        }
        (name, version, Some(build.to_string()), [py, abi, plat])
      }
      _ => return Err(invalid()),
    };

    Ok(Self {
      name: name.to_string(),
      version: version.to_string(),
      build,
      python_tag: tags[0].to_string(),
      abi_tag: tags[1].to_string(),
      platform_tag: tags[2].to_string(),
    })
  }
}

impl fmt::Display for WheelFilename {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.name, self.version)?;
    if let Some(build) = &self.build {
      write!(f, "-{}", build)?;
    }
    write!(f, "-{}-{}-{}.whl", self.python_tag, self.abi_tag, self.platform_tag)
  }
}
