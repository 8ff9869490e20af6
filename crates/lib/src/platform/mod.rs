//! Build target detection.
//!
//! Platform-specific behavior is decided once: [`Target::current`] resolves the
//! OS family, architecture and pointer width at startup, and the resulting value
//! is threaded through configuration and rule selectors instead of being queried
//! ad hoc.

pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use arch::Arch;
pub use os::Os;

/// Resolved target flags for a build run (e.g., "x86_64-linux")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  pub arch: Arch,
  pub os: Os,
  pub is_64bit: bool,
}

impl Target {
  /// Create a target, deriving pointer width from the architecture
  pub fn new(arch: Arch, os: Os) -> Self {
    Self {
      arch,
      os,
      is_64bit: arch.is_64bit(),
    }
  }

  /// Detect the current target at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self::new(Arch::current()?, Os::current()?))
  }

  /// Returns the platform triple string (e.g., "aarch64-darwin")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

/// Predicate over a [`Target`] attached to configuration rules.
///
/// Every populated field must match; an empty selector matches all targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSelector {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub os: Option<Vec<Os>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub arch: Option<Vec<Arch>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_64bit: Option<bool>,
}

impl TargetSelector {
  pub fn matches(&self, target: &Target) -> bool {
    if let Some(os) = &self.os
      && !os.contains(&target.os)
    {
      return false;
    }
    if let Some(arch) = &self.arch
      && !arch.contains(&target.arch)
    {
      return false;
    }
    if let Some(is_64bit) = self.is_64bit
      && is_64bit != target.is_64bit
    {
      return false;
    }
    true
  }
}

/// Returns the platform triple for the current system (e.g., "aarch64-darwin")
///
/// Returns `None` if the current platform is not supported
pub fn platform_triple() -> Option<String> {
  Target::current().map(|t| t.triple())
}
