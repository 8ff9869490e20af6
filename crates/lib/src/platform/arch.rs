use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU architectures a build can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
  #[serde(rename = "x86_64")]
  X86_64,
  #[serde(rename = "aarch64")]
  Aarch64,
  #[serde(rename = "x86")]
  X86,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      "x86" => Some(Self::X86),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
      Self::X86 => "x86",
    }
  }

  /// Pointer width of the architecture, independent of the host process.
  pub fn is_64bit(&self) -> bool {
    !matches!(self, Self::X86)
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
