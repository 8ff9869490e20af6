//! PEP 440 versions.
//!
//! Only parsing and ordering: enough to tell whether a wheel is the one a
//! lock entry pins, and which of two builds of a project is newer.
//!
//! See <https://peps.python.org/pep-0440/>.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::WheelError;

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?ix)^\s*v?
      (?:(?P<epoch>[0-9]+)!)?
      (?P<release>[0-9]+(?:\.[0-9]+)*)
      (?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
      (?:-(?P<post_implicit>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n>[0-9]+)?)?
      (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
      (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
    \s*$",
  )
  .expect("static regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKind {
  Alpha = 1,
  Beta = 2,
  Rc = 3,
}

impl PreKind {
  fn from_label(label: &str) -> Self {
    match label.to_ascii_lowercase().as_str() {
      "alpha" | "a" => PreKind::Alpha,
      "beta" | "b" => PreKind::Beta,
      _ => PreKind::Rc,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      PreKind::Alpha => "a",
      PreKind::Beta => "b",
      PreKind::Rc => "rc",
    }
  }
}

/// Text segments sort before numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalSegment {
  Text(String),
  Number(u64),
}

impl fmt::Display for LocalSegment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LocalSegment::Text(text) => f.write_str(text),
      LocalSegment::Number(n) => write!(f, "{}", n),
    }
  }
}

/// A parsed version. Equality and ordering follow PEP 440, so `1.0` equals
/// `1.0.0` and `1.0rc1` equals `1.0-RC.1`; `Display` gives the normalized form.
#[derive(Debug, Clone)]
pub struct Version {
  epoch: u64,
  release: Vec<u64>,
  pre: Option<(PreKind, u64)>,
  post: Option<u64>,
  dev: Option<u64>,
  local: Vec<LocalSegment>,
}

type CmpKey<'a> = (u64, &'a [u64], (u8, u64), Option<u64>, (u8, u64), Option<&'a [LocalSegment]>);

impl Version {
  pub fn release(&self) -> &[u64] {
    &self.release
  }

  pub fn is_prerelease(&self) -> bool {
    self.pre.is_some() || self.dev.is_some()
  }

  fn cmp_key(&self) -> CmpKey<'_> {
    let significant = self.release.iter().rposition(|&n| n != 0).map_or(0, |i| i + 1);

    // A bare dev release sorts before every pre-release of the same release.
    let pre = match (self.pre, self.post, self.dev) {
      (Some((kind, n)), _, _) => (kind as u8, n),
      (None, None, Some(_)) => (0, 0),
      (None, _, _) => (u8::MAX, 0),
    };
    let dev = match self.dev {
      Some(n) => (0, n),
      None => (1, 0),
    };
    let local = (!self.local.is_empty()).then_some(self.local.as_slice());

    (self.epoch, &self.release[..significant], pre, self.post, dev, local)
  }
}

fn number(version: &str, digits: &str) -> Result<u64, WheelError> {
  digits
    .parse()
    .map_err(|_| WheelError::InvalidVersion(version.to_string()))
}

impl FromStr for Version {
  type Err = WheelError;

  fn from_str(version: &str) -> Result<Self, Self::Err> {
    let caps = VERSION
      .captures(version)
      .ok_or_else(|| WheelError::InvalidVersion(version.to_string()))?;
    let optional = |group: &str| -> Result<Option<u64>, WheelError> {
      caps.name(group).map(|m| number(version, m.as_str())).transpose()
    };

    let epoch = optional("epoch")?.unwrap_or(0);
    let release = caps["release"]
      .split('.')
      .map(|part| number(version, part))
      .collect::<Result<Vec<_>, _>>()?;

    let pre = match caps.name("pre_l") {
      Some(label) => Some((PreKind::from_label(label.as_str()), optional("pre_n")?.unwrap_or(0))),
      None => None,
    };
    let post = match (optional("post_implicit")?, caps.name("post_l")) {
      (Some(n), _) => Some(n),
      (None, Some(_)) => Some(optional("post_n")?.unwrap_or(0)),
      (None, None) => None,
    };
    let dev = match caps.name("dev_l") {
      Some(_) => Some(optional("dev_n")?.unwrap_or(0)),
      None => None,
    };
    let local = caps
      .name("local")
      .map(|m| {
        m.as_str()
          .split(['-', '_', '.'])
          .map(|segment| match segment.parse() {
            Ok(n) if segment.bytes().all(|b| b.is_ascii_digit()) => LocalSegment::Number(n),
            _ => LocalSegment::Text(segment.to_ascii_lowercase()),
          })
          .collect()
      })
      .unwrap_or_default();

    Ok(Self {
      epoch,
      release,
      pre,
      post,
      dev,
      local,
    })
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.epoch != 0 {
      write!(f, "{}!", self.epoch)?;
    }
    let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
    f.write_str(&release.join("."))?;
    if let Some((kind, n)) = self.pre {
      write!(f, "{}{}", kind.as_str(), n)?;
    }
    if let Some(n) = self.post {
      write!(f, ".post{}", n)?;
    }
    if let Some(n) = self.dev {
      write!(f, ".dev{}", n)?;
    }
    if !self.local.is_empty() {
      let local: Vec<String> = self.local.iter().map(LocalSegment::to_string).collect();
      write!(f, "+{}", local.join("."))?;
    }
    Ok(())
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Version {}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    self.cmp_key().cmp(&other.cmp_key())
  }
}

/// Whether two version strings name the same release. Strings that do not
/// parse as PEP 440 only match themselves.
pub fn same_version(a: &str, b: &str) -> bool {
  match (a.parse::<Version>(), b.parse::<Version>()) {
    (Ok(a), Ok(b)) => a == b,
    _ => a == b,
  }
}

/// Order two version strings, placing unparseable ones first and comparing
/// those as text.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
  match (a.parse::<Version>(), b.parse::<Version>()) {
    (Ok(a), Ok(b)) => a.cmp(&b),
    (Ok(_), Err(_)) => Ordering::Greater,
    (Err(_), Ok(_)) => Ordering::Less,
    (Err(_), Err(_)) => a.cmp(b),
  }
}
