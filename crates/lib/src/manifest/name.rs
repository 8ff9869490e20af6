use std::sync::LazyLock;

use regex::Regex;

static UNNORMALIZED_NAME_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[-_.]+").expect("static regex is valid"));

static VALID_PROJECT_NAME: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$").expect("static regex is valid")
});

/// Normalize a project name: lowercase, runs of `-`, `_` and `.` become `-`.
///
/// See <https://peps.python.org/pep-0503/#normalized-names>.
pub fn normalize_name(name: &str) -> String {
  UNNORMALIZED_NAME_CHARS.replace_all(name, "-").to_lowercase()
}

/// Whether `name` is a syntactically valid project name.
///
/// See <https://peps.python.org/pep-0508/#names>.
pub fn is_valid_project_name(name: &str) -> bool {
  VALID_PROJECT_NAME.is_match(name)
}

/// Extract the normalized project name from a requirement line.
///
/// Returns `None` for blank lines, comments and pip option lines (`-c ...`,
/// `--hash ...`). Extras, version specifiers and markers are ignored:
/// `Foo_Bar[extra]>=1.0; python_version < "3"` yields `foo-bar`.
pub fn requirement_name(line: &str) -> Option<String> {
  let line = strip_comment(line).trim();
  if line.is_empty() || line.starts_with('-') {
    return None;
  }

  let end = line
    .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    .unwrap_or(line.len());
  let name = &line[..end];

  if is_valid_project_name(name) {
    Some(normalize_name(name))
  } else {
    None
  }
}

/// Strip a trailing `#` comment. pip only treats `#` as a comment at the start
/// of a line or after whitespace.
pub(crate) fn strip_comment(line: &str) -> &str {
  if line.trim_start().starts_with('#') {
    return "";
  }
  match line.find(" #").or_else(|| line.find("\t#")) {
    Some(pos) => &line[..pos],
    None => line,
  }
}
