//! Requirement manifests.
//!
//! A manifest is the ordered list of raw requirement lines (`name==version`,
//! optionally with extras and markers) the build starts from. Lines stay
//! opaque text; only the package name is parsed out, for rule matching.

mod name;
mod types;

pub(crate) use name::strip_comment;
pub use name::{is_valid_project_name, normalize_name, requirement_name};
pub use types::*;
