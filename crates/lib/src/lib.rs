//! wheelhouse-lib: Core logic for wheelhouse
//!
//! This crate builds a requirements manifest into a directory of wheels:
//! - `provision`: isolated build environment from a base interpreter
//! - `partition`: split the manifest into per-override buckets
//! - `build`: one `pip wheel` run per bucket into a shared directory
//! - `lock`: hash-pinned lock file verified against the built wheels
//! - `pipeline`: the steps above, in order

pub mod build;
pub mod config;
pub mod consts;
pub mod execute;
pub mod lock;
pub mod manifest;
pub mod partition;
pub mod pipeline;
pub mod platform;
pub mod provision;
pub mod util;
pub mod wheel;
