//! Shared utilities.
//!
//! Common utilities used across the crate including hashing and atomic file writes.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;
