//! End-to-end tests that run `wheelhouse build` against a fake interpreter.

#[cfg(unix)]
mod build_tests;
#[cfg(unix)]
mod common;
#[cfg(unix)]
mod lock_tests;
