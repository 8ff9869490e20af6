//! Subprocess execution.
//!
//! Every external tool the orchestrator drives (venv creation, pip, the lock
//! generator) is described as an [`Invocation`] and handed to a
//! [`CommandRunner`]. [`ProcessRunner`] spawns real processes; tests substitute
//! a recording runner so argument lists and ordering can be asserted without a
//! Python toolchain.

pub mod cmd;
pub mod types;

pub use cmd::ProcessRunner;
pub use types::{CommandRunner, ExecuteError, Invocation};
