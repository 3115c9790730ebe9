//! Command sessions
//!
//! A [`CommandSession`] runs one command at a time over a borrowed
//! [`crate::transport::RemoteConnection`], capturing stdout and stderr
//! concurrently and bounding the wait with a timeout.

pub mod command;
pub mod reader;
pub mod stderr;

pub use command::{CommandOutput, CommandResult, CommandSession, ExecPolicy};
pub use reader::{Captured, CapturedOutput, DualStreamCapture, StreamReader};
pub use stderr::{DEFAULT_STDERR_ALLOWLIST, StderrAllowList};
