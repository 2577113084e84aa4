//! Bounded external-process execution
//!
//! An execution launches one child process and drives it to exactly one
//! [`Outcome`]:
//!
//! - **Completed**: the process ended on its own; its escaped stdout and
//!   stderr are returned line by line, each line followed by `\n`.
//! - **TimedOut**: the [`Watchdog`] fired after the configured timeout,
//!   cancelled both collectors and terminated the process.
//! - **OutputTooLong**: accumulated stdout crossed the configured cap; the
//!   stdout collector terminated the process and stopped reading.
//!
//! If both limits trigger, `OutputTooLong` is reported.
//!
//! # Threads
//!
//! One thread per output stream, one timer thread, and the calling thread,
//! which blocks on process exit and then on the collectors. Collectors that
//! have not finished `join_grace` after the process is gone are abandoned:
//! their threads leak until the stream they read from closes, and their
//! output is dropped. Terminating the process (and its process group) is
//! what unblocks a collector stuck in a read.
//!
//! Stderr is not capped.

mod collector;
mod coordinator;
mod flags;
mod outcome;
mod process;
mod watchdog;


pub use collector::{Collected, Collector, CollectorHandle, OutputCap, StopReason, StreamKind};
pub use coordinator::{execute, Executor};
pub use flags::{CancelToken, TerminationFlags};
pub use outcome::{Outcome, ProgramOutput};
pub use process::ProcessHandle;
pub use watchdog::Watchdog;
