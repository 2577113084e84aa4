//! Execution coordinator: ties the process, collectors and watchdog together

use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::collector::{Collected, Collector, OutputCap, StreamKind};
use super::flags::{CancelToken, TerminationFlags};
use super::outcome::{Outcome, ProgramOutput};
use super::process::ProcessHandle;
use super::watchdog::Watchdog;
use crate::config::ExecutorConfig;
use crate::error::ExecError;
use crate::escape::{Escaper, HtmlEscaper};

/// Runs external programs under a wall-clock timeout and a stdout cap
pub struct Executor {
    config: ExecutorConfig,
    escaper: Arc<dyn Escaper>,
}

impl Executor {
    /// Create an executor that HTML-escapes captured output
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            escaper: Arc::new(HtmlEscaper),
        }
    }

    pub fn with_escaper<E: Escaper + 'static>(mut self, escaper: E) -> Self {
        self.escaper = Arc::new(escaper);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn escaper(&self) -> &dyn Escaper {
        self.escaper.as_ref()
    }

    /// Run `args[0]` with the remaining arguments and resolve its outcome
    ///
    /// Only a failure to create the process is returned as an error; every
    /// other failure is logged and folded into the outcome. The call returns
    /// within roughly `timeout + join_grace`.
    pub fn execute<S: AsRef<str>>(&self, args: &[S]) -> Result<Outcome, ExecError> {
        self.config.validate()?;
        let started = Instant::now();

        let process = Arc::new(ProcessHandle::start(args, self.config.poll_interval)?);
        let _guard = DestroyOnExit(Arc::clone(&process));
        process.close_input();

        let (stdout, stderr) = process
            .take_output_streams()
            .ok_or_else(|| ExecError::Spawn {
                program: process.program().to_string(),
                source: io::Error::other("child output pipes unavailable"),
            })?;

        let flags = TerminationFlags::new();
        let cancel = CancelToken::new();

        let on_overflow = {
            let flags = Arc::clone(&flags);
            let process = Arc::clone(&process);
            move || {
                flags.mark_output_too_long();
                process.destroy();
            }
        };
        let stdout_collector = Collector::new(
            StreamKind::Stdout,
            stdout,
            Arc::clone(&self.escaper),
            cancel.clone(),
        )
        .with_cap(OutputCap::new(self.config.max_output_size, on_overflow))
        .spawn();
        let stderr_collector = Collector::new(
            StreamKind::Stderr,
            stderr,
            Arc::clone(&self.escaper),
            cancel.clone(),
        )
        .spawn();

        let watchdog = {
            let flags = Arc::clone(&flags);
            let cancel = cancel.clone();
            let process = Arc::clone(&process);
            Watchdog::arm(self.config.timeout, move || {
                flags.mark_timed_out();
                cancel.cancel();
                process.destroy();
            })
        };

        let exit_code = match process.wait() {
            Ok(status) => status.code(),
            Err(e) => {
                error!(pid = process.pid(), error = %e, "failed to wait for process");
                process.destroy();
                None
            }
        };
        watchdog.disarm();

        let deadline = Instant::now() + self.config.join_grace;
        let stdout = stdout_collector.join(deadline);
        let stderr = stderr_collector.join(deadline);

        let outcome = resolve(&flags, exit_code, stdout, stderr);
        info!(
            pid = process.pid(),
            program = process.program(),
            outcome = outcome.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "execution finished"
        );
        Ok(outcome)
    }

    /// Execute and convert the outcome into the caller-facing result
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<ProgramOutput, ExecError> {
        let outcome = self.execute(args)?;
        Ok(outcome.into_program_output(&self.config.messages, self.escaper()))
    }
}

/// Execute `args` with an HTML-escaping executor built from `config`
pub fn execute<S: AsRef<str>>(args: &[S], config: &ExecutorConfig) -> Result<Outcome, ExecError> {
    Executor::new(config.clone()).execute(args)
}

/// Overflow takes precedence over timeout, timeout over completion
fn resolve(
    flags: &TerminationFlags,
    exit_code: Option<i32>,
    stdout: Option<Collected>,
    stderr: Option<Collected>,
) -> Outcome {
    if flags.is_output_too_long() {
        return Outcome::OutputTooLong;
    }
    if flags.is_timed_out() {
        return Outcome::TimedOut;
    }

    if stdout.is_none() || stderr.is_none() {
        warn!("returning without the output of an unfinished collector");
    }
    let text = |collected: Option<Collected>| collected.map(|c| c.text).unwrap_or_default();
    Outcome::Completed {
        stdout: text(stdout),
        stderr: text(stderr),
        exit_code,
    }
}

/// Destroys the process when the coordinator returns, on every path
struct DestroyOnExit(Arc<ProcessHandle>);

impl Drop for DestroyOnExit {
    fn drop(&mut self) {
        debug!(pid = self.0.pid(), "final destroy");
        self.0.destroy();
    }
}
