//! OS process handle with idempotent termination

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::error::ExecError;

struct ChildState {
    child: Child,
    /// Set once the child has been reaped; `destroy` is a no-op afterwards
    status: Option<ExitStatus>,
}

/// A running child process
///
/// The child is the leader of its own process group so that termination
/// reaches anything it started. All methods take `&self`; the handle is
/// shared between the coordinator, the watchdog and the stdout collector.
pub struct ProcessHandle {
    pid: u32,
    program: String,
    poll_interval: Duration,
    /// Set by `destroy`; a `wait` holding the lock kills on its behalf
    kill_requested: AtomicBool,
    state: Mutex<ChildState>,
}

impl ProcessHandle {
    /// Spawn `args[0]` with the remaining elements as arguments
    ///
    /// All three standard streams are piped. Call [`close_input`](Self::close_input)
    /// straight away so the child sees end-of-file on stdin.
    pub fn start<S: AsRef<str>>(args: &[S], poll_interval: Duration) -> Result<Self, ExecError> {
        let (program, rest) = args.split_first().ok_or(ExecError::EmptyCommand)?;
        let program = AsRef::<str>::as_ref(program).to_string();

        let mut cmd = Command::new(&program);
        cmd.args(rest.iter().map(|arg| AsRef::<str>::as_ref(arg)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        let pid = child.id();
        debug!(pid, program = %program, "process spawned");

        Ok(Self {
            pid,
            program,
            poll_interval,
            kill_requested: AtomicBool::new(false),
            state: Mutex::new(ChildState {
                child,
                status: None,
            }),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Close the child's stdin
    pub fn close_input(&self) {
        drop(self.lock().child.stdin.take());
    }

    /// Hand the stdout and stderr pipes to their collectors
    ///
    /// Returns `None` if they were already taken.
    pub fn take_output_streams(&self) -> Option<(ChildStdout, ChildStderr)> {
        let mut state = self.lock();
        let stdout = state.child.stdout.take()?;
        let stderr = state.child.stderr.take()?;
        Some((stdout, stderr))
    }

    /// Block until the child has exited, either naturally or through `destroy`
    ///
    /// The lock is held across each timed wait of one poll interval. A
    /// `destroy` issued meanwhile is carried out before the next timed wait.
    /// Once the leader is reaped, any process still left in its group is
    /// killed so that no descendant keeps the output pipes open.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        loop {
            let mut state = self.lock();
            if let Some(status) = state.status {
                return Ok(status);
            }
            if self.kill_requested.load(Ordering::SeqCst) {
                self.kill(&mut state);
            }
            if let Some(status) = state.child.wait_timeout(self.poll_interval)? {
                state.status = Some(status);
                self.signal_group();
                debug!(pid = self.pid, ?status, "process reaped");
                return Ok(status);
            }
        }
    }

    /// Exit status if the child has already been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.lock().status
    }

    /// Forcefully terminate the child and its process group
    ///
    /// Safe to call from any thread, any number of times, and after the
    /// child has exited. Never blocks: if another thread holds the handle,
    /// the kill is left to the `wait` loop.
    pub fn destroy(&self) {
        self.kill_requested.store(true, Ordering::SeqCst);
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!(pid = self.pid, "handle busy, kill deferred to wait");
                return;
            }
        };
        self.kill(&mut state);
    }

    fn kill(&self, state: &mut ChildState) {
        if state.status.is_some() {
            return;
        }

        self.signal_group();
        // Covers a failed group signal; an exited but unreaped child accepts it.
        if let Err(e) = state.child.kill() {
            debug!(pid = self.pid, error = %e, "kill after group signal failed");
        }
    }

    fn signal_group(&self) {
        let Ok(raw) = i32::try_from(self.pid) else {
            return;
        };

        match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => debug!(pid = self.pid, error = %e, "failed to signal process group"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChildState> {
        // The guarded Child stays valid even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .finish()
    }
}
