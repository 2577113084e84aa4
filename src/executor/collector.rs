//! Line collectors draining the child's stdout and stderr
//!
//! Each collector runs on its own thread and owns its buffer until it
//! finishes; the buffer is handed to the coordinator through a channel, so
//! the coordinator never observes a partially written buffer.

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use super::flags::CancelToken;
use crate::escape::Escaper;

/// Which standard stream a collector drains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Why a collector stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    CapExceeded,
    ReadError,
}

/// Buffer accumulated by a finished collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub text: String,
    pub stop: StopReason,
}

/// Size limit on a collector's buffer and the action taken when it is crossed
pub struct OutputCap {
    limit: usize,
    on_exceeded: Box<dyn FnOnce() + Send>,
}

impl OutputCap {
    pub fn new<F>(limit: usize, on_exceeded: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            limit,
            on_exceeded: Box::new(on_exceeded),
        }
    }
}

/// Reads one stream line by line, escaping and accumulating each line
pub struct Collector<R> {
    kind: StreamKind,
    reader: BufReader<R>,
    escaper: Arc<dyn Escaper>,
    cancel: CancelToken,
    cap: Option<OutputCap>,
}

impl<R: Read> Collector<R> {
    pub fn new(kind: StreamKind, stream: R, escaper: Arc<dyn Escaper>, cancel: CancelToken) -> Self {
        Self {
            kind,
            reader: BufReader::new(stream),
            escaper,
            cancel,
            cap: None,
        }
    }

    pub fn with_cap(mut self, cap: OutputCap) -> Self {
        self.cap = Some(cap);
        self
    }

    /// Read until end-of-stream, cancellation, the cap, or a read error
    pub fn run(mut self) -> Collected {
        let mut buffer = String::new();
        let mut line = Vec::new();

        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            line.clear();
            let budget_exhausted = match self.read_line(&mut line, buffer.len()) {
                Ok((0, _)) => break StopReason::EndOfStream,
                Ok((_, exhausted)) => exhausted,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.cancel.is_cancelled() {
                        break StopReason::Cancelled;
                    }
                    warn!(stream = self.kind.name(), error = %e, "failed to read process output");
                    break StopReason::ReadError;
                }
            };

            buffer.push_str(&self.escaper.escape(&decode_line(&line)));
            buffer.push('\n');

            if let Some(cap) = &self.cap {
                if buffer.len() > cap.limit || budget_exhausted {
                    break StopReason::CapExceeded;
                }
            }
        };

        if stop == StopReason::CapExceeded {
            if let Some(cap) = self.cap.take() {
                debug!(stream = self.kind.name(), limit = cap.limit, "output cap exceeded");
                (cap.on_exceeded)();
            }
        }

        debug!(stream = self.kind.name(), bytes = buffer.len(), ?stop, "collector finished");
        Collected { text: buffer, stop }
    }

    /// Read one raw line
    ///
    /// A capped collector reads at most one byte more than the room left
    /// under its limit. Running out of that budget before the line ends
    /// means the line alone crosses the limit, given that escaping never
    /// shortens text, so the flag returned alongside the byte count is set.
    fn read_line(&mut self, line: &mut Vec<u8>, buffered: usize) -> io::Result<(usize, bool)> {
        match &self.cap {
            Some(cap) => {
                let budget = cap.limit.saturating_sub(buffered).saturating_add(1);
                let n = self
                    .reader
                    .by_ref()
                    .take(budget as u64)
                    .read_until(b'\n', line)?;
                Ok((n, n == budget && !line.ends_with(b"\n")))
            }
            None => Ok((self.reader.read_until(b'\n', line)?, false)),
        }
    }
}

impl<R: Read + Send + 'static> Collector<R> {
    /// Run on a dedicated thread
    pub fn spawn(self) -> CollectorHandle {
        let kind = self.kind;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(self.run());
        });
        CollectorHandle { kind, rx }
    }
}

/// Receiving end of a spawned collector
pub struct CollectorHandle {
    kind: StreamKind,
    rx: Receiver<Collected>,
}

impl CollectorHandle {
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Wait for the collector's buffer until `deadline`
    ///
    /// Returns `None` if the collector is still running at the deadline; its
    /// thread is abandoned and whatever it accumulated is discarded.
    pub fn join(self, deadline: Instant) -> Option<Collected> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(collected) => Some(collected),
            Err(RecvTimeoutError::Timeout) => {
                warn!(stream = self.kind.name(), "collector did not finish within the grace period");
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(stream = self.kind.name(), "collector thread exited without a result");
                None
            }
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}
