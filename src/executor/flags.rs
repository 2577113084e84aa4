//! State shared between the coordinator, the watchdog and the collectors

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Write-once termination flags
///
/// Both flags only ever go from `false` to `true`. The coordinator reads them
/// after the process has been reaped, by which point every trigger that could
/// have ended the process has already stored its flag.
#[derive(Debug, Default)]
pub struct TerminationFlags {
    timed_out: AtomicBool,
    output_too_long: AtomicBool,
}

impl TerminationFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns `true` if this call was the one that set the flag
    pub fn mark_timed_out(&self) -> bool {
        !self.timed_out.swap(true, Ordering::SeqCst)
    }

    /// Returns `true` if this call was the one that set the flag
    pub fn mark_output_too_long(&self) -> bool {
        !self.output_too_long.swap(true, Ordering::SeqCst)
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    pub fn is_output_too_long(&self) -> bool {
        self.output_too_long.load(Ordering::SeqCst)
    }
}

/// Cooperative stop signal checked by collectors between reads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_clear() {
        let flags = TerminationFlags::new();
        assert!(!flags.is_timed_out());
        assert!(!flags.is_output_too_long());
    }

    #[test]
    fn test_flags_are_write_once() {
        let flags = TerminationFlags::new();
        assert!(flags.mark_timed_out());
        assert!(!flags.mark_timed_out());
        assert!(flags.is_timed_out());
        assert!(!flags.is_output_too_long());

        assert!(flags.mark_output_too_long());
        assert!(!flags.mark_output_too_long());
        assert!(flags.is_output_too_long());
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
