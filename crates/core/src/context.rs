//! Per-call cancellation and deadlines.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use miette::Diagnostic;
use thiserror::Error;

/// Why a call was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
pub enum Interrupted {
    #[error("cancelled")]
    #[diagnostic(code(hookhost::call::cancelled))]
    Cancelled,

    #[error("deadline exceeded")]
    #[diagnostic(code(hookhost::call::deadline))]
    DeadlineExceeded,
}

/// Cancellation flag and optional deadline carried by one call.
///
/// Clones share the flag, so a caller can keep a clone and cancel work that
/// is running elsewhere:
///
/// ```
/// use hookhost_core::{CallContext, Interrupted};
///
/// let ctx = CallContext::new();
/// let handle = ctx.clone();
/// assert!(ctx.check().is_ok());
///
/// handle.cancel();
/// assert_eq!(ctx.check(), Err(Interrupted::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets an absolute deadline. An earlier deadline already set wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails once the context is cancelled or past its deadline.
    /// Cancellation is reported first.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
