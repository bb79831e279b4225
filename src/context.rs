//! Scan Context
//!
//! Cancellation and deadline signal carried by every scan.
//!
//! A context is observed two ways:
//! - polled with [`ScanContext::err`] before each pull
//! - selected on through [`ScanContext::cancelled`] and
//!   [`ScanContext::deadline_signal`] while blocked waiting for a producer
//!
//! Cancellation is signalled by dropping the only sender of a channel, so every
//! clone of the receiver observes the disconnect at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::RowError;

type Trigger = Arc<Mutex<Option<Sender<()>>>>;

/// Cancellation/deadline signal for one scan
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Disconnected once the context is cancelled
    cancelled: Receiver<()>,

    /// Absolute deadline, if any
    deadline: Option<Instant>,

    /// Keeps the sender alive for as long as any clone of the context lives,
    /// so dropping the handle alone does not cancel
    _trigger: Option<Trigger>,
}

/// Fires cancellation for the contexts it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    trigger: Trigger,
}

impl ScanContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self {
            cancelled: channel::never(),
            deadline: None,
            _trigger: None,
        }
    }

    /// A context cancelled through the returned handle
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = channel::bounded(0);
        let trigger = Arc::new(Mutex::new(Some(tx)));
        let ctx = Self {
            cancelled: rx,
            deadline: None,
            _trigger: Some(Arc::clone(&trigger)),
        };
        (ctx, CancelHandle { trigger })
    }

    /// Shorthand for a background context with a relative deadline
    pub fn timeout(timeout: Duration) -> Self {
        Self::background().with_timeout(timeout)
    }

    /// Tighten the deadline to `now + timeout` (an earlier deadline is kept)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            // Too far out to represent; same as no deadline
            None => self,
        }
    }

    /// Tighten the deadline to `deadline` (an earlier deadline is kept)
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    /// The absolute deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check: the terminal error if the context already fired
    pub fn err(&self) -> Option<RowError> {
        if let Err(channel::TryRecvError::Disconnected) = self.cancelled.try_recv() {
            return Some(RowError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(RowError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Receiver that becomes ready (disconnected) on cancellation
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.cancelled
    }

    /// Receiver that delivers once the deadline passes, or never
    pub fn deadline_signal(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        }
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CancelHandle {
    /// Cancel every context sharing this handle. Idempotent.
    pub fn cancel(&self) {
        self.trigger.lock().take();
    }
}
