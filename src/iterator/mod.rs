//! Iterator Module
//!
//! Lazy, single-pass sequences of typed records produced by scans.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ RecordIterator<T>                           │
//! │   decode via Codec<T>, keep if predicate    │
//! ├─────────────────────────────────────────────┤
//! │ RawCursor                                   │
//! │   (key, value, more) pulls + context check  │
//! ├─────────────────────────────────────────────┤
//! │ RawSource (memory index walk / file relay)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Pull Protocol
//! `has_next()` answers "is there something left to report", which includes
//! an error not yet handed out. The first call fetches the first match, so an
//! empty range or an always-rejecting predicate reports false straight away.
//! `value()` returns the buffered record and pre-fetches the next match. Terminal states are sticky: after
//! exhaustion every `value()` returns `IteratorDone`, after a failure every
//! `value()` returns that failure.
//!
//! A decode failure is never skipped: it ends the scan with `RowError::Codec`.

mod raw;

pub use raw::{RawCursor, RawEntry, RawSource};

use crate::error::{Result, RowError};
use crate::record::Codec;

/// Boxed predicate over decoded records
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send>;

enum State<T> {
    /// Nothing fetched yet
    Pending,

    /// Next matching record, ready to hand out
    Ready { key: Vec<u8>, record: T },

    /// Source drained
    Exhausted,

    /// Terminal error; `reported` once handed to the caller
    Failed { error: RowError, reported: bool },
}

/// Decoding, filtering iterator over a scan
pub struct RecordIterator<T> {
    raw: RawCursor,
    codec: Box<dyn Codec<T>>,
    predicate: Predicate<T>,
    state: State<T>,
}

impl<T> RecordIterator<T> {
    /// Wrap a raw cursor with a codec and predicate
    ///
    /// Nothing is pulled until the first `has_next()` or `value()`.
    pub fn new<C, P>(raw: RawCursor, codec: C, predicate: P) -> Self
    where
        C: Codec<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
    {
        Self {
            raw,
            codec: Box::new(codec),
            predicate: Box::new(predicate),
            state: State::Pending,
        }
    }

    /// An iterator whose first `value()` returns `error`
    pub fn failed<C>(error: RowError, codec: C) -> Self
    where
        C: Codec<T> + 'static,
    {
        Self {
            raw: RawCursor::empty(),
            codec: Box::new(codec),
            predicate: Box::new(|_: &T| false),
            state: State::Failed { error, reported: false },
        }
    }

    /// Whether a call to `value()` will yield a record or an unreported error
    pub fn has_next(&mut self) -> bool {
        if let State::Pending = self.state {
            self.advance();
        }
        match &self.state {
            State::Ready { .. } => true,
            State::Failed { reported, .. } => !reported,
            State::Exhausted | State::Pending => false,
        }
    }

    /// Take the current record and pre-fetch the next one
    pub fn value(&mut self) -> Result<(Vec<u8>, T)> {
        if let State::Pending = self.state {
            self.advance();
        }

        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Ready { key, record } => {
                self.advance();
                Ok((key, record))
            }
            State::Failed { error, .. } => {
                self.state = State::Failed {
                    error: error.clone(),
                    reported: true,
                };
                Err(error)
            }
            State::Exhausted | State::Pending => Err(RowError::IteratorDone),
        }
    }

    /// Move to the next record that decodes and passes the predicate
    fn advance(&mut self) {
        while self.raw.has_next() {
            let (key, bytes) = match self.raw.pull() {
                Ok(Some(pair)) => pair,
                Ok(None) => break,
                Err(error) => {
                    self.state = State::Failed { error, reported: false };
                    return;
                }
            };

            let record = match self.codec.decode(&bytes) {
                Ok(record) => record,
                Err(error) => {
                    tracing::debug!("scan stopped on undecodable record: {}", error);
                    self.state = State::Failed { error, reported: false };
                    return;
                }
            };

            if (self.predicate)(&record) {
                self.state = State::Ready { key, record };
                return;
            }
        }
        self.state = State::Exhausted;
    }
}

impl<T> Iterator for RecordIterator<T> {
    type Item = Result<(Vec<u8>, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        match self.value() {
            Err(RowError::IteratorDone) => None,
            item => Some(item),
        }
    }
}

impl<T> std::fmt::Debug for RecordIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Pending => "pending",
            State::Ready { .. } => "ready",
            State::Exhausted => "exhausted",
            State::Failed { .. } => "failed",
        };
        f.debug_struct("RecordIterator")
            .field("state", &state)
            .field("raw", &self.raw)
            .finish()
    }
}
