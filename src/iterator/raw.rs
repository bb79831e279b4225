//! Raw Cursor
//!
//! The lowest iteration layer: undecoded key/value pairs pulled one at a time
//! from a backend, with the scan context checked before every pull.

use crate::context::ScanContext;
use crate::error::{Result, RowError};

/// One undecoded element of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,

    /// False when this is the last element the source will produce
    pub more: bool,
}

impl RawEntry {
    pub fn new(key: Vec<u8>, value: Vec<u8>, more: bool) -> Self {
        Self { key, value, more }
    }
}

/// A pull-based source of raw entries
///
/// `Ok(None)` means the source has nothing (more) to give. An `Err` is
/// terminal; the source is not pulled again afterwards.
pub trait RawSource: Send {
    fn pull(&mut self) -> Result<Option<RawEntry>>;
}

impl<F> RawSource for F
where
    F: FnMut() -> Result<Option<RawEntry>> + Send,
{
    fn pull(&mut self) -> Result<Option<RawEntry>> {
        self()
    }
}

#[derive(Debug)]
enum CursorState {
    Active,
    Exhausted,
    Failed(RowError),
}

/// Cancellable, single-pass cursor over a [`RawSource`]
///
/// Once exhausted or failed the source is dropped; for the file backend this
/// releases the handoff channel so the producer thread can unwind.
pub struct RawCursor {
    ctx: ScanContext,
    source: Option<Box<dyn RawSource>>,
    state: CursorState,
}

impl RawCursor {
    pub fn new(ctx: ScanContext, source: impl RawSource + 'static) -> Self {
        Self {
            ctx,
            source: Some(Box::new(source)),
            state: CursorState::Active,
        }
    }

    /// A cursor over an empty range
    pub fn empty() -> Self {
        Self {
            ctx: ScanContext::background(),
            source: None,
            state: CursorState::Exhausted,
        }
    }

    /// Whether another pull may produce something (an entry or an error)
    pub fn has_next(&self) -> bool {
        matches!(self.state, CursorState::Active)
    }

    /// Pull the next key/value pair
    ///
    /// Returns `Ok(None)` if the source ended without another entry,
    /// `Err(IteratorDone)` once exhausted, and the same error forever after a
    /// failure.
    pub fn pull(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &self.state {
            CursorState::Failed(err) => return Err(err.clone()),
            CursorState::Exhausted => return Err(RowError::IteratorDone),
            CursorState::Active => {}
        }

        if let Some(err) = self.ctx.err() {
            return Err(self.fail(err));
        }

        let pulled = match self.source.as_mut() {
            Some(source) => source.pull(),
            None => Ok(None),
        };

        match pulled {
            Ok(Some(entry)) => {
                if !entry.more {
                    self.finish();
                }
                Ok(Some((entry.key, entry.value)))
            }
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn finish(&mut self) {
        self.state = CursorState::Exhausted;
        self.source = None;
    }

    fn fail(&mut self, err: RowError) -> RowError {
        self.state = CursorState::Failed(err.clone());
        self.source = None;
        err
    }
}

impl std::fmt::Debug for RawCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCursor")
            .field("state", &self.state)
            .field("deadline", &self.ctx.deadline())
            .finish()
    }
}
