//! File Store
//!
//! Durable backend on redb. Each bucket lives in its own database file with
//! one table named after the bucket.
//!
//! ## Scan Relay
//! A redb range is only valid inside its read transaction, so every scan runs
//! its transaction on a dedicated producer thread and hands elements to the
//! consumer over a zero-capacity channel:
//!
//! ```text
//!   producer thread                         consumer (RawCursor::pull)
//!   ───────────────                         ──────────────────────────
//!   begin_read, open_table, range
//!   loop:
//!     select { send(entry) ─────rendezvous────▶ select { recv(entry)
//!              cancelled   ◀───── ctx ───────▶         cancelled
//!              deadline }                              deadline
//!   send(outcome) ──────────── done ─────────▶         recv(done) }
//! ```
//!
//! Keys and values are copied out of the transaction before they are sent.
//! The producer stops at its next step once the consumer is gone (receiver
//! dropped), the context fires, or the store is closed. A redb transaction is
//! never aborted mid-range.
//!
//! ## Close
//! Every producer and relay also watches the store's `closed` receiver.
//! `close()` drops the matching sender, so producers unwind and release their
//! database handle, and open scans report `StoreClosed` on their next pull.
//! The file lock is gone once the last producer has ended.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use crossbeam::select;
use parking_lot::Mutex;
use redb::{Database, DatabaseError, ReadableTable, TableDefinition};

use crate::context::ScanContext;
use crate::error::{Result, RowError};
use crate::iterator::{RawCursor, RawEntry, RawSource};

use super::Store;

/// Pause between attempts to take the file lock
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Name given to scan producer threads
const SCAN_THREAD_NAME: &str = "rowstore-scan";

fn table(bucket: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(bucket)
}

/// File-backed store
pub struct FileStore {
    /// `None` once closed
    db: Mutex<Option<Arc<Database>>>,
    /// Dropped on close to wake every producer and relay
    shutdown: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
    bucket: String,
    path: PathBuf,
}

impl FileStore {
    /// Open or create the bucket file at `path`
    ///
    /// Waits up to `lock_timeout` for another holder of the file to release
    /// it, then makes sure the bucket's table exists.
    pub fn open(bucket: &str, path: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = open_database(&path, lock_timeout)?;
        ensure_table(&db, bucket)?;

        tracing::debug!("opened bucket {} at {}", bucket, path.display());

        let (shutdown, closed) = channel::bounded(0);
        Ok(Self {
            db: Mutex::new(Some(Arc::new(db))),
            shutdown: Mutex::new(Some(shutdown)),
            closed,
            bucket: bucket.to_string(),
            path,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn database(&self) -> Result<Arc<Database>> {
        self.db.lock().as_ref().map(Arc::clone).ok_or(RowError::StoreClosed)
    }
}

/// True once the store's shutdown sender is gone
fn is_closed(closed: &Receiver<()>) -> bool {
    matches!(closed.try_recv(), Err(TryRecvError::Disconnected))
}

fn open_database(path: &Path, lock_timeout: Duration) -> Result<Database> {
    let deadline = Instant::now() + lock_timeout;
    loop {
        match Database::create(path) {
            Ok(db) => return Ok(db),
            Err(DatabaseError::DatabaseAlreadyOpen) if Instant::now() < deadline => {
                thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(DatabaseError::DatabaseAlreadyOpen) => {
                return Err(RowError::Engine(format!(
                    "timed out after {:?} waiting for lock on {}",
                    lock_timeout,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn ensure_table(db: &Database, bucket: &str) -> Result<()> {
    let txn = db.begin_write()?;
    txn.open_table(table(bucket))?;
    txn.commit()?;
    Ok(())
}

impl Store for FileStore {
    fn set_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let db = self.database()?;
        let txn = db.begin_write()?;
        {
            let mut t = txn.open_table(table(&self.bucket))?;
            t.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Vec<u8>> {
        let db = self.database()?;
        let txn = db.begin_read()?;
        let t = txn.open_table(table(&self.bucket))?;
        let value = t.get(key)?.ok_or(RowError::KeyNotFound)?;
        Ok(value.value().to_vec())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let db = self.database()?;
        let txn = db.begin_write()?;
        {
            let mut t = txn.open_table(table(&self.bucket))?;
            t.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn scan_raw(&self, ctx: &ScanContext, from_key: &[u8], to_key: &[u8]) -> Result<RawCursor> {
        let db = self.database()?;
        if from_key > to_key {
            return Ok(RawCursor::empty());
        }

        let (items_tx, items_rx) = channel::bounded(0);
        let (done_tx, done_rx) = channel::bounded(1);

        let producer = Producer {
            db,
            bucket: self.bucket.clone(),
            from_key: from_key.to_vec(),
            to_key: to_key.to_vec(),
            items: items_tx,
            ctx: ctx.clone(),
            closed: self.closed.clone(),
        };

        thread::Builder::new()
            .name(SCAN_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = producer.run();
                if let Err(e) = &outcome {
                    tracing::debug!("scan transaction failed: {}", e);
                }
                // Consumer may already be gone
                let _ = done_tx.send(outcome);
            })?;

        let relay = Relay {
            items: items_rx,
            done: done_rx,
            ctx: ctx.clone(),
            closed: self.closed.clone(),
        };
        Ok(RawCursor::new(ctx.clone(), relay))
    }

    fn close(&self) -> Result<()> {
        // Producers hold their own handle until they see the shutdown
        self.shutdown.lock().take();
        if self.db.lock().take().is_some() {
            tracing::debug!("closed bucket {} at {}", self.bucket, self.path.display());
        }
        Ok(())
    }
}

// =============================================================================
// Scan Producer
// =============================================================================

/// Runs one read transaction and feeds its range to the consumer
struct Producer {
    db: Arc<Database>,
    bucket: String,
    from_key: Vec<u8>,
    to_key: Vec<u8>,
    items: Sender<RawEntry>,
    ctx: ScanContext,
    closed: Receiver<()>,
}

impl Producer {
    fn run(self) -> Result<()> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table(&self.bucket))?;
        let mut range = t
            .range(self.from_key.as_slice()..=self.to_key.as_slice())?
            .peekable();

        while let Some(item) = range.next() {
            let (key, value) = item?;
            let more = range.peek().is_some();
            let entry = RawEntry::new(key.value().to_vec(), value.value().to_vec(), more);
            if !self.relay(entry) {
                tracing::debug!("scan consumer departed or store closed, ending transaction");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Hand one entry over; false if the consumer left, the context fired,
    /// or the store was closed
    fn relay(&self, entry: RawEntry) -> bool {
        if is_closed(&self.closed) {
            return false;
        }
        let deadline = self.ctx.deadline_signal();
        select! {
            send(self.items, entry) -> sent => sent.is_ok(),
            recv(self.ctx.cancelled()) -> _ => false,
            recv(deadline) -> _ => false,
            recv(self.closed) -> _ => false,
        }
    }
}

// =============================================================================
// Scan Consumer
// =============================================================================

/// Raw source receiving entries from a [`Producer`]
struct Relay {
    items: Receiver<RawEntry>,
    done: Receiver<Result<()>>,
    ctx: ScanContext,
    closed: Receiver<()>,
}

impl Relay {
    fn outcome(result: std::result::Result<Result<()>, channel::RecvError>) -> Result<Option<RawEntry>> {
        match result {
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => Ok(None),
            // Producer thread panicked before sending its outcome
            Err(_) => Err(RowError::Engine(
                "scan producer exited without reporting".to_string(),
            )),
        }
    }
}

impl RawSource for Relay {
    fn pull(&mut self) -> Result<Option<RawEntry>> {
        if is_closed(&self.closed) {
            return Err(RowError::StoreClosed);
        }
        let deadline = self.ctx.deadline_signal();
        select! {
            recv(self.items) -> entry => match entry {
                Ok(entry) => Ok(Some(entry)),
                // Producer dropped its sender; its outcome follows on `done`
                Err(_) => Self::outcome(self.done.recv()),
            },
            recv(self.done) -> result => Self::outcome(result),
            recv(self.ctx.cancelled()) -> _ => Err(RowError::Cancelled),
            recv(deadline) -> _ => Err(RowError::DeadlineExceeded),
            recv(self.closed) -> _ => Err(RowError::StoreClosed),
        }
    }
}
