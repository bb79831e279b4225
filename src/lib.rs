//! # RowStore
//!
//! A bucketed key-value store for typed records with:
//! - Pluggable backends: volatile memory or durable redb files
//! - Ordered, inclusive range scans with a caller-supplied predicate
//! - Cancellation and deadlines on every scan
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Service                                 │
//! │             (Envelope records, scan deadline)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Buckets                                 │
//! │                 (name → Arc<dyn Store>)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ MemoryStore │          │  FileStore  │
//!   │  (RwLock)   │          │   (redb)    │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └───────────┬────────────┘
//!                      ▼
//!              ┌───────────────┐
//!              │ RecordIterator│
//!              │ (Codec + pred)│
//!              └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod context;
pub mod record;

pub mod iterator;
pub mod store;
pub mod buckets;
pub mod network;
pub mod protocol;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use buckets::Buckets;
pub use config::Config;
pub use context::{CancelHandle, ScanContext};
pub use error::{Result, RowError};
pub use iterator::RecordIterator;
pub use record::{Codec, Envelope, Message};
pub use service::Service;
pub use store::{Store, StoreExt};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RowStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
