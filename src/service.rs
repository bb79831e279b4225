//! Service
//!
//! Maps protocol commands onto buckets.
//!
//! Records travel as encoded [`Envelope`]s: SET rejects values that are not
//! envelopes, GET and SCAN hand stored envelopes back unchanged, so any client
//! can decode them without knowing the record type up front.

use std::sync::Arc;
use std::time::Duration;

use crate::buckets::Buckets;
use crate::config::Config;
use crate::context::ScanContext;
use crate::error::{Result, RowError};
use crate::iterator::RecordIterator;
use crate::protocol::{Command, Response};
use crate::record::{accept_all, AnyCodec, Codec, Envelope};
use crate::store::StoreExt;

/// Request handler shared by all connections
pub struct Service {
    buckets: Arc<Buckets>,

    /// Deadline applied to every scan (None = unbounded)
    scan_timeout: Option<Duration>,
}

impl Service {
    pub fn new(buckets: Arc<Buckets>, scan_timeout: Option<Duration>) -> Self {
        Self { buckets, scan_timeout }
    }

    /// Service over `buckets` using the scan deadline from `config`
    pub fn from_config(buckets: Arc<Buckets>, config: &Config) -> Self {
        Self::new(buckets, config.scan_deadline())
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Store an encoded envelope
    pub fn set(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let envelope = AnyCodec.decode(value)?;
        self.buckets.get(bucket)?.set(key, &envelope, &AnyCodec)
    }

    /// Fetch an encoded envelope
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Vec<u8>> {
        let envelope: Envelope = self.buckets.get(bucket)?.get(key, &AnyCodec)?;
        envelope.to_bytes()
    }

    /// Scan a bucket, bounded by the configured scan deadline
    pub fn scan(&self, bucket: &str, from_key: &[u8], to_key: &[u8]) -> Result<RecordIterator<Envelope>> {
        let store = self.buckets.get(bucket)?;
        Ok(store.scan(&self.scan_context(), from_key, to_key, AnyCodec, accept_all))
    }

    fn scan_context(&self) -> ScanContext {
        match self.scan_timeout {
            Some(timeout) => ScanContext::timeout(timeout),
            None => ScanContext::background(),
        }
    }

    /// Execute a command, passing each response to `emit`
    ///
    /// Failures of the operation become ERROR/NOT_FOUND responses; only
    /// failures of `emit` itself are returned.
    pub fn execute<F>(&self, command: Command, mut emit: F) -> Result<()>
    where
        F: FnMut(Response) -> Result<()>,
    {
        match command {
            Command::Ping => emit(Response::ok(Some(b"PONG".to_vec()))),
            Command::Set { bucket, key, value } => emit(into_response(
                self.set(&bucket, &key, &value).map(|_| None),
            )),
            Command::Get { bucket, key } => {
                emit(into_response(self.get(&bucket, &key).map(Some)))
            }
            Command::Scan { bucket, from_key, to_key } => {
                let records = match self.scan(&bucket, &from_key, &to_key) {
                    Ok(records) => records,
                    Err(e) => return emit(into_response(Err(e))),
                };
                for record in records {
                    let row = record.and_then(|(key, envelope)| {
                        Ok(Response::Row { key, value: envelope.to_bytes()? })
                    });
                    match row {
                        Ok(row) => emit(row)?,
                        Err(e) => {
                            tracing::debug!("scan of {} ended early: {}", bucket, e);
                            return emit(into_response(Err(e)));
                        }
                    }
                }
                emit(Response::End)
            }
        }
    }
}

fn into_response(result: Result<Option<Vec<u8>>>) -> Response {
    match result {
        Ok(payload) => Response::ok(payload),
        Err(RowError::KeyNotFound) => Response::not_found(),
        Err(e) => Response::error(&e.to_string()),
    }
}
