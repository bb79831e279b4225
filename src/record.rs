//! Record Codecs
//!
//! The engine stores opaque bytes. Turning those bytes into typed records is
//! the caller's business: every typed operation takes a [`Codec`] bound to one
//! concrete record type, and scans take a predicate over that same type.
//!
//! ## Envelope Format
//! Records written through the service layer are wrapped in an [`Envelope`]
//! so that a generic scan can hand them out without knowing their type:
//! ```text
//! ┌───────────────────────┬──────────────────────────────┐
//! │ type_name (bincode)   │ payload (bincode of record)  │
//! └───────────────────────┴──────────────────────────────┘
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RowError};

/// Conversion between a typed record and its stored bytes
pub trait Codec<T>: Send + Sync {
    /// Encode a record to bytes
    fn encode(&self, record: &T) -> Result<Vec<u8>>;

    /// Decode bytes to a record; a mismatch is a `RowError::Codec`
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// A serializable record with a stable type tag
pub trait Message: Serialize + DeserializeOwned {
    /// Tag written into the envelope, e.g. `"example.User"`
    const TYPE_NAME: &'static str;
}

/// Predicate accepting every record
pub fn accept_all<T>(_record: &T) -> bool {
    true
}

// =============================================================================
// Envelope
// =============================================================================

/// Self-describing record: a type tag plus the serialized payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub type_name: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wrap a message
    pub fn pack<M: Message>(message: &M) -> Result<Self> {
        Ok(Self {
            type_name: M::TYPE_NAME.to_string(),
            payload: bincode::serialize(message)?,
        })
    }

    /// Unwrap into a concrete message type, checking the tag first
    pub fn unpack<M: Message>(&self) -> Result<M> {
        if !self.is::<M>() {
            return Err(RowError::Codec(format!(
                "type mismatch: stored {}, requested {}",
                self.type_name,
                M::TYPE_NAME
            )));
        }
        Ok(bincode::deserialize(&self.payload)?)
    }

    /// Whether the envelope holds a `M`
    pub fn is<M: Message>(&self) -> bool {
        self.type_name == M::TYPE_NAME
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// =============================================================================
// Codecs
// =============================================================================

/// Decodes any stored envelope without knowing the record type
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyCodec;

impl Codec<Envelope> for AnyCodec {
    fn encode(&self, record: &Envelope) -> Result<Vec<u8>> {
        record.to_bytes()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope> {
        Envelope::from_bytes(bytes)
    }
}

/// Stores `M` inside an envelope; decoding rejects other types
pub struct MessageCodec<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> MessageCodec<M> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<M> Default for MessageCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for MessageCodec<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MessageCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodec")
            .field("type", &std::any::type_name::<M>())
            .finish()
    }
}

impl<M: Message> Codec<M> for MessageCodec<M> {
    fn encode(&self, record: &M) -> Result<Vec<u8>> {
        Envelope::pack(record)?.to_bytes()
    }

    fn decode(&self, bytes: &[u8]) -> Result<M> {
        Envelope::from_bytes(bytes)?.unpack()
    }
}

/// Plain bincode payload, no envelope
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, record: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}
