//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET:  bucket_len (4) + bucket + key_len (4) + key
//! - SET:  bucket_len (4) + bucket + key_len (4) + key + value
//! - SCAN: bucket_len (4) + bucket + from_len (4) + from + to_len (4) + to
//! - PING: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Status
//! - OK:        optional value
//! - NOT_FOUND: empty
//! - ERROR:     UTF-8 message
//! - ROW:       key_len (4) + key + value
//! - END:       empty

use std::io::{Read, Write};

use crate::error::{Result, RowError};
use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Payload Fields
// =============================================================================

fn put_field(payload: &mut Vec<u8>, field: &[u8]) {
    payload.extend_from_slice(&(field.len() as u32).to_be_bytes());
    payload.extend_from_slice(field);
}

/// Cursor over a payload's length-prefixed fields
struct Fields<'a> {
    what: &'static str,
    rest: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(what: &'static str, payload: &'a [u8]) -> Self {
        Self { what, rest: payload }
    }

    /// Next length-prefixed field
    fn field(&mut self, name: &str) -> Result<&'a [u8]> {
        if self.rest.len() < 4 {
            return Err(RowError::Protocol(format!(
                "{} payload: missing {} length",
                self.what, name
            )));
        }
        let len = u32::from_be_bytes([self.rest[0], self.rest[1], self.rest[2], self.rest[3]]) as usize;
        let body = &self.rest[4..];
        if body.len() < len {
            return Err(RowError::Protocol(format!(
                "{} payload: incomplete {} (expected {}, got {})",
                self.what,
                name,
                len,
                body.len()
            )));
        }
        self.rest = &body[len..];
        Ok(&body[..len])
    }

    fn bucket(&mut self) -> Result<String> {
        let raw = self.field("bucket")?;
        String::from_utf8(raw.to_vec()).map_err(|_| {
            RowError::Protocol(format!("{} payload: bucket is not UTF-8", self.what))
        })
    }

    /// Whatever follows the last field
    fn remainder(self) -> &'a [u8] {
        self.rest
    }

    fn finish(self) -> Result<()> {
        if !self.rest.is_empty() {
            return Err(RowError::Protocol(format!(
                "{} payload: {} trailing bytes",
                self.what,
                self.rest.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let mut payload = Vec::new();
    match command {
        Command::Get { bucket, key } => {
            put_field(&mut payload, bucket.as_bytes());
            put_field(&mut payload, key);
        }
        Command::Set { bucket, key, value } => {
            put_field(&mut payload, bucket.as_bytes());
            put_field(&mut payload, key);
            payload.extend_from_slice(value);
        }
        Command::Scan { bucket, from_key, to_key } => {
            put_field(&mut payload, bucket.as_bytes());
            put_field(&mut payload, from_key);
            put_field(&mut payload, to_key);
        }
        Command::Ping => {}
    }

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = unframe(bytes, "")?;

    match cmd_type {
        0x01 => {
            let mut fields = Fields::new("GET", payload);
            let bucket = fields.bucket()?;
            let key = fields.field("key")?.to_vec();
            fields.finish()?;
            Ok(Command::Get { bucket, key })
        }
        0x02 => {
            let mut fields = Fields::new("SET", payload);
            let bucket = fields.bucket()?;
            let key = fields.field("key")?.to_vec();
            let value = fields.remainder().to_vec();
            Ok(Command::Set { bucket, key, value })
        }
        0x03 => {
            let mut fields = Fields::new("SCAN", payload);
            let bucket = fields.bucket()?;
            let from_key = fields.field("from key")?.to_vec();
            let to_key = fields.field("to key")?.to_vec();
            fields.finish()?;
            Ok(Command::Scan { bucket, from_key, to_key })
        }
        0x04 => {
            if !payload.is_empty() {
                return Err(RowError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Command::Ping)
        }
        _ => Err(RowError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut payload = Vec::new();
    match response {
        Response::Ok(Some(value)) => payload.extend_from_slice(value),
        Response::Error(message) => payload.extend_from_slice(message.as_bytes()),
        Response::Row { key, value } => {
            put_field(&mut payload, key);
            payload.extend_from_slice(value);
        }
        Response::Ok(None) | Response::NotFound | Response::End => {}
    }

    frame(response.status() as u8, &payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = unframe(bytes, "response ")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::Row,
        0x04 => Status::End,
        _ => {
            return Err(RowError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    match status {
        Status::Ok if payload.is_empty() => Ok(Response::Ok(None)),
        Status::Ok => Ok(Response::Ok(Some(payload.to_vec()))),
        Status::NotFound => Ok(Response::NotFound),
        Status::Error => Ok(Response::Error(String::from_utf8_lossy(payload).into_owned())),
        Status::Row => {
            let mut fields = Fields::new("ROW", payload);
            let key = fields.field("key")?.to_vec();
            let value = fields.remainder().to_vec();
            Ok(Response::Row { key, value })
        }
        Status::End => Ok(Response::End),
    }
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Split a complete message into its type byte and payload
fn unframe<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(RowError::Protocol(format!(
            "Incomplete {}header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = check_payload_len(&bytes[..HEADER_SIZE])?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(RowError::Protocol(format!(
            "Incomplete {}payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(header: &[u8]) -> Result<usize> {
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(RowError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(payload_len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one framed message (header + payload)
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len(&header)?;

    let mut message = Vec::with_capacity(HEADER_SIZE + payload_len);
    message.extend_from_slice(&header);
    message.resize(HEADER_SIZE + payload_len, 0);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
