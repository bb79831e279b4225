//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Scan = 0x03,
    Ping = 0x04,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get an encoded record by key
    Get { bucket: String, key: Vec<u8> },

    /// Store an encoded record
    Set {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Stream every record with a key in [from_key, to_key]
    Scan {
        bucket: String,
        from_key: Vec<u8>,
        to_key: Vec<u8>,
    },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Scan { .. } => CommandType::Scan,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Bucket the command addresses, if any
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Command::Get { bucket, .. }
            | Command::Set { bucket, .. }
            | Command::Scan { bucket, .. } => Some(bucket.as_str()),
            Command::Ping => None,
        }
    }
}
