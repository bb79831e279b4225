//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Row = 0x03,
    End = 0x04,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success with optional payload (the encoded record for GET)
    Ok(Option<Vec<u8>>),

    /// Key not present
    NotFound,

    /// Failure with a message
    Error(String),

    /// One scan element
    Row { key: Vec<u8>, value: Vec<u8> },

    /// Scan finished
    End,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Response::Ok(payload)
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Response::NotFound
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Response::Error(message.to_string())
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Ok(_) => Status::Ok,
            Response::NotFound => Status::NotFound,
            Response::Error(_) => Status::Error,
            Response::Row { .. } => Status::Row,
            Response::End => Status::End,
        }
    }
}
