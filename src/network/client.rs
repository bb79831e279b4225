//! TCP Client
//!
//! Blocking client speaking the wire protocol over one connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, RowError};
use crate::protocol::{read_response, write_command, Command, Response};

/// One client connection
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Store an encoded envelope under `key`
    pub fn set(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let command = Command::Set {
            bucket: bucket.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        };
        match self.call(&command)? {
            Response::Ok(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch the encoded envelope under `key`
    pub fn get(&mut self, bucket: &str, key: &[u8]) -> Result<Vec<u8>> {
        let command = Command::Get {
            bucket: bucket.to_string(),
            key: key.to_vec(),
        };
        match self.call(&command)? {
            Response::Ok(value) => Ok(value.unwrap_or_default()),
            Response::NotFound => Err(RowError::KeyNotFound),
            other => Err(unexpected(other)),
        }
    }

    /// Scan `[from_key, to_key]`, collecting every row the server streams
    pub fn scan(&mut self, bucket: &str, from_key: &[u8], to_key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let command = Command::Scan {
            bucket: bucket.to_string(),
            from_key: from_key.to_vec(),
            to_key: to_key.to_vec(),
        };
        write_command(&mut self.writer, &command)?;

        let mut rows = Vec::new();
        loop {
            match read_response(&mut self.reader)? {
                Response::Row { key, value } => rows.push((key, value)),
                Response::End => return Ok(rows),
                other => return Err(unexpected(other)),
            }
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.call(&Command::Ping)? {
            Response::Ok(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}

fn unexpected(response: Response) -> RowError {
    match response {
        Response::Error(message) => RowError::Network(format!("server error: {}", message)),
        other => RowError::Protocol(format!("unexpected {:?} response", other.status())),
    }
}
