//! TCP Server
//!
//! Accepts connections and serves each on its own thread.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::Result;
use crate::service::Service;

use super::Connection;

/// TCP server for RowStore
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<Service>,
    shutdown: Arc<AtomicBool>,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: &Config, service: Arc<Service>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            service,
            shutdown: Arc::new(AtomicBool::new(false)),
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Accept connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            if let Err(e) = self.spawn_connection(stream) {
                tracing::warn!("Failed to start connection: {}", e);
            }
        }

        tracing::info!("Server on {} stopped accepting", self.local_addr);
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream) -> Result<()> {
        let mut connection = Connection::new(stream, Arc::clone(&self.service))?;
        connection.set_timeouts(self.read_timeout_ms, self.write_timeout_ms)?;

        thread::Builder::new()
            .name("rowstore-conn".to_string())
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
                }
            })?;
        Ok(())
    }
}

impl ShutdownHandle {
    /// Signal the server to stop accepting new connections
    ///
    /// Open connections finish on their own.
    pub fn shutdown(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            // Unblock the acceptor so it observes the flag
            let _ = TcpStream::connect(self.wake_addr);
        }
    }
}

/// Loopback equivalent of an unspecified bind address
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}
