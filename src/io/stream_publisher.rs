//! TCP streaming server for visualization clients.
//!
//! Clients connect over TCP and receive newline-delimited JSON
//! [`StreamMessage`]s. The accept loop and the publishing side share a
//! client registry; dead connections are dropped on write failure.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::io::messages::StreamMessage;

/// Publisher errors.
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PublisherError>;

/// Configuration for the streaming server.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Address to bind the TCP listener (e.g., "0.0.0.0:5601").
    pub bind_addr: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5601".to_string(),
        }
    }
}

/// Shared registry of connected clients.
pub type ClientRegistry = Arc<Mutex<Vec<TcpStream>>>;

/// TCP accept loop owning the listener.
pub struct StreamServer {
    listener: TcpListener,
    clients: ClientRegistry,
    running: Arc<AtomicBool>,
}

impl StreamServer {
    pub fn new(config: PublisherConfig, running: Arc<AtomicBool>) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)?;
        listener.set_nonblocking(true)?;

        log::info!("stream server listening on {}", config.bind_addr);

        Ok(Self {
            listener,
            clients: Arc::new(Mutex::new(Vec::new())),
            running,
        })
    }

    /// Registry handle for the publishing side.
    pub fn clients(&self) -> ClientRegistry {
        Arc::clone(&self.clients)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop (blocking).
    pub fn run(self) {
        log::info!("stream server started");

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("client connected: {}", addr);
                    if let Err(e) = stream.set_nodelay(true) {
                        log::warn!("failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
                    clients.push(stream);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    log::error!("accept error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }

        log::info!("stream server stopped");
    }
}

/// Publishing side: serializes messages and fans them out to all
/// connected clients.
#[derive(Clone)]
pub struct StreamPublisher {
    clients: ClientRegistry,
}

impl StreamPublisher {
    pub fn new(clients: ClientRegistry) -> Self {
        Self { clients }
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Send a message to every connected client.
    ///
    /// Clients that fail the write are disconnected and removed.
    pub fn publish(&self, msg: &StreamMessage) -> Result<()> {
        let mut line = serde_json::to_vec(msg)?;
        line.push(b'\n');

        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.retain_mut(|stream| match stream.write_all(&line) {
            Ok(()) => true,
            Err(e) => {
                log::info!("client disconnected: {}", e);
                false
            }
        });
        Ok(())
    }
}
