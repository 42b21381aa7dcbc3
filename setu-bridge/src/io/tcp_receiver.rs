//! TCP input for live bus traffic and browser clients.
//!
//! # Wire Format
//!
//! Both directions use length-prefixed JSON (see [`frame`](super::frame)).
//! Inbound frames are bus envelopes or client messages; outbound frames are
//! the bridge's notifications.
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to the bind address
//! 2. Listener spawns a ConnectionHandler thread for it
//! 3. The handler subscribes to notifications
//! 4. Loop: read frames (500ms timeout), dispatch, flush notifications
//! 5. On disconnect the subscription is dropped
//! ```

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;

use super::frame::{self, FrameReader, Inbound};
use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::notify::Broadcaster;

/// Read timeout; bounds how long a handler takes to notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Sleep between accept attempts when no connection is pending.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Accepts connections and spawns a handler per client.
pub struct TcpServer {
    listener: TcpListener,
    bridge: Arc<Bridge>,
    broadcaster: Arc<Broadcaster>,
    running: Arc<AtomicBool>,
}

impl TcpServer {
    /// Bind the listener.
    pub fn bind(
        bind_address: &str,
        bridge: Arc<Bridge>,
        broadcaster: Arc<Broadcaster>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_address, e)))?;
        listener.set_nonblocking(true)?;
        log::info!("TCP input listening on {}", bind_address);
        Ok(Self {
            listener,
            bridge,
            broadcaster,
            running,
        })
    }

    /// Bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `running` is cleared, then join handlers.
    pub fn run(self) {
        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        log::warn!("Failed to set blocking mode for {}: {}", addr, e);
                        continue;
                    }
                    let handler = ConnectionHandler {
                        bridge: Arc::clone(&self.bridge),
                        notifications: self.broadcaster.subscribe(),
                        running: Arc::clone(&self.running),
                        frames: FrameReader::new(),
                    };
                    let spawned = thread::Builder::new()
                        .name(format!("tcp-{}", addr))
                        .spawn(move || {
                            if let Err(e) = handler.run(stream) {
                                log::error!("Connection {} failed: {}", addr, e);
                            }
                        });
                    match spawned {
                        Ok(handle) => {
                            log::info!("Client connected: {}", addr);
                            handlers.push(handle);
                        }
                        Err(e) => log::error!("Failed to spawn handler for {}: {}", addr, e),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
            handlers.retain(|h| !h.is_finished());
        }

        for handle in handlers {
            if handle.join().is_err() {
                log::error!("Connection handler panicked");
            }
        }
        log::info!("TCP input stopped");
    }
}

/// Serves one client connection.
struct ConnectionHandler {
    bridge: Arc<Bridge>,
    notifications: Receiver<String>,
    running: Arc<AtomicBool>,
    frames: FrameReader,
}

impl ConnectionHandler {
    fn run(mut self, mut stream: TcpStream) -> Result<()> {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            log::warn!("Failed to set read timeout: {}", e);
        }

        let result = self.serve(&mut stream);
        let _ = stream.shutdown(Shutdown::Both);

        match result {
            Err(Error::Io(ref e))
                if e.kind() == ErrorKind::UnexpectedEof
                    || e.kind() == ErrorKind::ConnectionReset
                    || e.kind() == ErrorKind::BrokenPipe =>
            {
                log::info!("Client disconnected");
                Ok(())
            }
            other => other,
        }
    }

    fn serve(&mut self, stream: &mut TcpStream) -> Result<()> {
        while self.running.load(Ordering::Relaxed) {
            if self.frames.read_from(stream)? {
                self.dispatch();
            }
            self.flush_notifications(stream)?;
        }
        Ok(())
    }

    fn dispatch(&self) {
        match Inbound::parse(self.frames.body()) {
            Ok(Inbound::Bus(envelope)) => {
                // Failures are logged and counted by the bridge.
                let _ = self.bridge.handle_envelope(envelope);
            }
            Ok(Inbound::Client(msg)) => self.bridge.handle_client(msg),
            Err(e) => {
                self.bridge
                    .metrics()
                    .decode_errors
                    .fetch_add(1, Ordering::Relaxed);
                log::warn!("Dropped frame: {}", e);
            }
        }
    }

    fn flush_notifications(&self, stream: &mut TcpStream) -> Result<()> {
        for text in self.notifications.try_iter() {
            frame::write_frame(stream, text.as_bytes())?;
        }
        Ok(())
    }
}
