//! UDP Socket Server
//!
//! Datagram-oriented listening transport. One receive loop, no per-datagram
//! concurrency: each datagram is wrapped as a bounded stream and run through
//! the bridge to completion before the next receive.
//!
//! Datagrams larger than `max_datagram_size` are truncated to it. The receive
//! buffer is one byte larger than the maximum so truncation is detectable.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use logport_sinks::Sink;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bridge::{EventBridge, LogEvents};
use crate::common::{
    ServerState, StateCell, TransportMetrics, is_connection_reset, resolve_bind_address,
};
use crate::error::SourceError;
use crate::tcp::DEFAULT_PORT;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// UDP server configuration
#[derive(Debug, Clone)]
pub struct UdpServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port, 0 for an ephemeral port
    pub port: u16,

    /// Datagrams are truncated to this many bytes
    pub max_datagram_size: usize,
}

impl Default for UdpServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_datagram_size: MAX_UDP_PAYLOAD,
        }
    }
}

impl UdpServerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Datagram-oriented listening transport
pub struct UdpSocketServer {
    config: UdpServerConfig,
    bridge: EventBridge,
    sink: Arc<dyn Sink>,

    /// Bound socket, taken by `run`
    socket: Mutex<Option<std::net::UdpSocket>>,
    local_addr: SocketAddr,

    state: StateCell,
    started: AtomicBool,
    shutdown: CancellationToken,
    metrics: Arc<TransportMetrics>,
}

impl UdpSocketServer {
    /// Bind the datagram socket
    pub fn bind(
        config: UdpServerConfig,
        bridge: EventBridge,
        sink: Arc<dyn Sink>,
    ) -> Result<Self, SourceError> {
        if config.max_datagram_size == 0 {
            return Err(SourceError::InvalidConfig(
                "max_datagram_size must be greater than 0".into(),
            ));
        }

        let addr = resolve_bind_address(&config.address, config.port)?;
        let socket =
            create_socket(addr).map_err(|e| SourceError::bind(config.bind_address(), e))?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            config,
            bridge,
            sink,
            socket: Mutex::new(Some(socket)),
            local_addr,
            state: StateCell::new(),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            metrics: Arc::new(TransportMetrics::new()),
        })
    }

    /// Address the socket is bound to
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.get() == ServerState::Active
    }

    /// Get reference to metrics
    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &UdpServerConfig {
        &self.config
    }

    /// Spawn `run` on the runtime and return its handle
    pub fn start(self: &Arc<Self>) -> JoinHandle<Result<(), SourceError>> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.run().await })
    }

    /// Stop receiving; returns immediately
    pub fn shutdown(&self) {
        let prev = self.state.advance(ServerState::ShuttingDown);
        if matches!(prev, ServerState::Created | ServerState::Active) {
            tracing::info!(address = %self.local_addr, "UDP server shutting down");
        }
        self.shutdown.cancel();
    }

    /// Receive datagrams until shutdown
    pub async fn run(&self) -> Result<(), SourceError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SourceError::AlreadyStarted);
        }
        let std_socket = self.socket.lock().take();
        let Some(std_socket) = std_socket else {
            return Err(SourceError::AlreadyStarted);
        };

        if !self.state.activate() {
            self.state.advance(ServerState::Stopped);
            tracing::debug!(address = %self.local_addr, "UDP server shut down before it started");
            return Ok(());
        }

        let socket = match UdpSocket::from_std(std_socket) {
            Ok(socket) => socket,
            Err(e) => {
                self.state.advance(ServerState::Stopped);
                return Err(e.into());
            }
        };

        tracing::info!(
            address = %self.local_addr,
            format = self.bridge.format().as_str(),
            max_datagram_size = self.config.max_datagram_size,
            "UDP server listening"
        );

        self.receive_loop(socket).await;

        self.state.advance(ServerState::Stopped);
        tracing::info!(address = %self.local_addr, "UDP server stopped");
        Ok(())
    }

    /// Main receive loop, consumes (and so closes) the socket
    async fn receive_loop(&self, socket: UdpSocket) {
        let max = self.config.max_datagram_size;
        let mut recv_buf = vec![0u8; max + 1];

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = socket.recv_from(&mut recv_buf) => match result {
                    Ok((len, peer)) => {
                        let truncated = len > max;
                        if truncated {
                            tracing::debug!(
                                peer = %peer,
                                max_datagram_size = max,
                                "datagram truncated"
                            );
                        }
                        self.metrics.datagram_received(truncated);
                        self.process_datagram(&recv_buf[..len.min(max)], peer).await;
                    }
                    Err(e) => {
                        if !self.is_active() {
                            break;
                        }
                        if is_connection_reset(&e) {
                            // ICMP port unreachable from an earlier send, on some platforms
                            tracing::debug!(error = %e, "UDP receive reset");
                            continue;
                        }
                        tracing::warn!(error = %e, "UDP receive error");
                        self.metrics.error();
                    }
                },
            }
        }
    }

    /// Run one datagram through the bridge to its end
    async fn process_datagram(&self, datagram: &[u8], peer: SocketAddr) {
        let mut events = self
            .bridge
            .wrap_stream(datagram)
            .with_peer(peer)
            .with_metrics(Arc::clone(&self.metrics));
        let sink = self.sink.as_ref();

        loop {
            match events.log_events(sink).await {
                Ok(LogEvents::Delivered(_)) => {}
                Ok(LogEvents::Eof) => break,
                Err(e) if e.is_decode() => {
                    tracing::warn!(
                        peer = %peer,
                        len = datagram.len(),
                        error = %e,
                        "undecodable datagram"
                    );
                    self.metrics.decode_error();
                    break;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "datagram read failed");
                    self.metrics.error();
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for UdpSocketServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSocketServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state.get())
            .field("bridge", &self.bridge)
            .field("sink", &self.sink.name())
            .finish()
    }
}

/// Create the datagram socket with socket2
fn create_socket(addr: SocketAddr) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
