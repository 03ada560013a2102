//! TCP Socket Server
//!
//! Stream-oriented listening transport. Each accepted connection gets its own
//! task running a `ConnectionHandler`; the accept loop never waits on them.
//!
//! # Shutdown
//!
//! `shutdown()` moves the server to `ShuttingDown` and cancels its token. The
//! accept loop observes the cancellation, drops the listener (closing the
//! socket), asks every registered handler to stop, and joins them all before
//! `run()` returns. With `shutdown_timeout` set, handlers still running after
//! the timeout are aborted.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use logport_sinks::StdoutSink;
//! use logport_sources::{EventBridge, TcpServerConfig, TcpSocketServer};
//!
//! let config = TcpServerConfig::with_port(4560);
//! let sink = Arc::new(StdoutSink::new());
//! let server = Arc::new(TcpSocketServer::bind(config, EventBridge::json(), sink, None)?);
//!
//! let handle = server.start();
//! // ...
//! server.shutdown();
//! handle.await??;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use logport_sinks::Sink;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::bridge::EventBridge;
use crate::common::{ServerState, StateCell, TransportMetrics, resolve_bind_address};
use crate::error::SourceError;
use crate::handler::{ConnectionHandler, HandlerExit};
use crate::registry::{HandlerEntry, HandlerGuard, HandlerRegistry};
use crate::tls::TlsAcceptor;

/// Default listen port
pub const DEFAULT_PORT: u16 = 4560;

/// Default accept backlog
pub const DEFAULT_BACKLOG: i32 = 50;

/// TCP server configuration
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port, 0 for an ephemeral port
    pub port: u16,

    /// Pending connection queue length
    pub backlog: i32,

    /// TCP nodelay on accepted connections
    pub nodelay: bool,

    /// Bound on joining handlers at shutdown, unbounded when `None`
    pub shutdown_timeout: Option<Duration>,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            nodelay: true,
            shutdown_timeout: None,
        }
    }
}

impl TcpServerConfig {
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

/// Stream-oriented listening transport
pub struct TcpSocketServer {
    config: TcpServerConfig,
    bridge: EventBridge,
    sink: Arc<dyn Sink>,
    tls: Option<TlsAcceptor>,

    /// Bound listener, taken by `run`
    listener: Mutex<Option<std::net::TcpListener>>,
    local_addr: SocketAddr,

    state: StateCell,
    started: AtomicBool,
    shutdown: CancellationToken,
    registry: Arc<HandlerRegistry>,
    metrics: Arc<TransportMetrics>,
}

impl TcpSocketServer {
    /// Bind the listening socket
    ///
    /// The socket is bound and listening when this returns, so connections
    /// queue in the backlog until `run` starts accepting them.
    pub fn bind(
        config: TcpServerConfig,
        bridge: EventBridge,
        sink: Arc<dyn Sink>,
        tls: Option<TlsAcceptor>,
    ) -> Result<Self, SourceError> {
        let addr = resolve_bind_address(&config.address, config.port)?;
        let listener = create_listener(addr, config.backlog)
            .map_err(|e| SourceError::bind(config.bind_address(), e))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            bridge,
            sink,
            tls,
            listener: Mutex::new(Some(listener)),
            local_addr,
            state: StateCell::new(),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            registry: Arc::new(HandlerRegistry::new()),
            metrics: Arc::new(TransportMetrics::new()),
        })
    }

    /// Address the listener is bound to
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

    /// Live connection handlers
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TcpServerConfig {
        &self.config
    }

    /// Spawn `run` on the runtime and return its handle
    pub fn start(self: &Arc<Self>) -> JoinHandle<Result<(), SourceError>> {
        let server = Arc::clone(self);
        tokio::spawn(async move { server.run().await })
    }

    /// Stop accepting and signal every handler
    ///
    /// Returns immediately; await the `run` future (or the `start` handle)
    /// to wait for handlers to finish.
    pub fn shutdown(&self) {
        let prev = self.state.advance(ServerState::ShuttingDown);
        if matches!(prev, ServerState::Created | ServerState::Active) {
            tracing::info!(address = %self.local_addr, "TCP server shutting down");
        }
        self.shutdown.cancel();
    }

    /// Accept connections until shutdown
    ///
    /// Returns only after every connection handler has finished.
    pub async fn run(&self) -> Result<(), SourceError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SourceError::AlreadyStarted);
        }
        let std_listener = self.listener.lock().take();
        let Some(std_listener) = std_listener else {
            return Err(SourceError::AlreadyStarted);
        };

        if !self.state.activate() {
            self.state.advance(ServerState::Stopped);
            tracing::debug!(address = %self.local_addr, "TCP server shut down before it started");
            return Ok(());
        }

        let listener = match TcpListener::from_std(std_listener) {
            Ok(listener) => listener,
            Err(e) => {
                self.state.advance(ServerState::Stopped);
                return Err(e.into());
            }
        };

        tracing::info!(
            address = %self.local_addr,
            format = self.bridge.format().as_str(),
            tls = self.tls.is_some(),
            "TCP server listening"
        );

        let tasks = self.accept_loop(listener).await;
        self.drain(tasks).await;

        self.state.advance(ServerState::Stopped);
        tracing::info!(address = %self.local_addr, "TCP server stopped");
        Ok(())
    }

    /// Main accept loop, consumes (and so closes) the listener
    async fn accept_loop(&self, listener: TcpListener) -> JoinSet<HandlerExit> {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = listener.accept() => match result {
                    Ok((stream, peer)) => self.spawn_handler(&mut tasks, stream, peer),
                    Err(e) => {
                        if !self.is_active() {
                            break;
                        }
                        tracing::warn!(error = %e, "accept error");
                        self.metrics.error();
                    }
                },
            }

            while let Some(result) = tasks.try_join_next() {
                log_join_error(result);
            }
        }

        tasks
    }

    /// Register a handler for `stream` and start it
    fn spawn_handler(
        &self,
        tasks: &mut JoinSet<HandlerExit>,
        stream: TcpStream,
        peer: SocketAddr,
    ) {
        configure_stream(&stream, self.config.nodelay);

        let stop = self.shutdown.child_token();
        let guard = HandlerGuard::register(
            &self.registry,
            &self.metrics,
            HandlerEntry::new(peer, stop.clone()),
        );

        let handler = ConnectionHandler {
            id: guard.id(),
            peer,
            stop,
            bridge: self.bridge,
            sink: Arc::clone(&self.sink),
            metrics: Arc::clone(&self.metrics),
        };
        tracing::debug!(handler_id = guard.id(), peer = %peer, "connection accepted");

        let tls = self.tls.clone();
        tasks.spawn(async move {
            let _guard = guard;
            handler.run(stream, tls).await
        });
    }

    /// Stop every handler and wait for all of them
    async fn drain(&self, mut tasks: JoinSet<HandlerExit>) {
        let signalled = self.registry.request_stop_all();
        if signalled > 0 {
            tracing::info!(handlers = signalled, "stopping connection handlers");
        }

        match self.config.shutdown_timeout {
            None => join_all(&mut tasks).await,
            Some(timeout) => {
                if tokio::time::timeout(timeout, join_all(&mut tasks))
                    .await
                    .is_err()
                {
                    tracing::warn!(
                        remaining = tasks.len(),
                        timeout = ?timeout,
                        "connection handlers did not stop in time, aborting"
                    );
                    self.metrics.handlers_aborted(tasks.len() as u64);
                    tasks.abort_all();
                    join_all(&mut tasks).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for TcpSocketServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocketServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state.get())
            .field("bridge", &self.bridge)
            .field("sink", &self.sink.name())
            .field("tls", &self.tls.is_some())
            .field("handlers", &self.registry.len())
            .finish()
    }
}

/// Create the listening socket with socket2
fn create_listener(addr: SocketAddr, backlog: i32) -> std::io::Result<std::net::TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// Options for an accepted connection; failures are logged and ignored
fn configure_stream(stream: &TcpStream, nodelay: bool) {
    let socket = SockRef::from(stream);

    // Close without lingering on unsent data
    if let Err(e) = socket.set_linger(Some(Duration::ZERO)) {
        tracing::warn!(error = %e, "failed to set SO_LINGER");
    }

    if nodelay && let Err(e) = stream.set_nodelay(true) {
        tracing::warn!(error = %e, "failed to set TCP_NODELAY");
    }
}

async fn join_all(tasks: &mut JoinSet<HandlerExit>) {
    while let Some(result) = tasks.join_next().await {
        log_join_error(result);
    }
}

fn log_join_error(result: Result<HandlerExit, JoinError>) {
    match result {
        Ok(_) => {}
        Err(e) if e.is_panic() => tracing::warn!(error = %e, "connection handler panicked"),
        Err(e) => tracing::debug!(error = %e, "connection handler aborted"),
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
