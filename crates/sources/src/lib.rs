//! Logport - Sources
//!
//! Listening transports that turn inbound log streams into records for a
//! `Sink`.
//!
//! # Available Transports
//!
//! - **TCP** - one handler task per connection, optional TLS, coordinated
//!   shutdown through the handler registry
//! - **UDP** - one receive loop, each datagram framed as its own stream
//!
//! # Data Flow
//!
//! ```text
//! [socket] --bytes--> [EventStream::log_events] --Record--> [Sink::accept]
//! ```
//!
//! The `EventBridge` picks the framing (JSON, XML or MessagePack) once, at
//! construction. Records from one connection or datagram reach the sink in
//! stream order; there is no ordering across connections.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use logport_sinks::NullSink;
//! use logport_sources::{EventBridge, TcpServerConfig, TcpSocketServer};
//!
//! let server = Arc::new(TcpSocketServer::bind(
//!     TcpServerConfig::with_port(4560),
//!     EventBridge::json(),
//!     Arc::new(NullSink::new()),
//!     None,
//! )?);
//! let handle = server.start();
//! server.shutdown();
//! handle.await??;
//! ```

pub mod bridge;
pub mod registry;
pub mod tcp;
pub mod tls;
pub mod udp;

mod common;
mod error;
mod handler;

pub use bridge::{BridgeOptions, EventBridge, EventStream, LogEvents};
pub use common::{MetricsSnapshot, ServerState, TransportMetrics, is_connection_reset};
pub use error::SourceError;
pub use handler::HandlerExit;
pub use registry::{HandlerEntry, HandlerId, HandlerRegistry};
pub use tcp::{DEFAULT_BACKLOG, DEFAULT_PORT, TcpServerConfig, TcpSocketServer};
pub use tls::TlsAcceptor;
pub use udp::{MAX_UDP_PAYLOAD, UdpServerConfig, UdpSocketServer};
