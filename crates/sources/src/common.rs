//! Common types and utilities for sources
//!
//! Shared functionality across the TCP and UDP transports.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::error::SourceError;

// =============================================================================
// Lifecycle
// =============================================================================

/// Lifecycle of a listening transport
///
/// Transitions only move forward: `Created -> Active -> ShuttingDown -> Stopped`.
/// A transport shut down before it ever ran goes straight from `Created` to
/// `ShuttingDown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Socket bound, `run` not yet entered
    Created = 0,
    /// Accepting connections or receiving datagrams
    Active = 1,
    /// `shutdown` called, draining
    ShuttingDown = 2,
    /// `run` has returned
    Stopped = 3,
}

impl ServerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Active,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

/// Atomic holder for `ServerState`
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ServerState::Created as u8))
    }

    #[inline]
    pub(crate) fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if that is a forward transition, returning the old state
    pub(crate) fn advance(&self, next: ServerState) -> ServerState {
        let prev = self.0.fetch_max(next as u8, Ordering::AcqRel);
        ServerState::from_u8(prev)
    }

    /// `Created -> Active`, fails if shutdown already started
    pub(crate) fn activate(&self) -> bool {
        self.0
            .compare_exchange(
                ServerState::Created as u8,
                ServerState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics shared by both transports
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Currently running connection handlers
    pub connections_active: AtomicU64,

    /// Total connections accepted
    pub connections_total: AtomicU64,

    /// Records handed to the sink
    pub records_received: AtomicU64,

    /// Raw bytes read from connections and datagrams
    pub bytes_received: AtomicU64,

    /// Datagrams received
    pub datagrams_received: AtomicU64,

    /// Datagrams cut to the maximum size
    pub datagrams_truncated: AtomicU64,

    /// Streams ended by undecodable data
    pub decode_errors: AtomicU64,

    /// Records the sink rejected
    pub sink_errors: AtomicU64,

    /// Accept, receive, read and handshake failures
    pub errors: AtomicU64,

    /// Handlers aborted after the shutdown timeout
    pub handlers_aborted: AtomicU64,
}

impl TransportMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            records_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            datagrams_received: AtomicU64::new(0),
            datagrams_truncated: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            handlers_aborted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes_read(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn datagram_received(&self, truncated: bool) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        if truncated {
            self.datagrams_truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn handlers_aborted(&self, count: u64) {
        self.handlers_aborted.fetch_add(count, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_truncated: self.datagrams_truncated.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            handlers_aborted: self.handlers_aborted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of transport metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub records_received: u64,
    pub bytes_received: u64,
    pub datagrams_received: u64,
    pub datagrams_truncated: u64,
    pub decode_errors: u64,
    pub sink_errors: u64,
    pub errors: u64,
    pub handlers_aborted: u64,
}

/// Resolve a configured address and port to one socket address
///
/// Accepts IP literals and host names; the first resolved address wins.
pub fn resolve_bind_address(address: &str, port: u16) -> Result<SocketAddr, SourceError> {
    let mut addrs = (address, port).to_socket_addrs().map_err(|e| {
        SourceError::InvalidConfig(format!("cannot resolve bind address {address}: {e}"))
    })?;
    addrs.next().ok_or_else(|| {
        SourceError::InvalidConfig(format!("bind address {address} resolved to nothing"))
    })
}

/// Check if an I/O error means the peer went away
pub fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_connection_tracking() {
        let metrics = TransportMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 1);
        assert_eq!(snapshot.connections_total, 2);
    }

    #[test]
    fn test_metrics_datagrams() {
        let metrics = TransportMetrics::new();

        metrics.datagram_received(false);
        metrics.datagram_received(true);
        metrics.bytes_read(1500);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.datagrams_truncated, 1);
        assert_eq!(snapshot.bytes_received, 1500);
    }

    #[test]
    fn test_metrics_errors() {
        let metrics = TransportMetrics::new();

        metrics.record_received();
        metrics.decode_error();
        metrics.sink_error();
        metrics.error();
        metrics.handlers_aborted(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_received, 1);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.sink_errors, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.handlers_aborted, 2);
    }

    #[test]
    fn test_is_connection_reset() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
        ] {
            assert!(is_connection_reset(&io::Error::from(kind)));
        }
        assert!(!is_connection_reset(&io::Error::other("other")));
        assert!(!is_connection_reset(&io::Error::from(io::ErrorKind::TimedOut)));
    }

    #[test]
    fn test_resolve_bind_address() {
        let addr = resolve_bind_address("127.0.0.1", 4560).unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 4560)));

        let addr = resolve_bind_address("::1", 0).unwrap();
        assert!(addr.is_ipv6());

        let err = resolve_bind_address("not an address", 4560).unwrap_err();
        assert!(matches!(err, SourceError::InvalidConfig(_)));
    }

    #[test]
    fn test_state_transitions() {
        let state = StateCell::new();
        assert_eq!(state.get(), ServerState::Created);

        assert!(state.activate());
        assert_eq!(state.get(), ServerState::Active);
        assert!(!state.activate());

        assert_eq!(state.advance(ServerState::ShuttingDown), ServerState::Active);
        assert_eq!(state.advance(ServerState::Stopped), ServerState::ShuttingDown);

        // Never moves backwards
        assert_eq!(state.advance(ServerState::ShuttingDown), ServerState::Stopped);
        assert_eq!(state.get(), ServerState::Stopped);
    }

    #[test]
    fn test_shutdown_before_activate() {
        let state = StateCell::new();
        state.advance(ServerState::ShuttingDown);
        assert!(!state.activate());
        assert_eq!(state.get().as_str(), "shutting_down");
    }
}
