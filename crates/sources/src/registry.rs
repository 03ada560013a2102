//! Handler Registry
//!
//! Live TCP connection handlers, keyed by an id allocated at accept time.
//! The accept loop inserts an entry before it spawns the handler task, and
//! the handler removes its own entry through a `HandlerGuard` when the task
//! ends, on every exit path. The registry is only iterated during shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::common::TransportMetrics;

/// Opaque handler identifier
pub type HandlerId = u64;

/// Registry entry for one running connection handler
#[derive(Debug, Clone)]
pub struct HandlerEntry {
    peer: SocketAddr,
    stop: CancellationToken,
    started: Instant,
}

impl HandlerEntry {
    pub fn new(peer: SocketAddr, stop: CancellationToken) -> Self {
        Self {
            peer,
            stop,
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Time since the connection was accepted
    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// Signal the handler to stop
    ///
    /// The handler races its pending read against this signal, so a blocked
    /// read is abandoned and the stream dropped without waiting for data.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    #[inline]
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Concurrent map of live handlers, owned by one server
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: DashMap<HandlerId, HandlerEntry>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and insert `entry` under it
    pub fn register(&self, entry: HandlerEntry) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, entry);
        id
    }

    pub fn remove(&self, id: HandlerId) -> Option<HandlerEntry> {
        self.handlers.remove(&id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Peer addresses of all live handlers
    pub fn peers(&self) -> Vec<(HandlerId, SocketAddr)> {
        self.handlers
            .iter()
            .map(|entry| (*entry.key(), entry.value().peer))
            .collect()
    }

    /// Call `request_stop` on every registered handler
    ///
    /// Returns the number of handlers signalled.
    pub fn request_stop_all(&self) -> usize {
        let mut signalled = 0;
        for entry in self.handlers.iter() {
            entry.value().request_stop();
            signalled += 1;
        }
        signalled
    }
}

/// Deregisters a handler when dropped
///
/// Moved into the handler task, so the entry is removed and the active
/// connection count decremented whether the task returns, panics, or is
/// aborted.
#[derive(Debug)]
pub(crate) struct HandlerGuard {
    id: HandlerId,
    registry: Arc<HandlerRegistry>,
    metrics: Arc<TransportMetrics>,
}

impl HandlerGuard {
    /// Register `entry` and count the connection as opened
    pub(crate) fn register(
        registry: &Arc<HandlerRegistry>,
        metrics: &Arc<TransportMetrics>,
        entry: HandlerEntry,
    ) -> Self {
        let id = registry.register(entry);
        metrics.connection_opened();
        Self {
            id,
            registry: Arc::clone(registry),
            metrics: Arc::clone(metrics),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> HandlerId {
        self.id
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.metrics.connection_closed();
        self.registry.remove(self.id);
    }
}
