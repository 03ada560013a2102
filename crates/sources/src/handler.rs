//! Connection Handler
//!
//! Owns one accepted TCP connection for its whole life: optional TLS
//! handshake, then `log_events` in a loop until the peer closes the stream,
//! the data stops decoding, a read fails, or a stop is requested. Errors end
//! this connection only.

use std::net::SocketAddr;
use std::sync::Arc;

use logport_sinks::Sink;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::bridge::{EventBridge, LogEvents};
use crate::common::{TransportMetrics, is_connection_reset};
use crate::error::SourceError;
use crate::registry::HandlerId;
use crate::tls::TlsAcceptor;

/// Why a handler's run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerExit {
    /// Peer closed the connection
    Eof,
    /// `request_stop` or server shutdown
    Stopped,
    /// Undecodable data
    Decode,
    /// Read or handshake failure
    Failed,
}

/// Per-connection state moved into the handler task
pub(crate) struct ConnectionHandler {
    pub(crate) id: HandlerId,
    pub(crate) peer: SocketAddr,
    pub(crate) stop: CancellationToken,
    pub(crate) bridge: EventBridge,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) metrics: Arc<TransportMetrics>,
}

impl ConnectionHandler {
    /// Run the connection to completion
    pub(crate) async fn run(self, stream: TcpStream, tls: Option<TlsAcceptor>) -> HandlerExit {
        let Some(acceptor) = tls else {
            return self.serve(stream).await;
        };

        let handshake = tokio::select! {
            biased;
            _ = self.stop.cancelled() => {
                tracing::debug!(
                    handler_id = self.id,
                    peer = %self.peer,
                    "stopped during TLS handshake"
                );
                return HandlerExit::Stopped;
            }
            result = acceptor.accept(stream) => result,
        };

        match handshake {
            Ok(stream) => self.serve(stream).await,
            Err(source) => {
                let err = SourceError::Handshake {
                    peer: self.peer,
                    source,
                };
                tracing::warn!(handler_id = self.id, error = %err, "TLS handshake failed");
                self.metrics.error();
                HandlerExit::Failed
            }
        }
    }

    /// Read-and-frame loop over a (possibly encrypted) stream
    async fn serve<S>(&self, stream: S) -> HandlerExit
    where
        S: AsyncRead + Unpin,
    {
        let mut events = self
            .bridge
            .wrap_stream(stream)
            .with_peer(self.peer)
            .with_metrics(Arc::clone(&self.metrics));
        let sink = self.sink.as_ref();

        let exit = loop {
            let result = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break HandlerExit::Stopped,
                result = events.log_events(sink) => result,
            };

            match result {
                Ok(LogEvents::Delivered(_)) => {}
                Ok(LogEvents::Eof) => break HandlerExit::Eof,
                Err(e) if e.is_decode() => {
                    tracing::warn!(
                        handler_id = self.id,
                        peer = %self.peer,
                        bytes_read = events.bytes_read(),
                        error = %e,
                        "undecodable data, closing connection"
                    );
                    self.metrics.decode_error();
                    break HandlerExit::Decode;
                }
                Err(SourceError::Io(e)) if is_connection_reset(&e) => {
                    tracing::debug!(
                        handler_id = self.id,
                        peer = %self.peer,
                        error = %e,
                        "connection reset by peer"
                    );
                    break HandlerExit::Eof;
                }
                Err(e) => {
                    tracing::warn!(
                        handler_id = self.id,
                        peer = %self.peer,
                        error = %e,
                        "connection read failed"
                    );
                    self.metrics.error();
                    break HandlerExit::Failed;
                }
            }
        };

        tracing::debug!(
            handler_id = self.id,
            peer = %self.peer,
            bytes_read = events.bytes_read(),
            exit = ?exit,
            "connection closed"
        );
        exit
    }
}
