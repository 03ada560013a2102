//! Event Bridge
//!
//! Turns a raw byte stream into records pushed to a sink. The bridge itself
//! holds only fixed configuration; `wrap_stream` binds a fresh decoder to one
//! stream and returns an `EventStream` that owns all per-stream state.
//!
//! # Strategies
//!
//! | Variant | Framing | Per-stream state |
//! |---------|---------|------------------|
//! | `Json` | brace balancing | remainder text, pending bytes |
//! | `Xml` | `<Event` / `</Event>` markers | remainder text, pending bytes |
//! | `MessagePack` | self-delimited values | undecoded bytes |
//!
//! # Reading
//!
//! `EventStream::log_events` performs exactly one read. Every record that read
//! completes is handed to the sink before it returns, in stream order. It never
//! waits for more data beyond that single read: looping is the caller's job.

use std::net::SocketAddr;
use std::sync::Arc;

use logport_protocol::{
    Charset, DEFAULT_BUFFER_SIZE, MessagePackFramer, ProtocolError, Record, RecordFormat,
    TextFramer,
};
use logport_sinks::Sink;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::TransportMetrics;
use crate::error::SourceError;

/// Fixed settings shared by every stream a bridge wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Bytes per read
    pub buffer_size: usize,

    /// Character set of text formats
    pub charset: Charset,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            charset: Charset::Utf8,
        }
    }
}

/// Record framing strategy, selected at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBridge {
    /// Brace-balanced JSON objects
    Json(BridgeOptions),
    /// `<Event ...>...</Event>` elements
    Xml(BridgeOptions),
    /// Self-delimited MessagePack values
    MessagePack(BridgeOptions),
}

impl EventBridge {
    /// Create a bridge for `format`
    pub fn new(format: RecordFormat, options: BridgeOptions) -> Self {
        match format {
            RecordFormat::Json => Self::Json(options),
            RecordFormat::Xml => Self::Xml(options),
            RecordFormat::MessagePack => Self::MessagePack(options),
        }
    }

    pub fn json() -> Self {
        Self::Json(BridgeOptions::default())
    }

    pub fn xml() -> Self {
        Self::Xml(BridgeOptions::default())
    }

    pub fn msgpack() -> Self {
        Self::MessagePack(BridgeOptions::default())
    }

    #[inline]
    pub fn format(&self) -> RecordFormat {
        match self {
            Self::Json(_) => RecordFormat::Json,
            Self::Xml(_) => RecordFormat::Xml,
            Self::MessagePack(_) => RecordFormat::MessagePack,
        }
    }

    #[inline]
    pub fn options(&self) -> &BridgeOptions {
        match self {
            Self::Json(options) | Self::Xml(options) | Self::MessagePack(options) => options,
        }
    }

    /// Bind a fresh decoder to `raw`
    pub fn wrap_stream<R>(&self, raw: R) -> EventStream<R>
    where
        R: AsyncRead + Unpin,
    {
        let options = self.options();
        let decoder = match self {
            Self::Json(_) => Decoder::Text(TextFramer::json(options.charset)),
            Self::Xml(_) => Decoder::Text(TextFramer::xml(options.charset)),
            Self::MessagePack(_) => Decoder::MessagePack(MessagePackFramer::new()),
        };

        EventStream {
            reader: raw,
            decoder,
            buf: vec![0u8; options.buffer_size.max(1)],
            peer: None,
            metrics: None,
            bytes_read: 0,
        }
    }
}

/// Outcome of one `log_events` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvents {
    /// A read completed; this many records were handed to the sink
    Delivered(usize),
    /// The peer closed the stream
    Eof,
}

impl LogEvents {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

#[derive(Debug)]
enum Decoder {
    Text(TextFramer),
    MessagePack(MessagePackFramer),
}

/// One stream bound to its decoder state
#[derive(Debug)]
pub struct EventStream<R> {
    reader: R,
    decoder: Decoder,
    buf: Vec<u8>,
    peer: Option<SocketAddr>,
    metrics: Option<Arc<TransportMetrics>>,
    bytes_read: u64,
}

impl<R> EventStream<R>
where
    R: AsyncRead + Unpin,
{
    /// Tag every record from this stream with the producer address
    #[must_use]
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Count bytes, records and sink failures into `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<TransportMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Total bytes read from the underlying stream
    #[inline]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Decoded text waiting for the rest of its record (text formats)
    pub fn remainder(&self) -> &str {
        match &self.decoder {
            Decoder::Text(framer) => framer.remainder(),
            Decoder::MessagePack(_) => "",
        }
    }

    /// Perform one read and deliver every record it completes
    ///
    /// # Errors
    ///
    /// I/O errors from the stream are returned unchanged. A corrupt
    /// MessagePack value, or one cut short by end of stream, is a
    /// `SourceError::Protocol`. Sink failures are logged and counted, never
    /// returned.
    pub async fn log_events(&mut self, sink: &dyn Sink) -> Result<LogEvents, SourceError> {
        let n = self.reader.read(&mut self.buf).await?;
        if n == 0 {
            self.end_of_stream()?;
            return Ok(LogEvents::Eof);
        }

        self.bytes_read += n as u64;
        if let Some(metrics) = &self.metrics {
            metrics.bytes_read(n as u64);
        }

        let delivered = self.frame(n, sink)?;
        Ok(LogEvents::Delivered(delivered))
    }

    /// Frame the first `n` bytes of the read buffer
    fn frame(&mut self, n: usize, sink: &dyn Sink) -> Result<usize, SourceError> {
        let Self {
            decoder,
            buf,
            peer,
            metrics,
            ..
        } = self;
        let chunk = &buf[..n];
        let emit = |record: Record| deliver(sink, record, *peer, metrics.as_deref());

        match decoder {
            Decoder::Text(framer) => {
                let format = framer.format();
                Ok(framer.push(chunk, |text| emit(Record::from_text(format, text))))
            }
            Decoder::MessagePack(framer) => {
                let delivered =
                    framer.push(chunk, |body| emit(Record::new(RecordFormat::MessagePack, body)))?;
                Ok(delivered)
            }
        }
    }

    /// Resolve whatever is left once the peer has closed the stream
    fn end_of_stream(&mut self) -> Result<(), SourceError> {
        match &mut self.decoder {
            Decoder::Text(framer) => {
                let leftover = framer.finish();
                if !leftover.trim().is_empty() {
                    tracing::debug!(
                        peer = ?self.peer,
                        discarded = leftover.len(),
                        "stream ended inside a record, discarding remainder"
                    );
                }
                Ok(())
            }
            Decoder::MessagePack(framer) => {
                let offset = framer.offset();
                let leftover = framer.finish();
                if leftover.is_empty() {
                    return Ok(());
                }
                Err(ProtocolError::decode(
                    RecordFormat::MessagePack.as_str(),
                    offset,
                    leftover.len(),
                    "stream ended inside a value",
                )
                .into())
            }
        }
    }
}

/// Hand one record to the sink, counting the outcome
fn deliver(
    sink: &dyn Sink,
    record: Record,
    peer: Option<SocketAddr>,
    metrics: Option<&TransportMetrics>,
) {
    let record = match peer {
        Some(peer) => record.with_peer(peer),
        None => record,
    };

    match sink.accept(record) {
        Ok(()) => {
            if let Some(metrics) = metrics {
                metrics.record_received();
            }
        }
        Err(e) => {
            tracing::debug!(sink = sink.name(), peer = ?peer, error = %e, "sink rejected record");
            if let Some(metrics) = metrics {
                metrics.sink_error();
            }
        }
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;
