//! Logport Protocol - record framing for inbound event streams
//!
//! This crate turns raw bytes read from a connection or datagram into
//! complete records. It performs no I/O:
//! - `Record` - One framed unit handed to a sink
//! - `RecordFormat` - JSON, XML or MessagePack
//! - `Charset` - Incremental byte-to-text decoding
//! - `Framing` / `scan_json` / `scan_xml` / `scan_markers` - The framing scanner
//! - `TextFramer` - Remainder-carrying framer for text formats
//! - `MessagePackFramer` - Self-delimited binary framer
//!
//! # Wire Formats
//!
//! Text records are concatenated back-to-back with no length prefix and no
//! separator. JSON boundaries are found by brace balancing, XML boundaries by
//! the `<Event` / `</Event>` markers. MessagePack values delimit themselves.

mod charset;
mod error;
mod framer;
mod msgpack;
mod record;
mod scanner;

pub use charset::Charset;
pub use error::ProtocolError;
pub use framer::TextFramer;
pub use msgpack::MessagePackFramer;
pub use record::{Record, RecordFormat};
pub use scanner::{
    Framing, JSON_END_MARKER, JSON_START_MARKER, RecordSpan, XML_END_MARKER, XML_START_MARKER,
    scan_json, scan_markers, scan_xml,
};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Default read buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

// Test modules - only compiled during testing
#[cfg(test)]
mod charset_test;
#[cfg(test)]
mod msgpack_test;
