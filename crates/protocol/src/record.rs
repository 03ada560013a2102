//! Record types
//!
//! A `Record` is one fully framed unit extracted from a stream. Its body is
//! opaque to the transport: framing only decides where it starts and ends.

use std::net::SocketAddr;
use bytes::Bytes;

/// Wire format of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFormat {
    /// Brace-balanced JSON object
    Json,
    /// `<Event ...>...</Event>` XML element
    Xml,
    /// One self-delimited MessagePack value
    MessagePack,
}

impl RecordFormat {
    /// Get the string name of this format
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::MessagePack => "msgpack",
        }
    }

    /// Check if records of this format are text
    #[inline]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Json | Self::Xml)
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed record
///
/// Cheap to clone: the body is a reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    format: RecordFormat,
    body: Bytes,
    peer: Option<SocketAddr>,
}

impl Record {
    /// Create a record from its raw body
    pub fn new(format: RecordFormat, body: impl Into<Bytes>) -> Self {
        Self {
            format,
            body: body.into(),
            peer: None,
        }
    }

    /// Create a text record by copying the framed slice
    pub fn from_text(format: RecordFormat, text: &str) -> Self {
        Self::new(format, Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Attach the address of the producer that sent this record
    #[must_use]
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    #[inline]
    pub fn format(&self) -> RecordFormat {
        self.format
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[inline]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Body length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body as text, if this is a text record holding valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        if !self.format.is_text() {
            return None;
        }
        std::str::from_utf8(&self.body).ok()
    }
}
