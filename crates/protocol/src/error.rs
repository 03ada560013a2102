//! Protocol error types
//!
//! Errors that can occur while framing or decoding records.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Binary value could not be decoded
    ///
    /// `offset` is the number of bytes successfully consumed from the stream
    /// before the failing value, `buffered` the number of bytes that were
    /// available for the failing value.
    #[error(
        "corrupt {format} record at stream offset {offset} ({buffered} bytes buffered): {message}"
    )]
    Decode {
        format: &'static str,
        offset: u64,
        buffered: usize,
        message: String,
    },
}

impl ProtocolError {
    /// Create a decode error
    #[inline]
    pub fn decode(
        format: &'static str,
        offset: u64,
        buffered: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            format,
            offset,
            buffered,
            message: message.into(),
        }
    }

    /// Check if this error is a corrupt-data error
    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
