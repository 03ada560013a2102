//! Source error types

use std::io;
use std::net::SocketAddr;

use logport_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the listening transports and the event bridge
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Undecodable data on a stream
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// TLS configuration could not be built
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// TLS handshake with a peer failed
    #[error("TLS handshake with {peer} failed: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `run` called more than once
    #[error("server already started")]
    AlreadyStarted,
}

impl SourceError {
    /// Create a bind error
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Check if this error means undecodable data
    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Protocol(e) if e.is_decode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = SourceError::bind(
            "0.0.0.0:4560",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        assert!(err.to_string().contains("0.0.0.0:4560"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_decode_classification() {
        let err: SourceError = ProtocolError::decode("msgpack", 10, 3, "bad marker").into();
        assert!(err.is_decode());
        assert!(err.to_string().contains("offset 10"));

        let err: SourceError = io::Error::other("boom").into();
        assert!(!err.is_decode());
    }

    #[test]
    fn test_misc_display() {
        assert!(SourceError::Tls("no key".into()).to_string().contains("no key"));
        assert!(SourceError::InvalidConfig("port".into()).to_string().contains("port"));
        assert_eq!(SourceError::AlreadyStarted.to_string(), "server already started");
    }
}
