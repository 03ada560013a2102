//! TLS acceptor for the TCP server
//!
//! Certificate and key handling stays here; the server only sees an
//! acceptor that turns an accepted `TcpStream` into an encrypted stream.
//! The handshake runs inside the connection's handler task.

use std::fmt;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

use crate::error::SourceError;

/// Builds TLS server sessions for accepted connections
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl TlsAcceptor {
    /// Load a PEM certificate chain and private key from disk
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, SourceError> {
        let cert_pem = read_pem(cert_path, "certificate")?;
        let key_pem = read_pem(key_path, "private key")?;
        let acceptor = Self::from_pem(&cert_pem, &key_pem)?;

        tracing::debug!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            "loaded TLS certificate"
        );
        Ok(acceptor)
    }

    /// Build from in-memory PEM data
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, SourceError> {
        let certs = load_certificates(cert_pem)?;
        let key = load_private_key(key_pem)?;

        let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| SourceError::Tls(format!("unsupported protocol versions: {e}")))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| SourceError::Tls(format!("failed to configure server cert: {e}")))?;

        Ok(Self::from_config(Arc::new(config)))
    }

    /// Wrap an already-built rustls configuration
    pub fn from_config(config: Arc<ServerConfig>) -> Self {
        Self {
            inner: tokio_rustls::TlsAcceptor::from(config),
        }
    }

    /// Perform the server side of the handshake
    pub async fn accept(&self, stream: TcpStream) -> io::Result<TlsStream<TcpStream>> {
        self.inner.accept(stream).await
    }
}

impl fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsAcceptor").finish_non_exhaustive()
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path)
        .map_err(|e| SourceError::Tls(format!("failed to read {what} {}: {e}", path.display())))
}

fn load_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, SourceError> {
    let mut reader = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::Tls(format!("invalid certificate PEM: {e}")))?;

    if certs.is_empty() {
        return Err(SourceError::Tls("no certificates found".into()));
    }
    Ok(certs)
}

fn load_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, SourceError> {
    let mut reader = BufReader::new(pem);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| SourceError::Tls(format!("invalid private key PEM: {e}")))?
        .ok_or_else(|| SourceError::Tls("no private key found".into()))
}

#[cfg(test)]
#[path = "tls_test.rs"]
mod tls_test;
