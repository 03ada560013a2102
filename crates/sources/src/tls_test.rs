//! TLS acceptor tests

use std::io::Write;

use tempfile::NamedTempFile;

use crate::SourceError;
use crate::tls::TlsAcceptor;

fn self_signed() -> (String, String) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    (certified.cert.pem(), certified.key_pair.serialize_pem())
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_pem_valid() {
    let (cert, key) = self_signed();
    assert!(TlsAcceptor::from_pem(cert.as_bytes(), key.as_bytes()).is_ok());
}

#[test]
fn test_from_pem_files_valid() {
    let (cert, key) = self_signed();
    let cert_file = write_temp(&cert);
    let key_file = write_temp(&key);

    let acceptor = TlsAcceptor::from_pem_files(cert_file.path(), key_file.path()).unwrap();
    assert!(format!("{acceptor:?}").contains("TlsAcceptor"));
}

#[test]
fn test_missing_certificate_file() {
    let err = TlsAcceptor::from_pem_files(
        std::path::Path::new("/nonexistent/server.pem"),
        std::path::Path::new("/nonexistent/server.key"),
    )
    .unwrap_err();

    assert!(matches!(err, SourceError::Tls(_)));
    assert!(err.to_string().contains("/nonexistent/server.pem"));
}

#[test]
fn test_no_certificates_in_pem() {
    let (_, key) = self_signed();
    let err = TlsAcceptor::from_pem(b"", key.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("no certificates"));
}

#[test]
fn test_no_private_key_in_pem() {
    let (cert, _) = self_signed();
    let err = TlsAcceptor::from_pem(cert.as_bytes(), cert.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("no private key"));
}

