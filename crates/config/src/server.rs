//! Server configuration
//!
//! The listening transport: protocol, bind address, record format and the
//! read/shutdown knobs.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default listen port
pub const DEFAULT_PORT: u16 = 4560;

/// Largest payload a single IPv4 UDP datagram can carry
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// Transport protocol
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Stream-oriented, one handler per connection (default)
    #[default]
    Tcp,
    /// Datagram-oriented, one record batch per datagram
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Wire format of inbound records
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    /// Brace-balanced JSON objects (default)
    #[default]
    Json,
    /// `<Event ...>...</Event>` elements
    Xml,
    /// Self-delimited MessagePack values
    #[serde(rename = "msgpack", alias = "messagepack")]
    MessagePack,
}

impl EventFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::MessagePack => "msgpack",
        }
    }
}

/// Character set of text formats
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum CharsetName {
    /// UTF-8 (default)
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    /// ISO-8859-1
    #[serde(rename = "iso-8859-1", alias = "latin1", alias = "ISO-8859-1")]
    Latin1,
}

/// TLS settings for the TCP listener
///
/// # Example
///
/// ```toml
/// [server.tls]
/// cert_path = "server.pem"
/// key_path = "server.key"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain
    pub cert_path: PathBuf,

    /// PEM private key
    pub key_path: PathBuf,
}

/// Server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// protocol = "tcp"
/// port = 4560
/// format = "json"
/// shutdown_timeout = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport protocol (tcp, udp)
    /// Default: tcp
    pub protocol: Protocol,

    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 4560
    pub port: u16,

    /// Pending connection queue length (tcp only)
    /// Default: 50
    pub backlog: u32,

    /// Record format (json, xml, msgpack)
    /// Default: json
    pub format: EventFormat,

    /// Character set for text formats
    /// Default: utf-8
    pub charset: CharsetName,

    /// Bytes per read
    /// Default: 4096
    pub buffer_size: usize,

    /// Datagrams above this size are truncated (udp only)
    /// Default: 65507
    pub max_datagram_size: usize,

    /// Enable TCP_NODELAY on accepted connections
    /// Default: true
    pub nodelay: bool,

    /// Abort handlers still running this long after shutdown
    /// Default: none (wait for every handler)
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Option<Duration>,

    /// TLS for the TCP listener
    /// Default: none (plaintext)
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Tcp,
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            backlog: 50,
            format: EventFormat::Json,
            charset: CharsetName::Utf8,
            buffer_size: 4096,
            max_datagram_size: MAX_UDP_PAYLOAD,
            nodelay: true,
            shutdown_timeout: None,
            tls: None,
        }
    }
}

impl ServerConfig {
    /// `address:port` as a bind string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
