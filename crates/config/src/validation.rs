//! Configuration validation
//!
//! Validates config consistency:
//! - The listener has a usable port and non-zero buffer sizes
//! - TLS is only configured for TCP
//! - Required fields are present for the selected sink

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::server::{MAX_UDP_PAYLOAD, Protocol};
use crate::sink::SinkType;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_sink(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.port == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "port",
            "must be between 1 and 65535",
        ));
    }

    if server.buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "buffer_size",
            "must be greater than 0",
        ));
    }

    if server.max_datagram_size == 0 || server.max_datagram_size > MAX_UDP_PAYLOAD {
        return Err(ConfigError::invalid_value(
            "server",
            "max_datagram_size",
            format!("must be between 1 and {MAX_UDP_PAYLOAD}"),
        ));
    }

    if server.protocol == Protocol::Udp && server.tls.is_some() {
        return Err(ConfigError::invalid_value(
            "server",
            "tls",
            "TLS is only supported with protocol = \"tcp\"",
        ));
    }

    Ok(())
}

fn validate_sink(config: &Config) -> Result<()> {
    if config.sink.sink_type == SinkType::File && config.sink.path.is_none() {
        return Err(ConfigError::missing_field("sink", "path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{Config, ConfigError};

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        Config::from_str(toml)
    }

    #[test]
    fn test_port_zero_rejected() {
        let err = parse("[server]\nport = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "port", .. }));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = parse("[server]\nbuffer_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "buffer_size", .. }));
    }

    #[test]
    fn test_oversized_datagram_limit_rejected() {
        let err = parse("[server]\nmax_datagram_size = 70000").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_datagram_size",
                ..
            }
        ));
    }

    #[test]
    fn test_tls_on_udp_rejected() {
        let toml = r#"
[server]
protocol = "udp"

[server.tls]
cert_path = "a.pem"
key_path = "a.key"
"#;
        let err = parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "tls", .. }));
    }

    #[test]
    fn test_file_sink_requires_path() {
        let err = parse("[sink]\ntype = \"file\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                section: "sink",
                field: "path"
            }
        ));
    }

    #[test]
    fn test_valid_tls_on_tcp() {
        let toml = r#"
[server.tls]
cert_path = "a.pem"
key_path = "a.key"
"#;
        assert!(parse(toml).is_ok());
    }
}
