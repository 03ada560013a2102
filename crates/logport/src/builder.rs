//! Builds runtime components from configuration

use std::sync::Arc;

use logport_config::{CharsetName, EventFormat, LogLevel, ServerConfig, SinkConfig, SinkType};
use logport_protocol::{Charset, RecordFormat};
use logport_sinks::{
    FileSink, FileSinkConfig, NullSink, Sink, SinkError, StdoutConfig, StdoutSink, TracingSink,
};
use logport_sources::{
    BridgeOptions, EventBridge, SourceError, TcpServerConfig, TlsAcceptor, UdpServerConfig,
};

/// Create the configured sink
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>, SinkError> {
    let sink: Arc<dyn Sink> = match config.sink_type {
        SinkType::Null => Arc::new(NullSink::new()),
        SinkType::Stdout => Arc::new(StdoutSink::with_config(StdoutConfig {
            color: config.color,
            timestamps: config.decorate,
            show_peer: config.decorate,
        })),
        SinkType::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| SinkError::init("file sink requires `path`"))?;
            let file_config = FileSinkConfig::new(path).with_flush_each(config.flush_each);
            Arc::new(FileSink::open(file_config)?)
        }
        SinkType::Tracing => Arc::new(TracingSink::new(tracing_level(config.level))),
    };
    Ok(sink)
}

pub fn tracing_level(level: LogLevel) -> tracing::Level {
    match level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    }
}

/// Select the framing strategy
pub fn build_bridge(server: &ServerConfig) -> EventBridge {
    let format = match server.format {
        EventFormat::Json => RecordFormat::Json,
        EventFormat::Xml => RecordFormat::Xml,
        EventFormat::MessagePack => RecordFormat::MessagePack,
    };
    let charset = match server.charset {
        CharsetName::Utf8 => Charset::Utf8,
        CharsetName::Latin1 => Charset::Latin1,
    };

    EventBridge::new(
        format,
        BridgeOptions {
            buffer_size: server.buffer_size,
            charset,
        },
    )
}

pub fn tcp_config(server: &ServerConfig) -> TcpServerConfig {
    TcpServerConfig {
        address: server.address.clone(),
        port: server.port,
        backlog: i32::try_from(server.backlog).unwrap_or(i32::MAX),
        nodelay: server.nodelay,
        shutdown_timeout: server.shutdown_timeout,
    }
}

pub fn udp_config(server: &ServerConfig) -> UdpServerConfig {
    UdpServerConfig {
        address: server.address.clone(),
        port: server.port,
        max_datagram_size: server.max_datagram_size,
    }
}

/// Load the TLS acceptor when `[server.tls]` is present
pub fn build_tls(server: &ServerConfig) -> Result<Option<TlsAcceptor>, SourceError> {
    server
        .tls
        .as_ref()
        .map(|tls| TlsAcceptor::from_pem_files(&tls.cert_path, &tls.key_path))
        .transpose()
}
