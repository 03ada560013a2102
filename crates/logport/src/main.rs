//! Logport - log event listener
//!
//! # Usage
//!
//! ```bash
//! # JSON over TCP on port 4560, records to stdout
//! logport --port 4560
//!
//! # Settings from a config file, port from the command line
//! logport --port 4560 --config configs/logport.toml
//!
//! # MessagePack over UDP, stop by typing `exit`
//! logport --port 5140 --protocol udp --format msgpack --interactive
//! ```

mod builder;
mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use logport_config::{Config, EventFormat, LogConfig, LogFormat, LogOutput, Protocol};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logport - frames log records from TCP and UDP streams
#[derive(Parser, Debug)]
#[command(name = "logport")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on (1-65535)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Path to configuration file (defaults are used if it cannot be loaded)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport protocol. Overrides config file.
    #[arg(long, value_enum)]
    protocol: Option<ProtocolArg>,

    /// Record format. Overrides config file.
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Bind address. Overrides config file.
    #[arg(short, long)]
    address: Option<String>,

    /// Read `exit`, `quit` or `stop` from stdin to shut down
    #[arg(short, long)]
    interactive: bool,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ProtocolArg {
    Tcp,
    Udp,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Tcp => Protocol::Tcp,
            ProtocolArg::Udp => Protocol::Udp,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FormatArg {
    Json,
    Xml,
    #[value(alias = "messagepack")]
    Msgpack,
}

impl From<FormatArg> for EventFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => EventFormat::Json,
            FormatArg::Xml => EventFormat::Xml,
            FormatArg::Msgpack => EventFormat::MessagePack,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = peek_log_config(cli.config.as_deref());
    let log_level = resolve_log_level(cli.log_level.as_deref(), &log_config);
    init_logging(&log_level, &log_config)?;

    let mut config = Config::load_or_default(cli.config.as_deref());
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("invalid configuration after command line overrides")?;

    serve::run(config, cli.interactive).await
}

/// Command line values win over the config file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    config.server.port = cli.port;
    if let Some(protocol) = cli.protocol {
        config.server.protocol = protocol.into();
    }
    if let Some(format) = cli.format {
        config.server.format = format.into();
    }
    if let Some(address) = &cli.address {
        config.server.address = address.clone();
    }
}

/// Logging settings from the config file, before logging is set up
///
/// Errors are ignored here; `Config::load_or_default` reports them once
/// logging is running.
fn peek_log_config(config_path: Option<&Path>) -> LogConfig {
    config_path
        .filter(|path| path.exists())
        .and_then(|path| Config::from_file(path).ok())
        .map(|config| config.log)
        .unwrap_or_default()
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, log_config: &LogConfig) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => log_config.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, log_config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match log_config.format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(log_writer(log_config.output)),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(log_writer(log_config.output)),
            )
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

fn log_writer(output: LogOutput) -> BoxMakeWriter {
    match output {
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
    }
}
