//! Serve - run one listening transport until told to stop
//!
//! Without `--interactive` the server stops on Ctrl-C or SIGTERM. With it,
//! typing `exit`, `quit` or `stop` on stdin does the same. Either way
//! `shutdown()` is called and the server task joined before returning.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use logport_config::{Config, Protocol};
use logport_sinks::Sink;
use logport_sources::{MetricsSnapshot, SourceError, TcpSocketServer, UdpSocketServer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::builder;

/// Stdin commands that stop an interactive run
const STOP_COMMANDS: [&str; 3] = ["exit", "quit", "stop"];

/// The one transport this process runs
enum Server {
    Tcp(Arc<TcpSocketServer>),
    Udp(Arc<UdpSocketServer>),
}

impl Server {
    fn start(&self) -> JoinHandle<Result<(), SourceError>> {
        match self {
            Self::Tcp(server) => server.start(),
            Self::Udp(server) => server.start(),
        }
    }

    fn shutdown(&self) {
        match self {
            Self::Tcp(server) => server.shutdown(),
            Self::Udp(server) => server.shutdown(),
        }
    }

    fn local_addr(&self) -> SocketAddr {
        match self {
            Self::Tcp(server) => server.local_addr(),
            Self::Udp(server) => server.local_addr(),
        }
    }

    fn metrics(&self) -> MetricsSnapshot {
        match self {
            Self::Tcp(server) => server.metrics().snapshot(),
            Self::Udp(server) => server.metrics().snapshot(),
        }
    }
}

/// Run the configured transport
pub async fn run(config: Config, interactive: bool) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        protocol = config.server.protocol.as_str(),
        address = %config.server.bind_address(),
        format = config.server.format.as_str(),
        sink = config.sink.sink_type.as_str(),
        "logport starting"
    );

    let sink = builder::build_sink(&config.sink).context("failed to create sink")?;
    let bridge = builder::build_bridge(&config.server);

    let server = match config.server.protocol {
        Protocol::Tcp => {
            let tls = builder::build_tls(&config.server).context("failed to load TLS certificate")?;
            let server = TcpSocketServer::bind(
                builder::tcp_config(&config.server),
                bridge,
                Arc::clone(&sink),
                tls,
            )
            .context("failed to start TCP server")?;
            Server::Tcp(Arc::new(server))
        }
        Protocol::Udp => {
            let udp = builder::udp_config(&config.server);
            let server = UdpSocketServer::bind(udp, bridge, Arc::clone(&sink))
                .context("failed to start UDP server")?;
            Server::Udp(Arc::new(server))
        }
    };

    let mut handle = server.start();
    if interactive {
        info!(address = %server.local_addr(), "type exit, quit or stop to shut down");
    }

    let result = tokio::select! {
        reason = wait_for_stop(interactive) => {
            info!(reason, "stopping server");
            server.shutdown();
            handle.await
        }
        // Server ended without being asked to
        result = &mut handle => result,
    };

    let outcome = match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(anyhow::Error::new(e).context("server failed")),
        Err(e) => Err(anyhow::anyhow!("server task failed: {}", e)),
    };

    if let Err(e) = sink.flush() {
        warn!(sink = sink.name(), error = %e, "failed to flush sink");
    }
    log_metrics(&server.metrics(), sink.as_ref());

    outcome?;
    info!("logport shutdown complete");
    Ok(())
}

fn log_metrics(transport: &MetricsSnapshot, sink: &dyn Sink) {
    let sink_metrics = sink.metrics();
    info!(
        connections_total = transport.connections_total,
        datagrams_received = transport.datagrams_received,
        datagrams_truncated = transport.datagrams_truncated,
        records_received = transport.records_received,
        bytes_received = transport.bytes_received,
        decode_errors = transport.decode_errors,
        sink_errors = transport.sink_errors,
        errors = transport.errors,
        handlers_aborted = transport.handlers_aborted,
        records_written = sink_metrics.records_written,
        records_dropped = sink_metrics.records_dropped,
        "final metrics"
    );
}

/// Wait for whichever stop trigger applies, returning its name
async fn wait_for_stop(interactive: bool) -> &'static str {
    if !interactive {
        return wait_for_signal().await;
    }

    tokio::select! {
        reason = wait_for_command() => reason,
        reason = wait_for_signal() => reason,
    }
}

/// Read stdin until a stop command
///
/// On stdin EOF only signals can stop the server.
async fn wait_for_command() -> &'static str {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stop_command(&line) => return "stdin command",
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    warn!(command = line.trim(), "unknown command, expected exit, quit or stop");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        }
    }
    std::future::pending().await
}

fn is_stop_command(line: &str) -> bool {
    let line = line.trim();
    STOP_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd))
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    }
}
