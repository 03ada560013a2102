//! Stdout Sink - one line per record
//!
//! Not intended for production use at high throughput: every record takes the
//! stdout lock.
//!
//! # Example Output
//!
//! ```text
//! 07:34:59.161 127.0.0.1:50312 json {"level":"INFO","message":"started"}
//! 07:34:59.162 127.0.0.1:50312 xml  <Event level="WARN">...</Event>
//! ```

use std::io::Write;

use chrono::{DateTime, Local};
use logport_protocol::Record;
use owo_colors::{OwoColorize, Style};

use crate::common::{MetricsSnapshot, Sink, SinkError, SinkMetrics, render_body};

/// Configuration for stdout sink
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    /// Enable colored output
    pub color: bool,

    /// Prefix each line with the local receive time
    pub timestamps: bool,

    /// Include the producer address
    pub show_peer: bool,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            color: true,
            timestamps: true,
            show_peer: true,
        }
    }
}

impl StdoutConfig {
    /// Create config with colors disabled (for piped output)
    pub fn no_color() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    /// Bare record bodies, nothing else
    pub fn plain() -> Self {
        Self {
            color: false,
            timestamps: false,
            show_peer: false,
        }
    }
}

// =============================================================================
// Color Styles
// =============================================================================

struct Styles {
    timestamp: Style,
    label: Style,
}

impl Styles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                timestamp: Style::new().dimmed(),
                label: Style::new().cyan(),
            }
        } else {
            Self {
                timestamp: Style::new(),
                label: Style::new(),
            }
        }
    }
}

// =============================================================================
// StdoutSink Implementation
// =============================================================================

/// Stdout sink for human-readable output
pub struct StdoutSink {
    config: StdoutConfig,
    styles: Styles,
    name: String,
    metrics: SinkMetrics,
}

impl StdoutSink {
    /// Create a new stdout sink with default config
    pub fn new() -> Self {
        Self::with_config(StdoutConfig::default())
    }

    /// Create a new stdout sink with custom config
    pub fn with_config(config: StdoutConfig) -> Self {
        Self {
            styles: Styles::new(config.color),
            config,
            name: "stdout".into(),
            metrics: SinkMetrics::new(),
        }
    }

    /// Format one output line, without the trailing newline
    pub fn format_line(&self, record: &Record, now: DateTime<Local>) -> String {
        let mut line = String::new();

        if self.config.timestamps {
            let ts = now.format("%H:%M:%S%.3f").to_string();
            line.push_str(&ts.style(self.styles.timestamp).to_string());
            line.push(' ');
        }

        if self.config.show_peer {
            let peer = record
                .peer()
                .map_or_else(|| "-".to_string(), |addr| addr.to_string());
            line.push_str(&peer.style(self.styles.label).to_string());
            line.push(' ');
            let format = format!("{:4}", record.format().as_str());
            line.push_str(&format.style(self.styles.label).to_string());
            line.push(' ');
        }

        line.push_str(&render_body(record));
        line
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn accept(&self, record: Record) -> Result<(), SinkError> {
        self.metrics.record_received();
        let line = self.format_line(&record, Local::now());

        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            self.metrics.write_error();
            return Err(e.into());
        }

        self.metrics.record_written(record.len() as u64);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn flush(&self) -> Result<(), SinkError> {
        std::io::stdout().lock().flush()?;
        self.metrics.flush();
        Ok(())
    }
}
