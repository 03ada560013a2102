//! Sink configuration
//!
//! Selects the single downstream consumer of framed records.

use std::path::PathBuf;

use serde::Deserialize;

use crate::logging::LogLevel;

/// Sink type
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    /// Discard records
    Null,
    /// Print one line per record (default)
    #[default]
    Stdout,
    /// Append one line per record to `path`
    File,
    /// Re-emit records through the process log at `level`
    Tracing,
}

impl SinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Stdout => "stdout",
            Self::File => "file",
            Self::Tracing => "tracing",
        }
    }
}

/// Sink configuration
///
/// # Example
///
/// ```toml
/// [sink]
/// type = "file"
/// path = "records.log"
/// flush_each = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Sink type (null, stdout, file, tracing)
    /// Default: stdout
    #[serde(rename = "type")]
    pub sink_type: SinkType,

    /// Colored output (stdout)
    /// Default: true
    pub color: bool,

    /// Prefix lines with time and producer address (stdout)
    /// Default: true
    pub decorate: bool,

    /// Output file (file, required)
    pub path: Option<PathBuf>,

    /// Flush after every record (file)
    /// Default: false
    pub flush_each: bool,

    /// Level records are emitted at (tracing)
    /// Default: info
    pub level: LogLevel,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::Stdout,
            color: true,
            decorate: true,
            path: None,
            flush_each: false,
            level: LogLevel::Info,
        }
    }
}
