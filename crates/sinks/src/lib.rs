//! Logport - Sinks
//!
//! Downstream consumers of framed records. Every transport hands each record
//! to exactly one `Sink` through `Sink::accept`, synchronously and in stream
//! order, so sinks must return promptly.
//!
//! ```text
//! [EventStream] --Record--> [Sink::accept] --> [Destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Blocking I/O |
//! |------|---------|--------------|
//! | `null` | Benchmarking (discard all) | No |
//! | `stdout` | Human-readable output | Yes (stdout) |
//! | `file` | Append records to a file | Yes (buffered) |
//! | `tracing_sink` | Re-emit into the local log pipeline | Subscriber-defined |
//! | `channel` | Hand records to another task | No (drops when full) |
//!
//! # Example
//!
//! ```ignore
//! use logport_sinks::{NullSink, Sink};
//! use logport_protocol::{Record, RecordFormat};
//!
//! let sink = NullSink::new();
//! sink.accept(Record::from_text(RecordFormat::Json, r#"{"a":1}"#))?;
//! assert_eq!(sink.metrics().records_received, 1);
//! ```

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Null sink - discards all records
pub mod null;

/// Stdout sink - one line per record
pub mod stdout;

/// File sink - appends one line per record
pub mod file;

/// Tracing sink - re-emits records as tracing events
pub mod tracing_sink;

/// Channel sink - forwards records into a bounded channel
pub mod channel;

// =============================================================================
// Shared types
// =============================================================================

/// Common types shared by all sinks (trait, errors, metrics)
mod common;

// =============================================================================
// Public re-exports
// =============================================================================

pub use common::{MetricsSnapshot, Sink, SinkError, SinkMetrics, render_body};

pub use channel::ChannelSink;
pub use file::{FileSink, FileSinkConfig};
pub use null::NullSink;
pub use stdout::{StdoutConfig, StdoutSink};
pub use tracing_sink::TracingSink;
