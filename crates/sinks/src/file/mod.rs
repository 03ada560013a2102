//! File sink - appends one line per record
//!
//! Records are rendered with `render_body` and written through a buffered
//! writer guarded by a mutex, so concurrent connection handlers interleave
//! whole lines, never partial ones.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use logport_protocol::Record;
use parking_lot::Mutex;

use crate::common::{MetricsSnapshot, Sink, SinkError, SinkMetrics, render_body};

/// Default write buffer size
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for file sink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, created if missing and appended to otherwise
    pub path: PathBuf,

    /// Flush after every record
    pub flush_each: bool,

    /// Write buffer size in bytes
    pub buffer_size: usize,
}

impl FileSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_each: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn with_flush_each(mut self, flush_each: bool) -> Self {
        self.flush_each = flush_each;
        self
    }
}

/// Sink appending records to a file
pub struct FileSink {
    path: PathBuf,
    flush_each: bool,
    writer: Mutex<BufWriter<File>>,
    name: String,
    metrics: SinkMetrics,
}

impl FileSink {
    /// Open (or create) the output file
    pub fn open(config: FileSinkConfig) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|e| SinkError::init(format!("{}: {e}", config.path.display())))?;

        tracing::debug!(path = %config.path.display(), "file sink opened");

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(config.buffer_size, file)),
            path: config.path,
            flush_each: config.flush_each,
            name: "file".into(),
            metrics: SinkMetrics::new(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn accept(&self, record: Record) -> Result<(), SinkError> {
        self.metrics.record_received();
        let body = render_body(&record);

        let result = write_line(&mut *self.writer.lock(), body.as_bytes(), self.flush_each);

        match result {
            Ok(()) => {
                self.metrics.record_written(record.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.metrics.write_error();
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().flush()?;
        self.metrics.flush();
        Ok(())
    }
}

fn write_line<W: Write>(writer: &mut W, line: &[u8], flush: bool) -> std::io::Result<()> {
    writer.write_all(line)?;
    writer.write_all(b"\n")?;
    if flush {
        writer.flush()?;
    }
    Ok(())
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.get_mut().flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush file sink");
        }
    }
}
