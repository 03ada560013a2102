//! Text framer with remainder carry-over
//!
//! A `TextFramer` is bound to one stream. Each `push` decodes a freshly read
//! chunk, appends it to the remainder left by the previous push, and emits
//! every complete record in the order its closing boundary is found. Whatever
//! follows the last complete record stays in the remainder for the next push.
//!
//! The remainder is already-decoded text: it is never decoded twice. It is
//! only dropped by `finish`, at end of stream.

use crate::charset::Charset;
use crate::record::RecordFormat;
use crate::scanner::Framing;

/// Incremental framer for JSON and XML streams
#[derive(Debug)]
pub struct TextFramer {
    framing: Framing,
    format: RecordFormat,
    charset: Charset,

    /// Decoded text not yet resolved into a record
    remainder: String,

    /// Raw bytes of a character split across reads
    pending: Vec<u8>,
}

impl TextFramer {
    /// Create a framer for the given text format
    pub fn new(framing: Framing, format: RecordFormat, charset: Charset) -> Self {
        Self {
            framing,
            format,
            charset,
            remainder: String::new(),
            pending: Vec::new(),
        }
    }

    /// JSON framer
    pub fn json(charset: Charset) -> Self {
        Self::new(Framing::Json, RecordFormat::Json, charset)
    }

    /// XML framer
    pub fn xml(charset: Charset) -> Self {
        Self::new(Framing::Xml, RecordFormat::Xml, charset)
    }

    #[inline]
    pub fn format(&self) -> RecordFormat {
        self.format
    }

    #[inline]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Text carried over from previous pushes
    #[inline]
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Bytes waiting for the rest of a multi-byte character
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    /// Decode `chunk` and emit every record it completes
    ///
    /// Returns the number of records emitted.
    pub fn push<F>(&mut self, chunk: &[u8], mut emit: F) -> usize
    where
        F: FnMut(&str),
    {
        let mut text = std::mem::take(&mut self.remainder);
        self.charset.decode_into(&mut self.pending, chunk, &mut text);

        let mut begin = 0;
        let mut emitted = 0;
        while let Some(span) = self.framing.scan(&text, begin) {
            emit(&text[span.start..span.end]);
            begin = span.end;
            emitted += 1;
        }

        text.drain(..begin);
        self.remainder = text;
        emitted
    }

    /// End of stream: return and clear all unresolved text
    pub fn finish(&mut self) -> String {
        let mut text = std::mem::take(&mut self.remainder);
        self.charset.flush_into(&mut self.pending, &mut text);
        text
    }
}
