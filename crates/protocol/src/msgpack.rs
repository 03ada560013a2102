//! MessagePack framer
//!
//! MessagePack values delimit themselves, so no scanner is involved. The
//! framer walks the type headers of the buffered bytes, jumping over
//! str/bin/ext bodies, until one top-level value is complete. The walk is
//! resumable: a value cut short by the end of the buffer keeps its progress
//! and the number of bytes it needs, and nothing is re-read until that many
//! bytes are buffered. A complete value is then checked by the decoder before
//! it is emitted. Anything the decoder rejects is corrupt and ends the stream.
//!
//! Emitted record bodies are the exact bytes of each value.

use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::Result;
use crate::error::ProtocolError;
use crate::record::RecordFormat;

/// Never a valid first byte of a MessagePack value
const NEVER_USED: u8 = 0xc1;

/// Incremental framer for a stream of MessagePack values
#[derive(Debug, Default)]
pub struct MessagePackFramer {
    buffer: BytesMut,

    /// Stream bytes already emitted as records
    offset: u64,

    /// Walk position inside the first buffered value
    walk: ValueWalk,

    /// Buffer length needed before walking again
    needed: usize,
}

impl MessagePackFramer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn format(&self) -> RecordFormat {
        RecordFormat::MessagePack
    }

    /// Bytes held for an incomplete value
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Stream offset of the first buffered byte
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Buffered byte count at which decoding resumes
    #[inline]
    pub fn needed(&self) -> usize {
        self.needed
    }

    /// Append `chunk` and emit every value it completes
    ///
    /// Records completed before a corrupt value are emitted before the error
    /// is returned.
    pub fn push<F>(&mut self, chunk: &[u8], mut emit: F) -> Result<usize>
    where
        F: FnMut(Bytes),
    {
        self.buffer.extend_from_slice(chunk);

        let mut emitted = 0;
        while !self.buffer.is_empty() && self.buffer.len() >= self.needed {
            match self.walk.advance(&self.buffer) {
                Walk::Complete(len) => {
                    self.validate(len)?;
                    emit(self.buffer.split_to(len).freeze());
                    self.offset += len as u64;
                    self.walk = ValueWalk::default();
                    self.needed = 0;
                    emitted += 1;
                }
                Walk::Truncated(needed) => self.needed = needed,
                Walk::Invalid(marker) => {
                    return Err(self.corrupt(format!("invalid marker byte {marker:#04x}")));
                }
            }
        }

        Ok(emitted)
    }

    /// End of stream: return and clear any incomplete trailing value
    pub fn finish(&mut self) -> Bytes {
        let rest = self.buffer.split().freeze();
        self.offset += rest.len() as u64;
        self.walk = ValueWalk::default();
        self.needed = 0;
        rest
    }

    /// Let the decoder check one complete value, borrowing its bytes
    fn validate(&self, len: usize) -> Result<()> {
        let mut de = rmp_serde::Deserializer::from_read_ref(&self.buffer[..len]);
        IgnoredAny::deserialize(&mut de)
            .map(drop)
            .map_err(|e| self.corrupt(e.to_string()))
    }

    fn corrupt(&self, message: String) -> ProtocolError {
        ProtocolError::decode(
            RecordFormat::MessagePack.as_str(),
            self.offset,
            self.buffer.len(),
            message,
        )
    }
}

/// Outcome of walking the first buffered value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    /// The value spans this many bytes
    Complete(usize),
    /// The buffer must reach this length before the walk can continue
    Truncated(usize),
    /// A header byte that starts no value
    Invalid(u8),
}

/// Resumable header walk over one top-level value
///
/// `pos` always points at the start of an element header, so a walk that
/// stops on a truncated header or body picks up at the same element.
#[derive(Debug, Default)]
struct ValueWalk {
    pos: usize,

    /// Elements still expected by each open array or map, innermost last
    open: Vec<u64>,
}

impl ValueWalk {
    fn advance(&mut self, buf: &[u8]) -> Walk {
        loop {
            while self.open.last() == Some(&0) {
                self.open.pop();
            }
            if self.pos > 0 && self.open.is_empty() {
                return Walk::Complete(self.pos);
            }

            match header(buf, self.pos) {
                Header::Truncated(needed) => return Walk::Truncated(needed),
                Header::Invalid(marker) => return Walk::Invalid(marker),
                Header::Scalar(len) => {
                    let end = self.pos.saturating_add(len);
                    if end > buf.len() {
                        return Walk::Truncated(end);
                    }
                    self.pos = end;
                    self.element_done();
                }
                Header::Container { len, items } => {
                    self.pos += len;
                    self.element_done();
                    if items > 0 {
                        self.open.push(items);
                    }
                }
            }
        }
    }

    fn element_done(&mut self) {
        if let Some(remaining) = self.open.last_mut() {
            *remaining -= 1;
        }
    }
}

/// One element header
enum Header {
    /// Fixed-size or length-prefixed value, header and body included
    Scalar(usize),
    /// Array or map header of `len` bytes followed by `items` elements
    Container { len: usize, items: u64 },
    Truncated(usize),
    Invalid(u8),
}

fn header(buf: &[u8], pos: usize) -> Header {
    let Some(&marker) = buf.get(pos) else {
        return Header::Truncated(pos + 1);
    };

    match marker {
        0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => Header::Scalar(1),
        0x80..=0x8f => Header::Container {
            len: 1,
            items: 2 * u64::from(marker & 0x0f),
        },
        0x90..=0x9f => Header::Container {
            len: 1,
            items: u64::from(marker & 0x0f),
        },
        0xa0..=0xbf => Header::Scalar(1 + usize::from(marker & 0x1f)),
        NEVER_USED => Header::Invalid(marker),
        // bin 8/16/32
        0xc4 => sized(buf, pos, 1, 0),
        0xc5 => sized(buf, pos, 2, 0),
        0xc6 => sized(buf, pos, 4, 0),
        // ext 8/16/32 carry a type byte after the length
        0xc7 => sized(buf, pos, 1, 1),
        0xc8 => sized(buf, pos, 2, 1),
        0xc9 => sized(buf, pos, 4, 1),
        0xca => Header::Scalar(5),
        0xcb => Header::Scalar(9),
        0xcc | 0xd0 => Header::Scalar(2),
        0xcd | 0xd1 => Header::Scalar(3),
        0xce | 0xd2 => Header::Scalar(5),
        0xcf | 0xd3 => Header::Scalar(9),
        // fixext 1/2/4/8/16
        0xd4 => Header::Scalar(3),
        0xd5 => Header::Scalar(4),
        0xd6 => Header::Scalar(6),
        0xd7 => Header::Scalar(10),
        0xd8 => Header::Scalar(18),
        // str 8/16/32
        0xd9 => sized(buf, pos, 1, 0),
        0xda => sized(buf, pos, 2, 0),
        0xdb => sized(buf, pos, 4, 0),
        // array 16/32, map 16/32
        0xdc => counted(buf, pos, 2, 1),
        0xdd => counted(buf, pos, 4, 1),
        0xde => counted(buf, pos, 2, 2),
        0xdf => counted(buf, pos, 4, 2),
    }
}

/// Header with a `width`-byte big-endian body length
fn sized(buf: &[u8], pos: usize, width: usize, extra: usize) -> Header {
    match read_len(buf, pos + 1, width) {
        Some(body) => Header::Scalar((1 + width + extra).saturating_add(body)),
        None => Header::Truncated(pos + 1 + width),
    }
}

/// Header with a `width`-byte big-endian element count
fn counted(buf: &[u8], pos: usize, width: usize, per_entry: u64) -> Header {
    match read_len(buf, pos + 1, width) {
        Some(count) => Header::Container {
            len: 1 + width,
            items: count as u64 * per_entry,
        },
        None => Header::Truncated(pos + 1 + width),
    }
}

fn read_len(buf: &[u8], at: usize, width: usize) -> Option<usize> {
    let bytes = buf.get(at..at + width)?;
    Some(bytes.iter().fold(0usize, |n, &b| (n << 8) | usize::from(b)))
}
