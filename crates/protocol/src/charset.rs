//! Character set decoding
//!
//! Decoding is incremental: bytes that end in the middle of a multi-byte
//! sequence are held back until the next chunk completes them, so a character
//! split across two reads is never mangled.

/// Character encoding of text records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    /// UTF-8 (default)
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per character
    Latin1,
}

impl Charset {
    /// Canonical name of this charset
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Decode `chunk` into `out`
    ///
    /// `pending` holds undecoded bytes left over from the previous call and is
    /// updated with whatever trails this chunk incompletely.
    pub fn decode_into(self, pending: &mut Vec<u8>, chunk: &[u8], out: &mut String) {
        match self {
            Self::Utf8 => decode_utf8(pending, chunk, out),
            Self::Latin1 => {
                out.reserve(chunk.len());
                out.extend(chunk.iter().map(|&b| char::from(b)));
            }
        }
    }

    /// Decode whatever is still pending, replacing incomplete sequences
    pub fn flush_into(self, pending: &mut Vec<u8>, out: &mut String) {
        if !pending.is_empty() {
            out.push_str(&String::from_utf8_lossy(pending));
            pending.clear();
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_utf8(pending: &mut Vec<u8>, chunk: &[u8], out: &mut String) {
    // Fast path: nothing carried over
    let owned;
    let input: &[u8] = if pending.is_empty() {
        chunk
    } else {
        pending.extend_from_slice(chunk);
        owned = std::mem::take(pending);
        &owned
    };

    let mut pos = 0;
    while pos < input.len() {
        match std::str::from_utf8(&input[pos..]) {
            Ok(valid) => {
                out.push_str(valid);
                pos = input.len();
            }
            Err(e) => {
                let valid_end = pos + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&input[pos..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pos = valid_end + len;
                    }
                    None => {
                        // Truncated sequence at the end - wait for more bytes
                        pending.clear();
                        pending.extend_from_slice(&input[valid_end..]);
                        return;
                    }
                }
            }
        }
    }
    pending.clear();
}
