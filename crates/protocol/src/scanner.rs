//! Framing scanner
//!
//! Locates the next complete record in buffered text. The scanner is a pure
//! function of `(text, begin)`: it holds no state between calls and never
//! allocates.
//!
//! # JSON
//!
//! Starting at the first `{` at or after `begin`, the scanner tracks a nesting
//! depth, an in-string flag and a one-shot escape flag:
//!
//! - `{` outside a string increments depth
//! - `}` outside a string decrements depth; reaching zero completes the record
//! - `"` toggles the in-string flag unless escaped
//! - `\` escapes the next character, inside or outside a string
//!
//! The escape rule applying outside strings is not strict JSON. It is kept
//! because producers in the wild rely on its framing results for stray
//! backslashes.
//!
//! # Markers
//!
//! Marker framing finds the first start marker at or after `begin` and then
//! the first end marker after it. No nesting is tracked. Empty markers never
//! match.
//!
//! XML uses marker framing with one extra rule: `<Event` only opens a record
//! when followed by whitespace or `>`, so both `<Event level="INFO">` and
//! `<Event>` frame while `<EventLog>` does not.

/// JSON record start marker
pub const JSON_START_MARKER: u8 = b'{';

/// JSON record end marker
pub const JSON_END_MARKER: u8 = b'}';

/// XML record start marker, completed by whitespace or `>`
pub const XML_START_MARKER: &str = "<Event";

/// XML record end marker
pub const XML_END_MARKER: &str = "</Event>";

const JSON_STR_DELIM: u8 = b'"';
const JSON_ESC: u8 = b'\\';

/// Byte range of a complete record inside the scanned text
///
/// `text[start..end]` is the record, end marker included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordSpan {
    pub start: usize,
    pub end: usize,
}

impl RecordSpan {
    /// Length of the record in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Find the next brace-balanced JSON object at or after `begin`
///
/// Returns `None` if no `{` exists after `begin` or the object is not yet
/// complete.
pub fn scan_json(text: &str, begin: usize) -> Option<RecordSpan> {
    let bytes = text.as_bytes();
    let start = begin + bytes.get(begin..)?.iter().position(|&b| b == JSON_START_MARKER)?;

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            JSON_START_MARKER if !in_string => depth += 1,
            JSON_END_MARKER if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(RecordSpan { start, end: i + 1 });
                }
            }
            JSON_STR_DELIM => in_string = !in_string,
            JSON_ESC => escaped = true,
            _ => {}
        }
    }

    None
}

/// Find the next `start_marker ... end_marker` span at or after `begin`
pub fn scan_markers(
    text: &str,
    begin: usize,
    start_marker: &str,
    end_marker: &str,
) -> Option<RecordSpan> {
    if start_marker.is_empty() || end_marker.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let start = find(bytes, start_marker.as_bytes(), begin)?;
    let end_at = find(bytes, end_marker.as_bytes(), start + start_marker.len())?;
    Some(RecordSpan {
        start,
        end: end_at + end_marker.len(),
    })
}

/// Find the next `<Event ...>` ... `</Event>` element at or after `begin`
pub fn scan_xml(text: &str, begin: usize) -> Option<RecordSpan> {
    let bytes = text.as_bytes();
    let open_len = XML_START_MARKER.len();

    let mut from = begin;
    let start = loop {
        let at = find(bytes, XML_START_MARKER.as_bytes(), from)?;
        match bytes.get(at + open_len) {
            Some(&b) if b == b'>' || b.is_ascii_whitespace() => break at,
            Some(_) => from = at + open_len,
            // Tag name not yet complete
            None => return None,
        }
    };

    let end_at = find(bytes, XML_END_MARKER.as_bytes(), start + open_len)?;
    Some(RecordSpan {
        start,
        end: end_at + XML_END_MARKER.len(),
    })
}

/// Byte-wise substring search starting at `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

/// Record boundary strategy for text formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Brace-balanced JSON objects
    Json,
    /// `<Event>` elements
    Xml,
    /// Records delimited by a start and an end marker, both non-empty
    Markers { start: String, end: String },
}

impl Framing {
    /// Find the next complete record at or after `begin`
    #[inline]
    pub fn scan(&self, text: &str, begin: usize) -> Option<RecordSpan> {
        match self {
            Self::Json => scan_json(text, begin),
            Self::Xml => scan_xml(text, begin),
            Self::Markers { start, end } => scan_markers(text, begin, start, end),
        }
    }
}
