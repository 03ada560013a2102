//! Tests for incremental charset decoding

use crate::charset::Charset;

fn decode_chunks(charset: Charset, chunks: &[&[u8]]) -> (String, Vec<u8>) {
    let mut pending = Vec::new();
    let mut out = String::new();
    for chunk in chunks {
        charset.decode_into(&mut pending, chunk, &mut out);
    }
    (out, pending)
}

#[test]
fn test_utf8_single_chunk() {
    let (out, pending) = decode_chunks(Charset::Utf8, &["héllo".as_bytes()]);
    assert_eq!(out, "héllo");
    assert!(pending.is_empty());
}

#[test]
fn test_utf8_split_multibyte_sequence() {
    // "€" is E2 82 AC
    let bytes = "a€b".as_bytes();
    let (out, pending) = decode_chunks(Charset::Utf8, &[&bytes[..2], &bytes[2..3]]);
    assert_eq!(out, "a");
    assert_eq!(pending, vec![0xE2, 0x82]);

    let (out, pending) = decode_chunks(Charset::Utf8, &[&bytes[..2], &bytes[2..3], &bytes[3..]]);
    assert_eq!(out, "a€b");
    assert!(pending.is_empty());
}

#[test]
fn test_utf8_split_every_byte() {
    let text = "{\"msg\":\"ünïcödé ✓\"}";
    let chunks: Vec<&[u8]> = text.as_bytes().chunks(1).collect();
    let (out, pending) = decode_chunks(Charset::Utf8, &chunks);
    assert_eq!(out, text);
    assert!(pending.is_empty());
}

#[test]
fn test_utf8_invalid_byte_replaced() {
    let (out, pending) = decode_chunks(Charset::Utf8, &[b"a\xFFb"]);
    assert_eq!(out, "a\u{FFFD}b");
    assert!(pending.is_empty());
}

#[test]
fn test_flush_incomplete_sequence() {
    let mut pending = Vec::new();
    let mut out = String::new();
    Charset::Utf8.decode_into(&mut pending, &[b'x', 0xE2, 0x82], &mut out);
    assert_eq!(out, "x");

    Charset::Utf8.flush_into(&mut pending, &mut out);
    assert!(pending.is_empty());
    assert!(out.starts_with('x'));
    assert!(out.contains('\u{FFFD}'));
}

#[test]
fn test_latin1_maps_bytes_to_chars() {
    let (out, pending) = decode_chunks(Charset::Latin1, &[&[b'{', 0xE9, b'}']]);
    assert_eq!(out, "{é}");
    assert!(pending.is_empty());
}

#[test]
fn test_names() {
    assert_eq!(Charset::default(), Charset::Utf8);
    assert_eq!(Charset::Utf8.to_string(), "utf-8");
    assert_eq!(Charset::Latin1.as_str(), "iso-8859-1");
}
