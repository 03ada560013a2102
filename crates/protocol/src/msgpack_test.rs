//! Tests for the MessagePack framer

use bytes::Bytes;
use serde_json::json;

use crate::msgpack::MessagePackFramer;

fn encode(value: &serde_json::Value) -> Vec<u8> {
    rmp_serde::to_vec(value).unwrap()
}

fn sample_stream() -> (Vec<Vec<u8>>, Vec<u8>) {
    let values = [
        json!({"level": "INFO", "msg": "started"}),
        json!({"level": "WARN", "msg": "x".repeat(300), "n": 70000}),
        json!([1, 2, {"nested": [true, null, 1.5]}]),
        json!("bare string"),
    ];
    let parts: Vec<Vec<u8>> = values.iter().map(encode).collect();
    let stream = parts.concat();
    (parts, stream)
}

#[test]
fn test_back_to_back_values() {
    let (parts, stream) = sample_stream();
    let mut framer = MessagePackFramer::new();

    let mut out: Vec<Bytes> = Vec::new();
    let emitted = framer.push(&stream, |b| out.push(b)).unwrap();

    assert_eq!(emitted, parts.len());
    for (record, part) in out.iter().zip(&parts) {
        assert_eq!(record.as_ref(), part.as_slice());
    }
    assert_eq!(framer.buffered(), 0);
    assert_eq!(framer.offset(), stream.len() as u64);
}

#[test]
fn test_split_at_every_position() {
    let (parts, stream) = sample_stream();

    for cut in 0..=stream.len() {
        let mut framer = MessagePackFramer::new();
        let mut out: Vec<Bytes> = Vec::new();
        framer.push(&stream[..cut], |b| out.push(b)).unwrap();
        framer.push(&stream[cut..], |b| out.push(b)).unwrap();

        assert_eq!(out.len(), parts.len(), "cut at {cut}");
        assert_eq!(out.concat(), stream, "cut at {cut}");
    }
}

#[test]
fn test_incomplete_value_is_held() {
    let bytes = encode(&json!({"msg": "hello world"}));
    let mut framer = MessagePackFramer::new();

    let emitted = framer.push(&bytes[..bytes.len() - 3], |_| {}).unwrap();
    assert_eq!(emitted, 0);
    assert_eq!(framer.buffered(), bytes.len() - 3);

    let rest = framer.finish();
    assert_eq!(rest.len(), bytes.len() - 3);
    assert_eq!(framer.buffered(), 0);
}

#[test]
fn test_corrupt_value_reports_offset() {
    let first = encode(&json!({"a": 1}));
    let mut stream = first.clone();
    // 0xC1 is never used by MessagePack
    stream.extend_from_slice(&[0xC1, 0x00, 0x00]);

    let mut framer = MessagePackFramer::new();
    let mut out: Vec<Bytes> = Vec::new();
    let err = framer.push(&stream, |b| out.push(b)).unwrap_err();

    assert_eq!(out.len(), 1);
    assert!(err.is_decode());
    match err {
        crate::ProtocolError::Decode {
            format,
            offset,
            buffered,
            ..
        } => {
            assert_eq!(format, "msgpack");
            assert_eq!(offset, first.len() as u64);
            assert_eq!(buffered, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_empty_push() {
    let mut framer = MessagePackFramer::new();
    assert_eq!(framer.push(&[], |_| {}).unwrap(), 0);
    assert!(framer.finish().is_empty());
}

// ============================================================================
// Large values
// ============================================================================

/// One bin32 value holding `len` payload bytes
fn bin32(len: usize) -> Vec<u8> {
    let mut value = vec![0xc6];
    value.extend_from_slice(&(len as u32).to_be_bytes());
    value.extend((0..len).map(|i| (i % 251) as u8));
    value
}

#[test]
fn test_large_bin_in_small_chunks() {
    let value = bin32(4 * 1024 * 1024);
    let mut framer = MessagePackFramer::new();
    let mut out: Vec<Bytes> = Vec::new();

    let chunks: Vec<&[u8]> = value.chunks(4096).collect();
    let (last, head) = chunks.split_last().unwrap();
    for chunk in head {
        assert_eq!(framer.push(chunk, |b| out.push(b)).unwrap(), 0);
        // Size is known from the header: no re-decode until it is all here
        assert_eq!(framer.needed(), value.len());
    }
    assert_eq!(framer.push(last, |b| out.push(b)).unwrap(), 1);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].as_ref(), value.as_slice());
    assert_eq!(framer.buffered(), 0);
    assert_eq!(framer.needed(), 0);
}

#[test]
fn test_large_nested_value_in_small_chunks() {
    let value = encode(&json!({
        "level": "INFO",
        "items": (0..20_000).collect::<Vec<u32>>(),
        "msg": "y".repeat(100_000),
    }));
    let mut stream = value.clone();
    stream.extend_from_slice(&encode(&json!({"after": true})));

    let mut framer = MessagePackFramer::new();
    let mut out: Vec<Bytes> = Vec::new();
    for chunk in stream.chunks(4096) {
        framer.push(chunk, |b| out.push(b)).unwrap();
    }

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].as_ref(), value.as_slice());
    assert_eq!(out.concat(), stream);
}

#[test]
fn test_length_header_split() {
    // str16 whose two length bytes arrive separately
    let value = encode(&json!("z".repeat(1000)));
    assert_eq!(value[0], 0xda);

    let mut framer = MessagePackFramer::new();
    assert_eq!(framer.push(&value[..2], |_| {}).unwrap(), 0);
    assert_eq!(framer.needed(), 3);

    let mut out: Vec<Bytes> = Vec::new();
    assert_eq!(framer.push(&value[2..], |b| out.push(b)).unwrap(), 1);
    assert_eq!(out[0].as_ref(), value.as_slice());
}

#[test]
fn test_nesting_beyond_decoder_limit_is_corrupt() {
    // 2000 nested one-element arrays around a single integer
    let mut value = vec![0x91; 2000];
    value.push(0x01);

    let mut framer = MessagePackFramer::new();
    let err = framer.push(&value, |_| {}).unwrap_err();
    assert!(err.is_decode());
    assert_eq!(framer.offset(), 0);
}
