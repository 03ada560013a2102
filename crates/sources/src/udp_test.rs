//! UDP server tests

use std::sync::Arc;
use std::time::Duration;

use logport_protocol::{Record, RecordFormat};
use logport_sinks::{ChannelSink, NullSink};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::bridge::EventBridge;
use crate::common::ServerState;
use crate::error::SourceError;
use crate::udp::{MAX_UDP_PAYLOAD, UdpServerConfig, UdpSocketServer};

// ============================================================================
// Helper Functions
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

fn loopback_config() -> UdpServerConfig {
    UdpServerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        ..Default::default()
    }
}

fn channel_server(
    config: UdpServerConfig,
    bridge: EventBridge,
) -> (Arc<UdpSocketServer>, mpsc::Receiver<Record>) {
    let (sink, rx) = ChannelSink::new(64);
    let server = UdpSocketServer::bind(config, bridge, Arc::new(sink)).unwrap();
    (Arc::new(server), rx)
}

async fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

async fn recv(rx: &mut mpsc::Receiver<Record>) -> Record {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for record")
        .expect("channel closed")
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_default() {
    let config = UdpServerConfig::default();

    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.port, 4560);
    assert_eq!(config.max_datagram_size, MAX_UDP_PAYLOAD);
    assert_eq!(UdpServerConfig::with_port(5140).bind_address(), "0.0.0.0:5140");
}

#[tokio::test]
async fn test_zero_max_datagram_size_rejected() {
    let config = UdpServerConfig {
        max_datagram_size: 0,
        ..loopback_config()
    };
    let err = UdpSocketServer::bind(config, EventBridge::json(), Arc::new(NullSink::new()))
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidConfig(_)));
}

// ============================================================================
// Datagram Handling
// ============================================================================

#[tokio::test]
async fn test_datagram_records_delivered() {
    let (server, mut rx) = channel_server(loopback_config(), EventBridge::json());
    let handle = server.start();

    let socket = client().await;
    let client_addr = socket.local_addr().unwrap();
    socket
        .send_to(br#"{"a":1}{"b":2}"#, server.local_addr())
        .await
        .unwrap();

    let first = recv(&mut rx).await;
    assert_eq!(first.as_str(), Some(r#"{"a":1}"#));
    assert_eq!(first.peer(), Some(client_addr));
    assert_eq!(recv(&mut rx).await.as_str(), Some(r#"{"b":2}"#));

    wait_for(|| server.metrics().snapshot().records_received == 2).await;
    let metrics = server.metrics().snapshot();
    assert_eq!(metrics.datagrams_received, 1);
    assert_eq!(metrics.datagrams_truncated, 0);
    assert_eq!(metrics.bytes_received, 14);

    server.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_datagram_truncated() {
    let config = UdpServerConfig {
        max_datagram_size: 16,
        ..loopback_config()
    };
    let (server, mut rx) = channel_server(config, EventBridge::json());
    let handle = server.start();

    let socket = client().await;
    let oversized = br#"{"a":1}{"long":"xxxxxxxxxxxxxxxxxxxxxxxx"}"#;
    assert!(oversized.len() > 16);
    socket.send_to(oversized, server.local_addr()).await.unwrap();

    // Only the record inside the first 16 bytes survives
    assert_eq!(recv(&mut rx).await.as_str(), Some(r#"{"a":1}"#));

    socket.send_to(br#"{"next":2}"#, server.local_addr()).await.unwrap();
    assert_eq!(recv(&mut rx).await.as_str(), Some(r#"{"next":2}"#));

    wait_for(|| server.metrics().snapshot().datagrams_received == 2).await;
    let metrics = server.metrics().snapshot();
    assert_eq!(metrics.datagrams_truncated, 1);
    assert_eq!(metrics.errors, 0);
    assert_eq!(metrics.bytes_received, 16 + 10);
    assert!(server.is_active());

    server.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_corrupt_msgpack_datagram_does_not_stop_server() {
    let (server, mut rx) = channel_server(loopback_config(), EventBridge::msgpack());
    let handle = server.start();

    let socket = client().await;
    socket.send_to(&[0xC1], server.local_addr()).await.unwrap();
    wait_for(|| server.metrics().snapshot().decode_errors == 1).await;

    let value = rmp_serde::to_vec(&serde_json::json!({"level": "INFO"})).unwrap();
    socket.send_to(&value, server.local_addr()).await.unwrap();

    let record = recv(&mut rx).await;
    assert_eq!(record.format(), RecordFormat::MessagePack);
    assert_eq!(record.body().as_ref(), value.as_slice());

    server.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_incomplete_text_record_dropped_with_datagram() {
    let (server, mut rx) = channel_server(loopback_config(), EventBridge::json());
    let handle = server.start();

    let socket = client().await;
    socket.send_to(br#"{"cut":"#, server.local_addr()).await.unwrap();
    socket.send_to(br#"{"whole":1}"#, server.local_addr()).await.unwrap();

    // Each datagram is its own stream: no remainder carries over
    assert_eq!(recv(&mut rx).await.as_str(), Some(r#"{"whole":1}"#));

    server.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_shutdown_stops_receive_loop() {
    let (server, _rx) = channel_server(loopback_config(), EventBridge::json());
    let handle = server.start();
    wait_for(|| server.is_active()).await;

    server.shutdown();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    assert_eq!(server.state(), ServerState::Stopped);

    let err = server.run().await.unwrap_err();
    assert!(matches!(err, SourceError::AlreadyStarted));
}

#[tokio::test]
async fn test_shutdown_before_run() {
    let server =
        UdpSocketServer::bind(loopback_config(), EventBridge::xml(), Arc::new(NullSink::new()))
            .unwrap();

    server.shutdown();
    server.run().await.unwrap();
    assert_eq!(server.state(), ServerState::Stopped);
}
