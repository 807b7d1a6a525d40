// SPDX-License-Identifier: MPL-2.0

// Reconnection policy behavior, driven against a real local listener.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mqttlink::mqtt_client::connection::Connection;
use mqttlink::mqtt_client::error::ClientError;
use mqttlink::mqtt_client::opts::ConnectOptions;
use mqttlink::mqtt_client::retry::{Backoff, Reconnector};
use mqttlink::mqtt_client::transport::TcpTransport;
use mqttlink::mqtt_serde::control_packet::{ControlPacket, ProtocolVersion};
use mqttlink::mqtt_serde::mqttv5;
use mqttlink::mqtt_serde::parser::stream::PacketStream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[test]
fn backoff_caps_and_resets() {
    let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10), 2.0);
    let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 10, 10, 10]);
    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn reconnector_retries_until_success() {
    let mut opts = ConnectOptions::default();
    opts.reconnect_initial_delay = Duration::from_millis(50);
    let mut reconnector = Reconnector::from_options(&opts);

    let attempts = AtomicU32::new(0);
    let value = reconnector
        .run(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(ClientError::ConnectionTimeout)
                } else {
                    Ok("connected")
                }
            }
        })
        .await
        .unwrap();
    assert_eq!(value, "connected");
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn reconnector_gives_up_on_protocol_error() {
    let mut reconnector = Reconnector::from_options(&ConnectOptions::default());
    let attempts = AtomicU32::new(0);
    let result: Result<(), ClientError> = reconnector
        .run(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::Protocol("reserved bits set".into())) }
        })
        .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn open_with_retry_connects_to_a_live_broker() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        // Consume the CONNECT, then accept it.
        let mut decoder = PacketStream::new(ProtocolVersion::V5);
        let mut buffer = vec![0u8; 4096];
        loop {
            if let Some(packet) = decoder.next_packet().unwrap() {
                assert!(matches!(packet, ControlPacket::Connect5(_)));
                break;
            }
            let n = stream.read(&mut buffer).await.unwrap();
            assert!(n > 0);
            decoder.feed(&buffer[..n]);
        }
        let connack =
            ControlPacket::ConnAck5(mqttv5::connack::ConnAck::new(false, 0x00, Vec::new()));
        stream.write_all(&connack.to_bytes().unwrap()).await.unwrap();
        // Keep the socket alive until the client is done.
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let mut opts = ConnectOptions::new(addr, "retry-client");
    opts.keep_alive = 0;
    opts.reconnect_initial_delay = Duration::from_millis(10);

    let connection = Connection::open_with_retry::<TcpTransport>(opts, true)
        .await
        .unwrap();
    assert!(connection.state().is_open());
}

#[tokio::test]
async fn broker_rejection_stops_open_with_retry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let _ = stream.read(&mut buffer).await;
            // 0x85 Client Identifier not valid.
            let connack =
                ControlPacket::ConnAck5(mqttv5::connack::ConnAck::new(false, 0x85, Vec::new()));
            let _ = stream.write_all(&connack.to_bytes().unwrap()).await;
        }
    });

    let mut opts = ConnectOptions::new(addr, "rejected-client");
    opts.keep_alive = 0;

    let result = Connection::open_with_retry::<TcpTransport>(opts, true).await;
    assert!(matches!(
        result,
        Err(ClientError::BrokerRejectedConnection { reason_code: 0x85 })
    ));
}
