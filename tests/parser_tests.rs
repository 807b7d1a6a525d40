// SPDX-License-Identifier: MPL-2.0

// Stream-level decoding tests: packets arriving fragmented, batched and
// interleaved the way a TCP stream delivers them.

use mqttlink::mqtt_serde::control_packet::{ControlPacket, ProtocolVersion};
use mqttlink::mqtt_serde::mqttv3;
use mqttlink::mqtt_serde::mqttv5;
use mqttlink::mqtt_serde::parser::stream::PacketStream;
use mqttlink::mqtt_serde::parser::DecodeError;

fn v5_publish(topic: &str, payload: &[u8], qos: u8, packet_id: Option<u16>) -> Vec<u8> {
    let mut publish = mqttv5::publish::Publish::new(topic, payload.to_vec(), qos);
    publish.packet_id = packet_id;
    ControlPacket::Publish5(publish).to_bytes().unwrap()
}

#[test]
fn connack_publish_sequence_decodes_in_order() {
    let mut stream = PacketStream::new(ProtocolVersion::V5);

    let mut wire = Vec::new();
    wire.extend(
        ControlPacket::ConnAck5(mqttv5::connack::ConnAck::new(false, 0x00, Vec::new()))
            .to_bytes()
            .unwrap(),
    );
    wire.extend(v5_publish("a/b", b"one", 0, None));
    wire.extend(v5_publish("a/b", b"two", 1, Some(9)));
    stream.feed(&wire);

    assert!(matches!(
        stream.next_packet().unwrap(),
        Some(ControlPacket::ConnAck5(_))
    ));
    match stream.next_packet().unwrap() {
        Some(ControlPacket::Publish5(p)) => assert_eq!(p.payload, b"one"),
        other => panic!("expected PUBLISH, got {other:?}"),
    }
    match stream.next_packet().unwrap() {
        Some(ControlPacket::Publish5(p)) => {
            assert_eq!(p.payload, b"two");
            assert_eq!(p.packet_id, Some(9));
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }
    assert!(stream.next_packet().unwrap().is_none());
    assert_eq!(stream.pending(), 0);
}

#[test]
fn packet_split_at_every_boundary_still_decodes() {
    let wire = v5_publish("sensors/temp", b"21.5", 1, Some(0x0102));
    for split in 1..wire.len() {
        let mut stream = PacketStream::new(ProtocolVersion::V5);
        stream.feed(&wire[..split]);
        assert!(
            stream.next_packet().unwrap().is_none(),
            "split at {split} yielded a packet from a partial buffer"
        );
        stream.feed(&wire[split..]);
        match stream.next_packet().unwrap() {
            Some(ControlPacket::Publish5(p)) => {
                assert_eq!(p.topic_name, "sensors/temp");
                assert_eq!(p.packet_id, Some(0x0102));
            }
            other => panic!("split at {split}: expected PUBLISH, got {other:?}"),
        }
    }
}

#[test]
fn v3_stream_decodes_v3_packets() {
    let mut stream = PacketStream::new(ProtocolVersion::V3);
    let mut wire = Vec::new();
    wire.extend(
        ControlPacket::ConnAck3(mqttv3::connack::ConnAck::new(true, 0))
            .to_bytes()
            .unwrap(),
    );
    wire.extend(
        ControlPacket::PingResp3(mqttv3::pingresp::PingResp)
            .to_bytes()
            .unwrap(),
    );
    stream.feed(&wire);

    match stream.next_packet().unwrap() {
        Some(ControlPacket::ConnAck3(c)) => assert!(c.session_present),
        other => panic!("expected v3 CONNACK, got {other:?}"),
    }
    assert!(matches!(
        stream.next_packet().unwrap(),
        Some(ControlPacket::PingResp3(_))
    ));
}

#[test]
fn zero_type_nibble_is_malformed() {
    let mut stream = PacketStream::new(ProtocolVersion::V5);
    stream.feed(&[0x00, 0x00]);
    assert!(matches!(
        stream.next_packet(),
        Err(DecodeError::MalformedPacket(_))
    ));
}

#[test]
fn auth_packet_is_rejected_on_a_v3_stream() {
    let mut stream = PacketStream::new(ProtocolVersion::V3);
    stream.feed(&[0xF0, 0x00]);
    assert!(stream.next_packet().is_err());
}

#[test]
fn oversized_remaining_length_is_rejected() {
    let mut stream = PacketStream::new(ProtocolVersion::V5);
    // Five continuation bytes can never be a valid remaining length.
    stream.feed(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
    assert!(matches!(
        stream.next_packet(),
        Err(DecodeError::MalformedVariableByteInteger)
    ));
}

#[test]
fn byte_at_a_time_feeding_works_for_large_payloads() {
    // Payload long enough to need a two-byte remaining length.
    let payload = vec![0xAB; 300];
    let wire = v5_publish("bulk", &payload, 0, None);
    assert!(wire.len() > 300);

    let mut stream = PacketStream::new(ProtocolVersion::V5);
    let mut decoded = None;
    for byte in &wire {
        stream.feed(std::slice::from_ref(byte));
        if let Some(packet) = stream.next_packet().unwrap() {
            decoded = Some(packet);
        }
    }
    match decoded {
        Some(ControlPacket::Publish5(p)) => assert_eq!(p.payload, payload),
        other => panic!("expected PUBLISH, got {other:?}"),
    }
}
