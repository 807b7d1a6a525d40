// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::parser::{
    encode_utf8_string, parse_packet_id, parse_utf8_string, DecodeError, Decoded, FixedHeader,
    HeaderStatus,
};

/// One topic filter entry in a 3.1.1 SUBSCRIBE payload: filter plus a
/// requested QoS byte whose upper six bits are reserved.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub topic_filter: String,
    pub qos: u8,
}

impl Subscription {
    pub fn new(topic_filter: impl Into<String>, qos: u8) -> Self {
        Subscription {
            topic_filter: topic_filter.into(),
            qos,
        }
    }
}

/// SUBSCRIBE, MQTT 3.1.1 (spec 3.8). Flags are the reserved 0b0010
/// pattern and the payload must name at least one topic filter.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Subscribe {
    pub packet_id: u16,
    pub subscriptions: Vec<Subscription>,
}

impl Subscribe {
    pub fn new(packet_id: u16, subscriptions: Vec<Subscription>) -> Self {
        Subscribe {
            packet_id,
            subscriptions,
        }
    }
}

impl PacketCodec for Subscribe {
    fn packet_type(&self) -> ControlPacketType {
        ControlPacketType::Subscribe
    }

    fn flags(&self) -> u8 {
        0x02
    }

    fn variable_header(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.packet_id.to_be_bytes().to_vec())
    }

    fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        if self.subscriptions.is_empty() {
            return Err(DecodeError::ProtocolError(
                "SUBSCRIBE requires at least one topic filter".into(),
            ));
        }
        let mut bytes = Vec::new();
        for subscription in &self.subscriptions {
            bytes.extend(encode_utf8_string(&subscription.topic_filter)?);
            bytes.push(subscription.qos & 0x03);
        }
        Ok(bytes)
    }

    fn from_bytes(buffer: &[u8]) -> Result<Decoded, DecodeError> {
        let hdr = match FixedHeader::parse(buffer, ControlPacketType::Subscribe)? {
            HeaderStatus::Complete(hdr) => hdr,
            HeaderStatus::Partial(hint) => return Ok(Decoded::NeedMore(hint)),
        };
        if hdr.flags != 0x02 {
            return Err(DecodeError::MalformedPacket(
                "SUBSCRIBE fixed header flags must be 0b0010".into(),
            ));
        }
        let mut offset = hdr.body_start;

        let (packet_id, consumed) = parse_packet_id(buffer, offset)?;
        offset += consumed;

        let mut subscriptions = Vec::new();
        while offset < hdr.total_len {
            let (topic_filter, consumed) = parse_utf8_string(buffer, offset)?;
            offset += consumed;
            let qos = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
            offset += 1;
            if qos > 2 {
                return Err(DecodeError::MalformedPacket(format!(
                    "requested QoS {qos} is invalid"
                )));
            }
            subscriptions.push(Subscription { topic_filter, qos });
        }
        if subscriptions.is_empty() {
            return Err(DecodeError::ProtocolError(
                "SUBSCRIBE carries no topic filters".into(),
            ));
        }

        Ok(Decoded::Packet(
            ControlPacket::Subscribe3(Subscribe {
                packet_id,
                subscriptions,
            }),
            hdr.total_len,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::SubAck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_filters_round_trip() {
        let subscribe = Subscribe::new(
            11,
            vec![Subscription::new("a/b", 0), Subscription::new("c/#", 2)],
        );
        let bytes = subscribe.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x82);
        let Decoded::Packet(ControlPacket::Subscribe3(decoded), consumed) =
            Subscribe::from_bytes(&bytes).unwrap()
        else {
            panic!("expected a complete SUBSCRIBE");
        };
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, subscribe);
    }

    #[test]
    fn requested_qos_3_is_malformed() {
        // packet id 1, filter "a", qos 3
        let bytes = [0x82, 0x06, 0x00, 0x01, 0x00, 0x01, b'a', 0x03];
        assert!(matches!(
            Subscribe::from_bytes(&bytes),
            Err(DecodeError::MalformedPacket(_))
        ));
    }
}
