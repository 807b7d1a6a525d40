// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::control_packet::{ControlPacket, ControlPacketType, PacketCodec};
use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    encode_utf8_string, parse_packet_id, parse_utf8_string, DecodeError, Decoded, FixedHeader,
    HeaderStatus,
};

/// One topic filter entry in a SUBSCRIBE payload (spec 3.8.3.1).
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Subscription {
    pub topic_filter: String,
    pub qos: u8,
    pub no_local: bool,
    pub retain_as_published: bool,
    /// 0 = always send retained, 1 = only on new subscriptions, 2 = never.
    pub retain_handling: u8,
}

impl Subscription {
    pub fn new(topic_filter: impl Into<String>, qos: u8) -> Self {
        Subscription {
            topic_filter: topic_filter.into(),
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: 0,
        }
    }

    fn options_byte(&self) -> u8 {
        let mut options = self.qos & 0x03;
        if self.no_local {
            options |= 0x04;
        }
        if self.retain_as_published {
            options |= 0x08;
        }
        options | ((self.retain_handling & 0x03) << 4)
    }

    fn from_options_byte(topic_filter: String, options: u8) -> Result<Self, DecodeError> {
        if options & 0xC0 != 0 {
            return Err(DecodeError::MalformedPacket(
                "subscription option bits 6-7 are reserved".into(),
            ));
        }
        let qos = options & 0x03;
        if qos == 3 {
            return Err(DecodeError::MalformedPacket(
                "subscription QoS 3 is invalid".into(),
            ));
        }
        let retain_handling = (options >> 4) & 0x03;
        if retain_handling == 3 {
            return Err(DecodeError::MalformedPacket(
                "retain handling 3 is invalid".into(),
            ));
        }
        Ok(Subscription {
            topic_filter,
            qos,
            no_local: options & 0x04 != 0,
            retain_as_published: options & 0x08 != 0,
            retain_handling,
        })
    }
}

/// SUBSCRIBE, protocol level 5 (spec 3.8). Flags are the reserved 0b0010
/// pattern and the payload must name at least one topic filter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Subscribe {
    pub packet_id: u16,
    pub properties: Vec<Property>,
    pub subscriptions: Vec<Subscription>,
}

impl Subscribe {
    pub fn new(packet_id: u16, subscriptions: Vec<Subscription>) -> Self {
        Subscribe {
            packet_id,
            properties: Vec::new(),
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
        let mut bytes = self.packet_id.to_be_bytes().to_vec();
        bytes.extend(encode_properties(&self.properties)?);
        Ok(bytes)
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
            bytes.push(subscription.options_byte());
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

        let (properties, consumed) = parse_properties(buffer, offset)?;
        offset += consumed;

        let mut subscriptions = Vec::new();
        while offset < hdr.total_len {
            let (topic_filter, consumed) = parse_utf8_string(buffer, offset)?;
            offset += consumed;
            let options = *buffer.get(offset).ok_or(DecodeError::Incomplete(1))?;
            offset += 1;
            subscriptions.push(Subscription::from_options_byte(topic_filter, options)?);
        }
        if subscriptions.is_empty() {
            return Err(DecodeError::ProtocolError(
                "SUBSCRIBE carries no topic filters".into(),
            ));
        }

        if offset != hdr.total_len {
            return Err(DecodeError::MalformedPacket(format!(
                "SUBSCRIBE body ends at {offset}, declared {}",
                hdr.total_len
            )));
        }

        Ok(Decoded::Packet(
            ControlPacket::Subscribe5(Subscribe {
                packet_id,
                properties,
                subscriptions,
            }),
            offset,
        ))
    }

    fn expected_response(&self) -> Option<ControlPacketType> {
        Some(ControlPacketType::SubAck)
    }
}
