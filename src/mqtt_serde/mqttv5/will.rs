// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::mqttv5::common::properties::{encode_properties, parse_properties, Property};
use crate::mqtt_serde::parser::{
    encode_binary_data, encode_utf8_string, parse_binary_data, parse_utf8_string, DecodeError,
};

/// Last-will message carried in the CONNECT payload (spec 3.1.3.2-3.1.3.4).
/// QoS and retain live in the connect flag byte, not here on the wire, but
/// are kept on the struct so a `Will` is self-describing.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Will {
    pub qos: u8,
    pub retain: bool,
    pub topic: String,
    pub message: Vec<u8>,
    pub delay_interval: Option<u32>,
    pub payload_format_indicator: Option<u8>,
    pub message_expiry_interval: Option<u32>,
    pub content_type: Option<String>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Vec<u8>>,
    pub user_properties: Vec<Property>,
}

impl Will {
    pub fn new(topic: String, message: Vec<u8>, qos: u8, retain: bool) -> Self {
        Will {
            qos,
            retain,
            topic,
            message,
            delay_interval: None,
            payload_format_indicator: None,
            message_expiry_interval: None,
            content_type: None,
            response_topic: None,
            correlation_data: None,
            user_properties: Vec::new(),
        }
    }

    fn properties(&self) -> Vec<Property> {
        let mut props = Vec::new();
        if let Some(v) = self.delay_interval {
            props.push(Property::WillDelayInterval(v));
        }
        if let Some(v) = self.payload_format_indicator {
            props.push(Property::PayloadFormatIndicator(v));
        }
        if let Some(v) = self.message_expiry_interval {
            props.push(Property::MessageExpiryInterval(v));
        }
        if let Some(v) = &self.content_type {
            props.push(Property::ContentType(v.clone()));
        }
        if let Some(v) = &self.response_topic {
            props.push(Property::ResponseTopic(v.clone()));
        }
        if let Some(v) = &self.correlation_data {
            props.push(Property::CorrelationData(v.clone()));
        }
        props.extend(self.user_properties.iter().cloned());
        props
    }

    /// Wire form inside the CONNECT payload: properties, topic, message.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut bytes = encode_properties(&self.properties())?;
        bytes.extend(encode_utf8_string(&self.topic)?);
        bytes.extend(encode_binary_data(&self.message)?);
        Ok(bytes)
    }

    pub fn from_bytes(
        buffer: &[u8],
        offset: usize,
        connect_flags: u8,
    ) -> Result<(Self, usize), DecodeError> {
        let mut pos = offset;

        let (properties, consumed) = parse_properties(buffer, pos)?;
        pos += consumed;

        let (topic, consumed) = parse_utf8_string(buffer, pos)?;
        pos += consumed;

        let (message, consumed) = parse_binary_data(buffer, pos)?;
        pos += consumed;

        let qos = (connect_flags >> 3) & 0x03;
        let retain = connect_flags & 0x20 != 0;

        let mut will = Will::new(topic, message, qos, retain);
        for property in properties {
            match property {
                Property::WillDelayInterval(v) => will.delay_interval = Some(v),
                Property::PayloadFormatIndicator(v) => will.payload_format_indicator = Some(v),
                Property::MessageExpiryInterval(v) => will.message_expiry_interval = Some(v),
                Property::ContentType(v) => will.content_type = Some(v),
                Property::ResponseTopic(v) => will.response_topic = Some(v),
                Property::CorrelationData(v) => will.correlation_data = Some(v),
                Property::UserProperty(k, v) => {
                    will.user_properties.push(Property::UserProperty(k, v))
                }
                other => {
                    return Err(DecodeError::ProtocolError(format!(
                        "property 0x{:02X} is not valid in a will",
                        other.id() as u8
                    )))
                }
            }
        }

        Ok((will, pos - offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_every_field() {
        let mut will = Will::new("alarms/offline".into(), b"gone".to_vec(), 1, true);
        will.delay_interval = Some(30);
        will.content_type = Some("text/plain".into());
        will.user_properties
            .push(Property::UserProperty("device".into(), "pump-3".into()));

        let bytes = will.encode().unwrap();
        // Connect flags with will flag, QoS 1, retain.
        let flags = 0x04 | (1 << 3) | 0x20;
        let (decoded, consumed) = Will::from_bytes(&bytes, 0, flags).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, will);
    }

    #[test]
    fn foreign_property_in_will_is_rejected() {
        // A ReceiveMaximum property has no business in a will.
        let mut bytes = encode_properties(&[Property::ReceiveMaximum(5)]).unwrap();
        bytes.extend(encode_utf8_string("t").unwrap());
        bytes.extend(encode_binary_data(b"m").unwrap());
        let err = Will::from_bytes(&bytes, 0, 0x04).unwrap_err();
        assert!(matches!(err, DecodeError::ProtocolError(_)));
    }
}
