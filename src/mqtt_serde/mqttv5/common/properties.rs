// SPDX-License-Identifier: MPL-2.0

//! MQTT 5.0 properties (spec 2.2.2).
//!
//! A property list is a Variable Byte Integer length prefix followed by
//! `identifier, value` entries. Every identifier except User Property and
//! Subscription Identifier may appear at most once; a duplicate makes the
//! whole packet a protocol error.

use serde::{Deserialize, Serialize};

use crate::mqtt_serde::parser::{
    decode_variable_byte_integer, encode_binary_data, encode_utf8_string,
    encode_variable_byte_integer, parse_binary_data, parse_u16, parse_u32, parse_utf8_string,
    DecodeError,
};

pub type Properties = Vec<Property>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PropertyId {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0B,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1A,
    ServerReference = 0x1C,
    ReasonString = 0x1F,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2A,
}

impl PropertyId {
    /// User Property and Subscription Identifier may occur any number of
    /// times; everything else at most once per list.
    pub fn repeatable(self) -> bool {
        matches!(
            self,
            PropertyId::UserProperty | PropertyId::SubscriptionIdentifier
        )
    }
}

impl TryFrom<usize> for PropertyId {
    type Error = DecodeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => PropertyId::PayloadFormatIndicator,
            0x02 => PropertyId::MessageExpiryInterval,
            0x03 => PropertyId::ContentType,
            0x08 => PropertyId::ResponseTopic,
            0x09 => PropertyId::CorrelationData,
            0x0B => PropertyId::SubscriptionIdentifier,
            0x11 => PropertyId::SessionExpiryInterval,
            0x12 => PropertyId::AssignedClientIdentifier,
            0x13 => PropertyId::ServerKeepAlive,
            0x15 => PropertyId::AuthenticationMethod,
            0x16 => PropertyId::AuthenticationData,
            0x17 => PropertyId::RequestProblemInformation,
            0x18 => PropertyId::WillDelayInterval,
            0x19 => PropertyId::RequestResponseInformation,
            0x1A => PropertyId::ResponseInformation,
            0x1C => PropertyId::ServerReference,
            0x1F => PropertyId::ReasonString,
            0x21 => PropertyId::ReceiveMaximum,
            0x22 => PropertyId::TopicAliasMaximum,
            0x23 => PropertyId::TopicAlias,
            0x24 => PropertyId::MaximumQoS,
            0x25 => PropertyId::RetainAvailable,
            0x26 => PropertyId::UserProperty,
            0x27 => PropertyId::MaximumPacketSize,
            0x28 => PropertyId::WildcardSubscriptionAvailable,
            0x29 => PropertyId::SubscriptionIdentifierAvailable,
            0x2A => PropertyId::SharedSubscriptionAvailable,
            other => {
                return Err(DecodeError::MalformedPacket(format!(
                    "unknown property identifier 0x{other:02X}"
                )))
            }
        })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Property {
    PayloadFormatIndicator(u8),
    MessageExpiryInterval(u32),
    ContentType(String),
    ResponseTopic(String),
    CorrelationData(Vec<u8>),
    SubscriptionIdentifier(u32),
    SessionExpiryInterval(u32),
    AssignedClientIdentifier(String),
    ServerKeepAlive(u16),
    AuthenticationMethod(String),
    AuthenticationData(Vec<u8>),
    RequestProblemInformation(u8),
    WillDelayInterval(u32),
    RequestResponseInformation(u8),
    ResponseInformation(String),
    ServerReference(String),
    ReasonString(String),
    ReceiveMaximum(u16),
    TopicAliasMaximum(u16),
    TopicAlias(u16),
    MaximumQoS(u8),
    RetainAvailable(u8),
    UserProperty(String, String),
    MaximumPacketSize(u32),
    WildcardSubscriptionAvailable(u8),
    SubscriptionIdentifierAvailable(u8),
    SharedSubscriptionAvailable(u8),
}

impl Property {
    pub fn id(&self) -> PropertyId {
        match self {
            Property::PayloadFormatIndicator(_) => PropertyId::PayloadFormatIndicator,
            Property::MessageExpiryInterval(_) => PropertyId::MessageExpiryInterval,
            Property::ContentType(_) => PropertyId::ContentType,
            Property::ResponseTopic(_) => PropertyId::ResponseTopic,
            Property::CorrelationData(_) => PropertyId::CorrelationData,
            Property::SubscriptionIdentifier(_) => PropertyId::SubscriptionIdentifier,
            Property::SessionExpiryInterval(_) => PropertyId::SessionExpiryInterval,
            Property::AssignedClientIdentifier(_) => PropertyId::AssignedClientIdentifier,
            Property::ServerKeepAlive(_) => PropertyId::ServerKeepAlive,
            Property::AuthenticationMethod(_) => PropertyId::AuthenticationMethod,
            Property::AuthenticationData(_) => PropertyId::AuthenticationData,
            Property::RequestProblemInformation(_) => PropertyId::RequestProblemInformation,
            Property::WillDelayInterval(_) => PropertyId::WillDelayInterval,
            Property::RequestResponseInformation(_) => PropertyId::RequestResponseInformation,
            Property::ResponseInformation(_) => PropertyId::ResponseInformation,
            Property::ServerReference(_) => PropertyId::ServerReference,
            Property::ReasonString(_) => PropertyId::ReasonString,
            Property::ReceiveMaximum(_) => PropertyId::ReceiveMaximum,
            Property::TopicAliasMaximum(_) => PropertyId::TopicAliasMaximum,
            Property::TopicAlias(_) => PropertyId::TopicAlias,
            Property::MaximumQoS(_) => PropertyId::MaximumQoS,
            Property::RetainAvailable(_) => PropertyId::RetainAvailable,
            Property::UserProperty(_, _) => PropertyId::UserProperty,
            Property::MaximumPacketSize(_) => PropertyId::MaximumPacketSize,
            Property::WildcardSubscriptionAvailable(_) => PropertyId::WildcardSubscriptionAvailable,
            Property::SubscriptionIdentifierAvailable(_) => {
                PropertyId::SubscriptionIdentifierAvailable
            }
            Property::SharedSubscriptionAvailable(_) => PropertyId::SharedSubscriptionAvailable,
        }
    }

    fn encode_into(&self, bytes: &mut Vec<u8>) -> Result<(), DecodeError> {
        bytes.push(self.id() as u8);
        match self {
            Property::PayloadFormatIndicator(v)
            | Property::RequestProblemInformation(v)
            | Property::RequestResponseInformation(v)
            | Property::MaximumQoS(v)
            | Property::RetainAvailable(v)
            | Property::WildcardSubscriptionAvailable(v)
            | Property::SubscriptionIdentifierAvailable(v)
            | Property::SharedSubscriptionAvailable(v) => bytes.push(*v),

            Property::ServerKeepAlive(v)
            | Property::ReceiveMaximum(v)
            | Property::TopicAliasMaximum(v)
            | Property::TopicAlias(v) => bytes.extend_from_slice(&v.to_be_bytes()),

            Property::MessageExpiryInterval(v)
            | Property::SessionExpiryInterval(v)
            | Property::WillDelayInterval(v)
            | Property::MaximumPacketSize(v) => bytes.extend_from_slice(&v.to_be_bytes()),

            Property::ContentType(v)
            | Property::ResponseTopic(v)
            | Property::AssignedClientIdentifier(v)
            | Property::AuthenticationMethod(v)
            | Property::ResponseInformation(v)
            | Property::ServerReference(v)
            | Property::ReasonString(v) => bytes.extend(encode_utf8_string(v)?),

            Property::CorrelationData(v) | Property::AuthenticationData(v) => {
                bytes.extend(encode_binary_data(v)?)
            }

            Property::SubscriptionIdentifier(v) => {
                bytes.extend(encode_variable_byte_integer(*v as usize)?)
            }

            Property::UserProperty(key, value) => {
                bytes.extend(encode_utf8_string(key)?);
                bytes.extend(encode_utf8_string(value)?);
            }
        }
        Ok(())
    }
}

/// Encodes a property list with its Variable Byte Integer length prefix.
pub fn encode_properties(properties: &[Property]) -> Result<Vec<u8>, DecodeError> {
    let mut entries = Vec::new();
    for property in properties {
        property.encode_into(&mut entries)?;
    }
    let mut bytes = encode_variable_byte_integer(entries.len())?;
    bytes.extend(entries);
    Ok(bytes)
}

/// Parses a length-prefixed property list at `offset`.
///
/// Returns the properties and the total bytes consumed, prefix included.
/// Duplicate single-occurrence identifiers are rejected.
pub fn parse_properties(buffer: &[u8], offset: usize) -> Result<(Properties, usize), DecodeError> {
    let (prop_len, prefix_len) = decode_variable_byte_integer(buffer, offset)?;
    let start = offset + prefix_len;
    if buffer.len() < start + prop_len {
        return Err(DecodeError::Incomplete(start + prop_len - buffer.len()));
    }

    let mut properties = Vec::new();
    let mut seen: u64 = 0;
    let mut pos = start;
    let end = start + prop_len;
    while pos < end {
        let (property, consumed) = parse_property(buffer, pos)?;
        let id = property.id();
        if !id.repeatable() {
            let bit = 1u64 << (id as u8);
            if seen & bit != 0 {
                return Err(DecodeError::ProtocolError(format!(
                    "property 0x{:02X} appears more than once",
                    id as u8
                )));
            }
            seen |= bit;
        }
        pos += consumed;
        if pos > end {
            return Err(DecodeError::MalformedPacket(
                "property value runs past the declared property length".into(),
            ));
        }
        properties.push(property);
    }

    Ok((properties, end - offset))
}

fn parse_property(buffer: &[u8], offset: usize) -> Result<(Property, usize), DecodeError> {
    let (id_raw, id_len) = decode_variable_byte_integer(buffer, offset)?;
    let id = PropertyId::try_from(id_raw)?;
    let mut pos = offset + id_len;

    let read_u8 = |pos: &mut usize| -> Result<u8, DecodeError> {
        let byte = *buffer
            .get(*pos)
            .ok_or(DecodeError::Incomplete(1))?;
        *pos += 1;
        Ok(byte)
    };
    let read_u16 = |pos: &mut usize| -> Result<u16, DecodeError> {
        let (v, n) = parse_u16(buffer, *pos)?;
        *pos += n;
        Ok(v)
    };
    let read_u32 = |pos: &mut usize| -> Result<u32, DecodeError> {
        let (v, n) = parse_u32(buffer, *pos)?;
        *pos += n;
        Ok(v)
    };
    let read_str = |pos: &mut usize| -> Result<String, DecodeError> {
        let (v, n) = parse_utf8_string(buffer, *pos)?;
        *pos += n;
        Ok(v)
    };
    let read_bin = |pos: &mut usize| -> Result<Vec<u8>, DecodeError> {
        let (v, n) = parse_binary_data(buffer, *pos)?;
        *pos += n;
        Ok(v)
    };

    let property = match id {
        PropertyId::PayloadFormatIndicator => Property::PayloadFormatIndicator(read_u8(&mut pos)?),
        PropertyId::MessageExpiryInterval => Property::MessageExpiryInterval(read_u32(&mut pos)?),
        PropertyId::ContentType => Property::ContentType(read_str(&mut pos)?),
        PropertyId::ResponseTopic => Property::ResponseTopic(read_str(&mut pos)?),
        PropertyId::CorrelationData => Property::CorrelationData(read_bin(&mut pos)?),
        PropertyId::SubscriptionIdentifier => {
            let (v, n) = decode_variable_byte_integer(buffer, pos)?;
            pos += n;
            Property::SubscriptionIdentifier(v as u32)
        }
        PropertyId::SessionExpiryInterval => Property::SessionExpiryInterval(read_u32(&mut pos)?),
        PropertyId::AssignedClientIdentifier => {
            Property::AssignedClientIdentifier(read_str(&mut pos)?)
        }
        PropertyId::ServerKeepAlive => Property::ServerKeepAlive(read_u16(&mut pos)?),
        PropertyId::AuthenticationMethod => Property::AuthenticationMethod(read_str(&mut pos)?),
        PropertyId::AuthenticationData => Property::AuthenticationData(read_bin(&mut pos)?),
        PropertyId::RequestProblemInformation => {
            Property::RequestProblemInformation(read_u8(&mut pos)?)
        }
        PropertyId::WillDelayInterval => Property::WillDelayInterval(read_u32(&mut pos)?),
        PropertyId::RequestResponseInformation => {
            Property::RequestResponseInformation(read_u8(&mut pos)?)
        }
        PropertyId::ResponseInformation => Property::ResponseInformation(read_str(&mut pos)?),
        PropertyId::ServerReference => Property::ServerReference(read_str(&mut pos)?),
        PropertyId::ReasonString => Property::ReasonString(read_str(&mut pos)?),
        PropertyId::ReceiveMaximum => Property::ReceiveMaximum(read_u16(&mut pos)?),
        PropertyId::TopicAliasMaximum => Property::TopicAliasMaximum(read_u16(&mut pos)?),
        PropertyId::TopicAlias => Property::TopicAlias(read_u16(&mut pos)?),
        PropertyId::MaximumQoS => Property::MaximumQoS(read_u8(&mut pos)?),
        PropertyId::RetainAvailable => Property::RetainAvailable(read_u8(&mut pos)?),
        PropertyId::UserProperty => {
            let key = read_str(&mut pos)?;
            let value = read_str(&mut pos)?;
            Property::UserProperty(key, value)
        }
        PropertyId::MaximumPacketSize => Property::MaximumPacketSize(read_u32(&mut pos)?),
        PropertyId::WildcardSubscriptionAvailable => {
            Property::WildcardSubscriptionAvailable(read_u8(&mut pos)?)
        }
        PropertyId::SubscriptionIdentifierAvailable => {
            Property::SubscriptionIdentifierAvailable(read_u8(&mut pos)?)
        }
        PropertyId::SharedSubscriptionAvailable => {
            Property::SharedSubscriptionAvailable(read_u8(&mut pos)?)
        }
    };

    Ok((property, pos - offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_single_property() {
        let mut bytes = Vec::new();
        Property::PayloadFormatIndicator(1)
            .encode_into(&mut bytes)
            .unwrap();
        assert_eq!(bytes, vec![0x01, 0x01]);
    }

    #[test]
    fn empty_list_is_a_single_zero_byte() {
        assert_eq!(encode_properties(&[]).unwrap(), vec![0x00]);
        let (props, consumed) = parse_properties(&[0x00], 0).unwrap();
        assert!(props.is_empty());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn broker_capability_list_round_trip() {
        let properties = vec![
            Property::SharedSubscriptionAvailable(0x01),
            Property::SubscriptionIdentifierAvailable(0x01),
            Property::WildcardSubscriptionAvailable(0x01),
            Property::MaximumPacketSize(1_048_576),
            Property::RetainAvailable(0x01),
            Property::TopicAliasMaximum(65_535),
            Property::ReceiveMaximum(32),
        ];
        let bytes = encode_properties(&properties).unwrap();
        let expected = hex::decode("132a01290128012700100000250122ffff210020").unwrap();
        assert_eq!(bytes, expected);

        let (parsed, consumed) = parse_properties(&bytes, 0).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, properties);
    }

    #[test]
    fn user_property_round_trip() {
        let properties = vec![
            Property::UserProperty("origin".into(), "sensor-7".into()),
            Property::UserProperty("origin".into(), "sensor-8".into()),
        ];
        let bytes = encode_properties(&properties).unwrap();
        let (parsed, consumed) = parse_properties(&bytes, 0).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, properties);
    }

    #[test]
    fn duplicate_single_occurrence_property_is_rejected() {
        let bytes = encode_properties(&[
            Property::ReceiveMaximum(10),
            Property::ReceiveMaximum(20),
        ])
        .unwrap();
        let err = parse_properties(&bytes, 0).unwrap_err();
        assert!(matches!(err, DecodeError::ProtocolError(_)));
    }

    #[test]
    fn repeated_user_properties_are_allowed() {
        let bytes = encode_properties(&[
            Property::UserProperty("k".into(), "a".into()),
            Property::UserProperty("k".into(), "b".into()),
        ])
        .unwrap();
        assert!(parse_properties(&bytes, 0).is_ok());
    }

    #[test]
    fn unknown_property_id_is_malformed() {
        // 0x04 is not assigned by the protocol.
        let err = parse_properties(&[0x02, 0x04, 0x00], 0).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPacket(_)));
    }

    #[test]
    fn truncated_property_list_asks_for_more() {
        // Declares five bytes of properties but carries two.
        let err = parse_properties(&[0x05, 0x01, 0x01], 0).unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete(3)));
    }
}
