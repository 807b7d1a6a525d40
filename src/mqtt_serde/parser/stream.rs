// SPDX-License-Identifier: MPL-2.0

use bytes::{Buf, BytesMut};

use crate::mqtt_serde::control_packet::{decode_packet, ControlPacket, ProtocolVersion};
use crate::mqtt_serde::parser::{DecodeError, Decoded};

/// Incremental packet decoder over a byte stream.
///
/// Bytes arrive in arbitrary chunks via [`feed`]; [`next_packet`] yields
/// complete packets and leaves partial ones buffered. A decode error other
/// than running out of input is fatal for the stream, since the framing
/// can no longer be trusted.
///
/// [`feed`]: PacketStream::feed
/// [`next_packet`]: PacketStream::next_packet
#[derive(Debug)]
pub struct PacketStream {
    buffer: BytesMut,
    version: ProtocolVersion,
}

impl PacketStream {
    pub fn new(version: ProtocolVersion) -> Self {
        PacketStream {
            buffer: BytesMut::with_capacity(16 * 1024),
            version,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Appends newly received bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed by a complete packet.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Decodes the next complete packet, if one is fully buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Any error means the
    /// stream is poisoned and the connection should be torn down.
    pub fn next_packet(&mut self) -> Result<Option<ControlPacket>, DecodeError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        match decode_packet(&self.buffer, self.version) {
            Ok(Decoded::Packet(packet, consumed)) => {
                self.buffer.advance(consumed);
                Ok(Some(packet))
            }
            Ok(Decoded::NeedMore(_)) => Ok(None),
            Err(DecodeError::Incomplete(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt_serde::control_packet::PacketCodec;
    use crate::mqtt_serde::mqttv5::pingresp::PingResp;
    use crate::mqtt_serde::mqttv5::puback::PubAck;
    use crate::mqtt_serde::mqttv5::publish::Publish;

    #[test]
    fn packet_split_across_chunks() {
        let bytes = Publish::new("a/b", b"hello".to_vec(), 0).to_bytes().unwrap();
        let mut stream = PacketStream::new(ProtocolVersion::V5);

        stream.feed(&bytes[..4]);
        assert!(stream.next_packet().unwrap().is_none());

        stream.feed(&bytes[4..]);
        let packet = stream.next_packet().unwrap().unwrap();
        assert!(matches!(packet, ControlPacket::Publish5(_)));
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn two_packets_in_one_chunk() {
        let mut bytes = PubAck::new(1, 0, vec![]).to_bytes().unwrap();
        bytes.extend(PingResp.to_bytes().unwrap());

        let mut stream = PacketStream::new(ProtocolVersion::V5);
        stream.feed(&bytes);
        assert!(matches!(
            stream.next_packet().unwrap().unwrap(),
            ControlPacket::PubAck5(_)
        ));
        assert!(matches!(
            stream.next_packet().unwrap().unwrap(),
            ControlPacket::PingResp5(_)
        ));
        assert!(stream.next_packet().unwrap().is_none());
    }

    #[test]
    fn byte_at_a_time_feed() {
        let bytes = Publish::new("t", b"x".to_vec(), 0).to_bytes().unwrap();
        let mut stream = PacketStream::new(ProtocolVersion::V5);
        for byte in &bytes[..bytes.len() - 1] {
            stream.feed(&[*byte]);
            assert!(stream.next_packet().unwrap().is_none());
        }
        stream.feed(&[bytes[bytes.len() - 1]]);
        assert!(stream.next_packet().unwrap().is_some());
    }

    #[test]
    fn garbage_poisons_the_stream() {
        let mut stream = PacketStream::new(ProtocolVersion::V5);
        // Type nibble 0 is not a packet.
        stream.feed(&[0x00, 0x00]);
        assert!(stream.next_packet().is_err());
    }

    #[test]
    fn auth_on_v3_stream_is_an_error() {
        let mut stream = PacketStream::new(ProtocolVersion::V3);
        stream.feed(&[0xF0, 0x00]);
        assert!(stream.next_packet().is_err());
    }
}
