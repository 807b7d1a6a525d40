// SPDX-License-Identifier: MPL-2.0

//! In-memory QoS delivery state.

use std::collections::{HashMap, HashSet};

use crate::mqtt_serde::control_packet::{ControlPacket, ProtocolVersion};
use crate::mqtt_serde::{mqttv3, mqttv5};
use crate::mqtt_session::store::{InboundPublishOutcome, SessionError, SessionState};

/// Outbound publish waiting for its PUBACK (QoS 1) or PUBREC (QoS 2).
#[derive(Debug, Clone)]
struct PendingPublish {
    seq: u64,
    packet: ControlPacket,
}

/// Outbound PUBREL waiting for its PUBCOMP. Keeps the sequence number of the
/// publish it replaced so replay preserves the original send order.
#[derive(Debug, Clone, Copy)]
struct PendingRelease {
    seq: u64,
    packet_id: u16,
}

/// Session state held entirely in memory. State is lost on process exit, so
/// QoS guarantees only span reconnects within one process lifetime.
#[derive(Debug)]
pub struct ClientSession {
    version: ProtocolVersion,
    next_packet_id: u16,
    send_seq: u64,
    unacked_publishes: HashMap<u16, PendingPublish>,
    unacked_releases: HashMap<u16, PendingRelease>,
    /// Inbound QoS 2 identifiers between PUBLISH and PUBREL. Membership here
    /// is what suppresses redelivery of a duplicate.
    inbound_partial: HashSet<u16>,
}

impl ClientSession {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            next_packet_id: 1,
            send_seq: 0,
            unacked_publishes: HashMap::new(),
            unacked_releases: HashMap::new(),
            inbound_partial: HashSet::new(),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    fn is_leased(&self, packet_id: u16) -> bool {
        self.unacked_publishes.contains_key(&packet_id)
            || self.unacked_releases.contains_key(&packet_id)
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.send_seq;
        self.send_seq += 1;
        seq
    }

    fn make_pubrec(&self, packet_id: u16) -> ControlPacket {
        match self.version {
            ProtocolVersion::V5 => {
                ControlPacket::PubRec5(mqttv5::pubrec::PubRec::new(packet_id, 0x00, Vec::new()))
            }
            ProtocolVersion::V3 => ControlPacket::PubRec3(mqttv3::pubrec::PubRec::new(packet_id)),
        }
    }

    fn make_puback(&self, packet_id: u16) -> ControlPacket {
        match self.version {
            ProtocolVersion::V5 => {
                ControlPacket::PubAck5(mqttv5::puback::PubAck::new(packet_id, 0x00, Vec::new()))
            }
            ProtocolVersion::V3 => ControlPacket::PubAck3(mqttv3::puback::PubAck::new(packet_id)),
        }
    }

    fn make_pubrel(&self, packet_id: u16) -> ControlPacket {
        match self.version {
            ProtocolVersion::V5 => {
                ControlPacket::PubRel5(mqttv5::pubrel::PubRel::new(packet_id, 0x00, Vec::new()))
            }
            ProtocolVersion::V3 => ControlPacket::PubRel3(mqttv3::pubrel::PubRel::new(packet_id)),
        }
    }

    fn make_pubcomp(&self, packet_id: u16) -> ControlPacket {
        match self.version {
            ProtocolVersion::V5 => {
                ControlPacket::PubComp5(mqttv5::pubcomp::PubComp::new(packet_id, 0x00, Vec::new()))
            }
            ProtocolVersion::V3 => ControlPacket::PubComp3(mqttv3::pubcomp::PubComp::new(packet_id)),
        }
    }
}

/// Pulls `(qos, packet_id, dup)` out of either publish variant.
fn publish_fields(packet: &ControlPacket) -> Option<(u8, Option<u16>, bool)> {
    match packet {
        ControlPacket::Publish5(p) => Some((p.qos, p.packet_id, p.dup)),
        ControlPacket::Publish3(p) => Some((p.qos, p.packet_id, p.dup)),
        _ => None,
    }
}

fn set_dup(packet: &mut ControlPacket) {
    match packet {
        ControlPacket::Publish5(p) => p.dup = true,
        ControlPacket::Publish3(p) => p.dup = true,
        _ => {}
    }
}

impl SessionState for ClientSession {
    fn lease_packet_id(&mut self) -> Result<u16, SessionError> {
        // Worst case visits every non-zero identifier once.
        for _ in 0..u16::MAX {
            let candidate = self.next_packet_id;
            self.next_packet_id = if candidate == u16::MAX { 1 } else { candidate + 1 };
            if !self.is_leased(candidate) {
                return Ok(candidate);
            }
        }
        Err(SessionError::PacketIdExhausted)
    }

    fn store_outgoing(&mut self, publish: ControlPacket) -> Result<(), SessionError> {
        let (qos, packet_id, _) = publish_fields(&publish)
            .ok_or_else(|| SessionError::UnsuitablePacket("not a PUBLISH".into()))?;
        if qos == 0 {
            return Err(SessionError::UnsuitablePacket(
                "QoS 0 publishes are not acknowledged".into(),
            ));
        }
        let packet_id = packet_id.ok_or_else(|| {
            SessionError::UnsuitablePacket("QoS > 0 publish without packet identifier".into())
        })?;
        let seq = self.next_seq();
        debug_assert!(
            !self.unacked_publishes.contains_key(&packet_id),
            "packet identifier {packet_id} already has an outstanding publish"
        );
        self.unacked_publishes
            .insert(packet_id, PendingPublish { seq, packet: publish });
        Ok(())
    }

    fn handle_incoming_publish(
        &mut self,
        publish: &ControlPacket,
    ) -> Result<InboundPublishOutcome, SessionError> {
        let (qos, packet_id, _dup) = publish_fields(publish)
            .ok_or_else(|| SessionError::UnsuitablePacket("not a PUBLISH".into()))?;
        match qos {
            0 => Ok(InboundPublishOutcome { deliver: true, response: None }),
            1 => {
                let packet_id = packet_id.ok_or_else(|| {
                    SessionError::UnsuitablePacket("QoS 1 publish without packet identifier".into())
                })?;
                Ok(InboundPublishOutcome {
                    deliver: true,
                    response: Some(self.make_puback(packet_id)),
                })
            }
            _ => {
                let packet_id = packet_id.ok_or_else(|| {
                    SessionError::UnsuitablePacket("QoS 2 publish without packet identifier".into())
                })?;
                // A second PUBLISH with the same identifier before PUBREL is
                // a retransmission. Acknowledge it again but do not deliver.
                let first_arrival = self.inbound_partial.insert(packet_id);
                if !first_arrival {
                    tracing::debug!(packet_id, "suppressing duplicate QoS 2 delivery");
                }
                Ok(InboundPublishOutcome {
                    deliver: first_arrival,
                    response: Some(self.make_pubrec(packet_id)),
                })
            }
        }
    }

    fn handle_incoming_puback(&mut self, packet_id: u16) {
        if self.unacked_publishes.remove(&packet_id).is_none() {
            tracing::debug!(packet_id, "PUBACK for unknown packet identifier, ignoring");
        }
    }

    fn handle_incoming_pubrec(&mut self, packet_id: u16, success: bool) -> Option<ControlPacket> {
        let pending = match self.unacked_publishes.remove(&packet_id) {
            Some(pending) => pending,
            None => {
                tracing::debug!(packet_id, "PUBREC for unknown packet identifier, ignoring");
                return None;
            }
        };
        if !success {
            // Receiver refused the message. The delivery is over and the
            // identifier is free again.
            return None;
        }
        self.unacked_releases
            .insert(packet_id, PendingRelease { seq: pending.seq, packet_id });
        Some(self.make_pubrel(packet_id))
    }

    fn handle_incoming_pubrel(&mut self, packet_id: u16) -> ControlPacket {
        // PUBCOMP is sent even when the identifier is unknown, so a receiver
        // that lost state cannot wedge the sender.
        self.inbound_partial.remove(&packet_id);
        self.make_pubcomp(packet_id)
    }

    fn handle_incoming_pubcomp(&mut self, packet_id: u16) {
        if self.unacked_releases.remove(&packet_id).is_none() {
            tracing::debug!(packet_id, "PUBCOMP for unknown packet identifier, ignoring");
        }
    }

    fn queued_messages(&self) -> Vec<ControlPacket> {
        let mut queue: Vec<(u64, ControlPacket)> = Vec::with_capacity(self.outstanding());
        for pending in self.unacked_publishes.values() {
            let mut packet = pending.packet.clone();
            set_dup(&mut packet);
            queue.push((pending.seq, packet));
        }
        for release in self.unacked_releases.values() {
            queue.push((release.seq, self.make_pubrel(release.packet_id)));
        }
        queue.sort_by_key(|(seq, _)| *seq);
        queue.into_iter().map(|(_, packet)| packet).collect()
    }

    fn outstanding(&self) -> usize {
        self.unacked_publishes.len() + self.unacked_releases.len()
    }

    fn clear(&mut self) {
        self.unacked_publishes.clear();
        self.unacked_releases.clear();
        self.inbound_partial.clear();
        self.send_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt_serde::mqttv5::publish::Publish;

    fn publish(session: &mut ClientSession, qos: u8) -> (u16, ControlPacket) {
        let packet_id = session.lease_packet_id().unwrap();
        let mut p = Publish::new("metrics/load", b"0.93".to_vec(), qos);
        p.packet_id = Some(packet_id);
        let packet = ControlPacket::Publish5(p);
        session.store_outgoing(packet.clone()).unwrap();
        (packet_id, packet)
    }

    #[test]
    fn packet_ids_are_sequential_and_nonzero() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        assert_eq!(session.lease_packet_id().unwrap(), 1);
        assert_eq!(session.lease_packet_id().unwrap(), 2);
        session.next_packet_id = u16::MAX;
        assert_eq!(session.lease_packet_id().unwrap(), u16::MAX);
        // Wraps past zero back to 1.
        assert_eq!(session.lease_packet_id().unwrap(), 1);
    }

    #[test]
    fn lease_skips_in_flight_identifiers() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (id, _) = publish(&mut session, 1);
        assert_eq!(id, 1);
        session.next_packet_id = 1;
        assert_eq!(session.lease_packet_id().unwrap(), 2);
    }

    #[test]
    fn lease_fails_when_all_identifiers_are_taken() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        for id in 1..=u16::MAX {
            session
                .unacked_releases
                .insert(id, PendingRelease { seq: id as u64, packet_id: id });
        }
        assert!(matches!(
            session.lease_packet_id(),
            Err(SessionError::PacketIdExhausted)
        ));
    }

    #[test]
    fn qos0_publish_is_not_stored() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let p = ControlPacket::Publish5(Publish::new("a", vec![], 0));
        assert!(session.store_outgoing(p).is_err());
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already has an outstanding publish")]
    fn storing_twice_under_one_identifier_is_a_bug() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (_, packet) = publish(&mut session, 1);
        session.store_outgoing(packet).unwrap();
    }

    #[test]
    fn puback_completes_qos1_delivery() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (id, _) = publish(&mut session, 1);
        assert_eq!(session.outstanding(), 1);
        session.handle_incoming_puback(id);
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn puback_for_unknown_identifier_is_ignored() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        session.handle_incoming_puback(99);
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn qos2_handshake_marches_through_pubrel_and_pubcomp() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (id, _) = publish(&mut session, 2);

        let pubrel = session.handle_incoming_pubrec(id, true).unwrap();
        match &pubrel {
            ControlPacket::PubRel5(r) => assert_eq!(r.packet_id, id),
            other => panic!("expected PUBREL, got {other:?}"),
        }
        // The publish is replaced by the release; still one in flight.
        assert_eq!(session.outstanding(), 1);

        session.handle_incoming_pubcomp(id);
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn failed_pubrec_abandons_the_delivery() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (id, _) = publish(&mut session, 2);
        assert!(session.handle_incoming_pubrec(id, false).is_none());
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn queued_messages_replays_in_send_order_with_dup() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let (first, _) = publish(&mut session, 2);
        let (second, _) = publish(&mut session, 1);
        let (third, _) = publish(&mut session, 2);

        // First delivery got its PUBREC; it replays as a PUBREL but keeps
        // its slot at the head of the queue.
        session.handle_incoming_pubrec(first, true).unwrap();

        let queue = session.queued_messages();
        assert_eq!(queue.len(), 3);
        match &queue[0] {
            ControlPacket::PubRel5(r) => assert_eq!(r.packet_id, first),
            other => panic!("expected PUBREL first, got {other:?}"),
        }
        match &queue[1] {
            ControlPacket::Publish5(p) => {
                assert_eq!(p.packet_id, Some(second));
                assert!(p.dup);
            }
            other => panic!("expected PUBLISH, got {other:?}"),
        }
        match &queue[2] {
            ControlPacket::Publish5(p) => assert_eq!(p.packet_id, Some(third)),
            other => panic!("expected PUBLISH, got {other:?}"),
        }
    }

    #[test]
    fn inbound_qos2_duplicate_is_acked_but_not_redelivered() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let mut p = Publish::new("alerts", b"x".to_vec(), 2);
        p.packet_id = Some(7);
        let packet = ControlPacket::Publish5(p);

        let first = session.handle_incoming_publish(&packet).unwrap();
        assert!(first.deliver);
        assert!(matches!(first.response, Some(ControlPacket::PubRec5(_))));

        let second = session.handle_incoming_publish(&packet).unwrap();
        assert!(!second.deliver);
        assert!(matches!(second.response, Some(ControlPacket::PubRec5(_))));

        // PUBREL releases the identifier for reuse.
        let pubcomp = session.handle_incoming_pubrel(7);
        assert!(matches!(pubcomp, ControlPacket::PubComp5(_)));
        let third = session.handle_incoming_publish(&packet).unwrap();
        assert!(third.deliver);
    }

    #[test]
    fn inbound_qos1_is_always_delivered_and_acked() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        let mut p = Publish::new("alerts", b"x".to_vec(), 1);
        p.packet_id = Some(3);
        let packet = ControlPacket::Publish5(p);
        for _ in 0..2 {
            let outcome = session.handle_incoming_publish(&packet).unwrap();
            assert!(outcome.deliver);
            match outcome.response {
                Some(ControlPacket::PubAck5(a)) => assert_eq!(a.packet_id, 3),
                other => panic!("expected PUBACK, got {other:?}"),
            }
        }
    }

    #[test]
    fn v3_session_produces_v3_acknowledgements() {
        let mut session = ClientSession::new(ProtocolVersion::V3);
        let mut p = crate::mqtt_serde::mqttv3::publish::Publish::new("a/b", vec![1], 1);
        p.packet_id = Some(11);
        let outcome = session
            .handle_incoming_publish(&ControlPacket::Publish3(p))
            .unwrap();
        assert!(matches!(outcome.response, Some(ControlPacket::PubAck3(_))));
    }

    #[test]
    fn clear_discards_everything() {
        let mut session = ClientSession::new(ProtocolVersion::V5);
        publish(&mut session, 2);
        publish(&mut session, 1);
        session.clear();
        assert_eq!(session.outstanding(), 0);
        assert!(session.queued_messages().is_empty());
    }
}
