// SPDX-License-Identifier: MPL-2.0

//! Session state boundary.
//!
//! A [`SessionState`] owns everything that must survive a reconnect for the
//! QoS 1/2 delivery guarantees to hold: unacknowledged outbound publishes,
//! outbound PUBREL releases, and the set of inbound QoS 2 packet identifiers
//! whose PUBREL has not arrived yet. The in-memory implementation is
//! [`crate::mqtt_session::ClientSession`]; a durable implementation can be
//! swapped in behind the same trait.

use crate::mqtt_serde::control_packet::ControlPacket;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// All 65535 non-zero packet identifiers are currently leased.
    #[error("no free packet identifier available")]
    PacketIdExhausted,
    /// The packet handed to the store is not usable in that role, for
    /// example a QoS 0 publish offered for acknowledgement tracking.
    #[error("unsuitable packet for session store: {0}")]
    UnsuitablePacket(String),
}

/// What the connection should do with an inbound PUBLISH after the session
/// has recorded it.
#[derive(Debug)]
pub struct InboundPublishOutcome {
    /// False when this is a QoS 2 redelivery whose identifier is still in
    /// the partial set; the application already saw the message.
    pub deliver: bool,
    /// Acknowledgement to write back, if the QoS level requires one.
    pub response: Option<ControlPacket>,
}

pub trait SessionState: Send {
    /// Reserves a currently unused non-zero packet identifier. Identifiers
    /// are handed out in increasing order and wrap around at 65535, skipping
    /// any identifier still attached to an in-flight message.
    fn lease_packet_id(&mut self) -> Result<u16, SessionError>;

    /// Records an outbound QoS 1/2 publish until the matching PUBACK or
    /// PUBCOMP releases it. QoS 0 publishes are rejected.
    fn store_outgoing(&mut self, publish: ControlPacket) -> Result<(), SessionError>;

    /// Runs the receiver side of the QoS handshake for an inbound PUBLISH.
    fn handle_incoming_publish(
        &mut self,
        publish: &ControlPacket,
    ) -> Result<InboundPublishOutcome, SessionError>;

    /// Completes a QoS 1 delivery. Unknown identifiers are ignored.
    fn handle_incoming_puback(&mut self, packet_id: u16);

    /// Advances a QoS 2 delivery past the PUBREC step. Returns the PUBREL to
    /// send, or `None` when the identifier is unknown or the receiver
    /// reported failure.
    fn handle_incoming_pubrec(&mut self, packet_id: u16, success: bool) -> Option<ControlPacket>;

    /// Responds to an inbound PUBREL with the matching PUBCOMP and drops the
    /// identifier from the partial set.
    fn handle_incoming_pubrel(&mut self, packet_id: u16) -> ControlPacket;

    /// Completes a QoS 2 delivery. Unknown identifiers are ignored.
    fn handle_incoming_pubcomp(&mut self, packet_id: u16);

    /// Everything that must be retransmitted after a session is resumed, in
    /// original send order. Publishes come back with the DUP flag set;
    /// releases come back as PUBREL packets.
    fn queued_messages(&self) -> Vec<ControlPacket>;

    /// Number of in-flight outbound messages (publishes plus releases).
    fn outstanding(&self) -> usize;

    /// Discards all session state, as required when a connection is accepted
    /// without session resumption.
    fn clear(&mut self);
}
