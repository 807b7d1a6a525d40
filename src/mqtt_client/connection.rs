// SPDX-License-Identifier: MPL-2.0

//! Connection lifecycle and the three per-connection worker tasks.
//!
//! [`Connection::open`] dials the transport, performs the CONNECT/CONNACK
//! exchange and spawns a write loop, a read loop and a keep-alive task.
//! Outbound packets travel through a bounded mpsc queue in submission order;
//! inbound application messages come out of [`Connection::next_message`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::mqtt_client::error::ClientError;
use crate::mqtt_client::opts::ConnectOptions;
use crate::mqtt_client::retry::Reconnector;
use crate::mqtt_client::state::ConnectionState;
use crate::mqtt_client::transport::Transport;
use crate::mqtt_serde::control_packet::{ControlPacket, ProtocolVersion};
use crate::mqtt_serde::parser::stream::PacketStream;
use crate::mqtt_serde::{mqttv3, mqttv5};
use crate::mqtt_session::store::SessionState;
use crate::mqtt_session::ClientSession;

type SharedState = Arc<Mutex<ConnectionState>>;
type SharedSession = Arc<Mutex<Box<dyn SessionState>>>;

/// Mutex poisoning carries no recovery value here; take the inner data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whether the read loop keeps going after a packet was handled.
enum Flow {
    Continue,
    Stop,
}

pub struct Connection {
    options: ConnectOptions,
    state: SharedState,
    session: SharedSession,
    outbound_tx: mpsc::Sender<ControlPacket>,
    inbound_rx: Option<mpsc::Receiver<ControlPacket>>,
    write_task: Option<JoinHandle<()>>,
    read_task: Option<JoinHandle<()>>,
    keep_alive_task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Dials the broker and runs the connect handshake.
    ///
    /// With `wait_for_ack` the call returns only after CONNACK was accepted;
    /// a rejection or a handshake read failure is returned directly. Without
    /// it the worker loops start immediately and the CONNACK is handled by
    /// the read loop, so a rejection surfaces through the connection state
    /// instead of the return value.
    pub async fn open<T: Transport + 'static>(
        options: ConnectOptions,
        wait_for_ack: bool,
    ) -> Result<Self, ClientError> {
        let state: SharedState = Arc::new(Mutex::new(ConnectionState::Initializing));
        let session: SharedSession =
            Arc::new(Mutex::new(Box::new(ClientSession::new(options.version))));

        *lock(&state) = ConnectionState::Connecting;
        tracing::info!(address = %options.address, client_id = %options.client_id,
            version = ?options.version, "connecting");

        let transport =
            match tokio::time::timeout(options.connect_timeout, T::connect(&options.address)).await
            {
                Ok(Ok(transport)) => transport,
                Ok(Err(transport_err)) => {
                    let error: ClientError = transport_err.into();
                    fail(&state, error.clone());
                    return Err(error);
                }
                Err(_elapsed) => {
                    fail(&state, ClientError::ConnectionTimeout);
                    return Err(ClientError::ConnectionTimeout);
                }
            };

        let (mut reader, mut writer) = tokio::io::split(transport);

        let connect = options.connect_packet();
        if let Some(warning) = connect.validate() {
            tracing::warn!(%warning, "connect advisory");
        }
        let bytes = connect.to_bytes().map_err(ClientError::Malformed)?;
        if let Err(io_err) = writer.write_all(&bytes).await {
            let error: ClientError = io_err.into();
            fail(&state, error.clone());
            return Err(error);
        }
        tracing::debug!(len = bytes.len(), "CONNECT written");

        let (outbound_tx, outbound_rx) = mpsc::channel(options.outbound_queue_size);
        let (inbound_tx, inbound_rx) = mpsc::channel(options.inbound_queue_size);
        let last_sent = Arc::new(Mutex::new(Instant::now()));

        let mut decoder = PacketStream::new(options.version);
        let mut replay = Vec::new();

        if wait_for_ack {
            // The connect timeout bounds the CONNACK wait as well; a broker
            // that accepts the socket and then goes silent must not hang the
            // handshake.
            let handshake = tokio::time::timeout(
                options.connect_timeout,
                read_connack(&mut reader, &mut decoder, &inbound_tx),
            )
            .await
            .unwrap_or(Err(ClientError::ConnectionTimeout));
            match handshake {
                Ok(connack) => {
                    match process_connack(&connack, options.clean_start, &state, &session) {
                        Ok(pending) => replay = pending,
                        Err(error) => {
                            fail(&state, error.clone());
                            return Err(error);
                        }
                    }
                }
                Err(error) => {
                    fail(&state, error.clone());
                    return Err(error);
                }
            }
        }

        let write_task = tokio::spawn(write_loop(
            outbound_rx,
            writer,
            Arc::clone(&state),
            Arc::clone(&last_sent),
        ));
        let read_task = tokio::spawn(read_loop(
            reader,
            decoder,
            options.clone(),
            Arc::clone(&state),
            Arc::clone(&session),
            outbound_tx.clone(),
            inbound_tx,
        ));
        let keep_alive_task = if options.keep_alive > 0 {
            Some(tokio::spawn(keep_alive_loop(
                options.keep_alive,
                options.version,
                Arc::clone(&state),
                Arc::clone(&last_sent),
                outbound_tx.clone(),
            )))
        } else {
            None
        };

        // Session resumption traffic goes out ahead of anything the
        // application submits after open returns.
        for packet in replay {
            outbound_tx
                .send(packet)
                .await
                .map_err(|_| ClientError::QueueClosed)?;
        }

        Ok(Self {
            options,
            state,
            session,
            outbound_tx,
            inbound_rx: Some(inbound_rx),
            write_task: Some(write_task),
            read_task: Some(read_task),
            keep_alive_task,
        })
    }

    /// [`Connection::open`] wrapped in the reconnection policy from the
    /// options: retry transient failures with exponential backoff, stop on
    /// protocol errors and broker rejections.
    pub async fn open_with_retry<T: Transport + 'static>(
        options: ConnectOptions,
        wait_for_ack: bool,
    ) -> Result<Self, ClientError> {
        let mut reconnector = Reconnector::from_options(&options);
        reconnector
            .run(|| {
                let attempt = options.clone();
                async move { Self::open::<T>(attempt, wait_for_ack).await }
            })
            .await
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    /// Outbound publishes and releases still awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        lock(&self.session).outstanding()
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if lock(&self.state).is_open() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Sends an application message. Returns the leased packet identifier
    /// for QoS 1/2, `None` for QoS 0.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: u8,
        retain: bool,
    ) -> Result<Option<u16>, ClientError> {
        self.ensure_open()?;
        let packet_id = if qos > 0 {
            Some(lock(&self.session).lease_packet_id()?)
        } else {
            None
        };
        let packet = match self.options.version {
            ProtocolVersion::V5 => {
                let mut publish = mqttv5::publish::Publish::new(topic, payload, qos);
                publish.retain = retain;
                publish.packet_id = packet_id;
                ControlPacket::Publish5(publish)
            }
            ProtocolVersion::V3 => {
                let mut publish = mqttv3::publish::Publish::new(topic, payload, qos);
                publish.retain = retain;
                publish.packet_id = packet_id;
                ControlPacket::Publish3(publish)
            }
        };
        if let Some(warning) = packet.validate() {
            tracing::warn!(%warning, "publish advisory");
        }
        if qos > 0 {
            lock(&self.session).store_outgoing(packet.clone())?;
        }
        self.send_packet(packet).await?;
        Ok(packet_id)
    }

    pub async fn subscribe(&self, topic: &str, qos: u8) -> Result<u16, ClientError> {
        self.ensure_open()?;
        let packet_id = lock(&self.session).lease_packet_id()?;
        let packet = match self.options.version {
            ProtocolVersion::V5 => ControlPacket::Subscribe5(mqttv5::subscribe::Subscribe::new(
                packet_id,
                vec![mqttv5::subscribe::Subscription::new(topic, qos)],
            )),
            ProtocolVersion::V3 => ControlPacket::Subscribe3(mqttv3::subscribe::Subscribe::new(
                packet_id,
                vec![mqttv3::subscribe::Subscription::new(topic, qos)],
            )),
        };
        self.send_packet(packet).await?;
        Ok(packet_id)
    }

    pub async fn unsubscribe(&self, topics: Vec<String>) -> Result<u16, ClientError> {
        self.ensure_open()?;
        let packet_id = lock(&self.session).lease_packet_id()?;
        let packet = match self.options.version {
            ProtocolVersion::V5 => ControlPacket::Unsubscribe5(
                mqttv5::unsubscribe::Unsubscribe::new(packet_id, topics),
            ),
            ProtocolVersion::V3 => ControlPacket::Unsubscribe3(
                mqttv3::unsubscribe::Unsubscribe::new(packet_id, topics),
            ),
        };
        self.send_packet(packet).await?;
        Ok(packet_id)
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.ensure_open()?;
        let packet = match self.options.version {
            ProtocolVersion::V5 => ControlPacket::PingReq5(mqttv5::pingreq::PingReq),
            ProtocolVersion::V3 => ControlPacket::PingReq3(mqttv3::pingreq::PingReq),
        };
        self.send_packet(packet).await
    }

    /// Low-level escape hatch: queues a pre-built packet as-is.
    pub async fn send_packet(&self, packet: ControlPacket) -> Result<(), ClientError> {
        self.outbound_tx
            .send(packet)
            .await
            .map_err(|_| ClientError::QueueClosed)
    }

    /// Next inbound application message (PUBLISH after QoS handling, plus
    /// SUBACK/UNSUBACK/AUTH pass-through). `None` once the connection is
    /// torn down or the receiver was taken.
    pub async fn next_message(&mut self) -> Option<ControlPacket> {
        match self.inbound_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Hands the inbound delivery queue to the caller, for cases where
    /// receiving should happen on a separate task.
    pub fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<ControlPacket>> {
        self.inbound_rx.take()
    }

    /// Graceful shutdown: queue DISCONNECT, let the write loop drain and
    /// close the transport, then stop the remaining tasks.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        {
            let mut state = lock(&self.state);
            match &*state {
                ConnectionState::Initializing
                | ConnectionState::Connecting
                | ConnectionState::Open => *state = ConnectionState::Closing,
                other => {
                    return Err(ClientError::InvalidState {
                        expected: "initializing, connecting or open".into(),
                        actual: other.name().into(),
                    })
                }
            }
        }
        tracing::info!("closing connection");
        let disconnect = match self.options.version {
            ProtocolVersion::V5 => {
                ControlPacket::Disconnect5(mqttv5::disconnect::Disconnect::new(0x00, Vec::new()))
            }
            ProtocolVersion::V3 => ControlPacket::Disconnect3(mqttv3::disconnect::Disconnect),
        };
        let _ = self.outbound_tx.send(disconnect).await;
        if let Some(task) = self.write_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.keep_alive_task.take() {
            task.abort();
        }
        let mut state = lock(&self.state);
        if !state.is_terminal() {
            *state = ConnectionState::Closed(None);
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for task in [
            self.write_task.take(),
            self.read_task.take(),
            self.keep_alive_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}

/// Marks the connection as dead. `Failed` before the handshake completed,
/// `Closed(Some(_))` afterwards. Terminal states are never overwritten.
fn fail(state: &SharedState, error: ClientError) {
    let mut current = lock(state);
    if current.is_terminal() {
        return;
    }
    tracing::error!(error = %error, "connection torn down");
    let before_open = matches!(
        &*current,
        ConnectionState::Initializing | ConnectionState::Connecting
    );
    *current = if before_open {
        ConnectionState::Failed(error)
    } else {
        ConnectionState::Closed(Some(error))
    };
}

/// Blocking CONNACK read for `wait_for_ack`. AUTH packets are forwarded to
/// the application queue (extended authentication is pass-through only).
async fn read_connack<T: Transport>(
    reader: &mut ReadHalf<T>,
    decoder: &mut PacketStream,
    inbound_tx: &mpsc::Sender<ControlPacket>,
) -> Result<ControlPacket, ClientError> {
    let mut buffer = vec![0u8; 4096];
    loop {
        while let Some(packet) = decoder.next_packet()? {
            match packet {
                connack @ (ControlPacket::ConnAck5(_) | ControlPacket::ConnAck3(_)) => {
                    return Ok(connack);
                }
                auth @ ControlPacket::Auth(_) => {
                    let _ = inbound_tx.send(auth).await;
                }
                other => {
                    return Err(ClientError::Protocol(format!(
                        "expected CONNACK, received {:?}",
                        other.packet_type()
                    )));
                }
            }
        }
        let read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| ClientError::FailedToReadConnAck(e.to_string()))?;
        if read == 0 {
            return Err(ClientError::FailedToReadConnAck(
                "connection closed before CONNACK".into(),
            ));
        }
        decoder.feed(&buffer[..read]);
    }
}

/// Applies an accepted or rejected CONNACK to the state machine. On
/// resumption the returned packets must be sent before new traffic.
fn process_connack(
    connack: &ControlPacket,
    clean_start: bool,
    state: &SharedState,
    session: &SharedSession,
) -> Result<Vec<ControlPacket>, ClientError> {
    let (session_present, accepted, reason_code) = match connack {
        ControlPacket::ConnAck5(c) => (c.session_present, c.is_success(), c.reason_code),
        ControlPacket::ConnAck3(c) => (c.session_present, c.return_code == 0, c.return_code),
        other => {
            return Err(ClientError::Protocol(format!(
                "expected CONNACK, received {:?}",
                other.packet_type()
            )));
        }
    };
    if !accepted {
        return Err(ClientError::BrokerRejectedConnection { reason_code });
    }
    let replay = {
        let mut session = lock(session);
        if session_present && !clean_start {
            session.queued_messages()
        } else {
            session.clear();
            Vec::new()
        }
    };
    *lock(state) = ConnectionState::Open;
    tracing::info!(session_present, replay = replay.len(), "connection open");
    Ok(replay)
}

/// Drains the outbound queue onto the transport. DISCONNECT is written even
/// after the state has left `Open` and always ends the loop with a
/// transport shutdown.
async fn write_loop<T: Transport>(
    mut outbound_rx: mpsc::Receiver<ControlPacket>,
    mut writer: WriteHalf<T>,
    state: SharedState,
    last_sent: Arc<Mutex<Instant>>,
) {
    while let Some(packet) = outbound_rx.recv().await {
        let is_disconnect = matches!(
            packet,
            ControlPacket::Disconnect5(_) | ControlPacket::Disconnect3(_)
        );
        match packet.to_bytes() {
            Ok(bytes) => {
                if let Err(io_err) = writer.write_all(&bytes).await {
                    fail(&state, io_err.into());
                    return;
                }
                *lock(&last_sent) = Instant::now();
                tracing::debug!(packet_type = ?packet.packet_type(), len = bytes.len(), "sent");
            }
            Err(encode_err) => {
                // A packet that cannot serialize never reaches the wire;
                // drop it rather than kill the connection.
                tracing::error!(error = %encode_err, "dropping unserializable packet");
            }
        }
        if is_disconnect {
            let _ = writer.shutdown().await;
            return;
        }
    }
}

/// Reads transport bytes, reassembles packets and runs the QoS handshake.
/// With keep-alive enabled a silent wire for 1.5 keep-alive periods counts
/// as a dead connection.
async fn read_loop<T: Transport>(
    mut reader: ReadHalf<T>,
    mut decoder: PacketStream,
    options: ConnectOptions,
    state: SharedState,
    session: SharedSession,
    outbound_tx: mpsc::Sender<ControlPacket>,
    inbound_tx: mpsc::Sender<ControlPacket>,
) {
    let idle_limit = if options.keep_alive > 0 {
        Some(Duration::from_millis(u64::from(options.keep_alive) * 1500))
    } else {
        None
    };
    let mut buffer = vec![0u8; 4096];
    loop {
        // Drain everything already reassembled before blocking on the
        // transport. The CONNACK handshake may have buffered packets that
        // arrived in the same segment.
        loop {
            match decoder.next_packet() {
                Ok(Some(packet)) => {
                    tracing::debug!(packet_type = ?packet.packet_type(), "received");
                    match dispatch_packet(
                        packet,
                        &options,
                        &state,
                        &session,
                        &outbound_tx,
                        &inbound_tx,
                    )
                    .await
                    {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => return,
                        Err(error) => {
                            fail(&state, error);
                            return;
                        }
                    }
                }
                Ok(None) => break,
                Err(decode_err) => {
                    fail(&state, ClientError::Malformed(decode_err));
                    return;
                }
            }
        }
        let read = match idle_limit {
            Some(limit) => match tokio::time::timeout(limit, reader.read(&mut buffer)).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    fail(
                        &state,
                        ClientError::ConnectionFailure {
                            kind: std::io::ErrorKind::TimedOut,
                            message: "no traffic within 1.5 keep-alive periods".into(),
                        },
                    );
                    return;
                }
            },
            None => reader.read(&mut buffer).await,
        };
        let read = match read {
            Ok(0) => {
                fail_read(
                    &state,
                    std::io::ErrorKind::UnexpectedEof,
                    "transport closed by peer".into(),
                );
                return;
            }
            Ok(read) => read,
            Err(io_err) => {
                fail_read(&state, io_err.kind(), io_err.to_string());
                return;
            }
        };
        decoder.feed(&buffer[..read]);
    }
}

/// Records a transport read failure. A read failure while the state is
/// still `Connecting` means the CONNACK never arrived.
fn fail_read(state: &SharedState, kind: std::io::ErrorKind, message: String) {
    let error = if matches!(&*lock(state), ConnectionState::Connecting) {
        ClientError::FailedToReadConnAck(message)
    } else {
        ClientError::ConnectionFailure { kind, message }
    };
    fail(state, error);
}

/// Routes one inbound packet: QoS handshake traffic into the session,
/// application messages into the delivery queue, CONNACK into the state
/// machine when it arrives asynchronously.
async fn dispatch_packet(
    packet: ControlPacket,
    options: &ConnectOptions,
    state: &SharedState,
    session: &SharedSession,
    outbound_tx: &mpsc::Sender<ControlPacket>,
    inbound_tx: &mpsc::Sender<ControlPacket>,
) -> Result<Flow, ClientError> {
    match packet {
        publish @ (ControlPacket::Publish5(_) | ControlPacket::Publish3(_)) => {
            let outcome = lock(session).handle_incoming_publish(&publish)?;
            if let Some(response) = outcome.response {
                outbound_tx
                    .send(response)
                    .await
                    .map_err(|_| ClientError::QueueClosed)?;
            }
            if outcome.deliver && inbound_tx.send(publish).await.is_err() {
                tracing::debug!("delivery receiver dropped, discarding message");
            }
            Ok(Flow::Continue)
        }
        ControlPacket::PubAck5(ack) => {
            lock(session).handle_incoming_puback(ack.packet_id);
            Ok(Flow::Continue)
        }
        ControlPacket::PubAck3(ack) => {
            lock(session).handle_incoming_puback(ack.packet_id);
            Ok(Flow::Continue)
        }
        ControlPacket::PubRec5(rec) => {
            let pubrel = lock(session).handle_incoming_pubrec(rec.packet_id, rec.reason_code < 0x80);
            if let Some(pubrel) = pubrel {
                outbound_tx
                    .send(pubrel)
                    .await
                    .map_err(|_| ClientError::QueueClosed)?;
            }
            Ok(Flow::Continue)
        }
        ControlPacket::PubRec3(rec) => {
            let pubrel = lock(session).handle_incoming_pubrec(rec.packet_id, true);
            if let Some(pubrel) = pubrel {
                outbound_tx
                    .send(pubrel)
                    .await
                    .map_err(|_| ClientError::QueueClosed)?;
            }
            Ok(Flow::Continue)
        }
        ControlPacket::PubRel5(rel) => {
            let pubcomp = lock(session).handle_incoming_pubrel(rel.packet_id);
            outbound_tx
                .send(pubcomp)
                .await
                .map_err(|_| ClientError::QueueClosed)?;
            Ok(Flow::Continue)
        }
        ControlPacket::PubRel3(rel) => {
            let pubcomp = lock(session).handle_incoming_pubrel(rel.packet_id);
            outbound_tx
                .send(pubcomp)
                .await
                .map_err(|_| ClientError::QueueClosed)?;
            Ok(Flow::Continue)
        }
        ControlPacket::PubComp5(comp) => {
            lock(session).handle_incoming_pubcomp(comp.packet_id);
            Ok(Flow::Continue)
        }
        ControlPacket::PubComp3(comp) => {
            lock(session).handle_incoming_pubcomp(comp.packet_id);
            Ok(Flow::Continue)
        }
        connack @ (ControlPacket::ConnAck5(_) | ControlPacket::ConnAck3(_)) => {
            if !matches!(&*lock(state), ConnectionState::Connecting) {
                return Err(ClientError::Protocol(
                    "CONNACK on an already open connection".into(),
                ));
            }
            let replay = process_connack(&connack, options.clean_start, state, session)?;
            for pending in replay {
                outbound_tx
                    .send(pending)
                    .await
                    .map_err(|_| ClientError::QueueClosed)?;
            }
            Ok(Flow::Continue)
        }
        ControlPacket::PingResp5(_) | ControlPacket::PingResp3(_) => Ok(Flow::Continue),
        delivery @ (ControlPacket::SubAck5(_)
        | ControlPacket::SubAck3(_)
        | ControlPacket::UnsubAck5(_)
        | ControlPacket::UnsubAck3(_)
        | ControlPacket::Auth(_)) => {
            if inbound_tx.send(delivery).await.is_err() {
                tracing::debug!("delivery receiver dropped, discarding acknowledgement");
            }
            Ok(Flow::Continue)
        }
        ControlPacket::Disconnect5(disconnect) => {
            let mut current = lock(state);
            if !current.is_terminal() {
                *current = if disconnect.reason_code == 0x00 {
                    ConnectionState::Closed(None)
                } else {
                    ConnectionState::Closed(Some(ClientError::Protocol(format!(
                        "broker disconnected with reason code {:#04x}",
                        disconnect.reason_code
                    ))))
                };
            }
            Ok(Flow::Stop)
        }
        ControlPacket::Disconnect3(_) => {
            let mut current = lock(state);
            if !current.is_terminal() {
                *current = ConnectionState::Closed(None);
            }
            Ok(Flow::Stop)
        }
        other => Err(ClientError::Protocol(format!(
            "unexpected {:?} from broker",
            other.packet_type()
        ))),
    }
}

/// Sends PINGREQ when nothing else went out for a full keep-alive period.
/// Wakes at the earliest possible deadline and re-checks, because any send
/// resets the clock.
async fn keep_alive_loop(
    keep_alive: u16,
    version: ProtocolVersion,
    state: SharedState,
    last_sent: Arc<Mutex<Instant>>,
    outbound_tx: mpsc::Sender<ControlPacket>,
) {
    let period = Duration::from_secs(u64::from(keep_alive));
    loop {
        let deadline = *lock(&last_sent) + period;
        tokio::time::sleep_until(deadline).await;
        if lock(&state).is_terminal() {
            return;
        }
        if lock(&last_sent).elapsed() >= period {
            let ping = match version {
                ProtocolVersion::V5 => ControlPacket::PingReq5(mqttv5::pingreq::PingReq),
                ProtocolVersion::V3 => ControlPacket::PingReq3(mqttv3::pingreq::PingReq),
            };
            tracing::debug!("keep-alive window elapsed, sending PINGREQ");
            if outbound_tx.send(ping).await.is_err() {
                return;
            }
        }
    }
}
