// SPDX-License-Identifier: MPL-2.0

//! Connection configuration.

use std::time::Duration;

use crate::mqtt_serde::control_packet::{ControlPacket, ProtocolVersion};
use crate::mqtt_serde::mqttv5::common::properties::Property;
use crate::mqtt_serde::mqttv5::will::Will;
use crate::mqtt_serde::{mqttv3, mqttv5};

/// Everything needed to dial a broker and keep the connection alive.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// `host:port` of the broker.
    pub address: String,
    pub version: ProtocolVersion,
    pub client_id: String,
    pub clean_start: bool,
    /// Seconds between mandatory control packets. 0 disables the keep-alive
    /// mechanism entirely (no PINGREQ task, no read timeout).
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub will: Option<Will>,
    /// CONNECT properties, ignored for v3.1.1.
    pub properties: Vec<Property>,
    /// Window for transport dial plus CONNACK.
    pub connect_timeout: Duration,
    /// Capacity of the bounded outbound packet queue.
    pub outbound_queue_size: usize,
    /// Capacity of the bounded inbound delivery queue.
    pub inbound_queue_size: usize,
    pub reconnect_initial_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub reconnect_factor: f64,
    pub stop_on_protocol_error: bool,
    pub stop_on_broker_rejection: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            address: "localhost:1883".to_string(),
            version: ProtocolVersion::V5,
            client_id: String::new(),
            clean_start: true,
            keep_alive: 60,
            username: None,
            password: None,
            will: None,
            properties: Vec::new(),
            connect_timeout: Duration::from_secs(10),
            outbound_queue_size: 64,
            inbound_queue_size: 64,
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(10),
            reconnect_factor: 2.0,
            stop_on_protocol_error: true,
            stop_on_broker_rejection: true,
        }
    }
}

impl ConnectOptions {
    pub fn new(address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.clean_start = clean_start;
        self
    }

    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive = seconds;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<Vec<u8>>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_will(mut self, will: Will) -> Self {
        self.will = Some(will);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the CONNECT packet for the configured protocol version. The
    /// v5 will carries its properties; downgrading to v3.1.1 keeps the
    /// basic will fields and drops the property set.
    pub fn connect_packet(&self) -> ControlPacket {
        match self.version {
            ProtocolVersion::V5 => {
                let mut connect = mqttv5::connect::Connect::new(self.client_id.clone());
                connect.keep_alive = self.keep_alive;
                connect.clean_start = self.clean_start;
                connect.username = self.username.clone();
                connect.password = self.password.clone();
                connect.will = self.will.clone();
                connect.properties = self.properties.clone();
                ControlPacket::Connect5(connect)
            }
            ProtocolVersion::V3 => {
                let mut connect = mqttv3::connect::Connect::new(self.client_id.clone());
                connect.keep_alive = self.keep_alive;
                connect.clean_session = self.clean_start;
                connect.username = self.username.clone();
                connect.password = self.password.clone();
                connect.will = self.will.as_ref().map(|w| {
                    mqttv3::connect::Will::new(
                        w.topic.clone(),
                        w.message.clone(),
                        w.qos,
                        w.retain,
                    )
                });
                ControlPacket::Connect3(connect)
            }
        }
    }
}
