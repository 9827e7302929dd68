//! MQTT broker session shared by the publish and subscribe commands.
//!
//! `rumqttc` splits a connection into an `AsyncClient` (request side) and an
//! `EventLoop` (network side). The event loop runs on its own task and turns
//! everything it sees into [`BrokerEvent`]s on a bounded channel; the command's
//! worker loop owns the [`BrokerSession`] and all state transitions.
//!
//! Delivery is at most once. Lines published while the broker is unreachable
//! are dropped, never queued for later.

use anyhow::{Context, Result, bail};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

/// Client identifier for `log-to-mqtt`
pub const PUBLISH_CLIENT_ID: &str = "direwolf-monitor-log";
/// Client identifier for `mqtt-to-terminal`
pub const SUBSCRIBE_CLIENT_ID: &str = "direwolf-monitor-terminal";

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "direwolf";
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Outstanding requests the client may queue for the event loop
const REQUEST_CAPACITY: usize = 64;
/// Broker events waiting for the worker loop
const EVENT_QUEUE_SIZE: usize = 256;
/// Pause after a network error before the event loop reconnects
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);
/// How long a publish waits for a reconnect before dropping the line
pub const PUBLISH_CONNECT_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub topic: String,
    pub keep_alive: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            client_id: PUBLISH_CLIENT_ID.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

impl BrokerConfig {
    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

/// Builder for [`BrokerConfig`]
pub struct BrokerConfigBuilder {
    config: BrokerConfig,
}

impl BrokerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BrokerConfig::default(),
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn credentials<S: Into<String>>(mut self, username: Option<S>, password: Option<S>) -> Self {
        self.config.username = username.map(Into::into);
        self.config.password = password.map(Into::into);
        self
    }

    pub fn client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    pub fn topic<S: Into<String>>(mut self, topic: S) -> Self {
        self.config.topic = topic.into();
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn build(self) -> BrokerConfig {
        self.config
    }
}

impl Default for BrokerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// The broker refused our credentials; terminal
    Failed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Something the network task observed
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Connected,
    Disconnected { reason: String },
    /// Credentials rejected; the network task has stopped
    Rejected { reason: String },
    Message { topic: String, payload: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    Dropped,
}

/// One broker connection, owned by a single worker loop
pub struct BrokerSession {
    config: BrokerConfig,
    client: AsyncClient,
    events: flume::Receiver<BrokerEvent>,
    state: SessionState,
    network_task: JoinHandle<()>,
}

impl BrokerSession {
    /// Start connecting. Returns immediately; progress arrives through [`Self::next_event`].
    pub fn connect(config: BrokerConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), REQUEST_CAPACITY);
        let (events_tx, events_rx) = flume::bounded(EVENT_QUEUE_SIZE);

        info!(
            "Connecting to MQTT broker at {}:{} as {}",
            config.host, config.port, config.client_id
        );
        metrics::gauge!("dwm.mqtt.connected").set(0.0);
        let network_task = tokio::spawn(run_event_loop(eventloop, events_tx));

        Self::from_parts(config, client, events_rx, network_task)
    }

    fn from_parts(
        config: BrokerConfig,
        client: AsyncClient,
        events: flume::Receiver<BrokerEvent>,
        network_task: JoinHandle<()>,
    ) -> Self {
        Self {
            config,
            client,
            events,
            state: SessionState::Connecting,
            network_task,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Wait for the next broker event and apply it to the session state.
    ///
    /// Safe to use as a `tokio::select!` branch. A credential rejection is
    /// returned as an error once the session has moved to `Failed`.
    pub async fn next_event(&mut self) -> Result<BrokerEvent> {
        let event = self
            .events
            .recv_async()
            .await
            .context("MQTT network task stopped")?;
        self.apply(&event);

        if let BrokerEvent::Rejected { reason } = &event {
            bail!(
                "MQTT broker {}:{} rejected the connection: {}",
                self.config.host,
                self.config.port,
                reason
            );
        }
        Ok(event)
    }

    fn apply(&mut self, event: &BrokerEvent) {
        let next = match event {
            BrokerEvent::Connected => SessionState::Connected,
            BrokerEvent::Disconnected { .. } => SessionState::Disconnected,
            BrokerEvent::Rejected { .. } => SessionState::Failed,
            BrokerEvent::Message { .. } => return,
        };
        if next == self.state {
            return;
        }

        match event {
            BrokerEvent::Connected => {
                info!("Connected to MQTT broker {}:{}", self.config.host, self.config.port)
            }
            BrokerEvent::Disconnected { reason } => {
                warn!("Lost connection to MQTT broker: {}", reason);
                metrics::counter!("dwm.mqtt.disconnects_total").increment(1);
            }
            BrokerEvent::Rejected { reason } => error!("MQTT broker rejected us: {}", reason),
            BrokerEvent::Message { .. } => {}
        }
        debug!("MQTT session {} -> {}", self.state, next);
        self.state = next;
        metrics::gauge!("dwm.mqtt.connected").set(if next == SessionState::Connected {
            1.0
        } else {
            0.0
        });
    }

    /// Subscribe to the configured topic. Needed after every (re)connect with a clean session.
    pub async fn subscribe(&self) -> Result<()> {
        self.client
            .subscribe(&self.config.topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.config.topic))?;
        info!("Subscribed to MQTT topic {}", self.config.topic);
        Ok(())
    }

    /// Publish one raw log line at most once.
    ///
    /// When the session is not connected the line waits briefly for the
    /// reconnect, then is dropped with a warning. Only a credential rejection
    /// or a dead network task is an error.
    pub async fn publish_line(&mut self, line: &str) -> Result<PublishOutcome> {
        if self.state != SessionState::Connected && !self.wait_for_connection().await? {
            warn!("MQTT broker not connected, dropping line: {}", line.trim_end());
            metrics::counter!("dwm.mqtt.lines_dropped_total").increment(1);
            return Ok(PublishOutcome::Dropped);
        }

        match self.client.try_publish(
            &self.config.topic,
            QoS::AtMostOnce,
            false,
            line.as_bytes().to_vec(),
        ) {
            Ok(()) => {
                metrics::counter!("dwm.mqtt.lines_published_total").increment(1);
                Ok(PublishOutcome::Published)
            }
            Err(e) => {
                warn!("Failed to queue MQTT publish, dropping line: {}", e);
                metrics::counter!("dwm.mqtt.lines_dropped_total").increment(1);
                Ok(PublishOutcome::Dropped)
            }
        }
    }

    async fn wait_for_connection(&mut self) -> Result<bool> {
        let deadline = Instant::now() + PUBLISH_CONNECT_WAIT;
        loop {
            match timeout_at(deadline, self.next_event()).await {
                Ok(Ok(BrokerEvent::Connected)) => return Ok(true),
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(false),
            }
        }
    }

    /// Send DISCONNECT so the broker does not wait out the keep-alive
    pub async fn disconnect(&mut self) {
        if self.state == SessionState::Connected
            && let Err(e) = self.client.disconnect().await
        {
            debug!("MQTT disconnect request failed: {}", e);
        }
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        self.network_task.abort();
    }
}

/// Drive the `rumqttc` event loop, reconnecting forever unless the broker
/// refuses our credentials or the session goes away.
async fn run_event_loop(mut eventloop: EventLoop, events: flume::Sender<BrokerEvent>) {
    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) if ack.code == ConnectReturnCode::Success => {
                BrokerEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                metrics::counter!("dwm.mqtt.messages_received_total").increment(1);
                BrokerEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => BrokerEvent::Disconnected {
                reason: "broker sent DISCONNECT".to_string(),
            },
            Ok(_) => continue,
            Err(ConnectionError::ConnectionRefused(
                code @ (ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized),
            )) => {
                let _ = events
                    .send_async(BrokerEvent::Rejected {
                        reason: format!("{:?}", code),
                    })
                    .await;
                return;
            }
            Err(e) => BrokerEvent::Disconnected {
                reason: e.to_string(),
            },
        };

        let pause = matches!(event, BrokerEvent::Disconnected { .. });
        if events.send_async(event).await.is_err() {
            debug!("MQTT session gone, stopping network task");
            return;
        }
        if pause {
            tokio::time::sleep(RECONNECT_PAUSE).await;
        }
    }
}
