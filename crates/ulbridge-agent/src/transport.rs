//! MQTT transport shared by the router and the directory.

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, Publish, QoS};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Publish/subscribe operations the bridge needs from the transport.
pub trait Transport: Send + Sync {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to `topic`.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// MQTT connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>)
    pub broker: String,
    /// Client ID for MQTT connection
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Maximum time to wait for the broker handshake
    pub connect_timeout: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: format!("ulbridge-{}", uuid::Uuid::new_v4()),
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// A publish received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Topic the message arrived on
    pub topic: String,
    /// UTF-8 payload
    pub payload: String,
}

/// MQTT implementation of [`Transport`].
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Create the client and its event loop. Nothing is sent until the event
    /// loop is polled.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn new(config: &MqttConfig) -> Result<(Self, EventLoop), TransportError> {
        let (host, port) = parse_mqtt_url(&config.broker)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);
        // Subscriptions survive reconnects of the event loop.
        mqtt_options.set_clean_session(false);

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok((Self { client }, eventloop))
    }

    /// Drive the event loop until the broker accepts the connection.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails or `timeout` expires first.
    pub async fn connect(eventloop: &mut EventLoop, timeout: Duration) -> Result<(), TransportError> {
        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(TransportError::Connection(e.to_string())),
                }
            }
        };

        tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        tracing::info!("Connected to MQTT broker");
        Ok(())
    }

    /// Keep polling the event loop, forwarding every publish in arrival order.
    ///
    /// Polling runs on its own task and forwards over an unbounded channel, so
    /// it never waits on the consumer. The task ends once a requested
    /// disconnect has been sent or the receiver is dropped.
    #[must_use]
    pub fn start(
        mut eventloop: EventLoop,
    ) -> (mpsc::UnboundedReceiver<IncomingMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if !forward(&tx, &publish) {
                            tracing::warn!("Message receiver dropped, stopping transport");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Reconnected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::debug!("Subscription acknowledged");
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        tracing::info!("Disconnected from MQTT broker");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        (rx, task)
    }

    /// Disconnect from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))
    }
}

impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        tracing::debug!(topic, payload_len = payload.len(), "Publishing");

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        tracing::info!(topic, "Subscribing to command topic");

        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }
}

/// Hand a received publish to the consumer. Returns `false` once the
/// receiver is gone.
fn forward(tx: &mpsc::UnboundedSender<IncomingMessage>, publish: &Publish) -> bool {
    let message = IncomingMessage {
        topic: publish.topic.clone(),
        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
    };

    tracing::debug!(
        topic = %message.topic,
        payload_len = message.payload.len(),
        "Received MQTT message"
    );

    tx.send(message).is_ok()
}

/// Parse MQTT URL into host and port.
fn parse_mqtt_url(input: &str) -> Result<(String, u16), TransportError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| TransportError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(TransportError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TransportError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port.parse().map_err(|_| {
            TransportError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(TransportError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Invalid MQTT broker URL
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// Connection failed
    #[error("connection error: {0}")]
    Connection(String),
    /// Broker handshake did not complete in time
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
    /// Subscription failed
    #[error("subscription error: {0}")]
    Subscribe(String),
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
}
