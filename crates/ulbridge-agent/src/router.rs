//! Command routing from the transport to the event handler.
//!
//! Every recognized command is acknowledged on `<topic>exe` before the
//! handler runs, including `setConfig` commands that fail validation.
//! Payloads that do not parse to a known command are dropped.

use crate::transport::Transport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use ulbridge_core::{
    BridgeEvent, ConfigUpdated, ConfigValue, DataRequested, DataUpdated, PropertiesUpdated,
    UlValue,
};
use ulbridge_proto::{parse_message, topics, Command, InboundMessage};

/// Attributes a `setConfig` command must carry.
pub const REQUIRED_CONFIG_KEYS: [&str; 3] = ["sensor_id", "event_flags", "time_sec"];

const MISSING_CONFIG_MESSAGE: &str =
    "The following properties are required: sensor_id, event_flags and time_sec";

/// Receiver of the commands addressed to devices.
///
/// One handler is fixed when the bridge is built. Every method defaults to
/// doing nothing, so implementors only override the events they care about.
/// Handlers run on the routing task and should hand slow work off.
pub trait CommandHandler: Send + Sync {
    /// A `setConfig` command passed validation.
    fn on_config_updated(&self, _event: ConfigUpdated) {}

    /// A `setProperties` command arrived.
    fn on_properties_updated(&self, _event: PropertiesUpdated) {}

    /// A `getData` command arrived.
    fn on_data_requested(&self, _event: DataRequested) {}

    /// A `setData` command arrived.
    fn on_data_updated(&self, _event: DataUpdated) {}
}

/// Handler ignoring every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl CommandHandler for NoopHandler {}

/// Handler forwarding every event to a channel.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl ChannelHandler {
    /// Create the handler and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: BridgeEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Event receiver dropped, discarding event");
        }
    }
}

impl CommandHandler for ChannelHandler {
    fn on_config_updated(&self, event: ConfigUpdated) {
        self.forward(BridgeEvent::ConfigUpdated(event));
    }

    fn on_properties_updated(&self, event: PropertiesUpdated) {
        self.forward(BridgeEvent::PropertiesUpdated(event));
    }

    fn on_data_requested(&self, event: DataRequested) {
        self.forward(BridgeEvent::DataRequested(event));
    }

    fn on_data_updated(&self, event: DataUpdated) {
        self.forward(BridgeEvent::DataUpdated(event));
    }
}

/// Dispatches inbound UL commands.
pub struct CommandRouter<T, H> {
    transport: T,
    handler: Arc<H>,
}

impl<T: Transport, H: CommandHandler> CommandRouter<T, H> {
    /// Create a router acknowledging through `transport`.
    pub fn new(transport: T, handler: Arc<H>) -> Self {
        Self { transport, handler }
    }

    /// Handle one message received on `topic`.
    pub async fn route(&self, topic: &str, payload: &str) {
        let message = parse_message(topic, payload);

        match message.command {
            Command::SetData | Command::GetData => self.handle_data(topic, payload, message).await,
            Command::SetConfig => self.handle_config(topic, message).await,
            Command::SetProperties => self.handle_properties(topic, message).await,
            Command::Unknown(ref name) => {
                tracing::debug!(topic, command = %name, "Dropping unroutable message");
            }
        }
    }

    async fn handle_data(&self, topic: &str, payload: &str, message: InboundMessage) {
        self.acknowledge(topic, payload.to_string()).await;

        let Ok(sensor_id) = message.entity_id.parse::<u32>() else {
            tracing::warn!(
                topic,
                entity_id = %message.entity_id,
                command = %message.command,
                "Data command does not address a sensor"
            );
            return;
        };

        if message.command == Command::SetData {
            self.handler.on_data_updated(DataUpdated {
                id: message.id,
                sensor_id,
                data: message.value,
            });
        } else {
            self.handler.on_data_requested(DataRequested {
                id: message.id,
                sensor_id,
            });
        }
    }

    async fn handle_config(&self, topic: &str, message: InboundMessage) {
        let Some(config) = validate_config(&message.value) else {
            tracing::warn!(topic, id = %message.id, "Rejecting incomplete setConfig");
            self.acknowledge(
                topic,
                format!("{}@{}|{MISSING_CONFIG_MESSAGE}", message.id, Command::SetConfig),
            )
            .await;
            return;
        };

        self.acknowledge(topic, format!("{}@{}|", message.id, Command::SetConfig))
            .await;
        self.handler.on_config_updated(ConfigUpdated {
            id: message.id,
            config: vec![config],
        });
    }

    async fn handle_properties(&self, topic: &str, message: InboundMessage) {
        self.acknowledge(topic, format!("{}@{}|", message.id, Command::SetProperties))
            .await;
        self.handler.on_properties_updated(PropertiesUpdated {
            id: message.id,
            properties: message.value,
        });
    }

    async fn acknowledge(&self, topic: &str, payload: String) {
        let ack_topic = topics::ack(topic);
        if let Err(err) = self.transport.publish(&ack_topic, payload).await {
            tracing::warn!(error = %err, topic = %ack_topic, "Failed to publish acknowledgment");
        }
    }
}

/// Check the required `setConfig` attributes and coerce integer values.
fn validate_config(value: &UlValue) -> Option<BTreeMap<String, ConfigValue>> {
    let map = value.as_map()?;

    if !REQUIRED_CONFIG_KEYS.iter().all(|key| map.contains_key(*key)) {
        return None;
    }

    Some(
        map.iter()
            .map(|(key, raw)| (key.clone(), ConfigValue::coerce(raw)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{RecordingHandler, RecordingTransport};

    fn router() -> (
        CommandRouter<RecordingTransport, RecordingHandler>,
        RecordingTransport,
        Arc<RecordingHandler>,
    ) {
        let transport = RecordingTransport::default();
        let handler = Arc::new(RecordingHandler::default());
        let router = CommandRouter::new(transport.clone(), Arc::clone(&handler));
        (router, transport, handler)
    }

    #[tokio::test]
    async fn set_config_is_coerced_and_acknowledged() {
        let (router, transport, handler) = router();

        router
            .route(
                "/default/dev1/cmd",
                "dev1@setConfig|sensor_id=3|event_flags=1|time_sec=60",
            )
            .await;

        assert_eq!(
            transport.published(),
            vec![("/default/dev1/cmdexe".to_string(), "default@setConfig|".to_string())]
        );

        let expected: BTreeMap<String, ConfigValue> = [
            ("event_flags".to_string(), ConfigValue::Integer(1)),
            ("sensor_id".to_string(), ConfigValue::Integer(3)),
            ("time_sec".to_string(), ConfigValue::Integer(60)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            handler.events(),
            vec![BridgeEvent::ConfigUpdated(ConfigUpdated {
                id: "default".into(),
                config: vec![expected],
            })]
        );
    }

    #[tokio::test]
    async fn set_config_keeps_text_values() {
        let (router, _transport, handler) = router();

        router
            .route(
                "/default/dev1/cmd",
                "dev1@setConfig|sensor_id=3|event_flags=1|time_sec=60|lower_limit=low",
            )
            .await;

        let BridgeEvent::ConfigUpdated(event) = &handler.events()[0] else {
            panic!("expected config event");
        };
        assert_eq!(
            event.config[0]["lower_limit"],
            ConfigValue::Text("low".into())
        );
    }

    #[tokio::test]
    async fn incomplete_set_config_is_rejected_in_band() {
        let (router, transport, handler) = router();

        router
            .route("/default/dev1/cmd", "dev1@setConfig|sensor_id=3|event_flags=1")
            .await;

        assert_eq!(
            transport.published(),
            vec![(
                "/default/dev1/cmdexe".to_string(),
                "default@setConfig|The following properties are required: sensor_id, event_flags and time_sec"
                    .to_string()
            )]
        );
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn scalar_set_config_is_rejected() {
        let (router, transport, handler) = router();

        router.route("/default/dev1/cmd", "dev1@setConfig|60").await;

        assert_eq!(transport.published().len(), 1);
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn set_data_echoes_payload_then_notifies() {
        let (router, transport, handler) = router();

        router.route("/dev1/2/cmd", "2@setData|25").await;

        assert_eq!(
            transport.published(),
            vec![("/dev1/2/cmdexe".to_string(), "2@setData|25".to_string())]
        );
        assert_eq!(
            handler.events(),
            vec![BridgeEvent::DataUpdated(DataUpdated {
                id: "dev1".into(),
                sensor_id: 2,
                data: UlValue::Scalar("25".into()),
            })]
        );
    }

    #[tokio::test]
    async fn get_data_requests_reading() {
        let (router, transport, handler) = router();

        router.route("/dev1/4/cmd", "4@getData|").await;

        assert_eq!(transport.published()[0].1, "4@getData|");
        assert_eq!(
            handler.events(),
            vec![BridgeEvent::DataRequested(DataRequested {
                id: "dev1".into(),
                sensor_id: 4,
            })]
        );
    }

    #[tokio::test]
    async fn data_command_without_sensor_is_acknowledged_only() {
        let (router, transport, handler) = router();

        router.route("/default/dev1/cmd", "dev1@setData|25").await;

        assert_eq!(transport.published().len(), 1);
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn set_properties_passes_value_through() {
        let (router, transport, handler) = router();

        router
            .route("/default/dev1/cmd", "dev1@setProperties|online=true")
            .await;

        assert_eq!(
            transport.published(),
            vec![(
                "/default/dev1/cmdexe".to_string(),
                "default@setProperties|".to_string()
            )]
        );
        let properties = [("online".to_string(), "true".to_string())]
            .into_iter()
            .collect();
        assert_eq!(
            handler.events(),
            vec![BridgeEvent::PropertiesUpdated(PropertiesUpdated {
                id: "default".into(),
                properties: UlValue::Map(properties),
            })]
        );
    }

    #[tokio::test]
    async fn unknown_and_malformed_messages_are_dropped() {
        let (router, transport, handler) = router();

        router.route("/default/dev1/cmd", "dev1@reboot|now").await;
        router.route("/default/dev1/cmd", "garbage").await;
        router.route("/default/dev1/cmd", "").await;

        assert!(transport.published().is_empty());
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn handler_runs_even_when_ack_fails() {
        let transport = RecordingTransport::failing();
        let handler = Arc::new(RecordingHandler::default());
        let router = CommandRouter::new(transport.clone(), Arc::clone(&handler));

        router.route("/dev1/1/cmd", "1@getData|").await;

        assert!(transport.published().is_empty());
        assert_eq!(handler.events().len(), 1);
    }

    /// Records how many acks were already published each time it runs.
    struct AckCountingHandler {
        transport: RecordingTransport,
        seen: std::sync::Mutex<Vec<usize>>,
    }

    impl AckCountingHandler {
        fn snapshot(&self) {
            let acks = self.transport.published().len();
            self.seen.lock().unwrap().push(acks);
        }
    }

    impl CommandHandler for AckCountingHandler {
        fn on_config_updated(&self, _event: ConfigUpdated) {
            self.snapshot();
        }

        fn on_properties_updated(&self, _event: PropertiesUpdated) {
            self.snapshot();
        }

        fn on_data_requested(&self, _event: DataRequested) {
            self.snapshot();
        }

        fn on_data_updated(&self, _event: DataUpdated) {
            self.snapshot();
        }
    }

    #[tokio::test]
    async fn ack_is_published_before_handler_runs() {
        let transport = RecordingTransport::default();
        let handler = Arc::new(AckCountingHandler {
            transport: transport.clone(),
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let router = CommandRouter::new(transport.clone(), Arc::clone(&handler));

        router
            .route(
                "/default/dev1/cmd",
                "dev1@setConfig|sensor_id=3|event_flags=1|time_sec=60",
            )
            .await;
        router
            .route("/default/dev1/cmd", "dev1@setProperties|online=true")
            .await;
        router.route("/dev1/2/cmd", "2@setData|25").await;
        router.route("/dev1/2/cmd", "2@getData|").await;

        assert_eq!(*handler.seen.lock().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(transport.published().len(), 4);
    }

    #[tokio::test]
    async fn channel_handler_forwards_events() {
        let transport = RecordingTransport::default();
        let (handler, mut rx) = ChannelHandler::new();
        let router = CommandRouter::new(transport, Arc::new(handler));

        router.route("/dev1/1/cmd", "1@getData|").await;

        assert_eq!(
            rx.recv().await,
            Some(BridgeEvent::DataRequested(DataRequested {
                id: "dev1".into(),
                sensor_id: 1,
            }))
        );
    }
}
