//! Bridge façade: lifecycle plus device operations.

use crate::config::BridgeConfig;
use crate::directory::{DeviceDirectory, DirectoryError};
use crate::router::{CommandHandler, CommandRouter, NoopHandler};
use crate::transport::{MqttTransport, TransportError};
use rumqttc::EventLoop;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use ulbridge_adapter_fiware::{
    ClientError, EntityType, IotAgentClient, OrionClient, ServicePath,
};
use ulbridge_core::{Device, DeviceRecord, SensorData, SensorSchema};
use ulbridge_proto::DEFAULT_APIKEY;

type Directory = DeviceDirectory<IotAgentClient, OrionClient, MqttTransport>;

/// How long `stop` waits for the disconnect to be flushed.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Entry point for applications bridging UL devices to FIWARE.
///
/// Device operations are available once [`Bridge::start`] returned. A failed
/// start leaves the bridge stopped and can be retried; a stopped bridge can
/// be started again.
pub struct Bridge<H: CommandHandler = NoopHandler> {
    config: BridgeConfig,
    directory: Directory,
    transport: MqttTransport,
    eventloop: Option<EventLoop>,
    handler: Arc<H>,
    poll_task: Option<JoinHandle<()>>,
    router_task: Option<JoinHandle<()>>,
}

/// Clients and MQTT connection state for one run of the bridge.
fn connect_parts(
    config: &BridgeConfig,
) -> Result<(Directory, MqttTransport, EventLoop), BridgeError> {
    let (transport, eventloop) = MqttTransport::new(&config.mqtt)?;
    let registry = IotAgentClient::new(config.iota.clone())?;
    let broker = OrionClient::new(config.orion.clone())?;
    let directory = DeviceDirectory::new(registry, broker, transport.clone());

    Ok((directory, transport, eventloop))
}

impl<H: CommandHandler + 'static> Bridge<H> {
    /// Build the bridge. No connection is opened until [`Bridge::start`].
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid or an HTTP client cannot be
    /// built.
    pub fn new(config: BridgeConfig, handler: H) -> Result<Self, BridgeError> {
        let (directory, transport, eventloop) = connect_parts(&config)?;

        Ok(Self {
            directory,
            transport,
            eventloop: Some(eventloop),
            handler: Arc::new(handler),
            poll_task: None,
            router_task: None,
            config,
        })
    }

    /// Provision the device namespace, connect, restore subscriptions and
    /// start routing commands.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge is already running, provisioning fails,
    /// the broker handshake fails or times out, or subscriptions cannot be
    /// restored. The bridge stays stopped and `start` may be called again.
    pub async fn start(&mut self) -> Result<(), BridgeError> {
        if self.is_running() {
            return Err(BridgeError::AlreadyStarted);
        }
        let Some(eventloop) = self.eventloop.as_mut() else {
            return Err(BridgeError::AlreadyStarted);
        };

        self.directory
            .provisioning()
            .ensure_namespace(&ServicePath::devices(), DEFAULT_APIKEY, EntityType::Device)
            .await?;

        // A failed handshake leaves the event loop usable for the next attempt.
        MqttTransport::connect(eventloop, self.config.mqtt.connect_timeout).await?;

        let Some(eventloop) = self.eventloop.take() else {
            return Err(BridgeError::AlreadyStarted);
        };
        let (mut messages, poll_task) = MqttTransport::start(eventloop);

        let restored = match self.directory.restore_subscriptions().await {
            Ok(restored) => restored,
            Err(err) => {
                poll_task.abort();
                self.reset()?;
                return Err(err.into());
            }
        };
        tracing::info!(topics = restored, "Restored command subscriptions");

        let router = CommandRouter::new(self.transport.clone(), Arc::clone(&self.handler));
        self.router_task = Some(tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                router.route(&message.topic, &message.payload).await;
            }
            tracing::debug!("Command stream closed");
        }));
        self.poll_task = Some(poll_task);

        tracing::info!(broker = %self.config.mqtt.broker, "Bridge started");
        Ok(())
    }

    /// Stop routing commands and disconnect from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge is not running, the disconnect request
    /// cannot be queued, or the clients for the next start cannot be built.
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        let router = self.router_task.take().ok_or(BridgeError::NotStarted)?;
        router.abort();

        let disconnected = self.transport.disconnect().await;

        if let Some(mut poll) = self.poll_task.take() {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut poll).await.is_err() {
                tracing::warn!("Event loop did not stop after disconnect, aborting it");
                poll.abort();
            }
        }

        self.reset()?;
        disconnected?;

        tracing::info!("Bridge stopped");
        Ok(())
    }

    /// Replace the connection state with a fresh, unconnected one.
    fn reset(&mut self) -> Result<(), BridgeError> {
        let (directory, transport, eventloop) = connect_parts(&self.config)?;
        self.directory = directory;
        self.transport = transport;
        self.eventloop = Some(eventloop);
        Ok(())
    }

    /// Whether [`Bridge::start`] completed and [`Bridge::stop`] was not called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.router_task.is_some()
    }

    /// Handler receiving command events.
    #[must_use]
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Register a device.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::add`].
    pub async fn add_device(&self, device: &Device) -> Result<(), BridgeError> {
        self.running()?.add(device).await.map_err(Into::into)
    }

    /// Remove a device and everything provisioned for it.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::remove`].
    pub async fn remove_device(&self, id: &str) -> Result<(), BridgeError> {
        self.running()?.remove(id).await.map_err(Into::into)
    }

    /// List devices with their sensors.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::list`].
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, BridgeError> {
        self.running()?.list().await.map_err(Into::into)
    }

    /// Publish sensor readings.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::publish_data`].
    pub async fn publish_data(&self, id: &str, data: &[SensorData]) -> Result<(), BridgeError> {
        self.running()?.publish_data(id, data).await.map_err(Into::into)
    }

    /// Provision the sensors of a device.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::update_schema`].
    pub async fn update_schema(
        &self,
        id: &str,
        schema: &[SensorSchema],
    ) -> Result<(), BridgeError> {
        self.running()?
            .update_schema(id, schema)
            .await
            .map_err(Into::into)
    }

    /// Update one property of a device.
    ///
    /// # Errors
    ///
    /// See [`DeviceDirectory::update_properties`].
    pub async fn update_properties(
        &self,
        id: &str,
        properties: &Map<String, Value>,
    ) -> Result<(), BridgeError> {
        self.running()?
            .update_properties(id, properties)
            .await
            .map_err(Into::into)
    }

    fn running(&self) -> Result<&Directory, BridgeError> {
        if self.is_running() {
            Ok(&self.directory)
        } else {
            Err(BridgeError::NotStarted)
        }
    }
}

impl<H: CommandHandler> Drop for Bridge<H> {
    fn drop(&mut self) {
        for task in [self.router_task.take(), self.poll_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

/// Errors for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Operation requires a started bridge
    #[error("bridge is not started")]
    NotStarted,
    /// `start` was called twice
    #[error("bridge already started")]
    AlreadyStarted,
    /// Transport setup or connection failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Registry or context broker failed
    #[error("registry error: {0}")]
    Registry(#[from] ClientError),
    /// Device operation failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
