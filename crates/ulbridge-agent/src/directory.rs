//! Device and sensor lifecycle against the registry, context broker and
//! transport.
//!
//! Operations over collections fan out concurrently and wait for every task.
//! Failures are collected into [`DirectoryError::Partial`]; side effects of
//! the tasks that succeeded are kept.

use crate::provisioning::ProvisioningService;
use crate::transport::{Transport, TransportError};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use ulbridge_adapter_fiware::mapping::{
    device_to_entity, entity_to_device, entity_to_sensor_schema, property_attribute,
    sensor_to_entity,
};
use ulbridge_adapter_fiware::{
    ClientError, ContextBroker, EntityType, Lookup, Registry, ServicePath,
};
use ulbridge_core::{wire_text, Device, DeviceRecord, SensorData, SensorSchema};
use ulbridge_proto::topics;

/// Device CRUD orchestration.
pub struct DeviceDirectory<R, C, T> {
    registry: Arc<R>,
    broker: C,
    transport: T,
    provisioning: ProvisioningService<R>,
}

impl<R, C, T> DeviceDirectory<R, C, T>
where
    R: Registry,
    C: ContextBroker,
    T: Transport,
{
    /// Create a directory over the given ports.
    pub fn new(registry: R, broker: C, transport: T) -> Self {
        let registry = Arc::new(registry);
        Self {
            provisioning: ProvisioningService::new(Arc::clone(&registry)),
            registry,
            broker,
            transport,
        }
    }

    /// Provisioning service sharing this directory's registry.
    pub fn provisioning(&self) -> &ProvisioningService<R> {
        &self.provisioning
    }

    /// Register a device unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be created, its sensor group cannot
    /// be provisioned, or its command topic cannot be subscribed.
    pub async fn add(&self, device: &Device) -> Result<(), DirectoryError> {
        let devices = ServicePath::devices();

        match self.registry.get_device(&devices, &device.id).await {
            Lookup::Found(_) => {
                tracing::debug!(device_id = %device.id, "Device already registered");
                return Ok(());
            }
            Lookup::Failed(err) => {
                // Any failure other than 404 counts as "exists".
                tracing::warn!(
                    device_id = %device.id,
                    error = %err,
                    "Device probe failed, assuming the device exists"
                );
                return Ok(());
            }
            Lookup::NotFound => {}
        }

        self.registry
            .create_devices(&devices, &[device_to_entity(device)])
            .await?;
        self.provisioning
            .ensure_namespace(
                &ServicePath::device(&device.id),
                &device.id,
                EntityType::Sensor,
            )
            .await?;
        self.transport
            .subscribe(&topics::device_command(&device.id))
            .await?;

        tracing::info!(device_id = %device.id, name = %device.name, "Device registered");
        Ok(())
    }

    /// Remove a device, its sensors, its sensor group and its context entities.
    ///
    /// Every step runs even when an earlier one failed; all failures are
    /// reported together.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Partial`] listing every failed step.
    pub async fn remove(&self, id: &str) -> Result<(), DirectoryError> {
        let devices = ServicePath::devices();
        let sensors = ServicePath::device(id);
        let mut failures: Vec<DirectoryError> = Vec::new();

        if let Err(err) = self.registry.delete_device(&devices, id).await {
            failures.push(err.into());
        }

        match self.registry.list_devices(&sensors).await {
            Ok(entities) => {
                let results = join_all(
                    entities
                        .iter()
                        .map(|entity| self.registry.delete_device(&sensors, &entity.device_id)),
                )
                .await;
                failures.extend(results.into_iter().filter_map(Result::err).map(Into::into));
            }
            Err(err) => failures.push(err.into()),
        }

        if let Err(err) = self.provisioning.remove_namespace(&sensors, id).await {
            failures.push(err.into());
        }

        match self.broker.get_entity(&devices, id).await {
            Lookup::Found(_) => {
                if let Err(err) = self.broker.delete_entity(&devices, id).await {
                    failures.push(err.into());
                }
            }
            Lookup::NotFound => {
                tracing::debug!(device_id = %id, "No context entity for device");
            }
            Lookup::Failed(err) => failures.push(err.into()),
        }

        match self.broker.list_entities(&sensors).await {
            Ok(entities) => {
                let results = join_all(
                    entities
                        .iter()
                        .map(|entity| self.broker.delete_entity(&sensors, &entity.id)),
                )
                .await;
                failures.extend(results.into_iter().filter_map(Result::err).map(Into::into));
            }
            Err(err) => failures.push(err.into()),
        }

        if !failures.is_empty() {
            tracing::warn!(device_id = %id, failed = failures.len(), "Device removal incomplete");
            return Err(DirectoryError::Partial(failures));
        }

        tracing::info!(device_id = %id, "Device removed");
        Ok(())
    }

    /// List every device with its sensors.
    ///
    /// # Errors
    ///
    /// Returns error if the devices cannot be listed, or
    /// [`DirectoryError::Partial`] if the sensors of some devices cannot.
    pub async fn list(&self) -> Result<Vec<DeviceRecord>, DirectoryError> {
        let entities = self.registry.list_devices(&ServicePath::devices()).await?;

        let results = join_all(entities.iter().map(|entity| async move {
            let device = entity_to_device(entity);
            let sensors = self
                .registry
                .list_devices(&ServicePath::device(&device.id))
                .await?;

            let schema = sensors
                .iter()
                .filter_map(|sensor| match entity_to_sensor_schema(sensor) {
                    Ok(schema) => Some(schema),
                    Err(err) => {
                        tracing::warn!(device_id = %device.id, error = %err, "Skipping sensor entity");
                        None
                    }
                })
                .collect();

            Ok::<_, DirectoryError>(DeviceRecord {
                id: device.id,
                name: device.name,
                schema,
            })
        }))
        .await;

        collect(results)
    }

    /// Provision the sensors of a device and listen to their commands.
    ///
    /// Sensors are created in one batch; the registry rejects the batch if
    /// any id is already registered, and existing sensors are left as they
    /// are.
    ///
    /// # Errors
    ///
    /// Returns error if the sensor group cannot be provisioned, any command
    /// topic cannot be subscribed, or the registry rejects the sensors.
    pub async fn update_schema(
        &self,
        id: &str,
        schema: &[SensorSchema],
    ) -> Result<(), DirectoryError> {
        if schema.is_empty() {
            return Ok(());
        }

        let sensors = ServicePath::device(id);
        self.provisioning
            .ensure_namespace(&sensors, id, EntityType::Sensor)
            .await?;

        let results = join_all(schema.iter().map(|sensor| async move {
            self.transport
                .subscribe(&topics::sensor_command(id, sensor.sensor_id))
                .await
                .map_err(DirectoryError::from)
        }))
        .await;
        collect(results)?;

        let entities: Vec<_> = schema.iter().map(|s| sensor_to_entity(id, s)).collect();

        self.registry.create_devices(&sensors, &entities).await?;

        tracing::info!(device_id = %id, sensors = entities.len(), "Schema updated");
        Ok(())
    }

    /// Publish sensor readings of a device.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Partial`] if any reading cannot be published.
    pub async fn publish_data(&self, id: &str, data: &[SensorData]) -> Result<(), DirectoryError> {
        let results = join_all(data.iter().map(|sample| async move {
            self.transport
                .publish(&topics::telemetry(id, sample.sensor_id), sample.wire_value())
                .await
                .map_err(DirectoryError::from)
        }))
        .await;

        collect(results)?;
        Ok(())
    }

    /// Update one property of a device and publish its new value.
    ///
    /// # Errors
    ///
    /// Returns error if `properties` does not hold exactly one entry, or if
    /// the registry update or the publish fails.
    pub async fn update_properties(
        &self,
        id: &str,
        properties: &Map<String, Value>,
    ) -> Result<(), DirectoryError> {
        let mut entries = properties.iter();
        let (Some((name, value)), None) = (entries.next(), entries.next()) else {
            return Err(DirectoryError::InvalidProperties(properties.len()));
        };

        self.registry
            .update_device(
                &ServicePath::devices(),
                id,
                &[property_attribute(name, value)],
            )
            .await?;
        self.transport
            .publish(&topics::property(id, name), wire_text(value))
            .await?;

        tracing::debug!(device_id = %id, property = %name, "Property updated");
        Ok(())
    }

    /// Subscribe again to the command topics of every registered device and
    /// sensor. Returns the number of topics subscribed.
    ///
    /// # Errors
    ///
    /// Returns error if the registry cannot be listed or any subscription
    /// fails.
    pub async fn restore_subscriptions(&self) -> Result<usize, DirectoryError> {
        let records = self.list().await?;

        let command_topics: Vec<String> = records
            .iter()
            .flat_map(|record| {
                std::iter::once(topics::device_command(&record.id)).chain(
                    record
                        .schema
                        .iter()
                        .map(|sensor| topics::sensor_command(&record.id, sensor.sensor_id)),
                )
            })
            .collect();

        let results = join_all(command_topics.iter().map(|topic| async move {
            self.transport
                .subscribe(topic)
                .await
                .map_err(DirectoryError::from)
        }))
        .await;
        collect(results)?;

        Ok(command_topics.len())
    }
}

/// Gather fan-out results, keeping every failure.
fn collect<T>(results: Vec<Result<T, DirectoryError>>) -> Result<Vec<T>, DirectoryError> {
    let mut values = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => failures.push(err),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(DirectoryError::Partial(failures))
    }
}

/// Errors for directory operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    /// Registry or context broker call failed
    #[error("registry error: {0}")]
    Registry(#[from] ClientError),
    /// Transport call failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Property update did not carry exactly one property
    #[error("expected exactly one property, got {0}")]
    InvalidProperties(usize),
    /// Some operations of a fan-out failed
    #[error("{} operation(s) failed: {}", .0.len(), summarize(.0))]
    Partial(Vec<DirectoryError>),
}

fn summarize(failures: &[DirectoryError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
