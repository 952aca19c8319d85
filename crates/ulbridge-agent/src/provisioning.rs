//! Service group provisioning.
//!
//! A service group must exist under a service path before the IoT agent
//! accepts entities there. The device group lives under `/device` with the
//! `default` apikey; each device gets a sensor group under `/device/{id}`
//! keyed by its own id.

use std::sync::Arc;
use ulbridge_adapter_fiware::entity::UL_RESOURCE;
use ulbridge_adapter_fiware::{
    AttributeDecl, ClientError, EntityType, Registry, ServiceGroup, ServicePath,
};

/// Commands devices accept.
pub const DEVICE_COMMANDS: [&str; 2] = ["setConfig", "setProperties"];

/// Commands sensors accept.
pub const SENSOR_COMMANDS: [&str; 2] = ["setData", "getData"];

/// Attribute sensors report.
pub const SENSOR_ATTRIBUTE: &str = "value";

/// Build the service group for `entity_type`.
#[must_use]
pub fn service_group(apikey: &str, entity_type: EntityType) -> ServiceGroup {
    let (attributes, commands) = match entity_type {
        EntityType::Device => (Vec::new(), DEVICE_COMMANDS.as_slice()),
        EntityType::Sensor => (
            vec![AttributeDecl::new(SENSOR_ATTRIBUTE, "string")],
            SENSOR_COMMANDS.as_slice(),
        ),
    };

    ServiceGroup {
        apikey: apikey.to_string(),
        entity_type,
        resource: UL_RESOURCE.to_string(),
        attributes,
        commands: commands.iter().map(|c| AttributeDecl::command(c)).collect(),
    }
}

/// Idempotent creation of service groups.
pub struct ProvisioningService<R> {
    registry: Arc<R>,
}

impl<R: Registry> ProvisioningService<R> {
    /// Create a provisioning service over `registry`.
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Make sure a service group exists under `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the registry cannot be queried or the group cannot be
    /// created.
    pub async fn ensure_namespace(
        &self,
        path: &ServicePath,
        apikey: &str,
        entity_type: EntityType,
    ) -> Result<(), ClientError> {
        if self.registry.service_exists(path).await? {
            tracing::debug!(service_path = %path, apikey, "Service group already provisioned");
            return Ok(());
        }

        let group = service_group(apikey, entity_type);
        self.registry.create_services(path, &[group]).await?;

        tracing::info!(service_path = %path, apikey, %entity_type, "Provisioned service group");
        Ok(())
    }

    /// Remove the service group keyed by `apikey` under `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the registry rejects the deletion.
    pub async fn remove_namespace(&self, path: &ServicePath, apikey: &str) -> Result<(), ClientError> {
        self.registry.delete_service(path, apikey).await?;
        tracing::info!(service_path = %path, apikey, "Removed service group");
        Ok(())
    }
}
