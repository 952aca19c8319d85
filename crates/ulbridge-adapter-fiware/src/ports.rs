//! Ports the bridge needs from the registry and the context broker.
//!
//! The agent is generic over these traits; the HTTP clients of this crate are
//! the production implementations.

use crate::client::{ClientError, Lookup};
use crate::entity::{AttributeDecl, ContextEntity, DeviceEntity, ServiceGroup, ServicePath};
use std::future::Future;

/// Device registry (IoT agent).
pub trait Registry: Send + Sync {
    /// Whether any service group is provisioned under `path`.
    fn service_exists(
        &self,
        path: &ServicePath,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Provision service groups under `path`.
    fn create_services(
        &self,
        path: &ServicePath,
        services: &[ServiceGroup],
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Remove the service group with `apikey` under `path`.
    fn delete_service(
        &self,
        path: &ServicePath,
        apikey: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Fetch one device entity.
    fn get_device(
        &self,
        path: &ServicePath,
        id: &str,
    ) -> impl Future<Output = Lookup<DeviceEntity>> + Send;

    /// Provision device entities in a single call.
    fn create_devices(
        &self,
        path: &ServicePath,
        devices: &[DeviceEntity],
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Remove one device entity.
    fn delete_device(
        &self,
        path: &ServicePath,
        id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// List the device entities under `path`.
    fn list_devices(
        &self,
        path: &ServicePath,
    ) -> impl Future<Output = Result<Vec<DeviceEntity>, ClientError>> + Send;

    /// Declare attributes on an existing device entity.
    fn update_device(
        &self,
        path: &ServicePath,
        id: &str,
        attributes: &[AttributeDecl],
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Context broker.
pub trait ContextBroker: Send + Sync {
    /// Fetch one context entity.
    fn get_entity(
        &self,
        path: &ServicePath,
        id: &str,
    ) -> impl Future<Output = Lookup<ContextEntity>> + Send;

    /// Remove one context entity.
    fn delete_entity(
        &self,
        path: &ServicePath,
        id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// List the context entities under `path`.
    fn list_entities(
        &self,
        path: &ServicePath,
    ) -> impl Future<Output = Result<Vec<ContextEntity>, ClientError>> + Send;
}
