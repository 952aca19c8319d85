//! In-memory doubles of the registry, context broker and transport ports.

use crate::router::CommandHandler;
use crate::transport::{Transport, TransportError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use ulbridge_adapter_fiware::{
    AttributeDecl, ClientError, ContextBroker, ContextEntity, DeviceEntity, Lookup, Registry,
    ServiceGroup, ServicePath,
};
use ulbridge_core::{BridgeEvent, ConfigUpdated, DataRequested, DataUpdated, PropertiesUpdated};

/// Calls that reached a fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ServiceExists(String),
    CreateServices(String, Vec<String>),
    DeleteService(String, String),
    GetDevice(String, String),
    CreateDevices(String, Vec<String>),
    DeleteDevice(String, String),
    ListDevices(String),
    UpdateDevice(String, String, Vec<String>),
    GetEntity(String, String),
    DeleteEntity(String, String),
    ListEntities(String),
}

fn not_found() -> ClientError {
    ClientError::ApiError {
        status: 404,
        message: "not found".into(),
    }
}

#[derive(Default)]
struct RegistryState {
    services: HashMap<String, Vec<ServiceGroup>>,
    devices: BTreeMap<String, Vec<DeviceEntity>>,
    entities: BTreeMap<String, Vec<ContextEntity>>,
    failing_deletes: Vec<String>,
    probe_error: Option<ClientError>,
    calls: Vec<Call>,
}

/// Registry and context broker backed by maps keyed by service path.
#[derive(Clone, Default)]
pub struct FakeFiware {
    state: Arc<Mutex<RegistryState>>,
}

impl FakeFiware {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn devices(&self, path: &str) -> Vec<DeviceEntity> {
        self.state
            .lock()
            .unwrap()
            .devices
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn services(&self, path: &str) -> Vec<ServiceGroup> {
        self.state
            .lock()
            .unwrap()
            .services
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_device(&self, path: &str, entity: DeviceEntity) {
        self.state
            .lock()
            .unwrap()
            .devices
            .entry(path.to_string())
            .or_default()
            .push(entity);
    }

    pub fn seed_entity(&self, path: &str, id: &str, kind: &str) {
        self.state
            .lock()
            .unwrap()
            .entities
            .entry(path.to_string())
            .or_default()
            .push(ContextEntity {
                id: id.to_string(),
                kind: kind.to_string(),
                attributes: serde_json::Map::new(),
            });
    }

    /// Make deletes of `id` fail (registry and broker alike).
    pub fn fail_delete(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .push(id.to_string());
    }

    /// Make device probes fail with `err`.
    pub fn fail_probe(&self, err: ClientError) {
        self.state.lock().unwrap().probe_error = Some(err);
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Registry for FakeFiware {
    async fn service_exists(&self, path: &ServicePath) -> Result<bool, ClientError> {
        self.record(Call::ServiceExists(path.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state
            .services
            .get(path.as_str())
            .is_some_and(|groups| !groups.is_empty()))
    }

    async fn create_services(
        &self,
        path: &ServicePath,
        services: &[ServiceGroup],
    ) -> Result<(), ClientError> {
        self.record(Call::CreateServices(
            path.to_string(),
            services.iter().map(|s| s.apikey.clone()).collect(),
        ));
        self.state
            .lock()
            .unwrap()
            .services
            .entry(path.to_string())
            .or_default()
            .extend_from_slice(services);
        Ok(())
    }

    async fn delete_service(&self, path: &ServicePath, apikey: &str) -> Result<(), ClientError> {
        self.record(Call::DeleteService(path.to_string(), apikey.to_string()));
        let mut state = self.state.lock().unwrap();
        if let Some(groups) = state.services.get_mut(path.as_str()) {
            groups.retain(|g| g.apikey != apikey);
        }
        Ok(())
    }

    async fn get_device(&self, path: &ServicePath, id: &str) -> Lookup<DeviceEntity> {
        self.record(Call::GetDevice(path.to_string(), id.to_string()));
        let state = self.state.lock().unwrap();
        if let Some(err) = &state.probe_error {
            return Lookup::Failed(err.clone());
        }
        state
            .devices
            .get(path.as_str())
            .and_then(|devices| devices.iter().find(|d| d.device_id == id))
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    async fn create_devices(
        &self,
        path: &ServicePath,
        devices: &[DeviceEntity],
    ) -> Result<(), ClientError> {
        self.record(Call::CreateDevices(
            path.to_string(),
            devices.iter().map(|d| d.device_id.clone()).collect(),
        ));
        let mut state = self.state.lock().unwrap();
        let registered = state.devices.entry(path.to_string()).or_default();
        if devices
            .iter()
            .any(|d| registered.iter().any(|r| r.device_id == d.device_id))
        {
            return Err(ClientError::ApiError {
                status: 409,
                message: "duplicated device".into(),
            });
        }
        registered.extend_from_slice(devices);
        Ok(())
    }

    async fn delete_device(&self, path: &ServicePath, id: &str) -> Result<(), ClientError> {
        self.record(Call::DeleteDevice(path.to_string(), id.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.iter().any(|f| f == id) {
            return Err(ClientError::Request(format!("refused to delete {id}")));
        }
        let devices = state.devices.get_mut(path.as_str()).ok_or_else(not_found)?;
        let before = devices.len();
        devices.retain(|d| d.device_id != id);
        if devices.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn list_devices(&self, path: &ServicePath) -> Result<Vec<DeviceEntity>, ClientError> {
        self.record(Call::ListDevices(path.to_string()));
        Ok(self.devices(path.as_str()))
    }

    async fn update_device(
        &self,
        path: &ServicePath,
        id: &str,
        attributes: &[AttributeDecl],
    ) -> Result<(), ClientError> {
        self.record(Call::UpdateDevice(
            path.to_string(),
            id.to_string(),
            attributes
                .iter()
                .map(|a| format!("{}:{}", a.name, a.kind))
                .collect(),
        ));
        Ok(())
    }
}

impl ContextBroker for FakeFiware {
    async fn get_entity(&self, path: &ServicePath, id: &str) -> Lookup<ContextEntity> {
        self.record(Call::GetEntity(path.to_string(), id.to_string()));
        let state = self.state.lock().unwrap();
        state
            .entities
            .get(path.as_str())
            .and_then(|entities| entities.iter().find(|e| e.id == id))
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    async fn delete_entity(&self, path: &ServicePath, id: &str) -> Result<(), ClientError> {
        self.record(Call::DeleteEntity(path.to_string(), id.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_deletes.iter().any(|f| f == id) {
            return Err(ClientError::Request(format!("refused to delete {id}")));
        }
        if let Some(entities) = state.entities.get_mut(path.as_str()) {
            entities.retain(|e| e.id != id);
        }
        Ok(())
    }

    async fn list_entities(&self, path: &ServicePath) -> Result<Vec<ContextEntity>, ClientError> {
        self.record(Call::ListEntities(path.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state.entities.get(path.as_str()).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct TransportLog {
    published: Vec<(String, String)>,
    subscribed: Vec<String>,
}

/// Transport recording publishes and subscriptions.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<TransportLog>>,
    failing: bool,
}

impl RecordingTransport {
    /// A transport whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().published.clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.log.lock().unwrap().subscribed.clone()
    }
}

impl Transport for RecordingTransport {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        if self.failing {
            return Err(TransportError::Publish("broker gone".into()));
        }
        self.log
            .lock()
            .unwrap()
            .published
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        if self.failing {
            return Err(TransportError::Subscribe("broker gone".into()));
        }
        self.log.lock().unwrap().subscribed.push(topic.to_string());
        Ok(())
    }
}

/// Handler recording every event.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: BridgeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl CommandHandler for RecordingHandler {
    fn on_config_updated(&self, event: ConfigUpdated) {
        self.push(BridgeEvent::ConfigUpdated(event));
    }

    fn on_properties_updated(&self, event: PropertiesUpdated) {
        self.push(BridgeEvent::PropertiesUpdated(event));
    }

    fn on_data_requested(&self, event: DataRequested) {
        self.push(BridgeEvent::DataRequested(event));
    }

    fn on_data_updated(&self, event: DataUpdated) {
        self.push(BridgeEvent::DataUpdated(event));
    }
}
