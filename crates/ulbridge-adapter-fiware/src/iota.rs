//! HTTP client for the IoT agent provisioning API.

use crate::client::{
    collect_pages, ClientError, FiwareClientConfig, HttpClient, Lookup, Page, PAGE_SIZE,
};
use crate::encoding::encode_path_segment;
use crate::entity::{AttributeDecl, DeviceEntity, ServiceGroup, ServicePath, UL_RESOURCE};
use crate::ports::Registry;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ServiceList {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    count: usize,
    #[serde(default)]
    devices: Vec<DeviceEntity>,
}

#[derive(Serialize)]
struct ServicesBody<'a> {
    services: &'a [ServiceGroup],
}

#[derive(Serialize)]
struct DevicesBody<'a> {
    devices: &'a [DeviceEntity],
}

#[derive(Serialize)]
struct AttributesBody<'a> {
    attributes: &'a [AttributeDecl],
}

/// Client for `/iot/services` and `/iot/devices`.
pub struct IotAgentClient {
    http: HttpClient,
}

impl IotAgentClient {
    /// Create a new IoT agent client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: FiwareClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    fn device_page(&self, path: &ServicePath, offset: usize) -> RequestBuilder {
        self.http
            .request(Method::GET, "/iot/devices", path)
            .query(&[("limit", PAGE_SIZE), ("offset", offset)])
    }
}

impl Registry for IotAgentClient {
    async fn service_exists(&self, path: &ServicePath) -> Result<bool, ClientError> {
        let request = self.http.request(Method::GET, "/iot/services", path);
        let list: ServiceList = self.http.send_json(request).await?;
        Ok(list.count > 0)
    }

    async fn create_services(
        &self,
        path: &ServicePath,
        services: &[ServiceGroup],
    ) -> Result<(), ClientError> {
        let request = self
            .http
            .request(Method::POST, "/iot/services", path)
            .json(&ServicesBody { services });
        self.http.send(request).await?;
        Ok(())
    }

    async fn delete_service(&self, path: &ServicePath, apikey: &str) -> Result<(), ClientError> {
        let request = self
            .http
            .request(Method::DELETE, "/iot/services", path)
            .query(&[("resource", UL_RESOURCE), ("apikey", apikey)]);
        self.http.send(request).await?;
        Ok(())
    }

    async fn get_device(&self, path: &ServicePath, id: &str) -> Lookup<DeviceEntity> {
        let url = format!("/iot/devices/{}", encode_path_segment(id));
        let request = self.http.request(Method::GET, &url, path);
        self.http.lookup(request).await
    }

    async fn create_devices(
        &self,
        path: &ServicePath,
        devices: &[DeviceEntity],
    ) -> Result<(), ClientError> {
        let request = self
            .http
            .request(Method::POST, "/iot/devices", path)
            .json(&DevicesBody { devices });
        self.http.send(request).await?;
        Ok(())
    }

    async fn delete_device(&self, path: &ServicePath, id: &str) -> Result<(), ClientError> {
        let url = format!("/iot/devices/{}", encode_path_segment(id));
        let request = self.http.request(Method::DELETE, &url, path);
        self.http.send(request).await?;
        Ok(())
    }

    async fn list_devices(&self, path: &ServicePath) -> Result<Vec<DeviceEntity>, ClientError> {
        collect_pages(|offset| async move {
            let list: DeviceList = self.http.send_json(self.device_page(path, offset)).await?;
            Ok(Page {
                items: list.devices,
                total: list.count,
            })
        })
        .await
    }

    async fn update_device(
        &self,
        path: &ServicePath,
        id: &str,
        attributes: &[AttributeDecl],
    ) -> Result<(), ClientError> {
        let url = format!("/iot/devices/{}", encode_path_segment(id));
        let request = self
            .http
            .request(Method::PUT, &url, path)
            .json(&AttributesBody { attributes });
        self.http.send(request).await?;
        Ok(())
    }
}
