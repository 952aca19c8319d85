//! HTTP client for the context broker NGSI v2 API.

use crate::client::{
    collect_pages, ClientError, FiwareClientConfig, HttpClient, Lookup, Page, PAGE_SIZE,
};
use crate::encoding::encode_path_segment;
use crate::entity::{ContextEntity, ServicePath};
use crate::ports::ContextBroker;
use reqwest::{Method, RequestBuilder};

/// Header carrying the total row count when `options=count` is requested.
const TOTAL_COUNT_HEADER: &str = "fiware-total-count";

/// Client for `/v2/entities`.
pub struct OrionClient {
    http: HttpClient,
}

impl OrionClient {
    /// Create a new context broker client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: FiwareClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    fn entity_page(&self, path: &ServicePath, offset: usize) -> RequestBuilder {
        self.http
            .request(Method::GET, "/v2/entities", path)
            .query(&[("limit", PAGE_SIZE), ("offset", offset)])
            .query(&[("options", "count")])
    }
}

impl ContextBroker for OrionClient {
    async fn get_entity(&self, path: &ServicePath, id: &str) -> Lookup<ContextEntity> {
        let url = format!("/v2/entities/{}", encode_path_segment(id));
        let request = self.http.request(Method::GET, &url, path);
        self.http.lookup(request).await
    }

    async fn delete_entity(&self, path: &ServicePath, id: &str) -> Result<(), ClientError> {
        let url = format!("/v2/entities/{}", encode_path_segment(id));
        let request = self.http.request(Method::DELETE, &url, path);
        self.http.send(request).await?;
        Ok(())
    }

    async fn list_entities(&self, path: &ServicePath) -> Result<Vec<ContextEntity>, ClientError> {
        collect_pages(|offset| async move {
            let response = self.http.send(self.entity_page(path, offset)).await?;
            let total = response
                .headers()
                .get(TOTAL_COUNT_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<usize>().ok());
            let items: Vec<ContextEntity> = response
                .json()
                .await
                .map_err(|e| ClientError::Parse(e.to_string()))?;

            // Without a count, stop after this page.
            let total = total.unwrap_or(offset + items.len());
            Ok(Page { items, total })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OrionClient::new(FiwareClientConfig {
            base_url: "http://localhost:1026".to_string(),
            ..Default::default()
        });
        assert!(client.is_ok());
    }

    #[test]
    fn entity_pages_request_a_count() {
        let client = OrionClient::new(FiwareClientConfig::default()).unwrap();

        let request = client
            .entity_page(&ServicePath::device("dev1"), 0)
            .build()
            .unwrap();

        assert_eq!(request.url().path(), "/v2/entities");
        assert_eq!(
            request.url().query(),
            Some("limit=1000&offset=0&options=count")
        );
        assert_eq!(request.headers()["fiware-servicepath"], "/device/dev1");
    }
}
