//! Shared HTTP plumbing for the FIWARE clients.

use crate::entity::ServicePath;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// FIWARE HTTP client configuration.
#[derive(Debug, Clone)]
pub struct FiwareClientConfig {
    /// Base URL of the service (e.g., <http://localhost:4041>)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Value of the `fiware-service` header
    pub service: String,
}

impl Default for FiwareClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4041".to_string(),
            timeout: Duration::from_secs(30),
            service: "knot".to_string(),
        }
    }
}

/// Outcome of a lookup by id.
///
/// `NotFound` is only produced for a 404 response; every other failure is
/// reported as `Failed` so callers decide how to treat it.
#[derive(Debug)]
pub enum Lookup<T> {
    /// The resource exists
    Found(T),
    /// The service answered 404
    NotFound,
    /// The lookup could not be completed
    Failed(ClientError),
}

pub(crate) struct HttpClient {
    client: Client,
    config: FiwareClientConfig,
}

impl HttpClient {
    pub(crate) fn new(config: FiwareClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if config.base_url.starts_with("https://") {
            builder = builder.use_rustls_tls();
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub(crate) fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Start a request scoped to `service_path`.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        service_path: &ServicePath,
    ) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url());

        tracing::debug!(%method, url, service_path = %service_path, "FIWARE request");

        self.client
            .request(method, url)
            .header("fiware-service", &self.config.service)
            .header("fiware-servicepath", service_path.as_str())
    }

    /// Send a request, turning non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Fetch a single resource, separating 404 from other failures.
    pub(crate) async fn lookup<T: DeserializeOwned>(&self, request: RequestBuilder) -> Lookup<T> {
        match self.send_json(request).await {
            Ok(found) => Lookup::Found(found),
            Err(ClientError::ApiError { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Lookup::NotFound
            }
            Err(err) => Lookup::Failed(err),
        }
    }
}

/// Rows requested per page from list endpoints.
pub(crate) const PAGE_SIZE: usize = 1000;

/// One page of a listing and the total number of rows behind it.
pub(crate) struct Page<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total: usize,
}

/// Fetch pages at increasing offsets until `total` rows were read or a page
/// comes back empty.
pub(crate) async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>, ClientError>>,
{
    let mut items = Vec::new();

    loop {
        let page = fetch(items.len()).await?;
        let fetched = page.items.len();
        items.extend(page.items);

        if fetched == 0 || items.len() >= page.total {
            return Ok(items);
        }
    }
}

/// Errors that can occur with the FIWARE clients.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),
    /// API returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
}
