//! Pinecone vector index client.
//!
//! Queries go to the index's data-plane host. The host is either configured
//! directly or resolved once through the control plane and kept for the life
//! of the client.

use super::{ProviderError, QueryRequest, VectorIndex};
use crate::models::Match;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

/// Pinecone client configuration.
#[derive(Debug, Clone)]
pub struct PineconeIndexConfig {
    pub api_key: Secret<String>,
    pub index_name: String,
    pub index_host: Option<String>,
    pub controller_url: String,
}

/// Data-plane client for a single Pinecone index.
pub struct PineconeIndex {
    config: PineconeIndexConfig,
    client: Client,
    host: OnceCell<String>,
}

impl PineconeIndex {
    pub fn new(config: PineconeIndexConfig, client: Client) -> Self {
        let host = match config.index_host.as_deref() {
            Some(h) => OnceCell::new_with(Some(normalize_host(h))),
            None => OnceCell::new(),
        };

        Self {
            config,
            client,
            host,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", self.config.api_key.expose_secret())
            .header(API_VERSION_HEADER, API_VERSION)
    }

    /// Data-plane base URL, looked up on first use.
    async fn host(&self) -> Result<&str, ProviderError> {
        self.host
            .get_or_try_init(|| self.describe_index_host())
            .await
            .map(String::as_str)
    }

    async fn describe_index_host(&self) -> Result<String, ProviderError> {
        let url = format!(
            "{}/indexes/{}",
            self.config.controller_url.trim_end_matches('/'),
            self.config.index_name
        );

        tracing::info!(index = %self.config.index_name, "Resolving Pinecone index host");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let description: IndexDescription = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse index description: {}", e))
            })?;

        if description.host.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "Index '{}' has no host",
                self.config.index_name
            )));
        }

        Ok(normalize_host(&description.host))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>, ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Pinecone API key not configured".to_string(),
            ));
        }

        let host = self.host().await?;
        let body = QueryBody {
            vector: &request.vector,
            top_k: request.top_k,
            namespace: &request.namespace,
            include_metadata: true,
            include_values: false,
        };

        tracing::debug!(
            top_k = request.top_k,
            namespace = %request.namespace,
            dimensions = request.vector.len(),
            "Querying Pinecone index"
        );

        let response = self
            .authorized(self.client.post(format!("{}/query", host)))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let result: QueryResponse = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse query response: {}", e)))?;

        Ok(result.matches)
    }
}

/// Hosts from the control plane come without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn error_for_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited);
    }

    Err(ProviderError::ApiError(format!(
        "Pinecone API error {}: {}",
        status, error_text
    )))
}

// ============================================================================
// Pinecone API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: u32,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    #[serde(default)]
    host: String,
}
