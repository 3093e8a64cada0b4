//! Transport seam between the engine and the persistence endpoint.

use serde_json::Value;
use std::time::Duration;

use crate::error::TransportError;

/// Raw HTTP outcome handed back to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Issues requests on behalf of a [`crate::Page`].
///
/// The page runs on a single thread, so implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// POST `body` as JSON to `url`.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no response was received.
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError>;

    /// GET `url`, expecting JSON.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no response was received.
    async fn get_json(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with a request timeout.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidRequest`] if the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<TransportResponse, TransportError> {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(TransportResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read(response).await
    }

    async fn get_json(&self, url: &str) -> Result<TransportResponse, TransportError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read(response).await
    }
}
