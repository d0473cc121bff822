//! HTTP client for the stopping daemon

use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use stopping_types::{AuthToken, PodSummary};

/// HTTP client for one instance talking to the stopping daemon
pub struct StoppingClient {
    client: Client,
    base_url: String,
    token: AuthToken,
}

/// Health check response
#[derive(Debug, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Daemon status response
#[derive(Debug, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime: String,
    pub started_at: DateTime<Utc>,
    pub monitor_running: bool,
    pub check_interval_secs: u64,
    /// Counters of the most recent reconciliation pass
    pub last_pass: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

impl StoppingClient {
    /// Create a client authenticating with the instance's token
    pub fn new(endpoint: &str, token: AuthToken) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Check daemon health
    pub async fn health_check(&self) -> ClientResult<Health> {
        let response = self.client.get(self.url("/health")).send().await?;
        handle_response(response).await
    }

    /// Daemon status, including the last pass
    pub async fn status(&self) -> ClientResult<DaemonStatus> {
        let response = self.client.get(self.url("/api/v1/status")).send().await?;
        handle_response(response).await
    }

    /// Pods currently running for an instance
    pub async fn get_pods(&self, instance_id: &str) -> ClientResult<Vec<PodSummary>> {
        require("instance id", instance_id)?;
        let request = self
            .client
            .get(self.url("/api/v1/kubernetes/pods"))
            .query(&[("instance_id", instance_id)]);
        handle_response(self.send(request).await?).await
    }

    /// Stop an instance, letting the daemon find its namespace
    pub async fn delete_instance(&self, instance_id: &str) -> ClientResult<()> {
        require("instance id", instance_id)?;
        let request = self
            .client
            .delete(self.url("/api/v1/kubernetes/instances"))
            .query(&[("instance_id", instance_id)]);
        handle_empty(self.send(request).await?).await
    }

    /// Stop an instance in a known namespace
    pub async fn delete_instance_in_namespace(
        &self,
        instance_id: &str,
        namespace: &str,
    ) -> ClientResult<()> {
        require("instance id", instance_id)?;
        require("namespace", namespace)?;
        let request = self
            .client
            .delete(self.url("/api/v1/kubernetes/instances/namespaced"))
            .query(&[("instance_id", instance_id), ("namespace", namespace)]);
        handle_empty(self.send(request).await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<reqwest::Response> {
        Ok(request.bearer_auth(self.token.expose()).send().await?)
    }
}

fn require(what: &str, value: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(error_from(response).await)
    }
}

async fn handle_empty(response: reqwest::Response) -> ClientResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from(response).await)
    }
}

async fn error_from(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| text.clone());

    tracing::debug!(status = status.as_u16(), %message, "Daemon call failed");

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            code: body.map(|b| b.code).unwrap_or_default(),
            message,
        },
    }
}
