//! Kubernetes REST gateway
//!
//! Talks to the core/v1 API directly over `reqwest`. Only the four calls the
//! stopping service needs are implemented.

use crate::error::{ClusterError, ClusterResult};
use crate::gateway::ClusterGateway;
use async_trait::async_trait;
use reqwest::{Certificate, Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stopping_types::{service_name_for, InstanceId, Pod, PodList, APP_LABEL};

/// Connection settings for a Kubernetes API server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesConfig {
    /// API server base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token for the service account
    #[serde(default)]
    pub token: Option<String>,

    /// PEM bundle to trust in addition to the system roots
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Field selector applied to every pod listing, e.g.
    /// `metadata.namespace=algo-test`
    #[serde(default)]
    pub list_field_selector: Option<String>,
}

fn default_api_url() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            ca_cert_path: None,
            request_timeout_secs: default_request_timeout(),
            list_field_selector: None,
        }
    }
}

/// Cluster gateway backed by the Kubernetes REST API
#[derive(Debug, Clone)]
pub struct KubernetesGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
    field_selector: Option<String>,
}

impl KubernetesGateway {
    /// Build a gateway from configuration
    pub fn new(config: &KubernetesConfig) -> ClusterResult<Self> {
        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| ClusterError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;

        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                ClusterError::Config(format!("cannot read CA bundle {}: {}", path.display(), e))
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
            field_selector: config.list_field_selector.clone().filter(|s| !s.is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ClusterResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClusterError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn delete_service(&self, instance_id: &InstanceId, namespace: &str) -> ClusterResult<()> {
        let service = service_name_for(instance_id);
        let url = self.endpoint(&["api", "v1", "namespaces", namespace, "services", &service])?;
        let response = self.authorize(self.client.delete(url)).send().await?;
        check_status(response).await
    }

    async fn delete_pod(&self, instance_id: &InstanceId, namespace: &str) -> ClusterResult<()> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "namespaces",
            namespace,
            "pods",
            instance_id.as_str(),
        ])?;
        let body = serde_json::json!({
            "kind": "DeleteOptions",
            "apiVersion": "v1",
            "propagationPolicy": "Foreground",
        });
        let response = self
            .authorize(self.client.delete(url))
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> ClusterResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClusterError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ClusterGateway for KubernetesGateway {
    async fn list_pods(&self, instance_id: Option<&InstanceId>) -> ClusterResult<Vec<Pod>> {
        let url = self.endpoint(&["api", "v1", "pods"])?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = instance_id {
            query.push(("labelSelector", format!("{}={}", APP_LABEL, id)));
        }
        if let Some(selector) = &self.field_selector {
            query.push(("fieldSelector", selector.clone()));
        }

        let response = self
            .authorize(self.client.get(url))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClusterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let list: PodList = response.json().await?;
        Ok(list.items)
    }

    async fn delete_pod_and_service(
        &self,
        instance_id: &InstanceId,
        namespace: &str,
    ) -> ClusterResult<()> {
        match self.delete_service(instance_id, namespace).await {
            Ok(()) => {
                tracing::debug!(instance_id = %instance_id, namespace, "Service deleted");
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(instance_id = %instance_id, namespace, "Service already gone");
            }
            Err(e) => {
                tracing::warn!(
                    instance_id = %instance_id,
                    namespace,
                    error = %e,
                    "Failed to delete service"
                );
            }
        }

        match self.delete_pod(instance_id, namespace).await {
            Ok(()) => {
                tracing::info!(instance_id = %instance_id, namespace, "Pod deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(instance_id = %instance_id, namespace, "Pod already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Stub {
        calls: Arc<Mutex<Vec<String>>>,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
        pod_status: Arc<Mutex<Option<StatusCode>>>,
        service_status: Arc<Mutex<Option<StatusCode>>>,
    }

    async fn list(
        State(stub): State<Stub>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        stub.queries.lock().unwrap().push(query);
        Json(json!({
            "kind": "PodList",
            "items": [{
                "metadata": { "name": "I1", "namespace": "TESTNS", "labels": { "app": "I1" } },
                "status": { "phase": "Running" }
            }]
        }))
    }

    async fn delete_service(
        State(stub): State<Stub>,
        Path((ns, name)): Path<(String, String)>,
    ) -> StatusCode {
        stub.calls
            .lock()
            .unwrap()
            .push(format!("service {}/{}", ns, name));
        stub.service_status.lock().unwrap().unwrap_or(StatusCode::OK)
    }

    async fn delete_pod(
        State(stub): State<Stub>,
        Path((ns, name)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        stub.calls.lock().unwrap().push(format!("pod {}/{}", ns, name));
        stub.bodies.lock().unwrap().push(body);
        stub.pod_status.lock().unwrap().unwrap_or(StatusCode::OK)
    }

    async fn spawn_stub(stub: Stub) -> String {
        let app = Router::new()
            .route("/api/v1/pods", get(list))
            .route("/api/v1/namespaces/:ns/services/:name", delete(delete_service))
            .route("/api/v1/namespaces/:ns/pods/:name", delete(delete_pod))
            .with_state(stub);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn gateway(api_url: String, field_selector: Option<&str>) -> KubernetesGateway {
        KubernetesGateway::new(&KubernetesConfig {
            api_url,
            token: Some("sa-token".into()),
            list_field_selector: field_selector.map(str::to_string),
            request_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_pods_by_instance_label() {
        let stub = Stub::default();
        let gateway = gateway(
            spawn_stub(stub.clone()).await,
            Some("metadata.namespace=algo-test"),
        );

        let pods = gateway
            .list_pods(Some(&InstanceId::new("I1")))
            .await
            .unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].namespace(), "TESTNS");

        let queries = stub.queries.lock().unwrap();
        assert_eq!(queries[0].get("labelSelector").unwrap(), "app=I1");
        assert_eq!(
            queries[0].get("fieldSelector").unwrap(),
            "metadata.namespace=algo-test"
        );
    }

    #[tokio::test]
    async fn test_list_all_pods_has_no_label_selector() {
        let stub = Stub::default();
        let gateway = gateway(spawn_stub(stub.clone()).await, None);

        gateway.list_pods(None).await.unwrap();
        assert!(stub.queries.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn test_delete_hits_service_then_pod() {
        let stub = Stub::default();
        let gateway = gateway(spawn_stub(stub.clone()).await, None);

        gateway
            .delete_pod_and_service(&InstanceId::new("I1"), "TESTNS")
            .await
            .unwrap();

        assert_eq!(
            *stub.calls.lock().unwrap(),
            vec!["service TESTNS/pod-I1".to_string(), "pod TESTNS/I1".to_string()]
        );
        assert_eq!(
            stub.bodies.lock().unwrap()[0]["propagationPolicy"],
            "Foreground"
        );
    }

    #[tokio::test]
    async fn test_service_failure_does_not_fail_delete() {
        let stub = Stub::default();
        *stub.service_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
        let gateway = gateway(spawn_stub(stub.clone()).await, None);

        gateway
            .delete_pod_and_service(&InstanceId::new("I1"), "TESTNS")
            .await
            .unwrap();
        assert_eq!(stub.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_pod_counts_as_deleted() {
        let stub = Stub::default();
        *stub.pod_status.lock().unwrap() = Some(StatusCode::NOT_FOUND);
        let gateway = gateway(spawn_stub(stub.clone()).await, None);

        assert!(gateway
            .delete_pod_and_service(&InstanceId::new("I1"), "TESTNS")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_pod_delete_failure_is_reported() {
        let stub = Stub::default();
        *stub.pod_status.lock().unwrap() = Some(StatusCode::FORBIDDEN);
        let gateway = gateway(spawn_stub(stub.clone()).await, None);

        let err = gateway
            .delete_pod_and_service(&InstanceId::new("I1"), "TESTNS")
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Api { status: 403, .. }));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = KubernetesGateway::new(&KubernetesConfig {
            api_url: "not a url".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidUrl(_)));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let gateway = gateway("http://localhost:8001/proxy/".into(), None);
        let url = gateway.endpoint(&["api", "v1", "pods"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8001/proxy/api/v1/pods");
    }
}
