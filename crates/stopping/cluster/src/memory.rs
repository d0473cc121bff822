//! In-memory cluster for development and testing

use crate::error::{ClusterError, ClusterResult};
use crate::gateway::ClusterGateway;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use stopping_types::{InstanceId, Pod, APP_LABEL};
use tokio::sync::RwLock;

/// A recorded delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCall {
    pub instance_id: InstanceId,
    pub namespace: String,
}

/// Pods held in memory, with every delete recorded
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    pods: Arc<RwLock<Vec<Pod>>>,
    deletes: Arc<RwLock<Vec<DeleteCall>>>,
    failing_deletes: Arc<RwLock<HashSet<(InstanceId, String)>>>,
    fail_all_deletes: Arc<RwLock<bool>>,
    fail_listing: Arc<RwLock<bool>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pods(pods: Vec<Pod>) -> Self {
        Self {
            pods: Arc::new(RwLock::new(pods)),
            ..Self::default()
        }
    }

    pub async fn add_pod(&self, pod: Pod) {
        self.pods.write().await.push(pod);
    }

    pub async fn pods(&self) -> Vec<Pod> {
        self.pods.read().await.clone()
    }

    /// Every delete request received so far, in order
    pub async fn delete_calls(&self) -> Vec<DeleteCall> {
        self.deletes.read().await.clone()
    }

    /// Make deletes of one instance in one namespace fail
    pub async fn fail_deletes_for(&self, instance_id: &InstanceId, namespace: &str) {
        self.failing_deletes
            .write()
            .await
            .insert((instance_id.clone(), namespace.to_string()));
    }

    /// Make every delete fail
    pub async fn fail_all_deletes(&self, fail: bool) {
        *self.fail_all_deletes.write().await = fail;
    }

    /// Make pod listing fail
    pub async fn fail_listing(&self, fail: bool) {
        *self.fail_listing.write().await = fail;
    }
}

#[async_trait]
impl ClusterGateway for InMemoryCluster {
    async fn list_pods(&self, instance_id: Option<&InstanceId>) -> ClusterResult<Vec<Pod>> {
        if *self.fail_listing.read().await {
            return Err(ClusterError::Unavailable("pod listing disabled".into()));
        }

        let pods = self.pods.read().await;
        Ok(pods
            .iter()
            .filter(|pod| match instance_id {
                Some(id) => pod.label(APP_LABEL) == Some(id.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn delete_pod_and_service(
        &self,
        instance_id: &InstanceId,
        namespace: &str,
    ) -> ClusterResult<()> {
        self.deletes.write().await.push(DeleteCall {
            instance_id: instance_id.clone(),
            namespace: namespace.to_string(),
        });

        let key = (instance_id.clone(), namespace.to_string());
        if *self.fail_all_deletes.read().await || self.failing_deletes.read().await.contains(&key)
        {
            return Err(ClusterError::Unavailable(format!(
                "delete of {} in {} rejected",
                instance_id, namespace
            )));
        }

        self.pods
            .write()
            .await
            .retain(|pod| !(pod.name() == instance_id.as_str() && pod.namespace() == namespace));
        Ok(())
    }
}
