//! Cluster gateway trait

use crate::error::ClusterResult;
use async_trait::async_trait;
use stopping_types::{InstanceId, Pod};

/// Pod listing and deletion for algo instances
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// List pods. `None` lists every pod visible to the gateway; otherwise
    /// only pods labelled `app=<instance_id>`.
    async fn list_pods(&self, instance_id: Option<&InstanceId>) -> ClusterResult<Vec<Pod>>;

    /// Delete the instance's service (`pod-<id>`) and then its pod.
    ///
    /// Both deletes are always attempted. The result reflects the pod delete
    /// only; a pod that is already gone counts as deleted.
    async fn delete_pod_and_service(
        &self,
        instance_id: &InstanceId,
        namespace: &str,
    ) -> ClusterResult<()>;

    /// The first pod listed for an instance.
    ///
    /// One pod per instance is expected. Extra pods are reported and left
    /// alone.
    async fn find_pod(&self, instance_id: &InstanceId) -> ClusterResult<Option<Pod>> {
        let pods = self.list_pods(Some(instance_id)).await?;
        if pods.len() > 1 {
            tracing::warn!(
                instance_id = %instance_id,
                count = pods.len(),
                "Multiple pods found for instance, using the first"
            );
        }
        Ok(pods.into_iter().next())
    }
}
