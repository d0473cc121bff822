//! Manual instance control
//!
//! On-demand versions of the loop's stop protocol, called from the REST
//! handlers. Validation failures and refused deletes become client errors.

use crate::error::{ApiError, ApiResult};
use crate::scheduler::Reconciler;
use std::sync::Arc;
use stopping_types::{InstanceId, InstanceRecord, PodSummary};

/// Manual list and delete operations
pub struct ManualControl {
    reconciler: Arc<Reconciler>,
}

impl ManualControl {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Pods labelled with an instance id
    pub async fn list_pods(&self, instance_id: &str) -> ApiResult<Vec<PodSummary>> {
        let instance_id = require_instance_id(instance_id)?;

        let pods = self
            .reconciler
            .cluster()
            .list_pods(Some(&instance_id))
            .await?;

        if pods.is_empty() {
            return Err(ApiError::NotFound(format!("no pods for instance {}", instance_id)));
        }

        Ok(pods.iter().map(|pod| pod.summary()).collect())
    }

    /// Delete an instance's pod, taking the namespace from the live pod
    pub async fn delete_instance(
        &self,
        caller: &InstanceRecord,
        instance_id: &str,
    ) -> ApiResult<()> {
        let instance_id = require_instance_id(instance_id)?;

        let pod = self
            .reconciler
            .cluster()
            .find_pod(&instance_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest("pod not found".into()))?;

        self.delete_and_mark(caller, &instance_id, pod.namespace())
            .await
    }

    /// Delete an instance's pod in an explicit namespace
    pub async fn delete_instance_in_namespace(
        &self,
        caller: &InstanceRecord,
        instance_id: &str,
        namespace: &str,
    ) -> ApiResult<()> {
        let instance_id = require_instance_id(instance_id)?;
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(ApiError::BadRequest("namespace is required".into()));
        }

        self.delete_and_mark(caller, &instance_id, namespace).await
    }

    async fn delete_and_mark(
        &self,
        caller: &InstanceRecord,
        instance_id: &InstanceId,
        namespace: &str,
    ) -> ApiResult<()> {
        self.reconciler
            .delete_instance(instance_id, namespace)
            .await
            .map_err(|_| ApiError::BadRequest("unsuccessful deletion".into()))?;

        tracing::info!(
            instance_id = %instance_id,
            namespace,
            caller = %caller.instance_id,
            "Instance deleted on request"
        );

        // The caller's own record is the one marked, as the token names it.
        if let Err(e) = self
            .reconciler
            .mark_stopped_and_notify(&caller.candidate())
            .await
        {
            tracing::warn!(
                client_id = %caller.client_id,
                instance_id = %caller.instance_id,
                error = %e,
                "Deleted instance but could not mark caller record as stopped"
            );
        }

        Ok(())
    }
}

fn require_instance_id(raw: &str) -> ApiResult<InstanceId> {
    let instance_id = InstanceId::new(raw.trim());
    if instance_id.is_empty() {
        Err(ApiError::BadRequest("instance id is required".into()))
    } else {
        Ok(instance_id)
    }
}
