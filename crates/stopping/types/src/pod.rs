//! Typed view of the cluster's pod object
//!
//! Only the fields this service reads are modelled. Unknown fields are
//! ignored on deserialize, so the full object returned by the cluster API
//! parses cleanly.

use crate::InstanceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the instance id on every instance pod
pub const APP_LABEL: &str = "app";

/// Name of the service object fronting an instance's pod
pub fn service_name_for(instance_id: &InstanceId) -> String {
    format!("pod-{}", instance_id)
}

/// A pod list response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: PodMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PodSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<TerminatedState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedState {
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub exit_code: i32,
}

impl Pod {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    pub fn container_statuses(&self) -> &[ContainerStatus] {
        self.status
            .as_ref()
            .map(|s| s.container_statuses.as_slice())
            .unwrap_or_default()
    }

    /// The termination state of a single-container pod whose container has
    /// exited. Pods with zero or several containers are never candidates.
    pub fn single_terminated_container(&self) -> Option<&TerminatedState> {
        match self.container_statuses() {
            [only] => only.state.terminated.as_ref(),
            _ => None,
        }
    }

    /// Looks up an environment variable across all containers
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.spec
            .iter()
            .flat_map(|spec| spec.containers.iter())
            .flat_map(|c| c.env.iter())
            .find(|var| var.name == name)
            .and_then(|var| var.value.as_deref())
    }

    pub fn summary(&self) -> PodSummary {
        PodSummary {
            name: self.metadata.name.clone(),
            namespace: self.metadata.namespace.clone(),
            phase: self.phase().map(str::to_string),
        }
    }
}

/// Condensed pod view returned by the manual list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
}
