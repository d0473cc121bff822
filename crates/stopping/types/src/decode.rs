//! Pod identity decoding
//!
//! A pod only carries the instance id (its `app` label). The algo id rides
//! along inside the instance parameters blob that the deployer injects into
//! the container environment.

use crate::pod::APP_LABEL;
use crate::{AlgoId, InstanceId, Pod};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the JSON instance parameters
pub const INSTANCE_PARAMETERS_ENV: &str = "ALGO_INSTANCE_PARAMETERS";

/// Identity recovered from a pod's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentity {
    pub instance_id: InstanceId,
    pub algo_id: AlgoId,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("pod {pod} has no 'app' label")]
    MissingInstanceLabel { pod: String },

    #[error("pod {pod} has no ALGO_INSTANCE_PARAMETERS variable")]
    MissingParameters { pod: String },

    #[error("pod {pod} has malformed instance parameters: {reason}")]
    MalformedParameters { pod: String, reason: String },

    #[error("pod {pod} instance parameters carry no AlgoId")]
    MissingAlgoId { pod: String },
}

#[derive(Deserialize)]
struct InstanceParameters {
    #[serde(rename = "AlgoId", default)]
    algo_id: Option<String>,
}

/// Decode the instance and algo ids a pod was deployed for
pub fn decode_pod_identity(pod: &Pod) -> Result<PodIdentity, DecodeError> {
    let pod_name = || pod.name().to_string();

    let instance_id = pod
        .label(APP_LABEL)
        .map(InstanceId::new)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DecodeError::MissingInstanceLabel { pod: pod_name() })?;

    let raw = pod
        .env_value(INSTANCE_PARAMETERS_ENV)
        .ok_or_else(|| DecodeError::MissingParameters { pod: pod_name() })?;

    let params: InstanceParameters =
        serde_json::from_str(raw).map_err(|e| DecodeError::MalformedParameters {
            pod: pod_name(),
            reason: e.to_string(),
        })?;

    let algo_id = params
        .algo_id
        .map(AlgoId::new)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DecodeError::MissingAlgoId { pod: pod_name() })?;

    Ok(PodIdentity {
        instance_id,
        algo_id,
    })
}
