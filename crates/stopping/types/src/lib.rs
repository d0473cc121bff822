//! Stopping Types - Core types for the instance stopping service
//!
//! An algo instance lives in two places at once: a persisted record in the
//! instance store and a pod in the cluster. The stopping service keeps the
//! two in agreement once an instance expires or its pod dies.
//!
//! ## Key Concepts
//!
//! - **InstanceRecord**: Authoritative lifecycle record of an instance
//! - **StoppingCandidate**: The `(client, instance)` pair a stop is driven by
//! - **Pod**: Typed view of the cluster's pod object (only what we read)
//! - **PodIdentity**: Instance and algo ids decoded from pod metadata
//! - **TerminationReason**: Why a pod's container exited, and what that means
//!   for the record's terminal status

#![deny(unsafe_code)]

pub mod decode;
pub mod ids;
pub mod instance;
pub mod pod;
pub mod termination;

// Re-export main types
pub use decode::{decode_pod_identity, DecodeError, PodIdentity, INSTANCE_PARAMETERS_ENV};
pub use ids::{AlgoId, AuthToken, ClientId, InstanceId};
pub use instance::{InstanceRecord, InstanceStatus, StoppingCandidate, UnknownStatus};
pub use pod::{
    service_name_for, Container, ContainerState, ContainerStatus, EnvVar, Pod, PodList, PodMeta,
    PodSpec, PodStatus, PodSummary, TerminatedState, APP_LABEL,
};
pub use termination::{TerminationReason, OUT_OF_RESOURCES_MESSAGE};
