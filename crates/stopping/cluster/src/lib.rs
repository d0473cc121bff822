//! Stopping Cluster - access to the pods backing algo instances
//!
//! The stopping service needs exactly four things from the cluster: list pods
//! (all of them, or those labelled with an instance id), and delete an
//! instance's service and pod. [`ClusterGateway`] captures that capability;
//! [`KubernetesGateway`] implements it over the Kubernetes REST API and
//! [`InMemoryCluster`] implements it for development and tests.

#![deny(unsafe_code)]

pub mod error;
pub mod gateway;
pub mod kubernetes;
pub mod memory;

pub use error::{ClusterError, ClusterResult};
pub use gateway::ClusterGateway;
pub use kubernetes::{KubernetesConfig, KubernetesGateway};
pub use memory::{DeleteCall, InMemoryCluster};
