//! Container termination classification

use crate::InstanceStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message sent to the user when an instance is killed for memory
pub const OUT_OF_RESOURCES_MESSAGE: &str = "Instance stopped because it ran out of resources";

/// Why a pod's only container exited
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Clean exit
    Completed,
    /// Killed by the kernel for exceeding its memory limit
    OomKilled,
    /// Any other reason reported by the runtime
    Other(String),
}

impl TerminationReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "Completed" => Self::Completed,
            "OOMKilled" => Self::OomKilled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Terminal record status for a pod that exited this way
    pub fn terminal_status(&self) -> InstanceStatus {
        match self {
            Self::Completed => InstanceStatus::Stopped,
            _ => InstanceStatus::Errored,
        }
    }

    /// Whether the user gets a dedicated log message about the exit
    pub fn requires_user_notice(&self) -> bool {
        matches!(self, Self::OomKilled)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("Completed"),
            Self::OomKilled => f.write_str("OOMKilled"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}
