//! Instance records and stopping candidates
//!
//! An InstanceRecord is the store's view of one algo instance. This service
//! only ever moves a record into a terminal status; creation and the
//! Deploying -> Started transitions happen upstream.

use crate::{AlgoId, AuthToken, ClientId, InstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instance lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceStatus {
    /// Deployment in progress
    Deploying,
    /// Pod is (believed to be) running
    Started,
    /// Stopped on expiry, on request, or after a clean exit
    Stopped,
    /// Pod terminated abnormally
    Errored,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploying => "Deploying",
            Self::Started => "Started",
            Self::Stopped => "Stopped",
            Self::Errored => "Errored",
        }
    }

    /// Stopped and Errored are terminal; a stop date goes with them
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Errored)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown instance status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for InstanceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Deploying" => Ok(Self::Deploying),
            "Started" => Ok(Self::Started),
            "Stopped" => Ok(Self::Stopped),
            "Errored" => Ok(Self::Errored),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Persisted lifecycle record of an algo instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Owning client
    pub client_id: ClientId,

    /// Instance identifier (natural key together with `client_id`)
    pub instance_id: InstanceId,

    /// Algo the instance runs (secondary lookup key)
    pub algo_id: AlgoId,

    /// Credential used for downstream notification calls
    pub auth_token: AuthToken,

    /// Current status
    pub status: InstanceStatus,

    /// Scheduled expiry; `None` means the instance never expires
    pub end_on_date: Option<DateTime<Utc>>,

    /// Set exactly when `status` is terminal
    pub stop_date: Option<DateTime<Utc>>,
}

impl InstanceRecord {
    /// Create a started record with no expiry
    pub fn started(
        client_id: impl Into<ClientId>,
        instance_id: impl Into<InstanceId>,
        algo_id: impl Into<AlgoId>,
        auth_token: AuthToken,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            instance_id: instance_id.into(),
            algo_id: algo_id.into(),
            auth_token,
            status: InstanceStatus::Started,
            end_on_date: None,
            stop_date: None,
        }
    }

    /// Builder-style expiry
    pub fn with_end_on_date(mut self, end_on_date: DateTime<Utc>) -> Self {
        self.end_on_date = Some(end_on_date);
        self
    }

    /// A record can only be stopped when every identity field and the auth
    /// token are present; anything less is a half-written record.
    pub fn is_complete(&self) -> bool {
        !self.instance_id.is_empty() && !self.algo_id.is_empty() && !self.auth_token.is_empty()
    }

    /// Whether the expiry date has passed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end_on_date.is_some_and(|end| end <= now)
    }

    /// Move the record into a terminal status.
    ///
    /// Status and stop date change together so the record never holds one
    /// without the other. A non-terminal target clears the stop date.
    pub fn terminate(&mut self, status: InstanceStatus, at: DateTime<Utc>) {
        self.status = status;
        self.stop_date = status.is_terminal().then_some(at);
    }

    /// The candidate key used to drive a stop
    pub fn candidate(&self) -> StoppingCandidate {
        StoppingCandidate {
            client_id: self.client_id.clone(),
            instance_id: self.instance_id.clone(),
        }
    }
}

/// The `(client, instance)` pair a stop is driven by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoppingCandidate {
    pub client_id: ClientId,
    pub instance_id: InstanceId,
}

impl StoppingCandidate {
    pub fn new(client_id: impl Into<ClientId>, instance_id: impl Into<InstanceId>) -> Self {
        Self {
            client_id: client_id.into(),
            instance_id: instance_id.into(),
        }
    }
}

impl From<&InstanceRecord> for StoppingCandidate {
    fn from(record: &InstanceRecord) -> Self {
        record.candidate()
    }
}
