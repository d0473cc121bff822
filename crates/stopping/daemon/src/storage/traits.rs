//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stopping_types::{AlgoId, AuthToken, ClientId, InstanceId, InstanceRecord};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage for instance records
///
/// Reads and writes are consistent per key; nothing spans more than one
/// record.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Records whose end date is at or before `now`, in any status
    async fn get_expired_past_date(&self, now: DateTime<Utc>) -> StorageResult<Vec<InstanceRecord>>;

    /// Get a record by its natural key
    async fn get_by_client_and_instance(
        &self,
        client_id: &ClientId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>>;

    /// Get a record by algo and instance id
    async fn get_by_algo_and_instance(
        &self,
        algo_id: &AlgoId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>>;

    /// Get the record an auth token was issued for
    async fn get_by_auth_token(&self, token: &AuthToken) -> StorageResult<Option<InstanceRecord>>;

    /// Create or replace a record
    async fn save(&self, record: InstanceRecord) -> StorageResult<()>;
}
