//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use stopping_types::{AlgoId, AuthToken, ClientId, InstanceId, InstanceRecord};
use tokio::sync::RwLock;

type RecordKey = (ClientId, InstanceId);

/// In-memory instance store for development and testing
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    records: Arc<RwLock<HashMap<RecordKey, InstanceRecord>>>,
    writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryInstanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records
    pub fn with_records(records: impl IntoIterator<Item = InstanceRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| ((r.client_id.clone(), r.instance_id.clone()), r))
            .collect();
        Self {
            records: Arc::new(RwLock::new(records)),
            ..Self::default()
        }
    }

    /// Snapshot of every record
    pub async fn records(&self) -> Vec<InstanceRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Number of `save` calls made so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Simulate an outage: every call fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Connection("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn get_expired_past_date(&self, now: DateTime<Utc>) -> StorageResult<Vec<InstanceRecord>> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn get_by_client_and_instance(
        &self,
        client_id: &ClientId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .get(&(client_id.clone(), instance_id.clone()))
            .cloned())
    }

    async fn get_by_algo_and_instance(
        &self,
        algo_id: &AlgoId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| &r.algo_id == algo_id && &r.instance_id == instance_id)
            .cloned())
    }

    async fn get_by_auth_token(&self, token: &AuthToken) -> StorageResult<Option<InstanceRecord>> {
        self.check_available()?;
        if token.is_empty() {
            return Ok(None);
        }
        let records = self.records.read().await;
        Ok(records.values().find(|r| &r.auth_token == token).cloned())
    }

    async fn save(&self, record: InstanceRecord) -> StorageResult<()> {
        self.check_available()?;
        let key = (record.client_id.clone(), record.instance_id.clone());
        self.records.write().await.insert(key, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stopping_types::InstanceStatus;

    fn record(client: &str, instance: &str, token: &str) -> InstanceRecord {
        InstanceRecord::started(client, instance, "A1", AuthToken::new(token))
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryInstanceStore::new();
        store.save(record("C1", "I1", "t1")).await.unwrap();

        let found = store
            .get_by_client_and_instance(&ClientId::new("C1"), &InstanceId::new("I1"))
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(store.write_count(), 1);

        let missing = store
            .get_by_client_and_instance(&ClientId::new("C2"), &InstanceId::new("I1"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_by_natural_key() {
        let store = InMemoryInstanceStore::with_records([record("C1", "I1", "t1")]);
        let mut updated = record("C1", "I1", "t1");
        updated.terminate(InstanceStatus::Stopped, Utc::now());
        store.save(updated).await.unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn test_expired_query_ignores_status() {
        let now = Utc::now();
        let mut stopped = record("C1", "I2", "t2").with_end_on_date(now - Duration::days(1));
        stopped.terminate(InstanceStatus::Stopped, now);
        let store = InMemoryInstanceStore::with_records([
            record("C1", "I1", "t1").with_end_on_date(now - Duration::days(1)),
            stopped,
            record("C1", "I3", "t3").with_end_on_date(now + Duration::days(1)),
            record("C1", "I4", "t4"),
        ]);

        let expired = store.get_expired_past_date(now).await.unwrap();
        assert_eq!(expired.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_by_algo_and_token() {
        let store = InMemoryInstanceStore::with_records([record("C1", "I1", "t1")]);

        let by_algo = store
            .get_by_algo_and_instance(&AlgoId::new("A1"), &InstanceId::new("I1"))
            .await
            .unwrap();
        assert!(by_algo.is_some());

        let by_token = store.get_by_auth_token(&AuthToken::new("t1")).await.unwrap();
        assert_eq!(by_token.unwrap().instance_id, InstanceId::new("I1"));

        let blank = store.get_by_auth_token(&AuthToken::default()).await.unwrap();
        assert!(blank.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = InMemoryInstanceStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get_expired_past_date(Utc::now()).await,
            Err(StorageError::Connection(_))
        ));
    }
}
