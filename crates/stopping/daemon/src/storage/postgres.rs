//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::time::Duration;
use stopping_types::{AlgoId, AuthToken, ClientId, InstanceId, InstanceRecord, InstanceStatus};

const SELECT_COLUMNS: &str =
    "SELECT client_id, instance_id, algo_id, auth_token, status, end_on_date, stop_date FROM algo_instances";

/// PostgreSQL-backed instance store
#[derive(Debug, Clone)]
pub struct PostgresInstanceStore {
    pool: PgPool,
}

impl PostgresInstanceStore {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS algo_instances (
                client_id TEXT NOT NULL,
                instance_id TEXT NOT NULL,
                algo_id TEXT NOT NULL DEFAULT '',
                auth_token TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                end_on_date TIMESTAMPTZ,
                stop_date TIMESTAMPTZ,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (client_id, instance_id)
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS algo_instances_algo_instance ON algo_instances(algo_id, instance_id);"#,
            r#"CREATE INDEX IF NOT EXISTS algo_instances_auth_token ON algo_instances(auth_token);"#,
            r#"CREATE INDEX IF NOT EXISTS algo_instances_end_on_date ON algo_instances(end_on_date);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn from_row(row: &PgRow) -> StorageResult<InstanceRecord> {
        let text = |column: &str| -> StorageResult<String> {
            row.try_get(column)
                .map_err(|e| StorageError::Query(e.to_string()))
        };
        let date = |column: &str| -> StorageResult<Option<DateTime<Utc>>> {
            row.try_get(column)
                .map_err(|e| StorageError::Query(e.to_string()))
        };

        Ok(InstanceRecord {
            client_id: ClientId::new(text("client_id")?),
            instance_id: InstanceId::new(text("instance_id")?),
            algo_id: AlgoId::new(text("algo_id")?),
            auth_token: AuthToken::new(text("auth_token")?),
            status: parse_status(&text("status")?)?,
            end_on_date: date("end_on_date")?,
            stop_date: date("stop_date")?,
        })
    }
}

fn parse_status(raw: &str) -> StorageResult<InstanceStatus> {
    raw.parse()
        .map_err(|e: stopping_types::UnknownStatus| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl InstanceStore for PostgresInstanceStore {
    async fn get_expired_past_date(&self, now: DateTime<Utc>) -> StorageResult<Vec<InstanceRecord>> {
        let rows = sqlx::query(&format!(
            "{} WHERE end_on_date IS NOT NULL AND end_on_date <= $1 ORDER BY end_on_date",
            SELECT_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn get_by_client_and_instance(
        &self,
        client_id: &ClientId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>> {
        let row = sqlx::query(&format!(
            "{} WHERE client_id = $1 AND instance_id = $2",
            SELECT_COLUMNS
        ))
        .bind(client_id.as_str())
        .bind(instance_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn get_by_algo_and_instance(
        &self,
        algo_id: &AlgoId,
        instance_id: &InstanceId,
    ) -> StorageResult<Option<InstanceRecord>> {
        let row = sqlx::query(&format!(
            "{} WHERE algo_id = $1 AND instance_id = $2 LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(algo_id.as_str())
        .bind(instance_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn get_by_auth_token(&self, token: &AuthToken) -> StorageResult<Option<InstanceRecord>> {
        if token.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(&format!("{} WHERE auth_token = $1 LIMIT 1", SELECT_COLUMNS))
            .bind(token.expose())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn save(&self, record: InstanceRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO algo_instances
                (client_id, instance_id, algo_id, auth_token, status, end_on_date, stop_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (client_id, instance_id)
            DO UPDATE SET
                algo_id = EXCLUDED.algo_id,
                auth_token = EXCLUDED.auth_token,
                status = EXCLUDED.status,
                end_on_date = EXCLUDED.end_on_date,
                stop_date = EXCLUDED.stop_date,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.client_id.as_str())
        .bind(record.instance_id.as_str())
        .bind(record.algo_id.as_str())
        .bind(record.auth_token.expose())
        .bind(record.status.as_str())
        .bind(record.end_on_date)
        .bind(record.stop_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_column() {
        assert_eq!(parse_status("Started").unwrap(), InstanceStatus::Started);
        assert!(matches!(
            parse_status("started"),
            Err(StorageError::InvalidData(_))
        ));
    }
}
