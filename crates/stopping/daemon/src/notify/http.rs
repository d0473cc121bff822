//! HTTP notifier

use super::{Notifier, NotifyResult};
use crate::config::NotifierConfig;
use crate::error::NotifyError;
use crate::storage::InstanceStore;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use stopping_types::{AuthToken, ClientId, InstanceId};

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    client_id: &'a ClientId,
    instance_id: &'a InstanceId,
}

#[derive(Debug, Serialize)]
struct UserLogRequest<'a> {
    instance_id: &'a InstanceId,
    message: &'a str,
    date: chrono::DateTime<Utc>,
}

/// Notifier posting to the statistics and user log services
pub struct HttpNotifier {
    client: Client,
    statistics_url: Option<String>,
    logging_url: Option<String>,
    store: Arc<dyn InstanceStore>,
}

impl HttpNotifier {
    /// Create a notifier. The store is used to look up the instance token
    /// that authenticates statistics calls.
    pub fn new(config: &NotifierConfig, store: Arc<dyn InstanceStore>) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            statistics_url: normalize(config.statistics_url.as_deref()),
            logging_url: normalize(config.logging_url.as_deref()),
            store,
        })
    }
}

fn normalize(url: Option<&str>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
}

async fn check_status(response: Response) -> NotifyResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(NotifyError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn update_summary(
        &self,
        client_id: &ClientId,
        instance_id: &InstanceId,
    ) -> NotifyResult<()> {
        let Some(base) = &self.statistics_url else {
            tracing::debug!(instance_id = %instance_id, "Statistics URL not set, skipping summary update");
            return Ok(());
        };

        let record = self
            .store
            .get_by_client_and_instance(client_id, instance_id)
            .await?
            .ok_or_else(|| NotifyError::MissingRecord(instance_id.to_string()))?;

        let response = self
            .client
            .post(format!("{}/api/v1/statistics/summary", base))
            .bearer_auth(record.auth_token.expose())
            .json(&SummaryRequest {
                client_id,
                instance_id,
            })
            .send()
            .await?;
        check_status(response).await?;

        tracing::debug!(client_id = %client_id, instance_id = %instance_id, "Summary statistics updated");
        Ok(())
    }

    async fn notify_user(
        &self,
        instance_id: &InstanceId,
        message: &str,
        auth_token: &AuthToken,
    ) -> NotifyResult<()> {
        let Some(base) = &self.logging_url else {
            tracing::debug!(instance_id = %instance_id, "User log URL not set, skipping user notice");
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/api/v1/user-logs", base))
            .bearer_auth(auth_token.expose())
            .json(&UserLogRequest {
                instance_id,
                message,
                date: Utc::now(),
            })
            .send()
            .await?;
        check_status(response).await?;

        tracing::debug!(instance_id = %instance_id, "User notice delivered");
        Ok(())
    }
}
