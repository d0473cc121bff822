//! Recording notifier for development and testing

use super::{Notifier, NotifyResult};
use crate::error::NotifyError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stopping_types::{AuthToken, ClientId, InstanceId};
use tokio::sync::RwLock;

/// A notification as it was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Summary {
        client_id: ClientId,
        instance_id: InstanceId,
    },
    User {
        instance_id: InstanceId,
        message: String,
        auth_token: AuthToken,
    },
}

/// Notifier that keeps every call in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls but report them as failed
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    pub async fn summaries_for(&self, instance_id: &InstanceId) -> usize {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| matches!(n, Notification::Summary { instance_id: id, .. } if id == instance_id))
            .count()
    }

    pub async fn user_notices(&self) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| matches!(n, Notification::User { .. }))
            .cloned()
            .collect()
    }

    async fn push(&self, notification: Notification) -> NotifyResult<()> {
        self.sent.write().await.push(notification);
        if self.failing.load(Ordering::SeqCst) {
            Err(NotifyError::Api {
                status: 503,
                message: "notifier failing".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn update_summary(
        &self,
        client_id: &ClientId,
        instance_id: &InstanceId,
    ) -> NotifyResult<()> {
        self.push(Notification::Summary {
            client_id: client_id.clone(),
            instance_id: instance_id.clone(),
        })
        .await
    }

    async fn notify_user(
        &self,
        instance_id: &InstanceId,
        message: &str,
        auth_token: &AuthToken,
    ) -> NotifyResult<()> {
        self.push(Notification::User {
            instance_id: instance_id.clone(),
            message: message.to_string(),
            auth_token: auth_token.clone(),
        })
        .await
    }
}
