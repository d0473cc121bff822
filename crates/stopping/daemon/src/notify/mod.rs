//! Downstream notifications
//!
//! Two best-effort channels: the statistics summary refresh after a status
//! change, and user-facing log lines. Callers log failures and move on.

mod http;
mod recording;

pub use http::HttpNotifier;
pub use recording::{Notification, RecordingNotifier};

use crate::error::NotifyError;
use async_trait::async_trait;
use stopping_types::{AuthToken, ClientId, InstanceId};

/// Result type for notification calls
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Delivery of instance status side effects
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the statistics service to recompute an instance's summary
    async fn update_summary(&self, client_id: &ClientId, instance_id: &InstanceId)
        -> NotifyResult<()>;

    /// Append a message to the user's instance log
    async fn notify_user(
        &self,
        instance_id: &InstanceId,
        message: &str,
        auth_token: &AuthToken,
    ) -> NotifyResult<()>;
}
