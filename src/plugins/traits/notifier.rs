use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::ProductRecord;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    pub message_id: String,
    pub recipient: String,
    pub sent_at: DateTime<Utc>,
}

/// Trait for implementing notification methods.
///
/// Callers pass only records that are in stock and carry a detail URL;
/// implementations decide what to send, not whether to send.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Send exactly one notification for the record. Failures are returned,
    /// never retried.
    async fn notify(&self, record: &ProductRecord) -> Result<NotificationResult>;

    /// Connect and authenticate without sending anything.
    async fn test_connection(&self) -> Result<bool>;
}
