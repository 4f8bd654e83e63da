use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{RecipientId, Status, TrackingRecord},
    tracking::TrackingNumber,
    Result,
};

/// One inbound chat update.
///
/// `text` is `None` for updates that carry no text (stickers, joins, ...); they
/// still occupy an offset and must be acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub recipient_id: RecipientId,
    pub text: Option<String>,
    pub sequence_offset: i64,
}

/// Hexagonal port for the chat platform.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Updates with `sequence_offset >= offset` (all pending when `None`).
    ///
    /// Must not block waiting for new messages.
    async fn fetch_inbound(&self, offset: Option<i64>) -> Result<Vec<InboundMessage>>;

    /// Single delivery attempt; retries and timeouts belong to the caller.
    async fn deliver(&self, recipient: &RecipientId, html: &str) -> Result<()>;
}

/// Hexagonal port for durable tracking records.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Atomic idempotent insert. `Ok(false)` when the tracking number already exists.
    async fn insert(&self, record: &TrackingRecord) -> Result<bool>;

    /// Records for one recipient, most recently updated first.
    async fn list_by_recipient(&self, recipient: &RecipientId) -> Result<Vec<TrackingRecord>>;

    /// Every record, most recently updated first.
    async fn list_all(&self) -> Result<Vec<TrackingRecord>>;

    /// `Ok(false)` when the tracking number is not tracked.
    async fn update_status(
        &self,
        tracking_number: &TrackingNumber,
        status: &Status,
        detail: &str,
        last_updated: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete records whose `last_updated` is older than `max_age`.
    async fn purge_older_than(&self, max_age: Duration) -> Result<usize>;
}
