//! Operations behind the admin surface: cached listings and status updates.
//!
//! The HTTP layer is not part of this crate; it only needs to serialize the
//! returned views and map `Error` variants to responses.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    cache::FreshnessCache,
    clock::Clock,
    domain::{Status, TrackingRecord},
    errors::Error,
    formatting::human_timestamp,
    ports::TrackingStore,
    tracking::TrackingNumber,
    Result,
};

/// Row of the admin tracking table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackingView {
    pub tracking_number: String,
    pub status: String,
    pub status_details: String,
    pub last_updated: String,
}

impl From<&TrackingRecord> for TrackingView {
    fn from(r: &TrackingRecord) -> Self {
        Self {
            tracking_number: r.tracking_number.as_str().to_string(),
            status: r.status.label().to_string(),
            status_details: r.status_detail.clone(),
            last_updated: human_timestamp(r.last_updated),
        }
    }
}

/// Status choices offered to the admin, with their suggested detail text.
pub fn status_options() -> Vec<(&'static str, &'static str)> {
    Status::VOCABULARY
        .iter()
        .filter_map(|s| {
            let label = s.vocabulary_label()?;
            Some((label, s.suggested_detail().unwrap_or("Enter a custom status message")))
        })
        .collect()
}

pub struct AdminService {
    store: Arc<dyn TrackingStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    tracking: Mutex<FreshnessCache<(), Vec<TrackingView>>>,
    numbers: Mutex<FreshnessCache<(), Vec<String>>>,
}

impl AdminService {
    pub fn new(store: Arc<dyn TrackingStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            tracking: Mutex::new(FreshnessCache::new(clock.clone())),
            numbers: Mutex::new(FreshnessCache::new(clock.clone())),
            store,
            clock,
            ttl,
        }
    }

    /// All records, most recently updated first.
    pub async fn list_tracking(&self) -> Result<Vec<TrackingView>> {
        let store = self.store.clone();
        self.tracking
            .lock()
            .await
            .get_or_compute((), self.ttl, || async move {
                let rows = store.list_all().await?;
                Ok::<_, Error>(rows.iter().map(TrackingView::from).collect())
            })
            .await
    }

    /// Tracked numbers in ascending order.
    pub async fn list_tracking_numbers(&self) -> Result<Vec<String>> {
        let store = self.store.clone();
        self.numbers
            .lock()
            .await
            .get_or_compute((), self.ttl, || async move {
                let mut numbers: Vec<String> = store
                    .list_all()
                    .await?
                    .into_iter()
                    .map(|r| r.tracking_number.as_str().to_string())
                    .collect();
                numbers.sort();
                Ok::<_, Error>(numbers)
            })
            .await
    }

    /// Set a new status; the change is picked up by the next watcher cycle.
    pub async fn update_status(
        &self,
        tracking_number: &str,
        status: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let tracking_number = TrackingNumber::parse(tracking_number)?;
        let status = Status::validate(status)?;

        let detail = match (detail.map(str::trim).filter(|d| !d.is_empty()), &status) {
            (Some(d), _) => d.to_string(),
            (None, Status::Custom) => {
                return Err(Error::Validation(
                    "custom status requires a detail message".to_string(),
                ))
            }
            (None, s) => s.suggested_detail().unwrap_or_default().to_string(),
        };

        let found = self
            .store
            .update_status(&tracking_number, &status, &detail, self.clock.now())
            .await?;
        if !found {
            return Err(Error::NotFound(format!(
                "tracking number {tracking_number}"
            )));
        }

        self.tracking.lock().await.clear();
        self.numbers.lock().await.clear();

        info!(tracking_number = %tracking_number, status = %status, "updated status");
        Ok(())
    }
}
