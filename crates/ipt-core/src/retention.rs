use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::ports::TrackingStore;

/// Purge records older than `max_age` every `interval`, starting immediately.
///
/// Runs independently of the watcher; returns when `cancel` fires.
pub async fn run_retention(
    store: Arc<dyn TrackingStore>,
    max_age: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    // interval() panics on a zero period
    let mut tick = tokio::time::interval(interval.max(Duration::from_secs(1)));
    loop {
        tokio::select! {
          _ = cancel.cancelled() => break,
          _ = tick.tick() => {
            match store.purge_older_than(max_age).await {
              Ok(0) => {}
              Ok(removed) => info!(removed, ?max_age, "purged old tracking records"),
              Err(e) => error!(error = %e, "retention sweep failed"),
            }
          }
        }
    }
}
