use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{RecipientId, Status, TrackingRecord},
    ports::TrackingStore,
    retry::{with_retry, RetryPolicy},
    tracking::TrackingNumber,
    Result,
};

/// `TrackingStore` decorator that retries transient failures.
///
/// Conflicts and "not found" are results, not errors, so they pass straight through.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TrackingStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TrackingStore> TrackingStore for RetryingStore<S> {
    async fn insert(&self, record: &TrackingRecord) -> Result<bool> {
        with_retry(self.policy, "store.insert", || self.inner.insert(record)).await
    }

    async fn list_by_recipient(&self, recipient: &RecipientId) -> Result<Vec<TrackingRecord>> {
        with_retry(self.policy, "store.list_by_recipient", || {
            self.inner.list_by_recipient(recipient)
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>> {
        with_retry(self.policy, "store.list_all", || self.inner.list_all()).await
    }

    async fn update_status(
        &self,
        tracking_number: &TrackingNumber,
        status: &Status,
        detail: &str,
        last_updated: DateTime<Utc>,
    ) -> Result<bool> {
        with_retry(self.policy, "store.update_status", || {
            self.inner
                .update_status(tracking_number, status, detail, last_updated)
        })
        .await
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        with_retry(self.policy, "store.purge_older_than", || {
            self.inner.purge_older_than(max_age)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` scans with a transient error.
    struct FlakyStore {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TrackingStore for FlakyStore {
        async fn insert(&self, _record: &TrackingRecord) -> Result<bool> {
            Err(Error::NotFound("insert".into()))
        }

        async fn list_by_recipient(&self, _r: &RecipientId) -> Result<Vec<TrackingRecord>> {
            Ok(Vec::new())
        }

        async fn list_all(&self) -> Result<Vec<TrackingRecord>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(Error::Store("database is locked".into()));
            }
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _tn: &TrackingNumber,
            _s: &Status,
            _d: &str,
            _at: DateTime<Utc>,
        ) -> Result<bool> {
            Ok(false)
        }

        async fn purge_older_than(&self, _max_age: Duration) -> Result<usize> {
            Ok(0)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn transient_scan_failures_are_retried() {
        let store = RetryingStore::new(
            FlakyStore {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            policy(),
        );
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_the_last_error() {
        let store = RetryingStore::new(
            FlakyStore {
                failures: 10,
                calls: AtomicUsize::new(0),
            },
            policy(),
        );
        assert!(matches!(store.list_all().await, Err(Error::Store(_))));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let store = RetryingStore::new(
            FlakyStore {
                failures: 0,
                calls: AtomicUsize::new(0),
            },
            policy(),
        );
        let tn = TrackingNumber::parse("EU430410927IN").unwrap();
        let rec = TrackingRecord::registered(tn, RecipientId::new("1"), Utc::now());
        assert!(matches!(store.insert(&rec).await, Err(Error::NotFound(_))));
    }
}
