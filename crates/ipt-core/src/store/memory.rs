use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    domain::{RecipientId, Status, TrackingRecord},
    errors::Error,
    ports::TrackingStore,
    tracking::TrackingNumber,
    Result,
};

/// In-process `TrackingStore`. Volatile; used by tests and local runs.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<TrackingNumber, TrackingRecord>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn get(&self, tracking_number: &TrackingNumber) -> Option<TrackingRecord> {
        self.records.lock().await.get(tracking_number).cloned()
    }
}

fn most_recent_first(mut v: Vec<TrackingRecord>) -> Vec<TrackingRecord> {
    v.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.tracking_number.cmp(&b.tracking_number))
    });
    v
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn insert(&self, record: &TrackingRecord) -> Result<bool> {
        let mut map = self.records.lock().await;
        if map.contains_key(&record.tracking_number) {
            return Ok(false);
        }
        map.insert(record.tracking_number.clone(), record.clone());
        Ok(true)
    }

    async fn list_by_recipient(&self, recipient: &RecipientId) -> Result<Vec<TrackingRecord>> {
        let map = self.records.lock().await;
        let rows = map
            .values()
            .filter(|r| &r.recipient_id == recipient)
            .cloned()
            .collect();
        Ok(most_recent_first(rows))
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>> {
        let map = self.records.lock().await;
        Ok(most_recent_first(map.values().cloned().collect()))
    }

    async fn update_status(
        &self,
        tracking_number: &TrackingNumber,
        status: &Status,
        detail: &str,
        last_updated: DateTime<Utc>,
    ) -> Result<bool> {
        let mut map = self.records.lock().await;
        let Some(rec) = map.get_mut(tracking_number) else {
            return Ok(false);
        };
        rec.status = status.clone();
        rec.status_detail = detail.to_string();
        rec.last_updated = last_updated;
        Ok(true)
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| Error::Validation(format!("retention age out of range: {e}")))?;
        let cutoff = self.clock.now() - max_age;
        let mut map = self.records.lock().await;
        let before = map.len();
        map.retain(|_, r| r.last_updated >= cutoff);
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    fn record(tn: &str, recipient: &str, at: i64) -> TrackingRecord {
        TrackingRecord::registered(
            TrackingNumber::parse(tn).unwrap(),
            RecipientId::new(recipient),
            ts(at),
        )
    }

    fn store() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(ts(1_700_000_000)));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_not_overwritten() {
        let (_, store) = store();
        assert!(store.insert(&record("EU430410927IN", "1", 10)).await.unwrap());
        assert!(!store.insert(&record("EU430410927IN", "2", 20)).await.unwrap());

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].recipient_id, RecipientId::new("1"));
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let (_, store) = store();
        store.insert(&record("EU430410927IN", "1", 10)).await.unwrap();
        store.insert(&record("RM286760959IN", "1", 30)).await.unwrap();
        store.insert(&record("AW595537795IN", "2", 20)).await.unwrap();

        let mine = store.list_by_recipient(&RecipientId::new("1")).await.unwrap();
        let order: Vec<_> = mine.iter().map(|r| r.tracking_number.as_str()).collect();
        assert_eq!(order, vec!["RM286760959IN", "EU430410927IN"]);

        let all = store.list_all().await.unwrap();
        assert_eq!(all[1].tracking_number.as_str(), "AW595537795IN");
    }

    #[tokio::test]
    async fn update_status_reports_missing_numbers() {
        let (_, store) = store();
        let tn = TrackingNumber::parse("EU430410927IN").unwrap();
        assert!(!store
            .update_status(&tn, &Status::Delivered, "done", ts(50))
            .await
            .unwrap());

        store.insert(&record("EU430410927IN", "1", 10)).await.unwrap();
        assert!(store
            .update_status(&tn, &Status::Delivered, "done", ts(50))
            .await
            .unwrap());
        let rec = store.get(&tn).await.unwrap();
        assert_eq!(rec.status, Status::Delivered);
        assert_eq!(rec.last_updated, ts(50));
    }

    #[tokio::test]
    async fn purge_removes_only_old_records() {
        let (clock, store) = store();
        let now = clock.now().timestamp();
        let day = 86_400;
        store.insert(&record("EU430410927IN", "1", now - 31 * day)).await.unwrap();
        store.insert(&record("RM286760959IN", "1", now - 29 * day)).await.unwrap();

        let removed = store
            .purge_older_than(Duration::from_secs(30 * day as u64))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
    }
}
