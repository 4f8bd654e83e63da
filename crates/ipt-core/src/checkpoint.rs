//! Last-notified state per (tracking number, recipient).
//!
//! Volatile by design of the loop: a restart starts from an empty map, so every
//! record is re-baselined rather than replayed.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    domain::{RecipientId, Status, TrackingRecord},
    tracking::TrackingNumber,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CheckpointKey {
    pub tracking_number: TrackingNumber,
    pub recipient_id: RecipientId,
}

impl CheckpointKey {
    pub fn of(record: &TrackingRecord) -> Self {
        Self {
            tracking_number: record.tracking_number.clone(),
            recipient_id: record.recipient_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub status: Status,
    pub last_notified: DateTime<Utc>,
}

/// What the loop should do about one scanned record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// First sighting; a baseline was recorded and nothing is sent.
    Baseline,
    Unchanged,
    /// Newer timestamp and different status than last notified.
    Changed,
}

#[derive(Debug, Default)]
pub struct CheckpointMap {
    entries: HashMap<CheckpointKey, Checkpoint>,
}

impl CheckpointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `record`, recording a baseline on first sight.
    ///
    /// A detected change does not move the checkpoint; call [`CheckpointMap::advance`]
    /// once the notification has actually been delivered.
    pub fn observe(&mut self, record: &TrackingRecord) -> Observation {
        let key = CheckpointKey::of(record);
        let Some(cp) = self.entries.get(&key) else {
            self.entries.insert(
                key,
                Checkpoint {
                    status: record.status.clone(),
                    last_notified: record.last_updated,
                },
            );
            return Observation::Baseline;
        };

        if record.last_updated > cp.last_notified && record.status != cp.status {
            Observation::Changed
        } else {
            Observation::Unchanged
        }
    }

    pub fn advance(&mut self, record: &TrackingRecord) {
        self.entries.insert(
            CheckpointKey::of(record),
            Checkpoint {
                status: record.status.clone(),
                last_notified: record.last_updated,
            },
        );
    }

    pub fn get(&self, key: &CheckpointKey) -> Option<&Checkpoint> {
        self.entries.get(key)
    }

    /// Evict entries whose last-notified timestamp is at least `ttl` old.
    pub fn sweep(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, cp| {
            (now - cp.last_notified)
                .to_std()
                .map(|age| age < ttl)
                .unwrap_or(true)
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ts;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn record(status: Status, at: i64) -> TrackingRecord {
        TrackingRecord {
            tracking_number: TrackingNumber::parse("EU430410927IN").unwrap(),
            recipient_id: RecipientId::new("1"),
            status,
            status_detail: String::new(),
            last_updated: ts(at),
        }
    }

    #[test]
    fn first_sight_is_a_baseline_whatever_the_status() {
        let mut map = CheckpointMap::new();
        assert_eq!(
            map.observe(&record(Status::Delivered, 100)),
            Observation::Baseline
        );
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.observe(&record(Status::Delivered, 100)),
            Observation::Unchanged
        );
    }

    #[test]
    fn change_needs_newer_timestamp_and_different_status() {
        let mut map = CheckpointMap::new();
        map.observe(&record(Status::InTransit, 100));

        assert_eq!(
            map.observe(&record(Status::Delivered, 101)),
            Observation::Changed
        );
        assert_eq!(
            map.observe(&record(Status::InTransit, 101)),
            Observation::Unchanged
        );
        assert_eq!(
            map.observe(&record(Status::Delivered, 100)),
            Observation::Unchanged
        );
    }

    #[test]
    fn change_is_reported_until_advanced() {
        let mut map = CheckpointMap::new();
        map.observe(&record(Status::InTransit, 100));
        let delivered = record(Status::Delivered, 200);

        assert_eq!(map.observe(&delivered), Observation::Changed);
        assert_eq!(map.observe(&delivered), Observation::Changed);

        map.advance(&delivered);
        assert_eq!(map.observe(&delivered), Observation::Unchanged);
        let cp = map.get(&CheckpointKey::of(&delivered)).unwrap();
        assert_eq!(cp.status, Status::Delivered);
        assert_eq!(cp.last_notified, ts(200));
    }

    #[test]
    fn recipients_are_tracked_separately() {
        let mut map = CheckpointMap::new();
        let mine = record(Status::InTransit, 100);
        let mut theirs = mine.clone();
        theirs.recipient_id = RecipientId::new("2");
        assert_eq!(map.observe(&mine), Observation::Baseline);
        assert_eq!(map.observe(&theirs), Observation::Baseline);
    }

    #[test]
    fn sweep_evicts_entries_older_than_ttl() {
        let now = 1_700_000_000;
        let mut map = CheckpointMap::new();
        let old = record(Status::InTransit, now - 25 * 3600);
        let mut fresh = record(Status::InTransit, now - 23 * 3600);
        fresh.tracking_number = TrackingNumber::parse("RM286760959IN").unwrap();
        map.observe(&old);
        map.observe(&fresh);

        assert_eq!(map.sweep(ts(now), DAY), 1);
        assert!(map.get(&CheckpointKey::of(&old)).is_none());
        assert!(map.get(&CheckpointKey::of(&fresh)).is_some());

        // An evicted pair is re-baselined, not notified.
        assert_eq!(
            map.observe(&record(Status::Delivered, now)),
            Observation::Baseline
        );
    }
}
