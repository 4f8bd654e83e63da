//! The change-detection loop.
//!
//! One task owns all mutable state (cursor, checkpoints, notifier) and runs
//! cycles strictly one after another:
//! 1. drain inbound commands from the channel
//! 2. full scan of the store, diffed against checkpoints
//! 3. checkpoint sweep
//! 4. sleep until the next cycle

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    checkpoint::{CheckpointMap, Observation},
    clock::Clock,
    dispatcher::CommandDispatcher,
    notifier::Notifier,
    ports::{MessageChannel, TrackingStore},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    /// Pause before retrying after a failed cycle.
    pub error_cooldown: Duration,
    pub checkpoint_ttl: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            error_cooldown: Duration::from_secs(5),
            checkpoint_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Counters for one completed cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub commands: usize,
    pub command_failures: usize,
    pub scanned: usize,
    pub baselined: usize,
    pub notified: usize,
    pub notify_failures: usize,
    pub evicted: usize,
}

pub struct StatusWatcher {
    channel: Arc<dyn MessageChannel>,
    store: Arc<dyn TrackingStore>,
    clock: Arc<dyn Clock>,
    dispatcher: CommandDispatcher,
    notifier: Notifier,
    cfg: WatcherConfig,

    inbound_cursor: Option<i64>,
    checkpoints: CheckpointMap,
    last_cycle: Option<DateTime<Utc>>,
}

impl StatusWatcher {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        store: Arc<dyn TrackingStore>,
        clock: Arc<dyn Clock>,
        notifier: Notifier,
        cfg: WatcherConfig,
    ) -> Self {
        let dispatcher = CommandDispatcher::new(store.clone(), clock.clone());
        Self {
            channel,
            store,
            clock,
            dispatcher,
            notifier,
            cfg,
            inbound_cursor: None,
            checkpoints: CheckpointMap::new(),
            last_cycle: None,
        }
    }

    pub fn inbound_cursor(&self) -> Option<i64> {
        self.inbound_cursor
    }

    pub fn checkpoints(&self) -> &CheckpointMap {
        &self.checkpoints
    }

    pub fn last_cycle(&self) -> Option<DateTime<Utc>> {
        self.last_cycle
    }

    /// Run cycles until `cancel` fires. A failed cycle is logged and retried after
    /// the cooldown; the loop itself never returns an error.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            poll_interval = ?self.cfg.poll_interval,
            "status watcher started"
        );

        loop {
            let pause = match self.run_cycle().await {
                Ok(report) => {
                    debug!(?report, "completed status check cycle");
                    self.cfg.poll_interval
                }
                Err(e) => {
                    error!(error = %e, "status check cycle failed");
                    self.cfg.error_cooldown
                }
            };

            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = sleep(pause) => {}
            }
        }

        info!("status watcher stopped");
    }

    /// One full cycle. Errors abort the rest of the cycle; state already updated stays.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.drain_inbound(&mut report).await;
        self.scan_store(&mut report).await?;

        let now = self.clock.now();
        report.evicted = self.checkpoints.sweep(now, self.cfg.checkpoint_ttl);
        self.notifier.prune_rate_limits();
        self.last_cycle = Some(now);

        Ok(report)
    }

    async fn drain_inbound(&mut self, report: &mut CycleReport) {
        let batch = match self.channel.fetch_inbound(self.inbound_cursor).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to fetch inbound messages");
                return;
            }
        };

        for msg in batch {
            let next = msg.sequence_offset + 1;
            if self.inbound_cursor.map(|c| next > c).unwrap_or(true) {
                self.inbound_cursor = Some(next);
            }

            let Some(text) = msg.text.as_deref() else {
                debug!(offset = msg.sequence_offset, "skipping non-text update");
                continue;
            };

            report.commands += 1;
            if let Err(e) = self
                .dispatcher
                .dispatch(&mut self.notifier, &msg.recipient_id, text)
                .await
            {
                report.command_failures += 1;
                error!(
                    recipient = %msg.recipient_id,
                    offset = msg.sequence_offset,
                    error = %e,
                    "failed to handle command"
                );
            }
        }
    }

    async fn scan_store(&mut self, report: &mut CycleReport) -> Result<()> {
        let records = self.store.list_all().await?;
        report.scanned = records.len();

        for record in records {
            match self.checkpoints.observe(&record) {
                Observation::Baseline => report.baselined += 1,
                Observation::Unchanged => {}
                Observation::Changed => {
                    if self.notifier.status_update(&record).await {
                        self.checkpoints.advance(&record);
                        report.notified += 1;
                        info!(
                            tracking_number = %record.tracking_number,
                            recipient = %record.recipient_id,
                            status = %record.status,
                            "sent status update"
                        );
                    } else {
                        // Checkpoint stays put so the next cycle retries.
                        report.notify_failures += 1;
                    }
                }
            }
        }

        Ok(())
    }
}
