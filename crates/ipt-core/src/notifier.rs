//! Outbound delivery: rate limiting, per-send timeout and bounded retry.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::{
    domain::{RecipientId, TrackingRecord},
    errors::Error,
    ports::MessageChannel,
    rate_limiter::RateLimiter,
    templates, Result,
};

#[derive(Clone, Copy, Debug)]
pub struct NotifierConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed backoff between attempts.
    pub retry_delay: Duration,
    /// Upper bound for a single delivery attempt.
    pub send_timeout: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            send_timeout: Duration::from_secs(10),
        }
    }
}

pub struct Notifier {
    channel: Arc<dyn MessageChannel>,
    limiter: RateLimiter,
    cfg: NotifierConfig,
}

impl Notifier {
    pub fn new(channel: Arc<dyn MessageChannel>, limiter: RateLimiter, cfg: NotifierConfig) -> Self {
        Self {
            channel,
            limiter,
            cfg,
        }
    }

    /// Deliver `message`. Never fails: problems are logged and reported as `false`.
    ///
    /// A rate-limited send is dropped, not queued.
    pub async fn send(&mut self, recipient: &RecipientId, message: &str) -> bool {
        if !self.limiter.allow(recipient) {
            warn!(%recipient, "rate limit exceeded, dropping message");
            return false;
        }

        let attempts = self.cfg.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match self.deliver_once(recipient, message).await {
                Ok(()) => {
                    info!(%recipient, attempt, "message sent");
                    return true;
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(%recipient, attempt, error = %e, "send failed, retrying");
                    if !self.cfg.retry_delay.is_zero() {
                        sleep(self.cfg.retry_delay).await;
                    }
                }
                Err(e) => {
                    error!(%recipient, attempt, error = %e, "failed to send message");
                    return false;
                }
            }
        }

        false
    }

    /// Notify the record's recipient about its current status.
    pub async fn status_update(&mut self, record: &TrackingRecord) -> bool {
        let message = templates::status_block(
            &record.tracking_number,
            &record.status,
            &record.status_detail,
            record.last_updated,
            false,
        );
        self.send(&record.recipient_id, &message).await
    }

    /// Forget recipients that have been idle for a whole window.
    pub fn prune_rate_limits(&mut self) {
        self.limiter.prune(Instant::now());
    }

    async fn deliver_once(&self, recipient: &RecipientId, message: &str) -> Result<()> {
        match timeout(self.cfg.send_timeout, self.channel.deliver(recipient, message)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(self.cfg.send_timeout)),
        }
    }
}
