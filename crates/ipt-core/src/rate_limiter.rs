use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use crate::domain::RecipientId;

// ============== Rate Limiter (Sliding Window) ==============

/// Per-recipient sliding-window admission control for outbound sends.
///
/// A call is admitted while fewer than `max_requests` admitted calls fall inside
/// the trailing `window`. Denied calls are not recorded.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_requests: usize,
    window: Duration,
    history: HashMap<RecipientId, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        Self {
            enabled,
            max_requests: max_requests as usize,
            window,
            history: HashMap::new(),
        }
    }

    pub fn allow(&mut self, recipient: &RecipientId) -> bool {
        self.allow_at(recipient, Instant::now())
    }

    pub fn allow_at(&mut self, recipient: &RecipientId, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let window = self.window;
        let stamps = self.history.entry(recipient.clone()).or_default();
        while stamps
            .front()
            .map(|t| now.saturating_duration_since(*t) >= window)
            .unwrap_or(false)
        {
            stamps.pop_front();
        }

        if stamps.len() >= self.max_requests {
            return false;
        }

        stamps.push_back(now);
        true
    }

    /// Admitted calls still inside the window as of `now`.
    pub fn in_window(&self, recipient: &RecipientId, now: Instant) -> usize {
        self.history
            .get(recipient)
            .map(|stamps| {
                stamps
                    .iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop recipients with no admitted call inside the window.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.history.retain(|_, stamps| {
            stamps
                .back()
                .map(|t| now.saturating_duration_since(*t) < window)
                .unwrap_or(false)
        });
    }

    pub fn tracked_recipients(&self) -> usize {
        self.history.len()
    }
}
