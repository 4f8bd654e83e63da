//! In-process fakes for the ports.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    clock::ManualClock,
    domain::RecipientId,
    errors::Error,
    ports::{InboundMessage, MessageChannel},
    Result,
};

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(ts(1_700_000_000)))
}

#[derive(Default)]
struct ChannelState {
    inbound: Vec<InboundMessage>,
    fetch_offsets: Vec<Option<i64>>,
    fail_fetch: bool,
    /// Remaining deliveries that should fail before one succeeds.
    fail_next: usize,
    /// Fail every delivery with a non-transient error.
    reject: bool,
    delay: Option<Duration>,
    attempts: Vec<(RecipientId, String)>,
    delivered: Vec<(RecipientId, String)>,
}

/// Scripted `MessageChannel` that records everything it is asked to do.
#[derive(Default)]
pub struct FakeChannel {
    state: Mutex<ChannelState>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn st(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap()
    }

    pub fn push_text(&self, recipient: &str, text: &str, offset: i64) {
        self.st().inbound.push(InboundMessage {
            recipient_id: RecipientId::new(recipient),
            text: Some(text.to_string()),
            sequence_offset: offset,
        });
    }

    pub fn push_non_text(&self, recipient: &str, offset: i64) {
        self.st().inbound.push(InboundMessage {
            recipient_id: RecipientId::new(recipient),
            text: None,
            sequence_offset: offset,
        });
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.st().fail_fetch = fail;
    }

    pub fn fail_next_deliveries(&self, n: usize) {
        self.st().fail_next = n;
    }

    pub fn reject_deliveries(&self, reject: bool) {
        self.st().reject = reject;
    }

    pub fn delay_deliveries(&self, d: Duration) {
        self.st().delay = Some(d);
    }

    pub fn fetch_offsets(&self) -> Vec<Option<i64>> {
        self.st().fetch_offsets.clone()
    }

    pub fn attempts(&self) -> usize {
        self.st().attempts.len()
    }

    pub fn delivered(&self) -> Vec<(RecipientId, String)> {
        self.st().delivered.clone()
    }

    pub fn delivered_to(&self, recipient: &str) -> Vec<String> {
        self.st()
            .delivered
            .iter()
            .filter(|(r, _)| r.as_str() == recipient)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear_delivered(&self) {
        let mut st = self.st();
        st.delivered.clear();
        st.attempts.clear();
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn fetch_inbound(&self, offset: Option<i64>) -> Result<Vec<InboundMessage>> {
        let mut st = self.st();
        st.fetch_offsets.push(offset);
        if st.fail_fetch {
            return Err(Error::External("getUpdates failed".into()));
        }
        // Like Telegram: an offset acknowledges everything below it.
        if let Some(off) = offset {
            st.inbound.retain(|m| m.sequence_offset >= off);
        }
        Ok(st.inbound.clone())
    }

    async fn deliver(&self, recipient: &RecipientId, html: &str) -> Result<()> {
        let delay = {
            let mut st = self.st();
            st.attempts.push((recipient.clone(), html.to_string()));
            st.delay
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let mut st = self.st();
        if st.reject {
            return Err(Error::Validation(format!("not a chat id: {recipient}")));
        }
        if st.fail_next > 0 {
            st.fail_next -= 1;
            return Err(Error::Delivery("connection reset".into()));
        }
        st.delivered.push((recipient.clone(), html.to_string()));
        Ok(())
    }
}
