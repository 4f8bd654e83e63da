//! Inbound chat command handling.

use std::sync::Arc;

use tracing::{error, info};

use crate::{
    clock::Clock,
    domain::{RecipientId, TrackingRecord},
    notifier::Notifier,
    ports::TrackingStore,
    templates,
    tracking::TrackingNumber,
    Result,
};

const COMMAND_PREFIX: char = '/';

/// What a dispatched message resulted in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Help,
    TrackUsage,
    InvalidTrackingNumber,
    Tracked(TrackingNumber),
    AlreadyTracked(TrackingNumber),
    NoTrackedPackages,
    StatusListing(usize),
    UnknownCommand(String),
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches(COMMAND_PREFIX)
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub struct CommandDispatcher {
    store: Arc<dyn TrackingStore>,
    clock: Arc<dyn Clock>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn TrackingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Handle one inbound text. Replies go through `notifier`.
    ///
    /// Store failures are returned after the user has been told what they can be told.
    pub async fn dispatch(
        &self,
        notifier: &mut Notifier,
        recipient: &RecipientId,
        text: &str,
    ) -> Result<DispatchOutcome> {
        if !text.trim_start().starts_with(COMMAND_PREFIX) {
            notifier.send(recipient, templates::HELP).await;
            return Ok(DispatchOutcome::Help);
        }

        let (cmd, args) = parse_command(text);
        info!(%recipient, command = %cmd, args = %args, "received command");

        match cmd.as_str() {
            "help" | "start" => {
                notifier.send(recipient, templates::HELP).await;
                Ok(DispatchOutcome::Help)
            }
            "track" => self.handle_track(notifier, recipient, &args).await,
            "status" => self.handle_status(notifier, recipient).await,
            _ => {
                notifier.send(recipient, templates::UNKNOWN_COMMAND).await;
                Ok(DispatchOutcome::UnknownCommand(cmd))
            }
        }
    }

    async fn handle_track(
        &self,
        notifier: &mut Notifier,
        recipient: &RecipientId,
        args: &str,
    ) -> Result<DispatchOutcome> {
        if args.is_empty() {
            notifier.send(recipient, templates::TRACK_USAGE).await;
            return Ok(DispatchOutcome::TrackUsage);
        }

        // Only the first token is the tracking number; anything after it is ignored.
        let candidate = args.split_whitespace().next().unwrap_or_default();
        let Ok(tracking_number) = TrackingNumber::parse(candidate) else {
            notifier
                .send(recipient, templates::INVALID_TRACKING_NUMBER)
                .await;
            return Ok(DispatchOutcome::InvalidTrackingNumber);
        };

        let record =
            TrackingRecord::registered(tracking_number.clone(), recipient.clone(), self.clock.now());

        match self.store.insert(&record).await {
            Ok(true) => {
                info!(%recipient, tracking_number = %tracking_number, "tracking started");
                notifier
                    .send(recipient, &templates::tracking_started(&tracking_number))
                    .await;
                Ok(DispatchOutcome::Tracked(tracking_number))
            }
            Ok(false) => {
                info!(%recipient, tracking_number = %tracking_number, "tracking number already registered");
                notifier
                    .send(recipient, templates::REGISTRATION_FAILED)
                    .await;
                Ok(DispatchOutcome::AlreadyTracked(tracking_number))
            }
            Err(e) => {
                error!(%recipient, tracking_number = %tracking_number, error = %e, "failed to register tracking number");
                notifier
                    .send(recipient, templates::REGISTRATION_FAILED)
                    .await;
                Err(e)
            }
        }
    }

    async fn handle_status(
        &self,
        notifier: &mut Notifier,
        recipient: &RecipientId,
    ) -> Result<DispatchOutcome> {
        let records = self.store.list_by_recipient(recipient).await?;
        if records.is_empty() {
            notifier.send(recipient, templates::NO_TRACKED_PACKAGES).await;
            return Ok(DispatchOutcome::NoTrackedPackages);
        }

        notifier
            .send(recipient, &templates::status_listing(&records))
            .await;
        Ok(DispatchOutcome::StatusListing(records.len()))
    }
}
