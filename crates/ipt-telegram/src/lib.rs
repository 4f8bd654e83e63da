//! Telegram adapter (teloxide).
//!
//! Implements the `ipt-core` `MessageChannel` port over the Bot API using
//! non-blocking `getUpdates` polling.

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{BotCommand, ParseMode, Update, UpdateKind},
};
use tracing::{info, warn};

use ipt_core::{
    domain::RecipientId,
    errors::Error,
    ports::{InboundMessage, MessageChannel},
    Result,
};

#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Build a bot from `token` and verify it with `getMe`.
    pub async fn connect(token: &str) -> anyhow::Result<Self> {
        let bot = Bot::new(token);
        let me = bot.get_me().await?;
        info!(username = %me.username(), "connected to telegram");
        Ok(Self::new(bot))
    }

    /// Publish the command menu. Failures are logged only.
    pub async fn register_commands(&self) {
        let commands = vec![
            BotCommand::new("track", "Track a new package"),
            BotCommand::new("status", "Check status of your packages"),
            BotCommand::new("help", "Show help message"),
        ];
        match self.bot.set_my_commands(commands).await {
            Ok(_) => info!("registered bot commands"),
            Err(e) => warn!(error = %e, "failed to register bot commands"),
        }
    }

    fn tg_chat(recipient: &RecipientId) -> Result<teloxide::types::ChatId> {
        recipient
            .as_str()
            .trim()
            .parse::<i64>()
            .map(teloxide::types::ChatId)
            .map_err(|_| Error::Validation(format!("not a telegram chat id: {recipient}")))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(format!("telegram error: {e}"))
    }
}

fn to_inbound(update: &Update) -> InboundMessage {
    let recipient_id = update
        .chat()
        .map(|c| c.id.0.to_string())
        .unwrap_or_default();
    let text = match &update.kind {
        UpdateKind::Message(m) => m.text().map(str::to_string),
        _ => None,
    };
    InboundMessage {
        recipient_id: RecipientId::new(recipient_id),
        text,
        sequence_offset: i64::from(update.id),
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    async fn fetch_inbound(&self, offset: Option<i64>) -> Result<Vec<InboundMessage>> {
        let mut req = self.bot.get_updates().timeout(0);
        if let Some(o) = offset {
            req = req.offset(i32::try_from(o).unwrap_or(i32::MAX));
        }

        match req.await {
            Ok(updates) => Ok(updates.iter().map(to_inbound).collect()),
            Err(e) => {
                warn!(error = %e, ?offset, "failed to fetch telegram updates");
                Ok(Vec::new())
            }
        }
    }

    async fn deliver(&self, recipient: &RecipientId, html: &str) -> Result<()> {
        let chat = Self::tg_chat(recipient)?;
        self.bot
            .send_message(chat, html.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
