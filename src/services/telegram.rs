use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use teloxide::{ApiError, RequestError};

use crate::delivery::{DeliveryError, DeliverySink};

/// Posts articles to the target chat and alerts to the admin chat.
pub struct TelegramSink {
    bot: Bot,
    target: ChatId,
    admin: Option<ChatId>,
}

impl TelegramSink {
    pub fn new(bot: Bot, target: ChatId, admin: Option<ChatId>) -> Self {
        Self { bot, target, admin }
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(self.target, message)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn alert(&self, message: &str) -> Result<(), DeliveryError> {
        let Some(admin) = self.admin else {
            tracing::warn!("No admin chat configured, alert dropped: {}", message);
            return Ok(());
        };
        self.bot
            .send_message(admin, message)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

/// Rejections caused by the message itself are permanent; the rest may
/// succeed on a later attempt.
fn classify(error: RequestError) -> DeliveryError {
    match error {
        RequestError::Api(ApiError::CantParseEntities(reason)) => DeliveryError::Unrenderable(reason),
        RequestError::Api(ApiError::MessageIsTooLong) => {
            DeliveryError::Unrenderable("message is too long".to_string())
        }
        other => DeliveryError::Transport(other.to_string()),
    }
}
