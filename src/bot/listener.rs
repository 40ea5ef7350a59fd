use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};

use crate::app::{App, Replier};
use crate::error::Result;

use super::command::parse_command;

/// Answers in the chat a command came from.
pub struct ChatReplier {
    bot: Bot,
    chat: ChatId,
}

impl ChatReplier {
    pub fn new(bot: Bot, chat: ChatId) -> Self {
        Self { bot, chat }
    }
}

#[async_trait]
impl Replier for ChatReplier {
    async fn reply(&self, text: &str) -> Result<()> {
        self.bot.send_message(self.chat, text).await?;
        Ok(())
    }

    async fn send_file(&self, path: &Path, caption: &str) -> Result<()> {
        self.bot
            .send_document(self.chat, InputFile::file(path))
            .caption(caption)
            .await?;
        Ok(())
    }
}

/// Long-polls Telegram and executes commands sent by the admin.
///
/// Returns when the dispatcher stops (Ctrl-C).
pub async fn listen(bot: Bot, app: Arc<App>) {
    tracing::info!("Starting command listener");

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let app = app.clone();
        async move {
            let sender = msg.from.as_ref().map(|user| user.id.0 as i64);
            if !app.is_admin(sender) {
                tracing::debug!("Ignoring message from unauthorized user [{:?}]", sender);
                return respond(());
            }

            let Some(text) = msg.text() else {
                return respond(());
            };
            let replier = ChatReplier::new(bot, msg.chat.id);

            let outcome = match parse_command(text) {
                None => {
                    tracing::debug!("Ignoring non-command message");
                    Ok(())
                }
                Some(Err(usage)) => replier.reply(&usage).await,
                Some(Ok(command)) => {
                    tracing::info!("Received command [{:?}]", command);
                    match app.handle_command(command, &replier).await {
                        Ok(()) => Ok(()),
                        Err(e) => {
                            tracing::error!("Command failed: {}", e);
                            replier.reply(&format!("Error: {}", e)).await
                        }
                    }
                }
            };
            if let Err(e) = outcome {
                tracing::error!("Cannot reply to admin: {}", e);
            }

            respond(())
        }
    });

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Command listener stopped");
}
