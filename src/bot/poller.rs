use crate::bot::commands::parse;
use crate::bot::handler::BotHandler;
use crate::notifications::{TelegramClient, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// getUpdates long-polling loop feeding the [`BotHandler`]
pub struct BotPoller {
    client: TelegramClient,
    handler: Arc<BotHandler>,
    bot_username: Option<String>,
    poll_timeout_secs: u64,
    backoff: Duration,
}

impl BotPoller {
    pub fn new(
        client: TelegramClient,
        handler: Arc<BotHandler>,
        bot_username: Option<String>,
        poll_timeout_secs: u64,
        backoff_secs: u64,
    ) -> Self {
        Self {
            client,
            handler,
            bot_username,
            poll_timeout_secs,
            backoff: Duration::from_secs(backoff_secs),
        }
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut offset: i64 = 0;
        info!("🤖 Bot polling started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.client.get_updates(offset, self.poll_timeout_secs) => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.process_update(update).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = self.backoff.as_secs(), "Polling failed, backing off");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        info!("Bot polling stopped");
    }

    /// Parse, handle and answer one update; non-text updates are skipped
    pub async fn process_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Skipping update without message");
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };

        let chat_id = message.chat.id;
        let user_id = message.from.as_ref().map_or(chat_id, |user| user.id);

        let command = parse(text, self.bot_username.as_deref());
        debug!(chat_id, user_id, command = command.name(), "Handling bot command");

        let reply = self.handler.handle(chat_id, user_id, command).await;
        if let Err(e) = self.client.send_message(chat_id, &reply).await {
            error!(chat_id, error = %e, "Failed to send bot reply");
        }
    }
}
