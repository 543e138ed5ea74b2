//! Outbound chat notifications.

pub mod telegram;

pub use telegram::{BotUser, ChatMessage, TelegramClient, TelegramNotifier, Update};

use crate::models::{BroadcastReport, RecipientId};
use async_trait::async_trait;

/// Delivers one text message to a set of recipients
///
/// Broadcasting never fails as a whole: every recipient gets its own outcome
/// in the report and failures are not retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the name of this channel
    fn name(&self) -> &'static str;

    async fn broadcast(&self, recipients: &[RecipientId], message: &str) -> BroadcastReport;
}
