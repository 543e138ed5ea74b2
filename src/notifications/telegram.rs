use crate::error::{AppError, Result};
use crate::metrics::NOTIFICATIONS_TOTAL;
use crate::models::{BroadcastReport, DeliveryOutcome, OutgoingMessage, RecipientId, ReplyKeyboard};
use crate::notifications::Notifier;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    api_base: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: RecipientId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<KeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct KeyboardMarkup {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
}

impl From<&ReplyKeyboard> for KeyboardMarkup {
    fn from(keyboard: &ReplyKeyboard) -> Self {
        Self {
            keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|text| KeyboardButton { text: text.clone() })
                        .collect()
                })
                .collect(),
            resize_keyboard: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// One incoming update from getUpdates
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

/// The subset of a Telegram message the bot reads
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<BotUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: RecipientId,
}

/// A Telegram user (also returned by getMe)
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl TelegramClient {
    /// Create a client for `<api_url>/bot<token>`
    pub fn new(api_url: &str, bot_token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
            client,
        })
    }

    async fn call<P, T>(&self, method: &str, payload: &P, timeout: Option<Duration>) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(payload);

        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!("Telegram {} timed out", method))
            } else {
                AppError::Delivery(format!("Telegram {} failed: {}", method, e))
            }
        })?;

        let status = response.status();
        let body: TelegramResponse<T> = response.json().await.map_err(|e| {
            AppError::Delivery(format!(
                "Telegram {} returned status {} with unreadable body: {}",
                method, status, e
            ))
        })?;

        if !body.ok {
            return Err(AppError::Delivery(format!(
                "Telegram {} rejected: {}",
                method,
                body.description.unwrap_or_else(|| status.to_string())
            )));
        }

        body.result
            .ok_or_else(|| AppError::Delivery(format!("Telegram {} returned no result", method)))
    }

    /// Send one message to one chat
    pub async fn send_message(&self, chat_id: RecipientId, message: &OutgoingMessage) -> Result<()> {
        let payload = SendMessagePayload {
            chat_id,
            text: &message.text,
            parse_mode: message.html.then_some("HTML"),
            reply_markup: message.keyboard.as_ref().map(KeyboardMarkup::from),
        };

        let _: serde_json::Value = self.call("sendMessage", &payload, None).await?;
        debug!(chat_id, "Telegram message sent");
        Ok(())
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let payload = GetUpdatesPayload {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };

        // The HTTP timeout must outlast the server-side long poll
        let http_timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", &payload, Some(http_timeout)).await
    }

    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", &serde_json::json!({}), None).await
    }
}

/// Broadcasts plain-text messages through a [`TelegramClient`]
#[derive(Clone)]
pub struct TelegramNotifier {
    client: TelegramClient,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn broadcast(&self, recipients: &[RecipientId], message: &str) -> BroadcastReport {
        if recipients.is_empty() {
            warn!("No recipients registered; notification dropped");
            return BroadcastReport::default();
        }

        let outgoing = OutgoingMessage::text(message);
        let sends = recipients.iter().map(|&chat_id| {
            let outgoing = &outgoing;
            async move {
                match self.client.send_message(chat_id, outgoing).await {
                    Ok(()) => {
                        NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
                        DeliveryOutcome::delivered(chat_id)
                    }
                    Err(e) => {
                        NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                        error!(chat_id, error = %e, "Failed to deliver notification");
                        DeliveryOutcome::failed(chat_id, e.to_string())
                    }
                }
            }
        });

        let report = BroadcastReport::new(join_all(sends).await);
        info!(
            channel = self.name(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Broadcast complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_markup() {
        let keyboard = ReplyKeyboard::new(&[&["/tickets", "/open"], &["/help"]]);
        let markup = KeyboardMarkup::from(&keyboard);

        let value = serde_json::to_value(&markup).unwrap();
        assert_eq!(value["keyboard"][0][1]["text"], "/open");
        assert_eq!(value["resize_keyboard"], true);
    }

    #[test]
    fn test_send_payload_omits_optional_fields() {
        let payload = SendMessagePayload {
            chat_id: 42,
            text: "hello",
            parse_mode: None,
            reply_markup: None,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, serde_json::json!({ "chat_id": 42, "text": "hello" }));
    }

    #[tokio::test]
    async fn test_empty_recipients_returns_empty_report() {
        let client = TelegramClient::new("http://127.0.0.1:9", "token", 1).unwrap();
        let notifier = TelegramNotifier::new(client);

        let report = notifier.broadcast(&[], "ignored").await;
        assert!(report.is_empty());
    }
}
