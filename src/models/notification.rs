use serde::{Deserialize, Serialize};

/// A chat that receives broadcasts (Telegram chat id)
pub type RecipientId = i64;

/// Result of delivering one message to one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub recipient: RecipientId,
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(recipient: RecipientId) -> Self {
        Self {
            recipient,
            delivered: true,
            error: None,
        }
    }

    pub fn failed(recipient: RecipientId, error: impl Into<String>) -> Self {
        Self {
            recipient,
            delivered: false,
            error: Some(error.into()),
        }
    }
}

/// Per-recipient outcomes of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl BroadcastReport {
    pub fn new(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.delivered).count()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failed_recipients(&self) -> Vec<RecipientId> {
        self.outcomes
            .iter()
            .filter(|o| !o.delivered)
            .map(|o| o.recipient)
            .collect()
    }
}

/// Optional reply keyboard attached to a chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn new(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|b| b.to_string()).collect())
                .collect(),
        }
    }
}

/// A chat message ready to send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub html: bool,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            keyboard: None,
        }
    }

    pub fn html(mut self) -> Self {
        self.html = true;
        self
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = BroadcastReport::new(vec![
            DeliveryOutcome::delivered(1),
            DeliveryOutcome::failed(2, "chat not found"),
            DeliveryOutcome::delivered(3),
        ]);

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failed_recipients(), vec![2]);
    }
}
