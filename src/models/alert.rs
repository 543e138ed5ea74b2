use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A ticket believed to represent an unresolved "down" condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DownAlertRecord {
    /// Freshdesk ticket id (one active record per ticket)
    pub ticket_id: u64,

    /// Key derived from the subject, shared by the matching UP ticket
    #[validate(length(min = 1))]
    pub correlation_key: String,

    /// Original subject, kept for diagnostics
    pub subject: String,

    /// Insertion time
    pub created_at: DateTime<Utc>,
}

impl DownAlertRecord {
    pub fn new(ticket_id: u64, correlation_key: String, subject: String) -> Self {
        Self {
            ticket_id,
            correlation_key,
            subject,
            created_at: Utc::now(),
        }
    }
}

/// Classification of a ticket subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Down,
    Up,
    Neither,
}
