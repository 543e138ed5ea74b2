use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Freshdesk ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TicketStatus {
    Open,
    Pending,
    Resolved,
    Closed,
    #[strum(to_string = "On Hold", serialize = "onhold")]
    OnHold,
    Reopened,
    #[strum(to_string = "Waiting on customer", serialize = "waiting")]
    WaitingOnCustomer,
    Assigned,
    Unknown,
}

impl TicketStatus {
    /// Map a Freshdesk numeric status code
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => TicketStatus::Open,
            3 => TicketStatus::Pending,
            4 => TicketStatus::Resolved,
            5 => TicketStatus::Closed,
            6 => TicketStatus::OnHold,
            7 => TicketStatus::Reopened,
            8 => TicketStatus::WaitingOnCustomer,
            9 => TicketStatus::Assigned,
            _ => TicketStatus::Unknown,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            TicketStatus::Open => Some(2),
            TicketStatus::Pending => Some(3),
            TicketStatus::Resolved => Some(4),
            TicketStatus::Closed => Some(5),
            TicketStatus::OnHold => Some(6),
            TicketStatus::Reopened => Some(7),
            TicketStatus::WaitingOnCustomer => Some(8),
            TicketStatus::Assigned => Some(9),
            TicketStatus::Unknown => None,
        }
    }

    /// Parse a user-supplied status: a name ("resolved") or a numeric code ("4")
    pub fn parse_input(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(code) = input.parse::<i64>() {
            return match Self::from_code(code) {
                TicketStatus::Unknown => None,
                status => Some(status),
            };
        }
        match Self::from_str(input) {
            Ok(TicketStatus::Unknown) | Err(_) => None,
            Ok(status) => Some(status),
        }
    }

    /// Closed and Resolved tickets are no longer open
    pub fn is_open(&self) -> bool {
        !matches!(self, TicketStatus::Closed | TicketStatus::Resolved)
    }
}

/// Freshdesk ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
    Unknown,
}

impl TicketPriority {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TicketPriority::Low,
            2 => TicketPriority::Medium,
            3 => TicketPriority::High,
            4 => TicketPriority::Urgent,
            _ => TicketPriority::Unknown,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            TicketPriority::Low => Some(1),
            TicketPriority::Medium => Some(2),
            TicketPriority::High => Some(3),
            TicketPriority::Urgent => Some(4),
            TicketPriority::Unknown => None,
        }
    }

    pub fn parse_input(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(code) = input.parse::<i64>() {
            return match Self::from_code(code) {
                TicketPriority::Unknown => None,
                priority => Some(priority),
            };
        }
        match Self::from_str(input) {
            Ok(TicketPriority::Unknown) | Err(_) => None,
            Ok(priority) => Some(priority),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TicketPriority::Low => "🟢",
            TicketPriority::Medium => "🟡",
            TicketPriority::High => "🔴",
            TicketPriority::Urgent => "⚠️",
            TicketPriority::Unknown => "❓",
        }
    }
}

/// A helpdesk ticket as seen by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub customer_email: String,
}

impl Ticket {
    /// The minimal view the correlation engine needs
    pub fn to_ref(&self) -> TicketRef {
        TicketRef {
            id: self.id,
            subject: Some(self.subject.clone()),
        }
    }
}

/// Identity and subject of a newly created ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: u64,
    pub subject: Option<String>,
}

impl TicketRef {
    pub fn new(id: u64, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: Some(subject.into()),
        }
    }
}

/// List entry returned by recent-ticket queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: u64,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: Option<DateTime<Utc>>,
}

/// Helpdesk agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub available: bool,
}
