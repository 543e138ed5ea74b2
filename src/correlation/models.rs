use crate::models::BroadcastReport;
use serde::Serialize;

/// What the correlation engine did with one ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    /// Correlation is switched off in configuration
    Disabled,

    /// No correlation key could be derived from the subject
    Skipped { ticket_id: u64 },

    /// Subject matched neither the DOWN nor the UP pattern
    Unclassified {
        ticket_id: u64,
        correlation_key: String,
    },

    /// A DOWN record was stored and announced
    Down {
        ticket_id: u64,
        correlation_key: String,
        broadcast: BroadcastReport,
    },

    /// UP ticket with no open DOWN records for its key
    NothingToResolve {
        ticket_id: u64,
        correlation_key: String,
    },

    /// UP ticket resolved the open DOWN records for its key
    Up {
        ticket_id: u64,
        correlation_key: String,
        /// Tickets whose remote close call succeeded
        closed: Vec<u64>,
        /// Tickets whose remote close call failed (still removed locally)
        failed: Vec<u64>,
        /// Ticket ids removed from the store
        removed: Vec<u64>,
        broadcast: BroadcastReport,
    },
}

impl CorrelationOutcome {
    /// Short label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            CorrelationOutcome::Disabled => "disabled",
            CorrelationOutcome::Skipped { .. } => "skipped",
            CorrelationOutcome::Unclassified { .. } => "unclassified",
            CorrelationOutcome::Down { .. } => "down",
            CorrelationOutcome::NothingToResolve { .. } => "nothing_to_resolve",
            CorrelationOutcome::Up { .. } => "up",
        }
    }
}
