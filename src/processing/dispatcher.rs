use crate::correlation::{CorrelationEngine, CorrelationOutcome};
use crate::error::Result;
use crate::gateway::TicketGateway;
use crate::metrics::WEBHOOK_EVENTS_TOTAL;
use crate::models::{BroadcastReport, RecipientId, Ticket, TicketChanges, WebhookEvent};
use crate::notifications::Notifier;
use crate::state::{RecipientRegistry, SessionRegistry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of dispatching one webhook event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Event handled and announced to chat recipients
    Notified {
        event_type: String,
        ticket_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation: Option<CorrelationOutcome>,
        broadcast: BroadcastReport,
    },

    /// Event kind has no handler
    Ignored { event_type: String },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Notified { .. } => "notified",
            DispatchOutcome::Ignored { .. } => "ignored",
        }
    }
}

/// Routes helpdesk webhook events to the correlation engine and chat broadcasts
pub struct EventDispatcher {
    gateway: Arc<dyn TicketGateway>,
    engine: Arc<CorrelationEngine>,
    notifier: Arc<dyn Notifier>,
    recipients: RecipientRegistry,
    sessions: SessionRegistry,
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn headline(ticket: &Ticket) -> String {
    format!("#{}: {}", ticket.id, ticket.subject)
}

fn priority_line(ticket: &Ticket) -> String {
    format!("Priority: {} {}", ticket.priority.emoji(), ticket.priority)
}

pub(crate) fn created_message(ticket: &Ticket) -> String {
    format!(
        "📌 New Ticket Created\n\n{}\n{}\nStatus: {}\nCustomer: {}\nCreated: {}",
        headline(ticket),
        priority_line(ticket),
        ticket.status,
        ticket.customer_email,
        format_time(ticket.created_at)
    )
}

pub(crate) fn updated_message(ticket: &Ticket, changes: &TicketChanges) -> String {
    format!(
        "🔄 Ticket Updated\n\n{}\n{}\nStatus: {}\n{}",
        headline(ticket),
        changes.describe(),
        ticket.status,
        priority_line(ticket)
    )
}

pub(crate) fn solved_message(ticket: &Ticket) -> String {
    format!(
        "✅ Ticket Resolved\n\n{}\n{}\nResolved at: {}",
        headline(ticket),
        priority_line(ticket),
        format_time(ticket.updated_at)
    )
}

pub(crate) fn reopened_message(ticket: &Ticket) -> String {
    format!(
        "🔓 Ticket Reopened\n\n{}\n{}\nStatus: {}\nReopened at: {}",
        headline(ticket),
        priority_line(ticket),
        ticket.status,
        format_time(ticket.updated_at)
    )
}

pub(crate) fn comment_message(ticket: &Ticket) -> String {
    format!(
        "💬 New Comment\n\n{}\n{}\nStatus: {}\nComment added at: {}",
        headline(ticket),
        priority_line(ticket),
        ticket.status,
        format_time(Some(Utc::now()))
    )
}

impl EventDispatcher {
    pub fn new(
        gateway: Arc<dyn TicketGateway>,
        engine: Arc<CorrelationEngine>,
        notifier: Arc<dyn Notifier>,
        recipients: RecipientRegistry,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            gateway,
            engine,
            notifier,
            recipients,
            sessions,
        }
    }

    /// Authorized chats, or every user with settings when none registered
    pub fn recipients(&self) -> Vec<RecipientId> {
        if self.recipients.is_empty() {
            self.sessions.known_users()
        } else {
            self.recipients.snapshot()
        }
    }

    /// Handle one webhook event
    ///
    /// Errors fetching the ticket are returned. Correlation errors are logged
    /// and never prevent the event notification.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<DispatchOutcome> {
        let event_type = event.event_type().to_string();
        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&[event_type.as_str()])
            .inc();

        info!(event_type = %event_type, ticket_id = ?event.ticket_id(), "Received Freshdesk event");

        let (ticket_id, correlation, message) = match event {
            WebhookEvent::TicketCreated { ticket_id } => {
                let ticket = self.gateway.get_ticket(ticket_id).await?;
                let correlation = match self.engine.handle_new_ticket(&ticket.to_ref()).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        error!(ticket_id, error = %e, "Ticket correlation failed");
                        None
                    }
                };
                (ticket_id, correlation, created_message(&ticket))
            }
            WebhookEvent::TicketUpdated { ticket_id, changes } => {
                let ticket = self.gateway.get_ticket(ticket_id).await?;
                (ticket_id, None, updated_message(&ticket, &changes))
            }
            WebhookEvent::TicketSolved { ticket_id } => {
                let ticket = self.gateway.get_ticket(ticket_id).await?;
                (ticket_id, None, solved_message(&ticket))
            }
            WebhookEvent::TicketReopened { ticket_id } => {
                let ticket = self.gateway.get_ticket(ticket_id).await?;
                (ticket_id, None, reopened_message(&ticket))
            }
            WebhookEvent::ConversationCreated { ticket_id } => {
                let ticket = self.gateway.get_ticket(ticket_id).await?;
                (ticket_id, None, comment_message(&ticket))
            }
            WebhookEvent::Unknown { event_type } => {
                warn!(event_type = %event_type, "Unhandled event type");
                return Ok(DispatchOutcome::Ignored { event_type });
            }
        };

        let broadcast = self
            .notifier
            .broadcast(&self.recipients(), &message)
            .await;

        info!(
            event_type = %event_type,
            ticket_id,
            succeeded = broadcast.succeeded(),
            failed = broadcast.failed(),
            "Notification sent for ticket event"
        );

        Ok(DispatchOutcome::Notified {
            event_type,
            ticket_id,
            correlation,
            broadcast,
        })
    }
}
