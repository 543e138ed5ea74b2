use crate::config::CorrelationConfig;
use crate::correlation::extractor::{classify, extract_correlation_key};
use crate::correlation::models::CorrelationOutcome;
use crate::error::Result;
use crate::gateway::TicketGateway;
use crate::metrics::{
    DOWN_ALERTS_OPEN, DOWN_ALERTS_RESOLVED_TOTAL, DOWN_ALERTS_STORED_TOTAL,
    TICKETS_PROCESSED_TOTAL, TICKET_CLOSE_FAILURES_TOTAL,
};
use crate::models::{AlertState, BroadcastReport, TicketRef};
use crate::notifications::Notifier;
use crate::state::{DownAlertStore, RecipientRegistry};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Correlates DOWN and UP tickets by subject key
pub struct CorrelationEngine {
    config: CorrelationConfig,

    /// Open DOWN records
    store: Arc<dyn DownAlertStore>,

    /// Used to close resolved DOWN tickets
    gateway: Arc<dyn TicketGateway>,

    notifier: Arc<dyn Notifier>,

    /// Chats that receive DOWN/UP announcements
    recipients: RecipientRegistry,
}

pub(crate) fn down_message(ticket_id: u64, subject: &str) -> String {
    format!("🔴 DOWN Alert\n#{}\n{}", ticket_id, subject)
}

pub(crate) fn up_message(ticket_id: u64, subject: &str, closed: &[u64]) -> String {
    let closed_list = closed
        .iter()
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(", ");
    format!("✅ UP Alert\n#{}\n{}\n\nClosed: {}", ticket_id, subject, closed_list)
}

pub(crate) fn close_reason(up_ticket_id: u64) -> String {
    format!(
        "Service is UP - Closed by automatic correlation with ticket #{}",
        up_ticket_id
    )
}

impl CorrelationEngine {
    pub fn new(
        store: Arc<dyn DownAlertStore>,
        gateway: Arc<dyn TicketGateway>,
        notifier: Arc<dyn Notifier>,
        recipients: RecipientRegistry,
        config: CorrelationConfig,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            notifier,
            recipients,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Process a newly created ticket
    ///
    /// Only storage failures are returned as errors. Close failures are
    /// reported in the outcome and delivery failures in the broadcast report.
    pub async fn handle_new_ticket(&self, ticket: &TicketRef) -> Result<CorrelationOutcome> {
        let outcome = self.correlate(ticket).await;

        match &outcome {
            Ok(outcome) => {
                TICKETS_PROCESSED_TOTAL
                    .with_label_values(&[outcome.label()])
                    .inc();
            }
            Err(e) => {
                TICKETS_PROCESSED_TOTAL.with_label_values(&["error"]).inc();
                error!(ticket_id = ticket.id, error = %e, "Correlation failed");
            }
        }

        outcome
    }

    async fn correlate(&self, ticket: &TicketRef) -> Result<CorrelationOutcome> {
        if !self.config.enabled {
            return Ok(CorrelationOutcome::Disabled);
        }

        let Some(correlation_key) = extract_correlation_key(ticket.subject.as_deref()) else {
            debug!(ticket_id = ticket.id, "No correlation key in subject, skipping");
            return Ok(CorrelationOutcome::Skipped {
                ticket_id: ticket.id,
            });
        };

        let subject = ticket.subject.as_deref().unwrap_or_default();

        match classify(subject) {
            AlertState::Down => self.handle_down(ticket.id, correlation_key, subject).await,
            AlertState::Up => self.handle_up(ticket.id, correlation_key, subject).await,
            AlertState::Neither => {
                debug!(
                    ticket_id = ticket.id,
                    correlation_key = %correlation_key,
                    "Subject is neither DOWN nor UP"
                );
                Ok(CorrelationOutcome::Unclassified {
                    ticket_id: ticket.id,
                    correlation_key,
                })
            }
        }
    }

    async fn handle_down(
        &self,
        ticket_id: u64,
        correlation_key: String,
        subject: &str,
    ) -> Result<CorrelationOutcome> {
        self.store
            .upsert_down(ticket_id, &correlation_key, subject)
            .await?;
        DOWN_ALERTS_STORED_TOTAL.inc();
        self.refresh_open_gauge().await;

        info!(
            ticket_id,
            correlation_key = %correlation_key,
            "🔴 DOWN alert stored"
        );

        let broadcast = self.announce(&down_message(ticket_id, subject)).await;

        Ok(CorrelationOutcome::Down {
            ticket_id,
            correlation_key,
            broadcast,
        })
    }

    async fn handle_up(
        &self,
        ticket_id: u64,
        correlation_key: String,
        subject: &str,
    ) -> Result<CorrelationOutcome> {
        let matches = self.store.find_down_by_key(&correlation_key).await?;

        if matches.is_empty() {
            info!(
                ticket_id,
                correlation_key = %correlation_key,
                "UP alert with no open DOWN tickets"
            );
            return Ok(CorrelationOutcome::NothingToResolve {
                ticket_id,
                correlation_key,
            });
        }

        let reason = close_reason(ticket_id);
        let mut closed = Vec::with_capacity(matches.len());
        let mut failed = Vec::new();

        for record in &matches {
            match self.gateway.close_ticket(record.ticket_id, &reason).await {
                Ok(()) => {
                    info!(
                        down_ticket_id = record.ticket_id,
                        up_ticket_id = ticket_id,
                        "Closed DOWN ticket"
                    );
                    closed.push(record.ticket_id);
                }
                Err(e) => {
                    TICKET_CLOSE_FAILURES_TOTAL.inc();
                    warn!(
                        down_ticket_id = record.ticket_id,
                        up_ticket_id = ticket_id,
                        error = %e,
                        "Failed to close DOWN ticket"
                    );
                    failed.push(record.ticket_id);
                }
            }
        }

        // Records are cleared even when a close failed
        let removed = self.store.delete_by_key(&correlation_key).await?;
        DOWN_ALERTS_RESOLVED_TOTAL.inc_by(removed.len() as f64);
        self.refresh_open_gauge().await;

        info!(
            ticket_id,
            correlation_key = %correlation_key,
            closed = closed.len(),
            failed = failed.len(),
            "✅ UP alert resolved DOWN tickets"
        );

        let broadcast = self
            .announce(&up_message(ticket_id, subject, &closed))
            .await;

        Ok(CorrelationOutcome::Up {
            ticket_id,
            correlation_key,
            closed,
            failed,
            removed,
            broadcast,
        })
    }

    async fn announce(&self, message: &str) -> BroadcastReport {
        self.notifier
            .broadcast(&self.recipients.snapshot(), message)
            .await
    }

    async fn refresh_open_gauge(&self) {
        match self.store.count_down().await {
            Ok(count) => DOWN_ALERTS_OPEN.set(count as f64),
            Err(e) => debug!(error = %e, "Could not count open DOWN records"),
        }
    }
}
