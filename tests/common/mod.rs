//! Shared test doubles for the helpdesk gateway and chat notifier.

#![allow(dead_code)]

use async_trait::async_trait;
use helpdesk_relay::{
    error::{AppError, Result},
    gateway::{HelpdeskApi, TicketGateway},
    models::{
        Agent, BroadcastReport, DeliveryOutcome, DownAlertRecord, RecipientId, Ticket,
        TicketPriority, TicketStatus, TicketSummary,
    },
    notifications::Notifier,
    state::{DownAlertStore, InMemoryStore},
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Build a ticket with sensible defaults
pub fn ticket(id: u64, subject: &str) -> Ticket {
    Ticket {
        id,
        subject: subject.to_string(),
        description: String::new(),
        status: TicketStatus::Open,
        priority: TicketPriority::Medium,
        created_at: None,
        updated_at: None,
        customer_email: "customer@example.com".to_string(),
    }
}

/// In-memory helpdesk that records every mutating call
#[derive(Default)]
pub struct MockGateway {
    tickets: Mutex<HashMap<u64, Ticket>>,
    fail_close: Mutex<HashSet<u64>>,
    unauthorized: Mutex<HashSet<u64>>,
    agents: Mutex<Vec<Agent>>,
    close_delay: Option<Duration>,
    pub disconnected: Mutex<bool>,
    pub close_attempts: Mutex<Vec<u64>>,
    pub closed: Mutex<Vec<(u64, String)>>,
    pub notes: Mutex<Vec<(u64, String, bool)>>,
    pub replies: Mutex<Vec<(u64, String)>>,
    pub status_updates: Mutex<Vec<(u64, TicketStatus)>>,
    pub priority_updates: Mutex<Vec<(u64, TicketPriority)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket(self, ticket: Ticket) -> Self {
        self.tickets.lock().insert(ticket.id, ticket);
        self
    }

    pub fn with_agent(self, agent: Agent) -> Self {
        self.agents.lock().push(agent);
        self
    }

    /// Make `close_ticket` fail for this id
    pub fn fail_close_for(self, ticket_id: u64) -> Self {
        self.fail_close.lock().insert(ticket_id);
        self
    }

    /// Make every `close_ticket` take this long
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    /// Make `get_ticket` answer with an authentication error for this id
    pub fn deny_access_to(self, ticket_id: u64) -> Self {
        self.unauthorized.lock().insert(ticket_id);
        self
    }

    pub fn close_attempts(&self) -> Vec<u64> {
        let mut attempts = self.close_attempts.lock().clone();
        attempts.sort_unstable();
        attempts
    }

    pub fn closed_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.closed.lock().iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl TicketGateway for MockGateway {
    async fn get_ticket(&self, ticket_id: u64) -> Result<Ticket> {
        if self.unauthorized.lock().contains(&ticket_id) {
            return Err(AppError::Authentication("bad api key".to_string()));
        }
        self.tickets
            .lock()
            .get(&ticket_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Ticket {}", ticket_id)))
    }

    async fn close_ticket(&self, ticket_id: u64, reason: &str) -> Result<()> {
        self.close_attempts.lock().push(ticket_id);
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_close.lock().contains(&ticket_id) {
            return Err(AppError::Gateway(format!("close of {} rejected", ticket_id)));
        }
        self.closed.lock().push((ticket_id, reason.to_string()));
        Ok(())
    }
}

#[async_trait]
impl HelpdeskApi for MockGateway {
    async fn check_connection(&self) -> bool {
        !*self.disconnected.lock()
    }

    async fn recent_tickets(&self, limit: usize) -> Result<Vec<TicketSummary>> {
        if *self.disconnected.lock() {
            return Err(AppError::Gateway("helpdesk unreachable".to_string()));
        }

        let mut tickets: Vec<Ticket> = self.tickets.lock().values().cloned().collect();
        tickets.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(tickets
            .into_iter()
            .take(limit)
            .map(|t| TicketSummary {
                id: t.id,
                subject: t.subject,
                status: t.status,
                priority: t.priority,
                created_at: t.created_at,
            })
            .collect())
    }

    async fn agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.lock().clone())
    }

    async fn update_status(&self, ticket_id: u64, status: TicketStatus) -> Result<()> {
        self.status_updates.lock().push((ticket_id, status));
        Ok(())
    }

    async fn update_priority(&self, ticket_id: u64, priority: TicketPriority) -> Result<()> {
        self.priority_updates.lock().push((ticket_id, priority));
        Ok(())
    }

    async fn add_note(&self, ticket_id: u64, body: &str, private: bool) -> Result<()> {
        self.notes.lock().push((ticket_id, body.to_string(), private));
        Ok(())
    }

    async fn add_reply(&self, ticket_id: u64, body: &str) -> Result<()> {
        self.replies.lock().push((ticket_id, body.to_string()));
        Ok(())
    }
}

/// In-memory store whose writes can be made to fail
#[derive(Default)]
pub struct FailingStore {
    pub inner: InMemoryStore,
    fail_upsert: bool,
    fail_delete: bool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upserts(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_delete = true;
        self
    }
}

#[async_trait]
impl DownAlertStore for FailingStore {
    async fn upsert_down(
        &self,
        ticket_id: u64,
        correlation_key: &str,
        subject: &str,
    ) -> Result<DownAlertRecord> {
        if self.fail_upsert {
            return Err(AppError::Storage("disk full".to_string()));
        }
        self.inner.upsert_down(ticket_id, correlation_key, subject).await
    }

    async fn find_down_by_key(&self, correlation_key: &str) -> Result<Vec<DownAlertRecord>> {
        self.inner.find_down_by_key(correlation_key).await
    }

    async fn delete_by_key(&self, correlation_key: &str) -> Result<Vec<u64>> {
        if self.fail_delete {
            return Err(AppError::Storage("database is locked".to_string()));
        }
        self.inner.delete_by_key(correlation_key).await
    }

    async fn delete_by_ticket_id(&self, ticket_id: u64) -> Result<()> {
        self.inner.delete_by_ticket_id(ticket_id).await
    }

    async fn list_down(&self) -> Result<Vec<DownAlertRecord>> {
        self.inner.list_down().await
    }

    async fn count_down(&self) -> Result<u64> {
        self.inner.count_down().await
    }
}

/// One captured broadcast
#[derive(Debug, Clone)]
pub struct SentBroadcast {
    pub recipients: Vec<RecipientId>,
    pub message: String,
}

/// Notifier that records broadcasts and fails for chosen recipients
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentBroadcast>>,
    failing: Mutex<HashSet<RecipientId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(self, recipient: RecipientId) -> Self {
        self.failing.lock().insert(recipient);
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().iter().map(|b| b.message.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn broadcast(&self, recipients: &[RecipientId], message: &str) -> BroadcastReport {
        self.sent.lock().push(SentBroadcast {
            recipients: recipients.to_vec(),
            message: message.to_string(),
        });

        let failing = self.failing.lock();
        BroadcastReport::new(
            recipients
                .iter()
                .map(|&r| {
                    if failing.contains(&r) {
                        DeliveryOutcome::failed(r, "chat not found")
                    } else {
                        DeliveryOutcome::delivered(r)
                    }
                })
                .collect(),
        )
    }
}
