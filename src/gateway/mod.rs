//! Helpdesk ticket system access.

pub mod freshdesk;

pub use freshdesk::FreshdeskClient;

use crate::error::Result;
use crate::models::{Agent, Ticket, TicketPriority, TicketStatus, TicketSummary};
use async_trait::async_trait;

/// Minimal ticket operations needed by the correlation engine and dispatcher
#[async_trait]
pub trait TicketGateway: Send + Sync {
    /// Fetch one ticket by id
    async fn get_ticket(&self, ticket_id: u64) -> Result<Ticket>;

    /// Close a ticket, recording `reason` as a private note
    async fn close_ticket(&self, ticket_id: u64, reason: &str) -> Result<()>;
}

/// Full helpdesk surface used by the chat bot
#[async_trait]
pub trait HelpdeskApi: TicketGateway {
    /// Whether the helpdesk API answers with the configured credentials
    async fn check_connection(&self) -> bool;

    /// Most recently created tickets, newest first
    async fn recent_tickets(&self, limit: usize) -> Result<Vec<TicketSummary>>;

    async fn agents(&self) -> Result<Vec<Agent>>;

    async fn update_status(&self, ticket_id: u64, status: TicketStatus) -> Result<()>;

    async fn update_priority(&self, ticket_id: u64, priority: TicketPriority) -> Result<()>;

    async fn add_note(&self, ticket_id: u64, body: &str, private: bool) -> Result<()>;

    async fn add_reply(&self, ticket_id: u64, body: &str) -> Result<()>;
}
