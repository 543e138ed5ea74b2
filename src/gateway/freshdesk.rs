use crate::error::{AppError, Result};
use crate::gateway::{HelpdeskApi, TicketGateway};
use crate::models::{Agent, Ticket, TicketPriority, TicketStatus, TicketSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// Freshdesk REST API v2 client
#[derive(Clone)]
pub struct FreshdeskClient {
    base_url: String,
    api_key: String,
    client: Client,
}

/// Ticket as returned by Freshdesk
#[derive(Debug, Deserialize)]
struct FreshdeskTicket {
    id: Option<u64>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    description_text: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    custom_fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FreshdeskAgent {
    id: u64,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    contact: Option<FreshdeskContact>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FreshdeskContact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl FreshdeskTicket {
    fn into_ticket(self) -> Result<Ticket> {
        let id = self
            .id
            .ok_or_else(|| AppError::Gateway("Invalid ticket response: missing id".to_string()))?;

        let customer_email = self
            .custom_fields
            .as_ref()
            .and_then(|fields| fields.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(self.email)
            .unwrap_or_else(|| "N/A".to_string());

        Ok(Ticket {
            id,
            subject: self.subject.unwrap_or_default(),
            description: self
                .description_text
                .or(self.description)
                .unwrap_or_default(),
            status: self.status.map_or(TicketStatus::Unknown, TicketStatus::from_code),
            priority: self
                .priority
                .map_or(TicketPriority::Unknown, TicketPriority::from_code),
            created_at: self.created_at,
            updated_at: self.updated_at,
            customer_email,
        })
    }
}

impl FreshdeskAgent {
    fn into_agent(self) -> Agent {
        let (contact_name, contact_email) = match self.contact {
            Some(contact) => (contact.name, contact.email),
            None => (None, None),
        };

        Agent {
            id: self.id,
            name: self.name.or(contact_name).unwrap_or_else(|| "Unknown".to_string()),
            email: self.email.or(contact_email).unwrap_or_default(),
            available: self.available,
        }
    }
}

/// Unwrap `{"<field>": {...}}` responses, falling back to the bare body
fn unwrap_object(body: Value, field: &str) -> Value {
    match body {
        Value::Object(mut map) if map.get(field).map_or(false, Value::is_object) => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Accept either a bare array or `{"<field>": [...]}`
fn unwrap_list(body: Value, field: &str) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

impl FreshdeskClient {
    /// Create a client for `https://<domain>/api/v2`
    pub fn new(domain: &str, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/');
        Self::with_base_url(format!("https://{}/api/v2", domain), api_key, timeout_secs)
    }

    /// Create a client against an explicit API base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.api_key, Some("X"))
            .header("Content-Type", "application/json")
    }

    /// Send a request and decode the JSON body, mapping HTTP failures
    async fn execute(&self, request: RequestBuilder, context: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Gateway(format!("{}: request timed out", context))
            } else {
                AppError::Gateway(format!("{}: {}", context, e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| {
                AppError::Gateway(format!("{}: invalid response body: {}", context, e))
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(context.to_string()));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Authentication(format!(
                "{}: Freshdesk rejected the API key",
                context
            )));
        }

        Err(AppError::Gateway(format!(
            "{}: Freshdesk returned status {}: {}",
            context,
            status,
            if body.is_empty() { "No response body" } else { body.as_str() }
        )))
    }
}

#[async_trait]
impl TicketGateway for FreshdeskClient {
    async fn get_ticket(&self, ticket_id: u64) -> Result<Ticket> {
        let context = format!("Ticket {}", ticket_id);
        let body = self
            .execute(
                self.request(reqwest::Method::GET, &format!("/tickets/{}", ticket_id)),
                &context,
            )
            .await
            .map_err(|e| {
                error!(ticket_id, error = %e, "Error fetching ticket");
                e
            })?;

        let raw: FreshdeskTicket = serde_json::from_value(unwrap_object(body, "ticket"))
            .map_err(|e| AppError::Gateway(format!("Invalid ticket response for {}: {}", ticket_id, e)))?;

        raw.into_ticket()
    }

    async fn close_ticket(&self, ticket_id: u64, reason: &str) -> Result<()> {
        self.add_note(ticket_id, reason, true).await?;
        self.update_status(ticket_id, TicketStatus::Closed).await?;

        info!(ticket_id, reason, "Ticket closed");
        Ok(())
    }
}

#[async_trait]
impl HelpdeskApi for FreshdeskClient {
    async fn check_connection(&self) -> bool {
        let request = self
            .request(reqwest::Method::GET, "/agents")
            .query(&[("per_page", "1")]);

        match self.execute(request, "Status check").await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Freshdesk status check failed");
                false
            }
        }
    }

    async fn recent_tickets(&self, limit: usize) -> Result<Vec<TicketSummary>> {
        let per_page = limit.to_string();
        let request = self.request(reqwest::Method::GET, "/tickets").query(&[
            ("per_page", per_page.as_str()),
            ("order_by", "created_at"),
            ("order_type", "desc"),
        ]);

        let body = self.execute(request, "Ticket list").await?;

        let tickets = unwrap_list(body, "tickets")
            .into_iter()
            .filter_map(|value| {
                let raw: FreshdeskTicket = serde_json::from_value(value).ok()?;
                raw.into_ticket().ok()
            })
            .map(|t| TicketSummary {
                id: t.id,
                subject: t.subject,
                status: t.status,
                priority: t.priority,
                created_at: t.created_at,
            })
            .collect::<Vec<_>>();

        debug!(count = tickets.len(), "Fetched recent tickets");
        Ok(tickets)
    }

    async fn agents(&self) -> Result<Vec<Agent>> {
        let request = self
            .request(reqwest::Method::GET, "/agents")
            .query(&[("per_page", "100")]);

        let body = self.execute(request, "Agent list").await?;

        Ok(unwrap_list(body, "agents")
            .into_iter()
            .filter_map(|value| serde_json::from_value::<FreshdeskAgent>(value).ok())
            .map(FreshdeskAgent::into_agent)
            .collect())
    }

    async fn update_status(&self, ticket_id: u64, status: TicketStatus) -> Result<()> {
        let code = status
            .code()
            .ok_or_else(|| AppError::Validation(format!("Cannot set status {}", status)))?;

        let request = self
            .request(reqwest::Method::PUT, &format!("/tickets/{}", ticket_id))
            .json(&json!({ "status": code }));

        self.execute(request, &format!("Ticket {}", ticket_id)).await?;
        info!(ticket_id, status = %status, "Ticket status updated");
        Ok(())
    }

    async fn update_priority(&self, ticket_id: u64, priority: TicketPriority) -> Result<()> {
        let code = priority
            .code()
            .ok_or_else(|| AppError::Validation(format!("Cannot set priority {}", priority)))?;

        let request = self
            .request(reqwest::Method::PUT, &format!("/tickets/{}", ticket_id))
            .json(&json!({ "priority": code }));

        self.execute(request, &format!("Ticket {}", ticket_id)).await?;
        info!(ticket_id, priority = %priority, "Ticket priority updated");
        Ok(())
    }

    async fn add_note(&self, ticket_id: u64, body: &str, private: bool) -> Result<()> {
        let request = self
            .request(reqwest::Method::POST, &format!("/tickets/{}/notes", ticket_id))
            .json(&json!({ "body": body, "private": private }));

        self.execute(request, &format!("Ticket {}", ticket_id)).await?;
        info!(ticket_id, private, "Note added to ticket");
        Ok(())
    }

    async fn add_reply(&self, ticket_id: u64, body: &str) -> Result<()> {
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/tickets/{}/conversations", ticket_id),
            )
            .json(&json!({ "body": body, "body_html": format!("<p>{}</p>", body) }));

        self.execute(request, &format!("Ticket {}", ticket_id)).await?;
        info!(ticket_id, "Reply added to ticket");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_domain() {
        let client = FreshdeskClient::new("acme.freshdesk.com", "key", 10).unwrap();
        assert_eq!(client.base_url(), "https://acme.freshdesk.com/api/v2");

        let client = FreshdeskClient::new("https://acme.freshdesk.com/", "key", 10).unwrap();
        assert_eq!(client.base_url(), "https://acme.freshdesk.com/api/v2");
    }

    #[test]
    fn test_unwrap_object_accepts_both_shapes() {
        let wrapped = json!({ "ticket": { "id": 7 } });
        assert_eq!(unwrap_object(wrapped, "ticket"), json!({ "id": 7 }));

        let bare = json!({ "id": 7, "subject": "x" });
        assert_eq!(unwrap_object(bare.clone(), "ticket"), bare);
    }

    #[test]
    fn test_unwrap_list_accepts_both_shapes() {
        assert_eq!(unwrap_list(json!([1, 2]), "tickets").len(), 2);
        assert_eq!(unwrap_list(json!({ "tickets": [1] }), "tickets").len(), 1);
        assert!(unwrap_list(json!({ "other": [] }), "tickets").is_empty());
    }

    #[test]
    fn test_ticket_conversion() {
        let raw: FreshdeskTicket = serde_json::from_value(json!({
            "id": 41305,
            "subject": "Node-A: STATE - DOWN",
            "description_text": "plain",
            "description": "<p>html</p>",
            "status": 2,
            "priority": 4,
            "created_at": "2024-03-01T10:00:00Z",
            "custom_fields": { "email": "ops@example.com" }
        }))
        .unwrap();

        let ticket = raw.into_ticket().unwrap();
        assert_eq!(ticket.id, 41305);
        assert_eq!(ticket.description, "plain");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Urgent);
        assert_eq!(ticket.customer_email, "ops@example.com");
    }

    #[test]
    fn test_ticket_without_id_is_gateway_error() {
        let raw: FreshdeskTicket = serde_json::from_value(json!({ "subject": "x" })).unwrap();
        assert!(matches!(raw.into_ticket(), Err(AppError::Gateway(_))));
    }
}
