use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw body posted by the Freshdesk automation webhook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: Option<String>,
    /// Freshdesk templates send the id either as a number or a string
    pub ticket_id: Option<Value>,
    #[serde(default)]
    pub changes: Option<TicketChanges>,
}

/// Field changes reported with `ticket.updated`, each as `[old, new]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketChanges {
    pub priority: Option<[Value; 2]>,
    pub status: Option<[Value; 2]>,
    pub responder_id: Option<[Value; 2]>,
}

impl TicketChanges {
    /// Human-readable summary of what changed
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();

        if let Some([old, new]) = &self.priority {
            lines.push(format!(
                "Priority changed: {} → {}",
                value_text(old),
                value_text(new)
            ));
        }
        if let Some([old, new]) = &self.status {
            lines.push(format!(
                "Status changed: {} → {}",
                value_text(old),
                value_text(new)
            ));
        }
        if self.responder_id.is_some() {
            lines.push("Assigned to new agent".to_string());
        }

        if lines.is_empty() {
            "Ticket was updated".to_string()
        } else {
            lines.join("\n")
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "none".to_string(),
        other => other.to_string(),
    }
}

/// Known webhook event kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookEvent {
    TicketCreated { ticket_id: u64 },
    TicketUpdated { ticket_id: u64, changes: TicketChanges },
    TicketSolved { ticket_id: u64 },
    TicketReopened { ticket_id: u64 },
    ConversationCreated { ticket_id: u64 },
    Unknown { event_type: String },
}

impl WebhookEvent {
    /// Build a typed event from the raw payload
    pub fn from_payload(payload: WebhookPayload) -> Result<Self> {
        let event_type = payload
            .event_type
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Missing event_type".to_string()))?;

        let ticket_id = || -> Result<u64> {
            parse_ticket_id(payload.ticket_id.as_ref()).ok_or_else(|| {
                AppError::Validation(format!("Missing or invalid ticket_id for {}", event_type))
            })
        };

        let event = match event_type.as_str() {
            "ticket.created" => WebhookEvent::TicketCreated {
                ticket_id: ticket_id()?,
            },
            "ticket.updated" => WebhookEvent::TicketUpdated {
                ticket_id: ticket_id()?,
                changes: payload.changes.clone().unwrap_or_default(),
            },
            "ticket.solved" => WebhookEvent::TicketSolved {
                ticket_id: ticket_id()?,
            },
            "ticket.reopened" => WebhookEvent::TicketReopened {
                ticket_id: ticket_id()?,
            },
            "conversation.created" => WebhookEvent::ConversationCreated {
                ticket_id: ticket_id()?,
            },
            _ => WebhookEvent::Unknown {
                event_type: event_type.clone(),
            },
        };

        Ok(event)
    }

    /// The wire name of this event kind
    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::TicketCreated { .. } => "ticket.created",
            WebhookEvent::TicketUpdated { .. } => "ticket.updated",
            WebhookEvent::TicketSolved { .. } => "ticket.solved",
            WebhookEvent::TicketReopened { .. } => "ticket.reopened",
            WebhookEvent::ConversationCreated { .. } => "conversation.created",
            WebhookEvent::Unknown { event_type } => event_type,
        }
    }

    pub fn ticket_id(&self) -> Option<u64> {
        match self {
            WebhookEvent::TicketCreated { ticket_id }
            | WebhookEvent::TicketUpdated { ticket_id, .. }
            | WebhookEvent::TicketSolved { ticket_id }
            | WebhookEvent::TicketReopened { ticket_id }
            | WebhookEvent::ConversationCreated { ticket_id } => Some(*ticket_id),
            WebhookEvent::Unknown { .. } => None,
        }
    }
}

fn parse_ticket_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> WebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_event_type_is_validation_error() {
        let result = WebhookEvent::from_payload(payload(json!({ "ticket_id": 1 })));
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = WebhookEvent::from_payload(payload(json!({ "event_type": "  " })));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_known_events() {
        let event =
            WebhookEvent::from_payload(payload(json!({ "event_type": "ticket.created", "ticket_id": 42 })))
                .unwrap();
        assert_eq!(event, WebhookEvent::TicketCreated { ticket_id: 42 });
        assert_eq!(event.event_type(), "ticket.created");

        let event = WebhookEvent::from_payload(payload(
            json!({ "event_type": "ticket.solved", "ticket_id": "#77" }),
        ))
        .unwrap();
        assert_eq!(event.ticket_id(), Some(77));
    }

    #[test]
    fn test_unknown_event_is_recognized() {
        let event =
            WebhookEvent::from_payload(payload(json!({ "event_type": "ticket.merged" }))).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Unknown {
                event_type: "ticket.merged".to_string()
            }
        );
        assert_eq!(event.ticket_id(), None);
    }

    #[test]
    fn test_known_event_requires_ticket_id() {
        let result =
            WebhookEvent::from_payload(payload(json!({ "event_type": "ticket.reopened" })));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_change_description() {
        let changes = TicketChanges {
            priority: Some([json!("Low"), json!("High")]),
            status: Some([json!(2), json!(4)]),
            responder_id: Some([Value::Null, json!(9)]),
        };
        assert_eq!(
            changes.describe(),
            "Priority changed: Low → High\nStatus changed: 2 → 4\nAssigned to new agent"
        );
        assert_eq!(TicketChanges::default().describe(), "Ticket was updated");
    }
}
