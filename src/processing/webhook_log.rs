use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// One received webhook event, kept for `/webhook/logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLogEntry {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<u64>,
    pub outcome: String,
}

/// Bounded log of recent webhook events; the oldest entry is evicted first
pub struct WebhookLog {
    capacity: usize,
    entries: Mutex<VecDeque<WebhookLogEntry>>,
}

impl WebhookLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(
        &self,
        event_type: impl Into<String>,
        ticket_id: Option<u64>,
        outcome: impl Into<String>,
    ) -> WebhookLogEntry {
        let entry = WebhookLogEntry {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            event_type: event_type.into(),
            ticket_id,
            outcome: outcome.into(),
        };

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());

        entry
    }

    /// The last `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<WebhookLogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = WebhookLog::new(2);
        log.record("ticket.created", Some(1), "notified");
        log.record("ticket.updated", Some(2), "notified");
        log.record("ticket.solved", Some(3), "notified");

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].ticket_id, Some(2));
        assert_eq!(recent[1].ticket_id, Some(3));
    }

    #[test]
    fn test_recent_returns_tail() {
        let log = WebhookLog::new(10);
        for id in 1..=5 {
            log.record("ticket.created", Some(id), "notified");
        }

        let ids: Vec<_> = log.recent(2).iter().filter_map(|e| e.ticket_id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert!(log.recent(0).is_empty());
    }
}
