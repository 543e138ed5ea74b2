use crate::error::Result;
use crate::models::DownAlertRecord;
use crate::state::DownAlertStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

/// In-memory down-alert store (for development and testing)
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<DashMap<u64, DownAlertRecord>>,
    key_index: Arc<DashMap<String, HashSet<u64>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unindex(&self, correlation_key: &str, ticket_id: u64) {
        let emptied = match self.key_index.get_mut(correlation_key) {
            Some(mut ids) => {
                ids.remove(&ticket_id);
                ids.is_empty()
            }
            None => false,
        };
        if emptied {
            self.key_index
                .remove_if(correlation_key, |_, ids| ids.is_empty());
        }
    }
}

#[async_trait]
impl DownAlertStore for InMemoryStore {
    async fn upsert_down(
        &self,
        ticket_id: u64,
        correlation_key: &str,
        subject: &str,
    ) -> Result<DownAlertRecord> {
        let record =
            DownAlertRecord::new(ticket_id, correlation_key.to_string(), subject.to_string());
        record.validate()?;

        if let Some(previous) = self.records.insert(ticket_id, record.clone()) {
            if previous.correlation_key != correlation_key {
                self.unindex(&previous.correlation_key, ticket_id);
            }
        }

        self.key_index
            .entry(correlation_key.to_string())
            .or_default()
            .insert(ticket_id);

        tracing::debug!(ticket_id, correlation_key, "Down alert stored");
        Ok(record)
    }

    async fn find_down_by_key(&self, correlation_key: &str) -> Result<Vec<DownAlertRecord>> {
        let ids: Vec<u64> = match self.key_index.get(correlation_key) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Ok(Vec::new()),
        };

        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|entry| entry.clone()))
            .collect())
    }

    async fn delete_by_key(&self, correlation_key: &str) -> Result<Vec<u64>> {
        let ids = match self.key_index.remove(correlation_key) {
            Some((_, ids)) => ids,
            None => return Ok(Vec::new()),
        };

        let mut removed: Vec<u64> = ids
            .into_iter()
            .filter(|id| self.records.remove(id).is_some())
            .collect();
        removed.sort_unstable();

        tracing::debug!(correlation_key, removed = removed.len(), "Down alerts deleted");
        Ok(removed)
    }

    async fn delete_by_ticket_id(&self, ticket_id: u64) -> Result<()> {
        if let Some((_, record)) = self.records.remove(&ticket_id) {
            self.unindex(&record.correlation_key, ticket_id);
            tracing::debug!(ticket_id, "Down alert deleted");
        }
        Ok(())
    }

    async fn list_down(&self) -> Result<Vec<DownAlertRecord>> {
        let mut records: Vec<DownAlertRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn count_down(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_find() {
        let store = InMemoryStore::new();

        store
            .upsert_down(100, "Node-A (1.1.1.1)", "Node-A (1.1.1.1): STATE - DOWN")
            .await
            .unwrap();

        let found = store.find_down_by_key("Node-A (1.1.1.1)").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticket_id, 100);
        assert_eq!(found[0].subject, "Node-A (1.1.1.1): STATE - DOWN");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_ticket() {
        let store = InMemoryStore::new();

        store.upsert_down(7, "Node-B", "Node-B: DOWN").await.unwrap();
        store.upsert_down(7, "Node-B", "Node-B: STATE DOWN again").await.unwrap();

        let found = store.find_down_by_key("Node-B").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "Node-B: STATE DOWN again");
        assert_eq!(store.count_down().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_moving_key_drops_old_index() {
        let store = InMemoryStore::new();

        store.upsert_down(7, "old", "old: DOWN").await.unwrap();
        store.upsert_down(7, "new", "new: DOWN").await.unwrap();

        assert!(store.find_down_by_key("old").await.unwrap().is_empty());
        assert_eq!(store.find_down_by_key("new").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_key_reports_ids() {
        let store = InMemoryStore::new();

        store.upsert_down(201, "core-sw", "core-sw: DOWN").await.unwrap();
        store.upsert_down(200, "core-sw", "core-sw: DOWN").await.unwrap();
        store.upsert_down(300, "edge", "edge: DOWN").await.unwrap();

        let removed = store.delete_by_key("core-sw").await.unwrap();
        assert_eq!(removed, vec![200, 201]);
        assert!(store.find_down_by_key("core-sw").await.unwrap().is_empty());
        assert_eq!(store.count_down().await.unwrap(), 1);

        assert!(store.delete_by_key("core-sw").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_ticket_id() {
        let store = InMemoryStore::new();

        store.upsert_down(1, "k", "k: DOWN").await.unwrap();
        store.upsert_down(2, "k", "k: DOWN").await.unwrap();

        store.delete_by_ticket_id(1).await.unwrap();
        store.delete_by_ticket_id(999).await.unwrap();

        let found = store.find_down_by_key("k").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticket_id, 2);
    }
}
