use crate::models::RecipientId;
use dashmap::DashSet;
use std::sync::Arc;

/// Chats that registered for broadcasts via `/start`
///
/// Owned by the hosting process and handed to the engine, dispatcher and bot.
#[derive(Clone, Default)]
pub struct RecipientRegistry {
    chats: Arc<DashSet<RecipientId>>,
}

impl RecipientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = RecipientId>>(ids: I) -> Self {
        let registry = Self::new();
        for id in ids {
            registry.register(id);
        }
        registry
    }

    /// Returns true when the chat was not registered before
    pub fn register(&self, chat_id: RecipientId) -> bool {
        self.chats.insert(chat_id)
    }

    pub fn unregister(&self, chat_id: RecipientId) -> bool {
        self.chats.remove(&chat_id).is_some()
    }

    pub fn contains(&self, chat_id: RecipientId) -> bool {
        self.chats.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Snapshot of the registered chats, sorted for stable fan-out order
    pub fn snapshot(&self) -> Vec<RecipientId> {
        let mut ids: Vec<RecipientId> = self.chats.iter().map(|id| *id).collect();
        ids.sort_unstable();
        ids
    }
}
