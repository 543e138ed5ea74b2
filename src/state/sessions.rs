use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Chat user identifier (Telegram user id)
pub type UserId = i64;

/// Per-user notification preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub notifications: bool,
    pub filter_status: Vec<String>,
    pub filter_priority: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: true,
            filter_status: Vec::new(),
            filter_priority: Vec::new(),
        }
    }
}

/// Per-user chat state: settings and the ticket currently being edited
#[derive(Clone, Default)]
pub struct SessionRegistry {
    settings: Arc<DashMap<UserId, UserSettings>>,
    current_ticket: Arc<DashMap<UserId, u64>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create default settings for a user unless they already exist
    pub fn ensure_settings(&self, user_id: UserId) -> UserSettings {
        self.settings.entry(user_id).or_default().clone()
    }

    pub fn settings(&self, user_id: UserId) -> Option<UserSettings> {
        self.settings.get(&user_id).map(|s| s.clone())
    }

    /// Users with settings; ids double as private-chat ids
    pub fn known_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.settings.iter().map(|e| *e.key()).collect();
        users.sort_unstable();
        users
    }

    pub fn select_ticket(&self, user_id: UserId, ticket_id: u64) {
        self.current_ticket.insert(user_id, ticket_id);
    }

    pub fn current_ticket(&self, user_id: UserId) -> Option<u64> {
        self.current_ticket.get(&user_id).map(|t| *t)
    }
}
