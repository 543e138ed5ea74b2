pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::processing::{EventDispatcher, WebhookLog};
use crate::state::DownAlertStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub store: Arc<dyn DownAlertStore>,
    pub webhook_log: Arc<WebhookLog>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        store: Arc<dyn DownAlertStore>,
        webhook_log: Arc<WebhookLog>,
    ) -> Self {
        Self {
            dispatcher,
            store,
            webhook_log,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
