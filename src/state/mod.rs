pub mod factory;
pub mod recipients;
pub mod sessions;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_store, create_store};
pub use recipients::RecipientRegistry;
pub use sessions::{SessionRegistry, UserId, UserSettings};
pub use sled_store::SledStore;
pub use store::*;

use crate::error::Result;
use crate::models::DownAlertRecord;
use async_trait::async_trait;

/// Persistence for open "down" alert records
///
/// Records are keyed by ticket id with a secondary lookup by correlation key.
/// Each call is atomic on its own; callers that find and then delete are not
/// protected against interleaved upserts.
#[async_trait]
pub trait DownAlertStore: Send + Sync {
    /// Insert or replace the record for `ticket_id`
    async fn upsert_down(
        &self,
        ticket_id: u64,
        correlation_key: &str,
        subject: &str,
    ) -> Result<DownAlertRecord>;

    /// All current records for a correlation key (order not guaranteed)
    async fn find_down_by_key(&self, correlation_key: &str) -> Result<Vec<DownAlertRecord>>;

    /// Remove every record for a correlation key, returning the removed ticket ids
    async fn delete_by_key(&self, correlation_key: &str) -> Result<Vec<u64>>;

    /// Remove a single record; absent ids are a no-op
    async fn delete_by_ticket_id(&self, ticket_id: u64) -> Result<()>;

    /// Every open record, newest first
    async fn list_down(&self) -> Result<Vec<DownAlertRecord>>;

    /// Number of open records
    async fn count_down(&self) -> Result<u64>;
}
