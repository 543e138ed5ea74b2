use crate::error::{AppError, Result};
use crate::models::DownAlertRecord;
use crate::state::DownAlertStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree,
};
use sled::{Db, IVec, Transactional};
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

type TxResult<T> = std::result::Result<T, ConflictableTransactionError<AppError>>;

/// Persistent down-alert store using the Sled embedded database
///
/// `down_alerts` maps ticket id (big-endian) to a bincode record and
/// `correlation_keys` maps a key to the bincode list of its ticket ids.
/// Every write touches both trees inside one transaction.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    records_tree: sled::Tree,
    keys_tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(&path)
            .map_err(|e| AppError::Storage(format!("Failed to open Sled database: {}", e)))?;

        let records_tree = db
            .open_tree("down_alerts")
            .map_err(|e| AppError::Storage(format!("Failed to open down_alerts tree: {}", e)))?;

        let keys_tree = db.open_tree("correlation_keys").map_err(|e| {
            AppError::Storage(format!("Failed to open correlation_keys tree: {}", e))
        })?;

        tracing::info!("Initialized Sled store at {:?}", path_str);

        Ok(Self {
            db: Arc::new(db),
            records_tree,
            keys_tree,
        })
    }

    fn record_key(ticket_id: u64) -> [u8; 8] {
        ticket_id.to_be_bytes()
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Serialization(format!("Failed to decode record: {}", e)))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| AppError::Serialization(format!("Failed to encode record: {}", e)))
    }

    fn tx_decode<T: DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
        Self::decode(bytes).map_err(ConflictableTransactionError::Abort)
    }

    fn tx_encode<T: serde::Serialize>(value: &T) -> TxResult<Vec<u8>> {
        Self::encode(value).map_err(ConflictableTransactionError::Abort)
    }

    fn tx_read_ids(keys: &TransactionalTree, correlation_key: &str) -> TxResult<Vec<u64>> {
        match keys.get(correlation_key.as_bytes())? {
            Some(bytes) => Self::tx_decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn tx_write_ids(
        keys: &TransactionalTree,
        correlation_key: &str,
        ids: &[u64],
    ) -> TxResult<()> {
        if ids.is_empty() {
            keys.remove(correlation_key.as_bytes())?;
        } else {
            keys.insert(correlation_key.as_bytes(), Self::tx_encode(&ids)?)?;
        }
        Ok(())
    }

    fn tx_unindex(keys: &TransactionalTree, correlation_key: &str, ticket_id: u64) -> TxResult<()> {
        let mut ids = Self::tx_read_ids(keys, correlation_key)?;
        ids.retain(|id| *id != ticket_id);
        Self::tx_write_ids(keys, correlation_key, &ids)
    }

    fn map_tx_error(err: TransactionError<AppError>) -> AppError {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => {
                AppError::Storage(format!("Sled transaction failed: {}", e))
            }
        }
    }

    fn get_record(&self, ticket_id: u64) -> Result<Option<DownAlertRecord>> {
        match self.records_tree.get(Self::record_key(ticket_id)) {
            Ok(Some(bytes)) => Ok(Some(Self::decode(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to get down alert: {}", e))),
        }
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl DownAlertStore for SledStore {
    async fn upsert_down(
        &self,
        ticket_id: u64,
        correlation_key: &str,
        subject: &str,
    ) -> Result<DownAlertRecord> {
        let record =
            DownAlertRecord::new(ticket_id, correlation_key.to_string(), subject.to_string());
        record.validate()?;
        let value = Self::encode(&record)?;
        let id_key = Self::record_key(ticket_id);

        (&self.records_tree, &self.keys_tree)
            .transaction(|(records, keys)| {
                let previous: Option<IVec> = records.insert(&id_key[..], value.clone())?;

                if let Some(bytes) = previous {
                    let previous: DownAlertRecord = Self::tx_decode(&bytes)?;
                    if previous.correlation_key != correlation_key {
                        Self::tx_unindex(keys, &previous.correlation_key, ticket_id)?;
                    }
                }

                let mut ids = Self::tx_read_ids(keys, correlation_key)?;
                if !ids.contains(&ticket_id) {
                    ids.push(ticket_id);
                }
                Self::tx_write_ids(keys, correlation_key, &ids)
            })
            .map_err(Self::map_tx_error)?;

        self.flush().await?;

        tracing::debug!(ticket_id, correlation_key, "Down alert saved to Sled");
        Ok(record)
    }

    async fn find_down_by_key(&self, correlation_key: &str) -> Result<Vec<DownAlertRecord>> {
        let ids: Vec<u64> = match self.keys_tree.get(correlation_key.as_bytes()) {
            Ok(Some(bytes)) => Self::decode(&bytes)?,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to query correlation index: {}",
                    e
                )))
            }
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn delete_by_key(&self, correlation_key: &str) -> Result<Vec<u64>> {
        let removed = (&self.records_tree, &self.keys_tree)
            .transaction(|(records, keys)| {
                let ids = Self::tx_read_ids(keys, correlation_key)?;
                keys.remove(correlation_key.as_bytes())?;

                let mut removed = Vec::with_capacity(ids.len());
                for id in ids {
                    if records.remove(&Self::record_key(id)[..])?.is_some() {
                        removed.push(id);
                    }
                }
                Ok(removed)
            })
            .map_err(Self::map_tx_error)?;

        self.flush().await?;

        tracing::debug!(correlation_key, removed = removed.len(), "Down alerts deleted from Sled");
        Ok(removed)
    }

    async fn delete_by_ticket_id(&self, ticket_id: u64) -> Result<()> {
        let id_key = Self::record_key(ticket_id);

        let existed = (&self.records_tree, &self.keys_tree)
            .transaction(|(records, keys)| match records.remove(&id_key[..])? {
                Some(bytes) => {
                    let record: DownAlertRecord = Self::tx_decode(&bytes)?;
                    Self::tx_unindex(keys, &record.correlation_key, ticket_id)?;
                    Ok(true)
                }
                None => Ok(false),
            })
            .map_err(Self::map_tx_error)?;

        if existed {
            self.flush().await?;
            tracing::debug!(ticket_id, "Down alert deleted from Sled");
        }
        Ok(())
    }

    async fn list_down(&self) -> Result<Vec<DownAlertRecord>> {
        let mut records = Vec::new();

        for result in self.records_tree.iter() {
            let (_, value) = result
                .map_err(|e| AppError::Storage(format!("Failed to iterate down alerts: {}", e)))?;
            records.push(Self::decode::<DownAlertRecord>(&value)?);
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn count_down(&self) -> Result<u64> {
        Ok(self.records_tree.len() as u64)
    }
}
