//! Append-only audit trail for search and ask queries.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::SearchLogRecord;

/// Append-only storage for [`SearchLogRecord`]s. Records are never updated
/// or deleted by the core.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append a record.
    async fn append(&self, record: SearchLogRecord) -> Result<()>;
}

/// In-memory audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<SearchLogRecord>>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of all appended records, oldest first.
    pub async fn records(&self) -> Vec<SearchLogRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: SearchLogRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }
}
