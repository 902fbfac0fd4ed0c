//! The append-only record store behind the ingestion and dashboard endpoints.
//!
//! Handlers only see [`RecordStore`]; the concrete backend is picked once at
//! startup and injected through [`crate::AppState`].

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::InventoryEvent;

pub use memory::MemoryStore;
pub use postgres::PgRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(sqlx::Error),

    #[error("stored record is malformed: {0}")]
    Malformed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Connection-level failures become [`StoreError::Unavailable`]; the rest stay
/// database errors.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record. Either the whole record is stored or nothing is.
    async fn insert_one(&self, event: &InventoryEvent) -> Result<(), StoreError>;

    /// Up to `limit` records ordered by `timestamp` descending. Records with
    /// equal timestamps come back newest insert first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<InventoryEvent>, StoreError>;
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn pool_and_io_failures_are_unavailable() {
        for err in [
            sqlx::Error::PoolTimedOut,
            sqlx::Error::PoolClosed,
            sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")),
        ] {
            let mapped = StoreError::from(err);
            assert!(matches!(mapped, StoreError::Unavailable(_)), "{mapped:?}");
            assert!(mapped.to_string().starts_with("store unavailable:"));
        }
    }

    #[test]
    fn query_failures_stay_database_errors() {
        let mapped = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
