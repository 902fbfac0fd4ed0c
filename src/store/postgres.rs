use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use super::{RecordStore, StoreError};
use crate::classify::Status;
use crate::models::InventoryEvent;

// Timestamps are compared bytewise (`COLLATE "C"`) so the order does not
// depend on the database locale and matches `MemoryStore`.

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS supply_chain_data (
        id              BIGSERIAL PRIMARY KEY,
        entity          TEXT   NOT NULL,
        location        TEXT   NOT NULL,
        inventory_level BIGINT NOT NULL,
        status          TEXT   NOT NULL,
        "timestamp"     TEXT   NOT NULL,
        received_at     TEXT   NOT NULL
    )
"#;

const CREATE_TIMESTAMP_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS supply_chain_data_timestamp_c_idx
    ON supply_chain_data ("timestamp" COLLATE "C" DESC, id DESC)
"#;

const INSERT_EVENT: &str = r#"
    INSERT INTO supply_chain_data
        (entity, location, inventory_level, status, "timestamp", received_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const SELECT_RECENT: &str = r#"
    SELECT entity, location, inventory_level, status, "timestamp", received_at
    FROM supply_chain_data
    ORDER BY "timestamp" COLLATE "C" DESC, id DESC
    LIMIT $1
"#;

/// Postgres-backed store over a single flat `supply_chain_data` table.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    entity: String,
    location: String,
    inventory_level: i64,
    status: String,
    timestamp: String,
    received_at: String,
}

impl TryFrom<EventRow> for InventoryEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<Status>()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        Ok(Self {
            entity: row.entity,
            location: row.location,
            inventory_level: row.inventory_level,
            status,
            timestamp: row.timestamp,
            received_at: row.received_at,
        })
    }
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the table and its sort index if they are not there yet.
    /// Idempotent bootstrap, not a migration.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_TIMESTAMP_INDEX).execute(&self.pool).await?;

        debug!("supply_chain_data schema ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_one(&self, event: &InventoryEvent) -> Result<(), StoreError> {
        sqlx::query(INSERT_EVENT)
            .bind(&event.entity)
            .bind(&event.location)
            .bind(event.inventory_level)
            .bind(event.status.as_str())
            .bind(&event.timestamp)
            .bind(&event.received_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<InventoryEvent>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, EventRow>(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(InventoryEvent::try_from).collect()
    }
}
