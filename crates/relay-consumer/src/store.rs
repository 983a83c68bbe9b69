//! Employee store
//!
//! [`RecordStore`] is what the consume loop writes through. [`PgRecordStore`]
//! backs it with a single-connection Postgres pool: the consumer writes one
//! record at a time, so a second connection would never be used.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_common::record::EmployeeRecord;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Idempotent DDL for the employee table
pub const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS employee (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        age INTEGER,
        location VARCHAR(255),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO employee (name, age, location)
    VALUES ($1, $2, $3)
    RETURNING id
"#;

/// A persisted employee row
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredRow {
    pub id: i32,
    pub name: String,
    pub age: Option<i32>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Destination for validated employee records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record, returning the generated identifier
    async fn insert(&self, record: &EmployeeRecord) -> Result<i64, StoreError>;
}

/// Postgres-backed employee store
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Connect using `config`. Fails fast; there is no retry on the store side.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let target = config.target();
        let options = config
            .connect_options()
            .map_err(|e| StoreError::Connect {
                target: target.clone(),
                source: sqlx::Error::Configuration(e.to_string().into()),
            })?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                target: target.clone(),
                source,
            })?;

        info!(database = %target, "Connected to database");
        Ok(Self { pool })
    }

    /// Create the employee table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Schema)?;

        info!("Database setup completed");
        Ok(())
    }

    /// All stored rows, oldest first
    pub async fn rows(&self) -> Result<Vec<StoredRow>, StoreError> {
        let rows = sqlx::query_as::<_, StoredRow>(
            "SELECT id, name, age, location, created_at FROM employee ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Close the pool, waiting for the connection to be returned
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &EmployeeRecord) -> Result<i64, StoreError> {
        let id: i32 = sqlx::query_scalar(INSERT_SQL)
            .bind(&record.name)
            .bind(record.age)
            .bind(record.location.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Insert)?;

        Ok(i64::from(id))
    }
}
