//! Postgres-backed event store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::resilience::with_timeout;
use crate::store::{EventStore, Result, StoreError};

/// Create a connection pool from configuration.
#[tracing::instrument(skip(config), fields(host = %config.host, database = %config.name))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .application_name("event-collector");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    tracing::debug!("database pool created");
    Ok(pool)
}

/// Inserts events into `{schema}.{table}`.
///
/// The qualifier comes from validated deployment configuration and is
/// formatted into the statement; the payload is always a bound parameter.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
    insert_sql: String,
    table: String,
    timeout: Duration,
}

impl PgEventStore {
    pub fn new(pool: PgPool, schema: &str, table: &str, timeout: Duration) -> Self {
        let table = format!("{schema}.{table}");
        Self {
            pool,
            insert_sql: format!(
                "INSERT INTO {table} (created_at, details) \
                 VALUES (current_timestamp, $1::jsonb) \
                 RETURNING created_at"
            ),
            table,
            timeout,
        }
    }

    /// Create the event table if it does not exist.
    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn ensure_table(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                created_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp, \
                details JSONB NOT NULL\
             )",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        tracing::info!("event table ready");
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, payload: &str) -> Result<DateTime<Utc>> {
        let query = sqlx::query(&self.insert_sql)
            .bind(payload)
            .fetch_one(&self.pool);

        let row = with_timeout(self.timeout, query)
            .await
            .map_err(|elapsed| StoreError::Timeout(elapsed.0))??;

        Ok(row.try_get::<DateTime<Utc>, _>("created_at")?)
    }

    async fn ping(&self) -> Result<()> {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        with_timeout(self.timeout, ping)
            .await
            .map_err(|elapsed| StoreError::Timeout(elapsed.0))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_statement_binds_payload() {
        let pool = PgPoolOptions::new().connect_lazy_with(PgConnectOptions::new());
        let store = PgEventStore::new(pool, "analytics", "event", Duration::from_secs(1));

        assert!(store
            .insert_sql
            .starts_with("INSERT INTO analytics.event (created_at, details)"));
        assert!(store.insert_sql.contains("VALUES (current_timestamp, $1::jsonb)"));
    }
}
