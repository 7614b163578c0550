//! Append-only record of lookup attempts.
//!
//! Recording is best effort: [`Store::initialize`] and [`Store::append`] log and
//! count their failures instead of returning them, so an unreachable database
//! never changes what a client sees.

use crate::config::DatabaseConfig;
use anyhow::{Result, bail};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

pub mod migrator;
pub mod repositories;

pub use crate::entities::queries::Model as QueryRecord;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    settings: DatabaseConfig,
}

impl Store {
    /// Builds the connection pool without touching the database; connections
    /// are opened on first use.
    pub async fn new(settings: &DatabaseConfig) -> Result<Self> {
        let db_url = settings.connection_url();

        if let Some(path_str) = db_url.strip_prefix("sqlite:")
            && !path_str.starts_with(":memory:")
        {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(settings.max_connections)
            .min_connections(0)
            .connect_timeout(settings.connect_timeout())
            .acquire_timeout(settings.connect_timeout())
            .idle_timeout(Duration::from_secs(300))
            .connect_lazy(true)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        Ok(Self {
            conn,
            settings: settings.clone(),
        })
    }

    /// Ensures the database and the `queries` table exist.
    pub async fn initialize(&self) {
        match self.try_initialize().await {
            Ok(()) => info!("Query store ready"),
            Err(e) => {
                error!(error = %e, "Error during database initialization");
                metrics::counter!("query_log_failures_total", "operation" => "initialize")
                    .increment(1);
            }
        }
    }

    pub async fn try_initialize(&self) -> Result<()> {
        use sea_orm_migration::MigratorTrait;

        if self.settings.manages_database() {
            self.ensure_database().await?;
        }

        migrator::Migrator::up(&self.conn, None).await?;
        Ok(())
    }

    async fn ensure_database(&self) -> Result<()> {
        if !self.settings.has_valid_name() {
            bail!("Refusing to create database with name '{}'", self.settings.name);
        }

        let mut opt = ConnectOptions::new(self.settings.server_url());
        opt.max_connections(1)
            .connect_timeout(self.settings.connect_timeout())
            .sqlx_logging(false);

        let server = Database::connect(opt).await?;
        let backend = server.get_database_backend();
        server
            .execute(Statement::from_string(
                backend,
                format!("CREATE DATABASE IF NOT EXISTS `{}`", self.settings.name),
            ))
            .await?;
        server.close().await?;

        debug!(database = %self.settings.name, "Database ensured");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn query_repo(&self) -> repositories::queries::QueryRepository {
        repositories::queries::QueryRepository::new(self.conn.clone())
    }

    /// Records one lookup attempt. Failures are logged and counted, never returned.
    pub async fn append(&self, query_data: &serde_json::Value, raw_response: &str) {
        match self.try_append(query_data, raw_response).await {
            Ok(id) => debug!(query_id = id, "Query recorded"),
            Err(e) => {
                error!(error = %e, "Error logging query to database");
                metrics::counter!("query_log_failures_total", "operation" => "append")
                    .increment(1);
            }
        }
    }

    pub async fn try_append(&self, query_data: &serde_json::Value, raw_response: &str) -> Result<i32> {
        self.query_repo().add(query_data, raw_response).await
    }

    /// Most recent records first.
    pub async fn recent_queries(&self, limit: u64) -> Result<Vec<QueryRecord>> {
        self.query_repo().recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store() -> Store {
        let settings = DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            ..DatabaseConfig::default()
        };
        let store = Store::new(&settings).await.unwrap();
        store.try_initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = memory_store().await;
        store.try_initialize().await.unwrap();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let store = memory_store().await;
        let body = json!({"caseType": "Civil Suit", "caseNumber": "12", "filingYear": "2021"});

        let first = store.try_append(&body, "<html>one</html>").await.unwrap();
        let second = store.try_append(&body, "<html>one</html>").await.unwrap();
        assert!(second > first);

        let records = store.recent_queries(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second);
        assert_eq!(records[1].id, first);
        assert_eq!(records[0].query_data, body);
        assert_eq!(records[0].raw_response.as_deref(), Some("<html>one</html>"));
    }

    #[tokio::test]
    async fn timestamp_comes_from_column_default() {
        let store = memory_store().await;
        store.try_append(&json!({"caseNumber": "1"}), "").await.unwrap();

        let records = store.recent_queries(1).await.unwrap();
        let skew = chrono::Utc::now().naive_utc() - records[0].timestamp;
        assert!(skew.num_seconds().abs() < 60, "timestamp {}", records[0].timestamp);
    }

    #[tokio::test]
    async fn recent_queries_respects_limit() {
        let store = memory_store().await;
        for n in 0..5 {
            store
                .try_append(&json!({"caseNumber": n.to_string()}), "")
                .await
                .unwrap();
        }

        let records = store.recent_queries(3).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].query_data["caseNumber"], "4");
    }

    #[tokio::test]
    async fn append_without_table_does_not_fail_caller() {
        let settings = DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            ..DatabaseConfig::default()
        };
        let store = Store::new(&settings).await.unwrap();

        // No migrations ran, so the insert fails inside append and is swallowed.
        store.append(&json!({"caseNumber": "1"}), "").await;
        assert!(store.try_append(&json!({"caseNumber": "1"}), "").await.is_err());
    }
}
