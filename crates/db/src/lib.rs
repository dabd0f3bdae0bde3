use std::{str::FromStr, time::Duration};

use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;

/// Owns the connection pool of the relational store.
#[derive(Clone)]
pub struct DBService {
    pub pool: SqlitePool,
}

impl DBService {
    /// Connects to `database_url` and applies pending migrations.
    pub async fn new(database_url: &str) -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        info!(database_url = %redact(database_url), "Database ready");
        Ok(DBService { pool })
    }

    /// Private in-memory database with migrations applied.
    ///
    /// A single connection that never expires keeps the database alive for
    /// the lifetime of the pool.
    pub async fn in_memory() -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(&pool).await?;
        Ok(DBService { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }
}

/// Opens a transaction that takes the write lock up front.
///
/// A deferred transaction that reads before it writes cannot wait out a
/// concurrent writer under WAL and fails with `SQLITE_BUSY`; `BEGIN IMMEDIATE`
/// waits on the busy timeout instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Strips query parameters, which may carry credentials, from a URL before logging it.
fn redact(database_url: &str) -> &str {
    database_url.split('?').next().unwrap_or(database_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_drops_query() {
        assert_eq!(redact("sqlite://herd.db?mode=rwc"), "sqlite://herd.db");
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_in_memory_applies_migrations() {
        let db = DBService::in_memory().await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('animals', 'herds') ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["animals", "herds"]);
    }

    #[tokio::test]
    async fn test_write_transaction_rolls_back_on_drop() {
        let db = DBService::in_memory().await.unwrap();
        {
            let mut tx = begin_write(&db.pool).await.unwrap();
            sqlx::query("INSERT INTO herds (id, name) VALUES (?, 'North')")
                .bind(uuid::Uuid::new_v4())
                .execute(&mut *tx)
                .await
                .unwrap();
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM herds")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
