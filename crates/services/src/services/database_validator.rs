//! Startup and health checks that the database schema matches the contracts.

use contracts::{EntitySchema, SCHEMAS};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Checks migrations have run and every contract table carries its columns.
    pub async fn validate(&self) -> Result<SchemaCheck, DatabaseValidationError> {
        let migrations_table_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?
            > 0;

        if !migrations_table_exists {
            warn!("Database not initialized: _sqlx_migrations table does not exist");
            return Ok(SchemaCheck {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                problems: vec!["database has not been migrated".to_string()],
            });
        }

        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;

        let mut problems = Vec::new();
        for schema in SCHEMAS {
            problems.extend(self.validate_table(schema).await?);
        }

        let check = SchemaCheck {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            latest_migration: self.latest_migration().await?,
            problems,
        };
        if check.is_ok() {
            info!(migrations_applied, "Database validation complete");
        } else {
            warn!(problems = ?check.problems, "Database schema does not match contracts");
        }
        Ok(check)
    }

    /// Missing table or columns for one entity, as readable messages.
    pub async fn validate_table(&self, schema: &EntitySchema) -> Result<Vec<String>, DatabaseValidationError> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(schema.table)
                .fetch_all(&self.pool)
                .await?;

        if columns.is_empty() {
            return Ok(vec![format!("table '{}' is missing", schema.table)]);
        }
        Ok(schema
            .columns()
            .into_iter()
            .filter(|column| !columns.iter().any(|c| c == column))
            .map(|column| format!("table '{}' lacks column '{column}'", schema.table))
            .collect())
    }

    pub async fn latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(migration)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCheck {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub problems: Vec<String>,
}

impl SchemaCheck {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.problems.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized, migrations need to be run".to_string()
        } else if !self.problems.is_empty() {
            format!("Database schema problems: {}", self.problems.join(", "))
        } else {
            format!("Database OK, {} migrations applied", self.migrations_applied)
        }
    }
}
