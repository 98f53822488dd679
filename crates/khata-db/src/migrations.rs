//! # Schema Migrations
//!
//! `migrations/sqlite/*.sql` is embedded at compile time and applied in
//! filename order when a [`Database`](crate::Database) opens. sqlx records
//! each applied file in `_sqlx_migrations`; a file whose checksum changed
//! after being applied fails start-up, so schema changes go in a new file.
//!
//! ```text
//! 001_initial_schema.sql   products, customers, transactions, transaction_items
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(applied as usize, MIGRATOR.migrations.len());
    }
}
