//! # Report Repository
//!
//! Read-only dashboard aggregates. Every figure is one SQL aggregate; no
//! table is loaded into memory.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use khata_core::{DashboardSummary, SalesWindows};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the dashboard summary as seen at `now`.
    ///
    /// ```text
    /// total_low_stock   = COUNT(products WHERE stock_quantity <= min_stock_level)
    /// total_receivables = SUM(customers.credit_balance)
    /// today_sales       = SUM(sale amounts in [00:00 today, 00:00 tomorrow))   UTC
    /// this_month_sales  = SUM(sale amounts in [1st of month, 1st of next))     UTC
    /// ```
    pub async fn summary(&self, now: DateTime<Utc>) -> DbResult<DashboardSummary> {
        let windows = SalesWindows::containing(now);

        let total_low_stock: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE stock_quantity <= min_stock_level",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_receivables: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(credit_balance), 0) FROM customers")
                .fetch_one(&self.pool)
                .await?;

        let today_sales = self.sales_between(windows.today).await?;
        let this_month_sales = self.sales_between(windows.this_month).await?;

        let summary = DashboardSummary {
            total_low_stock,
            total_receivables,
            today_sales,
            this_month_sales,
        };
        debug!(?summary, "Dashboard summary computed");
        Ok(summary)
    }

    async fn sales_between(&self, (start, end): (DateTime<Utc>, DateTime<Utc>)) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM transactions
            WHERE kind = 'sale' AND created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
