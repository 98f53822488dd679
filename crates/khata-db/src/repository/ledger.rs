//! # Ledger Repository
//!
//! The append-only transaction log: sales, payments and sale line items.
//!
//! ## Append Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append(conn, NewTransaction, [NewTransactionItem])                     │
//! │       │                                                                 │
//! │       ├── sale?    Σ quantity × unit_price must equal amount            │
//! │       ├── payment? must carry no items                                  │
//! │       │                                                                 │
//! │       ├── INSERT INTO transactions ... RETURNING *                      │
//! │       └── INSERT INTO transaction_items (subtotal computed here) × N    │
//! │                                                                         │
//! │  All statements run on ONE connection: inside a unit of work, or a      │
//! │  short sqlx transaction opened by `LedgerRepository::append`.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this module updates or deletes a ledger row.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::{
    Customer, NewTransaction, NewTransactionItem, Transaction, TransactionDetails,
    TransactionItem, TransactionKind,
};

const TRANSACTION_COLUMNS: &str =
    "id, customer_id, kind, amount, payment_method, notes, created_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, quantity, unit_price, subtotal";

/// Repository for the transaction log.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends a transaction and its items in their own sqlx transaction.
    pub async fn append(
        &self,
        transaction: &NewTransaction,
        items: &[NewTransactionItem],
    ) -> DbResult<Transaction> {
        let mut tx = self.pool.begin().await?;
        let recorded = append(&mut tx, transaction, items).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");

        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    pub async fn items_for(&self, transaction_id: i64) -> DbResult<Vec<TransactionItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY id"
        );

        let items = sqlx::query_as::<_, TransactionItem>(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Newest-first history, optionally for one customer.
    ///
    /// The customer predicate is part of the query, so `limit` counts only
    /// that customer's transactions. Items and customers are then loaded
    /// with one `IN (...)` query each.
    pub async fn history(
        &self,
        customer_id: Option<i64>,
        limit: i64,
    ) -> DbResult<Vec<TransactionDetails>> {
        debug!(?customer_id, limit, "Loading transaction history");

        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE (?1 IS NULL OR customer_id = ?1)
            ORDER BY id DESC
            LIMIT ?2
            "#
        );

        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let mut items_by_tx = self.items_by_transaction(&transactions).await?;
        let customers = self.customers_for(&transactions).await?;

        let details = transactions
            .into_iter()
            .map(|transaction| {
                let items = items_by_tx.remove(&transaction.id).unwrap_or_default();
                let customer = transaction
                    .customer_id
                    .and_then(|id| customers.get(&id).cloned());
                TransactionDetails {
                    transaction,
                    items,
                    customer,
                }
            })
            .collect();

        Ok(details)
    }

    async fn items_by_transaction(
        &self,
        transactions: &[Transaction],
    ) -> DbResult<HashMap<i64, Vec<TransactionItem>>> {
        if !transactions.iter().any(Transaction::is_sale) {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id IN ("
        ));
        let mut ids = qb.separated(", ");
        for t in transactions.iter().filter(|t| t.is_sale()) {
            ids.push_bind(t.id);
        }
        ids.push_unseparated(") ORDER BY id");

        let items: Vec<TransactionItem> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut grouped: HashMap<i64, Vec<TransactionItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.transaction_id).or_default().push(item);
        }
        Ok(grouped)
    }

    /// Resolves the customers referenced by a page of history.
    ///
    /// Deleted customers are simply absent from the map.
    async fn customers_for(&self, transactions: &[Transaction]) -> DbResult<HashMap<i64, Customer>> {
        let ids: BTreeSet<i64> = transactions.iter().filter_map(|t| t.customer_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, phone, address, credit_balance, created_at FROM customers WHERE id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in &ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(")");

        let customers: Vec<Customer> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(customers.into_iter().map(|c| (c.id, c)).collect())
    }
}

/// Persists a transaction row and all of its item rows on one connection.
///
/// The caller owns the surrounding transaction; this function never commits.
/// Subtotals are computed here and never taken from the caller.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    transaction: &NewTransaction,
    items: &[NewTransactionItem],
) -> DbResult<Transaction> {
    let subtotals = check_amounts(transaction, items)?;

    let sql = format!(
        r#"
        INSERT INTO transactions (customer_id, kind, amount, payment_method, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    );

    let recorded = sqlx::query_as::<_, Transaction>(&sql)
        .bind(transaction.customer_id)
        .bind(transaction.kind)
        .bind(transaction.amount)
        .bind(transaction.payment_method)
        .bind(transaction.notes.as_deref())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    for (item, subtotal) in items.iter().zip(subtotals) {
        sqlx::query(
            r#"
            INSERT INTO transaction_items (transaction_id, product_id, quantity, unit_price, subtotal)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(recorded.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(subtotal)
        .execute(&mut *conn)
        .await?;
    }

    debug!(
        transaction_id = recorded.id,
        kind = %recorded.kind,
        items = items.len(),
        "Appended transaction"
    );

    Ok(recorded)
}

/// Enforces the ledger invariants before anything is written.
///
/// - a sale's amount is the sum of its item subtotals
/// - a payment has no items
fn check_amounts(transaction: &NewTransaction, items: &[NewTransactionItem]) -> DbResult<Vec<i64>> {
    let subtotals = items
        .iter()
        .map(|item| {
            item.subtotal()
                .ok_or_else(|| DbError::ConstraintViolation("item subtotal overflows".to_string()))
        })
        .collect::<DbResult<Vec<i64>>>()?;

    match transaction.kind {
        TransactionKind::Sale => {
            let sum = subtotals
                .iter()
                .try_fold(0i64, |acc, s| acc.checked_add(*s))
                .ok_or_else(|| DbError::ConstraintViolation("sale total overflows".to_string()))?;
            if sum != transaction.amount {
                return Err(DbError::ConstraintViolation(format!(
                    "sale amount {} does not match item subtotals {}",
                    transaction.amount, sum
                )));
            }
        }
        TransactionKind::Payment => {
            if !items.is_empty() {
                return Err(DbError::ConstraintViolation(
                    "a payment cannot have line items".to_string(),
                ));
            }
        }
    }

    Ok(subtotals)
}

// =============================================================================
// Unit Tests
// =============================================================================
