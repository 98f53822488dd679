//! # SQLite Unit of Work
//!
//! A [`UnitOfWork`] backed by one sqlx transaction.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store::begin()  ──►  pool.begin()  ──►  BEGIN                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  adjust_stock / create_customer / get_customer /                        │
//! │  adjust_customer_balance /                                              │
//! │  append_transaction   (all on the same connection)                      │
//! │       │                                                                 │
//! │       ├── commit()    ──►  COMMIT    every write visible at once        │
//! │       ├── rollback()  ──►  ROLLBACK                                     │
//! │       └── dropped     ──►  ROLLBACK  (error path, cancelled future)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of every billing unit of work is a write, so the
//! connection takes SQLite's write lock up front and concurrent units of
//! work queue on `busy_timeout` instead of failing a lock upgrade.

use async_trait::async_trait;
use sqlx::Sqlite;
use tracing::debug;

use crate::error::DbError;
use crate::repository::{customer, ledger, product};
use khata_core::{
    Customer, NewCustomer, NewTransaction, NewTransactionItem, Product, StoreError, StoreResult,
    Transaction, UnitOfWork,
};

/// An open SQLite transaction used as a unit of work.
#[derive(Debug)]
pub struct SqliteUnitOfWork {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl SqliteUnitOfWork {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        SqliteUnitOfWork { tx }
    }
}

fn store_err(err: impl Into<DbError>) -> StoreError {
    StoreError::from(err.into())
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn adjust_stock(&mut self, product_id: i64, delta: i64) -> StoreResult<Option<Product>> {
        product::adjust_stock(&mut *self.tx, product_id, delta)
            .await
            .map_err(store_err)
    }

    async fn create_customer(&mut self, new: NewCustomer) -> StoreResult<Customer> {
        customer::insert(&mut *self.tx, &new).await.map_err(store_err)
    }

    async fn get_customer(&mut self, customer_id: i64) -> StoreResult<Option<Customer>> {
        customer::get_by_id(&mut *self.tx, customer_id)
            .await
            .map_err(store_err)
    }

    async fn adjust_customer_balance(
        &mut self,
        customer_id: i64,
        delta: i64,
    ) -> StoreResult<Option<Customer>> {
        customer::adjust_balance(&mut *self.tx, customer_id, delta)
            .await
            .map_err(store_err)
    }

    async fn append_transaction(
        &mut self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction> {
        ledger::append(&mut self.tx, &transaction, &items)
            .await
            .map_err(store_err)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_err)?;
        debug!("Unit of work committed");
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_err)?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
