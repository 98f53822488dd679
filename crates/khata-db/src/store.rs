//! # Store Implementation
//!
//! Implements the khata-core store contracts for [`Database`].
//!
//! Standalone writes need no explicit transaction: stock and balance
//! adjustments are single UPDATE statements (atomic on their own), and
//! `append_transaction` opens its own short transaction for the row plus
//! its items. Multi-step writes go through [`Store::begin`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::DbError;
use crate::pool::Database;
use crate::unit_of_work::SqliteUnitOfWork;
use khata_core::{
    CatalogStore, Customer, CustomerFilter, CustomerPatch, DashboardSummary, LedgerStore,
    NewCustomer, NewProduct, NewTransaction, NewTransactionItem, Product, ProductFilter,
    ProductPatch, Store, StoreError, StoreResult, Transaction, TransactionDetails,
};

fn store_err(err: DbError) -> StoreError {
    StoreError::from(err)
}

#[async_trait]
impl CatalogStore for Database {
    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        self.products().get_by_id(id).await.map_err(store_err)
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.products().list(filter).await.map_err(store_err)
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        self.products().insert(&product).await.map_err(store_err)
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Option<Product>> {
        self.products().update(id, &patch).await.map_err(store_err)
    }

    async fn adjust_stock(&self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
        self.products().adjust_stock(id, delta).await.map_err(store_err)
    }

    async fn delete_product(&self, id: i64) -> StoreResult<()> {
        self.products().delete(id).await.map_err(store_err)
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>> {
        self.customers().get_by_id(id).await.map_err(store_err)
    }

    async fn list_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<Customer>> {
        self.customers().list(filter).await.map_err(store_err)
    }

    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        self.customers().insert(&customer).await.map_err(store_err)
    }

    async fn update_customer(
        &self,
        id: i64,
        patch: CustomerPatch,
    ) -> StoreResult<Option<Customer>> {
        self.customers().update(id, &patch).await.map_err(store_err)
    }

    async fn adjust_customer_balance(&self, id: i64, delta: i64) -> StoreResult<Option<Customer>> {
        self.customers()
            .adjust_balance(id, delta)
            .await
            .map_err(store_err)
    }

    async fn append_transaction(
        &self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction> {
        self.ledger()
            .append(&transaction, &items)
            .await
            .map_err(store_err)
    }

    async fn history(
        &self,
        customer_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<TransactionDetails>> {
        self.ledger()
            .history(customer_id, limit)
            .await
            .map_err(store_err)
    }

    async fn summary(&self, now: DateTime<Utc>) -> StoreResult<DashboardSummary> {
        self.reports().summary(now).await.map_err(store_err)
    }
}

#[async_trait]
impl Store for Database {
    type Work = SqliteUnitOfWork;

    async fn begin(&self) -> StoreResult<SqliteUnitOfWork> {
        let tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| store_err(DbError::from(e)))?;
        debug!("Unit of work started");
        Ok(SqliteUnitOfWork::new(tx))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
