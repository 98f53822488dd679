//! # Store Contracts
//!
//! The seam between the billing engine and storage. khata-core only defines
//! the traits; khata-db implements them over SQLite and khata-billing ships an
//! in-memory implementation for tests.
//!
//! ## Contract Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Store                                      │
//! │                                                                         │
//! │   ┌───────────────────────┐        ┌───────────────────────────────┐    │
//! │   │     CatalogStore      │        │         LedgerStore           │    │
//! │   │  get / list / create  │        │  customers: get/list/create   │    │
//! │   │  update (stock_delta) │        │  adjust_customer_balance (≥0) │    │
//! │   │  adjust_stock (±N)    │        │  append_transaction (+items)  │    │
//! │   │  delete (idempotent)  │        │  history / summary            │    │
//! │   └───────────────────────┘        └───────────────────────────────┘    │
//! │                                                                         │
//! │   begin() ──► UnitOfWork                                                │
//! │               ├── adjust_stock                                          │
//! │               ├── create_customer                                       │
//! │               ├── adjust_customer_balance                               │
//! │               ├── append_transaction                                    │
//! │               ├── commit(self)   all writes visible together            │
//! │               └── rollback(self) / Drop   none of them visible          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Relative Adjustments
//! Stock and credit balance are only ever changed by a signed delta applied
//! inside the store. Callers never read a value, compute a new total and
//! write it back: two concurrent sales of the same product would lose one
//! decrement that way.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    Customer, CustomerFilter, CustomerPatch, DashboardSummary, NewCustomer, NewProduct,
    NewTransaction, NewTransactionItem, Product, ProductFilter, ProductPatch, Transaction,
    TransactionDetails,
};

// =============================================================================
// Catalog Store
// =============================================================================

/// Product records: price, stock and reorder threshold.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>>;

    /// Lists products matching every predicate in the filter, ordered by name.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;

    /// Applies a partial update. `stock_delta` is added to the current stock.
    ///
    /// Returns `None` if the product does not exist.
    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Option<Product>>;

    /// Adds `delta` to the on-hand quantity and stamps `updated_at`.
    ///
    /// The result may be negative. Returns `None` if the product does not exist.
    async fn adjust_stock(&self, id: i64, delta: i64) -> StoreResult<Option<Product>>;

    /// Deletes a product. Deleting an absent id is not an error.
    ///
    /// Historical line items keep their product id and stay readable.
    async fn delete_product(&self, id: i64) -> StoreResult<()>;
}

// =============================================================================
// Ledger Store
// =============================================================================

/// Customers with their credit balance, and the append-only transaction log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>>;

    /// Lists customers matching every predicate in the filter, ordered by name.
    async fn list_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<Customer>>;

    /// Creates a customer with a zero balance.
    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer>;

    /// Updates name, phone or address. The balance cannot be edited here.
    async fn update_customer(&self, id: i64, patch: CustomerPatch)
        -> StoreResult<Option<Customer>>;

    /// Adds `delta` to the credit balance, clamping the result at 0.
    async fn adjust_customer_balance(&self, id: i64, delta: i64) -> StoreResult<Option<Customer>>;

    /// Persists a transaction and all of its items as one indivisible write.
    ///
    /// Item subtotals are computed by the store as `quantity * unit_price`.
    async fn append_transaction(
        &self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction>;

    /// Newest first. The customer filter is applied before the limit.
    async fn history(
        &self,
        customer_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<TransactionDetails>>;

    /// Dashboard aggregates. Day and month boundaries are taken in UTC.
    async fn summary(&self, now: DateTime<Utc>) -> StoreResult<DashboardSummary>;
}

// =============================================================================
// Unit of Work
// =============================================================================

/// A transactional scope over both stores.
///
/// Writes issued through a unit of work are invisible to other callers until
/// [`UnitOfWork::commit`] returns `Ok`. Dropping an uncommitted unit of work
/// discards every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn adjust_stock(&mut self, product_id: i64, delta: i64) -> StoreResult<Option<Product>>;

    async fn create_customer(&mut self, customer: NewCustomer) -> StoreResult<Customer>;

    /// Reads a customer as this unit of work sees it. After the first write
    /// no other unit of work can change the row until this one ends.
    async fn get_customer(&mut self, customer_id: i64) -> StoreResult<Option<Customer>>;

    async fn adjust_customer_balance(
        &mut self,
        customer_id: i64,
        delta: i64,
    ) -> StoreResult<Option<Customer>>;

    async fn append_transaction(
        &mut self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction>;

    /// Makes every write visible at once. On error nothing was applied.
    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// A complete store: both contracts plus transactional scopes.
#[async_trait]
pub trait Store: CatalogStore + LedgerStore + 'static {
    type Work: UnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Work>;
}
