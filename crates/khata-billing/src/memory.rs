//! # In-Memory Store
//!
//! A complete [`Store`] kept in process memory, for tests and demos.
//!
//! ## Concurrency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Arc<tokio::sync::Mutex<Inner>>                                         │
//! │                                                                         │
//! │  reads / standalone writes:  lock → read or mutate → unlock             │
//! │                                                                         │
//! │  begin():  lock_owned() ──► MemoryUnitOfWork { guard, snapshot }        │
//! │            │                                                            │
//! │            │  writes go straight to the guarded state; nobody else      │
//! │            │  can observe them while the guard is held                  │
//! │            ▼                                                            │
//! │  commit():   forget the snapshot, release the guard                     │
//! │  rollback() / Drop:  restore the snapshot, release the guard            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Units of work are serialised by the mutex (tokio's mutex is FIFO), which
//! gives every pair of sales a serial order.
//!
//! ## Fault Injection
//! [`MemoryStore::fail_on`] arms a one-shot [`FailPoint`]. The next unit of
//! work reaching that step fails with `StoreError::Unavailable`, which lets
//! tests prove that earlier writes in the same unit of work are rolled back.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use khata_core::{
    CatalogStore, Customer, CustomerFilter, CustomerPatch, DashboardSummary, LedgerStore,
    NewCustomer, NewProduct, NewTransaction, NewTransactionItem, Product, ProductFilter,
    ProductPatch, SalesWindows, Store, StoreError, StoreResult, Transaction, TransactionDetails,
    TransactionItem, TransactionKind, UnitOfWork,
};

// =============================================================================
// Fault Injection
// =============================================================================

/// A step at which the next unit of work can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    AdjustStock,
    CreateCustomer,
    AdjustBalance,
    AppendTransaction,
    Commit,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Default)]
struct State {
    products: BTreeMap<i64, Product>,
    customers: BTreeMap<i64, Customer>,
    transactions: Vec<Transaction>,
    items: Vec<TransactionItem>,
    last_product_id: i64,
    last_customer_id: i64,
    last_transaction_id: i64,
    last_item_id: i64,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    fail_point: Option<FailPoint>,
}

impl Inner {
    /// Fires (and disarms) the fail point if it matches `step`.
    fn trip(&mut self, step: FailPoint) -> StoreResult<()> {
        if self.fail_point == Some(step) {
            self.fail_point = None;
            debug!(?step, "Injected store failure");
            return Err(StoreError::Unavailable(format!(
                "injected failure at {:?}",
                step
            )));
        }
        Ok(())
    }
}

fn add_stock(stock: i64, delta: i64) -> StoreResult<i64> {
    stock
        .checked_add(delta)
        .ok_or_else(|| StoreError::Failed("stock quantity overflows".to_string()))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl State {
    fn list_products(&self, filter: &ProductFilter) -> Vec<Product> {
        let search = filter.search.as_deref().map(str::trim);
        let mut products: Vec<Product> = self
            .products
            .values()
            .filter(|p| match search {
                Some(s) => {
                    contains_ci(&p.name, s) || p.sku.as_deref().is_some_and(|sku| contains_ci(sku, s))
                }
                None => true,
            })
            .filter(|p| filter.category.as_deref().map_or(true, |c| p.category == c))
            .filter(|p| !filter.low_stock || p.is_low_stock())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        products
    }

    fn create_product(&mut self, new: NewProduct) -> Product {
        self.last_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: self.last_product_id,
            name: new.name,
            sku: new.sku,
            category: new.category,
            price: new.price,
            stock_quantity: new.stock_quantity,
            min_stock_level: new.min_stock_level,
            unit: new.unit,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(product.id, product.clone());
        product
    }

    fn update_product(&mut self, id: i64, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let Some(product) = self.products.get_mut(&id) else {
            return Ok(None);
        };
        // Checked before any field changes so a failed patch leaves the row intact.
        let stock = match patch.stock_delta {
            Some(delta) => add_stock(product.stock_quantity, delta)?,
            None => product.stock_quantity,
        };
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(sku) = patch.sku {
            product.sku = Some(sku);
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(level) = patch.min_stock_level {
            product.min_stock_level = level;
        }
        if let Some(unit) = patch.unit {
            product.unit = unit;
        }
        product.stock_quantity = stock;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    fn adjust_stock(&mut self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
        let Some(product) = self.products.get_mut(&id) else {
            return Ok(None);
        };
        product.stock_quantity = add_stock(product.stock_quantity, delta)?;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    fn list_customers(&self, filter: &CustomerFilter) -> Vec<Customer> {
        let search = filter.search.as_deref().map(str::trim);
        let mut customers: Vec<Customer> = self
            .customers
            .values()
            .filter(|c| match search {
                Some(s) => {
                    contains_ci(&c.name, s) || c.phone.as_deref().is_some_and(|p| p.contains(s))
                }
                None => true,
            })
            .filter(|c| !filter.has_credit || c.has_credit())
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        customers
    }

    fn create_customer(&mut self, new: NewCustomer) -> Customer {
        self.last_customer_id += 1;
        let customer = Customer {
            id: self.last_customer_id,
            name: new.name,
            phone: new.phone,
            address: new.address,
            credit_balance: 0,
            created_at: Utc::now(),
        };
        self.customers.insert(customer.id, customer.clone());
        customer
    }

    fn update_customer(&mut self, id: i64, patch: CustomerPatch) -> Option<Customer> {
        let customer = self.customers.get_mut(&id)?;
        if let Some(name) = patch.name {
            customer.name = name;
        }
        if let Some(phone) = patch.phone {
            customer.phone = Some(phone);
        }
        if let Some(address) = patch.address {
            customer.address = Some(address);
        }
        Some(customer.clone())
    }

    fn adjust_balance(&mut self, id: i64, delta: i64) -> StoreResult<Option<Customer>> {
        let Some(customer) = self.customers.get_mut(&id) else {
            return Ok(None);
        };
        let balance = customer
            .credit_balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::Failed("credit balance overflows".to_string()))?;
        customer.credit_balance = balance.max(0);
        Ok(Some(customer.clone()))
    }

    fn append_transaction(
        &mut self,
        new: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction> {
        let mut subtotals = Vec::with_capacity(items.len());
        for item in &items {
            let subtotal = item
                .subtotal()
                .ok_or_else(|| StoreError::Failed("item subtotal overflows".to_string()))?;
            subtotals.push(subtotal);
        }

        match new.kind {
            TransactionKind::Sale => {
                let sum: Option<i64> = subtotals.iter().try_fold(0i64, |acc, s| acc.checked_add(*s));
                if sum != Some(new.amount) {
                    return Err(StoreError::Failed(format!(
                        "sale amount {} does not match item subtotals",
                        new.amount
                    )));
                }
            }
            TransactionKind::Payment if !items.is_empty() => {
                return Err(StoreError::Failed(
                    "a payment cannot have line items".to_string(),
                ));
            }
            TransactionKind::Payment => {}
        }

        self.last_transaction_id += 1;
        let transaction = Transaction {
            id: self.last_transaction_id,
            customer_id: new.customer_id,
            kind: new.kind,
            amount: new.amount,
            payment_method: new.payment_method,
            notes: new.notes,
            created_at: Utc::now(),
        };

        for (item, subtotal) in items.into_iter().zip(subtotals) {
            self.last_item_id += 1;
            self.items.push(TransactionItem {
                id: self.last_item_id,
                transaction_id: transaction.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal,
            });
        }

        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    fn history(&self, customer_id: Option<i64>, limit: i64) -> Vec<TransactionDetails> {
        let limit = usize::try_from(limit).unwrap_or(0);

        let page: Vec<&Transaction> = self
            .transactions
            .iter()
            .rev()
            .filter(|t| customer_id.map_or(true, |id| t.customer_id == Some(id)))
            .take(limit)
            .collect();

        let mut items_by_tx: HashMap<i64, Vec<TransactionItem>> = HashMap::new();
        for item in &self.items {
            items_by_tx
                .entry(item.transaction_id)
                .or_default()
                .push(item.clone());
        }

        page.into_iter()
            .map(|t| TransactionDetails {
                transaction: t.clone(),
                items: items_by_tx.remove(&t.id).unwrap_or_default(),
                customer: t.customer_id.and_then(|id| self.customers.get(&id).cloned()),
            })
            .collect()
    }

    fn summary(&self, now: DateTime<Utc>) -> DashboardSummary {
        let windows = SalesWindows::containing(now);
        let sales_between = |(start, end): (DateTime<Utc>, DateTime<Utc>)| -> i64 {
            self.transactions
                .iter()
                .filter(|t| t.is_sale() && t.created_at >= start && t.created_at < end)
                .map(|t| t.amount)
                .sum()
        };

        DashboardSummary {
            total_low_stock: self.products.values().filter(|p| p.is_low_stock()).count() as i64,
            total_receivables: self.customers.values().map(|c| c.credit_balance).sum(),
            today_sales: sales_between(windows.today),
            this_month_sales: sales_between(windows.this_month),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory implementation of every store contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot failure for the next unit of work reaching `step`.
    pub async fn fail_on(&self, step: FailPoint) {
        self.inner.lock().await.fail_point = Some(step);
    }

    /// Number of ledger rows, for assertions in tests.
    pub async fn transaction_count(&self) -> usize {
        self.inner.lock().await.state.transactions.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.inner.lock().await.state.products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        Ok(self.inner.lock().await.state.list_products(filter))
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        Ok(self.inner.lock().await.state.create_product(product))
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Option<Product>> {
        self.inner.lock().await.state.update_product(id, patch)
    }

    async fn adjust_stock(&self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
        self.inner.lock().await.state.adjust_stock(id, delta)
    }

    async fn delete_product(&self, id: i64) -> StoreResult<()> {
        self.inner.lock().await.state.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.inner.lock().await.state.customers.get(&id).cloned())
    }

    async fn list_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<Customer>> {
        Ok(self.inner.lock().await.state.list_customers(filter))
    }

    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        Ok(self.inner.lock().await.state.create_customer(customer))
    }

    async fn update_customer(
        &self,
        id: i64,
        patch: CustomerPatch,
    ) -> StoreResult<Option<Customer>> {
        Ok(self.inner.lock().await.state.update_customer(id, patch))
    }

    async fn adjust_customer_balance(&self, id: i64, delta: i64) -> StoreResult<Option<Customer>> {
        self.inner.lock().await.state.adjust_balance(id, delta)
    }

    async fn append_transaction(
        &self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction> {
        self.inner
            .lock()
            .await
            .state
            .append_transaction(transaction, items)
    }

    async fn history(
        &self,
        customer_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<TransactionDetails>> {
        Ok(self.inner.lock().await.state.history(customer_id, limit))
    }

    async fn summary(&self, now: DateTime<Utc>) -> StoreResult<DashboardSummary> {
        Ok(self.inner.lock().await.state.summary(now))
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Work = MemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<MemoryUnitOfWork> {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        guard.trip(FailPoint::Begin)?;
        let snapshot = guard.state.clone();
        Ok(MemoryUnitOfWork {
            guard,
            snapshot: Some(snapshot),
        })
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// Exclusive access to the store state, with a snapshot to restore on rollback.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Inner>,
    /// `Some` until committed.
    snapshot: Option<State>,
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.guard.state = snapshot;
            debug!("Memory unit of work rolled back");
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn adjust_stock(&mut self, product_id: i64, delta: i64) -> StoreResult<Option<Product>> {
        self.guard.trip(FailPoint::AdjustStock)?;
        self.guard.state.adjust_stock(product_id, delta)
    }

    async fn create_customer(&mut self, customer: NewCustomer) -> StoreResult<Customer> {
        self.guard.trip(FailPoint::CreateCustomer)?;
        Ok(self.guard.state.create_customer(customer))
    }

    async fn get_customer(&mut self, customer_id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.guard.state.customers.get(&customer_id).cloned())
    }

    async fn adjust_customer_balance(
        &mut self,
        customer_id: i64,
        delta: i64,
    ) -> StoreResult<Option<Customer>> {
        self.guard.trip(FailPoint::AdjustBalance)?;
        self.guard.state.adjust_balance(customer_id, delta)
    }

    async fn append_transaction(
        &mut self,
        transaction: NewTransaction,
        items: Vec<NewTransactionItem>,
    ) -> StoreResult<Transaction> {
        self.guard.trip(FailPoint::AppendTransaction)?;
        self.guard.state.append_transaction(transaction, items)
    }

    async fn commit(mut self) -> StoreResult<()> {
        self.guard.trip(FailPoint::Commit)?;
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
