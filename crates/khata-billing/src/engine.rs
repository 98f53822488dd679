//! # Billing Engine
//!
//! Sales and payments, each as one all-or-nothing unit of work.
//!
//! ## CreateSale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Validation phase (no lock held, abandoning it has no effect)           │
//! │  ├── plan_sale(request)           totals, credit delta, stock deltas    │
//! │  ├── get_product(id) for each     unknown → NotFound, nothing written   │
//! │  └── get_customer(id) if named    unknown → NotFound, nothing written   │
//! │                                                                         │
//! │  Commit phase (one UnitOfWork)                                          │
//! │  ├── 1. create walk-in customer   (if the sale names one)               │
//! │  ├── 2. adjust_stock(id, -qty)    per product, ascending id             │
//! │  ├── 3. append_transaction        sale row + line items                 │
//! │  ├── 4. adjust_customer_balance   +credit_delta (if > 0)                │
//! │  └── 5. commit                                                          │
//! │                                                                         │
//! │  Any failure in 1–5 → rollback, then the error is returned.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Policy
//! Stock may go negative. A sale is never blocked on inventory; dropping to
//! or below the reorder threshold is logged, and overselling is logged as a
//! warning.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{BillingError, BillingResult};
use khata_core::billing::{plan_payment, plan_sale, CustomerRef, PaymentPlan, SalePlan};
use khata_core::{PaymentRequest, SaleRequest, Store, Transaction, UnitOfWork};

/// Orchestrates sales and payments over an injected store.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./khata.db")).await?;
/// let engine = BillingEngine::new(db);
///
/// let sale = engine
///     .create_sale(SaleRequest::new(lines, PaymentMethod::Credit).for_customer(1))
///     .await?;
/// ```
#[derive(Debug)]
pub struct BillingEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for BillingEngine<S> {
    fn clone(&self) -> Self {
        BillingEngine {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> BillingEngine<S> {
    pub fn new(store: S) -> Self {
        BillingEngine {
            store: Arc::new(store),
        }
    }

    /// The underlying store, for reads and catalog/customer management.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // CreateSale
    // =========================================================================

    /// Bills a sale: stock, ledger and credit change together or not at all.
    pub async fn create_sale(&self, request: SaleRequest) -> BillingResult<Transaction> {
        let plan = plan_sale(&request)?;
        debug!(
            total = plan.total.minor(),
            amount_paid = plan.amount_paid.minor(),
            credit_delta = plan.credit_delta.minor(),
            lines = plan.lines.len(),
            "Sale planned"
        );

        for product_id in plan.product_ids() {
            if self.store.get_product(product_id).await?.is_none() {
                return Err(BillingError::product_not_found(product_id));
            }
        }

        if let CustomerRef::Existing(customer_id) = plan.customer {
            if self.store.get_customer(customer_id).await?.is_none() {
                return Err(BillingError::customer_not_found(customer_id));
            }
        }

        let mut work = self.store.begin().await?;
        let applied = apply_sale(&mut work, &plan).await;
        let transaction = finish(work, applied).await?;

        info!(
            transaction_id = transaction.id,
            customer_id = ?transaction.customer_id,
            amount = transaction.amount,
            credit_delta = plan.credit_delta.minor(),
            payment_method = %transaction.payment_method,
            "Sale recorded"
        );

        Ok(transaction)
    }

    // =========================================================================
    // RecordPayment
    // =========================================================================

    /// Records money received against a customer's credit balance.
    ///
    /// A payment larger than the balance floors it at zero; the excess is
    /// not kept as an advance.
    pub async fn record_payment(&self, request: PaymentRequest) -> BillingResult<Transaction> {
        let plan = plan_payment(&request)?;

        if self.store.get_customer(plan.customer_id).await?.is_none() {
            return Err(BillingError::customer_not_found(plan.customer_id));
        }

        let mut work = self.store.begin().await?;
        let applied = apply_payment(&mut work, &plan).await;
        let settled = finish(work, applied).await?;

        if settled.outstanding < plan.amount.minor() {
            warn!(
                customer_id = plan.customer_id,
                amount = plan.amount.minor(),
                outstanding = settled.outstanding,
                absorbed = plan.amount.minor() - settled.outstanding,
                "Payment exceeded outstanding balance; balance floored at zero"
            );
        }

        let transaction = settled.transaction;
        info!(
            transaction_id = transaction.id,
            customer_id = plan.customer_id,
            amount = transaction.amount,
            balance = settled.balance,
            "Payment recorded"
        );

        Ok(transaction)
    }
}

// =============================================================================
// Commit Phase
// =============================================================================

/// Commits on success; rolls back on failure and returns the original error.
async fn finish<W: UnitOfWork, T>(work: W, applied: BillingResult<T>) -> BillingResult<T> {
    match applied {
        Ok(value) => {
            work.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = work.rollback().await {
                // The unit of work is gone either way; nothing it wrote is visible.
                warn!(error = %rollback_err, "Rollback failed");
            }
            debug!(error = %err, "Unit of work rolled back");
            Err(err)
        }
    }
}

async fn apply_sale<W: UnitOfWork>(work: &mut W, plan: &SalePlan) -> BillingResult<Transaction> {
    let customer_id = match &plan.customer {
        CustomerRef::Existing(id) => Some(*id),
        CustomerRef::WalkIn(new) => {
            let created = work.create_customer(new.clone()).await?;
            info!(customer_id = created.id, name = %created.name, "Walk-in customer created");
            Some(created.id)
        }
        CustomerRef::Anonymous => None,
    };

    for delta in &plan.stock_deltas {
        let product = work
            .adjust_stock(delta.product_id, delta.delta)
            .await?
            .ok_or_else(|| BillingError::product_not_found(delta.product_id))?;

        if product.is_oversold() {
            warn!(
                product_id = product.id,
                name = %product.name,
                stock = product.stock_quantity,
                "Stock went negative"
            );
        } else if product.is_low_stock() {
            info!(
                product_id = product.id,
                name = %product.name,
                stock = product.stock_quantity,
                min_stock_level = product.min_stock_level,
                "Product at or below reorder level"
            );
        }
    }

    let transaction = work
        .append_transaction(plan.transaction(customer_id), plan.items())
        .await?;

    if plan.credit_delta.is_positive() {
        // plan_sale rejects credit without a customer.
        if let Some(id) = customer_id {
            work.adjust_customer_balance(id, plan.credit_delta.minor())
                .await?
                .ok_or_else(|| BillingError::customer_not_found(id))?;
        }
    }

    Ok(transaction)
}

/// A committed payment with the balance on either side of it.
struct Settlement {
    transaction: Transaction,
    outstanding: i64,
    balance: i64,
}

async fn apply_payment<W: UnitOfWork>(
    work: &mut W,
    plan: &PaymentPlan,
) -> BillingResult<Settlement> {
    // Append first: the write takes the lock before the balance is read.
    let transaction = work.append_transaction(plan.transaction(), Vec::new()).await?;

    let outstanding = work
        .get_customer(plan.customer_id)
        .await?
        .ok_or_else(|| BillingError::customer_not_found(plan.customer_id))?
        .credit_balance;

    let customer = work
        .adjust_customer_balance(plan.customer_id, -plan.amount.minor())
        .await?
        .ok_or_else(|| BillingError::customer_not_found(plan.customer_id))?;

    Ok(Settlement {
        transaction,
        outstanding,
        balance: customer.credit_balance,
    })
}
