//! # Domain Types
//!
//! Core domain types used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐    │
//! │  │    Product      │   │    Customer     │   │    Transaction      │    │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │    │
//! │  │  id             │   │  id             │   │  id (monotonic)     │    │
//! │  │  price          │   │  credit_balance │   │  customer_id?       │    │
//! │  │  stock_quantity │   │  (udhar, ≥ 0)   │   │  kind: sale|payment │    │
//! │  │  min_stock_level│   │                 │   │  amount             │    │
//! │  └────────▲────────┘   └────────▲────────┘   └─────────┬───────────┘    │
//! │           │ weak ref            │ weak ref             │ owns           │
//! │           │                     └──────────────────────┤                │
//! │           │                                            ▼                │
//! │           │                               ┌─────────────────────┐       │
//! │           └───────────────────────────────│  TransactionItem    │       │
//! │                                           │  quantity           │       │
//! │                                           │  unit_price (frozen)│       │
//! │                                           │  subtotal           │       │
//! │                                           └─────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All currency fields are `i64` minor units (paise). The serde shape is
//! camelCase because these types are the JSON contract of the web client.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown at the counter.
    pub name: String,

    /// Optional stock keeping unit.
    pub sku: Option<String>,

    /// Shelf category (Kirana, Medical, Stationery, ...).
    pub category: String,

    /// Current unit price in minor units.
    pub price: i64,

    /// On-hand quantity in the stocking unit. May go negative after a sale.
    pub stock_quantity: i64,

    /// Reorder threshold.
    pub min_stock_level: i64,

    /// Stocking unit label (pcs, kg, ltr, ...).
    pub unit: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price)
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }

    /// Oversold: more units were sold than were on hand.
    #[inline]
    pub fn is_oversold(&self) -> bool {
        self.stock_quantity < 0
    }
}

/// Fields for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub category: String,
    pub price: i64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_min_stock_level")]
    pub min_stock_level: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_min_stock_level() -> i64 {
    crate::DEFAULT_MIN_STOCK_LEVEL
}

fn default_unit() -> String {
    crate::DEFAULT_UNIT.to_string()
}

/// Partial product update.
///
/// Stock is never set to an absolute value here: `stock_delta` is applied
/// relative to whatever the store holds at write time (restocking is a
/// positive delta).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub min_stock_level: Option<i64>,
    pub unit: Option<String>,
    pub stock_delta: Option<i64>,
}

impl ProductPatch {
    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.min_stock_level.is_none()
            && self.unit.is_none()
            && self.stock_delta.is_none()
    }
}

/// Catalog query predicates, pushed down to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    /// Case-insensitive substring on name or SKU.
    pub search: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Only products at or below their reorder threshold.
    pub low_stock: bool,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer who may carry a running credit balance (udhar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Amount currently owed, in minor units. Never negative.
    pub credit_balance: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the outstanding balance as Money.
    #[inline]
    pub fn credit(&self) -> Money {
        Money::from_minor(self.credit_balance)
    }

    /// Returns true when the customer owes the shop anything.
    #[inline]
    pub fn has_credit(&self) -> bool {
        self.credit_balance > 0
    }
}

/// Fields for creating a customer. The balance always starts at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial customer update. The credit balance is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Customer query predicates, pushed down to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerFilter {
    /// Case-insensitive substring on name, or substring on phone.
    pub search: Option<String>,
    /// Only customers with a balance above zero.
    pub has_credit: bool,
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// What a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TransactionKind {
    /// Goods sold, possibly partly on credit.
    Sale,
    /// Money received against a credit balance.
    Payment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Payment => "payment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was tendered, or how a payment arrived.
///
/// `Credit` is only meaningful for sales: it means "put it on the tab".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Upi,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Credit => "credit",
        }
    }

    /// Money changes hands at the counter (cash or UPI).
    #[inline]
    pub fn is_tendered(&self) -> bool {
        !matches!(self, PaymentMethod::Credit)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "credit" | "udhar" => Ok(PaymentMethod::Credit),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An append-only ledger row: a sale or a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    pub id: i64,

    /// Absent for anonymous walk-in sales paid in full.
    pub customer_id: Option<i64>,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Total in minor units. For a sale, the sum of its item subtotals.
    pub amount: i64,

    pub payment_method: PaymentMethod,

    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount)
    }

    #[inline]
    pub fn is_sale(&self) -> bool {
        self.kind == TransactionKind::Sale
    }
}

/// A sale line, frozen at the unit price agreed at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionItem {
    pub id: i64,
    pub transaction_id: i64,
    /// Weak reference: the product may since have been deleted.
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: i64,
    /// Always `quantity * unit_price`.
    pub subtotal: i64,
}

/// A transaction expanded with its items and resolved customer, for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
    pub customer: Option<Customer>,
}

/// Write model for a ledger row. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub customer_id: Option<i64>,
    pub kind: TransactionKind,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Write model for a sale line. The subtotal is computed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransactionItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: i64,
}

impl NewTransactionItem {
    /// `quantity * unit_price`, or `None` on overflow.
    #[inline]
    pub fn subtotal(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One line of a sale request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: i64,
}

/// A request to bill a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequest {
    pub items: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    /// Existing customer; takes precedence over walk-in fields.
    #[serde(default)]
    pub customer_id: Option<i64>,
    /// Walk-in customer name; a new customer is created when given.
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Explicit amount paid now; the remainder goes on credit.
    #[serde(default)]
    pub amount_paid: Option<i64>,
}

impl SaleRequest {
    /// Creates a request with no customer and no explicit amount paid.
    pub fn new(items: Vec<SaleLine>, payment_method: PaymentMethod) -> Self {
        SaleRequest {
            items,
            payment_method,
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            amount_paid: None,
        }
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn walk_in(mut self, name: impl Into<String>, phone: Option<String>) -> Self {
        self.customer_name = Some(name.into());
        self.customer_phone = phone;
        self
    }

    pub fn paid(mut self, amount_paid: i64) -> Self {
        self.amount_paid = Some(amount_paid);
        self
    }
}

/// A request to record money received against a customer's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentRequest {
    pub customer_id: i64,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Reporting
// =============================================================================

/// Dashboard aggregates. All money fields are minor units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardSummary {
    pub total_low_stock: i64,
    /// Sum of all customer credit balances.
    pub total_receivables: i64,
    pub today_sales: i64,
    pub this_month_sales: i64,
}

/// Half-open `[start, end)` UTC ranges used for the dashboard sales figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesWindows {
    pub today: (DateTime<Utc>, DateTime<Utc>),
    pub this_month: (DateTime<Utc>, DateTime<Utc>),
}

impl SalesWindows {
    /// Day and calendar month containing `now`, both in UTC.
    pub fn containing(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let month_start = today - Duration::days(i64::from(today.day0()));

        let midnight = |d: chrono::NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));

        SalesWindows {
            today: (midnight(today), midnight(today + Duration::days(1))),
            this_month: (midnight(month_start), midnight(month_start + Months::new(1))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
