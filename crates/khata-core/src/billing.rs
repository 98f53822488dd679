//! # Billing Plans
//!
//! Pure planning for sales and payments: everything the billing engine can
//! decide before it touches a store.
//!
//! ## Where Planning Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CreateSale                                      │
//! │                                                                         │
//! │  SaleRequest ──► plan_sale() ──► SalePlan ──► existence reads ──►       │
//! │                  ▲ THIS MODULE      │          (no lock held)           │
//! │                  │                  │                                   │
//! │                  │ pure, no I/O     ▼                                   │
//! │                  │          ┌───────────────────────────────┐           │
//! │                  │          │ UnitOfWork (commit phase)     │           │
//! │                  │          │  1. create walk-in customer   │           │
//! │                  │          │  2. stock_deltas (relative)   │           │
//! │                  │          │  3. append transaction+items  │           │
//! │                  │          │  4. +credit_delta on balance  │           │
//! │                  │          │  5. commit                    │           │
//! │                  │          └───────────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use khata_core::billing::{plan_sale, CustomerRef};
//! use khata_core::types::{PaymentMethod, SaleLine, SaleRequest};
//!
//! let request = SaleRequest::new(
//!     vec![SaleLine { product_id: 1, quantity: 1, unit_price: 23500 }],
//!     PaymentMethod::Credit,
//! )
//! .for_customer(7);
//!
//! let plan = plan_sale(&request).unwrap();
//! assert_eq!(plan.total.minor(), 23500);
//! assert_eq!(plan.credit_delta.minor(), 23500);
//! assert_eq!(plan.customer, CustomerRef::Existing(7));
//! assert_eq!(plan.note, "Credit added: 23500");
//! ```

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    NewCustomer, NewTransaction, NewTransactionItem, PaymentMethod, PaymentRequest, SaleRequest,
    TransactionKind,
};
use crate::validation::{validate_customer_name, validate_phone, ValidationResult};
use crate::{DEFAULT_PAYMENT_NOTE, FULL_PAYMENT_NOTE};

// =============================================================================
// Plan Types
// =============================================================================

/// Who a sale is billed to, once the request has been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    /// A customer that must already exist.
    Existing(i64),
    /// A walk-in buyer to be created inside the unit of work.
    WalkIn(NewCustomer),
    /// No customer at all. Only valid when nothing goes on credit.
    Anonymous,
}

impl CustomerRef {
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CustomerRef::Anonymous)
    }
}

/// A validated sale line with its recomputed subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Net stock movement for one product across all lines of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: i64,
    /// Always negative for a sale.
    pub delta: i64,
}

/// Everything needed to commit a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
    pub amount_paid: Money,
    /// `total - amount_paid`; never negative.
    pub credit_delta: Money,
    pub payment_method: PaymentMethod,
    pub customer: CustomerRef,
    /// One entry per distinct product, ordered by product id.
    pub stock_deltas: Vec<StockDelta>,
    pub note: String,
}

impl SalePlan {
    /// Distinct product ids referenced by the sale, ascending.
    pub fn product_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.stock_deltas.iter().map(|d| d.product_id)
    }

    /// Write models for the line items, in request order.
    pub fn items(&self) -> Vec<NewTransactionItem> {
        self.lines
            .iter()
            .map(|line| NewTransactionItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price.minor(),
            })
            .collect()
    }

    /// Write model for the sale row, once the customer id is known.
    pub fn transaction(&self, customer_id: Option<i64>) -> NewTransaction {
        NewTransaction {
            customer_id,
            kind: TransactionKind::Sale,
            amount: self.total.minor(),
            payment_method: self.payment_method,
            notes: Some(self.note.clone()),
        }
    }
}

/// Everything needed to commit a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    pub customer_id: i64,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub note: String,
}

impl PaymentPlan {
    pub fn transaction(&self) -> NewTransaction {
        NewTransaction {
            customer_id: Some(self.customer_id),
            kind: TransactionKind::Payment,
            amount: self.amount.minor(),
            payment_method: self.payment_method,
            notes: Some(self.note.clone()),
        }
    }
}

// =============================================================================
// Sale Planning
// =============================================================================

/// Validates a sale request and computes its totals, credit and stock moves.
///
/// ## Rules
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  items empty                       → Required { items }                 │
/// │  quantity <= 0                     → MustBePositive { items[i].quantity}│
/// │  unit_price < 0                    → OutOfRange { items[i].unitPrice }  │
/// │  Σ overflows i64                   → OutOfRange { items }               │
/// │  credit + no customer              → CreditWithoutCustomer              │
/// │  amountPaid ∉ [0, total]           → OutOfRange { amountPaid }          │
/// │  total − paid > 0 + no customer    → CreditWithoutCustomer              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn plan_sale(request: &SaleRequest) -> ValidationResult<SalePlan> {
    if request.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut lines = Vec::with_capacity(request.items.len());
    let mut total = Money::zero();
    let mut per_product: BTreeMap<i64, i64> = BTreeMap::new();

    for (i, item) in request.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("items[{}].quantity", i),
            });
        }
        if item.unit_price < 0 {
            return Err(ValidationError::OutOfRange {
                field: format!("items[{}].unitPrice", i),
                min: 0,
                max: i64::MAX,
            });
        }

        let unit_price = Money::from_minor(item.unit_price);
        let subtotal = unit_price
            .checked_mul_quantity(item.quantity)
            .ok_or_else(total_overflow)?;
        total = total.checked_add(subtotal).ok_or_else(total_overflow)?;

        let sold = per_product.entry(item.product_id).or_insert(0);
        *sold = sold.checked_add(item.quantity).ok_or_else(total_overflow)?;

        lines.push(PlannedLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    let customer = resolve_customer(request)?;

    if customer.is_anonymous() && request.payment_method == PaymentMethod::Credit {
        return Err(ValidationError::CreditWithoutCustomer {
            field: "paymentMethod".to_string(),
        });
    }

    let amount_paid = match request.amount_paid {
        Some(paid) => {
            if paid < 0 || paid > total.minor() {
                return Err(ValidationError::OutOfRange {
                    field: "amountPaid".to_string(),
                    min: 0,
                    max: total.minor(),
                });
            }
            Money::from_minor(paid)
        }
        None if request.payment_method.is_tendered() => total,
        None => Money::zero(),
    };

    // amount_paid <= total, so this cannot go negative.
    let credit_delta = total - amount_paid;

    if credit_delta.is_positive() && customer.is_anonymous() {
        return Err(ValidationError::CreditWithoutCustomer {
            field: "amountPaid".to_string(),
        });
    }

    let stock_deltas = per_product
        .into_iter()
        .map(|(product_id, sold)| StockDelta {
            product_id,
            delta: -sold,
        })
        .collect();

    let note = sale_note(credit_delta);

    Ok(SalePlan {
        lines,
        total,
        amount_paid,
        credit_delta,
        payment_method: request.payment_method,
        customer,
        stock_deltas,
        note,
    })
}

fn total_overflow() -> ValidationError {
    ValidationError::OutOfRange {
        field: "items".to_string(),
        min: 0,
        max: i64::MAX,
    }
}

/// `customerId` wins; otherwise a non-blank walk-in name creates a customer.
fn resolve_customer(request: &SaleRequest) -> ValidationResult<CustomerRef> {
    if let Some(id) = request.customer_id {
        return Ok(CustomerRef::Existing(id));
    }

    let name = request
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let Some(name) = name else {
        return Ok(CustomerRef::Anonymous);
    };

    validate_customer_name(name).map_err(|e| match e {
        ValidationError::TooLong { max, .. } => ValidationError::TooLong {
            field: "customerName".to_string(),
            max,
        },
        other => other,
    })?;

    let phone = request
        .customer_phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    if let Some(phone) = phone {
        validate_phone(phone).map_err(|e| match e {
            ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
                field: "customerPhone".to_string(),
                reason,
            },
            other => other,
        })?;
    }

    Ok(CustomerRef::WalkIn(NewCustomer {
        name: name.to_string(),
        phone: phone.map(str::to_string),
        address: None,
    }))
}

fn sale_note(credit_delta: Money) -> String {
    if credit_delta.is_positive() {
        format!("Credit added: {}", credit_delta.minor())
    } else {
        FULL_PAYMENT_NOTE.to_string()
    }
}

// =============================================================================
// Payment Planning
// =============================================================================

/// Validates a payment request.
///
/// A payment can only arrive as cash or UPI; `credit` is rejected.
pub fn plan_payment(request: &PaymentRequest) -> ValidationResult<PaymentPlan> {
    if request.amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if !request.payment_method.is_tendered() {
        return Err(ValidationError::NotAllowed {
            field: "paymentMethod".to_string(),
            allowed: vec![
                PaymentMethod::Cash.to_string(),
                PaymentMethod::Upi.to_string(),
            ],
        });
    }

    let note = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_NOTE)
        .to_string();

    Ok(PaymentPlan {
        customer_id: request.customer_id,
        amount: Money::from_minor(request.amount),
        payment_method: request.payment_method,
        note,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::SaleLine;
    use proptest::prelude::*;

    fn arb_line() -> impl Strategy<Value = SaleLine> {
        (1i64..6, 1i64..1_000, 0i64..1_000_000).prop_map(|(product_id, quantity, unit_price)| {
            SaleLine {
                product_id,
                quantity,
                unit_price,
            }
        })
    }

    proptest! {
        #[test]
        fn total_is_sum_of_subtotals(items in prop::collection::vec(arb_line(), 1..20)) {
            let plan = plan_sale(&SaleRequest::new(items.clone(), PaymentMethod::Cash)).unwrap();

            let expected: i64 = items.iter().map(|l| l.quantity * l.unit_price).sum();
            prop_assert_eq!(plan.total.minor(), expected);

            for (line, item) in plan.lines.iter().zip(&items) {
                prop_assert_eq!(line.subtotal.minor(), item.quantity * item.unit_price);
            }
        }

        #[test]
        fn stock_deltas_cover_every_unit_sold(items in prop::collection::vec(arb_line(), 1..20)) {
            let plan = plan_sale(&SaleRequest::new(items.clone(), PaymentMethod::Cash)).unwrap();

            let sold: i64 = items.iter().map(|l| l.quantity).sum();
            let moved: i64 = plan.stock_deltas.iter().map(|d| d.delta).sum();
            prop_assert_eq!(moved, -sold);
            prop_assert!(plan.stock_deltas.windows(2).all(|w| w[0].product_id < w[1].product_id));
        }

        #[test]
        fn credit_delta_is_unpaid_remainder(
            items in prop::collection::vec(arb_line(), 1..10),
            paid_ratio in 0u32..=100
        ) {
            let total: i64 = items.iter().map(|l| l.quantity * l.unit_price).sum();
            let paid = total * i64::from(paid_ratio) / 100;
            let req = SaleRequest::new(items, PaymentMethod::Cash).for_customer(1).paid(paid);

            let plan = plan_sale(&req).unwrap();
            prop_assert_eq!(plan.credit_delta.minor(), total - paid);
            prop_assert!(!plan.credit_delta.is_negative());
        }
    }
}
