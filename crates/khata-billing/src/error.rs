//! # Billing Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BillingError                                                           │
//! │  ├── Validation  bad shape: empty items, qty ≤ 0, credit w/o customer   │
//! │  │               never retried                                          │
//! │  ├── NotFound    unknown product or customer id                         │
//! │  │               never retried                                          │
//! │  └── Storage     unit of work could not commit                          │
//! │                  nothing was applied → safe to retry from scratch       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use khata_core::{StoreError, ValidationError};
use thiserror::Error;

/// What kind of record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    Customer,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Product => f.write_str("Product"),
            Entity::Customer => f.write_str("Customer"),
        }
    }
}

/// Errors returned by the billing engine.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BillingError {
    pub fn product_not_found(id: i64) -> Self {
        BillingError::NotFound {
            entity: Entity::Product,
            id,
        }
    }

    pub fn customer_not_found(id: i64) -> Self {
        BillingError::NotFound {
            entity: Entity::Customer,
            id,
        }
    }

    /// Only storage failures are worth retrying; the engine never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Storage(_))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
