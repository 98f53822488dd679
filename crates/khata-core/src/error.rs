//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                          │
//! │  ├── ValidationError  - Malformed or semantically invalid input         │
//! │  └── StoreError       - A store could not complete the operation        │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                       │
//! │  └── DbError          - SQLite failures, converted into StoreError      │
//! │                                                                         │
//! │  khata-billing errors                                                   │
//! │  └── BillingError     - Validation | NotFound | Storage                 │
//! │                                                                         │
//! │  Flow: DbError → StoreError → BillingError → ApiError → HTTP response   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every validation failure names the offending field
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are never retried: the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., a phone number with letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A credit amount would accrue on a sale with no customer to owe it.
    #[error("{field}: credit cannot be tracked without a customer")]
    CreditWithoutCustomer { field: String },
}

impl ValidationError {
    /// Returns the name of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::CreditWithoutCustomer { field } => field,
        }
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Failures raised by a store implementation.
///
/// A store error on a unit of work always means nothing was applied, so the
/// whole operation is safe to retry from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store cannot be reached (pool closed, timed out, ...).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A concurrent writer held the data and the conflict could not be resolved.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Any other storage failure.
    #[error("Storage failure: {0}")]
    Failed(String),
}

impl StoreError {
    /// Transient failures are expected to succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
