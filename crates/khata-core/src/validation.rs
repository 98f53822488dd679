//! # Validation Module
//!
//! Input validation for catalog and customer management.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Json / Query)                             │
//! │  └── Type validation (deserialization)                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + billing::plan_sale                              │
//! │  └── Field rules, each error names the offending field                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL constraints                                               │
//! │  └── CHECK constraints (quantity > 0, credit_balance >= 0, ...)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::validation::{validate_sku, validate_phone};
//!
//! validate_sku("ATA-001").unwrap();
//! validate_phone("98765 43210").unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{CustomerPatch, NewCustomer, NewProduct, ProductPatch};
use crate::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_LABEL_LEN: usize = 50;
const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_sku;
///
/// assert!(validate_sku("SOAP-001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require_text("sku", sku, MAX_LABEL_LEN)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, MAX_NAME_LEN)
}

pub fn validate_category(category: &str) -> ValidationResult<()> {
    require_text("category", category, MAX_LABEL_LEN)
}

pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    require_text("unit", unit, MAX_LABEL_LEN)
}

/// Validates a customer name: non-empty, at most 200 characters.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    require_text("name", name, MAX_NAME_LEN)
}

/// Validates a phone number.
///
/// ## Rules
/// - 7 to 15 digits
/// - Spaces, hyphens and a leading `+` are tolerated as separators
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_phone;
///
/// assert!(validate_phone("9876543210").is_ok());
/// assert!(validate_phone("+91 98765-43210").is_ok());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);

    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces and hyphens".to_string(),
        });
    }

    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have between 7 and 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when it is empty (no filtering).
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    if query.is_empty() {
        Ok(None)
    } else {
        Ok(Some(query.to_string()))
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in minor units. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_price;
///
/// assert!(validate_price(23500).is_ok());
/// assert!(validate_price(0).is_ok());
/// assert!(validate_price(-100).is_err());
/// ```
pub fn validate_price(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

pub fn validate_min_stock_level(level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minStockLevel".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Resolves a history page size.
///
/// ## Rules
/// - Absent → `DEFAULT_HISTORY_LIMIT` (50)
/// - Must be in `1..=MAX_HISTORY_LIMIT`
pub fn validate_history_limit(limit: Option<i64>) -> ValidationResult<i64> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_HISTORY_LIMIT,
        });
    }

    Ok(limit)
}

// =============================================================================
// Aggregate Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    if let Some(sku) = &product.sku {
        validate_sku(sku)?;
    }
    validate_category(&product.category)?;
    validate_price(product.price)?;
    validate_min_stock_level(product.min_stock_level)?;
    validate_unit(&product.unit)?;
    Ok(())
}

/// Validates only the fields a patch actually sets.
///
/// `stock_delta` may be any sign: negative deltas record shrinkage.
pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }
    if let Some(sku) = &patch.sku {
        validate_sku(sku)?;
    }
    if let Some(category) = &patch.category {
        validate_category(category)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(level) = patch.min_stock_level {
        validate_min_stock_level(level)?;
    }
    if let Some(unit) = &patch.unit {
        validate_unit(unit)?;
    }
    Ok(())
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_customer_name(&customer.name)?;
    if let Some(phone) = &customer.phone {
        validate_phone(phone)?;
    }
    Ok(())
}

pub fn validate_customer_patch(patch: &CustomerPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_customer_name(name)?;
    }
    if let Some(phone) = &patch.phone {
        validate_phone(phone)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ATA-001").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_product_name("Aashirvaad Atta (5kg)").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());

        let err = validate_customer_name("  ").unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765-43210").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765abc10").is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  atta ").unwrap(), Some("atta".to_string()));
        assert_eq!(validate_search_query("   ").unwrap(), None);
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_history_limit() {
        assert_eq!(validate_history_limit(None).unwrap(), 50);
        assert_eq!(validate_history_limit(Some(10)).unwrap(), 10);
        assert!(validate_history_limit(Some(0)).is_err());
        assert!(validate_history_limit(Some(501)).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let product = NewProduct {
            name: "Tata Salt (1kg)".to_string(),
            sku: Some("SLT-001".to_string()),
            category: "Kirana".to_string(),
            price: 2500,
            stock_quantity: 50,
            min_stock_level: 10,
            unit: "pcs".to_string(),
        };
        assert!(validate_new_product(&product).is_ok());

        let bad = NewProduct {
            price: -1,
            ..product
        };
        assert_eq!(validate_new_product(&bad).unwrap_err().field(), "price");
    }

    #[test]
    fn test_validate_patches() {
        assert!(validate_product_patch(&ProductPatch::default()).is_ok());

        let patch = ProductPatch {
            stock_delta: Some(-3),
            ..Default::default()
        };
        assert!(validate_product_patch(&patch).is_ok());

        let patch = ProductPatch {
            min_stock_level: Some(-1),
            ..Default::default()
        };
        assert_eq!(
            validate_product_patch(&patch).unwrap_err().field(),
            "minStockLevel"
        );

        let patch = CustomerPatch {
            phone: Some("n/a".to_string()),
            ..Default::default()
        };
        assert!(validate_customer_patch(&patch).is_err());
    }
}
