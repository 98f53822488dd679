//! # Repository Module
//!
//! Database repository implementations for Khata.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Store trait call (CatalogStore::list_products, ...)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductRepository / CustomerRepository / LedgerRepository              │
//! │       │                                                                 │
//! │       │  Pool-level methods for standalone reads and writes             │
//! │       │  Free functions over `SqliteExecutor` for writes that must      │
//! │       │  also run inside a unit of work                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  SQL is isolated here; nothing above this layer sees a query.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and stock
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and credit balance
//! - [`LedgerRepository`](ledger::LedgerRepository) - Transactions, items, history
//! - [`ReportRepository`](report::ReportRepository) - Dashboard aggregates

pub mod customer;
pub mod ledger;
pub mod product;
pub mod report;

/// Builds a `LIKE` pattern for a substring search.
///
/// `%`, `_` and the escape character itself are escaped so user input only
/// ever matches literally. Queries must use `ESCAPE '\'`.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("atta"), "%atta%");
        assert_eq!(like_pattern(" 50% "), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
