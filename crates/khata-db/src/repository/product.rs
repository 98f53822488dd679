//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Filtered listing with predicates pushed down to SQL
//! - CRUD operations
//! - Relative stock adjustment
//!
//! ## Push-Down Filtering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductFilter { search: "atta", category: None, low_stock: true }      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE (?1 IS NULL OR name LIKE '%atta%' OR sku LIKE '%atta%')          │
//! │    AND (?2 IS NULL OR category = ?2)                                    │
//! │    AND (?3 = 0 OR stock_quantity <= min_stock_level)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Only matching rows leave SQLite; nothing is filtered in Rust.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::like_pattern;
use crate::error::DbResult;
use khata_core::{NewProduct, Product, ProductFilter, ProductPatch};

/// Column list shared by every product SELECT / RETURNING.
const PRODUCT_COLUMNS: &str =
    "id, name, sku, category, price, stock_quantity, min_stock_level, unit, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let kirana = repo.list(&ProductFilter { category: Some("Kirana".into()), ..Default::default() }).await?;
/// let product = repo.get_by_id(1).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching every predicate in the filter, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR sku LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR category = ?2)
              AND (?3 = 0 OR stock_quantity <= min_stock_level)
            ORDER BY name, id
            "
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.category.as_deref())
            .bind(filter.low_stock)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Product list returned");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product and returns it with its assigned id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, "Inserting product");

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO products (
                name, sku, category, price,
                stock_quantity, min_stock_level, unit,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&product.name)
            .bind(product.sku.as_deref())
            .bind(&product.category)
            .bind(product.price)
            .bind(product.stock_quantity)
            .bind(product.min_stock_level)
            .bind(&product.unit)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(product)
    }

    /// Applies a partial update in a single statement.
    ///
    /// Unset fields keep their value. `stock_delta` is added to the stored
    /// quantity inside the UPDATE, never computed by the caller.
    ///
    /// ## Returns
    /// * `Ok(None)` - Product doesn't exist
    pub async fn update(&self, id: i64, patch: &ProductPatch) -> DbResult<Option<Product>> {
        debug!(id, ?patch, "Updating product");

        let now = Utc::now();
        let sql = format!(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                sku = COALESCE(?3, sku),
                category = COALESCE(?4, category),
                price = COALESCE(?5, price),
                min_stock_level = COALESCE(?6, min_stock_level),
                unit = COALESCE(?7, unit),
                stock_quantity = stock_quantity + COALESCE(?8, 0),
                updated_at = ?9
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.sku.as_deref())
            .bind(patch.category.as_deref())
            .bind(patch.price)
            .bind(patch.min_stock_level)
            .bind(patch.unit.as_deref())
            .bind(patch.stock_delta)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Adjusts stock by a signed delta. See [`adjust_stock`].
    pub async fn adjust_stock(&self, id: i64, delta: i64) -> DbResult<Option<Product>> {
        adjust_stock(&self.pool, id, delta).await
    }

    /// Deletes a product. Deleting an absent id is not an error.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(id, deleted = result.rows_affected(), "Deleted product");
        Ok(())
    }
}

/// Updates product stock level by a relative amount.
///
/// ## Delta Pattern
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │                    Stock Update Strategy                            │
/// │                                                                     │
/// │  ❌ WRONG: Absolute update (lost update under concurrency)          │
/// │     UPDATE products SET stock_quantity = 19 WHERE id = ?            │
/// │                                                                     │
/// │  ✅ CORRECT: Delta update                                           │
/// │     UPDATE products SET stock_quantity = stock_quantity - 1         │
/// │                                                                     │
/// │  Sale A: sells 3 → stock - 3                                        │
/// │  Sale B: sells 2 → stock - 2                                        │
/// │  Any interleaving ends at stock - 5                                 │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Runs on any executor: the pool for a standalone adjustment, or the
/// connection of an open unit of work.
///
/// ## Returns
/// * `Ok(None)` - Product doesn't exist (nothing was written)
pub(crate) async fn adjust_stock<'e, E>(executor: E, id: i64, delta: i64) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    debug!(id, delta, "Adjusting stock");

    let now = Utc::now();
    let sql = format!(
        r#"
        UPDATE products
        SET
            stock_quantity = stock_quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING {PRODUCT_COLUMNS}
        "#
    );

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

// =============================================================================
// Unit Tests
// =============================================================================
