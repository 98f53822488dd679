//! # Customer Repository
//!
//! Customers and their running credit balance (udhar).
//!
//! The balance column is only ever written by [`adjust_balance`], as a
//! floored relative update. Create and update never touch it.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::like_pattern;
use crate::error::DbResult;
use khata_core::{Customer, CustomerFilter, CustomerPatch, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, credit_balance, created_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists customers matching the filter, ordered by name.
    ///
    /// `search` matches a substring of the name (case-insensitive) or phone.
    pub async fn list(&self, filter: &CustomerFilter) -> DbResult<Vec<Customer>> {
        debug!(?filter, "Listing customers");

        let sql = format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR phone LIKE ?1 ESCAPE '\')
              AND (?2 = 0 OR credit_balance > 0)
            ORDER BY name, id
            "
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.has_credit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        get_by_id(&self.pool, id).await
    }

    pub async fn insert(&self, customer: &NewCustomer) -> DbResult<Customer> {
        insert(&self.pool, customer).await
    }

    /// Updates name, phone and address. Unset fields keep their value.
    pub async fn update(&self, id: i64, patch: &CustomerPatch) -> DbResult<Option<Customer>> {
        debug!(id, ?patch, "Updating customer");

        let sql = format!(
            r#"
            UPDATE customers SET
                name = COALESCE(?2, name),
                phone = COALESCE(?3, phone),
                address = COALESCE(?4, address)
            WHERE id = ?1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.phone.as_deref())
            .bind(patch.address.as_deref())
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    pub async fn adjust_balance(&self, id: i64, delta: i64) -> DbResult<Option<Customer>> {
        adjust_balance(&self.pool, id, delta).await
    }
}

pub(crate) async fn get_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");

    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(customer)
}

/// Inserts a customer with a zero balance.
pub(crate) async fn insert<'e, E>(executor: E, customer: &NewCustomer) -> DbResult<Customer>
where
    E: SqliteExecutor<'e>,
{
    debug!(name = %customer.name, "Inserting customer");

    let sql = format!(
        r#"
        INSERT INTO customers (name, phone, address, credit_balance, created_at)
        VALUES (?1, ?2, ?3, 0, ?4)
        RETURNING {CUSTOMER_COLUMNS}
        "#
    );

    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(&customer.name)
        .bind(customer.phone.as_deref())
        .bind(customer.address.as_deref())
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

    Ok(customer)
}

/// Adds a signed delta to the credit balance, floored at zero.
///
/// ```text
/// balance 28500, delta -28500  →  0
/// balance     0, delta   -100  →  0   (excess absorbed, not an error)
/// balance     0, delta +23500  →  23500
/// ```
///
/// The floor is applied inside the UPDATE so concurrent payments against
/// the same customer cannot interleave between read and write.
pub(crate) async fn adjust_balance<'e, E>(
    executor: E,
    id: i64,
    delta: i64,
) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    debug!(id, delta, "Adjusting credit balance");

    let sql = format!(
        r#"
        UPDATE customers
        SET credit_balance = MAX(0, credit_balance + ?2)
        WHERE id = ?1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    );

    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;

    Ok(customer)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use khata_core::{CustomerFilter, CustomerPatch, NewCustomer};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.insert(&NewCustomer {
            name: "Rahul Sharma".to_string(),
            phone: Some("9876543210".to_string()),
            address: Some("Flat 101, Omkar Apt".to_string()),
        })
        .await
        .unwrap();
        repo.insert(&NewCustomer {
            name: "Priya Patel".to_string(),
            phone: Some("9876543211".to_string()),
            address: None,
        })
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_new_customer_starts_at_zero() {
        let db = seeded().await;
        let c = db.customers().get_by_id(1).await.unwrap().unwrap();
        assert_eq!(c.credit_balance, 0);
        assert_eq!(c.name, "Rahul Sharma");
    }

    #[tokio::test]
    async fn test_balance_is_floored_at_zero() {
        let db = seeded().await;
        let repo = db.customers();

        let c = repo.adjust_balance(1, 28500).await.unwrap().unwrap();
        assert_eq!(c.credit_balance, 28500);

        let c = repo.adjust_balance(1, -28500).await.unwrap().unwrap();
        assert_eq!(c.credit_balance, 0);

        let c = repo.adjust_balance(1, -100).await.unwrap().unwrap();
        assert_eq!(c.credit_balance, 0);

        assert!(repo.adjust_balance(42, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = seeded().await;
        let repo = db.customers();
        repo.adjust_balance(2, 1500).await.unwrap();

        let by_phone = repo
            .list(&CustomerFilter {
                search: Some("543210".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].name, "Rahul Sharma");

        let with_credit = repo
            .list(&CustomerFilter {
                has_credit: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(with_credit.len(), 1);
        assert_eq!(with_credit[0].name, "Priya Patel");

        let all = repo.list(&CustomerFilter::default()).await.unwrap();
        assert_eq!(all[0].name, "Priya Patel");
    }

    #[tokio::test]
    async fn test_update_leaves_balance_alone() {
        let db = seeded().await;
        let repo = db.customers();
        repo.adjust_balance(1, 500).await.unwrap();

        let c = repo
            .update(
                1,
                &CustomerPatch {
                    address: Some("Flat 202, Omkar Apt".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.address.as_deref(), Some("Flat 202, Omkar Apt"));
        assert_eq!(c.phone.as_deref(), Some("9876543210"));
        assert_eq!(c.credit_balance, 500);
    }
}
